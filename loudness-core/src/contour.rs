//! # Contour Table Module
//!
//! This module holds the reference data the loudness engine interpolates over:
//! a small table of equal-loudness contours sampled at fixed frequencies.
//!
//! ## Features
//! - Bundled coarse table (20 Hz to 20 kHz, 0 to 100 phon in 20-phon steps)
//! - Validation of table invariants at construction time
//! - JSON import and export of tables in the `{"frequency": .., "<phon>": ..}` record format

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{LoudnessError, Result};

/// Phon indices of the bundled table, in ascending order.
pub const BUNDLED_PHONS: [i32; 6] = [0, 20, 40, 60, 80, 100];

/// Approximate dB SPL per phon curve, ISO 226 style. One row per frequency,
/// columns follow [`BUNDLED_PHONS`].
const BUNDLED_ROWS: [(f64, [f64; 6]); 14] = [
    (20.0, [74.0, 88.0, 104.0, 118.0, 130.0, 141.0]),
    (31.5, [58.0, 74.0, 90.0, 106.0, 120.0, 132.0]),
    (63.0, [38.0, 53.0, 70.0, 88.0, 104.0, 118.0]),
    (100.0, [26.0, 41.0, 59.0, 78.0, 96.0, 111.0]),
    (200.0, [14.0, 30.0, 49.0, 69.0, 88.0, 105.0]),
    (500.0, [6.0, 22.0, 42.0, 63.0, 83.0, 100.0]),
    (1000.0, [3.0, 20.0, 40.0, 60.0, 80.0, 100.0]), // reference: phon == dB
    (2000.0, [-1.0, 17.0, 37.0, 57.0, 77.0, 96.0]),
    (3000.0, [-6.0, 12.0, 32.0, 53.0, 73.0, 93.0]), // most sensitive region
    (4000.0, [-4.0, 14.0, 34.0, 55.0, 75.0, 95.0]),
    (8000.0, [15.0, 32.0, 52.0, 72.0, 92.0, 111.0]),
    (12500.0, [18.0, 30.0, 55.0, 80.0, 100.0, 115.0]),
    (16000.0, [50.0, 65.0, 85.0, 105.0, 120.0, 135.0]),
    (20000.0, [80.0, 95.0, 115.0, 130.0, 145.0, 155.0]),
];

/// The bundled table, built once on first use.
static BUNDLED: Lazy<ContourTable> = Lazy::new(|| {
    let points = BUNDLED_ROWS
        .iter()
        .map(|(frequency, row)| ContourPoint {
            frequency: *frequency,
            levels: BUNDLED_PHONS.iter().copied().zip(row.iter().copied()).collect(),
        })
        .collect();
    // Invariants of the literal data are covered by `bundled_table_is_valid`.
    ContourTable {
        points,
        phons: BUNDLED_PHONS.to_vec(),
    }
});

/// One column of the table: the SPL of every contour at a single frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourPoint {
    /// Frequency in Hz.
    pub frequency: f64,
    /// dB SPL keyed by phon index.
    pub levels: BTreeMap<i32, f64>,
}

impl ContourPoint {
    pub fn new(frequency: f64, levels: impl IntoIterator<Item = (i32, f64)>) -> Self {
        Self {
            frequency,
            levels: levels.into_iter().collect(),
        }
    }

    /// The SPL of the contour `phon` at this point, if the point carries it.
    pub fn level(&self, phon: i32) -> Option<f64> {
        self.levels.get(&phon).copied()
    }
}

/// On-disk shape of a table row: `{"frequency": 1000, "0": 3, "20": 20, ...}`.
#[derive(Debug, Serialize, Deserialize)]
struct ContourRecord {
    #[serde(alias = "freq")]
    frequency: f64,
    #[serde(flatten)]
    levels: BTreeMap<String, f64>,
}

/// An immutable, validated set of equal-loudness contours.
///
/// Points are sorted by strictly increasing frequency and every point carries
/// the same phon indices. At any single frequency the SPL never decreases as
/// the phon index rises, which is what makes the phon/dB conversions invertible.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourTable {
    pub(crate) points: Vec<ContourPoint>,
    pub(crate) phons: Vec<i32>,
}

impl ContourTable {
    /// Builds a table from its points, checking every invariant once.
    ///
    /// # Errors
    /// * `DataIntegrity` - empty table, unsorted or non-positive frequencies,
    ///   mismatched phon sets, non-finite levels, or a level that drops as the
    ///   phon index rises.
    pub fn new(points: Vec<ContourPoint>) -> Result<Self> {
        let first = points
            .first()
            .ok_or_else(|| LoudnessError::DataIntegrity("table has no points".into()))?;
        let phons: Vec<i32> = first.levels.keys().copied().collect();
        if phons.is_empty() {
            return Err(LoudnessError::DataIntegrity(
                "table has no phon contours".into(),
            ));
        }

        let mut previous: Option<f64> = None;
        for point in &points {
            let f = point.frequency;
            if !f.is_finite() || f <= 0.0 {
                return Err(LoudnessError::DataIntegrity(format!(
                    "frequency {f} is not a positive finite number"
                )));
            }
            if let Some(prev) = previous {
                if f <= prev {
                    return Err(LoudnessError::DataIntegrity(format!(
                        "frequencies must be strictly increasing, found {f} after {prev}"
                    )));
                }
            }
            previous = Some(f);

            if !point.levels.keys().copied().eq(phons.iter().copied()) {
                return Err(LoudnessError::DataIntegrity(format!(
                    "point at {f} Hz has phon indices {:?}, expected {:?}",
                    point.levels.keys().collect::<Vec<_>>(),
                    phons
                )));
            }

            // BTreeMap iterates in ascending phon order.
            let mut last_level = f64::NEG_INFINITY;
            for (&phon, &level) in &point.levels {
                if !level.is_finite() {
                    return Err(LoudnessError::DataIntegrity(format!(
                        "level for {phon} phon at {f} Hz is not finite"
                    )));
                }
                if level < last_level {
                    return Err(LoudnessError::DataIntegrity(format!(
                        "level for {phon} phon at {f} Hz ({level} dB) is below the quieter contour ({last_level} dB)"
                    )));
                }
                last_level = level;
            }
        }

        log::debug!(
            "Built contour table: {} points, phons {:?}",
            points.len(),
            phons
        );
        Ok(Self { points, phons })
    }

    /// The bundled reference table.
    pub fn bundled() -> &'static ContourTable {
        &BUNDLED
    }

    /// Parses a table from a JSON array of records.
    ///
    /// Each record has a `frequency` (or `freq`) field and one field per phon
    /// index, keyed by the index written as an integer string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let records: Vec<ContourRecord> = serde_json::from_str(json)
            .map_err(|e| LoudnessError::DataIntegrity(format!("malformed table: {e}")))?;

        let points = records
            .into_iter()
            .map(|record| -> Result<ContourPoint> {
                let mut levels = BTreeMap::new();
                for (key, level) in record.levels {
                    let phon = key.trim().parse::<i32>().map_err(|_| {
                        LoudnessError::DataIntegrity(format!(
                            "'{key}' is not an integer phon index"
                        ))
                    })?;
                    if levels.insert(phon, level).is_some() {
                        return Err(LoudnessError::DataIntegrity(format!(
                            "duplicate phon index {phon} at {} Hz",
                            record.frequency
                        )));
                    }
                }
                Ok(ContourPoint {
                    frequency: record.frequency,
                    levels,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(points)
    }

    /// Loads a table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read contour table {}", path.display()))?;
        let table = Self::from_json_str(&json)
            .with_context(|| format!("failed to load contour table {}", path.display()))?;
        log::info!(
            "Loaded contour table from {} ({} points)",
            path.display(),
            table.points.len()
        );
        Ok(table)
    }

    /// Serializes the table in the same record format `from_json_str` reads.
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        let records: Vec<ContourRecord> = self
            .points
            .iter()
            .map(|point| ContourRecord {
                frequency: point.frequency,
                levels: point
                    .levels
                    .iter()
                    .map(|(phon, level)| (phon.to_string(), *level))
                    .collect(),
            })
            .collect();
        serde_json::to_string_pretty(&records)
    }

    pub fn points(&self) -> &[ContourPoint] {
        &self.points
    }

    /// Phon indices in ascending order.
    pub fn phon_indices(&self) -> &[i32] {
        &self.phons
    }

    pub fn min_frequency(&self) -> f64 {
        self.points[0].frequency
    }

    pub fn max_frequency(&self) -> f64 {
        self.points[self.points.len() - 1].frequency
    }

    pub fn min_phon(&self) -> i32 {
        self.phons[0]
    }

    pub fn max_phon(&self) -> i32 {
        self.phons[self.phons.len() - 1]
    }
}
