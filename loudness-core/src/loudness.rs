//! # Loudness Interpolation Module
//!
//! Converts between sound-pressure level (dB SPL) and perceived loudness
//! (phon) at any frequency, using a [`ContourTable`].
//!
//! ## Interpolation scheme
//! - Along frequency: log-linear, i.e. linear in dB over `log10(Hz)`, the way
//!   the contours are plotted. Frequencies outside the table hold the edge value.
//! - Between contours: linear in dB across one phon band at fixed frequency.
//! - Outside the tabulated loudness range (dB to phon only): 1 phon per dB,
//!   floored at [`PHON_FLOOR`] and capped at [`PHON_CEILING`].
//!
//! Every operation is a pure function of its arguments and the table.

use crate::contour::ContourTable;
use crate::error::{check_finite, check_frequency, LoudnessError, Result};
use crate::LoudnessReading;

/// Lowest loudness `phon_for_decibel` reports below the quietest contour.
pub const PHON_FLOOR: f64 = 0.0;

/// Highest loudness `phon_for_decibel` reports above the loudest contour.
pub const PHON_CEILING: f64 = 120.0;

impl ContourTable {
    /// Returns the SPL of the contour `phon_index` at an arbitrary frequency.
    ///
    /// # Arguments
    /// * `frequency` - Frequency in Hz, must be positive and finite
    /// * `phon_index` - One of the table's phon indices
    ///
    /// # Returns
    /// * dB SPL, log-linearly interpolated between the two bracketing table
    ///   points, or the edge value when `frequency` is outside the table
    pub fn level_on_contour(&self, frequency: f64, phon_index: i32) -> Result<f64> {
        let frequency = check_frequency(frequency)?;
        if self.phons.binary_search(&phon_index).is_err() {
            return Err(LoudnessError::InvalidInput {
                name: "phon index",
                value: f64::from(phon_index),
            });
        }
        Ok(self.level_unchecked(frequency, phon_index))
    }

    /// Interpolation core. `phon_index` must be a table index.
    fn level_unchecked(&self, frequency: f64, phon_index: i32) -> f64 {
        let points = &self.points;
        // Smallest index whose frequency is >= the requested one.
        let i = points.partition_point(|p| p.frequency < frequency);

        if i == points.len() {
            return points[i - 1].levels[&phon_index];
        }
        let p2 = &points[i];
        if i == 0 || p2.frequency == frequency {
            return p2.levels[&phon_index];
        }
        let p1 = &points[i - 1];

        let log_f = frequency.log10();
        let log_f1 = p1.frequency.log10();
        let log_f2 = p2.frequency.log10();
        // Strictly increasing frequencies keep the denominator non-zero.
        let t = (log_f - log_f1) / (log_f2 - log_f1);

        let v1 = p1.levels[&phon_index];
        let v2 = p2.levels[&phon_index];
        v1 + t * (v2 - v1)
    }

    /// Calculates the SPL needed at `frequency` to sound as loud as `target_phon`.
    ///
    /// `target_phon` is clamped to the table's phon range first. Between two
    /// tabulated contours the level is interpolated linearly in phon.
    pub fn decibel_for_phon(&self, frequency: f64, target_phon: f64) -> Result<f64> {
        let frequency = check_frequency(frequency)?;
        let target_phon = check_finite("phon", target_phon)?;
        let phon = target_phon.clamp(f64::from(self.min_phon()), f64::from(self.max_phon()));

        // Number of contours at or below `phon`; at least one after clamping.
        let upper_pos = self.phons.partition_point(|&p| f64::from(p) <= phon);
        let lower = self.phons[upper_pos - 1];

        let upper = match self.phons.get(upper_pos) {
            Some(&upper) if f64::from(lower) != phon => upper,
            _ => return Ok(self.level_unchecked(frequency, lower)),
        };

        let db_low = self.level_unchecked(frequency, lower);
        let db_high = self.level_unchecked(frequency, upper);
        let (lower_f, upper_f) = (f64::from(lower), f64::from(upper));
        let t = (phon - lower_f) / (upper_f - lower_f);
        Ok(db_low + (db_high - db_low) * t)
    }

    /// Estimates the loudness in phon of a tone at `frequency` and `decibel_level`.
    ///
    /// Inside the tabulated range the result is interpolated linearly between
    /// the two contours that bracket the level. Outside it, loudness moves one
    /// phon per dB from the nearest contour, limited to
    /// `[PHON_FLOOR, PHON_CEILING]`.
    pub fn phon_for_decibel(&self, frequency: f64, decibel_level: f64) -> Result<f64> {
        let frequency = check_frequency(frequency)?;
        let db = check_finite("decibel level", decibel_level)?;

        let curve: Vec<(f64, f64)> = self
            .phons
            .iter()
            .map(|&phon| (f64::from(phon), self.level_unchecked(frequency, phon)))
            .collect();

        for pair in curve.windows(2) {
            let (low_phon, low_db) = pair[0];
            let (high_phon, high_db) = pair[1];
            if db >= low_db && db <= high_db {
                if high_db == low_db {
                    return Ok(low_phon);
                }
                let t = (db - low_db) / (high_db - low_db);
                return Ok(low_phon + (high_phon - low_phon) * t);
            }
        }

        let (lowest_phon, lowest_db) = curve[0];
        if db < lowest_db {
            return Ok((lowest_phon - (lowest_db - db)).max(PHON_FLOOR));
        }
        let (highest_phon, highest_db) = curve[curve.len() - 1];
        if db > highest_db {
            return Ok((highest_phon + (db - highest_db)).min(PHON_CEILING));
        }
        // Single-contour table and the level matches it exactly.
        Ok(lowest_phon)
    }

    /// Samples the equal-loudness curve for `phon` at each of `frequencies`.
    ///
    /// # Returns
    /// * `(frequency, dB SPL)` pairs in the order given
    pub fn contour(&self, phon: f64, frequencies: &[f64]) -> Result<Vec<(f64, f64)>> {
        frequencies
            .iter()
            .map(|&f| self.decibel_for_phon(f, phon).map(|db| (f, db)))
            .collect()
    }

    /// Converts a probe position into a full reading with its loudness.
    pub fn read(&self, frequency: f64, decibel_level: f64) -> Result<LoudnessReading> {
        let phon = self.phon_for_decibel(frequency, decibel_level)?;
        Ok(LoudnessReading {
            frequency,
            decibel_level,
            phon,
        })
    }
}

/// [`ContourTable::level_on_contour`] on the bundled table.
pub fn level_on_contour(frequency: f64, phon_index: i32) -> Result<f64> {
    ContourTable::bundled().level_on_contour(frequency, phon_index)
}

/// [`ContourTable::decibel_for_phon`] on the bundled table.
pub fn decibel_for_phon(frequency: f64, target_phon: f64) -> Result<f64> {
    ContourTable::bundled().decibel_for_phon(frequency, target_phon)
}

/// [`ContourTable::phon_for_decibel`] on the bundled table.
pub fn phon_for_decibel(frequency: f64, decibel_level: f64) -> Result<f64> {
    ContourTable::bundled().phon_for_decibel(frequency, decibel_level)
}

/// Generates `count` frequencies evenly spaced on a log10 axis from `min` to `max`.
///
/// The endpoints are returned exactly. Non-positive or non-finite bounds are
/// rejected.
pub fn log_spaced_frequencies(min: f64, max: f64, count: usize) -> Result<Vec<f64>> {
    let min = check_frequency(min)?;
    let max = check_frequency(max)?;
    match count {
        0 => return Ok(Vec::new()),
        1 => return Ok(vec![min]),
        _ => {}
    }
    let log_min = min.log10();
    let step = (max.log10() - log_min) / (count - 1) as f64;
    Ok((0..count)
        .map(|i| match i {
            0 => min,
            i if i == count - 1 => max,
            i => 10f64.powf(log_min + step * i as f64),
        })
        .collect())
}
