//! # Insight Module
//!
//! Turns a loudness reading into a short plain-text explanation of what a
//! listener hears at that point. Sources are pluggable through
//! [`InsightSource`]; a failing source never reaches the engine, its error is
//! logged and replaced by [`FALLBACK_INSIGHT`].

use anyhow::Result;

use crate::contour::ContourTable;
use crate::LoudnessReading;

/// Shown whenever an insight source fails.
pub const FALLBACK_INSIGHT: &str =
    "Unable to retrieve insights at this moment. Try exploring other frequencies.";

/// Anything that can describe a reading in a sentence or two.
pub trait InsightSource {
    fn describe(&self, reading: &LoudnessReading) -> Result<String>;
}

/// Asks `source` for an insight, substituting the fallback text on failure.
pub fn insight_or_fallback(source: &dyn InsightSource, reading: &LoudnessReading) -> String {
    match source.describe(reading) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("Insight source failed for {:?}: {:#}", reading, e);
            FALLBACK_INSIGHT.to_string()
        }
    }
}

/// Offline insight source that reasons directly from the contour table.
pub struct ContourInsight<'a> {
    table: &'a ContourTable,
}

impl<'a> ContourInsight<'a> {
    pub fn new(table: &'a ContourTable) -> Self {
        Self { table }
    }
}

impl Default for ContourInsight<'static> {
    fn default() -> Self {
        Self::new(ContourTable::bundled())
    }
}

/// Rough perceptual character of a frequency band, with familiar examples.
fn band_character(frequency: f64) -> &'static str {
    match frequency {
        f if f < 60.0 => "sub-bass rumble, felt as much as heard, like thunder or a distant truck",
        f if f < 250.0 => "bass, the body of a kick drum or a cello",
        f if f < 2000.0 => "midrange, where most of speech lives",
        f if f < 5000.0 => "presence range, the ear's most sensitive region, home of a baby's cry",
        f if f < 10000.0 => "piercing treble, like sibilance or a smoke alarm",
        _ => "high air, like a mosquito's whine",
    }
}

impl InsightSource for ContourInsight<'_> {
    fn describe(&self, reading: &LoudnessReading) -> Result<String> {
        let f = reading.frequency;
        let threshold = self
            .table
            .level_on_contour(f, self.table.min_phon())?;
        let character = band_character(f);

        if reading.decibel_level < threshold {
            return Ok(format!(
                "At {f:.0} Hz, {:.1} dB SPL is {:.1} dB below the threshold of hearing, so it is inaudible; tones here are {character}.",
                reading.decibel_level,
                threshold - reading.decibel_level,
            ));
        }

        // Extra SPL this frequency needs, compared with 1 kHz, to sound as loud.
        let offset = self.table.decibel_for_phon(f, reading.phon)?
            - self.table.decibel_for_phon(1000.0, reading.phon)?;
        let sensitivity = if offset.abs() < 1.0 {
            "about as sensitive as at 1 kHz".to_string()
        } else if offset > 0.0 {
            format!("less sensitive than at 1 kHz, needing {offset:.1} dB more to sound as loud")
        } else {
            format!(
                "more sensitive than at 1 kHz, needing {:.1} dB less to sound as loud",
                -offset
            )
        };
        let loudness = match reading.phon {
            p if p < 20.0 => "faint",
            p if p < 60.0 => "comfortably audible",
            p if p < 90.0 => "loud",
            _ => "very loud",
        };

        Ok(format!(
            "At {f:.0} Hz and {:.1} dB SPL the tone is {loudness} (about {:.0} phon): {character}. The ear is {sensitivity}.",
            reading.decibel_level, reading.phon,
        ))
    }
}
