//! # Probe State
//!
//! The point the user is inspecting, plus the equal-loudness lock. While the
//! lock is on, moving the frequency keeps the perceived loudness fixed and
//! recomputes the level; otherwise the loudness follows the level.

use loudness_core::{ContourTable, LoudnessReading, Result};

pub const MIN_FREQUENCY: f64 = 20.0;
pub const MAX_FREQUENCY: f64 = 20000.0;
pub const MIN_LEVEL: f64 = 0.0;
pub const MAX_LEVEL: f64 = 130.0;

/// Frequency whose level defines the phon value when the lock is engaged.
const REFERENCE_FREQUENCY: f64 = 1000.0;

/// Rounds a computed level to 0.1 dB.
fn round_level(db: f64) -> f64 {
    (db * 10.0).round() / 10.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct Probe {
    pub frequency: f64,
    pub decibel_level: f64,
    pub target_phon: f64,
    pub equal_loudness: bool,
    /// Level to restore when the lock is released.
    saved_level: f64,
}

impl Default for Probe {
    fn default() -> Self {
        Self {
            frequency: 1000.0,
            decibel_level: 60.0,
            target_phon: 60.0,
            equal_loudness: false,
            saved_level: 60.0,
        }
    }
}

impl Probe {
    /// Moves the probe to a new frequency, clamped to the audible range.
    pub fn set_frequency(&mut self, table: &ContourTable, frequency: f64) -> Result<()> {
        let frequency = frequency.clamp(MIN_FREQUENCY, MAX_FREQUENCY);
        if self.equal_loudness {
            self.decibel_level = round_level(table.decibel_for_phon(frequency, self.target_phon)?);
        } else {
            self.target_phon = table.phon_for_decibel(frequency, self.decibel_level)?;
        }
        self.frequency = frequency;
        log::debug!("Probe moved: {:?}", self);
        Ok(())
    }

    /// Sets the level directly. The loudness target always follows.
    pub fn set_level(&mut self, table: &ContourTable, decibel_level: f64) -> Result<()> {
        let decibel_level = decibel_level.clamp(MIN_LEVEL, MAX_LEVEL);
        self.target_phon = table.phon_for_decibel(self.frequency, decibel_level)?;
        self.decibel_level = decibel_level;
        log::debug!("Probe level: {:?}", self);
        Ok(())
    }

    /// Engages or releases the equal-loudness lock.
    ///
    /// Engaging takes the loudness the current level would have at 1 kHz and
    /// jumps to the level that matches it at the current frequency. Releasing
    /// restores the level from before the lock.
    pub fn toggle_equal_loudness(&mut self, table: &ContourTable) -> Result<()> {
        if self.equal_loudness {
            self.target_phon = table.phon_for_decibel(self.frequency, self.saved_level)?;
            self.decibel_level = self.saved_level;
        } else {
            let reference_phon = table.phon_for_decibel(REFERENCE_FREQUENCY, self.decibel_level)?;
            let level = round_level(table.decibel_for_phon(self.frequency, reference_phon)?);
            self.saved_level = self.decibel_level;
            self.target_phon = reference_phon;
            self.decibel_level = level;
        }
        self.equal_loudness = !self.equal_loudness;
        log::debug!("Equal-loudness lock: {}", self.equal_loudness);
        Ok(())
    }

    pub fn reading(&self) -> LoudnessReading {
        LoudnessReading {
            frequency: self.frequency,
            decibel_level: self.decibel_level,
            phon: self.target_phon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn table() -> &'static ContourTable {
        ContourTable::bundled()
    }

    #[test]
    fn unlocked_frequency_change_updates_phon() {
        let mut probe = Probe::default();
        probe.set_frequency(table(), 100.0).unwrap();
        assert_eq!(probe.decibel_level, 60.0);
        // 60 dB at 100 Hz lies between the 40 (59 dB) and 60 (78 dB) phon curves.
        assert_abs_diff_eq!(probe.target_phon, 40.0 + 20.0 / 19.0, epsilon = 1e-9);
    }

    #[test]
    fn locked_frequency_change_keeps_phon() {
        let mut probe = Probe::default();
        probe.toggle_equal_loudness(table()).unwrap();
        assert_eq!(probe.target_phon, 60.0);
        assert_eq!(probe.decibel_level, 60.0);

        probe.set_frequency(table(), 20.0).unwrap();
        assert_eq!(probe.decibel_level, 118.0);
        assert_eq!(probe.target_phon, 60.0);

        probe.set_frequency(table(), 3000.0).unwrap();
        assert_eq!(probe.decibel_level, 53.0);
    }

    #[test]
    fn locked_level_is_rounded() {
        let mut probe = Probe::default();
        probe.toggle_equal_loudness(table()).unwrap();
        probe.set_frequency(table(), 150.0).unwrap();
        let tenths = probe.decibel_level * 10.0;
        assert_abs_diff_eq!(tenths, tenths.round(), epsilon = 1e-9);
    }

    #[test]
    fn engaging_lock_uses_reference_loudness() {
        let mut probe = Probe::default();
        probe.set_frequency(table(), 100.0).unwrap();
        probe.set_level(table(), 80.0).unwrap();
        probe.toggle_equal_loudness(table()).unwrap();
        // 80 dB at 1 kHz is 80 phon, which needs 96 dB at 100 Hz.
        assert_eq!(probe.target_phon, 80.0);
        assert_eq!(probe.decibel_level, 96.0);
    }

    #[test]
    fn releasing_lock_restores_level() {
        let mut probe = Probe::default();
        probe.set_level(table(), 70.0).unwrap();
        probe.toggle_equal_loudness(table()).unwrap();
        probe.set_frequency(table(), 63.0).unwrap();
        assert_eq!(probe.decibel_level, 96.0);

        probe.toggle_equal_loudness(table()).unwrap();
        assert!(!probe.equal_loudness);
        assert_eq!(probe.decibel_level, 70.0);
        assert_eq!(probe.frequency, 63.0);
        assert_eq!(probe.target_phon, table().phon_for_decibel(63.0, 70.0).unwrap());
    }

    #[test]
    fn inputs_are_clamped_to_slider_ranges() {
        let mut probe = Probe::default();
        probe.set_frequency(table(), 5.0).unwrap();
        assert_eq!(probe.frequency, MIN_FREQUENCY);
        probe.set_level(table(), 150.0).unwrap();
        assert_eq!(probe.decibel_level, MAX_LEVEL);
    }

    #[test]
    fn invalid_input_leaves_probe_untouched() {
        let mut probe = Probe::default();
        assert!(probe.set_level(table(), f64::NAN).is_err());
        assert_eq!(probe, Probe::default());
    }
}
