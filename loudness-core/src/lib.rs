// loudness-core/src/lib.rs

//! The core logic for the equal-loudness explorer.
//! This crate converts between sound-pressure level and perceived loudness
//! using a table of equal-loudness contours, and provides the tone player and
//! insight text that sit next to it. It is completely headless and contains
//! no UI code.

pub mod audio;
pub mod contour;
pub mod error;
pub mod insight;
pub mod loudness;

pub use contour::{ContourPoint, ContourTable};
pub use error::{LoudnessError, Result};
pub use loudness::{decibel_for_phon, level_on_contour, phon_for_decibel};

/// A point the user is inspecting, together with its perceived loudness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessReading {
    /// Frequency in Hz.
    pub frequency: f64,
    /// Sound-pressure level in dB SPL.
    pub decibel_level: f64,
    /// Loudness level in phon.
    pub phon: f64,
}
