//! Integration tests for the loudness conversions on the bundled table.

use approx::assert_abs_diff_eq;
use loudness_core::loudness::log_spaced_frequencies;
use loudness_core::{decibel_for_phon, level_on_contour, phon_for_decibel, ContourTable};

/// Frequencies inside the table, including tabulated ones and points between them.
fn in_range_frequencies() -> Vec<f64> {
    let mut freqs = log_spaced_frequencies(20.0, 20000.0, 61).unwrap();
    freqs.extend(ContourTable::bundled().points().iter().map(|p| p.frequency));
    freqs
}

fn phon_steps() -> impl Iterator<Item = f64> {
    (0..=200).map(|i| i as f64 * 0.5)
}

#[test]
fn tabulated_points_are_returned_exactly() {
    let table = ContourTable::bundled();
    for point in table.points() {
        for (&phon, &level) in &point.levels {
            assert_eq!(
                level_on_contour(point.frequency, phon).unwrap(),
                level,
                "{} Hz, {} phon",
                point.frequency,
                phon
            );
            assert_eq!(decibel_for_phon(point.frequency, phon as f64).unwrap(), level);
        }
    }
}

#[test]
fn phon_to_decibel_round_trips() {
    for f in in_range_frequencies() {
        for phon in phon_steps() {
            let db = decibel_for_phon(f, phon).unwrap();
            let back = phon_for_decibel(f, db).unwrap();
            assert_abs_diff_eq!(back, phon, epsilon = 1e-6);
        }
    }
}

#[test]
fn decibel_for_phon_is_monotonic() {
    for f in in_range_frequencies() {
        let mut previous = f64::NEG_INFINITY;
        for phon in phon_steps() {
            let db = decibel_for_phon(f, phon).unwrap();
            assert!(db >= previous, "{f} Hz: {db} dB at {phon} phon after {previous}");
            previous = db;
        }
    }
}

#[test]
fn edges_hold_flat() {
    for &phon in ContourTable::bundled().phon_indices() {
        assert_eq!(
            level_on_contour(19.0, phon).unwrap(),
            level_on_contour(20.0, phon).unwrap()
        );
        assert_eq!(
            level_on_contour(1.0, phon).unwrap(),
            level_on_contour(20.0, phon).unwrap()
        );
        assert_eq!(
            level_on_contour(96000.0, phon).unwrap(),
            level_on_contour(20000.0, phon).unwrap()
        );
    }
}

#[test]
fn reference_scenarios() {
    assert_eq!(decibel_for_phon(1000.0, 60.0).unwrap(), 60.0);
    assert_eq!(decibel_for_phon(1000.0, 50.0).unwrap(), 50.0);
    assert_eq!(phon_for_decibel(1000.0, 60.0).unwrap(), 60.0);
    assert_eq!(decibel_for_phon(20.0, 0.0).unwrap(), 74.0);
    assert_eq!(decibel_for_phon(20.0, 100.0).unwrap(), 141.0);
    assert_eq!(
        decibel_for_phon(25000.0, 60.0).unwrap(),
        decibel_for_phon(20000.0, 60.0).unwrap()
    );
}

#[test]
fn custom_table_from_json() {
    let json = r#"[
        {"frequency": 50, "0": 40, "30": 70, "60": 95},
        {"frequency": 500, "0": 5, "30": 32, "60": 62},
        {"frequency": 5000, "0": 0, "30": 28, "60": 58}
    ]"#;
    let table = ContourTable::from_json_str(json).unwrap();
    assert_eq!(table.decibel_for_phon(500.0, 45.0).unwrap(), 47.0);
    assert_eq!(table.phon_for_decibel(5000.0, 28.0).unwrap(), 30.0);
    assert_eq!(table.decibel_for_phon(10.0, 60.0).unwrap(), 95.0);
}
