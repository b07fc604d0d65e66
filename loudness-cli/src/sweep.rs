//! # Contour Sweep
//!
//! Text rendering of the equal-loudness chart: one row per frequency, one
//! column per contour, with an optional marker row for the probe frequency.

use loudness_core::{ContourTable, Result};

/// Renders the contours for `phons` sampled at `frequencies`.
///
/// When `marker` is given, a row for that frequency is inserted in order and
/// flagged with `<`.
pub fn render_sweep(
    table: &ContourTable,
    phons: &[f64],
    frequencies: &[f64],
    marker: Option<f64>,
) -> Result<String> {
    let mut rows: Vec<(f64, bool)> = frequencies.iter().map(|&f| (f, false)).collect();
    if let Some(marker) = marker {
        let at = rows.partition_point(|&(f, _)| f < marker);
        rows.insert(at, (marker, true));
    }

    let freqs: Vec<f64> = rows.iter().map(|&(f, _)| f).collect();
    let curves = phons
        .iter()
        .map(|&phon| table.contour(phon, &freqs))
        .collect::<Result<Vec<_>>>()?;

    let mut out = format!("{:>9}", "Hz");
    for phon in phons {
        out.push_str(&format!(" {:>9}", format!("{phon} phon")));
    }
    out.push('\n');

    for (row, &(frequency, is_marker)) in rows.iter().enumerate() {
        out.push_str(&format!("{frequency:>9.1}"));
        for curve in &curves {
            out.push_str(&format!(" {:>9.1}", curve[row].1));
        }
        if is_marker {
            out.push_str("  <");
        }
        out.push('\n');
    }
    Ok(out)
}
