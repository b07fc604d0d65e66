//! # Loudness - Equal-Loudness Explorer
//!
//! Command-line front end for the loudness core. Converts between dB SPL and
//! phon, prints contour sweeps, describes points in words, and plays tones.
//!
//! ## Usage
//!
//! ```text
//! loudness phon --frequency 100 --level 70
//! loudness level --frequency 100 --phon 60
//! loudness sweep --points 12 --marker 440
//! loudness play --frequency 63 --phon 40 --seconds 3
//! loudness explore
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`.

mod explore;
mod probe;
mod sweep;

use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use loudness_core::audio::{ToneSession, STOP_TIME_CONSTANT};
use loudness_core::insight::{insight_or_fallback, ContourInsight};
use loudness_core::loudness::log_spaced_frequencies;
use loudness_core::ContourTable;

use explore::{DevicePlayer, Explorer};
use probe::{MAX_FREQUENCY, MIN_FREQUENCY};

#[derive(Parser, Debug)]
#[command(name = "loudness")]
#[command(about = "Explore equal-loudness contours.", long_about = None)]
struct Cli {
    /// JSON contour table to use instead of the bundled one
    #[arg(long, global = true, value_name = "PATH")]
    table: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Loudness in phon of a tone at a given level
    Phon(PhonArgs),
    /// Level in dB SPL needed to reach a given loudness
    Level(LevelArgs),
    /// Print contour levels across the audible range
    Sweep(SweepArgs),
    /// Describe what a listener hears at a point
    Insight(PhonArgs),
    /// Play a tone through the default output device
    Play(PlayArgs),
    /// Print the contour table as JSON
    Table,
    /// Interactive session with an equal-loudness lock
    Explore,
}

#[derive(Args, Debug)]
struct PhonArgs {
    /// Frequency in Hz
    #[arg(long, short)]
    frequency: f64,
    /// Sound-pressure level in dB SPL
    #[arg(long, short, allow_negative_numbers = true)]
    level: f64,
}

#[derive(Args, Debug)]
struct LevelArgs {
    /// Frequency in Hz
    #[arg(long, short)]
    frequency: f64,
    /// Loudness in phon
    #[arg(long, short, allow_negative_numbers = true)]
    phon: f64,
}

#[derive(Args, Debug)]
struct SweepArgs {
    /// Contours to print; defaults to the table's own
    #[arg(long, short, num_args = 1..)]
    phon: Vec<f64>,
    /// Number of log-spaced frequencies
    #[arg(long, default_value_t = 24)]
    points: usize,
    /// Frequency to flag, e.g. the one being listened to
    #[arg(long)]
    marker: Option<f64>,
}

#[derive(Args, Debug)]
struct PlayArgs {
    /// Frequency in Hz
    #[arg(long, short)]
    frequency: f64,
    /// Level in dB SPL
    #[arg(
        long,
        short,
        allow_negative_numbers = true,
        conflicts_with = "phon",
        required_unless_present = "phon"
    )]
    level: Option<f64>,
    /// Loudness in phon; the level is derived from the contours
    #[arg(long, short, allow_negative_numbers = true)]
    phon: Option<f64>,
    /// How long to play
    #[arg(long, default_value_t = 2.0)]
    seconds: f64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let loaded;
    let table = match &cli.table {
        Some(path) => {
            loaded = ContourTable::load(path)?;
            &loaded
        }
        None => ContourTable::bundled(),
    };

    match cli.command {
        Command::Phon(args) => {
            let phon = table.phon_for_decibel(args.frequency, args.level)?;
            println!("{phon:.2}");
        }
        Command::Level(args) => {
            let db = table.decibel_for_phon(args.frequency, args.phon)?;
            println!("{db:.2}");
        }
        Command::Sweep(args) => cmd_sweep(table, args)?,
        Command::Insight(args) => {
            let reading = table.read(args.frequency, args.level)?;
            let insight = ContourInsight::new(table);
            println!("{}", insight_or_fallback(&insight, &reading));
        }
        Command::Play(args) => cmd_play(table, args)?,
        Command::Table => println!("{}", table.to_json_string()?),
        Command::Explore => {
            let mut explorer = Explorer::new(table, DevicePlayer::default());
            explorer.run(io::stdin().lock(), io::stdout().lock())?;
        }
    }

    Ok(())
}

fn cmd_sweep(table: &ContourTable, args: SweepArgs) -> Result<()> {
    let phons = if args.phon.is_empty() {
        table.phon_indices().iter().map(|&p| f64::from(p)).collect()
    } else {
        args.phon
    };
    let frequencies = log_spaced_frequencies(MIN_FREQUENCY, MAX_FREQUENCY, args.points)?;
    print!("{}", sweep::render_sweep(table, &phons, &frequencies, args.marker)?);
    Ok(())
}

fn cmd_play(table: &ContourTable, args: PlayArgs) -> Result<()> {
    let level = match (args.level, args.phon) {
        (Some(level), _) => level,
        (None, Some(phon)) => table.decibel_for_phon(args.frequency, phon)?,
        (None, None) => bail!("either --level or --phon is required"),
    };
    let duration = Duration::try_from_secs_f64(args.seconds)
        .with_context(|| format!("invalid duration {}", args.seconds))?;

    println!(
        "Playing {:.1} Hz at {:.1} dB SPL ({:.1} phon)",
        args.frequency,
        level,
        table.phon_for_decibel(args.frequency, level)?
    );
    let session = ToneSession::start(args.frequency, level)?;
    thread::sleep(duration);
    session.stop();
    // Let the fade finish before the stream closes.
    thread::sleep(Duration::from_secs_f32(STOP_TIME_CONSTANT * 5.0));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_levels_parse_everywhere() {
        let cli = Cli::try_parse_from(["loudness", "play", "-f", "1000", "--level", "-5"]).unwrap();
        match cli.command {
            Command::Play(args) => assert_eq!(args.level, Some(-5.0)),
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from(["loudness", "play", "-f", "1000", "-p", "-10"]).unwrap();
        match cli.command {
            Command::Play(args) => assert_eq!(args.phon, Some(-10.0)),
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from(["loudness", "phon", "-f", "1000", "-l", "-5"]).unwrap();
        assert!(matches!(cli.command, Command::Phon(PhonArgs { level, .. }) if level == -5.0));
    }

    #[test]
    fn play_needs_level_or_phon() {
        assert!(Cli::try_parse_from(["loudness", "play", "-f", "1000"]).is_err());
        assert!(
            Cli::try_parse_from(["loudness", "play", "-f", "1000", "-l", "60", "-p", "60"]).is_err()
        );
    }
}
