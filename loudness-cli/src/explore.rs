//! # Interactive Explorer
//!
//! A line-oriented session over stdin. Each line is parsed into a [`Message`],
//! applied to the [`Probe`], and answered with the probe's current status.
//! While the tone is on, every change is forwarded to the player.

use std::io::{BufRead, Write};

use anyhow::{anyhow, bail, Result};
use loudness_core::audio::ToneSession;
use loudness_core::insight::{insight_or_fallback, ContourInsight};
use loudness_core::ContourTable;

use crate::probe::Probe;

pub const HELP: &str = "\
commands:
  f <Hz>     move the probe to a frequency
  db <dB>    set the level in dB SPL
  lock       toggle equal-loudness mode
  play       start the tone
  stop       stop the tone
  show       print the probe
  insight    describe what is heard at the probe
  help       print this help
  quit       leave";

/// Something that can sound the probe.
pub trait TonePlayer {
    fn play(&mut self, frequency: f64, decibel_level: f64) -> Result<()>;
    fn stop(&mut self);
}

/// Plays through the default output device. The device is opened on the
/// first `play` and held until the player is dropped.
#[derive(Default)]
pub struct DevicePlayer {
    session: Option<ToneSession>,
}

impl TonePlayer for DevicePlayer {
    fn play(&mut self, frequency: f64, decibel_level: f64) -> Result<()> {
        match &self.session {
            Some(session) => session.update(frequency, decibel_level),
            None => {
                self.session = Some(ToneSession::start(frequency, decibel_level)?);
                Ok(())
            }
        }
    }

    fn stop(&mut self) {
        if let Some(session) = &self.session {
            session.stop();
        }
    }
}

/// User actions in the explorer.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    SetFrequency(f64),
    SetLevel(f64),
    ToggleEqualLoudness,
    Play,
    Stop,
    Show,
    Insight,
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_message(line: &str) -> Result<Option<Message>> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let mut value = || -> Result<f64> {
        let word = words
            .next()
            .ok_or_else(|| anyhow!("'{command}' needs a value"))?;
        word.parse::<f64>()
            .map_err(|_| anyhow!("'{word}' is not a number"))
    };

    let message = match command.to_ascii_lowercase().as_str() {
        "f" | "freq" | "frequency" => Message::SetFrequency(value()?),
        "db" | "level" => Message::SetLevel(value()?),
        "lock" => Message::ToggleEqualLoudness,
        "play" => Message::Play,
        "stop" => Message::Stop,
        "show" => Message::Show,
        "insight" => Message::Insight,
        "help" | "?" => Message::Help,
        "quit" | "exit" | "q" => Message::Quit,
        other => bail!("unknown command '{other}' (try 'help')"),
    };
    Ok(Some(message))
}

pub struct Explorer<'a, P: TonePlayer> {
    table: &'a ContourTable,
    probe: Probe,
    playing: bool,
    player: P,
}

impl<'a, P: TonePlayer> Explorer<'a, P> {
    pub fn new(table: &'a ContourTable, player: P) -> Self {
        Self {
            table,
            probe: Probe::default(),
            playing: false,
            player,
        }
    }

    pub fn probe(&self) -> &Probe {
        &self.probe
    }

    /// Applies a message and returns the text to show for it, or `None` to quit.
    pub fn update(&mut self, message: Message) -> Result<Option<String>> {
        match message {
            Message::SetFrequency(f) => {
                self.probe.set_frequency(self.table, f)?;
                self.sync_tone()?;
            }
            Message::SetLevel(db) => {
                self.probe.set_level(self.table, db)?;
                self.sync_tone()?;
            }
            Message::ToggleEqualLoudness => {
                self.probe.toggle_equal_loudness(self.table)?;
                self.sync_tone()?;
            }
            Message::Play => {
                self.playing = true;
                if let Err(e) = self.sync_tone() {
                    self.playing = false;
                    return Err(e);
                }
            }
            Message::Stop => {
                self.playing = false;
                self.player.stop();
            }
            Message::Show => {}
            Message::Insight => {
                let insight = ContourInsight::new(self.table);
                return Ok(Some(insight_or_fallback(&insight, &self.probe.reading())));
            }
            Message::Help => return Ok(Some(HELP.to_string())),
            Message::Quit => {
                self.player.stop();
                return Ok(None);
            }
        }
        Ok(Some(self.status()))
    }

    /// One-line summary of the probe.
    pub fn status(&self) -> String {
        format!(
            "{:.1} Hz  {:.1} dB SPL  {:.1} phon  lock:{}  tone:{}",
            self.probe.frequency,
            self.probe.decibel_level,
            self.probe.target_phon,
            if self.probe.equal_loudness { "on" } else { "off" },
            if self.playing { "on" } else { "off" },
        )
    }

    fn sync_tone(&mut self) -> Result<()> {
        if self.playing {
            self.player
                .play(self.probe.frequency, self.probe.decibel_level)?;
        }
        Ok(())
    }

    /// Runs the session until `quit` or end of input. Bad lines are reported
    /// and the session continues.
    pub fn run(&mut self, input: impl BufRead, mut output: impl Write) -> Result<()> {
        writeln!(output, "{}", self.status())?;
        for line in input.lines() {
            let line = line?;
            let reply = match parse_message(&line) {
                Ok(None) => continue,
                Ok(Some(message)) => self.update(message),
                Err(e) => Err(e),
            };
            match reply {
                Ok(Some(text)) => writeln!(output, "{text}")?,
                Ok(None) => return Ok(()),
                Err(e) => writeln!(output, "error: {e:#}")?,
            }
        }
        self.player.stop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingPlayer {
        played: Vec<(f64, f64)>,
        stops: usize,
    }

    impl TonePlayer for RecordingPlayer {
        fn play(&mut self, frequency: f64, decibel_level: f64) -> Result<()> {
            self.played.push((frequency, decibel_level));
            Ok(())
        }

        fn stop(&mut self) {
            self.stops += 1;
        }
    }

    struct NoDevice;

    impl TonePlayer for NoDevice {
        fn play(&mut self, _frequency: f64, _decibel_level: f64) -> Result<()> {
            Err(anyhow!("No output device available"))
        }

        fn stop(&mut self) {}
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_message("f 440").unwrap(), Some(Message::SetFrequency(440.0)));
        assert_eq!(parse_message("  DB 72.5 ").unwrap(), Some(Message::SetLevel(72.5)));
        assert_eq!(parse_message("lock").unwrap(), Some(Message::ToggleEqualLoudness));
        assert_eq!(parse_message("").unwrap(), None);
        assert!(parse_message("f").is_err());
        assert!(parse_message("f loud").is_err());
        assert!(parse_message("jump").is_err());
    }

    #[test]
    fn changes_are_forwarded_only_while_playing() {
        let table = ContourTable::bundled();
        let mut explorer = Explorer::new(table, RecordingPlayer::default());
        explorer.update(Message::SetFrequency(500.0)).unwrap();
        assert!(explorer.player.played.is_empty());

        explorer.update(Message::Play).unwrap();
        explorer.update(Message::SetLevel(70.0)).unwrap();
        explorer.update(Message::Stop).unwrap();
        explorer.update(Message::SetLevel(75.0)).unwrap();

        assert_eq!(explorer.player.played, vec![(500.0, 60.0), (500.0, 70.0)]);
        assert_eq!(explorer.player.stops, 1);
    }

    #[test]
    fn failed_playback_turns_tone_off() {
        let mut explorer = Explorer::new(ContourTable::bundled(), NoDevice);
        assert!(explorer.update(Message::Play).is_err());
        assert!(explorer.status().ends_with("tone:off"));
        assert!(explorer.update(Message::SetLevel(50.0)).is_ok());
    }

    #[test]
    fn runs_a_scripted_session() {
        let script = "f 20\nlock\nbogus\n\nf 1000\nquit\nf 500\n";
        let mut output = Vec::new();
        let mut explorer = Explorer::new(ContourTable::bundled(), RecordingPlayer::default());
        explorer.run(script.as_bytes(), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "1000.0 Hz  60.0 dB SPL  60.0 phon  lock:off  tone:off");
        assert_eq!(lines[1], "20.0 Hz  60.0 dB SPL  0.0 phon  lock:off  tone:off");
        assert_eq!(lines[2], "20.0 Hz  118.0 dB SPL  60.0 phon  lock:on  tone:off");
        assert!(lines[3].starts_with("error: unknown command 'bogus'"));
        assert_eq!(lines[4], "1000.0 Hz  60.0 dB SPL  60.0 phon  lock:on  tone:off");
        assert_eq!(lines.len(), 5);
        assert_eq!(explorer.probe().frequency, 1000.0);
        assert_eq!(explorer.player.stops, 1);
    }
}
