//! Line-oriented shell loop coordinating stdin, capture pumping, and job polls.
//!
//! A reader thread forwards stdin lines over a channel; the main thread
//! services it with a short receive timeout and uses the timeout tick to pump
//! capture frames and poll background answer/transcription jobs.

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use medivox::config::{AppConfig, VoiceSendMode, DEFAULT_VITALS_DAYS, MAX_VITALS_DAYS};
use medivox::gateway::{HttpSpeechGateway, SpeechGateway};
use medivox::vitals::{VitalsClient, VitalsRecord};
use medivox::{
    log_debug, ChatSession, SessionEvent, SubmitOutcome, ToggleOutcome, VoiceController,
    VoiceEvent, VoicePhase,
};
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

use crate::render::{format_answer, format_meter_bar, format_vitals_record, format_vitals_summary};

/// Tick used to pump capture frames and poll background jobs.
const SHELL_TICK_MS: u64 = 50;

/// Max pending stdin lines before the reader thread blocks.
const INPUT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, PartialEq)]
pub(crate) enum ShellCommand {
    Submit(String),
    Voice,
    Reset,
    Vitals(VitalsCommand),
    Help,
    Quit,
    Empty,
    Unknown(String),
    Invalid(String),
}

#[derive(Debug, PartialEq)]
pub(crate) enum VitalsCommand {
    Latest,
    History(u32),
    Summary,
    Record(VitalsRecord),
    Mock(u32),
}

pub(crate) struct Shell {
    config: AppConfig,
    session: ChatSession,
    voice: Option<VoiceController>,
    vitals: VitalsClient,
    speech: Option<HttpSpeechGateway>,
    /// Transcript staged for confirmation under the `insert` send mode.
    pending_voice: Option<String>,
    quit: bool,
}

impl Shell {
    pub(crate) fn new(
        config: AppConfig,
        session: ChatSession,
        voice: Option<VoiceController>,
        vitals: VitalsClient,
        speech: Option<HttpSpeechGateway>,
    ) -> Self {
        Self {
            config,
            session,
            voice,
            vitals,
            speech,
            pending_voice: None,
            quit: false,
        }
    }

    /// Whether the shell is waiting on background work rather than the user.
    fn busy(&self) -> bool {
        self.session.is_awaiting_answer()
            || self
                .voice
                .as_ref()
                .map_or(false, |voice| voice.phase() == VoicePhase::Transcribing)
    }

    /// Current input level while a capture window is open.
    fn capture_level(&self) -> Option<f32> {
        self.voice
            .as_ref()
            .filter(|voice| voice.is_recording())
            .map(|voice| voice.meter().level_db())
    }

    fn handle_line(&mut self, line: &str) {
        match parse_command(line) {
            ShellCommand::Empty => {
                // A bare Enter confirms a staged transcript; otherwise ignore.
                if let Some(staged) = self.pending_voice.take() {
                    self.submit(&staged, true);
                }
            }
            ShellCommand::Submit(text) => {
                self.pending_voice = None;
                self.submit(&text, false);
            }
            ShellCommand::Voice => self.toggle_voice(),
            ShellCommand::Reset => self.reset(),
            ShellCommand::Vitals(command) => self.run_vitals(command),
            ShellCommand::Help => print_help(),
            ShellCommand::Quit => self.quit = true,
            ShellCommand::Unknown(token) => {
                notice(&format!("unknown command {token}, :help lists commands"));
            }
            ShellCommand::Invalid(message) => notice(&message),
        }
    }

    fn submit(&mut self, text: &str, echo: bool) {
        match self.session.submit(text) {
            SubmitOutcome::Accepted => {
                if echo {
                    println!("you> {}", text.trim());
                }
                println!("thinking...");
            }
            SubmitOutcome::Busy => notice("still waiting on the previous answer"),
            SubmitOutcome::RejectedEmpty => {}
        }
    }

    fn toggle_voice(&mut self) {
        let Some(voice) = self.voice.as_mut() else {
            notice("voice input is unavailable");
            return;
        };
        if self.pending_voice.take().is_some() {
            notice("staged transcript discarded");
        }
        match voice.toggle() {
            ToggleOutcome::Started => println!("recording... (:voice to stop)"),
            ToggleOutcome::Stopped => println!("transcribing..."),
            ToggleOutcome::DiscardedShort => notice("capture too short, discarded"),
            ToggleOutcome::Ignored => notice("still transcribing the previous capture"),
            ToggleOutcome::Failed(message) => eprintln!("voice error: {message}"),
        }
    }

    fn reset(&mut self) {
        self.pending_voice = None;
        self.session.reset();
        if let Some(greeting) = self.session.transcript().first() {
            println!("assistant> {}", greeting.text);
        }
    }

    fn run_vitals(&mut self, command: VitalsCommand) {
        let outcome = match command {
            VitalsCommand::Latest => self.vitals.latest().map(|record| match record {
                Some(record) => format_vitals_record(&record),
                None => "no vitals recorded yet".to_string(),
            }),
            VitalsCommand::History(days) => self.vitals.history(days).map(|records| {
                if records.is_empty() {
                    format!("no vitals in the last {days} days")
                } else {
                    records
                        .iter()
                        .map(format_vitals_record)
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }),
            VitalsCommand::Summary => self
                .vitals
                .summary()
                .map(|summary| format_vitals_summary(&summary)),
            VitalsCommand::Record(record) => self
                .vitals
                .record(&record)
                .map(|()| "vitals recorded".to_string()),
            VitalsCommand::Mock(days) => self
                .vitals
                .generate_mock(days)
                .map(|()| format!("generated {days} days of demo vitals")),
        };
        match outcome {
            Ok(text) => println!("{text}"),
            Err(err) => eprintln!("vitals error: {err}"),
        }
    }

    fn tick(&mut self) {
        let mut voice_event = None;
        if let Some(voice) = self.voice.as_mut() {
            voice.pump();
            voice_event = voice.poll();
        }
        if let Some(event) = voice_event {
            self.handle_voice_event(event);
        }
        while let Some(event) = self.session.poll() {
            self.handle_session_event(event);
        }
    }

    fn handle_voice_event(&mut self, event: VoiceEvent) {
        match event {
            VoiceEvent::Transcript(text) => match self.config.voice_send_mode {
                VoiceSendMode::Auto => self.submit(&text, true),
                VoiceSendMode::Insert => {
                    println!("voice> {text}");
                    notice("press Enter to send, type to replace, :voice to redo");
                    self.pending_voice = Some(text);
                }
            },
            VoiceEvent::Empty => notice("no speech detected"),
            VoiceEvent::Error(message) => eprintln!("voice error: {message}"),
        }
    }

    fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Answered { utterance_id } => {
                let rendered = self
                    .session
                    .transcript()
                    .iter()
                    .rev()
                    .find(|utterance| utterance.id == utterance_id)
                    .map(format_answer);
                if let Some(text) = rendered {
                    println!("{text}");
                }
                if self.speech.is_some() {
                    self.speak_reply(utterance_id);
                }
            }
            SessionEvent::Failed { message } => eprintln!("error: {message}"),
        }
    }

    /// Synthesize the answer to an audio file and print where it landed.
    fn speak_reply(&mut self, utterance_id: u64) {
        let Some(speech) = self.speech.as_ref() else {
            return;
        };
        let Some(text) = self
            .session
            .transcript()
            .iter()
            .rev()
            .find(|utterance| utterance.id == utterance_id)
            .map(|utterance| utterance.text.clone())
        else {
            return;
        };
        match speech.synthesize(&text) {
            Ok(bytes) if bytes.is_empty() => {}
            Ok(bytes) => {
                let path = std::env::temp_dir().join(format!("medivox_reply_{utterance_id}.mp3"));
                match std::fs::write(&path, bytes) {
                    Ok(()) => println!("(spoken reply saved to {})", path.display()),
                    Err(err) => eprintln!("could not save spoken reply: {err}"),
                }
            }
            Err(err) => eprintln!("speech error: {err}"),
        }
    }
}

pub(crate) fn run_shell(shell: &mut Shell) {
    if let Some(greeting) = shell.session.transcript().first() {
        println!("assistant> {}", greeting.text);
    }
    print_prompt();

    let (line_tx, line_rx) = bounded(INPUT_CHANNEL_CAPACITY);
    let _input_handle = spawn_input_thread(line_tx);

    let tick = Duration::from_millis(SHELL_TICK_MS);
    let mut stdin_open = true;
    let mut meter_shown = false;
    loop {
        let was_busy = shell.busy();
        let mut handled_line = false;
        match line_rx.recv_timeout(tick) {
            Ok(line) => {
                if meter_shown {
                    println!();
                    meter_shown = false;
                }
                shell.handle_line(&line);
                handled_line = true;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                if stdin_open {
                    stdin_open = false;
                    log_debug("stdin closed, draining pending work");
                }
                if !shell.busy() {
                    break;
                }
                thread::sleep(tick);
            }
        }
        if shell.quit {
            break;
        }
        shell.tick();
        match shell.capture_level() {
            Some(level) if stdin_open => {
                print!("\r{} ", format_meter_bar(level));
                let _ = io::stdout().flush();
                meter_shown = true;
            }
            _ => {
                if meter_shown {
                    println!();
                    meter_shown = false;
                }
            }
        }
        let now_busy = shell.busy();
        if stdin_open && !now_busy && (was_busy || handled_line) {
            print_prompt();
        }
    }
}

fn spawn_input_thread(tx: Sender<String>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        return;
                    }
                }
                Err(err) => {
                    log_debug(&format!("stdin read error: {err}"));
                    return;
                }
            }
        }
    })
}

fn print_prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

fn notice(message: &str) {
    println!("({message})");
}

fn print_help() {
    println!("commands:");
    println!("  :voice                 start or stop voice capture");
    println!("  :reset                 start a fresh conversation");
    println!("  :vitals                latest recorded vitals");
    println!("  :vitals history [N]    vitals from the last N days");
    println!("  :vitals summary        alerts and 30-day averages");
    println!("  :vitals record k=v...  store a measurement (hr, bp, glucose, temp, spo2, weight)");
    println!("  :vitals mock [N]       generate N days of demo vitals");
    println!("  :quit                  exit");
    println!("anything else is sent to the assistant");
}

pub(crate) fn parse_command(line: &str) -> ShellCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ShellCommand::Empty;
    }
    if !trimmed.starts_with(':') {
        return ShellCommand::Submit(trimmed.to_string());
    }
    let mut words = trimmed[1..].split_whitespace();
    let keyword = words.next().unwrap_or("").to_ascii_lowercase();
    let rest: Vec<&str> = words.collect();
    match keyword.as_str() {
        "voice" | "v" => ShellCommand::Voice,
        "reset" => ShellCommand::Reset,
        "vitals" => parse_vitals_command(&rest),
        "help" | "h" | "?" => ShellCommand::Help,
        "quit" | "q" | "exit" => ShellCommand::Quit,
        other => ShellCommand::Unknown(format!(":{other}")),
    }
}

fn parse_vitals_command(args: &[&str]) -> ShellCommand {
    let command = match args.first().map(|word| word.to_ascii_lowercase()) {
        None => VitalsCommand::Latest,
        Some(sub) => match sub.as_str() {
            "history" => match parse_days(args.get(1)) {
                Ok(days) => VitalsCommand::History(days),
                Err(message) => return ShellCommand::Invalid(message),
            },
            "summary" => VitalsCommand::Summary,
            "record" => match parse_vitals_entry(&args[1..]) {
                Ok(record) => VitalsCommand::Record(record),
                Err(message) => return ShellCommand::Invalid(message),
            },
            "mock" => match parse_days(args.get(1)) {
                Ok(days) => VitalsCommand::Mock(days),
                Err(message) => return ShellCommand::Invalid(message),
            },
            other => return ShellCommand::Unknown(format!(":vitals {other}")),
        },
    };
    ShellCommand::Vitals(command)
}

fn parse_days(arg: Option<&&str>) -> Result<u32, String> {
    let Some(raw) = arg else {
        return Ok(DEFAULT_VITALS_DAYS);
    };
    match raw.parse::<u32>() {
        Ok(days) if (1..=MAX_VITALS_DAYS).contains(&days) => Ok(days),
        _ => Err(format!(
            "days must be a number between 1 and {MAX_VITALS_DAYS}"
        )),
    }
}

fn parse_vitals_entry(args: &[&str]) -> Result<VitalsRecord, String> {
    if args.is_empty() {
        return Err(
            "usage: :vitals record hr=72 bp=120/80 glucose=95 temp=36.6 spo2=98 weight=70.5"
                .to_string(),
        );
    }
    let mut record = VitalsRecord::default();
    for pair in args {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(format!("expected key=value, got '{pair}'"));
        };
        match key.to_ascii_lowercase().as_str() {
            "hr" | "heart_rate" => record.heart_rate = Some(parse_reading(key, value)?),
            "bp" => {
                let Some((sys, dia)) = value.split_once('/') else {
                    return Err(format!("bp wants systolic/diastolic, got '{value}'"));
                };
                record.blood_pressure_systolic = Some(parse_reading("bp", sys)?);
                record.blood_pressure_diastolic = Some(parse_reading("bp", dia)?);
            }
            "glucose" => record.blood_glucose = Some(parse_fractional(key, value)?),
            "temp" | "temperature" => record.temperature = Some(parse_fractional(key, value)?),
            "spo2" | "oxygen" => record.oxygen_saturation = Some(parse_reading(key, value)?),
            "weight" => record.weight = Some(parse_fractional(key, value)?),
            other => return Err(format!("unknown vitals field '{other}'")),
        }
    }
    Ok(record)
}

fn parse_reading(key: &str, value: &str) -> Result<i64, String> {
    value
        .parse::<u32>()
        .map(i64::from)
        .map_err(|_| format!("{key} wants a whole number, got '{value}'"))
}

fn parse_fractional(key: &str, value: &str) -> Result<f64, String> {
    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() && parsed >= 0.0 => Ok(parsed),
        _ => Err(format!("{key} wants a non-negative number, got '{value}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_becomes_a_submission() {
        assert_eq!(
            parse_command("  what causes migraines?  "),
            ShellCommand::Submit("what causes migraines?".to_string())
        );
    }

    #[test]
    fn blank_lines_are_empty() {
        assert_eq!(parse_command(""), ShellCommand::Empty);
        assert_eq!(parse_command("   "), ShellCommand::Empty);
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(parse_command(":VOICE"), ShellCommand::Voice);
        assert_eq!(parse_command(":Reset"), ShellCommand::Reset);
        assert_eq!(parse_command(" :quit "), ShellCommand::Quit);
        assert_eq!(parse_command(":q"), ShellCommand::Quit);
    }

    #[test]
    fn unknown_commands_are_reported() {
        assert_eq!(
            parse_command(":frobnicate"),
            ShellCommand::Unknown(":frobnicate".to_string())
        );
    }

    #[test]
    fn bare_vitals_fetches_the_latest() {
        assert_eq!(
            parse_command(":vitals"),
            ShellCommand::Vitals(VitalsCommand::Latest)
        );
    }

    #[test]
    fn vitals_history_defaults_its_window() {
        assert_eq!(
            parse_command(":vitals history"),
            ShellCommand::Vitals(VitalsCommand::History(DEFAULT_VITALS_DAYS))
        );
        assert_eq!(
            parse_command(":vitals history 7"),
            ShellCommand::Vitals(VitalsCommand::History(7))
        );
    }

    #[test]
    fn vitals_history_rejects_out_of_range_days() {
        assert!(matches!(
            parse_command(":vitals history 0"),
            ShellCommand::Invalid(_)
        ));
        assert!(matches!(
            parse_command(":vitals history 9999"),
            ShellCommand::Invalid(_)
        ));
    }

    #[test]
    fn vitals_mock_and_summary_parse() {
        assert_eq!(
            parse_command(":vitals summary"),
            ShellCommand::Vitals(VitalsCommand::Summary)
        );
        assert_eq!(
            parse_command(":vitals mock 14"),
            ShellCommand::Vitals(VitalsCommand::Mock(14))
        );
    }

    #[test]
    fn vitals_record_parses_key_value_pairs() {
        let command = parse_command(":vitals record hr=72 bp=120/80 temp=36.6");
        let ShellCommand::Vitals(VitalsCommand::Record(record)) = command else {
            panic!("expected a record command, got {command:?}");
        };
        assert_eq!(record.heart_rate, Some(72));
        assert_eq!(record.blood_pressure_systolic, Some(120));
        assert_eq!(record.blood_pressure_diastolic, Some(80));
        assert_eq!(record.temperature, Some(36.6));
        assert_eq!(record.blood_glucose, None);
    }

    #[test]
    fn vitals_record_rejects_malformed_pairs() {
        assert!(matches!(
            parse_command(":vitals record"),
            ShellCommand::Invalid(_)
        ));
        assert!(matches!(
            parse_command(":vitals record hr=abc"),
            ShellCommand::Invalid(_)
        ));
        assert!(matches!(
            parse_command(":vitals record pulse=72"),
            ShellCommand::Invalid(_)
        ));
        assert!(matches!(
            parse_command(":vitals record bp=120"),
            ShellCommand::Invalid(_)
        ));
    }

    #[test]
    fn unknown_vitals_subcommands_are_reported() {
        assert_eq!(
            parse_command(":vitals export"),
            ShellCommand::Unknown(":vitals export".to_string())
        );
    }

    #[test]
    fn negative_readings_are_rejected() {
        assert!(parse_reading("hr", "-5").is_err());
        assert!(parse_fractional("temp", "-1.0").is_err());
        assert!(parse_fractional("temp", "nan").is_err());
    }
}
