//! MediVox client entrypoint wiring config, gateways, and the line shell.
//!
//! # Architecture
//!
//! - Reader thread: forwards stdin lines so the loop never blocks on input
//! - Main thread: services commands, pumps capture frames, polls job results
//! - Answer/transcription workers: one short-lived thread per gateway call

mod banner;
mod cli_utils;
mod event_loop;
mod render;

use anyhow::Result;
use clap::Parser;
use medivox::audio::Recorder;
use medivox::config::AppConfig;
use medivox::doctor::base_doctor_report;
use medivox::gateway::{
    AnswerGateway, HttpAnswerGateway, HttpSpeechGateway, HttpTranscriptionGateway,
    TranscriptionGateway,
};
use medivox::vitals::VitalsClient;
use medivox::{init_logging, init_tracing, log_debug, log_file_path, ChatSession, VoiceController};
use std::sync::Arc;

use crate::banner::show_banner;
use crate::cli_utils::{install_panic_hook, list_input_devices};
use crate::event_loop::{run_shell, Shell};

fn main() -> Result<()> {
    let mut config = AppConfig::parse();
    if config.doctor {
        let report = base_doctor_report(&config, "medivox");
        println!("{}", report.render());
        return Ok(());
    }
    if config.list_input_devices {
        list_input_devices();
        return Ok(());
    }

    config.validate()?;
    init_logging(&config);
    let trace_file = init_tracing(&config);
    install_panic_hook();
    log_debug("=== MediVox Client Started ===");
    log_debug(&format!("Log file: {:?}", log_file_path()));
    if let Some(path) = trace_file {
        log_debug(&format!("Trace file: {path:?}"));
    }

    let gateway_config = config.gateway_config();
    let answers: Arc<dyn AnswerGateway> = Arc::new(HttpAnswerGateway::new(&gateway_config)?);
    let session = ChatSession::new(answers, config.use_cache());
    let vitals = VitalsClient::new(&gateway_config, &config.subject)?;
    let speech = if config.speak_replies {
        Some(HttpSpeechGateway::new(&gateway_config)?)
    } else {
        None
    };

    // Chat still works without a microphone; voice commands report why not.
    let voice = match Recorder::new(config.input_device.as_deref()) {
        Ok(recorder) => {
            let transcription: Arc<dyn TranscriptionGateway> =
                Arc::new(HttpTranscriptionGateway::new(&gateway_config)?);
            Some(VoiceController::new(
                recorder,
                transcription,
                config.voice_min_payload_ms,
                config.voice_channel_capacity,
            ))
        }
        Err(err) => {
            log_debug(&format!("voice input unavailable: {err}"));
            None
        }
    };

    show_banner(&config, voice.as_ref().map(|voice| voice.device_name()));

    let mut shell = Shell::new(config, session, voice, vitals, speech);
    run_shell(&mut shell);

    log_debug("=== MediVox Client Exiting ===");
    Ok(())
}
