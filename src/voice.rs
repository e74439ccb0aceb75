//! Voice input controller: a single toggle that starts microphone capture or
//! stops it and hands the recording to the transcription service.
//!
//! Capture and transcription are one cycle; toggling while a transcription is
//! still pending is ignored so a second capture can never race the first.
//! Recognized text is returned to the caller via `poll`; the controller never
//! touches the conversation transcript itself.

use crate::audio::{pcm_to_wav, CaptureMetrics, CapturePayload, LiveMeter, Recorder};
use crate::gateway::{GatewayResult, TranscriptionGateway};
use crate::logging::{log_debug, log_debug_content};
use regex::Regex;
use std::sync::{mpsc, Arc, OnceLock};
use std::thread;

/// The three phases of one voice cycle. Presentation layers should derive
/// their recording indicator from [`VoiceController::is_recording`] rather
/// than tracking a boolean of their own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoicePhase {
    Idle,
    Capturing,
    Transcribing,
}

/// Immediate result of a `toggle` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Capture started; the recording flag is now up.
    Started,
    /// Capture stopped; transcription is running in the background.
    Stopped,
    /// Capture stopped but the recording was too short to transcribe.
    DiscardedShort,
    /// A transcription is still pending; nothing was started or stopped.
    Ignored,
    /// Capture could not start.
    Failed(String),
}

/// Outcome of a finished transcription, surfaced by `poll`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoiceEvent {
    Transcript(String),
    /// The service heard nothing but silence or non-speech noise.
    Empty,
    Error(String),
}

struct TranscribeJob {
    receiver: mpsc::Receiver<GatewayResult<String>>,
    handle: Option<thread::JoinHandle<()>>,
}

pub struct VoiceController {
    recorder: Recorder,
    gateway: Arc<dyn TranscriptionGateway>,
    meter: LiveMeter,
    min_payload_ms: u64,
    channel_capacity: usize,
    job: Option<TranscribeJob>,
}

impl VoiceController {
    pub fn new(
        recorder: Recorder,
        gateway: Arc<dyn TranscriptionGateway>,
        min_payload_ms: u64,
        channel_capacity: usize,
    ) -> Self {
        Self {
            recorder,
            gateway,
            meter: LiveMeter::new(),
            min_payload_ms,
            channel_capacity,
            job: None,
        }
    }

    pub fn meter(&self) -> &LiveMeter {
        &self.meter
    }

    pub fn device_name(&self) -> &str {
        self.recorder.device_name()
    }

    pub fn phase(&self) -> VoicePhase {
        if self.job.is_some() {
            VoicePhase::Transcribing
        } else if self.recorder.is_capturing() {
            VoicePhase::Capturing
        } else {
            VoicePhase::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.phase() == VoicePhase::Capturing
    }

    /// Start capture, or stop it and kick off transcription.
    pub fn toggle(&mut self) -> ToggleOutcome {
        match self.phase() {
            VoicePhase::Transcribing => ToggleOutcome::Ignored,
            VoicePhase::Idle => match self
                .recorder
                .start_capture(&self.meter, self.channel_capacity)
            {
                Ok(()) => {
                    log_debug("voice capture started");
                    ToggleOutcome::Started
                }
                Err(err) => ToggleOutcome::Failed(err.to_string()),
            },
            VoicePhase::Capturing => {
                // The recording flag drops here, before transcription begins.
                match self.recorder.stop_capture() {
                    None => ToggleOutcome::DiscardedShort,
                    Some(payload) => {
                        log_capture_metrics(&payload.metrics);
                        if payload.is_degenerate(self.min_payload_ms) {
                            log_debug(&format!(
                                "voice capture discarded ({}ms < {}ms minimum)",
                                payload.duration_ms(),
                                self.min_payload_ms
                            ));
                            ToggleOutcome::DiscardedShort
                        } else {
                            self.spawn_transcription(payload);
                            ToggleOutcome::Stopped
                        }
                    }
                }
            }
        }
    }

    /// Drain capture frames while recording. Call from the owning thread's
    /// tick so the level meter stays live.
    pub fn pump(&mut self) {
        self.recorder.pump();
    }

    /// Check the transcription worker without blocking.
    pub fn poll(&mut self) -> Option<VoiceEvent> {
        let job = self.job.as_mut()?;
        let event = match job.receiver.try_recv() {
            Ok(result) => match result {
                Ok(raw) => {
                    let cleaned = sanitize_transcript(&raw);
                    if cleaned.is_empty() {
                        VoiceEvent::Empty
                    } else {
                        log_debug_content(&format!("voice transcript: {cleaned}"));
                        VoiceEvent::Transcript(cleaned)
                    }
                }
                Err(err) => VoiceEvent::Error(err.to_string()),
            },
            Err(mpsc::TryRecvError::Empty) => return None,
            Err(mpsc::TryRecvError::Disconnected) => {
                VoiceEvent::Error("transcription worker disconnected unexpectedly".to_string())
            }
        };
        if let Some(handle) = job.handle.take() {
            let _ = handle.join();
        }
        self.job = None;
        Some(event)
    }

    fn spawn_transcription(&mut self, payload: CapturePayload) {
        let gateway = Arc::clone(&self.gateway);
        let (tx, rx) = mpsc::sync_channel(1);
        let handle = thread::spawn(move || {
            // Encode on the worker so the owning thread never waits on it.
            let wav = pcm_to_wav(&payload.samples, payload.sample_rate);
            let result = gateway.transcribe(wav, "audio/wav");
            let _ = tx.send(result);
        });
        self.job = Some(TranscribeJob {
            receiver: rx,
            handle: Some(handle),
        });
    }

    #[cfg(test)]
    pub(crate) fn recorder_mut(&mut self) -> &mut Recorder {
        &mut self.recorder
    }
}

/// Strip whisper-style non-speech markers and collapse whitespace.
fn sanitize_transcript(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    static NON_SPEECH_RE: OnceLock<Regex> = OnceLock::new();
    let re = NON_SPEECH_RE.get_or_init(|| {
        Regex::new(
            r"(?i)\[\s*\]|\(\s*\)|\[(?:\s*(?:silence|noise|inaudible|blank_audio|blank audio|music|laughter|applause|cough|breath(?:ing)?|background)\s*)\]|\((?:\s*(?:silence|noise|inaudible|blank audio|music|laughter|applause|cough|breath(?:ing)?|background)\s*)\)",
        )
        .expect("non-speech regex should compile")
    });
    let without_markers = re.replace_all(trimmed, " ");
    without_markers
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn log_capture_metrics(metrics: &CaptureMetrics) {
    log_debug(&format!(
        "voice_metrics|capture_ms={}|frames_processed={}|frames_dropped={}",
        metrics.capture_ms, metrics.frames_processed, metrics.frames_dropped
    ));
}
