//! Microphone capture pipeline.
//!
//! Audio is captured via CPAL, downmixed to mono, resampled to 16 kHz, and
//! finalized into a single payload per capture window. The payload is encoded
//! as WAV just before upload to the transcription service.

/// Sample rate the transcription service expects.
pub const TARGET_RATE: u32 = 16_000;

mod capture;
mod dispatch;
mod meter;
mod recorder;
mod resample;
mod wav;

pub use capture::{CaptureMetrics, CapturePayload};
pub use meter::{LiveMeter, METER_FLOOR_DB};
pub use recorder::{CaptureError, CaptureStatus, Recorder};
pub use wav::pcm_to_wav;
