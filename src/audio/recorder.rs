//! System microphone capture via CPAL.
//!
//! Owns the device handle and the start/stop lifecycle. Incoming audio is
//! downmixed to mono on the callback thread, framed over a bounded channel,
//! and drained on the owning thread; stopping releases the stream exactly
//! once and finalizes a single payload at 16 kHz.

use super::capture::{CaptureMetrics, CapturePayload};
#[cfg(not(test))]
use super::dispatch::{downmix_into, FrameDispatcher};
use super::meter::{rms_db, LiveMeter};
use super::resample::resample_to_target_rate;
use super::TARGET_RATE;
#[cfg(not(test))]
use crate::logging::log_debug;
use cpal::traits::{DeviceTrait, HostTrait};
#[cfg(not(test))]
use cpal::traits::StreamTrait;
#[cfg(not(test))]
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, Receiver};
#[cfg(test)]
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

#[cfg(not(test))]
const FRAME_MS: u64 = 20;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),
    #[error("audio input device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("capture already active")]
    CaptureActive,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CaptureStatus {
    #[default]
    Idle,
    Capturing,
    Stopping,
}

struct ActiveCapture {
    #[cfg(not(test))]
    stream: cpal::Stream,
    #[cfg(test)]
    injector: Sender<Vec<f32>>,
    frames: Receiver<Vec<f32>>,
    collected: Vec<f32>,
    device_rate: u32,
    dropped: Arc<AtomicUsize>,
    frames_processed: usize,
    started_at: Instant,
    meter: LiveMeter,
}

/// Audio input device wrapper with an explicit capture lifecycle.
pub struct Recorder {
    #[cfg(not(test))]
    device: cpal::Device,
    device_name: String,
    status: CaptureStatus,
    active: Option<ActiveCapture>,
}

impl Recorder {
    /// List microphone names so the CLI can expose a selector.
    pub fn list_devices() -> Result<Vec<String>, CaptureError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|err| CaptureError::DeviceUnavailable(err.to_string()))?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Open a recorder, optionally matching a device by case-insensitive
    /// substring so users can pick among multiple inputs.
    #[cfg(not(test))]
    pub fn new(preferred_device: Option<&str>) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = match preferred_device {
            Some(wanted) => {
                let needle = wanted.to_lowercase();
                let mut devices = host
                    .input_devices()
                    .map_err(|err| CaptureError::DeviceUnavailable(err.to_string()))?;
                devices
                    .find(|d| {
                        d.name()
                            .map(|n| n.to_lowercase().contains(&needle))
                            .unwrap_or(false)
                    })
                    .ok_or_else(|| {
                        CaptureError::DeviceUnavailable(format!(
                            "input device matching '{wanted}' not found"
                        ))
                    })?
            }
            None => host.default_input_device().ok_or_else(|| {
                CaptureError::DeviceUnavailable("no default input device".to_string())
            })?,
        };
        let device_name = device
            .name()
            .unwrap_or_else(|_| "unknown input device".to_string());
        Ok(Self {
            device,
            device_name,
            status: CaptureStatus::Idle,
            active: None,
        })
    }

    #[cfg(test)]
    pub fn new(_preferred_device: Option<&str>) -> Result<Self, CaptureError> {
        Ok(Self::new_for_tests())
    }

    #[cfg(test)]
    pub(crate) fn new_for_tests() -> Self {
        Self {
            device_name: "test input".to_string(),
            status: CaptureStatus::Idle,
            active: None,
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn status(&self) -> CaptureStatus {
        self.status
    }

    pub fn is_capturing(&self) -> bool {
        self.status == CaptureStatus::Capturing
    }

    /// Begin a capture window. Fails with [`CaptureError::CaptureActive`] if a
    /// window is already open; the open window is left untouched.
    #[cfg(not(test))]
    pub fn start_capture(
        &mut self,
        meter: &LiveMeter,
        channel_capacity: usize,
    ) -> Result<(), CaptureError> {
        if self.active.is_some() {
            return Err(CaptureError::CaptureActive);
        }

        let default_config = self
            .device
            .default_input_config()
            .map_err(|err| classify_capture_error(err.to_string()))?;
        let format = default_config.sample_format();
        let device_config: StreamConfig = default_config.into();
        let device_rate = device_config.sample_rate.0;
        let channels = usize::from(device_config.channels.max(1));
        let frame_samples = ((device_rate as u64 * FRAME_MS) / 1000).max(1) as usize;

        log_debug(&format!(
            "capture config: format={format:?} rate={device_rate}Hz channels={channels}"
        ));

        let (sender, receiver) = bounded::<Vec<f32>>(channel_capacity.max(1));
        let dropped = Arc::new(AtomicUsize::new(0));
        let err_fn = |err| log_debug(&format!("audio_stream_error: {err}"));

        // Each arm owns its own dispatcher over a cloned sender; only the arm
        // matching the device format ever runs.
        let stream = match format {
            SampleFormat::F32 => {
                let mut dispatcher =
                    FrameDispatcher::new(frame_samples, sender.clone(), Arc::clone(&dropped));
                let mut scratch = Vec::new();
                self.device.build_input_stream(
                    &device_config,
                    move |data: &[f32], _| {
                        downmix_into(&mut scratch, data, channels, |sample| sample);
                        dispatcher.push(&scratch);
                    },
                    err_fn,
                    None,
                )
            }
            SampleFormat::I16 => {
                let mut dispatcher =
                    FrameDispatcher::new(frame_samples, sender.clone(), Arc::clone(&dropped));
                let mut scratch = Vec::new();
                self.device.build_input_stream(
                    &device_config,
                    move |data: &[i16], _| {
                        downmix_into(&mut scratch, data, channels, |sample| {
                            sample as f32 / 32_768.0_f32
                        });
                        dispatcher.push(&scratch);
                    },
                    err_fn,
                    None,
                )
            }
            SampleFormat::U16 => {
                let mut dispatcher =
                    FrameDispatcher::new(frame_samples, sender.clone(), Arc::clone(&dropped));
                let mut scratch = Vec::new();
                self.device.build_input_stream(
                    &device_config,
                    move |data: &[u16], _| {
                        downmix_into(&mut scratch, data, channels, |sample| {
                            (sample as f32 - 32_768.0_f32) / 32_768.0_f32
                        });
                        dispatcher.push(&scratch);
                    },
                    err_fn,
                    None,
                )
            }
            other => {
                return Err(CaptureError::DeviceUnavailable(format!(
                    "unsupported sample format: {other:?}"
                )))
            }
        }
        .map_err(|err| classify_capture_error(err.to_string()))?;

        stream
            .play()
            .map_err(|err| classify_capture_error(err.to_string()))?;

        self.status = CaptureStatus::Capturing;
        self.active = Some(ActiveCapture {
            stream,
            frames: receiver,
            collected: Vec::new(),
            device_rate,
            dropped,
            frames_processed: 0,
            started_at: Instant::now(),
            meter: meter.clone(),
        });
        Ok(())
    }

    #[cfg(test)]
    pub fn start_capture(
        &mut self,
        meter: &LiveMeter,
        channel_capacity: usize,
    ) -> Result<(), CaptureError> {
        if self.active.is_some() {
            return Err(CaptureError::CaptureActive);
        }
        let (sender, receiver) = bounded::<Vec<f32>>(channel_capacity.max(1));
        self.status = CaptureStatus::Capturing;
        self.active = Some(ActiveCapture {
            injector: sender,
            frames: receiver,
            collected: Vec::new(),
            device_rate: TARGET_RATE,
            dropped: Arc::new(AtomicUsize::new(0)),
            frames_processed: 0,
            started_at: Instant::now(),
            meter: meter.clone(),
        });
        Ok(())
    }

    /// Drain frames that arrived since the last call and refresh the level
    /// meter. Call this from the owning thread's tick while capturing.
    pub fn pump(&mut self) {
        if let Some(active) = self.active.as_mut() {
            while let Ok(frame) = active.frames.try_recv() {
                active.frames_processed += 1;
                active.meter.set_db(rms_db(&frame));
                active.collected.extend_from_slice(&frame);
            }
        }
    }

    /// Close the capture window and finalize one payload at the target rate.
    ///
    /// Returns `None` when no window is open; that is not an error and the
    /// status is left unchanged.
    pub fn stop_capture(&mut self) -> Option<CapturePayload> {
        let mut active = self.active.take()?;
        self.status = CaptureStatus::Stopping;

        #[cfg(not(test))]
        if let Err(err) = active.stream.pause() {
            log_debug(&format!("failed to pause audio stream: {err}"));
        }

        // Collect whatever the callback framed before the pause landed.
        while let Ok(frame) = active.frames.try_recv() {
            active.frames_processed += 1;
            active.collected.extend_from_slice(&frame);
        }
        active.meter.reset();

        let samples = resample_to_target_rate(&active.collected, active.device_rate);
        let metrics = CaptureMetrics {
            capture_ms: active.started_at.elapsed().as_millis() as u64,
            frames_processed: active.frames_processed,
            frames_dropped: active.dropped.load(Ordering::Relaxed),
        };
        tracing::debug!(
            capture_ms = metrics.capture_ms,
            frames = metrics.frames_processed,
            dropped = metrics.frames_dropped,
            "capture window closed"
        );
        self.status = CaptureStatus::Idle;
        Some(CapturePayload {
            samples,
            sample_rate: TARGET_RATE,
            metrics,
        })
        // Dropping `active` here releases the stream, exactly once.
    }

    #[cfg(test)]
    pub(crate) fn inject_frames(&self, frames: &[Vec<f32>]) {
        if let Some(active) = self.active.as_ref() {
            for frame in frames {
                let _ = active.injector.try_send(frame.clone());
            }
        }
    }
}

#[cfg(not(test))]
fn classify_capture_error(message: String) -> CaptureError {
    let lowered = message.to_lowercase();
    if lowered.contains("permission") || lowered.contains("denied") || lowered.contains("access") {
        CaptureError::PermissionDenied(format!("{message}. {}", mic_permission_hint()))
    } else {
        CaptureError::DeviceUnavailable(message)
    }
}

#[cfg(not(test))]
fn mic_permission_hint() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "Grant microphone access under System Settings > Privacy & Security > Microphone."
    }
    #[cfg(target_os = "linux")]
    {
        "Verify PipeWire/PulseAudio can see the microphone and that it is not muted."
    }
    #[cfg(target_os = "windows")]
    {
        "Allow microphone access under Settings > Privacy & Security > Microphone."
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        "Check the operating system's microphone permissions."
    }
}
