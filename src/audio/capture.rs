/// Counters gathered over one capture window.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureMetrics {
    /// Wall-clock time between start and stop.
    pub capture_ms: u64,
    /// Frames drained from the device callback.
    pub frames_processed: usize,
    /// Frames discarded because the channel was full.
    pub frames_dropped: usize,
}

/// Finalized audio from one capture window, already mono at the target rate.
#[derive(Clone, Debug, Default)]
pub struct CapturePayload {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub metrics: CaptureMetrics,
}

impl CapturePayload {
    /// Duration of the captured audio in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }

    /// True when the window is too short to carry speech and should be
    /// discarded without contacting the transcription service.
    pub fn is_degenerate(&self, min_ms: u64) -> bool {
        self.samples.is_empty() || self.duration_ms() < min_ms
    }
}
