use crossbeam_channel::{Sender, TrySendError};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Fold an interleaved device buffer down to mono, converting each sample with
/// `convert`. The output vector is cleared first so callers can reuse a scratch
/// buffer across callbacks without reallocating.
pub(super) fn downmix_into<T, F>(out: &mut Vec<f32>, data: &[T], channels: usize, mut convert: F)
where
    T: Copy,
    F: FnMut(T) -> f32,
{
    out.clear();
    if channels <= 1 {
        out.extend(data.iter().copied().map(&mut convert));
        return;
    }

    for frame in data.chunks(channels) {
        let sum: f32 = frame.iter().copied().map(&mut convert).sum();
        // A trailing partial frame is averaged over the samples it has.
        out.push(sum / frame.len() as f32);
    }
}

/// Re-chunks mono samples into fixed-size frames and hands them to the drain
/// side over a bounded channel. The device callback must never block, so a
/// full channel drops the frame and bumps a counter instead.
pub(super) struct FrameDispatcher {
    frame_samples: usize,
    pending: Vec<f32>,
    sender: Sender<Vec<f32>>,
    dropped: Arc<AtomicUsize>,
}

impl FrameDispatcher {
    pub(super) fn new(
        frame_samples: usize,
        sender: Sender<Vec<f32>>,
        dropped: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            frame_samples: frame_samples.max(1),
            pending: Vec::with_capacity(frame_samples),
            sender,
            dropped,
        }
    }

    pub(super) fn push(&mut self, samples: &[f32]) {
        self.pending.extend_from_slice(samples);

        while self.pending.len() >= self.frame_samples {
            let frame: Vec<f32> = self.pending.drain(..self.frame_samples).collect();
            match self.sender.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Disconnected(_)) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn downmix_passes_mono_through() {
        let mut out = vec![9.9];
        downmix_into(&mut out, &[0.1f32, 0.2, 0.3], 1, |s| s);
        assert_eq!(out, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn downmix_averages_stereo_frames() {
        let mut out = Vec::new();
        downmix_into(&mut out, &[1.0f32, 0.0, 0.5, 0.5], 2, |s| s);
        assert_eq!(out, vec![0.5, 0.5]);
    }

    #[test]
    fn downmix_averages_trailing_partial_frame() {
        let mut out = Vec::new();
        downmix_into(&mut out, &[0.2f32, 0.4, 0.8], 2, |s| s);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 0.3).abs() < 1e-6);
        assert!((out[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn downmix_applies_the_converter() {
        let mut out = Vec::new();
        downmix_into(&mut out, &[16_384i16, -16_384], 1, |s| s as f32 / 32_768.0);
        assert_eq!(out, vec![0.5, -0.5]);
    }

    #[test]
    fn dispatcher_emits_full_frames_only() {
        let (tx, rx) = bounded(8);
        let dropped = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = FrameDispatcher::new(4, tx, dropped);

        dispatcher.push(&[0.0; 3]);
        assert!(rx.try_recv().is_err());

        dispatcher.push(&[0.0; 5]);
        assert_eq!(rx.try_recv().map(|f| f.len()), Ok(4));
        assert_eq!(rx.try_recv().map(|f| f.len()), Ok(4));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dispatcher_counts_drops_when_channel_is_full() {
        let (tx, rx) = bounded(1);
        let dropped = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = FrameDispatcher::new(2, tx, Arc::clone(&dropped));

        dispatcher.push(&[0.0; 6]);
        assert_eq!(dropped.load(Ordering::Relaxed), 2);
        assert_eq!(rx.try_recv().map(|f| f.len()), Ok(2));
    }

    #[test]
    fn dispatcher_survives_disconnected_receiver() {
        let (tx, rx) = bounded(1);
        drop(rx);
        let dropped = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = FrameDispatcher::new(2, tx, Arc::clone(&dropped));

        dispatcher.push(&[0.0; 8]);
        assert_eq!(dropped.load(Ordering::Relaxed), 0);
    }
}
