use super::TARGET_RATE;
use crate::logging::log_debug;
use anyhow::{anyhow, Result};
#[cfg(feature = "high-quality-audio")]
use rubato::{InterpolationParameters, InterpolationType, Resampler, SincFixedIn, WindowFunction};
use std::cmp::Ordering as CmpOrdering;
use std::f32::consts::PI;
#[cfg(feature = "high-quality-audio")]
use std::sync::atomic::{AtomicBool, Ordering};

// Practical ratio bounds around the 16 kHz target (~0.01x .. 8x).
pub(super) const MIN_DEVICE_RATE: u32 = 2_000;
pub(super) const MAX_DEVICE_RATE: u32 = 1_600_000;
pub(super) const MIN_RESAMPLE_RATIO: f64 = TARGET_RATE as f64 / MAX_DEVICE_RATE as f64;
pub(super) const MAX_RESAMPLE_RATIO: f64 = TARGET_RATE as f64 / MIN_DEVICE_RATE as f64;
const MAX_ANTI_ALIAS_TAPS: usize = 129;

#[cfg(feature = "high-quality-audio")]
static FALLBACK_WARNED: AtomicBool = AtomicBool::new(false);

/// Convert captured audio to the transcription service's 16 kHz rate.
///
/// Prefers the sinc resampler when the `high-quality-audio` feature is on and
/// drops to the filtered linear path if construction or processing fails, so a
/// capture is never lost to a resampler error.
pub(super) fn resample_to_target_rate(input: &[f32], device_rate: u32) -> Vec<f32> {
    if device_rate == 0 || input.is_empty() || device_rate == TARGET_RATE {
        return input.to_vec();
    }

    #[cfg(feature = "high-quality-audio")]
    {
        match sinc_resample(input, device_rate) {
            Ok(output) => output,
            Err(err) => {
                if !FALLBACK_WARNED.swap(true, Ordering::AcqRel) {
                    log_debug(&format!(
                        "sinc resampler failed ({err}); using filtered linear path"
                    ));
                }
                fallback_resample(input, device_rate)
            }
        }
    }

    #[cfg(not(feature = "high-quality-audio"))]
    {
        fallback_resample(input, device_rate)
    }
}

/// Output length both paths converge on: round(len * ratio), never zero.
fn expected_output_len(input_len: usize, ratio: f64) -> usize {
    ((input_len as f64 * ratio).round() as usize).max(1)
}

#[cfg(feature = "high-quality-audio")]
pub(super) fn sinc_resample(input: &[f32], device_rate: u32) -> Result<Vec<f32>> {
    if device_rate == 0 || input.is_empty() || device_rate == TARGET_RATE {
        return Ok(input.to_vec());
    }
    if !(MIN_DEVICE_RATE..=MAX_DEVICE_RATE).contains(&device_rate) {
        return Err(anyhow!(
            "device rate {device_rate}Hz is outside the resampler's range"
        ));
    }
    let ratio = TARGET_RATE as f64 / device_rate as f64;
    if !(MIN_RESAMPLE_RATIO..=MAX_RESAMPLE_RATIO).contains(&ratio) {
        return Err(anyhow!("resample ratio {ratio} out of range"));
    }

    let chunk = 256usize;
    let params = InterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: InterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk, 1)
        .map_err(|e| anyhow!("could not build sinc resampler: {e:?}"))?;

    let expected = expected_output_len(input.len(), ratio);
    let mut out = Vec::with_capacity(expected + chunk);
    let mut segment = vec![0.0f32; chunk];

    for block in input.chunks(chunk) {
        // The resampler wants fixed-size input; the final short block is
        // padded with its last sample to avoid a click at the boundary.
        let pad = block.last().copied().unwrap_or(0.0);
        segment.fill(pad);
        segment[..block.len()].copy_from_slice(block);
        let produced = resampler
            .process(std::slice::from_ref(&segment), None)
            .map_err(|e| anyhow!("resample chunk failed: {e:?}"))?;
        out.extend_from_slice(&produced[0]);
    }

    match out.len().cmp(&expected) {
        CmpOrdering::Greater => out.truncate(expected),
        CmpOrdering::Less => {
            let pad = out.last().copied().unwrap_or(0.0);
            out.resize(expected, pad);
        }
        CmpOrdering::Equal => {}
    }
    Ok(out)
}

/// Filtered linear resampler. When decimating, a short FIR low-pass runs first
/// so 44.1/48 kHz microphones do not alias speech harmonics into the band.
pub(super) fn fallback_resample(input: &[f32], device_rate: u32) -> Vec<f32> {
    if device_rate == 0 || input.is_empty() {
        return input.to_vec();
    }
    if !(MIN_DEVICE_RATE..=MAX_DEVICE_RATE).contains(&device_rate) {
        return input.to_vec();
    }

    let ratio = (TARGET_RATE as f64 / device_rate as f64)
        .clamp(MIN_RESAMPLE_RATIO, MAX_RESAMPLE_RATIO);
    let filtered = if device_rate > TARGET_RATE {
        let taps = anti_alias_tap_count(device_rate);
        apply_low_pass(input, device_rate, taps)
    } else {
        input.to_vec()
    };
    linear_resample(&filtered, ratio as f32)
}

pub(super) fn linear_resample(input: &[f32], ratio: f32) -> Vec<f32> {
    let output_len = expected_output_len(input.len(), ratio as f64);
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src = i as f32 / ratio;
        let idx = src.floor() as usize;
        let frac = src - idx as f32;
        if idx + 1 < input.len() {
            output.push(input[idx] * (1.0 - frac) + input[idx + 1] * frac);
        } else {
            output.push(input.last().copied().unwrap_or(0.0));
        }
    }

    output
}

/// Tap count scales with the decimation ratio, odd so the filter has a center
/// tap, capped to keep the convolution cheap on long captures.
pub(super) fn anti_alias_tap_count(device_rate: u32) -> usize {
    let decimation = device_rate as f32 / TARGET_RATE as f32;
    let mut taps = (decimation * 4.0).ceil().max(11.0) as usize;
    if taps % 2 == 0 {
        taps += 1;
    }
    taps.min(MAX_ANTI_ALIAS_TAPS)
}

pub(super) fn apply_low_pass(input: &[f32], device_rate: u32, taps: usize) -> Vec<f32> {
    if input.is_empty() || taps <= 1 {
        return input.to_vec();
    }

    let normalized_cutoff = (TARGET_RATE as f32 * 0.5 / device_rate as f32).min(0.499);
    let coeffs = windowed_sinc_taps(normalized_cutoff, taps);
    let half = taps / 2;
    let mut output = Vec::with_capacity(input.len());

    for n in 0..input.len() {
        let mut acc = 0.0;
        for (k, coeff) in coeffs.iter().enumerate() {
            if let Some(idx) = (n + k).checked_sub(half) {
                if let Some(sample) = input.get(idx) {
                    acc += *sample * coeff;
                }
            }
        }
        output.push(acc);
    }

    output
}

/// Blackman-windowed sinc kernel, normalized to unity DC gain.
pub(super) fn windowed_sinc_taps(normalized_cutoff: f32, taps: usize) -> Vec<f32> {
    let mut coeffs = Vec::with_capacity(taps);
    let span = (taps - 1) as f32;

    for n in 0..taps {
        let offset = n as f32 - span / 2.0;
        let phase = 2.0 * PI * normalized_cutoff * offset;
        let sinc = if offset == 0.0 {
            2.0 * normalized_cutoff
        } else {
            (2.0 * normalized_cutoff * phase.sin()) / phase
        };
        let window = if taps <= 1 {
            1.0
        } else {
            let t = (2.0 * PI * n as f32) / span;
            0.42 - 0.5 * t.cos() + 0.08 * (2.0 * t).cos()
        };
        coeffs.push(sinc * window);
    }

    let gain: f32 = coeffs.iter().sum();
    if gain != 0.0 {
        for coeff in coeffs.iter_mut() {
            *coeff /= gain;
        }
    }

    coeffs
}
