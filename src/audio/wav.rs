/// Encode mono f32 PCM as a 16-bit WAV byte stream for multipart upload.
///
/// Samples outside [-1.0, 1.0] are clamped before quantization.
pub fn pcm_to_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut buf = Vec::with_capacity(44 + data_len as usize);

    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_len).to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&1u16.to_le_bytes()); // mono
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&(sample_rate * 2).to_le_bytes()); // byte rate
    buf.extend_from_slice(&2u16.to_le_bytes()); // block align
    buf.extend_from_slice(&16u16.to_le_bytes()); // bits per sample

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_len.to_le_bytes());
    for &sample in samples {
        let quantized = (sample.clamp(-1.0, 1.0) * 32_767.0).round() as i16;
        buf.extend_from_slice(&quantized.to_le_bytes());
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le_u32(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    fn le_u16(bytes: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([bytes[at], bytes[at + 1]])
    }

    #[test]
    fn header_carries_riff_wave_markers() {
        let wav = pcm_to_wav(&[0.0; 4], 16_000);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");
    }

    #[test]
    fn header_sizes_match_sample_count() {
        let wav = pcm_to_wav(&[0.0; 100], 16_000);
        assert_eq!(wav.len(), 44 + 200);
        assert_eq!(le_u32(&wav, 4), 36 + 200);
        assert_eq!(le_u32(&wav, 40), 200);
    }

    #[test]
    fn format_block_describes_mono_16bit_pcm() {
        let wav = pcm_to_wav(&[0.0; 8], 16_000);
        assert_eq!(le_u16(&wav, 20), 1);
        assert_eq!(le_u16(&wav, 22), 1);
        assert_eq!(le_u32(&wav, 24), 16_000);
        assert_eq!(le_u32(&wav, 28), 32_000);
        assert_eq!(le_u16(&wav, 32), 2);
        assert_eq!(le_u16(&wav, 34), 16);
    }

    #[test]
    fn samples_are_quantized_and_clamped() {
        let wav = pcm_to_wav(&[1.0, -1.0, 2.0, 0.0], 16_000);
        let first = i16::from_le_bytes([wav[44], wav[45]]);
        let second = i16::from_le_bytes([wav[46], wav[47]]);
        let clamped = i16::from_le_bytes([wav[48], wav[49]]);
        let zero = i16::from_le_bytes([wav[50], wav[51]]);
        assert_eq!(first, 32_767);
        assert_eq!(second, -32_767);
        assert_eq!(clamped, 32_767);
        assert_eq!(zero, 0);
    }

    #[test]
    fn empty_input_yields_header_only() {
        let wav = pcm_to_wav(&[], 16_000);
        assert_eq!(wav.len(), 44);
        assert_eq!(le_u32(&wav, 40), 0);
    }
}
