//! # PCM Framing and WAV Containering
//!
//! Raw PCM frames arriving over the streaming surface carry no container, but
//! the transcription provider expects a self-describing audio file. This module
//! validates incoming frames and wraps finalized segments in a minimal RIFF/WAV
//! container.
//!
//! ## Audio Format Requirements:
//! - **Sample Rate**: 16kHz default
//! - **Bit Depth**: 16-bit PCM
//! - **Channels**: Mono (1 channel)
//! - **Encoding**: Little-endian signed integers

use byteorder::{ByteOrder, LittleEndian};

/// PCM stream parameters for the capture being segmented.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PcmFormat {
    /// Samples per second
    pub sample_rate: u32,

    /// Number of audio channels
    pub channels: u8,

    /// Bits per sample
    pub bit_depth: u8,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            bit_depth: 16,
        }
    }
}

impl PcmFormat {
    /// Bytes per sample frame (all channels of one sample instant).
    pub fn block_align(&self) -> u16 {
        self.channels as u16 * (self.bit_depth as u16 / 8)
    }

    /// Playback duration of `byte_len` bytes of raw PCM in this format.
    pub fn duration_seconds(&self, byte_len: usize) -> f64 {
        let byte_rate = self.sample_rate as f64 * self.block_align() as f64;
        if byte_rate > 0.0 {
            byte_len as f64 / byte_rate
        } else {
            0.0
        }
    }
}

/// Validate that a raw PCM frame is well-formed for the given format.
///
/// Rejects empty frames and frames whose length is not a whole number of
/// sample frames.
pub fn validate_pcm_frame(data: &[u8], format: &PcmFormat) -> Result<(), String> {
    if data.is_empty() {
        return Err("No audio data provided".to_string());
    }

    let frame_bytes = format.block_align() as usize;
    if frame_bytes == 0 {
        return Err(format!(
            "Unsupported PCM format: {} channels at {} bits",
            format.channels, format.bit_depth
        ));
    }
    if data.len() % frame_bytes != 0 {
        return Err(format!(
            "Audio data length {} is not a multiple of the {}-byte sample frame",
            data.len(),
            frame_bytes
        ));
    }

    Ok(())
}

/// Wrap raw PCM bytes in a RIFF/WAV container.
///
/// Produces the standard 44-byte PCM header (RIFF + fmt + data chunks)
/// followed by the samples unchanged.
pub fn wrap_pcm(pcm: &[u8], format: &PcmFormat) -> Vec<u8> {
    let bytes_per_sample = (format.bit_depth / 8) as u32;
    let byte_rate = format.sample_rate * format.channels as u32 * bytes_per_sample;
    let data_len = pcm.len() as u32;

    let mut header = [0u8; 44];
    header[0..4].copy_from_slice(b"RIFF");
    LittleEndian::write_u32(&mut header[4..8], 36 + data_len);
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    LittleEndian::write_u32(&mut header[16..20], 16);
    LittleEndian::write_u16(&mut header[20..22], 1); // PCM, uncompressed
    LittleEndian::write_u16(&mut header[22..24], format.channels as u16);
    LittleEndian::write_u32(&mut header[24..28], format.sample_rate);
    LittleEndian::write_u32(&mut header[28..32], byte_rate);
    LittleEndian::write_u16(&mut header[32..34], format.block_align());
    LittleEndian::write_u16(&mut header[34..36], format.bit_depth as u16);
    header[36..40].copy_from_slice(b"data");
    LittleEndian::write_u32(&mut header[40..44], data_len);

    let mut wav = Vec::with_capacity(44 + pcm.len());
    wav.extend_from_slice(&header);
    wav.extend_from_slice(pcm);
    wav
}
