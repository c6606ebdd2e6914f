//! In-memory alert sound synthesis.
//!
//! Clips are rendered once on first use and served as complete WAV files
//! (16-bit mono PCM, 44.1 kHz, 44-byte RIFF header). No audio assets ship
//! with the binary and nothing touches the filesystem.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

pub const SAMPLE_RATE: u32 = 44_100;

/// Two-note chime for new inbound messages: C6 with E6 entering 150 ms later.
const MESSAGE_NOTE_HZ: [f32; 2] = [1046.5, 1318.51];
const MESSAGE_NOTE_OFFSET_S: f32 = 0.15;
const MESSAGE_NOTE_LEN_S: f32 = 0.5;

/// Urgent two-partial beep for human-handoff requests.
const HANDOFF_PARTIAL_HZ: [f32; 2] = [880.0, 1108.73];
const HANDOFF_LEN_S: f32 = 0.3;

static MESSAGE_WAV: OnceLock<Vec<u8>> = OnceLock::new();
static HANDOFF_WAV: OnceLock<Vec<u8>> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChimeSound {
    Message,
    Handoff,
}

impl ChimeSound {
    pub fn file_name(&self) -> &'static str {
        match self {
            ChimeSound::Message => "message.wav",
            ChimeSound::Handoff => "handoff.wav",
        }
    }

    /// Complete WAV file for this sound. Rendered on first call, then reused.
    pub fn wav_bytes(&self) -> &'static [u8] {
        match self {
            ChimeSound::Message => MESSAGE_WAV.get_or_init(render_message_chime),
            ChimeSound::Handoff => HANDOFF_WAV.get_or_init(render_handoff_beep),
        }
    }
}

fn render_message_chime() -> Vec<u8> {
    let total_s = MESSAGE_NOTE_OFFSET_S + MESSAGE_NOTE_LEN_S;
    let n = (total_s * SAMPLE_RATE as f32) as usize;
    let mut samples = Vec::with_capacity(n);
    for i in 0..n {
        let t = i as f32 / SAMPLE_RATE as f32;
        let mut s = note(MESSAGE_NOTE_HZ[0], t);
        s += note(MESSAGE_NOTE_HZ[1], t - MESSAGE_NOTE_OFFSET_S);
        samples.push(s);
    }
    pcm_to_wav(&samples, SAMPLE_RATE)
}

/// One chime note starting at local time zero: gain 0.4 decaying
/// exponentially to 0.001 over the note length. Silent outside the note.
fn note(freq: f32, t: f32) -> f32 {
    if !(0.0..MESSAGE_NOTE_LEN_S).contains(&t) {
        return 0.0;
    }
    let envelope = 0.4 * (0.001f32 / 0.4).powf(t / MESSAGE_NOTE_LEN_S);
    (std::f32::consts::TAU * freq * t).sin() * envelope
}

fn render_handoff_beep() -> Vec<u8> {
    let n = (HANDOFF_LEN_S * SAMPLE_RATE as f32) as usize;
    let mut samples = Vec::with_capacity(n);
    for i in 0..n {
        let t = i as f32 / SAMPLE_RATE as f32;
        let mix = HANDOFF_PARTIAL_HZ
            .iter()
            .map(|hz| (std::f32::consts::TAU * hz * t).sin() * 0.5)
            .sum::<f32>();
        samples.push(mix * (-8.0 * t).exp() * 0.4);
    }
    pcm_to_wav(&samples, SAMPLE_RATE)
}

/// Wrap float samples in a 44-byte RIFF/WAVE header as 16-bit mono PCM.
fn pcm_to_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let block_align = 2u16;
    let byte_rate = sample_rate * block_align as u32;

    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());

    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let value = if clamped < 0.0 {
            (clamped * 32768.0) as i16
        } else {
            (clamped * 32767.0) as i16
        };
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(wav: &[u8]) -> Vec<i16> {
        wav[44..]
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    fn u32_at(wav: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([wav[offset], wav[offset + 1], wav[offset + 2], wav[offset + 3]])
    }

    fn u16_at(wav: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([wav[offset], wav[offset + 1]])
    }

    #[test]
    fn header_is_valid_pcm_wav() {
        for sound in [ChimeSound::Message, ChimeSound::Handoff] {
            let wav = sound.wav_bytes();
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(&wav[8..12], b"WAVE");
            assert_eq!(&wav[12..16], b"fmt ");
            assert_eq!(u32_at(wav, 16), 16);
            assert_eq!(u16_at(wav, 20), 1, "PCM format");
            assert_eq!(u16_at(wav, 22), 1, "mono");
            assert_eq!(u32_at(wav, 24), SAMPLE_RATE);
            assert_eq!(u32_at(wav, 28), SAMPLE_RATE * 2);
            assert_eq!(u16_at(wav, 32), 2);
            assert_eq!(u16_at(wav, 34), 16);
            assert_eq!(&wav[36..40], b"data");
            assert_eq!(u32_at(wav, 40) as usize, wav.len() - 44);
            assert_eq!(u32_at(wav, 4) as usize, wav.len() - 8);
        }
    }

    #[test]
    fn durations_match_the_designs() {
        let message = samples(ChimeSound::Message.wav_bytes());
        assert_eq!(message.len(), (0.65 * SAMPLE_RATE as f32) as usize);

        let handoff = samples(ChimeSound::Handoff.wav_bytes());
        assert_eq!(handoff.len(), (0.3 * SAMPLE_RATE as f32) as usize);
    }

    #[test]
    fn clips_are_audible_and_decay() {
        for sound in [ChimeSound::Message, ChimeSound::Handoff] {
            let s = samples(sound.wav_bytes());
            let head_peak = s[..2000].iter().map(|v| v.unsigned_abs()).max().unwrap();
            let tail_peak = s[s.len() - 2000..]
                .iter()
                .map(|v| v.unsigned_abs())
                .max()
                .unwrap();
            assert!(head_peak > 4000, "{sound:?} starts audible: {head_peak}");
            assert!(tail_peak < head_peak / 4, "{sound:?} decays: {tail_peak}");
        }
    }

    #[test]
    fn renders_are_cached() {
        let a = ChimeSound::Message.wav_bytes();
        let b = ChimeSound::Message.wav_bytes();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn sound_names_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&ChimeSound::Message).unwrap(), "\"message\"");
        assert_eq!(serde_json::to_string(&ChimeSound::Handoff).unwrap(), "\"handoff\"");
        assert_eq!(ChimeSound::Handoff.file_name(), "handoff.wav");
    }
}
