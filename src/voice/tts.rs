//! Text-to-speech (TTS) with a small formant synthesiser
//!
//! Each character becomes a short tone: vowels use two formants, digits a
//! tone plus harmonic, punctuation its own cue, other letters a noisy
//! consonant. Whitespace renders as silence. Output is mono 16-bit PCM WAV.

use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Default output sample rate
pub const DEFAULT_SAMPLE_RATE: u32 = 22_050;

const AMPLITUDE: f64 = 0.85;
const ATTACK_SECS: f64 = 0.01;
const RELEASE_SECS: f64 = 0.03;
const GAP_SECS: f64 = 0.018;
const NOISE_SEED: u64 = 0x1357_9BDF;

/// Two-formant frequencies for vowels (Hz)
const VOWEL_FORMANTS: [(char, [f64; 2]); 6] = [
    ('a', [750.0, 1200.0]),
    ('e', [500.0, 1900.0]),
    ('i', [320.0, 2300.0]),
    ('o', [420.0, 860.0]),
    ('u', [360.0, 640.0]),
    ('y', [470.0, 1700.0]),
];

/// Punctuation cues: (frequency, duration, noise mix)
const PUNCTUATION_PROFILES: [(char, f64, f64, f64); 12] = [
    ('.', 240.0, 0.14, 0.12),
    (',', 220.0, 0.16, 0.14),
    ('?', 500.0, 0.20, 0.06),
    ('!', 540.0, 0.16, 0.08),
    (':', 260.0, 0.15, 0.12),
    (';', 280.0, 0.16, 0.12),
    ('-', 210.0, 0.12, 0.18),
    ('_', 190.0, 0.18, 0.18),
    ('\'', 360.0, 0.10, 0.08),
    ('"', 340.0, 0.10, 0.08),
    ('(', 230.0, 0.12, 0.10),
    (')', 230.0, 0.12, 0.10),
];

/// Deterministic LCG noise in [-1, 1]
struct Noise(u64);

impl Noise {
    const fn new() -> Self {
        Self(NOISE_SEED)
    }

    fn next_sample(&mut self) -> f64 {
        self.0 = (1_103_515_245 * self.0 + 12_345) & 0x7FFF_FFFF;
        #[allow(clippy::cast_precision_loss)]
        let unit = self.0 as f64 / f64::from(0x7FFF_FFFF_u32);
        unit.mul_add(2.0, -1.0)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn frame_count(duration: f64, sample_rate: u32) -> usize {
    ((duration * f64::from(sample_rate)) as usize).max(1)
}

fn silence(duration: f64, sample_rate: u32) -> Vec<i16> {
    vec![0; frame_count(duration, sample_rate)]
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn tone(freqs: &[f64], duration: f64, sample_rate: u32, noise_mix: f64) -> Vec<i16> {
    let freqs: Vec<f64> = freqs.iter().copied().filter(|f| *f > 0.0).collect();
    let rate = f64::from(sample_rate);
    let total = frame_count(duration, sample_rate);
    let attack = frame_count(ATTACK_SECS, sample_rate);
    let release = frame_count(RELEASE_SECS, sample_rate);
    let noise_mix = noise_mix.clamp(0.0, 0.95);
    let tone_mix = 1.0 - noise_mix;
    let mut noise = Noise::new();

    (0..total)
        .map(|index| {
            let t = index as f64 / rate;
            let voiced = if freqs.is_empty() {
                0.0
            } else {
                freqs.iter().map(|f| (2.0 * PI * f * t).sin()).sum::<f64>() / freqs.len() as f64
            };
            let unvoiced = if noise_mix > 0.0 { noise.next_sample() } else { 0.0 };
            let sample = tone_mix * voiced + noise_mix * unvoiced;

            let envelope = if index < attack {
                index as f64 / attack as f64
            } else if index >= total.saturating_sub(release) {
                (total - index) as f64 / release as f64
            } else {
                1.0
            };

            ((sample * envelope * AMPLITUDE).clamp(-1.0, 1.0) * 32767.0) as i16
        })
        .collect()
}

/// Lowercase form of `ch` when it maps to exactly one character
fn single_lowercase(ch: char) -> Option<char> {
    let mut lower = ch.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn consonant_frequencies(ch: char) -> [f64; 2] {
    let offset = (i64::from(u32::from(ch)) - 97).rem_euclid(8);
    #[allow(clippy::cast_precision_loss)]
    let base = (offset as f64).mul_add(32.0, 190.0);
    [base, (base * 1.6).min(760.0)]
}

/// Render one character; the flag marks pauses
fn render_character(ch: char, sample_rate: u32) -> (Vec<i16>, bool) {
    match ch {
        ' ' => return (silence(0.09, sample_rate), true),
        '\n' | '\r' => return (silence(0.14, sample_rate), true),
        '\t' => return (silence(0.11, sample_rate), true),
        _ => {}
    }

    let Some(lower) = single_lowercase(ch) else {
        return (tone(&[320.0], 0.10, sample_rate, 0.22), false);
    };

    if let Some((_, formants)) = VOWEL_FORMANTS.iter().find(|(v, _)| *v == lower) {
        return (tone(formants, 0.18, sample_rate, 0.0), false);
    }
    if let Some(digit) = lower.to_digit(10).filter(|_| lower.is_ascii_digit()) {
        let base = f64::from(digit).mul_add(22.0, 300.0);
        return (tone(&[base, base * 1.5], 0.16, sample_rate, 0.05), false);
    }
    if let Some(&(_, freq, duration, noise_mix)) =
        PUNCTUATION_PROFILES.iter().find(|(p, ..)| *p == lower)
    {
        return (tone(&[freq], duration, sample_rate, noise_mix), false);
    }
    if lower.is_alphabetic() {
        return (tone(&consonant_frequencies(lower), 0.12, sample_rate, 0.35), false);
    }
    (tone(&[320.0], 0.10, sample_rate, 0.22), false)
}

/// Encode 16-bit mono samples as a WAV byte stream
fn samples_to_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// Synthesise `text` into a WAV byte stream
///
/// # Errors
///
/// Returns error if `sample_rate` is zero or `text` is blank
pub fn synthesize_speech(text: &str, sample_rate: u32) -> Result<Vec<u8>> {
    if sample_rate == 0 {
        return Err(Error::Tts("sample_rate must be a positive integer".to_string()));
    }
    if text.trim().is_empty() {
        return Err(Error::Tts("text must be a non-empty string".to_string()));
    }

    let mut samples = Vec::new();
    let mut prev_was_pause = true;
    for ch in text.chars() {
        let (segment, is_pause) = render_character(ch, sample_rate);
        if !prev_was_pause {
            samples.extend(silence(GAP_SECS, sample_rate));
        }
        samples.extend(segment);
        prev_was_pause = is_pause;
    }

    tracing::debug!(chars = text.chars().count(), frames = samples.len(), sample_rate, "synthesised speech");

    samples_to_wav(&samples, sample_rate)
}

/// Synthesise `text` and write it to `path`, creating parent directories
///
/// # Errors
///
/// Returns error if synthesis fails or the file cannot be written
pub fn save_speech(text: &str, path: &Path, sample_rate: u32) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let data = synthesize_speech(text, sample_rate)?;
    std::fs::write(path, data)?;
    Ok(path.to_path_buf())
}

/// Something that turns text into audio
pub trait TextToSpeech: Send + Sync {
    /// Render `text` as WAV bytes
    ///
    /// # Errors
    ///
    /// Returns error if the text cannot be synthesised
    fn synthesize(&self, text: &str, sample_rate: u32) -> Result<Vec<u8>>;
}

/// The built-in formant synthesiser
#[derive(Debug, Clone, Copy, Default)]
pub struct FormantTextToSpeech;

impl TextToSpeech for FormantTextToSpeech {
    fn synthesize(&self, text: &str, sample_rate: u32) -> Result<Vec<u8>> {
        synthesize_speech(text, sample_rate)
    }
}
