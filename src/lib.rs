//! # ru-tts
//!
//! Rule-based Russian text-to-speech synthesizer: turns KOI8-R text into a
//! stream of signed 8-bit PCM samples delivered chunk by chunk to a
//! caller-supplied consumer.
//!
//! ## Quick start
//!
//! ```no_run
//! use ru_tts::{synthesize, Config};
//!
//! let config = Config::default();
//! let samples = synthesize(&config, "priwe+t".as_bytes());
//! assert!(!samples.is_empty());
//! ```
//!
//! Or stream chunks straight into your own consumer (returning `true`
//! aborts synthesis):
//!
//! ```no_run
//! use ru_tts::{transfer, Config};
//!
//! let config = Config::default();
//! let mut wave = [0u8; 4096];
//! transfer(&config, b"da.", &mut wave, |chunk: &[u8]| {
//!     // feed chunk to a sound device
//!     false
//! });
//! ```
//!
//! ## Pipeline
//! 1. **Transcription** — KOI8-R text is normalized and transcribed clause
//!    by clause into an internal phoncode alphabet, numbers spelled out.
//! 2. **Utterance assembly** — phoncodes expand into sound units.
//! 3. **Timing** — a per-clause draft grid drives per-sound durations from
//!    the speech-rate setting.
//! 4. **Intonation** — a clause-type pitch plan programs the interpolation
//!    control blocks.
//! 5. **Sound production** — voice patterns are copied, stretched, mixed
//!    and faded into the output buffer, which flushes to the consumer.
//!
//! Input stress marks: `+` strong, `=` weak, placed after the stressed
//! vowel.  The library never logs, prints, or allocates global state.

pub mod config;
pub mod ffi;
pub mod intonation;
pub mod numerics;
pub mod phone;
pub mod planner;
pub mod producer;
pub mod sink;
pub mod synth;
pub mod timing;
pub mod transcribe;
pub mod utterance;
pub mod voice;

use std::path::Path;

use anyhow::Context;

use crate::intonation::Modulation;
use crate::sink::Sink;
use crate::synth::{SynthDriver, WaveOutput};
use crate::timing::Timing;
use crate::transcribe::{process_text, TranscriptionState, TRANSCRIPTION_BUFFER_SIZE, TRANSCRIPTION_MAXLEN};

pub use crate::config::{Config, DEC_SEP_COMMA, DEC_SEP_POINT, USE_ALTERNATIVE_VOICE};
pub use crate::voice::{from_bundle, Voice, FEMALE, MALE};

/// Output sample rate implied by the voice data.
pub const SAMPLE_RATE: u32 = 10_000;

/// Synthesize `text`, delivering signed 8-bit samples through `consumer`
/// in chunks of at most `wave_buffer.len()` bytes.
///
/// `text` is KOI8-R; a NUL byte terminates it early.  The consumer aborts
/// the synthesis by returning `true`; no more than one further delivery
/// happens after that.
pub fn transfer<F>(config: &Config, text: &[u8], wave_buffer: &mut [u8], mut consumer: F)
where
    F: FnMut(&[u8]) -> bool,
{
    if wave_buffer.is_empty() {
        return;
    }
    let voice: &Voice = if config.flags & USE_ALTERNATIVE_VOICE != 0 { &FEMALE } else { &MALE };

    let mut timing = Timing::setup(config.speech_rate, config.general_gap_factor);
    timing.adjust_gaplen(b',', config.comma_gap_factor);
    timing.adjust_gaplen(b'.', config.dot_gap_factor);
    timing.adjust_gaplen(b';', config.semicolon_gap_factor);
    timing.adjust_gaplen(b':', config.colon_gap_factor);
    timing.adjust_gaplen(b'?', config.question_gap_factor);
    timing.adjust_gaplen(b'!', config.exclamation_gap_factor);
    timing.adjust_gaplen(b'-', config.intonational_gap_factor);

    let driver = SynthDriver {
        state: TranscriptionState::default(),
        flags: config.flags,
        timing,
        modulation: Modulation::setup(config.voice_pitch, config.intonation),
        voice,
        wave: Sink::new(wave_buffer, WaveOutput { callback: &mut consumer }),
    };

    let mut transcription = [phone::GAP; TRANSCRIPTION_BUFFER_SIZE];
    let mut transcription_sink =
        Sink::with_threshold(&mut transcription, TRANSCRIPTION_MAXLEN, driver);
    process_text(text, &mut transcription_sink);
}

/// Synthesize `text` and collect the whole waveform.
pub fn synthesize(config: &Config, text: &[u8]) -> Vec<i8> {
    let mut samples = Vec::new();
    let mut wave = [0u8; 4096];
    transfer(config, text, &mut wave, |chunk: &[u8]| {
        samples.extend(chunk.iter().map(|&b| b as i8));
        false
    });
    samples
}

/// Synthesize `text` into a 16-bit PCM WAV file at [`SAMPLE_RATE`] Hz.
///
/// The native 8-bit samples are widened to 16 bits: 8-bit WAV is unsigned
/// and poorly supported by common players, while 16-bit PCM decodes
/// everywhere.
pub fn synthesize_to_wav_file(config: &Config, text: &[u8], path: &Path) -> anyhow::Result<()> {
    let samples = synthesize(config, text);
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("cannot create WAV: {}", path.display()))?;
    for s in samples {
        writer.write_sample((s as i16) << 8).context("WAV write error")?;
    }
    writer.finalize().context("WAV finalize error")?;
    Ok(())
}
