//! Command line front end: reads KOI8-R text and writes speech.
//!
//! By default raw signed 8-bit samples go to stdout (pipe them into a
//! sound device); `-o file.wav` writes a WAV file instead.

use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use ru_tts::{transfer, Config, DEC_SEP_COMMA, DEC_SEP_POINT, USE_ALTERNATIVE_VOICE};

#[derive(Parser)]
#[command(name = "ru-tts", version, about = "Russian text-to-speech synthesizer")]
struct Args {
    /// Speech rate factor (1.0 is the default rate).
    #[arg(short = 'r', long = "rate", default_value_t = 1.0)]
    rate: f64,

    /// Voice pitch factor.
    #[arg(short = 'p', long = "pitch", default_value_t = 1.0)]
    pitch: f64,

    /// Speech emotionality factor; 0 gives a monotone voice.
    #[arg(short = 'e', long = "emotion", default_value_t = 1.0)]
    emotion: f64,

    /// Interclause gap duration factor.  May be prefixed by one of
    /// `,.;:?!-` to affect only the gaps implied by that punctuation;
    /// repeat the option to adjust several.
    #[arg(short = 'g', long = "gap", value_name = "[PUNCT]FACTOR")]
    gaps: Vec<String>,

    /// Use the alternative (female) voice.
    #[arg(short = 'a', long = "alternative-voice")]
    alternative_voice: bool,

    /// Decimal separator treatment: ".", "," or "-" to disable both.
    #[arg(short = 'd', long = "decimal", value_name = "SEP")]
    decimal: Option<String>,

    /// Speech settings JSON file; command line options override it.
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Input text file in KOI8-R (stdin when omitted).
    input: Option<PathBuf>,

    /// Output WAV file (raw samples to stdout when omitted).
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,
}

fn percentage(factor: f64) -> Result<i32> {
    if !factor.is_finite() || factor < 0.0 {
        bail!("factor must be a non-negative number, got {factor}");
    }
    Ok((factor * 100.0).round() as i32)
}

fn build_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read settings: {}", path.display()))?;
            serde_json::from_str(&data)
                .with_context(|| format!("invalid settings: {}", path.display()))?
        }
        None => Config::default(),
    };

    config.speech_rate = percentage(args.rate)?;
    config.voice_pitch = percentage(args.pitch)?;
    config.intonation = percentage(args.emotion)?;

    for gap in &args.gaps {
        let mut chars = gap.chars();
        let first = chars.next().context("empty -g value")?;
        if ",.;:?!-".contains(first) {
            let factor = percentage(chars.as_str().parse().context("bad -g factor")?)?;
            match first {
                ',' => config.comma_gap_factor = factor,
                '.' => config.dot_gap_factor = factor,
                ';' => config.semicolon_gap_factor = factor,
                ':' => config.colon_gap_factor = factor,
                '?' => config.question_gap_factor = factor,
                '!' => config.exclamation_gap_factor = factor,
                _ => config.intonational_gap_factor = factor,
            }
        } else {
            config.general_gap_factor = percentage(gap.parse().context("bad -g factor")?)?;
        }
    }

    if args.alternative_voice {
        config.flags |= USE_ALTERNATIVE_VOICE;
    }
    if let Some(sep) = &args.decimal {
        config.flags &= !(DEC_SEP_POINT | DEC_SEP_COMMA);
        match sep.as_str() {
            "." => config.flags |= DEC_SEP_POINT,
            "," => config.flags |= DEC_SEP_COMMA,
            "-" => {}
            other => bail!("invalid -d value {other:?}: expected \".\", \",\" or \"-\""),
        }
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = build_config(&args)?;

    let text = match &args.input {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("cannot read input: {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf).context("cannot read stdin")?;
            buf
        }
    };

    match &args.output {
        Some(path) => ru_tts::synthesize_to_wav_file(&config, &text, path),
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            let mut failed = false;
            let mut wave = [0u8; 4096];
            transfer(&config, &text, &mut wave, |chunk: &[u8]| {
                failed = out.write_all(chunk).is_err();
                failed
            });
            if failed {
                bail!("output error");
            }
            Ok(())
        }
    }
}
