//! Montage Cue - beat-synchronized montage builder
//!
//! Command-line front end over the analysis and segmentation library:
//! 1. Decodes a WAV track and runs rhythm analysis on it
//! 2. Loads the clip list (with any saved profiles) from YAML
//! 3. Builds the montage and writes it as YAML
//!
//! ## Usage
//!
//! `montage-cue <audio.wav> <clips.yaml> [--preset NAME] [--seed N]
//! [--output FILE]`
//!
//! Set RUST_LOG=debug for verbose output.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use montage_core::VideoClip;
use montage_cue::config::Config;
use montage_cue::segment::{preset, SegmenterOptions};
use montage_cue::{analyze_audio, build_montage};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = CliArgs::parse(&args)?;

    log::info!("montage-cue starting up");
    let config = Config::load(&Config::default_path())?;

    let style = preset::by_name(cli.preset.as_deref().unwrap_or(&config.analysis.preset));
    log::info!("Using preset '{}'", style.name);

    let (samples, sample_rate) = decode_wav(&cli.audio)?;
    let total_duration = samples.len() as f64 / sample_rate as f64;

    let mut analysis_config = config.analysis.clone();
    if cli.preset.is_some() {
        // An explicit preset overrides the saved thresholds.
        analysis_config.min_energy = style.min_energy;
        analysis_config.sensitivity = style.sensitivity;
    }
    let analysis = analyze_audio(&samples, sample_rate, &analysis_config)?;

    let clips = load_clips(&cli.clips)?;
    log::info!("Loaded {} clips from {}", clips.len(), cli.clips.display());

    let mut options = SegmenterOptions::for_preset(style);
    options.speed_ramping |= config.segmenter.speed_ramping;
    options.smart_reorder = config.segmenter.smart_reorder;
    options.seed = cli.seed.or(config.segmenter.seed);

    let montage = build_montage(
        &analysis.beats,
        &analysis.drop_zones,
        &clips,
        total_duration,
        &options,
    )?;

    println!(
        "Montage: {} segments over {:.1}s, {:.1} BPM, score {:.1} ({} drop / {} hero)",
        montage.segments.len(),
        montage.duration(),
        montage.bpm,
        montage.average_score,
        montage.drop_count,
        montage.hero_count
    );

    let yaml = serde_yaml::to_string(&montage).context("Failed to serialize montage")?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, yaml)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Montage written to {}", path.display());
        }
        None => print!("{yaml}"),
    }

    Ok(())
}

struct CliArgs {
    audio: PathBuf,
    clips: PathBuf,
    preset: Option<String>,
    seed: Option<u64>,
    output: Option<PathBuf>,
}

impl CliArgs {
    fn parse(args: &[String]) -> Result<Self> {
        let mut positional: Vec<&String> = Vec::new();
        let mut preset = None;
        let mut seed = None;
        let mut output = None;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--preset" => {
                    preset = Some(iter.next().context("--preset needs a name")?.clone());
                }
                "--seed" => {
                    let raw = iter.next().context("--seed needs a value")?;
                    seed = Some(raw.parse().context("--seed must be an integer")?);
                }
                "--output" => {
                    output = Some(PathBuf::from(
                        iter.next().context("--output needs a path")?,
                    ));
                }
                _ if arg.starts_with("--") => bail!("Unknown flag: {arg}"),
                _ => positional.push(arg),
            }
        }

        if positional.len() != 2 {
            bail!("Usage: montage-cue <audio.wav> <clips.yaml> [--preset NAME] [--seed N] [--output FILE]");
        }
        Ok(Self {
            audio: PathBuf::from(positional[0]),
            clips: PathBuf::from(positional[1]),
            preset,
            seed,
            output,
        })
    }
}

/// Decode a WAV file into mono f32 samples (first channel)
fn decode_wav(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        bail!("{} has no channels", path.display());
    }

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .step_by(channels)
            .collect::<std::result::Result<_, _>>()
            .context("Failed to decode float samples")?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .step_by(channels)
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<_, _>>()
                .context("Failed to decode integer samples")?
        }
    };

    log::info!(
        "Decoded {}: {} samples, {} Hz, {} channel(s)",
        path.display(),
        samples.len(),
        spec.sample_rate,
        channels
    );
    Ok((samples, spec.sample_rate))
}

/// Load the clip list from YAML
fn load_clips(path: &Path) -> Result<Vec<VideoClip>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let clips: Vec<VideoClip> = serde_yaml::from_str(&text)
        .with_context(|| format!("Failed to parse clip list {}", path.display()))?;
    if clips.is_empty() {
        bail!("{} contains no clips", path.display());
    }
    Ok(clips)
}
