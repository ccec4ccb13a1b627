//! Demo and benchmark driver: writes one WAV per preset, then measures
//! how fast presets render.

use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use simple_logger::SimpleLogger;

use sfxr_core::{BatchRenderer, ExportFormat, RenderConfig, Sound, SoundKind, SoundRequest};

#[derive(Parser)]
#[command(name = "sfxr-bench")]
#[command(about = "Render every sfxr preset and benchmark synthesis", long_about = None)]
struct Cli {
    /// Directory the demo WAV files are written to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Sounds rendered per preset during the benchmark
    #[arg(short = 'n', long, default_value = "1000")]
    count: usize,

    /// Worker threads for the benchmark (0 renders on the main thread)
    #[arg(short = 't', long, default_value = "0")]
    threads: usize,

    /// Seed for preset generation
    #[arg(short, long, default_value = "0")]
    seed: u64,

    /// Write 32-bit float WAVs instead of PCM
    #[arg(long)]
    float: bool,

    /// Skip the demo files and only benchmark
    #[arg(long)]
    no_demo: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn file_stem(kind: SoundKind) -> String {
    kind.name().to_lowercase().replace('/', "_")
}

fn write_demo_files(cli: &Cli) -> Result<(), Box<dyn Error>> {
    std::fs::create_dir_all(&cli.out_dir)?;
    let mut sound = Sound::default();
    sound.seed(cli.seed);
    for kind in SoundKind::ALL {
        sound.create_preset(kind);
        let path = cli.out_dir.join(format!("snd_{}.wav", file_stem(kind)));
        if cli.float {
            sound.export_wav_float_file(&path)?;
        } else {
            sound.export_wav_file(&path)?;
        }
        log::info!("{kind}: {} samples -> {}", sound.quick_info().total_samples, path.display());
    }
    Ok(())
}

/// Renders `count` sounds per preset; returns (sounds, samples).
fn bench_single(cli: &Cli) -> (usize, usize) {
    let mut sound = Sound::default();
    sound.seed(cli.seed);
    let mut samples = 0;
    for kind in SoundKind::ALL {
        log::info!("Creating {} x {kind}", cli.count);
        for _ in 0..cli.count {
            samples += sound.create_preset(kind);
        }
    }
    (cli.count * SoundKind::ALL.len(), samples)
}

fn bench_pool(cli: &Cli) -> Result<(usize, usize), Box<dyn Error>> {
    let pool = BatchRenderer::new(cli.threads, RenderConfig::default(), ExportFormat::Float)?;
    let requests = SoundKind::ALL.into_iter().flat_map(move |kind| {
        (0..cli.count as u64).map(move |i| SoundRequest::Preset {
            kind,
            seed: cli.seed.wrapping_add(i),
        })
    });
    let mut sounds = 0;
    let mut samples = 0;
    for result in pool.render_all(requests) {
        samples += result?.info.total_samples;
        sounds += 1;
    }
    Ok((sounds, samples))
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    SimpleLogger::new().with_level(level).init()?;

    if !cli.no_demo {
        write_demo_files(&cli)?;
    }

    let start = Instant::now();
    let (sounds, samples) = if cli.threads == 0 {
        bench_single(&cli)
    } else {
        bench_pool(&cli)?
    };
    let elapsed = start.elapsed().as_secs_f64().max(f64::EPSILON);

    log::info!("Rendered {sounds} sounds in {elapsed:.3} s");
    log::info!("{:.1} sounds/sec", sounds as f64 / elapsed);
    log::info!(
        "{:.1}x realtime ({samples} samples)",
        samples as f64 / elapsed / 44_100.0
    );
    Ok(())
}
