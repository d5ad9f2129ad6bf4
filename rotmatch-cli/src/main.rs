use clap::{Args, Parser, Subcommand};
use image::Rgb;
use imageproc::drawing::draw_line_segment_mut;
use rotmatch::{
    DetectionLoop, DetectorState, FixedTemplates, Frame, KeyBindings, LoopConfig, Match,
    MatchEngine, RotMatchError, RotMatchResult, VariantLibrary, ACCEPTANCE_THRESHOLD,
    DEFAULT_ANGLE_STEP_DEG, DEFAULT_WORKERS,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod replay;

use replay::{LogDispatcher, ReplaySource, StdinTriggers};

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Rotation-invariant template detection (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json", global = true)]
    config: PathBuf,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable debug-level tracing output.
    #[arg(long, global = true)]
    trace: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the rotated variants of the reference and save them.
    Precompute,
    /// Match one image file against the rotated variants.
    Match {
        /// Image to search.
        #[arg(long, value_name = "FILE")]
        image: PathBuf,
        /// Write a copy of the image with the matched box drawn on it.
        #[arg(long, value_name = "OUT")]
        annotate: Option<PathBuf>,
    },
    /// Run the detection loop over replayed frames.
    Run(RunArgs),
    /// Print an example config.
    PrintExample,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Start with the rotating detector enabled.
    #[arg(long)]
    rotating: bool,
    /// Start with the fixed-target detector enabled.
    #[arg(long)]
    fixed: bool,
    /// Start with the restart-button detector enabled.
    #[arg(long)]
    restart: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    window_title: String,
    frames_dir: PathBuf,
    library_path: PathBuf,
    rotating_template: Option<PathBuf>,
    angle_step_deg: u32,
    fixed_templates: BTreeMap<String, PathBuf>,
    acceptance_threshold: f32,
    poll_interval_ms: u64,
    capture_backoff_ms: u64,
    workers: usize,
    keys: KeyBindings,
}

impl Default for Config {
    fn default() -> Self {
        let loop_cfg = LoopConfig::default();
        Self {
            window_title: String::new(),
            frames_dir: PathBuf::from("frames"),
            library_path: PathBuf::from("rotated_variants.json"),
            rotating_template: None,
            angle_step_deg: DEFAULT_ANGLE_STEP_DEG,
            fixed_templates: BTreeMap::new(),
            acceptance_threshold: ACCEPTANCE_THRESHOLD,
            poll_interval_ms: loop_cfg.poll_interval.as_millis() as u64,
            capture_backoff_ms: loop_cfg.capture_backoff.as_millis() as u64,
            workers: DEFAULT_WORKERS,
            keys: KeyBindings::default(),
        }
    }
}

impl Config {
    fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            window_title: self.window_title.clone(),
            acceptance_threshold: self.acceptance_threshold,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            capture_backoff: Duration::from_millis(self.capture_backoff_ms),
        }
    }

    /// Loads the stored variants, precomputing them first when a reference
    /// is configured and the store is missing or corrupt.
    fn library(&self) -> RotMatchResult<VariantLibrary> {
        match &self.rotating_template {
            Some(reference) => {
                VariantLibrary::load_or_build(&self.library_path, reference, self.angle_step_deg)
            }
            None => VariantLibrary::load_or_empty(&self.library_path),
        }
    }

    /// Like [`Config::library`], but an unreadable or flat reference leaves
    /// the rotating detector idle instead of failing.
    fn library_or_idle(&self) -> RotMatchResult<VariantLibrary> {
        match self.library() {
            Err(err @ RotMatchError::InvalidReference { .. }) => {
                warn!("{err}; the rotating detector stays idle");
                Ok(VariantLibrary::empty())
            }
            other => other,
        }
    }
}

#[derive(Debug, Serialize)]
struct MatchRecord {
    x: usize,
    y: usize,
    angle_deg: u32,
    score: f32,
    center: (usize, usize),
    accepted: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.print_example || matches!(cli.command, Some(Command::PrintExample)) {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let level = if cli.trace { "rotmatch=debug" } else { "rotmatch=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .with_target(false)
        .init();

    let Some(command) = cli.command else {
        return Err("no command given; try --help".into());
    };

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;

    match command {
        Command::Precompute => precompute(&config),
        Command::Match { image, annotate } => match_image(&config, &image, annotate.as_deref()),
        Command::Run(args) => run(&config, &args),
        Command::PrintExample => Ok(()),
    }
}

fn precompute(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let Some(reference) = &config.rotating_template else {
        return Err("rotating_template must be set in the config".into());
    };
    let library = VariantLibrary::build_from_path(reference, config.angle_step_deg)?;
    library.save(&config.library_path)?;
    info!(
        "saved {} variants to {}",
        library.len(),
        config.library_path.display()
    );
    Ok(())
}

fn match_image(
    config: &Config,
    image_path: &Path,
    annotate: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let library = config.library()?;
    let engine = MatchEngine::new(config.workers)?;
    let decoded = image::open(image_path)?;
    let frame = Frame::from_dynamic(&decoded)?;

    let best = engine.match_all(&frame, &library)?;
    let (width, height) = library.template_size().unwrap_or((0, 0));
    let record = MatchRecord {
        x: best.x,
        y: best.y,
        angle_deg: best.angle_deg,
        score: best.score,
        center: best.center(width, height),
        accepted: best.is_accepted(config.acceptance_threshold),
    };
    println!("{}", serde_json::to_string_pretty(&record)?);

    if let Some(out) = annotate {
        draw_match(&decoded, &best, (width, height), record.accepted, out)?;
        info!("annotated image written to {}", out.display());
    }
    Ok(())
}

fn draw_match(
    decoded: &image::DynamicImage,
    best: &Match,
    (width, height): (usize, usize),
    accepted: bool,
    out: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut canvas = decoded.to_rgb8();
    let color = if accepted {
        Rgb([0, 220, 0])
    } else {
        Rgb([220, 0, 0])
    };
    let corners = best.corners(width, height);
    for (idx, &start) in corners.iter().enumerate() {
        let end = corners[(idx + 1) % corners.len()];
        draw_line_segment_mut(&mut canvas, start, end, color);
    }
    canvas.save(out)?;
    Ok(())
}

fn run(config: &Config, args: &RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let library = config.library_or_idle()?;
    let (fixed, failures) = FixedTemplates::load(
        config
            .fixed_templates
            .iter()
            .map(|(name, path)| (name.as_str(), path)),
    );
    if !failures.is_empty() {
        warn!(
            "{} of {} fixed templates failed to load; their detectors stay idle",
            failures.len(),
            config.fixed_templates.len()
        );
    }

    let state = Arc::new(DetectorState::with_enabled(
        args.rotating,
        args.fixed,
        args.restart,
    ));
    let mut triggers = StdinTriggers::default();
    state.register_triggers(&mut triggers, &config.keys);
    triggers.spawn()?;

    let stop_state = Arc::clone(&state);
    ctrlc::set_handler(move || stop_state.stop())?;

    let engine = MatchEngine::new(config.workers)?;
    let mut detection = DetectionLoop::new(
        ReplaySource::new(&config.frames_dir),
        LogDispatcher,
        engine,
    )
    .with_config(config.loop_config())
    .with_library(library)
    .with_fixed_templates(fixed)
    .with_state(state);

    info!(
        "keys: {} rotating, {} fixed, {} restart, {} stop",
        config.keys.toggle_rotating,
        config.keys.toggle_fixed,
        config.keys.toggle_restart,
        config.keys.stop
    );
    let summary = detection.run();
    info!(
        "{} iterations, {} missed captures, {} clicks, {} detector failures",
        summary.iterations, summary.missed_captures, summary.clicks, summary.failures
    );
    Ok(())
}
