use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use attractor_core::{
    AttractorConfig, AttractorController, AttractorError, OverlayCanvas, PlayRequest, Recorder,
    RecordingSettings, RectProjector, SharedTarget, Vec3,
};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Simulated time after which a run that never went idle is torn down.
const MAX_SIMULATED_SECONDS: f64 = 120.0;

fn main() -> attractor_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate(args) => run_simulate(&args),
        Commands::Curve { count, config } => run_curve(count, config.as_deref()),
        Commands::Config { output } => run_config(&output),
    }
}

fn run_simulate(args: &SimulateArgs) -> attractor_core::Result<()> {
    if !(args.fps.is_finite() && args.fps > 0.0) {
        return Err(AttractorError::invalid("fps must be positive"));
    }

    let mut config = load_config(args.config.as_deref())?;
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let canvas = OverlayCanvas::new();
    let mut controller = AttractorController::builder(config)
        .projector(RectProjector::new(Vec3::ZERO, 1.0))
        .visuals(canvas.clone())
        .build()?;

    let target = SharedTarget::new(Vec3::new(args.target[0], args.target[1], 0.0));
    let landed = Rc::new(Cell::new(0usize));
    let finished = Rc::new(Cell::new(false));

    let mut request = PlayRequest::new(args.count, Vec3::new(args.source[0], args.source[1], 0.0))
        .target(target.clone())
        .on_complete({
            let landed = Rc::clone(&landed);
            move || {
                landed.set(landed.get() + 1);
                tracing::info!(landed = landed.get(), "token landed");
            }
        })
        .on_all_completed({
            let finished = Rc::clone(&finished);
            move || {
                finished.set(true);
                tracing::info!("all tokens landed");
            }
        });
    if let Some(radius) = args.radius {
        request = request.radius(radius);
    }

    let batch = controller.play(request)?;
    tracing::info!(
        batch = batch.0,
        delays = ?controller.pending_delays(batch),
        "launches queued"
    );

    let mut recorder = args.record.as_ref().map(|path| {
        Recorder::new(RecordingSettings {
            output_path: path.display().to_string(),
            fps: args.fps.round().max(1.0) as u32,
        })
    });
    if let Some(recorder) = recorder.as_mut() {
        recorder.start()?;
    }

    let dt = 1.0 / args.fps;
    let drift = Vec3::new(args.target_velocity[0], args.target_velocity[1], 0.0);
    controller.tick(0.0);
    while !controller.is_idle() {
        if controller.now() > MAX_SIMULATED_SECONDS {
            tracing::warn!(now = controller.now(), "simulation did not settle, tearing down");
            controller.teardown();
            break;
        }

        target.set(target.get() + drift * dt);
        let report = controller.tick(dt);
        if report.spawned > 0 {
            tracing::debug!(spawned = report.spawned, now = controller.now(), "launch");
        }
        if let Some(recorder) = recorder.as_mut() {
            recorder.capture(controller.now(), canvas.snapshot());
        }
        canvas.draw()?;
    }

    if let Some(recorder) = recorder.as_mut() {
        recorder.stop()?;
        recorder.write()?;
        tracing::info!(frames = recorder.frames().len(), "recording written");
    }

    tracing::info!(
        landed = landed.get(),
        finished = finished.get(),
        created = canvas.created(),
        destroyed = canvas.destroyed(),
        elapsed = controller.now(),
        "simulation finished"
    );
    Ok(())
}

fn run_curve(count: i32, config: Option<&Path>) -> attractor_core::Result<()> {
    let config = load_config(config)?;
    let interval = config.interval.evaluate(count);
    let radius = config.radius.evaluate(count);
    println!("count={count} interval={interval:.4}s radius={radius:.2}");
    Ok(())
}

fn run_config(output: &Path) -> attractor_core::Result<()> {
    tracing::info!(?output, "writing default configuration");
    std::fs::write(output, AttractorConfig::default().to_json_string()?)?;
    Ok(())
}

fn load_config(path: Option<&Path>) -> attractor_core::Result<AttractorConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            AttractorConfig::load(path)
        }
        None => Ok(AttractorConfig::default()),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Token attraction effect driver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play one burst against an in-memory overlay until every token lands.
    Simulate(SimulateArgs),
    /// Print the interval and radius the configured curves give for a count.
    Curve {
        count: i32,
        /// Configuration file to read instead of the defaults.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Write the default configuration as JSON.
    Config {
        /// Destination of the configuration file.
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// Number of tokens to launch.
    #[arg(short = 'n', long, default_value_t = 10)]
    count: i32,
    /// Configuration file to read instead of the defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Host frame rate driving the simulation.
    #[arg(long, default_value_t = 60.0)]
    fps: f32,
    /// Seed for spawn anchors and rotations.
    #[arg(long)]
    seed: Option<u64>,
    /// Explicit spawn radius; resolved from the radius curve when omitted.
    #[arg(long)]
    radius: Option<f32>,
    /// Source point in world space.
    #[arg(long, num_args = 2, value_names = ["X", "Y"], default_values_t = [0.0, 0.0], allow_negative_numbers = true)]
    source: Vec<f32>,
    /// Initial target point in world space.
    #[arg(long, num_args = 2, value_names = ["X", "Y"], default_values_t = [400.0, 300.0], allow_negative_numbers = true)]
    target: Vec<f32>,
    /// Target drift in units per second.
    #[arg(long, num_args = 2, value_names = ["X", "Y"], default_values_t = [0.0, 0.0], allow_negative_numbers = true)]
    target_velocity: Vec<f32>,
    /// Write the captured frames to this JSON file.
    #[arg(long)]
    record: Option<PathBuf>,
}
