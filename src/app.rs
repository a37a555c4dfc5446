//! Headless demo driver.
//!
//! Loads the lab configuration, runs one experiment on a fixed-step clock
//! against the headless backend until it auto-stops (or the time limit is
//! reached), then writes the recorded readouts as CSV.

use crate::error::LabError;
use crate::experiment::ExperimentRegistry;
use crate::scene::backend::{BackendStats, HeadlessBackend};
use crate::simulation::{LabConfig, ManualClock, SimulationController, SimulationState};
use std::io::Write;
use std::path::PathBuf;

const DEFAULT_CONFIG_PATH: &str = "lab_config.ron";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Lab(#[from] LabError),
    #[error("invalid arguments: {0}")]
    Args(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Command-line options of the demo binary.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoArgs {
    pub experiment: Option<String>,
    pub config: PathBuf,
    pub csv: Option<PathBuf>,
    pub overrides: Vec<(String, f64)>,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            experiment: None,
            config: PathBuf::from(DEFAULT_CONFIG_PATH),
            csv: None,
            overrides: Vec::new(),
        }
    }
}

impl DemoArgs {
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self, AppError> {
        let mut parsed = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    parsed.config = args
                        .next()
                        .map(PathBuf::from)
                        .ok_or_else(|| AppError::Args("--config needs a path".into()))?;
                }
                "--csv" => {
                    parsed.csv = Some(
                        args.next()
                            .map(PathBuf::from)
                            .ok_or_else(|| AppError::Args("--csv needs a path".into()))?,
                    );
                }
                "--set" => {
                    let pair = args
                        .next()
                        .ok_or_else(|| AppError::Args("--set needs ID=VALUE".into()))?;
                    parsed.overrides.push(parse_override(&pair)?);
                }
                flag if flag.starts_with("--") => {
                    return Err(AppError::Args(format!("unknown option {}", flag)));
                }
                id => {
                    if parsed.experiment.is_some() {
                        return Err(AppError::Args(format!("unexpected argument {}", id)));
                    }
                    parsed.experiment = Some(id.to_string());
                }
            }
        }
        Ok(parsed)
    }
}

fn parse_override(pair: &str) -> Result<(String, f64), AppError> {
    let (id, value) = pair
        .split_once('=')
        .ok_or_else(|| AppError::Args(format!("expected ID=VALUE, got {}", pair)))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| AppError::Args(format!("bad value for {}: {}", id, e)))?;
    Ok((id.trim().to_string(), value))
}

/// Outcome of one demo run.
#[derive(Debug, Clone)]
pub struct DemoSummary {
    pub experiment: String,
    pub final_state: SimulationState,
    pub simulated_time: f64,
    pub frames: usize,
    pub csv: String,
    pub backend: BackendStats,
}

/// Run one experiment to completion with the given configuration.
pub fn run_demo(args: &DemoArgs, config: LabConfig) -> Result<DemoSummary, AppError> {
    let experiment = args
        .experiment
        .clone()
        .unwrap_or_else(|| config.startup_experiment.clone());
    let interval = if config.demo_frame_interval > 0.0 {
        config.demo_frame_interval
    } else {
        1.0 / 60.0
    };
    let max_seconds = config.demo_max_seconds.max(0.0);

    let clock = ManualClock::new();
    let mut controller = SimulationController::new(
        HeadlessBackend::new(),
        clock.clone(),
        ExperimentRegistry::with_builtin(),
        config,
    );

    controller.select_experiment(&experiment)?;
    for (id, value) in &args.overrides {
        controller.set_parameter(id, *value)?;
    }
    controller.start()?;

    let max_frames = (max_seconds / interval).round() as usize;
    let mut frames = 0;
    while frames < max_frames {
        clock.advance(interval);
        if !controller.pump_frame() {
            log::warn!("No frame pending; stopping early");
            break;
        }
        frames += 1;
        if controller.state() != SimulationState::Running {
            break;
        }
    }

    for readout in controller.readouts() {
        log::info!("{} = {:.4} {}", readout.name, readout.value, readout.unit);
    }

    let summary = DemoSummary {
        experiment,
        final_state: controller.state(),
        simulated_time: controller.time(),
        frames,
        csv: controller.recorder().to_csv(),
        backend: BackendStats::default(),
    };
    controller.close();
    Ok(DemoSummary {
        backend: controller.backend().stats().clone(),
        ..summary
    })
}

fn run_with_args(args: DemoArgs) -> Result<(), AppError> {
    let config = LabConfig::load(&args.config);
    let summary = run_demo(&args, config)?;

    log::info!(
        "'{}' ended {} at t = {:.3}s after {} frames",
        summary.experiment,
        summary.final_state,
        summary.simulated_time,
        summary.frames
    );
    log::info!(
        "Backend: {} frames rendered, {} geometries / {} materials released, {} live surfaces",
        summary.backend.frames_rendered,
        summary.backend.geometries_released,
        summary.backend.materials_released,
        summary.backend.live_surfaces()
    );

    match &args.csv {
        Some(path) => {
            std::fs::write(path, &summary.csv)?;
            log::info!("Wrote recorded data to {:?}", path);
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            out.write_all(summary.csv.as_bytes())?;
            out.flush()?;
        }
    }
    Ok(())
}

pub fn run() {
    env_logger::init();

    let result = DemoArgs::parse(std::env::args().skip(1)).and_then(run_with_args);
    if let Err(e) = result {
        log::error!("{}", e);
        eprintln!("virtual-lab: {}", e);
        std::process::exit(1);
    }
}
