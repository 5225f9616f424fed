use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use stagehand_common::Viewport;
use stagehand_input::Direction;
use stagehand_render::DebugTextRenderer;
use stagehand_runtime::{HeadlessHost, HostEvent, Stage, StageConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stagehand-cli", about = "Headless tools for the stagehand scene")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Run the frame loop without a window, holding arrow keys
    Simulate {
        /// Number of ticks to run
        #[arg(short, long, default_value = "10")]
        ticks: u64,
        /// Arrow key to hold from the first tick (repeatable)
        #[arg(long = "hold", value_enum)]
        held: Vec<Arrow>,
        /// Release all held keys after this many ticks
        #[arg(long)]
        release_after: Option<u64>,
        /// Viewport as WIDTHxHEIGHT
        #[arg(long, default_value = "800x600", value_parser = parse_viewport)]
        viewport: Viewport,
        /// Print the last rendered frame
        #[arg(long)]
        show_frame: bool,
        #[command(flatten)]
        stage: StageArgs,
    },
    /// Print the effective configuration as JSON
    Config {
        #[command(flatten)]
        stage: StageArgs,
        /// Write the configuration to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Arrow {
    Up,
    Down,
    Left,
    Right,
}

impl From<Arrow> for Direction {
    fn from(arrow: Arrow) -> Self {
        match arrow {
            Arrow::Up => Direction::Up,
            Arrow::Down => Direction::Down,
            Arrow::Left => Direction::Left,
            Arrow::Right => Direction::Right,
        }
    }
}

#[derive(Args)]
struct StageArgs {
    /// Stage configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Per-tick displacement for each held arrow key
    #[arg(long)]
    step: Option<f32>,
    /// Disable orbit damping
    #[arg(long)]
    no_damping: bool,
    /// Orbit damping factor in (0, 1]
    #[arg(long)]
    damping_factor: Option<f32>,
}

impl StageArgs {
    fn resolve(&self) -> anyhow::Result<StageConfig> {
        let mut config = match &self.config {
            Some(path) => StageConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => StageConfig::default(),
        };
        if let Some(step) = self.step {
            config.step = step;
        }
        if self.no_damping {
            config.controls.enable_damping = false;
        }
        if let Some(factor) = self.damping_factor {
            config.controls.damping_factor = factor;
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_viewport(s: &str) -> Result<Viewport, String> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let width = w.parse().map_err(|e| format!("bad width {w:?}: {e}"))?;
    let height = h.parse().map_err(|e| format!("bad height {h:?}: {e}"))?;
    Ok(Viewport::new(width, height))
}

fn simulate(
    config: &StageConfig,
    viewport: Viewport,
    ticks: u64,
    held: &[Arrow],
    release_after: Option<u64>,
    show_frame: bool,
) -> anyhow::Result<()> {
    let mut host = HeadlessHost::new(viewport);
    {
        let mut stage = Stage::start(&mut host, DebugTextRenderer::new(viewport), config)?;
        let keys: Vec<&str> = held.iter().map(|a| Direction::from(*a).key()).collect();
        for key in &keys {
            stage.handle_event(HostEvent::KeyDown((*key).to_owned()));
        }

        println!(
            "Simulating {ticks} ticks at {}x{}, step={}, holding [{}]",
            viewport.width,
            viewport.height,
            stage.frame_loop().step(),
            keys.join(", ")
        );
        for _ in 0..ticks {
            let Some(report) = stage.pump() else {
                break;
            };
            match report.position {
                Some(p) => println!(
                    "tick {:>4}: position ({:.3}, {:.3}, {:.3})",
                    report.tick, p.x, p.y, p.z
                ),
                None => println!("tick {:>4}: render only", report.tick),
            }
            if release_after == Some(report.tick) {
                for key in &keys {
                    stage.handle_event(HostEvent::KeyUp((*key).to_owned()));
                }
            }
        }

        let camera = stage.frame_loop().camera();
        println!(
            "camera: position ({:.3}, {:.3}, {:.3}) looking at ({:.3}, {:.3}, {:.3})",
            camera.position.x,
            camera.position.y,
            camera.position.z,
            camera.look_target().x,
            camera.look_target().y,
            camera.look_target().z
        );
        if show_frame {
            print!("{}", stage.frame_loop().renderer().last_frame());
        }
        stage.stop();
    }

    let stats = host.stats();
    tracing::debug!(?stats, "headless host after teardown");
    println!(
        "teardown: listeners {}/{} removed, surface {}/{} detached, frames requested={} cancelled={}",
        stats.listeners_removed,
        stats.listeners_added,
        stats.surface_detaches,
        stats.surface_attaches,
        stats.frames_requested,
        stats.frames_cancelled
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Commands::Info => {
            println!("stagehand-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("input: {}", stagehand_input::crate_info());
            println!("scene: {}", stagehand_scene::crate_info());
            println!("render: {}", stagehand_render::crate_info());
            println!("runtime: {}", stagehand_runtime::crate_info());
            let defaults = StageConfig::default();
            println!(
                "defaults: step={}, damping={} ({})",
                defaults.step, defaults.controls.enable_damping, defaults.controls.damping_factor
            );
        }
        Commands::Simulate {
            ticks,
            held,
            release_after,
            viewport,
            show_frame,
            stage,
        } => {
            let config = stage.resolve()?;
            simulate(&config, viewport, ticks, &held, release_after, show_frame)?;
        }
        Commands::Config { stage, output } => {
            let config = stage.resolve()?;
            match output {
                Some(path) => {
                    config
                        .save(&path)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("wrote {}", path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&config)?),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_parses() {
        assert_eq!(parse_viewport("1920x1080"), Ok(Viewport::new(1920, 1080)));
        assert!(parse_viewport("1920").is_err());
        assert!(parse_viewport("axb").is_err());
    }

    #[test]
    fn simulate_args_parse() {
        let cli = Cli::parse_from([
            "stagehand-cli",
            "simulate",
            "--ticks",
            "3",
            "--hold",
            "up",
            "--hold",
            "right",
            "--no-damping",
        ]);
        let Commands::Simulate {
            ticks, held, stage, ..
        } = cli.command
        else {
            panic!("expected simulate");
        };
        assert_eq!(ticks, 3);
        let keys: Vec<_> = held.iter().map(|a| Direction::from(*a).key()).collect();
        assert_eq!(keys, ["ArrowUp", "ArrowRight"]);
        assert!(!stage.resolve().unwrap().controls.enable_damping);
    }

    #[test]
    fn simulate_runs_headless() {
        let config = StageConfig::default();
        simulate(
            &config,
            Viewport::new(320, 240),
            5,
            &[Arrow::Up],
            Some(2),
            true,
        )
        .unwrap();
    }

    #[test]
    fn config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stage.json");
        let args = StageArgs {
            config: None,
            step: Some(0.25),
            no_damping: false,
            damping_factor: None,
        };
        args.resolve().unwrap().save(&path).unwrap();

        let reload = StageArgs {
            config: Some(path),
            step: None,
            no_damping: true,
            damping_factor: None,
        };
        let config = reload.resolve().unwrap();
        assert_eq!(config.step, 0.25);
        assert!(!config.controls.enable_damping);
    }
}
