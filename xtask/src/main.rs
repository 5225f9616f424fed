use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

/// Crates that need a window system or GPU to build their tests.
const WINDOWED: &[&str] = &["stagehand-desktop", "stagehand-render-wgpu"];

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for stagehand")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: fmt, clippy, tests, doc
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test {
        /// Skip crates that need a window system or GPU
        #[arg(long)]
        headless: bool,
    },
    /// Build rustdoc for the workspace
    Doc,
    /// Build the entire workspace
    Build,
    /// Run the headless simulation with the up arrow held
    Demo {
        #[arg(short, long, default_value = "10")]
        ticks: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            cargo("fmt --check", &["fmt", "--all", "--", "--check"])?;
            clippy()?;
            test(false)?;
            cargo("doc", &["doc", "--workspace", "--no-deps"])?;
        }
        Commands::Fmt => cargo("fmt --check", &["fmt", "--all", "--", "--check"])?,
        Commands::Clippy => clippy()?,
        Commands::Test { headless } => test(headless)?,
        Commands::Doc => cargo("doc", &["doc", "--workspace", "--no-deps"])?,
        Commands::Build => cargo("build", &["build", "--workspace"])?,
        Commands::Demo { ticks } => {
            let ticks = ticks.to_string();
            cargo(
                "stagehand-cli simulate",
                &[
                    "run",
                    "-p",
                    "stagehand-cli",
                    "--",
                    "simulate",
                    "--ticks",
                    &ticks,
                    "--hold",
                    "up",
                    "--show-frame",
                ],
            )?;
        }
    }

    Ok(())
}

fn clippy() -> Result<()> {
    cargo(
        "clippy",
        &[
            "clippy",
            "--workspace",
            "--all-targets",
            "--",
            "-D",
            "warnings",
        ],
    )
}

fn test(headless: bool) -> Result<()> {
    let mut args = vec!["test", "--workspace"];
    if headless {
        for &krate in WINDOWED {
            args.extend(["--exclude", krate]);
        }
    }
    cargo("test", &args)
}

fn cargo(step: &str, args: &[&str]) -> Result<()> {
    println!("==> Running cargo {step}");
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("cargo {step} failed");
    }
    Ok(())
}
