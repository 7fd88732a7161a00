//! Command-line front end: run every configured solver on one task.
//!
//! Outcomes are printed to stdout as one JSON object per line, in the order
//! the solvers finish.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ricrob::core::task::{Coord, Robots, Task, Tiles};
use ricrob::io::config::{DispatchConfig, resolve_config, write_config};
use ricrob::{Dispatcher, exit_codes, logging};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "ricrob",
    version,
    about = "Run every configured Ricochet Robots solver on one task"
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true, env = "RICROB_CONFIG")]
    config: Option<PathBuf>,

    /// Comma-separated solver executables; replaces the configured list.
    #[arg(long, global = true, env = "SOLVERS")]
    solvers: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Solve one task, printing one JSON line per solver outcome.
    Solve(TaskArgs),
    /// Print the effective configuration as TOML.
    Config {
        /// Also write it to this file.
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

#[derive(Args)]
struct TaskArgs {
    /// Top-left tile.
    #[arg(long)]
    tl: String,
    /// Top-right tile.
    #[arg(long)]
    tr: String,
    /// Bottom-left tile.
    #[arg(long)]
    bl: String,
    /// Bottom-right tile.
    #[arg(long)]
    br: String,
    /// Yellow robot as `x,y`.
    #[arg(long)]
    yellow: Coord,
    #[arg(long)]
    red: Coord,
    #[arg(long)]
    green: Coord,
    #[arg(long)]
    blue: Coord,
    /// Target symbol.
    #[arg(long)]
    target: String,
}

impl From<TaskArgs> for Task {
    fn from(args: TaskArgs) -> Self {
        Task {
            tiles: Tiles {
                top_left: args.tl,
                top_right: args.tr,
                bottom_left: args.bl,
                bottom_right: args.br,
            },
            robots: Robots {
                yellow: args.yellow,
                red: args.red,
                green: args.green,
                blue: args.blue,
            },
            target: args.target,
        }
    }
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let cfg = resolve_config(cli.config.as_deref(), cli.solvers.as_deref())
        .context("load configuration")?;
    match cli.command {
        Command::Solve(args) => cmd_solve(cfg, args.into()),
        Command::Config { write } => cmd_config(&cfg, write),
    }
}

fn cmd_solve(cfg: DispatchConfig, task: Task) -> Result<i32> {
    task.validate().context("invalid task")?;
    let dispatcher = Dispatcher::new(cfg);
    info!(solvers = dispatcher.solvers().len(), "dispatching task");

    let mut stream = dispatcher.execute(task);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut solved = 0usize;
    while let Some(outcome) = stream.blocking_recv() {
        if outcome.is_success() {
            solved += 1;
        }
        serde_json::to_writer(&mut out, &outcome).context("serialize outcome")?;
        writeln!(out).context("write outcome")?;
        out.flush().context("flush stdout")?;
    }

    Ok(if solved > 0 {
        exit_codes::OK
    } else {
        exit_codes::NO_SOLUTION
    })
}

fn cmd_config(cfg: &DispatchConfig, write: Option<PathBuf>) -> Result<i32> {
    let rendered = toml::to_string_pretty(cfg).context("serialize config toml")?;
    print!("{rendered}");
    if let Some(path) = write {
        write_config(&path, cfg).with_context(|| format!("write {}", path.display()))?;
    }
    Ok(exit_codes::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOLVE: [&str; 20] = [
        "ricrob", "solve", "--tl", "A1", "--tr", "B2", "--bl", "C3", "--br", "D4", "--yellow",
        "0,0", "--red", "15,0", "--green", "0,15", "--blue", "15,15", "--target", "yellow-pyramid",
    ];

    #[test]
    fn parse_solve_builds_task() {
        let cli = Cli::parse_from(SOLVE);
        let Command::Solve(args) = cli.command else {
            panic!("expected solve");
        };
        let task: Task = args.into();
        assert_eq!(task, ricrob::test_support::sample_task());
    }

    #[test]
    fn parse_rejects_bad_coordinate() {
        let mut argv = SOLVE.to_vec();
        argv[11] = "zero";
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn parse_global_solvers_after_subcommand() {
        let cli = Cli::parse_from(["ricrob", "config", "--solvers", "a,b"]);
        assert_eq!(cli.solvers.as_deref(), Some("a,b"));
        assert!(matches!(cli.command, Command::Config { write: None }));
    }
}
