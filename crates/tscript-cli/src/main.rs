//! tscript — terminal session recorder.
//!
//! Spawns an interactive shell on a pseudo-terminal, relays everything
//! between it and the real terminal, and writes the shell's output to a
//! transcript file bracketed by start/done markers.

mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing::error;
use tscript_core::session::{self, SessionOptions};

/// tscript — terminal session recorder
#[derive(Parser)]
#[command(
    name = "tscript",
    version,
    about = "Record an interactive shell session to a transcript file"
)]
struct Cli {
    /// Transcript output file
    file: Option<PathBuf>,

    /// Shell to run instead of $SHELL
    #[arg(short, long)]
    shell: Option<String>,

    /// Config file path
    #[arg(long)]
    config: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so they cannot interleave with relayed bytes.
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("tscript=debug,tscript_cli=debug,tscript_core=debug")
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("tscript=warn,tscript_core=warn")
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    // Load config file.
    let config_path = cli.config.clone().unwrap_or_else(|| {
        let home = dirs::home_dir().unwrap_or_default();
        home.join(".tscript")
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    });
    let cfg = config::Config::load(&config_path).unwrap_or_default();

    // CLI flags override config values.
    let transcript_path = cli
        .file
        .unwrap_or_else(|| PathBuf::from(cfg.defaults.transcript.clone()));
    let shell = cli.shell.or_else(|| {
        let s = cfg.defaults.shell.clone();
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    });

    let options = SessionOptions {
        transcript_path,
        shell,
    };

    match session::run(std::io::stdin(), std::io::stdout(), &options) {
        Ok(summary) => {
            match summary.child_status {
                Some(status) => eprintln!(
                    "tscript: done, transcript written to {} (shell exited with {status})",
                    summary.transcript_path.display()
                ),
                None => eprintln!(
                    "tscript: done, transcript written to {}",
                    summary.transcript_path.display()
                ),
            }
        }
        Err(e) => {
            error!("{e}");
            eprintln!("tscript: {e}");
            std::process::exit(1);
        }
    }
}
