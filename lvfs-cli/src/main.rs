//! lvfs CLI - Mount a flash filesystem under a drive letter and use it.
//!
//! Usage:
//!   lvfs [options] <command>
//!
//! Examples:
//!   lvfs selftest                        # Self-test on an in-memory S: drive
//!   lvfs --root ./flash selftest         # Same, backed by a host directory
//!   lvfs --image assets.zip ls S:        # List a flash image
//!   lvfs --root ./flash put S:a.txt a.txt
//!   lvfs --config mounts.json cat H:boot/config.txt

mod selftest;

use std::future::Future;
use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::{LevelFilter, Metadata, Record};
use tokio::task::JoinHandle;

use lvfs_core::{
    parse_drive_path, BackendConfig, DriveConfig, DriveRegistry, MountConfig, OpenMode,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Drive-letter flash filesystem CLI
#[derive(Parser, Debug)]
#[command(name = "lvfs")]
#[command(about = "Mount a flash filesystem under a drive letter")]
struct Args {
    /// JSON mount configuration (replaces the drive options below)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Drive letter to register
    #[arg(short, long, default_value_t = 'S', global = true)]
    letter: char,

    /// Host directory acting as the flash partition (in-memory if omitted)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Capacity of the in-memory flash in bytes
    #[arg(long, global = true)]
    capacity: Option<usize>,

    /// ZIP image to seed the in-memory flash with
    #[arg(long, global = true)]
    image: Option<PathBuf>,

    /// Mount read-only
    #[arg(long, global = true)]
    read_only: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Trace every file operation
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Write, read back, seek and list on the drive
    Selftest,
    /// List a directory
    Ls {
        /// Directory (defaults to the drive root)
        path: Option<String>,
    },
    /// Print a file to stdout
    Cat { path: String },
    /// Copy a host file onto the drive
    Put { path: String, local: PathBuf },
}

/// Logger writing `[LEVEL] message` lines to stderr.
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(args: &Args) {
    let level = if args.trace {
        LevelFilter::Trace
    } else if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

/// Mount configuration from `--config`, or a single drive from the flags.
fn mount_config(args: &Args) -> CliResult<MountConfig> {
    if let Some(path) = &args.config {
        return Ok(MountConfig::from_path(path)?);
    }

    let backend = match &args.root {
        Some(root) => BackendConfig::Host {
            root: root.clone(),
            format_on_fail: true,
        },
        None => BackendConfig::Memory {
            capacity: args.capacity,
            image: args.image.clone(),
        },
    };
    Ok(MountConfig {
        drives: vec![DriveConfig {
            letter: args.letter,
            backend,
            read_only: args.read_only,
        }],
    })
}

/// Prefix `path` with the default drive unless it names one already.
fn on_drive(letter: char, path: &str) -> String {
    if parse_drive_path(path).is_ok() {
        path.to_string()
    } else {
        format!("{}:{}", letter, path)
    }
}

fn run_command(registry: &DriveRegistry, letter: char, command: Command) -> CliResult<()> {
    match command {
        Command::Selftest => {
            if !selftest::run(registry, letter) {
                return Err("self-test failed".into());
            }
        }
        Command::Ls { path } => {
            let path = on_drive(letter, path.as_deref().unwrap_or(""));
            let dir = registry.dir_open(&path)?;
            while let Some(name) = registry.dir_next(dir)? {
                println!("{}", name);
            }
            registry.dir_close(dir)?;
        }
        Command::Cat { path } => {
            let f = registry.open(&on_drive(letter, &path), OpenMode::Read)?;
            let data = registry.read_to_end(f);
            registry.close(f)?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&data?)?;
            stdout.flush()?;
        }
        Command::Put { path, local } => {
            let data = std::fs::read(&local)?;
            let path = on_drive(letter, &path);
            let f = registry.open(&path, OpenMode::Write)?;
            let written = registry.write(f, &data);
            registry.close(f)?;
            eprintln!("Wrote {} bytes to {}", written?, path);
        }
    }
    Ok(())
}

/// Wait for the blocking task unless `interrupt` fires first, which is an error.
async fn wait_or_interrupt(
    task: JoinHandle<CliResult<()>>,
    interrupt: impl Future<Output = std::io::Result<()>>,
) -> CliResult<()> {
    tokio::select! {
        res = task => res?,
        _ = interrupt => {
            eprintln!("\nInterrupted");
            Err("interrupted".into())
        }
    }
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let args = Args::parse();
    init_logging(&args);

    let config = mount_config(&args)?;
    let registry = DriveRegistry::new();
    if let Err(e) = config.mount_all(&registry) {
        eprintln!("Failed to mount drives: {}", e);
        return Err(e.into());
    }
    log::debug!("registered drives: {:?}", registry.letters());

    let letter = args.letter.to_ascii_uppercase();
    let command = args.command.clone();

    // File operations block; keep them off the async runtime
    let task_registry = registry.clone();
    let handle =
        tokio::task::spawn_blocking(move || run_command(&task_registry, letter, command));

    let result = wait_or_interrupt(handle, tokio::signal::ctrl_c()).await;

    if let Err(e) = &result {
        eprintln!("Error: {}", e);
    }
    result
}
