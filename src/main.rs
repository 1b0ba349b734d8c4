//! `vkvideo-dl` command line front end

use clap::{ArgAction, Parser};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use vkvideo_dl::{
    Config, DownloadTask, Error, Outcome, ProgressEvent, ProgressStatus, TaskEvent, TaskState,
    cancel_on_signal, new_download,
};

const EXIT_FAILED: u8 = 1;
const EXIT_CANCELLED: u8 = 130;

/// Download a VK video by link or identifier
#[derive(Parser, Debug)]
#[command(name = "vkvideo-dl", version, about, long_about = None)]
struct Args {
    /// Video link (vk.com, vkvideo.ru, clip) or bare id such as -12345_67890.
    /// Prompted for when omitted.
    #[arg(allow_hyphen_values = true)]
    input: Option<String>,

    /// Directory to save the video into (default: current directory)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path to the yt-dlp executable
    #[arg(long = "yt-dlp", value_name = "PATH")]
    yt_dlp: Option<PathBuf>,

    /// Never download yt-dlp automatically
    #[arg(long)]
    no_install: bool,

    /// yt-dlp format selector
    #[arg(short, long)]
    format: Option<String>,

    /// Print events and the outcome as JSON lines
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: cannot start async runtime: {e}");
            return ExitCode::from(EXIT_FAILED);
        }
    };

    let result = runtime.block_on(run(args));
    // The stdin reader sits in a blocking read that cannot be interrupted
    runtime.shutdown_background();

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(error = ?e, "exiting with error");
            eprintln!("Error: {e}");
            ExitCode::from(EXIT_FAILED)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn load_config(args: &Args) -> vkvideo_dl::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_env_overrides();

    if let Some(dir) = &args.output_dir {
        config.download.output_dir = Some(dir.clone());
    }
    if let Some(path) = &args.yt_dlp {
        config.engine.binary_path = Some(path.clone());
    }
    if args.no_install {
        config.engine.auto_install = false;
    }
    if let Some(format) = &args.format {
        config.engine.format = format.clone();
    }

    config.validate()?;
    Ok(config)
}

async fn run(args: Args) -> vkvideo_dl::Result<ExitCode> {
    let config = load_config(&args)?;
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    let input = match &args.input {
        Some(input) => input.clone(),
        None => {
            print!("Paste a VK video link or ID: ");
            std::io::stdout().flush()?;
            stdin.next_line().await?.unwrap_or_default()
        }
    };

    let (task, mut events) = match new_download(&input, &config) {
        Ok(created) => created,
        Err(Error::Normalize(e)) => {
            eprintln!("{e}");
            return Ok(ExitCode::from(EXIT_FAILED));
        }
        Err(e) => return Err(e),
    };

    task.start()?;
    tokio::spawn(cancel_on_signal(task.clone()));
    tokio::spawn(read_controls(stdin, task.clone(), args.json));

    if !args.json {
        eprintln!("Commands: p = pause, r = resume, c = cancel (Enter to send)");
    }

    let mut outcome = None;
    while let Some(event) = events.recv().await {
        print_event(&event, args.json);
        if let TaskEvent::Finished { outcome: finished } = event {
            outcome = Some(finished);
            break;
        }
    }

    let outcome = match outcome {
        Some(outcome) => outcome,
        None => task.join().await,
    };

    Ok(match outcome {
        Outcome::Completed { .. } => ExitCode::SUCCESS,
        Outcome::Cancelled => ExitCode::from(EXIT_CANCELLED),
        Outcome::Failed { .. } => ExitCode::from(EXIT_FAILED),
    })
}

/// Keyboard control: one command per line
async fn read_controls<R>(mut lines: Lines<BufReader<R>>, task: DownloadTask, quiet: bool)
where
    R: AsyncRead + Unpin,
{
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                tracing::debug!(error = %e, "stdin closed");
                return;
            }
        };

        let state = match line.trim() {
            "p" | "pause" => task.pause(),
            "r" | "resume" => task.resume(),
            "c" | "cancel" => task.cancel(),
            "" => continue,
            other => {
                if !quiet {
                    eprintln!("Unknown command {other:?}; use p, r or c");
                }
                continue;
            }
        };

        if state.is_terminal() {
            return;
        }
    }
}

fn print_event(event: &TaskEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "cannot serialize event"),
        }
        return;
    }

    match event {
        TaskEvent::StateChanged { state } => match state {
            TaskState::Paused => eprintln!("Paused. Type r to resume or c to cancel."),
            TaskState::Running => {}
            TaskState::Cancelling => eprintln!("Cancelling..."),
            other => tracing::debug!(state = %other, "state changed"),
        },
        TaskEvent::Progress { event } => print_progress(event),
        TaskEvent::Finished { outcome } => match outcome {
            Outcome::Completed { path } => println!("Saved to {}", path.display()),
            Outcome::Cancelled => eprintln!("Download cancelled."),
            Outcome::Failed { detail } => eprintln!("Download failed: {detail}"),
        },
    }
}

fn print_progress(event: &ProgressEvent) {
    let text = event.text.as_deref().unwrap_or_default();
    match event.status {
        ProgressStatus::Downloading => {
            let percent = event
                .percent
                .map(|p| format!("{p:5.1}%"))
                .unwrap_or_else(|| "    ?%".to_string());
            let speed = event.speed.as_deref().unwrap_or("?");
            let eta = event.eta.as_deref().unwrap_or("?");
            eprintln!("Progress: {percent} | Speed: {speed} | ETA: {eta}");
        }
        ProgressStatus::Log => eprintln!("{text}"),
        ProgressStatus::Warning => eprintln!("Warning: {text}"),
        ProgressStatus::Error => eprintln!("Error: {text}"),
    }
}
