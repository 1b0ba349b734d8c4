//! External download engine boundary
//!
//! The task layer never talks to yt-dlp directly. It drives a [`MediaEngine`]
//! and receives progress through a [`ProgressHook`] that it implements itself.
//!
//! ## Architecture
//!
//! - [`MediaEngine`]: resolve + fetch a URL, reporting progress to a hook
//! - [`ProgressHook`]: per-tick callback that can suspend (pause) or abort
//!   (cancel) the transfer
//! - [`YtDlpEngine`]: the production engine, running `yt-dlp` as a child process
//! - [`Installer`]: finds or installs `yt-dlp` once per engine
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use vkvideo_dl::config::EngineConfig;
//! use vkvideo_dl::engine::{MediaEngine, YtDlpEngine};
//!
//! let engine: Arc<dyn MediaEngine> = Arc::new(YtDlpEngine::new(EngineConfig::default()));
//! println!("using {}", engine.name());
//! ```

mod install;
pub mod parser;
mod traits;
mod ytdlp;

pub use install::{
    CHECKSUM_MANIFEST, Installer, TOOL_NAME, asset_name, binary_file_name, parse_checksum,
    verify_checksum,
};
pub use traits::{
    FetchRequest, LogLevel, MediaEngine, MediaInfo, OUTPUT_TEMPLATE, ProgressHook, ProgressTick,
};
pub use ytdlp::YtDlpEngine;
