//! Configuration record consumed by the proxy.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Pluggable byte-transform modes for fd-content update payloads.
#[derive(
    Clone, Copy, Debug, Default, Display, EnumString, ValueEnum, Deserialize, Serialize, PartialEq, Eq,
)]
#[strum(serialize_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum CompressionMode {
    /// No compression; diffs travel as raw bytes.
    #[default]
    None,
    /// Fast, low-ratio compression.
    Lz4,
    /// Higher-ratio, higher-cost compression.
    Zstd,
}

/// Which side of the connection this pipeline instance runs as. The display
/// side faces the compositor and allocates negative object ids; the client
/// side faces the application and allocates positive ids.
#[derive(Clone, Copy, Debug, ValueEnum, Deserialize, Serialize, PartialEq, Eq)]
pub enum Side {
    /// Faces the client application.
    Client,
    /// Faces the compositor.
    Display,
}

/// The small configuration record the proxy core consumes. CLI parsing lives
/// here, alongside the pipeline it configures; the accept-loop and channel
/// wiring that would normally read these values live in the surrounding
/// binary, out of this crate's scope.
#[derive(Clone, Debug, CopyGetters, Getters, Parser, Deserialize, Serialize)]
#[command(about = "Core of a transparent proxy for a display-server wire protocol")]
pub struct Config {
    /// Which side of the channel this instance runs as.
    #[getset(get_copy = "pub")]
    #[arg(long, value_enum)]
    pub side: Side,

    /// Path to the graphics device node used to map dmabuf-backed shadows.
    /// Absent or `--no-gpu` means graphics buffers fall back to an opaque,
    /// unsynchronized mirror.
    #[getset(get = "pub")]
    #[arg(long, value_name = "PATH")]
    pub graphics_device: Option<PathBuf>,

    /// Number of worker threads used for fd-content diff/compress and
    /// decompress/apply tasks. 1 means inline execution on the caller.
    #[getset(get_copy = "pub")]
    #[arg(long, default_value_t = 1)]
    pub worker_count: usize,

    /// Compression mode applied to fd-content update payloads.
    #[getset(get_copy = "pub")]
    #[arg(long, value_enum, default_value_t = CompressionMode::None)]
    pub compression: CompressionMode,

    /// Compression level, meaning is backend-specific.
    #[getset(get_copy = "pub")]
    #[arg(long, default_value_t = 1)]
    pub compression_level: u32,

    /// Disable all graphics-buffer handling, even if a device path is given.
    #[getset(get_copy = "pub")]
    #[arg(long, default_value_t = false)]
    pub no_gpu: bool,

    /// Only accept linear (unmodified) dmabuf layouts.
    #[getset(get_copy = "pub")]
    #[arg(long, default_value_t = false)]
    pub linear_dmabuf_only: bool,

    /// Logging verbosity.
    #[getset(get_copy = "pub")]
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

impl Config {
    /// Whether graphics-buffer handling should be attempted at all.
    pub fn gpu_enabled(&self) -> bool {
        !self.no_gpu && self.graphics_device.is_some()
    }
}

/// Logging verbosity levels.
#[derive(Clone, Copy, Debug, ValueEnum, Deserialize, Serialize, PartialEq, Eq)]
#[value(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    /// Convert to the `tracing` filter this level corresponds to.
    pub fn as_filter(self) -> tracing::level_filters::LevelFilter {
        use tracing::level_filters::LevelFilter;
        match self {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}
