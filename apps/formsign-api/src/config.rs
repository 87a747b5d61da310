//! Server configuration from the environment

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_RENDER_WIDTH: f64 = 800.0;
const DEFAULT_MAX_UPLOAD_MB: usize = 25;
const DEFAULT_SOURCE_CACHE_ENTRIES: usize = 16;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: String,
    pub storage_dir: PathBuf,
    /// Render width used when resolving stored percent fields
    pub render_width: f64,
    pub max_upload_bytes: usize,
    /// Source PDFs kept in memory at once
    pub source_cache_entries: usize,
    /// Web client served for unmatched routes
    pub static_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; invalid values fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("formsign");

        let render_width = parsed(&lookup, "FORMSIGN_RENDER_WIDTH", DEFAULT_RENDER_WIDTH);
        let render_width = if render_width.is_finite() && render_width > 0.0 {
            render_width
        } else {
            warn!(render_width, "FORMSIGN_RENDER_WIDTH must be positive, using default");
            DEFAULT_RENDER_WIDTH
        };

        let max_upload_mb = parsed(&lookup, "FORMSIGN_MAX_UPLOAD_MB", DEFAULT_MAX_UPLOAD_MB);

        let source_cache_entries = parsed(
            &lookup,
            "FORMSIGN_SOURCE_CACHE_ENTRIES",
            DEFAULT_SOURCE_CACHE_ENTRIES,
        );
        let source_cache_entries = if source_cache_entries > 0 {
            source_cache_entries
        } else {
            warn!("FORMSIGN_SOURCE_CACHE_ENTRIES must be positive, using default");
            DEFAULT_SOURCE_CACHE_ENTRIES
        };

        Self {
            host: parsed(&lookup, "HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            port: parsed(&lookup, "PORT", DEFAULT_PORT),
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| {
                format!("sqlite:{}/formsign.db?mode=rwc", base_dir.display())
            }),
            storage_dir: lookup("FORMSIGN_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| base_dir.join("files")),
            render_width,
            max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
            source_cache_entries,
            static_dir: lookup("FORMSIGN_STATIC_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Invalid configuration value, using default");
            default
        }),
        None => default,
    }
}

/// Get platform-specific data directory
mod dirs {
    use std::path::PathBuf;

    pub fn data_dir() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }
}
