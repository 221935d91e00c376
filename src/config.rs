use anyhow::{Context, Result};
use clap::Parser;
use std::{env, path::PathBuf, str::FromStr};

const MIB: u64 = 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub ingest: IngestConfig,
}

/// Everything the ingestion pipeline needs to know about where files go
/// and what it is allowed to accept. Handed to each service at construction.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub upload_dir: PathBuf,
    pub cover_dir: PathBuf,
    pub video_dir: PathBuf,
    pub max_upload_size: u64,
    pub max_cover_size: u64,
    pub max_video_size: u64,
    pub allowed_extensions: Vec<String>,
    pub allowed_image_extensions: Vec<String>,
    pub allowed_video_extensions: Vec<String>,
    /// Directory holding the pdfium shared library. Falls back to the system
    /// library when unset.
    pub pdfium_dir: Option<PathBuf>,
}

impl IngestConfig {
    /// Defaults rooted at `base`, mostly useful for tests and local runs.
    pub fn with_base_dir(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            upload_dir: base.join("uploads"),
            cover_dir: base.join("covers"),
            video_dir: base.join("videos"),
            max_upload_size: 50 * MIB,
            max_cover_size: 5 * MIB,
            max_video_size: 500 * MIB,
            allowed_extensions: split_list("pdf,epub"),
            allowed_image_extensions: split_list("jpg,jpeg,png,webp"),
            allowed_video_extensions: split_list("mp4,webm"),
            pdfium_dir: None,
        }
    }

    /// Largest request body any upload route can legitimately carry.
    pub fn body_limit(&self) -> usize {
        let largest = (self.max_upload_size + self.max_cover_size).max(self.max_video_size);
        usize::try_from(largest + MIB).unwrap_or(usize::MAX)
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Offline library media backend")]
pub struct Args {
    /// Host to bind to (overrides LIBRARY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides LIBRARY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides LIBRARY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Directory for uploaded documents (overrides LIBRARY_UPLOAD_DIR)
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,

    /// Directory for cover images (overrides LIBRARY_COVER_DIR)
    #[arg(long)]
    pub cover_dir: Option<PathBuf>,

    /// Directory for uploaded videos (overrides LIBRARY_VIDEO_DIR)
    #[arg(long)]
    pub video_dir: Option<PathBuf>,

    /// Maximum document size in bytes (overrides LIBRARY_MAX_UPLOAD_SIZE)
    #[arg(long)]
    pub max_upload_size: Option<u64>,

    /// Maximum cover size in bytes (overrides LIBRARY_MAX_COVER_SIZE)
    #[arg(long)]
    pub max_cover_size: Option<u64>,

    /// Maximum video size in bytes (overrides LIBRARY_MAX_VIDEO_SIZE)
    #[arg(long)]
    pub max_video_size: Option<u64>,

    /// Directory containing libpdfium (overrides LIBRARY_PDFIUM_DIR)
    #[arg(long)]
    pub pdfium_dir: Option<PathBuf>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("LIBRARY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = env_parse("LIBRARY_PORT", 8000u16)?;
        let env_db = env::var("LIBRARY_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/library.db".into());

        let defaults = IngestConfig::with_base_dir("./data");
        let env_upload = env_path("LIBRARY_UPLOAD_DIR").unwrap_or(defaults.upload_dir);
        let env_cover = env_path("LIBRARY_COVER_DIR").unwrap_or(defaults.cover_dir);
        let env_video = env_path("LIBRARY_VIDEO_DIR").unwrap_or(defaults.video_dir);
        let env_max_upload = env_parse("LIBRARY_MAX_UPLOAD_SIZE", defaults.max_upload_size)?;
        let env_max_cover = env_parse("LIBRARY_MAX_COVER_SIZE", defaults.max_cover_size)?;
        let env_max_video = env_parse("LIBRARY_MAX_VIDEO_SIZE", defaults.max_video_size)?;

        let ingest = IngestConfig {
            upload_dir: args.upload_dir.unwrap_or(env_upload),
            cover_dir: args.cover_dir.unwrap_or(env_cover),
            video_dir: args.video_dir.unwrap_or(env_video),
            max_upload_size: args.max_upload_size.unwrap_or(env_max_upload),
            max_cover_size: args.max_cover_size.unwrap_or(env_max_cover),
            max_video_size: args.max_video_size.unwrap_or(env_max_video),
            allowed_extensions: env_list("LIBRARY_ALLOWED_EXTENSIONS")
                .unwrap_or(defaults.allowed_extensions),
            allowed_image_extensions: env_list("LIBRARY_ALLOWED_IMAGE_EXTENSIONS")
                .unwrap_or(defaults.allowed_image_extensions),
            allowed_video_extensions: env_list("LIBRARY_ALLOWED_VIDEO_EXTENSIONS")
                .unwrap_or(defaults.allowed_video_extensions),
            pdfium_dir: args.pdfium_dir.or_else(|| env_path("LIBRARY_PDFIUM_DIR")),
        };

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            ingest,
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    env::var_os(name).map(PathBuf::from)
}

fn env_list(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|value| split_list(&value))
}

/// Split a comma-separated extension list into lowercase entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_normalizes_entries() {
        assert_eq!(split_list(" PDF, .epub ,,"), vec!["pdf", "epub"]);
    }

    #[test]
    fn body_limit_covers_document_and_cover() {
        let mut cfg = IngestConfig::with_base_dir("/tmp/x");
        cfg.max_video_size = 1;
        assert_eq!(cfg.body_limit() as u64, 50 * MIB + 5 * MIB + MIB);
    }
}
