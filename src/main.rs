use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod braille;
mod config;
mod error;
mod ocr;
mod pdf;
mod server;

#[derive(Parser, Debug)]
#[command(name = "ocr-braille-server")]
#[command(about = "OCR and Braille transliteration web service")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Default language for Braille transcription (e.g., "eng", "fra", "ara")
    #[arg(long, env = "OCR_DEFAULT_LANGUAGE", default_value = "eng")]
    pub default_language: String,

    /// Maximum upload size in bytes (default: 50MB)
    #[arg(long, env = "OCR_MAX_FILE_SIZE", default_value = "52428800")]
    pub max_file_size: usize,

    /// Path to the tesseract binary
    #[arg(long, env = "OCR_TESSERACT_PATH", default_value = "tesseract")]
    pub tesseract_path: String,

    /// Path to the pdftoppm binary used to rasterize PDF pages
    #[arg(long, env = "OCR_PDFTOPPM_PATH", default_value = "pdftoppm")]
    pub pdftoppm_path: String,

    /// Resolution in DPI for PDF page rasterization
    #[arg(long, env = "OCR_RENDER_DPI", default_value = "300")]
    pub render_dpi: u32,

    /// Directory for per-request scratch files (system temp dir if not set)
    #[arg(long, env = "OCR_SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from(args);

    tracing::info!(
        "Starting ocr-braille-server v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!("Binding to {}:{}", config.host, config.port);

    server::run(config).await
}
