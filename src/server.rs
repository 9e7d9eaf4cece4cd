use crate::braille;
use crate::config::Config;
use crate::error::ServiceError;
use crate::ocr::{self, TesseractCli};
use crate::pdf::PdfRasterizer;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tempfile::{NamedTempFile, TempDir};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TesseractCli>,
    pub rasterizer: Arc<PdfRasterizer>,
    pub config: Arc<Config>,
}

/// Recognized text for one language
#[derive(Serialize)]
pub struct RecognizedText {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub braille: Option<String>,
}

/// Recognized text for one page of a PDF
#[derive(Serialize)]
pub struct PageText {
    pub page: usize,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub braille: Option<String>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub default_language: String,
    pub max_file_size_bytes: usize,
    pub render_dpi: u32,
    pub braille_scripts: Vec<String>,
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    if let Some(dir) = &config.scratch_dir {
        std::fs::create_dir_all(dir)?;
    }

    let engine = TesseractCli::new(&config);
    let rasterizer = PdfRasterizer::new(&config);

    if !engine.is_available().await {
        tracing::warn!(
            "OCR engine '{}' is not runnable; /ocr and /ocr_pdf will fail until it is installed",
            config.tesseract_path
        );
    }
    if !rasterizer.is_available().await {
        tracing::warn!(
            "PDF rasterizer '{}' is not runnable; /ocr_pdf will fail until it is installed",
            config.pdftoppm_path
        );
    }

    let addr = format!("{}:{}", config.host, config.port);
    let max_file_size = config.max_file_size;

    let state = AppState {
        engine: Arc::new(engine),
        rasterizer: Arc::new(rasterizer),
        config: Arc::new(config),
    };

    let app = Router::new()
        .route("/ocr", post(handle_ocr))
        .route("/ocr_pdf", post(handle_ocr_pdf))
        .route("/transcribe_braille", post(handle_transcribe_braille))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(max_file_size))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Parsed fields of an upload form
struct UploadForm {
    file: Option<Bytes>,
    content_type: Option<String>,
    languages: Vec<String>,
    braille: bool,
}

/// Parse a multipart upload form. The file field name differs between the
/// image and PDF endpoints; language codes arrive as repeated `language[]`
/// fields (bare `language` is also accepted).
async fn parse_upload(
    multipart: &mut Multipart,
    file_field: &'static str,
) -> Result<UploadForm, ServiceError> {
    let mut form = UploadForm {
        file: None,
        content_type: None,
        languages: Vec::new(),
        braille: false,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == file_field {
            form.content_type = field.content_type().map(|s| s.to_string());
            form.file = Some(field.bytes().await.map_err(|e| {
                ServiceError::InvalidRequest(format!("Failed to read file data: {}", e))
            })?);
            continue;
        }

        match name.as_str() {
            "language[]" | "language" => {
                form.languages.push(field.text().await.map_err(|e| {
                    ServiceError::InvalidRequest(format!("Invalid language field: {}", e))
                })?);
            }
            "braille" => {
                let value = field.text().await.map_err(|e| {
                    ServiceError::InvalidRequest(format!("Invalid braille field: {}", e))
                })?;
                form.braille = parse_flag(&value);
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    Ok(form)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Determine a scratch-file extension from the upload's mime type
fn extension_for(content_type: Option<&str>) -> &'static str {
    match content_type.unwrap_or("application/octet-stream") {
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "image/gif" => ".gif",
        "image/bmp" => ".bmp",
        "image/webp" => ".webp",
        "image/tiff" => ".tiff",
        "application/pdf" => ".pdf",
        _ => ".png",
    }
}

/// Write an upload to a uniquely named temp file in the configured scratch
/// directory. The file is removed when the handle drops, on every exit path.
fn write_scratch_file(
    config: &Config,
    extension: &str,
    data: &[u8],
) -> Result<NamedTempFile, ServiceError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("upload-").suffix(extension);

    let mut temp_file = match &config.scratch_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(|e| ServiceError::Internal(format!("Failed to create temp file: {}", e)))?;

    temp_file
        .write_all(data)
        .map_err(|e| ServiceError::Internal(format!("Failed to write temp file: {}", e)))?;

    Ok(temp_file)
}

/// Create a uniquely named per-request scratch directory for a PDF job.
fn make_scratch_dir(config: &Config) -> Result<TempDir, ServiceError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("ocr-pdf-");

    match &config.scratch_dir {
        Some(dir) => builder.tempdir_in(dir),
        None => builder.tempdir(),
    }
    .map_err(|e| ServiceError::Internal(format!("Failed to create scratch directory: {}", e)))
}

/// Handle image OCR requests
///
/// Returns recognized text keyed by language code. A repeated code overwrites
/// its earlier result; an empty language list yields an empty object without
/// invoking the engine.
async fn handle_ocr(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<HashMap<String, RecognizedText>>, ServiceError> {
    let start = Instant::now();

    let form = parse_upload(&mut multipart, "image").await?;
    let data = form.file.ok_or(ServiceError::MissingFile("image"))?;

    if data.len() > state.config.max_file_size {
        return Err(ServiceError::UploadTooLarge {
            size: data.len(),
            max: state.config.max_file_size,
        });
    }

    for language in &form.languages {
        ocr::validate_language(language)?;
    }

    let extension = extension_for(form.content_type.as_deref());
    let temp_file = write_scratch_file(&state.config, extension, &data)?;

    let mut results = HashMap::new();
    for language in &form.languages {
        let text = state.engine.recognize(temp_file.path(), language).await?;
        tracing::debug!(
            "Recognized {} chars for language {}",
            text.len(),
            language
        );

        let braille = form
            .braille
            .then(|| braille::transliterate(&text.to_lowercase(), language));
        results.insert(language.clone(), RecognizedText { text, braille });
    }

    tracing::info!(
        "OCR completed in {}ms for {} language(s)",
        start.elapsed().as_millis(),
        results.len()
    );

    Ok(Json(results))
}

/// Handle PDF OCR requests
///
/// Rasterizes every page, then OCRs each page for each requested language.
/// The response maps each language code to its pages in order.
async fn handle_ocr_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<HashMap<String, Vec<PageText>>>, ServiceError> {
    let start = Instant::now();

    let form = parse_upload(&mut multipart, "pdf").await?;
    let data = form.file.ok_or(ServiceError::MissingFile("pdf"))?;

    if data.len() > state.config.max_file_size {
        return Err(ServiceError::UploadTooLarge {
            size: data.len(),
            max: state.config.max_file_size,
        });
    }

    for language in &form.languages {
        ocr::validate_language(language)?;
    }

    let scratch = make_scratch_dir(&state.config)?;
    let pdf_path = scratch.path().join("upload.pdf");
    tokio::fs::write(&pdf_path, &data)
        .await
        .map_err(|e| ServiceError::Internal(format!("Failed to write temp PDF: {}", e)))?;

    let pages = state.rasterizer.rasterize(&pdf_path, scratch.path()).await?;
    tracing::debug!("Rasterized {} page(s)", pages.len());

    let mut results = HashMap::new();
    for language in &form.languages {
        let mut page_texts = Vec::with_capacity(pages.len());
        for (index, page) in pages.iter().enumerate() {
            let text = state.engine.recognize(page, language).await?;
            let braille = form
                .braille
                .then(|| braille::transliterate(&text.to_lowercase(), language));
            page_texts.push(PageText {
                page: index + 1,
                text,
                braille,
            });
        }
        results.insert(language.clone(), page_texts);
    }

    tracing::info!(
        "PDF OCR completed in {}ms: {} page(s), {} language(s)",
        start.elapsed().as_millis(),
        pages.len(),
        results.len()
    );

    Ok(Json(results))
}

/// Handle text-to-Braille requests
///
/// Lowercases the submitted text and returns the transliterated glyph string
/// as a plain-text body.
async fn handle_transcribe_braille(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<String, ServiceError> {
    let mut text = String::new();
    let mut language = state.config.default_language.clone();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "text" => {
                text = field.text().await.map_err(|e| {
                    ServiceError::InvalidRequest(format!("Invalid text field: {}", e))
                })?;
            }
            "language" => {
                language = field.text().await.map_err(|e| {
                    ServiceError::InvalidRequest(format!("Invalid language field: {}", e))
                })?;
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    Ok(braille::transliterate(&text.to_lowercase(), &language))
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        default_language: state.config.default_language.clone(),
        max_file_size_bytes: state.config.max_file_size,
        render_dpi: state.config.render_dpi,
        braille_scripts: vec!["latin".to_string(), "arabic".to_string()],
    })
}
