//! External PDF rasterization.
//!
//! Pages are rendered by pdftoppm into a per-request scratch directory, one
//! PNG per page, then collected in page order for OCR.

use crate::config::Config;
use crate::error::ServiceError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Handle to the external pdftoppm binary.
pub struct PdfRasterizer {
    binary: String,
    dpi: u32,
}

impl PdfRasterizer {
    pub fn new(config: &Config) -> Self {
        Self {
            binary: config.pdftoppm_path.clone(),
            dpi: config.render_dpi,
        }
    }

    /// Check whether the configured binary can be executed at all.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("-v")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .is_ok()
    }

    /// Render every page of `pdf` into `out_dir` and return the page images
    /// in page order.
    pub async fn rasterize(
        &self,
        pdf: &Path,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ServiceError> {
        let prefix = out_dir.join("page");

        let output = Command::new(&self.binary)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(pdf)
            .arg(&prefix)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                ServiceError::Rasterizer(format!("Failed to run {}: {}", self.binary, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ServiceError::Rasterizer(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        let pages = collect_pages(out_dir).await?;
        if pages.is_empty() {
            return Err(ServiceError::Rasterizer(
                "No pages produced from PDF".to_string(),
            ));
        }

        Ok(pages)
    }
}

/// Gather the rendered `page-<n>.png` files from `out_dir`, ordered by page
/// number. Other files in the directory (the uploaded PDF itself) are
/// ignored.
async fn collect_pages(out_dir: &Path) -> Result<Vec<PathBuf>, ServiceError> {
    let mut pages: Vec<(u32, PathBuf)> = Vec::new();

    let mut entries = tokio::fs::read_dir(out_dir)
        .await
        .map_err(|e| ServiceError::Internal(format!("Failed to read scratch directory: {}", e)))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ServiceError::Internal(format!("Failed to read scratch directory: {}", e)))?
    {
        let path = entry.path();
        if let Some(number) = page_number(&path) {
            pages.push((number, path));
        }
    }

    pages.sort_by_key(|(number, _)| *number);

    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

/// Parse the page number out of a rendered file name such as `page-07.png`.
fn page_number(path: &Path) -> Option<u32> {
    let name = path.file_name()?.to_str()?;
    name.strip_prefix("page-")?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_number_parses_rendered_file_names() {
        assert_eq!(page_number(Path::new("/tmp/job/page-1.png")), Some(1));
        assert_eq!(page_number(Path::new("/tmp/job/page-07.png")), Some(7));
        assert_eq!(page_number(Path::new("/tmp/job/page-012.png")), Some(12));

        assert_eq!(page_number(Path::new("/tmp/job/upload.pdf")), None);
        assert_eq!(page_number(Path::new("/tmp/job/page-3.txt")), None);
        assert_eq!(page_number(Path::new("/tmp/job/page-.png")), None);
        assert_eq!(page_number(Path::new("/tmp/job/other-1.png")), None);
    }

    #[tokio::test]
    async fn collect_pages_orders_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page-10.png", "page-2.png", "page-1.png", "upload.pdf"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let pages = collect_pages(dir.path()).await.unwrap();
        let names: Vec<_> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();

        assert_eq!(names, ["page-1.png", "page-2.png", "page-10.png"]);
    }

    #[tokio::test]
    async fn collect_pages_is_empty_for_a_directory_without_pages() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("upload.pdf"), b"").unwrap();

        let pages = collect_pages(dir.path()).await.unwrap();
        assert!(pages.is_empty());
    }
}
