//! External OCR engine invocation.
//!
//! Text recognition is delegated to the tesseract CLI. The binary path comes
//! from configuration so deployments are not tied to one machine's install
//! location.

use crate::config::Config;
use crate::error::ServiceError;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Handle to the external tesseract binary.
pub struct TesseractCli {
    binary: String,
}

impl TesseractCli {
    pub fn new(config: &Config) -> Self {
        Self {
            binary: config.tesseract_path.clone(),
        }
    }

    /// Check whether the configured binary can be executed at all.
    pub async fn is_available(&self) -> bool {
        let result = Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        matches!(result, Ok(status) if status.success())
    }

    /// Run OCR over a single raster image and return the recognized text.
    pub async fn recognize(&self, image: &Path, language: &str) -> Result<String, ServiceError> {
        let output = Command::new(&self.binary)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ServiceError::Engine(format!("Failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ServiceError::Engine(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Reject language codes that could smuggle extra arguments to the engine.
///
/// Valid codes are short and alphanumeric with optional `_` or `+`
/// (e.g., "eng", "chi_sim", "eng+fra").
pub fn validate_language(language: &str) -> Result<(), ServiceError> {
    if language.is_empty() || language.len() > 20 {
        return Err(ServiceError::InvalidLanguage(language.to_string()));
    }
    for c in language.chars() {
        if !c.is_ascii_alphanumeric() && c != '_' && c != '+' {
            return Err(ServiceError::InvalidLanguage(language.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_codes_are_validated() {
        assert!(validate_language("eng").is_ok());
        assert!(validate_language("ara").is_ok());
        assert!(validate_language("chi_sim").is_ok());
        assert!(validate_language("eng+fra").is_ok());

        assert!(validate_language("").is_err());
        assert!(validate_language("eng; rm -rf /").is_err());
        assert!(validate_language("../tessdata").is_err());
        assert!(validate_language("a-very-long-language-code-indeed").is_err());
    }
}
