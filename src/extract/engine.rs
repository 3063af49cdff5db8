//! OCR engine boundary.
//!
//! The pipeline only needs `recognize`: image in, text out, `None` when the
//! engine saw nothing. The default implementation shells out to the
//! Tesseract CLI; tests substitute a stub so the pipeline runs without the
//! external binary installed.

use anyhow::{Result, anyhow};
use image::RgbaImage;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

pub trait OcrEngine {
    /// Recognizes text in an image. `Ok(None)` means the engine ran but
    /// produced no text; `Err` means the invocation itself failed. Either
    /// way the caller treats the image as contributing zero entries.
    fn recognize(&self, img: &RgbaImage, language: &str) -> Result<Option<String>>;
}

/// Tesseract invoked as a subprocess, page-segmentation mode 6 (uniform
/// block of text), which matches the cropped table region.
pub struct TesseractCli {
    executable: PathBuf,
}

impl TesseractCli {
    /// Finds a Tesseract executable on PATH or in common install locations.
    pub fn locate() -> Result<Self> {
        if let Ok(output) = Command::new("tesseract").arg("--version").output() {
            if output.status.success() {
                return Ok(TesseractCli {
                    executable: PathBuf::from("tesseract"),
                });
            }
        }

        let common_paths = [
            "/usr/bin/tesseract",
            "/usr/local/bin/tesseract",
            "/opt/homebrew/bin/tesseract",
            r"C:\Program Files\Tesseract-OCR\tesseract.exe",
            r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
        ];
        for path in common_paths {
            let p = PathBuf::from(path);
            if p.exists() {
                return Ok(TesseractCli { executable: p });
            }
        }

        Err(anyhow!(
            "Tesseract not found. Install Tesseract-OCR and make sure it is on PATH."
        ))
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, img: &RgbaImage, language: &str) -> Result<Option<String>> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())?;

        let output = Command::new(&self.executable)
            .arg(temp_input.path())
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .arg("--psm")
            .arg("6")
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }
}

#[cfg(test)]
pub(crate) struct StubEngine {
    pub text: Option<String>,
}

#[cfg(test)]
impl OcrEngine for StubEngine {
    fn recognize(&self, _img: &RgbaImage, _language: &str) -> Result<Option<String>> {
        Ok(self.text.clone())
    }
}
