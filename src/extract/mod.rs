//! Per-image extraction: image file → cropped table region → OCR text →
//! parsed, cleaned pull entries.
//!
//! Every failure in here is per-image: it is logged and the image simply
//! contributes zero entries. The batch driver in `pipeline` decides whether
//! the run as a whole produced anything usable.

pub mod cleaner;
pub mod correct;
pub mod engine;
pub mod parser;
pub mod preprocess;

pub use cleaner::EntryCleaner;
pub use correct::NameSet;
pub use engine::{OcrEngine, TesseractCli};
pub use parser::LineParser;

use std::path::Path;

use crate::config::GameConfig;
use crate::ledger::ErrorLedger;
use crate::logging::Logger;
use crate::records::PullEntry;

/// Processes one screenshot into cleaned entries.
pub fn process_image(
    image_path: &Path,
    config: &GameConfig,
    parser: &LineParser,
    cleaner: &EntryCleaner,
    engine: &dyn OcrEngine,
    ledger: Option<&ErrorLedger>,
    logger: &Logger,
) -> Vec<PullEntry> {
    let name = image_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| image_path.display().to_string());
    logger.info(&format!("Processing image: {}", name));

    let img = match image::open(image_path) {
        Ok(img) => img.to_rgba8(),
        Err(e) => {
            logger.warn(&format!("Could not open image {}: {}", name, e));
            return Vec::new();
        }
    };

    let mut table = preprocess::crop_table_region(&img, &config.table_area.bounds);
    if let Some(mask) = &config.color_mask {
        table = preprocess::mask_text_color(&table, mask);
    }

    let ocr_text = match engine.recognize(&table, &config.ocr.language) {
        Ok(Some(text)) => text,
        Ok(None) => {
            logger.warn(&format!("OCR produced no text for {}", name));
            return Vec::new();
        }
        Err(e) => {
            logger.error(&format!("OCR failed for {}: {:#}", name, e));
            return Vec::new();
        }
    };

    let raw_entries = parser.parse_text(&ocr_text, logger);

    let source = image_path.display().to_string();
    let entries: Vec<PullEntry> = raw_entries
        .into_iter()
        .enumerate()
        .filter_map(|(position, raw)| {
            cleaner.clean_entry(raw, ledger, Some(&source), position, logger)
        })
        .collect();

    logger.info(&format!("Extracted {} entries from {}", entries.len(), name));
    entries
}
