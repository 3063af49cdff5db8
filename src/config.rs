//! Typed configuration and catalog loading.
//!
//! Three JSON files describe a game, all keyed by game id:
//! - `config/game_processing_config_<id>.json` — table geometry, column
//!   indices, name-cleaning patterns, OCR options.
//! - `catalog/game_name_<id>.json` — the valid item and pool name lists used
//!   for fuzzy correction (list order is the tie-break order).
//! - `catalog/game_catalog_<id>.json` — item rarity and pool metadata used
//!   by the statistics engine.
//!
//! A missing file is fatal to the run; the error carries the path it
//! expected so the caller can surface a clear message.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::paths::DataPaths;

/// Processing configuration for one game.
#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    pub game_info: GameInfo,
    pub table_area: TableArea,
    #[serde(default)]
    pub text_processing: TextProcessing,
    /// Optional text-color mask applied before OCR (games with low-contrast
    /// table text).
    #[serde(default)]
    pub color_mask: Option<ColorMask>,
    #[serde(default)]
    pub ocr: OcrOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameInfo {
    pub game_id: String,
    pub game_name: String,
}

/// Where the pull-history table sits inside a screenshot.
#[derive(Debug, Clone, Deserialize)]
pub struct TableArea {
    #[serde(default)]
    pub bounds: TableBounds,
    pub column_indices: ColumnIndices,
}

/// Table region in relative coordinates (0.0 to 1.0), so the same config
/// works across screenshot resolutions.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TableBounds {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Default for TableBounds {
    fn default() -> Self {
        // Full image
        Self {
            top: 0.0,
            bottom: 1.0,
            left: 0.0,
            right: 1.0,
        }
    }
}

/// Which token of a parsed line holds the item and pool names.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ColumnIndices {
    pub item: usize,
    pub pool: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TextProcessing {
    pub enable_clean_name: bool,
    pub patterns: CleanPatterns,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CleanPatterns {
    pub prefix_patterns: Vec<String>,
    pub suffix_patterns: Vec<String>,
}

/// Pixels within `tolerance` of `target` on every channel are forced to
/// black before OCR.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ColorMask {
    pub target: [u8; 3],
    pub tolerance: u8,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OcrOptions {
    pub language: String,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            language: "chi_sim".to_string(),
        }
    }
}

/// Valid name lists for OCR correction. List order is preserved: when two
/// candidates are at the same edit distance, the earlier one wins.
#[derive(Debug, Clone, Deserialize)]
pub struct NameData {
    pub character: Vec<String>,
    pub pool: Vec<String>,
}

/// Reference catalog: item rarities and pool metadata, keyed by internal id
/// on disk but looked up by display name at analysis time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub item: HashMap<String, CatalogItem>,
    pub pool: HashMap<String, CatalogPool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogItem {
    pub display_name: String,
    #[serde(default)]
    pub rarity: u8,
    #[serde(default)]
    pub item_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogPool {
    pub display_name: String,
    #[serde(default)]
    pub pool_type: String,
    #[serde(default)]
    pub alias: String,
}

impl Catalog {
    /// Rarity of an item looked up by display name.
    pub fn item_rarity(&self, display_name: &str) -> Option<u8> {
        self.item
            .values()
            .find(|item| item.display_name == display_name)
            .map(|item| item.rarity)
    }

    /// Pool metadata looked up by display name.
    pub fn pool_by_name(&self, display_name: &str) -> Option<&CatalogPool> {
        self.pool
            .values()
            .find(|pool| pool.display_name == display_name)
    }
}

/// Loads game configs and catalogs from the data directory.
pub struct ConfigManager {
    paths: DataPaths,
}

impl ConfigManager {
    pub fn new(paths: DataPaths) -> Self {
        ConfigManager { paths }
    }

    pub fn load_game_config(&self, game_id: &str) -> Result<GameConfig> {
        let path = self
            .paths
            .config_dir()
            .join(format!("game_processing_config_{}.json", game_id));
        read_json(&path)
    }

    pub fn load_name_data(&self, game_id: &str) -> Result<NameData> {
        let path = self
            .paths
            .catalog_dir()
            .join(format!("game_name_{}.json", game_id));
        read_json(&path)
    }

    pub fn load_catalog(&self, game_id: &str) -> Result<Catalog> {
        let path = self
            .paths
            .catalog_dir()
            .join(format!("game_catalog_{}.json", game_id));
        read_json(&path)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Missing or unreadable file: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
