use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::pdf::{
    Compressor, DEFAULT_CACHE_SLOTS, DEFAULT_DPI, DEFAULT_WHITE_THRESHOLD, MAX_COLUMNS,
    MIN_COLUMNS, POSITION_RING_CAPACITY, RasterConfig, ZoomMode,
};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "folio";

const SETTINGS_HEADER: &str = "# folio settings\n\
# worker_threads: 0 uses every available core\n\
# default_zoom_mode: trim, width, page, page_trim or custom\n\n";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Raster resolution in dots per inch
    #[serde(default = "default_dpi")]
    pub dpi: f32,

    /// Decompressed pages kept ready for painting
    #[serde(default = "default_cache_slots")]
    pub cache_slots: usize,

    #[serde(default)]
    pub worker_threads: usize,

    /// Above this page count the rasterizer works in chunks
    #[serde(default = "default_large_document_pages")]
    pub large_document_pages: usize,

    #[serde(default = "default_chunk_multiplier")]
    pub chunk_multiplier: usize,

    /// zlib level, 1 is fastest
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,

    #[serde(default = "default_position_ring_capacity")]
    pub position_ring_capacity: usize,

    #[serde(default = "default_columns")]
    pub default_columns: usize,

    #[serde(default)]
    pub default_zoom_mode: ZoomMode,

    #[serde(default = "default_white_threshold")]
    pub white_threshold: u8,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_dpi() -> f32 {
    DEFAULT_DPI
}

fn default_cache_slots() -> usize {
    DEFAULT_CACHE_SLOTS
}

fn default_large_document_pages() -> usize {
    64
}

fn default_chunk_multiplier() -> usize {
    4
}

fn default_compression_level() -> u32 {
    1
}

fn default_position_ring_capacity() -> usize {
    POSITION_RING_CAPACITY
}

fn default_columns() -> usize {
    1
}

fn default_white_threshold() -> u8 {
    DEFAULT_WHITE_THRESHOLD
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            dpi: default_dpi(),
            cache_slots: default_cache_slots(),
            worker_threads: 0,
            large_document_pages: default_large_document_pages(),
            chunk_multiplier: default_chunk_multiplier(),
            compression_level: default_compression_level(),
            position_ring_capacity: default_position_ring_capacity(),
            default_columns: default_columns(),
            default_zoom_mode: ZoomMode::default(),
            white_threshold: default_white_threshold(),
        }
    }
}

#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

impl Settings {
    /// Load from the user's config directory, writing defaults on first run
    #[must_use]
    pub fn load() -> Self {
        let Some(path) = default_config_path() else {
            warn!("Could not determine config directory, using default settings");
            return Self::default();
        };

        if !path.exists() {
            info!("Settings file not found, creating with defaults at {path:?}");
            let settings = Self::default();
            if let Err(e) = settings.save_to_path(&path) {
                error!("Failed to save settings to {path:?}: {e}");
            }
            return settings;
        }
        Self::load_from_path(&path)
    }

    /// Read settings from `path`. A missing or malformed file yields the
    /// defaults; out-of-range values are clamped.
    #[must_use]
    pub fn load_from_path(path: &Path) -> Self {
        let settings = match fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
                Ok(settings) => {
                    debug!("Loaded settings from {path:?}");
                    settings
                }
                Err(e) => {
                    error!("Failed to parse settings file {path:?}: {e}");
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read settings file {path:?}: {e}");
                Self::default()
            }
        };
        settings.sanitized()
    }

    pub fn save_to_path(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let body = serde_yaml::to_string(self).map_err(io::Error::other)?;
        fs::write(path, format!("{SETTINGS_HEADER}{body}"))?;
        debug!("Saved settings to {path:?}");
        Ok(())
    }

    fn sanitized(mut self) -> Self {
        if self.version < CURRENT_VERSION {
            info!("Migrating settings from v{} to v{CURRENT_VERSION}", self.version);
            self.version = CURRENT_VERSION;
        }
        if !self.dpi.is_finite() || self.dpi <= 0.0 {
            warn!("Invalid dpi {}, using {DEFAULT_DPI}", self.dpi);
            self.dpi = DEFAULT_DPI;
        }
        self.cache_slots = self.cache_slots.max(1);
        self.position_ring_capacity = self.position_ring_capacity.max(1);
        self.chunk_multiplier = self.chunk_multiplier.max(1);
        self.default_columns = self.default_columns.clamp(MIN_COLUMNS, MAX_COLUMNS);
        self.compression_level = self.compression_level.min(9);
        self
    }

    /// Rasterizer parameters derived from these settings
    #[must_use]
    pub fn raster_config(&self) -> RasterConfig {
        let defaults = RasterConfig::default();
        RasterConfig {
            dpi: self.dpi,
            white_threshold: self.white_threshold,
            compressor: Compressor::new(self.compression_level),
            threads: if self.worker_threads == 0 {
                defaults.threads
            } else {
                self.worker_threads
            },
            large_document_pages: self.large_document_pages,
            chunk_multiplier: self.chunk_multiplier,
        }
    }
}
