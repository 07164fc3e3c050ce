//! Volume data structures and on-disk formats.
//!
//! One file per unit, JSON `{"shape": [...], "data": [...]}`. The mask
//! uses the same layout with boolean data and is read once per session.

pub mod loader;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Raw multi-dimensional sample as written by the acquisition process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawVolume {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl RawVolume {
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Data length agrees with the declared shape.
    pub fn is_consistent(&self) -> bool {
        self.data.len() == self.element_count()
    }
}

/// Fixed spatial mask selecting the active positions. Read-only for the
/// session lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeMask {
    pub shape: Vec<usize>,
    pub data: Vec<bool>,
}

impl VolumeMask {
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let bytes = std::fs::read(path)?;
        let mask: VolumeMask = serde_json::from_slice(&bytes)?;
        if mask.data.len() != mask.shape.iter().product::<usize>() {
            return Err(PipelineError::InvalidConfig(format!(
                "mask data length {} does not match shape {:?}",
                mask.data.len(),
                mask.shape
            )));
        }
        log::info!(
            "mask loaded: shape {:?}, {} active positions",
            mask.shape,
            mask.active_count()
        );
        Ok(mask)
    }

    /// Number of selected positions = feature vector length.
    pub fn active_count(&self) -> usize {
        self.data.iter().filter(|&&b| b).count()
    }

    /// CRC32 over shape and selection bits. Carried on every feature
    /// vector so a mask swap mid-session cannot go unnoticed.
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        for dim in &self.shape {
            hasher.update(&(*dim as u64).to_le_bytes());
        }
        for &bit in &self.data {
            hasher.update(&[bit as u8]);
        }
        hasher.finalize()
    }
}

/// One delivered unit: index, raw array, arrival time. Immutable once
/// loaded.
#[derive(Debug, Clone)]
pub struct Unit {
    pub index: usize,
    pub volume: RawVolume,
    pub arrived_at: DateTime<Utc>,
}

fn default_prefix() -> String {
    "vol_".to_string()
}

fn default_index_width() -> usize {
    5
}

fn default_extension() -> String {
    "json".to_string()
}

/// Zero-padded unit file naming, e.g. `vol_00042.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitPattern {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_index_width")]
    pub index_width: usize,
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl UnitPattern {
    pub fn path_for(&self, dir: &Path, index: usize) -> PathBuf {
        dir.join(format!(
            "{}{:0width$}.{}",
            self.prefix,
            index,
            self.extension,
            width = self.index_width
        ))
    }
}

impl Default for UnitPattern {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            index_width: default_index_width(),
            extension: default_extension(),
        }
    }
}
