//! Unit file loading with a bounded retry budget.
//!
//! Path existence does not imply completed content: the acquisition
//! process may create the name before finishing the write. A parse
//! failure therefore gets a short backoff and another read before it
//! becomes fatal.

use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::constants::{LOAD_RETRY_BACKOFF_MS, LOAD_RETRY_BUDGET};
use crate::error::PipelineError;

use super::RawVolume;

#[derive(Debug, Clone, Copy, Default)]
pub struct UnitLoader;

impl UnitLoader {
    /// Load and deserialize a fully materialized unit path.
    pub fn load(&self, path: &Path) -> Result<RawVolume, PipelineError> {
        let mut last_detail = String::new();
        for attempt in 0..=LOAD_RETRY_BUDGET {
            match Self::try_load(path) {
                Ok(volume) => {
                    if attempt > 0 {
                        log::debug!(
                            "unit {} readable after {} retries",
                            path.display(),
                            attempt
                        );
                    }
                    return Ok(volume);
                }
                Err(detail) => {
                    last_detail = detail;
                    if attempt < LOAD_RETRY_BUDGET {
                        thread::sleep(Duration::from_millis(LOAD_RETRY_BACKOFF_MS));
                    }
                }
            }
        }
        Err(PipelineError::UnreadableUnit {
            path: path.to_path_buf(),
            attempts: LOAD_RETRY_BUDGET + 1,
            detail: last_detail,
        })
    }

    fn try_load(path: &Path) -> Result<RawVolume, String> {
        let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
        let volume: RawVolume = serde_json::from_slice(&bytes).map_err(|e| e.to_string())?;
        if !volume.is_consistent() {
            return Err(format!(
                "data length {} does not match shape {:?}",
                volume.data.len(),
                volume.shape
            ));
        }
        Ok(volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_volume(path: &Path, data: &[f32]) {
        let volume = RawVolume {
            shape: vec![data.len()],
            data: data.to_vec(),
        };
        fs::write(path, serde_json::to_vec(&volume).unwrap()).unwrap();
    }

    #[test]
    fn test_load_complete_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vol_00000.json");
        write_volume(&path, &[1.0, 2.0, 3.0]);

        let volume = UnitLoader.load(&path).unwrap();
        assert_eq!(volume.shape, vec![3]);
        assert_eq!(volume.data, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_unreadable_after_budget() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vol_00001.json");
        fs::write(&path, b"{\"shape\": [3], \"da").unwrap();

        match UnitLoader.load(&path) {
            Err(PipelineError::UnreadableUnit { attempts, .. }) => {
                assert_eq!(attempts, LOAD_RETRY_BUDGET + 1);
            }
            other => panic!("expected UnreadableUnit, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_retry_recovers_in_flight_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vol_00002.json");
        // Name exists, content is still partial.
        fs::write(&path, b"{\"shape\":").unwrap();

        let writer_path = path.clone();
        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(2 * LOAD_RETRY_BACKOFF_MS));
            write_volume(&writer_path, &[4.0, 5.0]);
        });

        let volume = UnitLoader.load(&path).unwrap();
        assert_eq!(volume.data, vec![4.0, 5.0]);
        writer.join().unwrap();
    }

    #[test]
    fn test_shape_data_disagreement_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vol_00003.json");
        fs::write(&path, r#"{"shape": [4], "data": [1.0, 2.0]}"#).unwrap();

        assert!(matches!(
            UnitLoader.load(&path),
            Err(PipelineError::UnreadableUnit { .. })
        ));
    }
}
