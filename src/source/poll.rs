//! Poll strategy: existence checks at a fixed interval.
//!
//! Detection latency is bounded below by the poll interval; the upside
//! is zero subscription state and trivially correct catch-up (a file
//! that already exists is found on the first check).

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use chrono::Utc;

use crate::error::PipelineError;
use crate::volume::loader::UnitLoader;
use crate::volume::{Unit, UnitPattern};

use super::UnitSource;

pub struct PollSource {
    dir: PathBuf,
    pattern: UnitPattern,
    interval: Duration,
    loader: UnitLoader,
    closed: bool,
}

impl PollSource {
    pub fn new(dir: PathBuf, pattern: UnitPattern, interval: Duration) -> Self {
        log::info!(
            "polling {} every {:?} for unit files",
            dir.display(),
            interval
        );
        Self {
            dir,
            pattern,
            interval,
            loader: UnitLoader,
            closed: false,
        }
    }
}

impl UnitSource for PollSource {
    fn await_unit(&mut self, index: usize) -> Result<Unit, PipelineError> {
        let target = self.pattern.path_for(&self.dir, index);
        loop {
            if target.exists() {
                let volume = self.loader.load(&target)?;
                return Ok(Unit {
                    index,
                    volume,
                    arrived_at: Utc::now(),
                });
            }
            thread::sleep(self.interval);
        }
    }

    fn shutdown(&mut self) {
        if !self.closed {
            self.closed = true;
            log::debug!("poll source closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::RawVolume;
    use std::fs;
    use std::path::Path;

    fn write_unit(dir: &Path, pattern: &UnitPattern, index: usize, data: &[f32]) {
        let volume = RawVolume {
            shape: vec![data.len()],
            data: data.to_vec(),
        };
        fs::write(
            pattern.path_for(dir, index),
            serde_json::to_vec(&volume).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn test_delivers_existing_units_in_request_order() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = UnitPattern::default();
        for i in 0..3 {
            write_unit(dir.path(), &pattern, i, &[i as f32]);
        }

        let mut source = PollSource::new(
            dir.path().to_path_buf(),
            pattern,
            Duration::from_millis(1),
        );
        for i in 0..3 {
            let unit = source.await_unit(i).unwrap();
            assert_eq!(unit.index, i);
            assert_eq!(unit.volume.data, vec![i as f32]);
        }
        source.shutdown();
        source.shutdown();
    }

    #[test]
    fn test_blocks_until_unit_appears() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = UnitPattern::default();

        let writer_dir = dir.path().to_path_buf();
        let writer_pattern = pattern.clone();
        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            write_unit(&writer_dir, &writer_pattern, 0, &[9.0]);
        });

        let mut source = PollSource::new(
            dir.path().to_path_buf(),
            pattern,
            Duration::from_millis(2),
        );
        let unit = source.await_unit(0).unwrap();
        assert_eq!(unit.volume.data, vec![9.0]);
        writer.join().unwrap();
    }
}
