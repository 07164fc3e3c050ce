//! Notify strategy: filesystem creation events over a FIFO queue.
//!
//! The notify backend's listener thread appends events to an unbounded
//! `mpsc` channel; the consumer filters them by exact target path and
//! discards the rest. Catch-up: the subscription is established in the
//! constructor, and every request re-checks target existence *after*
//! that subscription exists before waiting on the queue, so a unit
//! created before the request (or before the watch itself) is still
//! delivered exactly once, and a unit created between check and wait
//! produces a queued event we then consume.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};

use chrono::Utc;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::PipelineError;
use crate::volume::loader::UnitLoader;
use crate::volume::{Unit, UnitPattern};

use super::UnitSource;

pub struct NotifySource {
    dir: PathBuf,
    pattern: UnitPattern,
    loader: UnitLoader,
    watcher: Option<RecommendedWatcher>,
    rx: Receiver<notify::Result<Event>>,
}

impl NotifySource {
    pub fn new(dir: PathBuf, pattern: UnitPattern) -> Result<Self, PipelineError> {
        let (tx, rx) = channel();
        let mut watcher = notify::recommended_watcher(tx)
            .map_err(|e| PipelineError::WatchError(e.to_string()))?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| PipelineError::WatchError(e.to_string()))?;
        log::info!("watching {} for unit files", dir.display());
        Ok(Self {
            dir,
            pattern,
            loader: UnitLoader,
            watcher: Some(watcher),
            rx,
        })
    }

    fn deliver(&self, index: usize, target: &Path) -> Result<Unit, PipelineError> {
        let volume = self.loader.load(target)?;
        Ok(Unit {
            index,
            volume,
            arrived_at: Utc::now(),
        })
    }

    fn event_matches(event: &Event, target: &Path) -> bool {
        event
            .paths
            .iter()
            .any(|p| p == target || p.file_name() == target.file_name())
    }
}

impl UnitSource for NotifySource {
    fn await_unit(&mut self, index: usize) -> Result<Unit, PipelineError> {
        let target = self.pattern.path_for(&self.dir, index);

        // Existence check with the subscription already live: covers
        // units that landed before this request, watch included.
        if target.exists() {
            return self.deliver(index, &target);
        }

        loop {
            let event = match self.rx.recv() {
                Ok(Ok(event)) => event,
                Ok(Err(e)) => return Err(PipelineError::WatchError(e.to_string())),
                Err(_) => return Err(PipelineError::SourceClosed),
            };
            if Self::event_matches(&event, &target) && target.exists() {
                return self.deliver(index, &target);
            }
            // Unrelated path, or the target vanished again: keep waiting.
        }
    }

    fn shutdown(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            drop(watcher);
            log::debug!("filesystem event subscription released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::RawVolume;
    use std::fs;
    use std::time::Duration;

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
    fn test_catch_up_delivers_preexisting_units_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = UnitPattern::default();
        for i in 0..4 {
            write_unit(dir.path(), &pattern, i, &[i as f32]);
        }

        let mut source = NotifySource::new(dir.path().to_path_buf(), pattern).unwrap();
        for i in 0..4 {
            let unit = source.await_unit(i).unwrap();
            assert_eq!(unit.index, i);
            assert_eq!(unit.volume.data, vec![i as f32]);
        }
        source.shutdown();
    }

    #[test]
    fn test_event_wakes_waiting_request() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = UnitPattern::default();
        let mut source = NotifySource::new(dir.path().to_path_buf(), pattern.clone()).unwrap();

        let writer_dir = dir.path().to_path_buf();
        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            write_unit(&writer_dir, &pattern, 0, &[3.5]);
        });

        let unit = source.await_unit(0).unwrap();
        assert_eq!(unit.volume.data, vec![3.5]);
        writer.join().unwrap();
        source.shutdown();
    }

    #[test]
    fn test_unrelated_events_are_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = UnitPattern::default();
        let mut source = NotifySource::new(dir.path().to_path_buf(), pattern.clone()).unwrap();

        let writer_dir = dir.path().to_path_buf();
        let writer = std::thread::spawn(move || {
            fs::write(writer_dir.join("scratch.txt"), b"noise").unwrap();
            std::thread::sleep(Duration::from_millis(80));
            write_unit(&writer_dir, &pattern, 7, &[1.0, 2.0]);
        });

        let unit = source.await_unit(7).unwrap();
        assert_eq!(unit.index, 7);
        assert_eq!(unit.volume.data, vec![1.0, 2.0]);
        writer.join().unwrap();
        source.shutdown();
    }

    #[test]
    fn test_mixed_preexisting_and_late_units() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = UnitPattern::default();
        write_unit(dir.path(), &pattern, 0, &[0.0]);

        let mut source = NotifySource::new(dir.path().to_path_buf(), pattern.clone()).unwrap();
        assert_eq!(source.await_unit(0).unwrap().volume.data, vec![0.0]);

        let writer_dir = dir.path().to_path_buf();
        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(60));
            write_unit(&writer_dir, &pattern, 1, &[1.0]);
        });
        assert_eq!(source.await_unit(1).unwrap().volume.data, vec![1.0]);
        writer.join().unwrap();

        // Idempotent shutdown, including a second call.
        source.shutdown();
        source.shutdown();
    }
}
