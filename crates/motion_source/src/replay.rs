//! Replay motion source
//!
//! Reads an accelerometer trace recorded as JSONL, one sample per line:
//!
//! ```text
//! {"t_ms": 0, "x": 0.1, "y": 0.0, "z": 9.8}
//! {"t_ms": 20, "x": 0.2, "y": 0.1, "z": 10.4}
//! ```
//!
//! and replays it on a background thread with the recorded spacing.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use contracts::{
    AccelerationSample, ContractError, DeviceProbe, MotionSource, SampleCallback,
    SubscriptionHandle,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{MotionSourceError, Result};
use crate::registry::Subscribers;

/// Replay configuration
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Playback speed multiplier (1.0 = recorded speed)
    pub speed_multiplier: f64,
    /// Restart from the first record when the trace ends
    pub loop_playback: bool,
    /// Report as a simulator
    pub virtual_device: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            loop_playback: false,
            virtual_device: false,
        }
    }
}

/// One line of a recording
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    /// Offset from the start of the recording (milliseconds)
    pub t_ms: u64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl ReplayRecord {
    pub fn sample(&self) -> AccelerationSample {
        AccelerationSample::new(self.x, self.y, self.z)
    }
}

/// Replays a recorded trace
pub struct ReplayMotionSource {
    source_id: String,
    records: Arc<Vec<ReplayRecord>>,
    config: ReplayConfig,
    subscribers: Arc<Subscribers>,
    generation: Arc<AtomicU64>,
    running: AtomicBool,
    finished: Arc<AtomicBool>,
}

impl ReplayMotionSource {
    /// Load a JSONL recording
    pub fn load(path: &Path, config: ReplayConfig) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| MotionSourceError::load_failed(path.display().to_string(), e.to_string()))?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let record: ReplayRecord = serde_json::from_str(trimmed)
                .map_err(|e| MotionSourceError::invalid_record(index + 1, e.to_string()))?;
            records.push(record);
        }

        let source_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("replay")
            .to_string();

        info!(
            source_id = %source_id,
            records = records.len(),
            "loaded motion recording"
        );

        Ok(Self::from_records(source_id, records, config))
    }

    /// Build from in-memory records
    pub fn from_records(
        source_id: impl Into<String>,
        mut records: Vec<ReplayRecord>,
        config: ReplayConfig,
    ) -> Self {
        records.sort_by_key(|r| r.t_ms);
        Self {
            source_id: source_id.into(),
            records: Arc::new(records),
            config,
            subscribers: Arc::new(Subscribers::default()),
            generation: Arc::new(AtomicU64::new(0)),
            running: AtomicBool::new(false),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Recorded duration (milliseconds)
    pub fn duration_ms(&self) -> u64 {
        match (self.records.first(), self.records.last()) {
            (Some(first), Some(last)) => last.t_ms - first.t_ms,
            _ => 0,
        }
    }

    /// True once a non-looping replay has delivered its last record
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = self.generation.clone();
        let subscribers = self.subscribers.clone();
        let records = self.records.clone();
        let finished = self.finished.clone();
        let source_id = self.source_id.clone();
        let speed = self.config.speed_multiplier.max(0.1);
        let loop_playback = self.config.loop_playback;

        finished.store(false, Ordering::SeqCst);

        thread::spawn(move || {
            debug!(source_id = %source_id, "replay thread started");

            let Some(first) = records.first() else {
                warn!(source_id = %source_id, "no records to replay");
                finished.store(true, Ordering::SeqCst);
                return;
            };
            let first_t_ms = first.t_ms;

            loop {
                let start_time = Instant::now();

                for record in records.iter() {
                    if generation.load(Ordering::SeqCst) != my_generation {
                        debug!(source_id = %source_id, "replay stopped");
                        return;
                    }

                    let offset_ms = (record.t_ms - first_t_ms) as f64 / speed;
                    let target_elapsed = Duration::from_secs_f64(offset_ms / 1000.0);
                    let actual_elapsed = start_time.elapsed();
                    if target_elapsed > actual_elapsed {
                        thread::sleep(target_elapsed - actual_elapsed);
                    }

                    subscribers.dispatch(record.sample());
                }

                if !loop_playback {
                    info!(source_id = %source_id, "replay completed");
                    break;
                }
                debug!(source_id = %source_id, "looping replay");
            }

            finished.store(true, Ordering::SeqCst);
        });
    }

    fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Drop for ReplayMotionSource {
    fn drop(&mut self) {
        self.stop();
    }
}

impl DeviceProbe for ReplayMotionSource {
    fn is_virtual_device(&self) -> bool {
        self.config.virtual_device
    }
}

impl MotionSource for ReplayMotionSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn is_available(&self) -> bool {
        !self.records.is_empty()
    }

    fn subscribe(&self, callback: SampleCallback) -> std::result::Result<SubscriptionHandle, ContractError> {
        if self.records.is_empty() {
            return Err(ContractError::sensor_unavailable(
                &self.source_id,
                "recording is empty",
            ));
        }
        let (handle, count) = self.subscribers.insert(callback);
        debug!(source_id = %self.source_id, subscribers = count, "subscribed");
        self.start();
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        if let Some(remaining) = self.subscribers.remove(handle) {
            debug!(source_id = %self.source_id, subscribers = remaining, "unsubscribed");
            if remaining == 0 {
                self.stop();
            }
        }
    }

    fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    fn write_recording(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[test]
    fn test_load_sorts_and_skips_blank_lines() {
        let file = write_recording(&[
            r#"{"t_ms": 40, "x": 0.0, "y": 0.0, "z": 12.0}"#,
            "",
            r#"{"t_ms": 0, "x": 0.0, "y": 0.0, "z": 9.8}"#,
            r#"{"t_ms": 20, "x": 0.0, "y": 0.0, "z": 10.0}"#,
        ]);

        let source = ReplayMotionSource::load(file.path(), ReplayConfig::default()).unwrap();
        assert_eq!(source.len(), 3);
        assert_eq!(source.duration_ms(), 40);
        assert!(source.is_available());
    }

    #[test]
    fn test_load_reports_bad_line() {
        let file = write_recording(&[
            r#"{"t_ms": 0, "x": 0.0, "y": 0.0, "z": 9.8}"#,
            r#"{"t_ms": "oops"}"#,
        ]);

        let err = ReplayMotionSource::load(file.path(), ReplayConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, MotionSourceError::InvalidRecord { line: 2, .. }));
    }

    #[test]
    fn test_missing_file() {
        let result =
            ReplayMotionSource::load(Path::new("/nonexistent/trace.jsonl"), ReplayConfig::default());
        assert!(matches!(result, Err(MotionSourceError::LoadFailed { .. })));
    }

    #[test]
    fn test_replay_delivers_in_order() {
        let records: Vec<ReplayRecord> = (0..5)
            .map(|i| ReplayRecord {
                t_ms: i * 5,
                x: 0.0,
                y: 0.0,
                z: i as f64,
            })
            .collect();
        let source = ReplayMotionSource::from_records(
            "trace",
            records,
            ReplayConfig {
                speed_multiplier: 10.0,
                ..Default::default()
            },
        );

        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = received.clone();
        let handle = source
            .subscribe(Arc::new(move |sample| {
                received_clone.lock().unwrap().push(sample.z);
            }))
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while !source.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        source.unsubscribe(handle);

        assert!(source.is_finished());
        assert_eq!(*received.lock().unwrap(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_empty_recording_is_unavailable() {
        let source = ReplayMotionSource::from_records("empty", vec![], ReplayConfig::default());
        assert!(!source.is_available());
        assert!(source.subscribe(Arc::new(|_| {})).is_err());
    }
}
