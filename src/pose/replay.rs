//! Frame source that replays JSON Lines pose frames.
//!
//! Each line holds one [`PoseFrame`]. Frames are parsed on a background
//! thread and delivered over a bounded channel, so a live pose estimator
//! piping into stdin and a recorded file look the same to the consumer.

use crate::pose::types::PoseFrame;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Channel capacity; a few seconds of frames at 30 fps.
const CHANNEL_CAPACITY: usize = 256;

/// Errors that can occur while replaying frames.
#[derive(Debug)]
pub enum ReplayError {
    AlreadyStarted,
    Io(String),
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplayError::AlreadyStarted => write!(f, "Replay has already been started"),
            ReplayError::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for ReplayError {}

/// Reads pose frames from a line-oriented source.
pub struct ReplayCollector {
    reader: Option<Box<dyn BufRead + Send>>,
    sender: Option<Sender<PoseFrame>>,
    receiver: Receiver<PoseFrame>,
    running: Arc<AtomicBool>,
    skipped_lines: Arc<AtomicU64>,
    thread_handle: Option<JoinHandle<()>>,
}

impl ReplayCollector {
    /// Create a collector over any buffered reader.
    pub fn new<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (sender, receiver) = bounded(CHANNEL_CAPACITY);
        Self {
            reader: Some(Box::new(reader)),
            sender: Some(sender),
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            skipped_lines: Arc::new(AtomicU64::new(0)),
            thread_handle: None,
        }
    }

    /// Create a collector reading from a file.
    pub fn from_path(path: &Path) -> Result<Self, ReplayError> {
        let file = File::open(path).map_err(|e| ReplayError::Io(e.to_string()))?;
        Ok(Self::new(BufReader::new(file)))
    }

    /// Create a collector reading from standard input.
    pub fn stdin() -> Self {
        Self::new(BufReader::new(std::io::stdin()))
    }

    /// Start reading frames in a background thread.
    ///
    /// The channel disconnects once the source is exhausted or [`stop`]
    /// is called, after all queued frames have been received.
    ///
    /// [`stop`]: ReplayCollector::stop
    pub fn start(&mut self) -> Result<(), ReplayError> {
        let (reader, sender) = match (self.reader.take(), self.sender.take()) {
            (Some(reader), Some(sender)) => (reader, sender),
            _ => return Err(ReplayError::AlreadyStarted),
        };

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let skipped = self.skipped_lines.clone();

        let handle = thread::spawn(move || {
            read_frames(reader, sender, &running, &skipped);
            running.store(false, Ordering::SeqCst);
        });

        self.thread_handle = Some(handle);
        Ok(())
    }

    /// Stop reading. Frames already queued remain receivable.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the reader thread is still producing frames.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of lines that could not be parsed as a frame.
    pub fn skipped_lines(&self) -> u64 {
        self.skipped_lines.load(Ordering::Relaxed)
    }

    /// Get the receiver for pose frames.
    pub fn receiver(&self) -> &Receiver<PoseFrame> {
        &self.receiver
    }

    /// Try to receive a frame without blocking.
    pub fn try_recv(&self) -> Option<PoseFrame> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for ReplayCollector {
    fn drop(&mut self) {
        self.stop();
        // Joining could block forever on an idle stdin; let the thread finish on its own.
        self.thread_handle.take();
    }
}

fn read_frames(
    reader: Box<dyn BufRead + Send>,
    sender: Sender<PoseFrame>,
    running: &AtomicBool,
    skipped: &AtomicU64,
) {
    for (line_no, line) in reader.lines().enumerate() {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Stopping replay after read error: {}", e);
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<PoseFrame>(trimmed) {
            Ok(frame) => {
                if sender.send(frame).is_err() {
                    // Receiver dropped
                    break;
                }
            }
            Err(e) => {
                skipped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Skipping malformed frame on line {}: {}", line_no + 1, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    #[test]
    fn test_replay_reads_all_frames() {
        let input = "{\"timestamp_ms\":0,\"keypoints\":[]}\n\
                     \n\
                     {\"timestamp_ms\":33,\"keypoints\":[{\"x\":0.5,\"y\":0.5}]}\n";
        let mut collector = ReplayCollector::new(Cursor::new(input.to_string()));
        collector.start().unwrap();

        let frames: Vec<PoseFrame> = collector.receiver().iter().collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].timestamp_ms, 33);
        assert_eq!(collector.skipped_lines(), 0);
    }

    #[test]
    fn test_replay_skips_malformed_lines() {
        let input = "not json\n{\"timestamp_ms\":10,\"keypoints\":[]}\n{\"x\":1}\n";
        let mut collector = ReplayCollector::new(Cursor::new(input.to_string()));
        collector.start().unwrap();

        let receiver = collector.receiver().clone();
        let first = receiver.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(first.timestamp_ms, 10);
        assert!(receiver.recv_timeout(Duration::from_secs(1)).is_err());
        assert_eq!(collector.skipped_lines(), 2);
    }

    #[test]
    fn test_replay_cannot_start_twice() {
        let mut collector = ReplayCollector::new(Cursor::new(String::new()));
        collector.start().unwrap();
        assert!(matches!(collector.start(), Err(ReplayError::AlreadyStarted)));
    }
}
