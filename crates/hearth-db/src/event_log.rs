//! The append-only JSONL audit log.
//!
//! One event per line, each a complete JSON object with `tick` and `seq`.
//! The log exists for human audit only: the engine never replays it. The
//! frame is the line -- on reopen, a trailing partial line (torn write) is
//! truncated, and complete frames belonging to a tick the database never
//! committed are truncated too, so the log never claims more than the
//! database knows.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use hearth_types::Event;
use tracing::{info, warn};

use crate::error::DbError;

/// Append-only writer over `events.jsonl`.
#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    file: File,
}

impl EventLog {
    /// Open the log, repairing its tail: a partial final line is dropped,
    /// and complete frames with `tick > committed_tick` are dropped (they
    /// belong to a tick whose database transaction never committed).
    pub fn open(path: impl Into<PathBuf>, committed_tick: u64) -> Result<Self, DbError> {
        let path = path.into();
        let keep = scan_keep_length(&path, committed_tick)?;

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        let len = file.metadata()?.len();
        if keep < len {
            warn!(
                path = %path.display(),
                dropped_bytes = len.saturating_sub(keep),
                "truncating unconfirmed tail of event log"
            );
            file.set_len(keep)?;
            file.seek(SeekFrom::End(0))?;
        }

        Ok(Self { path, file })
    }

    /// Append a batch of committed events, one frame per line, and sync
    /// to disk. Called only from inside the commit envelope.
    pub fn append(&mut self, events: &[Event]) -> Result<(), DbError> {
        for event in events {
            let line = serde_json::to_string(event)?;
            self.file.write_all(line.as_bytes())?;
            self.file.write_all(b"\n")?;
        }
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    /// The log's path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Compute how many leading bytes of the log are trustworthy: complete
/// lines whose `tick` is at most `committed_tick`.
fn scan_keep_length(path: &Path, committed_tick: u64) -> Result<u64, DbError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(err.into()),
    };

    let mut reader = BufReader::new(file);
    let mut keep: u64 = 0;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf)?;
        if read == 0 {
            break;
        }
        let Some(&b'\n') = buf.last() else {
            // Torn final frame.
            info!(path = %path.display(), "partial frame at end of event log");
            break;
        };
        let Ok(event) = serde_json::from_slice::<Event>(&buf) else {
            // A complete line that does not parse is treated as torn.
            warn!(path = %path.display(), "unparseable frame in event log tail");
            break;
        };
        if event.tick > committed_tick {
            break;
        }
        keep = keep.saturating_add(u64::try_from(read).unwrap_or(u64::MAX));
    }
    Ok(keep)
}

#[cfg(test)]
mod tests {
    use hearth_types::{AgentName, EventKind, Position};

    use super::*;

    fn event(seq: u64, tick: u64) -> Event {
        Event {
            seq,
            tick,
            kind: EventKind::AgentMoved {
                agent: AgentName::from("Ash"),
                from: Position::new(0, 0),
                to: Position::new(0, 1),
            },
        }
    }

    fn line_count(path: &Path) -> usize {
        std::fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .count()
    }

    #[test]
    fn appends_one_frame_per_line() {
        let Ok(dir) = tempfile::tempdir() else {
            return;
        };
        let path = dir.path().join("events.jsonl");
        let Ok(mut log) = EventLog::open(&path, 0) else {
            assert!(false, "open failed");
            return;
        };
        let ok = log.append(&[event(1, 1), event(2, 1)]);
        assert!(ok.is_ok());
        assert_eq!(line_count(&path), 2);
    }

    #[test]
    fn reopen_truncates_a_partial_frame() {
        let Ok(dir) = tempfile::tempdir() else {
            return;
        };
        let path = dir.path().join("events.jsonl");
        {
            let Ok(mut log) = EventLog::open(&path, 0) else {
                return;
            };
            let _ = log.append(&[event(1, 1)]);
        }
        // Simulate a torn write: half a frame, no newline.
        {
            let Ok(mut file) = OpenOptions::new().append(true).open(&path) else {
                return;
            };
            let _ = file.write_all(b"{\"seq\":2,\"tick\":2,\"ty");
        }
        let _ = EventLog::open(&path, 1);
        assert_eq!(line_count(&path), 1);
    }

    #[test]
    fn reopen_truncates_frames_beyond_the_committed_tick() {
        let Ok(dir) = tempfile::tempdir() else {
            return;
        };
        let path = dir.path().join("events.jsonl");
        {
            let Ok(mut log) = EventLog::open(&path, 0) else {
                return;
            };
            // Tick 1 committed; tick 2's frames were written but the
            // database transaction never landed.
            let _ = log.append(&[event(1, 1), event(2, 2), event(3, 2)]);
        }
        let _ = EventLog::open(&path, 1);
        assert_eq!(line_count(&path), 1);
    }
}
