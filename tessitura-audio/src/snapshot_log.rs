//! Time-indexed record of session parameters over a take.
//!
//! Appended while recording, sealed when the take finishes, then only read:
//! playback looks up the snapshot in effect at any position.

use tessitura_types::PlaybackSnapshot;

#[derive(Debug, Default)]
pub struct SnapshotLog {
    entries: Vec<PlaybackSnapshot>,
    sealed: bool,
}

impl SnapshotLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot. Rejected (returns false) once sealed or when the
    /// timestamp does not move strictly forward.
    pub fn append(&mut self, snapshot: PlaybackSnapshot) -> bool {
        if self.sealed {
            log::trace!(target: "audio::snapshot_log", "append after seal ignored");
            return false;
        }
        if let Some(last) = self.entries.last() {
            if snapshot.timestamp_secs <= last.timestamp_secs {
                log::trace!(
                    target: "audio::snapshot_log",
                    "non-increasing timestamp {:.3} <= {:.3}",
                    snapshot.timestamp_secs,
                    last.timestamp_secs
                );
                return false;
            }
        }
        self.entries.push(snapshot);
        true
    }

    /// Snapshot in effect at `t`: the latest one at or before `t`, the first
    /// one if `t` precedes everything, `None` for an empty log.
    pub fn find_at_or_before(&self, t: f64) -> Option<&PlaybackSnapshot> {
        let idx = self.entries.partition_point(|s| s.timestamp_secs <= t);
        if idx == 0 {
            self.entries.first()
        } else {
            self.entries.get(idx - 1)
        }
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.sealed = false;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PlaybackSnapshot] {
        &self.entries
    }
}
