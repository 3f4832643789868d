/// One progress notification: percentage plus the frame position it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub percent: u8,
    pub processed_frames: u64,
    pub total_frames: u64,
}

/// Turns frame positions into percentage notifications, emitting only on change.
///
/// Nothing is emitted while the total frame count is unknown (zero).
#[derive(Debug)]
pub struct ProgressTracker {
    total_frames: u64,
    last_percent: Option<u8>,
}

impl ProgressTracker {
    pub fn new(total_frames: u64) -> Self {
        Self {
            total_frames,
            last_percent: None,
        }
    }

    pub fn percent_of(current: u64, total: u64) -> u8 {
        let pct = (100.0 * current as f64 / total as f64).round();
        pct.clamp(0.0, 100.0) as u8
    }

    /// `current` is the number of source frames consumed so far.
    pub fn observe(&mut self, current: u64) -> Option<Progress> {
        if self.total_frames == 0 {
            return None;
        }
        let percent = Self::percent_of(current, self.total_frames);
        if self.last_percent == Some(percent) {
            return None;
        }
        self.last_percent = Some(percent);
        Some(Progress {
            percent,
            processed_frames: current,
            total_frames: self.total_frames,
        })
    }

    /// Final notification of a successful run; always emitted.
    pub fn finished(processed_frames: u64) -> Progress {
        Progress {
            percent: 100,
            processed_frames,
            total_frames: processed_frames,
        }
    }
}
