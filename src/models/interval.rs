use chrono::{DateTime, Duration, Utc};

/// A concrete `[from, to)` window plus the bucketing step.
///
/// A zero step asks for raw documents, any positive step for
/// histogram buckets of that width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsoluteInterval {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub aggregation_step: Duration,
}

impl AbsoluteInterval {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>, aggregation_step: Duration) -> Self {
        Self {
            from,
            to,
            aggregation_step,
        }
    }

    /// Window that fetches individual documents
    pub fn raw(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self::new(from, to, Duration::zero())
    }

    pub fn is_docs_mode(&self) -> bool {
        self.aggregation_step <= Duration::zero()
    }

    /// Phase of the bucket grid: `from mod step`.
    ///
    /// Buckets start at `offset + k * step`, so the grid is anchored to the
    /// epoch and only moves when `from` moves by a non-multiple of the step.
    /// Zero in docs mode.
    pub fn phase_offset(&self) -> Duration {
        let step_ms = self.aggregation_step.num_milliseconds();
        if step_ms <= 0 {
            return Duration::zero();
        }
        Duration::milliseconds(self.from.timestamp_millis().rem_euclid(step_ms))
    }

    /// Start of the bucket containing `ts`, or `ts` itself in docs mode
    pub fn bucket_start(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let step_ms = self.aggregation_step.num_milliseconds();
        if step_ms <= 0 {
            return ts;
        }
        let offset_ms = self.phase_offset().num_milliseconds();
        let shifted = ts.timestamp_millis() - offset_ms;
        let start_ms = shifted - shifted.rem_euclid(step_ms) + offset_ms;
        DateTime::from_timestamp_millis(start_ms).unwrap_or(ts)
    }

    /// Bucket boundaries covering the window, in ascending order
    pub fn bucket_boundaries(&self) -> Vec<DateTime<Utc>> {
        if self.is_docs_mode() || self.to <= self.from {
            return Vec::new();
        }
        let mut boundaries = Vec::new();
        let mut current = self.bucket_start(self.from);
        while current < self.to {
            boundaries.push(current);
            current += self.aggregation_step;
        }
        boundaries
    }
}
