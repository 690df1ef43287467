use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use time::OffsetDateTime;

/// Fallback monitoring duration when the configured one is non-positive.
pub const DEFAULT_MONITOR_DURATION: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Ping,
    Download,
    Upload,
    Waiting,
    Complete,
}

impl Phase {
    /// True for the states a run may be (re)started from. Every other state
    /// blocks start, mode and profile changes.
    pub fn is_restartable(self) -> bool {
        matches!(self, Phase::Idle | Phase::Complete)
    }

    /// Short status label for UI/CLI layers.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "Ready",
            Phase::Ping => "Measuring latency",
            Phase::Download => "Measuring download",
            Phase::Upload => "Measuring upload",
            Phase::Waiting => "Waiting for next cycle",
            Phase::Complete => "Complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    /// One ping/download/upload cycle with an immediate verdict.
    Quick,
    /// Repeated cycles under a total duration budget, one record per cycle.
    Monitoring,
}

/// Pacing between monitoring cycles. `Continuous` loops straight into the
/// next cycle; there is no zero-minute sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleInterval {
    Continuous,
    Every(#[serde(with = "humantime_serde")] Duration),
}

impl CycleInterval {
    /// Normalize raw user input; any non-positive pause means continuous.
    pub fn from_user_input(interval: Duration) -> Self {
        if interval.is_zero() {
            CycleInterval::Continuous
        } else {
            CycleInterval::Every(interval)
        }
    }
}

impl fmt::Display for CycleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleInterval::Continuous => write!(f, "continuous"),
            CycleInterval::Every(d) => write!(f, "every {}", humantime::format_duration(*d)),
        }
    }
}

/// Run configuration. Read-only for the lifetime of a run; the measurement
/// toggles are carried through to the output but do not alter sequencing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub server_id: String,
    pub profile_id: String,
    pub measure_download: bool,
    pub measure_upload: bool,
    pub measure_latency: bool,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub interval: CycleInterval,
}

/// Live snapshot of the metrics measured so far in the current cycle.
/// Fields for a phase not yet entered stay at zero; a measured value
/// persists until the next cycle reset.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MeasurementResult {
    pub ping_ms: f64,
    pub jitter_ms: f64,
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub loss_pct: f64,
}

/// One point of the live throughput chart: seconds since run start and Mb/s.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpeedSample {
    pub at_secs: f64,
    pub mbps: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    Ok,
    Warning,
    /// Part of the record vocabulary (summaries and reports count it) but
    /// not produced by the current classification rule.
    Error,
}

impl RecordStatus {
    /// Classify a completed cycle: high latency, collapsed download or
    /// sustained loss downgrade the record to a warning.
    pub fn classify(result: &MeasurementResult) -> Self {
        if result.ping_ms > 100.0 || result.download_mbps < 5.0 || result.loss_pct > 2.0 {
            RecordStatus::Warning
        } else {
            RecordStatus::Ok
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordStatus::Ok => write!(f, "OK"),
            RecordStatus::Warning => write!(f, "WARNING"),
            RecordStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// One completed monitoring cycle. Immutable once appended to the history;
/// the history itself is cleared only at run start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRecord {
    pub id: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub ping_ms: f64,
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub status: RecordStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(ping: f64, download: f64, loss: f64) -> MeasurementResult {
        MeasurementResult {
            ping_ms: ping,
            jitter_ms: 2.0,
            download_mbps: download,
            upload_mbps: 20.0,
            loss_pct: loss,
        }
    }

    #[test]
    fn classify_nominal_cycle_is_ok() {
        assert_eq!(
            RecordStatus::classify(&result(30.0, 50.0, 0.0)),
            RecordStatus::Ok
        );
    }

    #[test]
    fn classify_downgrades_on_any_degraded_metric() {
        assert_eq!(
            RecordStatus::classify(&result(150.0, 50.0, 0.0)),
            RecordStatus::Warning
        );
        assert_eq!(
            RecordStatus::classify(&result(30.0, 3.0, 0.0)),
            RecordStatus::Warning
        );
        assert_eq!(
            RecordStatus::classify(&result(30.0, 50.0, 2.5)),
            RecordStatus::Warning
        );
    }

    #[test]
    fn interval_normalization() {
        assert_eq!(
            CycleInterval::from_user_input(Duration::ZERO),
            CycleInterval::Continuous
        );
        assert_eq!(
            CycleInterval::from_user_input(Duration::from_secs(300)),
            CycleInterval::Every(Duration::from_secs(300))
        );
    }

    #[test]
    fn restartable_states() {
        assert!(Phase::Idle.is_restartable());
        assert!(Phase::Complete.is_restartable());
        assert!(!Phase::Ping.is_restartable());
        assert!(!Phase::Waiting.is_restartable());
    }
}
