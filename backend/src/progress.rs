//! Progress reporting and cancellation for long-running stages.
//!
//! Every chunked stage (decode, index build, join) receives a
//! [`ProgressSink`] and a [`CancelFlag`] as explicit parameters. There is
//! no module-level progress state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Pipeline stage tag attached to every progress report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    DecodingWeb,
    DecodingAccounting,
    BuildingIndex,
    Joining,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::DecodingWeb => "decodingWeb",
            Stage::DecodingAccounting => "decodingAccounting",
            Stage::BuildingIndex => "buildingIndex",
            Stage::Joining => "joining",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives per-stage percentages and user-facing status text.
///
/// Closures `Fn(Stage, u8)` implement this trait directly.
pub trait ProgressSink: Send + Sync {
    /// Called after each processed chunk with a value in `0..=100`.
    fn progress(&self, stage: Stage, percent: u8);

    /// Short status message for the user (file loaded, run finished...).
    fn status(&self, _message: &str) {}
}

impl<F> ProgressSink for F
where
    F: Fn(Stage, u8) + Send + Sync,
{
    fn progress(&self, stage: Stage, percent: u8) {
        self(stage, percent)
    }
}

/// Sink that drops every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn progress(&self, _stage: Stage, _percent: u8) {}
}

/// `round(processed / total * 100)`, clamped to 100. Zero total is 100.
pub fn percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let value = (processed as f64 / total as f64 * 100.0).round();
    value.clamp(0.0, 100.0) as u8
}

/// Cooperative cancellation signal shared between a run and its caller.
///
/// Cloning shares the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; observed at the next chunk boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled(stage))` once cancellation was requested.
    pub fn check(&self, stage: Stage) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled(stage))
        } else {
            Ok(())
        }
    }
}

/// A stage stopped at a chunk boundary because its [`CancelFlag`] was set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cancelled during {0}")]
pub struct Cancelled(pub Stage);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_percent_rounding() {
        assert_eq!(percent(0, 10), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(500, 10_001), 5);
        assert_eq!(percent(10_001, 10_001), 100);
        assert_eq!(percent(0, 0), 100);
    }

    #[test]
    fn test_closure_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |stage: Stage, p: u8| seen.lock().unwrap().push((stage, p));
        sink.progress(Stage::Joining, 42);
        sink.status("ignored");
        assert_eq!(*seen.lock().unwrap(), vec![(Stage::Joining, 42)]);
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!flag.is_cancelled());
        assert!(flag.check(Stage::Joining).is_ok());
        clone.cancel();
        assert!(flag.is_cancelled());
        assert_eq!(flag.check(Stage::Joining), Err(Cancelled(Stage::Joining)));
    }

    #[test]
    fn test_stage_serializes_camel_case() {
        let json = serde_json::to_string(&Stage::BuildingIndex).unwrap();
        assert_eq!(json, "\"buildingIndex\"");
        assert_eq!(Stage::DecodingWeb.to_string(), "decodingWeb");
    }
}
