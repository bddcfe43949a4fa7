//! Structured events and console logging for design-flux pipeline runs.
//!
//! Two channels are provided:
//!
//! - [`PipelineLog`] events, serialized as JSON lines on stderr behind the
//!   `__DF_EVENT__:` prefix so a supervising UI can follow a run.
//! - Console macros (`log_info!`, `log_warning!`, ...) for human-readable
//!   progress on stdout.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[doc(hidden)]
pub use tracing;

/// Prefix written before every serialized [`PipelineLog`] line.
pub const EVENT_PREFIX: &str = "__DF_EVENT__:";

/// Identifier shared by every event of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Structured logging events emitted by the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineLog {
    /// Stage started (capture, analysis, variations, stylize, ...)
    StageStarted {
        stage: usize,
        name: String,
        total_stages: usize,
    },
    StageCompleted {
        stage: usize,
        name: String,
    },
    StageFailed {
        stage: usize,
        name: String,
        error: String,
    },
    /// Unit of work started: one category, segment, pattern or style
    UnitStarted {
        stage: usize,
        unit_id: String,
        description: String,
        total_units: Option<usize>,
    },
    UnitProgress {
        unit_id: String,
        message: String,
    },
    UnitCompleted {
        unit_id: String,
        result: Option<String>,
    },
    /// Unit failed; siblings keep running
    UnitFailed {
        unit_id: String,
        error: String,
    },
    /// Artifact written to disk
    ArtifactWritten {
        stage: usize,
        path: String,
        description: String,
    },
}

impl PipelineLog {
    /// Serialize this event into the line format read by supervisors
    pub fn to_line(&self) -> Option<String> {
        serde_json::to_string(self)
            .ok()
            .map(|json| format!("{}{}", EVENT_PREFIX, json))
    }

    /// Emit this event to stderr
    pub fn emit(&self) {
        if let Some(line) = self.to_line() {
            use std::io::Write;
            eprintln!("{}", line);
            // Concurrent units interleave; flush per event
            let _ = std::io::stderr().flush();
        }
    }

    /// Parse a stderr line back into an event, if it carries the prefix
    pub fn parse_line(line: &str) -> Option<Self> {
        let json = line.strip_prefix(EVENT_PREFIX)?;
        serde_json::from_str(json).ok()
    }
}

#[macro_export]
macro_rules! log_stage_start {
    ($stage:expr, $name:expr, $total:expr) => {
        $crate::PipelineLog::StageStarted {
            stage: $stage,
            name: $name.to_string(),
            total_stages: $total,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_stage_complete {
    ($stage:expr, $name:expr) => {
        $crate::PipelineLog::StageCompleted {
            stage: $stage,
            name: $name.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_stage_failed {
    ($stage:expr, $name:expr, $error:expr) => {
        $crate::PipelineLog::StageFailed {
            stage: $stage,
            name: $name.to_string(),
            error: $error.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_unit_start {
    ($stage:expr, $unit_id:expr, $desc:expr) => {
        $crate::PipelineLog::UnitStarted {
            stage: $stage,
            unit_id: $unit_id.to_string(),
            description: $desc.to_string(),
            total_units: None,
        }
        .emit();
    };
    ($stage:expr, $unit_id:expr, $desc:expr, $total:expr) => {
        $crate::PipelineLog::UnitStarted {
            stage: $stage,
            unit_id: $unit_id.to_string(),
            description: $desc.to_string(),
            total_units: Some($total),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_unit_progress {
    ($unit_id:expr, $msg:expr) => {
        $crate::PipelineLog::UnitProgress {
            unit_id: $unit_id.to_string(),
            message: $msg.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_unit_complete {
    ($unit_id:expr) => {
        $crate::PipelineLog::UnitCompleted {
            unit_id: $unit_id.to_string(),
            result: None,
        }
        .emit();
    };
    ($unit_id:expr, $result:expr) => {
        $crate::PipelineLog::UnitCompleted {
            unit_id: $unit_id.to_string(),
            result: Some($result.to_string()),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_unit_failed {
    ($unit_id:expr, $error:expr) => {
        $crate::PipelineLog::UnitFailed {
            unit_id: $unit_id.to_string(),
            error: $error.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_artifact {
    ($stage:expr, $path:expr, $desc:expr) => {
        $crate::PipelineLog::ArtifactWritten {
            stage: $stage,
            path: $path.to_string(),
            description: $desc.to_string(),
        }
        .emit();
    };
}

// ============================================================================
// Console Logging Macros
// ============================================================================

/// Logs the start of a pipeline stage with a header and description.
///
/// Outputs:
/// ```text
/// ═══ STEP 1: Component Segmentation ═══
/// Capture scroll segments and analyze each one
/// ```
#[macro_export]
macro_rules! log_stage_start_console {
    ($stage:expr, $title:expr, $description:expr) => {
        println!("\x1b[1;36m═══ STEP {}: {} ═══\x1b[0m", $stage, $title);
        println!("\x1b[36m{}\x1b[0m", $description);
    };
}

/// Logs the start of a batch of concurrent calls.
///
/// Outputs:
/// ```text
/// → Executing Batch 2/4 (5 tasks)
/// ```
#[macro_export]
macro_rules! log_batch_start {
    ($batch_num:expr, $total_batches:expr, $num_tasks:expr) => {
        println!(
            "\x1b[36m→ Executing Batch {}/{} ({} tasks)\x1b[0m",
            $batch_num, $total_batches, $num_tasks
        );
    };
}

#[macro_export]
macro_rules! log_batch_complete {
    ($batch_num:expr) => {
        println!("\x1b[32m✓ Batch {} complete\x1b[0m", $batch_num);
    };
}

/// Logs success/failure totals for a set of units.
///
/// Outputs:
/// ```text
/// Result: ✓ 4 succeeded, ✗ 3 failed (7 total)
/// ```
#[macro_export]
macro_rules! log_outcome_summary {
    ($succeeded:expr, $failed:expr, $total:expr) => {
        println!(
            "\x1b[1mResult: \x1b[32m✓ {} succeeded\x1b[0m, \x1b[31m✗ {} failed\x1b[0m ({} total)",
            $succeeded, $failed, $total
        );
    };
}

#[macro_export]
macro_rules! log_info {
    ($message:expr) => {
        println!("\x1b[36mℹ {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        println!("\x1b[36mℹ {}\x1b[0m", format!($fmt, $($arg)*));
    };
}

#[macro_export]
macro_rules! log_warning {
    ($message:expr) => {
        println!("\x1b[33m⚠ Warning: {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        println!("\x1b[33m⚠ Warning: {}\x1b[0m", format!($fmt, $($arg)*));
    };
}

#[macro_export]
macro_rules! log_file_saved {
    ($path:expr) => {
        println!("\x1b[32m✓ Saved: {}\x1b[0m", $path);
    };
}

/// Logs a debug message through `tracing`, so the subscriber's filter decides
/// whether it is shown.
///
/// ```
/// use design_flux_sdk::log_debug;
/// let count = 3;
/// log_debug!("Merged {} JSON chunks", count);
/// ```
#[macro_export]
macro_rules! log_debug {
    ($message:expr) => {
        $crate::tracing::debug!("{}", $message)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::tracing::debug!("{}", format!($fmt, $($arg)*))
    };
}
