use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::SweepError;

/// Lifecycle of a scan. Only moves forward:
/// `pending -> running -> completed | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Pending => "pending",
            ScanStatus::Running => "running",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanStatus::Completed | ScanStatus::Failed)
    }
}

/// Per-target progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    Pending,
    InProgress,
    Done,
    Error,
}

impl TargetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetStatus::Pending => "pending",
            TargetStatus::InProgress => "in_progress",
            TargetStatus::Done => "done",
            TargetStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TargetStatus::Done | TargetStatus::Error)
    }
}

/// Report generation state. An unset report is modelled as `None` on the
/// scan record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Queued,
    Ready,
    Failed,
    NoResults,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Queued => "queued",
            ReportStatus::Ready => "ready",
            ReportStatus::Failed => "failed",
            ReportStatus::NoResults => "no_results",
        }
    }
}

macro_rules! status_text {
    ($ty:ident { $($text:literal => $variant:ident),+ $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = SweepError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(SweepError::Internal(format!(
                        "unknown {} value `{}`",
                        stringify!($ty),
                        other
                    ))),
                }
            }
        }
    };
}

status_text!(ScanStatus {
    "pending" => Pending,
    "running" => Running,
    "completed" => Completed,
    "failed" => Failed,
});

status_text!(TargetStatus {
    "pending" => Pending,
    "in_progress" => InProgress,
    "done" => Done,
    "error" => Error,
});

status_text!(ReportStatus {
    "queued" => Queued,
    "ready" => Ready,
    "failed" => Failed,
    "no_results" => NoResults,
});
