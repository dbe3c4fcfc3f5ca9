//! Source-priority resolution between two observations of one application.
//!
//! Trust ranking: manual > job_board > email. Recency trumps trust outside
//! the configured window; inside it, rank decides and recency breaks ties.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an observation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Manual,
    JobBoard,
    Email,
}

impl SourceType {
    /// Trust rank — higher wins within the recency window.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Manual => 3,
            Self::JobBoard => 2,
            Self::Email => 1,
        }
    }
}

/// A single source's report of an application at a point in time.
///
/// Produced by upstream ingestion (email parsing, job-board scraping, manual
/// entry). Never mutated — compared pairwise and one of a pair is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationObservation {
    /// Which ingestion path produced this observation.
    pub source: SourceType,
    /// Company name as reported by the source.
    pub company_name: String,
    /// Role title as reported by the source.
    pub role_title: String,
    /// When the source observed the application.
    pub observed_at: DateTime<Utc>,
}

/// Which of the two observations survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kept {
    First,
    Second,
}

/// Why the winning observation won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveReason {
    NewerTimestamp,
    HigherPriority,
    SamePriorityNewer,
}

impl ResolveReason {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NewerTimestamp => "newer_timestamp",
            Self::HigherPriority => "higher_priority",
            Self::SamePriorityNewer => "same_priority_newer",
        }
    }
}

/// Outcome of a priority resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub keep: Kept,
    pub reason: ResolveReason,
}

/// Decide which of two observations of the same application survives.
///
/// Outside `window`, the strictly newer observation always wins. Inside it,
/// the higher-ranked source wins; equal ranks fall back to recency. Equal
/// rank and equal timestamp keeps the first argument (stable-first).
pub fn resolve(
    a: &ApplicationObservation,
    b: &ApplicationObservation,
    window: Duration,
) -> Resolution {
    let delta_ms = (a.observed_at - b.observed_at).num_milliseconds().abs();
    let within_window = delta_ms <= window.as_millis() as i64;

    if !within_window {
        let keep = if a.observed_at >= b.observed_at {
            Kept::First
        } else {
            Kept::Second
        };
        return Resolution {
            keep,
            reason: ResolveReason::NewerTimestamp,
        };
    }

    if a.source.rank() == b.source.rank() {
        let keep = if a.observed_at >= b.observed_at {
            Kept::First
        } else {
            Kept::Second
        };
        return Resolution {
            keep,
            reason: ResolveReason::SamePriorityNewer,
        };
    }

    let keep = if a.source.rank() > b.source.rank() {
        Kept::First
    } else {
        Kept::Second
    };
    Resolution {
        keep,
        reason: ResolveReason::HigherPriority,
    }
}
