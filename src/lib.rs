//! AppTrack — request intake and record reconciliation core.

pub mod config;
pub mod error;
pub mod guardrails;
pub mod http;
pub mod llm;
pub mod orchestrator;
pub mod reconcile;
pub mod sink;
pub mod skills;
