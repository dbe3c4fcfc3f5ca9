//! Source reconciliation — merging observations of one job application.
//!
//! Observations of the same application arrive from email parsing, job-board
//! scraping, and manual entry. The reconciler decides whether two
//! observations denote the same application (fuzzy company/role match) and,
//! if so, which one survives. The loser is kept as corroborating evidence on
//! the merged record, never discarded.

pub mod priority;
pub mod similarity;

pub use priority::{
    ApplicationObservation, Kept, Resolution, ResolveReason, SourceType, resolve,
};
pub use similarity::{jaro_winkler, normalize};

use tracing::debug;

use crate::config::ReconcilerConfig;

/// A merged record: the surviving observation plus the evidence behind it.
#[derive(Debug, Clone)]
pub struct ReconciledRecord {
    /// The observation that survives the conflict.
    pub winner: ApplicationObservation,
    /// Losing observations retained as corroborating evidence.
    pub corroborating: Vec<ApplicationObservation>,
    /// Why the winner won.
    pub reason: ResolveReason,
}

/// Outcome of reconciling a pair of observations.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// The observations describe different applications — both stand.
    Distinct(ApplicationObservation, ApplicationObservation),
    /// The observations describe the same application — one survives.
    Merged(ReconciledRecord),
}

/// Pairwise reconciler over application observations.
pub struct Reconciler {
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self { config }
    }

    /// Mean of company-name and role-title similarity, in [0, 1].
    pub fn pair_score(&self, a: &ApplicationObservation, b: &ApplicationObservation) -> f64 {
        let company = jaro_winkler(&a.company_name, &b.company_name);
        let role = jaro_winkler(&a.role_title, &b.role_title);
        (company + role) / 2.0
    }

    /// Do these observations denote the same underlying application?
    pub fn same_entity(&self, a: &ApplicationObservation, b: &ApplicationObservation) -> bool {
        self.pair_score(a, b) >= self.config.match_threshold
    }

    /// Reconcile a pair: match first, then resolve the conflict.
    pub fn reconcile(
        &self,
        a: ApplicationObservation,
        b: ApplicationObservation,
    ) -> ReconcileOutcome {
        let score = self.pair_score(&a, &b);
        if score < self.config.match_threshold {
            debug!(score, threshold = self.config.match_threshold, "Observations are distinct");
            return ReconcileOutcome::Distinct(a, b);
        }

        let resolution = resolve(&a, &b, self.config.recency_window);
        debug!(
            score,
            reason = resolution.reason.label(),
            "Observations merged"
        );

        let (winner, loser) = match resolution.keep {
            Kept::First => (a, b),
            Kept::Second => (b, a),
        };
        ReconcileOutcome::Merged(ReconciledRecord {
            winner,
            corroborating: vec![loser],
            reason: resolution.reason,
        })
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(ReconcilerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn obs(
        source: SourceType,
        company: &str,
        role: &str,
        ts: &str,
    ) -> ApplicationObservation {
        ApplicationObservation {
            source,
            company_name: company.into(),
            role_title: role.into(),
            observed_at: DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc),
        }
    }

    #[test]
    fn exact_pair_is_same_entity() {
        let r = Reconciler::default();
        let a = obs(SourceType::Email, "Google", "Software Engineer", "2026-02-07T10:00:00Z");
        let b = obs(SourceType::JobBoard, "Google", "Software Engineer", "2026-02-07T10:01:00Z");
        assert!(r.same_entity(&a, &b));
    }

    #[test]
    fn fuzzy_company_variant_matches() {
        let r = Reconciler::default();
        let a = obs(SourceType::Email, "Google Inc.", "Software Engineer", "2026-02-07T10:00:00Z");
        let b = obs(SourceType::JobBoard, "Google", "Software Engineer", "2026-02-07T10:01:00Z");
        assert!(r.same_entity(&a, &b));
    }

    #[test]
    fn different_company_and_role_is_distinct() {
        let r = Reconciler::default();
        let a = obs(SourceType::Email, "Google", "Software Engineer", "2026-02-07T10:00:00Z");
        let b = obs(SourceType::JobBoard, "Meta", "Product Manager", "2026-02-07T10:01:00Z");
        assert!(!r.same_entity(&a, &b));
        assert!(matches!(
            r.reconcile(a, b),
            ReconcileOutcome::Distinct(_, _)
        ));
    }

    #[test]
    fn merge_keeps_loser_as_evidence() {
        let r = Reconciler::default();
        let a = obs(SourceType::Email, "Google", "Software Engineer", "2026-02-07T10:00:00Z");
        let b = obs(SourceType::JobBoard, "Google", "Software Engineer", "2026-02-07T10:03:00Z");

        match r.reconcile(a, b) {
            ReconcileOutcome::Merged(record) => {
                assert_eq!(record.winner.source, SourceType::JobBoard);
                assert_eq!(record.reason, ResolveReason::HigherPriority);
                assert_eq!(record.corroborating.len(), 1);
                assert_eq!(record.corroborating[0].source, SourceType::Email);
            }
            other => panic!("expected merge, got {other:?}"),
        }
    }

    #[test]
    fn pair_score_is_symmetric() {
        let r = Reconciler::default();
        let a = obs(SourceType::Email, "Acme Corp", "SWE", "2026-02-07T10:00:00Z");
        let b = obs(SourceType::Manual, "Acme Corporation", "Software Engineer", "2026-02-07T10:00:00Z");
        assert!((r.pair_score(&a, &b) - r.pair_score(&b, &a)).abs() < 1e-12);
    }
}
