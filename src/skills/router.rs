//! Skill routing — scoring skills against free-text tasks.
//!
//! Routing is a deterministic, pure function of the loaded skill set and the
//! task text. The set itself is read-mostly: reloads replace it wholesale
//! and atomically, so concurrent routes see either the old complete set or
//! the new one, never a partial mix.

use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use crate::config::RouterConfig;
use crate::error::Error;
use crate::skills::descriptor::SkillDescriptor;
use crate::skills::loader::{SkillLoadResult, SkillStore};

/// Score bonus for the skill name appearing verbatim in the task text.
const NAME_BONUS: i32 = 5;
/// Score bonus for the skill description appearing verbatim.
const DESCRIPTION_BONUS: i32 = 3;
/// Minimum keyword length considered for scoring.
const KEYWORD_MIN_LEN: usize = 4;

/// Stop-words excluded from keyword extraction (length ≥ 4 only).
const STOP_WORDS: &[&str] = &[
    "about", "after", "also", "been", "before", "being", "between", "both", "does", "each",
    "from", "have", "having", "into", "more", "most", "other", "over", "should", "some", "such",
    "than", "that", "their", "them", "then", "there", "these", "they", "this", "through",
    "under", "until", "very", "want", "well", "were", "what", "when", "where", "which", "while",
    "will", "with", "would", "your",
];

/// Topic markers that force the safety skill into the decision.
const SENSITIVE_MARKERS: &[&str] = &[
    "auth", "privacy", "credential", "password", "secret", "token", "oauth", "storage",
    "persist", "permission", "rls",
];

/// Routing decision for one task. Derived, never persisted.
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    /// Highest-scoring skill, if any scored above zero.
    pub primary: Option<SkillDescriptor>,
    /// Other positively-scored skills in descending order, duplicate-free,
    /// never containing the primary.
    pub secondary: Vec<SkillDescriptor>,
    /// Human-readable scoring summary for logs.
    pub rationale: String,
}

/// Skill router: holds the loaded set, scores tasks against it.
pub struct SkillRouter {
    config: RouterConfig,
    store: Arc<dyn SkillStore>,
    skills: RwLock<Arc<Vec<SkillDescriptor>>>,
    ever_loaded: std::sync::atomic::AtomicBool,
}

impl SkillRouter {
    pub fn new(config: RouterConfig, store: Arc<dyn SkillStore>) -> Self {
        Self {
            config,
            store,
            skills: RwLock::new(Arc::new(Vec::new())),
            ever_loaded: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// (Re)populate the skill set from the store.
    ///
    /// The in-memory set is replaced wholesale on success. An unreachable
    /// store keeps the previous set usable and is fatal only when no set was
    /// ever loaded.
    pub async fn reload(&self) -> Result<SkillLoadResult, Error> {
        use std::sync::atomic::Ordering;

        match self.store.load().await {
            Ok(result) => {
                let fresh = Arc::new(result.skills.clone());
                *self.skills.write().expect("skill set lock poisoned") = fresh;
                self.ever_loaded.store(true, Ordering::Release);
                info!(
                    skills = result.skills.len(),
                    warnings = result.warnings.len(),
                    errors = result.errors.len(),
                    "Skill set reloaded"
                );
                Ok(result)
            }
            Err(e) if self.ever_loaded.load(Ordering::Acquire) => {
                warn!(error = %e, "Skill store unreachable, keeping previous set");
                Ok(SkillLoadResult {
                    skills: self.snapshot().to_vec(),
                    warnings: vec![format!("Skill store unreachable: {e}")],
                    errors: vec![],
                })
            }
            Err(e) => Err(Error::Config(e)),
        }
    }

    /// Current skill set snapshot (old or new complete set, never partial).
    pub fn snapshot(&self) -> Arc<Vec<SkillDescriptor>> {
        Arc::clone(&self.skills.read().expect("skill set lock poisoned"))
    }

    /// Look up a skill by name. Names are unique within a loaded set.
    pub fn get(&self, name: &str) -> Result<SkillDescriptor, Error> {
        self.snapshot()
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| {
                Error::Skill(crate::error::SkillError::NotFound {
                    name: name.to_string(),
                })
            })
    }

    /// Score every skill against the task text and build the decision.
    pub fn route(&self, task_text: &str) -> RoutingDecision {
        let skills = self.snapshot();
        let text = task_text.to_lowercase();

        let mut scored: Vec<(usize, i32)> = skills
            .iter()
            .enumerate()
            .map(|(i, skill)| (i, self.score(skill, &text)))
            .collect();
        // Stable sort keeps insertion order on ties.
        scored.sort_by_key(|&(_, score)| std::cmp::Reverse(score));

        let mut rationale_parts: Vec<String> = scored
            .iter()
            .filter(|&&(_, score)| score > 0)
            .map(|&(i, score)| format!("{}={score}", skills[i].name))
            .collect();

        let mut positive = scored.iter().filter(|&&(_, score)| score > 0);
        let primary = positive.next().map(|&(i, _)| skills[i].clone());
        let mut secondary: Vec<SkillDescriptor> =
            positive.map(|&(i, _)| skills[i].clone()).collect();

        // Sensitive topics always consult the safety skill, regardless of
        // keyword overlap.
        let safety_name = &self.config.safety_skill_name;
        let primary_is_safety = primary.as_ref().is_some_and(|p| &p.name == safety_name);
        if !primary_is_safety && SENSITIVE_MARKERS.iter().any(|m| text.contains(m)) {
            if let Some(safety) = skills.iter().find(|s| &s.name == safety_name) {
                if !secondary.iter().any(|s| &s.name == safety_name) {
                    secondary.insert(0, safety.clone());
                    rationale_parts.push(format!("{safety_name}=forced(sensitive-topic)"));
                }
            }
        }

        let rationale = if rationale_parts.is_empty() {
            "no skill matched".to_string()
        } else {
            rationale_parts.join(", ")
        };

        RoutingDecision {
            primary,
            secondary,
            rationale,
        }
    }

    /// Integer score of one skill against lower-cased task text.
    fn score(&self, skill: &SkillDescriptor, text: &str) -> i32 {
        let mut score = 0;
        if text.contains(&skill.name.to_lowercase()) {
            score += NAME_BONUS;
        }
        if text.contains(&skill.description.to_lowercase()) {
            score += DESCRIPTION_BONUS;
        }
        for keyword in self.keywords(skill) {
            if text.contains(&keyword) {
                score += 1;
            }
        }
        score
    }

    /// Distinct keywords from name + description + instructions, in order,
    /// capped at the configured limit.
    fn keywords(&self, skill: &SkillDescriptor) -> Vec<String> {
        let combined = format!(
            "{} {} {}",
            skill.name, skill.description, skill.instructions
        )
        .to_lowercase();

        let mut seen = std::collections::HashSet::new();
        let mut keywords = Vec::new();
        for word in combined.split(|c: char| !c.is_ascii_alphanumeric()) {
            if word.len() < KEYWORD_MIN_LEN || STOP_WORDS.contains(&word) {
                continue;
            }
            if seen.insert(word.to_string()) {
                keywords.push(word.to_string());
                if keywords.len() >= self.config.keyword_limit {
                    break;
                }
            }
        }
        keywords
    }
}
