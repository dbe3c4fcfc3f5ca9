//! Execution-context assembly for the generation call.
//!
//! Layers, in order: base instruction block, the primary skill's full
//! instructions, a name+description list of secondary skills, the cached
//! knowledge-plan and integration-guide documents, then the primary skill's
//! declared reference files. Missing references are skipped, not errors —
//! the context degrades gracefully when documentation drifts.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::SinkError;
use crate::sink::DocumentStore;
use crate::skills::router::RoutingDecision;

/// Logical name of the cached knowledge-plan document.
pub const KNOWLEDGE_PLAN_DOC: &str = "knowledge-plan";
/// Logical name of the cached integration-guide document.
pub const INTEGRATION_GUIDE_DOC: &str = "integration-guide";

/// Base instruction block every context starts from.
const BASE_INSTRUCTIONS: &str = "You are the task engine of a job-application tracker. \
You act only on the user's own application records: statuses, companies, roles, \
recruiter threads, and follow-ups. Be precise, cite record fields when you change \
them, and never invent applications that are not in the records.";

/// Assembles execution contexts; owns the process-scoped document caches.
///
/// Single writer (invalidate/reload), multiple concurrent readers.
pub struct ContextBuilder {
    docs: Arc<dyn DocumentStore>,
    knowledge_plan: RwLock<Option<String>>,
    integration_guide: RwLock<Option<String>>,
}

impl ContextBuilder {
    pub fn new(docs: Arc<dyn DocumentStore>) -> Self {
        Self {
            docs,
            knowledge_plan: RwLock::new(None),
            integration_guide: RwLock::new(None),
        }
    }

    /// Clear the knowledge-plan cache. Takes effect on the next `build`;
    /// the integration-guide cache is deliberately left alone.
    pub async fn invalidate(&self) {
        self.knowledge_plan.write().await.take();
        debug!("Knowledge-plan cache invalidated");
    }

    /// Fetch a document through its cache slot, loading lazily on miss.
    async fn cached_doc(
        &self,
        slot: &RwLock<Option<String>>,
        name: &str,
    ) -> Result<Option<String>, SinkError> {
        if let Some(cached) = slot.read().await.clone() {
            return Ok(Some(cached));
        }
        let fetched = self.docs.fetch(name).await?;
        if let Some(body) = &fetched {
            *slot.write().await = Some(body.clone());
            debug!(name, "Document cached");
        }
        Ok(fetched)
    }

    /// Assemble the full instruction payload for a routing decision.
    pub async fn build(&self, decision: &RoutingDecision) -> Result<String, SinkError> {
        let mut context = String::from(BASE_INSTRUCTIONS);

        let Some(primary) = &decision.primary else {
            return Ok(context);
        };

        context.push_str("\n\n## Active skill: ");
        context.push_str(&primary.name);
        context.push('\n');
        context.push_str(&primary.instructions);

        if !decision.secondary.is_empty() {
            context.push_str("\n\n## Also consulted\n");
            for skill in &decision.secondary {
                context.push_str(&format!("- {}: {}\n", skill.name, skill.description));
            }
        }

        if let Some(plan) = self.cached_doc(&self.knowledge_plan, KNOWLEDGE_PLAN_DOC).await? {
            context.push_str("\n\n## Knowledge plan\n");
            context.push_str(&plan);
        }
        if let Some(guide) = self
            .cached_doc(&self.integration_guide, INTEGRATION_GUIDE_DOC)
            .await?
        {
            context.push_str("\n\n## Integration guide\n");
            context.push_str(&guide);
        }

        let base_dir = primary.source_path.parent();
        for name in &primary.reference_names {
            // Reference files resolve under the skill's own directory only.
            if name.starts_with('/') || name.contains("..") {
                debug!(name, "Skipping reference outside the skill directory");
                continue;
            }
            let Some(base) = base_dir else { continue };
            match tokio::fs::read_to_string(base.join(name)).await {
                Ok(body) => {
                    context.push_str(&format!("\n\n## Reference: {name}\n"));
                    context.push_str(&body);
                }
                Err(e) => {
                    debug!(name, error = %e, "Reference file missing, skipped");
                }
            }
        }

        Ok(context)
    }
}
