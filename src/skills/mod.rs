//! Skill system — descriptors, loading, routing, and context assembly.

pub mod context;
pub mod descriptor;
pub mod loader;
pub mod router;

pub use context::{ContextBuilder, INTEGRATION_GUIDE_DOC, KNOWLEDGE_PLAN_DOC};
pub use descriptor::SkillDescriptor;
pub use loader::{FsSkillStore, SkillLoadResult, SkillStore};
pub use router::{RoutingDecision, SkillRouter};
