//! Filesystem skill store.
//!
//! Enumerates a skills directory: each entry is either a subdirectory
//! containing a `SKILL.md` descriptor or a standalone `.md` descriptor file.
//! Per-entry failures accumulate as warnings/errors without aborting the
//! load — partial success is the normal case.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{ConfigError, SkillError};
use crate::skills::descriptor::{SkillDescriptor, extract_reference_names, parse_frontmatter};

/// Canonical descriptor file name inside a skill directory.
const SKILL_FILE: &str = "SKILL.md";

/// Result of a (re)load: descriptors plus accumulated diagnostics.
#[derive(Debug, Default)]
pub struct SkillLoadResult {
    pub skills: Vec<SkillDescriptor>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Enumerable store of skill descriptors.
#[async_trait]
pub trait SkillStore: Send + Sync {
    /// Load every descriptor the store can see.
    ///
    /// An unreachable store is an `Err`; malformed individual entries are
    /// diagnostics on the `Ok` result.
    async fn load(&self) -> Result<SkillLoadResult, ConfigError>;
}

/// Skill store backed by a directory on disk.
pub struct FsSkillStore {
    dir: PathBuf,
}

impl FsSkillStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Resolve the descriptor file for one directory entry, if any.
    async fn descriptor_path(path: &Path) -> Option<PathBuf> {
        let meta = tokio::fs::metadata(path).await.ok()?;
        if meta.is_dir() {
            let candidate = path.join(SKILL_FILE);
            tokio::fs::metadata(&candidate).await.ok().map(|_| candidate)
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
        {
            Some(path.to_path_buf())
        } else {
            None
        }
    }
}

#[async_trait]
impl SkillStore for FsSkillStore {
    async fn load(&self) -> Result<SkillLoadResult, ConfigError> {
        if tokio::fs::metadata(&self.dir).await.is_err() {
            return Err(ConfigError::SkillStoreMissing {
                path: self.dir.display().to_string(),
            });
        }

        let mut result = SkillLoadResult::default();
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(ConfigError::Io)?;

        // Collect and sort for deterministic insertion order.
        let mut paths = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => paths.push(entry.path()),
                Ok(None) => break,
                Err(e) => {
                    result
                        .errors
                        .push(format!("Failed to read directory entry: {e}"));
                    break;
                }
            }
        }
        paths.sort();

        for path in paths {
            let Some(descriptor_path) = Self::descriptor_path(&path).await else {
                continue;
            };

            let content = match tokio::fs::read_to_string(&descriptor_path).await {
                Ok(content) => content,
                Err(e) => {
                    result.errors.push(
                        SkillError::ReadFailed {
                            path: descriptor_path.display().to_string(),
                            reason: e.to_string(),
                        }
                        .to_string(),
                    );
                    continue;
                }
            };

            let Some((meta, body)) = parse_frontmatter(&content) else {
                result.warnings.push(format!(
                    "No frontmatter found in {}",
                    descriptor_path.display()
                ));
                continue;
            };

            let name = meta.get("name").map(|s| s.trim()).unwrap_or_default();
            let description = meta.get("description").map(|s| s.trim()).unwrap_or_default();
            if name.is_empty() || description.is_empty() {
                result.errors.push(format!(
                    "Missing name/description in {}",
                    descriptor_path.display()
                ));
                continue;
            }

            if result.skills.iter().any(|s| s.name == name) {
                result.warnings.push(format!(
                    "Duplicate skill name {name} in {}, entry skipped",
                    descriptor_path.display()
                ));
                continue;
            }

            let instructions = body.trim().to_string();
            let reference_names = extract_reference_names(&instructions);
            debug!(name, path = %descriptor_path.display(), "Loaded skill descriptor");

            result.skills.push(SkillDescriptor {
                name: name.to_string(),
                description: description.to_string(),
                instructions,
                source_path: descriptor_path,
                reference_names,
            });
        }

        if !result.warnings.is_empty() || !result.errors.is_empty() {
            warn!(
                loaded = result.skills.len(),
                warnings = result.warnings.len(),
                errors = result.errors.len(),
                "Skill load finished with diagnostics"
            );
        }
        Ok(result)
    }
}
