//! Skill descriptor model and the SKILL.md descriptor format.
//!
//! A descriptor file is a `---` frontmatter block of `key: value` pairs
//! followed by a free-text instruction body. Required keys: `name`,
//! `description`. The body may declare reference files under a
//! `## References` list; each item names a file relative to the
//! descriptor's own directory.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;

/// A named, describable behavior module. Plain data — immutable once loaded;
/// the collection of all descriptors is replaced wholesale on reload.
#[derive(Debug, Clone, Serialize)]
pub struct SkillDescriptor {
    /// Unique within a loaded set.
    pub name: String,
    pub description: String,
    /// Full instruction body appended to the execution context when primary.
    pub instructions: String,
    /// Where the descriptor was loaded from.
    pub source_path: PathBuf,
    /// Reference files declared in the instruction body, in order.
    pub reference_names: Vec<String>,
}

impl SkillDescriptor {
    /// Function-call schema exposed to the generation collaborator.
    pub fn tool_definition(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": {
                    "type": "object",
                    "properties": {
                        "task_input": { "type": "string" }
                    },
                    "required": ["task_input"]
                }
            }
        })
    }
}

/// Parse a descriptor file into frontmatter metadata and instruction body.
///
/// Returns `None` when the file has no frontmatter block.
pub fn parse_frontmatter(content: &str) -> Option<(HashMap<String, String>, String)> {
    let trimmed = content.trim_start();
    if !trimmed.starts_with("---") {
        return None;
    }

    let parts: Vec<&str> = trimmed.split("---").collect();
    if parts.len() < 3 {
        return None;
    }

    let frontmatter = parts[1];
    let body = parts[2..].join("---");

    let mut meta = HashMap::new();
    for line in frontmatter.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            continue;
        }
        let value = strip_quotes(value.trim());
        meta.insert(key.to_string(), value.to_string());
    }

    Some((meta, body))
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Extract reference file names declared under a `## References` heading.
///
/// Collects `- item` / `* item` list lines following the heading, stopping
/// at the next heading or the first non-list content line.
pub fn extract_reference_names(instructions: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut in_section = false;

    for line in instructions.lines() {
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("## references") {
            in_section = true;
            continue;
        }
        if !in_section {
            continue;
        }
        if trimmed.is_empty() {
            continue;
        }
        if let Some(item) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            let item = item.trim();
            if !item.is_empty() {
                names.push(item.to_string());
            }
        } else {
            // Next heading or prose — the list is over.
            break;
        }
    }

    names
}
