//! Prompt-injection pattern scan.
//!
//! A fixed table of compiled case-insensitive patterns covering the
//! adversarial intents we reject outright: instruction override,
//! system-prompt exfiltration, secret exfiltration, and guardrail bypass.
//! The matched pattern identifier is surfaced for audit logging.

use regex::Regex;

/// A single adversarial-intent pattern.
#[derive(Debug, Clone)]
pub struct InjectionPattern {
    /// Stable identifier surfaced in audit logs.
    pub id: &'static str,
    /// Compiled case-insensitive regex.
    pub regex: Regex,
}

/// Scans task text against the fixed adversarial pattern table.
pub struct InjectionScanner {
    patterns: Vec<InjectionPattern>,
}

impl InjectionScanner {
    /// Build the scanner with the default pattern table.
    pub fn new() -> Self {
        let patterns = vec![
            InjectionPattern {
                id: "instruction_override",
                regex: Regex::new(
                    r"(?i)\b(ignore|disregard|forget|override)\b[^.\n]{0,40}\b(previous|prior|above|earlier|original|all|your)\b[^.\n]{0,40}\b(instruction|instructions|prompt|prompts|rule|rules|directive|directives)\b",
                )
                .unwrap(),
            },
            InjectionPattern {
                id: "system_prompt_exfiltration",
                regex: Regex::new(
                    r"(?i)\b(reveal|show|print|repeat|output|display|leak)\b[^.\n]{0,40}\b(system\s+prompt|initial\s+(instructions|prompt)|hidden\s+(instructions|prompt))",
                )
                .unwrap(),
            },
            InjectionPattern {
                id: "secret_exfiltration",
                regex: Regex::new(
                    r"(?i)\b(reveal|show|print|give|leak|expose|send)\b[^.\n]{0,40}\b(api\s*key|access\s+token|secret\s+key|password|credential|private\s+key)",
                )
                .unwrap(),
            },
            InjectionPattern {
                id: "guardrail_bypass",
                regex: Regex::new(
                    r"(?i)\b(bypass|disable|circumvent|remove|turn\s+off)\b[^.\n]{0,40}\b(guardrail|safety|filter|restriction|moderation|safeguard)",
                )
                .unwrap(),
            },
            InjectionPattern {
                id: "jailbreak",
                regex: Regex::new(r"(?i)\bjailbreak\b|\bDAN\s+mode\b|\bdeveloper\s+mode\b")
                    .unwrap(),
            },
        ];
        Self { patterns }
    }

    /// Return the first matched pattern id, or `None` for benign text.
    pub fn detect(&self, text: &str) -> Option<&'static str> {
        self.patterns
            .iter()
            .find(|p| p.regex.is_match(text))
            .map(|p| p.id)
    }
}

impl Default for InjectionScanner {
    fn default() -> Self {
        Self::new()
    }
}
