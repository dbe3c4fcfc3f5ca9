//! Error types for apptrack.

/// Top-level error type for the intake core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Security rejection: {0}")]
    Security(#[from] SecurityError),

    #[error("Skill error: {0}")]
    Skill(#[from] SkillError),

    #[error("Audit sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Skill store not found: {path}")]
    SkillStoreMissing { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Security rejections raised by the guardrail pipeline.
///
/// Each variant maps to an externally visible HTTP status at the intake
/// boundary: WAF block → 403, prompt injection → 401, rate limit → 429.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SecurityError {
    #[error("Request blocked by WAF checks: {reason}")]
    WafBlocked { reason: String },

    #[error("Prompt injection detected: {pattern}")]
    PromptInjection { pattern: String },

    #[error("Rate limit exceeded, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("No identity supplied with the request")]
    Unauthorized,
}

impl SecurityError {
    /// HTTP status code for the intake boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::WafBlocked { .. } => 403,
            Self::PromptInjection { .. } => 401,
            Self::RateLimited { .. } => 429,
            Self::Unauthorized => 401,
        }
    }
}

/// Skill loading and routing errors.
#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    #[error("Skill {name} not found in the loaded set")]
    NotFound { name: String },

    #[error("Failed to read skill entry {path}: {reason}")]
    ReadFailed { path: String, reason: String },
}

/// Audit/blacklist sink write failures.
///
/// Never swallowed — losing a security audit record is worse than failing
/// the request that produced it.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Failed to write {table}: {reason}")]
    WriteFailed { table: String, reason: String },

    #[error("Sink connection error: {0}")]
    Connection(String),

    #[error("Sink URL must use HTTPS: {url}")]
    InsecureUrl { url: String },
}

/// Generation provider errors.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Result type alias for the intake core.
pub type Result<T> = std::result::Result<T, Error>;
