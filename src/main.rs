use std::sync::Arc;

use apptrack::config::{GuardrailConfig, RateLimitConfig, RouterConfig};
use apptrack::guardrails::{FixedWindowLimiter, GuardrailPipeline, RateLimiter};
use apptrack::http::intake_routes;
use apptrack::llm::{GenerationBackend, GenerationConfig, create_provider};
use apptrack::orchestrator::TaskOrchestrator;
use apptrack::sink::{AuditSink, FsDocumentStore, LibSqlSink};
use apptrack::skills::{ContextBuilder, FsSkillStore, SkillRouter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Read API key from environment
    let api_key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_else(|_| {
        eprintln!("Error: ANTHROPIC_API_KEY not set");
        eprintln!("  export ANTHROPIC_API_KEY=sk-ant-...");
        std::process::exit(1);
    });

    let model = std::env::var("APPTRACK_MODEL")
        .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string());

    let port: u16 = std::env::var("APPTRACK_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let skills_dir =
        std::env::var("APPTRACK_SKILLS_DIR").unwrap_or_else(|_| "./skills".to_string());
    let docs_dir = std::env::var("APPTRACK_DOCS_DIR").unwrap_or_else(|_| "./docs".to_string());

    eprintln!("📋 AppTrack v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", model);
    eprintln!("   Skills: {}", skills_dir);
    eprintln!("   Intake API: http://0.0.0.0:{}/api/intake", port);

    // ── Skill routing ────────────────────────────────────────────────────
    let store = Arc::new(FsSkillStore::new(&skills_dir));
    let router = Arc::new(SkillRouter::new(RouterConfig::default(), store));
    let report = router.reload().await.unwrap_or_else(|e| {
        eprintln!("Error: Failed to load skills from {}: {}", skills_dir, e);
        std::process::exit(1);
    });
    for warning in &report.warnings {
        eprintln!("   ⚠ {}", warning);
    }
    if !report.errors.is_empty() {
        for error in &report.errors {
            eprintln!("Error: {}", error);
        }
        std::process::exit(1);
    }
    eprintln!("   Loaded {} skill(s)", report.skills.len());
    for skill in &report.skills {
        eprintln!("     - {}: {}", skill.name, skill.description);
    }

    // ── Audit sink ───────────────────────────────────────────────────────
    // Remote libSQL when APPTRACK_DB_URL is set, local file otherwise.
    let sink: Arc<dyn AuditSink> = if let Ok(db_url) = std::env::var("APPTRACK_DB_URL") {
        let token = std::env::var("APPTRACK_DB_TOKEN").unwrap_or_default();
        let sink = LibSqlSink::new_remote(&db_url, &token)
            .await
            .unwrap_or_else(|e| {
                eprintln!("Error: Failed to connect to audit database {}: {}", db_url, e);
                std::process::exit(1);
            });
        eprintln!("   Audit DB: {}", db_url);
        Arc::new(sink)
    } else {
        let db_path =
            std::env::var("APPTRACK_DB_PATH").unwrap_or_else(|_| "./data/apptrack.db".to_string());
        let sink = LibSqlSink::new_local(std::path::Path::new(&db_path))
            .await
            .unwrap_or_else(|e| {
                eprintln!("Error: Failed to open audit database at {}: {}", db_path, e);
                std::process::exit(1);
            });
        eprintln!("   Audit DB: {}", db_path);
        Arc::new(sink)
    };

    // ── Generation provider ──────────────────────────────────────────────
    let generation_config = GenerationConfig {
        backend: GenerationBackend::Anthropic,
        api_key: secrecy::SecretString::from(api_key),
        model,
    };
    let provider = create_provider(&generation_config)?;

    // ── Orchestrator + intake server ─────────────────────────────────────
    let limiter: Arc<dyn RateLimiter> =
        Arc::new(FixedWindowLimiter::new(RateLimitConfig::default()));
    let guardrails =
        GuardrailPipeline::new(GuardrailConfig::default()).with_sink(Arc::clone(&sink));
    let context = Arc::new(ContextBuilder::new(Arc::new(FsDocumentStore::new(
        &docs_dir,
    ))));

    let orchestrator = Arc::new(TaskOrchestrator::new(
        guardrails, router, context, provider, limiter, sink,
    ));

    let app = intake_routes(orchestrator);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!(port = port, "Intake server started");
    axum::serve(listener, app).await?;

    Ok(())
}
