use std::sync::Arc;

use ops_desk::agents::HeuristicRiskScorer;
use ops_desk::config::DeskConfig;
use ops_desk::connectors::{
    RuleClassifier, StaticKnowledgeBase, StaticThreadConnector, WorkingHoursCalendar,
};
use ops_desk::http::workflow_routes;
use ops_desk::pipeline::{Orchestrator, PipelineDeps};
use ops_desk::store::{LibSqlStore, MemoryStore, WorkflowStore};

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

    let config = DeskConfig::from_env();

    eprintln!("🗂  Ops Desk v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://{}/workflows", config.bind_addr);
    eprintln!(
        "   Connector timeout: {}s",
        config.connector_timeout.as_secs()
    );

    // ── Store ───────────────────────────────────────────────────────
    let store: Arc<dyn WorkflowStore> = match &config.db_path {
        Some(path) => {
            eprintln!("   Database: {path}");
            Arc::new(LibSqlStore::new_local(std::path::Path::new(path)).await?)
        }
        None => {
            eprintln!("   Database: in-memory (records are lost on shutdown)");
            Arc::new(MemoryStore::new())
        }
    };

    // ── Pipeline ────────────────────────────────────────────────────
    // Default in-process connectors; real transports slot in behind the
    // same traits.
    let orchestrator = Arc::new(Orchestrator::new(
        PipelineDeps {
            threads: Arc::new(StaticThreadConnector::new()),
            calendar: Arc::new(WorkingHoursCalendar::new()),
            classifier: Arc::new(RuleClassifier::default_rules()),
            knowledge_base: Arc::new(StaticKnowledgeBase::with_default_entries()),
            risk_scorer: Arc::new(HeuristicRiskScorer::new()),
            store: Arc::clone(&store),
        },
        config.connector_timeout,
    ));

    // ── HTTP server ─────────────────────────────────────────────────
    let app = workflow_routes(orchestrator, store, config.default_list_limit);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "Ops desk HTTP server started");
    axum::serve(listener, app).await?;

    Ok(())
}
