use circuit_sim::{
    api, config::Config, db::init_db, LedgerStore, RecordingReporter, Repository, Reporter,
    Scenario, Session,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    // Initialize database and store
    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn LedgerStore> = Arc::new(Repository::new(pool));
    let reporter = Arc::new(RecordingReporter::new());

    let session = match open_session(&config, store, reporter.clone()).await {
        Ok(s) => s.with_comparator(config.comparator_mode),
        Err(e) => {
            eprintln!("Failed to open project {}: {}", config.project_id, e);
            std::process::exit(1);
        }
    };

    // Create router
    let app = api::create_router(api::AppState::new(session, reporter));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Resume the configured project, seeding it from the scenario file when it
/// has no versions yet.
async fn open_session(
    config: &Config,
    store: Arc<dyn LedgerStore>,
    reporter: Arc<RecordingReporter>,
) -> Result<Session, Box<dyn std::error::Error>> {
    let reporter: Arc<dyn Reporter> = reporter;

    if store.current_version(config.project_id).await?.is_some() {
        return Ok(Session::open(store, config.project_id, config.params, reporter).await?);
    }

    let path = config
        .scenario_path
        .as_deref()
        .ok_or("project has no versions and SCENARIO_PATH is not set")?;
    let ledger = Scenario::load(path)?.into_ledger(&config.params)?;
    Ok(Session::initialise(store, config.project_id, &ledger, config.params, reporter).await?)
}
