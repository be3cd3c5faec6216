pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;

#[cfg(test)]
mod test_support;

use crate::core::{config::Settings, state::AppState, telemetry};
use crate::services::certificate_reconcile::{self, ReconcileOptions};
use crate::services::storage::StorageService;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let storage = StorageService::from_settings(&settings).await?;
    let state = AppState::new(settings, db_pool, storage);

    if let Err(err) = core::bootstrap::ensure_superuser(&state).await {
        tracing::error!(error = %err, "Failed to ensure default superuser");
    }

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "Coursiva API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(core::shutdown::shutdown_signal())
        .await?;

    Ok(())
}

/// Arguments for the certificate reconciliation binary.
#[derive(Debug, Default)]
pub struct ReconcileArgs {
    pub course_id: Option<String>,
    pub user_id: Option<String>,
    pub force_update: bool,
    pub recreate: bool,
}

pub async fn run_reconcile(args: ReconcileArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let options = ReconcileOptions {
        course_id: args.course_id,
        user_id: args.user_id,
        force_update: args.force_update,
        recreate: args.recreate,
    };

    let threshold = settings.certificate().pass_threshold;
    let stats = certificate_reconcile::reconcile(&db_pool, threshold, &options).await?;

    println!("Eligible attempts: {}", stats.eligible);
    if stats.deleted > 0 {
        println!("Deleted:          {}", stats.deleted);
    }
    println!("Created:          {}", stats.created);
    println!("Updated:          {}", stats.updated);
    println!("Skipped:          {}", stats.skipped);
    println!("Errors:           {}", stats.failures.len());
    for failure in &stats.failures {
        eprintln!("  attempt {}: {}", failure.attempt_id, failure.message);
    }

    if stats.failures.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} attempt(s) failed to reconcile", stats.failures.len())
    }
}
