use anyhow::{Context, Result};
use axum::Router;
use tracing::info;

use crate::config::settings::SettingsConfig;
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;
use crate::server::routes::GradesState;
use crate::service::grade_service::GradeService;

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
    pub grades_state: GradesState,
}

impl AppState {
    pub fn new(metrics: &Metrics, grades: GradeService) -> Self {
        Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
            grades_state: GradesState::new(grades),
        }
    }
}

/// Grade routes plus the metrics route when enabled.
pub async fn build_router(settings_config: &SettingsConfig, grades: GradeService) -> Router {
    let metrics = get_metrics().await;
    let state = AppState::new(metrics, grades);

    Router::new()
        .merge(state.metrics_state.router(&settings_config.metrics).await)
        .merge(state.grades_state.router())
        .with_state(state)
}

/// Serve until ctrl-c.
pub async fn start(settings_config: &SettingsConfig, grades: GradeService) -> Result<()> {
    let metrics = get_metrics().await;
    let app = build_router(settings_config, grades).await;

    let bind_addr = format!("{}:{}", settings_config.server.host, settings_config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("listening on {}", bind_addr);

    metrics.up.set(1);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;
    metrics.up.set(0);
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
