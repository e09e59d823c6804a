//! Application bootstrap: wires the record store, search index, deferred task
//! queue and lifecycle coordinator behind the HTTP router, then serves until
//! a shutdown signal arrives.

use crate::config::{Config, LifecycleSettings};
use crate::error::ServerError;
use crate::search_index::HttpSearchIndex;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use exhibits_core::environment::AdminList;
use exhibits_core::record_store::RecordStore;
use exhibits_core::schedule::TaskScheduler;
use exhibits_core::search_index::SearchIndex;
use exhibits_lifecycle::{LifecycleConfig, LifecycleCoordinator, LifecycleEnvironment};
use exhibits_postgres::{PoolConfig, PostgresRecordStore};
use exhibits_runtime::metrics::MetricsServer;
use exhibits_runtime::{DelayedTaskQueue, HealthCheck, RetryPolicy, SchedulerConfig};
use exhibits_web::{AppState, HealthProbe, ProbeFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

/// Readiness probe that pings the record store.
#[derive(Clone)]
pub struct DatabaseProbe {
    store: PostgresRecordStore,
}

impl DatabaseProbe {
    /// Probe the given store.
    #[must_use]
    pub const fn new(store: PostgresRecordStore) -> Self {
        Self { store }
    }
}

impl HealthProbe for DatabaseProbe {
    fn check(&self) -> ProbeFuture<'_> {
        Box::pin(async move {
            match self.store.ping().await {
                Ok(()) => HealthCheck::healthy("database"),
                Err(e) => HealthCheck::unhealthy("database", e.to_string()),
            }
        })
    }
}

/// Retry policy for republication tasks.
#[must_use]
pub fn republish_retry_policy(settings: &LifecycleSettings) -> RetryPolicy {
    RetryPolicy::builder()
        .max_retries(settings.republish_max_retries)
        .initial_delay(Duration::from_millis(500))
        .max_delay(Duration::from_secs(30))
        .multiplier(2.0)
        .jitter(true)
        .build()
}

/// Build the coordinator over the given collaborators.
#[must_use]
pub fn build_coordinator(
    store: Arc<dyn RecordStore>,
    index: Arc<dyn SearchIndex>,
    scheduler: Arc<dyn TaskScheduler>,
    settings: &LifecycleSettings,
) -> LifecycleCoordinator {
    let env = LifecycleEnvironment::new(store, index, scheduler)
        .with_authorizer(Arc::new(AdminList::parse(&settings.admin_user_ids)));
    let config = LifecycleConfig::default().with_republish_delay(Duration::from_millis(settings.republish_delay_ms));
    LifecycleCoordinator::new(env, config)
}

/// A fully wired service, ready to [`run`](Application::run).
pub struct Application {
    config: Config,
    scheduler: DelayedTaskQueue,
    metrics: Arc<MetricsServer>,
    router: Router,
}

impl Application {
    /// Connect to every dependency and assemble the router.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] if the database is unreachable, migrations
    /// fail, the search index client cannot be built or metrics cannot be
    /// installed.
    pub async fn build(config: Config) -> Result<Self, ServerError> {
        info!(url = %config.database.redacted_url(), "Connecting to record store");
        let pool = PoolConfig {
            max_connections: config.database.max_connections,
            min_connections: config.database.min_connections,
            acquire_timeout: Duration::from_secs(config.database.connect_timeout),
        };
        let store = PostgresRecordStore::connect(&config.database.url, &pool).await?;
        if config.database.run_migrations {
            store.migrate().await?;
            info!("Migrations applied");
        }

        let index = HttpSearchIndex::new(&config.search_index)?;
        info!(url = %config.search_index.url, "Search index client ready");

        let scheduler = DelayedTaskQueue::new(
            SchedulerConfig::default()
                .with_retry_policy(republish_retry_policy(&config.lifecycle))
                .with_dlq_max_size(config.lifecycle.dlq_max_size),
        );

        let metrics_addr: SocketAddr = config
            .metrics_addr()
            .parse()
            .map_err(|_| ServerError::InvalidAddress(config.metrics_addr()))?;
        let mut metrics = MetricsServer::new(metrics_addr);
        metrics.start()?;

        let coordinator = build_coordinator(
            Arc::new(store.clone()),
            Arc::new(index),
            Arc::new(scheduler.clone()),
            &config.lifecycle,
        );
        let state = AppState::new(coordinator)
            .with_probe(Arc::new(DatabaseProbe::new(store)))
            .with_probe(Arc::new(scheduler.clone()));

        Ok(Self {
            router: exhibits_web::router(state),
            config,
            scheduler,
            metrics: Arc::new(metrics),
        })
    }

    /// Serve HTTP and metrics until SIGINT or SIGTERM, then drain deferred
    /// tasks within the shutdown timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] if a listener cannot be bound or the server fails.
    pub async fn run(self) -> Result<(), ServerError> {
        let metrics_listener = TcpListener::bind(self.metrics.addr()).await?;
        info!(addr = %self.metrics.addr(), "Metrics listening");
        let metrics_app = Router::new()
            .route("/metrics", get(render_metrics))
            .with_state(Arc::clone(&self.metrics));
        tokio::spawn(async move {
            if let Err(e) = axum::serve(metrics_listener, metrics_app).await {
                warn!(error = %e, "Metrics server stopped");
            }
        });

        let listener = TcpListener::bind(self.config.http_addr()).await?;
        info!(addr = %self.config.http_addr(), "Exhibits lifecycle service listening");
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Draining deferred tasks");
        if let Err(e) = self.scheduler.shutdown(self.config.shutdown_timeout()).await {
            warn!(error = %e, "Deferred tasks abandoned at shutdown");
        }
        info!("Server stopped");
        Ok(())
    }
}

async fn render_metrics(State(metrics): State<Arc<MetricsServer>>) -> (StatusCode, String) {
    match metrics.render() {
        Some(body) => (StatusCode::OK, body),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed".to_string()),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
