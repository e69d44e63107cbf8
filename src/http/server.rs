//! HTTP server setup and run loop.
//!
//! # Responsibilities
//! - Build the axum router and its middleware stack
//! - Serve plain TCP or rustls TLS with graceful shutdown
//! - Swap in a rebuilt pipeline when the config file changes
//! - Sweep expired counters from the in-memory store

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::routing::{get, post};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::clock::{SystemTimeSource, TimeSource};
use crate::config::{GatewayConfig, GeneratorConfig};
use crate::generator::{DiagnosisGenerator, GenerationError, HttpDiagnosisGenerator, UnconfiguredGenerator};
use crate::http::extract::X_REQUEST_ID;
use crate::http::handlers;
use crate::lifecycle::Shutdown;
use crate::pipeline::Pipeline;
use crate::rate_limit::{CounterStore, MemoryCounterStore};

const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<ArcSwap<Pipeline>>,
    environment: Arc<str>,
    started: Instant,
}

impl AppState {
    pub fn new(pipeline: Pipeline, environment: &str) -> Self {
        Self {
            pipeline: Arc::new(ArcSwap::from_pointee(pipeline)),
            environment: environment.into(),
            started: Instant::now(),
        }
    }

    /// Current pipeline snapshot.
    pub fn pipeline(&self) -> Arc<Pipeline> {
        self.pipeline.load_full()
    }

    pub fn swap(&self, pipeline: Pipeline) {
        self.pipeline.store(Arc::new(pipeline));
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Build the generator adapter for a config. No endpoint yields a generator
/// that always reports itself unavailable.
pub fn build_generator(config: &GeneratorConfig) -> Result<Arc<dyn DiagnosisGenerator>, GenerationError> {
    match config.endpoint.as_deref() {
        Some(endpoint) => Ok(Arc::new(HttpDiagnosisGenerator::new(
            endpoint,
            Duration::from_secs(config.timeout_secs),
        )?)),
        None => {
            tracing::warn!("No generator endpoint configured; diagnosis requests will return 503");
            Ok(Arc::new(UnconfiguredGenerator))
        }
    }
}

/// The diagnosis gateway HTTP server.
pub struct GatewayServer {
    config: GatewayConfig,
    state: AppState,
    store: Arc<MemoryCounterStore>,
    generator: Arc<dyn DiagnosisGenerator>,
    clock: Arc<dyn TimeSource>,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig, generator: Arc<dyn DiagnosisGenerator>) -> Self {
        Self::with_clock(config, generator, Arc::new(SystemTimeSource))
    }

    pub fn with_clock(config: GatewayConfig, generator: Arc<dyn DiagnosisGenerator>, clock: Arc<dyn TimeSource>) -> Self {
        let store = Arc::new(MemoryCounterStore::new(clock.clone()));
        let pipeline = Pipeline::new(&config, store.clone(), generator.clone(), clock.clone());
        let state = AppState::new(pipeline, &config.environment);
        Self {
            config,
            state,
            store,
            generator,
            clock,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The in-process counter store shared by every pipeline this server builds.
    pub fn counters(&self) -> Arc<MemoryCounterStore> {
        self.store.clone()
    }

    /// Router with the full middleware stack. Listener-level settings
    /// (routes mounted, body limit, timeout) come from the startup config.
    #[allow(deprecated)]
    pub fn router(&self) -> Router {
        let config = &self.config;
        let mut api = Router::new()
            .route("/diagnosis", post(handlers::diagnose))
            .route("/diagnosis/structured", post(handlers::diagnose_structured))
            .route("/diagnosis/validate", post(handlers::validate))
            .route("/diagnosis/quota", get(handlers::quota))
            .route("/health", get(handlers::health))
            .route("/health/live", get(handlers::live))
            .route("/health/ready", get(handlers::ready));
        if config.security.enable_test_endpoint {
            tracing::warn!("Unauthenticated /api/v1/diagnosis/structured/test endpoint is enabled");
            api = api.route("/diagnosis/structured/test", post(handlers::diagnose_structured_test));
        }

        Router::new()
            .route("/", get(handlers::banner))
            .nest("/api/v1", api)
            .with_state(self.state.clone())
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// Serve until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        shutdown: &Shutdown,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, environment = %self.config.environment, "Gateway starting");

        tokio::spawn(apply_reloads(
            self.state.clone(),
            config_updates,
            self.store.clone(),
            self.generator.clone(),
            self.clock.clone(),
            shutdown.subscribe(),
        ));
        // Always spawned; a reload may enable limiting.
        tokio::spawn(sweep_expired(
            self.store.clone(),
            Duration::from_secs(self.config.rate_limit.sweep_interval_secs.max(1)),
            shutdown.subscribe(),
        ));

        let app = self.router().into_make_service_with_connect_info::<SocketAddr>();
        match &self.config.listener.tls {
            None => {
                let mut stop = shutdown.subscribe();
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = stop.recv().await;
                    })
                    .await?;
            }
            Some(tls) => {
                let rustls = load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?;
                let handle = axum_server::Handle::new();
                let drain = handle.clone();
                let mut stop = shutdown.subscribe();
                tokio::spawn(async move {
                    let _ = stop.recv().await;
                    drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
                });
                tracing::info!(address = %addr, "TLS enabled");
                axum_server::from_tcp_rustls(listener.into_std()?, rustls)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
        }

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, std::io::Error> {
    for (what, path) in [("certificate", cert_path), ("private key", key_path)] {
        if !path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("TLS {what} not found: {}", path.display()),
            ));
        }
    }
    RustlsConfig::from_pem_file(cert_path, key_path).await
}

/// Rebuild the pipeline for each validated config. The counter store and
/// generator carry over so quotas survive a reload.
async fn apply_reloads(
    state: AppState,
    mut updates: mpsc::UnboundedReceiver<GatewayConfig>,
    store: Arc<MemoryCounterStore>,
    generator: Arc<dyn DiagnosisGenerator>,
    clock: Arc<dyn TimeSource>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let store: Arc<dyn CounterStore> = store;
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(config) => {
                    state.swap(Pipeline::new(&config, store.clone(), generator.clone(), clock.clone()));
                    tracing::info!(
                        quota = config.rate_limit.requests,
                        window_secs = config.rate_limit.window_secs,
                        "Configuration reloaded"
                    );
                }
                None => break,
            },
            _ = shutdown.recv() => break,
        }
    }
}

async fn sweep_expired(store: Arc<MemoryCounterStore>, every: Duration, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let purged = store.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, remaining = store.len(), "Purged expired rate limit counters");
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}
