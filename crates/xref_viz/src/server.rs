//! Server bootstrap: configuration, dataset loading and the listener.
//!
//! [`XrefServer`] owns an [`XrefConfig`] and the shared [`ApiState`]. It adds
//! CORS and request tracing on top of [`create_router`] as configured.
//!
//! ```rust,ignore
//! use xref_viz::{XrefConfig, XrefServer};
//!
//! let server = XrefServer::new(XrefConfig::development());
//! server.load().await?;
//! server
//!     .start_with_shutdown(async { tokio::signal::ctrl_c().await.ok(); })
//!     .await?;
//! ```

use crate::api::{create_router, ApiState, DEFAULT_PREVIEW_SIZE};
use crate::error::{Error, Result};
use crate::loader::DatasetLoader;

use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Listener, dataset location and loading policy.
///
/// ```
/// use std::time::Duration;
/// use xref_viz::XrefConfig;
///
/// let config = XrefConfig::production();
/// assert_eq!(config.socket_addr().unwrap().port(), 8888);
/// assert_eq!(config.fetch_timeout, Duration::from_secs(30));
/// assert!(!config.enable_cors);
/// ```
#[derive(Debug, Clone)]
pub struct XrefConfig {
    /// Bind address, an IP literal.
    pub host: String,

    pub port: u16,

    /// Whether to send permissive CORS headers.
    pub enable_cors: bool,

    /// Whether to log every HTTP request.
    pub enable_tracing: bool,

    /// Directory holding `graph_data.json` and the optional files.
    pub data_dir: PathBuf,

    /// Hard limit for reading and parsing one dataset file.
    pub fetch_timeout: Duration,

    /// Connections served by `/api/preview`.
    pub preview_size: usize,

    /// Wait before loading the full dataset when a preview was installed first.
    pub upgrade_delay: Duration,
}

impl Default for XrefConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8888,
            enable_cors: true,
            enable_tracing: true,
            data_dir: PathBuf::from("data"),
            fetch_timeout: Duration::from_secs(30),
            preview_size: DEFAULT_PREVIEW_SIZE,
            upgrade_delay: Duration::from_secs(5),
        }
    }
}

impl XrefConfig {
    /// Binds to all interfaces with CORS and tracing on.
    pub fn development() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            ..Self::default()
        }
    }

    /// Localhost only, without CORS or request tracing.
    pub fn production() -> Self {
        Self {
            enable_cors: false,
            enable_tracing: false,
            ..Self::default()
        }
    }

    /// The bind address; fails with [`Error::Config`] for a non-IP host.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: std::net::IpAddr = self
            .host
            .parse()
            .map_err(|e| Error::Config(format!("Invalid host {:?}: {}", self.host, e)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// The cross-reference HTTP server.
pub struct XrefServer {
    config: XrefConfig,
    state: ApiState,
}

impl XrefServer {
    /// Nothing is read from `config.data_dir` until [`load`](Self::load).
    pub fn new(config: XrefConfig) -> Self {
        let loader = DatasetLoader::new(config.data_dir.clone(), config.fetch_timeout);
        let state = ApiState::new(loader).with_preview_size(config.preview_size);
        Self { config, state }
    }

    /// Serves `state` as is; [`load`](Self::load) is optional.
    pub fn with_state(config: XrefConfig, state: ApiState) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &XrefConfig {
        &self.config
    }

    pub fn state(&self) -> &ApiState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ApiState {
        &mut self.state
    }

    /// Installs the first dataset (preview first when available).
    pub async fn load(&self) -> Result<()> {
        self.state.initialize(self.config.upgrade_delay).await
    }

    fn app(&self) -> Router {
        let app = create_router(self.state.clone());
        let app = match self.config.enable_cors {
            true => app.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
            false => app,
        };
        match self.config.enable_tracing {
            true => app.layer(TraceLayer::new_for_http()),
            false => app,
        }
    }

    /// Serves until the listener fails.
    pub async fn start(self) -> Result<()> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// Serves until `shutdown` resolves, then drains open connections.
    pub async fn start_with_shutdown<F>(self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.socket_addr()?;
        let app = self.app();

        log::info!("Starting cross-reference server on http://{}", addr);
        log::info!("  - API:   http://{}/api/graph", addr);
        log::info!("  - Views: http://{}/api/view/{{arc,radial,chord,stats}}", addr);
        log::info!("  - Data:  {}", self.config.data_dir.display());

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Server(format!("cannot bind {}: {}", addr, e)))?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| Error::Server(e.to_string()))?;

        log::info!("Cross-reference server stopped");
        Ok(())
    }
}
