use crate::events::{EventBus, DEFAULT_OUTBOUND_BUFFER};
use crate::handlers;
use crate::router::ConnectionEventRouter;
use chessduel_engine::{standard_factory, EngineFactory};
use std::convert::Infallible;
use std::fs;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use warp::filters::BoxedFilter;
use warp::reply::Reply;
use warp::Filter;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    host: String,
    port: u16,
    static_dir: PathBuf,
    outbound_buffer: usize,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            host: host.into(),
            port,
            static_dir: static_dir.into(),
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }

    /// Loopback, ephemeral port, throwaway static directory.
    pub fn for_tests() -> Self {
        let dir = std::env::temp_dir().join("chessduel_web_static");
        Self::new("127.0.0.1", 0, dir)
    }

    pub fn with_outbound_buffer(mut self, outbound_buffer: usize) -> Self {
        self.outbound_buffer = outbound_buffer.max(1);
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn static_dir(&self) -> &Path {
        &self.static_dir
    }

    pub fn outbound_buffer(&self) -> usize {
        self.outbound_buffer
    }
}

#[derive(Debug, Clone)]
pub struct AppContext {
    config: ServerConfig,
    event_bus: Arc<EventBus>,
    router: Arc<ConnectionEventRouter>,
}

impl AppContext {
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        Self::with_engines(config, standard_factory())
    }

    /// Build a context whose sessions use `engines` for their rules.
    pub fn with_engines(config: ServerConfig, engines: EngineFactory) -> Result<Self, ServerError> {
        if !config.static_dir().exists() {
            fs::create_dir_all(config.static_dir())
                .map_err(|err| ServerError::ConfigError(err.to_string()))?;
        }

        let event_bus = Arc::new(EventBus::with_buffer(config.outbound_buffer()));
        let router = Arc::new(ConnectionEventRouter::new(Arc::clone(&event_bus), engines));

        Ok(Self {
            config,
            event_bus,
            router,
        })
    }

    pub fn new_for_tests() -> Self {
        Self::new(ServerConfig::for_tests()).expect("test context")
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn router(&self) -> Arc<ConnectionEventRouter> {
        Arc::clone(&self.router)
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

#[derive(Debug, Clone)]
pub struct WebServer {
    context: AppContext,
}

impl WebServer {
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let context = AppContext::new(config)?;
        Ok(Self { context })
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        let WebServer { context } = self;
        let bind_addr = Self::bind_addr(context.config())?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let routes = Self::routes(&context);
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
        };

        let (addr, server_future) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(bind_addr, shutdown_signal)
            .map_err(Self::map_warp_error)?;

        tracing::info!(
            address = %addr,
            static_dir = %context.config().static_dir().display(),
            "web server listening"
        );

        let task = tokio::spawn(async move {
            server_future.await;
            Ok(())
        });

        Ok(ServerHandle::new(addr, shutdown_tx, task, context))
    }

    fn bind_addr(config: &ServerConfig) -> Result<SocketAddr, ServerError> {
        let host = config.host();

        if let Ok(addr) = host.parse::<SocketAddr>() {
            return Ok(addr);
        }

        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            return Ok(SocketAddr::new(ip, config.port()));
        }

        let candidate = format!("{}:{}", host, config.port());
        let mut addrs = candidate.to_socket_addrs().map_err(|err| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`: {err}"))
        })?;

        addrs.next().ok_or_else(|| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`"))
        })
    }

    fn map_warp_error(err: warp::Error) -> ServerError {
        use std::error::Error as StdError;

        if let Some(io_err) = err
            .source()
            .and_then(|source| source.downcast_ref::<std::io::Error>())
        {
            return ServerError::BindError(std::io::Error::new(io_err.kind(), io_err.to_string()));
        }

        ServerError::ConfigError(err.to_string())
    }

    /// Every route the server answers, exposed so tests can drive them
    /// through `warp::test` without binding a socket.
    pub fn routes(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        Self::health_route()
            .or(Self::lobby_route(context))
            .unify()
            .or(Self::websocket_route(context))
            .unify()
            .or(Self::static_routes(context))
            .unify()
            .boxed()
    }

    fn health_route() -> BoxedFilter<(warp::reply::Response,)> {
        warp::path("health")
            .and(warp::get())
            .and(warp::path::end())
            .map(|| handlers::health().into_response())
            .boxed()
    }

    fn lobby_route(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        warp::path!("api" / "lobby")
            .and(warp::get())
            .and(Self::with_router(context.router()))
            .and_then(|router: Arc<ConnectionEventRouter>| async move {
                Ok::<_, Infallible>(handlers::lobby(router).await)
            })
            .boxed()
    }

    fn websocket_route(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        warp::path("ws")
            .and(warp::path::end())
            .and(warp::ws())
            .and(Self::with_router(context.router()))
            .map(|ws: warp::ws::Ws, router: Arc<ConnectionEventRouter>| {
                ws.on_upgrade(move |socket| handlers::serve_connection(socket, router))
                    .into_response()
            })
            .boxed()
    }

    /// The static directory is mounted at the root, so `/` serves
    /// `index.html` and `/js/app.js` serves `<static_dir>/js/app.js`. Routes
    /// registered before it take precedence.
    fn static_routes(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        let dir = context.config().static_dir().to_path_buf();

        let index = warp::path::end()
            .and(warp::get())
            .and(warp::fs::file(dir.join("index.html")))
            .map(|file: warp::fs::File| file.into_response());

        let assets = warp::get()
            .and(warp::fs::dir(dir))
            .map(|file: warp::fs::File| file.into_response());

        index.or(assets).unify().boxed()
    }

    fn with_router(
        router: Arc<ConnectionEventRouter>,
    ) -> impl Filter<Extract = (Arc<ConnectionEventRouter>,), Error = Infallible> + Clone {
        warp::any().map(move || Arc::clone(&router))
    }
}

#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<(), ServerError>>>,
    context: AppContext,
}

impl ServerHandle {
    fn new(
        addr: SocketAddr,
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<Result<(), ServerError>>,
        context: AppContext,
    ) -> Self {
        Self {
            addr,
            shutdown: Some(shutdown),
            task: Some(task),
            context,
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            match task.await {
                Ok(result) => result?,
                Err(err) => {
                    return Err(ServerError::ConfigError(format!(
                        "server task join error: {err}"
                    )))
                }
            }
        }

        tracing::info!(address = %self.addr, "web server stopped");
        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_accepts_ip_and_hostname() {
        let config = ServerConfig::new("127.0.0.1", 4000, "public");
        assert_eq!(
            WebServer::bind_addr(&config).unwrap(),
            "127.0.0.1:4000".parse::<SocketAddr>().unwrap()
        );

        let config = ServerConfig::new("localhost", 4001, "public");
        assert_eq!(WebServer::bind_addr(&config).unwrap().port(), 4001);
    }

    #[test]
    fn unresolvable_host_is_config_error() {
        let config = ServerConfig::new("no such host!", 1, "public");
        assert!(matches!(
            WebServer::bind_addr(&config),
            Err(ServerError::ConfigError(_))
        ));
    }

    #[test]
    fn outbound_buffer_is_at_least_one() {
        let config = ServerConfig::for_tests().with_outbound_buffer(0);
        assert_eq!(config.outbound_buffer(), 1);
        assert_eq!(ServerConfig::for_tests().outbound_buffer(), DEFAULT_OUTBOUND_BUFFER);
    }

    #[tokio::test]
    async fn start_and_shutdown_on_ephemeral_port() {
        let server = WebServer::new(ServerConfig::for_tests()).expect("server");
        let handle = server.start().await.expect("start");
        assert_ne!(handle.address().port(), 0);
        assert_eq!(handle.context().router().snapshot().unwrap().active_sessions, 0);
        handle.shutdown().await.expect("shutdown");
    }
}
