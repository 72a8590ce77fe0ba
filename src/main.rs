use anyhow::{bail, Context, Result};
use axum::serve;
use careguard::core::config::Config;
use careguard::core::startup::{log_startup_summary, spawn_session_cleanup};
use careguard::core::state::AppState;
use careguard::core::{routes, tracing_init};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::{TcpListener, UnixListener};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, warn, Level};

fn main() -> Result<()> {
    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    // Load and validate configuration
    let config = Config::from_file(&config_path).context(format!(
        "Failed to load configuration from '{}'. \
        If this is your first run, copy config.example.toml to config.toml and adjust the values.",
        config_path.display()
    ))?;

    tracing_init::init_tracing(&config.logging)?;

    // Build Tokio runtime with configured number of threads
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.num_threads)
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    runtime.block_on(async_main(config, config_path))
}

async fn async_main(config: Config, config_path: PathBuf) -> Result<()> {
    info!(
        config_path = %config_path.display(),
        port = ?config.server.port,
        unix_socket = ?config.server.unix_socket,
        num_threads = config.server.num_threads,
        log_level = %config.logging.level,
        log_format = %config.logging.format,
        "Access gate starting"
    );

    let state = Arc::new(AppState::new(config.clone()).context("Failed to build application state")?);

    spawn_session_cleanup(Arc::clone(&state), config.auth.session_cleanup_interval);

    info!(
        cleanup_interval_seconds = config.auth.session_cleanup_interval,
        session_ttl_seconds = config.auth.session_ttl,
        "Session cleanup task started"
    );

    log_startup_summary(&state);

    // Build the router with middleware
    let app = routes::build_router(state).layer(
        ServiceBuilder::new().layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        ),
    );

    let tcp_handle = if let Some(port) = config.server.port {
        let addr = format!("0.0.0.0:{}", port);
        let listener = TcpListener::bind(&addr)
            .await
            .context(format!("Failed to bind TCP listener to {}", addr))?;

        info!(address = %addr, "TCP listener bound successfully");

        let app = app.clone();
        Some(tokio::spawn(async move {
            serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("TCP server error")
        }))
    } else {
        None
    };

    let unix_handle = if let Some(unix_socket) = &config.server.unix_socket {
        if unix_socket.exists() {
            std::fs::remove_file(unix_socket).context(format!(
                "Failed to remove existing Unix socket: {}",
                unix_socket.display()
            ))?;
        }

        let listener = UnixListener::bind(unix_socket).context(format!(
            "Failed to bind Unix socket listener to {}",
            unix_socket.display()
        ))?;

        info!(path = %unix_socket.display(), "Unix socket listener bound successfully");

        let mut make_service = app.into_make_service();
        Some(tokio::spawn(async move {
            use tower::Service;

            loop {
                let (socket, _remote_addr) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!(error = %e, "Failed to accept Unix socket connection");
                        continue;
                    }
                };

                let tower_service = match make_service.call(&socket).await {
                    Ok(svc) => svc,
                    Err(infallible) => match infallible {},
                };

                tokio::spawn(async move {
                    let socket = hyper_util::rt::TokioIo::new(socket);

                    let hyper_service =
                        hyper::service::service_fn(move |request: hyper::Request<hyper::body::Incoming>| {
                            tower_service.clone().call(request)
                        });

                    if let Err(err) =
                        hyper_util::server::conn::auto::Builder::new(hyper_util::rt::TokioExecutor::new())
                            .serve_connection_with_upgrades(socket, hyper_service)
                            .await
                    {
                        error!(error = %err, "Error serving Unix socket connection");
                    }
                });
            }
        }))
    } else {
        None
    };

    info!("HTTP server(s) started, waiting for shutdown signal");

    match (tcp_handle, unix_handle) {
        (Some(tcp), Some(unix)) => {
            tokio::select! {
                result = tcp => log_server_exit("TCP", result),
                result = unix => log_server_exit("Unix socket", result),
            }
        }
        (Some(tcp), None) => log_server_exit("TCP", tcp.await),
        (None, Some(unix)) => log_server_exit("Unix socket", unix.await),
        (None, None) => bail!("No listeners configured"),
    }

    info!("Shutting down gracefully");

    Ok(())
}

fn log_server_exit<T>(listener: &str, result: Result<T, tokio::task::JoinError>) {
    if let Err(e) = result {
        error!(listener = listener, error = %e, "Server task failed");
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
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
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
