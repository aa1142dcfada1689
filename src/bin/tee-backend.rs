//! Minimal backend for trying the tee proxy by hand.
//!
//! `--mode hello` answers every request with `200 Hello`; `--mode timeout`
//! answers with `504 Time out`, which the proxy retries on the shadow path.
//! Each received request is dumped to the log.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::IntoResponse,
    Router,
};
use clap::{Parser, ValueEnum};
use tokio::net::TcpListener;

use tee_proxy::config::ObservabilityConfig;
use tee_proxy::observability::logging;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// 200 with body "Hello".
    Hello,
    /// 504 with body "Time out".
    Timeout,
}

#[derive(Parser, Debug)]
#[command(name = "tee-backend")]
#[command(about = "Test backend for tee-proxy", long_about = None)]
struct Cli {
    /// Address to accept requests on.
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: String,

    #[arg(short, long, value_enum, default_value_t = Mode::Hello)]
    mode: Mode,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(&ObservabilityConfig::default());

    let mode = cli.mode;
    let app = Router::new().fallback(move |request: Request<Body>| respond(mode, request));

    let listener = TcpListener::bind(&cli.listen).await?;
    tracing::info!(address = %listener.local_addr()?, mode = ?mode, "Test backend listening");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn respond(mode: Mode, request: Request<Body>) -> impl IntoResponse {
    let (parts, body) = request.into_parts();
    match axum::body::to_bytes(body, usize::MAX).await {
        Ok(body) => tracing::info!(
            method = %parts.method,
            uri = %parts.uri,
            body = %String::from_utf8_lossy(&body),
            "Request"
        ),
        Err(e) => tracing::error!(error = %e, "Failed to read request body"),
    }

    match mode {
        Mode::Hello => (StatusCode::OK, "Hello"),
        Mode::Timeout => (StatusCode::GATEWAY_TIMEOUT, "Time out"),
    }
}
