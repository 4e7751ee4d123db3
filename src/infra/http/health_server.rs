// Minimal health endpoint over a raw TCP listener. One route, one JSON
// body, read-only; a full web framework buys nothing here.

use crate::core::health::{ConnectivityProbe, HealthService};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, PartialEq, Eq)]
pub enum Route {
    Health,
    NotFound,
}

/// `GET /health` answers with the snapshot; every other request is a 404.
pub fn route(request_line: &str) -> Route {
    let mut parts = request_line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET"), Some("/health")) => Route::Health,
        _ => Route::NotFound,
    }
}

/// Accept loop. Stops accepting new queries as soon as the shutdown signal
/// fires; in-flight responses finish on their own tasks.
pub async fn serve<P: ConnectivityProbe + 'static>(
    listener: TcpListener,
    service: Arc<HealthService<P>>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "Health endpoint listening");
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("Health endpoint shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, _) = accepted?;
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    if let Err(err) = answer(stream, service).await {
                        debug!(error = %err, "Health connection error");
                    }
                });
            }
        }
    }
}

async fn answer<P: ConnectivityProbe>(
    mut stream: TcpStream,
    service: Arc<HealthService<P>>,
) -> anyhow::Result<()> {
    let mut buffer = [0u8; 1024];
    let read = stream.read(&mut buffer).await?;
    let request = String::from_utf8_lossy(&buffer[..read]);
    let request_line = request.lines().next().unwrap_or("");

    let response = match route(request_line) {
        Route::Health => {
            let body = serde_json::to_string(&service.snapshot())?;
            http_response("200 OK", &body)
        }
        Route::NotFound => http_response("404 Not Found", r#"{"error":"not found"}"#),
    };

    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

fn http_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}
