//! Listener: one TCP port serving both the channel and the snapshot read.
//!
//! The first inbound line classifies each connection. An HTTP request line
//! gets the one-shot snapshot endpoint; anything else becomes a persistent
//! channel session with that line as its first request.

use crate::audit;
use crate::fanout::EventBus;
use crate::http;
use crate::serializer::{self, SerializerHandle};
use crate::session;
use crate::writer::DurableWriter;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// How many successive ports to try when the configured one is taken.
pub const DEFAULT_PORT_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind; on `AddrInUse`, successive higher ports are tried.
    pub bind: SocketAddr,
    /// Snapshot file the durable writer owns.
    pub data_path: PathBuf,
    /// Directory from which the audit repository is discovered.
    pub repo_hint: PathBuf,
    /// Bound on the port retry walk.
    pub port_attempts: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("bind failed: {0}")]
    Bind(std::io::Error),

    #[error("accept failed: {0}")]
    Accept(std::io::Error),

    #[error("no free port in {attempts} attempts starting at {start}")]
    PortUnavailable { start: u16, attempts: u32 },

    #[error("serializer failed to start: {0}")]
    Spawn(std::io::Error),
}

/// A bound, fully wired tracker server.
pub struct Server {
    listener: TcpListener,
    serializer: SerializerHandle,
    bus: EventBus,
}

impl Server {
    /// Load state, wire the pipeline, and bind the listener.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServeError> {
        let document = skein_core::load_or_default(&config.data_path);
        info!(
            issues = document.issues.len(),
            last_id = document.last_id,
            path = %config.data_path.display(),
            "state loaded"
        );

        let sink = audit::detect_sink(&config.repo_hint, &config.data_path);
        let writer = DurableWriter::new(config.data_path.clone(), sink);
        let bus = EventBus::default();
        let serializer =
            serializer::spawn(document, writer, bus.clone()).map_err(ServeError::Spawn)?;

        let listener = bind_with_retry(config.bind, config.port_attempts).await?;
        if let Ok(addr) = listener.local_addr() {
            info!(%addr, "listening");
        }

        Ok(Self {
            listener,
            serializer,
            bus,
        })
    }

    /// The address actually bound, which may be a retried port.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the listener fails.
    pub async fn serve(self) -> Result<(), ServeError> {
        loop {
            let (stream, peer) = self.listener.accept().await.map_err(ServeError::Accept)?;
            debug!(%peer, "connection accepted");

            let serializer = self.serializer.clone();
            let bus = self.bus.clone();
            tokio::spawn(async move {
                if let Err(err) = handle_connection(stream, serializer, bus).await {
                    debug!(%peer, %err, "connection ended with error");
                }
            });
        }
    }
}

/// Convenience wrapper: bind then serve forever.
pub async fn run(config: ServerConfig) -> Result<(), ServeError> {
    Server::bind(config).await?.serve().await
}

/// Bind `addr`, walking up through successive ports while they are in use.
pub async fn bind_with_retry(addr: SocketAddr, attempts: u32) -> Result<TcpListener, ServeError> {
    let mut candidate = addr;
    for _ in 0..attempts {
        match TcpListener::bind(candidate).await {
            Ok(listener) => return Ok(listener),
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                warn!(port = candidate.port(), "port in use, trying the next one");
                match candidate.port().checked_add(1) {
                    Some(next) => candidate.set_port(next),
                    None => break,
                }
            }
            Err(err) => return Err(ServeError::Bind(err)),
        }
    }
    Err(ServeError::PortUnavailable {
        start: addr.port(),
        attempts,
    })
}

async fn handle_connection(
    stream: TcpStream,
    serializer: SerializerHandle,
    bus: EventBus,
) -> std::io::Result<()> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut writer = write_half;

    let mut first_line = String::new();
    if reader.read_line(&mut first_line).await? == 0 {
        // Closed before saying anything.
        return Ok(());
    }
    let first_line = first_line.trim_end_matches(['\r', '\n']).to_string();

    if is_http_request_line(&first_line) {
        http::handle(&mut writer, &first_line, &serializer).await
    } else {
        session::run(reader, writer, Some(first_line), serializer, bus).await
    }
}

const HTTP_METHODS: [&str; 7] = ["GET", "HEAD", "POST", "PUT", "DELETE", "OPTIONS", "PATCH"];

fn is_http_request_line(line: &str) -> bool {
    HTTP_METHODS
        .iter()
        .any(|method| line.strip_prefix(method).is_some_and(|rest| rest.starts_with(' ')))
}
