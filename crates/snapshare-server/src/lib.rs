//! Snapshare production server.
//!
//! Group messaging and photo distribution over QUIC.
//!
//! # Architecture
//!
//! [`ServerDriver`] is the engine: a pure state machine over the membership
//! directory, the group registry and the content store that turns
//! [`ServerEvent`]s into [`ServerAction`]s. [`Server`] is the production
//! runtime around it: it owns the QUIC endpoint, runs uploads through
//! [`AssetIntake`] and delivers actions to per-connection outbound queues.
//!
//! # Components
//!
//! - [`ServerDriver`]: event processing and fan-out decisions (no I/O)
//! - [`MembershipDirectory`], [`GroupRegistry`], [`ContentStore`]: engine state
//! - [`ingress::classify`]: turns inbound frames into driver events
//! - [`AssetIntake`] and [`storage`]: upload validation and byte storage
//! - [`Server`]: Quinn/Tokio runtime executing driver actions
//! - [`SystemEnv`]: production environment (real clocks, OS RNG)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod assets;
pub mod content_store;
pub mod directory;
mod driver;
mod driver_error;
mod error;
pub mod group_registry;
pub mod ingress;
pub mod storage;
mod system_env;
mod transport;

use std::{collections::HashMap, net::SocketAddr, path::PathBuf, sync::Arc};

pub use assets::{AssetConfig, AssetError, AssetIntake, StoredAsset};
use bytes::{Bytes, BytesMut};
pub use content_store::{ContentError, ContentStore};
pub use directory::{DirectoryError, MembershipDirectory, Participant};
pub use driver::{
    DEFAULT_SEED_GROUPS, DriverConfig, LogLevel, ServerAction, ServerDriver, ServerEvent,
};
pub use driver_error::DriverError;
pub use error::ServerError;
pub use group_registry::{GroupError, GroupMetadata, GroupRegistry};
use ingress::Ingress;
use quinn::{RecvStream, SendStream};
use snapshare_core::env::Environment;
use snapshare_proto::{Frame, FrameHeader, Opcode};
pub use storage::{AssetStore, DiskAssetStore, MemoryAssetStore, StorageError};
pub use system_env::SystemEnv;
use tokio::sync::{Mutex, RwLock, mpsc};
pub use transport::{QuinnConnection, QuinnTransport, TlsIdentity};

/// Default depth of each connection's outbound queue, in frames.
pub const DEFAULT_OUTBOUND_QUEUE_DEPTH: usize = 256;

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:4433")
    pub bind_address: String,
    /// Path to TLS certificate (PEM format)
    pub cert_path: Option<PathBuf>,
    /// Path to TLS private key (PEM format)
    pub key_path: Option<PathBuf>,
    /// Driver configuration (limits, seed groups)
    pub driver: DriverConfig,
    /// Upload acceptance rules
    pub assets: AssetConfig,
    /// Directory for uploaded files. In-memory storage when `None`.
    pub upload_dir: Option<PathBuf>,
    /// Frames buffered per connection before deliveries are dropped
    pub outbound_queue_depth: usize,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4433".to_string(),
            cert_path: None,
            key_path: None,
            driver: DriverConfig::default(),
            assets: AssetConfig::default(),
            upload_dir: None,
            outbound_queue_depth: DEFAULT_OUTBOUND_QUEUE_DEPTH,
        }
    }
}

/// Item on a connection's outbound queue.
#[derive(Debug)]
enum Outbound {
    /// Encoded frame
    Frame(Bytes),
    /// Finish the push stream and close the connection
    Close(String),
}

/// State shared by every connection task.
struct Runtime<S: AssetStore> {
    /// The engine. Actions are executed while the lock is held so that every
    /// queue receives frames in driver order.
    driver: Mutex<ServerDriver<SystemEnv>>,
    intake: AssetIntake<S, SystemEnv>,
    /// Session ID → QUIC connection (for closing)
    connections: RwLock<HashMap<u64, QuinnConnection>>,
    /// Session ID → outbound queue
    outbound: RwLock<HashMap<u64, mpsc::Sender<Outbound>>>,
    env: SystemEnv,
    queue_depth: usize,
}

/// Production Snapshare server.
///
/// Wraps `ServerDriver` with Quinn QUIC transport and system environment.
pub struct Server<S: AssetStore> {
    runtime: Arc<Runtime<S>>,
    transport: QuinnTransport,
}

impl<S: AssetStore> Server<S> {
    /// Bind a server whose uploads go to `store`.
    ///
    /// # Errors
    ///
    /// - `ServerError::Config` for a bad bind address or TLS material
    /// - `ServerError::Transport` if the endpoint cannot be bound
    pub fn bind(config: ServerRuntimeConfig, store: S) -> Result<Self, ServerError> {
        let env = SystemEnv::new();
        let identity = TlsIdentity::from_paths(config.cert_path, config.key_path);
        let transport = QuinnTransport::bind(&config.bind_address, &identity)?;

        let runtime = Runtime {
            driver: Mutex::new(ServerDriver::new(env.clone(), config.driver)),
            intake: AssetIntake::new(config.assets, store, env.clone()),
            connections: RwLock::new(HashMap::new()),
            outbound: RwLock::new(HashMap::new()),
            env,
            queue_depth: config.outbound_queue_depth.max(1),
        };

        Ok(Self { runtime: Arc::new(runtime), transport })
    }

    /// Accept connections until the endpoint closes.
    ///
    /// # Errors
    ///
    /// - `ServerError::Transport` if the local address cannot be read
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.transport.local_addr()?;
        tracing::info!(%addr, "server starting");

        while let Some(accepted) = self.transport.accept().await {
            match accepted {
                Ok(conn) => {
                    let runtime = Arc::clone(&self.runtime);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, runtime).await {
                            tracing::error!("connection error: {e}");
                        }
                    });
                },
                Err(e) => tracing::warn!("accept error: {e}"),
            }
        }

        tracing::info!("endpoint closed");
        Ok(())
    }

    /// Local address the server is bound to.
    ///
    /// # Errors
    ///
    /// - `ServerError::Transport` if the socket address cannot be read
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.transport.local_addr()
    }
}

async fn handle_connection<S: AssetStore>(
    conn: QuinnConnection,
    runtime: Arc<Runtime<S>>,
) -> Result<(), ServerError> {
    let session_id = runtime.env.random_u64();
    tracing::debug!(session_id, remote = %conn.remote_addr(), "new connection");

    let push_stream = conn.open_uni().await?;
    let (tx, rx) = mpsc::channel(runtime.queue_depth);
    tokio::spawn(write_outbound(session_id, conn.clone(), push_stream, rx));

    runtime.connections.write().await.insert(session_id, conn.clone());
    runtime.outbound.write().await.insert(session_id, tx);

    dispatch(&runtime, ServerEvent::ConnectionAccepted { session_id }).await?;

    let reason = loop {
        match conn.accept_bi().await {
            Ok((send, recv)) => {
                let runtime = Arc::clone(&runtime);
                tokio::spawn(async move {
                    if let Err(e) = handle_stream(session_id, send, recv, &runtime).await {
                        tracing::debug!(session_id, "stream error: {e}");
                    }
                });
            },
            Err(e) => break e.to_string(),
        }
    };

    runtime.connections.write().await.remove(&session_id);
    runtime.outbound.write().await.remove(&session_id);

    dispatch(&runtime, ServerEvent::ConnectionClosed { session_id, reason }).await
}

/// Read request frames from one client stream until it ends.
async fn handle_stream<S: AssetStore>(
    session_id: u64,
    send: SendStream,
    mut recv: RecvStream,
    runtime: &Runtime<S>,
) -> Result<(), ServerError> {
    // Replies travel on the push stream.
    drop(send);

    let mut header_buf = [0u8; FrameHeader::SIZE];
    loop {
        if let Err(e) = recv.read_exact(&mut header_buf).await {
            tracing::debug!(session_id, "read error: {e}");
            break;
        }

        let payload_size = match FrameHeader::from_bytes(&header_buf) {
            Ok(header) => header.payload_size() as usize,
            Err(e) => {
                tracing::warn!(session_id, "invalid frame header: {e}");
                break;
            },
        };

        let mut buf = BytesMut::zeroed(FrameHeader::SIZE + payload_size);
        buf[..FrameHeader::SIZE].copy_from_slice(&header_buf);
        if let Err(e) = recv.read_exact(&mut buf[FrameHeader::SIZE..]).await {
            tracing::debug!(session_id, "payload read error: {e}");
            break;
        }

        let frame = Frame::decode(&buf)?;

        match classify(session_id, frame, runtime).await? {
            Ingress::Event(event) => {
                if let Err(e) = dispatch(runtime, event).await {
                    tracing::warn!(session_id, "frame processing error: {e}");
                }
            },
            Ingress::Reject { frame, reason } => {
                tracing::debug!(session_id, "upload rejected: {reason}");
                let bytes = encode(&frame)?;
                enqueue(&*runtime.outbound.read().await, session_id, Outbound::Frame(bytes));
            },
        }
    }

    Ok(())
}

/// Run a frame through ingress. Uploads touch storage, so they run on the
/// blocking pool.
async fn classify<S: AssetStore>(
    session_id: u64,
    frame: Frame,
    runtime: &Runtime<S>,
) -> Result<Ingress, ServerError> {
    if frame.opcode() != Some(Opcode::PublishContent) {
        return Ok(Ingress::Event(ServerEvent::FrameReceived { session_id, frame }));
    }

    let joined = runtime.driver.lock().await.is_joined(session_id);
    let intake = runtime.intake.clone();
    let ingress =
        tokio::task::spawn_blocking(move || ingress::classify(session_id, frame, joined, &intake))
            .await
            .map_err(|e| ServerError::Internal(format!("upload task failed: {e}")))??;

    Ok(ingress)
}

/// Feed one event to the driver and execute the resulting actions.
async fn dispatch<S: AssetStore>(
    runtime: &Runtime<S>,
    event: ServerEvent,
) -> Result<(), ServerError> {
    let mut driver = runtime.driver.lock().await;
    let actions = driver.process_event(event)?;
    execute_actions(actions, runtime).await
}

/// Execute server actions. Sends never wait on a client.
async fn execute_actions<S: AssetStore, I>(
    actions: Vec<ServerAction<I>>,
    runtime: &Runtime<S>,
) -> Result<(), ServerError> {
    for action in actions {
        match action {
            ServerAction::SendToSession { session_id, frame } => {
                let bytes = encode(&frame)?;
                enqueue(&*runtime.outbound.read().await, session_id, Outbound::Frame(bytes));
            },

            ServerAction::Broadcast { recipients, frame } => {
                let bytes = encode(&frame)?;
                broadcast(&*runtime.outbound.read().await, recipients, &bytes);
            },

            ServerAction::CloseConnection { session_id, reason } => {
                tracing::info!(session_id, "closing connection: {reason}");
                let queued =
                    queue_close(&mut *runtime.outbound.write().await, session_id, &reason);
                let conn = runtime.connections.write().await.remove(&session_id);
                if !queued && let Some(conn) = conn {
                    conn.close(0, &reason);
                }
            },

            ServerAction::Log { level, message, .. } => match level {
                LogLevel::Debug => tracing::debug!("{message}"),
                LogLevel::Info => tracing::info!("{message}"),
                LogLevel::Warn => tracing::warn!("{message}"),
                LogLevel::Error => tracing::error!("{message}"),
            },
        }
    }

    Ok(())
}

fn encode(frame: &Frame) -> Result<Bytes, ServerError> {
    let mut buf = BytesMut::with_capacity(frame.wire_len());
    frame.encode(&mut buf)?;
    Ok(buf.freeze())
}

/// Queue `item` for one session without waiting. Returns whether it was
/// queued; a full, closed or missing queue drops the delivery.
fn enqueue(
    outbound: &HashMap<u64, mpsc::Sender<Outbound>>,
    session_id: u64,
    item: Outbound,
) -> bool {
    let Some(tx) = outbound.get(&session_id) else {
        tracing::debug!(session_id, "no outbound queue; delivery dropped");
        return false;
    };

    match tx.try_send(item) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!(session_id, "outbound queue full; delivery dropped");
            false
        },
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::debug!(session_id, "outbound queue closed; delivery dropped");
            false
        },
    }
}

/// Queue one encoded frame for every recipient. Returns how many took it.
fn broadcast(
    outbound: &HashMap<u64, mpsc::Sender<Outbound>>,
    recipients: impl IntoIterator<Item = u64>,
    bytes: &Bytes,
) -> usize {
    recipients
        .into_iter()
        .filter(|session_id| enqueue(outbound, *session_id, Outbound::Frame(bytes.clone())))
        .count()
}

/// Drop a session's queue, leaving a `Close` behind it for the writer task.
/// Returns false when there was no queue or it could not take the item, in
/// which case the caller closes the connection itself.
fn queue_close(
    outbound: &mut HashMap<u64, mpsc::Sender<Outbound>>,
    session_id: u64,
    reason: &str,
) -> bool {
    outbound
        .remove(&session_id)
        .is_some_and(|tx| tx.try_send(Outbound::Close(reason.to_string())).is_ok())
}

/// Drain a connection's queue onto its push stream.
async fn write_outbound(
    session_id: u64,
    conn: QuinnConnection,
    mut stream: SendStream,
    mut rx: mpsc::Receiver<Outbound>,
) {
    while let Some(item) = rx.recv().await {
        match item {
            Outbound::Frame(bytes) => {
                if let Err(e) = stream.write_all(&bytes).await {
                    tracing::debug!(session_id, "push stream write failed: {e}");
                    break;
                }
            },
            Outbound::Close(reason) => {
                let _ = stream.finish();
                conn.close(0, &reason);
                break;
            },
        }
    }
}
