//! Simulation server for testing with turmoil.
//!
//! `SimServer` wraps `ServerDriver` for integration with turmoil's
//! deterministic simulation. It uses `SimEnv` with an in-memory asset store,
//! turmoil TCP for networking, and one actor loop that owns all engine state:
//! per-connection reader tasks forward frames over a channel, and the loop
//! processes them one at a time, so delivery order is the order the driver
//! emitted actions in.
//!
//! Over TCP the request and push directions share one stream per client; the
//! framing is the same as on the QUIC transport.

use std::{collections::HashMap, io};

use snapshare_proto::Frame;
use snapshare_server::{
    AssetConfig, AssetIntake, DriverConfig, LogLevel, MemoryAssetStore, ServerAction,
    ServerDriver, ServerEvent,
    ingress::{self, Ingress},
};
use tokio::{io::AsyncWriteExt, sync::mpsc};
use turmoil::net::{
    TcpListener, TcpStream,
    tcp::{OwnedReadHalf, OwnedWriteHalf},
};

use crate::{SimEnv, read_frame, wire::write_frame};

/// Message from a reader task to the server loop.
enum Inbound {
    Frame { session_id: u64, frame: Frame },
    Closed { session_id: u64, reason: String },
}

/// Simulation server for testing with turmoil.
///
/// Call [`SimServer::run`] from a turmoil host to serve until the simulation
/// ends, or [`SimServer::step`] to drive it one event at a time.
pub struct SimServer {
    /// The engine
    driver: ServerDriver<SimEnv>,
    /// Upload validation and in-memory storage
    intake: AssetIntake<MemoryAssetStore, SimEnv>,
    /// TCP listener for accepting connections
    listener: TcpListener,
    /// Write halves (`session_id` -> writer)
    writers: HashMap<u64, OwnedWriteHalf>,
    /// Sender handed to every reader task
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    /// Frames and closures from reader tasks
    inbound_rx: mpsc::UnboundedReceiver<Inbound>,
    /// Next session ID
    next_session_id: u64,
}

impl SimServer {
    /// Create and bind a new simulation server with default configuration.
    pub async fn bind(address: &str) -> io::Result<Self> {
        let env = SimEnv::new();
        Self::bind_with_config(address, DriverConfig::default(), AssetConfig::default(), env).await
    }

    /// Create and bind a new simulation server with custom configuration.
    pub async fn bind_with_config(
        address: &str,
        config: DriverConfig,
        assets: AssetConfig,
        env: SimEnv,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(address).await?;
        let intake = AssetIntake::new(assets, MemoryAssetStore::new(), env.clone());
        let driver = ServerDriver::new(env, config);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        Ok(Self {
            driver,
            intake,
            listener,
            writers: HashMap::new(),
            inbound_tx,
            inbound_rx,
            next_session_id: 1,
        })
    }

    /// Serve forever.
    ///
    /// # Errors
    ///
    /// - Any listener error from [`SimServer::step`]
    pub async fn run(mut self) -> io::Result<()> {
        loop {
            self.step().await?;
        }
    }

    /// Wait for one connection or one inbound message and process it.
    ///
    /// # Errors
    ///
    /// - The listener's accept error. Per-connection failures are logged.
    pub async fn step(&mut self) -> io::Result<()> {
        tokio::select! {
            accepted = self.listener.accept() => {
                let (stream, _addr) = accepted?;
                self.accept_connection(stream).await;
            },
            Some(inbound) = self.inbound_rx.recv() => match inbound {
                Inbound::Frame { session_id, frame } => self.process_frame(session_id, frame).await,
                Inbound::Closed { session_id, reason } => {
                    self.writers.remove(&session_id);
                    self.dispatch(ServerEvent::ConnectionClosed { session_id, reason }).await;
                },
            },
        }

        Ok(())
    }

    async fn accept_connection(&mut self, stream: TcpStream) {
        let session_id = self.next_session_id;
        self.next_session_id += 1;

        let (reader, writer) = stream.into_split();
        self.writers.insert(session_id, writer);
        tokio::spawn(read_loop(session_id, reader, self.inbound_tx.clone()));

        self.dispatch(ServerEvent::ConnectionAccepted { session_id }).await;
    }

    /// Run an inbound frame through ingress and the driver.
    async fn process_frame(&mut self, session_id: u64, frame: Frame) {
        let joined = self.driver.is_joined(session_id);
        match ingress::classify(session_id, frame, joined, &self.intake) {
            Ok(Ingress::Event(event)) => self.dispatch(event).await,
            Ok(Ingress::Reject { frame, reason }) => {
                tracing::debug!(session_id, "upload rejected: {reason}");
                self.send_frame(session_id, &frame).await;
            },
            Err(e) => tracing::error!(session_id, "failed to classify frame: {e}"),
        }
    }

    async fn dispatch(&mut self, event: ServerEvent) {
        match self.driver.process_event(event) {
            Ok(actions) => self.execute_actions(actions).await,
            Err(e) => tracing::warn!("driver rejected event: {e}"),
        }
    }

    /// Execute server actions.
    ///
    /// Writes are awaited inline. Turmoil's TCP writes complete without
    /// backpressure, so a client that never reads cannot stall this loop the
    /// way it could on a real socket; `Server` uses bounded queues instead.
    async fn execute_actions(&mut self, actions: Vec<ServerAction<tokio::time::Instant>>) {
        for action in actions {
            match action {
                ServerAction::SendToSession { session_id, frame } => {
                    self.send_frame(session_id, &frame).await;
                },

                ServerAction::Broadcast { recipients, frame } => {
                    for session_id in recipients {
                        self.send_frame(session_id, &frame).await;
                    }
                },

                ServerAction::CloseConnection { session_id, reason } => {
                    tracing::debug!(session_id, "closing connection: {reason}");
                    if let Some(mut writer) = self.writers.remove(&session_id) {
                        let _ = writer.shutdown().await;
                    }
                },

                ServerAction::Log { level, message, .. } => log(level, &message),
            }
        }
    }

    /// Send a frame to a specific session. Write failures are logged and the
    /// delivery dropped.
    async fn send_frame(&mut self, session_id: u64, frame: &Frame) {
        let Some(writer) = self.writers.get_mut(&session_id) else {
            return;
        };

        if let Err(e) = write_frame(writer, frame).await {
            tracing::debug!(session_id, "write failed: {e}");
        }
    }

    /// Number of open connections the driver tracks.
    pub fn connection_count(&self) -> usize {
        self.driver.connection_count()
    }

    /// Underlying driver for test assertions.
    pub fn driver(&self) -> &ServerDriver<SimEnv> {
        &self.driver
    }

    /// Upload intake for test assertions.
    pub fn intake(&self) -> &AssetIntake<MemoryAssetStore, SimEnv> {
        &self.intake
    }
}

async fn read_loop(session_id: u64, mut reader: OwnedReadHalf, tx: mpsc::UnboundedSender<Inbound>) {
    let reason = loop {
        match read_frame(&mut reader).await {
            Ok(Some(frame)) => {
                if tx.send(Inbound::Frame { session_id, frame }).is_err() {
                    return;
                }
            },
            Ok(None) => break "peer closed".to_string(),
            Err(e) => break e.to_string(),
        }
    };

    let _ = tx.send(Inbound::Closed { session_id, reason });
}

fn log(level: LogLevel, message: &str) {
    match level {
        LogLevel::Debug => tracing::debug!("{}", message),
        LogLevel::Info => tracing::info!("{}", message),
        LogLevel::Warn => tracing::warn!("{}", message),
        LogLevel::Error => tracing::error!("{}", message),
    }
}
