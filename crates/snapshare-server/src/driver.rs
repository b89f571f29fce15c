//! Server driver.
//!
//! Ties together per-connection state machines, the membership directory, the
//! group registry and the content store. Pure: the runtime feeds it
//! [`ServerEvent`]s and executes the [`ServerAction`]s it returns. Every
//! mutation and the fan-out decisions it triggers happen inside one call, so
//! whoever serializes calls to [`ServerDriver::process_event`] gets a single
//! total order of events.
//!
//! Replies to a request carry the request's `request_id`; broadcasts carry 0.

use std::{collections::HashMap, time::Instant};

use snapshare_core::{
    connection::{Connection, ConnectionState},
    env::Environment,
    error::ConnectionError,
    validate,
};
use snapshare_proto::{
    Frame, Payload,
    payloads::{
        ErrorPayload,
        content::{self, Backlog, ContentId, PublishAccepted, Scope},
        group::{GroupCreated, GroupFeed, GroupJoinerNotice, GroupNameList},
        session::{ParticipantJoined, ParticipantLeft, RosterUpdate},
    },
};

use crate::{
    content_store::{ContentError, ContentStore, NewContent},
    directory::MembershipDirectory,
    driver_error::DriverError,
    group_registry::{GroupError, GroupRegistry},
};

/// Groups that exist before anyone connects.
pub const DEFAULT_SEED_GROUPS: [&str; 3] = ["Friends", "Family", "Work"];

/// Driver configuration
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Maximum concurrent connections
    pub max_connections: usize,
    /// Groups created at startup with no creator
    pub seed_groups: Vec<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_connections: 10_000,
            seed_groups: DEFAULT_SEED_GROUPS.map(String::from).to_vec(),
        }
    }
}

/// Events that the server driver processes.
///
/// These are produced by the external runtime (simulation or production).
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A new connection was accepted
    ConnectionAccepted {
        /// Unique connection ID assigned by the runtime
        session_id: u64,
    },

    /// A frame was received from a connection
    FrameReceived {
        /// Connection that sent the frame
        session_id: u64,
        /// The received frame
        frame: Frame,
    },

    /// An upload passed asset intake and was stored.
    ///
    /// The runtime turns `PublishContent` frames into this event; the raw
    /// bytes never reach the driver.
    ContentPublished {
        /// Publishing connection
        session_id: u64,
        /// Request ID of the `PublishContent` frame
        request_id: u32,
        /// Target scope
        scope: Scope,
        /// Caption as sent by the client
        caption: Option<String>,
        /// Reference of the stored asset
        asset_ref: String,
    },

    /// A connection was closed (by peer or error)
    ConnectionClosed {
        /// Connection that was closed
        session_id: u64,
        /// Reason for closure
        reason: String,
    },
}

/// Actions that the server driver produces.
///
/// These are executed by runtime-specific code (production or simulation).
#[derive(Debug, Clone)]
pub enum ServerAction<I = Instant> {
    /// Send a frame to a specific session
    SendToSession {
        /// Target session ID
        session_id: u64,
        /// Frame to send
        frame: Frame,
    },

    /// Send one frame to each listed session.
    ///
    /// The list is a snapshot taken while the event was processed; later
    /// joins or leaves do not change it.
    Broadcast {
        /// Target session IDs
        recipients: Vec<u64>,
        /// Frame to send
        frame: Frame,
    },

    /// Close a connection
    CloseConnection {
        /// Session to close
        session_id: u64,
        /// Reason for closure
        reason: String,
    },

    /// Log a message (for debugging/monitoring)
    Log {
        /// Log level
        level: LogLevel,
        /// Message to log
        message: String,
        /// When the event occurred
        timestamp: I,
    },
}

/// Log levels for server actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warn,
    /// Error
    Error,
}

type Actions<E> = Vec<ServerAction<<E as Environment>::Instant>>;

/// Action-based server driver.
pub struct ServerDriver<E>
where
    E: Environment,
{
    /// Connection state machines (session_id → Connection)
    connections: HashMap<u64, Connection<E::Instant>>,
    /// Joined participants and their group subscriptions
    directory: MembershipDirectory,
    /// Named groups and their members
    groups: GroupRegistry,
    /// Published items and comments
    content: ContentStore,
    /// Environment (time, RNG)
    env: E,
    /// Driver configuration
    config: DriverConfig,
}

impl<E> ServerDriver<E>
where
    E: Environment,
{
    /// Create a new server driver with the configured seed groups.
    ///
    /// Seed names that are not valid group names are skipped.
    pub fn new(env: E, config: DriverConfig) -> Self {
        let seeds: Vec<String> =
            config.seed_groups.iter().filter_map(|name| validate::group_name(name).ok()).collect();
        let groups = GroupRegistry::with_seeds(seeds.iter().map(String::as_str));

        let mut content = ContentStore::new();
        for name in groups.list_names() {
            content.open_feed(&name);
        }

        Self {
            connections: HashMap::new(),
            directory: MembershipDirectory::new(),
            groups,
            content,
            env,
            config,
        }
    }

    /// Process a server event and return actions to execute.
    ///
    /// # Errors
    ///
    /// - `DriverError::SessionNotFound` for a frame from an unknown session
    /// - `DriverError::SessionAlreadyExists` if a session ID is reused
    /// - `DriverError::Protocol` if an outbound frame cannot be encoded
    pub fn process_event(&mut self, event: ServerEvent) -> Result<Actions<E>, DriverError> {
        match event {
            ServerEvent::ConnectionAccepted { session_id } => {
                self.handle_connection_accepted(session_id)
            },
            ServerEvent::FrameReceived { session_id, frame } => {
                self.handle_frame_received(session_id, &frame)
            },
            ServerEvent::ContentPublished { session_id, request_id, scope, caption, asset_ref } => {
                self.handle_content_published(session_id, request_id, scope, caption, asset_ref)
            },
            ServerEvent::ConnectionClosed { session_id, reason } => {
                self.handle_disconnect(session_id, &reason)
            },
        }
    }

    fn handle_connection_accepted(&mut self, session_id: u64) -> Result<Actions<E>, DriverError> {
        let now = self.env.now();

        if self.connections.contains_key(&session_id) {
            return Err(DriverError::SessionAlreadyExists(session_id));
        }

        if self.connections.len() >= self.config.max_connections {
            return Ok(vec![
                self.log(LogLevel::Warn, format!("session {session_id} refused: at capacity")),
                self.reply(session_id, 0, Payload::Error(ErrorPayload::capacity("server full")))?,
                ServerAction::CloseConnection {
                    session_id,
                    reason: "max connections exceeded".to_string(),
                },
            ]);
        }

        self.connections.insert(session_id, Connection::new(session_id, now));

        Ok(vec![self.log(LogLevel::Debug, format!("connection {session_id} accepted"))])
    }

    fn handle_frame_received(
        &mut self,
        session_id: u64,
        frame: &Frame,
    ) -> Result<Actions<E>, DriverError> {
        let now = self.env.now();
        let conn = self
            .connections
            .get_mut(&session_id)
            .ok_or(DriverError::SessionNotFound(session_id))?;
        conn.touch(now);

        let request_id = frame.header.request_id();
        let payload = match Payload::from_frame(frame) {
            Ok(payload) => payload,
            Err(e) => {
                let error = ErrorPayload::invalid_payload(format!("malformed frame: {e}"));
                return self.reject(session_id, request_id, error);
            },
        };

        match payload {
            Payload::Join(join) => self.handle_join(session_id, request_id, &join.display_name),
            Payload::Goodbye(goodbye) => {
                let reason = goodbye.reason.unwrap_or_else(|| "goodbye".to_string());
                let mut actions = self.handle_disconnect(session_id, &reason)?;
                actions.push(ServerAction::CloseConnection { session_id, reason });
                Ok(actions)
            },
            Payload::CreateGroup(req) => self.handle_create_group(session_id, request_id, &req.name),
            Payload::JoinGroup(req) => self.handle_join_group(session_id, request_id, &req.name),
            Payload::AddComment(req) => {
                self.handle_add_comment(session_id, request_id, req.content_id, &req.text)
            },
            Payload::PublishContent(_) => {
                let error = ErrorPayload::invalid_payload("upload was not processed by intake");
                self.reject(session_id, request_id, error)
            },
            other => {
                let error = ErrorPayload::invalid_payload(format!(
                    "{:?} is not a client request",
                    other.opcode()
                ));
                self.reject(session_id, request_id, error)
            },
        }
    }

    /// join: register, send the newcomer its backlog and the group list, then
    /// refresh everyone's roster and announce the newcomer to the others.
    fn handle_join(
        &mut self,
        session_id: u64,
        request_id: u32,
        raw_name: &str,
    ) -> Result<Actions<E>, DriverError> {
        let now = self.env.now();

        let display_name = match validate::display_name(raw_name) {
            Ok(name) => name,
            Err(e) => return self.reject(session_id, request_id, ErrorPayload::validation(e.to_string())),
        };

        let conn = self
            .connections
            .get_mut(&session_id)
            .ok_or(DriverError::SessionNotFound(session_id))?;
        if let Err(e) = conn.join(display_name.clone(), now) {
            return self.reject(session_id, request_id, ErrorPayload::validation(e.to_string()));
        }

        self.directory.register(session_id, display_name.clone())?;

        let mut actions =
            vec![self.log(LogLevel::Info, format!("session {session_id} joined as {display_name:?}"))];

        let backlog = Backlog { items: self.content.feed_for(&Scope::Global) };
        actions.push(self.reply(session_id, request_id, Payload::Backlog(backlog))?);
        actions.push(self.reply(session_id, request_id, self.group_name_list())?);

        let everyone = self.directory.session_ids();
        let others = everyone.iter().copied().filter(|id| *id != session_id).collect();
        push_broadcast(&mut actions, everyone, self.roster_update())?;
        push_broadcast(
            &mut actions,
            others,
            Payload::ParticipantJoined(ParticipantJoined { session_id, display_name }),
        )?;

        Ok(actions)
    }

    fn handle_create_group(
        &mut self,
        session_id: u64,
        request_id: u32,
        raw_name: &str,
    ) -> Result<Actions<E>, DriverError> {
        let creator = match self.actor(session_id, "create a group") {
            Ok(name) => name,
            Err(e) => return self.reject(session_id, request_id, ErrorPayload::validation(e.to_string())),
        };

        let name = match validate::group_name(raw_name) {
            Ok(name) => name,
            Err(e) => return self.reject(session_id, request_id, ErrorPayload::validation(e.to_string())),
        };

        let now_ms = self.env.wall_clock_millis();
        match self.groups.create(&name, session_id, &creator, now_ms) {
            Ok(()) => {},
            Err(GroupError::AlreadyExists(_)) => {
                return self.reject(session_id, request_id, ErrorPayload::conflict("Group already exists"));
            },
            Err(e @ GroupError::Reserved(_)) => {
                return self.reject(session_id, request_id, ErrorPayload::validation(e.to_string()));
            },
            Err(e) => return Err(e.into()),
        }

        self.directory.subscribe(session_id, &name)?;
        self.content.open_feed(&name);

        let mut actions = vec![self.log(
            LogLevel::Info,
            format!("group {name:?} created by session {session_id} ({creator:?})"),
        )];

        let everyone = self.directory.session_ids();
        push_broadcast(
            &mut actions,
            everyone.clone(),
            Payload::GroupCreated(GroupCreated { name, creator }),
        )?;
        push_broadcast(&mut actions, everyone, self.group_name_list())?;

        Ok(actions)
    }

    /// joinGroup: unknown names are ignored. A repeat join re-sends the feed
    /// without notifying anyone.
    fn handle_join_group(
        &mut self,
        session_id: u64,
        request_id: u32,
        raw_name: &str,
    ) -> Result<Actions<E>, DriverError> {
        let display_name = match self.actor(session_id, "join a group") {
            Ok(name) => name,
            Err(e) => return self.reject(session_id, request_id, ErrorPayload::validation(e.to_string())),
        };

        let name = raw_name.trim();
        let newly_joined = match self.groups.join(name, session_id) {
            Ok(newly_joined) => newly_joined,
            Err(GroupError::NotFound(_)) => {
                return Ok(vec![self.log(
                    LogLevel::Debug,
                    format!("session {session_id} asked to join unknown group {name:?}"),
                )]);
            },
            Err(e) => return Err(e.into()),
        };
        self.directory.subscribe(session_id, name)?;

        let feed = GroupFeed {
            name: name.to_string(),
            items: self.content.feed_for(&Scope::Group(name.to_string())),
        };
        let mut actions = vec![
            self.log(LogLevel::Debug, format!("session {session_id} joined group {name:?}")),
            self.reply(session_id, request_id, Payload::GroupFeed(feed))?,
        ];

        if newly_joined {
            let others =
                self.groups.members(name)?.into_iter().filter(|id| *id != session_id).collect();
            push_broadcast(
                &mut actions,
                others,
                Payload::GroupJoinerNotice(GroupJoinerNotice {
                    group: name.to_string(),
                    display_name,
                }),
            )?;
        }

        Ok(actions)
    }

    /// publish: record the item, acknowledge the publisher and fan the item
    /// out to its scope. Group items reach the group's current members; an
    /// item for a group that does not exist is stored but reaches nobody.
    fn handle_content_published(
        &mut self,
        session_id: u64,
        request_id: u32,
        scope: Scope,
        caption: Option<String>,
        asset_ref: String,
    ) -> Result<Actions<E>, DriverError> {
        if !self.connections.contains_key(&session_id) {
            return Ok(vec![self.log(
                LogLevel::Warn,
                format!("upload {asset_ref} from closed session {session_id} dropped"),
            )]);
        }

        let author = match self.actor(session_id, "publish") {
            Ok(name) => name,
            Err(e) => return self.reject(session_id, request_id, ErrorPayload::validation(e.to_string())),
        };

        let caption = match validate::caption(caption.as_deref()) {
            Ok(caption) => caption,
            Err(e) => return self.reject(session_id, request_id, ErrorPayload::validation(e.to_string())),
        };

        let scope = match scope {
            Scope::Group(name) if name.trim().is_empty() => {
                let error = ErrorPayload::validation("group name must not be blank");
                return self.reject(session_id, request_id, error);
            },
            Scope::Group(name) => Scope::from_name(name.trim()),
            Scope::Global => Scope::Global,
        };

        let now_ms = self.env.wall_clock_millis();
        let item = self.content.publish(NewContent { author, scope, caption, asset_ref }, now_ms);

        let recipients = match &item.scope {
            Scope::Global => self.directory.session_ids(),
            Scope::Group(name) => match self.groups.members(name) {
                Ok(members) => members,
                Err(GroupError::NotFound(_)) => Vec::new(),
                Err(e) => return Err(e.into()),
            },
        };

        let mut actions = vec![
            self.log(
                LogLevel::Info,
                format!(
                    "content {} published to {} by session {session_id} ({} recipients)",
                    item.id,
                    item.scope,
                    recipients.len()
                ),
            ),
            self.reply(
                session_id,
                request_id,
                Payload::PublishAccepted(PublishAccepted {
                    content_id: item.id,
                    asset_ref: item.asset_ref.clone(),
                }),
            )?,
        ];
        push_broadcast(&mut actions, recipients, Payload::NewContent(content::NewContent { item }))?;

        Ok(actions)
    }

    /// addComment: comments go to every joined participant regardless of the
    /// item's scope. Unknown items are ignored.
    fn handle_add_comment(
        &mut self,
        session_id: u64,
        request_id: u32,
        content_id: ContentId,
        raw_text: &str,
    ) -> Result<Actions<E>, DriverError> {
        let author = match self.actor(session_id, "comment") {
            Ok(name) => name,
            Err(e) => return self.reject(session_id, request_id, ErrorPayload::validation(e.to_string())),
        };

        let text = match validate::comment_text(raw_text) {
            Ok(text) => text,
            Err(e) => return self.reject(session_id, request_id, ErrorPayload::validation(e.to_string())),
        };

        let now_ms = self.env.wall_clock_millis();
        let comment = match self.content.add_comment(content_id, author, text, now_ms) {
            Ok(comment) => comment,
            Err(ContentError::NotFound(id)) => {
                return Ok(vec![self.log(
                    LogLevel::Debug,
                    format!("session {session_id} commented on unknown content {id}"),
                )]);
            },
        };

        let mut actions = vec![self.log(
            LogLevel::Debug,
            format!("session {session_id} commented on content {content_id}"),
        )];
        push_broadcast(
            &mut actions,
            self.directory.session_ids(),
            Payload::NewComment(content::NewComment { content_id, comment }),
        )?;

        Ok(actions)
    }

    /// Disconnect cleanup. Idempotent: a second close for the same session is
    /// a no-op.
    fn handle_disconnect(&mut self, session_id: u64, reason: &str) -> Result<Actions<E>, DriverError> {
        let now = self.env.now();

        let Some(mut conn) = self.connections.remove(&session_id) else {
            return Ok(vec![self.log(LogLevel::Debug, format!("session {session_id} already closed"))]);
        };
        let was_joined = conn.is_joined();
        conn.close();

        let mut actions = vec![self.log(
            LogLevel::Info,
            format!("session {session_id} closed after {:?}: {reason}", conn.age(now)),
        )];

        if !was_joined {
            return Ok(actions);
        }

        let participant = self.directory.unregister(session_id)?;
        let left = self.groups.leave_all(session_id, participant.groups.iter().map(String::as_str));
        actions.push(self.log(
            LogLevel::Debug,
            format!("session {session_id} removed from {left} group(s)"),
        ));

        let remaining = self.directory.session_ids();
        push_broadcast(
            &mut actions,
            remaining.clone(),
            Payload::ParticipantLeft(ParticipantLeft {
                session_id,
                display_name: participant.display_name,
            }),
        )?;
        push_broadcast(&mut actions, remaining, self.roster_update())?;

        Ok(actions)
    }

    /// Display name of a joined session.
    fn actor(&self, session_id: u64, operation: &'static str) -> Result<String, ConnectionError> {
        self.connections.get(&session_id).map_or(
            Err(ConnectionError::InvalidState { state: ConnectionState::Closed, operation }),
            |conn| conn.require_joined(operation).map(str::to_string),
        )
    }

    fn roster_update(&self) -> Payload {
        Payload::RosterUpdate(RosterUpdate { participants: self.directory.snapshot() })
    }

    fn group_name_list(&self) -> Payload {
        Payload::GroupNameList(GroupNameList { names: self.groups.list_names() })
    }

    fn reply(
        &self,
        session_id: u64,
        request_id: u32,
        payload: Payload,
    ) -> Result<ServerAction<E::Instant>, DriverError> {
        Ok(ServerAction::SendToSession { session_id, frame: payload.into_frame_for(request_id)? })
    }

    fn reject(
        &self,
        session_id: u64,
        request_id: u32,
        error: ErrorPayload,
    ) -> Result<Actions<E>, DriverError> {
        let message =
            format!("request {request_id} from session {session_id} rejected: {}", error.message);
        Ok(vec![
            self.log(LogLevel::Warn, message),
            self.reply(session_id, request_id, Payload::Error(error))?,
        ])
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) -> ServerAction<E::Instant> {
        ServerAction::Log { level, message: message.into(), timestamp: self.env.now() }
    }

    /// Whether the session has completed a join.
    pub fn is_joined(&self, session_id: u64) -> bool {
        self.connections.get(&session_id).is_some_and(Connection::is_joined)
    }

    /// Number of open connections, joined or not.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of joined participants.
    pub fn participant_count(&self) -> usize {
        self.directory.participant_count()
    }

    /// Membership directory.
    pub fn directory(&self) -> &MembershipDirectory {
        &self.directory
    }

    /// Group registry.
    pub fn groups(&self) -> &GroupRegistry {
        &self.groups
    }

    /// Content store.
    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    /// Environment.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Driver configuration.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }
}

fn push_broadcast<I>(
    actions: &mut Vec<ServerAction<I>>,
    recipients: Vec<u64>,
    payload: Payload,
) -> Result<(), DriverError> {
    if recipients.is_empty() {
        return Ok(());
    }
    actions.push(ServerAction::Broadcast { recipients, frame: payload.into_frame_for(0)? });
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use snapshare_proto::payloads::session::Join;

    use super::*;

    #[derive(Clone)]
    struct TestEnv;

    impl Environment for TestEnv {
        type Instant = std::time::Instant;

        #[allow(clippy::disallowed_methods)]
        fn now(&self) -> Self::Instant {
            std::time::Instant::now()
        }

        fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            async {}
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            use rand::RngCore;
            rand::thread_rng().fill_bytes(buffer);
        }

        fn wall_clock_millis(&self) -> u64 {
            1_700_000_000_000
        }
    }

    fn join_frame(name: &str, request_id: u32) -> Frame {
        Payload::Join(Join { display_name: name.to_string() }).into_frame_for(request_id).unwrap()
    }

    #[test]
    fn server_accepts_connection() {
        let mut server = ServerDriver::new(TestEnv, DriverConfig::default());

        let actions =
            server.process_event(ServerEvent::ConnectionAccepted { session_id: 1 }).unwrap();

        assert_eq!(server.connection_count(), 1);
        assert_eq!(server.participant_count(), 0);
        assert!(matches!(actions[0], ServerAction::Log { level: LogLevel::Debug, .. }));
    }

    #[test]
    fn server_rejects_when_max_connections_exceeded() {
        let config = DriverConfig { max_connections: 2, ..Default::default() };
        let mut server = ServerDriver::new(TestEnv, config);

        server.process_event(ServerEvent::ConnectionAccepted { session_id: 1 }).unwrap();
        server.process_event(ServerEvent::ConnectionAccepted { session_id: 2 }).unwrap();

        let actions =
            server.process_event(ServerEvent::ConnectionAccepted { session_id: 3 }).unwrap();

        assert_eq!(server.connection_count(), 2);
        assert!(matches!(actions.last(), Some(ServerAction::CloseConnection { session_id: 3, .. })));
    }

    #[test]
    fn duplicate_session_id_is_an_error() {
        let mut server = ServerDriver::new(TestEnv, DriverConfig::default());
        server.process_event(ServerEvent::ConnectionAccepted { session_id: 1 }).unwrap();

        let result = server.process_event(ServerEvent::ConnectionAccepted { session_id: 1 });

        assert!(matches!(result, Err(DriverError::SessionAlreadyExists(1))));
    }

    #[test]
    fn frame_from_unknown_session_is_an_error() {
        let mut server = ServerDriver::new(TestEnv, DriverConfig::default());

        let result = server
            .process_event(ServerEvent::FrameReceived { session_id: 9, frame: join_frame("ada", 1) });

        assert!(matches!(result, Err(DriverError::SessionNotFound(9))));
    }

    #[test]
    fn seeds_open_groups_and_feeds() {
        let config = DriverConfig {
            seed_groups: vec!["Friends".to_string(), "  ".to_string(), "all".to_string()],
            ..Default::default()
        };
        let server = ServerDriver::new(TestEnv, config);

        assert_eq!(server.groups().list_names(), vec!["Friends".to_string()]);
        assert!(server.content().has_feed("Friends"));
    }

    #[test]
    fn join_marks_session_joined() {
        let mut server = ServerDriver::new(TestEnv, DriverConfig::default());
        server.process_event(ServerEvent::ConnectionAccepted { session_id: 1 }).unwrap();

        server
            .process_event(ServerEvent::FrameReceived { session_id: 1, frame: join_frame(" ada ", 1) })
            .unwrap();

        assert!(server.is_joined(1));
        assert_eq!(server.directory().display_name(1), Some("ada"));
    }

    #[test]
    fn close_is_idempotent() {
        let mut server = ServerDriver::new(TestEnv, DriverConfig::default());
        server.process_event(ServerEvent::ConnectionAccepted { session_id: 1 }).unwrap();
        server
            .process_event(ServerEvent::FrameReceived { session_id: 1, frame: join_frame("ada", 1) })
            .unwrap();

        let close = || ServerEvent::ConnectionClosed { session_id: 1, reason: "eof".to_string() };
        server.process_event(close()).unwrap();
        let second = server.process_event(close()).unwrap();

        assert_eq!(server.connection_count(), 0);
        assert_eq!(server.participant_count(), 0);
        assert!(second.iter().all(|a| matches!(a, ServerAction::Log { .. })));
    }
}
