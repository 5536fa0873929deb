//! TCP relay server
//!
//! Line-delimited JSON pub/sub with per-topic presence. Every connection gets a
//! reader loop and a writer task; topics fan publishes out to all of their
//! subscribers, the publisher included. Presence entries belong to the
//! connection that tracked them and vanish with it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, info, warn};

use crate::protocol::{parse_request, RelayPush, RelayRequest};
use crate::relay::PresenceState;

/// Longest request line accepted, newline excluded
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Server configuration
#[derive(Debug, Clone)]
pub struct RelayServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RelayServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
        }
    }
}

impl RelayServerConfig {
    /// Create from `TETRIS_RELAY_HOST` / `TETRIS_RELAY_PORT`
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let host = env::var("TETRIS_RELAY_HOST")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.host);
        let port = env::var("TETRIS_RELAY_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        Self { host, port }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid relay address {}:{}", self.host, self.port))
    }

    /// Check if the relay is disabled via environment
    pub fn is_disabled() -> bool {
        std::env::var("TETRIS_RELAY_DISABLED")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false)
    }
}

type ConnId = usize;

#[derive(Debug, Default)]
struct Topic {
    subscribers: BTreeSet<ConnId>,
    presence: BTreeMap<String, (ConnId, Value)>,
}

impl Topic {
    fn presence_state(&self) -> PresenceState {
        self.presence
            .iter()
            .map(|(key, (_, meta))| (key.clone(), meta.clone()))
            .collect()
    }
}

/// Shared server state
#[derive(Default)]
struct RelayState {
    connections: HashMap<ConnId, mpsc::UnboundedSender<RelayPush>>,
    topics: HashMap<String, Topic>,
}

impl RelayState {
    fn push(&self, conn: ConnId, push: RelayPush) {
        if let Some(tx) = self.connections.get(&conn) {
            let _ = tx.send(push);
        }
    }

    fn fan_out(&self, topic: &str, push: RelayPush) {
        if let Some(t) = self.topics.get(topic) {
            for conn in &t.subscribers {
                self.push(*conn, push.clone());
            }
        }
    }

    fn broadcast_presence(&self, topic: &str) {
        if let Some(t) = self.topics.get(topic) {
            self.fan_out(
                topic,
                RelayPush::Presence {
                    topic: topic.to_string(),
                    state: t.presence_state(),
                },
            );
        }
    }

    fn is_subscribed(&self, conn: ConnId, topic: &str) -> bool {
        self.topics
            .get(topic)
            .map(|t| t.subscribers.contains(&conn))
            .unwrap_or(false)
    }

    /// Remove `conn` from `topic`; true if its presence changed the map
    fn leave_topic(&mut self, conn: ConnId, topic: &str) -> bool {
        let Some(t) = self.topics.get_mut(topic) else {
            return false;
        };
        t.subscribers.remove(&conn);
        let before = t.presence.len();
        t.presence.retain(|_, (owner, _)| *owner != conn);
        let changed = t.presence.len() != before;
        if t.subscribers.is_empty() && t.presence.is_empty() {
            self.topics.remove(topic);
        }
        changed
    }

    fn handle(&mut self, conn: ConnId, request: RelayRequest) {
        match request {
            RelayRequest::Subscribe { topic } => {
                let t = self.topics.entry(topic.clone()).or_default();
                t.subscribers.insert(conn);
                let state = t.presence_state();
                self.push(conn, RelayPush::Subscribed { topic: topic.clone() });
                self.push(conn, RelayPush::Presence { topic, state });
            }
            RelayRequest::Unsubscribe { topic } => {
                if self.leave_topic(conn, &topic) {
                    self.broadcast_presence(&topic);
                }
            }
            RelayRequest::Publish { topic, payload } => {
                if !self.is_subscribed(conn, &topic) {
                    self.reject(conn, format!("not subscribed to {topic}"));
                    return;
                }
                self.fan_out(
                    &topic,
                    RelayPush::Message {
                        topic: topic.clone(),
                        payload,
                    },
                );
            }
            RelayRequest::Track { topic, key, meta } => {
                if !self.is_subscribed(conn, &topic) {
                    self.reject(conn, format!("not subscribed to {topic}"));
                    return;
                }
                if let Some(t) = self.topics.get_mut(&topic) {
                    t.presence.insert(key, (conn, meta));
                }
                self.broadcast_presence(&topic);
            }
            RelayRequest::Untrack { topic, key } => {
                let removed = match self.topics.get_mut(&topic) {
                    Some(t) => {
                        let owned = matches!(t.presence.get(&key), Some((owner, _)) if *owner == conn);
                        owned && t.presence.remove(&key).is_some()
                    }
                    None => false,
                };
                if removed {
                    self.broadcast_presence(&topic);
                }
            }
        }
    }

    fn reject(&self, conn: ConnId, message: String) {
        debug!(conn, %message, "rejecting request");
        self.push(conn, RelayPush::Error { message });
    }

    fn disconnect(&mut self, conn: ConnId) {
        self.connections.remove(&conn);
        let topics: Vec<String> = self
            .topics
            .iter()
            .filter(|(_, t)| t.subscribers.contains(&conn) || t.presence.values().any(|(o, _)| *o == conn))
            .map(|(name, _)| name.clone())
            .collect();
        for topic in topics {
            if self.leave_topic(conn, &topic) {
                self.broadcast_presence(&topic);
            }
        }
    }
}

/// Run the relay until the listener fails.
///
/// `ready_tx` receives the bound address once the listener is up (port 0 picks
/// a free port).
pub async fn run_relay_server(
    config: RelayServerConfig,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    if RelayServerConfig::is_disabled() {
        info!("relay disabled via TETRIS_RELAY_DISABLED");
        return Ok(());
    }

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(&addr).await?;
    let bound = listener.local_addr()?;
    info!(%bound, "relay listening");
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let state = Arc::new(RwLock::new(RelayState::default()));
    let mut conn_id_counter: ConnId = 0;

    // Accept incoming connections
    loop {
        let (socket, peer) = listener.accept().await?;
        conn_id_counter += 1;
        let conn_id = conn_id_counter;
        info!(conn_id, %peer, "client connected");

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, conn_id, Arc::clone(&state)).await {
                warn!(conn_id, error = %e, "client error");
            }
            state.write().await.disconnect(conn_id);
            info!(conn_id, "client disconnected");
        });
    }
}

/// Handle a single client connection
async fn handle_connection(
    socket: TcpStream,
    conn_id: ConnId,
    state: Arc<RwLock<RelayState>>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = tokio::io::split(socket);
    let mut reader = BufReader::new(reader);

    // Channel to send pushes to this client
    let (tx, mut rx) = mpsc::unbounded_channel::<RelayPush>();
    state.write().await.connections.insert(conn_id, tx);

    let write_task = tokio::spawn(async move {
        let mut buf: Vec<u8> = Vec::with_capacity(4096);
        while let Some(push) = rx.recv().await {
            buf.clear();
            if serde_json::to_writer(&mut buf, &push).is_err() {
                continue;
            }
            buf.push(b'\n');
            if writer.write_all(&buf).await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    let mut line: Vec<u8> = Vec::with_capacity(1024);
    let result = loop {
        line.clear();
        let limit = (MAX_LINE_BYTES + 1) as u64;
        let bytes_read = match (&mut reader).take(limit).read_until(b'\n', &mut line).await {
            Ok(n) => n,
            Err(e) => break Err(e.into()),
        };
        if bytes_read == 0 {
            // Client disconnected
            break Ok(());
        }

        if line.last() != Some(&b'\n') && line.len() > MAX_LINE_BYTES {
            warn!(conn_id, "request line too long");
            state
                .read()
                .await
                .reject(conn_id, format!("request exceeds {MAX_LINE_BYTES} bytes"));
            if let Err(e) = discard_line(&mut reader).await {
                break Err(e.into());
            }
            continue;
        }

        let text = match std::str::from_utf8(&line) {
            Ok(text) => text,
            Err(e) => {
                state
                    .read()
                    .await
                    .reject(conn_id, format!("malformed request: {e}"));
                continue;
            }
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }

        match parse_request(trimmed) {
            Ok(request) => state.write().await.handle(conn_id, request),
            Err(e) => state
                .read()
                .await
                .reject(conn_id, format!("malformed request: {e}")),
        }
    };

    write_task.abort();
    result
}

/// Skip input up to and including the next newline
async fn discard_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<()> {
    loop {
        let chunk = reader.fill_buf().await?;
        if chunk.is_empty() {
            return Ok(());
        }
        if let Some(pos) = chunk.iter().position(|&b| b == b'\n') {
            reader.consume(pos + 1);
            return Ok(());
        }
        let len = chunk.len();
        reader.consume(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn connect(state: &mut RelayState, conn: ConnId) -> mpsc::UnboundedReceiver<RelayPush> {
        let (tx, rx) = mpsc::unbounded_channel();
        state.connections.insert(conn, tx);
        rx
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<RelayPush>) -> Vec<RelayPush> {
        let mut out = Vec::new();
        while let Ok(p) = rx.try_recv() {
            out.push(p);
        }
        out
    }

    #[test]
    fn test_config_defaults() {
        let config = RelayServerConfig::default();
        assert_eq!(config.socket_addr().unwrap().port(), 7878);

        let bad = RelayServerConfig {
            host: "not an ip".into(),
            port: 1,
        };
        assert!(bad.socket_addr().is_err());
    }

    #[test]
    fn test_publish_fans_out_to_subscribers_only() {
        let mut state = RelayState::default();
        let mut a = connect(&mut state, 1);
        let mut b = connect(&mut state, 2);
        let mut c = connect(&mut state, 3);

        state.handle(1, RelayRequest::Subscribe { topic: "room:x".into() });
        state.handle(2, RelayRequest::Subscribe { topic: "room:x".into() });
        drain(&mut a);
        drain(&mut b);

        state.handle(
            1,
            RelayRequest::Publish {
                topic: "room:x".into(),
                payload: json!({"hi": 1}),
            },
        );

        let expected = RelayPush::Message {
            topic: "room:x".into(),
            payload: json!({"hi": 1}),
        };
        assert_eq!(drain(&mut a), vec![expected.clone()]);
        assert_eq!(drain(&mut b), vec![expected]);
        assert!(drain(&mut c).is_empty());
    }

    #[test]
    fn test_publish_without_subscription_is_rejected() {
        let mut state = RelayState::default();
        let mut a = connect(&mut state, 1);
        state.handle(
            1,
            RelayRequest::Publish {
                topic: "room:x".into(),
                payload: json!(null),
            },
        );
        assert!(matches!(drain(&mut a).as_slice(), [RelayPush::Error { .. }]));
    }

    #[test]
    fn test_presence_is_released_on_disconnect() {
        let mut state = RelayState::default();
        let mut watcher = connect(&mut state, 1);
        let _host = connect(&mut state, 2);
        state.handle(1, RelayRequest::Subscribe { topic: "lobby".into() });
        state.handle(2, RelayRequest::Subscribe { topic: "lobby".into() });
        state.handle(
            2,
            RelayRequest::Track {
                topic: "lobby".into(),
                key: "host".into(),
                meta: json!({"id": "room-1"}),
            },
        );
        drain(&mut watcher);

        state.disconnect(2);

        let pushes = drain(&mut watcher);
        match pushes.last() {
            Some(RelayPush::Presence { state, .. }) => assert!(state.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_untrack_ignores_foreign_keys() {
        let mut state = RelayState::default();
        let _a = connect(&mut state, 1);
        let _b = connect(&mut state, 2);
        state.handle(1, RelayRequest::Subscribe { topic: "lobby".into() });
        state.handle(2, RelayRequest::Subscribe { topic: "lobby".into() });
        state.handle(
            1,
            RelayRequest::Track {
                topic: "lobby".into(),
                key: "k".into(),
                meta: json!(1),
            },
        );
        state.handle(
            2,
            RelayRequest::Untrack {
                topic: "lobby".into(),
                key: "k".into(),
            },
        );
        assert_eq!(state.topics["lobby"].presence.len(), 1);
    }
}
