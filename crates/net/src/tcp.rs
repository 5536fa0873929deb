//! TCP relay client.
//!
//! Bridges the synchronous driver with an async connection to the relay
//! server: a private tokio runtime runs one link task per connection, and the
//! two sides talk over unbounded mpsc channels that [`Relay::poll`] drains
//! without blocking.

use std::collections::HashMap;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::NetError;
use crate::protocol::{RelayPush, RelayRequest};
use crate::relay::{ChannelState, Relay, RelayNotice};

#[derive(Debug)]
enum LinkEvent {
    Push(RelayPush),
    Disconnected(String),
}

struct Link {
    out_tx: mpsc::UnboundedSender<RelayRequest>,
    in_rx: mpsc::UnboundedReceiver<LinkEvent>,
}

/// [`Relay`] over a line-delimited JSON TCP connection.
///
/// The connection is opened lazily by the first subscribe. When it drops, every
/// live topic turns [`ChannelState::Errored`]; the next subscribe reconnects.
pub struct TcpRelay {
    rt: Runtime,
    addr: String,
    link: Option<Link>,
    channels: HashMap<String, ChannelState>,
}

impl TcpRelay {
    pub fn new(addr: impl Into<String>) -> Result<Self, NetError> {
        Ok(Self {
            rt: Runtime::new()?,
            addr: addr.into(),
            link: None,
            channels: HashMap::new(),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    fn ensure_link(&mut self) {
        if self.link.is_some() {
            return;
        }
        let (out_tx, out_rx) = mpsc::unbounded_channel::<RelayRequest>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<LinkEvent>();
        info!(addr = %self.addr, "connecting to relay");
        self.rt.spawn(run_link(self.addr.clone(), out_rx, in_tx));
        self.link = Some(Link { out_tx, in_rx });
    }

    fn send(&self, request: RelayRequest) -> Result<(), NetError> {
        let link = self.link.as_ref().ok_or(NetError::Disconnected)?;
        link.out_tx.send(request).map_err(|_| NetError::Disconnected)
    }

    fn require_joined(&self, topic: &str) -> Result<(), NetError> {
        match self.channel_state(topic) {
            ChannelState::Joined => Ok(()),
            state => Err(NetError::NotJoined {
                topic: topic.to_string(),
                state,
            }),
        }
    }
}

impl Relay for TcpRelay {
    fn subscribe(&mut self, topic: &str) -> Result<(), NetError> {
        self.ensure_link();
        self.channels
            .insert(topic.to_string(), ChannelState::Joining);
        self.send(RelayRequest::Subscribe {
            topic: topic.to_string(),
        })
    }

    fn unsubscribe(&mut self, topic: &str) -> Result<(), NetError> {
        self.channels.remove(topic);
        if self.link.is_none() {
            return Ok(());
        }
        self.send(RelayRequest::Unsubscribe {
            topic: topic.to_string(),
        })
    }

    fn publish(&mut self, topic: &str, payload: Value) -> Result<(), NetError> {
        self.require_joined(topic)?;
        self.send(RelayRequest::Publish {
            topic: topic.to_string(),
            payload,
        })
    }

    fn channel_state(&self, topic: &str) -> ChannelState {
        self.channels
            .get(topic)
            .copied()
            .unwrap_or(ChannelState::Closed)
    }

    fn track(&mut self, topic: &str, key: &str, meta: Value) -> Result<(), NetError> {
        self.require_joined(topic)?;
        self.send(RelayRequest::Track {
            topic: topic.to_string(),
            key: key.to_string(),
            meta,
        })
    }

    fn untrack(&mut self, topic: &str, key: &str) -> Result<(), NetError> {
        if self.link.is_none() {
            return Ok(());
        }
        self.send(RelayRequest::Untrack {
            topic: topic.to_string(),
            key: key.to_string(),
        })
    }

    fn poll(&mut self) -> Vec<RelayNotice> {
        let mut notices = Vec::new();
        let mut lost: Option<String> = None;

        if let Some(link) = self.link.as_mut() {
            loop {
                match link.in_rx.try_recv() {
                    Ok(LinkEvent::Push(push)) => match push {
                        RelayPush::Subscribed { topic } => {
                            if self.channels.get(&topic) == Some(&ChannelState::Joining) {
                                self.channels.insert(topic.clone(), ChannelState::Joined);
                                notices.push(RelayNotice::Subscribed { topic });
                            }
                        }
                        RelayPush::Message { topic, payload } => {
                            notices.push(RelayNotice::Message { topic, payload });
                        }
                        RelayPush::Presence { topic, state } => {
                            notices.push(RelayNotice::Presence { topic, state });
                        }
                        RelayPush::Error { message } => {
                            warn!(%message, "relay rejected a request");
                        }
                    },
                    Ok(LinkEvent::Disconnected(reason)) => {
                        lost = Some(reason);
                        break;
                    }
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        lost = Some("link task ended".to_string());
                        break;
                    }
                }
            }
        }

        if let Some(reason) = lost {
            warn!(addr = %self.addr, %reason, "relay connection lost");
            self.link = None;
            for (topic, state) in self.channels.iter_mut() {
                if state.is_healthy() {
                    *state = ChannelState::Errored;
                    notices.push(RelayNotice::Closed {
                        topic: topic.clone(),
                    });
                }
            }
        }

        notices
    }
}

/// Own one connection: forward requests out, pushes in.
async fn run_link(
    addr: String,
    mut out_rx: mpsc::UnboundedReceiver<RelayRequest>,
    in_tx: mpsc::UnboundedSender<LinkEvent>,
) {
    let stream = match TcpStream::connect(&addr).await {
        Ok(s) => s,
        Err(e) => {
            let _ = in_tx.send(LinkEvent::Disconnected(e.to_string()));
            return;
        }
    };
    debug!(%addr, "relay link up");

    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut buf: Vec<u8> = Vec::with_capacity(1024);

    loop {
        tokio::select! {
            request = out_rx.recv() => {
                // The relay handle was dropped.
                let Some(request) = request else { break };
                buf.clear();
                if serde_json::to_writer(&mut buf, &request).is_err() {
                    continue;
                }
                buf.push(b'\n');
                if let Err(e) = writer.write_all(&buf).await {
                    let _ = in_tx.send(LinkEvent::Disconnected(e.to_string()));
                    return;
                }
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<RelayPush>(trimmed) {
                            Ok(push) => {
                                let _ = in_tx.send(LinkEvent::Push(push));
                            }
                            Err(e) => debug!(error = %e, "dropping malformed relay push"),
                        }
                    }
                    Ok(None) => {
                        let _ = in_tx.send(LinkEvent::Disconnected("closed by relay".to_string()));
                        return;
                    }
                    Err(e) => {
                        let _ = in_tx.send(LinkEvent::Disconnected(e.to_string()));
                        return;
                    }
                }
            }
        }
    }
}
