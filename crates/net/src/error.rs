use thiserror::Error;

use crate::relay::ChannelState;

#[derive(Error, Debug)]
pub enum NetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("channel {topic} is {state:?}")]
    NotJoined { topic: String, state: ChannelState },
    #[error("relay connection closed")]
    Disconnected,
}
