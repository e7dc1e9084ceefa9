//! Wire messages on the display WebSocket.
//!
//! Everything is JSON text frames. Commands flow bridge -> display; status
//! and signaling answers flow display -> bridge; senders identify themselves
//! with `sender-hello` and then speak the webrtc subset.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outbound command to the display client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DisplayCommand {
    Load {
        url: String,
        #[serde(rename = "contentType")]
        content_type: String,
        #[serde(rename = "currentTime")]
        current_time: f64,
        #[serde(rename = "requestId")]
        request_id: i64,
    },
    Play {
        #[serde(rename = "requestId")]
        request_id: i64,
    },
    Pause {
        #[serde(rename = "requestId")]
        request_id: i64,
    },
    Seek {
        #[serde(rename = "currentTime")]
        current_time: f64,
        #[serde(rename = "requestId")]
        request_id: i64,
    },
    Stop {
        #[serde(rename = "requestId")]
        request_id: i64,
    },
    Volume {
        volume: f64,
        #[serde(rename = "requestId")]
        request_id: i64,
    },
    WebrtcOffer {
        #[serde(rename = "sessionId")]
        session_id: String,
        sdp: String,
    },
    IceCandidate {
        #[serde(rename = "sessionId")]
        session_id: String,
        candidate: Value,
    },
    MirrorStop {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
}

impl DisplayCommand {
    /// The wire `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            DisplayCommand::Load { .. } => "load",
            DisplayCommand::Play { .. } => "play",
            DisplayCommand::Pause { .. } => "pause",
            DisplayCommand::Seek { .. } => "seek",
            DisplayCommand::Stop { .. } => "stop",
            DisplayCommand::Volume { .. } => "volume",
            DisplayCommand::WebrtcOffer { .. } => "webrtc-offer",
            DisplayCommand::IceCandidate { .. } => "ice-candidate",
            DisplayCommand::MirrorStop { .. } => "mirror-stop",
        }
    }
}

/// Playback state the display reports back. Informational only; the bridge
/// logs it and otherwise lets sender-driven state stand.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatus {
    pub player_state: Option<String>,
    pub current_time: Option<f64>,
    pub duration: Option<f64>,
    pub volume: Option<f64>,
}
