//! JSON payloads carried inside the CastV2 envelope, one tagged enum per
//! namespace.
//!
//! Inbound enums are internally tagged on `type` with an `Unknown` fallthrough
//! so unrecognized requests decode without error and produce no reply.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    DEFAULT_MEDIA_RECEIVER_APP_ID, NS_DEBUGOVERLAY, NS_MEDIA, NS_REMOTING, NS_WEBRTC,
    SUPPORTED_MEDIA_COMMANDS, VOLUME_STEP_INTERVAL,
};

// ============================================================================
// urn:x-cast:com.google.cast.tp.connection
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ConnectionRequest {
    #[serde(rename = "CONNECT")]
    Connect {
        #[serde(rename = "requestId", default)]
        request_id: i64,
    },
    #[serde(rename = "CLOSE")]
    Close,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ConnectionReply {
    #[serde(rename = "CONNECTED")]
    Connected {
        #[serde(rename = "requestId")]
        request_id: i64,
    },
}

// ============================================================================
// urn:x-cast:com.google.cast.tp.heartbeat
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum HeartbeatRequest {
    #[serde(rename = "PING")]
    Ping,
    #[serde(rename = "PONG")]
    Pong,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum HeartbeatReply {
    #[serde(rename = "PONG")]
    Pong,
}

// ============================================================================
// urn:x-cast:com.google.cast.receiver
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ReceiverRequest {
    #[serde(rename = "GET_STATUS")]
    GetStatus {
        #[serde(rename = "requestId", default)]
        request_id: i64,
    },
    #[serde(rename = "LAUNCH")]
    Launch {
        #[serde(rename = "requestId", default)]
        request_id: i64,
        #[serde(rename = "appId")]
        app_id: Option<String>,
    },
    #[serde(rename = "STOP")]
    Stop {
        #[serde(rename = "requestId", default)]
        request_id: i64,
    },
    #[serde(rename = "SET_VOLUME")]
    SetVolume {
        #[serde(rename = "requestId", default)]
        request_id: i64,
        volume: Option<VolumePatch>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ReceiverReply {
    #[serde(rename = "RECEIVER_STATUS")]
    ReceiverStatus {
        #[serde(rename = "requestId")]
        request_id: i64,
        status: ReceiverStatus,
    },
}

/// The "currently running application" view every sender is shown.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiverStatus {
    pub applications: Vec<ApplicationStatus>,
    pub volume: VolumeStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatus {
    pub app_id: String,
    pub display_name: String,
    pub is_idle_screen: bool,
    pub namespaces: Vec<NamespaceEntry>,
    pub session_id: String,
    pub status_text: String,
    pub transport_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamespaceEntry {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeStatus {
    pub control_type: String,
    pub level: f64,
    pub muted: bool,
    pub step_interval: f64,
}

impl ReceiverStatus {
    /// Status for the fictitious Default Media Receiver instance.
    pub fn default_media_receiver(
        session_id: &str,
        transport_id: &str,
        level: f64,
        muted: bool,
    ) -> Self {
        let namespaces = [NS_MEDIA, NS_WEBRTC, NS_REMOTING, NS_DEBUGOVERLAY]
            .iter()
            .map(|ns| NamespaceEntry {
                name: ns.to_string(),
            })
            .collect();

        Self {
            applications: vec![ApplicationStatus {
                app_id: DEFAULT_MEDIA_RECEIVER_APP_ID.to_string(),
                display_name: "Default Media Receiver".to_string(),
                is_idle_screen: false,
                namespaces,
                session_id: session_id.to_string(),
                status_text: "Ready To Cast".to_string(),
                transport_id: transport_id.to_string(),
            }],
            volume: VolumeStatus {
                control_type: "attenuation".to_string(),
                level,
                muted,
                step_interval: VOLUME_STEP_INTERVAL,
            },
        }
    }
}

// ============================================================================
// urn:x-cast:com.google.cast.media
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum MediaRequest {
    #[serde(rename = "GET_STATUS")]
    GetStatus {
        #[serde(rename = "requestId", default)]
        request_id: i64,
    },
    #[serde(rename = "LOAD")]
    Load {
        #[serde(rename = "requestId", default)]
        request_id: i64,
        media: Option<MediaInformation>,
        #[serde(rename = "currentTime")]
        current_time: Option<f64>,
    },
    #[serde(rename = "PLAY")]
    Play {
        #[serde(rename = "requestId", default)]
        request_id: i64,
    },
    #[serde(rename = "PAUSE")]
    Pause {
        #[serde(rename = "requestId", default)]
        request_id: i64,
    },
    #[serde(rename = "SEEK")]
    Seek {
        #[serde(rename = "requestId", default)]
        request_id: i64,
        #[serde(rename = "currentTime")]
        current_time: Option<f64>,
    },
    #[serde(rename = "STOP")]
    Stop {
        #[serde(rename = "requestId", default)]
        request_id: i64,
    },
    #[serde(rename = "SET_VOLUME", alias = "VOLUME")]
    SetVolume {
        #[serde(rename = "requestId", default)]
        request_id: i64,
        volume: Option<VolumePatch>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum MediaReply {
    #[serde(rename = "MEDIA_STATUS")]
    MediaStatus {
        #[serde(rename = "requestId")]
        request_id: i64,
        /// Always a one-element array.
        status: Vec<MediaStatusEntry>,
    },
}

/// What a sender asked us to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInformation {
    #[serde(rename = "contentId", default)]
    pub content_id: String,
    #[serde(rename = "contentType", default)]
    pub content_type: String,
    #[serde(rename = "streamType", default = "default_stream_type")]
    pub stream_type: String,
}

fn default_stream_type() -> String {
    "BUFFERED".to_string()
}

impl Default for MediaInformation {
    fn default() -> Self {
        Self {
            content_id: String::new(),
            content_type: String::new(),
            stream_type: default_stream_type(),
        }
    }
}

/// Partial volume update: either field may be absent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VolumePatch {
    pub level: Option<f64>,
    pub muted: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerState {
    Idle,
    Playing,
    Paused,
    Buffering,
}

impl PlayerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerState::Idle => "IDLE",
            PlayerState::Playing => "PLAYING",
            PlayerState::Paused => "PAUSED",
            PlayerState::Buffering => "BUFFERING",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaStatusEntry {
    pub media_session_id: i64,
    pub playback_rate: f64,
    pub player_state: PlayerState,
    pub current_time: f64,
    pub supported_media_commands: u32,
    pub volume: MediaVolume,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaInformation>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MediaVolume {
    pub level: f64,
    pub muted: bool,
}

impl MediaStatusEntry {
    pub fn new(
        media_session_id: i64,
        player_state: PlayerState,
        current_time: f64,
        level: f64,
        muted: bool,
        media: Option<MediaInformation>,
    ) -> Self {
        Self {
            media_session_id,
            playback_rate: 1.0,
            player_state,
            current_time,
            supported_media_commands: SUPPORTED_MEDIA_COMMANDS,
            volume: MediaVolume { level, muted },
            media,
        }
    }
}

// ============================================================================
// urn:x-cast:com.google.cast.webrtc
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum WebrtcRequest {
    #[serde(rename = "OFFER")]
    Offer {
        #[serde(rename = "seqNum", default)]
        seq_num: i64,
        offer: Option<SdpBody>,
    },
    #[serde(rename = "ICE_CANDIDATE")]
    IceCandidate {
        #[serde(rename = "seqNum", default)]
        seq_num: i64,
        candidate: Option<Value>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdpBody {
    #[serde(default)]
    pub sdp: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum WebrtcReply {
    #[serde(rename = "ANSWER")]
    Answer {
        #[serde(rename = "seqNum")]
        seq_num: i64,
        answer: SdpBody,
    },
    #[serde(rename = "ICE_CANDIDATE")]
    IceCandidate {
        #[serde(rename = "seqNum")]
        seq_num: i64,
        candidate: Value,
    },
}

// ============================================================================
// urn:x-cast:com.google.cast.remoting
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum RemotingRequest {
    #[serde(rename = "SETUP")]
    Setup {
        #[serde(rename = "requestId", default)]
        request_id: i64,
    },
    #[serde(rename = "START")]
    Start {
        #[serde(rename = "requestId", default)]
        request_id: i64,
    },
    #[serde(rename = "STOP")]
    Stop {
        #[serde(rename = "requestId", default)]
        request_id: i64,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum RemotingReply {
    #[serde(rename = "SETUP_OK")]
    SetupOk {
        #[serde(rename = "requestId")]
        request_id: i64,
    },
    #[serde(rename = "START_OK")]
    StartOk {
        #[serde(rename = "requestId")]
        request_id: i64,
    },
    #[serde(rename = "STOP_OK")]
    StopOk {
        #[serde(rename = "requestId")]
        request_id: i64,
    },
}
