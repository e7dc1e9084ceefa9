//! Embercast Protocol -- CastV2 wire types, frame codec, ephemeral TLS identity.
//!
//! TLS over TCP, 4-byte big-endian length prefix + protobuf CastMessage.
//! JSON payloads inside the envelope are decoded per-namespace.

pub mod cast;
pub mod codec;
pub mod payloads;
pub mod tls;
pub mod x509;

pub use cast::{CastMessage, PayloadType, ProtocolVersion};
pub use codec::CastCodec;
pub use x509::CertBundle;

/// Maximum CastV2 frame size: 1 MiB. Anything larger kills the connection.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum display WebSocket payload size: 64 KiB.
pub const WS_MAX_PAYLOAD: usize = 64 * 1024;

/// Display WebSocket ping interval in seconds.
pub const WS_HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Signaling session reaper tick in seconds.
pub const SIGNALING_REAP_INTERVAL_SECS: u64 = 15;

/// Signaling session idle timeout in milliseconds.
pub const SIGNALING_IDLE_TIMEOUT_MS: u64 = 60_000;

/// App id of the Default Media Receiver -- the one fictitious app we run.
pub const DEFAULT_MEDIA_RECEIVER_APP_ID: &str = "CC1AD845";

/// Bitmask of media commands we advertise (pause/seek/volume/mute/skip...).
pub const SUPPORTED_MEDIA_COMMANDS: u32 = 0x7F;

/// Volume slider granularity advertised in receiver status.
pub const VOLUME_STEP_INTERVAL: f64 = 0.05;

pub const NS_CONNECTION: &str = "urn:x-cast:com.google.cast.tp.connection";
pub const NS_HEARTBEAT: &str = "urn:x-cast:com.google.cast.tp.heartbeat";
pub const NS_RECEIVER: &str = "urn:x-cast:com.google.cast.receiver";
pub const NS_MEDIA: &str = "urn:x-cast:com.google.cast.media";
pub const NS_WEBRTC: &str = "urn:x-cast:com.google.cast.webrtc";
pub const NS_REMOTING: &str = "urn:x-cast:com.google.cast.remoting";
pub const NS_DEBUGOVERLAY: &str = "urn:x-cast:com.google.cast.debugoverlay";

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },
    #[error("protobuf encode error: {0}")]
    Encode(#[from] prost::EncodeError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
