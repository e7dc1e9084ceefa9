//! Per-connection receiver state.
//!
//! Each accepted CastV2 connection owns one ReceiverSession: the fictitious
//! Default Media Receiver instance a sender talks to. Created on accept,
//! dropped on disconnect, mutated only by the owning connection task.

use uuid::Uuid;

use embercast_protocol::payloads::{
    MediaInformation, MediaStatusEntry, PlayerState, ReceiverStatus, VolumePatch,
};

/// Receiver-level volume block.
#[derive(Debug, Clone, Copy)]
pub struct VolumeState {
    pub level: f64,
    pub muted: bool,
}

/// Media-namespace state for the single virtual media session.
#[derive(Debug, Clone)]
pub struct MediaState {
    pub media_session_id: i64,
    pub media: Option<MediaInformation>,
    pub current_time: f64,
    pub player_state: PlayerState,
}

pub struct ReceiverSession {
    session_id: String,
    transport_id: String,
    pub media: MediaState,
    pub volume: VolumeState,
}

impl ReceiverSession {
    pub fn new() -> Self {
        let session_id = Uuid::new_v4().to_string();
        let transport_id = format!("transport-{}", &session_id[..8]);

        Self {
            session_id,
            transport_id,
            media: MediaState {
                media_session_id: 1,
                media: None,
                current_time: 0.0,
                player_state: PlayerState::Idle,
            },
            volume: VolumeState {
                level: 1.0,
                muted: false,
            },
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn transport_id(&self) -> &str {
        &self.transport_id
    }

    pub fn receiver_status(&self) -> ReceiverStatus {
        ReceiverStatus::default_media_receiver(
            &self.session_id,
            &self.transport_id,
            self.volume.level,
            self.volume.muted,
        )
    }

    /// The one-element MEDIA_STATUS array.
    pub fn media_status(&self) -> Vec<MediaStatusEntry> {
        vec![MediaStatusEntry::new(
            self.media.media_session_id,
            self.media.player_state,
            self.media.current_time,
            self.volume.level,
            self.volume.muted,
            self.media.media.clone(),
        )]
    }

    /// LOAD: adopt the described media, start playing, bump the session id.
    pub fn load(&mut self, media: Option<MediaInformation>, current_time: Option<f64>) {
        self.media.media_session_id += 1;
        self.media.media = Some(media.unwrap_or_default());
        self.media.current_time = current_time.unwrap_or(0.0);
        self.media.player_state = PlayerState::Playing;
    }

    pub fn play(&mut self) {
        self.media.player_state = PlayerState::Playing;
    }

    pub fn pause(&mut self) {
        self.media.player_state = PlayerState::Paused;
    }

    pub fn seek(&mut self, current_time: Option<f64>) {
        self.media.current_time = current_time.unwrap_or(0.0);
    }

    /// STOP: back to an idle receiver with no media loaded.
    pub fn stop_media(&mut self) {
        self.media.player_state = PlayerState::Idle;
        self.media.media = None;
    }

    /// Apply a partial volume update; returns the effective level for the
    /// external volume command.
    pub fn apply_volume(&mut self, patch: Option<VolumePatch>) -> f64 {
        if let Some(patch) = patch {
            if let Some(level) = patch.level {
                self.volume.level = level;
            }
            if let Some(muted) = patch.muted {
                self.volume.muted = muted;
            }
        }
        self.volume.level
    }
}
