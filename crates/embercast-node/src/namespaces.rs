//! Per-namespace dispatch for a CastV2 connection.
//!
//! Each inbound message is routed by namespace URN, its JSON payload decoded
//! into that namespace's tagged request enum, and replies are queued on the
//! connection's outbound channel with source/destination swapped. Unknown
//! namespaces, unknown types, and unparseable payloads produce no reply.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use embercast_display::DisplayCommand;
use embercast_protocol::payloads::{
    ConnectionReply, ConnectionRequest, HeartbeatReply, HeartbeatRequest, MediaReply,
    MediaRequest, ReceiverReply, ReceiverRequest, RemotingReply, RemotingRequest, SdpBody,
    WebrtcReply, WebrtcRequest,
};
use embercast_protocol::{
    CastMessage, NS_CONNECTION, NS_HEARTBEAT, NS_MEDIA, NS_RECEIVER, NS_REMOTING, NS_WEBRTC,
};

use crate::session::ReceiverSession;

/// One-shot consumer for the mirroring answer SDP.
pub type AnswerFn = Box<dyn FnOnce(String) + Send>;

/// Repeated consumer for display-side ICE candidates.
pub type CandidateFn = Arc<dyn Fn(Value) + Send + Sync>;

/// Callbacks a connection handler fires into the orchestrator. The closures
/// capture only write handles and session ids, never the connection itself.
pub struct SessionHooks {
    /// Media-control command for the display (load/play/pause/...).
    pub media_command: Arc<dyn Fn(DisplayCommand) + Send + Sync>,
    /// Mirroring offer: `(session_id, sdp, send_answer, send_candidate)`.
    pub webrtc_offer: Arc<dyn Fn(&str, &str, AnswerFn, CandidateFn) + Send + Sync>,
    /// Sender-side ICE candidate: `(session_id, candidate)`.
    pub ice_candidate: Arc<dyn Fn(&str, Value) + Send + Sync>,
    /// Remoting STOP: `(session_id)`.
    pub mirroring_stop: Arc<dyn Fn(&str) + Send + Sync>,
    /// Connection gone: `(session_id)`.
    pub disconnected: Arc<dyn Fn(&str) + Send + Sync>,
}

/// Write handle for a connection: everything queued here is written by the
/// connection's single writer task, in queue order.
#[derive(Clone)]
pub struct Outbound {
    tx: mpsc::UnboundedSender<CastMessage>,
}

impl Outbound {
    pub fn new(tx: mpsc::UnboundedSender<CastMessage>) -> Self {
        Self { tx }
    }

    pub fn send(&self, msg: CastMessage) {
        // A closed channel means the connection is going away; nothing to do.
        let _ = self.tx.send(msg);
    }

    /// Queue a JSON reply to `request` with source/destination swapped.
    pub fn reply<T: Serialize>(&self, request: &CastMessage, payload: &T) {
        match serde_json::to_string(payload) {
            Ok(json) => self.send(CastMessage::reply_to(request, json)),
            Err(e) => tracing::warn!("failed to serialize reply payload: {e}"),
        }
    }
}

/// Route one inbound message.
pub fn dispatch(
    msg: &CastMessage,
    session: &mut ReceiverSession,
    out: &Outbound,
    hooks: &SessionHooks,
) {
    match msg.ns() {
        NS_CONNECTION => handle_connection(msg, out),
        NS_HEARTBEAT => handle_heartbeat(msg, out),
        NS_RECEIVER => handle_receiver(msg, session, out, hooks),
        NS_MEDIA => handle_media(msg, session, out, hooks),
        NS_WEBRTC => handle_webrtc(msg, session, out, hooks),
        NS_REMOTING => handle_remoting(msg, session, out, hooks),
        other => tracing::debug!(namespace = other, "message on unhandled namespace"),
    }
}

/// Decode the payload, or None for anything we do not recognize.
fn parse<T: DeserializeOwned>(msg: &CastMessage) -> Option<T> {
    match serde_json::from_str(msg.payload()) {
        Ok(req) => Some(req),
        Err(e) => {
            tracing::debug!(namespace = msg.ns(), "ignoring payload: {e}");
            None
        }
    }
}

fn handle_connection(msg: &CastMessage, out: &Outbound) {
    match parse::<ConnectionRequest>(msg) {
        Some(ConnectionRequest::Connect { request_id }) => {
            out.reply(msg, &ConnectionReply::Connected { request_id });
        }
        Some(ConnectionRequest::Close) => {
            // Sender tears down the virtual connection; the TCP close follows.
            tracing::debug!(source = msg.source_id.as_deref().unwrap_or(""), "sender sent CLOSE");
        }
        Some(ConnectionRequest::Unknown) | None => {}
    }
}

fn handle_heartbeat(msg: &CastMessage, out: &Outbound) {
    match parse::<HeartbeatRequest>(msg) {
        Some(HeartbeatRequest::Ping) => out.reply(msg, &HeartbeatReply::Pong),
        Some(HeartbeatRequest::Pong) | Some(HeartbeatRequest::Unknown) | None => {}
    }
}

fn handle_receiver(
    msg: &CastMessage,
    session: &mut ReceiverSession,
    out: &Outbound,
    hooks: &SessionHooks,
) {
    let reply_status = |session: &ReceiverSession, request_id: i64| ReceiverReply::ReceiverStatus {
        request_id,
        status: session.receiver_status(),
    };

    match parse::<ReceiverRequest>(msg) {
        Some(ReceiverRequest::GetStatus { request_id }) => {
            out.reply(msg, &reply_status(session, request_id));
        }
        Some(ReceiverRequest::Launch { request_id, app_id }) => {
            // We run exactly one fictitious app; whatever was asked for, the
            // Default Media Receiver is what they get.
            tracing::debug!(app_id = app_id.as_deref().unwrap_or(""), "LAUNCH");
            out.reply(msg, &reply_status(session, request_id));
        }
        Some(ReceiverRequest::Stop { request_id }) => {
            session.stop_media();
            out.reply(msg, &reply_status(session, request_id));
            (hooks.media_command)(DisplayCommand::Stop { request_id });
        }
        Some(ReceiverRequest::SetVolume { request_id, volume }) => {
            let level = session.apply_volume(volume);
            out.reply(msg, &reply_status(session, request_id));
            (hooks.media_command)(DisplayCommand::Volume {
                volume: level,
                request_id,
            });
        }
        Some(ReceiverRequest::Unknown) | None => {}
    }
}

fn handle_media(
    msg: &CastMessage,
    session: &mut ReceiverSession,
    out: &Outbound,
    hooks: &SessionHooks,
) {
    let reply_status = |session: &ReceiverSession, request_id: i64| MediaReply::MediaStatus {
        request_id,
        status: session.media_status(),
    };

    match parse::<MediaRequest>(msg) {
        Some(MediaRequest::GetStatus { request_id }) => {
            out.reply(msg, &reply_status(session, request_id));
        }
        Some(MediaRequest::Load {
            request_id,
            media,
            current_time,
        }) => {
            session.load(media, current_time);
            out.reply(msg, &reply_status(session, request_id));

            let loaded = session.media.media.clone().unwrap_or_default();
            (hooks.media_command)(DisplayCommand::Load {
                url: loaded.content_id,
                content_type: loaded.content_type,
                current_time: session.media.current_time,
                request_id,
            });
        }
        Some(MediaRequest::Play { request_id }) => {
            session.play();
            out.reply(msg, &reply_status(session, request_id));
            (hooks.media_command)(DisplayCommand::Play { request_id });
        }
        Some(MediaRequest::Pause { request_id }) => {
            session.pause();
            out.reply(msg, &reply_status(session, request_id));
            (hooks.media_command)(DisplayCommand::Pause { request_id });
        }
        Some(MediaRequest::Seek {
            request_id,
            current_time,
        }) => {
            session.seek(current_time);
            out.reply(msg, &reply_status(session, request_id));
            (hooks.media_command)(DisplayCommand::Seek {
                current_time: session.media.current_time,
                request_id,
            });
        }
        Some(MediaRequest::Stop { request_id }) => {
            session.stop_media();
            out.reply(msg, &reply_status(session, request_id));
            (hooks.media_command)(DisplayCommand::Stop { request_id });
        }
        Some(MediaRequest::SetVolume { request_id, volume }) => {
            let level = session.apply_volume(volume);
            out.reply(msg, &reply_status(session, request_id));
            (hooks.media_command)(DisplayCommand::Volume {
                volume: level,
                request_id,
            });
        }
        Some(MediaRequest::Unknown) | None => {}
    }
}

fn handle_webrtc(
    msg: &CastMessage,
    session: &mut ReceiverSession,
    out: &Outbound,
    hooks: &SessionHooks,
) {
    match parse::<WebrtcRequest>(msg) {
        Some(WebrtcRequest::Offer { seq_num, offer }) => {
            let sdp = offer.map(|o| o.sdp).unwrap_or_default();

            // The callbacks capture only the write handle and the ids needed
            // for the swapped reply, never the connection itself.
            let reply_source = msg.destination_id.clone().unwrap_or_default();
            let reply_dest = msg.source_id.clone().unwrap_or_default();

            let send_answer: AnswerFn = {
                let out = out.clone();
                let source = reply_source.clone();
                let dest = reply_dest.clone();
                Box::new(move |sdp: String| {
                    let payload = WebrtcReply::Answer {
                        seq_num,
                        answer: SdpBody { sdp },
                    };
                    match serde_json::to_string(&payload) {
                        Ok(json) => out.send(CastMessage::utf8(NS_WEBRTC, &source, &dest, json)),
                        Err(e) => tracing::warn!("failed to serialize ANSWER: {e}"),
                    }
                })
            };

            let send_candidate: CandidateFn = {
                let out = out.clone();
                Arc::new(move |candidate: Value| {
                    let payload = WebrtcReply::IceCandidate { seq_num, candidate };
                    match serde_json::to_string(&payload) {
                        Ok(json) => {
                            out.send(CastMessage::utf8(NS_WEBRTC, &reply_source, &reply_dest, json))
                        }
                        Err(e) => tracing::warn!("failed to serialize ICE_CANDIDATE: {e}"),
                    }
                })
            };

            (hooks.webrtc_offer)(session.session_id(), &sdp, send_answer, send_candidate);
        }
        Some(WebrtcRequest::IceCandidate { candidate, .. }) => {
            if let Some(candidate) = candidate {
                (hooks.ice_candidate)(session.session_id(), candidate);
            }
        }
        Some(WebrtcRequest::Unknown) | None => {}
    }
}

fn handle_remoting(
    msg: &CastMessage,
    session: &mut ReceiverSession,
    out: &Outbound,
    hooks: &SessionHooks,
) {
    match parse::<RemotingRequest>(msg) {
        Some(RemotingRequest::Setup { request_id }) => {
            out.reply(msg, &RemotingReply::SetupOk { request_id });
        }
        Some(RemotingRequest::Start { request_id }) => {
            out.reply(msg, &RemotingReply::StartOk { request_id });
        }
        Some(RemotingRequest::Stop { request_id }) => {
            out.reply(msg, &RemotingReply::StopOk { request_id });
            (hooks.mirroring_stop)(session.session_id());
        }
        Some(RemotingRequest::Unknown) | None => {}
    }
}
