//! Orchestrator -- wires the display transport, the signaling relay, and the
//! CastV2 listener together.
//!
//! Owns the per-session callback maps: `answer_callbacks` holds one-shot
//! answer consumers (removed on first fire, so a second answer for the same
//! session is a no-op); `candidate_callbacks` stay registered for the
//! session's lifetime. Both are torn down on mirroring stop and disconnect.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use embercast_display::{DisplayCommand, DisplayServer, PlayerStatus};
use embercast_protocol::{tls, CertBundle};
use embercast_signaling::{SignalOrigin, SignalingRelay};

use crate::cast_transport::CastListener;
use crate::config::BridgeConfig;
use crate::namespaces::{AnswerFn, CandidateFn, SessionHooks};

type AnswerMap = Arc<Mutex<HashMap<String, AnswerFn>>>;
type CandidateMap = Arc<Mutex<HashMap<String, CandidateFn>>>;

/// A running bridge.
pub struct Bridge {
    pub display: DisplayServer,
    pub relay: SignalingRelay,
    cast_addr: SocketAddr,
    handles: Vec<JoinHandle<()>>,
}

impl Bridge {
    /// Bind everything, wire the callbacks, and start serving.
    pub async fn start(
        config: &BridgeConfig,
        certs: &CertBundle,
        shutdown: &broadcast::Sender<()>,
    ) -> anyhow::Result<Self> {
        let ws_addr: SocketAddr = config
            .network
            .ws_listen_addr
            .parse()
            .context("parsing ws_listen_addr")?;
        let cast_addr: SocketAddr = config
            .network
            .cast_listen_addr
            .parse()
            .context("parsing cast_listen_addr")?;

        let display = DisplayServer::bind(
            ws_addr,
            Duration::from_secs(config.timing.ws_heartbeat_secs),
        )
        .await
        .context("binding display websocket listener")?;

        let relay = {
            let display = display.clone();
            SignalingRelay::new(
                Arc::new(move |cmd| display.send_command(&cmd)),
                Duration::from_millis(config.timing.signaling_idle_ms),
            )
        };

        let answer_callbacks: AnswerMap = Arc::new(Mutex::new(HashMap::new()));
        let candidate_callbacks: CandidateMap = Arc::new(Mutex::new(HashMap::new()));

        // Relay -> cast connection: one-shot answer, repeated candidates.
        {
            let map = answer_callbacks.clone();
            relay.on_answer_ready(Arc::new(move |session_id, sdp| {
                let cb = map.lock().unwrap().remove(session_id);
                match cb {
                    Some(cb) => cb(sdp.to_string()),
                    None => tracing::debug!(session = session_id, "answer with no waiting sender"),
                }
            }));
        }
        {
            let map = candidate_callbacks.clone();
            relay.on_display_candidate(Arc::new(move |session_id, candidate| {
                let cb = map.lock().unwrap().get(session_id).cloned();
                if let Some(cb) = cb {
                    cb(candidate.clone());
                }
            }));
        }

        // Display -> relay, plus player status logging.
        {
            let relay = relay.clone();
            display.on_status(Arc::new(move |msg| {
                relay.handle_display_message(msg);
                log_player_status(msg);
            }));
        }

        // WebSocket senders speak the same signaling shapes, custom origin.
        {
            let relay = relay.clone();
            display.on_sender_message(Arc::new(move |msg| {
                forward_sender_message(&relay, msg);
            }));
        }

        let hooks = SessionHooks {
            media_command: {
                let display = display.clone();
                Arc::new(move |cmd| display.send_command(&cmd))
            },
            webrtc_offer: {
                let relay = relay.clone();
                let answers = answer_callbacks.clone();
                let candidates = candidate_callbacks.clone();
                Arc::new(move |session_id, sdp, send_answer, send_candidate| {
                    answers
                        .lock()
                        .unwrap()
                        .insert(session_id.to_string(), send_answer);
                    candidates
                        .lock()
                        .unwrap()
                        .insert(session_id.to_string(), send_candidate);
                    relay.handle_offer(session_id, sdp, SignalOrigin::Cast);
                })
            },
            ice_candidate: {
                let relay = relay.clone();
                Arc::new(move |session_id, candidate| {
                    relay.handle_sender_candidate(session_id, candidate);
                })
            },
            mirroring_stop: {
                let display = display.clone();
                let relay = relay.clone();
                let answers = answer_callbacks.clone();
                let candidates = candidate_callbacks.clone();
                Arc::new(move |session_id| {
                    display.send_command(&DisplayCommand::MirrorStop {
                        session_id: session_id.to_string(),
                    });
                    relay.close_session(session_id);
                    answers.lock().unwrap().remove(session_id);
                    candidates.lock().unwrap().remove(session_id);
                })
            },
            disconnected: {
                let relay = relay.clone();
                let answers = answer_callbacks.clone();
                let candidates = candidate_callbacks.clone();
                Arc::new(move |session_id| {
                    relay.close_session(session_id);
                    answers.lock().unwrap().remove(session_id);
                    candidates.lock().unwrap().remove(session_id);
                })
            },
        };

        let tls_config = tls::build_server_config(certs)
            .map_err(|e| anyhow::anyhow!("building tls server config: {e}"))?;
        let listener = CastListener::bind(cast_addr, Arc::new(tls_config))
            .await
            .context("binding cast listener")?;
        let cast_addr = listener.local_addr();

        let mut handles = display.spawn(shutdown);
        handles.push(relay.spawn_reaper(
            Duration::from_secs(config.timing.signaling_reap_secs),
            shutdown,
        ));
        handles.push(tokio::spawn(
            listener.run(Arc::new(hooks), shutdown.subscribe()),
        ));

        let ws_addr = display.local_addr();
        tracing::info!(
            friendly_name = config.bridge.friendly_name.as_str(),
            cast = %cast_addr,
            ws = %ws_addr,
            "embercast bridge up"
        );

        Ok(Self {
            display,
            relay,
            cast_addr,
            handles,
        })
    }

    pub fn cast_addr(&self) -> SocketAddr {
        self.cast_addr
    }

    pub fn ws_addr(&self) -> SocketAddr {
        self.display.local_addr()
    }

    /// Wait for the accept loops and interval tasks to wind down.
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

fn log_player_status(msg: &Value) {
    // Signaling messages carry a `type`; plain player status does not.
    if msg.get("type").is_some() {
        return;
    }
    if let Ok(status) = serde_json::from_value::<PlayerStatus>(msg.clone()) {
        tracing::debug!(
            player_state = status.player_state.as_deref().unwrap_or(""),
            current_time = status.current_time.unwrap_or(0.0),
            "display player status"
        );
    }
}

fn forward_sender_message(relay: &SignalingRelay, msg: &Value) {
    match msg.get("type").and_then(Value::as_str) {
        Some("webrtc-offer") => {
            let (Some(session_id), Some(sdp)) = (
                msg.get("sessionId").and_then(Value::as_str),
                msg.get("sdp").and_then(Value::as_str),
            ) else {
                tracing::debug!("sender webrtc-offer missing sessionId or sdp");
                return;
            };
            relay.handle_offer(session_id, sdp, SignalOrigin::Custom);
        }
        Some("ice-candidate") => {
            let (Some(session_id), Some(candidate)) = (
                msg.get("sessionId").and_then(Value::as_str),
                msg.get("candidate"),
            ) else {
                tracing::debug!("sender ice-candidate missing sessionId or candidate");
                return;
            };
            relay.handle_sender_candidate(session_id, candidate.clone());
        }
        other => {
            tracing::debug!(kind = other.unwrap_or(""), "unhandled sender message");
        }
    }
}
