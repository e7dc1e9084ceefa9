//! Signaling relay -- the SDP/ICE broker between Cast senders and the display.
//!
//! Sessions are keyed by an opaque id (the CastV2 receiver session id for
//! Cast-origin mirroring, a sender-supplied id for custom senders). Sender
//! candidates are buffered until the display answers, then flushed in FIFO
//! order; idle sessions are reaped. One lock serializes the session map, and
//! forwarding happens under it so the buffered and immediate candidate paths
//! cannot interleave.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::broadcast;

use embercast_display::DisplayCommand;

/// Which transport a mirroring session originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOrigin {
    /// A CastV2 sender (session id minted by the receiver session).
    Cast,
    /// A WebSocket sender client (session id supplied by the sender).
    Custom,
}

/// Sink toward the display transport.
pub type DisplaySink = Arc<dyn Fn(DisplayCommand) + Send + Sync>;

/// Fired once per stored answer with `(session_id, sdp)`.
pub type AnswerCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Fired for every display-side ICE candidate with `(session_id, candidate)`.
pub type CandidateCallback = Arc<dyn Fn(&str, &Value) + Send + Sync>;

struct Session {
    offer: Option<String>,
    answer: Option<String>,
    pending: VecDeque<Value>,
    origin: SignalOrigin,
    last_activity: Instant,
}

impl Session {
    fn new(origin: SignalOrigin) -> Self {
        Self {
            offer: None,
            answer: None,
            pending: VecDeque::new(),
            origin,
            last_activity: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

/// The relay. Cheap to clone; all clones share the session map.
#[derive(Clone)]
pub struct SignalingRelay {
    inner: Arc<Inner>,
}

struct Inner {
    sessions: Mutex<HashMap<String, Session>>,
    to_display: DisplaySink,
    answer_listeners: Mutex<Vec<AnswerCallback>>,
    candidate_listeners: Mutex<Vec<CandidateCallback>>,
    idle_timeout: Duration,
}

impl SignalingRelay {
    pub fn new(to_display: DisplaySink, idle_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions: Mutex::new(HashMap::new()),
                to_display,
                answer_listeners: Mutex::new(Vec::new()),
                candidate_listeners: Mutex::new(Vec::new()),
                idle_timeout,
            }),
        }
    }

    /// Store (or overwrite) the offer and forward it to the display.
    pub fn handle_offer(&self, session_id: &str, sdp: &str, origin: SignalOrigin) {
        {
            let mut sessions = self.inner.sessions.lock().unwrap();
            let session = sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Session::new(origin));
            if session.offer.replace(sdp.to_string()).is_some() {
                tracing::debug!(session = session_id, "overwriting previous offer");
            }
            session.touch();
        }

        tracing::debug!(session = session_id, ?origin, "forwarding webrtc offer");
        (self.inner.to_display)(DisplayCommand::WebrtcOffer {
            session_id: session_id.to_string(),
            sdp: sdp.to_string(),
        });
    }

    /// Forward a sender-side candidate, or buffer it until the answer lands.
    /// Unknown sessions drop the candidate silently.
    pub fn handle_sender_candidate(&self, session_id: &str, candidate: Value) {
        let mut sessions = self.inner.sessions.lock().unwrap();
        let Some(session) = sessions.get_mut(session_id) else {
            tracing::debug!(session = session_id, "candidate for unknown session, dropping");
            return;
        };
        session.touch();

        if session.answer.is_some() {
            (self.inner.to_display)(DisplayCommand::IceCandidate {
                session_id: session_id.to_string(),
                candidate,
            });
        } else {
            session.pending.push_back(candidate);
        }
    }

    /// Feed a raw display message through the relay. Non-signaling messages
    /// and malformed ones are ignored.
    pub fn handle_display_message(&self, msg: &Value) {
        let Some(kind) = msg.get("type").and_then(Value::as_str) else {
            return;
        };

        match kind {
            "webrtc-answer" => {
                let (Some(session_id), Some(sdp)) = (
                    msg.get("sessionId").and_then(Value::as_str),
                    msg.get("sdp").and_then(Value::as_str),
                ) else {
                    tracing::debug!("webrtc-answer missing sessionId or sdp, ignoring");
                    return;
                };
                self.accept_answer(session_id, sdp);
            }
            "ice-candidate" => {
                let (Some(session_id), Some(candidate)) = (
                    msg.get("sessionId").and_then(Value::as_str),
                    msg.get("candidate"),
                ) else {
                    tracing::debug!("ice-candidate missing sessionId or candidate, ignoring");
                    return;
                };
                self.accept_display_candidate(session_id, candidate);
            }
            _ => {}
        }
    }

    /// Drop a session. Buffered candidates are discarded, not re-emitted.
    pub fn close_session(&self, session_id: &str) {
        if self
            .inner
            .sessions
            .lock()
            .unwrap()
            .remove(session_id)
            .is_some()
        {
            tracing::debug!(session = session_id, "signaling session closed");
        }
    }

    pub fn on_answer_ready(&self, cb: AnswerCallback) {
        self.inner.answer_listeners.lock().unwrap().push(cb);
    }

    pub fn on_display_candidate(&self, cb: CandidateCallback) {
        self.inner.candidate_listeners.lock().unwrap().push(cb);
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.inner.sessions.lock().unwrap().len()
    }

    /// Start the idle-session reaper.
    pub fn spawn_reaper(
        &self,
        interval: Duration,
        shutdown: &broadcast::Sender<()>,
    ) -> tokio::task::JoinHandle<()> {
        let inner = self.inner.clone();
        let mut shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // immediate first tick

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let mut sessions = inner.sessions.lock().unwrap();
                        let before = sessions.len();
                        sessions.retain(|id, s| {
                            let keep = s.last_activity.elapsed() <= inner.idle_timeout;
                            if !keep {
                                tracing::info!(
                                    session = id.as_str(),
                                    origin = ?s.origin,
                                    "reaping idle signaling session"
                                );
                            }
                            keep
                        });
                        let reaped = before - sessions.len();
                        if reaped > 0 {
                            tracing::debug!(reaped, "signaling reaper pass");
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
        })
    }

    fn accept_answer(&self, session_id: &str, sdp: &str) {
        {
            let mut sessions = self.inner.sessions.lock().unwrap();
            let Some(session) = sessions.get_mut(session_id) else {
                tracing::debug!(session = session_id, "answer for unknown session, ignoring");
                return;
            };
            session.answer = Some(sdp.to_string());
            session.touch();

            // Flush in insertion order, under the same lock that buffered them.
            while let Some(candidate) = session.pending.pop_front() {
                (self.inner.to_display)(DisplayCommand::IceCandidate {
                    session_id: session_id.to_string(),
                    candidate,
                });
            }
        }

        let listeners = self.inner.answer_listeners.lock().unwrap().clone();
        for cb in listeners {
            cb(session_id, sdp);
        }
    }

    fn accept_display_candidate(&self, session_id: &str, candidate: &Value) {
        if let Some(session) = self.inner.sessions.lock().unwrap().get_mut(session_id) {
            session.touch();
        }

        let listeners = self.inner.candidate_listeners.lock().unwrap().clone();
        for cb in listeners {
            cb(session_id, candidate);
        }
    }
}
