//! CastV2 transport -- TLS accept loop and per-connection runner.
//!
//! Each accepted socket gets its own task: a Framed codec split into a read
//! loop (strict receive order, dispatch by namespace) and a single writer
//! task draining the connection's outbound queue. Socket errors are logged
//! and swallowed; only an oversized frame or I/O failure ends a connection.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_rustls::TlsAcceptor;
use tokio_util::codec::Framed;

use embercast_protocol::{CastCodec, CastMessage, ProtocolError};

use crate::namespaces::{dispatch, Outbound, SessionHooks};
use crate::session::ReceiverSession;

/// The CastV2 TLS listener.
pub struct CastListener {
    listener: TcpListener,
    acceptor: TlsAcceptor,
    local_addr: SocketAddr,
}

impl CastListener {
    /// Bind the TCP listener and prepare the TLS acceptor.
    pub async fn bind(
        addr: SocketAddr,
        tls_config: Arc<rustls::ServerConfig>,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            listener,
            acceptor: TlsAcceptor::from(tls_config),
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Run the accept loop -- spawns a task per inbound connection.
    pub async fn run(self, hooks: Arc<SessionHooks>, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let acceptor = self.acceptor.clone();
                            let hooks = hooks.clone();
                            tokio::spawn(async move {
                                run_connection(acceptor, stream, peer, hooks).await;
                            });
                        }
                        Err(e) => {
                            tracing::warn!("cast accept failed: {e}");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("shutdown signal, closing cast listener");
                    break;
                }
            }
        }
    }
}

/// Drive a single sender connection until it goes away.
async fn run_connection(
    acceptor: TlsAcceptor,
    stream: TcpStream,
    peer: SocketAddr,
    hooks: Arc<SessionHooks>,
) {
    let tls_stream = match acceptor.accept(stream).await {
        Ok(tls) => tls,
        Err(e) => {
            tracing::debug!(remote = %peer, "tls handshake failed: {e}");
            return;
        }
    };

    let framed = Framed::new(tls_stream, CastCodec);
    let (mut sink, mut frames) = framed.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<CastMessage>();
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    let out = Outbound::new(tx);
    let mut session = ReceiverSession::new();
    tracing::info!(remote = %peer, session = session.session_id(), "cast sender connected");

    while let Some(item) = frames.next().await {
        match item {
            Ok(msg) => dispatch(&msg, &mut session, &out, &hooks),
            Err(ProtocolError::FrameTooLarge { size, max }) => {
                tracing::warn!(remote = %peer, size, max, "oversized frame, destroying connection");
                break;
            }
            Err(e) => {
                tracing::debug!(remote = %peer, "cast read error: {e}");
                break;
            }
        }
    }

    (hooks.disconnected)(session.session_id());

    // Dropping the outbound handle ends the writer.
    drop(out);
    let _ = writer.await;
    tracing::info!(remote = %peer, session = session.session_id(), "cast sender disconnected");
}
