use super::console_messages::{Downstream, RequestId, Upstream};
use crate::{error, event, warn};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::net::tcp::{ReadHalf, WriteHalf};
use tokio::sync::{Mutex, mpsc, oneshot};

#[derive(Debug, Clone)]
pub enum ConsoleEvent {
    Connected(SocketAddr),
    Disconnected(SocketAddr),
    Message(Upstream),
    /// A frame that did not decode; `reason` is the error to answer with.
    Rejected { request_id: Option<RequestId>, reason: String },
}

/// Outgoing frame queues of the connected sessions.
type Sessions = Arc<Mutex<HashMap<SocketAddr, mpsc::Sender<Arc<[u8]>>>>>;

pub(crate) struct ConsoleEndpoint {
    sessions: Sessions,
    close_oneshot_sender: Option<oneshot::Sender<()>>,
    local_addr: SocketAddr,
}

impl ConsoleEndpoint {
    /// Frames a session may have in flight in either direction before the
    /// producing side waits.
    const CHANNEL_CAPACITY: usize = 64;
    /// Upper bound of a single frame's payload.
    const MAX_FRAME_LEN: u32 = 1 << 20;

    async fn handle_connection_rx(
        socket: &mut ReadHalf<'_>,
        upstream_event_sender: &mpsc::Sender<ConsoleEvent>,
    ) -> Result<(), std::io::Error> {
        loop {
            let length = socket.read_u32().await?;
            if length > Self::MAX_FRAME_LEN {
                return Err(std::io::Error::new(
                    ErrorKind::InvalidData,
                    format!("frame of {length} bytes exceeds limit"),
                ));
            }

            let mut buffer = vec![0u8; length as usize];
            socket.read_exact(&mut buffer).await?;

            let ev = match Upstream::decode(&buffer) {
                Ok(message) => ConsoleEvent::Message(message),
                Err((request_id, err)) => {
                    warn!("Rejecting console frame: {err}");
                    ConsoleEvent::Rejected { request_id, reason: err.to_string() }
                }
            };
            if upstream_event_sender.send(ev).await.is_err() {
                // Dispatcher is gone, nothing left to serve.
                return Ok(());
            }
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    async fn handle_connection_tx(
        socket: &mut WriteHalf<'_>,
        downstream_receiver: &mut mpsc::Receiver<Arc<[u8]>>,
    ) -> Result<(), std::io::Error> {
        while let Some(message_buffer) = downstream_receiver.recv().await {
            socket.write_u32(message_buffer.len() as u32).await?;
            socket.write_all(&message_buffer).await?;
        }
        Ok(())
    }

    /// Binds the listener and starts accepting console sessions.
    ///
    /// # Returns
    /// - The endpoint and the receiver of every session's upstream events, in
    ///   arrival order per session.
    ///
    /// # Errors
    /// - The bind error if `addr` cannot be listened on.
    pub(crate) async fn start(
        addr: SocketAddr,
    ) -> Result<(Self, mpsc::Receiver<ConsoleEvent>), std::io::Error> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let sessions: Sessions = Arc::new(Mutex::new(HashMap::new()));
        let (upstream_event_sender, upstream_event_receiver) =
            mpsc::channel(Self::CHANNEL_CAPACITY);
        let (close_oneshot_sender, mut close_oneshot_receiver) = oneshot::channel();
        let inst = Self {
            sessions: Arc::clone(&sessions),
            close_oneshot_sender: Some(close_oneshot_sender),
            local_addr,
        };

        tokio::spawn(async move {
            loop {
                let accept = tokio::select! {
                    accept = listener.accept() => accept,
                    _ = &mut close_oneshot_receiver => break
                };

                let (mut socket, peer) = match accept {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("Console listener failed to accept: {e}");
                        continue;
                    }
                };
                let (downstream_sender, mut downstream_receiver) =
                    mpsc::channel(Self::CHANNEL_CAPACITY);
                sessions.lock().await.insert(peer, downstream_sender);
                let _ = upstream_event_sender.send(ConsoleEvent::Connected(peer)).await;
                let upstream_event_sender_local = upstream_event_sender.clone();
                let sessions_local = Arc::clone(&sessions);

                tokio::spawn(async move {
                    let (mut rx_socket, mut tx_socket) = socket.split();

                    let result = tokio::select! {
                        res = ConsoleEndpoint::handle_connection_tx(
                            &mut tx_socket,
                            &mut downstream_receiver,
                        ) => res,
                        res = ConsoleEndpoint::handle_connection_rx(
                            &mut rx_socket,
                            &upstream_event_sender_local,
                        ) => res
                    };

                    sessions_local.lock().await.remove(&peer);
                    let disconnected = ConsoleEvent::Disconnected(peer);
                    let _ = upstream_event_sender_local.send(disconnected).await;
                    match result {
                        Err(e)
                            if e.kind() == ErrorKind::UnexpectedEof
                                || e.kind() == ErrorKind::ConnectionReset
                                || e.kind() == ErrorKind::ConnectionAborted =>
                        {
                            return;
                        }
                        Err(e) => {
                            warn!("Closing connection to console {peer} due to {e}");
                        }
                        Ok(()) => {}
                    }
                    let _ = socket.shutdown().await;
                });
            }
            event!("Console listener on {local_addr} stopped.");
        });
        Ok((inst, upstream_event_receiver))
    }

    /// Queues `msg` on every connected session, waiting while a session's
    /// queue is full.
    pub(crate) async fn send_downstream(&self, msg: &Downstream) {
        let buffer: Arc<[u8]> = match serde_json::to_vec(msg) {
            Ok(buffer) => buffer.into(),
            Err(e) => {
                error!("Dropping unencodable console message: {e}");
                return;
            }
        };
        let sessions: Vec<_> = self.sessions.lock().await.values().cloned().collect();
        for session in sessions {
            // A session closing meanwhile is not an error.
            let _ = session.send(Arc::clone(&buffer)).await;
        }
    }

    pub(crate) fn local_addr(&self) -> SocketAddr { self.local_addr }
}

impl Drop for ConsoleEndpoint {
    fn drop(&mut self) {
        if let Some(close) = self.close_oneshot_sender.take() {
            let _ = close.send(());
        }
        if let Ok(mut sessions) = self.sessions.try_lock() {
            sessions.clear();
        }
    }
}
