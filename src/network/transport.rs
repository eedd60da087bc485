//! Addressable messaging between ring endpoints.
//!
//! Every endpoint binds a TCP listener and is known by a 4-byte [`Identity`].
//! Sends are fire-and-forget: one connection per envelope, framed with a
//! big-endian `u32` length. Inbound envelopes addressed to this identity land
//! in an inbox that response waits and peers read from.

use crate::chord::types::{FindSuccessorCommand, Identity, RoutingInfo, SuccessorResponse};
use crate::error::NetworkError;
use crate::network::messages::{Envelope, Message};
use crate::network::{socket_address, TransportConfig, DEFAULT_HOST, MAX_FRAME_SIZE};
use bytes::BytesMut;
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, timeout_at, Instant};

type Inbox = Arc<Mutex<mpsc::Receiver<Envelope>>>;

pub struct Transport {
    identity: Identity,
    local_addr: SocketAddr,
    config: TransportConfig,
    inbox: Inbox,
    wait_pool: Arc<Semaphore>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    listener_handle: Option<JoinHandle<()>>,
}

impl Transport {
    /// Binds the listen address and starts receiving. Failing to bind is fatal
    /// to the caller.
    pub async fn bind(
        identity: Identity,
        listen_addr: &str,
        config: TransportConfig,
    ) -> Result<Self, NetworkError> {
        let addr = socket_address(listen_addr);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| NetworkError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let (inbox_tx, inbox_rx) = mpsc::channel(config.inbox_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let listener_handle = tokio::spawn(run_listener(listener, identity, inbox_tx, shutdown_rx));

        info!("Endpoint {} listening on {}", identity, local_addr);

        Ok(Self {
            identity,
            local_addr,
            wait_pool: Arc::new(Semaphore::new(config.wait_pool_size.max(1))),
            config,
            inbox: Arc::new(Mutex::new(inbox_rx)),
            shutdown_tx: Some(shutdown_tx),
            listener_handle: Some(listener_handle),
        })
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Address peers should use to reach this endpoint. A wildcard bind with
    /// no advertised host falls back to loopback.
    pub fn address(&self) -> String {
        match self.config.advertise_host.as_deref() {
            Some(host) => format!("{}:{}", host, self.local_addr.port()),
            None if self.local_addr.ip().is_unspecified() => {
                format!("{}:{}", DEFAULT_HOST, self.local_addr.port())
            }
            None => self.local_addr.to_string(),
        }
    }

    pub fn routing_info(&self) -> RoutingInfo {
        RoutingInfo::new(self.address(), u64::from(self.identity.0))
    }

    /// Delivers one envelope to `to`. No retry.
    pub async fn send(&self, to: &str, envelope: &Envelope) -> Result<(), NetworkError> {
        let bytes = envelope.encode()?;
        let addr = socket_address(to);

        let mut stream = timeout(self.config.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| NetworkError::PeerUnreachable(format!("connect to {} timed out", addr)))?
            .map_err(|e| NetworkError::ConnectionFailed(format!("{}: {}", addr, e)))?;

        stream.write_u32(bytes.len() as u32).await?;
        stream.write_all(&bytes).await?;
        stream.shutdown().await?;
        debug!(
            "Sent request {} to {} at {}",
            envelope.message.request_id(),
            envelope.identity,
            addr
        );
        Ok(())
    }

    /// Sends `command` to `to`, routed to the recipient's identity.
    pub async fn send_find_successor(
        &self,
        command: &FindSuccessorCommand,
        to: &str,
    ) -> Result<(), NetworkError> {
        let envelope = Envelope::new(
            command.recipient.identity(),
            Message::FindSuccessor(command.clone()),
        );
        self.send(to, &envelope).await
    }

    /// Sends `response` back to the endpoint described by `to`.
    pub async fn send_response(
        &self,
        response: &SuccessorResponse,
        to: &RoutingInfo,
    ) -> Result<(), NetworkError> {
        let envelope = Envelope::new(to.identity(), Message::Successor(response.clone()));
        self.send(&to.address, &envelope).await
    }

    /// Next inbound envelope, or `None` once the transport has shut down.
    pub async fn recv(&self) -> Option<Envelope> {
        self.inbox.lock().await.recv().await
    }

    /// Waits for the response to `request_id`. Returns the empty sentinel when
    /// nothing matching arrives within `wait`.
    pub async fn await_response(&self, request_id: u64, wait: Duration) -> RoutingInfo {
        wait_for_response(&self.inbox, request_id, wait).await
    }

    /// Starts [`Transport::await_response`] on the wait pool. Call this before
    /// sending the request it answers.
    pub async fn spawn_wait(&self, request_id: u64, wait: Duration) -> PendingResponse {
        let inbox = self.inbox.clone();
        let handle = match self.wait_pool.clone().acquire_owned().await {
            Ok(permit) => tokio::spawn(async move {
                let _permit = permit;
                wait_for_response(&inbox, request_id, wait).await
            }),
            Err(e) => {
                error!("Wait pool closed: {}", e);
                tokio::spawn(async move {
                    sleep_until(Instant::now() + wait).await;
                    RoutingInfo::empty()
                })
            }
        };
        PendingResponse { handle }
    }

    /// Stops the listener. Envelopes already in the inbox are discarded.
    pub async fn shutdown(mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(handle) = self.listener_handle.take() {
            if let Err(e) = handle.await {
                error!("Listener for {} ended abnormally: {}", self.identity, e);
            }
        }
        self.wait_pool.close();
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        if let Some(handle) = self.listener_handle.take() {
            handle.abort();
        }
    }
}

/// A response wait running on the pool.
pub struct PendingResponse {
    handle: JoinHandle<RoutingInfo>,
}

impl PendingResponse {
    pub async fn resolve(self) -> RoutingInfo {
        match self.handle.await {
            Ok(info) => info,
            Err(e) => {
                error!("Response wait failed: {}", e);
                RoutingInfo::empty()
            }
        }
    }
}

async fn wait_for_response(inbox: &Inbox, request_id: u64, wait: Duration) -> RoutingInfo {
    let deadline = Instant::now() + wait;
    let mut inbox = match timeout_at(deadline, inbox.lock()).await {
        Ok(guard) => guard,
        Err(_) => return RoutingInfo::empty(),
    };

    loop {
        match timeout_at(deadline, inbox.recv()).await {
            Ok(Some(Envelope {
                message: Message::Successor(response),
                ..
            })) if response.request_id == request_id => return response.successor,
            Ok(Some(envelope)) => {
                // Late answers to earlier rounds end up here.
                debug!(
                    "Dropping uncorrelated message for request {} while waiting on {}",
                    envelope.message.request_id(),
                    request_id
                );
            }
            Ok(None) => {
                warn!("Inbox closed while waiting on request {}", request_id);
                sleep_until(deadline).await;
                return RoutingInfo::empty();
            }
            Err(_) => {
                debug!("Request {} timed out after {:?}", request_id, wait);
                return RoutingInfo::empty();
            }
        }
    }
}

async fn run_listener(
    listener: TcpListener,
    identity: Identity,
    inbox: mpsc::Sender<Envelope>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tokio::spawn(read_envelopes(stream, peer, identity, inbox.clone()));
                }
                Err(e) => warn!("Failed to accept connection: {}", e),
            },
            _ = &mut shutdown_rx => {
                info!("Endpoint {} shutting down", identity);
                break;
            }
        }
    }
}

async fn read_envelopes(
    mut stream: TcpStream,
    peer: SocketAddr,
    identity: Identity,
    inbox: mpsc::Sender<Envelope>,
) {
    loop {
        let len = match stream.read_u32().await {
            Ok(len) => len as usize,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return,
            Err(e) => {
                debug!("Read from {} failed: {}", peer, e);
                return;
            }
        };
        if len > MAX_FRAME_SIZE {
            warn!("Dropping connection from {}: frame of {} bytes", peer, len);
            return;
        }

        let mut frame = BytesMut::zeroed(len);
        if let Err(e) = stream.read_exact(&mut frame).await {
            debug!("Truncated frame from {}: {}", peer, e);
            return;
        }

        match Envelope::decode(&frame) {
            Ok(envelope) if envelope.identity != identity => {
                warn!(
                    "Dropping envelope for {:?} received by {:?}",
                    envelope.identity, identity
                );
            }
            Ok(envelope) => {
                if inbox.send(envelope).await.is_err() {
                    return;
                }
            }
            Err(e) => warn!("Dropping malformed envelope from {}: {}", peer, e),
        }
    }
}
