//! Persistent duplex message channel to the listing server.
//!
//! A [`Session`] is a cheap handle: `emit` queues an outbound event and
//! `subscribe` registers interest in inbound events. A registration lives
//! exactly as long as the returned [`Subscription`]; dropping it is the
//! unsubscribe, so no exit path can leave a handler behind.

use tokio::{
    net::{TcpStream, ToSocketAddrs},
    sync::{broadcast, mpsc, oneshot},
};

use crate::error::{BrowseError, BrowseResult};
use crate::protocol::{decode_frame, read_frame_bytes, write_frame, ClientEvent, ServerEvent};

const INBOUND_CAPACITY: usize = 256;

#[derive(Clone, Debug)]
pub struct Session {
    outbound: mpsc::UnboundedSender<ClientEvent>,
    inbound: broadcast::Sender<ServerEvent>,
}

impl Session {
    fn new() -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (outbound, outbound_receiver) = mpsc::unbounded_channel();
        let (inbound, _) = broadcast::channel(INBOUND_CAPACITY);
        (Self { outbound, inbound }, outbound_receiver)
    }

    /// Connect to a listing server and spawn the reader and writer tasks.
    pub async fn connect<A: ToSocketAddrs + std::fmt::Debug>(addr: A) -> BrowseResult<Self> {
        tracing::debug!("Connecting to {:?}", addr);
        let stream = TcpStream::connect(&addr).await?;
        stream.set_nodelay(true)?;
        let (mut reader, mut writer) = stream.into_split();
        let (session, mut outbound_receiver) = Self::new();
        let (shutdown_sender, mut shutdown_receiver) = oneshot::channel::<()>();

        let inbound = session.inbound.clone();
        tokio::spawn(async move {
            loop {
                match read_frame_bytes(&mut reader).await {
                    Ok(Some(bytes)) => match decode_frame::<ServerEvent>(&bytes) {
                        Ok(event) => {
                            tracing::debug!("Received server event: {:?}", event);
                            // No live subscriber is not an error.
                            let _ = inbound.send(event);
                        }
                        Err(e) => tracing::warn!("Skipping undecodable frame: {}", e),
                    },
                    Ok(None) => {
                        tracing::info!("Server closed the session");
                        break;
                    }
                    Err(e) => {
                        tracing::error!("Failed to read from session: {}", e);
                        break;
                    }
                }
            }
            let _ = shutdown_sender.send(());
        });

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = outbound_receiver.recv() => match event {
                        Some(event) => {
                            if let Err(e) = write_frame(&mut writer, &event).await {
                                tracing::error!("Failed to write to session: {}", e);
                                break;
                            }
                        }
                        // Every session handle dropped.
                        None => break,
                    },
                    _ = &mut shutdown_receiver => break,
                }
            }
        });

        Ok(session)
    }

    /// A session wired to an in-process server handle instead of a socket.
    pub fn loopback() -> (Self, LoopbackServer) {
        let (session, requests) = Self::new();
        let server = LoopbackServer {
            requests,
            inbound: session.inbound.clone(),
        };
        (session, server)
    }

    pub fn emit(&self, event: ClientEvent) -> BrowseResult<()> {
        tracing::debug!("Emitting {:?}", event);
        self.outbound
            .send(event)
            .map_err(|_| BrowseError::SessionClosed)
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.inbound.subscribe(),
            outbound: self.outbound.clone(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inbound.receiver_count()
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<ServerEvent>,
    outbound: mpsc::UnboundedSender<ClientEvent>,
}

impl Subscription {
    /// Next inbound event. Fails with `SessionClosed` once the transport is gone.
    pub async fn recv(&mut self) -> BrowseResult<ServerEvent> {
        loop {
            tokio::select! {
                biased;
                event = self.receiver.recv() => match event {
                    Ok(event) => return Ok(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Subscription lagged, {} events skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return Err(BrowseError::SessionClosed),
                },
                () = self.outbound.closed() => return Err(BrowseError::SessionClosed),
            }
        }
    }
}

/// Server side of [`Session::loopback`]: observes requests and injects events.
#[derive(Debug)]
pub struct LoopbackServer {
    requests: mpsc::UnboundedReceiver<ClientEvent>,
    inbound: broadcast::Sender<ServerEvent>,
}

impl LoopbackServer {
    pub async fn next_request(&mut self) -> Option<ClientEvent> {
        self.requests.recv().await
    }

    pub fn try_next_request(&mut self) -> Option<ClientEvent> {
        self.requests.try_recv().ok()
    }

    /// Deliver an event to every live subscription; returns how many saw it.
    pub fn push(&self, event: ServerEvent) -> usize {
        self.inbound.send(event).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ListDirRequest, LoadingStatus};
    use tokio::net::TcpListener;

    fn list_dir(path: &str) -> ClientEvent {
        ClientEvent::ListDir(ListDirRequest {
            path: path.to_string(),
            request_id: None,
        })
    }

    #[tokio::test]
    async fn test_subscription_drop_unregisters() {
        let (session, _server) = Session::loopback();
        assert_eq!(session.subscriber_count(), 0);
        let subscription = session.subscribe();
        assert_eq!(session.subscriber_count(), 1);
        drop(subscription);
        assert_eq!(session.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_loopback_round_trip() {
        let (session, mut server) = Session::loopback();
        let mut subscription = session.subscribe();

        session.emit(list_dir("/")).unwrap();
        assert_eq!(server.next_request().await, Some(list_dir("/")));

        let status = ServerEvent::ListDirStatus(LoadingStatus {
            status: "loading".to_string(),
            path: Some("/".to_string()),
        });
        assert_eq!(server.push(status.clone()), 1);
        assert_eq!(subscription.recv().await.unwrap(), status);
    }

    #[tokio::test]
    async fn test_closed_loopback_fails_emit_and_recv() {
        let (session, server) = Session::loopback();
        let mut subscription = session.subscribe();
        drop(server);

        assert!(session.is_closed());
        assert!(matches!(session.emit(list_dir("/")), Err(BrowseError::SessionClosed)));
        assert!(matches!(subscription.recv().await, Err(BrowseError::SessionClosed)));
    }

    #[tokio::test]
    async fn test_tcp_session() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let bytes = read_frame_bytes(&mut socket).await.unwrap().unwrap();
            let request: ClientEvent = decode_frame(&bytes).unwrap();
            let ClientEvent::ListDir(ListDirRequest { path, .. }) = request;
            let status = ServerEvent::ListDirStatus(LoadingStatus {
                status: "loading".to_string(),
                path: Some(path),
            });
            write_frame(&mut socket, &status).await.unwrap();
        });

        let session = Session::connect(addr).await.unwrap();
        let mut subscription = session.subscribe();
        session.emit(list_dir("/srv")).unwrap();

        let event = subscription.recv().await.unwrap();
        assert_eq!(
            event,
            ServerEvent::ListDirStatus(LoadingStatus {
                status: "loading".to_string(),
                path: Some("/srv".to_string()),
            })
        );
        server.await.unwrap();
        assert!(matches!(subscription.recv().await, Err(BrowseError::SessionClosed)));
    }

    #[tokio::test]
    async fn test_connect_refused_is_io_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = Session::connect(addr).await;
        assert!(matches!(result, Err(BrowseError::Io(_))));
    }
}
