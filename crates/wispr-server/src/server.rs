//! UDP transport: one socket per service (authentication 1812,
//! accounting 1813), a task per datagram, and the NAS gate in front of
//! everything.
//!
//! Unknown or disabled NAS addresses and malformed packets are dropped
//! without a reply (RFC 2865 Section 3 silent discard; answering unknown
//! sources would also make the server an amplification reflector). UDP is
//! lossy by design, so saturation sheds datagrams instead of queueing;
//! the NAS retransmits on its own schedule.

use crate::acct_handler::AcctHandler;
use crate::auth_handler::AuthHandler;
use crate::config::Config;
use crate::store::Store;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use wispr_proto::{Code, Packet};

/// In-flight handler cap; datagrams beyond it are shed
const MAX_INFLIGHT: usize = 256;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which socket a datagram arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Service {
    Auth,
    Acct,
}

/// Dropped-datagram counters, one per drop cause
#[derive(Debug, Default)]
pub struct DropCounters {
    pub malformed: AtomicU64,
    pub unknown_nas: AtomicU64,
    pub saturated: AtomicU64,
    pub unsupported: AtomicU64,
}

struct ServerContext {
    store: Arc<Store>,
    auth_handler: AuthHandler,
    acct_handler: AcctHandler,
    permits: Arc<Semaphore>,
    drops: DropCounters,
}

pub struct RadiusServer {
    auth_socket: Arc<UdpSocket>,
    acct_socket: Arc<UdpSocket>,
    context: Arc<ServerContext>,
}

impl RadiusServer {
    /// Bind both service sockets. Failure here is fatal for the process.
    pub async fn bind(config: &Config, store: Arc<Store>) -> Result<Self, ServerError> {
        let auth_socket = UdpSocket::bind(("0.0.0.0", config.auth_port)).await?;
        let acct_socket = UdpSocket::bind(("0.0.0.0", config.acct_port)).await?;
        info!(
            auth_port = config.auth_port,
            acct_port = config.acct_port,
            "RADIUS listeners bound"
        );

        Ok(RadiusServer {
            auth_socket: Arc::new(auth_socket),
            acct_socket: Arc::new(acct_socket),
            context: Arc::new(ServerContext {
                auth_handler: AuthHandler::new(Arc::clone(&store)),
                acct_handler: AcctHandler::new(Arc::clone(&store)),
                store,
                permits: Arc::new(Semaphore::new(MAX_INFLIGHT)),
                drops: DropCounters::default(),
            }),
        })
    }

    /// Bind to loopback with OS-assigned ports (test harness)
    pub async fn bind_ephemeral(store: Arc<Store>) -> Result<Self, ServerError> {
        let auth_socket = UdpSocket::bind("127.0.0.1:0").await?;
        let acct_socket = UdpSocket::bind("127.0.0.1:0").await?;
        Ok(RadiusServer {
            auth_socket: Arc::new(auth_socket),
            acct_socket: Arc::new(acct_socket),
            context: Arc::new(ServerContext {
                auth_handler: AuthHandler::new(Arc::clone(&store)),
                acct_handler: AcctHandler::new(Arc::clone(&store)),
                store,
                permits: Arc::new(Semaphore::new(MAX_INFLIGHT)),
                drops: DropCounters::default(),
            }),
        })
    }

    pub fn auth_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.auth_socket.local_addr()?)
    }

    pub fn acct_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.acct_socket.local_addr()?)
    }

    /// Serve both sockets until the future is dropped (main races this
    /// against the shutdown signal).
    pub async fn run(&self) -> Result<(), ServerError> {
        let auth = Self::recv_loop(
            Arc::clone(&self.auth_socket),
            Service::Auth,
            Arc::clone(&self.context),
        );
        let acct = Self::recv_loop(
            Arc::clone(&self.acct_socket),
            Service::Acct,
            Arc::clone(&self.context),
        );
        tokio::try_join!(auth, acct)?;
        Ok(())
    }

    async fn recv_loop(
        socket: Arc<UdpSocket>,
        service: Service,
        context: Arc<ServerContext>,
    ) -> Result<(), ServerError> {
        let mut buf = vec![0u8; Packet::MAX_LEN];
        loop {
            // Bind failures are fatal; per-packet receive errors (ICMP
            // unreachable bounces and the like) are not
            let (len, addr) = match socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    warn!(service = ?service, error = %e, "socket receive error");
                    continue;
                }
            };
            let data = buf[..len].to_vec();

            // Backpressure: no permit, no work; the NAS will retransmit
            let Ok(permit) = Arc::clone(&context.permits).try_acquire_owned() else {
                context.drops.saturated.fetch_add(1, Ordering::Relaxed);
                warn!(client_ip = %addr.ip(), "handler pool saturated, datagram dropped");
                continue;
            };

            let socket = Arc::clone(&socket);
            let context = Arc::clone(&context);
            tokio::spawn(async move {
                let _permit = permit;
                Self::handle_datagram(data, addr, service, &context, &socket).await;
            });
        }
    }

    async fn handle_datagram(
        data: Vec<u8>,
        addr: SocketAddr,
        service: Service,
        context: &ServerContext,
        socket: &UdpSocket,
    ) {
        // RFC 2865 Section 3: the source must be a known, active NAS
        // before anything is decoded
        let nas = match context.store.nas_by_ip(&addr.ip().to_string()).await {
            Ok(Some(nas)) => nas,
            Ok(None) => {
                context.drops.unknown_nas.fetch_add(1, Ordering::Relaxed);
                debug!(client_ip = %addr.ip(), "datagram from unknown NAS dropped");
                return;
            }
            Err(e) => {
                error!(client_ip = %addr.ip(), error = %e, "NAS lookup failed");
                return;
            }
        };
        let secret = nas.secret.as_bytes();

        let request = match Packet::decode(&data) {
            Ok(packet) => packet,
            Err(e) => {
                context.drops.malformed.fetch_add(1, Ordering::Relaxed);
                debug!(client_ip = %addr.ip(), error = %e, "malformed packet dropped");
                return;
            }
        };

        debug!(
            packet_type = ?request.code,
            client_addr = %addr,
            request_id = request.identifier,
            nas = %nas.name,
            "received RADIUS packet"
        );

        let response = match (service, request.code) {
            (Service::Auth, Code::AccessRequest) => context
                .auth_handler
                .handle(&request, secret, addr.ip())
                .await
                .map_err(|e| e.to_string()),
            (Service::Acct, Code::AccountingRequest) => context
                .acct_handler
                .handle(&request, secret, addr.ip())
                .await
                .map_err(|e| e.to_string()),
            _ => {
                context.drops.unsupported.fetch_add(1, Ordering::Relaxed);
                warn!(
                    packet_type = ?request.code,
                    client_ip = %addr.ip(),
                    "unexpected packet code for this port"
                );
                return;
            }
        };

        let response = match response {
            Ok(packet) => packet,
            Err(e) => {
                error!(client_ip = %addr.ip(), error = %e, "handler failed");
                return;
            }
        };

        match response.encode() {
            Ok(bytes) => {
                if let Err(e) = socket.send_to(&bytes, addr).await {
                    warn!(client_ip = %addr.ip(), error = %e, "response send failed");
                } else {
                    debug!(
                        response_type = ?response.code,
                        client_addr = %addr,
                        request_id = response.identifier,
                        "sent RADIUS response"
                    );
                }
            }
            Err(e) => error!(error = %e, "response encode failed"),
        }
    }

    /// Cooperative shutdown: stop calling `run`, then wait up to `grace`
    /// for in-flight handlers to finish before the store closes.
    pub async fn drain(&self, grace: Duration) {
        let deadline = tokio::time::timeout(
            grace,
            self.context.permits.acquire_many(MAX_INFLIGHT as u32),
        );
        match deadline.await {
            Ok(_) => info!("all in-flight requests drained"),
            Err(_) => warn!(grace_secs = grace.as_secs(), "drain grace period expired"),
        }

        let drops = &self.context.drops;
        info!(
            malformed = drops.malformed.load(Ordering::Relaxed),
            unknown_nas = drops.unknown_nas.load(Ordering::Relaxed),
            saturated = drops.saturated.load(Ordering::Relaxed),
            unsupported = drops.unsupported.load(Ordering::Relaxed),
            "dropped-datagram totals"
        );
    }
}
