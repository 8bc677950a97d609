//! Multicast pub/sub session.

use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::{Mutex, RwLock};
use prost::Message;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};
use vat_core::{AnnotationEvent, BusError, MessageBus, TimestampHandler};

use crate::framing::Od4Codec;
use crate::messages::{Direction, Envelope, TimeStamp, DIRECTION_ID, IMAGE_READING_ID};

/// Default session port
pub const DEFAULT_PORT: u16 = 12175;

/// Largest datagram the receive task accepts
const RECV_BUFFER_SIZE: usize = 65_535;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session id {0} is outside 0..=255")]
    InvalidCid(u16),

    #[error("failed to start session runtime: {0}")]
    Runtime(io::Error),

    #[error("socket setup failed: {0}")]
    Socket(#[from] io::Error),
}

/// Session parameters
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub port: u16,
    /// Data type whose envelopes carry frame sample times
    pub frame_type_id: i32,
    /// Data type the annotations are published as
    pub annotation_type_id: i32,
    pub sender_stamp: u32,
    /// Deactivate the session on Ctrl-C
    pub watch_ctrl_c: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            frame_type_id: IMAGE_READING_ID,
            annotation_type_id: DIRECTION_ID,
            sender_stamp: 0,
            watch_ctrl_c: true,
        }
    }
}

/// State shared with the receive task
struct Shared {
    active: AtomicBool,
    handlers: RwLock<Vec<TimestampHandler>>,
    frame_type_id: i32,
    codec: Od4Codec,
}

impl Shared {
    fn new(frame_type_id: i32) -> Self {
        Self {
            active: AtomicBool::new(true),
            handlers: RwLock::new(Vec::new()),
            frame_type_id,
            codec: Od4Codec::default(),
        }
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Decode one datagram and hand frame sample times to the handlers
    fn dispatch(&self, datagram: &[u8]) {
        let payload = match self.codec.decode(datagram) {
            Ok(payload) => payload,
            Err(e) => {
                debug!("dropping datagram: {}", e);
                return;
            }
        };
        let mut envelope = match Envelope::decode(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!("dropping undecodable envelope: {}", e);
                return;
            }
        };
        envelope.received = Some(now());

        if envelope.data_type != self.frame_type_id {
            return;
        }
        let Some(sample_time) = envelope.sample_time() else {
            debug!(data_type = envelope.data_type, "envelope without timestamps");
            return;
        };

        let handlers = self.handlers.read().clone();
        for handler in handlers.iter() {
            handler(sample_time);
        }
    }
}

/// Pub/sub session on multicast group `225.0.0.<cid>`.
///
/// Owns a small tokio runtime running the receive task. Sends are
/// non-blocking and may be called from any thread.
pub struct Od4Session {
    shared: Arc<Shared>,
    socket: Arc<UdpSocket>,
    group: SocketAddrV4,
    options: SessionOptions,
    runtime: Mutex<Option<Runtime>>,
}

impl Od4Session {
    pub fn connect(cid: u16, options: SessionOptions) -> Result<Self, SessionError> {
        let last_octet = u8::try_from(cid).map_err(|_| SessionError::InvalidCid(cid))?;
        let group = SocketAddrV4::new(Ipv4Addr::new(225, 0, 0, last_octet), options.port);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("vat-session")
            .enable_all()
            .build()
            .map_err(SessionError::Runtime)?;

        let std_socket = bind_multicast(&group)?;
        let socket = {
            let _guard = runtime.enter();
            Arc::new(UdpSocket::from_std(std_socket)?)
        };

        let shared = Arc::new(Shared::new(options.frame_type_id));
        runtime.spawn(receive_loop(Arc::clone(&socket), Arc::clone(&shared)));
        if options.watch_ctrl_c {
            runtime.spawn(watch_ctrl_c(Arc::clone(&shared)));
        }

        info!("session {} joined {}", cid, group);
        Ok(Self {
            shared,
            socket,
            group,
            options,
            runtime: Mutex::new(Some(runtime)),
        })
    }

    pub fn group(&self) -> SocketAddrV4 {
        self.group
    }

    /// Deactivate the session and stop the receive task
    pub fn close(&self) {
        self.shared.deactivate();
        if let Some(runtime) = self.runtime.lock().take() {
            runtime.shutdown_background();
            info!("session on {} closed", self.group);
        }
    }
}

/// Envelope carrying `event` as a `Direction`, stamped with the event's
/// sample time and sent now.
pub fn annotation_envelope(
    options: &SessionOptions,
    event: &AnnotationEvent,
) -> Result<Envelope, BusError> {
    let sample = TimeStamp::try_from(event.timestamp)
        .map_err(|e| BusError::Encode(format!("timestamp {}: {}", event.timestamp, e)))?;
    Ok(Envelope {
        data_type: options.annotation_type_id,
        serialized_data: Direction::from(event).encode_to_vec(),
        sent: Some(now()),
        received: None,
        sample_time_stamp: Some(sample),
        sender_stamp: options.sender_stamp,
    })
}

impl MessageBus for Od4Session {
    fn register_timestamp_handler(&self, handler: TimestampHandler) {
        self.shared.handlers.write().push(handler);
    }

    fn send(&self, event: &AnnotationEvent) -> Result<(), BusError> {
        if !self.is_session_active() {
            return Err(BusError::Closed);
        }

        let datagram = annotation_envelope(&self.options, event)?
            .to_datagram(&self.shared.codec)
            .map_err(|e| BusError::Encode(e.to_string()))?;
        self.socket
            .try_send_to(&datagram, self.group.into())
            .map_err(|e| BusError::Send(e.to_string()))?;
        Ok(())
    }

    fn is_session_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }
}

impl Drop for Od4Session {
    fn drop(&mut self) {
        self.close();
    }
}

fn bind_multicast(group: &SocketAddrV4) -> io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_multicast_loop_v4(true)?;
    socket.bind(&SockAddr::from(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, group.port())))?;
    socket.join_multicast_v4(group.ip(), &Ipv4Addr::UNSPECIFIED)?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}

async fn receive_loop(socket: Arc<UdpSocket>, shared: Arc<Shared>) {
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, _from)) => shared.dispatch(&buf[..len]),
            Err(e) => {
                error!("session receive failed: {}", e);
                shared.deactivate();
                return;
            }
        }
    }
}

async fn watch_ctrl_c(shared: Arc<Shared>) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("interrupted, ending session");
            shared.deactivate();
        }
        Err(e) => warn!("cannot listen for Ctrl-C: {}", e),
    }
}

fn now() -> TimeStamp {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    TimeStamp {
        seconds: i32::try_from(since_epoch.as_secs()).unwrap_or(i32::MAX),
        microseconds: since_epoch.subsec_micros() as i32,
    }
}
