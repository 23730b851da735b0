//! UDP tracking receiver.
//!
//! A background thread keeps the most recent parsed packet. The frame loop waits until a
//! packet has arrived at least once and then reads whatever is newest; stale data is
//! fine. Control messages to the tracking client go out on a separate short-lived socket.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use socket2::SockRef;
use tracing::{debug, info, warn};

use crate::error::{XrError, XrResult};
use crate::pose::PoseSnapshot;

const MAX_DATAGRAM: usize = 1024;
const RECV_POLL: Duration = Duration::from_millis(100);
const RECV_BUFFER_BYTES: usize = 64 * 1024;

/// Stereo mode and target field of view announced to the tracking client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlMessage {
    /// 0 monocular, 1 side-by-side stereo.
    pub mode: u32,
    pub fov_horizontal: f32,
    pub fov_vertical: f32,
}

impl Default for ControlMessage {
    fn default() -> Self {
        Self {
            mode: 1,
            fov_horizontal: 104.5,
            fov_vertical: 104.5,
        }
    }
}

impl ControlMessage {
    pub fn encode(&self) -> String {
        format!(
            "0 0 1 {} {:.6} {:.6}",
            self.mode, self.fov_horizontal, self.fov_vertical
        )
    }
}

#[derive(Default)]
struct Shared {
    latest: Mutex<Option<PoseSnapshot>>,
    arrived: Condvar,
    stop: AtomicBool,
    packets: AtomicU64,
    rejected: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Option<PoseSnapshot>> {
        match self.latest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn publish(&self, snapshot: PoseSnapshot) {
        *self.lock() = Some(snapshot);
        self.packets.fetch_add(1, Ordering::Relaxed);
        self.arrived.notify_all();
    }
}

pub struct PoseSource {
    shared: Arc<Shared>,
    local_addr: Option<SocketAddr>,
    control_addr: SocketAddr,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PoseSource {
    /// Listen on `0.0.0.0:pose_port` and send control messages to `127.0.0.1:control_port`.
    pub fn start(pose_port: u16, control_port: u16) -> XrResult<Self> {
        Self::bind(
            SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, pose_port)),
            SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, control_port)),
        )
    }

    pub fn bind(listen: SocketAddr, control_addr: SocketAddr) -> XrResult<Self> {
        let socket = UdpSocket::bind(listen)
            .map_err(|e| XrError::runtime(format!("bind pose socket {listen}: {e}")))?;
        socket
            .set_read_timeout(Some(RECV_POLL))
            .map_err(|e| XrError::runtime(format!("pose socket timeout: {e}")))?;
        if let Err(e) = SockRef::from(&socket).set_recv_buffer_size(RECV_BUFFER_BYTES) {
            debug!("failed to set pose socket receive buffer: {}", e);
        }
        let local_addr = socket
            .local_addr()
            .map_err(|e| XrError::runtime(format!("pose socket address: {e}")))?;

        let shared = Arc::new(Shared::default());
        let worker_state = shared.clone();
        let worker = thread::Builder::new()
            .name("wxr-pose-rx".to_string())
            .spawn(move || receive_loop(socket, worker_state))
            .map_err(|e| XrError::runtime(format!("thread spawn: {e}")))?;
        info!(%local_addr, %control_addr, "pose receiver started");

        Ok(Self {
            shared,
            local_addr: Some(local_addr),
            control_addr,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Source fed only through [`PoseSource::publish`]. Used when no network is wanted.
    pub fn manual(control_addr: SocketAddr) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            local_addr: None,
            control_addr,
            worker: Mutex::new(None),
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn publish(&self, snapshot: PoseSnapshot) {
        self.shared.publish(snapshot);
    }

    pub fn latest(&self) -> Option<PoseSnapshot> {
        self.shared.lock().clone()
    }

    pub fn packets_received(&self) -> u64 {
        self.shared.packets.load(Ordering::Relaxed)
    }

    pub fn packets_rejected(&self) -> u64 {
        self.shared.rejected.load(Ordering::Relaxed)
    }

    /// Block until a packet has ever arrived, then return the newest one. With a timeout,
    /// returns `None` if nothing arrived in time.
    pub fn wait_first(&self, timeout: Option<Duration>) -> Option<PoseSnapshot> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut guard = self.shared.lock();
        loop {
            if let Some(snapshot) = guard.as_ref() {
                return Some(snapshot.clone());
            }
            if self.shared.stop.load(Ordering::Relaxed) {
                return None;
            }
            guard = match deadline {
                None => match self.shared.arrived.wait_timeout(guard, RECV_POLL) {
                    Ok((g, _)) => g,
                    Err(poisoned) => poisoned.into_inner().0,
                },
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return None;
                    }
                    match self.shared.arrived.wait_timeout(guard, deadline - now) {
                        Ok((g, _)) => g,
                        Err(poisoned) => poisoned.into_inner().0,
                    }
                }
            };
        }
    }

    pub fn send_control(&self, message: &ControlMessage) -> XrResult<()> {
        let text = message.encode();
        let socket = UdpSocket::bind(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)))
            .map_err(|e| XrError::runtime(format!("bind control socket: {e}")))?;
        socket
            .send_to(text.as_bytes(), self.control_addr)
            .map_err(|e| XrError::runtime(format!("send control to {}: {e}", self.control_addr)))?;
        debug!(to = %self.control_addr, message = %text, "control message sent");
        Ok(())
    }

    pub fn shutdown(&self) {
        self.shared.stop.store(true, Ordering::Relaxed);
        self.shared.arrived.notify_all();
        let worker = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(worker) = worker {
            if worker.join().is_err() {
                warn!("pose receiver thread panicked");
            }
            info!(packets = self.packets_received(), "pose receiver stopped");
        }
    }
}

impl Drop for PoseSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn receive_loop(socket: UdpSocket, shared: Arc<Shared>) {
    let mut buf = [0u8; MAX_DATAGRAM];
    while !shared.stop.load(Ordering::Relaxed) {
        let len = match socket.recv_from(&mut buf) {
            Ok((len, _)) => len,
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                continue
            }
            Err(e) => {
                warn!("pose socket receive failed: {}", e);
                thread::sleep(RECV_POLL);
                continue;
            }
        };
        if len == 0 || len >= MAX_DATAGRAM {
            shared.rejected.fetch_add(1, Ordering::Relaxed);
            continue;
        }
        let text = String::from_utf8_lossy(&buf[..len]);
        match PoseSnapshot::parse(&text) {
            Ok(snapshot) => shared.publish(snapshot),
            Err(e) => {
                let rejected = shared.rejected.fetch_add(1, Ordering::Relaxed);
                if rejected < 10 || rejected % 100 == 0 {
                    warn!(error = %e, "dropping malformed pose packet");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_message_text() {
        assert_eq!(
            ControlMessage::default().encode(),
            "0 0 1 1 104.500000 104.500000"
        );
    }

    #[test]
    fn test_manual_wait_times_out_then_returns_latest() {
        let source = PoseSource::manual("127.0.0.1:9".parse().unwrap());
        assert!(source
            .wait_first(Some(Duration::from_millis(20)))
            .is_none());
        let mut snapshot = PoseSnapshot::identity();
        snapshot.frame_id = 7;
        source.publish(snapshot);
        assert_eq!(source.wait_first(None).unwrap().frame_id, 7);
        assert_eq!(source.packets_received(), 1);
    }

    #[test]
    fn test_wait_wakes_on_publish() {
        let source = Arc::new(PoseSource::manual("127.0.0.1:9".parse().unwrap()));
        let publisher = source.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            let mut snapshot = PoseSnapshot::identity();
            snapshot.frame_id = 42;
            publisher.publish(snapshot);
        });
        let got = source.wait_first(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(got.frame_id, 42);
        handle.join().unwrap();
    }
}
