//! UDP transport-stream ingest.
//!
//! This module provides `VideoIngest`, which binds a UDP socket and runs a dedicated
//! receiver thread feeding an `IngestCore`.
//!
//! The receiver thread:
//! - Blocks in `recv_from` for at most the configured timeout
//! - Checks the terminate flag after every timeout and every datagram
//! - Takes the core lock only after a datagram has arrived, never across I/O
//! - Dies permanently on a hard socket error or an empty datagram
//!
//! Consumers never block on data: `recv` returns `None` when the ring is empty and
//! polling is left to the caller.

use anyhow::{anyhow, Context, Result};
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use super::IngestCore;
use crate::stats::IngestStats;
use crate::wire::UnitLayout;

/// Default receive timeout. Bounds shutdown latency.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// Two seconds of a 20 Mbit/s stream, before rounding to whole units.
pub const DEFAULT_BUFFER_BYTES: usize = 20_000_000 / 8 * 2;

/// Largest UDP payload. Oversized datagrams must be seen at full length to be rejected.
const MAX_DATAGRAM_SIZE: usize = 65535;

/// Options for `VideoIngest::open_with`.
#[derive(Clone, Debug)]
pub struct IngestOptions {
    pub bind_addr: IpAddr,
    /// Port to listen on. 0 picks an ephemeral port.
    pub port: u16,
    /// Usable ring capacity in bytes. Must be a non-zero multiple of the unit size.
    pub buffer_capacity: usize,
    pub layout: UnitLayout,
    pub recv_timeout: Duration,
    /// IPv4 multicast group to join on the bound interface.
    pub multicast_group: Option<Ipv4Addr>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        let layout = UnitLayout::default();
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 0,
            buffer_capacity: layout.whole_units(DEFAULT_BUFFER_BYTES),
            layout,
            recv_timeout: DEFAULT_RECV_TIMEOUT,
            multicast_group: None,
        }
    }
}

/// Receiver thread lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ReceiverState {
    Starting = 0,
    Listening = 1,
    Terminating = 2,
    Stopped = 3,
}

impl ReceiverState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ReceiverState::Starting,
            1 => ReceiverState::Listening,
            2 => ReceiverState::Terminating,
            _ => ReceiverState::Stopped,
        }
    }
}

/// Handle to a running UDP ingest.
///
/// Dropping the handle stops the receiver thread; `close` does the same and reports a
/// receiver panic.
pub struct VideoIngest {
    core: Arc<Mutex<IngestCore>>,
    local_addr: SocketAddr,
    state: Arc<AtomicU8>,
    terminate: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl VideoIngest {
    /// Listen on `listen_port` on all IPv4 interfaces with `buffer_capacity` bytes of
    /// ring and the default unit layout.
    pub fn open(listen_port: u16, buffer_capacity: usize) -> Result<Self> {
        Self::open_with(IngestOptions {
            port: listen_port,
            buffer_capacity,
            ..IngestOptions::default()
        })
    }

    pub fn open_with(options: IngestOptions) -> Result<Self> {
        if options.recv_timeout.is_zero() {
            return Err(anyhow!("receive timeout must be greater than zero"));
        }
        let core = IngestCore::new(options.layout, options.buffer_capacity)?;

        let bind_addr = SocketAddr::new(options.bind_addr, options.port);
        let socket = UdpSocket::bind(bind_addr)
            .with_context(|| format!("bind udp socket on {}", bind_addr))?;
        socket
            .set_read_timeout(Some(options.recv_timeout))
            .context("set udp read timeout")?;
        if let Some(group) = options.multicast_group {
            let interface = match options.bind_addr {
                IpAddr::V4(addr) => addr,
                IpAddr::V6(_) => {
                    return Err(anyhow!(
                        "multicast group {} requires an IPv4 bind address",
                        group
                    ))
                }
            };
            socket
                .join_multicast_v4(&group, &interface)
                .with_context(|| format!("join multicast group {}", group))?;
        }
        let local_addr = socket.local_addr().context("read bound udp address")?;

        let core = Arc::new(Mutex::new(core));
        let state = Arc::new(AtomicU8::new(ReceiverState::Starting as u8));
        let terminate = Arc::new(AtomicBool::new(false));
        let receiver = Receiver {
            socket,
            core: core.clone(),
            state: state.clone(),
            terminate: terminate.clone(),
        };
        let join = std::thread::Builder::new()
            .name("ts-ingest-rx".to_string())
            .spawn(move || receiver.run())
            .context("spawn receiver thread")?;

        log::info!(
            "ts ingest listening on {} (unit {} bytes, buffer {} bytes)",
            local_addr,
            options.layout.unit_size(),
            options.buffer_capacity
        );

        Ok(Self {
            core,
            local_addr,
            state,
            terminate,
            join: Some(join),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn local_port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Copy out the next contiguous span of at most `max_size` bytes, rounded down to
    /// whole units. Returns `None` when nothing is buffered.
    pub fn recv(&self, max_size: usize) -> Option<Vec<u8>> {
        let mut core = lock(&self.core);
        let span = core.recv(max_size);
        if span.is_empty() {
            None
        } else {
            Some(span.to_vec())
        }
    }

    /// Copy the next span into `buf`, returning the number of bytes written. 0 means no
    /// data, or `buf` is shorter than one unit.
    pub fn recv_into(&self, buf: &mut [u8]) -> usize {
        let mut core = lock(&self.core);
        let span = core.recv(buf.len());
        buf[..span.len()].copy_from_slice(span);
        span.len()
    }

    /// Drop buffered data and reset all validation state and counters in one step.
    pub fn flush(&self) {
        lock(&self.core).flush();
    }

    pub fn stats(&self) -> IngestStats {
        lock(&self.core).stats()
    }

    pub fn layout(&self) -> UnitLayout {
        lock(&self.core).layout()
    }

    /// Emit the current counters as one log line.
    pub fn log_stats(&self) {
        let (stats, buffered, capacity) = {
            let core = lock(&self.core);
            (core.stats(), core.buffered(), core.buffer_capacity())
        };
        log::info!(
            "ts ingest {}: {} buffered={}/{}",
            self.local_addr,
            stats,
            buffered,
            capacity
        );
    }

    pub fn receiver_state(&self) -> ReceiverState {
        ReceiverState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// False once the receiver has died or been told to stop.
    pub fn is_running(&self) -> bool {
        matches!(
            self.receiver_state(),
            ReceiverState::Starting | ReceiverState::Listening
        )
    }

    /// Stop the receiver thread and wait for it.
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        self.terminate.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("ts ingest receiver thread panicked"))?;
            log::info!("ts ingest on {} closed", self.local_addr);
        }
        Ok(())
    }
}

impl Drop for VideoIngest {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            log::error!("{}", err);
        }
    }
}

// ----------------------------------------------------------------------------
// Receiver thread
// ----------------------------------------------------------------------------

struct Receiver {
    socket: UdpSocket,
    core: Arc<Mutex<IngestCore>>,
    state: Arc<AtomicU8>,
    terminate: Arc<AtomicBool>,
}

impl Receiver {
    fn run(self) {
        self.set_state(ReceiverState::Listening);
        let mut datagram = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            match self.socket.recv_from(&mut datagram) {
                Ok((0, peer)) => {
                    log::error!("ts ingest received an empty datagram from {}; stopping", peer);
                    break;
                }
                Ok((len, _)) => {
                    lock(&self.core).accept_datagram(&datagram[..len]);
                }
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) => {}
                Err(err) => {
                    log::error!("ts ingest receiver stopped: {}", err);
                    break;
                }
            }

            if self.terminate.load(Ordering::SeqCst) {
                self.set_state(ReceiverState::Terminating);
                break;
            }
        }

        self.set_state(ReceiverState::Stopped);
    }

    fn set_state(&self, state: ReceiverState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}

/// Every critical section leaves the core consistent, so a poisoned lock is still usable.
fn lock(core: &Mutex<IngestCore>) -> MutexGuard<'_, IngestCore> {
    core.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_use_whole_units() {
        let options = IngestOptions::default();
        assert_eq!(options.buffer_capacity % options.layout.unit_size(), 0);
        assert!(options.buffer_capacity > 0);
        assert_eq!(options.recv_timeout, DEFAULT_RECV_TIMEOUT);
    }

    #[test]
    fn open_rejects_partial_unit_capacity() {
        let err = VideoIngest::open(0, 1316 * 4 + 1).err().unwrap();
        assert!(err.to_string().contains("multiple of the unit size"));
    }

    #[test]
    fn open_rejects_zero_timeout() {
        let options = IngestOptions {
            recv_timeout: Duration::ZERO,
            ..IngestOptions::default()
        };
        assert!(VideoIngest::open_with(options).is_err());
    }

    #[test]
    fn state_round_trips_through_atomic() {
        for state in [
            ReceiverState::Starting,
            ReceiverState::Listening,
            ReceiverState::Terminating,
            ReceiverState::Stopped,
        ] {
            assert_eq!(ReceiverState::from_u8(state as u8), state);
        }
    }
}
