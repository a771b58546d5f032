//! Tunnel session lifecycle.
//!
//! A [`TunnelSession`] hands out at most one [`ActiveTunnel`] at a time. The
//! active tunnel owns the device; dropping it closes the device and frees the
//! session for the next `start`.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::TunnelConfig;
use crate::error::StartupError;
use crate::network::{TunnelDevice, TunnelProvider};

/// Acquires tunnel devices from a [`TunnelProvider`].
pub struct TunnelSession<P> {
    provider: P,
    active: Arc<AtomicBool>,
}

impl<P: TunnelProvider> TunnelSession<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Establish the tunnel device described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::AlreadyActive`] while a previously started
    /// tunnel is still alive, otherwise whatever the provider reports.
    pub fn start(&self, config: &TunnelConfig) -> Result<ActiveTunnel<P::Device>, StartupError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(label = %config.session_label, "tunnel start refused, one is already active");
            return Err(StartupError::AlreadyActive);
        }
        // Released on every exit path from here on, including provider errors.
        let guard = ActiveGuard(Arc::clone(&self.active));

        let device = self.provider.establish(config)?;
        info!(
            label = %config.session_label,
            address = %config.local_address,
            route = %config.route,
            "tunnel established"
        );

        let (signal, closed) = watch::channel(false);
        Ok(ActiveTunnel {
            device,
            running: Arc::new(AtomicBool::new(true)),
            signal: Arc::new(signal),
            closed,
            _guard: guard,
        })
    }

    /// Close `tunnel` and release its device.
    pub fn stop(&self, tunnel: ActiveTunnel<P::Device>) {
        tunnel.closer().close();
        drop(tunnel);
        debug!("tunnel released");
    }

    /// Whether a started tunnel is still alive.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Frees the session slot when the owning tunnel goes away.
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// An established tunnel device plus its cancellation state.
pub struct ActiveTunnel<D> {
    device: D,
    running: Arc<AtomicBool>,
    signal: Arc<watch::Sender<bool>>,
    closed: watch::Receiver<bool>,
    _guard: ActiveGuard,
}

impl<D> ActiveTunnel<D> {
    /// A handle that can close this tunnel from another task.
    pub fn closer(&self) -> TunnelCloser {
        TunnelCloser {
            running: Arc::clone(&self.running),
            signal: Arc::clone(&self.signal),
        }
    }

    /// The flag a packet loop over this tunnel should poll.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

impl<D: TunnelDevice> TunnelDevice for ActiveTunnel<D> {
    /// Read from the device, or fail as soon as the tunnel is closed.
    async fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Self { device, closed, .. } = self;
        tokio::select! {
            biased;
            () = wait_closed(closed) => Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "tunnel closed",
            )),
            result = device.read_frame(buf) => result,
        }
    }

    async fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.device.write_frame(frame).await
    }
}

async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    loop {
        let is_closed = *closed.borrow_and_update();
        if is_closed {
            return;
        }
        if closed.changed().await.is_err() {
            return;
        }
    }
}

/// Cancels an [`ActiveTunnel`]: clears its running flag and wakes a pending
/// read.
#[derive(Clone)]
pub struct TunnelCloser {
    running: Arc<AtomicBool>,
    signal: Arc<watch::Sender<bool>>,
}

impl TunnelCloser {
    /// Idempotent.
    pub fn close(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.signal.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        !self.running.load(Ordering::SeqCst)
    }
}
