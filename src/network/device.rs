//! Tunnel device abstraction.
//!
//! Provides trait-based seams over the host network subsystem to enable:
//! - Testing the packet pump without creating real interfaces
//! - Swapping the platform backend that hands out the device

use std::future::Future;
use std::io;

use crate::config::TunnelConfig;
use crate::error::StartupError;

/// A duplex, frame-oriented channel over a virtual network device.
///
/// Each read returns one raw IPv4 packet; each write injects one.
pub trait TunnelDevice: Send {
    /// Wait for the next frame and copy it into `buf`.
    ///
    /// Returns the number of bytes read. An error means the device is gone.
    fn read_frame(&mut self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send;

    /// Write one frame back into the tunnel.
    fn write_frame(&mut self, frame: &[u8]) -> impl Future<Output = io::Result<()>> + Send;
}

/// The host facility that hands out tunnel devices.
pub trait TunnelProvider: Send + Sync {
    type Device: TunnelDevice + 'static;

    /// Request a device configured from `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`StartupError`] when the host refuses or fails the request.
    fn establish(&self, config: &TunnelConfig) -> Result<Self::Device, StartupError>;
}
