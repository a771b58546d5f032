//! TUN interface backend built on `tun-rs`.

use std::io;

use tracing::{info, warn};

use super::device::{TunnelDevice, TunnelProvider};
use crate::config::TunnelConfig;
use crate::error::StartupError;

/// Host prefix length of the tunnel's local address.
const LOCAL_PREFIX_LEN: u8 = 32;

/// Creates TUN interfaces on the host.
///
/// Requires the privileges to create network interfaces (`CAP_NET_ADMIN` on
/// Linux). Must be used from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TunRsProvider;

impl TunRsProvider {
    pub const fn new() -> Self {
        Self
    }
}

impl TunnelProvider for TunRsProvider {
    type Device = TunRsDevice;

    fn establish(&self, config: &TunnelConfig) -> Result<TunRsDevice, StartupError> {
        let device = tun_rs::DeviceBuilder::new()
            .name(config.interface_name.as_str())
            .ipv4(config.local_address, LOCAL_PREFIX_LEN, None)
            .build_async()
            .map_err(StartupError::from_io)?;

        let name = device
            .name()
            .unwrap_or_else(|_| config.interface_name.clone());
        info!(
            interface = %name,
            address = %config.local_address,
            label = %config.session_label,
            "tunnel interface created"
        );
        // Routing and resolver settings belong to the host; this backend only
        // owns the interface.
        warn!(
            interface = %name,
            route = %config.route,
            upstream_dns = %config.upstream_dns,
            "route and DNS server must be pointed at the tunnel by the host"
        );

        Ok(TunRsDevice { inner: device })
    }
}

/// An open TUN interface. Closed when dropped.
pub struct TunRsDevice {
    inner: tun_rs::AsyncDevice,
}

impl TunnelDevice for TunRsDevice {
    async fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.recv(buf).await
    }

    async fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        let written = self.inner.send(frame).await?;
        if written != frame.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short tunnel write: {written} of {} bytes", frame.len()),
            ));
        }
        Ok(())
    }
}
