//! Tunnel devices: the provider seam and its TUN backend.

pub mod device;
mod tun;

pub use device::{TunnelDevice, TunnelProvider};
pub use tun::{TunRsDevice, TunRsProvider};
