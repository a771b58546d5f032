//! Dumbify - DNS filtering over a local tunnel.
//!
//! Dumbify opens a virtual network interface, reads every IPv4 packet routed
//! into it, and answers DNS queries for blocked domains with a synthetic
//! NXDOMAIN. Every other packet is written back untouched.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`config`]: Configuration loading and validation
//! - [`blocklist`]: Blocked entries, their sources and the lookup snapshot
//! - [`dns`]: Byte-level query parsing and blocked reply synthesis
//! - [`network`]: Tunnel device seam and its TUN backend
//! - [`session`]: One-at-a-time tunnel acquisition and cancellation
//! - [`pump`]: The read, decide, write loop
//! - [`service`]: Start/stop control surface
//! - [`error`]: Error types
//!
//! # Testing
//!
//! The tunnel sits behind the [`network::TunnelDevice`] and
//! [`network::TunnelProvider`] traits, so the whole pipeline runs against
//! in-memory devices:
//!
//! ```rust
//! use dumbify::blocklist::{BlocklistEntry, BlocklistSnapshot};
//! use dumbify::pump::{PacketPump, Verdict};
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicBool;
//!
//! let entries = [BlocklistEntry::new("example.com", "custom")];
//! let pump = PacketPump::new(
//!     BlocklistSnapshot::from_entries(&entries),
//!     Arc::new(AtomicBool::new(true)),
//! );
//! assert_eq!(pump.inspect(&[0u8; 12]), Verdict::NotDns);
//! ```

pub mod blocklist;
pub mod config;
pub mod dns;
pub mod error;
pub mod metrics;
pub mod network;
pub mod pump;
pub mod service;
pub mod session;

pub use config::Config;
pub use error::{Error, Result};
