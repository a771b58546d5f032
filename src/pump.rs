//! The packet pump: read a frame, decide, write a frame.
//!
//! Every frame read from the tunnel is written back exactly once, either
//! unchanged or, for a query to a blocked domain, as a synthetic NXDOMAIN
//! reply. Frames are handled strictly one at a time and in order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use metrics::counter;
use tracing::{debug, error, info, instrument, trace};

use crate::blocklist::BlocklistSnapshot;
use crate::dns::{build_blocked_response, extract_domain, is_dns_query};
use crate::error::{Result, TunnelError};
use crate::metrics::{FRAMES_MALFORMED_TOTAL, FRAMES_TOTAL, QUERIES_BLOCKED_TOTAL};
use crate::network::TunnelDevice;

/// Largest frame read from the tunnel in one go.
pub const MAX_FRAME_SIZE: usize = 32_767;

/// What the pump does with one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Not UDP to port 53; forwarded unchanged.
    NotDns,
    /// A DNS query whose name could not be read; forwarded unchanged.
    Malformed,
    /// A DNS query for a domain that is not blocked; forwarded unchanged.
    Allowed,
    /// A DNS query for a blocked domain; `response` goes out instead.
    Blocked { domain: String, response: Vec<u8> },
}

/// Counters for one pump run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PumpStats {
    /// Non-empty frames read.
    pub frames: u64,
    /// Frames written back unchanged, malformed queries included.
    pub passed: u64,
    pub malformed: u64,
    pub blocked: u64,
}

/// Filters the frames of one tunnel against a fixed blocklist.
pub struct PacketPump {
    blocklist: BlocklistSnapshot,
    running: Arc<AtomicBool>,
}

impl PacketPump {
    pub fn new(blocklist: BlocklistSnapshot, running: Arc<AtomicBool>) -> Self {
        Self { blocklist, running }
    }

    /// Decide what to do with `frame`.
    pub fn inspect(&self, frame: &[u8]) -> Verdict {
        if !is_dns_query(frame) {
            return Verdict::NotDns;
        }
        let Some(domain) = extract_domain(frame) else {
            return Verdict::Malformed;
        };
        if !self.blocklist.is_blocked(&domain) {
            return Verdict::Allowed;
        }
        Verdict::Blocked {
            response: build_blocked_response(frame),
            domain,
        }
    }

    /// Pump frames until the running flag is cleared or the device fails.
    ///
    /// # Errors
    ///
    /// Returns [`TunnelError::Read`] or [`TunnelError::Write`] when the device
    /// fails while the pump is still meant to run. A read failing after
    /// cancellation ends the loop cleanly.
    #[instrument(skip_all, fields(blocked_domains = self.blocklist.len()))]
    pub async fn run<D: TunnelDevice>(&self, device: &mut D) -> Result<PumpStats> {
        let mut buf = vec![0u8; MAX_FRAME_SIZE];
        let mut stats = PumpStats::default();
        info!("packet pump started");

        while self.running.load(Ordering::SeqCst) {
            let len = match device.read_frame(&mut buf).await {
                Ok(len) => len,
                Err(err) if !self.running.load(Ordering::SeqCst) => {
                    debug!(error = %err, "read interrupted by shutdown");
                    break;
                }
                Err(err) => {
                    error!(error = %err, "tunnel read failed");
                    return Err(TunnelError::Read(err).into());
                }
            };
            if len == 0 {
                continue;
            }

            let frame = &buf[..len];
            stats.frames += 1;
            counter!(FRAMES_TOTAL).increment(1);

            let outcome = match self.inspect(frame) {
                Verdict::Blocked { domain, response } => {
                    info!(%domain, "blocked DNS query");
                    stats.blocked += 1;
                    counter!(QUERIES_BLOCKED_TOTAL).increment(1);
                    device.write_frame(&response).await
                }
                verdict => {
                    if verdict == Verdict::Malformed {
                        trace!(len, "unreadable DNS question, passing through");
                        stats.malformed += 1;
                        counter!(FRAMES_MALFORMED_TOTAL).increment(1);
                    }
                    stats.passed += 1;
                    device.write_frame(frame).await
                }
            };
            if let Err(err) = outcome {
                error!(error = %err, "tunnel write failed");
                return Err(TunnelError::Write(err).into());
            }
        }

        info!(
            frames = stats.frames,
            blocked = stats.blocked,
            malformed = stats.malformed,
            "packet pump stopped"
        );
        Ok(stats)
    }
}
