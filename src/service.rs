//! Lifecycle control for the filter: start, stop and observe the pump.

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::blocklist::{BlocklistEntry, BlocklistSnapshot};
use crate::config::TunnelConfig;
use crate::error::Result;
use crate::network::TunnelProvider;
use crate::pump::{PacketPump, PumpStats};
use crate::session::{TunnelCloser, TunnelSession};

/// Runs at most one filtering tunnel at a time.
///
/// The limit holds per service: each `FilterService` owns its own
/// [`TunnelSession`], so two services can each run a tunnel. A process is
/// expected to build a single service.
///
/// The blocklist is captured when the tunnel starts; to apply a changed list,
/// stop and start again.
pub struct FilterService<P> {
    session: TunnelSession<P>,
    current: Option<RunningPump>,
}

struct RunningPump {
    closer: TunnelCloser,
    handle: JoinHandle<Result<PumpStats>>,
}

impl<P: TunnelProvider> FilterService<P> {
    pub fn new(provider: P) -> Self {
        Self {
            session: TunnelSession::new(provider),
            current: None,
        }
    }

    /// Establish the tunnel and spawn the packet pump on it.
    ///
    /// A previous run that ended without being waited on or stopped is
    /// collected first and its outcome logged.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Startup`] when a tunnel is already running or
    /// the host refuses to create one. No pump is started in that case.
    pub async fn start(&mut self, config: &TunnelConfig, entries: &[BlocklistEntry]) -> Result<()> {
        let snapshot = BlocklistSnapshot::from_entries(entries);
        let mut tunnel = self.session.start(config)?;

        // A live pump holds the session, so a recorded one has already ended.
        if let Some(previous) = self.current.take() {
            match previous.handle.await {
                Ok(Ok(stats)) => info!(frames = stats.frames, "previous filter run ended"),
                Ok(Err(err)) => warn!(error = %err, "previous filter run ended with error"),
                Err(err) => warn!(error = %err, "previous filter task failed"),
            }
        }

        info!(
            label = %config.session_label,
            blocked_domains = snapshot.len(),
            "filter started"
        );

        let closer = tunnel.closer();
        let pump = PacketPump::new(snapshot, tunnel.running_flag());
        // The tunnel lives inside the task; it is released when the pump ends.
        let handle = tokio::spawn(async move { pump.run(&mut tunnel).await });

        self.current = Some(RunningPump { closer, handle });
        Ok(())
    }

    /// Whether the pump is still running.
    pub fn is_running(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|pump| !pump.closer.is_closed() && !pump.handle.is_finished())
    }

    /// Close the tunnel and wait for the pump to wind down.
    ///
    /// Does nothing when no pump is running, so it can be called repeatedly.
    /// Returns default stats in that case.
    ///
    /// # Errors
    ///
    /// Returns the error the pump ended with, if it failed before being
    /// stopped.
    pub async fn stop(&mut self) -> Result<PumpStats> {
        let Some(pump) = self.current.take() else {
            return Ok(PumpStats::default());
        };

        pump.closer.close();
        let stats = pump.handle.await??;
        info!(
            frames = stats.frames,
            blocked = stats.blocked,
            "filter stopped"
        );
        Ok(stats)
    }

    /// Wait for the pump to end on its own.
    ///
    /// Cancel-safe: dropping the returned future leaves the pump running.
    /// Returns default stats when nothing is running.
    ///
    /// # Errors
    ///
    /// Returns the tunnel error that ended the pump.
    pub async fn wait(&mut self) -> Result<PumpStats> {
        let Some(pump) = self.current.as_mut() else {
            return Ok(PumpStats::default());
        };

        let outcome = (&mut pump.handle).await;
        self.current = None;
        let result = outcome?;
        if let Err(err) = &result {
            warn!(error = %err, "filter ended with error");
        }
        result
    }

    /// Run until `shutdown` resolves or the pump ends on its own, then stop.
    ///
    /// # Errors
    ///
    /// Returns the tunnel error when the pump fails before `shutdown`.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<PumpStats>
    where
        F: Future<Output = ()>,
    {
        let ended = tokio::select! {
            () = shutdown => None,
            result = self.wait() => Some(result),
        };

        match ended {
            Some(result) => result,
            None => {
                info!("shutdown requested");
                self.stop().await
            }
        }
    }
}
