//! Reachability polling.
//!
//! A cheap "are we online yet" check: can we open a TCP connection to a
//! well-known public DNS server? Polled once per second after a rotation,
//! bounded, and deliberately soft — captive portals keep the LAN dark until
//! the signup completes, so exhausting the bound is an expected state, not a
//! failure.

use async_trait::async_trait;
use indicatif::ProgressBar;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Probe target: Google public DNS.
const PROBE_ADDR: &str = "8.8.8.8:53";

/// Per-attempt connect timeout.
const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Spacing between attempts.
const PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Attempts before [`wait_till_online`] gives up and lets the run continue.
pub const MAX_PROBE_ATTEMPTS: u32 = 30;

/// Answers "is outbound connectivity available right now".
#[async_trait]
pub trait Prober: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// TCP connect against [`PROBE_ADDR`].
pub struct PublicDnsProbe;

#[async_trait]
impl Prober for PublicDnsProbe {
    async fn is_online(&self) -> bool {
        matches!(
            tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(PROBE_ADDR)).await,
            Ok(Ok(_))
        )
    }
}

/// Poll until the probe succeeds or `max_attempts` once-per-second attempts
/// are exhausted. Returns `true` when online, `false` on give-up — never an
/// error, the caller proceeds either way.
pub async fn wait_till_online(probe: &dyn Prober, max_attempts: u32) -> bool {
    debug!("waiting till online");
    let bar = ProgressBar::new(u64::from(max_attempts));

    let mut tried = 0;
    loop {
        if tried >= max_attempts {
            bar.finish_and_clear();
            debug!("waited over a minute, attempting to continue anyway");
            return false;
        }
        if probe.is_online().await {
            bar.finish_and_clear();
            return true;
        }
        tried += 1;
        bar.inc(1);
        tokio::time::sleep(PROBE_INTERVAL).await;
    }
}
