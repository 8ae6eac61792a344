//! The connectivity-and-session loop.
//!
//! One [`attempt`] is the whole story: rotate the hardware address, wait for
//! the network, walk the portal form, classify the result. The outer driver
//! in `main` turns the returned verdict into a reschedule decision.

use crate::audit::IdentityLog;
use crate::config::Config;
use crate::iface::{extract_mac, random_ap_mac, MacRotator};
use crate::identity::Identity;
use crate::notify::Notifier;
use crate::portal::{PortalClient, SignupRequest};
use crate::probe::{wait_till_online, Prober, MAX_PROBE_ATTEMPTS};
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{debug, error, info};

/// Rest between attempts after a confirmed connection.
pub const SUCCESS_REST: Duration = Duration::from_millis(3_600_000);

/// Delay before retrying after an error anywhere in the attempt.
pub const RETRY_DELAY: Duration = Duration::from_millis(30_000);

/// How one attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The result page confirmed the connection.
    Connected,
    /// The form ran to completion but the page never confirmed.
    NotConnected,
}

/// The external collaborators an attempt drives.
pub struct Collaborators<'a> {
    pub rotator: &'a dyn MacRotator,
    pub prober: &'a dyn Prober,
    pub portal: &'a dyn PortalClient,
}

/// Map a verdict to the delay before the next attempt.
///
/// `Connected` rests an hour. `NotConnected` returns `None` and the driver
/// stops until restarted — deliberately not symmetric with the success
/// branch: a form that answers with a failure page usually means the portal
/// changed, and retrying hourly would only pile up error screenshots.
pub fn next_delay(verdict: Verdict) -> Option<Duration> {
    match verdict {
        Verdict::Connected => Some(SUCCESS_REST),
        Verdict::NotConnected => None,
    }
}

/// Run one end-to-end signup attempt.
pub async fn attempt(
    cfg: &Config,
    seams: &Collaborators<'_>,
    log: &IdentityLog,
    notifier: &Notifier,
) -> Result<Verdict> {
    let identity = Identity::generate();
    debug!(first = %identity.first, last = %identity.last, "generated identity");

    let rotation_output = seams
        .rotator
        .rotate(&cfg.iface)
        .await
        .context("hardware address rotation failed")?;

    notifier.connecting();

    if !wait_till_online(seams.prober, MAX_PROBE_ATTEMPTS).await {
        debug!("network never came up; continuing anyway");
    } else {
        debug!("online, continuing");
    }

    let client_mac = extract_mac(&rotation_output)
        .context("could not extract the rotated address from macchanger output")?;
    info!(%client_mac, "hardware address rotated");

    if cfg.show_identity {
        println!("First Name: {}", identity.first);
        println!("Last Name: {}", identity.last);
        println!("E-Mail: {}", identity.email);
    }

    let req = SignupRequest {
        identity: identity.clone(),
        client_mac,
        ap_mac: random_ap_mac(),
    };
    let outcome = seams.portal.signup(&req).await?;

    if outcome.connected {
        if cfg.log_identities {
            // Append failures are logged, not fatal.
            if let Err(e) = log.append(&identity) {
                error!("failed to record identity: {e:#}");
            }
        }
        notifier.connected();
        info!("wifi connected successfully");
        Ok(Verdict::Connected)
    } else {
        notifier.error();
        info!("portal did not confirm the connection");
        Ok(Verdict::NotConnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_resches_after_an_hour() {
        assert_eq!(
            next_delay(Verdict::Connected),
            Some(Duration::from_millis(3_600_000))
        );
    }

    #[test]
    fn test_not_connected_does_not_reschedule() {
        assert_eq!(next_delay(Verdict::NotConnected), None);
    }
}
