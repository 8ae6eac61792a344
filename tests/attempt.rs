//! End-to-end attempt scenarios against fake collaborators.
//!
//! The three seams (rotator, prober, portal) are substituted with canned
//! implementations; the virtual clock makes the probe-bound property exact.

use async_trait::async_trait;
use portalhop::audit::IdentityLog;
use portalhop::config::Config;
use portalhop::iface::MacRotator;
use portalhop::notify::Notifier;
use portalhop::portal::{is_success_text, PortalClient, SignupOutcome, SignupRequest};
use portalhop::probe::Prober;
use portalhop::runner::{attempt, next_delay, Collaborators, Verdict};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

const ROTATION_OUTPUT: &str = "Current MAC:   00:11:22:33:44:55 (unknown)\n\
                               New MAC:        AA:BB:CC:DD:EE:FF \n";

struct CannedRotator(&'static str);

#[async_trait]
impl MacRotator for CannedRotator {
    async fn rotate(&self, _iface: &str) -> anyhow::Result<String> {
        Ok(self.0.to_string())
    }
}

struct CannedProbe {
    online: bool,
    calls: AtomicU32,
}

impl CannedProbe {
    fn new(online: bool) -> Self {
        Self {
            online,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Prober for CannedProbe {
    async fn is_online(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.online
    }
}

/// Returns fixed page text and remembers every request it saw.
struct CannedPortal {
    page_text: &'static str,
    requests: Mutex<Vec<SignupRequest>>,
}

impl CannedPortal {
    fn new(page_text: &'static str) -> Self {
        Self {
            page_text,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PortalClient for CannedPortal {
    async fn signup(&self, req: &SignupRequest) -> anyhow::Result<SignupOutcome> {
        self.requests.lock().unwrap().push(req.clone());
        Ok(SignupOutcome {
            connected: is_success_text(self.page_text),
            page_text: self.page_text.to_string(),
        })
    }
}

fn config(log_identities: bool) -> Config {
    Config {
        iface: "wlan0".to_string(),
        debug: false,
        show_agent: false,
        show_identity: false,
        log_identities,
        notify: false,
        show_page_text: false,
        screenshots: false,
        timeout_ms: 60_000,
    }
}

#[tokio::test]
async fn test_successful_signup_schedules_an_hour_out() {
    let dir = tempfile::tempdir().unwrap();
    let log = IdentityLog::new(dir.path().join("names.txt"));
    let cfg = config(true);

    let rotator = CannedRotator(ROTATION_OUTPUT);
    let prober = CannedProbe::new(true);
    let portal = CannedPortal::new(
        "Welcome! You Are Now Connected To The Internet. Enjoy your session.",
    );
    let seams = Collaborators {
        rotator: &rotator,
        prober: &prober,
        portal: &portal,
    };

    let verdict = attempt(&cfg, &seams, &log, &Notifier::new(false))
        .await
        .expect("attempt succeeds");

    assert_eq!(verdict, Verdict::Connected);
    assert_eq!(next_delay(verdict), Some(Duration::from_millis(3_600_000)));

    // The rotated address made it through extraction into the portal request,
    // alongside a fabricated AP address.
    let requests = portal.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].client_mac, "AA:BB:CC:DD:EE:FF");
    assert_ne!(requests[0].ap_mac, requests[0].client_mac);

    // Exactly one identity line was recorded.
    let contents = std::fs::read_to_string(dir.path().join("names.txt")).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains(&requests[0].identity.email));
}

#[tokio::test]
async fn test_failed_classification_stops_without_logging() {
    let dir = tempfile::tempdir().unwrap();
    let log = IdentityLog::new(dir.path().join("names.txt"));
    let cfg = config(true);

    let rotator = CannedRotator(ROTATION_OUTPUT);
    let prober = CannedProbe::new(true);
    let portal = CannedPortal::new("Sorry, something went wrong");
    let seams = Collaborators {
        rotator: &rotator,
        prober: &prober,
        portal: &portal,
    };

    let verdict = attempt(&cfg, &seams, &log, &Notifier::new(false))
        .await
        .expect("attempt completes");

    assert_eq!(verdict, Verdict::NotConnected);
    assert_eq!(next_delay(verdict), None);
    assert!(
        !dir.path().join("names.txt").exists(),
        "no identity may be recorded for a failed signup"
    );
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_network_proceeds_after_the_exact_bound() {
    let dir = tempfile::tempdir().unwrap();
    let log = IdentityLog::new(dir.path().join("names.txt"));
    let cfg = config(false);

    let rotator = CannedRotator(ROTATION_OUTPUT);
    let prober = CannedProbe::new(false);
    let portal = CannedPortal::new("You are now connected");
    let seams = Collaborators {
        rotator: &rotator,
        prober: &prober,
        portal: &portal,
    };

    let started = tokio::time::Instant::now();
    let verdict = attempt(&cfg, &seams, &log, &Notifier::new(false))
        .await
        .expect("attempt proceeds despite the dark network");

    // 30 probes, one second apart, then the run continues regardless.
    assert_eq!(prober.calls.load(Ordering::SeqCst), 30);
    assert_eq!(started.elapsed(), Duration::from_secs(30));
    assert_eq!(verdict, Verdict::Connected);
    assert_eq!(portal.requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unparseable_rotation_output_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let log = IdentityLog::new(dir.path().join("names.txt"));
    let cfg = config(false);

    let rotator = CannedRotator("ERROR: insufficient permissions, could not change MAC\n");
    let prober = CannedProbe::new(true);
    let portal = CannedPortal::new("You are now connected");
    let seams = Collaborators {
        rotator: &rotator,
        prober: &prober,
        portal: &portal,
    };

    let err = attempt(&cfg, &seams, &log, &Notifier::new(false))
        .await
        .expect_err("extraction must fail without a New MAC line");
    assert!(err.to_string().contains("rotated address"));
    assert!(
        portal.requests.lock().unwrap().is_empty(),
        "the browser must never launch without an extracted address"
    );
}
