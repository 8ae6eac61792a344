// Copyright 2026 Portalhop Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use clap::Parser;
use portalhop::audit::{IdentityLog, NAMES_FILE};
use portalhop::config::Config;
use portalhop::iface::Macchanger;
use portalhop::notify::Notifier;
use portalhop::portal::chromium::ChromiumPortal;
use portalhop::probe::PublicDnsProbe;
use portalhop::runner::{self, Collaborators, RETRY_DELAY};
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "portalhop",
    about = "Captive-portal WiFi signup robot — rotate the MAC, walk the portal form, get online",
    version
)]
struct Cli {
    /// Interface to use
    #[arg(long, short, required_unless_present = "doctor")]
    iface: Option<String>,

    /// Run with debug output
    #[arg(long, short)]
    debug: bool,

    /// Output the live user-agent to the console
    #[arg(long, short)]
    agent: bool,

    /// Output name and email to the console
    #[arg(long, short)]
    emailname: bool,

    /// Save names and e-mail addresses to file
    #[arg(long, short)]
    lognames: bool,

    /// Graphic notices
    #[arg(long, short)]
    notify: bool,

    /// Output the result page text to the console
    #[arg(long, short)]
    pagetext: bool,

    /// Take screenshots of the web site
    #[arg(long, short)]
    screenshots: bool,

    /// Time to wait for page loads, in milliseconds
    #[arg(long, short, default_value = "60000")]
    timeout: u64,

    /// Check environment readiness and exit
    #[arg(long)]
    doctor: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.doctor {
        return portalhop::doctor::run();
    }

    let cfg = Config {
        iface: cli.iface.unwrap_or_default(),
        debug: cli.debug,
        show_agent: cli.agent,
        show_identity: cli.emailname,
        log_identities: cli.lognames,
        notify: cli.notify,
        show_page_text: cli.pagetext,
        screenshots: cli.screenshots,
        timeout_ms: cli.timeout,
    };
    cfg.validate().context("invalid configuration")?;

    let default_level = if cfg.debug {
        "portalhop=debug"
    } else {
        "portalhop=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.parse().expect("valid filter directive")),
        )
        .init();

    info!("starting portalhop v{}", env!("CARGO_PKG_VERSION"));

    let rotator = Macchanger;
    let prober = PublicDnsProbe;
    let portal = ChromiumPortal::new(cfg.clone());
    let seams = Collaborators {
        rotator: &rotator,
        prober: &prober,
        portal: &portal,
    };
    let log = IdentityLog::new(NAMES_FILE);
    let notifier = Notifier::new(cfg.notify);

    // The driver loop. Success rests an hour; an error anywhere retries in
    // 30 seconds, flat, forever. A completed form that never confirmed the
    // connection ends the loop — see runner::next_delay.
    loop {
        match runner::attempt(&cfg, &seams, &log, &notifier).await {
            Ok(verdict) => match runner::next_delay(verdict) {
                Some(delay) => {
                    info!("next attempt in {}s", delay.as_secs());
                    tokio::time::sleep(delay).await;
                }
                None => {
                    warn!("signup form did not confirm a connection; stopping until restarted");
                    break;
                }
            },
            Err(e) => {
                warn!("attempt failed: {e:#}");
                info!("retrying in {}s", RETRY_DELAY.as_secs());
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }

    Ok(())
}
