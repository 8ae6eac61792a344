//! Validated run configuration.
//!
//! One flat structure built from the CLI flags. Everything downstream takes
//! `&Config` instead of re-parsing arguments or consulting globals.

use anyhow::{bail, Result};

/// Configuration for one portalhop run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Network interface whose hardware address gets rotated (e.g. "wlan0").
    pub iface: String,
    /// Lower the log filter to debug.
    pub debug: bool,
    /// Echo the live user-agent reported by the portal page.
    pub show_agent: bool,
    /// Echo the generated name and email address.
    pub show_identity: bool,
    /// Append successful identities to the identity log file.
    pub log_identities: bool,
    /// Emit desktop notifications (connecting / connected / error).
    pub notify: bool,
    /// Echo the scraped result-page text.
    pub show_page_text: bool,
    /// Capture landing and result screenshots.
    pub screenshots: bool,
    /// Bound for page loads, in-form navigations, and element waits.
    pub timeout_ms: u64,
}

impl Config {
    /// Reject configurations that cannot work before the loop starts.
    ///
    /// The interface name is spliced into a shell pipeline, so it must look
    /// like an interface name and nothing else.
    pub fn validate(&self) -> Result<()> {
        if self.iface.is_empty() {
            bail!("interface name must not be empty");
        }
        if !self
            .iface
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            bail!("interface name {:?} contains invalid characters", self.iface);
        }
        if self.timeout_ms == 0 {
            bail!("timeout must be greater than zero");
        }
        Ok(())
    }
}
