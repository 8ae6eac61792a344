//! Hardware address rotation.
//!
//! The rotation itself is an opaque privileged shell pipeline around
//! `macchanger`; this module runs it, hands back its stdout, and knows how to
//! pull the freshly assigned address out of that output.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use regex::Regex;
use std::sync::OnceLock;
use tokio::process::Command;
use tracing::{debug, warn};

/// Rotation failures that callers may want to match on.
#[derive(Debug, thiserror::Error)]
pub enum RotateError {
    #[error("rotation output did not contain a `New MAC:` line")]
    MacNotFound,
}

/// Rotates the link-layer address of a network interface.
///
/// Production shells out; tests substitute canned output.
#[async_trait]
pub trait MacRotator: Send + Sync {
    /// Run the rotation and return the command's captured stdout.
    async fn rotate(&self, iface: &str) -> Result<String>;
}

/// The real rotation: stop the network manager, cycle the interface through
/// `macchanger -a`, restart the manager, and give the stack a moment to
/// settle. Requires sudo to be non-interactive for these commands.
pub struct Macchanger;

fn rotate_pipeline(iface: &str) -> String {
    format!(
        "sudo systemctl stop NetworkManager.service && \
         sudo ifconfig '{iface}' down && \
         sudo macchanger -a '{iface}' && \
         sudo ifconfig '{iface}' up && \
         sudo systemctl start NetworkManager.service && \
         sleep 3"
    )
}

#[async_trait]
impl MacRotator for Macchanger {
    async fn rotate(&self, iface: &str) -> Result<String> {
        let pipeline = rotate_pipeline(iface);
        debug!(%iface, "rotating hardware address");

        let output = Command::new("sh")
            .arg("-c")
            .arg(&pipeline)
            .output()
            .await
            .context("failed to run the rotation pipeline")?;

        // The exit code only rates a warning; a failed rotation surfaces
        // as MacNotFound at extraction.
        if !output.status.success() {
            warn!(status = %output.status, "rotation pipeline exited non-zero");
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(bytes = stdout.len(), "captured rotation output");
        Ok(stdout)
    }
}

fn mac_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"New MAC:\s+(\S+)").expect("mac regex is valid"))
}

/// Pull the rotated address out of `macchanger` output.
///
/// The output format is a hard dependency: the value after the `New MAC:`
/// label, with arbitrary surrounding whitespace. Anything else is a
/// deterministic [`RotateError::MacNotFound`], never a silent misparse.
pub fn extract_mac(output: &str) -> Result<String, RotateError> {
    mac_regex()
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or(RotateError::MacNotFound)
}

/// Fabricate the access-point address reported to the portal: six random
/// bytes with the locally-administered bit set and the multicast bit clear.
pub fn random_ap_mac() -> String {
    let mut rng = rand::thread_rng();
    let mut bytes = [0u8; 6];
    rng.fill(&mut bytes[..]);
    bytes[0] = (bytes[0] | 0x02) & 0xfe;
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_mac_with_arbitrary_whitespace() {
        let output = "Current MAC:   00:11:22:33:44:55 (unknown)\n\
                      Permanent MAC: 00:11:22:33:44:55 (unknown)\n\
                      New MAC:        AA:BB:CC:DD:EE:FF \n";
        assert_eq!(extract_mac(output).unwrap(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_extracts_mac_with_trailing_vendor() {
        let output = "New MAC:       aa:bb:cc:dd:ee:ff (Acme Networks)\n";
        assert_eq!(extract_mac(output).unwrap(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn test_fails_deterministically_without_the_label() {
        for output in [
            "",
            "no mac here",
            "Current MAC: AA:BB:CC:DD:EE:FF",
            "new mac:    AA:BB:CC:DD:EE:FF",
            "New MAC:",
        ] {
            assert!(
                matches!(extract_mac(output), Err(RotateError::MacNotFound)),
                "expected MacNotFound for {output:?}"
            );
        }
    }

    #[test]
    fn test_pipeline_quotes_the_interface() {
        let pipeline = rotate_pipeline("wlan0");
        assert!(pipeline.contains("macchanger -a 'wlan0'"));
        assert!(pipeline.contains("ifconfig 'wlan0' down"));
        assert!(pipeline.ends_with("sleep 3"));
    }

    #[test]
    fn test_random_ap_mac_shape() {
        for _ in 0..100 {
            let mac = random_ap_mac();
            let parts: Vec<&str> = mac.split(':').collect();
            assert_eq!(parts.len(), 6, "bad shape: {mac}");
            for part in &parts {
                assert_eq!(part.len(), 2);
                assert!(u8::from_str_radix(part, 16).is_ok(), "bad octet in {mac}");
            }
            let first = u8::from_str_radix(parts[0], 16).unwrap();
            assert_eq!(first & 0x02, 0x02, "not locally administered: {mac}");
            assert_eq!(first & 0x01, 0x00, "multicast bit set: {mac}");
        }
    }
}
