//! Portal contract: the signup walkthrough seam, URL construction, and
//! outcome classification.
//!
//! The captive portal itself is an external collaborator; everything the loop
//! needs from it goes through [`PortalClient`] so the real Chromium
//! walkthrough and the test fakes are interchangeable.

pub mod chromium;

use crate::identity::Identity;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

/// Portal entry point.
pub const PORTAL_BASE: &str = "http://cwifi-new.cox.com/";

/// Fixed portal query parameters.
pub const PORTAL_SSID: &str = "CoxWiFi";
pub const PORTAL_VLAN: &str = "103";
pub const PORTAL_NAS_ID: &str = "BTNRWAGB01.at.at.cox.net";

/// Substring whose presence in the rendered result text means we are online.
/// Matching is case-insensitive.
pub const SUCCESS_PHRASE: &str = "you are now connected";

/// CSS selectors for the signup walkthrough. The portal's DOM is a hard
/// dependency; when it changes, the element waits time out and the attempt
/// retries from the top.
pub mod selectors {
    pub const REGISTER_BUTTON: &str =
        "#signIn > .signInText > .freeAccessPassSignup > .floatleft > .coxRegisterButton";
    pub const FIRST_NAME: &str = "table #trial_request_voucher_form_firstName";
    pub const LAST_NAME: &str = "table #trial_request_voucher_form_lastName";
    pub const PROVIDER: &str = "table #trial_request_voucher_form_isp";
    pub const EMAIL: &str = "table #trial_request_voucher_form_email";
    pub const DECISION_CELL: &str = ".decisionBlock > table > tbody > tr > .top:nth-child(2)";
    pub const TERMS_CHECKBOX: &str = "table #trial_request_voucher_form_serviceTerms";
}

/// Provider picked in the signup form's dropdown.
pub const PROVIDER_CHOICE: &str = "Verizon";

/// Fixed relative screenshot paths.
pub const LANDING_SHOT: &str = "landing.jpeg";
pub const RESULT_SHOT: &str = "result.jpeg";
pub const ERROR_SHOT: &str = "error-result.jpeg";

/// Everything one signup attempt feeds into the walkthrough.
#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub identity: Identity,
    /// The freshly rotated interface address.
    pub client_mac: String,
    /// The fabricated access-point address.
    pub ap_mac: String,
}

/// What came back from the walkthrough.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupOutcome {
    /// Classification of [`SignupOutcome::page_text`] via [`is_success_text`].
    pub connected: bool,
    /// Full rendered text of the page the form submission landed on.
    pub page_text: String,
}

/// Drives the portal's signup form end to end.
#[async_trait]
pub trait PortalClient: Send + Sync {
    async fn signup(&self, req: &SignupRequest) -> Result<SignupOutcome>;
}

/// Build the portal URL for a rotated client address and fabricated AP
/// address. Assembled textually so the query survives verbatim — the portal
/// expects raw colons in the addresses and the literal `$HASH` token.
pub fn portal_url(client_mac: &str, ap_mac: &str) -> Result<Url> {
    let raw = format!(
        "{PORTAL_BASE}?mac-address={client_mac}&ap-mac={ap_mac}&ssid={PORTAL_SSID}\
         &vlan={PORTAL_VLAN}&nas-id={PORTAL_NAS_ID}&block=false&unique=$HASH"
    );
    Ok(Url::parse(&raw)?)
}

/// Case-insensitive test for [`SUCCESS_PHRASE`] anywhere in the scraped text.
pub fn is_success_text(text: &str) -> bool {
    text.to_lowercase().contains(SUCCESS_PHRASE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_phrase_matches_case_insensitively() {
        assert!(is_success_text("You Are Now Connected To The Internet"));
        assert!(is_success_text("... you are now connected ..."));
        assert!(is_success_text("YOU ARE NOW CONNECTED"));
    }

    #[test]
    fn test_near_miss_text_does_not_match() {
        assert!(!is_success_text("You are connected now"));
        assert!(!is_success_text("you are not connected"));
        assert!(!is_success_text("now connected"));
        assert!(!is_success_text("Sorry, something went wrong"));
        assert!(!is_success_text(""));
    }

    #[test]
    fn test_portal_url_carries_all_parameters() {
        let url = portal_url("AA:BB:CC:DD:EE:FF", "02:00:00:11:22:33").unwrap();
        assert_eq!(url.host_str(), Some("cwifi-new.cox.com"));
        let query = url.query().expect("portal url has a query");
        assert!(query.contains("mac-address=AA:BB:CC:DD:EE:FF"));
        assert!(query.contains("ap-mac=02:00:00:11:22:33"));
        assert!(query.contains("ssid=CoxWiFi"));
        assert!(query.contains("vlan=103"));
        assert!(query.contains("nas-id=BTNRWAGB01.at.at.cox.net"));
        assert!(query.contains("block=false"));
        assert!(query.contains("unique=$HASH"));
    }
}
