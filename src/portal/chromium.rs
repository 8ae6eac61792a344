//! Chromium-based portal walkthrough using chromiumoxide.
//!
//! One isolated headless browser per signup attempt: spoofed user-agent,
//! sandbox disabled, `preload.js` injected before any page script, and the
//! whole form choreography driven through CDP key events so the portal sees
//! keystrokes rather than DOM writes.

use super::{
    is_success_text, portal_url, selectors, PortalClient, SignupOutcome, SignupRequest,
    ERROR_SHOT, LANDING_SHOT, PROVIDER_CHOICE, RESULT_SHOT,
};
use crate::config::Config;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::browser_protocol::inspector::EventTargetCrashed;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use rand::Rng;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Stealth bootstrap injected into every new document.
const PRELOAD_PATH: &str = "preload.js";

/// Viewport the form is laid out for.
const FORM_VIEWPORT: (i64, i64) = (1440, 779);

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("PORTALHOP_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// The real walkthrough over a headless Chromium.
pub struct ChromiumPortal {
    cfg: Config,
}

impl ChromiumPortal {
    pub fn new(cfg: Config) -> Self {
        Self { cfg }
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.cfg.timeout_ms)
    }

    async fn launch(&self, user_agent: &str) -> Result<(Browser, tokio::task::JoinHandle<()>)> {
        let chrome = find_chromium()
            .context("Chromium not found; install google-chrome or chromium, or set PORTALHOP_CHROMIUM_PATH")?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome)
            .arg("--headless=new")
            .arg("--incognito")
            .arg(format!("--user-agent={user_agent}"))
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-infobars")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--ignore-certificate-errors")
            .arg("--window-position=0,0")
            .window_size(1440, 900)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok((browser, handler_task))
    }

    async fn wait_for_nav(&self, page: &Page) -> Result<()> {
        match tokio::time::timeout(self.timeout(), page.wait_for_navigation()).await {
            Ok(res) => {
                res.context("page navigation failed")?;
                Ok(())
            }
            Err(_) => bail!(
                "page navigation did not complete within {}ms",
                self.cfg.timeout_ms
            ),
        }
    }

    /// Rethrow an observed page-crash event as an error.
    fn check_crash(&self, crashed: &AtomicBool) -> Result<()> {
        if crashed.load(Ordering::SeqCst) {
            bail!("portal page crashed");
        }
        Ok(())
    }

    async fn walkthrough(
        &self,
        page: &Page,
        req: &SignupRequest,
        crashed: &AtomicBool,
    ) -> Result<SignupOutcome> {
        let timeout = self.timeout();
        let url = portal_url(&req.client_mac, &req.ap_mac)?;
        info!(%url, "navigating to portal");

        match tokio::time::timeout(timeout, page.goto(url.as_str())).await {
            Ok(nav) => {
                nav.context("portal navigation failed")?;
            }
            Err(_) => bail!("portal navigation timed out after {}ms", self.cfg.timeout_ms),
        }
        // Let the landing page settle; slow portals finish rendering late.
        let _ = tokio::time::timeout(timeout, page.wait_for_navigation()).await;
        self.check_crash(crashed)?;

        if self.cfg.screenshots {
            capture(page, LANDING_SHOT).await?;
        }

        // The register button only marks the landing page as ready; entry is
        // keyboard-driven, two tabs and a confirm.
        wait_for_element(page, selectors::REGISTER_BUTTON, timeout).await?;
        press_key(page, "Tab").await?;
        press_key(page, "Tab").await?;
        press_key(page, "Enter").await?;
        self.wait_for_nav(page).await?;
        self.check_crash(crashed)?;

        let live_agent: String = page
            .evaluate("navigator.userAgent")
            .await
            .context("failed to read the live user-agent")?
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert user-agent result: {e:?}"))?;
        debug!(%live_agent, "portal page sees this agent");
        if self.cfg.show_agent {
            println!("Using user-agent: {live_agent}");
        }

        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(FORM_VIEWPORT.0)
            .height(FORM_VIEWPORT.1)
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .expect("viewport params are valid");
        page.execute(metrics)
            .await
            .context("failed to set the form viewport")?;

        let identity = &req.identity;
        click_element(page, selectors::FIRST_NAME, timeout).await?;
        type_text(page, &identity.first, typing_delay()).await?;

        click_element(page, selectors::LAST_NAME, timeout).await?;
        type_text(page, &identity.last, typing_delay()).await?;

        click_element(page, selectors::PROVIDER, timeout).await?;
        self.select_provider(page).await?;

        click_element(page, selectors::EMAIL, timeout).await?;
        type_text(page, &identity.email, typing_delay()).await?;

        click_element(page, selectors::DECISION_CELL, timeout).await?;
        click_element(page, selectors::TERMS_CHECKBOX, timeout).await?;

        press_key(page, "Tab").await?;
        press_key(page, "Tab").await?;
        press_key(page, "Enter").await?;
        self.wait_for_nav(page).await?;
        self.check_crash(crashed)?;

        let page_text: String = page
            .evaluate("document.body.innerText")
            .await
            .context("failed to read the result page text")?
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert page text: {e:?}"))?;
        if self.cfg.show_page_text {
            println!("pageText: {page_text}");
        }

        let connected = is_success_text(&page_text);
        if connected {
            if self.cfg.screenshots {
                capture(page, RESULT_SHOT).await?;
            }
        } else {
            // Diagnostic shot, taken regardless of the screenshot flag.
            capture(page, ERROR_SHOT).await?;
        }

        Ok(SignupOutcome {
            connected,
            page_text,
        })
    }

    async fn select_provider(&self, page: &Page) -> Result<()> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector('{sel}');
                if (!el) return false;
                el.value = '{val}';
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()"#,
            sel = selectors::PROVIDER,
            val = PROVIDER_CHOICE
        );
        let picked: bool = page
            .evaluate(js)
            .await
            .context("failed to pick a provider")?
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert provider result: {e:?}"))?;
        if !picked {
            bail!("provider dropdown {:?} is missing", selectors::PROVIDER);
        }
        Ok(())
    }
}

#[async_trait]
impl PortalClient for ChromiumPortal {
    async fn signup(&self, req: &SignupRequest) -> Result<SignupOutcome> {
        let preload = tokio::fs::read_to_string(PRELOAD_PATH)
            .await
            .with_context(|| format!("failed to read {PRELOAD_PATH}"))?;

        let (mut browser, handler_task) = self.launch(&req.identity.user_agent).await?;

        let crashed = Arc::new(AtomicBool::new(false));
        let mut crash_task = None;

        let result = async {
            let page = browser
                .new_page("about:blank")
                .await
                .context("failed to open a page")?;
            let mut crash_events = page
                .event_listener::<EventTargetCrashed>()
                .await
                .context("failed to listen for page crashes")?;
            let crash_flag = Arc::clone(&crashed);
            crash_task = Some(tokio::spawn(async move {
                if crash_events.next().await.is_some() {
                    crash_flag.store(true, Ordering::SeqCst);
                }
            }));
            page.evaluate_on_new_document(preload.as_str())
                .await
                .context("failed to inject the preload script")?;

            self.walkthrough(&page, req, &crashed).await
        }
        .await;

        if let Some(task) = crash_task {
            task.abort();
        }
        if let Err(e) = browser.close().await {
            warn!("browser close failed: {e}");
        }
        let _ = handler_task.await;

        result
    }
}

/// Wait for an element to appear, polling with capped exponential backoff.
async fn wait_for_element(
    page: &Page,
    selector: &str,
    timeout: Duration,
) -> Result<chromiumoxide::element::Element> {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut interval = Duration::from_millis(100);
    loop {
        if let Ok(element) = page.find_element(selector).await {
            return Ok(element);
        }
        if tokio::time::Instant::now() >= deadline {
            bail!(
                "element {selector:?} did not appear within {}ms",
                timeout.as_millis()
            );
        }
        tokio::time::sleep(interval).await;
        interval = (interval * 2).min(Duration::from_secs(1));
    }
}

/// Wait for an element, then click it (which also gives form fields
/// keyboard focus for the key-event typing that follows).
async fn click_element(page: &Page, selector: &str, timeout: Duration) -> Result<()> {
    wait_for_element(page, selector, timeout)
        .await?
        .click()
        .await
        .with_context(|| format!("failed to click {selector:?}"))?;
    Ok(())
}

/// Per-field keystroke spacing, 100-200 ms.
fn typing_delay() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(100..=200))
}

/// Type into the focused element one key event pair per character.
async fn type_text(page: &Page, text: &str, delay: Duration) -> Result<()> {
    for c in text.chars() {
        let down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyDown)
            .text(c.to_string())
            .build()
            .expect("key event params are valid");
        page.execute(down).await.context("key down dispatch failed")?;

        let up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .build()
            .expect("key event params are valid");
        page.execute(up).await.context("key up dispatch failed")?;

        tokio::time::sleep(delay).await;
    }
    Ok(())
}

/// Press a named key (e.g. "Enter", "Tab").
async fn press_key(page: &Page, key: &str) -> Result<()> {
    let down = DispatchKeyEventParams::builder()
        .r#type(DispatchKeyEventType::RawKeyDown)
        .key(key)
        .code(key)
        .build()
        .expect("key event params are valid");
    page.execute(down)
        .await
        .with_context(|| format!("failed to press {key}"))?;

    let up = DispatchKeyEventParams::builder()
        .r#type(DispatchKeyEventType::KeyUp)
        .key(key)
        .code(key)
        .build()
        .expect("key event params are valid");
    page.execute(up)
        .await
        .with_context(|| format!("failed to release {key}"))?;
    Ok(())
}

/// Full-quality JPEG screenshot at a fixed relative path.
async fn capture(page: &Page, path: &str) -> Result<()> {
    page.save_screenshot(
        ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Jpeg)
            .quality(100)
            .build(),
        path,
    )
    .await
    .with_context(|| format!("failed to capture {path}"))?;
    info!(path, "screenshot saved");
    Ok(())
}
