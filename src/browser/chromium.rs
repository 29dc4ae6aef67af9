use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{Launcher, Locator, Session};
use crate::error::{Result, ScrapeError};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Launches a local Chrome/Chromium over CDP.
#[derive(Default)]
pub struct ChromiumLauncher;

#[async_trait]
impl Launcher for ChromiumLauncher {
    async fn open(&self, headless: bool) -> Result<Box<dyn Session>> {
        let mut builder = BrowserConfig::builder();
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(ScrapeError::Browser)?;

        let (browser, mut handler) = Browser::launch(config).await?;
        // The CDP connection only makes progress while its handler is polled.
        let pump = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler stopped: {}", e);
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        debug!(headless, "Browser session opened");
        Ok(Box::new(ChromiumSession {
            browser: Some(browser),
            page,
            pump,
        }))
    }
}

pub struct ChromiumSession {
    browser: Option<Browser>,
    page: Page,
    pump: JoinHandle<()>,
}

impl ChromiumSession {
    async fn element(&self, locator: &Locator) -> Result<Element> {
        let found = match locator {
            Locator::Css(s) => self.page.find_element(s.as_str()).await,
            Locator::Xpath(s) => self.page.find_xpath(s.as_str()).await,
        };
        found.map_err(|_| ScrapeError::ElementNotFound {
            locator: locator.to_string(),
        })
    }

    async fn elements(&self, locator: &Locator) -> Result<Vec<Element>> {
        let found = match locator {
            Locator::Css(s) => self.page.find_elements(s.as_str()).await,
            Locator::Xpath(s) => self.page.find_xpaths(s.as_str()).await,
        };
        all_matches(found)
    }
}

/// Zero matches come back as an empty list; any CDP failure is an error,
/// never an empty page.
fn all_matches<T>(found: std::result::Result<Vec<T>, CdpError>) -> Result<Vec<T>> {
    Ok(found?)
}

async fn text_of(el: &Element) -> Result<String> {
    Ok(el.inner_text().await?.unwrap_or_default().trim().to_string())
}

#[async_trait]
impl Session for ChromiumSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.page.goto(url).await?;
        self.page.wait_for_navigation().await?;
        Ok(())
    }

    async fn find_text(&self, locator: &Locator) -> Result<String> {
        let el = self.element(locator).await?;
        text_of(&el).await
    }

    async fn find_all_text(&self, locator: &Locator) -> Result<Vec<String>> {
        let mut texts = Vec::new();
        for el in self.elements(locator).await? {
            texts.push(text_of(&el).await?);
        }
        Ok(texts)
    }

    async fn select(&self, locator: &Locator, value: &str) -> Result<()> {
        let el = self.element(locator).await?;
        let literal = serde_json::to_string(value).map_err(|e| ScrapeError::Browser(e.to_string()))?;
        let js = format!(
            "function() {{
                const v = {literal};
                if (!Array.from(this.options).some(o => o.value === v)) {{
                    throw new Error('no option with value ' + v);
                }}
                this.value = v;
                this.dispatchEvent(new Event('change', {{ bubbles: true }}));
            }}"
        );
        let ret = el.call_js_fn(js, false).await?;
        if ret.exception_details.is_some() {
            return Err(ScrapeError::ElementNotFound {
                locator: format!("{} option[value={:?}]", locator, value),
            });
        }
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<()> {
        let el = self.element(locator).await?;
        el.click().await?.type_str(text).await?;
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        self.element(locator).await?.click().await?;
        Ok(())
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<String> {
        let poll = async {
            loop {
                if let Ok(el) = self.element(locator).await {
                    return text_of(&el).await;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| ScrapeError::Timeout {
                locator: locator.to_string(),
                secs: timeout.as_secs(),
            })?
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        if let Some(mut browser) = self.browser.take() {
            browser.close().await?;
            if let Err(e) = browser.wait().await {
                warn!("Browser process did not exit cleanly: {}", e);
            }
        }
        self.pump.abort();
        debug!("Browser session closed");
        Ok(())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        // Dropping `Browser` kills the child process; the pump would
        // otherwise outlive it.
        if self.browser.is_some() {
            warn!("Browser session dropped without close, killing it");
        }
        self.pump.abort();
    }
}
