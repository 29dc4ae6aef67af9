pub mod chromium;
#[cfg(test)]
pub mod fake;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::error::Result;

pub use chromium::ChromiumLauncher;

/// How to find an element on a rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locator {
    Css(String),
    Xpath(String),
}

impl Locator {
    pub fn css(s: impl Into<String>) -> Self {
        Locator::Css(s.into())
    }

    pub fn xpath(s: impl Into<String>) -> Self {
        Locator::Xpath(s.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css:{}", s),
            Locator::Xpath(s) => write!(f, "xpath:{}", s),
        }
    }
}

/// One open browser window.
#[async_trait]
pub trait Session: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Visible text of the first match.
    async fn find_text(&self, locator: &Locator) -> Result<String>;

    /// Visible text of every match, in document order.
    async fn find_all_text(&self, locator: &Locator) -> Result<Vec<String>>;

    /// Choose the `<option>` whose value attribute is `value`.
    async fn select(&self, locator: &Locator, value: &str) -> Result<()>;

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<()>;

    async fn click(&self, locator: &Locator) -> Result<()>;

    /// Block until the element exists, then return its text.
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<String>;

    async fn close(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait Launcher: Send + Sync {
    async fn open(&self, headless: bool) -> Result<Box<dyn Session>>;
}

/// Close `session` whatever `outcome` was. A close failure only surfaces
/// when the phase itself succeeded.
pub async fn finish<T>(session: Box<dyn Session>, outcome: Result<T>) -> Result<T> {
    let closed = session.close().await;
    match (outcome, closed) {
        (Ok(v), Ok(())) => Ok(v),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            warn!("Failed to close browser after error: {}", close_err);
            Err(e)
        }
    }
}
