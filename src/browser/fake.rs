//! Scripted stand-in for a real browser.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{Launcher, Locator, Session};
use crate::error::{Result, ScrapeError};

/// Fragments of a real detail page, 64 of them.
pub fn fixture_page() -> Vec<String> {
    let text = std::fs::read_to_string("tests/fixtures/detail_page.json").unwrap();
    serde_json::from_str(&text).unwrap()
}

/// Result listing returned by one search submission.
#[derive(Clone, Default)]
pub struct Listing {
    pub pagination_text: String,
    pub pages: Vec<Vec<String>>,
}

impl Listing {
    pub fn single_page(texts: &[&str]) -> Self {
        Listing {
            pagination_text: "Page 1 of 1".into(),
            pages: vec![texts.iter().map(|s| s.to_string()).collect()],
        }
    }
}

#[derive(Default)]
pub struct FakeSite {
    pub search_url: String,
    /// One per search, consumed in order.
    pub listings: Vec<Listing>,
    /// Detail page fragments keyed by URL.
    pub details: HashMap<String, Vec<String>>,
    /// Locators that never appear.
    pub missing: HashSet<Locator>,
    /// Listing page (zero-based) whose lookup fails as if the connection dropped.
    pub broken_page: Option<usize>,
    /// Closing the session fails.
    pub fail_close: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open { headless: bool },
    Navigate(String),
    Select(Locator, String),
    Type(Locator, String),
    Click(Locator),
    Close,
}

#[derive(Clone)]
pub struct FakeLauncher {
    site: Arc<FakeSite>,
    events: Arc<Mutex<Vec<Event>>>,
    searches: Arc<Mutex<usize>>,
}

impl FakeLauncher {
    pub fn new(site: FakeSite) -> Self {
        FakeLauncher {
            site: Arc::new(site),
            events: Arc::default(),
            searches: Arc::default(),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

#[async_trait]
impl Launcher for FakeLauncher {
    async fn open(&self, headless: bool) -> Result<Box<dyn Session>> {
        self.events.lock().unwrap().push(Event::Open { headless });
        Ok(Box::new(FakeSession {
            launcher: self.clone(),
            state: Mutex::default(),
        }))
    }
}

#[derive(Default)]
struct State {
    url: String,
    listing: Option<usize>,
    submitted: bool,
    page: usize,
}

struct FakeSession {
    launcher: FakeLauncher,
    state: Mutex<State>,
}

impl FakeSession {
    fn record(&self, event: Event) {
        self.launcher.events.lock().unwrap().push(event);
    }

    fn site(&self) -> &FakeSite {
        &self.launcher.site
    }

    fn check(&self, locator: &Locator) -> Result<()> {
        if self.site().missing.contains(locator) {
            return Err(ScrapeError::ElementNotFound {
                locator: locator.to_string(),
            });
        }
        Ok(())
    }

    fn listing(&self) -> Option<&Listing> {
        let idx = self.state.lock().unwrap().listing?;
        self.site().listings.get(idx)
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.record(Event::Navigate(url.to_string()));
        let mut state = self.state.lock().unwrap();
        state.url = url.to_string();
        state.page = 0;
        state.submitted = false;
        state.listing = None;
        if url == self.site().search_url {
            let mut searches = self.launcher.searches.lock().unwrap();
            state.listing = Some(*searches);
            *searches += 1;
        }
        Ok(())
    }

    async fn find_text(&self, locator: &Locator) -> Result<String> {
        self.check(locator)?;
        Ok(self
            .listing()
            .map(|l| l.pagination_text.clone())
            .unwrap_or_default())
    }

    async fn find_all_text(&self, locator: &Locator) -> Result<Vec<String>> {
        self.check(locator)?;
        let url = self.state.lock().unwrap().url.clone();
        if let Some(fragments) = self.site().details.get(&url) {
            return Ok(fragments.clone());
        }
        let page = self.state.lock().unwrap().page;
        if self.site().broken_page == Some(page) {
            return Err(ScrapeError::Browser("connection to page lost".into()));
        }
        Ok(self
            .listing()
            .and_then(|l| l.pages.get(page).cloned())
            .unwrap_or_default())
    }

    async fn select(&self, locator: &Locator, value: &str) -> Result<()> {
        self.check(locator)?;
        self.record(Event::Select(locator.clone(), value.to_string()));
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<()> {
        self.check(locator)?;
        self.record(Event::Type(locator.clone(), text.to_string()));
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        self.check(locator)?;
        self.record(Event::Click(locator.clone()));
        // The first click on a search page submits the form; later ones page.
        let mut state = self.state.lock().unwrap();
        if state.submitted {
            state.page += 1;
        } else {
            state.submitted = true;
        }
        Ok(())
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<String> {
        if self.site().missing.contains(locator) {
            return Err(ScrapeError::Timeout {
                locator: locator.to_string(),
                secs: timeout.as_secs(),
            });
        }
        self.find_text(locator).await
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.record(Event::Close);
        if self.site().fail_close {
            return Err(ScrapeError::Browser("browser did not exit".into()));
        }
        Ok(())
    }
}
