use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;

use crate::browser::Locator;
use crate::error::ScrapeError;
use crate::scraper::PaginationStrategy;
use crate::throttle::PauseRange;

const FORM: &str = r#"//*[@id="performSearchForm"]"#;

/// Everything the scraper reads at startup. Layered: built-in defaults,
/// then the optional TOML file, then `NPR__*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub db_path: PathBuf,
    pub table: String,
    pub list_headless: bool,
    pub detail_headless: bool,
    pub filters: Filters,
    pub site: SiteConfig,
    pub throttle: ThrottleConfig,
}

/// Search filters, as option values of the registry's dropdowns.
/// Legal values are whatever the site offers; nothing is checked here.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Filters {
    /// dorset = `object31`, texel = `object599`, ile-de-france = `object18`
    pub breed: String,
    /// terminal = `object:29`
    pub breed_group: String,
    /// both = `0`, male = `1`, female = `2`
    pub gender: String,
}

impl Filters {
    /// `breed,breed_group,gender`, used to tell run logs apart.
    pub fn key(&self) -> String {
        format!("{},{},{}", self.breed, self.breed_group, self.gender)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub search_url: String,
    /// Detail page URL; `{id}` is replaced by the animal identifier.
    pub detail_url_template: String,
    pub wait_timeout_secs: u64,
    pub breed_group_select: Locator,
    pub breed_select: Locator,
    pub gender_select: Locator,
    pub born_after_input: Locator,
    pub born_before_input: Locator,
    pub submit: Locator,
    pub pagination_summary: Locator,
    /// Marker class of data-bound text nodes.
    pub bound_text: Locator,
    pub pagination: PaginationStrategy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    pub page: PauseRange,
    pub detail: PauseRange,
    pub batch: PauseRange,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            db_path: PathBuf::from("data/npr.sqlite"),
            table: "animals".into(),
            list_headless: false,
            detail_headless: true,
            filters: Filters::default(),
            site: SiteConfig::default(),
            throttle: ThrottleConfig::default(),
        }
    }
}

impl Default for Filters {
    fn default() -> Self {
        Filters {
            breed: "object31".into(),
            breed_group: "object:29".into(),
            gender: "0".into(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            search_url: "http://mylink.com".into(),
            detail_url_template: "http://mylink.com/{id}".into(),
            wait_timeout_secs: 15,
            breed_group_select: Locator::xpath(format!("{FORM}/table[1]/tbody/tr[1]/td[2]/select")),
            breed_select: Locator::xpath(format!("{FORM}/table[1]/tbody/tr[2]/td[2]/select")),
            gender_select: Locator::xpath(format!("{FORM}/table[1]/tbody/tr[5]/td[2]/select")),
            born_after_input: Locator::css("#bornAfter"),
            born_before_input: Locator::css("#bornBefore"),
            submit: Locator::css("#submit"),
            pagination_summary: Locator::xpath(format!(
                "{FORM}/div[2]/table/tfoot/tr/td/div/nav/div"
            )),
            bound_text: Locator::css(".ng-binding"),
            pagination: PaginationStrategy::default(),
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        ThrottleConfig {
            page: PauseRange::new(3, 7),
            detail: PauseRange::new(5, 8),
            batch: PauseRange::new(30, 50),
        }
    }
}

impl SiteConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let settings: Settings = ::config::Config::builder()
            .add_source(::config::File::from(path).required(false))
            .add_source(
                ::config::Environment::with_prefix("NPR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read config {}", path.display()))?
            .try_deserialize()
            .context("Invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        static IDENT: OnceLock<Regex> = OnceLock::new();
        let re = IDENT.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());
        if !re.is_match(&self.table) {
            return Err(ScrapeError::parse("table name", &self.table).into());
        }
        if !self.site.detail_url_template.contains("{id}") {
            return Err(
                ScrapeError::parse("detail url template", &self.site.detail_url_template).into(),
            );
        }
        Ok(())
    }
}
