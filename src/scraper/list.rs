use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::browser::{self, Launcher, Locator, Session};
use crate::config::SiteConfig;
use crate::criteria::SearchCriteria;
use crate::error::{Result, ScrapeError};
use crate::throttle::{PauseRange, Throttle};

const IDENTIFIER_PATTERN: &str = r"^\d{4,}.*$";
const PAGE_COUNT_PATTERN: &str = r"of\s+(\d+)";

/// Where the "next page" link sits in the pager.
///
/// The pager is addressed by position, not label: with many pages it shows
/// a fixed window and "next" has a fixed slot; with few pages every page
/// number is listed and "next" follows them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PaginationStrategy {
    /// XPath of a pager link; `{slot}` is the 1-based `<li>` position.
    pub xpath_template: String,
    pub wide_threshold: usize,
    pub wide_slot: usize,
    pub narrow_offset: usize,
}

impl Default for PaginationStrategy {
    fn default() -> Self {
        PaginationStrategy {
            xpath_template: r#"//*[@id="performSearchForm"]/div[2]/table/tfoot/tr/td/div/nav/ul/li[{slot}]/a"#
                .into(),
            wide_threshold: 10,
            wide_slot: 13,
            narrow_offset: 3,
        }
    }
}

impl PaginationStrategy {
    pub fn next_slot(&self, page_count: usize) -> usize {
        if page_count >= self.wide_threshold {
            self.wide_slot
        } else {
            page_count + self.narrow_offset
        }
    }

    pub fn next_locator(&self, page_count: usize) -> Locator {
        Locator::xpath(
            self.xpath_template
                .replace("{slot}", &self.next_slot(page_count).to_string()),
        )
    }
}

/// Text that is an animal identifier: four or more leading digits, then anything.
pub fn is_identifier(text: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(IDENTIFIER_PATTERN).unwrap());
    re.is_match(text)
}

/// Total pages from a summary such as "Page 1 of 12".
pub fn parse_page_count(summary: &str) -> Result<usize> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(PAGE_COUNT_PATTERN).unwrap());
    re.captures(summary)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| ScrapeError::parse("page count", summary))
}

/// Walks the search result listing and collects animal identifiers.
pub struct ListScraper<'a> {
    pub launcher: &'a dyn Launcher,
    pub throttle: &'a dyn Throttle,
    pub site: &'a SiteConfig,
    pub page_pause: PauseRange,
    pub headless: bool,
}

impl ListScraper<'_> {
    /// Identifiers in listing order. Repeats are kept.
    pub async fn collect_identifiers(&self, criteria: &SearchCriteria) -> Result<Vec<String>> {
        let session = self.launcher.open(self.headless).await?;
        let outcome = self.walk(session.as_ref(), criteria).await;
        browser::finish(session, outcome).await
    }

    async fn walk(&self, session: &dyn Session, criteria: &SearchCriteria) -> Result<Vec<String>> {
        let site = self.site;
        let timeout = site.wait_timeout();

        session.navigate(&site.search_url).await?;

        let dropdowns = [
            (&site.breed_group_select, &criteria.breed_group),
            (&site.breed_select, &criteria.breed),
            (&site.gender_select, &criteria.gender),
        ];
        for (locator, value) in dropdowns {
            session.wait_for(locator, timeout).await?;
            session.select(locator, value).await?;
        }

        session
            .type_text(&site.born_after_input, &criteria.born_after)
            .await?;
        session
            .type_text(&site.born_before_input, &criteria.born_before)
            .await?;
        session.click(&site.submit).await?;

        let summary = session.wait_for(&site.pagination_summary, timeout).await?;
        let pages = parse_page_count(&summary)?;
        debug!(pages, summary = %summary, "Search submitted");

        let mut ids = Vec::new();
        for page in 1..=pages {
            self.throttle.pause(self.page_pause).await;

            let texts = session.find_all_text(&site.bound_text).await?;
            ids.extend(
                texts
                    .into_iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| is_identifier(t)),
            );
            info!("Page {} of {} is done.", page, pages);

            if page < pages {
                session.click(&site.pagination.next_locator(pages)).await?;
            }
        }

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{Event, FakeLauncher, FakeSite, Listing};
    use crate::throttle::NoThrottle;

    fn criteria() -> SearchCriteria {
        SearchCriteria {
            breed: "object31".into(),
            breed_group: "object:29".into(),
            gender: "0".into(),
            born_after: "01/01/2008".into(),
            born_before: "12/31/2008".into(),
        }
    }

    async fn collect(launcher: &FakeLauncher, site: &SiteConfig) -> Result<Vec<String>> {
        ListScraper {
            launcher,
            throttle: &NoThrottle,
            site,
            page_pause: PauseRange::new(0, 0),
            headless: false,
        }
        .collect_identifiers(&criteria())
        .await
    }

    #[test]
    fn identifier_pattern() {
        assert!(is_identifier("12345-ABC"));
        assert!(is_identifier("1234"));
        assert!(!is_identifier("ABC-12345"));
        assert!(!is_identifier("123"));
        assert!(!is_identifier("123-4567"));
        assert!(!is_identifier("12345\nsecond line"));
    }

    #[test]
    fn page_count_follows_of() {
        assert_eq!(parse_page_count("Page 1 of 12").unwrap(), 12);
        assert_eq!(parse_page_count("1 - 25 of 3").unwrap(), 3);
        assert!(matches!(
            parse_page_count("no results"),
            Err(ScrapeError::Parse { what: "page count", .. })
        ));
    }

    #[test]
    fn next_slot_switches_at_threshold() {
        let p = PaginationStrategy::default();
        assert_eq!(p.next_slot(1), 4);
        assert_eq!(p.next_slot(9), 12);
        assert_eq!(p.next_slot(10), 13);
        assert_eq!(p.next_slot(250), 13);
        assert_eq!(
            p.next_locator(5),
            Locator::xpath(r#"//*[@id="performSearchForm"]/div[2]/table/tfoot/tr/td/div/nav/ul/li[8]/a"#)
        );

        let custom = PaginationStrategy {
            xpath_template: "//li[{slot}]".into(),
            wide_threshold: 5,
            wide_slot: 9,
            narrow_offset: 1,
        };
        assert_eq!(custom.next_locator(5), Locator::xpath("//li[9]"));
        assert_eq!(custom.next_locator(2), Locator::xpath("//li[3]"));
    }

    #[tokio::test]
    async fn single_page_returns_matches_without_paging() {
        let site = SiteConfig::default();
        let launcher = FakeLauncher::new(FakeSite {
            search_url: site.search_url.clone(),
            listings: vec![Listing::single_page(&[
                "Search results",
                "12345-ABC",
                "ABC-12345",
                " 20001 ",
                "123",
                "99999XYZ",
            ])],
            ..FakeSite::default()
        });

        let ids = collect(&launcher, &site).await.unwrap();
        assert_eq!(ids, vec!["12345-ABC", "20001", "99999XYZ"]);

        let clicks: Vec<_> = launcher
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Click(l) => Some(l),
                _ => None,
            })
            .collect();
        assert_eq!(clicks, vec![site.submit.clone()]);
        assert_eq!(launcher.count(|e| *e == Event::Close), 1);
    }

    #[tokio::test]
    async fn fills_form_from_criteria() {
        let site = SiteConfig::default();
        let launcher = FakeLauncher::new(FakeSite {
            search_url: site.search_url.clone(),
            listings: vec![Listing::single_page(&[])],
            ..FakeSite::default()
        });
        collect(&launcher, &site).await.unwrap();

        let events = launcher.events();
        assert_eq!(events[0], Event::Open { headless: false });
        assert_eq!(events[1], Event::Navigate(site.search_url.clone()));
        assert!(events.contains(&Event::Select(site.breed_group_select.clone(), "object:29".into())));
        assert!(events.contains(&Event::Select(site.breed_select.clone(), "object31".into())));
        assert!(events.contains(&Event::Select(site.gender_select.clone(), "0".into())));
        assert!(events.contains(&Event::Type(site.born_after_input.clone(), "01/01/2008".into())));
        assert!(events.contains(&Event::Type(site.born_before_input.clone(), "12/31/2008".into())));
    }

    #[tokio::test]
    async fn walks_every_page_with_positional_next() {
        let site = SiteConfig::default();
        let launcher = FakeLauncher::new(FakeSite {
            search_url: site.search_url.clone(),
            listings: vec![Listing {
                pagination_text: "Page 1 of 3".into(),
                pages: vec![
                    vec!["1001-A".into(), "x".into()],
                    vec!["1002-B".into(), "1001-A".into()],
                    vec!["1003-C".into()],
                ],
            }],
            ..FakeSite::default()
        });

        let ids = collect(&launcher, &site).await.unwrap();
        // Duplicates across pages are kept.
        assert_eq!(ids, vec!["1001-A", "1002-B", "1001-A", "1003-C"]);

        let next = site.pagination.next_locator(3);
        assert_eq!(launcher.count(|e| *e == Event::Click(next.clone())), 2);
    }

    #[tokio::test]
    async fn failed_page_lookup_aborts_the_walk() {
        let site = SiteConfig::default();
        let launcher = FakeLauncher::new(FakeSite {
            search_url: site.search_url.clone(),
            listings: vec![Listing {
                pagination_text: "Page 1 of 3".into(),
                pages: vec![vec!["1001-A".into()], vec!["1002-B".into()], vec!["1003-C".into()]],
            }],
            broken_page: Some(1),
            ..FakeSite::default()
        });

        let err = collect(&launcher, &site).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Browser(_)));
        // Stopped on the broken page instead of paging past it.
        let next = site.pagination.next_locator(3);
        assert_eq!(launcher.count(|e| *e == Event::Click(next.clone())), 1);
        assert_eq!(launcher.count(|e| *e == Event::Close), 1);
    }

    #[tokio::test]
    async fn missing_dropdown_times_out_and_still_closes() {
        let site = SiteConfig::default();
        let launcher = FakeLauncher::new(FakeSite {
            search_url: site.search_url.clone(),
            listings: vec![Listing::single_page(&["12345"])],
            missing: [site.breed_select.clone()].into_iter().collect(),
            ..FakeSite::default()
        });

        let err = collect(&launcher, &site).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Timeout { secs: 15, .. }));
        assert_eq!(launcher.count(|e| *e == Event::Close), 1);
    }

    #[tokio::test]
    async fn unreadable_summary_is_parse_failure() {
        let site = SiteConfig::default();
        let launcher = FakeLauncher::new(FakeSite {
            search_url: site.search_url.clone(),
            listings: vec![Listing {
                pagination_text: "No animals found".into(),
                pages: vec![],
            }],
            ..FakeSite::default()
        });

        let err = collect(&launcher, &site).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Parse { .. }));
    }
}
