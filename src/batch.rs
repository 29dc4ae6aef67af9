use std::time::Instant;

use rusqlite::Connection;
use tracing::{info, warn};

use crate::browser::Launcher;
use crate::config::Settings;
use crate::criteria::{DateRange, SearchCriteria};
use crate::db;
use crate::error::{Result, ScrapeError};
use crate::parser::LAYOUT_V1;
use crate::runlog::{RunLog, RunLogEntry};
use crate::scraper::{DetailScraper, ListScraper};
use crate::throttle::Throttle;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub ranges_done: usize,
    pub ranges_skipped: usize,
    pub animals: usize,
}

/// Scrapes each date range in turn and appends the results.
pub struct BatchRunner<'a> {
    pub settings: &'a Settings,
    pub launcher: &'a dyn Launcher,
    pub throttle: &'a dyn Throttle,
    pub conn: &'a Connection,
    pub log: &'a RunLog,
    /// Skip ranges the run log already lists.
    pub resume: bool,
}

impl BatchRunner<'_> {
    fn list_scraper(&self) -> ListScraper<'_> {
        ListScraper {
            launcher: self.launcher,
            throttle: self.throttle,
            site: &self.settings.site,
            page_pause: self.settings.throttle.page,
            headless: self.settings.list_headless,
        }
    }

    fn detail_scraper(&self) -> DetailScraper<'_> {
        DetailScraper {
            launcher: self.launcher,
            throttle: self.throttle,
            site: &self.settings.site,
            layout: &LAYOUT_V1,
            detail_pause: self.settings.throttle.detail,
            headless: self.settings.detail_headless,
        }
    }

    /// Runs ranges in input order. The first failure stops the batch;
    /// ranges finished before it stay stored and logged.
    pub async fn run(&self, ranges: &[DateRange]) -> Result<BatchSummary> {
        self.check_log_filters()?;
        let done = if self.resume {
            self.log.completed()?
        } else {
            Default::default()
        };

        let mut summary = BatchSummary::default();
        let pending: Vec<&DateRange> = ranges
            .iter()
            .filter(|r| {
                let skip = done.contains(&(r.born_before.clone(), r.born_after.clone()));
                if skip {
                    info!(born_after = %r.born_after, born_before = %r.born_before, "Already logged, skipping");
                    summary.ranges_skipped += 1;
                }
                !skip
            })
            .collect();

        for (i, range) in pending.iter().enumerate() {
            let count = self.run_one(range).await?;
            summary.ranges_done += 1;
            summary.animals += count;

            if i + 1 < pending.len() {
                self.throttle.pause(self.settings.throttle.batch).await;
            }
        }
        Ok(summary)
    }

    /// A log only says which ranges ran for one filter set. Resuming from a
    /// log written under other filters would skip ranges never scraped.
    fn check_log_filters(&self) -> Result<()> {
        let key = self.settings.filters.key();
        match self.log.filters()? {
            None => self.log.set_filters(&key),
            Some(logged) if logged == key => Ok(()),
            Some(logged) if self.resume => Err(ScrapeError::Input(format!(
                "run log {} was written for filters {}, not {}",
                self.log.path().display(),
                logged,
                key
            ))),
            Some(logged) => {
                warn!(logged = %logged, current = %key, "Run log was written for other filters");
                Ok(())
            }
        }
    }

    async fn run_one(&self, range: &DateRange) -> Result<usize> {
        let started = Instant::now();
        let criteria = SearchCriteria::new(&self.settings.filters, range);
        info!(born_after = %range.born_after, born_before = %range.born_before, "Searching");

        let ids = self.list_scraper().collect_identifiers(&criteria).await?;
        let records = self.detail_scraper().collect_records(&ids).await?;
        db::append_records(self.conn, &self.settings.table, &records)?;

        self.log.append(&RunLogEntry {
            born_before: range.born_before.clone(),
            born_after: range.born_after.clone(),
            animal_count: ids.len(),
            elapsed_secs: started.elapsed().as_secs_f64(),
        })?;
        info!("{} animals are written to database.", ids.len());
        Ok(ids.len())
    }
}
