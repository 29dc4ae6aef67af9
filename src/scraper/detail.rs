use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::browser::{self, Launcher, Session};
use crate::config::SiteConfig;
use crate::error::Result;
use crate::parser::{self, AnimalRecord, PageLayout, RawRecord};
use crate::throttle::{PauseRange, Throttle};

/// Visits each animal's page and turns it into a record.
pub struct DetailScraper<'a> {
    pub launcher: &'a dyn Launcher,
    pub throttle: &'a dyn Throttle,
    pub site: &'a SiteConfig,
    pub layout: &'a PageLayout,
    pub detail_pause: PauseRange,
    pub headless: bool,
}

impl DetailScraper<'_> {
    pub fn detail_url(&self, id: &str) -> String {
        self.site.detail_url_template.replace("{id}", id)
    }

    /// One normalized record per identifier, in the same order.
    pub async fn collect_records(&self, ids: &[String]) -> Result<Vec<AnimalRecord>> {
        let session = self.launcher.open(self.headless).await?;
        let outcome = self.visit_all(session.as_ref(), ids).await;
        let raw = browser::finish(session, outcome).await?;
        parser::normalize(raw)
    }

    async fn visit_all(&self, session: &dyn Session, ids: &[String]) -> Result<Vec<RawRecord>> {
        let total = ids.len();
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );

        let mut rows = Vec::with_capacity(total);
        for (i, id) in ids.iter().enumerate() {
            session.navigate(&self.detail_url(id)).await?;
            self.throttle.pause(self.detail_pause).await;

            let fragments = session.find_all_text(&self.site.bound_text).await?;
            rows.push(self.layout.extract(&fragments)?);

            pb.inc(1);
            info!("{} of {} animals done.", i + 1, total);
        }

        pb.finish_and_clear();
        Ok(rows)
    }
}
