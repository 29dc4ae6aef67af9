use std::collections::HashMap;

use crate::error::{Result, ScrapeError};

/// Positional map of a detail page: which bound-text fragment holds which
/// field. A site redesign means a new layout, not edits scattered through
/// the scraper.
pub struct PageLayout {
    pub version: &'static str,
    pub fields: &'static [(&'static str, usize)],
}

/// Detail page as rendered since the registry's Angular front end.
pub const LAYOUT_V1: PageLayout = PageLayout {
    version: "v1",
    fields: &[
        ("id", 14),
        ("breed_group", 16),
        ("breed", 18),
        ("birth_date", 20),
        ("gender", 22),
        ("regnum", 24),
        ("progeny_total", 15),
        ("flock_count", 17),
        ("sire", 19),
        ("dam", 21),
        ("status", 23),
        ("genotyped", 25),
        ("farm_name", 32),
        ("contact_name", 34),
        ("address1", 36),
        ("address2", 37),
        ("phone", 33),
        ("email", 35),
        ("bwt", 39),
        ("bwt_accuracy", 40),
        ("mwwt", 45),
        ("pemd", 50),
        ("pemd_accuracy", 51),
        ("nlb", 55),
        ("nlb_accuracy", 56),
        ("carcass_plus_index", 61),
        ("wwt", 42),
        ("wwt_accuracy", 43),
        ("pwwt", 47),
        ("pwwt_accuracy", 48),
        ("pfat", 53),
        ("nlw", 58),
        ("nlw_accuracy", 59),
        ("src_index", 63),
    ],
};

/// Named fragments of one detail page, before normalization.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    values: HashMap<&'static str, String>,
}

impl RawRecord {
    /// Remove a field, yielding an empty string if the layout never had it.
    pub fn take(&mut self, field: &str) -> String {
        self.values.remove(field).unwrap_or_default()
    }
}

#[cfg(test)]
impl RawRecord {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }
}

impl PageLayout {
    /// Highest fragment index the layout reads.
    pub fn max_index(&self) -> usize {
        self.fields.iter().map(|(_, i)| *i).max().unwrap_or(0)
    }

    /// Pick every field out of `fragments` by position.
    ///
    /// A page with fewer fragments than the layout needs is a layout
    /// mismatch and fails instead of producing a shifted record.
    pub fn extract(&self, fragments: &[String]) -> Result<RawRecord> {
        let max = self.max_index();
        if fragments.len() <= max {
            return Err(ScrapeError::IndexOutOfRange {
                index: max,
                len: fragments.len(),
                layout: self.version,
            });
        }

        let values = self
            .fields
            .iter()
            .map(|(name, idx)| (*name, fragments[*idx].clone()))
            .collect();
        Ok(RawRecord { values })
    }
}
