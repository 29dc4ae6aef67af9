use thiserror::Error;

/// Every way a scrape run can fail. None of these are recovered locally:
/// they abort the current date range and the batch with it.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("element not found: {locator}")]
    ElementNotFound { locator: String },

    #[error("timed out after {secs}s waiting for {locator}")]
    Timeout { locator: String, secs: u64 },

    #[error("could not parse {what} from {value:?}")]
    Parse { what: &'static str, value: String },

    #[error("layout {layout}: fragment index {index} out of range ({len} fragments on page)")]
    IndexOutOfRange {
        index: usize,
        len: usize,
        layout: &'static str,
    },

    #[error("storage rejected write: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("browser: {0}")]
    Browser(String),

    #[error("input: {0}")]
    Input(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    pub fn parse(what: &'static str, value: impl Into<String>) -> Self {
        ScrapeError::Parse {
            what,
            value: value.into(),
        }
    }
}

impl From<chromiumoxide::error::CdpError> for ScrapeError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        ScrapeError::Browser(e.to_string())
    }
}

impl From<csv::Error> for ScrapeError {
    fn from(e: csv::Error) -> Self {
        ScrapeError::Input(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
