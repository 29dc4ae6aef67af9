pub mod detail;
pub mod list;

pub use detail::DetailScraper;
pub use list::{ListScraper, PaginationStrategy};
