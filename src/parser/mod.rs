pub mod layout;
pub mod normalize;

pub use layout::{PageLayout, RawRecord, LAYOUT_V1};
pub use normalize::{normalize, AnimalRecord};
