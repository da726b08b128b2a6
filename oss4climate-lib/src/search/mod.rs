//! BM25 keyword search over repository descriptions and READMEs.

mod engine;
mod listing;

pub use engine::{SearchEngine, normalize};
pub use listing::{ListingSearch, RankedResult, SearchFilter};
