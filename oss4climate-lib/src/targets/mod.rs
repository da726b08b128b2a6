//! Classification of project references and the sets that accumulate them.

mod classify;
mod listing;
mod platform;
mod target_set;
mod toml_io;

pub use classify::{
    github_path_block, is_ambiguous_organisation, isolate_relevant_urls, organisation_url_of, split_by_class, split_host_and_path,
};
pub use listing::ResourceListing;
pub use platform::{ClassifiedTarget, Platform, TargetKind};
pub use target_set::TargetSet;
pub(crate) use toml_io::save_toml;
