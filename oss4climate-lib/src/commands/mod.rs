//! Command-line interface and orchestration for oss4climate
//!
//! This module implements the CLI commands and wires the library together: the
//! target index, the fetcher and its cache, the discovery and fetch passes, the
//! dataset writers and the search engine.
//!
//! # Commands
//!
//! - **discover**: refresh the listings index, read every configured source and merge
//!   the targets found into the target index
//! - **add**: classify URLs given on the command line and merge them into the index
//! - **generate-listing**: expand organisations, fetch every repository, then write the
//!   snapshot, the flattened dataset and the summary
//! - **expand-organisations**: write the owners of indexed repositories to a new index
//! - **update-listings**: refresh the listings index only
//! - **download**: fetch a published summary and listing and rebuild the snapshot from them
//! - **search**: BM25 keyword search over a generated or downloaded snapshot
//! - **init** and **validate**: manage the configuration file
//!
//! # Execution Flow
//!
//! The `run` function parses command-line arguments using clap and routes to the
//! command handler. Networked commands build a `Session` holding the cache lock, the
//! fetcher, the stop signal and the progress reporter for the duration of the run.
//! All output goes through the `Host` trait so that commands can be tested in memory.

mod add;
mod common;
mod config;
mod discover;
mod download;
mod expand;
mod generate;
mod host;
mod init;
mod progress_reporter;
mod run;
mod search;
mod update_listings;
mod validate;

#[cfg(debug_assertions)]
pub use config::Config;

pub use add::{AddArgs, add_targets};
pub use discover::{DiscoverArgs, discover};
pub use download::{DownloadArgs, download_dataset};
pub use expand::{ExpandArgs, expand_organisations};
pub use generate::{GenerateArgs, generate_listing};
pub use host::Host;
pub use init::{InitArgs, init_config};
pub use progress_reporter::ProgressReporter;
pub use run::run;
pub use search::{SearchArgs, search_dataset};
pub use update_listings::{UpdateListingsArgs, update_listings};
pub use validate::{ValidateArgs, validate_config};
