#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for oss4climate
//!
//! Discovers open-source climate and energy repositories on GitHub and GitLab, fetches
//! their metadata through a cached and rate-limited HTTP layer, and provides BM25 keyword
//! search over the resulting dataset.
//!
//! # Module Organization
//!
//! - [`fetch`]: URL-keyed cache and throttled HTTP fetcher
//! - [`targets`]: URL classification and the mergeable target set
//! - [`hosting`]: GitHub and GitLab clients producing repository records
//! - [`sources`]: parsers for external listings (markdown, HTML, YAML)
//! - [`pipeline`]: discovery and fetch passes with failure tracking
//! - [`dataset`]: persisted snapshot, flattened exports and summary
//! - [`search`]: BM25 search engine
//! - [`commands`]: command-line interface and orchestration

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

pub type HashMap<K, V> = std::collections::HashMap<K, V, rustc_hash::FxBuildHasher>;

#[cfg(any(debug_assertions, test))]
pub mod commands;
#[cfg(not(any(debug_assertions, test)))]
mod commands;

pub mod dataset;
pub mod fetch;
pub mod hosting;
pub mod pipeline;
pub mod search;
pub mod sources;
pub mod targets;

pub use crate::commands::{Host, run};
