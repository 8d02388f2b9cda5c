//! vizlint core library.
//!
//! This crate exposes programmatic APIs for linting dashboard pages (Markdown
//! with embedded SQL blocks and chart components) and the CSV files behind
//! them, against an explicit rule configuration.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective configuration resolution.
//! - `defaults`: Built-in rule tables for the reference deployment.
//! - `extract`: Lexical extraction of query blocks, component tags and front matter.
//! - `gaps`: Merging declared per-source gaps into universal/source-only ranges.
//! - `rules`: Page rules, run in a fixed order over one extracted page.
//! - `data`: CSV integrity checks and known-issue suppression.
//! - `lint`: The `Engine` and the parallel driver.
//! - `findings`: Rule ids and ordered finding buffers.
//! - `models`: Findings, summaries and the rule configuration schema.
//! - `output`: Human/JSON printers.
//! - `error`: Process-level failures.
//! - `logging`: `tracing` subscriber setup.
pub mod cli;
pub mod config;
pub mod data;
pub mod defaults;
pub mod error;
pub mod extract;
pub mod findings;
pub mod gaps;
pub mod lint;
pub mod logging;
pub mod models;
pub mod output;
pub mod rules;
