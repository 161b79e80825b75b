//! # Almanac Core Library
//!
//! Recurrence expansion for a personal organizer: turns recurring reminder rules plus
//! per-occurrence overrides into concrete, materialized occurrences, and keeps a rolling
//! three-year cache of them in SQLite.
//!
//! ## Features
//!
//! - **Four Recurrence Families**: every-N-days, every-N-weeks on chosen weekdays, chosen
//!   days of the month (with a last-day flag), and one anchored day per year
//! - **Leap-Safe Yearly Anchors**: normalized day-of-year codec so a February 29th anchor
//!   lands on February 28th in common years
//! - **Overrides**: move, retime or mute a single occurrence, keyed by its original start
//! - **Rolling Cache**: previous, current and next year materialized, stale years pruned
//! - **Naive Wall-Clock Time**: no time-zone conversion anywhere
//!
//! ## Core Modules
//!
//! - [`calendar`]: Civil timestamp arithmetic
//! - [`codec`]: Normalized day-of-year mapping
//! - [`window`]: Year windows and series clipping
//! - [`recurrence`]: Per-family expanders and override resolution
//! - [`materialization`]: Rolling-year cache manager and its storage contract
//! - [`repository`]: SQLite-backed rules, overrides and occurrences
//! - [`db`]: Database connection and migration management
//! - [`models`]: Core data structures and transfer objects
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use almanac_core::{
//!     db,
//!     models::{Cadence, NewRuleData},
//!     repository::{RuleRepository, SqliteRepository},
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = db::establish_connection("almanac.db").await?;
//!     let repo = SqliteRepository::new(pool);
//!
//!     let rule = repo
//!         .add_rule(NewRuleData {
//!             folder_id: 0,
//!             event_type: 0,
//!             series_start: "2024-01-01".parse()?,
//!             series_end: "2030-12-31 23:59".parse()?,
//!             time_of_day: 9 * 60,
//!             duration_minutes: 30,
//!             notif_offset_minutes: 10,
//!             has_notifications: true,
//!             title: "Water the plants".to_string(),
//!             cadence: Cadence::Daily { every_n_days: 3 },
//!         })
//!         .await?;
//!
//!     let summary = repo.refresh_for_year(2024).await?;
//!     println!("rule {} materialized into {:?}", rule.item_id, summary.years_materialized);
//!     Ok(())
//! }
//! ```

pub mod calendar;
pub mod codec;
pub mod db;
pub mod error;
pub mod materialization;
pub mod models;
pub mod recurrence;
pub mod repository;
pub mod window;
