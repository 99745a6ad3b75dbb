//! Database module: row models and SQL repositories.
//!
//! - `model`: typed rows returned by the repositories.
//! - `repo`: SQL-only functions; no pipeline logic lives here.
//!
//! External modules import from `psb_scraper::db` — the repository API and
//! row models are re-exported for convenience.

pub mod model;
pub mod repo;

pub use model::PhotoRow;
pub use repo::*;
