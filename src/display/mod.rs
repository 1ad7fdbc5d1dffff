//! Terminal presentation for the CLI: theme, tables, spinners.

pub mod progress;
pub mod tables;
pub mod theme;

pub use progress::{create_spinner, with_spinner};
pub use tables::{create_build_table, create_cache_table, create_results_table};
pub use theme::{THEME, Theme};
