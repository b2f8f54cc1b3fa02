//! Output module for reporting on crawl results
//!
//! Statistics are read back from the stores, so they can be printed for a
//! finished, running or interrupted crawl alike.

pub mod stats;

pub use stats::{load_statistics, print_statistics, CrawlStatistics};
