//! Statistical helpers for summarizing fitness samples.
//!
//! - [`descriptive`]: min, max, mean, median and (population) standard deviation
//!
//! # Example
//!
//! ```
//! use dinoga_stats::descriptive::DescriptiveStats;
//!
//! let fitness = [10.0, 5.0, 8.0, 2.0, 1.0];
//! let stats = DescriptiveStats::new(fitness).unwrap();
//! assert_eq!(stats.max, 10.0);
//! assert_eq!(stats.mean, 5.2);
//! ```

pub mod descriptive;
