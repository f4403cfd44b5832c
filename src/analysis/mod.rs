//! Analysis modules.
//!
//! Classification turns raw rows into items; aggregation turns items
//! into delivery statistics.

pub mod aggregator;
pub mod classifier;

pub use aggregator::*;
pub use classifier::{Classifier, DEFAULT_DATE_FORMAT};
