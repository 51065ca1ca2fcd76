//! Exports intended for internal use only.
//!
//! These need to be exported for access from the main CLI, but they are not
//! intended for use by external code. This module's API may change without
//! semantic versioning!

pub use crate::measure::{Kilometers, Miles};

pub mod report {
    pub use crate::report::enrichment_report;
}
