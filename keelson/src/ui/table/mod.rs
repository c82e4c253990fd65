//! This module provides extensions for provisioning results to render a
//! formatted table.

mod summary_ext;

pub use self::summary_ext::SummaryExt;
