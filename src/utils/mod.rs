//! Utility modules for common functionality
//!
//! Wire-level helpers for headers, IFDs and tag values, bit and byte
//! manipulation of sample data, logging, progress and diagnostics.

pub mod logger;
pub mod progress;
pub mod diagnostics;
pub(crate) mod write_utils;
pub mod byte_order_utils;
pub mod bit_utils;
pub(crate) mod ifd_utils;
pub mod format_utils;
pub(crate) mod tag_utils;
