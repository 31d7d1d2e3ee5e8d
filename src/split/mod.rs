//! Page range splitting
//!
//! - `range`: validation of requested page ranges against a page count
//! - `extractor`: lopdf-backed extraction of a validated range into a new PDF

pub mod extractor;
pub mod range;

pub use extractor::{Extraction, RangeExtractor, SplitError, DEFAULT_EXTRACT_TIMEOUT};
pub use range::{PageRange, RangeError, RangePolicy};
