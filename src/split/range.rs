//! Page range resolution
//!
//! Turns user-supplied 1-based `start`/`end` values into a validated,
//! inclusive [`PageRange`] for a document with a known page count.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// How out-of-bounds page numbers are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RangePolicy {
    /// Reject `start` outside the document, clamp `end` to the last page.
    #[default]
    Strict,
    /// Drop page numbers outside `[1, total]`; reject only an empty selection.
    Skip,
}

impl FromStr for RangePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "skip" => Ok(Self::Skip),
            other => Err(format!("unknown range policy: {other}")),
        }
    }
}

impl fmt::Display for RangePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Skip => f.write_str("skip"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("Start page must be at least 1 (got {start})")]
    StartBelowOne { start: i64 },

    #[error("Start page {start} exceeds total pages ({total})")]
    StartBeyondDocument { start: i64, total: u32 },

    #[error("End page {end} is before start page {start}")]
    EndBeforeStart { start: i64, end: i64 },

    #[error("No pages selected: range {start}-{end} does not overlap pages 1-{total}")]
    EmptySelection { start: i64, end: i64, total: u32 },
}

/// A validated, 1-based, inclusive page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    start: u32,
    end: u32,
}

impl PageRange {
    /// Resolve a requested range against a document with `total` pages.
    ///
    /// A missing `end` means "through the last page".
    pub fn resolve(
        start: i64,
        end: Option<i64>,
        total: u32,
        policy: RangePolicy,
    ) -> Result<Self, RangeError> {
        let total_i = i64::from(total);
        match policy {
            RangePolicy::Strict => {
                if start < 1 {
                    return Err(RangeError::StartBelowOne { start });
                }
                if start > total_i {
                    return Err(RangeError::StartBeyondDocument { start, total });
                }
                let end = end.map_or(total_i, |e| e.min(total_i));
                if end < start {
                    return Err(RangeError::EndBeforeStart { start, end });
                }
                Ok(Self::from_bounds(start, end))
            }
            RangePolicy::Skip => {
                let requested_end = end.unwrap_or(total_i);
                if requested_end < start {
                    return Err(RangeError::EndBeforeStart {
                        start,
                        end: requested_end,
                    });
                }
                let first = start.max(1);
                let last = requested_end.min(total_i);
                if last < first {
                    return Err(RangeError::EmptySelection {
                        start,
                        end: requested_end,
                        total,
                    });
                }
                Ok(Self::from_bounds(first, last))
            }
        }
    }

    // Callers guarantee 1 <= start <= end <= u32::MAX.
    fn from_bounds(start: i64, end: i64) -> Self {
        Self {
            start: start as u32,
            end: end as u32,
        }
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    /// Number of pages in the range
    pub fn page_count(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Whether a 1-based page number falls inside the range
    pub fn contains(&self, page: u32) -> bool {
        (self.start..=self.end).contains(&page)
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
