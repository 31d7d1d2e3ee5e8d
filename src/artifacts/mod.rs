//! Artifact Lifecycle
//!
//! Every successful split produces an artifact: the uploaded original and
//! the derived PDF. This module tracks artifacts until they expire and makes
//! sure their files are deleted.
//!
//! Lifecycle:
//! 1. Registered after extraction succeeds (`Created`)
//! 2. First download resets the deadline to `download_ttl` (`Downloaded`)
//! 3. The sweeper evicts it once the deadline passes; both files are deleted
//!    and every later lookup reports NotFound

pub mod registry;
pub mod sweeper;
pub mod types;

pub use registry::ArtifactRegistry;
pub use sweeper::Sweeper;
pub use types::*;
