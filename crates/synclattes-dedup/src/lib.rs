//! Duplicate detection and main revision election for harvested
//! CV productions.

pub mod authors;
pub mod detector;
pub mod doi;
pub mod election;
pub mod error;
pub mod names;
pub mod normalize;
pub mod reassign;
pub mod scanner;
pub mod title_index;

#[cfg(test)]
mod test_support;

pub use authors::{author_set_distance, Author};
pub use detector::{DedupReport, Deduplicator};
pub use doi::Doi;
pub use election::{Candidate, ElectionPolicy, ScoreElection};
pub use error::{DedupError, Result};
pub use normalize::{decode, normalize, normalize_bytes, Encoding, NormLevel};
pub use reassign::Reassigner;
pub use scanner::{scan_pending_groups, DuplicateGroup, GroupScanner, ScanOptions};
pub use title_index::{NgramTitleIndex, TitleIndex};
