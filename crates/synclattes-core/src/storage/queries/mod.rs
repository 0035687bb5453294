mod duplicates;
mod last_revision;

pub use duplicates::{DuplicateGroupQuery, GroupFilter};
pub use last_revision::LastRevisionQuery;
