pub mod metadata;
pub mod revision;

pub use metadata::*;
pub use revision::*;
