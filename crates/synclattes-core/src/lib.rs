pub mod config;
pub mod error;
pub mod models;
pub mod storage;

pub use config::{AppConfig, DatabaseConfig, DedupConfig, ElectionConfig, LoggingConfig};
pub use error::{ExitCode, Result, SyncError};
pub use models::*;

pub use storage::database::{ConnectionPool, Database, open_database, open_in_memory};
pub use storage::queries::{DuplicateGroupQuery, GroupFilter, LastRevisionQuery};
pub use storage::repositories::{
    ItemRepository, Repository, ResearcherRepository, RevisionRepository, SqliteItemRepository,
    SqliteResearcherRepository, SqliteRevisionRepository,
};
pub use storage::store::RevisionStore;
