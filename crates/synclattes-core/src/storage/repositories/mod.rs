mod item_repository;
mod researcher_repository;
mod revision_repository;

pub use item_repository::{ItemRepository, SqliteItemRepository};
pub use researcher_repository::{ResearcherRepository, SqliteResearcherRepository};
pub use revision_repository::{RevisionRepository, SqliteRevisionRepository};

pub(crate) use revision_repository::{REVISION_COLUMNS, row_to_revision};

use crate::error::Result;

pub trait Repository {
    type Entity;
    type Id;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>>;
    fn save(&self, entity: &Self::Entity) -> Result<()>;
}
