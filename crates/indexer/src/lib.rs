pub mod add;
pub mod album_key;
pub mod collection;
pub mod delimiter;
pub mod external;
pub mod fields;
pub mod fill;
pub mod outdated;
pub mod rating;
pub mod remove;
pub mod unsplittable;
pub mod update;
pub mod verify;
pub mod watch;
pub mod worker;

pub use collection::{CollectionIndexer, IndexingRequest, IndexingSummary};
pub use external::ProgressEvent;

use catalog::CatalogError;

#[derive(Debug)]
pub enum IndexingError {
    Catalog(CatalogError),
    Io(std::io::Error),
}

impl std::fmt::Display for IndexingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexingError::Catalog(err) => write!(f, "catalog error: {}", err),
            IndexingError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for IndexingError {}

impl From<CatalogError> for IndexingError {
    fn from(err: CatalogError) -> Self {
        IndexingError::Catalog(err)
    }
}

impl From<std::io::Error> for IndexingError {
    fn from(err: std::io::Error) -> Self {
        IndexingError::Io(err)
    }
}
