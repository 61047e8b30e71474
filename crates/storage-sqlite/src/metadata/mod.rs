mod model;
mod repository;

pub use model::MetadataDB;
pub use repository::MetadataRepository;
