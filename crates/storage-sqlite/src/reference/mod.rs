mod repository;

pub use repository::ReferenceRepository;
