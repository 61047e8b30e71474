mod model;
mod repository;

pub use model::ObservationDB;
pub use repository::ObservationRepository;
