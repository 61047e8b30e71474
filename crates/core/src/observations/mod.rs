//! Safety observations: models, mirror port and online-first service.

mod observations_model;
mod observations_service;
mod observations_traits;

pub use observations_model::*;
pub use observations_service::*;
pub use observations_traits::*;
