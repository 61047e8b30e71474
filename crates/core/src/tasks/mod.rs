//! Corrective tasks: models, mirror port and online-first service.

mod tasks_model;
mod tasks_service;
mod tasks_traits;

pub use tasks_model::*;
pub use tasks_service::*;
pub use tasks_traits::*;
