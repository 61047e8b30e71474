//! Read-only reference tables (projects, departments, supervisors,
//! categories, subcategories, locations).

mod reference_model;
mod reference_service;
mod reference_traits;

pub use reference_model::*;
pub use reference_service::*;
pub use reference_traits::*;
