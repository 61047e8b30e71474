//! Offline mutation queue, drain engine and connectivity controller.

mod controller;
mod engine;
mod online_first;
mod retry;
mod sync_model;
mod sync_traits;

pub use controller::*;
pub use engine::*;
pub use online_first::*;
pub use retry::*;
pub use sync_model::*;
pub use sync_traits::*;
