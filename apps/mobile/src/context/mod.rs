mod providers;
mod registry;

pub use registry::*;
