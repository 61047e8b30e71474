pub mod clock;

pub use clock::{new_local_id, now_rfc3339, to_rfc3339};
