// Session lifecycle: creation, document attachment, and per-session serialization.

pub mod handlers;
pub mod lock;
