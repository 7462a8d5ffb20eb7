pub mod feedback;
pub mod message;
pub mod session;
