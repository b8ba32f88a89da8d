//! Small filesystem utilities shared by resource backends.
pub mod fs;
