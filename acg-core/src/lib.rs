pub mod log;
pub mod collections;
pub mod file;
