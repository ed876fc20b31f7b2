//! Repository modules for database operations

pub mod checkpoints;
pub mod file_summaries;
