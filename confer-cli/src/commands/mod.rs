//! CLI subcommands

mod chat;
mod serve;
mod summaries;

pub use chat::ChatArgs;
pub use serve::ServeArgs;
pub use summaries::SummariesArgs;
