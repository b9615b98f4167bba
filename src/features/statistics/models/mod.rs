mod download_history;
mod file_statistics;

pub use download_history::*;
pub use file_statistics::*;
