mod download_recorder;
mod statistics_service;

pub use download_recorder::{DownloadEvent, DownloadRecorder, DownloadTicket, TrackedStream};
pub use statistics_service::StatisticsService;
