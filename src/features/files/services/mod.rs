pub mod access_control;
mod file_service;

pub use file_service::{FileDownload, FileService, MyFiles};
