mod cleanup_handler;

pub use cleanup_handler::*;
