mod cleanup_dto;

pub use cleanup_dto::*;
