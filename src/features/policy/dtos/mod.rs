mod policy_dto;

pub use policy_dto::*;
