mod policy_handler;

pub use policy_handler::*;
