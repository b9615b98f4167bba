mod policy_service;

pub use policy_service::PolicyService;
