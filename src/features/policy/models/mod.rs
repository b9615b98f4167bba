mod system_policy;

pub use system_policy::*;
