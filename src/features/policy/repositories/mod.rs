mod policy_store;

pub use policy_store::{PgPolicyStore, PolicyStore};
