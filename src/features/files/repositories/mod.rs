mod file_repository;

pub use file_repository::{upsert_user, FileRepository, PgFileRepository};
