mod statistics_repository;

pub use statistics_repository::{PgStatisticsRepository, StatisticsRepository};
