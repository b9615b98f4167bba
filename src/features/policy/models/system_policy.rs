use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

pub const DEFAULT_MAX_FILE_SIZE_MB: i32 = 50;
pub const DEFAULT_MIN_VALIDITY_HOURS: i32 = 1;
pub const DEFAULT_MAX_VALIDITY_DAYS: i32 = 30;
pub const DEFAULT_VALIDITY_DAYS: i32 = 7;
pub const DEFAULT_PASSWORD_MIN_LENGTH: i32 = 8;

/// Smallest password length an administrator may configure
pub const PASSWORD_MIN_LENGTH_FLOOR: i32 = 4;

/// Process-wide upload limits (singleton row)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct SystemPolicy {
    pub max_file_size_mb: i32,
    pub min_validity_hours: i32,
    pub max_validity_days: i32,
    pub default_validity_days: i32,
    pub require_password_min_length: i32,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for SystemPolicy {
    fn default() -> Self {
        Self {
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
            min_validity_hours: DEFAULT_MIN_VALIDITY_HOURS,
            max_validity_days: DEFAULT_MAX_VALIDITY_DAYS,
            default_validity_days: DEFAULT_VALIDITY_DAYS,
            require_password_min_length: DEFAULT_PASSWORD_MIN_LENGTH,
            updated_at: None,
        }
    }
}

impl SystemPolicy {
    /// Replace unusable stored values with the defaults
    pub fn normalized(mut self) -> Self {
        fn positive_or(value: i32, default: i32) -> i32 {
            if value > 0 {
                value
            } else {
                default
            }
        }

        self.max_file_size_mb = positive_or(self.max_file_size_mb, DEFAULT_MAX_FILE_SIZE_MB);
        self.min_validity_hours = positive_or(self.min_validity_hours, DEFAULT_MIN_VALIDITY_HOURS);
        self.max_validity_days = positive_or(self.max_validity_days, DEFAULT_MAX_VALIDITY_DAYS);
        self.default_validity_days = positive_or(self.default_validity_days, DEFAULT_VALIDITY_DAYS);
        if self.require_password_min_length < PASSWORD_MIN_LENGTH_FLOOR {
            self.require_password_min_length = DEFAULT_PASSWORD_MIN_LENGTH;
        }
        self
    }

    /// Check the cross-field constraints an update must keep
    pub fn validate(&self) -> Result<(), String> {
        let bounds = [
            ("max_file_size_mb", self.max_file_size_mb),
            ("min_validity_hours", self.min_validity_hours),
            ("max_validity_days", self.max_validity_days),
            ("default_validity_days", self.default_validity_days),
        ];
        if let Some((name, _)) = bounds.iter().find(|(_, value)| *value < 1) {
            return Err(format!("{} must be at least 1", name));
        }

        if self.require_password_min_length < PASSWORD_MIN_LENGTH_FLOOR {
            return Err(format!(
                "require_password_min_length must be at least {}",
                PASSWORD_MIN_LENGTH_FLOOR
            ));
        }

        if i64::from(self.max_validity_days) * 24 < i64::from(self.min_validity_hours) {
            return Err("max_validity_days must cover at least min_validity_hours".to_string());
        }

        if self.default_validity_days > self.max_validity_days {
            return Err("default_validity_days cannot exceed max_validity_days".to_string());
        }

        if i64::from(self.default_validity_days) * 24 < i64::from(self.min_validity_hours) {
            return Err("default_validity_days must cover at least min_validity_hours".to_string());
        }

        Ok(())
    }

    pub fn max_file_size_bytes(&self) -> i64 {
        i64::from(self.max_file_size_mb) * 1024 * 1024
    }

    pub fn min_validity(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.min_validity_hours))
    }

    pub fn max_validity(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.max_validity_days))
    }

    pub fn default_validity(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.default_validity_days))
    }
}
