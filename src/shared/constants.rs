/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

/// Default page size for the owner file listing
pub const DEFAULT_FILES_PAGE_SIZE: i64 = 20;

/// Default page size for download history
pub const DEFAULT_HISTORY_PAGE_SIZE: i64 = 50;

// =============================================================================
// ROLE CONSTANTS
// =============================================================================

/// Administrator role - may manage any file
pub const ROLE_ADMIN: &str = "admin";

/// Regular user role
pub const ROLE_USER: &str = "user";

// =============================================================================
// HEADERS
// =============================================================================

/// Header carrying the plaintext file password on download
pub const FILE_PASSWORD_HEADER: &str = "x-file-password";

/// Header carrying the scheduler secret on admin endpoints
pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// Content type used when nothing better is known
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
