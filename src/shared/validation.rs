use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

/// Longest stored file name, in characters
pub const MAX_FILE_NAME_LENGTH: usize = 255;

/// Longest blob object name, in bytes (common filesystem limit)
pub const MAX_OBJECT_NAME_BYTES: usize = 255;

/// Extensions longer than this are not preserved when shortening
const MAX_KEPT_EXTENSION_BYTES: usize = 16;

lazy_static! {
    /// Share tokens are URL-safe base64 without padding
    /// - Valid: "q3Jd8xY_0kT-2mWv9aZbLw"
    /// - Invalid: "../etc", "abc", "token with space"
    pub static ref SHARE_TOKEN_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_-]{16,64}$").unwrap();
}

/// Check whether a path segment can possibly be a share token
pub fn is_share_token_shaped(token: &str) -> bool {
    SHARE_TOKEN_REGEX.is_match(token)
}

/// Reduce a client supplied filename to its trimmed basename
///
/// Falls back to a random UUID when nothing usable is left. Long names are cut
/// to [`MAX_FILE_NAME_LENGTH`] characters.
pub fn sanitize_file_name(raw: &str) -> String {
    let base: String = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control())
        .collect();
    let base = base.trim();

    if base.is_empty() || base == "." || base == ".." {
        Uuid::new_v4().to_string()
    } else {
        base.chars().take(MAX_FILE_NAME_LENGTH).collect()
    }
}

/// Build the blob object name `{id}-{name}` within [`MAX_OBJECT_NAME_BYTES`]
///
/// The name is shortened at a char boundary, keeping a short extension.
pub fn storage_object_name(id: Uuid, file_name: &str) -> String {
    let prefix = id.to_string();
    let budget = MAX_OBJECT_NAME_BYTES - prefix.len() - 1;
    format!("{}-{}", prefix, fit_to_bytes(file_name, budget))
}

fn fit_to_bytes(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }

    let extension = name
        .rfind('.')
        .map(|dot| &name[dot..])
        .filter(|ext| ext.len() > 1 && ext.len() <= MAX_KEPT_EXTENSION_BYTES)
        .unwrap_or("");
    let stem = &name[..name.len() - extension.len()];

    let mut end = (max - extension.len()).min(stem.len());
    while !stem.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &stem[..end], extension)
}

/// Normalize an email for whitelist storage and comparison
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
