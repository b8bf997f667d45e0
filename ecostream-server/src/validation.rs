//! Input validation module
//!
//! Validation utilities for uploads, object keys and object store parameters.

use crate::error::ApiError;

/// Maximum object key length accepted by S3-compatible stores
const MAX_OBJECT_KEY_LEN: usize = 1024;

/// Validates a content type of the form `type/subtype[; params]`
pub fn validate_content_type(content_type: &str) -> Result<(), ApiError> {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    let valid = match essence.split_once('/') {
        Some((kind, subtype)) => {
            let is_token = |s: &str| {
                !s.is_empty()
                    && s.chars()
                        .all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(c))
            };
            is_token(kind) && is_token(subtype)
        }
        None => false,
    };

    if valid && content_type.is_ascii() {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "Invalid Content-Type: '{}'",
            content_type
        )))
    }
}

/// Validates a bucket name against S3 naming rules
///
/// 3-63 characters of lowercase letters, digits, dots and hyphens,
/// starting and ending with a letter or digit.
pub fn validate_bucket_name(bucket: &str) -> Result<(), ApiError> {
    let len_ok = (3..=63).contains(&bucket.len());
    let chars_ok = bucket
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-');
    let edges_ok = bucket
        .chars()
        .next()
        .zip(bucket.chars().last())
        .map(|(first, last)| first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric())
        .unwrap_or(false);

    if len_ok && chars_ok && edges_ok && !bucket.contains("..") {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "Invalid bucket name: '{}'",
            bucket
        )))
    }
}

/// Validates an object key (the uploaded filename)
pub fn validate_object_key(key: &str) -> Result<(), ApiError> {
    if key.is_empty() {
        return Err(ApiError::bad_request("File name must not be empty"));
    }
    if key.len() > MAX_OBJECT_KEY_LEN {
        return Err(ApiError::bad_request(format!(
            "File name exceeds {} bytes",
            MAX_OBJECT_KEY_LEN
        )));
    }
    if key.contains('/') || key == "." || key == ".." || key.chars().any(char::is_control) {
        return Err(ApiError::bad_request(format!("Invalid file name: '{}'", key)));
    }
    Ok(())
}

/// Validates the size of an uploaded file
///
/// Returns an error if the file exceeds the maximum size.
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ApiError> {
    if size > max_size {
        let max_mb = max_size / (1024 * 1024);
        let actual_mb = size / (1024 * 1024);
        Err(ApiError::bad_request(format!(
            "File too large: {} MB exceeds maximum of {} MB",
            actual_mb, max_mb
        )))
    } else {
        Ok(())
    }
}
