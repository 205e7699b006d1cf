/// Request field validation for entries, revisions, tags and comments.
use thiserror::Error;

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 10_000;
pub const MAX_CHANGES_CHARS: usize = 10_000;
pub const MAX_COMMENT_CHARS: usize = 5_000;
pub const MAX_TAG_CHARS: usize = 32;
pub const MAX_TAGS: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("blueprint name is required")]
    EmptyName,
    #[error("blueprint name exceeds 100 characters")]
    NameTooLong,
    #[error("blueprint description exceeds 10000 characters")]
    DescriptionTooLong,
    #[error("revision changes exceed 10000 characters")]
    ChangesTooLong,
    #[error("comment message is required")]
    EmptyComment,
    #[error("comment message exceeds 5000 characters")]
    CommentTooLong,
    #[error("tag names cannot be empty")]
    EmptyTag,
    #[error("tag {0:?} exceeds 32 characters")]
    TagTooLong(String),
    #[error("at most 20 tags are allowed")]
    TooManyTags,
}

/// Trim and check a blueprint name.
pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ValidationError::NameTooLong);
    }
    Ok(name.to_string())
}

pub fn validate_description(description: &str) -> Result<String, ValidationError> {
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(ValidationError::DescriptionTooLong);
    }
    Ok(description.trim().to_string())
}

pub fn validate_changes(changes: &str) -> Result<String, ValidationError> {
    if changes.chars().count() > MAX_CHANGES_CHARS {
        return Err(ValidationError::ChangesTooLong);
    }
    Ok(changes.trim().to_string())
}

pub fn validate_comment(message: &str) -> Result<String, ValidationError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(ValidationError::EmptyComment);
    }
    if message.chars().count() > MAX_COMMENT_CHARS {
        return Err(ValidationError::CommentTooLong);
    }
    Ok(message.to_string())
}

/// Trim tag names and collapse case-insensitive duplicates, keeping the
/// first spelling and the request order.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Result<Vec<String>, ValidationError> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() {
            return Err(ValidationError::EmptyTag);
        }
        if tag.chars().count() > MAX_TAG_CHARS {
            return Err(ValidationError::TagTooLong(tag.to_string()));
        }
        let lowered = tag.to_lowercase();
        if !out.iter().any(|t| t.to_lowercase() == lowered) {
            out.push(tag.to_string());
        }
    }
    if out.len() > MAX_TAGS {
        return Err(ValidationError::TooManyTags);
    }
    Ok(out)
}
