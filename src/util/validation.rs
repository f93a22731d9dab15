use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt::{Debug, Display};

static HEX_COLOR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("compile hex color regex"));

pub fn is_valid_hex_color(value: &str) -> bool {
    HEX_COLOR_REGEX.is_match(value)
}

/// Field-level validation failure surfaced at the service boundary.
///
/// Length and required-field rules are checked here even though the
/// database schema enforces them again, so callers get a predictable
/// error object instead of a constraint violation from storage.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ValidationError {
    fields: BTreeMap<&'static str, Vec<String>>,
}

impl ValidationError {
    #[must_use]
    pub fn builder() -> ValidationErrorBuilder {
        ValidationErrorBuilder::default()
    }

    #[must_use]
    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        let mut builder = Self::builder();
        builder.insert(field, message);
        builder.build().unwrap_or_default()
    }

    #[must_use]
    pub fn messages_for(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    #[must_use]
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &[String])> {
        self.fields.iter().map(|(k, v)| (*k, v.as_slice()))
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "validation failed")?;
        for (field, messages) in &self.fields {
            write!(f, "; {field}: {}", messages.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Default)]
pub struct ValidationErrorBuilder {
    fields: BTreeMap<&'static str, Vec<String>>,
}

impl ValidationErrorBuilder {
    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) -> &mut Self {
        self.fields.entry(field).or_default().push(message.into());
        self
    }

    /// Checks a required, length-bounded text field in one go.
    pub fn check_text(&mut self, field: &'static str, value: &str, max_len: usize) -> &mut Self {
        if value.trim().is_empty() {
            self.insert(field, "must not be empty")
        } else if value.chars().count() > max_len {
            self.insert(field, format!("must be at most {max_len} characters"))
        } else {
            self
        }
    }

    /// Returns `None` when no field accumulated a message.
    #[must_use]
    pub fn build(self) -> Option<ValidationError> {
        if self.fields.is_empty() {
            None
        } else {
            Some(ValidationError {
                fields: self.fields,
            })
        }
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        match self.build() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_builder_passes() {
        assert!(ValidationError::builder().into_result().is_ok());
    }

    #[test]
    fn check_text_rejects_empty_and_oversized() {
        let mut builder = ValidationError::builder();
        builder.check_text("title", "   ", 10);
        builder.check_text("summary", "this is far too long", 10);
        builder.check_text("content", "fine", 10);

        let error = builder.build().unwrap();
        assert_eq!(error.messages_for("title"), ["must not be empty"]);
        assert_eq!(
            error.messages_for("summary"),
            ["must be at most 10 characters"]
        );
        assert!(error.messages_for("content").is_empty());
    }

    #[test]
    fn hex_colors() {
        assert!(is_valid_hex_color("#007bff"));
        assert!(is_valid_hex_color("#FFC107"));
        assert!(!is_valid_hex_color("007bff"));
        assert!(!is_valid_hex_color("#07bff"));
        assert!(!is_valid_hex_color("#zzzzzz"));
    }
}
