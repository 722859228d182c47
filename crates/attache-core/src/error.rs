//! Validation error collection
//!
//! Field-keyed validation messages, surfaced to callers instead of being
//! folded into a single opaque string.

use std::collections::HashMap;
use thiserror::Error;

/// Validation errors collection: field name -> messages
#[derive(Error, Debug, Default, Clone)]
#[error("validation failed: {}", self.full_messages().join("; "))]
pub struct ValidationErrors {
    errors: HashMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Check if there are errors for a specific field
    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Get errors for a specific field
    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.errors.get(field)
    }

    pub fn full_messages(&self) -> Vec<String> {
        let mut messages: Vec<String> = self
            .errors
            .iter()
            .flat_map(|(field, msgs)| msgs.iter().map(move |m| format!("{} {}", field, m)))
            .collect();
        messages.sort();
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_by_default() {
        let errors = ValidationErrors::new();
        assert!(errors.is_empty());
        assert!(errors.full_messages().is_empty());
    }

    #[test]
    fn test_add_and_query() {
        let mut errors = ValidationErrors::new();
        errors.add("path", "cannot be blank");
        errors.add("hash", "is too long (maximum is 64 characters)");

        assert!(!errors.is_empty());
        assert!(errors.has_error("path"));
        assert!(!errors.has_error("size"));
        assert_eq!(errors.get("path").unwrap().len(), 1);
    }

    #[test]
    fn test_full_messages_include_field() {
        let mut errors = ValidationErrors::new();
        errors.add("path", "cannot be blank");

        let messages = errors.full_messages();
        assert_eq!(messages, vec!["path cannot be blank"]);
    }
}
