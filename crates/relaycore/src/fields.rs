use serde::{Deserialize, Serialize};

/// One `{label, value}` entry of a node's parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: String,
}

impl Field {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Value of the first field whose label matches exactly, if any.
///
/// Labels are case-sensitive and duplicates after the first are never seen.
pub fn resolve<'a>(fields: &'a [Field], label: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|f| f.label == label)
        .map(|f| f.value.as_str())
}

/// Owned variant of [`resolve`], used when building typed actions.
pub fn resolve_owned(fields: &[Field], label: &str) -> Option<String> {
    resolve(fields, label).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> Vec<Field> {
        vec![
            Field::new("Endpoint", "https://example.test/a"),
            Field::new("Method", "post"),
            Field::new("Endpoint", "https://example.test/b"),
        ]
    }

    #[test]
    fn test_resolve_first_match_wins() {
        assert_eq!(
            resolve(&fields(), "Endpoint"),
            Some("https://example.test/a")
        );
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        assert_eq!(resolve(&fields(), "method"), None);
        assert_eq!(resolve(&fields(), "Method"), Some("post"));
    }

    #[test]
    fn test_resolve_absent() {
        assert_eq!(resolve(&fields(), "Headers"), None);
        assert_eq!(resolve(&[], "Endpoint"), None);
    }

    #[test]
    fn test_resolve_keeps_empty_values() {
        let fields = vec![Field::new("Body", "")];
        assert_eq!(resolve(&fields, "Body"), Some(""));
    }
}
