//! Section and item views over merged config values.
use serde_json::Value;

use crate::error::BuildError;

/// A top-level config key and its (possibly absent) value.
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    name: &'a str,
    value: Option<&'a Value>,
}

impl<'a> Section<'a> {
    /// Wrap `value` found under `name`.
    #[must_use]
    pub const fn new(name: &'a str, value: Option<&'a Value>) -> Self {
        Self { name, value }
    }

    /// Section name.
    #[must_use]
    pub const fn name(&self) -> &'a str {
        self.name
    }

    /// Raw value; `None` when the section is absent.
    #[must_use]
    pub const fn value(&self) -> Option<&'a Value> {
        self.value
    }

    /// Normalize to an ordered list of items.
    ///
    /// Absent or null → empty; array → its elements; anything else (scalar
    /// or bare mapping) → a single item.
    #[must_use]
    pub fn items(&self) -> Vec<Item<'a>> {
        match self.value {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(values)) => values.iter().map(|v| Item::new(self.name, v)).collect(),
            Some(other) => vec![Item::new(self.name, other)],
        }
    }

    /// Normalize to a list of strings.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidValue`] if an element is not a string.
    pub fn strings(&self) -> Result<Vec<String>, BuildError> {
        self.items()
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| BuildError::InvalidValue {
                        section: self.name.to_string(),
                        field: self.name.to_string(),
                        reason: format!("expected a string, got {}", item.value()),
                    })
            })
            .collect()
    }
}

/// One entry of a section, read through key lookups.
///
/// Lookups on missing keys, or on items that are not mappings, return
/// `None` rather than failing.
#[derive(Debug, Clone, Copy)]
pub struct Item<'a> {
    section: &'a str,
    value: &'a Value,
}

impl<'a> Item<'a> {
    /// Wrap an item of `section`.
    #[must_use]
    pub const fn new(section: &'a str, value: &'a Value) -> Self {
        Self { section, value }
    }

    /// Name of the section the item belongs to.
    #[must_use]
    pub const fn section(&self) -> &'a str {
        self.section
    }

    /// Raw item value.
    #[must_use]
    pub const fn value(&self) -> &'a Value {
        self.value
    }

    /// The item itself as a string, for scalar sections like `gems`.
    #[must_use]
    pub fn as_str(&self) -> Option<&'a str> {
        self.value.as_str()
    }

    /// Look up `key`; `None` for missing keys, nulls and non-mapping items.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.value.get(key).filter(|v| !v.is_null())
    }

    /// Look up `key` as a string.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidValue`] if the key holds a non-string.
    pub fn str(&self, key: &str) -> Result<Option<&'a str>, BuildError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(self.invalid(key, &format!("expected a string, got {other}"))),
        }
    }

    /// Look up a required string key.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MissingField`] if absent, or
    /// [`BuildError::InvalidValue`] if not a string.
    pub fn require_str(&self, key: &str) -> Result<&'a str, BuildError> {
        self.str(key)?.ok_or_else(|| BuildError::MissingField {
            section: self.section.to_string(),
            field: key.to_string(),
        })
    }

    /// Look up `key` as a list of strings (a lone string counts as one).
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidValue`] if any element is not a string.
    pub fn strings(&self, key: &str) -> Result<Vec<&'a str>, BuildError> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(Value::String(s)) => Ok(vec![s.as_str()]),
            Some(Value::Array(values)) => values
                .iter()
                .map(|v| {
                    v.as_str()
                        .ok_or_else(|| self.invalid(key, &format!("expected a string, got {v}")))
                })
                .collect(),
            Some(other) => Err(self.invalid(key, &format!("expected a list, got {other}"))),
        }
    }

    fn invalid(&self, key: &str, reason: &str) -> BuildError {
        BuildError::InvalidValue {
            section: self.section.to_string(),
            field: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_and_null_sections_have_no_items() {
        assert!(Section::new("files", None).items().is_empty());
        let null = Value::Null;
        assert!(Section::new("files", Some(&null)).items().is_empty());
    }

    #[test]
    fn scalar_section_is_one_item() {
        let v = json!("rake");
        let items = Section::new("gems", Some(&v)).items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_str(), Some("rake"));
    }

    #[test]
    fn bare_mapping_is_one_item() {
        let v = json!({"file": "/etc/motd"});
        let items = Section::new("files", Some(&v)).items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].str("file").unwrap(), Some("/etc/motd"));
    }

    #[test]
    fn list_section_keeps_order() {
        let v = json!(["a", "b", "c"]);
        let names: Vec<_> = Section::new("gems", Some(&v))
            .items()
            .iter()
            .filter_map(Item::as_str)
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn section_strings_rejects_non_strings() {
        let v = json!(["vim", 3]);
        assert!(Section::new("packages", Some(&v)).strings().is_err());
        let ok = json!("vim");
        assert_eq!(Section::new("packages", Some(&ok)).strings().unwrap(), vec!["vim"]);
    }

    #[test]
    fn missing_keys_are_none_not_errors() {
        let v = json!({"file": "/etc/motd", "source": null});
        let item = Item::new("files", &v);
        assert_eq!(item.get("template"), None);
        assert_eq!(item.get("source"), None);
        assert_eq!(item.str("template").unwrap(), None);
        assert!(item.strings("authorized_keys").unwrap().is_empty());
    }

    #[test]
    fn lookups_on_scalar_items_are_none() {
        let v = json!("rake");
        let item = Item::new("gems", &v);
        assert_eq!(item.get("before"), None);
    }

    #[test]
    fn require_str_reports_missing_field() {
        let v = json!({"user": "bob"});
        let err = Item::new("files", &v).require_str("file").unwrap_err();
        assert!(matches!(err, BuildError::MissingField { ref field, .. } if field == "file"));
    }

    #[test]
    fn wrong_types_are_invalid_values() {
        let v = json!({"file": ["/a"], "authorized_keys": {"k": 1}});
        let item = Item::new("users", &v);
        assert!(matches!(item.str("file"), Err(BuildError::InvalidValue { .. })));
        assert!(matches!(
            item.strings("authorized_keys"),
            Err(BuildError::InvalidValue { .. })
        ));
    }

    #[test]
    fn strings_accepts_single_string() {
        let v = json!({"drives": "/dev/sdb"});
        assert_eq!(Item::new("raids", &v).strings("drives").unwrap(), vec!["/dev/sdb"]);
    }
}
