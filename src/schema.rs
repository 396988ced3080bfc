// Per-collection field schema and validation

use crate::error::ValidationError;
use eyre::{Result, eyre};
use std::collections::BTreeMap;

/// Field name reserved for the completion flag
pub const COMPLETED_FIELD: &str = "completed";

/// One recognized field of a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub required: bool,
}

impl FieldSpec {
    pub fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required: true,
        }
    }

    pub fn optional(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required: false,
        }
    }
}

/// The fixed set of fields a store instance recognizes
///
/// Field order is display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    collection: String,
    fields: Vec<FieldSpec>,
    completable: bool,
}

impl Schema {
    pub fn new(collection: &str, fields: Vec<FieldSpec>, completable: bool) -> Result<Self> {
        validate_collection_name(collection)?;
        if fields.is_empty() {
            return Err(eyre!("Collection {} must declare at least one field", collection));
        }
        for (i, field) in fields.iter().enumerate() {
            validate_field_name(&field.name)?;
            if field.name == COMPLETED_FIELD {
                return Err(eyre!("Field name '{}' is reserved", COMPLETED_FIELD));
            }
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(eyre!("Duplicate field name: {}", field.name));
            }
        }

        Ok(Self {
            collection: collection.to_string(),
            fields,
            completable,
        })
    }

    /// Contact book: name and phone required, email and address optional
    pub fn contacts() -> Self {
        Self {
            collection: "contacts".to_string(),
            fields: vec![
                FieldSpec::required("name"),
                FieldSpec::required("phone"),
                FieldSpec::optional("email"),
                FieldSpec::optional("address"),
            ],
            completable: false,
        }
    }

    /// To-do list: a required description plus the completion flag
    pub fn tasks() -> Self {
        Self {
            collection: "tasks".to_string(),
            fields: vec![FieldSpec::required("description")],
            completable: true,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn is_completable(&self) -> bool {
        self.completable
    }

    /// Validate raw input and normalize it to the full field set
    ///
    /// Values are trimmed; absent optional fields become empty strings.
    pub fn validate<I, K, V>(&self, input: I) -> std::result::Result<BTreeMap<String, String>, ValidationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut given = BTreeMap::new();
        for (name, value) in input {
            let name = name.into();
            if !self.has_field(&name) {
                return Err(ValidationError::UnknownField {
                    collection: self.collection.clone(),
                    field: name,
                });
            }
            given.insert(name, value.as_ref().trim().to_string());
        }

        let mut normalized = BTreeMap::new();
        for field in &self.fields {
            let value = given.remove(&field.name).unwrap_or_default();
            if field.required && value.is_empty() {
                return Err(ValidationError::MissingField(field.name.clone()));
            }
            normalized.insert(field.name.clone(), value);
        }

        Ok(normalized)
    }
}

pub(crate) fn validate_collection_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(eyre!("Collection name cannot be empty"));
    }
    if name.len() > 64 {
        return Err(eyre!("Collection name too long: {} (max 64 chars)", name));
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!(
            "Invalid collection name: {} (must be alphanumeric with _/-)",
            name
        ));
    }
    Ok(())
}

fn validate_field_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(eyre!("Field name cannot be empty"));
    }
    if name.len() > 64 {
        return Err(eyre!("Field name too long: {} (max 64 chars)", name));
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(eyre!("Invalid field name: {} (must be alphanumeric with _)", name));
    }
    Ok(())
}
