//! Partial-update (`Patch`) and full-overwrite (`Update`) applicators.
//!
//! Each patchable entity declares a table of [`FieldBinding`]s. Input keys
//! are matched case-insensitively against the table; unknown keys are
//! ignored. A conversion failure on one field is recorded as a
//! [`FieldError`] and the remaining fields are still applied, so the result
//! is a best-effort merge reported alongside its issues.

mod convert;
mod user_login;
mod user_token;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Untyped structured patch input (field name → scalar or nested map).
pub type PatchDocument = serde_json::Map<String, Value>;

/// Options controlling how map-valued fields are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchOptions {
    /// Upsert into an existing map instead of replacing it wholesale.
    pub merge_collections: bool,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            merge_collections: true,
        }
    }
}

impl PatchOptions {
    pub fn replace_collections() -> Self {
        Self {
            merge_collections: false,
        }
    }
}

/// Non-fatal conversion failure for one recognized field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Setter for one field: converts the raw value and assigns it.
pub type FieldSetter<T> = fn(&mut T, &Value, PatchOptions) -> Result<(), String>;

/// One row of an entity's field-mapping table.
pub struct FieldBinding<T: 'static> {
    /// Canonical field name, also used as the error label.
    pub field: &'static str,
    pub apply: FieldSetter<T>,
}

impl<T: 'static> FieldBinding<T> {
    pub fn matches(&self, key: &str) -> bool {
        self.field.eq_ignore_ascii_case(key)
    }
}

/// An entity that accepts untyped partial updates.
pub trait Patch: Sized + 'static {
    /// Name used in error messages.
    const ENTITY: &'static str;

    fn bindings() -> &'static [FieldBinding<Self>];

    /// Apply every recognized field of `input`, returning per-field errors.
    fn patch(&mut self, input: &PatchDocument, options: PatchOptions) -> Vec<FieldError> {
        apply_patch(self, input, options)
    }
}

/// Unconditional full-field overwrite from a trusted, validated source.
pub trait Update {
    fn update(&mut self, source: &Self);
}

/// Apply `input` to `record` through `T`'s binding table.
pub fn apply_patch<T: Patch>(
    record: &mut T,
    input: &PatchDocument,
    options: PatchOptions,
) -> Vec<FieldError> {
    let mut errors = Vec::new();
    for (key, value) in input {
        let Some(binding) = T::bindings().iter().find(|b| b.matches(key)) else {
            tracing::trace!(entity = T::ENTITY, key, "ignoring unrecognized patch field");
            continue;
        };
        if let Err(reason) = (binding.apply)(record, value, options) {
            errors.push(FieldError {
                field: binding.field.to_string(),
                message: format!("{reason}: cannot parse {value} from {} JSON", T::ENTITY),
            });
        }
    }
    if !errors.is_empty() {
        tracing::debug!(entity = T::ENTITY, errors = errors.len(), "patch applied with field errors");
    }
    errors
}
