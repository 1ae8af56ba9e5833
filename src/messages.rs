use std::collections::BTreeMap;

use crate::validity::ValidityState;

/// Message used when a field is invalid for a reason without a table.
pub const GENERIC_ERROR_MESSAGE: &str = "There was an error.";

/// Native validity failure reasons that carry their own message table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    ValueMissing,
    TypeMismatch,
    PatternMismatch,
    RangeOverflow,
    RangeUnderflow,
}

impl FailureReason {
    /// Resolution order. When several flags are set, the first one listed
    /// here picks the message.
    pub const PRIORITY: [FailureReason; 5] = [
        FailureReason::ValueMissing,
        FailureReason::TypeMismatch,
        FailureReason::PatternMismatch,
        FailureReason::RangeOverflow,
        FailureReason::RangeUnderflow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValueMissing => "valueMissing",
            Self::TypeMismatch => "typeMismatch",
            Self::PatternMismatch => "patternMismatch",
            Self::RangeOverflow => "rangeOverflow",
            Self::RangeUnderflow => "rangeUnderflow",
        }
    }

    fn is_set(self, validity: &ValidityState) -> bool {
        match self {
            Self::ValueMissing => validity.value_missing,
            Self::TypeMismatch => validity.type_mismatch,
            Self::PatternMismatch => validity.pattern_mismatch,
            Self::RangeOverflow => validity.range_overflow,
            Self::RangeUnderflow => validity.range_underflow,
        }
    }

    pub fn first_failing(validity: &ValidityState) -> Option<Self> {
        Self::PRIORITY
            .into_iter()
            .find(|reason| reason.is_set(validity))
    }
}

/// Messages for one failure reason, keyed by control type, plus a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTable {
    default: String,
    by_type: BTreeMap<String, String>,
}

impl MessageTable {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            by_type: BTreeMap::new(),
        }
    }

    pub fn with(mut self, input_type: &str, message: impl Into<String>) -> Self {
        self.by_type.insert(input_type.to_string(), message.into());
        self
    }

    fn with_all(self, input_types: &[&str], message: &str) -> Self {
        input_types
            .iter()
            .fold(self, |table, input_type| table.with(input_type, message))
    }

    pub fn default_message(&self) -> &str {
        &self.default
    }

    pub fn entry(&self, input_type: &str) -> Option<&str> {
        self.by_type.get(input_type).map(String::as_str)
    }

    /// The message for `input_type`. Absent and empty entries fall back to
    /// the table default.
    pub fn message_for(&self, input_type: &str) -> &str {
        match self.entry(input_type) {
            Some(message) if !message.is_empty() => message,
            _ => &self.default,
        }
    }
}

/// The five message tables consulted when a field fails native validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationMessages {
    pub value_missing: MessageTable,
    pub type_mismatch: MessageTable,
    pub pattern_mismatch: MessageTable,
    pub range_overflow: MessageTable,
    pub range_underflow: MessageTable,
}

impl Default for ValidationMessages {
    fn default() -> Self {
        let select_missing = "Please ensure a value is selected";
        let format = "Please match the requested format";
        let at_most = "The value must be less than or equal to the value";
        let at_least = "The value must be greater than or equal to the value";
        let numeric_types = ["range", "number", "date", "time"];

        Self {
            value_missing: MessageTable::new("Please select a value")
                .with("checkbox", "Please add a value for this checkbox")
                .with("radio", "Please add a value for this radio")
                .with("select-one", select_missing)
                .with("select-multiple", select_missing),
            type_mismatch: MessageTable::new("Please enter a valid value")
                .with("email", "Please enter a valid email address")
                .with("url", "Please enter a URL"),
            pattern_mismatch: MessageTable::new(format)
                .with("email", "Please enter a valid email address")
                .with("url", "Please enter a URL")
                .with("tel", "Please match requested format")
                .with_all(&["password", "search"], format),
            range_overflow: MessageTable::new(at_most).with_all(&numeric_types, at_most),
            range_underflow: MessageTable::new(at_least).with_all(&numeric_types, at_least),
        }
    }
}

impl ValidationMessages {
    pub fn table(&self, reason: FailureReason) -> &MessageTable {
        match reason {
            FailureReason::ValueMissing => &self.value_missing,
            FailureReason::TypeMismatch => &self.type_mismatch,
            FailureReason::PatternMismatch => &self.pattern_mismatch,
            FailureReason::RangeOverflow => &self.range_overflow,
            FailureReason::RangeUnderflow => &self.range_underflow,
        }
    }

    fn table_mut(&mut self, reason: FailureReason) -> &mut MessageTable {
        match reason {
            FailureReason::ValueMissing => &mut self.value_missing,
            FailureReason::TypeMismatch => &mut self.type_mismatch,
            FailureReason::PatternMismatch => &mut self.pattern_mismatch,
            FailureReason::RangeOverflow => &mut self.range_overflow,
            FailureReason::RangeUnderflow => &mut self.range_underflow,
        }
    }

    /// Layers `overrides` over these messages. Only the keys the override
    /// names are replaced.
    pub fn merged(&self, overrides: &ValidationMessagesOverride) -> Self {
        let mut merged = self.clone();
        for reason in FailureReason::PRIORITY {
            if let Some(table_override) = overrides.table(reason) {
                table_override.apply_to(merged.table_mut(reason));
            }
        }
        merged
    }
}

/// Partial replacement for one [`MessageTable`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageTableOverride {
    pub default: Option<String>,
    pub by_type: BTreeMap<String, String>,
}

impl MessageTableOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_message(mut self, message: impl Into<String>) -> Self {
        self.default = Some(message.into());
        self
    }

    pub fn message(mut self, input_type: &str, message: impl Into<String>) -> Self {
        self.by_type.insert(input_type.to_string(), message.into());
        self
    }

    fn apply_to(&self, table: &mut MessageTable) {
        if let Some(default) = &self.default {
            table.default = default.clone();
        }
        for (input_type, message) in &self.by_type {
            table.by_type.insert(input_type.clone(), message.clone());
        }
    }
}

/// User supplied message overrides. Every table and entry is optional.
///
/// ```
/// use valid_mate::{FailureReason, ValidationMessages, ValidationMessagesOverride};
///
/// let overrides = ValidationMessagesOverride::new()
///     .message(FailureReason::ValueMissing, "checkbox", "X");
/// let messages = ValidationMessages::default().merged(&overrides);
///
/// assert_eq!(messages.value_missing.message_for("checkbox"), "X");
/// assert_eq!(
///     messages.value_missing.message_for("radio"),
///     "Please add a value for this radio"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationMessagesOverride {
    pub value_missing: Option<MessageTableOverride>,
    pub type_mismatch: Option<MessageTableOverride>,
    pub pattern_mismatch: Option<MessageTableOverride>,
    pub range_overflow: Option<MessageTableOverride>,
    pub range_underflow: Option<MessageTableOverride>,
}

impl ValidationMessagesOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, reason: FailureReason) -> Option<&MessageTableOverride> {
        match reason {
            FailureReason::ValueMissing => self.value_missing.as_ref(),
            FailureReason::TypeMismatch => self.type_mismatch.as_ref(),
            FailureReason::PatternMismatch => self.pattern_mismatch.as_ref(),
            FailureReason::RangeOverflow => self.range_overflow.as_ref(),
            FailureReason::RangeUnderflow => self.range_underflow.as_ref(),
        }
    }

    fn table_entry(&mut self, reason: FailureReason) -> &mut MessageTableOverride {
        let slot = match reason {
            FailureReason::ValueMissing => &mut self.value_missing,
            FailureReason::TypeMismatch => &mut self.type_mismatch,
            FailureReason::PatternMismatch => &mut self.pattern_mismatch,
            FailureReason::RangeOverflow => &mut self.range_overflow,
            FailureReason::RangeUnderflow => &mut self.range_underflow,
        };
        slot.get_or_insert_with(MessageTableOverride::default)
    }

    pub fn message(
        mut self,
        reason: FailureReason,
        input_type: &str,
        message: impl Into<String>,
    ) -> Self {
        self.table_entry(reason)
            .by_type
            .insert(input_type.to_string(), message.into());
        self
    }

    pub fn default_message(mut self, reason: FailureReason, message: impl Into<String>) -> Self {
        self.table_entry(reason).default = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_failing_follows_priority_order() {
        let validity = ValidityState {
            value_missing: true,
            pattern_mismatch: true,
            ..ValidityState::default()
        };
        assert_eq!(
            FailureReason::first_failing(&validity),
            Some(FailureReason::ValueMissing)
        );

        let validity = ValidityState {
            range_underflow: true,
            range_overflow: true,
            ..ValidityState::default()
        };
        assert_eq!(
            FailureReason::first_failing(&validity),
            Some(FailureReason::RangeOverflow)
        );

        let validity = ValidityState {
            too_long: true,
            ..ValidityState::default()
        };
        assert_eq!(FailureReason::first_failing(&validity), None);
    }

    #[test]
    fn unknown_types_use_the_table_default() {
        let messages = ValidationMessages::default();
        assert_eq!(
            messages.type_mismatch.message_for("email"),
            "Please enter a valid email address"
        );
        assert_eq!(
            messages.type_mismatch.message_for("color"),
            "Please enter a valid value"
        );
        assert_eq!(
            messages.pattern_mismatch.message_for("tel"),
            "Please match requested format"
        );
    }

    #[test]
    fn override_replaces_only_named_keys() {
        let overrides = ValidationMessagesOverride::new()
            .message(FailureReason::ValueMissing, "checkbox", "X")
            .default_message(FailureReason::RangeOverflow, "Too big");
        let merged = ValidationMessages::default().merged(&overrides);
        let defaults = ValidationMessages::default();

        assert_eq!(merged.value_missing.message_for("checkbox"), "X");
        assert_eq!(
            merged.value_missing.message_for("radio"),
            defaults.value_missing.message_for("radio")
        );
        assert_eq!(
            merged.value_missing.default_message(),
            defaults.value_missing.default_message()
        );
        assert_eq!(merged.range_overflow.default_message(), "Too big");
        assert_eq!(
            merged.range_overflow.message_for("number"),
            defaults.range_overflow.message_for("number")
        );
        assert_eq!(merged.type_mismatch, defaults.type_mismatch);
    }

    #[test]
    fn empty_entry_falls_back_to_default() {
        let table = MessageTable::new("fallback").with("text", "");
        assert_eq!(table.message_for("text"), "fallback");
    }

    #[test]
    fn override_can_add_new_type_keys() {
        let overrides = ValidationMessagesOverride::new().message(
            FailureReason::ValueMissing,
            "text",
            "Name is required",
        );
        let merged = ValidationMessages::default().merged(&overrides);
        assert_eq!(merged.value_missing.message_for("text"), "Name is required");
    }
}
