use std::fmt;

use crate::document::Document;
use crate::dom::NodeId;
use crate::events::{SubmitEvent, SubmitOutcome};
use crate::messages::{
    FailureReason, GENERIC_ERROR_MESSAGE, ValidationMessages, ValidationMessagesOverride,
};
use crate::trace::TraceLog;
use crate::validity::ValidityState;
use crate::{Error, Result};

/// Attribute naming the custom validator a field opts into.
pub const VALIDATOR_ATTR: &str = "data-valid-mate-validator";

const FIELD_SELECTOR: &str = "input, select, textarea";
const ERROR_CLASS: &str = "error";
const DESCRIBED_BY_ATTR: &str = "aria-describedby";

fn error_node_id(field_id: &str) -> String {
    format!("error-{field_id}")
}

/// Read-only view of a field handed to custom validators.
#[derive(Clone, Copy)]
pub struct Field<'a> {
    document: &'a dyn Document,
    node: NodeId,
}

impl<'a> Field<'a> {
    pub fn new(document: &'a dyn Document, node: NodeId) -> Self {
        Self { document, node }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn document(&self) -> &'a dyn Document {
        self.document
    }

    pub fn value(&self) -> Result<String> {
        self.document.value(self.node)
    }

    pub fn checked(&self) -> Result<bool> {
        self.document.checked(self.node)
    }

    pub fn input_type(&self) -> String {
        self.document.input_type(self.node)
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.document.attr(self.node, name)
    }

    pub fn validity(&self) -> Result<ValidityState> {
        self.document.validity(self.node)
    }
}

impl fmt::Debug for Field<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field").field("node", &self.node).finish()
    }
}

type Predicate = Box<dyn Fn(&Field<'_>) -> Result<bool>>;

/// A named predicate with the message shown when it rejects a field.
pub struct CustomValidator {
    name: String,
    message: String,
    predicate: Predicate,
}

impl CustomValidator {
    pub fn new(
        name: impl Into<String>,
        message: impl Into<String>,
        validate: impl Fn(&Field<'_>) -> bool + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            predicate: Box::new(move |field: &Field<'_>| Ok(validate(field))),
        }
    }

    /// A validator whose predicate can fail. An `Err` aborts the
    /// validation pass that ran it.
    pub fn fallible(
        name: impl Into<String>,
        message: impl Into<String>,
        validate: impl Fn(&Field<'_>) -> Result<bool> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            predicate: Box::new(validate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn validate(&self, field: &Field<'_>) -> Result<bool> {
        (self.predicate)(field).map_err(|err| match err {
            Error::Validator { .. } => err,
            other => Error::Validator {
                name: self.name.clone(),
                message: other.to_string(),
            },
        })
    }
}

impl fmt::Debug for CustomValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomValidator")
            .field("name", &self.name)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// A field that failed the current validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: NodeId,
    pub message: String,
    /// The `span.error` rendered for this failure.
    pub annotation: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldVerdict {
    pub valid: bool,
    /// Empty when `valid`.
    pub message: String,
}

impl FieldVerdict {
    fn valid() -> Self {
        Self {
            valid: true,
            message: String::new(),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub validation_messages: ValidationMessagesOverride,
}

impl Options {
    pub fn with_validation_messages(mut self, messages: ValidationMessagesOverride) -> Self {
        self.validation_messages = messages;
        self
    }
}

/// Validates the controls of one form and keeps inline error annotations
/// in sync with the result.
pub struct FormValidator<D: Document> {
    document: D,
    form: NodeId,
    fields: Vec<NodeId>,
    errors: Vec<ValidationError>,
    messages: ValidationMessages,
    custom_validators: Vec<CustomValidator>,
    trace: TraceLog,
}

impl<D: Document> FormValidator<D> {
    /// Attaches to `form`. The controls inside the form are captured once,
    /// here; controls added later are not validated. The form is marked
    /// `novalidate`.
    pub fn new(mut document: D, form: NodeId, options: Options) -> Result<Self> {
        if !document.is_element(form) {
            return Err(Error::NodeNotFound(format!("form {form:?}")));
        }
        let fields = document.query_selector_all(form, FIELD_SELECTOR)?;
        let messages = ValidationMessages::default().merged(&options.validation_messages);
        document.set_attr(form, "novalidate", "true")?;

        Ok(Self {
            document,
            form,
            fields,
            errors: Vec::new(),
            messages,
            custom_validators: Vec::new(),
            trace: TraceLog::default(),
        })
    }

    pub fn form(&self) -> NodeId {
        self.form
    }

    pub fn fields(&self) -> &[NodeId] {
        &self.fields
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn messages(&self) -> &ValidationMessages {
        &self.messages
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    pub fn into_document(self) -> D {
        self.document
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace.set_enabled(enabled);
    }

    pub fn set_trace_stderr(&mut self, enabled: bool) {
        self.trace.set_stderr(enabled);
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        self.trace.set_limit(max_entries)
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace.take()
    }

    /// Registers a validator. Validators sharing a name all apply, in
    /// registration order.
    pub fn add_custom_validator(&mut self, validator: CustomValidator) {
        self.trace.line(format!(
            "[validate] registered custom validator {}",
            validator.name
        ));
        self.custom_validators.push(validator);
    }

    pub fn has_custom_validation(&self, field: NodeId) -> bool {
        self.document
            .attr(field, VALIDATOR_ATTR)
            .is_some_and(|name| !name.is_empty())
    }

    pub fn custom_validators_for(&self, field: NodeId) -> Vec<&CustomValidator> {
        let Some(name) = self.document.attr(field, VALIDATOR_ATTR) else {
            return Vec::new();
        };
        self.custom_validators
            .iter()
            .filter(|validator| validator.name == name)
            .collect()
    }

    /// Decides whether `field` is valid. A field carrying the validator
    /// attribute is judged only by the matching custom validators; the
    /// first one that rejects it supplies the message. Other fields use
    /// native constraint validation.
    pub fn is_field_valid(&self, field: NodeId) -> Result<FieldVerdict> {
        if self.has_custom_validation(field) {
            let view = Field::new(&self.document, field);
            for validator in self.custom_validators_for(field) {
                if !validator.validate(&view)? {
                    return Ok(FieldVerdict::invalid(validator.message.as_str()));
                }
            }
            return Ok(FieldVerdict::valid());
        }

        if self.document.validity(field)?.valid() {
            return Ok(FieldVerdict::valid());
        }
        Ok(FieldVerdict::invalid(self.resolve_message(field)?))
    }

    /// Message for the highest priority native failure of `field`.
    pub fn resolve_message(&self, field: NodeId) -> Result<String> {
        let validity = self.document.validity(field)?;
        let Some(reason) = FailureReason::first_failing(&validity) else {
            return Ok(GENERIC_ERROR_MESSAGE.to_string());
        };
        let input_type = self.document.input_type(field);
        Ok(self
            .messages
            .table(reason)
            .message_for(&input_type)
            .to_string())
    }

    /// Validates a single field, rendering an error annotation when it
    /// fails. Returns whether the field is valid.
    pub fn validate_input(&mut self, field: NodeId) -> Result<bool> {
        let verdict = self.is_field_valid(field)?;
        let label = self.field_label(field);

        if verdict.valid {
            if self.has_custom_validation(field) && self.custom_validators_for(field).is_empty() {
                self.trace.line(format!(
                    "[validate] {label} names a custom validator that is not registered"
                ));
            }
            return Ok(true);
        }

        self.trace.line(format!(
            "[validate] {label} invalid message={:?}",
            verdict.message
        ));

        // A direct call outside a pass may find an earlier annotation.
        if let Some(pos) = self.errors.iter().position(|error| error.field == field) {
            let previous = self.errors.remove(pos);
            self.clear_error(&previous)?;
        }

        let annotation = self.show_error(field, &verdict.message)?;
        self.errors.push(ValidationError {
            field,
            message: verdict.message,
            annotation,
        });
        Ok(false)
    }

    /// Runs a full pass: clears every annotation from the previous pass,
    /// then validates each captured field in document order. Returns true
    /// when every field passed.
    pub fn validate_form(&mut self) -> Result<bool> {
        self.reset_errors()?;
        self.trace.line(format!(
            "[validate] pass start fields={}",
            self.fields.len()
        ));

        let mut all_valid = true;
        for field in self.fields.clone() {
            if !self.validate_input(field)? {
                all_valid = false;
            }
        }

        self.trace.line(format!(
            "[validate] pass end valid={all_valid} errors={}",
            self.errors.len()
        ));
        Ok(all_valid)
    }

    /// Submit handler: suppresses native submission and validates the
    /// form instead.
    pub fn handle_submit(&mut self, event: &mut SubmitEvent) -> Result<bool> {
        event.prevent_default();
        let valid = self.validate_form()?;
        self.trace.line(format!(
            "[submit] target={:?} default_prevented={} valid={valid}",
            event.target(),
            event.default_prevented()
        ));
        Ok(valid)
    }

    /// Submits the form this validator is attached to.
    pub fn submit(&mut self) -> Result<SubmitOutcome> {
        let mut event = SubmitEvent::new(self.form);
        let valid = self.handle_submit(&mut event)?;
        Ok(SubmitOutcome {
            valid,
            default_prevented: event.default_prevented(),
        })
    }

    fn reset_errors(&mut self) -> Result<()> {
        for error in std::mem::take(&mut self.errors) {
            self.clear_error(&error)?;
        }
        Ok(())
    }

    fn clear_error(&mut self, error: &ValidationError) -> Result<()> {
        self.document.remove_attr(error.field, DESCRIBED_BY_ATTR)?;
        self.document.remove_node(error.annotation)
    }

    fn show_error(&mut self, field: NodeId, message: &str) -> Result<NodeId> {
        let annotation = self.document.create_element("span");
        self.document.set_attr(annotation, "class", ERROR_CLASS)?;
        let text = self.document.create_text(message);
        self.document.append_child(annotation, text)?;

        let field_id = match self.document.attr(field, "id").filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => {
                let id = self.document.unique_id();
                self.document.set_attr(field, "id", &id)?;
                id
            }
        };

        let annotation_id = error_node_id(&field_id);
        self.document
            .set_attr(field, DESCRIBED_BY_ATTR, &annotation_id)?;
        self.document.set_attr(annotation, "id", &annotation_id)?;
        self.document.insert_after(field, annotation)?;

        self.trace
            .line(format!("[render] {annotation_id} after #{field_id}"));
        Ok(annotation)
    }

    fn field_label(&self, field: NodeId) -> String {
        match self.document.attr(field, "id") {
            Some(id) if !id.is_empty() => format!("#{id}"),
            _ => format!("{field:?}"),
        }
    }
}

impl<D: Document + fmt::Debug> fmt::Debug for FormValidator<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormValidator")
            .field("document", &self.document)
            .field("form", &self.form)
            .field("fields", &self.fields)
            .field("errors", &self.errors)
            .field("custom_validators", &self.custom_validators)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Dom;

    fn validator_for(html: &str) -> Result<FormValidator<Dom>> {
        let dom = Dom::parse(html)?;
        let form = dom
            .query_selector(dom.root(), "form")?
            .ok_or_else(|| Error::NodeNotFound("form".into()))?;
        FormValidator::new(dom, form, Options::default())
    }

    #[test]
    fn construction_rejects_non_element_form() -> Result<()> {
        let dom = Dom::parse("<p>text</p>")?;
        let text = dom.children(dom.children(dom.root())[0])[0];
        let err = FormValidator::new(dom, text, Options::default()).err();
        assert!(matches!(err, Some(Error::NodeNotFound(_))));
        Ok(())
    }

    #[test]
    fn generic_message_when_no_prioritized_reason_fails() -> Result<()> {
        let v = validator_for("<form><input id='short' minlength='5' value='abc'></form>")?;
        let field = v.document().by_id("short").expect("field");
        let verdict = v.is_field_valid(field)?;
        assert!(!verdict.valid);
        assert_eq!(verdict.message, GENERIC_ERROR_MESSAGE);
        Ok(())
    }

    #[test]
    fn direct_validate_input_does_not_duplicate_annotations() -> Result<()> {
        let mut v = validator_for("<form><input id='name' required></form>")?;
        let field = v.document().by_id("name").expect("field");
        assert!(!v.validate_input(field)?);
        assert!(!v.validate_input(field)?);

        let form = v.form();
        let annotations = v.document().query_selector_all(form, "span.error")?;
        assert_eq!(annotations.len(), 1);
        assert_eq!(v.errors().len(), 1);
        Ok(())
    }

    #[test]
    fn valid_field_validation_has_no_side_effects() -> Result<()> {
        let mut v = validator_for("<form><input name='name' value='ok'></form>")?;
        let field = v.fields()[0];
        let before = v.document().outer_html(v.form());
        assert!(v.validate_input(field)?);
        assert_eq!(v.document().outer_html(v.form()), before);
        assert!(!v.document().has_attr(field, "id"));
        Ok(())
    }

    #[test]
    fn fallible_predicate_errors_are_tagged_with_validator_name() -> Result<()> {
        let mut v = validator_for(
            "<form><input id='d' data-valid-mate-validator='date' value='soon'></form>",
        )?;
        v.add_custom_validator(CustomValidator::fallible("date", "Bad date", |field| {
            let value = field.value()?;
            Err(Error::Dom(format!("cannot parse {value}")))
        }));

        let err = v.validate_form().err();
        assert_eq!(
            err,
            Some(Error::Validator {
                name: "date".into(),
                message: "dom error: cannot parse soon".into(),
            })
        );
        Ok(())
    }

    #[test]
    fn trace_records_pass_and_render_lines() -> Result<()> {
        let mut v = validator_for("<form><input id='name' required></form>")?;
        v.enable_trace(true);
        v.set_trace_stderr(false);
        v.validate_form()?;

        let logs = v.take_trace_logs();
        assert_eq!(logs.first().map(String::as_str), Some("[validate] pass start fields=1"));
        assert!(logs.iter().any(|line| line == "[render] error-name after #name"));
        assert_eq!(
            logs.last().map(String::as_str),
            Some("[validate] pass end valid=false errors=1")
        );
        Ok(())
    }

    #[test]
    fn empty_validator_attribute_falls_back_to_native_validation() -> Result<()> {
        let v = validator_for("<form><input id='n' data-valid-mate-validator='' required></form>")?;
        let field = v.document().by_id("n").expect("field");
        assert!(!v.has_custom_validation(field));
        assert!(!v.is_field_valid(field)?.valid);
        Ok(())
    }
}
