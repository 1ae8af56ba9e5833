use std::collections::BTreeMap;

use proptest::collection::vec;
use proptest::prelude::*;
use proptest::test_runner::{FileFailurePersistence, TestCaseError, TestCaseResult};
use valid_mate::{
    Dom, Error, FailureReason, FormValidator, Options, ValidationMessages,
    ValidationMessagesOverride,
};

const VALIDATOR_PROPTEST_REGRESSION_FILE: &str =
    "tests/proptest-regressions/validator_property_test.txt";
const DEFAULT_VALIDATOR_PROPTEST_CASES: u32 = 128;

const CONTROL_TYPES: [&str; 6] = ["text", "checkbox", "radio", "email", "number", "select-one"];

#[derive(Clone, Debug)]
struct FieldSpec {
    has_id: bool,
    required: bool,
    digits_only: bool,
}

#[derive(Clone, Debug)]
enum FormAction {
    SetValue(usize, String),
    Validate,
}

fn validator_proptest_cases() -> u32 {
    std::env::var("VALID_MATE_PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_VALIDATOR_PROPTEST_CASES)
}

fn value_strategy() -> BoxedStrategy<String> {
    vec(
        prop_oneof![Just('a'), Just('z'), Just('1'), Just('7'), Just(' ')],
        0..=4,
    )
    .prop_map(|chars| chars.into_iter().collect())
    .boxed()
}

fn field_spec_strategy() -> BoxedStrategy<FieldSpec> {
    (any::<bool>(), any::<bool>(), any::<bool>())
        .prop_map(|(has_id, required, digits_only)| FieldSpec {
            has_id,
            required,
            digits_only,
        })
        .boxed()
}

fn scenario_strategy() -> BoxedStrategy<(Vec<FieldSpec>, Vec<FormAction>)> {
    vec(field_spec_strategy(), 1..=6)
        .prop_flat_map(|fields| {
            let count = fields.len();
            let action = prop_oneof![
                3 => (0..count, value_strategy())
                    .prop_map(|(index, value)| FormAction::SetValue(index, value)),
                2 => Just(FormAction::Validate),
            ];
            (Just(fields), vec(action, 1..=16))
        })
        .boxed()
}

fn form_html(fields: &[FieldSpec]) -> String {
    let mut html = String::from("<form>");
    for (index, field) in fields.iter().enumerate() {
        html.push_str(&format!("<label>Field {index}</label><input name='f{index}'"));
        if field.has_id {
            html.push_str(&format!(" id='f{index}'"));
        }
        if field.required {
            html.push_str(" required");
        }
        if field.digits_only {
            html.push_str(" pattern='[0-9]+'");
        }
        html.push_str(" value=''>");
    }
    html.push_str("<button>Send</button></form>");
    html
}

fn expected_invalid(field: &FieldSpec, value: &str) -> bool {
    let missing = field.required && value.is_empty();
    let mismatch =
        field.digits_only && !value.is_empty() && !value.chars().all(|c| c.is_ascii_digit());
    missing || mismatch
}

fn fail(err: Error) -> TestCaseError {
    TestCaseError::fail(format!("{err:?}"))
}

fn assert_annotations_track_validity(
    fields: &[FieldSpec],
    actions: &[FormAction],
) -> TestCaseResult {
    let dom = Dom::parse(&form_html(fields)).map_err(fail)?;
    let form = dom
        .query_selector(dom.root(), "form")
        .map_err(fail)?
        .ok_or_else(|| TestCaseError::fail("form missing"))?;
    let mut validator = FormValidator::new(dom, form, Options::default()).map_err(fail)?;
    let mut values = vec![String::new(); fields.len()];

    for (step, action) in actions.iter().enumerate() {
        match action {
            FormAction::SetValue(index, value) => {
                let node = validator.fields()[*index];
                validator
                    .document_mut()
                    .set_value(node, value)
                    .map_err(fail)?;
                values[*index] = value.clone();
            }
            FormAction::Validate => {
                let all_valid = validator.validate_form().map_err(fail)?;
                let dom = validator.document();

                let spans = dom.query_selector_all(form, "span.error").map_err(fail)?;
                prop_assert_eq!(spans.len(), validator.errors().len(), "step {}", step);
                prop_assert_eq!(all_valid, validator.errors().is_empty(), "step {}", step);

                for (index, spec) in fields.iter().enumerate() {
                    let node = validator.fields()[index];
                    let invalid = expected_invalid(spec, &values[index]);
                    let described_by = dom.attr(node, "aria-describedby");
                    prop_assert_eq!(
                        described_by.is_some(),
                        invalid,
                        "field {} value {:?} at step {}",
                        index,
                        values[index],
                        step
                    );
                    if let Some(described_by) = described_by {
                        let id = dom
                            .attr(node, "id")
                            .ok_or_else(|| TestCaseError::fail("described field has no id"))?;
                        prop_assert_eq!(&described_by, &format!("error-{id}"));
                        let span = dom.by_id(&described_by);
                        prop_assert!(span.is_some());
                        prop_assert_eq!(dom.next_element_sibling(node), span);
                    }
                }
            }
        }
    }

    Ok(())
}

fn override_entry_strategy() -> BoxedStrategy<(usize, usize, String)> {
    (
        0..FailureReason::PRIORITY.len(),
        0..CONTROL_TYPES.len(),
        prop_oneof![Just(String::new()), "[a-z]{1,8}"],
    )
        .boxed()
}

fn assert_merge_keeps_unnamed_defaults(entries: &[(usize, usize, String)]) -> TestCaseResult {
    let mut overrides = ValidationMessagesOverride::new();
    let mut expected: BTreeMap<(usize, usize), String> = BTreeMap::new();
    for (reason, control, message) in entries {
        overrides = overrides.message(
            FailureReason::PRIORITY[*reason],
            CONTROL_TYPES[*control],
            message.clone(),
        );
        expected.insert((*reason, *control), message.clone());
    }

    let defaults = ValidationMessages::default();
    let merged = defaults.merged(&overrides);
    for (reason_index, reason) in FailureReason::PRIORITY.into_iter().enumerate() {
        for (control_index, control) in CONTROL_TYPES.into_iter().enumerate() {
            let actual = merged.table(reason).message_for(control);
            let want = match expected.get(&(reason_index, control_index)) {
                Some(message) if !message.is_empty() => message.as_str(),
                // An empty override hides the built-in entry.
                Some(_) => defaults.table(reason).default_message(),
                None => defaults.table(reason).message_for(control),
            };
            prop_assert_eq!(actual, want, "{} / {}", reason.as_str(), control);
            prop_assert_eq!(
                merged.table(reason).default_message(),
                defaults.table(reason).default_message()
            );
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: validator_proptest_cases(),
        failure_persistence: Some(Box::new(
            FileFailurePersistence::Direct(VALIDATOR_PROPTEST_REGRESSION_FILE),
        )),
        .. ProptestConfig::default()
    })]

    #[test]
    fn annotations_always_match_the_latest_pass((fields, actions) in scenario_strategy()) {
        assert_annotations_track_validity(&fields, &actions)?;
    }

    #[test]
    fn merged_messages_fall_back_to_defaults(entries in vec(override_entry_strategy(), 0..12)) {
        assert_merge_keeps_unnamed_defaults(&entries)?;
    }
}
