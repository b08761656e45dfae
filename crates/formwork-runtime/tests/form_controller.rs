#![forbid(unsafe_code)]

//! Integration tests for the form state controller.
//!
//! Covers:
//! - Fresh state shape and reset back to the creation snapshot
//! - Field and form-level validation on submit, `validate_fields`
//! - `set_state` / `set_values` / `set_error` semantics
//! - `value` before `change` ordering and idempotent listener registration
//! - `pre_submit` transformation of submitted values

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use formwork_core::{ErrorMap, FormOptions, FormStatePatch, Path, Value, json};
use formwork_runtime::{
    EventKind, FieldOptions, FormConfig, FormController, FormEvent, Listener, SubmitOutcome,
};
use pretty_assertions::assert_eq;
use tracing::Level;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(Level::DEBUG)
        .try_init();
}

fn empty_state() -> Value {
    json!({"values": {}, "touched": {}, "errors": {}, "pristine": true, "dirty": false})
}

fn state_json(form: &FormController) -> Value {
    serde_json::to_value(form.get_state()).unwrap()
}

/// Records submit payloads and failure maps.
#[derive(Default)]
struct Outcomes {
    submits: RefCell<Vec<Value>>,
    failures: RefCell<Vec<ErrorMap>>,
}

fn record(form: &FormController) -> (Rc<Outcomes>, Vec<formwork_runtime::Subscription>) {
    let outcomes = Rc::new(Outcomes::default());
    let s = Rc::clone(&outcomes);
    let f = Rc::clone(&outcomes);
    let subs = vec![
        form.subscribe(EventKind::Submit, move |event| {
            if let FormEvent::Submit(values) = event {
                s.submits.borrow_mut().push(values.clone());
            }
        }),
        form.subscribe(EventKind::Failure, move |event| {
            if let FormEvent::Failure(errors) = event {
                f.failures.borrow_mut().push(errors.clone());
            }
        }),
    ];
    (outcomes, subs)
}

#[test]
fn greeting_edit_then_reset() {
    init_tracing();
    let form = FormController::default();
    assert_eq!(state_json(&form), empty_state());

    let greeting = form.root().register_field(FieldOptions::new("greeting"));
    greeting.set_value("hello");

    let state = form.get_state();
    assert_eq!(state.values(), &json!({"greeting": "hello"}));
    assert!(!state.is_pristine());
    assert!(state.is_dirty());

    form.reset();
    assert_eq!(state_json(&form), empty_state());
}

#[test]
fn reset_restores_initial_snapshot() {
    let config = FormConfig::new().with_initial_values(json!({"name": "Ada", "tags": ["x"]}));
    let form = FormController::new(config).unwrap();
    let before = form.get_state();

    form.set_value("name", "Grace");
    form.set_value("tags[1]", "y");
    form.set_error("name", Some("bad".into()));
    form.set_touched("other", true);
    form.reset();

    assert_eq!(form.get_state(), before);
    assert!(form.get_state().is_pristine());
}

#[test]
fn field_validator_blocks_submit() {
    let form = FormController::default();
    let (outcomes, _subs) = record(&form);
    let greeting = form.root().register_field(FieldOptions::new("greeting").validate(
        |value, _| (value == Some(&json!("hello!"))).then(|| "no shouting".to_string()),
    ));

    greeting.set_value("hello!");
    let outcome = form.submit_form(None);

    let mut expected = ErrorMap::new();
    expected.insert(Path::parse("greeting"), "no shouting".to_string());
    assert_eq!(outcome, SubmitOutcome::Failed(expected.clone()));
    assert!(outcomes.submits.borrow().is_empty());
    assert_eq!(*outcomes.failures.borrow(), vec![expected]);
}

#[test]
fn form_level_validator_report_is_the_failure_payload() {
    let config = FormConfig::new().with_validate(|values| {
        let mut report = BTreeMap::new();
        let minor = values.get("age").and_then(Value::as_i64).is_some_and(|age| age < 18);
        report.insert(Path::parse("age"), minor.then(|| "too young".to_string()));
        report.insert(Path::parse("name"), None);
        report
    });
    let form = FormController::new(config).unwrap();
    let (outcomes, _subs) = record(&form);

    form.set_value("age", 12);
    form.set_error("name", Some("stale".into()));
    form.submit_form(None);

    let mut expected = ErrorMap::new();
    expected.insert(Path::parse("age"), "too young".to_string());
    assert!(outcomes.submits.borrow().is_empty());
    assert_eq!(*outcomes.failures.borrow(), vec![expected]);

    form.set_value("age", 30);
    form.submit_form(None);
    assert_eq!(*outcomes.submits.borrow(), vec![json!({"age": 30})]);
}

#[test]
fn validate_fields_restricts_submit_validation() {
    let options = FormOptions::new().with_validate_fields(["name"]);
    let form = FormController::new(FormConfig::new().with_options(options)).unwrap();
    let always = |_: Option<&Value>, _: &Value| Some("invalid".to_string());
    let _name = form
        .root()
        .register_field(FieldOptions::new("name").validate(always).validate_on_blur(true));
    let _other = form
        .root()
        .register_field(FieldOptions::new("other").validate(always).validate_on_blur(true));

    let SubmitOutcome::Failed(errors) = form.submit_form(None) else {
        panic!("expected failure");
    };
    assert_eq!(errors.keys().map(ToString::to_string).collect::<Vec<_>>(), vec!["name"]);
}

#[test]
fn pre_submit_transforms_submitted_values() {
    let config = FormConfig::new().with_pre_submit(|mut values| {
        values["stamped"] = json!(true);
        values
    });
    let form = FormController::new(config).unwrap();
    let (outcomes, _subs) = record(&form);
    form.set_value("name", "Ada");

    let outcome = form.submit_form(None);
    let expected = json!({"name": "Ada", "stamped": true});
    assert_eq!(outcome, SubmitOutcome::Submitted(expected.clone()));
    assert_eq!(*outcomes.submits.borrow(), vec![expected]);
    // Stored values are unchanged.
    assert_eq!(form.get_value("stamped"), None);
}

#[test]
fn value_is_emitted_before_change() {
    let form = FormController::default();
    let log = Rc::new(RefCell::new(Vec::new()));
    let l1 = Rc::clone(&log);
    let l2 = Rc::clone(&log);
    let _change = form.subscribe(EventKind::Change, move |_| l1.borrow_mut().push("change".to_string()));
    let _value = form.subscribe(EventKind::Value, move |event| {
        if let FormEvent::Value(path) = event {
            l2.borrow_mut().push(format!("value:{path}"));
        }
    });

    form.set_value("a.b[1]", 5);
    assert_eq!(*log.borrow(), vec!["value:a.b[1]".to_string(), "change".to_string()]);
}

#[test]
fn value_listener_sees_updated_state() {
    let form = FormController::default();
    let seen = Rc::new(RefCell::new(None));
    let s = Rc::clone(&seen);
    let reader = form.clone();
    let _value = form.subscribe(EventKind::Value, move |_| {
        *s.borrow_mut() = reader.get_value("x");
    });
    form.set_value("x", "now");
    assert_eq!(*seen.borrow(), Some(json!("now")));
}

#[test]
fn on_is_idempotent_and_remove_listener_detaches() {
    let form = FormController::default();
    let count = Rc::new(Cell::new(0));
    let c = Rc::clone(&count);
    let listener: Listener = Rc::new(move |_: &FormEvent| c.set(c.get() + 1));

    assert!(form.on(EventKind::Change, &listener));
    assert!(!form.on(EventKind::Change, &listener));
    form.set_touched("a", true);
    assert_eq!(count.get(), 1);

    assert!(form.remove_listener(EventKind::Change, &listener));
    form.set_touched("a", false);
    assert_eq!(count.get(), 1);
}

#[test]
fn set_state_replaces_parts_and_recomputes_flags() {
    let config = FormConfig::new().with_initial_values(json!({"a": 1}));
    let form = FormController::new(config).unwrap();

    let mut errors = ErrorMap::new();
    errors.insert(Path::parse("a"), "nope".to_string());
    form.set_state(FormStatePatch::new().with_values(json!({"a": 2})).with_errors(errors));

    let state = form.get_state();
    assert_eq!(state.values(), &json!({"a": 2}));
    assert!(state.is_dirty());
    assert_eq!(form.get_error("a").as_deref(), Some("nope"));
    assert!(state.touched().is_empty());

    form.set_values(json!({"a": 1}));
    assert!(form.get_state().is_pristine());
    assert_eq!(form.get_error("a").as_deref(), Some("nope"));
}

#[test]
fn set_error_none_clears() {
    let form = FormController::default();
    form.set_error("a", Some("x".into()));
    form.set_error("a", None);
    assert_eq!(form.get_error("a"), None);
    assert!(!form.get_state().has_errors());
}

#[test]
fn validator_sees_whole_values() {
    let form = FormController::default();
    let _confirm = form.root().register_field(FieldOptions::new("confirm").validate(
        |value, values| (value != values.get("password")).then(|| "mismatch".to_string()),
    ));
    form.set_value("password", "s3cret");
    form.set_value("confirm", "s3cret");
    assert_eq!(form.get_error("confirm"), None);
    form.set_value("confirm", "other");
    assert_eq!(form.get_error("confirm").as_deref(), Some("mismatch"));
}
