#![forbid(unsafe_code)]

//! Integration tests for the form integration layer: caller hooks and
//! gesture handling.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use formwork_core::{ErrorMap, FormOptions, Path, Value, json};
use formwork_runtime::{FieldOptions, Form, FormConfig, FormHooks, SubmitOutcome};
use pretty_assertions::assert_eq;

#[derive(Default)]
struct Calls {
    changes: Cell<u32>,
    submits: RefCell<Vec<Value>>,
    values: RefCell<Vec<Value>>,
    failures: RefCell<Vec<ErrorMap>>,
}

fn hooks(calls: &Rc<Calls>) -> FormHooks {
    let (a, b, c, d) = (
        Rc::clone(calls),
        Rc::clone(calls),
        Rc::clone(calls),
        Rc::clone(calls),
    );
    FormHooks::new()
        .on_change(move |_| a.changes.set(a.changes.get() + 1))
        .on_submit(move |values, form| {
            assert_eq!(form.get_state().values(), values);
            b.submits.borrow_mut().push(values.clone());
        })
        .on_value_change(move |values| c.values.borrow_mut().push(values.clone()))
        .on_submit_failure(move |errors| d.failures.borrow_mut().push(errors.clone()))
}

#[test]
fn hooks_fire_on_their_events() {
    let calls = Rc::new(Calls::default());
    let form = Form::new(FormConfig::new(), hooks(&calls)).unwrap();
    let api = form.form_api();

    api.set_value("greeting", "hello");
    assert_eq!(*calls.values.borrow(), vec![json!({"greeting": "hello"})]);
    assert!(calls.changes.get() >= 1);

    let mut prevented = 0;
    let mut gesture = || prevented += 1;
    let outcome = form.handle_submit(&mut gesture);
    assert_eq!(outcome, SubmitOutcome::Submitted(json!({"greeting": "hello"})));
    assert_eq!(prevented, 1);
    assert_eq!(*calls.submits.borrow(), vec![json!({"greeting": "hello"})]);
    assert!(calls.failures.borrow().is_empty());
}

#[test]
fn failure_hook_gets_errors_and_submit_hook_does_not_run() {
    let calls = Rc::new(Calls::default());
    let form = Form::new(FormConfig::new(), hooks(&calls)).unwrap();
    let greeting = form.form_api().root().register_field(FieldOptions::new("greeting").validate(
        |value, _| (value == Some(&json!("hello!"))).then(|| "calm down".to_string()),
    ));
    greeting.set_value("hello!");

    let mut gesture = || {};
    form.handle_submit(&mut gesture);

    let mut expected = ErrorMap::new();
    expected.insert(Path::parse("greeting"), "calm down".to_string());
    assert!(calls.submits.borrow().is_empty());
    assert_eq!(*calls.failures.borrow(), vec![expected]);
}

#[test]
fn every_submit_gesture_prevents_default_once() {
    let form = Form::new(FormConfig::new(), FormHooks::new()).unwrap();
    let mut prevented = 0;
    for _ in 0..3 {
        let mut gesture = || prevented += 1;
        form.handle_submit(&mut gesture);
    }
    assert_eq!(prevented, 3);
}

#[test]
fn dont_prevent_default_never_prevents() {
    let options = FormOptions::new().with_dont_prevent_default(true);
    let form = Form::new(FormConfig::new().with_options(options), FormHooks::new()).unwrap();
    let mut prevented = 0;
    let mut gesture = || prevented += 1;
    form.handle_submit(&mut gesture);
    form.handle_submit(&mut gesture);
    assert_eq!(prevented, 0);
}

#[test]
fn dropping_form_unsubscribes_hooks() {
    let calls = Rc::new(Calls::default());
    let form = Form::new(FormConfig::new(), hooks(&calls)).unwrap();
    let api = form.form_api();
    drop(form);

    api.set_value("a", 1);
    assert_eq!(calls.changes.get(), 0);
    assert!(calls.values.borrow().is_empty());
}

#[test]
fn render_state_tracks_reset() {
    let config = FormConfig::new().with_initial_values(json!({"name": "Ada"}));
    let form = Form::new(config, FormHooks::new()).unwrap();
    let render = form.render_state();

    form.form_api().set_value("name", "Grace");
    assert!(render.get().is_dirty());
    form.form_api().reset();
    assert!(render.get().is_pristine());
    assert_eq!(render.get(), form.state());
}
