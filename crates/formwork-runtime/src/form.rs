#![forbid(unsafe_code)]

//! Integration layer: caller hooks, submit/key gestures, render snapshot.
//!
//! A [`Form`] owns a [`FormController`] plus the bus subscriptions that
//! forward events to caller-supplied [`FormHooks`]. Hooks can be swapped at
//! any time with [`Form::set_hooks`]; the previous subscriptions are dropped
//! before the new ones are installed, so a hook never fires twice for one
//! event. Dropping the `Form` drops every subscription it holds.

use std::rc::Rc;

use formwork_core::{ErrorMap, FormError, FormState, Value};
use tracing::{debug, trace};

use crate::controller::{FormConfig, FormController, SubmitGesture, SubmitOutcome};
use crate::reactive::{EventKind, FormEvent, Subscription, Tracked};

pub type ChangeHook = Rc<dyn Fn(&FormState)>;
pub type SubmitHook = Rc<dyn Fn(&Value, &FormController)>;
pub type ValueChangeHook = Rc<dyn Fn(&Value)>;
pub type FailureHook = Rc<dyn Fn(&ErrorMap)>;

/// Key that submits a form from inside a text input.
pub const ENTER_KEY: &str = "Enter";

/// Callbacks run by the integration layer on bus events.
#[derive(Clone, Default)]
pub struct FormHooks {
    /// Every `change`, with the current state.
    pub on_change: Option<ChangeHook>,
    /// Successful submit, with the submitted values.
    pub on_submit: Option<SubmitHook>,
    /// Every `value` write, with the whole values tree.
    pub on_value_change: Option<ValueChangeHook>,
    /// Blocked submit, with the errors map.
    pub on_submit_failure: Option<FailureHook>,
}

impl std::fmt::Debug for FormHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormHooks")
            .field("on_change", &self.on_change.is_some())
            .field("on_submit", &self.on_submit.is_some())
            .field("on_value_change", &self.on_value_change.is_some())
            .field("on_submit_failure", &self.on_submit_failure.is_some())
            .finish()
    }
}

impl FormHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_change(mut self, hook: impl Fn(&FormState) + 'static) -> Self {
        self.on_change = Some(Rc::new(hook));
        self
    }

    #[must_use]
    pub fn on_submit(mut self, hook: impl Fn(&Value, &FormController) + 'static) -> Self {
        self.on_submit = Some(Rc::new(hook));
        self
    }

    #[must_use]
    pub fn on_value_change(mut self, hook: impl Fn(&Value) + 'static) -> Self {
        self.on_value_change = Some(Rc::new(hook));
        self
    }

    #[must_use]
    pub fn on_submit_failure(mut self, hook: impl Fn(&ErrorMap) + 'static) -> Self {
        self.on_submit_failure = Some(Rc::new(hook));
        self
    }

    /// Subscribe each present hook to its event.
    fn install(&self, controller: &FormController) -> Vec<Subscription> {
        let mut subs = Vec::new();

        if let Some(hook) = self.on_change.clone() {
            let form = controller.clone();
            subs.push(controller.subscribe(EventKind::Change, move |_| {
                hook(&form.get_state());
            }));
        }
        if let Some(hook) = self.on_submit.clone() {
            let form = controller.clone();
            subs.push(controller.subscribe(EventKind::Submit, move |event| {
                if let FormEvent::Submit(values) = event {
                    hook(values, &form);
                }
            }));
        }
        if let Some(hook) = self.on_value_change.clone() {
            let form = controller.clone();
            subs.push(controller.subscribe(EventKind::Value, move |_| {
                hook(form.get_state().values());
            }));
        }
        if let Some(hook) = self.on_submit_failure.clone() {
            subs.push(controller.subscribe(EventKind::Failure, move |event| {
                if let FormEvent::Failure(errors) = event {
                    hook(errors);
                }
            }));
        }
        subs
    }
}

/// A mounted form: controller, hooks and the render snapshot.
pub struct Form {
    controller: FormController,
    hooks: FormHooks,
    hook_subscriptions: Vec<Subscription>,
    snapshot: Tracked<FormState>,
    _render: Subscription,
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Form")
            .field("controller", &self.controller)
            .field("hooks", &self.hooks)
            .field("render_version", &self.snapshot.version())
            .finish_non_exhaustive()
    }
}

impl Form {
    /// Create a form instance and install `hooks`.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::Config`] if the configured initial values are
    /// not an object.
    pub fn new(config: FormConfig, hooks: FormHooks) -> Result<Self, FormError> {
        Ok(Self::with_controller(FormController::new(config)?, hooks))
    }

    /// Wrap an existing controller.
    #[must_use]
    pub fn with_controller(controller: FormController, hooks: FormHooks) -> Self {
        let snapshot = Tracked::new(controller.get_state());
        let render = {
            let snapshot = snapshot.clone();
            let form = controller.clone();
            controller.subscribe(EventKind::Change, move |_| snapshot.set(form.get_state()))
        };
        let hook_subscriptions = hooks.install(&controller);
        debug!(?hooks, "form mounted");
        Self {
            controller,
            hooks,
            hook_subscriptions,
            snapshot,
            _render: render,
        }
    }

    /// The controller handle callers drive the form through.
    #[must_use]
    pub fn form_api(&self) -> FormController {
        self.controller.clone()
    }

    #[must_use]
    pub fn controller(&self) -> &FormController {
        &self.controller
    }

    /// Current controller state.
    #[must_use]
    pub fn state(&self) -> FormState {
        self.controller.get_state()
    }

    /// State as of the last `change`; subscribe to it to schedule renders.
    #[must_use]
    pub fn render_state(&self) -> Tracked<FormState> {
        self.snapshot.clone()
    }

    #[must_use]
    pub fn hooks(&self) -> &FormHooks {
        &self.hooks
    }

    /// Replace every hook.
    pub fn set_hooks(&mut self, hooks: FormHooks) {
        self.hook_subscriptions.clear();
        self.hook_subscriptions = hooks.install(&self.controller);
        self.hooks = hooks;
        trace!(hooks = ?self.hooks, "hooks replaced");
    }

    /// A submit gesture (button click, form submit).
    pub fn handle_submit(&self, gesture: &mut dyn SubmitGesture) -> SubmitOutcome {
        self.controller.submit_form(Some(gesture))
    }

    /// A key press inside the form. Suppresses Enter when `prevent_enter`
    /// is configured; returns whether the key was suppressed.
    pub fn handle_key_down(&self, key: &str, gesture: &mut dyn SubmitGesture) -> bool {
        if self.controller.options().prevent_enter && key == ENTER_KEY {
            trace!("enter suppressed");
            gesture.prevent_default();
            return true;
        }
        false
    }
}
