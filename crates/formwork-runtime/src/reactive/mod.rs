#![forbid(unsafe_code)]

//! Change propagation for a form instance.
//!
//! - [`EventBus`]: typed `value`/`change`/`submit`/`failure` channel, one per
//!   form instance.
//! - [`Tracked`]: shared, version-tracked cell with a synchronous getter.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//!
//! # Architecture
//!
//! Everything here is single-threaded (`Rc<RefCell<..>>`). Callbacks are
//! held weakly by the publisher and strongly by whoever registered them, so
//! a dropped field or array coordinator can never leave a dangling
//! subscription behind.

pub mod bus;
mod subscribers;
pub mod tracked;

pub use bus::{EventBus, EventKind, FormEvent, Listener};
pub use subscribers::Subscription;
pub use tracked::Tracked;
