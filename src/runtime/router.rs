use super::redirect::RouterCallback;
use crate::identity::{CallSignature, ClassId, ThreadIdentity};
use crate::logging;
use crate::registry::StaticMockRegistry;
use crate::stubbing::{Action, Thrown};
use serde_json::Value;
use std::sync::{Arc, Weak};

/// Decision for a redirected call.
#[derive(Debug)]
pub enum Routed {
    /// Return this stubbed value
    Value(Value),
    /// Raise this stubbed error
    Thrown(Thrown),
    /// Run the real implementation
    Real,
    /// The call names the target of `when`/`verify`; abort the closure
    Captured,
}

/// Unwinding payload that aborts a `when`/`verify` closure once its call
/// has been captured.
pub(crate) struct CaptureSignal;

/// Routes redirected calls of one type through its active binding.
#[derive(Clone)]
pub struct Router {
    registry: Weak<StaticMockRegistry>,
    class: ClassId,
}

impl Router {
    pub fn new(registry: Weak<StaticMockRegistry>, class: ClassId) -> Self {
        Self { registry, class }
    }

    pub fn into_callback(self) -> RouterCallback {
        Arc::new(move |signature: &CallSignature, arguments: &[Value]| {
            self.route(signature, arguments)
        })
    }

    /// Resolve the binding for the calling thread, apply the stub table and
    /// record the call before its effect is performed.
    pub fn route(&self, signature: &CallSignature, arguments: &[Value]) -> Routed {
        let Some(registry) = self.registry.upgrade() else {
            return Routed::Real;
        };
        let thread = ThreadIdentity::current();
        let Some(binding) = registry.lookup(&self.class, &thread) else {
            // Closed concurrently, or owned by another thread.
            logging::log_unrouted_call(&self.class, signature);
            return Routed::Real;
        };

        if binding.capture(&thread, signature, arguments) {
            return Routed::Captured;
        }

        let (rule, action) = binding.match_and_apply(signature, arguments);
        let outcome = action.outcome();
        let sequence = binding.record(signature, arguments, rule, outcome, &thread);
        logging::log_routed_call(&self.class, signature, sequence, outcome);

        match action {
            Action::Return(value) => Routed::Value(value),
            Action::Throw(thrown) => Routed::Thrown(thrown),
            Action::CallReal => Routed::Real,
            Action::Answer(answer) => Routed::Value(answer(arguments)),
        }
    }
}
