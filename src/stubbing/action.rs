use crate::invocation::Outcome;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Computes a stubbed return value from the call's arguments.
pub type AnswerFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// A stubbed error, re-raised unmodified on every matching call.
#[derive(Clone)]
pub struct Thrown {
    description: String,
    raise: Arc<dyn Fn() -> Box<dyn Any + Send> + Send + Sync>,
}

impl Thrown {
    pub fn new<E>(error: E) -> Self
    where
        E: Clone + fmt::Debug + Send + Sync + 'static,
    {
        Self {
            description: format!("{:?}", error),
            raise: Arc::new(move || -> Box<dyn Any + Send> { Box::new(error.clone()) }),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// A fresh copy of the stubbed error, boxed as an unwinding payload.
    pub fn payload(&self) -> Box<dyn Any + Send> {
        (self.raise)()
    }
}

impl fmt::Debug for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Thrown").field(&self.description).finish()
    }
}

/// What a matched call does.
#[derive(Clone)]
pub enum Action {
    Return(Value),
    Throw(Thrown),
    CallReal,
    Answer(AnswerFn),
}

impl Action {
    pub fn outcome(&self) -> Outcome {
        match self {
            Action::Return(_) => Outcome::Returned,
            Action::Throw(_) => Outcome::Threw,
            Action::CallReal => Outcome::CalledReal,
            Action::Answer(_) => Outcome::Answered,
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Return(value) => f.debug_tuple("Return").field(value).finish(),
            Action::Throw(thrown) => f.debug_tuple("Throw").field(thrown).finish(),
            Action::CallReal => f.write_str("CallReal"),
            Action::Answer(_) => f.write_str("Answer(..)"),
        }
    }
}
