use super::action::{Action, Thrown};
use super::matcher::{ArgMatcher, InvocationMatcher};
use super::table::RuleId;
use crate::registry::Binding;
use crate::{MockError, Result};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Builder returned by `when`; each `then_*` call adds one answer.
///
/// The first answer registers a new stub rule, later answers are served
/// consecutively after it. For `Result`-returning functions `then_return`
/// supplies the `Ok` value and `then_throw` the `Err` value.
pub struct OngoingStubbing<'a> {
    binding: &'a Binding,
    matcher: InvocationMatcher,
    rule: Option<RuleId>,
}

impl<'a> OngoingStubbing<'a> {
    pub(crate) fn new(binding: &'a Binding, matcher: InvocationMatcher) -> Self {
        Self {
            binding,
            matcher,
            rule: None,
        }
    }

    /// Replace the captured arguments with explicit matchers.
    ///
    /// Only affects a rule not yet registered, so call it before the first
    /// `then_*`.
    pub fn with_arguments(mut self, arguments: Vec<ArgMatcher>) -> Self {
        self.matcher = InvocationMatcher::new(self.matcher.signature().clone(), arguments);
        self
    }

    /// Match the captured function whatever its arguments.
    pub fn with_any_arguments(mut self) -> Self {
        self.matcher = InvocationMatcher::any_arguments(self.matcher.signature().clone());
        self
    }

    pub fn then_return<V: Serialize>(self, value: V) -> Result<Self> {
        let value = serde_json::to_value(value).map_err(|e| MockError::InvalidStubValue {
            class: self.binding.class().to_string(),
            method: self.matcher.signature().method.clone(),
            reason: e.to_string(),
        })?;
        self.push(Action::Return(value))
    }

    pub fn then_throw<E>(self, error: E) -> Result<Self>
    where
        E: Clone + fmt::Debug + Send + Sync + 'static,
    {
        self.push(Action::Throw(Thrown::new(error)))
    }

    pub fn then_call_real_method(self) -> Result<Self> {
        self.push(Action::CallReal)
    }

    pub fn then_answer<F, V>(self, answer: F) -> Result<Self>
    where
        F: Fn(&[Value]) -> V + Send + Sync + 'static,
        V: Serialize + 'static,
    {
        let answer = move |args: &[Value]| crate::runtime::to_argument(&answer(args));
        self.push(Action::Answer(Arc::new(answer)))
    }

    /// The rule registered by the first answer, if any.
    pub fn rule(&self) -> Option<RuleId> {
        self.rule
    }

    fn push(mut self, action: Action) -> Result<Self> {
        if let Some(rule) = self.rule {
            if self.binding.add_answer(rule, action.clone())? {
                return Ok(self);
            }
        }
        // First answer, or the rule was dropped by a reset in between.
        self.rule = Some(self.binding.stub(self.matcher.clone(), action)?);
        Ok(self)
    }
}
