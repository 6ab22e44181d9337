use super::action::Action;
use super::matcher::InvocationMatcher;
use crate::identity::CallSignature;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct RuleId(u64);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stub#{}", self.0)
    }
}

/// A call pattern and the answers it serves, in order.
///
/// Each match consumes the next answer; the last answer repeats.
#[derive(Debug)]
pub struct StubRule {
    id: RuleId,
    matcher: Arc<InvocationMatcher>,
    answers: Vec<Action>,
    served: usize,
}

impl StubRule {
    fn new(id: RuleId, matcher: InvocationMatcher, action: Action) -> Self {
        Self {
            id,
            matcher: Arc::new(matcher),
            answers: vec![action],
            served: 0,
        }
    }

    pub fn id(&self) -> RuleId {
        self.id
    }

    pub fn matcher(&self) -> &InvocationMatcher {
        &self.matcher
    }

    fn next_action(&mut self) -> Action {
        let index = self.served.min(self.answers.len().saturating_sub(1));
        self.served = self.served.saturating_add(1);
        self.answers
            .get(index)
            .cloned()
            .unwrap_or(Action::CallReal)
    }
}

/// Stub rules evaluated most-recently-added first.
#[derive(Debug, Default)]
pub struct StubTable {
    rules: Vec<StubRule>,
    next_id: u64,
}

impl StubTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule that takes precedence over every existing rule.
    pub fn stub(&mut self, matcher: InvocationMatcher, action: Action) -> RuleId {
        let id = RuleId(self.next_id);
        self.next_id += 1;
        self.rules.push(StubRule::new(id, matcher, action));
        id
    }

    /// Append a consecutive answer to an existing rule.
    ///
    /// Returns false when the rule no longer exists.
    pub fn add_answer(&mut self, id: RuleId, action: Action) -> bool {
        match self.rules.iter_mut().find(|rule| rule.id == id) {
            Some(rule) => {
                rule.answers.push(action);
                true
            }
            None => false,
        }
    }

    /// Matchers of every rule, in evaluation order.
    ///
    /// Lets a caller run argument predicates without holding the table.
    pub fn candidates(&self) -> Vec<(RuleId, Arc<InvocationMatcher>)> {
        self.rules
            .iter()
            .rev()
            .map(|rule| (rule.id, Arc::clone(&rule.matcher)))
            .collect()
    }

    /// Serve the next answer of rule `id`; `None` if the rule is gone.
    pub fn apply(&mut self, id: RuleId) -> Option<Action> {
        self.rules
            .iter_mut()
            .find(|rule| rule.id == id)
            .map(StubRule::next_action)
    }

    pub fn match_and_apply(
        &mut self,
        signature: &CallSignature,
        arguments: &[Value],
    ) -> (Option<RuleId>, Action) {
        let matched = self
            .rules
            .iter()
            .rev()
            .find(|rule| rule.matcher.matches(signature, arguments))
            .map(StubRule::id);
        match matched.and_then(|id| self.apply(id).map(|action| (id, action))) {
            Some((id, action)) => (Some(id), action),
            None => (None, Action::CallReal),
        }
    }

    /// Drop every rule. Rule ids are never reused.
    pub fn clear(&mut self) {
        self.rules.clear();
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stubbing::matcher::ArgMatcher;
    use serde_json::json;

    fn exists() -> CallSignature {
        CallSignature::new("exists", ["&str"])
    }

    fn returned(action: Action) -> Value {
        match action {
            Action::Return(value) => value,
            other => panic!("expected Return, got {:?}", other),
        }
    }

    #[test]
    fn test_unmatched_delegates_to_real() {
        let mut table = StubTable::new();
        let (rule, action) = table.match_and_apply(&exists(), &[json!("/a")]);
        assert!(rule.is_none());
        assert!(matches!(action, Action::CallReal));
    }

    #[test]
    fn test_latest_rule_wins() {
        let mut table = StubTable::new();
        table.stub(
            InvocationMatcher::any_arguments(exists()),
            Action::Return(json!(false)),
        );
        let specific = table.stub(
            InvocationMatcher::new(exists(), vec![ArgMatcher::eq("/a")]),
            Action::Return(json!(true)),
        );

        let (rule, action) = table.match_and_apply(&exists(), &[json!("/a")]);
        assert_eq!(rule, Some(specific));
        assert_eq!(returned(action), json!(true));

        let (_, action) = table.match_and_apply(&exists(), &[json!("/b")]);
        assert_eq!(returned(action), json!(false));
    }

    #[test]
    fn test_consecutive_answers_repeat_last() {
        let mut table = StubTable::new();
        let id = table.stub(
            InvocationMatcher::any_arguments(exists()),
            Action::Return(json!(1)),
        );
        assert!(table.add_answer(id, Action::Return(json!(2))));

        let args = [json!("/a")];
        let served: Vec<Value> = (0..4)
            .map(|_| returned(table.match_and_apply(&exists(), &args).1))
            .collect();
        assert_eq!(served, vec![json!(1), json!(2), json!(2), json!(2)]);
    }

    #[test]
    fn test_clear_keeps_ids_unique() {
        let mut table = StubTable::new();
        let first = table.stub(InvocationMatcher::any_arguments(exists()), Action::CallReal);
        table.clear();
        assert!(table.is_empty());
        assert!(!table.add_answer(first, Action::CallReal));

        let second = table.stub(InvocationMatcher::any_arguments(exists()), Action::CallReal);
        assert_ne!(first, second);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_candidates_then_apply() {
        let mut table = StubTable::new();
        let older = table.stub(InvocationMatcher::any_arguments(exists()), Action::CallReal);
        let newer = table.stub(
            InvocationMatcher::exact(exists(), &[json!("/a")]),
            Action::Return(json!(true)),
        );

        let order: Vec<RuleId> = table.candidates().iter().map(|(id, _)| *id).collect();
        assert_eq!(order, vec![newer, older]);
        assert_eq!(table.apply(newer).map(returned), Some(json!(true)));

        table.clear();
        assert!(table.apply(newer).is_none());
    }
}
