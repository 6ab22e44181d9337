use proptest::prelude::*;
use serde_json::{json, Value};
use static_mock::stubbing::StubTable;
use static_mock::{Action, CallSignature, InvocationMatcher};

fn lookup() -> CallSignature {
    CallSignature::new("lookup", ["u32"])
}

fn served(action: Action) -> Option<Value> {
    match action {
        Action::Return(value) => Some(value),
        _ => None,
    }
}

proptest! {
    #[test]
    fn test_most_recent_stub_wins(values in prop::collection::vec(any::<i64>(), 1..20), key in any::<u32>()) {
        let mut table = StubTable::new();
        for value in &values {
            table.stub(InvocationMatcher::any_arguments(lookup()), Action::Return(json!(value)));
        }
        let (_, action) = table.match_and_apply(&lookup(), &[json!(key)]);
        prop_assert_eq!(served(action), values.last().map(|v| json!(v)));
    }

    #[test]
    fn test_consecutive_answers_then_repeat_last(values in prop::collection::vec(any::<i64>(), 1..10), extra in 0usize..5) {
        let mut table = StubTable::new();
        let rule = table.stub(InvocationMatcher::any_arguments(lookup()), Action::Return(json!(values[0])));
        for value in &values[1..] {
            prop_assert!(table.add_answer(rule, Action::Return(json!(value))));
        }

        let args = [json!(1)];
        for value in &values {
            prop_assert_eq!(served(table.match_and_apply(&lookup(), &args).1), Some(json!(value)));
        }
        let last = values.last().map(|v| json!(v));
        for _ in 0..extra {
            prop_assert_eq!(served(table.match_and_apply(&lookup(), &args).1), last.clone());
        }
    }

    #[test]
    fn test_exact_stub_only_matches_its_arguments(stubbed in any::<u32>(), other in any::<u32>()) {
        prop_assume!(stubbed != other);
        let mut table = StubTable::new();
        table.stub(InvocationMatcher::exact(lookup(), &[json!(stubbed)]), Action::Return(json!("hit")));

        let (rule, _) = table.match_and_apply(&lookup(), &[json!(stubbed)]);
        prop_assert!(rule.is_some());
        let (rule, action) = table.match_and_apply(&lookup(), &[json!(other)]);
        prop_assert!(rule.is_none());
        prop_assert!(matches!(action, Action::CallReal));
    }
}
