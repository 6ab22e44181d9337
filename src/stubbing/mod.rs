pub mod action;
pub mod matcher;
pub mod ongoing;
pub mod table;

pub use action::{Action, AnswerFn, Thrown};
pub use matcher::{ArgMatcher, InvocationMatcher};
pub use ongoing::OngoingStubbing;
pub use table::{RuleId, StubRule, StubTable};
