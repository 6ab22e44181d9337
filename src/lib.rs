//! Thread-confined mocking of a type's static surface.
//!
//! A [`MockedStatic`] handle binds an override to one type for the lifetime
//! of the handle. Associated functions that route through [`intercept`] (or
//! the [`static_call!`] macro) consult the process-wide
//! [`StaticMockRegistry`]: stubbed calls return the stubbed value, raise the
//! stubbed error or run an answer, everything else falls through to the
//! real implementation. Every routed call is recorded and can be verified
//! afterwards.
//!
//! ```no_run
//! use static_mock::{mock_static, static_call, times};
//!
//! struct Files;
//!
//! impl Files {
//!     fn exists(path: &str) -> bool {
//!         static_call!(Files, exists(path: &str) => std::path::Path::new(path).exists())
//!     }
//! }
//!
//! let mock = mock_static::<Files>().unwrap();
//! mock.when(|| Files::exists("/a")).unwrap().then_return(true).unwrap();
//!
//! assert!(Files::exists("/a"));
//! mock.verify_with(times(1), || Files::exists("/a")).unwrap();
//! mock.close().unwrap();
//! ```

pub mod config;
pub mod identity;
pub mod invocation;
pub mod logging;
pub mod mocked;
pub mod registry;
pub mod runtime;
pub mod stubbing;
pub mod verification;

use miette::Diagnostic;

pub use config::Config;
pub use identity::{CallSignature, ClassId, ThreadIdentity};
pub use invocation::{InvocationRecord, Outcome};
pub use mocked::{mock_static, mock_static_with, MockSettings, MockedStatic};
pub use registry::{Binding, StaticMockRegistry};
pub use runtime::{
    intercept, to_argument, try_intercept, DispatchTable, RedirectToken, Redirector, Routed,
    Router, RouterCallback,
};
pub use stubbing::{Action, ArgMatcher, InvocationMatcher, OngoingStubbing, RuleId, Thrown};
pub use verification::{
    at_least, at_least_once, at_most, never, only, times, CallList, VerificationMode,
};

/// Result type alias for static mocking operations
pub type Result<T, E = MockError> = std::result::Result<T, E>;

/// Error types for static mocking
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum MockError {
    #[error("{class} is already mocked on thread {owner}")]
    #[diagnostic(
        code(static_mock::already_mocked),
        help("Close the existing MockedStatic for this type before opening another one. Only one static mock per type may be active in the process.")
    )]
    AlreadyMocked { class: String, owner: String },

    #[error("static mock of {class} is owned by thread {owner} and cannot be used from thread {current}")]
    #[diagnostic(
        code(static_mock::wrong_thread),
        help("Stub, verify, reset and close a static mock on the thread that created it.")
    )]
    WrongThread {
        class: String,
        owner: String,
        current: String,
    },

    #[error("static mock of {class} is already closed")]
    #[diagnostic(
        code(static_mock::already_closed),
        help("Use close_on_demand() in teardown paths that may release the mock twice.")
    )]
    AlreadyClosed { class: String },

    #[error("cannot {operation} static mock of {class}: the mock is closed")]
    #[diagnostic(
        code(static_mock::illegal_state),
        help("Open a new static mock with mock_static() to stub or verify this type again.")
    )]
    IllegalState { class: String, operation: String },

    #[error("{class}.{wanted}: wanted {expected} but was invoked {actual} time(s){calls}")]
    #[diagnostic(
        code(static_mock::verification),
        help("The recorded calls on this static mock are listed above.")
    )]
    Verification {
        class: String,
        wanted: String,
        expected: VerificationMode,
        actual: usize,
        calls: CallList,
    },

    #[error("no more interactions wanted on {class}, but found unverified call(s){unverified}")]
    #[diagnostic(
        code(static_mock::no_more_interactions),
        help("Verify each remaining call, or clear_invocations() before the part of the test under scrutiny.")
    )]
    NoMoreInteractionsWanted {
        class: String,
        unverified: CallList,
    },

    #[error("no interactions wanted on {class}, but found call(s){calls}")]
    #[diagnostic(code(static_mock::no_interactions))]
    NoInteractionsWanted { class: String, calls: CallList },

    #[error("the {purpose} closure did not call any static function of {class}")]
    #[diagnostic(
        code(static_mock::missing_invocation),
        help("The closure passed to when() or verify() must call exactly one mocked associated function, e.g. `|| Files::exists(\"/a\")`.")
    )]
    MissingInvocation { class: String, purpose: String },

    #[error("stub value for {class}.{method} could not be serialized: {reason}")]
    #[diagnostic(code(static_mock::invalid_stub_value))]
    InvalidStubValue {
        class: String,
        method: String,
        reason: String,
    },

    #[error("stubbed value for {class}::{method} does not fit its return type: {reason}")]
    #[diagnostic(
        code(static_mock::return_type_mismatch),
        help("Pass then_return() a value of the function's return type (the Ok type for functions returning Result).")
    )]
    ReturnTypeMismatch {
        class: String,
        method: String,
        reason: String,
    },

    #[error("redirect for {class} failed: {reason}")]
    #[diagnostic(code(static_mock::redirect))]
    Redirect { class: String, reason: String },

    #[error("configuration error: {0}")]
    #[diagnostic(
        code(static_mock::config),
        help("Check that the static mock configuration file is valid TOML.")
    )]
    Config(String),
}

impl MockError {
    /// Returns true for assertion failures raised by the verification engine.
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            MockError::Verification { .. }
                | MockError::NoMoreInteractionsWanted { .. }
                | MockError::NoInteractionsWanted { .. }
        )
    }
}
