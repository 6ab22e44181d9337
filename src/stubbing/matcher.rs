use crate::identity::CallSignature;
use crate::runtime::to_argument;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Matches a single captured argument.
#[derive(Clone)]
pub enum ArgMatcher {
    /// Argument must equal the value
    Eq(Value),
    /// Any argument is accepted
    Any,
    /// Argument must satisfy the predicate
    Predicate {
        description: String,
        test: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
    },
}

impl ArgMatcher {
    pub fn eq<T: Serialize + ?Sized>(value: &T) -> Self {
        ArgMatcher::Eq(to_argument(value))
    }

    pub fn predicate<F>(description: &str, test: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        ArgMatcher::Predicate {
            description: description.to_string(),
            test: Arc::new(test),
        }
    }

    pub fn matches(&self, argument: &Value) -> bool {
        match self {
            ArgMatcher::Eq(expected) => expected == argument,
            ArgMatcher::Any => true,
            ArgMatcher::Predicate { test, .. } => test(argument),
        }
    }
}

impl fmt::Debug for ArgMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgMatcher::Eq(value) => f.debug_tuple("Eq").field(value).finish(),
            ArgMatcher::Any => f.write_str("Any"),
            ArgMatcher::Predicate { description, .. } => {
                f.debug_tuple("Predicate").field(description).finish()
            }
        }
    }
}

impl fmt::Display for ArgMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgMatcher::Eq(value) => write!(f, "{}", value),
            ArgMatcher::Any => f.write_str("<any>"),
            ArgMatcher::Predicate { description, .. } => write!(f, "<{}>", description),
        }
    }
}

/// Call pattern: a signature plus one matcher per argument.
#[derive(Clone, Debug)]
pub struct InvocationMatcher {
    signature: CallSignature,
    arguments: Vec<ArgMatcher>,
}

impl InvocationMatcher {
    pub fn new(signature: CallSignature, arguments: Vec<ArgMatcher>) -> Self {
        Self {
            signature,
            arguments,
        }
    }

    /// Matches exactly the given arguments.
    pub fn exact(signature: CallSignature, arguments: &[Value]) -> Self {
        let arguments = arguments.iter().cloned().map(ArgMatcher::Eq).collect();
        Self::new(signature, arguments)
    }

    /// Matches every call to `signature` regardless of arguments.
    pub fn any_arguments(signature: CallSignature) -> Self {
        let arguments = vec![ArgMatcher::Any; signature.arity()];
        Self::new(signature, arguments)
    }

    pub fn signature(&self) -> &CallSignature {
        &self.signature
    }

    pub fn matches(&self, signature: &CallSignature, arguments: &[Value]) -> bool {
        self.signature == *signature
            && self.arguments.len() == arguments.len()
            && self
                .arguments
                .iter()
                .zip(arguments)
                .all(|(matcher, argument)| matcher.matches(argument))
    }
}

impl fmt::Display for InvocationMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.arguments.iter().map(ToString::to_string).collect();
        write!(f, "{}({})", self.signature.method, args.join(", "))
    }
}
