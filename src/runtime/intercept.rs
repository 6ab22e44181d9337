use super::redirect::DispatchTable;
use super::router::{CaptureSignal, Routed};
use crate::identity::{CallSignature, ClassId};
use crate::MockError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::panic::resume_unwind;

/// Capture an argument for matching and recording.
///
/// Values that cannot be represented as JSON are recorded as a string
/// describing the failure, so recording never fails.
pub fn to_argument<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value)
        .unwrap_or_else(|e| Value::String(format!("<unserializable: {}>", e)))
}

/// Entry point for a mockable associated function of `T` returning `R`.
///
/// Runs `real` unless a static mock of `T` is active. A stubbed error is
/// re-raised unmodified as an unwinding payload.
pub fn intercept<T, R>(
    signature: CallSignature,
    arguments: Vec<Value>,
    real: impl FnOnce() -> R,
) -> R
where
    T: 'static,
    R: DeserializeOwned,
{
    DispatchTable::global().call(ClassId::of::<T>(), signature, arguments, real)
}

/// Entry point for a mockable associated function of `T` returning
/// `Result<R, E>`. A stubbed error of type `E` is returned as `Err`.
pub fn try_intercept<T, R, E>(
    signature: CallSignature,
    arguments: Vec<Value>,
    real: impl FnOnce() -> Result<R, E>,
) -> Result<R, E>
where
    T: 'static,
    R: DeserializeOwned,
    E: 'static,
{
    DispatchTable::global().try_call(ClassId::of::<T>(), signature, arguments, real)
}

pub(crate) fn complete<R, F>(
    routed: Routed,
    class: &ClassId,
    signature: &CallSignature,
    real: F,
) -> R
where
    R: DeserializeOwned,
    F: FnOnce() -> R,
{
    match routed {
        Routed::Value(value) => deserialize_stub(value, class, signature),
        Routed::Thrown(thrown) => resume_unwind(thrown.payload()),
        Routed::Real => real(),
        Routed::Captured => resume_unwind(Box::new(CaptureSignal)),
    }
}

pub(crate) fn try_complete<R, E, F>(
    routed: Routed,
    class: &ClassId,
    signature: &CallSignature,
    real: F,
) -> Result<R, E>
where
    R: DeserializeOwned,
    E: 'static,
    F: FnOnce() -> Result<R, E>,
{
    match routed {
        Routed::Value(value) => Ok(deserialize_stub(value, class, signature)),
        Routed::Thrown(thrown) => match thrown.payload().downcast::<E>() {
            Ok(error) => Err(*error),
            Err(payload) => resume_unwind(payload),
        },
        Routed::Real => real(),
        Routed::Captured => resume_unwind(Box::new(CaptureSignal)),
    }
}

fn deserialize_stub<R: DeserializeOwned>(
    value: Value,
    class: &ClassId,
    signature: &CallSignature,
) -> R {
    match serde_json::from_value(value) {
        Ok(result) => result,
        // Wrong stub type is a test-authoring error with no caller to report to.
        Err(e) => panic!(
            "{}",
            MockError::ReturnTypeMismatch {
                class: class.to_string(),
                method: signature.to_string(),
                reason: e.to_string(),
            }
        ),
    }
}

/// Route an associated function through its static mock.
///
/// ```ignore
/// fn exists(path: &str) -> bool {
///     static_call!(Files, exists(path: &str) => Path::new(path).exists())
/// }
/// ```
#[macro_export]
macro_rules! static_call {
    ($class:ty, $method:ident ( $($arg:ident : $ty:ty),* $(,)? ) => $real:expr) => {
        $crate::intercept::<$class, _>(
            $crate::CallSignature::from_static(stringify!($method), &[$(stringify!($ty)),*]),
            vec![$($crate::to_argument(&$arg)),*],
            || $real,
        )
    };
}

/// Like [`static_call!`] for functions returning `Result`.
#[macro_export]
macro_rules! try_static_call {
    ($class:ty, $method:ident ( $($arg:ident : $ty:ty),* $(,)? ) => $real:expr) => {
        $crate::try_intercept::<$class, _, _>(
            $crate::CallSignature::from_static(stringify!($method), &[$(stringify!($ty)),*]),
            vec![$($crate::to_argument(&$arg)),*],
            || $real,
        )
    };
}
