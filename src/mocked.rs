use crate::identity::{ClassId, ThreadIdentity};
use crate::invocation::InvocationRecord;
use crate::logging;
use crate::registry::{Binding, StaticMockRegistry};
use crate::stubbing::{InvocationMatcher, OngoingStubbing};
use crate::verification::{times, VerificationMode};
use crate::Result;
use std::marker::PhantomData;
use std::sync::Arc;

pub use crate::registry::MockSettings;

/// Mock the static surface of `T` on the current thread.
pub fn mock_static<T: 'static>() -> Result<MockedStatic<T>> {
    MockedStatic::open_in(StaticMockRegistry::global(), MockSettings::default())
}

pub fn mock_static_with<T: 'static>(settings: MockSettings) -> Result<MockedStatic<T>> {
    MockedStatic::open_in(StaticMockRegistry::global(), settings)
}

/// An active mock of `T`'s associated functions.
///
/// The mock only accepts stubbing, verification and release from the thread
/// that created it, and the handle cannot be sent to another thread. It is
/// released when [`close`](Self::close) is called or the handle is dropped,
/// whichever comes first.
pub struct MockedStatic<T: 'static> {
    binding: Arc<Binding>,
    registry: Arc<StaticMockRegistry>,
    _marker: PhantomData<(fn() -> T, *const ())>,
}

impl<T: 'static> MockedStatic<T> {
    /// Open a mock of `T` in a specific registry.
    pub fn open_in(registry: &Arc<StaticMockRegistry>, settings: MockSettings) -> Result<Self> {
        let binding = registry.open(ClassId::of::<T>(), ThreadIdentity::current(), &settings)?;
        Ok(Self {
            binding,
            registry: Arc::clone(registry),
            _marker: PhantomData,
        })
    }

    /// Stub the call made by `call`, e.g. `mock.when(|| Files::exists("/a"))`.
    ///
    /// The closure is cut short at its first call on `T`, and that call is
    /// the one stubbed. Later calls in the closure never run, so a closure
    /// making several calls is not reported. In `|| T::f(T::g())` the
    /// argument call `T::g()` is the one taken.
    pub fn when<F, R>(&self, call: F) -> Result<OngoingStubbing<'_>>
    where
        F: FnOnce() -> R,
    {
        self.binding.when(call)
    }

    pub fn when_matching(&self, matcher: InvocationMatcher) -> Result<OngoingStubbing<'_>> {
        self.binding.when_matching(matcher)
    }

    /// Verify the call made by `call` happened exactly once.
    ///
    /// As with [`when`](Self::when), only the first call on `T` made by the
    /// closure is captured.
    pub fn verify<F, R>(&self, call: F) -> Result<()>
    where
        F: FnOnce() -> R,
    {
        self.verify_with(times(1), call)
    }

    pub fn verify_with<F, R>(&self, mode: VerificationMode, call: F) -> Result<()>
    where
        F: FnOnce() -> R,
    {
        self.binding.verify(mode, call)
    }

    pub fn verify_matching(
        &self,
        mode: VerificationMode,
        matcher: &InvocationMatcher,
    ) -> Result<()> {
        self.binding.verify_matching(mode, matcher)
    }

    pub fn reset(&self) -> Result<()> {
        self.binding.reset()
    }

    pub fn clear_invocations(&self) -> Result<()> {
        self.binding.clear_invocations()
    }

    pub fn verify_no_more_interactions(&self) -> Result<()> {
        self.binding.verify_no_more_interactions()
    }

    pub fn verify_no_interactions(&self) -> Result<()> {
        self.binding.verify_no_interactions()
    }

    pub fn invocations(&self) -> Vec<InvocationRecord> {
        self.binding.invocations()
    }

    pub fn is_closed(&self) -> bool {
        self.binding.is_closed()
    }

    /// Release the mock; fails if it was already released.
    pub fn close(&self) -> Result<()> {
        self.registry.close(&self.binding, &ThreadIdentity::current())
    }

    /// Release the mock if it is still active.
    pub fn close_on_demand(&self) -> Result<()> {
        self.registry
            .close_on_demand(&self.binding, &ThreadIdentity::current())
    }

    pub fn binding(&self) -> &Arc<Binding> {
        &self.binding
    }
}

impl<T: 'static> Drop for MockedStatic<T> {
    fn drop(&mut self) {
        if let Err(e) = self.close_on_demand() {
            logging::log_release_failed(self.binding.class(), &e);
        }
    }
}
