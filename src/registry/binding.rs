use crate::identity::{CallSignature, ClassId, ThreadIdentity};
use crate::invocation::{InvocationLog, InvocationRecord, Outcome};
use crate::logging;
use crate::runtime::router::CaptureSignal;
use crate::stubbing::{Action, InvocationMatcher, OngoingStubbing, RuleId, StubTable};
use crate::verification::{self, VerificationMode};
use crate::{MockError, Result};
use serde_json::Value;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Per-mock settings chosen when the mock is opened.
#[derive(Clone, Debug, Default)]
pub struct MockSettings {
    /// Name shown in diagnostics instead of the type name
    pub name: Option<String>,
}

impl MockSettings {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
        }
    }
}

#[derive(Debug)]
struct CapturedCall {
    signature: CallSignature,
    arguments: Vec<Value>,
}

#[derive(Debug, Default)]
enum Capture {
    #[default]
    Idle,
    Armed,
    Captured(CapturedCall),
}

/// Active override of one type's static surface, owned by one thread.
///
/// Stubs and the invocation log sit behind their own narrow locks so the
/// router may match and record calls arriving from any thread; everything
/// else is restricted to the owner thread.
#[derive(Debug)]
pub struct Binding {
    class: ClassId,
    owner: ThreadIdentity,
    settings: MockSettings,
    stubs: Mutex<StubTable>,
    log: Mutex<InvocationLog>,
    capture: Mutex<Capture>,
    closed: AtomicBool,
    max_listed_calls: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Returns the capture slot to idle however the closure exits.
struct CaptureGuard<'a>(&'a Mutex<Capture>);

impl Drop for CaptureGuard<'_> {
    fn drop(&mut self) {
        *lock(self.0) = Capture::Idle;
    }
}

impl Binding {
    pub(crate) fn new(
        class: ClassId,
        owner: ThreadIdentity,
        settings: MockSettings,
        max_listed_calls: usize,
    ) -> Self {
        Self {
            class,
            owner,
            settings,
            stubs: Mutex::new(StubTable::new()),
            log: Mutex::new(InvocationLog::new()),
            capture: Mutex::new(Capture::Idle),
            closed: AtomicBool::new(false),
            max_listed_calls,
        }
    }

    pub fn class(&self) -> &ClassId {
        &self.class
    }

    pub fn owner(&self) -> &ThreadIdentity {
        &self.owner
    }

    /// Name used in diagnostics.
    pub fn display_name(&self) -> String {
        match &self.settings.name {
            Some(name) => name.clone(),
            None => self.class.to_string(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub(crate) fn ensure_owner(&self, thread: &ThreadIdentity) -> Result<()> {
        if *thread == self.owner {
            return Ok(());
        }
        Err(MockError::WrongThread {
            class: self.display_name(),
            owner: self.owner.to_string(),
            current: thread.to_string(),
        })
    }

    fn ensure_usable(&self, operation: &str) -> Result<()> {
        if self.is_closed() {
            return Err(MockError::IllegalState {
                class: self.display_name(),
                operation: operation.to_string(),
            });
        }
        self.ensure_owner(&ThreadIdentity::current())
    }

    /// Register a stub rule ahead of all existing rules.
    pub fn stub(&self, matcher: InvocationMatcher, action: Action) -> Result<RuleId> {
        self.ensure_usable("stub")?;
        logging::log_stub_registered(&self.class, matcher.signature());
        Ok(lock(&self.stubs).stub(matcher, action))
    }

    /// Add a consecutive answer; `Ok(false)` when the rule no longer exists.
    pub fn add_answer(&self, rule: RuleId, action: Action) -> Result<bool> {
        self.ensure_usable("stub")?;
        Ok(lock(&self.stubs).add_answer(rule, action))
    }

    pub fn stub_count(&self) -> usize {
        lock(&self.stubs).len()
    }

    /// Pick the rule for a call and serve its next answer.
    ///
    /// Matchers run with the stub table unlocked; argument predicates may
    /// call back into the mocked type.
    pub fn match_and_apply(
        &self,
        signature: &CallSignature,
        arguments: &[Value],
    ) -> (Option<RuleId>, Action) {
        let candidates = lock(&self.stubs).candidates();
        let matched = candidates
            .iter()
            .find(|(_, matcher)| matcher.matches(signature, arguments))
            .map(|(id, _)| *id);
        // A reset between matching and serving drops the rule.
        match matched.and_then(|id| lock(&self.stubs).apply(id).map(|action| (id, action))) {
            Some((id, action)) => (Some(id), action),
            None => (None, Action::CallReal),
        }
    }

    pub(crate) fn record(
        &self,
        signature: &CallSignature,
        arguments: &[Value],
        rule: Option<RuleId>,
        outcome: Outcome,
        thread: &ThreadIdentity,
    ) -> u64 {
        lock(&self.log).append(signature, arguments, rule, outcome, thread.to_string())
    }

    /// Snapshot of the invocation log.
    pub fn invocations(&self) -> Vec<InvocationRecord> {
        lock(&self.log).records().to_vec()
    }

    /// Clear stubs and invocations; the mock stays open and installed.
    pub fn reset(&self) -> Result<()> {
        self.ensure_usable("reset")?;
        lock(&self.stubs).clear();
        lock(&self.log).clear();
        logging::log_reset(&self.class, false);
        Ok(())
    }

    /// Clear recorded invocations only.
    pub fn clear_invocations(&self) -> Result<()> {
        self.ensure_usable("clear invocations of")?;
        lock(&self.log).clear();
        logging::log_reset(&self.class, true);
        Ok(())
    }

    /// Start stubbing the single call made by `thunk`.
    pub fn when<F, R>(&self, thunk: F) -> Result<OngoingStubbing<'_>>
    where
        F: FnOnce() -> R,
    {
        self.ensure_usable("stub")?;
        let call = self.capture_call(thunk, "when")?;
        Ok(OngoingStubbing::new(
            self,
            InvocationMatcher::exact(call.signature, &call.arguments),
        ))
    }

    pub fn when_matching(&self, matcher: InvocationMatcher) -> Result<OngoingStubbing<'_>> {
        self.ensure_usable("stub")?;
        Ok(OngoingStubbing::new(self, matcher))
    }

    /// Verify the single call made by `thunk` against `mode`.
    ///
    /// The call itself is captured, never executed or recorded.
    pub fn verify<F, R>(&self, mode: VerificationMode, thunk: F) -> Result<()>
    where
        F: FnOnce() -> R,
    {
        self.ensure_usable("verify")?;
        let call = self.capture_call(thunk, "verify")?;
        let wanted = InvocationMatcher::exact(call.signature, &call.arguments);
        self.verify_matching(mode, &wanted)
    }

    /// Verify calls matching `wanted` against `mode`.
    ///
    /// Matching runs on a snapshot of the log, so argument predicates may
    /// make routed calls. Those calls are recorded but not counted.
    pub fn verify_matching(
        &self,
        mode: VerificationMode,
        wanted: &InvocationMatcher,
    ) -> Result<()> {
        self.ensure_usable("verify")?;
        let records = self.invocations();
        let matched = verification::verify_log(
            &self.display_name(),
            &self.class,
            &records,
            mode,
            wanted,
            self.max_listed_calls,
        )?;
        lock(&self.log).mark_verified(&matched);
        Ok(())
    }

    pub fn verify_no_more_interactions(&self) -> Result<()> {
        self.ensure_usable("verify")?;
        let name = self.display_name();
        verification::verify_no_more(&name, &self.class, &lock(&self.log), self.max_listed_calls)
    }

    pub fn verify_no_interactions(&self) -> Result<()> {
        self.ensure_usable("verify")?;
        let name = self.display_name();
        verification::verify_none(&name, &self.class, &lock(&self.log), self.max_listed_calls)
    }

    /// Take the call if a `when`/`verify` closure is running on `thread`.
    pub(crate) fn capture(
        &self,
        thread: &ThreadIdentity,
        signature: &CallSignature,
        arguments: &[Value],
    ) -> bool {
        if *thread != self.owner {
            return false;
        }
        let mut capture = lock(&self.capture);
        if !matches!(*capture, Capture::Armed) {
            return false;
        }
        *capture = Capture::Captured(CapturedCall {
            signature: signature.clone(),
            arguments: arguments.to_vec(),
        });
        true
    }

    /// Run `thunk` with capture armed; it is aborted at its first call on
    /// this type, so any later calls in the closure never run.
    fn capture_call<F, R>(&self, thunk: F, purpose: &str) -> Result<CapturedCall>
    where
        F: FnOnce() -> R,
    {
        *lock(&self.capture) = Capture::Armed;
        let _guard = CaptureGuard(&self.capture);

        match catch_unwind(AssertUnwindSafe(thunk)) {
            Ok(_) => Err(MockError::MissingInvocation {
                class: self.display_name(),
                purpose: purpose.to_string(),
            }),
            Err(payload) if payload.is::<CaptureSignal>() => {
                match std::mem::take(&mut *lock(&self.capture)) {
                    Capture::Captured(call) => Ok(call),
                    _ => Err(MockError::MissingInvocation {
                        class: self.display_name(),
                        purpose: purpose.to_string(),
                    }),
                }
            }
            Err(payload) => resume_unwind(payload),
        }
    }
}
