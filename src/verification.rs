//! Verification engine: reconciles an invocation log with a count policy.

use crate::identity::ClassId;
use crate::invocation::{InvocationLog, InvocationRecord};
use crate::logging;
use crate::stubbing::InvocationMatcher;
use crate::{MockError, Result};
use serde::Serialize;
use std::fmt;

/// Expected number of matching calls.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum VerificationMode {
    Times(usize),
    AtLeast(usize),
    AtMost(usize),
    /// Exactly one matching call and no other call on the mock
    Only,
}

pub fn times(n: usize) -> VerificationMode {
    VerificationMode::Times(n)
}

pub fn never() -> VerificationMode {
    VerificationMode::Times(0)
}

pub fn at_least_once() -> VerificationMode {
    VerificationMode::AtLeast(1)
}

pub fn at_least(n: usize) -> VerificationMode {
    VerificationMode::AtLeast(n)
}

pub fn at_most(n: usize) -> VerificationMode {
    VerificationMode::AtMost(n)
}

pub fn only() -> VerificationMode {
    VerificationMode::Only
}

impl VerificationMode {
    /// `matching` calls matched the wanted pattern out of `total` recorded.
    pub fn is_satisfied(&self, matching: usize, total: usize) -> bool {
        match *self {
            VerificationMode::Times(n) => matching == n,
            VerificationMode::AtLeast(n) => matching >= n,
            VerificationMode::AtMost(n) => matching <= n,
            VerificationMode::Only => matching == 1 && total == 1,
        }
    }
}

impl Default for VerificationMode {
    fn default() -> Self {
        times(1)
    }
}

impl fmt::Display for VerificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationMode::Times(0) => f.write_str("no invocations"),
            VerificationMode::Times(n) => write!(f, "exactly {} invocation(s)", n),
            VerificationMode::AtLeast(n) => write!(f, "at least {} invocation(s)", n),
            VerificationMode::AtMost(n) => write!(f, "at most {} invocation(s)", n),
            VerificationMode::Only => f.write_str("exactly one invocation and nothing else"),
        }
    }
}

/// Rendered calls attached to verification failures.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CallList {
    calls: Vec<String>,
    omitted: usize,
}

impl CallList {
    pub(crate) fn from_records<'r>(
        class: &ClassId,
        records: impl Iterator<Item = &'r InvocationRecord>,
        max: usize,
    ) -> Self {
        let mut calls = Vec::new();
        let mut omitted = 0;
        for record in records {
            if calls.len() < max {
                calls.push(record.describe(class));
            } else {
                omitted += 1;
            }
        }
        Self { calls, omitted }
    }

    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    pub fn len(&self) -> usize {
        self.calls.len() + self.omitted
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for CallList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        f.write_str(":")?;
        for (index, call) in self.calls.iter().enumerate() {
            write!(f, "\n  {}. {}", index + 1, call)?;
        }
        if self.omitted > 0 {
            write!(f, "\n  ... and {} more", self.omitted)?;
        }
        Ok(())
    }
}

/// Count the calls matching `wanted` and check them against `mode`.
///
/// Runs over a snapshot of the log so argument predicates never execute
/// under the log lock. Returns the sequence numbers of the matching
/// records, which the caller marks verified.
pub(crate) fn verify_log(
    name: &str,
    class: &ClassId,
    records: &[InvocationRecord],
    mode: VerificationMode,
    wanted: &InvocationMatcher,
    max_listed_calls: usize,
) -> Result<Vec<u64>> {
    let matching: Vec<u64> = records
        .iter()
        .filter(|record| wanted.matches(&record.signature, &record.arguments))
        .map(|record| record.sequence)
        .collect();

    if !mode.is_satisfied(matching.len(), records.len()) {
        logging::log_verification_failed(class, &wanted.to_string(), matching.len());
        return Err(MockError::Verification {
            class: name.to_string(),
            wanted: wanted.to_string(),
            expected: mode,
            actual: matching.len(),
            calls: CallList::from_records(class, records.iter(), max_listed_calls),
        });
    }
    Ok(matching)
}

pub(crate) fn verify_no_more(
    name: &str,
    class: &ClassId,
    log: &InvocationLog,
    max_listed_calls: usize,
) -> Result<()> {
    let unverified = CallList::from_records(class, log.unverified(), max_listed_calls);
    if unverified.is_empty() {
        return Ok(());
    }
    Err(MockError::NoMoreInteractionsWanted {
        class: name.to_string(),
        unverified,
    })
}

pub(crate) fn verify_none(
    name: &str,
    class: &ClassId,
    log: &InvocationLog,
    max_listed_calls: usize,
) -> Result<()> {
    if log.is_empty() {
        return Ok(());
    }
    Err(MockError::NoInteractionsWanted {
        class: name.to_string(),
        calls: CallList::from_records(class, log.records().iter(), max_listed_calls),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::CallSignature;
    use crate::invocation::Outcome;
    use serde_json::json;

    struct Files;

    fn exists() -> CallSignature {
        CallSignature::new("exists", ["&str"])
    }

    fn log_with(paths: &[&str]) -> InvocationLog {
        let mut log = InvocationLog::new();
        for path in paths {
            log.append(&exists(), &[json!(path)], None, Outcome::CalledReal, "main".into());
        }
        log
    }

    #[test]
    fn test_mode_arithmetic() {
        assert!(times(2).is_satisfied(2, 5));
        assert!(!times(2).is_satisfied(3, 5));
        assert!(never().is_satisfied(0, 5));
        assert!(at_least_once().is_satisfied(4, 4));
        assert!(!at_least(2).is_satisfied(1, 4));
        assert!(at_most(2).is_satisfied(0, 4));
        assert!(only().is_satisfied(1, 1));
        assert!(!only().is_satisfied(1, 2));
        assert_eq!(VerificationMode::default(), times(1));
    }

    #[test]
    fn test_verify_marks_matches() {
        let class = ClassId::of::<Files>();
        let mut log = log_with(&["/a", "/b", "/a"]);
        let wanted = InvocationMatcher::exact(exists(), &[json!("/a")]);

        let matched = verify_log("Files", &class, log.records(), times(2), &wanted, 20).unwrap();
        assert_eq!(matched.len(), 2);
        log.mark_verified(&matched);
        assert_eq!(log.unverified().count(), 1);
        assert!(verify_no_more("Files", &class, &log, 20).is_err());
    }

    #[test]
    fn test_failure_reports_counts_and_calls() {
        let class = ClassId::of::<Files>();
        let log = log_with(&["/a", "/b"]);
        let wanted = InvocationMatcher::exact(exists(), &[json!("/a")]);

        let err = verify_log("Files", &class, log.records(), times(3), &wanted, 20).unwrap_err();
        match &err {
            MockError::Verification {
                expected,
                actual,
                calls,
                ..
            } => {
                assert_eq!(*expected, times(3));
                assert_eq!(*actual, 1);
                assert_eq!(calls.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        let message = err.to_string();
        assert!(message.contains("Files.exists(\"/a\"): wanted exactly 3 invocation(s)"));
        assert!(message.contains("2. Files.exists(\"/b\")"));
    }

    #[test]
    fn test_call_list_truncates() {
        let class = ClassId::of::<Files>();
        let log = log_with(&["/1", "/2", "/3"]);
        let list = CallList::from_records(&class, log.records().iter(), 2);
        assert_eq!(list.calls().len(), 2);
        assert_eq!(list.len(), 3);
        assert!(list.to_string().ends_with("... and 1 more"));
    }

    #[test]
    fn test_verify_none() {
        let class = ClassId::of::<Files>();
        assert!(verify_none("Files", &class, &InvocationLog::new(), 20).is_ok());
        let err = verify_none("fs", &class, &log_with(&["/a"]), 20).unwrap_err();
        assert!(matches!(err, MockError::NoInteractionsWanted { .. }));
        assert!(err.to_string().starts_with("no interactions wanted on fs"));
    }
}
