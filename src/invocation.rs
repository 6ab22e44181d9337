use crate::identity::{CallSignature, ClassId};
use crate::stubbing::RuleId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

static SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// What the router did with a recorded call.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Returned,
    Threw,
    CalledReal,
    Answered,
}

/// One routed call. Immutable once appended, apart from `verified`.
#[derive(Clone, Debug, Serialize)]
pub struct InvocationRecord {
    /// Process-wide order of the call
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    pub signature: CallSignature,
    pub arguments: Vec<Value>,
    /// Stub rule that handled the call; `None` when it ran the real code
    pub matched_rule: Option<RuleId>,
    pub outcome: Outcome,
    /// Thread the call was made from
    pub thread: String,
    pub verified: bool,
}

impl InvocationRecord {
    /// Render as `Files.exists("/a")`.
    pub fn describe(&self, class: &ClassId) -> String {
        let args: Vec<String> = self.arguments.iter().map(ToString::to_string).collect();
        format!(
            "{}.{}({})",
            class.short_name(),
            self.signature.method,
            args.join(", ")
        )
    }
}

/// Append-only call log of one binding.
#[derive(Debug, Default)]
pub struct InvocationLog {
    records: Vec<InvocationRecord>,
}

impl InvocationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        signature: &CallSignature,
        arguments: &[Value],
        matched_rule: Option<RuleId>,
        outcome: Outcome,
        thread: String,
    ) -> u64 {
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        self.records.push(InvocationRecord {
            sequence,
            recorded_at: Utc::now(),
            signature: signature.clone(),
            arguments: arguments.to_vec(),
            matched_rule,
            outcome,
            thread,
            verified: false,
        });
        sequence
    }

    pub fn records(&self) -> &[InvocationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn unverified(&self) -> impl Iterator<Item = &InvocationRecord> {
        self.records.iter().filter(|record| !record.verified)
    }

    /// Mark the records with the given sequence numbers (sorted) verified.
    ///
    /// Sequences no longer in the log are ignored.
    pub fn mark_verified(&mut self, sequences: &[u64]) {
        for record in &mut self.records {
            if sequences.binary_search(&record.sequence).is_ok() {
                record.verified = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Files;

    #[test]
    fn test_append_assigns_increasing_sequence() {
        let mut log = InvocationLog::new();
        let sig = CallSignature::new("exists", ["&str"]);
        let first = log.append(&sig, &[json!("/a")], None, Outcome::CalledReal, "main".into());
        let second = log.append(&sig, &[json!("/b")], None, Outcome::CalledReal, "main".into());
        assert!(second > first);
        assert_eq!(log.len(), 2);
        assert_eq!(log.unverified().count(), 2);
    }

    #[test]
    fn test_mark_verified_by_sequence() {
        let mut log = InvocationLog::new();
        let sig = CallSignature::new("exists", ["&str"]);
        let first = log.append(&sig, &[json!("/a")], None, Outcome::CalledReal, "main".into());
        log.append(&sig, &[json!("/b")], None, Outcome::CalledReal, "main".into());

        log.mark_verified(&[first, u64::MAX]);
        let unverified: Vec<&Value> = log.unverified().map(|r| &r.arguments[0]).collect();
        assert_eq!(unverified, vec![&json!("/b")]);
    }

    #[test]
    fn test_describe_record() {
        let mut log = InvocationLog::new();
        let sig = CallSignature::new("copy", ["&str", "&str"]);
        log.append(
            &sig,
            &[json!("/a"), json!("/b")],
            None,
            Outcome::CalledReal,
            "main".into(),
        );
        assert_eq!(
            log.records()[0].describe(&ClassId::of::<Files>()),
            "Files.copy(\"/a\", \"/b\")"
        );
    }

    #[test]
    fn test_record_serializes_for_diagnostics() {
        let mut log = InvocationLog::new();
        let sig = CallSignature::new("now", Vec::<String>::new());
        log.append(&sig, &[], None, Outcome::Returned, "worker".into());

        let json = serde_json::to_value(&log.records()[0]).unwrap();
        assert_eq!(json["signature"]["method"], "now");
        assert_eq!(json["outcome"], "returned");
        assert_eq!(json["verified"], false);
    }
}
