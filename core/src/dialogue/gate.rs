//! Completeness gate: decides whether enough is known to recommend an API.

use super::slots::{QueryInfo, TriState};

/// One unmet gate condition, in the order follow-up questions list them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissingSlot {
    Operation,
    IsAsync,
    IsUmiCompliant,
    IsPrivate,
    FieldNames,
    EventFields,
}

impl MissingSlot {
    /// Word a question about this slot must contain
    pub fn keyword(self) -> &'static str {
        match self {
            MissingSlot::Operation => "operation",
            MissingSlot::IsAsync => "async",
            MissingSlot::IsUmiCompliant => "umi",
            MissingSlot::IsPrivate => "private",
            MissingSlot::FieldNames => "field",
            MissingSlot::EventFields => "event",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletenessResult {
    pub complete: bool,
    pub missing: Vec<MissingSlot>,
}

/// complete(q) = async, UMI and privacy known AND at least one field AND
/// (no use case OR operation set) AND (not async OR at least one event field)
pub fn is_complete(q: &QueryInfo) -> bool {
    q.is_async.is_known()
        && q.is_umi_compliant.is_known()
        && q.is_private.is_known()
        && !q.field_names.is_empty()
        && (q.use_case.is_none() || q.operation.is_set())
        && (q.is_async != TriState::True || !q.event_fields.is_empty())
}

pub fn evaluate(q: &QueryInfo) -> CompletenessResult {
    let mut missing = Vec::new();
    if q.use_case.is_some() && !q.operation.is_set() {
        missing.push(MissingSlot::Operation);
    }
    if !q.is_async.is_known() {
        missing.push(MissingSlot::IsAsync);
    }
    if !q.is_umi_compliant.is_known() {
        missing.push(MissingSlot::IsUmiCompliant);
    }
    if !q.is_private.is_known() {
        missing.push(MissingSlot::IsPrivate);
    }
    if q.field_names.is_empty() {
        missing.push(MissingSlot::FieldNames);
    }
    if q.is_async.is_true() && q.event_fields.is_empty() {
        missing.push(MissingSlot::EventFields);
    }
    CompletenessResult {
        complete: missing.is_empty(),
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::slots::Operation;
    use proptest::prelude::*;

    fn tri() -> impl Strategy<Value = TriState> {
        prop_oneof![
            Just(TriState::Unknown),
            Just(TriState::True),
            Just(TriState::False)
        ]
    }

    fn op() -> impl Strategy<Value = Operation> {
        prop_oneof![
            Just(Operation::Unset),
            Just(Operation::Create),
            Just(Operation::Burn),
            Just(Operation::Trade)
        ]
    }

    prop_compose! {
        fn query_info()(
            is_async in tri(),
            is_umi_compliant in tri(),
            is_private in tri(),
            has_fields in any::<bool>(),
            has_events in any::<bool>(),
            operation in op(),
            use_case in proptest::option::of(prop_oneof![Just("gold bond"), Just("fd")]),
        ) -> QueryInfo {
            let mut q = QueryInfo {
                is_async,
                is_umi_compliant,
                is_private,
                operation,
                use_case: use_case.map(str::to_string),
                ..Default::default()
            };
            if has_fields {
                q.field_names.insert("id".into());
            }
            if has_events {
                q.event_fields.insert("timestamp".into());
            }
            q
        }
    }

    proptest! {
        #[test]
        fn gate_matches_formula(q in query_info()) {
            let expected = q.is_async != TriState::Unknown
                && q.is_umi_compliant != TriState::Unknown
                && q.is_private != TriState::Unknown
                && !q.field_names.is_empty()
                && (q.use_case.is_none() || q.operation != Operation::Unset)
                && (q.is_async != TriState::True || !q.event_fields.is_empty());
            prop_assert_eq!(is_complete(&q), expected);

            let result = evaluate(&q);
            prop_assert_eq!(result.complete, expected);
            prop_assert_eq!(result.missing.is_empty(), expected);
        }
    }

    #[test]
    fn only_async_missing() {
        let q = QueryInfo::new()
            .with_umi_compliant(TriState::True)
            .with_private(TriState::True)
            .with_field("id");
        let r = evaluate(&q);
        assert!(!r.complete);
        assert_eq!(r.missing, vec![MissingSlot::IsAsync]);
    }

    #[test]
    fn async_true_requires_event_fields() {
        let q = QueryInfo::new()
            .with_async(TriState::True)
            .with_umi_compliant(TriState::True)
            .with_private(TriState::True)
            .with_field("id");
        assert_eq!(evaluate(&q).missing, vec![MissingSlot::EventFields]);
        assert!(is_complete(&q.with_event_field("timestamp")));
    }

    #[test]
    fn operation_listed_first() {
        let q = QueryInfo::new().with_use_case("gold bond");
        assert_eq!(evaluate(&q).missing[0], MissingSlot::Operation);
    }
}
