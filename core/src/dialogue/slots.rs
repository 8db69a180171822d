//! Slot model: the pieces of information required before an API can be recommended.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A boolean that may not have been answered yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TriState {
    #[default]
    Unknown,
    True,
    False,
}

impl TriState {
    pub fn is_known(self) -> bool {
        self != TriState::Unknown
    }

    pub fn is_true(self) -> bool {
        self == TriState::True
    }

    /// Keep a known value; only `Unknown` takes the other side
    pub fn or(self, other: TriState) -> TriState {
        match self {
            TriState::Unknown => other,
            known => known,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            TriState::Unknown => None,
            TriState::True => Some(true),
            TriState::False => Some(false),
        }
    }
}

impl From<Option<bool>> for TriState {
    fn from(v: Option<bool>) -> Self {
        match v {
            None => TriState::Unknown,
            Some(true) => TriState::True,
            Some(false) => TriState::False,
        }
    }
}

impl From<bool> for TriState {
    fn from(v: bool) -> Self {
        if v {
            TriState::True
        } else {
            TriState::False
        }
    }
}

/// Operation the user wants to perform on the asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    #[default]
    Unset,
    Create,
    Burn,
    Trade,
}

impl Operation {
    /// Parse an operation word; synonyms map onto the canonical operation
    pub fn parse(word: &str) -> Operation {
        match word.trim().to_ascii_lowercase().as_str() {
            "create" | "issue" => Operation::Create,
            "burn" | "manage" => Operation::Burn,
            "trade" | "settle" => Operation::Trade,
            _ => Operation::Unset,
        }
    }

    pub fn is_set(self) -> bool {
        self != Operation::Unset
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Unset => "",
            Operation::Create => "create",
            Operation::Burn => "burn",
            Operation::Trade => "trade",
        }
    }

    /// Catalog API family that serves this operation
    pub fn api_type(self) -> Option<&'static str> {
        match self {
            Operation::Unset => None,
            Operation::Create => Some("req issue"),
            Operation::Burn => Some("req manage"),
            Operation::Trade => Some("req settle"),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The slot set carried across the turns of one creation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryInfo {
    pub is_async: TriState,
    pub is_umi_compliant: TriState,
    pub is_private: TriState,
    /// Request-payload fields
    pub field_names: BTreeSet<String>,
    /// Event-payload fields; never shares a member with `field_names`
    pub event_fields: BTreeSet<String>,
    pub operation: Operation,
    pub use_case: Option<String>,
}

impl QueryInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_async(mut self, v: TriState) -> Self {
        self.is_async = v;
        self
    }

    pub fn with_umi_compliant(mut self, v: TriState) -> Self {
        self.is_umi_compliant = v;
        self
    }

    pub fn with_private(mut self, v: TriState) -> Self {
        self.is_private = v;
        self
    }

    pub fn with_field(mut self, name: impl Into<String>) -> Self {
        self.field_names.insert(name.into());
        self
    }

    pub fn with_event_field(mut self, name: impl Into<String>) -> Self {
        self.event_fields.insert(name.into());
        self
    }

    pub fn with_operation(mut self, op: Operation) -> Self {
        self.operation = op;
        self
    }

    pub fn with_use_case(mut self, use_case: impl Into<String>) -> Self {
        self.use_case = Some(use_case.into());
        self
    }

    pub fn has_use_case(&self) -> bool {
        self.use_case.is_some()
    }

    /// True when nothing has been resolved yet
    pub fn is_empty(&self) -> bool {
        *self == QueryInfo::default()
    }

    /// Within a single extraction an event cue wins: drop event fields from the request set.
    pub fn enforce_disjoint(&mut self) {
        let events = &self.event_fields;
        self.field_names.retain(|f| !events.contains(f));
    }

    /// Fill the gaps of `self` from `other` without overwriting anything already resolved.
    pub fn fill_gaps(&mut self, other: &QueryInfo) {
        self.is_async = self.is_async.or(other.is_async);
        self.is_umi_compliant = self.is_umi_compliant.or(other.is_umi_compliant);
        self.is_private = self.is_private.or(other.is_private);
        if !self.operation.is_set() {
            self.operation = other.operation;
        }
        if self.use_case.is_none() {
            self.use_case = other.use_case.clone();
        }
    }

    /// Overlay the slots a continuation turn resolved onto the carried state.
    ///
    /// Tri-states only move away from `Unknown`; field sets are unioned, with a
    /// name already assigned to one set never added to the other.
    pub fn merge_turn(&mut self, turn: QueryInfo) {
        self.fill_gaps(&turn);
        for f in turn.field_names {
            if !self.event_fields.contains(&f) {
                self.field_names.insert(f);
            }
        }
        for f in turn.event_fields {
            if !self.field_names.contains(&f) {
                self.event_fields.insert(f);
            }
        }
    }
}
