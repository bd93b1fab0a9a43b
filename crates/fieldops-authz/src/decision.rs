//! Authorization decisions
//!
//! A [`Decision`] is the ephemeral result of one authorization request. It
//! names the reason code and the rule that decided it, and carries a rule
//! trace only when produced by [`Authorizer::explain`].
//!
//! [`Authorizer::explain`]: crate::engine::Authorizer::explain

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::boundary::CROSS_BOUNDARY_ACCESS;

/// Why a decision came out the way it did.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// A role permission granted access within the boundary
    RolePermission,
    /// A direct resource assignment granted access
    DirectAssignment,
    /// A team resource assignment granted access
    TeamAssignment,
    /// A role permission matched but the boundary rules blocked it
    BoundaryViolation,
    /// Nothing granted access
    NoMatchingGrant,
    /// Evaluation failed and the request was denied
    AuthorizationError,
}

impl ReasonCode {
    /// Get string representation of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::RolePermission => "role_permission",
            ReasonCode::DirectAssignment => "direct_assignment",
            ReasonCode::TeamAssignment => "team_assignment",
            ReasonCode::BoundaryViolation => "boundary_violation",
            ReasonCode::NoMatchingGrant => "no_matching_grant",
            ReasonCode::AuthorizationError => "authorization_error",
        }
    }

    /// Whether the reason grants access.
    pub fn is_allow(&self) -> bool {
        matches!(
            self,
            ReasonCode::RolePermission | ReasonCode::DirectAssignment | ReasonCode::TeamAssignment
        )
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evaluation stage a trace step belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TraceStage {
    /// Resolving the subject and its role assignments
    Resolve,
    /// Checking one role assignment's permission set
    RolePermission,
    /// Running the boundary rules for one role assignment
    Boundary,
    /// Checking direct resource assignments
    DirectAssignment,
    /// Checking team resource assignments
    TeamAssignment,
    /// Final outcome
    Outcome,
}

/// One step of an explain trace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceStep {
    /// Stage of evaluation
    pub stage: TraceStage,

    /// What was checked
    pub detail: String,

    /// Whether the check matched
    pub matched: bool,
}

/// Result of an authorization request.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use fieldops_authz::{Decision, ReasonCode};
///
/// let decision = Decision::deny(ReasonCode::NoMatchingGrant, None, Utc::now());
/// assert!(!decision.allowed);
/// assert!(decision.tags().is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Decision {
    /// Whether access is granted
    pub allowed: bool,

    /// Reason code
    pub reason: ReasonCode,

    /// Rule that decided the outcome
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,

    /// When the decision was evaluated
    pub evaluated_at: DateTime<Utc>,

    /// Whether access relied on national privilege
    #[serde(default)]
    pub cross_boundary_access: bool,

    /// Rule trace, populated by `explain` only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<TraceStep>,
}

impl Decision {
    /// An allow decision.
    pub fn allow(reason: ReasonCode, matched_rule: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            allowed: true,
            reason,
            matched_rule: Some(matched_rule.into()),
            evaluated_at: at,
            cross_boundary_access: false,
            trace: Vec::new(),
        }
    }

    /// A deny decision.
    pub fn deny(reason: ReasonCode, matched_rule: Option<String>, at: DateTime<Utc>) -> Self {
        Self {
            allowed: false,
            reason,
            matched_rule,
            evaluated_at: at,
            cross_boundary_access: false,
            trace: Vec::new(),
        }
    }

    /// Mark the decision as relying on national privilege.
    pub fn with_cross_boundary(mut self, cross_boundary: bool) -> Self {
        self.cross_boundary_access = cross_boundary;
        self
    }

    /// Attach an explain trace.
    pub fn with_trace(mut self, trace: Vec<TraceStep>) -> Self {
        self.trace = trace;
        self
    }

    /// Tags for audit records.
    pub fn tags(&self) -> Vec<String> {
        if self.cross_boundary_access {
            vec![CROSS_BOUNDARY_ACCESS.to_string()]
        } else {
            Vec::new()
        }
    }
}

/// Collects trace steps when enabled; a no-op otherwise.
#[derive(Debug, Default)]
pub(crate) struct Trace {
    steps: Option<Vec<TraceStep>>,
}

impl Trace {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            steps: enabled.then(Vec::new),
        }
    }

    pub(crate) fn record<F>(&mut self, stage: TraceStage, matched: bool, detail: F)
    where
        F: FnOnce() -> String,
    {
        if let Some(steps) = self.steps.as_mut() {
            steps.push(TraceStep {
                stage,
                detail: detail(),
                matched,
            });
        }
    }

    pub(crate) fn into_steps(self) -> Vec<TraceStep> {
        self.steps.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes_serialize_snake_case() {
        let json = serde_json::to_string(&ReasonCode::BoundaryViolation).unwrap();
        assert_eq!(json, "\"boundary_violation\"");
        assert_eq!(ReasonCode::NoMatchingGrant.to_string(), "no_matching_grant");
    }

    #[test]
    fn test_allow_reasons() {
        assert!(ReasonCode::TeamAssignment.is_allow());
        assert!(!ReasonCode::AuthorizationError.is_allow());
    }

    #[test]
    fn test_cross_boundary_tag() {
        let decision = Decision::allow(
            ReasonCode::RolePermission,
            "role:SYSTEM_ADMIN@global/national_role",
            Utc::now(),
        )
        .with_cross_boundary(true);
        assert_eq!(decision.tags(), vec!["cross_boundary_access".to_string()]);
    }

    #[test]
    fn test_trace_omitted_when_empty() {
        let decision = Decision::deny(ReasonCode::NoMatchingGrant, None, Utc::now());
        let json = serde_json::to_value(&decision).unwrap();
        assert!(json.get("trace").is_none());
        assert!(json.get("matched_rule").is_none());
    }

    #[test]
    fn test_disabled_trace_records_nothing() {
        let mut trace = Trace::new(false);
        trace.record(TraceStage::Outcome, true, || panic!("detail must not be built"));
        assert!(trace.into_steps().is_empty());

        let mut trace = Trace::new(true);
        trace.record(TraceStage::Outcome, true, || "allow".to_string());
        assert_eq!(trace.into_steps().len(), 1);
    }
}
