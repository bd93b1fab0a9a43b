//! # Resource Types
//!
//! Resource classes known to the field-operations platform. A resource
//! instance belongs to exactly one class; role permissions and cache
//! invalidation both work per class.

use serde::{Deserialize, Serialize};

/// Class of a protected resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Platform account
    User,
    /// Field team
    Team,
    /// Region grouping teams
    Region,
    /// Tenant
    Organization,
    /// Field project
    Project,
    /// Enrolled device
    Device,
    /// Data-collection form
    Form,
    /// Data submitted against a form
    Submission,
    /// Work item dispatched to an agent
    Task,
    /// Operational report
    Report,
    /// Device or data policy
    Policy,
    /// Role definition
    Role,
    /// Audit trail entry
    AuditLog,
    /// Tenant settings
    Settings,
}

impl ResourceType {
    /// Every resource class, in declaration order.
    pub const ALL: [ResourceType; 14] = [
        ResourceType::User,
        ResourceType::Team,
        ResourceType::Region,
        ResourceType::Organization,
        ResourceType::Project,
        ResourceType::Device,
        ResourceType::Form,
        ResourceType::Submission,
        ResourceType::Task,
        ResourceType::Report,
        ResourceType::Policy,
        ResourceType::Role,
        ResourceType::AuditLog,
        ResourceType::Settings,
    ];

    /// Wire name, as used in permission strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::User => "user",
            ResourceType::Team => "team",
            ResourceType::Region => "region",
            ResourceType::Organization => "organization",
            ResourceType::Project => "project",
            ResourceType::Device => "device",
            ResourceType::Form => "form",
            ResourceType::Submission => "submission",
            ResourceType::Task => "task",
            ResourceType::Report => "report",
            ResourceType::Policy => "policy",
            ResourceType::Role => "role",
            ResourceType::AuditLog => "audit_log",
            ResourceType::Settings => "settings",
        }
    }

    /// Parse a wire name, case-insensitively. Plurals and `org` are
    /// accepted, matching the collection names the entity layer uses.
    ///
    /// ```
    /// use fieldops_rbac::resources::ResourceType;
    ///
    /// assert_eq!(ResourceType::parse("Devices"), Some(ResourceType::Device));
    /// assert_eq!(ResourceType::parse("policies"), Some(ResourceType::Policy));
    /// assert_eq!(ResourceType::parse("audit_logs"), Some(ResourceType::AuditLog));
    /// assert_eq!(ResourceType::parse("vehicle"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        let singular = match lowered.as_str() {
            "org" | "orgs" => "organization",
            "policies" => "policy",
            "setting" => "settings",
            other => other.strip_suffix('s').filter(|_| other != "settings").unwrap_or(other),
        };
        Self::ALL.into_iter().find(|r| r.as_str() == singular)
    }

    /// Every resource class as a vector.
    pub fn all() -> Vec<Self> {
        Self::ALL.to_vec()
    }

    /// Whether instances of this class are field work owned by a team or
    /// region, as opposed to tenancy or governance records.
    pub fn is_field_work(&self) -> bool {
        matches!(
            self,
            ResourceType::Project
                | ResourceType::Device
                | ResourceType::Form
                | ResourceType::Submission
                | ResourceType::Task
                | ResourceType::Report
        )
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
