//! Team memberships
//!
//! A subject always belongs to its home team. Memberships record the other
//! teams it has been seconded to, for as long as the secondment lasts; team
//! resource grants follow them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A subject's membership of a team other than its home team.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use uuid::Uuid;
/// use fieldops_org::TeamMembership;
///
/// let membership = TeamMembership::new(Uuid::now_v7(), Uuid::now_v7());
/// assert!(membership.is_current(Utc::now()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMembership {
    pub id: Uuid,

    /// Team the subject was seconded to
    pub team_id: Uuid,

    pub subject_id: Uuid,

    pub joined_at: DateTime<Utc>,

    /// End of the secondment; open-ended when `None`
    pub ends_at: Option<DateTime<Utc>>,

    /// Cleared when an administrator removes the subject early
    pub is_active: bool,
}

impl TeamMembership {
    /// An open-ended membership starting now.
    pub fn new(team_id: Uuid, subject_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            team_id,
            subject_id,
            joined_at: Utc::now(),
            ends_at: None,
            is_active: true,
        }
    }

    /// Schedule the end of the membership.
    pub fn ending_at(mut self, ends_at: DateTime<Utc>) -> Self {
        self.ends_at = Some(ends_at);
        self
    }

    /// Whether the subject belongs to the team at `now`.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.ends_at.map_or(true, |end| end > now)
    }
}
