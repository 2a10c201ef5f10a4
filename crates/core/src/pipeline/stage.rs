//! The funnel stage table: total order plus the protected-stage set.
//!
//! This is the single source of truth the no-backward rule depends on.
//! Triggers never re-derive ordering; they ask this enum.

use serde::{Deserialize, Serialize};

/// Funnel stages in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Lead,
    Attended,
    Revisit,
    FollowUp,
    ApplicationSubmitted,
    ActiveMember,
    Onboarding,
    Archived,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 8] = [
        PipelineStage::Lead,
        PipelineStage::Attended,
        PipelineStage::Revisit,
        PipelineStage::FollowUp,
        PipelineStage::ApplicationSubmitted,
        PipelineStage::ActiveMember,
        PipelineStage::Onboarding,
        PipelineStage::Archived,
    ];

    /// Position in the strict total order (1-based).
    pub fn order_value(&self) -> u8 {
        match self {
            PipelineStage::Lead => 1,
            PipelineStage::Attended => 2,
            PipelineStage::Revisit => 3,
            PipelineStage::FollowUp => 4,
            PipelineStage::ApplicationSubmitted => 5,
            PipelineStage::ActiveMember => 6,
            PipelineStage::Onboarding => 7,
            PipelineStage::Archived => 8,
        }
    }

    /// Protected stages only allow automatic moves that strictly increase the
    /// order value. Manual/admin transitions are exempt.
    pub fn is_protected(&self) -> bool {
        self.order_value() >= PipelineStage::FollowUp.order_value()
    }

    /// Whether an *automatic* trigger may move a record from `self` to
    /// `target`. Unprotected stages accept any automatic move.
    pub fn allows_auto_move_to(&self, target: PipelineStage) -> bool {
        if self.is_protected() {
            target.order_value() > self.order_value()
        } else {
            true
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Lead => "lead",
            PipelineStage::Attended => "attended",
            PipelineStage::Revisit => "revisit",
            PipelineStage::FollowUp => "follow_up",
            PipelineStage::ApplicationSubmitted => "application_submitted",
            PipelineStage::ActiveMember => "active_member",
            PipelineStage::Onboarding => "onboarding",
            PipelineStage::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<PipelineStage> {
        Self::ALL.iter().copied().find(|s| s.as_str() == value)
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Initial stage for a record created by a registration trigger, backfilled
/// from the person's historical check-in count.
pub fn initial_stage_for_history(prior_checkins: i64) -> PipelineStage {
    match prior_checkins {
        0 => PipelineStage::Lead,
        1 => PipelineStage::Attended,
        _ => PipelineStage::Revisit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_strictly_increasing() {
        for pair in PipelineStage::ALL.windows(2) {
            assert!(pair[0].order_value() < pair[1].order_value());
        }
    }

    #[test]
    fn protected_set_starts_at_follow_up() {
        assert!(!PipelineStage::Lead.is_protected());
        assert!(!PipelineStage::Attended.is_protected());
        assert!(!PipelineStage::Revisit.is_protected());
        assert!(PipelineStage::FollowUp.is_protected());
        assert!(PipelineStage::ApplicationSubmitted.is_protected());
        assert!(PipelineStage::ActiveMember.is_protected());
        assert!(PipelineStage::Onboarding.is_protected());
        assert!(PipelineStage::Archived.is_protected());
    }

    #[test]
    fn protected_stage_only_moves_forward_automatically() {
        assert!(PipelineStage::FollowUp.allows_auto_move_to(PipelineStage::ActiveMember));
        assert!(!PipelineStage::FollowUp.allows_auto_move_to(PipelineStage::Revisit));
        assert!(!PipelineStage::ActiveMember.allows_auto_move_to(PipelineStage::ActiveMember));
        // Unprotected stages may move anywhere automatically.
        assert!(PipelineStage::Attended.allows_auto_move_to(PipelineStage::Lead));
    }

    #[test]
    fn backfill_thresholds_match_history() {
        assert_eq!(initial_stage_for_history(0), PipelineStage::Lead);
        assert_eq!(initial_stage_for_history(1), PipelineStage::Attended);
        assert_eq!(initial_stage_for_history(2), PipelineStage::Revisit);
        assert_eq!(initial_stage_for_history(7), PipelineStage::Revisit);
    }

    #[test]
    fn stage_round_trips_through_db_strings() {
        for stage in PipelineStage::ALL {
            assert_eq!(PipelineStage::parse(stage.as_str()), Some(stage));
        }
        assert_eq!(PipelineStage::parse("unknown"), None);
    }
}
