//! Lifecycle stages and action names.
//!
//! # Responsibility
//! - Define the closed set of stages a correspondence document can occupy.
//! - Define the closed set of action names the stage machine understands.
//! - Provide stable string ids used by storage and audit records.
//!
//! # Invariants
//! - Every stored stage string maps to exactly one `Stage` variant.
//! - Terminal stages never report themselves as active.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Position of a document in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    PendingRegistration,
    Registration,
    Resolution,
    Assignment,
    Execution,
    Drafting,
    RevisionRequested,
    FinalReview,
    Signature,
    Dispatch,
    Completed,
    /// Paused; the stage to return to is kept in `Correspondence::prior_stage`.
    OnHold,
    Cancelled,
    Rejected,
    /// Reversible via unarchive; the archived-from stage is kept in `prior_stage`.
    Archived,
}

impl Stage {
    /// Every stage, in lifecycle order followed by side stages.
    pub const ALL: [Stage; 15] = [
        Stage::PendingRegistration,
        Stage::Registration,
        Stage::Resolution,
        Stage::Assignment,
        Stage::Execution,
        Stage::Drafting,
        Stage::RevisionRequested,
        Stage::FinalReview,
        Stage::Signature,
        Stage::Dispatch,
        Stage::Completed,
        Stage::OnHold,
        Stage::Cancelled,
        Stage::Rejected,
        Stage::Archived,
    ];

    /// Stable string id used in storage and audit rows.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingRegistration => "PENDING_REGISTRATION",
            Self::Registration => "REGISTRATION",
            Self::Resolution => "RESOLUTION",
            Self::Assignment => "ASSIGNMENT",
            Self::Execution => "EXECUTION",
            Self::Drafting => "DRAFTING",
            Self::RevisionRequested => "REVISION_REQUESTED",
            Self::FinalReview => "FINAL_REVIEW",
            Self::Signature => "SIGNATURE",
            Self::Dispatch => "DISPATCH",
            Self::Completed => "COMPLETED",
            Self::OnHold => "ON_HOLD",
            Self::Cancelled => "CANCELLED",
            Self::Rejected => "REJECTED",
            Self::Archived => "ARCHIVED",
        }
    }

    /// Returns whether no further business transition leaves this stage
    /// (archive/unarchive excepted).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Cancelled | Self::Rejected | Self::Archived
        )
    }

    /// Returns whether the document is on the working line: not terminal
    /// and not paused.
    pub fn is_active(self) -> bool {
        !self.is_terminal() && self != Self::OnHold
    }

    /// Returns whether the document is still open: active or paused.
    pub fn is_open(self) -> bool {
        !self.is_terminal()
    }

    /// Position on the main line, `None` for side stages.
    pub fn lifecycle_rank(self) -> Option<u8> {
        match self {
            Self::PendingRegistration => Some(0),
            Self::Registration => Some(1),
            Self::Resolution => Some(2),
            Self::Assignment => Some(3),
            Self::Execution => Some(4),
            Self::Drafting => Some(5),
            Self::RevisionRequested => Some(6),
            Self::FinalReview => Some(7),
            Self::Signature => Some(8),
            Self::Dispatch => Some(9),
            Self::Completed => Some(10),
            Self::OnHold | Self::Cancelled | Self::Rejected | Self::Archived => None,
        }
    }

    /// Returns whether this main-line stage comes before `EXECUTION`.
    pub fn precedes_execution(self) -> bool {
        matches!(self.lifecycle_rank(), Some(rank) if rank < 4)
    }

    /// Returns whether a main executor must already be assigned here.
    pub fn requires_main_executor(self) -> bool {
        matches!(self.lifecycle_rank(), Some(rank) if rank >= 4)
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses one stage from its stable string id.
pub fn parse_stage(value: &str) -> Result<Stage, StageParseError> {
    Stage::ALL
        .into_iter()
        .find(|stage| stage.as_str() == value)
        .ok_or_else(|| StageParseError(value.to_string()))
}

/// Unknown stage string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageParseError(pub String);

impl Display for StageParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown stage: {}", self.0)
    }
}

impl Error for StageParseError {}

/// Name of a workflow action, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionName {
    Register,
    SubmitForResolution,
    Resolve,
    AssignExecutors,
    DelegateInternal,
    StartDrafting,
    SubmitForReview,
    ApproveReview,
    RejectReview,
    Sign,
    Dispatch,
    Hold,
    Resume,
    Cancel,
    Reject,
    Archive,
    Unarchive,
    UpdateDeadline,
}

impl ActionName {
    pub const ALL: [ActionName; 18] = [
        ActionName::Register,
        ActionName::SubmitForResolution,
        ActionName::Resolve,
        ActionName::AssignExecutors,
        ActionName::DelegateInternal,
        ActionName::StartDrafting,
        ActionName::SubmitForReview,
        ActionName::ApproveReview,
        ActionName::RejectReview,
        ActionName::Sign,
        ActionName::Dispatch,
        ActionName::Hold,
        ActionName::Resume,
        ActionName::Cancel,
        ActionName::Reject,
        ActionName::Archive,
        ActionName::Unarchive,
        ActionName::UpdateDeadline,
    ];

    /// Stable camelCase id shared with the REST layer.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::SubmitForResolution => "submitForResolution",
            Self::Resolve => "resolve",
            Self::AssignExecutors => "assignExecutors",
            Self::DelegateInternal => "delegateInternal",
            Self::StartDrafting => "startDrafting",
            Self::SubmitForReview => "submitForReview",
            Self::ApproveReview => "approveReview",
            Self::RejectReview => "rejectReview",
            Self::Sign => "sign",
            Self::Dispatch => "dispatch",
            Self::Hold => "hold",
            Self::Resume => "resume",
            Self::Cancel => "cancel",
            Self::Reject => "reject",
            Self::Archive => "archive",
            Self::Unarchive => "unarchive",
            Self::UpdateDeadline => "updateDeadline",
        }
    }
}

impl Display for ActionName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_stage, ActionName, Stage, StageParseError};
    use std::collections::HashSet;

    #[test]
    fn stage_ids_roundtrip_through_parse() {
        for stage in Stage::ALL {
            assert_eq!(parse_stage(stage.as_str()).expect("known stage"), stage);
        }
    }

    #[test]
    fn rejects_unknown_or_lowercase_stage_ids() {
        assert_eq!(
            parse_stage("final_review").expect_err("lowercase must fail"),
            StageParseError("final_review".to_string())
        );
        assert!(parse_stage("").is_err());
    }

    #[test]
    fn terminal_and_active_partition_the_stages() {
        for stage in Stage::ALL {
            if stage.is_terminal() {
                assert!(!stage.is_active());
                assert!(!stage.is_open());
            }
        }
        assert!(Stage::OnHold.is_open());
        assert!(!Stage::OnHold.is_active());
        assert!(Stage::Drafting.is_active());
    }

    #[test]
    fn execution_threshold_matches_main_line_order() {
        assert!(Stage::Assignment.precedes_execution());
        assert!(!Stage::Execution.precedes_execution());
        assert!(Stage::Execution.requires_main_executor());
        assert!(Stage::Completed.requires_main_executor());
        assert!(!Stage::Cancelled.requires_main_executor());
        assert!(!Stage::OnHold.precedes_execution());
    }

    #[test]
    fn action_ids_are_unique() {
        let ids: HashSet<_> = ActionName::ALL.iter().map(|action| action.as_str()).collect();
        assert_eq!(ids.len(), ActionName::ALL.len());
    }

    #[test]
    fn stage_serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&Stage::RevisionRequested).expect("serialize");
        assert_eq!(json, "\"REVISION_REQUESTED\"");
    }
}
