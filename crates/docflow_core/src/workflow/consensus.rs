//! Reviewer consensus for the final review stage.
//!
//! # Responsibility
//! - Build the required reviewer set when a document enters FINAL_REVIEW.
//! - Record individual approve/reject decisions.
//! - Decide whether the cycle is still open, approved or bounced.
//!
//! # Invariants
//! - A fresh cycle has one PENDING entry per configured reviewer role.
//! - Only PENDING entries accept a decision; decided entries never change.
//! - A single rejection ends the cycle regardless of remaining entries.

use crate::directory::DirectoryProvider;
use crate::model::correspondence::{ReviewStatus, Reviewer};
use crate::model::role::FunctionalRoleTag;
use crate::model::stage::ActionName;
use crate::model::user::UserId;
use crate::workflow::action::ReviewDecision;
use crate::workflow::error::TransitionError;

/// State of a review cycle after a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsensusOutcome {
    /// Some entries are still pending and none rejected.
    Pending,
    /// Every entry approved.
    Reached,
    /// At least one entry rejected.
    Bounced,
}

/// Resolves the required reviewer set for a new cycle.
///
/// Returns `ReviewerUnresolved` when any configured position is vacant.
pub fn initialize_reviewers<D: DirectoryProvider + ?Sized>(
    required_roles: &[FunctionalRoleTag],
    directory: &D,
) -> Result<Vec<Reviewer>, TransitionError> {
    required_roles
        .iter()
        .map(|tag| {
            directory
                .functional_role_holder(tag)
                .map(|holder| Reviewer::pending(holder.id, tag.clone()))
                .ok_or_else(|| TransitionError::ReviewerUnresolved(tag.clone()))
        })
        .collect()
}

/// Applies one reviewer's decision to every pending entry they hold.
///
/// A user holding two functional positions decides for both at once.
pub fn record_decision(
    reviewers: &mut [Reviewer],
    reviewer_id: UserId,
    decision: ReviewDecision,
    comment: Option<&str>,
) -> Result<ConsensusOutcome, TransitionError> {
    let comment = comment
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    let holds_pending = reviewers
        .iter()
        .any(|reviewer| reviewer.user_id == reviewer_id && reviewer.is_pending());
    if !holds_pending {
        return Err(TransitionError::NotAReviewer(reviewer_id));
    }
    if decision == ReviewDecision::Reject && comment.is_none() {
        return Err(TransitionError::CommentRequired(ActionName::RejectReview));
    }

    for reviewer in reviewers
        .iter_mut()
        .filter(|reviewer| reviewer.user_id == reviewer_id && reviewer.is_pending())
    {
        reviewer.status = match decision {
            ReviewDecision::Approve => ReviewStatus::Approved,
            ReviewDecision::Reject => ReviewStatus::Rejected,
        };
        reviewer.comment = comment.clone();
    }

    Ok(evaluate(reviewers))
}

/// True iff the list is non-empty and every entry approved.
pub fn is_consensus_reached(reviewers: &[Reviewer]) -> bool {
    !reviewers.is_empty()
        && reviewers
            .iter()
            .all(|reviewer| reviewer.status == ReviewStatus::Approved)
}

/// Classifies the current state of a review cycle.
pub fn evaluate(reviewers: &[Reviewer]) -> ConsensusOutcome {
    if reviewers
        .iter()
        .any(|reviewer| reviewer.status == ReviewStatus::Rejected)
    {
        return ConsensusOutcome::Bounced;
    }
    if is_consensus_reached(reviewers) {
        return ConsensusOutcome::Reached;
    }
    ConsensusOutcome::Pending
}
