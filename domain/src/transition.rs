//! Status transition guard: the finite state machine over concept statuses.
//!
//! Any status-changing entry point must pass [`guard_transition`] before
//! mutating; a rejected transition never reaches audience resolution, cache
//! work, or notification fan-out.

use crate::error::{Error, ValidationErrorKind};
use entity::ConceptStatus;

/// The allowed transition graph. No self-transitions.
const TRANSITIONS: &[(ConceptStatus, &[ConceptStatus])] = &[
    (
        ConceptStatus::Active,
        &[
            ConceptStatus::Finalized,
            ConceptStatus::Disabled,
            ConceptStatus::Deleted,
        ],
    ),
    (
        ConceptStatus::Finalized,
        &[ConceptStatus::Active, ConceptStatus::Deleted],
    ),
    (
        ConceptStatus::Disabled,
        &[ConceptStatus::Active, ConceptStatus::Deleted],
    ),
    (ConceptStatus::Deleted, &[ConceptStatus::Active]),
];

/// The statuses reachable from `from` in one step.
pub fn allowed_transitions(from: ConceptStatus) -> &'static [ConceptStatus] {
    TRANSITIONS
        .iter()
        .find(|(status, _)| *status == from)
        .map(|(_, targets)| *targets)
        .unwrap_or(&[])
}

/// Pure lookup into the transition table. Self-transitions are never allowed.
pub fn can_transition(from: ConceptStatus, to: ConceptStatus) -> bool {
    from != to && allowed_transitions(from).contains(&to)
}

/// Fails with `InvalidStatusTransition` when the requested change is not an
/// edge of the graph.
pub fn guard_transition(current: ConceptStatus, requested: ConceptStatus) -> Result<(), Error> {
    if can_transition(current, requested) {
        Ok(())
    } else {
        Err(Error::validation(
            ValidationErrorKind::InvalidStatusTransition {
                from: current,
                to: requested,
            },
        ))
    }
}
