//! Editorial lifecycle guard
//!
//! The status itself is owned by the editorial workflow. This module only
//! answers which moves are legal and whether pages may still change.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum EbookStatus {
    #[default]
    Draft,
    Approved,
    Rejected,
    Published,
}

impl EbookStatus {
    pub fn name(self) -> &'static str {
        match self {
            EbookStatus::Draft => "DRAFT",
            EbookStatus::Approved => "APPROVED",
            EbookStatus::Rejected => "REJECTED",
            EbookStatus::Published => "PUBLISHED",
        }
    }

    /// The one place allowed transitions are defined
    pub fn can_transition_to(self, next: EbookStatus) -> bool {
        use EbookStatus::*;
        matches!(
            (self, next),
            (Draft, Approved)
                | (Draft, Rejected)
                | (Rejected, Draft)
                | (Approved, Published)
                | (Approved, Draft)
        )
    }

    pub fn transition(self, next: EbookStatus) -> Result<EbookStatus, LifecycleViolation> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(LifecycleViolation {
                status: self,
                action: LifecycleAction::Transition(next),
            })
        }
    }

    /// Published books are frozen
    pub fn allows_page_mutation(self) -> bool {
        self != EbookStatus::Published
    }

    pub fn guard_page_mutation(self) -> Result<(), LifecycleViolation> {
        if self.allows_page_mutation() {
            Ok(())
        } else {
            Err(LifecycleViolation {
                status: self,
                action: LifecycleAction::ReplacePage,
            })
        }
    }
}

impl fmt::Display for EbookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    ReplacePage,
    Transition(EbookStatus),
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleAction::ReplacePage => f.write_str("replace a page"),
            LifecycleAction::Transition(next) => write!(f, "move to {}", next),
        }
    }
}

/// A mutation attempted in a status that forbids it
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Lifecycle violation: cannot {action} while ebook is {status}")]
pub struct LifecycleViolation {
    pub status: EbookStatus,
    pub action: LifecycleAction,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [EbookStatus; 4] = [
        EbookStatus::Draft,
        EbookStatus::Approved,
        EbookStatus::Rejected,
        EbookStatus::Published,
    ];

    #[test]
    fn published_is_terminal() {
        for next in ALL {
            assert!(!EbookStatus::Published.can_transition_to(next));
        }
        assert!(!EbookStatus::Published.allows_page_mutation());
    }

    #[test]
    fn editorial_loop() {
        let status = EbookStatus::Draft
            .transition(EbookStatus::Rejected)
            .and_then(|s| s.transition(EbookStatus::Draft))
            .and_then(|s| s.transition(EbookStatus::Approved))
            .and_then(|s| s.transition(EbookStatus::Published))
            .unwrap();
        assert_eq!(status, EbookStatus::Published);
    }

    #[test]
    fn draft_cannot_skip_to_published() {
        let err = EbookStatus::Draft
            .transition(EbookStatus::Published)
            .unwrap_err();
        assert_eq!(err.status, EbookStatus::Draft);
        assert_eq!(
            err.action,
            LifecycleAction::Transition(EbookStatus::Published)
        );
    }

    #[test]
    fn no_self_transitions() {
        for status in ALL {
            assert!(!status.can_transition_to(status));
        }
    }
}
