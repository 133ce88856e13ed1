//! Feedback gating.
//!
//! Spoken feedback is tiered so praise stays meaningful: while the user is
//! failing a check only corrections are allowed, early confirmations get a
//! neutral acknowledgment, and genuine praise is reserved for the end of a
//! pose after the user has demonstrably followed corrections. Each tier
//! renders as a hard constraint line appended to outgoing coach messages.

// ============================================================================
// Feedback tiers
// ============================================================================

/// How warm the coach is allowed to be right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    /// Corrections only, no praise words at all.
    CorrectionOnly,
    /// Brief neutral acknowledgment ("OK", "Got it").
    NeutralConfirm,
    /// Real praise; the user earned it.
    EarnedPraise,
}

impl FeedbackKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CorrectionOnly => "correction_only",
            Self::NeutralConfirm => "neutral_confirm",
            Self::EarnedPraise => "earned_praise",
        }
    }

    /// Constraint line appended to outgoing messages for this tier.
    pub const fn prompt_modifier(&self) -> &'static str {
        match self {
            Self::CorrectionOnly => {
                "\nRULE: Do NOT praise. Only give the correction instruction. No 'great', 'perfect', 'amazing'."
            }
            Self::NeutralConfirm => {
                "\nRULE: Brief acknowledgment only. Say 'OK' or 'Got it' or 'Next'. Do NOT say great/perfect/amazing/beautiful."
            }
            Self::EarnedPraise => "\nYou can genuinely praise - they earned it!",
        }
    }
}

impl std::fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Decision table
// ============================================================================

/// Pick the feedback tier from live session facts, most restrictive first.
///
/// `watching_failed` is true while the machine is watching and the latest
/// check did not pass; `remaining_steps` counts the current step and
/// everything after it.
pub(crate) fn classify(
    watching_failed: bool,
    corrections_followed: u32,
    remaining_steps: usize,
) -> FeedbackKind {
    if watching_failed {
        return FeedbackKind::CorrectionOnly;
    }
    if corrections_followed < 2 {
        return FeedbackKind::NeutralConfirm;
    }
    if remaining_steps > 1 {
        return FeedbackKind::NeutralConfirm;
    }
    FeedbackKind::EarnedPraise
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failing_check_always_restricts_to_corrections() {
        assert_eq!(classify(true, 0, 3), FeedbackKind::CorrectionOnly);
        assert_eq!(classify(true, 5, 1), FeedbackKind::CorrectionOnly);
    }

    #[test]
    fn praise_requires_followed_corrections_and_final_step() {
        assert_eq!(classify(false, 0, 1), FeedbackKind::NeutralConfirm);
        assert_eq!(classify(false, 1, 1), FeedbackKind::NeutralConfirm);
        assert_eq!(classify(false, 2, 2), FeedbackKind::NeutralConfirm);
        assert_eq!(classify(false, 2, 1), FeedbackKind::EarnedPraise);
        assert_eq!(classify(false, 3, 0), FeedbackKind::EarnedPraise);
    }

    #[test]
    fn modifier_lines_are_rendered_verbatim() {
        assert_eq!(
            FeedbackKind::CorrectionOnly.prompt_modifier(),
            "\nRULE: Do NOT praise. Only give the correction instruction. No 'great', 'perfect', 'amazing'."
        );
        assert_eq!(
            FeedbackKind::NeutralConfirm.prompt_modifier(),
            "\nRULE: Brief acknowledgment only. Say 'OK' or 'Got it' or 'Next'. Do NOT say great/perfect/amazing/beautiful."
        );
        assert_eq!(
            FeedbackKind::EarnedPraise.prompt_modifier(),
            "\nYou can genuinely praise - they earned it!"
        );
    }

    #[test]
    fn wire_names() {
        assert_eq!(FeedbackKind::CorrectionOnly.as_str(), "correction_only");
        assert_eq!(FeedbackKind::NeutralConfirm.as_str(), "neutral_confirm");
        assert_eq!(FeedbackKind::EarnedPraise.as_str(), "earned_praise");
    }
}
