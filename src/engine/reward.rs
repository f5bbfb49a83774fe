use crate::engine::types::Action;

/// Deterministic scalar reward for one answer event.
///
/// `base + action_bonus + fail_penalty`, scaled by 1.5 in adaptive mode.
/// Pure function: same inputs always produce the same reward.
pub fn reward(correct: bool, action: Action, adaptive_mode: bool, consecutive_fails: u32) -> f64 {
    let base = if correct { 1.0 } else { -1.0 };
    let action_bonus = action_bonus(action);
    let fail_penalty = -0.5 * consecutive_fails as f64;

    let mut reward = base + action_bonus + fail_penalty;
    if adaptive_mode {
        reward *= 1.5;
    }
    reward
}

fn action_bonus(action: Action) -> f64 {
    match action {
        Action::ShowExplanation => 0.5,
        Action::GenerateEasy | Action::GenerateMedium | Action::GenerateHard => 1.0,
        Action::ScheduleReview => 0.2,
        Action::MarkMastered => 0.3,
        Action::NextQuestion => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_explanation_without_adaptive_mode() {
        // 1.0 + 0.5 + 0.0
        let r = reward(true, Action::ShowExplanation, false, 0);
        assert!((r - 1.5).abs() < 1e-9);
    }

    #[test]
    fn wrong_review_with_adaptive_mode_and_fails() {
        // (-1.0 + 0.2 - 1.5) * 1.5
        let r = reward(false, Action::ScheduleReview, true, 3);
        assert!((r - (-3.45)).abs() < 1e-9);
    }

    #[test]
    fn correct_practice_with_adaptive_mode() {
        // (1.0 + 1.0 + 0.0) * 1.5
        let r = reward(true, Action::GenerateMedium, true, 0);
        assert!((r - 3.0).abs() < 1e-9);
    }

    #[test]
    fn all_generate_actions_share_practice_bonus() {
        let easy = reward(true, Action::GenerateEasy, false, 0);
        let medium = reward(true, Action::GenerateMedium, false, 0);
        let hard = reward(true, Action::GenerateHard, false, 0);
        assert_eq!(easy, medium);
        assert_eq!(medium, hard);
        assert!((easy - 2.0).abs() < 1e-9);
    }

    #[test]
    fn next_question_has_no_bonus() {
        let r = reward(true, Action::NextQuestion, false, 0);
        assert!((r - 1.0).abs() < 1e-9);
    }

    #[test]
    fn mastery_bonus_applies() {
        let r = reward(true, Action::MarkMastered, false, 0);
        assert!((r - 1.3).abs() < 1e-9);
    }

    #[test]
    fn fail_penalty_never_positive() {
        for fails in 0..10 {
            let with_fails = reward(false, Action::NextQuestion, false, fails);
            let without = reward(false, Action::NextQuestion, false, 0);
            assert!(with_fails <= without);
        }
    }

    #[test]
    fn reward_is_pure() {
        for _ in 0..5 {
            assert_eq!(
                reward(false, Action::ScheduleReview, true, 3),
                reward(false, Action::ScheduleReview, true, 3)
            );
        }
    }
}
