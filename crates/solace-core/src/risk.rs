//! Keyword-based risk scoring over a recent conversation window.
//!
//! Deliberately simple and auditable: every factor names the exact match
//! that contributed, so a family-facing alert can always be explained.
//! False positives are acceptable because the output only drives a
//! human-facing alert, never an automated action.

use solace_protocol::{ChatMessage, RiskLevel, RiskResult, Role};

/// Only the most recent messages are considered, never the full history.
const WINDOW: usize = 20;

/// Each occurrence adds `CRITICAL_WEIGHT` on its own (no de-duplication).
const CRITICAL_KEYWORDS: [&str; 10] = [
    "help", "pain", "emergency", "fall", "bleeding", "chest", "suicide", "die", "kill", "hurt",
];
const CRITICAL_WEIGHT: u32 = 50;

/// Counted once per message; three such messages add `NEGATIVE_MOOD_WEIGHT`.
const ELEVATED_KEYWORDS: [&str; 7] = [
    "sad", "lonely", "depressed", "scared", "afraid", "nobody", "alone",
];
const NEGATIVE_MOOD_THRESHOLD: u32 = 3;
const NEGATIVE_MOOD_WEIGHT: u32 = 30;

/// Evaluate risk over an ordered message window.
///
/// Pure function: same window in, same result out. Only user-authored
/// text within the last 20 messages contributes to the score.
pub fn assess(messages: &[ChatMessage]) -> RiskResult {
    if messages.is_empty() {
        return RiskResult::safe();
    }

    let start = messages.len().saturating_sub(WINDOW);
    let mut weight = 0u32;
    let mut factors = Vec::new();
    let mut negative_messages = 0u32;

    for message in &messages[start..] {
        if message.role != Role::User {
            continue;
        }
        let text = message.content.to_lowercase();

        for keyword in CRITICAL_KEYWORDS {
            if text.contains(keyword) {
                weight += CRITICAL_WEIGHT;
                factors.push(format!("critical keyword \"{keyword}\""));
            }
        }

        if ELEVATED_KEYWORDS.iter().any(|keyword| text.contains(keyword)) {
            negative_messages += 1;
        }
    }

    if negative_messages >= NEGATIVE_MOOD_THRESHOLD {
        weight += NEGATIVE_MOOD_WEIGHT;
        factors.push(format!(
            "{negative_messages} recent messages with negative mood"
        ));
    }

    RiskResult {
        level: level_for(weight),
        factors,
    }
}

/// Map accumulated weight to a severity level.
fn level_for(weight: u32) -> RiskLevel {
    if weight >= 50 {
        RiskLevel::Critical
    } else if weight >= 30 {
        RiskLevel::High
    } else if weight >= 10 {
        RiskLevel::Monitor
    } else {
        RiskLevel::Safe
    }
}

#[cfg(test)]
mod tests {
    use super::{assess, level_for};
    use pretty_assertions::assert_eq;
    use solace_protocol::{ChatMessage, RiskLevel, RiskResult};

    fn user(content: &str) -> ChatMessage {
        ChatMessage::user("elder-1", content)
    }

    #[test]
    fn empty_window_is_safe_with_no_factors() {
        assert_eq!(assess(&[]), RiskResult::safe());
    }

    #[test]
    fn single_critical_keyword_escalates_to_critical() {
        let result = assess(&[user("I need help right now")]);
        assert_eq!(result.level, RiskLevel::Critical);
        assert_eq!(result.factors, vec!["critical keyword \"help\"".to_string()]);
    }

    #[test]
    fn chest_pain_matches_two_keywords() {
        let result = assess(&[user("I feel chest pain")]);
        assert_eq!(result.level, RiskLevel::Critical);
        assert_eq!(
            result.factors,
            vec![
                "critical keyword \"pain\"".to_string(),
                "critical keyword \"chest\"".to_string(),
            ]
        );
    }

    #[test]
    fn three_negative_messages_reach_high() {
        let result = assess(&[
            user("I feel so lonely"),
            user("nobody visits me"),
            user("I am scared"),
        ]);
        assert_eq!(result.level, RiskLevel::High);
        assert_eq!(
            result.factors,
            vec!["3 recent messages with negative mood".to_string()]
        );
    }

    #[test]
    fn two_negative_messages_stay_safe() {
        let result = assess(&[user("I feel sad today"), user("so alone tonight")]);
        assert_eq!(result.level, RiskLevel::Safe);
        assert!(result.factors.is_empty());
    }

    #[test]
    fn assistant_messages_never_contribute() {
        let result = assess(&[ChatMessage::assistant(
            "elder-1",
            "Falling asleep can be hard, call for help if you are in pain.",
        )]);
        assert_eq!(result, RiskResult::safe());
    }

    #[test]
    fn only_the_last_twenty_messages_are_scanned() {
        let mut messages = vec![user("there was an emergency last month")];
        messages.extend((0..20).map(|i| user(&format!("talking about the garden {i}"))));
        let result = assess(&messages);
        assert_eq!(result, RiskResult::safe());
    }

    #[test]
    fn assessment_is_idempotent() {
        let window = vec![user("I feel lonely"), user("my chest hurts")];
        assert_eq!(assess(&window), assess(&window));
    }

    #[test]
    fn weight_thresholds_sit_at_exact_boundaries() {
        assert_eq!(level_for(0), RiskLevel::Safe);
        assert_eq!(level_for(9), RiskLevel::Safe);
        assert_eq!(level_for(10), RiskLevel::Monitor);
        assert_eq!(level_for(29), RiskLevel::Monitor);
        assert_eq!(level_for(30), RiskLevel::High);
        assert_eq!(level_for(49), RiskLevel::High);
        assert_eq!(level_for(50), RiskLevel::Critical);
    }
}
