//! Local mood heuristics, decoupled from the risk assessor.
//!
//! The detected mood drives reply tone and family mood alerts; escalation
//! is the risk assessor's job. The two signals are intentionally not
//! reconciled, so one word choice cannot both change the reply tone and
//! fire a risk alert.

use solace_protocol::Mood;
use std::str::FromStr;

const HAPPY_WORDS: [&str; 6] = ["happy", "great", "wonderful", "lovely", "glad", "joy"];
const SAD_WORDS: [&str; 5] = ["sad", "unhappy", "down", "miss", "cry"];
const ANXIOUS_WORDS: [&str; 5] = ["worried", "anxious", "nervous", "scared", "afraid"];
const LONELY_WORDS: [&str; 3] = ["lonely", "alone", "nobody"];
const DISTRESSED_WORDS: [&str; 4] = ["pain", "hurt", "help", "emergency"];

/// Detect a mood from the elder's text via substring matching.
///
/// Word sets are checked in severity order, so "I'm happy you called,
/// my chest hurts" resolves to distressed rather than happy.
pub fn detect_mood(text: &str) -> Option<Mood> {
    let text = text.to_lowercase();
    let contains = |words: &[&str]| words.iter().any(|word| text.contains(word));

    if contains(&DISTRESSED_WORDS) {
        Some(Mood::Distressed)
    } else if contains(&LONELY_WORDS) {
        Some(Mood::Lonely)
    } else if contains(&ANXIOUS_WORDS) {
        Some(Mood::Anxious)
    } else if contains(&SAD_WORDS) {
        Some(Mood::Sad)
    } else if contains(&HAPPY_WORDS) {
        Some(Mood::Happy)
    } else {
        None
    }
}

/// Coarse sentiment score in [-1.0, 1.0] for message metadata.
pub fn sentiment_for(mood: Option<Mood>) -> f32 {
    match mood {
        Some(Mood::Happy) => 0.6,
        Some(Mood::Sad) => -0.6,
        Some(Mood::Anxious) => -0.4,
        Some(Mood::Lonely) => -0.6,
        Some(Mood::Distressed) => -0.9,
        Some(Mood::Neutral) | None => 0.0,
    }
}

/// Whether a mood should arm a proactive follow-up.
pub fn warrants_follow_up(mood: Mood) -> bool {
    matches!(mood, Mood::Sad | Mood::Lonely | Mood::Anxious)
}

/// Coerce an external classification label into the closed mood set.
///
/// The completion service is never trusted to answer with a bare label:
/// exact matches win, then the first mood word found inside a sentence,
/// and anything else defaults to neutral.
pub fn parse_external_label(raw: &str) -> Mood {
    if let Ok(mood) = Mood::from_str(raw) {
        return mood;
    }
    let lowered = raw.to_lowercase();
    Mood::ALL
        .into_iter()
        .find(|mood| lowered.contains(mood.as_str()))
        .unwrap_or(Mood::Neutral)
}

#[cfg(test)]
mod tests {
    use super::{detect_mood, parse_external_label, sentiment_for, warrants_follow_up};
    use pretty_assertions::assert_eq;
    use solace_protocol::Mood;

    #[test]
    fn detects_loneliness_before_sadness() {
        assert_eq!(detect_mood("I feel sad and so alone"), Some(Mood::Lonely));
    }

    #[test]
    fn neutral_text_detects_nothing() {
        assert_eq!(detect_mood("the garden looks nice today"), None);
    }

    #[test]
    fn follow_up_covers_sad_lonely_anxious_only() {
        assert!(warrants_follow_up(Mood::Sad));
        assert!(warrants_follow_up(Mood::Lonely));
        assert!(warrants_follow_up(Mood::Anxious));
        assert!(!warrants_follow_up(Mood::Happy));
        assert!(!warrants_follow_up(Mood::Distressed));
    }

    #[test]
    fn external_label_parses_exact_word() {
        assert_eq!(parse_external_label("Sad"), Mood::Sad);
    }

    #[test]
    fn external_sentence_resolves_by_substring() {
        assert_eq!(
            parse_external_label("I think they look quite anxious today"),
            Mood::Anxious
        );
    }

    #[test]
    fn unparseable_external_output_defaults_to_neutral() {
        assert_eq!(parse_external_label("quite joyful overall"), Mood::Neutral);
    }

    #[test]
    fn sentiment_tracks_mood_polarity() {
        assert!(sentiment_for(Some(Mood::Happy)) > 0.0);
        assert!(sentiment_for(Some(Mood::Distressed)) < sentiment_for(Some(Mood::Sad)));
        assert_eq!(sentiment_for(None), 0.0);
    }
}
