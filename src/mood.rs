//! # Mood Classification Module
//!
//! Maps free text (typed or transcribed) to one of a fixed set of moods by a
//! plain keyword containment test. There is no scoring: the first mood in
//! [`Mood::ALL`] order with a matching keyword wins, and text that matches
//! nothing is treated as [`Mood::Calm`].
//!
//! Each mood also owns a display [`Theme`] which only the presentation layer
//! looks at.
//!
//! ## Example
//!
//! ```
//! use moodplay::mood::{detect_mood, Mood};
//!
//! assert_eq!(detect_mood("I feel so happy and excited today"), Mood::Happy);
//! assert_eq!(detect_mood("I am furious and mad"), Mood::Angry);
//! assert_eq!(detect_mood("nothing"), Mood::Calm);
//! ```

use clap::ValueEnum;
use log::trace;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Emotional state used to pick music and AI prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Calm,
    Energetic,
    Angry,
}

/// 24-bit colour, kept as components so terminals can render it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

/// Colours and emoji shown while a mood is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub background: Rgb,
    pub foreground: Rgb,
    pub emoji: &'static str,
}

impl Theme {
    /// Theme used before any mood has been detected.
    pub const DEFAULT: Theme = Theme {
        background: Rgb(0xF7, 0xF9, 0xFC),
        foreground: Rgb(0x2C, 0x3E, 0x50),
        emoji: "🎵",
    };
}

impl Default for Theme {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Mood {
    /// Every mood, in classification order. Order is the tie-break.
    pub const ALL: [Mood; 5] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Calm,
        Mood::Energetic,
        Mood::Angry,
    ];

    /// Lower-case label. Also the substring that tags a track file.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Calm => "calm",
            Mood::Energetic => "energetic",
            Mood::Angry => "angry",
        }
    }

    /// Trigger words for this mood.
    #[must_use]
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Mood::Happy => &["happy", "joy", "love", "excited", "fun", "awesome"],
            Mood::Sad => &["sad", "cry", "broken", "depressed", "alone", "pain"],
            Mood::Calm => &["calm", "peace", "relax", "chill", "soothing"],
            Mood::Energetic => &["energy", "boost", "workout", "active", "power", "focus"],
            Mood::Angry => &["angry", "mad", "furious", "rage", "annoyed", "irritated"],
        }
    }

    #[must_use]
    pub fn theme(self) -> Theme {
        match self {
            Mood::Happy => Theme {
                background: Rgb(0xFF, 0xF9, 0xC4),
                foreground: Rgb(0x33, 0x33, 0x33),
                emoji: "😄",
            },
            Mood::Sad => Theme {
                background: Rgb(0xBB, 0xDE, 0xFB),
                foreground: Rgb(0x0D, 0x47, 0xA1),
                emoji: "😢",
            },
            Mood::Calm => Theme {
                background: Rgb(0xE0, 0xF2, 0xF1),
                foreground: Rgb(0x00, 0x4D, 0x40),
                emoji: "😌",
            },
            Mood::Energetic => Theme {
                background: Rgb(0xFF, 0xCD, 0xD2),
                foreground: Rgb(0xB7, 0x1C, 0x1C),
                emoji: "💥",
            },
            Mood::Angry => Theme {
                background: Rgb(0xFF, 0x8A, 0x80),
                foreground: Rgb(0xBF, 0x36, 0x0C),
                emoji: "😡",
            },
        }
    }

    /// First keyword of this mood found in already lower-cased `text`.
    #[must_use]
    pub fn matches(self, lowered: &str) -> Option<&'static str> {
        self.keywords()
            .iter()
            .copied()
            .find(|keyword| lowered.contains(keyword))
    }

    /// Label with the first letter upper-cased, for status lines.
    #[must_use]
    pub fn title(self) -> String {
        let label = self.label();
        let mut chars = label.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a string is not a mood label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mood `{0}` (expected one of: happy, sad, calm, energetic, angry)")]
pub struct UnknownMood(pub String);

impl FromStr for Mood {
    type Err = UnknownMood;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Mood::ALL
            .into_iter()
            .find(|mood| mood.label() == wanted)
            .ok_or_else(|| UnknownMood(s.to_string()))
    }
}

/// Classify `text` into a mood.
///
/// Lower-cases the input and walks [`Mood::ALL`] in order, returning the
/// first mood with any keyword occurring as a substring. Falls back to
/// [`Mood::Calm`] when nothing matches.
///
/// Callers are expected to reject empty input before calling this.
#[must_use]
pub fn detect_mood(text: &str) -> Mood {
    let lowered = text.to_lowercase();

    for mood in Mood::ALL {
        if let Some(keyword) = mood.matches(&lowered) {
            trace!("Keyword `{keyword}' selected mood `{mood}'.");
            return mood;
        }
    }

    trace!("No keyword matched, defaulting to calm.");
    Mood::Calm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_mood_keywords() {
        for mood in Mood::ALL {
            for keyword in mood.keywords() {
                // A keyword may contain an earlier mood's keyword.
                let text = format!("today I am {keyword} really");
                let detected = detect_mood(&text);
                let first_owner = Mood::ALL
                    .into_iter()
                    .find(|m| m.matches(&text).is_some())
                    .unwrap();
                assert_eq!(detected, first_owner, "keyword {keyword}");
            }
        }
    }

    #[test]
    fn test_examples() {
        assert_eq!(detect_mood("I feel so happy and excited today"), Mood::Happy);
        assert_eq!(detect_mood("nothing"), Mood::Calm);
        assert_eq!(detect_mood("I am furious and mad"), Mood::Angry);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(detect_mood("FEELING DEPRESSED"), Mood::Sad);
        assert_eq!(detect_mood("Need a WorkOut playlist"), Mood::Energetic);
    }

    #[test]
    fn test_first_match_wins_by_table_order() {
        // sad + angry -> sad comes first
        assert_eq!(detect_mood("so angry I could cry"), Mood::Sad);
        // happy + energetic -> happy
        assert_eq!(detect_mood("power and joy"), Mood::Happy);
        // calm + angry -> calm
        assert_eq!(detect_mood("annoyed, need to relax"), Mood::Calm);
    }

    #[test]
    fn test_substring_not_word_match() {
        // "madness" contains "mad"
        assert_eq!(detect_mood("pure madness"), Mood::Angry);
        // "painting" contains "pain"
        assert_eq!(detect_mood("painting the fence"), Mood::Sad);
    }

    #[test]
    fn test_fallback_is_calm() {
        assert_eq!(detect_mood("the weather is grey"), Mood::Calm);
        assert_eq!(detect_mood("12345"), Mood::Calm);
    }

    #[test]
    fn test_label_round_trip_and_title() {
        for mood in Mood::ALL {
            assert_eq!(mood.label().parse::<Mood>().unwrap(), mood);
        }
        assert_eq!(" Energetic ".parse::<Mood>().unwrap(), Mood::Energetic);
        assert!("grumpy".parse::<Mood>().is_err());
        assert_eq!(Mood::Energetic.title(), "Energetic");
    }

    #[test]
    fn test_theme_hex() {
        assert_eq!(Mood::Happy.theme().background.to_string(), "#FFF9C4");
        assert_eq!(Mood::Angry.theme().foreground.to_string(), "#BF360C");
        assert_eq!(Theme::default().emoji, "🎵");
    }
}
