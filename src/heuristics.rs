//! Heuristic flags for local parts that look machine-generated.

use std::collections::HashSet;
use std::fmt;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Local parts this short are never scored.
pub const MIN_SCORED_LEN: usize = 6;

const CONSONANTS: &str = "bcdfghjklmnpqrstvwxyz";
const CONSONANT_RUN: usize = 5;
const KEYBOARD_ROWS: [&str; 3] = ["qwertyuiop", "asdfghjkl", "zxcvbnm"];
const KEYBOARD_WINDOW: usize = 4;

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspicionReason {
    ConsecutiveConsonants,
    HighDigitRatio,
    HighSpecialCharRatio,
    KeyboardPattern,
    HighEntropy,
}

impl SuspicionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConsecutiveConsonants => "consecutive consonants",
            Self::HighDigitRatio => "high digit ratio",
            Self::HighSpecialCharRatio => "high special char ratio",
            Self::KeyboardPattern => "keyboard pattern",
            Self::HighEntropy => "high entropy",
        }
    }
}

impl fmt::Display for SuspicionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Suspicion {
    pub suspicious: bool,
    pub reason: Option<SuspicionReason>,
}

impl Suspicion {
    fn flagged(reason: SuspicionReason) -> Self {
        Self {
            suspicious: true,
            reason: Some(reason),
        }
    }

    /// Reason text, empty when not suspicious.
    pub fn reason_text(&self) -> &'static str {
        self.reason.map(|r| r.as_str()).unwrap_or("")
    }
}

/// Scores `local`; the first matching rule wins, in declaration order of
/// [`SuspicionReason`].
pub fn score_local_part(local: &str) -> Suspicion {
    let len = local.chars().count();
    if len < MIN_SCORED_LEN {
        return Suspicion::default();
    }
    let lower = local.to_lowercase();

    if longest_consonant_run(&lower) >= CONSONANT_RUN {
        return Suspicion::flagged(SuspicionReason::ConsecutiveConsonants);
    }

    let digits = local.chars().filter(char::is_ascii_digit).count();
    let specials = local.chars().filter(|c| !c.is_alphanumeric()).count();
    let ratio = |count: usize| count as f64 / len as f64;

    if ratio(digits) > 0.5 && len > 8 {
        return Suspicion::flagged(SuspicionReason::HighDigitRatio);
    }
    if ratio(specials) > 0.3 {
        return Suspicion::flagged(SuspicionReason::HighSpecialCharRatio);
    }
    if has_keyboard_walk(&lower) {
        return Suspicion::flagged(SuspicionReason::KeyboardPattern);
    }

    let distinct: HashSet<char> = lower.chars().collect();
    if ratio(distinct.len()) > 0.8 && len > 10 {
        return Suspicion::flagged(SuspicionReason::HighEntropy);
    }

    Suspicion::default()
}

fn longest_consonant_run(lower: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in lower.chars() {
        if CONSONANTS.contains(c) {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn has_keyboard_walk(lower: &str) -> bool {
    KEYBOARD_ROWS.iter().any(|row| {
        (0..=row.len() - KEYBOARD_WINDOW)
            .map(|i| &row[i..i + KEYBOARD_WINDOW])
            .any(|pattern| lower.contains(pattern))
    })
}
