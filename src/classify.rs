//! classify.rs — Rating structures: rounding rule, tier policy, display copy.
//!
//! The continuous model output becomes an integer score via banker's
//! rounding (`round_ties_even`, matching the reference pipeline), then one
//! of three tiers with closed boundaries at 5 and 7. Total over all finite
//! inputs; scores outside 0–10 still classify (anything below 5 is Low).

use serde::{Deserialize, Serialize};

/// Qualitative bucket for a rated sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Low,
    Mid,
    High,
}

impl Tier {
    /// Headline shown on the result card.
    pub fn label(self) -> &'static str {
        match self {
            Tier::High => "Exceptional Vintage",
            Tier::Mid => "Standard Selection",
            Tier::Low => "Substandard Profile",
        }
    }

    /// One-sentence description shown under the headline.
    pub fn detail(self) -> &'static str {
        match self {
            Tier::High => {
                "Characteristics denote a superior quality wine with complex balance."
            }
            Tier::Mid => "A consistent and approachable molecular profile.",
            Tier::Low => {
                "Measurements indicate significant imbalance in chemical structure."
            }
        }
    }

    /// Stable uppercase name, also used as the metrics label.
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Low => "LOW",
            Tier::Mid => "MID",
            Tier::High => "HIGH",
        }
    }
}

/// Integer score plus its tier. Computed fresh per submission, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub score: i32,
    pub tier: Tier,
}

/// Round, then bucket. `score >= 7` is High, `5 <= score < 7` is Mid,
/// everything below is Low.
pub fn classify(raw_score: f64) -> Rating {
    let score = raw_score.round_ties_even() as i32;
    let tier = if score >= 7 {
        Tier::High
    } else if score >= 5 {
        Tier::Mid
    } else {
        Tier::Low
    };
    Rating { score, tier }
}
