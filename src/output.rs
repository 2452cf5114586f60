//! Structured sign output, the one artifact handed to renderers.

use crate::defaults;
use crate::landmarks::{Hand, HeadPose};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Overall affect of the signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Neutral,
    Happy,
    Sad,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Neutral => "neutral",
            Mood::Happy => "happy",
            Mood::Sad => "sad",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ManualFeatures {
    pub hands: Vec<Hand>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonManualFeatures {
    pub face_expression: BTreeMap<String, f32>,
    pub head_pose: HeadPose,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Grammar {
    pub gloss: Vec<String>,
    pub structure: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoiseFlags {
    pub tics_filtered: bool,
}

/// One frame's worth of sign description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredSignOutput {
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub manual: ManualFeatures,
    pub non_manual: NonManualFeatures,
    pub mood: Mood,
    pub grammar: Grammar,
    pub noise: NoiseFlags,
}

impl StructuredSignOutput {
    /// Assemble the output for one processed frame.
    pub fn from_inference(hands: Vec<Hand>, head_pose: Option<HeadPose>, tics_filtered: bool) -> Self {
        Self {
            timestamp: now_millis(),
            grammar: Grammar {
                gloss: gloss_for_hands(hands.len()),
                structure: Vec::new(),
            },
            manual: ManualFeatures { hands },
            non_manual: NonManualFeatures {
                face_expression: BTreeMap::new(),
                head_pose: head_pose.unwrap_or_default(),
            },
            mood: Mood::Neutral,
            noise: NoiseFlags { tics_filtered },
        }
    }

    /// Output whose gloss is the whitespace-separated words of `text`.
    pub fn from_text(text: &str) -> Self {
        Self {
            timestamp: now_millis(),
            manual: ManualFeatures::default(),
            non_manual: NonManualFeatures::default(),
            mood: Mood::Neutral,
            grammar: Grammar {
                gloss: text.split_whitespace().map(str::to_string).collect(),
                structure: Vec::new(),
            },
            noise: NoiseFlags::default(),
        }
    }

    /// Live caption: joined gloss, or `[mood]` when there is none.
    pub fn caption(&self) -> String {
        if self.grammar.gloss.is_empty() {
            format!("[{}]", self.mood)
        } else {
            self.grammar.gloss.join(" ")
        }
    }

    pub fn hand_count(&self) -> usize {
        self.manual.hands.len()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Placeholder gloss derived from the number of detected hands.
pub fn gloss_for_hands(count: usize) -> Vec<String> {
    if count == 0 {
        Vec::new()
    } else {
        vec![format!("{}{}", defaults::HAND_GLOSS_PREFIX, count)]
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
