//! Channel catalogue: the promotional channels and their economic profiles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BudgetError, Result};

/// Promotional channel. The order of the variants is the default table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Channel {
    #[serde(rename = "Field Force")]
    FieldForce,
    #[serde(rename = "Digital")]
    Digital,
    #[serde(rename = "Speaker Programs")]
    SpeakerPrograms,
    #[serde(rename = "Medical Education")]
    MedicalEducation,
    #[serde(rename = "Conferences")]
    Conferences,
    #[serde(rename = "Direct Mail")]
    DirectMail,
}

impl Channel {
    pub const ALL: [Channel; 6] = [
        Channel::FieldForce,
        Channel::Digital,
        Channel::SpeakerPrograms,
        Channel::MedicalEducation,
        Channel::Conferences,
        Channel::DirectMail,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Channel::FieldForce => "Field Force",
            Channel::Digital => "Digital",
            Channel::SpeakerPrograms => "Speaker Programs",
            Channel::MedicalEducation => "Medical Education",
            Channel::Conferences => "Conferences",
            Channel::DirectMail => "Direct Mail",
        }
    }

    /// Parse a channel name. Case, `-`, `_` and spaces are ignored, so
    /// "Field Force", "field_force" and "FIELD-FORCE" all match.
    pub fn parse(s: &str) -> Result<Channel> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let channel = match key.as_str() {
            "fieldforce" => Channel::FieldForce,
            "digital" => Channel::Digital,
            "speakerprograms" => Channel::SpeakerPrograms,
            "medicaleducation" => Channel::MedicalEducation,
            "conferences" => Channel::Conferences,
            "directmail" => Channel::DirectMail,
            _ => {
                return Err(BudgetError::UnknownChannel {
                    name: s.to_string(),
                })
            }
        };
        Ok(channel)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = BudgetError;

    fn from_str(s: &str) -> Result<Self> {
        Channel::parse(s)
    }
}

/// Shape of the ROI-vs-spend curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseType {
    Logarithmic,
    LinearPlateau,
    ExponentialDecay,
    StepFunction,
    Linear,
}

/// Static economic constants for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    /// Nominal return multiplier at low spend.
    pub base_roi: f64,
    /// Spend level beyond which returns sharply diminish.
    pub saturation_spend: f64,
    /// Floor below which the channel should not be funded.
    pub min_spend: f64,
    pub response_type: ResponseType,
    /// Marginal HCP audience reached per dollar.
    pub reach_per_dollar: f64,
    /// Multiplicative adjustment on raw ROI, in [0, 1].
    pub quality_score: f64,
}

impl ChannelProfile {
    pub fn validate(&self, channel: Channel) -> Result<()> {
        let invalid = |reason: &str| BudgetError::InvalidProfile {
            channel: channel.to_string(),
            reason: reason.to_string(),
        };

        let numbers = [
            self.base_roi,
            self.saturation_spend,
            self.min_spend,
            self.reach_per_dollar,
            self.quality_score,
        ];
        if numbers.iter().any(|v| !v.is_finite()) {
            return Err(invalid("all values must be finite"));
        }
        if self.saturation_spend <= 0.0 {
            return Err(invalid("saturation spend must be positive"));
        }
        if self.min_spend < 0.0 {
            return Err(invalid("minimum spend must not be negative"));
        }
        if self.min_spend > self.saturation_spend {
            return Err(invalid("minimum spend exceeds saturation spend"));
        }
        if !(0.0..=1.0).contains(&self.quality_score) {
            return Err(invalid("quality score must be within [0, 1]"));
        }
        if self.base_roi < 0.0 || self.reach_per_dollar < 0.0 {
            return Err(invalid("ROI and reach must not be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileRow {
    channel: Channel,
    #[serde(flatten)]
    profile: ChannelProfile,
}

/// Ordered, validated set of channel profiles.
///
/// Iteration order is significant: it is the tie-break order of the
/// allocator.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelProfileTable {
    entries: Vec<(Channel, ChannelProfile)>,
}

impl ChannelProfileTable {
    pub fn new(entries: Vec<(Channel, ChannelProfile)>) -> Result<Self> {
        for (i, (channel, profile)) in entries.iter().enumerate() {
            if entries[..i].iter().any(|(c, _)| c == channel) {
                return Err(BudgetError::DuplicateChannel {
                    channel: channel.to_string(),
                });
            }
            profile.validate(*channel)?;
        }
        Ok(Self { entries })
    }

    /// Load a table from a JSON array of `{ "channel": ..., <profile> }` rows.
    pub fn from_json(raw: &str) -> Result<Self> {
        let rows: Vec<ProfileRow> = serde_json::from_str(raw)?;
        Self::new(rows.into_iter().map(|r| (r.channel, r.profile)).collect())
    }

    pub fn to_json(&self) -> Result<String> {
        let rows: Vec<ProfileRow> = self
            .entries
            .iter()
            .map(|(channel, profile)| ProfileRow {
                channel: *channel,
                profile: *profile,
            })
            .collect();
        Ok(serde_json::to_string_pretty(&rows)?)
    }

    pub fn get(&self, channel: Channel) -> Option<&ChannelProfile> {
        self.entries
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|(_, p)| p)
    }

    pub fn contains(&self, channel: Channel) -> bool {
        self.get(channel).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, &ChannelProfile)> + '_ {
        self.entries.iter().map(|(c, p)| (*c, p))
    }

    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.entries.iter().map(|(c, _)| *c)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_min_spend(&self) -> f64 {
        self.entries.iter().map(|(_, p)| p.min_spend).sum()
    }

    /// Demo snapshot of current spend, 47M in total.
    pub fn default_current_budgets() -> Vec<(Channel, f64)> {
        vec![
            (Channel::FieldForce, 22_000_000.0),
            (Channel::Digital, 6_000_000.0),
            (Channel::SpeakerPrograms, 7_000_000.0),
            (Channel::MedicalEducation, 4_000_000.0),
            (Channel::Conferences, 5_000_000.0),
            (Channel::DirectMail, 3_000_000.0),
        ]
    }
}

impl Default for ChannelProfileTable {
    fn default() -> Self {
        let profile = |roi, saturation, min, response_type, reach, quality| ChannelProfile {
            base_roi: roi,
            saturation_spend: saturation,
            min_spend: min,
            response_type,
            reach_per_dollar: reach,
            quality_score: quality,
        };
        Self {
            entries: vec![
                (
                    Channel::FieldForce,
                    profile(
                        3.2,
                        25_000_000.0,
                        8_000_000.0,
                        ResponseType::Logarithmic,
                        0.0008,
                        0.85,
                    ),
                ),
                (
                    Channel::Digital,
                    profile(
                        4.1,
                        12_000_000.0,
                        2_000_000.0,
                        ResponseType::ExponentialDecay,
                        0.003,
                        0.78,
                    ),
                ),
                (
                    Channel::SpeakerPrograms,
                    profile(
                        2.8,
                        8_000_000.0,
                        1_500_000.0,
                        ResponseType::StepFunction,
                        0.0004,
                        0.90,
                    ),
                ),
                (
                    Channel::MedicalEducation,
                    profile(
                        3.5,
                        7_000_000.0,
                        1_000_000.0,
                        ResponseType::LinearPlateau,
                        0.0006,
                        0.92,
                    ),
                ),
                (
                    Channel::Conferences,
                    profile(1.9, 6_000_000.0, 1_000_000.0, ResponseType::Linear, 0.0003, 0.70),
                ),
                (
                    Channel::DirectMail,
                    profile(1.6, 3_000_000.0, 300_000.0, ResponseType::Linear, 0.002, 0.65),
                ),
            ],
        }
    }
}
