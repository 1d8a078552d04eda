//! Market segment classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label given to agents synthesized for a targeted cohort.
pub const CUSTOM_TARGET_LABEL: &str = "Custom Target";

/// Demographic/behavioral cohort a consumer belongs to.
///
/// The four named segments carry sampling tables in the population builder.
/// `Unknown` is what label lookup falls back to, and `Custom` marks agents
/// built from ad-hoc constraints rather than a segment table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketSegment {
    GenZStudent,
    CorporateProfessional,
    SeniorCitizen,
    TechEarlyAdopter,
    Unknown,
    Custom(String),
}

impl MarketSegment {
    /// Segments that can be sampled from a demographic table.
    pub const NAMED: [MarketSegment; 4] = [
        MarketSegment::GenZStudent,
        MarketSegment::CorporateProfessional,
        MarketSegment::SeniorCitizen,
        MarketSegment::TechEarlyAdopter,
    ];

    /// Exact, case-sensitive lookup by display label. Never fails.
    pub fn from_label(label: &str) -> Self {
        Self::NAMED
            .into_iter()
            .find(|s| s.label() == label)
            .unwrap_or(MarketSegment::Unknown)
    }

    pub fn targeted() -> Self {
        MarketSegment::Custom(CUSTOM_TARGET_LABEL.to_string())
    }

    pub fn label(&self) -> &str {
        match self {
            MarketSegment::GenZStudent => "Gen Z Student",
            MarketSegment::CorporateProfessional => "Corporate Professional",
            MarketSegment::SeniorCitizen => "Senior Citizen",
            MarketSegment::TechEarlyAdopter => "Tech Early Adopter",
            MarketSegment::Unknown => "Unknown",
            MarketSegment::Custom(label) => label,
        }
    }
}

impl fmt::Display for MarketSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
