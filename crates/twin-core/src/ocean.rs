//! Big Five (OCEAN) personality traits of a simulated consumer.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// OCEAN (Big Five) personality trait scores.
/// Each trait lies in the closed interval [0.0, 1.0]; construction rejects
/// anything else instead of clamping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PersonalityTraits {
    /// Openness to Experience: curiosity, appetite for novel products
    openness: f64,

    /// Conscientiousness: deliberate, budget-aware purchasing
    conscientiousness: f64,

    /// Extraversion: sociability, responsiveness to social proof
    extraversion: f64,

    /// Agreeableness: trust in the seller, compliance
    agreeableness: f64,

    /// Neuroticism: anxiety, risk aversion
    neuroticism: f64,
}

impl PersonalityTraits {
    pub fn new(
        openness: f64,
        conscientiousness: f64,
        extraversion: f64,
        agreeableness: f64,
        neuroticism: f64,
    ) -> Result<Self> {
        Ok(Self {
            openness: check(OceanTrait::Openness, openness)?,
            conscientiousness: check(OceanTrait::Conscientiousness, conscientiousness)?,
            extraversion: check(OceanTrait::Extraversion, extraversion)?,
            agreeableness: check(OceanTrait::Agreeableness, agreeableness)?,
            neuroticism: check(OceanTrait::Neuroticism, neuroticism)?,
        })
    }

    /// All traits at 0.5, used when a source carries no psychographics.
    pub fn neutral() -> Self {
        Self {
            openness: 0.5,
            conscientiousness: 0.5,
            extraversion: 0.5,
            agreeableness: 0.5,
            neuroticism: 0.5,
        }
    }

    pub fn openness(&self) -> f64 {
        self.openness
    }

    pub fn conscientiousness(&self) -> f64 {
        self.conscientiousness
    }

    pub fn extraversion(&self) -> f64 {
        self.extraversion
    }

    pub fn agreeableness(&self) -> f64 {
        self.agreeableness
    }

    pub fn neuroticism(&self) -> f64 {
        self.neuroticism
    }

    pub fn get(&self, t: OceanTrait) -> f64 {
        match t {
            OceanTrait::Openness => self.openness,
            OceanTrait::Conscientiousness => self.conscientiousness,
            OceanTrait::Extraversion => self.extraversion,
            OceanTrait::Agreeableness => self.agreeableness,
            OceanTrait::Neuroticism => self.neuroticism,
        }
    }

    /// Traits quoted in the persona statement, in order.
    pub fn decision_relevant(&self) -> [(OceanTrait, f64); 3] {
        OceanTrait::DECISION_RELEVANT.map(|t| (t, self.get(t)))
    }

    /// Convert to feature vector
    pub fn to_vector(&self) -> [f64; 5] {
        [
            self.openness,
            self.conscientiousness,
            self.extraversion,
            self.agreeableness,
            self.neuroticism,
        ]
    }

    /// Create from feature vector
    pub fn from_vector(v: &[f64]) -> Result<Self> {
        if v.len() < 5 {
            return Err(Error::InvalidInput(format!(
                "expected 5 trait values, got {}",
                v.len()
            )));
        }
        Self::new(v[0], v[1], v[2], v[3], v[4])
    }
}

impl Default for PersonalityTraits {
    fn default() -> Self {
        Self::neutral()
    }
}

fn check(t: OceanTrait, value: f64) -> Result<f64> {
    // NaN fails the range check as well
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(Error::InvalidTrait {
            name: t.column(),
            value,
        })
    }
}

/// Individual OCEAN trait enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OceanTrait {
    Openness,
    Conscientiousness,
    Extraversion,
    Agreeableness,
    Neuroticism,
}

impl OceanTrait {
    pub const ALL: [OceanTrait; 5] = [
        OceanTrait::Openness,
        OceanTrait::Conscientiousness,
        OceanTrait::Extraversion,
        OceanTrait::Agreeableness,
        OceanTrait::Neuroticism,
    ];

    pub const DECISION_RELEVANT: [OceanTrait; 3] = [
        OceanTrait::Openness,
        OceanTrait::Conscientiousness,
        OceanTrait::Agreeableness,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OceanTrait::Openness => "Openness",
            OceanTrait::Conscientiousness => "Conscientiousness",
            OceanTrait::Extraversion => "Extraversion",
            OceanTrait::Agreeableness => "Agreeableness",
            OceanTrait::Neuroticism => "Neuroticism",
        }
    }

    /// Column name in the population file format
    pub fn column(&self) -> &'static str {
        match self {
            OceanTrait::Openness => "openness",
            OceanTrait::Conscientiousness => "conscientiousness",
            OceanTrait::Extraversion => "extraversion",
            OceanTrait::Agreeableness => "agreeableness",
            OceanTrait::Neuroticism => "neuroticism",
        }
    }
}
