//! Demographic lookup tables driving the synthetic generators.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use twin_core::{Error, MarketSegment, Result};

/// Sampling table for one named market segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentProfile {
    pub segment: MarketSegment,
    pub min_age: u32,
    pub max_age: u32,
    pub jobs: Vec<String>,
    pub min_income: u64,
    pub max_income: u64,
}

impl SegmentProfile {
    fn new(
        segment: MarketSegment,
        ages: (u32, u32),
        jobs: &[&str],
        incomes: (u64, u64),
    ) -> Self {
        Self {
            segment,
            min_age: ages.0,
            max_age: ages.1,
            jobs: jobs.iter().map(|j| j.to_string()).collect(),
            min_income: incomes.0,
            max_income: incomes.1,
        }
    }
}

/// Immutable configuration for population synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicTables {
    pub first_names: Vec<String>,
    pub last_names: Vec<String>,
    /// City/region pool shared by every segment
    pub locations: Vec<String>,
    pub segments: Vec<SegmentProfile>,
    /// Income range for targeted cohorts, independent of segment tables
    pub targeted_income: (u64, u64),
}

impl DemographicTables {
    /// Load alternate tables from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| Error::SourceUnavailable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let tables: Self = serde_json::from_str(&contents)?;
        tables.validate()?;
        Ok(tables)
    }

    pub fn validate(&self) -> Result<()> {
        if self.first_names.is_empty() || self.last_names.is_empty() {
            return Err(Error::InvalidInput("name pools must not be empty".into()));
        }
        if self.locations.is_empty() {
            return Err(Error::InvalidInput("location pool must not be empty".into()));
        }
        if self.segments.is_empty() {
            return Err(Error::InvalidInput("at least one segment profile is required".into()));
        }
        if self.targeted_income.0 > self.targeted_income.1 {
            return Err(Error::InvalidInput("targeted income range is inverted".into()));
        }

        for profile in &self.segments {
            let label = profile.segment.label();
            if profile.min_age == 0 || profile.min_age > profile.max_age {
                return Err(Error::InvalidInput(format!("{}: invalid age range", label)));
            }
            if profile.min_income > profile.max_income {
                return Err(Error::InvalidInput(format!("{}: invalid income range", label)));
            }
            if profile.jobs.is_empty() {
                return Err(Error::InvalidInput(format!("{}: job pool is empty", label)));
            }
        }

        Ok(())
    }

    pub fn profile(&self, segment: &MarketSegment) -> Option<&SegmentProfile> {
        self.segments.iter().find(|p| &p.segment == segment)
    }

    /// "First Last" drawn from the independent name pools.
    pub fn sample_name<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let first = self.first_names.choose(rng).map(String::as_str).unwrap_or("Anna");
        let last = self.last_names.choose(rng).map(String::as_str).unwrap_or("Nowak");
        format!("{} {}", first, last)
    }
}

impl Default for DemographicTables {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        Self {
            first_names: strings(&[
                "Anna", "Piotr", "Krzysztof", "Maria", "Agnieszka", "Tomasz", "Paweł", "Ewa",
                "Michał", "Kasia", "Jan", "Małgosia", "Bartek", "Ola", "Zofia", "Adam", "Magda",
                "Kamil", "Natalia", "Rafał",
            ]),
            last_names: strings(&[
                "Kowalski", "Nowak", "Wiśniewski", "Wójcik", "Kowalczyk", "Kamiński",
                "Lewandowski", "Zieliński", "Szymański", "Woźniak", "Mazur", "Krawczyk",
            ]),
            locations: strings(&[
                "Warsaw",
                "Kraków",
                "Village (Masovia)",
                "Wrocław",
                "Poznań",
                "Village (Subcarpathia)",
                "Gdańsk",
                "Small town",
                "Łódź",
                "Katowice",
                "Village (Greater Poland)",
            ]),
            segments: vec![
                SegmentProfile::new(
                    MarketSegment::GenZStudent,
                    (19, 25),
                    &[
                        "Student",
                        "Corporate Intern",
                        "Waiter",
                        "Freelance Graphic Designer",
                        "Barista",
                        "Tutor",
                        "Unemployed",
                    ],
                    (0, 4_500),
                ),
                SegmentProfile::new(
                    MarketSegment::CorporateProfessional,
                    (28, 50),
                    &[
                        "Project Manager",
                        "Software Developer",
                        "Finance Director",
                        "Lawyer",
                        "HR Manager",
                        "Data Analyst",
                        "Marketing Specialist",
                    ],
                    (8_000, 40_000),
                ),
                SegmentProfile::new(
                    MarketSegment::SeniorCitizen,
                    (65, 85),
                    &[
                        "Retired Teacher",
                        "Retired Miner",
                        "Retired Accountant",
                        "Military Retiree",
                        "Retiree",
                    ],
                    (2_200, 5_500),
                ),
                SegmentProfile::new(
                    MarketSegment::TechEarlyAdopter,
                    (25, 40),
                    &[
                        "Startup Founder",
                        "AI Engineer",
                        "YouTuber",
                        "Crypto Trader",
                        "Product Designer",
                        "Tech Blogger",
                    ],
                    (6_000, 25_000),
                ),
            ],
            targeted_income: (3_000, 25_000),
        }
    }
}

/// Household size derived from age: under 22 lives alone, over 65 is 1-2,
/// everyone else 1-5.
pub fn family_size_for_age<R: Rng + ?Sized>(age: u32, rng: &mut R) -> u32 {
    if age < 22 {
        1
    } else if age > 65 {
        rng.random_range(1..=2)
    } else {
        rng.random_range(1..=5)
    }
}
