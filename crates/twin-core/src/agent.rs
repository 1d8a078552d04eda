//! Simulated consumers and the populations they form.

use serde::Serialize;
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::ocean::PersonalityTraits;
use crate::segment::MarketSegment;
use crate::types::AgentId;

/// One synthetic consumer.
///
/// Immutable once built: evaluating a product never changes an agent, and no
/// memory of earlier evaluations is kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumerAgent {
    pub id: AgentId,
    pub name: String,
    pub segment: MarketSegment,
    pub traits: PersonalityTraits,
    /// Income in currency units per period
    pub income: u64,
    /// Age in years
    pub age: u32,
    pub job: String,
    /// Free text, may carry "rural"/region qualifiers
    pub location: String,
    /// Household size, at least 1
    pub family_size: u32,
}

impl ConsumerAgent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: AgentId,
        name: impl Into<String>,
        segment: MarketSegment,
        traits: PersonalityTraits,
        income: u64,
        age: u32,
        job: impl Into<String>,
        location: impl Into<String>,
        family_size: u32,
    ) -> Result<Self> {
        if family_size == 0 {
            return Err(Error::InvalidInput(format!(
                "agent {}: family size must be at least 1",
                id
            )));
        }

        Ok(Self {
            id,
            name: name.into(),
            segment,
            traits,
            income,
            age,
            job: job.into(),
            location: location.into(),
            family_size,
        })
    }
}

/// Ordered, non-empty set of agents with unique ids.
#[derive(Debug, Clone, Serialize)]
pub struct Population {
    agents: Vec<ConsumerAgent>,
}

impl Population {
    pub fn new(agents: Vec<ConsumerAgent>) -> Result<Self> {
        if agents.is_empty() {
            return Err(Error::EmptyPopulation);
        }

        let mut seen = HashSet::with_capacity(agents.len());
        for agent in &agents {
            if !seen.insert(agent.id) {
                return Err(Error::DuplicateAgentId(agent.id));
            }
        }

        Ok(Self { agents })
    }

    pub fn agents(&self) -> &[ConsumerAgent] {
        &self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConsumerAgent> {
        self.agents.iter()
    }

    pub fn get(&self, id: AgentId) -> Option<&ConsumerAgent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn into_agents(self) -> Vec<ConsumerAgent> {
        self.agents
    }
}

impl<'a> IntoIterator for &'a Population {
    type Item = &'a ConsumerAgent;
    type IntoIter = std::slice::Iter<'a, ConsumerAgent>;

    fn into_iter(self) -> Self::IntoIter {
        self.agents.iter()
    }
}

#[cfg(test)]
pub(crate) fn test_agent(id: u64) -> ConsumerAgent {
    ConsumerAgent::new(
        AgentId(id),
        format!("Agent {}", id),
        MarketSegment::CorporateProfessional,
        PersonalityTraits::neutral(),
        12_000,
        34,
        "Data Analyst",
        "Warsaw",
        2,
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_population_rejects_empty() {
        assert!(matches!(Population::new(Vec::new()), Err(Error::EmptyPopulation)));
    }

    #[test]
    fn test_population_rejects_duplicate_ids() {
        let result = Population::new(vec![test_agent(1), test_agent(2), test_agent(1)]);
        assert!(matches!(result, Err(Error::DuplicateAgentId(AgentId(1)))));
    }

    #[test]
    fn test_population_preserves_order() {
        let population = Population::new(vec![test_agent(3), test_agent(1), test_agent(2)]).unwrap();
        let ids: Vec<u64> = population.iter().map(|a| a.id.0).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(population.get(AgentId(1)).unwrap().name, "Agent 1");
    }

    #[test]
    fn test_agent_rejects_zero_family_size() {
        let result = ConsumerAgent::new(
            AgentId(1),
            "Ewa",
            MarketSegment::SeniorCitizen,
            PersonalityTraits::neutral(),
            3_000,
            70,
            "Retiree",
            "Gdansk",
            0,
        );
        assert!(result.is_err());
    }
}
