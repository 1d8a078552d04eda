//! Segment-conditioned bulk generation of reference populations.

use rand::seq::IndexedRandom;
use rand::Rng;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use twin_core::{AgentId, ConsumerAgent, Error, PersonalityTraits, Result};

use crate::ingest::FULL_COLUMNS;
use crate::synthesis::seeded_rng;
use crate::tables::{family_size_for_age, DemographicTables};

/// Reference dataset sizes produced when none are requested.
pub const DEFAULT_DATASET_SIZES: [usize; 3] = [100, 500, 1000];

/// Generate `size` agents; each picks a segment uniformly and samples age,
/// job and income from that segment's table. A zero `size` is
/// `EmptyPopulation`.
pub fn generate_reference_population<R: Rng + ?Sized>(
    size: usize,
    tables: &DemographicTables,
    rng: &mut R,
) -> Result<Vec<ConsumerAgent>> {
    if size == 0 {
        return Err(Error::EmptyPopulation);
    }
    tables.validate()?;

    let mut agents = Vec::with_capacity(size);
    for i in 1..=size {
        let profile = tables
            .segments
            .choose(rng)
            .ok_or_else(|| Error::InvalidInput("no segment profiles".into()))?;

        let name = tables.sample_name(rng);
        let age = rng.random_range(profile.min_age..=profile.max_age);
        let job = profile.jobs.choose(rng).cloned().unwrap_or_default();
        let location = tables.locations.choose(rng).cloned().unwrap_or_default();
        let income = rng.random_range(profile.min_income..=profile.max_income);
        let family_size = family_size_for_age(age, rng);

        let mut values = [0.0; 5];
        for v in values.iter_mut() {
            *v = round2(rng.random());
        }

        agents.push(ConsumerAgent::new(
            AgentId(i as u64),
            name,
            profile.segment.clone(),
            PersonalityTraits::from_vector(&values)?,
            income,
            age,
            job,
            location,
            family_size,
        )?);
    }

    Ok(agents)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Write agents in the canonical population file format.
pub fn write_population<W: Write>(writer: W, agents: &[ConsumerAgent]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(FULL_COLUMNS)?;

    for agent in agents {
        let traits = agent.traits.to_vector();
        wtr.write_record([
            agent.id.to_string(),
            agent.name.clone(),
            agent.segment.label().to_string(),
            agent.income.to_string(),
            agent.age.to_string(),
            agent.job.clone(),
            agent.location.clone(),
            agent.family_size.to_string(),
            traits[0].to_string(),
            traits[1].to_string(),
            traits[2].to_string(),
            traits[3].to_string(),
            traits[4].to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_population_csv(path: impl AsRef<Path>, agents: &[ConsumerAgent]) -> Result<()> {
    let file = File::create(path.as_ref())?;
    write_population(file, agents)
}

/// Write one `population_{n}.csv` per requested size into `dir`.
pub fn generate_reference_datasets(
    dir: impl AsRef<Path>,
    sizes: &[usize],
    tables: &DemographicTables,
    seed: Option<u64>,
) -> Result<Vec<PathBuf>> {
    if sizes.is_empty() || sizes.contains(&0) {
        return Err(Error::InvalidInput(format!(
            "dataset sizes must be positive, got {:?}",
            sizes
        )));
    }

    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let mut rng = seeded_rng(seed);
    let mut written = Vec::with_capacity(sizes.len());

    for &size in sizes {
        let agents = generate_reference_population(size, tables, &mut rng)?;
        let path = dir.join(format!("population_{}.csv", size));
        write_population_csv(&path, &agents)?;

        tracing::info!("Generated {} ({} profiles)", path.display(), size);
        written.push(path);
    }

    Ok(written)
}
