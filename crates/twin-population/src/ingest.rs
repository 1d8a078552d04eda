//! Population ingestion from header-keyed CSV sources.
//!
//! Rows that cannot be turned into an agent are skipped and reported as
//! [`RowDiagnostic`]s; only an unreadable source fails the whole load.

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use twin_core::{
    AgentId, ConsumerAgent, Error, MarketSegment, OceanTrait, PersonalityTraits, Population,
    Result,
};

/// Canonical column set, in file order.
pub const FULL_COLUMNS: [&str; 13] = [
    "id",
    "name",
    "segment",
    "income",
    "age",
    "job",
    "location",
    "family_size",
    "openness",
    "conscientiousness",
    "extraversion",
    "agreeableness",
    "neuroticism",
];

/// Legacy layout carrying no demographics beyond income.
pub const MINIMAL_COLUMNS: [&str; 4] = ["id", "name", "segment", "income"];

/// Defaults filled in for the legacy minimal layout.
const MINIMAL_DEFAULT_AGE: u32 = 35;
const MINIMAL_DEFAULT_TEXT: &str = "Unspecified";
const MINIMAL_DEFAULT_FAMILY_SIZE: u32 = 1;

/// Column layout detected from the header row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceLayout {
    Full,
    Minimal,
}

impl SourceLayout {
    fn detect(columns: &HashMap<String, usize>) -> std::result::Result<Self, Vec<&'static str>> {
        let missing_full: Vec<_> = FULL_COLUMNS
            .iter()
            .copied()
            .filter(|c| !columns.contains_key(*c))
            .collect();
        if missing_full.is_empty() {
            return Ok(SourceLayout::Full);
        }

        let missing_minimal: Vec<_> = MINIMAL_COLUMNS
            .iter()
            .copied()
            .filter(|c| !columns.contains_key(*c))
            .collect();
        if !missing_minimal.is_empty() {
            return Err(missing_minimal);
        }

        // a partial canonical header is a full source with gaps; rows then
        // fail on the missing fields instead of silently taking defaults
        if missing_full.len() == FULL_COLUMNS.len() - MINIMAL_COLUMNS.len() {
            Ok(SourceLayout::Minimal)
        } else {
            Ok(SourceLayout::Full)
        }
    }
}

/// A skipped row and why it was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowDiagnostic {
    /// 1-based line in the source, the header being line 1
    pub line: u64,
    pub reason: String,
}

impl RowDiagnostic {
    pub fn to_error(&self) -> Error {
        Error::RowMalformed {
            line: self.line,
            reason: self.reason.clone(),
        }
    }
}

impl fmt::Display for RowDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_error())
    }
}

/// Agents parsed from a source together with the rows that were skipped.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub layout: Option<SourceLayout>,
    pub agents: Vec<ConsumerAgent>,
    pub diagnostics: Vec<RowDiagnostic>,
}

impl IngestReport {
    /// Fails with `EmptyPopulation` when no row survived.
    pub fn into_population(self) -> Result<Population> {
        Population::new(self.agents)
    }
}

/// Load a population file. A missing, unopenable or non-regular file is
/// `SourceUnavailable`; an empty or header-only file loads zero agents.
pub fn load_population(path: impl AsRef<Path>) -> Result<IngestReport> {
    let path = path.as_ref();
    let unavailable = |reason: String| Error::SourceUnavailable {
        path: path.display().to_string(),
        reason,
    };

    let metadata = std::fs::metadata(path).map_err(|e| unavailable(e.to_string()))?;
    if !metadata.is_file() {
        return Err(unavailable("not a regular file".to_string()));
    }
    let file = File::open(path).map_err(|e| unavailable(e.to_string()))?;

    tracing::info!("Loading population from {}", path.display());
    read_population(file)
}

/// Parse a population from any CSV byte stream.
pub fn read_population<R: Read>(reader: R) -> Result<IngestReport> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let columns: HashMap<String, usize> = rdr
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, name)| (name.to_string(), i))
        .collect();

    let layout = match SourceLayout::detect(&columns) {
        Ok(layout) => layout,
        Err(missing) => {
            let diagnostic = RowDiagnostic {
                line: 1,
                reason: format!("header is missing columns: {}", missing.join(", ")),
            };
            tracing::warn!("{}", diagnostic);
            return Ok(IngestReport {
                layout: None,
                agents: Vec::new(),
                diagnostics: vec![diagnostic],
            });
        }
    };

    tracing::debug!("Detected {:?} layout with columns {:?}", layout, columns.keys());

    let mut agents = Vec::new();
    let mut diagnostics = Vec::new();
    let mut seen = HashSet::new();

    for (index, result) in rdr.records().enumerate() {
        // header is line 1, first record line 2
        let fallback_line = index as u64 + 2;

        let parsed = result
            .map_err(|e| {
                let line = e.position().map(|p| p.line()).unwrap_or(fallback_line);
                (line, e.to_string())
            })
            .and_then(|record| {
                let line = record.position().map(|p| p.line()).unwrap_or(fallback_line);
                let row = RowFields {
                    record: &record,
                    columns: &columns,
                };
                row.to_agent(layout)
                    .map(|agent| (line, agent))
                    .map_err(|reason| (line, reason))
            })
            .and_then(|(line, agent)| {
                if seen.insert(agent.id) {
                    Ok(agent)
                } else {
                    Err((line, format!("duplicate id {}", agent.id)))
                }
            });

        match parsed {
            Ok(agent) => agents.push(agent),
            Err((line, reason)) => {
                let diagnostic = RowDiagnostic { line, reason };
                tracing::warn!("Skipping row: {}", diagnostic);
                diagnostics.push(diagnostic);
            }
        }
    }

    tracing::info!(
        "Loaded {} agents ({} rows skipped)",
        agents.len(),
        diagnostics.len()
    );

    Ok(IngestReport {
        layout: Some(layout),
        agents,
        diagnostics,
    })
}

/// Header-keyed view over one record.
struct RowFields<'a> {
    record: &'a StringRecord,
    columns: &'a HashMap<String, usize>,
}

impl RowFields<'_> {
    fn text(&self, column: &str) -> std::result::Result<&str, String> {
        self.columns
            .get(column)
            .and_then(|&i| self.record.get(i))
            .filter(|v| !v.is_empty())
            .ok_or_else(|| format!("missing field `{}`", column))
    }

    fn number<T>(&self, column: &str) -> std::result::Result<T, String>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.text(column)?;
        raw.parse()
            .map_err(|e| format!("field `{}` is not a valid number ({:?}): {}", column, raw, e))
    }

    fn traits(&self) -> std::result::Result<PersonalityTraits, String> {
        let mut values = [0.0; 5];
        for (slot, t) in values.iter_mut().zip(OceanTrait::ALL) {
            *slot = self.number(t.column())?;
        }
        PersonalityTraits::from_vector(&values).map_err(|e| e.to_string())
    }

    fn to_agent(&self, layout: SourceLayout) -> std::result::Result<ConsumerAgent, String> {
        let id = AgentId(self.number("id")?);
        let name = self.text("name")?;
        let segment = MarketSegment::from_label(self.text("segment")?);
        let income = self.number("income")?;

        let agent = match layout {
            SourceLayout::Full => ConsumerAgent::new(
                id,
                name,
                segment,
                self.traits()?,
                income,
                self.number("age")?,
                self.text("job")?,
                self.text("location")?,
                self.number("family_size")?,
            ),
            SourceLayout::Minimal => ConsumerAgent::new(
                id,
                name,
                segment,
                PersonalityTraits::neutral(),
                income,
                MINIMAL_DEFAULT_AGE,
                MINIMAL_DEFAULT_TEXT,
                MINIMAL_DEFAULT_TEXT,
                MINIMAL_DEFAULT_FAMILY_SIZE,
            ),
        };

        agent.map_err(|e| e.to_string())
    }
}
