use std::path::{Path, PathBuf};

use serde::Deserialize;
use tenq_core::{ConfigError, Message, PayloadGenerator, QueueConfig};

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scenario file")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// On-disk form of a scenario: each step lists the tenant of every message
/// put during that step.
///
/// ```toml
/// capacity = 4
/// steps = [["t1", "t1", "t2"], [], ["t2"]]
/// ```
#[derive(Clone, Debug, Deserialize)]
pub struct ScenarioFile {
    #[serde(default)]
    pub capacity: Option<usize>,
    pub steps: Vec<Vec<String>>,
}

impl ScenarioFile {
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, ScenarioError> {
        let file: ScenarioFile = toml::from_str(raw)?;
        if let Some(capacity) = file.capacity {
            QueueConfig::new(capacity).validate()?;
        }
        Ok(file)
    }

    pub fn into_scenario(self) -> Scenario {
        Scenario::from_tenants(&self.steps)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Scenario {
    pub steps: Vec<Vec<Message<u64>>>,
}

impl Scenario {
    /// Builds steps from tenant names, numbering each tenant's messages from 1.
    pub fn from_tenants<S: AsRef<str>>(steps: &[Vec<S>]) -> Self {
        let mut generator = PayloadGenerator::new();
        let steps = steps
            .iter()
            .map(|step| {
                step.iter()
                    .map(|tenant| generator.next_for(tenant.as_ref()))
                    .collect()
            })
            .collect();
        Self { steps }
    }

    /// Three tenants with two 12-message bursts from `t1` and an empty step.
    pub fn example() -> Self {
        let burst = vec!["t1"; 12];
        Self::from_tenants(&[
            vec!["t1", "t1", "t2"],
            vec!["t1", "t1"],
            vec![],
            vec!["t1", "t2", "t3"],
            vec!["t3"],
            burst.clone(),
            vec!["t3", "t3", "t3", "t2", "t3"],
            vec!["t1", "t2", "t3"],
            burst,
        ])
    }

    pub fn message_count(&self) -> usize {
        self.steps.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_numbers_payloads_per_tenant() {
        let scenario = Scenario::example();
        assert_eq!(scenario.steps.len(), 9);
        assert_eq!(scenario.message_count(), 41);

        let t2: Vec<u64> = scenario
            .steps
            .iter()
            .flatten()
            .filter(|message| message.tenant.as_str() == "t2")
            .map(|message| message.payload)
            .collect();
        assert_eq!(t2, vec![1, 2, 3, 4]);
    }

    #[test]
    fn parses_scenario_file() {
        let file = ScenarioFile::parse("capacity = 3\nsteps = [[\"a\", \"b\"], [], [\"a\"]]\n")
            .expect("valid scenario");
        assert_eq!(file.capacity, Some(3));

        let scenario = file.into_scenario();
        assert_eq!(scenario.steps.len(), 3);
        assert!(scenario.steps[1].is_empty());
        assert_eq!(scenario.steps[2][0].payload, 2);
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = ScenarioFile::parse("capacity = 0\nsteps = []\n").unwrap_err();
        assert!(matches!(err, ScenarioError::Config(ConfigError::ZeroCapacity)));
    }

    #[test]
    fn rejects_malformed_file() {
        assert!(matches!(
            ScenarioFile::parse("steps = 4"),
            Err(ScenarioError::Parse(_))
        ));
    }
}
