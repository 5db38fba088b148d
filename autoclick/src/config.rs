use {
    crate::{
        chain::{Step, StepChain},
        matcher::MatchThreshold,
        retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS},
    },
    anyhow::{ensure, Context as _},
    serde::{Deserialize, Serialize},
    std::{
        path::{Path, PathBuf},
        time::Duration,
    },
};

/// Chain description as stored in a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    #[serde(default)]
    pub threshold: MatchThreshold,
    pub steps: Vec<StepConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    pub template: PathBuf,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: f64,
    #[serde(default)]
    pub pre_click_delay_secs: f64,
    #[serde(default)]
    pub start_delay_secs: f64,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_retry_interval_secs() -> f64 {
    1.0
}

impl ChainConfig {
    /// Reads a config file. Relative template paths are taken relative to the
    /// directory that contains the file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs_err::read_to_string(path)?;
        let base_dir = path.parent().unwrap_or(Path::new(""));
        Self::from_json(&text, base_dir)
            .with_context(|| format!("invalid chain config {:?}", path))
    }

    pub fn from_json(text: &str, base_dir: &Path) -> anyhow::Result<Self> {
        let mut config: Self = serde_json::from_str(text)?;
        for step in &mut config.steps {
            if step.template.is_relative() {
                step.template = base_dir.join(&step.template);
            }
        }
        Ok(config)
    }

    pub fn to_chain(&self) -> anyhow::Result<StepChain> {
        let threshold = self.threshold.value();
        ensure!(
            threshold > 0.0 && threshold <= 1.0,
            "threshold must be in (0, 1], got {threshold}"
        );
        self.steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                step.to_step()
                    .with_context(|| format!("invalid step #{}", index + 1))
            })
            .collect()
    }
}

impl StepConfig {
    fn to_step(&self) -> anyhow::Result<Step> {
        let policy = RetryPolicy {
            max_attempts: self.max_attempts,
            retry_interval: seconds("retry_interval_secs", self.retry_interval_secs)?,
            pre_click_delay: seconds("pre_click_delay_secs", self.pre_click_delay_secs)?,
            start_delay: seconds("start_delay_secs", self.start_delay_secs)?,
        };
        Ok(Step::new(&self.template).with_policy(policy))
    }
}

fn seconds(field: &str, value: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(value)
        .with_context(|| format!("{field} must be a non-negative number of seconds, got {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_in_defaults() {
        let config = ChainConfig::from_json(
            r#"{ "steps": [ { "template": "re-auth/2_continue.png" } ] }"#,
            Path::new("/opt/auth"),
        )
        .unwrap();
        assert_eq!(config.threshold, MatchThreshold::default());

        let chain = config.to_chain().unwrap();
        assert_eq!(
            chain.steps(),
            &[Step::new("/opt/auth/re-auth/2_continue.png")]
        );
        assert_eq!(chain.steps()[0].policy, RetryPolicy::default());
    }

    #[test]
    fn reads_explicit_values() {
        let config = ChainConfig::from_json(
            r#"{
                "threshold": 0.95,
                "steps": [
                    { "template": "/abs/a.png", "max_attempts": 10,
                      "retry_interval_secs": 0.5, "pre_click_delay_secs": 2,
                      "start_delay_secs": 5 }
                ]
            }"#,
            Path::new("/ignored"),
        )
        .unwrap();
        assert_eq!(config.threshold, MatchThreshold::new(0.95));
        let chain = config.to_chain().unwrap();
        let step = &chain.steps()[0];
        assert_eq!(step.template, PathBuf::from("/abs/a.png"));
        assert_eq!(
            step.policy,
            RetryPolicy {
                max_attempts: 10,
                retry_interval: Duration::from_millis(500),
                pre_click_delay: Duration::from_secs(2),
                start_delay: Duration::from_secs(5),
            }
        );
    }

    #[test]
    fn rejects_negative_delays() {
        let config = ChainConfig::from_json(
            r#"{ "steps": [ { "template": "a.png", "retry_interval_secs": -1 } ] }"#,
            Path::new(""),
        )
        .unwrap();
        let err = config.to_chain().unwrap_err();
        assert!(format!("{err:#}").contains("retry_interval_secs"));
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let config =
            ChainConfig::from_json(r#"{ "threshold": 1.5, "steps": [] }"#, Path::new("")).unwrap();
        assert!(config.to_chain().is_err());
    }

    #[test]
    fn rejects_unknown_fields() {
        let result = ChainConfig::from_json(
            r#"{ "steps": [ { "template": "a.png", "retries": 3 } ] }"#,
            Path::new(""),
        );
        assert!(result.is_err());
    }
}
