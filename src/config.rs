use crate::error::{TbError, TbResult};
use crate::random::RandomizerConfig;
use crate::transaction::SLAVE_COUNT;
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const ENV_SEED: &str = "AXI_RD_TB_SEED";
pub const ENV_MASTERS: &str = "AXI_RD_TB_MASTERS";
pub const ENV_FINISH_AFTER: &str = "AXI_RD_TB_FINISH_AFTER";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TbConfig {
    pub seed: u64,
    pub masters: usize,
    pub finish_after: u32,
    pub settle_cycles: u64,
    pub max_outstanding: u32,
    pub queue_depth: usize,
    // watchdog, off by default
    pub max_cycles: Option<u64>,
    // progress line every this many cycles
    pub speed_report_cycles: Option<u64>,
    pub randomizer: RandomizerConfig,
    pub junit_path: Option<PathBuf>,
}

impl Default for TbConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            masters: 3,
            finish_after: 200,
            settle_cycles: 1000,
            max_outstanding: 8,
            queue_depth: 2,
            max_cycles: None,
            speed_report_cycles: Some(100_000),
            randomizer: RandomizerConfig::default(),
            junit_path: Some(PathBuf::from("results.xml")),
        }
    }
}

impl TbConfig {
    // defaults < toml file < environment
    pub fn load(path: Option<&Path>) -> TbResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> TbResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| TbError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> TbResult<Self> {
        toml::from_str(text).map_err(|e| TbError::Config(e.to_string()))
    }

    pub fn apply_env_overrides(&mut self) -> TbResult {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> TbResult {
        if let Some(seed) = parse_var(&lookup, ENV_SEED)? {
            self.seed = seed;
        }
        if let Some(masters) = parse_var(&lookup, ENV_MASTERS)? {
            self.masters = masters;
        }
        if let Some(finish_after) = parse_var(&lookup, ENV_FINISH_AFTER)? {
            self.finish_after = finish_after;
        }
        Ok(())
    }

    pub fn validate(&self) -> TbResult {
        if self.masters == 0 || self.masters > SLAVE_COUNT {
            return Err(TbError::Config(format!(
                "masters must be in 1..={}, got {}",
                SLAVE_COUNT, self.masters
            )));
        }
        if self.max_outstanding == 0 {
            return Err(TbError::Config("max_outstanding must be at least 1".into()));
        }
        if self.speed_report_cycles == Some(0) {
            return Err(TbError::Config("speed_report_cycles must be at least 1".into()));
        }
        if self.queue_depth == 0 {
            return Err(TbError::Config("queue_depth must be at least 1".into()));
        }
        let r = &self.randomizer;
        if r.prob_low > r.prob_high || r.prob_high > 100 || r.period == 0 {
            return Err(TbError::Config(format!(
                "randomizer needs prob_low <= prob_high <= 100 and period >= 1, got {:?}",
                r
            )));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> TbResult<Option<T>> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| TbError::Config(format!("{}={} is not a valid value", name, value))),
        None => Ok(None),
    }
}
