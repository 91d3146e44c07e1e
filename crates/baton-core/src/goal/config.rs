use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::bare_name;

/// A per-agent model: one name, or a list of variants (first is default).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelSpec {
    One(String),
    Many(Vec<String>),
}

impl ModelSpec {
    pub fn variants(&self) -> Vec<String> {
        match self {
            ModelSpec::One(m) => vec![m.clone()],
            ModelSpec::Many(ms) => ms.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuousConfig {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub auto_duration: Option<String>,
    #[serde(default)]
    pub cron: Option<String>,
}

/// Frontmatter keys of a goal document. Unknown keys are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalConfig {
    #[serde(default)]
    pub flow: Option<String>,
    /// Default model for agents without an entry in `models`
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub models: BTreeMap<String, ModelSpec>,
    #[serde(default)]
    pub interactive: Option<bool>,
    /// Shell command that must succeed before `complete` is accepted
    #[serde(default)]
    pub completion_gate: Option<String>,
    #[serde(default)]
    pub continuous: ContinuousConfig,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl GoalConfig {
    pub fn from_frontmatter(yaml: &str) -> Result<Self, EngineError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
            .map_err(|e| EngineError::Config(format!("Invalid goal frontmatter: {}", e)))
    }

    pub fn flow(&self) -> &str {
        self.flow.as_deref().unwrap_or_default()
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive.unwrap_or(false)
    }

    /// Model for `agent`: its first configured variant, else the default model.
    pub fn model_for(&self, agent: &str) -> Option<String> {
        self.models
            .get(bare_name(agent))
            .and_then(|spec| spec.variants().into_iter().find(|m| !m.trim().is_empty()))
            .or_else(|| self.model.clone().filter(|m| !m.trim().is_empty()))
    }

    pub fn continuous_prompt(&self) -> Option<&str> {
        self.continuous
            .prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// The auto-timer duration. An unparseable value is logged and ignored.
    pub fn auto_duration(&self) -> Option<Duration> {
        let raw = self.continuous.auto_duration.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        let parsed = parse_duration(raw);
        if parsed.is_none() {
            tracing::warn!("[Goal] Ignoring invalid continuous.autoDuration '{}'", raw);
        }
        parsed
    }

    /// The cron schedule. An unparseable expression is logged and ignored.
    pub fn cron_schedule(&self) -> Option<cron::Schedule> {
        let raw = self.continuous.cron.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        match cron::Schedule::from_str(&normalize_cron(raw)) {
            Ok(schedule) => Some(schedule),
            Err(e) => {
                tracing::warn!("[Goal] Ignoring invalid continuous.cron '{}': {}", raw, e);
                None
            }
        }
    }
}

static DURATION_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn duration_pattern() -> Option<&'static Regex> {
    DURATION_RE
        .get_or_init(|| Regex::new(r"^(\d+)\s*(ms|s|m|h|d)$").ok())
        .as_ref()
}

/// `500ms`, `90s`, `30m`, `2h`, `1d`. A bare number is seconds. Zero is rejected.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return (secs > 0).then(|| Duration::from_secs(secs));
    }
    let caps = duration_pattern()?.captures(raw)?;
    let value: u64 = caps[1].parse().ok()?;
    if value == 0 {
        return None;
    }
    let duration = match &caps[2] {
        "ms" => Duration::from_millis(value),
        "s" => Duration::from_secs(value),
        "m" => Duration::from_secs(value.checked_mul(60)?),
        "h" => Duration::from_secs(value.checked_mul(3600)?),
        "d" => Duration::from_secs(value.checked_mul(86_400)?),
        _ => return None,
    };
    Some(duration)
}

/// The `cron` crate wants a seconds field; classic 5-field expressions get one.
pub fn normalize_cron(expr: &str) -> String {
    let expr = expr.trim();
    if expr.split_whitespace().count() == 5 {
        format!("0 {}", expr)
    } else {
        expr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("90s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("30m"), Some(Duration::from_secs(1800)));
        assert_eq!(parse_duration("2h"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_duration("1d"), Some(Duration::from_secs(86_400)));
        assert_eq!(parse_duration("45"), Some(Duration::from_secs(45)));
        assert_eq!(parse_duration("0s"), None);
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration("5 weeks"), None);
    }

    #[test]
    fn test_duration_pattern_is_compiled_once() {
        let first = duration_pattern().unwrap();
        assert_eq!(parse_duration("10 m"), Some(Duration::from_secs(600)));
        assert!(std::ptr::eq(first, duration_pattern().unwrap()));
    }

    #[test]
    fn test_normalize_cron() {
        assert_eq!(normalize_cron("*/5 * * * *"), "0 */5 * * * *");
        assert_eq!(normalize_cron("0 0 9 * * Mon"), "0 0 9 * * Mon");
    }

    #[test]
    fn test_frontmatter_config() {
        let yaml = r#"
flow: "planner -> dev"
model: sonnet
models:
  dev: [opus, haiku]
  qa: haiku
interactive: true
completionGate: "cargo test"
continuous:
  prompt: "Summarize progress"
  autoDuration: 30m
  cron: "0 9 * * *"
team: platform
"#;
        let cfg = GoalConfig::from_frontmatter(yaml).unwrap();
        assert_eq!(cfg.flow(), "planner -> dev");
        assert_eq!(cfg.model_for("dev:haiku").as_deref(), Some("opus"));
        assert_eq!(cfg.model_for("qa").as_deref(), Some("haiku"));
        assert_eq!(cfg.model_for("planner").as_deref(), Some("sonnet"));
        assert!(cfg.is_interactive());
        assert_eq!(cfg.completion_gate.as_deref(), Some("cargo test"));
        assert_eq!(cfg.continuous_prompt(), Some("Summarize progress"));
        assert_eq!(cfg.auto_duration(), Some(Duration::from_secs(1800)));
        assert!(cfg.cron_schedule().is_some());
        assert_eq!(cfg.extra["team"], serde_yaml::Value::from("platform"));
    }

    #[test]
    fn test_invalid_values_are_ignored() {
        let cfg = GoalConfig::from_frontmatter(
            "continuous:\n  autoDuration: whenever\n  cron: \"not a cron\"\n",
        )
        .unwrap();
        assert_eq!(cfg.auto_duration(), None);
        assert!(cfg.cron_schedule().is_none());
        assert!(!cfg.is_interactive());
        assert_eq!(cfg.flow(), "");
    }

    #[test]
    fn test_malformed_frontmatter_is_config_error() {
        assert!(matches!(
            GoalConfig::from_frontmatter("flow: [unclosed"),
            Err(EngineError::Config(_))
        ));
    }
}
