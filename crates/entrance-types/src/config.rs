//! Global configuration types.
//!
//! `GlobalConfig` represents the top-level `config.toml`: builder policy
//! (retry limits, timeouts, skill-count policy, length bounds) and extra tool
//! catalog entries. Every field has a documented default.

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogTool;

/// Top-level configuration loaded from `~/.entrance/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub builder: BuilderSettings,

    /// Tools added to the built-in catalog.
    #[serde(default)]
    pub tools: Vec<CatalogTool>,
}

/// Policy knobs for the build workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuilderSettings {
    /// Maximum number of bound skills (exactly-one-skill policy by default).
    #[serde(default = "default_max_skills")]
    pub max_skills: usize,

    /// Failed validation cycles before the build fails.
    #[serde(default = "default_retry_limit")]
    pub max_validation_retries: u32,

    /// Content generation failures tolerated per phase attempt.
    #[serde(default = "default_retry_limit")]
    pub max_generation_retries: u32,

    /// Creation collaborator failures tolerated before the build fails.
    #[serde(default = "default_retry_limit")]
    pub max_creation_retries: u32,

    /// Cancelled or expired interactions re-prompted before the build fails.
    #[serde(default = "default_retry_limit")]
    pub max_interaction_retries: u32,

    /// Age after which a pending interaction may be expired.
    #[serde(default = "default_interaction_timeout_secs")]
    pub interaction_timeout_secs: u64,

    /// Upper bound on a single collaborator call.
    #[serde(default = "default_collaborator_timeout_secs")]
    pub collaborator_timeout_secs: u64,

    #[serde(default)]
    pub limits: LengthLimits,
}

fn default_max_skills() -> usize {
    1
}

fn default_retry_limit() -> u32 {
    3
}

fn default_interaction_timeout_secs() -> u64 {
    86_400
}

fn default_collaborator_timeout_secs() -> u64 {
    60
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            max_skills: default_max_skills(),
            max_validation_retries: default_retry_limit(),
            max_generation_retries: default_retry_limit(),
            max_creation_retries: default_retry_limit(),
            max_interaction_retries: default_retry_limit(),
            interaction_timeout_secs: default_interaction_timeout_secs(),
            collaborator_timeout_secs: default_collaborator_timeout_secs(),
            limits: LengthLimits::default(),
        }
    }
}

/// Inclusive character-count bound. `max = None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthBound {
    pub min: usize,
    #[serde(default)]
    pub max: Option<usize>,
}

impl LengthBound {
    pub const fn new(min: usize, max: Option<usize>) -> Self {
        Self { min, max }
    }

    /// Whether `s` (counted in chars, not bytes) is within bounds.
    pub fn contains(&self, s: &str) -> bool {
        let len = s.chars().count();
        len >= self.min && self.max.is_none_or(|max| len <= max)
    }

    pub fn describe(&self) -> String {
        match self.max {
            Some(max) => format!("{}-{max} characters", self.min),
            None => format!("at least {} characters", self.min),
        }
    }
}

/// String length bounds enforced by the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LengthLimits {
    #[serde(default = "default_name_bound")]
    pub name: LengthBound,
    #[serde(default = "default_description_bound")]
    pub description: LengthBound,
    #[serde(default = "default_prompt_bound")]
    pub system_prompt: LengthBound,
    #[serde(default = "default_skill_name_bound")]
    pub skill_name: LengthBound,
    #[serde(default = "default_when_to_use_bound")]
    pub when_to_use: LengthBound,
    #[serde(default = "default_prompt_bound")]
    pub skill_prompt: LengthBound,
}

fn default_name_bound() -> LengthBound {
    LengthBound::new(1, Some(100))
}

fn default_description_bound() -> LengthBound {
    LengthBound::new(1, Some(500))
}

fn default_prompt_bound() -> LengthBound {
    LengthBound::new(10, None)
}

fn default_skill_name_bound() -> LengthBound {
    LengthBound::new(1, Some(50))
}

fn default_when_to_use_bound() -> LengthBound {
    LengthBound::new(10, Some(500))
}

impl Default for LengthLimits {
    fn default() -> Self {
        Self {
            name: default_name_bound(),
            description: default_description_bound(),
            system_prompt: default_prompt_bound(),
            skill_name: default_skill_name_bound(),
            when_to_use: default_when_to_use_bound(),
            skill_prompt: default_prompt_bound(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_settings_defaults() {
        let settings = BuilderSettings::default();
        assert_eq!(settings.max_skills, 1);
        assert_eq!(settings.max_validation_retries, 3);
        assert_eq!(settings.max_creation_retries, 3);
        assert_eq!(settings.interaction_timeout_secs, 86_400);
        assert_eq!(settings.limits.when_to_use, LengthBound::new(10, Some(500)));
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config.builder, BuilderSettings::default());
        assert!(config.tools.is_empty());
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let toml_str = r#"
[builder]
max_skills = 2
max_validation_retries = 5

[builder.limits]
name = { min = 3, max = 40 }

[[tools]]
tool_id = "hotel_pms"
name = "hotel_pms"
description = "Property management system"
config_required = ["property_id"]
"#;
        let config: GlobalConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.builder.max_skills, 2);
        assert_eq!(config.builder.max_validation_retries, 5);
        assert_eq!(config.builder.max_creation_retries, 3);
        assert_eq!(config.builder.limits.name, LengthBound::new(3, Some(40)));
        assert_eq!(config.builder.limits.description, LengthBound::new(1, Some(500)));
        assert_eq!(config.tools.len(), 1);
        assert_eq!(config.tools[0].config_required, vec!["property_id".to_string()]);
    }

    #[test]
    fn length_bound_counts_chars() {
        let bound = LengthBound::new(1, Some(3));
        assert!(bound.contains("abc"));
        assert!(bound.contains("酒店人"));
        assert!(!bound.contains(""));
        assert!(!bound.contains("abcd"));
        assert!(LengthBound::new(10, None).contains(&"x".repeat(10_000)));
        assert_eq!(bound.describe(), "1-3 characters");
        assert_eq!(LengthBound::new(10, None).describe(), "at least 10 characters");
    }
}
