use std::env;

use crate::errors::PlannerError;

pub const PLANNER_API_BASE_ENV: &str = "PLANNER_API_BASE";
pub const PLANNER_API_KEY_ENV: &str = "PLANNER_API_KEY";

/// Connection settings for the planner's order-intake API.
#[derive(Debug, Clone, Default)]
pub struct PlannerConfig {
    /// Base URL, e.g. `https://planner.example.com/api`
    pub api_base: Option<String>,
    /// Bearer credential; requests go out unauthenticated when absent
    pub api_key: Option<String>,
}

impl PlannerConfig {
    pub fn new(api_base: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            api_base: Some(api_base.into()),
            api_key,
        }
    }

    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            api_base: non_empty_env(PLANNER_API_BASE_ENV),
            api_key: non_empty_env(PLANNER_API_KEY_ENV),
        }
    }

    pub(crate) fn require_api_base(&self) -> Result<&str, PlannerError> {
        self.api_base
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| value.trim_end_matches('/'))
            .ok_or(PlannerError::MissingConfig(PLANNER_API_BASE_ENV))
    }

    pub(crate) fn bearer_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
