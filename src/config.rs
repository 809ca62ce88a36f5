use serde::Deserialize;

use crate::errors::AppError;
use crate::models::TargetList;

pub const DEFAULT_AFFINITY_API_BASE: &str = "https://api.affinity.co";
pub const DEFAULT_TENANT_SUBDOMAIN: &str = "app";
pub const DEFAULT_PEOPLE_STATUS: &str = "Reached Out";

const MISSING_CREDENTIALS: &str =
    "Please configure your Affinity API key and List ID in the extension settings.";
const MISSING_PEOPLE_LIST: &str =
    "Please configure the Interesting People List ID in extension settings.";

/// Server-level configuration, loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub affinity_base_url: String,
    /// Request timeout for Affinity calls. `None` keeps the HTTP client's default.
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            affinity_base_url: {
                let url = std::env::var("AFFINITY_API_BASE")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_AFFINITY_API_BASE.to_string());
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    anyhow::bail!("AFFINITY_API_BASE must start with http:// or https://");
                }
                url.trim_end_matches('/').to_string()
            },
            request_timeout_secs: match std::env::var("AFFINITY_TIMEOUT_SECS") {
                Ok(raw) if !raw.trim().is_empty() => Some(raw.trim().parse().map_err(|_| {
                    anyhow::anyhow!("AFFINITY_TIMEOUT_SECS must be a whole number of seconds")
                })?),
                _ => None,
            },
        };

        tracing::debug!("Affinity API base: {}", config.affinity_base_url);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

/// Credentials and list identifiers supplied by the operator.
///
/// Read fresh for every invocation; nothing here is cached between requests.
#[derive(Debug, Clone, Default)]
pub struct AffinitySettings {
    pub api_key: Option<String>,
    pub list_id: Option<String>,
    pub people_list_id: Option<String>,
    pub tenant_subdomain: Option<String>,
    pub user_email: Option<String>,
    pub people_status: Option<String>,
}

impl AffinitySettings {
    pub fn from_env() -> Self {
        fn var(name: &str) -> Option<String> {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            api_key: var("AFFINITY_API_KEY"),
            list_id: var("AFFINITY_LIST_ID"),
            people_list_id: var("AFFINITY_PEOPLE_LIST_ID"),
            tenant_subdomain: var("AFFINITY_TENANT_SUBDOMAIN"),
            user_email: var("AFFINITY_USER_EMAIL"),
            people_status: var("AFFINITY_PEOPLE_STATUS"),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Returns the list the record must be placed on, or the precondition
    /// failure the caller should see.
    pub fn require_list(&self, target: TargetList) -> Result<&str, AppError> {
        let Some(primary) = self
            .list_id
            .as_deref()
            .filter(|id| !id.is_empty() && self.has_api_key())
        else {
            return Err(AppError::Configuration(MISSING_CREDENTIALS.to_string()));
        };

        match target {
            TargetList::MasterDeal => Ok(primary),
            TargetList::InterestingPeople => self
                .people_list_id
                .as_deref()
                .filter(|id| !id.is_empty())
                .ok_or_else(|| AppError::Configuration(MISSING_PEOPLE_LIST.to_string())),
        }
    }

    pub fn subdomain(&self) -> &str {
        self.tenant_subdomain
            .as_deref()
            .unwrap_or(DEFAULT_TENANT_SUBDOMAIN)
    }

    pub fn people_status(&self) -> &str {
        self.people_status.as_deref().unwrap_or(DEFAULT_PEOPLE_STATUS)
    }

    pub fn user_email(&self) -> Option<&str> {
        self.user_email.as_deref().filter(|e| !e.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> AffinitySettings {
        AffinitySettings {
            api_key: Some("key".to_string()),
            list_id: Some("100".to_string()),
            people_list_id: Some("200".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn master_deal_uses_primary_list() {
        assert_eq!(settings().require_list(TargetList::MasterDeal).unwrap(), "100");
    }

    #[test]
    fn interesting_people_uses_people_list() {
        assert_eq!(
            settings()
                .require_list(TargetList::InterestingPeople)
                .unwrap(),
            "200"
        );
    }

    #[test]
    fn missing_api_key_is_a_precondition_failure() {
        let settings = AffinitySettings {
            api_key: None,
            ..settings()
        };
        let err = settings.require_list(TargetList::MasterDeal).unwrap_err();
        assert_eq!(err.caller_message(), MISSING_CREDENTIALS);
    }

    #[test]
    fn people_flow_still_requires_primary_list() {
        let settings = AffinitySettings {
            list_id: None,
            ..settings()
        };
        let err = settings
            .require_list(TargetList::InterestingPeople)
            .unwrap_err();
        assert_eq!(err.caller_message(), MISSING_CREDENTIALS);
    }

    #[test]
    fn missing_people_list_reported_separately() {
        let settings = AffinitySettings {
            people_list_id: None,
            ..settings()
        };
        let err = settings
            .require_list(TargetList::InterestingPeople)
            .unwrap_err();
        assert_eq!(err.caller_message(), MISSING_PEOPLE_LIST);
    }

    #[test]
    fn defaults_apply() {
        let settings = AffinitySettings::default();
        assert_eq!(settings.subdomain(), "app");
        assert_eq!(settings.people_status(), "Reached Out");
        assert!(settings.user_email().is_none());
    }
}
