use crate::errors::AppError;
use crate::models::{
    EntityId, EntityType, Field, FieldValue, ListEntry, Organization, Person, TeamMember, WhoAmI,
};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing;

/// Search endpoints answer either with a paged object or a bare array
/// depending on API version.
#[derive(Deserialize)]
#[serde(untagged)]
enum PersonSearch {
    Paged { persons: Vec<Person> },
    Bare(Vec<Person>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OrganizationSearch {
    Paged { organizations: Vec<Organization> },
    Bare(Vec<Organization>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UserListing {
    Paged { users: Vec<TeamMember> },
    Bare(Vec<TeamMember>),
}

/// Client for the Affinity REST API.
///
/// Authenticates with HTTP Basic, empty username and the API key as password.
#[derive(Clone)]
pub struct AffinityClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AffinityClient {
    /// Creates a new `AffinityClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the Affinity API.
    /// * `api_key` - The operator's API key.
    /// * `timeout` - Optional request timeout; the reqwest default applies otherwise.
    pub fn new(
        base_url: String,
        api_key: String,
        timeout: Option<Duration>,
    ) -> Result<Self, AppError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            AppError::InternalError(format!("Failed to create Affinity client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .basic_auth("", Some(&self.api_key))
            .header("Content-Type", "application/json")
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        action: &str,
    ) -> Result<Response, AppError> {
        let response = builder.send().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to {}: {}", action, e))
        })?;

        if !response.status().is_success() {
            return Err(remote_failure(response, action).await);
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        action: &str,
    ) -> Result<T, AppError> {
        self.send(builder, action).await?.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse response to {}: {}", action, e))
        })
    }

    /// Sends a write whose response body we don't need.
    async fn send_discarding(
        &self,
        builder: reqwest::RequestBuilder,
        action: &str,
    ) -> Result<(), AppError> {
        let response = self.send(builder, action).await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::debug!("{} -> {} {}", action, status, body);
        Ok(())
    }

    // ---------- identity ----------

    pub async fn whoami(&self) -> Result<WhoAmI, AppError> {
        self.send_json(self.request(Method::GET, "/whoami"), "fetch current user")
            .await
    }

    pub async fn get_user(&self, user_id: EntityId) -> Result<TeamMember, AppError> {
        self.send_json(
            self.request(Method::GET, &format!("/users/{}", user_id)),
            "fetch user details",
        )
        .await
    }

    pub async fn list_users(&self) -> Result<Vec<TeamMember>, AppError> {
        let listing: UserListing = self
            .send_json(self.request(Method::GET, "/users"), "list users")
            .await?;
        Ok(match listing {
            UserListing::Paged { users } | UserListing::Bare(users) => users,
        })
    }

    // ---------- organizations ----------

    pub async fn search_organizations(&self, term: &str) -> Result<Vec<Organization>, AppError> {
        tracing::debug!("Searching organizations for term: {}", term);
        let search: OrganizationSearch = self
            .send_json(
                self.request(Method::GET, "/organizations")
                    .query(&[("term", term)]),
                "search organizations",
            )
            .await?;
        Ok(match search {
            OrganizationSearch::Paged { organizations } | OrganizationSearch::Bare(organizations) => {
                organizations
            }
        })
    }

    pub async fn create_organization(
        &self,
        name: &str,
        domain: Option<&str>,
    ) -> Result<Organization, AppError> {
        let mut body = json!({ "name": name });
        if let Some(domain) = domain.filter(|d| !d.trim().is_empty()) {
            body["domain"] = json!(domain);
        }

        tracing::info!("Creating organization in Affinity: {}", name);
        self.send_json(
            self.request(Method::POST, "/organizations").json(&body),
            "create organization",
        )
        .await
    }

    pub async fn set_organization_persons(
        &self,
        organization_id: EntityId,
        person_ids: &[EntityId],
    ) -> Result<(), AppError> {
        self.send_discarding(
            self.request(Method::PUT, &format!("/organizations/{}", organization_id))
                .json(&json!({ "person_ids": person_ids })),
            "update organization persons",
        )
        .await
    }

    // ---------- persons ----------

    pub async fn search_persons(&self, term: &str) -> Result<Vec<Person>, AppError> {
        tracing::debug!("Searching persons for term: {}", term);
        let search: PersonSearch = self
            .send_json(
                self.request(Method::GET, "/persons").query(&[("term", term)]),
                "search persons",
            )
            .await?;
        Ok(match search {
            PersonSearch::Paged { persons } | PersonSearch::Bare(persons) => persons,
        })
    }

    pub async fn create_person(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Person, AppError> {
        tracing::info!("Creating person in Affinity: {} {}", first_name, last_name);
        self.send_json(
            self.request(Method::POST, "/persons").json(&json!({
                "first_name": first_name,
                "last_name": last_name,
            })),
            "create person",
        )
        .await
    }

    pub async fn set_person_organizations(
        &self,
        person_id: EntityId,
        organization_ids: &[EntityId],
    ) -> Result<(), AppError> {
        self.send_discarding(
            self.request(Method::PUT, &format!("/persons/{}", person_id))
                .json(&json!({ "organization_ids": organization_ids })),
            "update person organizations",
        )
        .await
    }

    pub async fn person_fields(&self) -> Result<Vec<Field>, AppError> {
        self.send_json(
            self.request(Method::GET, "/persons/fields"),
            "fetch person fields",
        )
        .await
    }

    pub async fn create_relationship_strength(
        &self,
        person_id: EntityId,
        organization_id: EntityId,
    ) -> Result<(), AppError> {
        self.send_discarding(
            self.request(Method::POST, "/relationship-strengths")
                .json(&json!({
                    "internal_id": person_id,
                    "external_id": organization_id,
                    "strength": 5,
                })),
            "create relationship strength",
        )
        .await
    }

    // ---------- lists & fields ----------

    pub async fn create_list_entry(
        &self,
        list_id: &str,
        entity_id: EntityId,
        entity_type: EntityType,
    ) -> Result<ListEntry, AppError> {
        tracing::info!(
            "Adding entity {} (type {}) to list {}",
            entity_id,
            entity_type.code(),
            list_id
        );
        self.send_json(
            self.request(Method::POST, &format!("/lists/{}/list-entries", list_id))
                .json(&json!({
                    "entity_id": entity_id,
                    "entity_type": entity_type.code(),
                })),
            "add to list",
        )
        .await
    }

    pub async fn list_fields(&self, list_id: &str) -> Result<Vec<Field>, AppError> {
        self.send_json(
            self.request(Method::GET, &format!("/lists/{}/fields", list_id)),
            "fetch list fields",
        )
        .await
    }

    pub async fn all_fields(&self) -> Result<Vec<Field>, AppError> {
        self.send_json(self.request(Method::GET, "/fields"), "fetch fields")
            .await
    }

    pub async fn person_field_values(
        &self,
        person_id: EntityId,
    ) -> Result<Vec<FieldValue>, AppError> {
        self.send_json(
            self.request(Method::GET, "/field-values")
                .query(&[("person_id", person_id)]),
            "fetch person field values",
        )
        .await
    }

    /// Writes a field value. `list_entry_id` is required for list-scoped fields.
    pub async fn create_field_value(
        &self,
        field_id: EntityId,
        entity_id: EntityId,
        list_entry_id: Option<EntityId>,
        value: Value,
    ) -> Result<(), AppError> {
        let mut body = json!({
            "field_id": field_id,
            "entity_id": entity_id,
            "value": value,
        });
        if let Some(list_entry_id) = list_entry_id {
            body["list_entry_id"] = json!(list_entry_id);
        }
        tracing::debug!("Setting field value with: {}", body);

        self.send_discarding(
            self.request(Method::POST, "/field-values").json(&body),
            "set field value",
        )
        .await
    }

    // ---------- notes ----------

    pub async fn create_note(
        &self,
        entity_type: EntityType,
        entity_id: EntityId,
        content: &str,
    ) -> Result<(), AppError> {
        let scope = match entity_type {
            EntityType::Organization => "organization_ids",
            EntityType::Person => "person_ids",
        };
        let mut body = json!({ "content": content });
        body[scope] = json!([entity_id]);

        self.send_discarding(
            self.request(Method::POST, "/notes").json(&body),
            "add note",
        )
        .await
    }
}

/// Builds the error for a non-success response, preferring Affinity's own
/// message over the generic status text.
async fn remote_failure(response: Response, action: &str) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::debug!("Affinity returned {} to {}: {}", status, action, body);

    let detail = remote_message(&body)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| status.as_str().to_string());

    AppError::ExternalApiError(format!("Failed to {}: {}", action, detail))
}

fn remote_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    parsed
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| {
            parsed
                .get("errors")
                .and_then(|errors| errors.get(0))
                .and_then(|first| first.get("message").or(Some(first)))
                .and_then(Value::as_str)
        })
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}
