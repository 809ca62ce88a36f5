use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::AppError;

/// Remote identifiers are opaque and system-assigned; we only ever echo them back.
pub type EntityId = i64;

/// Treats an explicit `null` the same as a missing array.
fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// ============ Caller input ============

/// Which tracking list the record should land on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetList {
    #[default]
    MasterDeal,
    InterestingPeople,
}

/// What the page scraper found.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordSource {
    #[serde(rename_all = "camelCase")]
    LinkedinProfile {
        #[serde(default)]
        full_name: String,
        #[serde(default, alias = "linkedinUrl")]
        profile_url: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Website {
        #[serde(default)]
        company_name: String,
        #[serde(default)]
        domain: Option<String>,
        #[serde(default)]
        page_url: Option<String>,
    },
}

/// A record handed over by the content script.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputRecord {
    #[serde(flatten)]
    pub source: RecordSource,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub target_list: Option<TargetList>,
}

impl InputRecord {
    pub fn linkedin(full_name: &str, profile_url: &str) -> Self {
        Self {
            source: RecordSource::LinkedinProfile {
                full_name: full_name.to_string(),
                profile_url: Some(profile_url.to_string()),
            },
            note: None,
            target_list: None,
        }
    }

    pub fn website(company_name: &str, domain: Option<&str>) -> Self {
        Self {
            source: RecordSource::Website {
                company_name: company_name.to_string(),
                domain: domain.map(str::to_string),
                page_url: None,
            },
            note: None,
            target_list: None,
        }
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }

    pub fn with_target(mut self, target: TargetList) -> Self {
        self.target_list = Some(target);
        self
    }

    pub fn target(&self) -> TargetList {
        self.target_list.unwrap_or_default()
    }

    /// The note to attach, if it has any content once trimmed.
    pub fn trimmed_note(&self) -> Option<&str> {
        self.note
            .as_deref()
            .map(str::trim)
            .filter(|note| !note.is_empty())
    }

    /// The scraped profile URL, ignoring blanks.
    pub fn profile_url(&self) -> Option<&str> {
        match &self.source {
            RecordSource::LinkedinProfile { profile_url, .. } => profile_url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty()),
            RecordSource::Website { .. } => None,
        }
    }

    /// Rejects records the pipeline cannot name anything after.
    pub fn validate(&self) -> Result<(), AppError> {
        match &self.source {
            RecordSource::LinkedinProfile { full_name, .. } if full_name.trim().is_empty() => {
                Err(AppError::BadRequest(
                    "Could not extract profile name. Make sure you are on a LinkedIn profile page."
                        .to_string(),
                ))
            }
            RecordSource::Website { company_name, .. } if company_name.trim().is_empty() => Err(
                AppError::BadRequest("Could not determine a company name for this page.".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

/// Request envelope sent by the extension.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    AddToAffinity(InputRecord),
    CheckDuplicate(InputRecord),
}

// ============ Affinity entities ============

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Organization {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub person_ids: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Person {
    pub id: EntityId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub emails: Vec<String>,
    #[serde(default)]
    pub primary_email: Option<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub organization_ids: Vec<EntityId>,
}

impl Person {
    pub fn has_email(&self, email: &str) -> bool {
        self.emails
            .iter()
            .chain(self.primary_email.iter())
            .any(|e| e.eq_ignore_ascii_case(email))
    }
}

/// Discriminator Affinity expects when creating a list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    Organization,
    Person,
}

impl EntityType {
    pub fn code(self) -> u8 {
        match self {
            EntityType::Organization => 0,
            EntityType::Person => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ListEntry {
    pub id: EntityId,
    #[serde(default)]
    pub list_id: Option<EntityId>,
    #[serde(default)]
    pub entity_id: Option<EntityId>,
    #[serde(default)]
    pub entity_type: Option<u8>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DropdownOption {
    pub id: Value,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Field {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub list_id: Option<EntityId>,
    #[serde(default)]
    pub value_type: Value,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub dropdown_options: Vec<DropdownOption>,
}

impl Field {
    /// Case-insensitive exact match against any of `names`.
    pub fn is_named(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.name.eq_ignore_ascii_case(n))
    }

    pub fn belongs_to_list(&self, list_id: &str) -> bool {
        self.list_id
            .is_some_and(|id| id.to_string() == list_id.trim())
    }

    pub fn looks_like_linkedin(&self) -> bool {
        self.name.to_lowercase().contains("linkedin")
            || self
                .value_type
                .as_str()
                .is_some_and(|t| t.eq_ignore_ascii_case("linkedin"))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FieldValue {
    pub id: EntityId,
    #[serde(default)]
    pub field_id: Option<EntityId>,
    #[serde(default)]
    pub entity_id: Option<EntityId>,
    #[serde(default)]
    pub list_entry_id: Option<EntityId>,
    #[serde(default)]
    pub value: Value,
}

// ============ Operator identity ============

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WhoAmIUser {
    pub id: Option<EntityId>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WhoAmIGrant {
    pub id: Option<EntityId>,
}

/// `/whoami` response. Tenants have been seen returning both a flat and a
/// nested shape, so both are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WhoAmI {
    pub person_id: Option<EntityId>,
    pub user_id: Option<EntityId>,
    pub id: Option<EntityId>,
    pub grant_id: Option<EntityId>,
    pub email: Option<String>,
    pub user: Option<WhoAmIUser>,
    pub grant: Option<WhoAmIGrant>,
}

impl WhoAmI {
    pub fn into_current_user(self) -> CurrentUser {
        let user = self.user.unwrap_or_default();
        CurrentUser {
            person_id: self.person_id,
            user_id: self.user_id.or(user.id),
            id: self.id,
            grant_id: self.grant_id.or(self.grant.and_then(|g| g.id)),
            email: self.email.or(user.email).filter(|e| !e.is_empty()),
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

/// Entry from the user directory (`/users`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamMember {
    pub id: Option<EntityId>,
    pub user_id: Option<EntityId>,
    pub person_id: Option<EntityId>,
}

impl TeamMember {
    pub fn matches_user(&self, user_id: EntityId) -> bool {
        self.id == Some(user_id) || self.user_id == Some(user_id)
    }
}

/// The operator running the extension.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub person_id: Option<EntityId>,
    pub user_id: Option<EntityId>,
    pub id: Option<EntityId>,
    pub grant_id: Option<EntityId>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl CurrentUser {
    /// Values to try for an owner field, most likely to be accepted first.
    pub fn owner_candidates(&self) -> Vec<EntityId> {
        [self.person_id, self.user_id, self.id, self.grant_id]
            .into_iter()
            .flatten()
            .collect()
    }
}

// ============ Caller responses ============

/// Everything the pipeline produced on success.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOutcome {
    pub organization: Option<Organization>,
    pub person: Option<Person>,
    pub list_entry: ListEntry,
    pub owner: Option<CurrentUser>,
    /// Operator id the list's owner field accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<EntityId>,
    pub affinity_url: String,
    /// Best-effort steps that did not go through.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddToAffinityResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: Option<AddOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<AddOutcome, AppError>> for AddToAffinityResponse {
    fn from(result: Result<AddOutcome, AppError>) -> Self {
        match result {
            Ok(outcome) => Self {
                success: true,
                outcome: Some(outcome),
                error: None,
            },
            Err(e) => Self {
                success: false,
                outcome: None,
                error: Some(e.caller_message().to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCheckResponse {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<Organization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affinity_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Human-facing link to an entity in the operator's tenant.
pub fn affinity_url(subdomain: &str, entity: EntityType, id: EntityId) -> String {
    let collection = match entity {
        EntityType::Organization => "companies",
        EntityType::Person => "persons",
    };
    format!("https://{}.affinity.co/{}/{}", subdomain, collection, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_linkedin_record_with_extension_key() {
        let record: InputRecord = serde_json::from_value(json!({
            "type": "linkedin_profile",
            "fullName": "Jane Q Public",
            "linkedinUrl": "https://linkedin.com/in/janeqpublic",
            "targetList": "interesting_people"
        }))
        .unwrap();

        assert_eq!(record.target(), TargetList::InterestingPeople);
        assert_eq!(
            record.profile_url(),
            Some("https://linkedin.com/in/janeqpublic")
        );
    }

    #[test]
    fn parses_website_record_defaults_to_master_deal() {
        let record: InputRecord = serde_json::from_value(json!({
            "type": "website",
            "companyName": "Acme",
            "domain": "acme.com",
            "note": "   "
        }))
        .unwrap();

        assert_eq!(record.target(), TargetList::MasterDeal);
        assert!(record.trimmed_note().is_none());
        assert!(record.profile_url().is_none());
    }

    #[test]
    fn parses_client_message_envelope() {
        let message: ClientMessage = serde_json::from_value(json!({
            "action": "checkDuplicate",
            "data": {"type": "website", "companyName": "Acme"}
        }))
        .unwrap();

        assert!(matches!(message, ClientMessage::CheckDuplicate(_)));
    }

    #[test]
    fn blank_names_fail_validation() {
        assert!(InputRecord::linkedin("  ", "https://x").validate().is_err());
        assert!(InputRecord::website("", Some("acme.com")).validate().is_err());
        assert!(InputRecord::website("Acme", None).validate().is_ok());
    }

    #[test]
    fn owner_candidates_follow_priority_and_skip_missing() {
        let user = CurrentUser {
            person_id: None,
            user_id: Some(2),
            id: Some(3),
            grant_id: Some(4),
            ..Default::default()
        };
        assert_eq!(user.owner_candidates(), vec![2, 3, 4]);
    }

    #[test]
    fn whoami_nested_shape_is_flattened() {
        let whoami: WhoAmI = serde_json::from_value(json!({
            "tenant": {"id": 1, "name": "Fund", "subdomain": "fund"},
            "user": {"id": 42, "first_name": "Op", "last_name": "Erator", "email": "op@fund.com"},
            "grant": {"type": "api_key", "scope": "external_api"}
        }))
        .unwrap();

        let user = whoami.into_current_user();
        assert_eq!(user.user_id, Some(42));
        assert_eq!(user.email.as_deref(), Some("op@fund.com"));
        assert_eq!(user.grant_id, None);
    }

    #[test]
    fn organization_tolerates_null_person_ids() {
        let org: Organization = serde_json::from_value(json!({
            "id": 7, "name": "Acme", "domain": null, "person_ids": null
        }))
        .unwrap();
        assert!(org.person_ids.is_empty());
    }

    #[test]
    fn failed_response_serializes_error_only() {
        let response = AddToAffinityResponse::from(Err(AppError::ExternalApiError(
            "Failed to create organization: Name taken".to_string(),
        )));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"success": false, "error": "Failed to create organization: Name taken"})
        );
    }

    #[test]
    fn affinity_url_uses_collection_for_entity() {
        assert_eq!(
            affinity_url("fund", EntityType::Organization, 9),
            "https://fund.affinity.co/companies/9"
        );
        assert_eq!(
            affinity_url("app", EntityType::Person, 3),
            "https://app.affinity.co/persons/3"
        );
    }
}
