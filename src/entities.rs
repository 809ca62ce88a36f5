//! Organization / person creation, person dedup and linking.

use crate::affinity_client::AffinityClient;
use crate::diagnostics::Diagnostics;
use crate::errors::AppError;
use crate::models::{EntityId, Organization, Person};
use serde_json::json;

pub const STEALTH_PREFIX: &str = "Stealth_";

/// Search hits checked for a matching profile URL before creating a new person.
pub const MAX_PROFILE_CANDIDATES: usize = 5;

/// Organization name used for people who have not announced a company yet.
pub fn stealth_org_name(full_name: &str) -> String {
    format!("{}{}", STEALTH_PREFIX, full_name)
}

/// First token is the first name, the rest the last name. A single token
/// is used for both.
pub fn split_full_name(full_name: &str) -> (String, String) {
    let mut tokens = full_name.split_whitespace();
    let first = tokens.next().unwrap_or_default().to_string();
    let rest = tokens.collect::<Vec<_>>().join(" ");
    let last = if rest.is_empty() { first.clone() } else { rest };
    (first, last)
}

/// Compares profile URLs ignoring scheme, `www.`, query, fragment, case and
/// trailing slashes.
pub fn same_profile_url(a: &str, b: &str) -> bool {
    fn normalize(raw: &str) -> String {
        let raw = raw.trim();
        let candidate = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("https://{}", raw)
        };
        match url::Url::parse(&candidate) {
            Ok(parsed) => {
                let host = parsed.host_str().unwrap_or_default().to_lowercase();
                let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
                format!("{}{}", host, parsed.path().trim_end_matches('/').to_lowercase())
            }
            Err(_) => raw.trim_end_matches('/').to_lowercase(),
        }
    }

    !a.trim().is_empty() && normalize(a) == normalize(b)
}

pub async fn create_organization(
    client: &AffinityClient,
    name: &str,
    domain: Option<&str>,
) -> Result<Organization, AppError> {
    let organization = client.create_organization(name, domain).await?;
    tracing::info!("✓ Organization ready: {} ({})", organization.name, organization.id);
    Ok(organization)
}

/// Finds a person already carrying this profile URL, or creates one.
///
/// Search by term is fuzzy, so a hit is only reused once one of its field
/// values is confirmed to be the same URL.
pub async fn find_or_create_person(
    client: &AffinityClient,
    first_name: &str,
    last_name: &str,
    profile_url: Option<&str>,
    diagnostics: &mut Diagnostics,
) -> Result<Person, AppError> {
    if let Some(url) = profile_url {
        if let Some(existing) = find_person_by_profile_url(client, url).await {
            tracing::info!("✓ Reusing existing person {} for {}", existing.id, url);
            return Ok(existing);
        }
    }

    let person = client.create_person(first_name, last_name).await?;
    tracing::info!("✓ Person created: {}", person.id);

    if let Some(url) = profile_url {
        attach_profile_url(client, person.id, url, diagnostics).await;
    }

    Ok(person)
}

async fn find_person_by_profile_url(client: &AffinityClient, url: &str) -> Option<Person> {
    let candidates = match client.search_persons(url).await {
        Ok(candidates) => candidates,
        Err(e) => {
            tracing::warn!("Person search failed, will create new: {}", e);
            return None;
        }
    };

    if candidates.len() > MAX_PROFILE_CANDIDATES {
        tracing::debug!(
            "{} search hits for {}, verifying the first {}",
            candidates.len(),
            url,
            MAX_PROFILE_CANDIDATES
        );
    }

    for candidate in candidates.into_iter().take(MAX_PROFILE_CANDIDATES) {
        match client.person_field_values(candidate.id).await {
            Ok(values) => {
                let verified = values
                    .iter()
                    .filter_map(|v| v.value.as_str())
                    .any(|value| same_profile_url(value, url));
                if verified {
                    return Some(candidate);
                }
                tracing::debug!(
                    "Search hit {} does not carry profile URL {}, ignoring",
                    candidate.id,
                    url
                );
            }
            Err(e) => tracing::debug!(
                "Could not verify search hit {}, ignoring: {}",
                candidate.id,
                e
            ),
        }
    }

    None
}

async fn attach_profile_url(
    client: &AffinityClient,
    person_id: EntityId,
    url: &str,
    diagnostics: &mut Diagnostics,
) {
    let fields = match client.person_fields().await {
        Ok(fields) => fields,
        Err(e) => {
            diagnostics.record("linkedin field", e.caller_message());
            return;
        }
    };

    let Some(field) = fields.iter().find(|f| f.looks_like_linkedin()) else {
        tracing::debug!("No LinkedIn person field configured");
        return;
    };

    if let Err(e) = client
        .create_field_value(field.id, person_id, None, json!(url))
        .await
    {
        diagnostics.record("linkedin field", e.caller_message());
    }
}

/// Associates a person with an organization.
///
/// Affinity has no single call that reliably does this across tenants, so
/// three independent writes are fired together and none is verified.
pub async fn link_person_to_organization(
    client: &AffinityClient,
    person: &Person,
    organization: &Organization,
    diagnostics: &mut Diagnostics,
) {
    let person_ids = with_id(&organization.person_ids, person.id);
    let organization_ids = with_id(&person.organization_ids, organization.id);

    let (org_update, person_update, relationship) = tokio::join!(
        client.set_organization_persons(organization.id, &person_ids),
        client.set_person_organizations(person.id, &organization_ids),
        client.create_relationship_strength(person.id, organization.id),
    );

    for (step, result) in [
        ("link via organization", org_update),
        ("link via person", person_update),
        ("link via relationship strength", relationship),
    ] {
        if let Err(e) = result {
            diagnostics.record(step, e.caller_message());
        }
    }

    tracing::info!(
        "Linked person {} to organization {}",
        person.id,
        organization.id
    );
}

fn with_id(existing: &[EntityId], id: EntityId) -> Vec<EntityId> {
    let mut ids = existing.to_vec();
    if !ids.contains(&id) {
        ids.push(id);
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_multi_token_names() {
        assert_eq!(
            split_full_name("Jane Q Public"),
            ("Jane".to_string(), "Q Public".to_string())
        );
    }

    #[test]
    fn single_token_name_repeats() {
        assert_eq!(
            split_full_name("Cher"),
            ("Cher".to_string(), "Cher".to_string())
        );
    }

    #[test]
    fn extra_whitespace_is_collapsed() {
        assert_eq!(
            split_full_name("  Ada   King  Lovelace "),
            ("Ada".to_string(), "King Lovelace".to_string())
        );
    }

    #[test]
    fn stealth_name_is_prefixed_verbatim() {
        assert_eq!(stealth_org_name("Jane Q Public"), "Stealth_Jane Q Public");
    }

    #[test]
    fn profile_urls_compare_loosely() {
        assert!(same_profile_url(
            "https://www.linkedin.com/in/janeqpublic/",
            "https://linkedin.com/in/janeqpublic"
        ));
        assert!(same_profile_url(
            "linkedin.com/in/JaneQPublic?trk=abc",
            "http://linkedin.com/in/janeqpublic"
        ));
        assert!(!same_profile_url(
            "https://linkedin.com/in/janeqpublic",
            "https://linkedin.com/in/johndoe"
        ));
        assert!(!same_profile_url("", "https://linkedin.com/in/x"));
    }

    #[test]
    fn with_id_keeps_existing_and_dedups() {
        assert_eq!(with_id(&[1, 2], 3), vec![1, 2, 3]);
        assert_eq!(with_id(&[1, 2], 2), vec![1, 2]);
    }
}
