//! Pre-check shown in the UI before a record is added. Informational only;
//! it never blocks creation.

use crate::affinity_client::AffinityClient;
use crate::entities::stealth_org_name;
use crate::models::{
    affinity_url, DuplicateCheckResponse, EntityType, InputRecord, Organization, RecordSource,
};

/// Term the organization search is run with.
pub fn search_term(record: &InputRecord) -> String {
    match &record.source {
        RecordSource::LinkedinProfile { full_name, .. } => stealth_org_name(full_name),
        RecordSource::Website {
            company_name,
            domain,
            ..
        } => domain
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(company_name.as_str())
            .to_string(),
    }
}

/// An organization counts as the same record when its domain equals the
/// input domain, or its name equals the search term or the company name.
pub fn is_match(organization: &Organization, record: &InputRecord, term: &str) -> bool {
    let (domain, company_name) = match &record.source {
        RecordSource::Website {
            domain,
            company_name,
            ..
        } => (
            domain.as_deref().filter(|d| !d.is_empty()),
            Some(company_name.as_str()).filter(|c| !c.is_empty()),
        ),
        RecordSource::LinkedinProfile { .. } => (None, None),
    };

    domain.is_some_and(|d| organization.domain.as_deref() == Some(d))
        || organization.name == term
        || company_name.is_some_and(|c| organization.name == c)
}

pub async fn check_duplicate(
    client: &AffinityClient,
    record: &InputRecord,
    subdomain: &str,
) -> DuplicateCheckResponse {
    let term = search_term(record);

    match client.search_organizations(&term).await {
        Ok(organizations) => match organizations
            .into_iter()
            .find(|org| is_match(org, record, &term))
        {
            Some(existing) => {
                tracing::info!("Duplicate found for '{}': {}", term, existing.id);
                DuplicateCheckResponse {
                    exists: true,
                    affinity_url: Some(affinity_url(
                        subdomain,
                        EntityType::Organization,
                        existing.id,
                    )),
                    organization: Some(existing),
                    error: None,
                }
            }
            None => DuplicateCheckResponse::default(),
        },
        Err(e) => {
            tracing::warn!("Duplicate check failed: {}", e);
            DuplicateCheckResponse {
                error: Some(e.caller_message().to_string()),
                ..Default::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org(name: &str, domain: Option<&str>) -> Organization {
        Organization {
            id: 1,
            name: name.to_string(),
            domain: domain.map(str::to_string),
            person_ids: vec![],
        }
    }

    #[test]
    fn linkedin_term_is_stealth_name() {
        let record = InputRecord::linkedin("Jane Q Public", "https://linkedin.com/in/j");
        assert_eq!(search_term(&record), "Stealth_Jane Q Public");
    }

    #[test]
    fn website_term_prefers_domain() {
        assert_eq!(
            search_term(&InputRecord::website("Acme", Some("acme.com"))),
            "acme.com"
        );
        assert_eq!(search_term(&InputRecord::website("Acme", None)), "Acme");
    }

    #[test]
    fn matches_on_domain_or_names() {
        let record = InputRecord::website("Acme", Some("acme.com"));
        let term = search_term(&record);
        assert!(is_match(&org("Acme Holdings", Some("acme.com")), &record, &term));
        assert!(is_match(&org("Acme", None), &record, &term));
        assert!(is_match(&org("acme.com", None), &record, &term));
        assert!(!is_match(&org("Acme Inc", Some("acme.io")), &record, &term));
    }

    #[test]
    fn linkedin_matches_only_stealth_name() {
        let record = InputRecord::linkedin("Jane Q Public", "https://linkedin.com/in/j");
        let term = search_term(&record);
        assert!(is_match(&org("Stealth_Jane Q Public", None), &record, &term));
        assert!(!is_match(&org("Jane Q Public", None), &record, &term));
    }

    #[test]
    fn missing_domain_never_matches_missing_domain() {
        let record = InputRecord::website("Acme", None);
        assert!(!is_match(&org("Other", None), &record, "Acme"));
    }
}
