//! Resolves who is running the extension, for owner assignment.
//!
//! Every step here is best-effort: a failure yields `None` or a partially
//! filled user, never an error.

use crate::affinity_client::AffinityClient;
use crate::diagnostics::Diagnostics;
use crate::models::{CurrentUser, EntityId, Person};

const STEP: &str = "user resolution";

/// Looks up the operator.
///
/// 1. `/whoami`.
/// 2. Internal person by email (configured email wins over the identity's own).
///    A hit replaces any person id `/whoami` returned.
/// 3. Person id through the user directory when step 2 found nothing.
pub async fn resolve_current_user(
    client: &AffinityClient,
    configured_email: Option<&str>,
    diagnostics: &mut Diagnostics,
) -> Option<CurrentUser> {
    let whoami = match client.whoami().await {
        Ok(whoami) => whoami,
        Err(e) => {
            diagnostics.record(STEP, e.caller_message());
            return None;
        }
    };

    let mut user = whoami.into_current_user();
    tracing::debug!("Whoami resolved to: {:?}", user);

    let email = configured_email
        .map(str::to_string)
        .or_else(|| user.email.clone());

    if let Some(email) = email.as_deref() {
        tracing::debug!("Looking up person by email: {}", email);
        match client.search_persons(email).await {
            Ok(persons) => {
                if let Some(person_id) = pick_person_for_email(&persons, email) {
                    tracing::info!("✓ Found internal person {} for {}", person_id, email);
                    user.person_id = Some(person_id);
                }
            }
            Err(e) => diagnostics.record(STEP, e.caller_message()),
        }
    }

    if user.person_id.is_none() {
        if let Some(user_id) = user.user_id {
            user.person_id = find_person_id_in_directory(client, user_id).await;
        }
    }

    Some(user)
}

/// Exact (case-insensitive) email match first, else the first result.
pub fn pick_person_for_email(persons: &[Person], email: &str) -> Option<EntityId> {
    persons
        .iter()
        .find(|p| p.has_email(email))
        .or_else(|| persons.first())
        .map(|p| p.id)
}

async fn find_person_id_in_directory(client: &AffinityClient, user_id: EntityId) -> Option<EntityId> {
    match client.get_user(user_id).await {
        Ok(member) if member.person_id.is_some() => return member.person_id,
        Ok(_) => tracing::debug!("User {} has no person id, scanning directory", user_id),
        Err(e) => tracing::debug!("User lookup failed, scanning directory: {}", e),
    }

    match client.list_users().await {
        Ok(users) => users
            .into_iter()
            .find(|u| u.matches_user(user_id))
            .and_then(|u| u.person_id),
        Err(e) => {
            tracing::debug!("Failed to list users: {}", e);
            None
        }
    }
}
