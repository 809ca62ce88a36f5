//! List field discovery and the owner / status writes that depend on it.

use crate::affinity_client::AffinityClient;
use crate::diagnostics::Diagnostics;
use crate::models::{CurrentUser, EntityId, Field, ListEntry};
use serde_json::{json, Value};

const OWNER_FIELD_NAMES: &[&str] = &["owner", "owners"];
const STATUS_FIELD_NAMES: &[&str] = &["status"];

/// Field schema of one list, fetched at most once per invocation.
///
/// Field ids differ per tenant and can change at any time, so this never
/// outlives the request that built it.
pub struct ListSchema {
    list_id: String,
    fields: Option<Vec<Field>>,
}

impl ListSchema {
    pub fn new(list_id: &str) -> Self {
        Self {
            list_id: list_id.to_string(),
            fields: None,
        }
    }

    /// The list's fields, loading them on first use.
    ///
    /// Tries the list-scoped endpoint first and falls back to the global
    /// catalog filtered to this list. An unreachable schema reads as empty.
    pub async fn fields(&mut self, client: &AffinityClient) -> &[Field] {
        if self.fields.is_none() {
            let loaded = match client.list_fields(&self.list_id).await {
                Ok(fields) => fields,
                Err(e) => {
                    tracing::debug!("List fields endpoint failed: {}", e);
                    match client.all_fields().await {
                        Ok(all) => all
                            .into_iter()
                            .filter(|f| f.belongs_to_list(&self.list_id))
                            .collect(),
                        Err(e) => {
                            tracing::warn!("Global fields request failed: {}", e);
                            Vec::new()
                        }
                    }
                }
            };
            tracing::debug!(
                "Fields for list {}: {:?}",
                self.list_id,
                loaded.iter().map(|f| (&f.name, f.id)).collect::<Vec<_>>()
            );
            self.fields = Some(loaded);
        }
        self.fields.as_deref().unwrap_or_default()
    }

    pub async fn owner_field(&mut self, client: &AffinityClient) -> Option<Field> {
        find_named(self.fields(client).await, OWNER_FIELD_NAMES)
    }

    pub async fn status_field(&mut self, client: &AffinityClient) -> Option<Field> {
        find_named(self.fields(client).await, STATUS_FIELD_NAMES)
    }
}

fn find_named(fields: &[Field], names: &[&str]) -> Option<Field> {
    fields.iter().find(|f| f.is_named(names)).cloned()
}

/// Picks the value to send for a status field: the id of a dropdown option
/// whose label matches, else the literal text.
pub fn status_value(field: &Field, status: &str) -> Value {
    field
        .dropdown_options
        .iter()
        .find(|o| o.text.eq_ignore_ascii_case(status))
        .map(|o| o.id.clone())
        .unwrap_or_else(|| json!(status))
}

/// Records the operator as owner of a list entry.
///
/// Which of the operator's ids the owner field accepts depends on the tenant,
/// so candidates are tried in priority order until one is accepted. Returns
/// the id that stuck.
pub async fn assign_owner(
    client: &AffinityClient,
    schema: &mut ListSchema,
    list_entry: &ListEntry,
    entity_id: EntityId,
    user: &CurrentUser,
    diagnostics: &mut Diagnostics,
) -> Option<EntityId> {
    let Some(field) = schema.owner_field(client).await else {
        tracing::info!("Owner field not found on list, skipping owner assignment");
        return None;
    };

    let candidates = user.owner_candidates();
    tracing::debug!("Trying owner ids {:?} on field {}", candidates, field.id);

    for owner_id in candidates {
        match client
            .create_field_value(field.id, entity_id, Some(list_entry.id), json!(owner_id))
            .await
        {
            Ok(()) => {
                tracing::info!("✓ Owner set with id {}", owner_id);
                return Some(owner_id);
            }
            Err(e) => tracing::debug!("Owner id {} rejected: {}", owner_id, e),
        }
    }

    diagnostics.record("owner", "all owner id attempts failed");
    None
}

/// Sets the list entry's status field.
pub async fn assign_status(
    client: &AffinityClient,
    schema: &mut ListSchema,
    list_entry: &ListEntry,
    entity_id: EntityId,
    status: &str,
    diagnostics: &mut Diagnostics,
) {
    let Some(field) = schema.status_field(client).await else {
        tracing::info!("Status field not found on list, skipping status");
        return;
    };

    let value = status_value(&field, status);
    match client
        .create_field_value(field.id, entity_id, Some(list_entry.id), value)
        .await
    {
        Ok(()) => tracing::info!("✓ Status set to {}", status),
        Err(e) => diagnostics.record("status", e.caller_message()),
    }
}
