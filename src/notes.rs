use crate::affinity_client::AffinityClient;
use crate::diagnostics::Diagnostics;
use crate::models::{EntityId, EntityType};

/// Attaches the operator's note to the primary entity. Blank notes are
/// skipped without a request; failures are recorded, never raised.
pub async fn attach_note(
    client: &AffinityClient,
    entity_type: EntityType,
    entity_id: EntityId,
    note: Option<&str>,
    diagnostics: &mut Diagnostics,
) {
    let Some(content) = note.map(str::trim).filter(|n| !n.is_empty()) else {
        return;
    };

    match client.create_note(entity_type, entity_id, content).await {
        Ok(()) => tracing::info!("✓ Note added to entity {}", entity_id),
        Err(e) => diagnostics.record("note", e.caller_message()),
    }
}
