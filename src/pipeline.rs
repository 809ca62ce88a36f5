//! Record-reconciliation workflow shared by the HTTP handlers and the CLI.
//!
//! One invocation runs these steps in order:
//! 1. Check settings and input (no network before this passes)
//! 2. Resolve the operator (best-effort)
//! 3. Create the organization and/or person, link them
//! 4. Place the primary entity on the target list
//! 5. Assign owner, and status for the people list (best-effort)
//! 6. Attach the note (best-effort)
//!
//! Steps 3 and 4 are fatal; Affinity has no transactions, so anything
//! already created stays created when a later step fails.
use crate::affinity_client::AffinityClient;
use crate::config::{AffinitySettings, Config};
use crate::diagnostics::Diagnostics;
use crate::duplicates;
use crate::entities::{self, split_full_name, stealth_org_name};
use crate::errors::AppError;
use crate::fields::{self, ListSchema};
use crate::identity;
use crate::models::{
    affinity_url, AddOutcome, CurrentUser, DuplicateCheckResponse, EntityType, InputRecord,
    RecordSource, TargetList,
};
use crate::notes;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

pub struct ReconciliationEngine {
    client: AffinityClient,
    settings: AffinitySettings,
}

impl ReconciliationEngine {
    pub fn new(client: AffinityClient, settings: AffinitySettings) -> Self {
        Self { client, settings }
    }

    /// Builds an engine for one invocation from server config and freshly
    /// read settings.
    pub fn from_config(config: &Config, settings: AffinitySettings) -> Result<Self, AppError> {
        let client = AffinityClient::new(
            config.affinity_base_url.clone(),
            settings.api_key.clone().unwrap_or_default(),
            config.request_timeout_secs.map(Duration::from_secs),
        )?;
        Ok(Self::new(client, settings))
    }

    /// Creates or reuses the records for `record` and files them on the
    /// target list.
    pub async fn add_to_affinity(&self, record: &InputRecord) -> Result<AddOutcome, AppError> {
        let invocation = Uuid::new_v4();
        let target = record.target();
        self.add_inner(record, target)
            .instrument(tracing::info_span!("add_to_affinity", %invocation, ?target))
            .await
    }

    async fn add_inner(
        &self,
        record: &InputRecord,
        target: TargetList,
    ) -> Result<AddOutcome, AppError> {
        let list_id = self.settings.require_list(target)?;
        record.validate()?;
        tracing::info!("Target list: {:?} ({})", target, list_id);

        let mut diagnostics = Diagnostics::new();
        let current_user = identity::resolve_current_user(
            &self.client,
            self.settings.user_email(),
            &mut diagnostics,
        )
        .await;

        let outcome = match target {
            TargetList::MasterDeal => {
                self.master_deal(record, list_id, current_user, &mut diagnostics)
                    .await?
            }
            TargetList::InterestingPeople => {
                self.interesting_people(record, list_id, current_user, &mut diagnostics)
                    .await?
            }
        };

        tracing::info!(
            "✓ Added to Affinity: {} ({} warning(s))",
            outcome.affinity_url,
            outcome.warnings.len()
        );
        Ok(outcome)
    }

    /// Organization goes on the deal list; a LinkedIn profile also gets a
    /// person linked to a `Stealth_` organization.
    async fn master_deal(
        &self,
        record: &InputRecord,
        list_id: &str,
        current_user: Option<CurrentUser>,
        diagnostics: &mut Diagnostics,
    ) -> Result<AddOutcome, AppError> {
        let (organization, person) = match &record.source {
            RecordSource::LinkedinProfile { full_name, .. } => {
                let organization = entities::create_organization(
                    &self.client,
                    &stealth_org_name(full_name),
                    None,
                )
                .await?;

                let (first_name, last_name) = split_full_name(full_name);
                let person = entities::find_or_create_person(
                    &self.client,
                    &first_name,
                    &last_name,
                    record.profile_url(),
                    diagnostics,
                )
                .await?;

                entities::link_person_to_organization(
                    &self.client,
                    &person,
                    &organization,
                    diagnostics,
                )
                .await;

                (organization, Some(person))
            }
            RecordSource::Website {
                company_name,
                domain,
                ..
            } => {
                let organization = entities::create_organization(
                    &self.client,
                    company_name.trim(),
                    domain.as_deref(),
                )
                .await?;
                (organization, None)
            }
        };

        let list_entry = self
            .client
            .create_list_entry(list_id, organization.id, EntityType::Organization)
            .await?;
        tracing::info!("✓ Added to list: entry {}", list_entry.id);

        let mut schema = ListSchema::new(list_id);
        let owner_id = match &current_user {
            Some(user) => {
                fields::assign_owner(
                    &self.client,
                    &mut schema,
                    &list_entry,
                    organization.id,
                    user,
                    diagnostics,
                )
                .await
            }
            None => None,
        };

        notes::attach_note(
            &self.client,
            EntityType::Organization,
            organization.id,
            record.trimmed_note(),
            diagnostics,
        )
        .await;

        Ok(AddOutcome {
            affinity_url: affinity_url(
                self.settings.subdomain(),
                EntityType::Organization,
                organization.id,
            ),
            organization: Some(organization),
            person,
            list_entry,
            owner: current_user,
            owner_id,
            warnings: std::mem::take(diagnostics).into_warnings(),
        })
    }

    /// Person goes on the people list with owner and status.
    async fn interesting_people(
        &self,
        record: &InputRecord,
        list_id: &str,
        current_user: Option<CurrentUser>,
        diagnostics: &mut Diagnostics,
    ) -> Result<AddOutcome, AppError> {
        let (first_name, last_name) = person_name(record);
        let person = entities::find_or_create_person(
            &self.client,
            &first_name,
            &last_name,
            record.profile_url(),
            diagnostics,
        )
        .await?;

        let list_entry = self
            .client
            .create_list_entry(list_id, person.id, EntityType::Person)
            .await?;
        tracing::info!("✓ Added to list: entry {}", list_entry.id);

        let mut schema = ListSchema::new(list_id);
        let owner_id = match &current_user {
            Some(user) => {
                fields::assign_owner(
                    &self.client,
                    &mut schema,
                    &list_entry,
                    person.id,
                    user,
                    diagnostics,
                )
                .await
            }
            None => None,
        };

        fields::assign_status(
            &self.client,
            &mut schema,
            &list_entry,
            person.id,
            self.settings.people_status(),
            diagnostics,
        )
        .await;

        notes::attach_note(
            &self.client,
            EntityType::Person,
            person.id,
            record.trimmed_note(),
            diagnostics,
        )
        .await;

        Ok(AddOutcome {
            affinity_url: affinity_url(self.settings.subdomain(), EntityType::Person, person.id),
            organization: None,
            person: Some(person),
            list_entry,
            owner: current_user,
            owner_id,
            warnings: std::mem::take(diagnostics).into_warnings(),
        })
    }

    /// Looks for an organization that already represents this record.
    ///
    /// Without an API key there is nothing to search, so this reports no
    /// duplicate rather than failing.
    pub async fn check_duplicate(&self, record: &InputRecord) -> DuplicateCheckResponse {
        if !self.settings.has_api_key() {
            return DuplicateCheckResponse::default();
        }
        let invocation = Uuid::new_v4();
        duplicates::check_duplicate(&self.client, record, self.settings.subdomain())
            .instrument(tracing::info_span!("check_duplicate", %invocation))
            .await
    }
}

/// Person name for the people list. Websites have no person, so the
/// company name stands in.
fn person_name(record: &InputRecord) -> (String, String) {
    match &record.source {
        RecordSource::LinkedinProfile { full_name, .. } => split_full_name(full_name),
        RecordSource::Website { company_name, .. } => {
            (company_name.trim().to_string(), String::new())
        }
    }
}
