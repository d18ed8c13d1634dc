use chrono::Utc;
use diesel::prelude::*;
use log::warn;
use std::collections::HashSet;
use uuid::Uuid;

use crate::collections::CollectionRepo;
use crate::shards::{EntityFamily, ShardSet};
use crate::shared::error::StoreError;
use crate::shared::models::schema::resources;
use crate::shared::models::{Resource, ResourceStatus, ResourceType, UuidText};
use crate::shared::utils::{get_conn, DbPool};

/// Repository for the resources shard.
///
/// Resources are pointers: the concrete entity (file, meeting, website)
/// lives in its own shard under `source_entity_id`, which the caller
/// pre-allocates before creating the resource.
pub struct ResourceRepo {
    pool: DbPool,
}

impl ResourceRepo {
    pub fn new(shards: &ShardSet) -> Result<Self, StoreError> {
        Ok(Self {
            pool: shards.pool(EntityFamily::Resources)?,
        })
    }

    pub fn get_resource(&self, resource_id: Uuid) -> Result<Resource, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        resources::table
            .filter(resources::resource_id.eq(UuidText(resource_id)))
            .first::<Resource>(&mut conn)
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("resource {resource_id}")))
    }

    /// Commit a new resource in `pending` state.
    pub fn create_resource(
        &self,
        organization_id: Uuid,
        source_entity_type: ResourceType,
        source_entity_id: Uuid,
    ) -> Result<Resource, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        let resource: Resource = diesel::insert_into(resources::table)
            .values(Resource::new(
                organization_id,
                source_entity_type,
                source_entity_id,
            ))
            .get_result(&mut conn)?;

        Ok(resource)
    }

    pub fn update_resource_status(
        &self,
        resource_id: Uuid,
        status: ResourceStatus,
    ) -> Result<Resource, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        conn.transaction::<Resource, StoreError, _>(|conn| {
            let resource = resources::table
                .filter(resources::resource_id.eq(UuidText(resource_id)))
                .first::<Resource>(conn)
                .optional()?
                .ok_or_else(|| StoreError::NotFound(format!("resource {resource_id}")))?;

            let updated: Resource = diesel::update(
                resources::table.filter(resources::resource_id.eq(resource.resource_id)),
            )
            .set((
                resources::status.eq(status),
                resources::updated_at.eq(Some(Utc::now())),
            ))
            .get_result(conn)?;

            Ok(updated)
        })
    }

    pub fn update_resource_ai_summary(
        &self,
        resource_id: Uuid,
        ai_summary: &str,
    ) -> Result<Resource, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        conn.transaction::<Resource, StoreError, _>(|conn| {
            let resource = resources::table
                .filter(resources::resource_id.eq(UuidText(resource_id)))
                .first::<Resource>(conn)
                .optional()?
                .ok_or_else(|| StoreError::NotFound(format!("resource {resource_id}")))?;

            let updated: Resource = diesel::update(
                resources::table.filter(resources::resource_id.eq(resource.resource_id)),
            )
            .set((
                resources::ai_summary.eq(Some(ai_summary.to_string())),
                resources::updated_at.eq(Some(Utc::now())),
            ))
            .get_result(conn)?;

            Ok(updated)
        })
    }

    /// Resolve every resource linked into a collection.
    ///
    /// The association rows live in the collections shard; the resources
    /// themselves live here. An association whose resource is missing is a
    /// tolerated cross-shard inconsistency: it is logged and skipped, not
    /// an error.
    pub fn get_resources_by_collection_id(
        &self,
        collection_id: Uuid,
        collections: &CollectionRepo,
    ) -> Result<Vec<Resource>, StoreError> {
        let links = collections.get_collection_resources(collection_id)?;
        if links.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<UuidText> = links.iter().map(|link| link.resource_id).collect();

        let mut conn = get_conn(&self.pool)?;
        let found = resources::table
            .filter(resources::resource_id.eq_any(ids))
            .load::<Resource>(&mut conn)?;

        let present: HashSet<UuidText> = found.iter().map(|r| r.resource_id).collect();
        for link in &links {
            if !present.contains(&link.resource_id) {
                warn!(
                    "collection {} references resource {} missing from the resources shard",
                    collection_id, link.resource_id
                );
            }
        }

        Ok(found)
    }
}
