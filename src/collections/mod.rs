use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::shards::{EntityFamily, ShardSet};
use crate::shared::error::StoreError;
use crate::shared::models::schema::{collection_resources, collections};
use crate::shared::models::{Collection, CollectionResource, UuidText};
use crate::shared::utils::{get_conn, DbPool};

/// Repository for the collections shard.
pub struct CollectionRepo {
    pool: DbPool,
}

impl CollectionRepo {
    pub fn new(shards: &ShardSet) -> Result<Self, StoreError> {
        Ok(Self {
            pool: shards.pool(EntityFamily::Collections)?,
        })
    }

    /// Commit a new collection; an unnamed one gets a unique placeholder.
    pub fn create_collection(
        &self,
        organization_id: Uuid,
        name: Option<&str>,
    ) -> Result<Collection, StoreError> {
        let name = match name {
            Some(name) => name.to_string(),
            None => format!("Collection {}", Uuid::new_v4()),
        };

        let mut conn = get_conn(&self.pool)?;
        let collection: Collection = diesel::insert_into(collections::table)
            .values(Collection::new(organization_id, name))
            .get_result(&mut conn)?;

        Ok(collection)
    }

    /// Commit an association row. The referenced resource lives in another
    /// shard and is not existence-checked here; callers create the
    /// resource first.
    pub fn create_collection_resource(
        &self,
        collection_id: Uuid,
        organization_id: Uuid,
        resource_id: Uuid,
    ) -> Result<CollectionResource, StoreError> {
        let row = CollectionResource {
            collection_id: UuidText(collection_id),
            resource_id: UuidText(resource_id),
            organization_id: UuidText(organization_id),
            created_at: Utc::now(),
            updated_at: None,
        };

        let mut conn = get_conn(&self.pool)?;
        let row: CollectionResource = diesel::insert_into(collection_resources::table)
            .values(row)
            .get_result(&mut conn)?;

        Ok(row)
    }

    /// All association rows for a collection, unordered.
    pub fn get_collection_resources(
        &self,
        collection_id: Uuid,
    ) -> Result<Vec<CollectionResource>, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        let rows = collection_resources::table
            .filter(collection_resources::collection_id.eq(UuidText(collection_id)))
            .load::<CollectionResource>(&mut conn)?;

        Ok(rows)
    }
}
