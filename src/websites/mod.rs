use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::shards::{EntityFamily, ShardSet};
use crate::shared::error::StoreError;
use crate::shared::models::schema::websites;
use crate::shared::models::{Organization, Resource, User, UuidText, Website};
use crate::shared::utils::{get_conn, DbPool};

/// Repository for the websites shard.
pub struct WebsiteRepo {
    pool: DbPool,
}

impl WebsiteRepo {
    pub fn new(shards: &ShardSet) -> Result<Self, StoreError> {
        Ok(Self {
            pool: shards.pool(EntityFamily::Websites)?,
        })
    }

    pub fn get_website(&self, website_id: Uuid) -> Result<Website, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        websites::table
            .filter(websites::website_id.eq(UuidText(website_id)))
            .first::<Website>(&mut conn)
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("website {website_id}")))
    }

    /// Commit the concrete website for a `website` resource, binding
    /// `website_id == resource.source_entity_id`.
    pub fn create_website(
        &self,
        organization: &Organization,
        resource: &Resource,
        user: &User,
        url: &str,
    ) -> Result<Website, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        let website: Website = diesel::insert_into(websites::table)
            .values(Website::for_resource(organization, resource, user, url))
            .get_result(&mut conn)?;

        Ok(website)
    }

    /// Record the set of URLs discovered while crawling the site.
    pub fn update_website_parsed_urls(
        &self,
        website_id: Uuid,
        parsed_urls: &str,
    ) -> Result<Website, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        conn.transaction::<Website, StoreError, _>(|conn| {
            let website = websites::table
                .filter(websites::website_id.eq(UuidText(website_id)))
                .first::<Website>(conn)
                .optional()?
                .ok_or_else(|| StoreError::NotFound(format!("website {website_id}")))?;

            let updated: Website =
                diesel::update(websites::table.filter(websites::website_id.eq(website.website_id)))
                    .set((
                        websites::parsed_urls.eq(Some(parsed_urls.to_string())),
                        websites::updated_at.eq(Some(Utc::now())),
                    ))
                    .get_result(conn)?;

            Ok(updated)
        })
    }
}
