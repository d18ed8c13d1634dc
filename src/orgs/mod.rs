use diesel::prelude::*;
use log::info;
use uuid::Uuid;

use crate::shards::{EntityFamily, ShardSet};
use crate::shared::error::StoreError;
use crate::shared::models::schema::{organization_users, organizations};
use crate::shared::models::{Organization, OrganizationUser, UuidText};
use crate::shared::utils::{get_conn, DbPool};
use crate::users::UserRepo;

pub const DEFAULT_ORGANIZATION_NAME: &str = "Default AI service org";

/// Repository for the organizations shard. Membership rows
/// (`organization_users`) are colocated with organizations.
pub struct OrganizationRepo {
    pool: DbPool,
}

impl OrganizationRepo {
    pub fn new(shards: &ShardSet) -> Result<Self, StoreError> {
        Ok(Self {
            pool: shards.pool(EntityFamily::Organizations)?,
        })
    }

    pub fn get_organization(&self, organization_id: Uuid) -> Result<Organization, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        organizations::table
            .filter(organizations::organization_id.eq(UuidText(organization_id)))
            .first::<Organization>(&mut conn)
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("organization {organization_id}")))
    }

    /// Idempotent lookup-else-create of the sentinel organization, plus an
    /// equally idempotent membership row for the default user.
    ///
    /// The user lives in a different shard, so the membership write here is
    /// not transactional with the user's creation; the user row is always
    /// committed first.
    pub fn get_default_organization(&self, users: &UserRepo) -> Result<Organization, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        let existing = organizations::table
            .filter(organizations::name.eq(DEFAULT_ORGANIZATION_NAME))
            .order(organizations::created_at.asc())
            .first::<Organization>(&mut conn)
            .optional()?;

        let organization = match existing {
            Some(organization) => organization,
            None => {
                let organization: Organization = diesel::insert_into(organizations::table)
                    .values(Organization::new(DEFAULT_ORGANIZATION_NAME))
                    .get_result(&mut conn)?;
                info!("Created default organization {}", organization.organization_id);
                organization
            }
        };

        let user = users.get_default_user()?;

        let membership = organization_users::table
            .filter(organization_users::organization_id.eq(organization.organization_id))
            .filter(organization_users::user_id.eq(user.user_id))
            .first::<OrganizationUser>(&mut conn)
            .optional()?;

        if membership.is_none() {
            diesel::insert_into(organization_users::table)
                .values(OrganizationUser::new(
                    organization.organization_id,
                    user.user_id,
                ))
                .execute(&mut conn)?;
        }

        Ok(organization)
    }
}
