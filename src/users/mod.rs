use diesel::prelude::*;
use log::info;
use uuid::Uuid;

use crate::shards::{EntityFamily, ShardSet};
use crate::shared::error::StoreError;
use crate::shared::models::schema::users;
use crate::shared::models::{User, UuidText};
use crate::shared::utils::{get_conn, DbPool};

pub const DEFAULT_USER_FIRST_NAME: &str = "Default AI";
pub const DEFAULT_USER_LAST_NAME: &str = "service user";

/// Repository for the users shard.
pub struct UserRepo {
    pool: DbPool,
}

impl UserRepo {
    pub fn new(shards: &ShardSet) -> Result<Self, StoreError> {
        Ok(Self {
            pool: shards.pool(EntityFamily::Users)?,
        })
    }

    pub fn get_user(&self, user_id: Uuid) -> Result<User, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        users::table
            .filter(users::user_id.eq(UuidText(user_id)))
            .first::<User>(&mut conn)
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))
    }

    /// Idempotent lookup-else-create of the sentinel service user.
    ///
    /// Two concurrent first callers can both miss the lookup and both
    /// insert; the oldest row wins on every later call.
    pub fn get_default_user(&self) -> Result<User, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        let existing = users::table
            .filter(users::first_name.eq(DEFAULT_USER_FIRST_NAME))
            .filter(users::last_name.eq(DEFAULT_USER_LAST_NAME))
            .order(users::created_at.asc())
            .first::<User>(&mut conn)
            .optional()?;

        if let Some(user) = existing {
            return Ok(user);
        }

        let user: User = diesel::insert_into(users::table)
            .values(User::new(DEFAULT_USER_FIRST_NAME, DEFAULT_USER_LAST_NAME))
            .get_result(&mut conn)?;

        info!("Created default service user {}", user.user_id);
        Ok(user)
    }
}
