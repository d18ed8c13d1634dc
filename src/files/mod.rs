use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::shards::{EntityFamily, ShardSet};
use crate::shared::error::StoreError;
use crate::shared::models::schema::files;
use crate::shared::models::{File, MeetingRecording, Organization, Resource, User, UuidText};
use crate::shared::utils::{get_conn, DbPool};

/// Repository for the files shard.
pub struct FileRepo {
    pool: DbPool,
}

impl FileRepo {
    pub fn new(shards: &ShardSet) -> Result<Self, StoreError> {
        Ok(Self {
            pool: shards.pool(EntityFamily::Files)?,
        })
    }

    pub fn get_file(&self, file_id: Uuid) -> Result<File, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        files::table
            .filter(files::file_id.eq(UuidText(file_id)))
            .first::<File>(&mut conn)
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("file {file_id}")))
    }

    /// Commit the concrete file for a `file` resource, binding
    /// `file_id == resource.source_entity_id`.
    pub fn create_file_for_resource(
        &self,
        organization: &Organization,
        resource: &Resource,
        file_name: &str,
        mime_type: &str,
        user: &User,
    ) -> Result<File, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        let file: File = diesel::insert_into(files::table)
            .values(File::for_resource(
                organization,
                resource,
                file_name,
                mime_type,
                user,
            ))
            .get_result(&mut conn)?;

        Ok(file)
    }

    /// Commit the file backing a meeting recording's audio.
    pub fn create_file_for_meeting_recording(
        &self,
        organization: &Organization,
        meeting_recording: &MeetingRecording,
        file_name: &str,
        mime_type: &str,
        user: &User,
    ) -> Result<File, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        let file: File = diesel::insert_into(files::table)
            .values(File::for_meeting_recording(
                organization,
                meeting_recording,
                file_name,
                mime_type,
                user,
            ))
            .get_result(&mut conn)?;

        Ok(file)
    }

    /// Soft delete. This layer never physically removes rows.
    pub fn mark_file_deleted(&self, file_id: Uuid) -> Result<File, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        conn.transaction::<File, StoreError, _>(|conn| {
            let file = files::table
                .filter(files::file_id.eq(UuidText(file_id)))
                .first::<File>(conn)
                .optional()?
                .ok_or_else(|| StoreError::NotFound(format!("file {file_id}")))?;

            let updated: File =
                diesel::update(files::table.filter(files::file_id.eq(file.file_id)))
                    .set((
                        files::deleted.eq(Some(true)),
                        files::updated_at.eq(Some(Utc::now())),
                    ))
                    .get_result(conn)?;

            Ok(updated)
        })
    }
}
