use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::shards::{EntityFamily, ShardSet};
use crate::shared::error::StoreError;
use crate::shared::models::schema::{meeting_participants, meeting_recordings, meetings};
use crate::shared::models::{
    Meeting, MeetingParticipant, MeetingRecording, Organization, Resource, User, UuidText,
};
use crate::shared::utils::{get_conn, DbPool};

/// Repository for the meetings shard: meetings plus their participant and
/// recording children.
pub struct MeetingRepo {
    pool: DbPool,
}

impl MeetingRepo {
    pub fn new(shards: &ShardSet) -> Result<Self, StoreError> {
        Ok(Self {
            pool: shards.pool(EntityFamily::Meetings)?,
        })
    }

    pub fn get_meeting(&self, meeting_id: Uuid) -> Result<Meeting, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        meetings::table
            .filter(meetings::meeting_id.eq(UuidText(meeting_id)))
            .first::<Meeting>(&mut conn)
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("meeting {meeting_id}")))
    }

    /// Commit the concrete meeting for a `meeting` resource, binding
    /// `meeting_id == resource.source_entity_id`.
    pub fn create_meeting(
        &self,
        organization: &Organization,
        resource: &Resource,
        user: &User,
    ) -> Result<Meeting, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        let meeting: Meeting = diesel::insert_into(meetings::table)
            .values(Meeting::for_resource(organization, resource, user))
            .get_result(&mut conn)?;

        Ok(meeting)
    }

    /// Commit the single mixed-audio recording row for a meeting.
    pub fn create_meeting_mixed_recording(
        &self,
        organization_id: Uuid,
        meeting_id: Uuid,
        file_id: Uuid,
    ) -> Result<MeetingRecording, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        let recording: MeetingRecording = diesel::insert_into(meeting_recordings::table)
            .values(MeetingRecording::mixed_audio(
                organization_id,
                meeting_id,
                file_id,
            ))
            .get_result(&mut conn)?;

        Ok(recording)
    }

    pub fn get_meeting_recording_by_meeting_id(
        &self,
        meeting_id: Uuid,
    ) -> Result<MeetingRecording, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        meeting_recordings::table
            .filter(meeting_recordings::meeting_id.eq(UuidText(meeting_id)))
            .order(meeting_recordings::created_at.asc())
            .first::<MeetingRecording>(&mut conn)
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("recording for meeting {meeting_id}")))
    }

    pub fn update_meeting_transcriptions(
        &self,
        meeting_id: Uuid,
        transcriptions: &str,
    ) -> Result<Meeting, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        conn.transaction::<Meeting, StoreError, _>(|conn| {
            let meeting = meetings::table
                .filter(meetings::meeting_id.eq(UuidText(meeting_id)))
                .first::<Meeting>(conn)
                .optional()?
                .ok_or_else(|| StoreError::NotFound(format!("meeting {meeting_id}")))?;

            let updated: Meeting =
                diesel::update(meetings::table.filter(meetings::meeting_id.eq(meeting.meeting_id)))
                    .set((
                        meetings::transcriptions.eq(Some(transcriptions.to_string())),
                        meetings::updated_at.eq(Some(Utc::now())),
                    ))
                    .get_result(conn)?;

            Ok(updated)
        })
    }

    /// Attach transcriptions to the meeting's recording. Deliberately a
    /// separate write from `update_meeting_transcriptions`: a failure here
    /// leaves the meeting-level transcription in place.
    pub fn update_meeting_recording_transcriptions(
        &self,
        meeting_id: Uuid,
        transcriptions: &str,
    ) -> Result<MeetingRecording, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        conn.transaction::<MeetingRecording, StoreError, _>(|conn| {
            let recording = meeting_recordings::table
                .filter(meeting_recordings::meeting_id.eq(UuidText(meeting_id)))
                .order(meeting_recordings::created_at.asc())
                .first::<MeetingRecording>(conn)
                .optional()?
                .ok_or_else(|| {
                    StoreError::NotFound(format!("recording for meeting {meeting_id}"))
                })?;

            let updated: MeetingRecording = diesel::update(
                meeting_recordings::table
                    .filter(meeting_recordings::meeting_id.eq(recording.meeting_id))
                    .filter(meeting_recordings::recording_id.eq(recording.recording_id)),
            )
            .set((
                meeting_recordings::transcriptions.eq(Some(transcriptions.to_string())),
                meeting_recordings::updated_at.eq(Some(Utc::now())),
            ))
            .get_result(conn)?;

            Ok(updated)
        })
    }

    pub fn add_meeting_participant(
        &self,
        organization_id: Uuid,
        meeting_id: Uuid,
        participant_id: Uuid,
        name: &str,
        joined_at: Option<DateTime<Utc>>,
    ) -> Result<MeetingParticipant, StoreError> {
        let participant = MeetingParticipant {
            meeting_id: UuidText(meeting_id),
            participant_id: UuidText(participant_id),
            organization_id: UuidText(organization_id),
            name: name.to_string(),
            joined_at,
            left_at: None,
            created_at: Utc::now(),
            updated_at: None,
        };

        let mut conn = get_conn(&self.pool)?;
        let participant: MeetingParticipant = diesel::insert_into(meeting_participants::table)
            .values(participant)
            .get_result(&mut conn)?;

        Ok(participant)
    }

    pub fn get_meeting_participants(
        &self,
        meeting_id: Uuid,
    ) -> Result<Vec<MeetingParticipant>, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        let participants = meeting_participants::table
            .filter(meeting_participants::meeting_id.eq(UuidText(meeting_id)))
            .load::<MeetingParticipant>(&mut conn)?;

        Ok(participants)
    }
}
