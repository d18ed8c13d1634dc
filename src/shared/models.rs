use chrono::{DateTime, Utc};
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use uuid::Uuid;

/// Identity value stored as the 36-character canonical hyphenated form.
///
/// Shard drivers are not trusted to handle native UUID columns, so every
/// identity column is plain text and this wrapper owns the conversion at
/// the bind/read boundary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(transparent)]
pub struct UuidText(pub Uuid);

impl UuidText {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse_canonical(s: &str) -> Result<Self, String> {
        if s.len() != 36 {
            return Err(format!("expected 36-character identity, got {s:?}"));
        }
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| format!("invalid identity {s:?}: {e}"))
    }
}

impl From<Uuid> for UuidText {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<UuidText> for Uuid {
    fn from(id: UuidText) -> Self {
        id.0
    }
}

impl fmt::Display for UuidText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl ToSql<Text, Pg> for UuidText {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.0.to_string().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for UuidText {
    fn from_sql(value: PgValue<'_>) -> deserialize::Result<Self> {
        let s = std::str::from_utf8(value.as_bytes())?;
        Self::parse_canonical(s).map_err(Into::into)
    }
}

/// Which concrete content entity a Resource points at.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    File,
    Meeting,
    Website,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Meeting => "meeting",
            Self::Website => "website",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql<Text, Pg> for ResourceType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for ResourceType {
    fn from_sql(value: PgValue<'_>) -> deserialize::Result<Self> {
        match std::str::from_utf8(value.as_bytes())? {
            "file" => Ok(Self::File),
            "meeting" => Ok(Self::Meeting),
            "website" => Ok(Self::Website),
            other => Err(format!("unknown resource type {other:?}").into()),
        }
    }
}

/// Resource lifecycle: `pending` until ingestion finishes, then `available`
/// or `failed`. Terminal states are never transitioned by this layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    Pending,
    Failed,
    Available,
}

impl ResourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Failed => "failed",
            Self::Available => "available",
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql<Text, Pg> for ResourceStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for ResourceStatus {
    fn from_sql(value: PgValue<'_>) -> deserialize::Result<Self> {
        match std::str::from_utf8(value.as_bytes())? {
            "pending" => Ok(Self::Pending),
            "failed" => Ok(Self::Failed),
            "available" => Ok(Self::Available),
            other => Err(format!("unknown resource status {other:?}").into()),
        }
    }
}

pub mod schema {
    diesel::table! {
        users (user_id) {
            user_id -> Text,
            first_name -> Text,
            last_name -> Text,
            phone -> Text,
            email -> Text,
            password -> Text,
            created_at -> Timestamptz,
            updated_at -> Nullable<Timestamptz>,
        }
    }

    diesel::table! {
        organizations (organization_id) {
            organization_id -> Text,
            name -> Text,
            timezone -> Text,
            status -> Text,
            created_at -> Timestamptz,
            updated_at -> Nullable<Timestamptz>,
        }
    }

    diesel::table! {
        organization_users (organization_id, user_id) {
            organization_id -> Text,
            user_id -> Text,
            status -> Text,
            created_at -> Timestamptz,
            updated_at -> Nullable<Timestamptz>,
        }
    }

    diesel::table! {
        collections (collection_id) {
            collection_id -> Text,
            organization_id -> Text,
            name -> Text,
            color_code -> Text,
            description -> Nullable<Text>,
            created_at -> Timestamptz,
            updated_at -> Nullable<Timestamptz>,
        }
    }

    diesel::table! {
        collection_resources (collection_id, resource_id) {
            collection_id -> Text,
            resource_id -> Text,
            organization_id -> Text,
            created_at -> Timestamptz,
            updated_at -> Nullable<Timestamptz>,
        }
    }

    diesel::table! {
        resources (resource_id) {
            resource_id -> Text,
            organization_id -> Text,
            source_entity_type -> Text,
            source_entity_id -> Text,
            status -> Text,
            name -> Text,
            ai_summary -> Nullable<Text>,
            created_at -> Timestamptz,
            updated_at -> Nullable<Timestamptz>,
        }
    }

    diesel::table! {
        files (file_id) {
            file_id -> Text,
            organization_id -> Text,
            resource_id -> Text,
            user_id -> Text,
            name -> Text,
            path -> Text,
            mime_type -> Text,
            deleted -> Nullable<Bool>,
            created_at -> Timestamptz,
            updated_at -> Nullable<Timestamptz>,
        }
    }

    diesel::table! {
        meetings (meeting_id) {
            meeting_id -> Text,
            organization_id -> Text,
            resource_id -> Text,
            user_id -> Text,
            provider -> Text,
            provider_meeting_id -> Nullable<Text>,
            provider_meeting_password -> Nullable<Text>,
            provider_meeting_url -> Nullable<Text>,
            status -> Text,
            status_updated_at -> Timestamptz,
            transcriptions -> Nullable<Text>,
            created_at -> Timestamptz,
            updated_at -> Nullable<Timestamptz>,
        }
    }

    diesel::table! {
        meeting_participants (meeting_id, participant_id) {
            meeting_id -> Text,
            participant_id -> Text,
            organization_id -> Text,
            name -> Text,
            joined_at -> Nullable<Timestamptz>,
            left_at -> Nullable<Timestamptz>,
            created_at -> Timestamptz,
            updated_at -> Nullable<Timestamptz>,
        }
    }

    diesel::table! {
        meeting_recordings (meeting_id, recording_id) {
            meeting_id -> Text,
            recording_id -> Text,
            organization_id -> Text,
            participant_id -> Nullable<Text>,
            file_id -> Text,
            #[sql_name = "type"]
            kind -> Text,
            subtype -> Text,
            transcriptions -> Nullable<Text>,
            started_at -> Nullable<Timestamptz>,
            created_at -> Timestamptz,
            updated_at -> Nullable<Timestamptz>,
        }
    }

    diesel::table! {
        websites (website_id) {
            website_id -> Text,
            organization_id -> Text,
            resource_id -> Text,
            user_id -> Nullable<Text>,
            name -> Text,
            url -> Text,
            parsed_urls -> Nullable<Text>,
            created_at -> Timestamptz,
            updated_at -> Nullable<Timestamptz>,
        }
    }

    diesel::table! {
        chats (chat_id) {
            chat_id -> Text,
            organization_id -> Text,
            owner_user_id -> Text,
            #[sql_name = "type"]
            kind -> Text,
            name -> Text,
            summary -> Nullable<Text>,
            created_at -> Timestamptz,
            updated_at -> Nullable<Timestamptz>,
        }
    }

    diesel::table! {
        chat_collections (chat_id, collection_id) {
            chat_id -> Text,
            collection_id -> Text,
            organization_id -> Text,
            created_at -> Timestamptz,
            updated_at -> Nullable<Timestamptz>,
        }
    }

    diesel::table! {
        chat_users (chat_id, user_id) {
            chat_id -> Text,
            user_id -> Text,
            organization_id -> Text,
            created_at -> Timestamptz,
            updated_at -> Nullable<Timestamptz>,
        }
    }

    diesel::table! {
        chat_resources (chat_id, resource_id) {
            chat_id -> Text,
            resource_id -> Text,
            organization_id -> Text,
            created_at -> Timestamptz,
            updated_at -> Nullable<Timestamptz>,
        }
    }

    diesel::table! {
        chat_messages (chat_id, message_id) {
            chat_id -> Text,
            message_id -> Text,
            organization_id -> Text,
            user_id -> Nullable<Text>,
            #[sql_name = "type"]
            kind -> Text,
            content -> Text,
            arguments -> Jsonb,
            is_summarized -> Bool,
            created_at -> Timestamptz,
            updated_at -> Nullable<Timestamptz>,
        }
    }
}

/// Global identity, not organization-scoped.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = schema::users)]
pub struct User {
    pub user_id: UuidText,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(first_name: &str, last_name: &str) -> Self {
        Self {
            user_id: UuidText::generate(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            phone: String::new(),
            email: String::new(),
            password: String::new(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// Tenant root. Every other organization-scoped row carries this id.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = schema::organizations)]
pub struct Organization {
    pub organization_id: UuidText,
    pub name: String,
    pub timezone: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Organization {
    pub fn new(name: &str) -> Self {
        Self {
            organization_id: UuidText::generate(),
            name: name.to_string(),
            timezone: "UTC".to_string(),
            status: "active".to_string(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = schema::organization_users)]
pub struct OrganizationUser {
    pub organization_id: UuidText,
    pub user_id: UuidText,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl OrganizationUser {
    pub fn new(organization_id: UuidText, user_id: UuidText) -> Self {
        Self {
            organization_id,
            user_id,
            status: "active".to_string(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// Named, colored grouping of resources within one organization.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = schema::collections)]
pub struct Collection {
    pub collection_id: UuidText,
    pub organization_id: UuidText,
    pub name: String,
    pub color_code: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Collection {
    pub fn new(organization_id: Uuid, name: String) -> Self {
        Self {
            collection_id: UuidText::generate(),
            organization_id: UuidText(organization_id),
            name,
            color_code: "#000000".to_string(),
            description: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// Association row linking a resource into a collection. The resource lives
/// in a different shard; no database constraint backs this reference.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = schema::collection_resources)]
pub struct CollectionResource {
    pub collection_id: UuidText,
    pub resource_id: UuidText,
    pub organization_id: UuidText,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Organization-scoped pointer to exactly one concrete content entity.
///
/// `source_entity_id` is pre-allocated at creation and reused as the
/// concrete entity's primary key, which is what holds the two rows
/// together across shards.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = schema::resources)]
pub struct Resource {
    pub resource_id: UuidText,
    pub organization_id: UuidText,
    pub source_entity_type: ResourceType,
    pub source_entity_id: UuidText,
    pub status: ResourceStatus,
    pub name: String,
    pub ai_summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Resource {
    pub fn new(
        organization_id: Uuid,
        source_entity_type: ResourceType,
        source_entity_id: Uuid,
    ) -> Self {
        Self {
            resource_id: UuidText::generate(),
            organization_id: UuidText(organization_id),
            source_entity_type,
            source_entity_id: UuidText(source_entity_id),
            status: ResourceStatus::Pending,
            name: String::new(),
            ai_summary: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = schema::files)]
pub struct File {
    pub file_id: UuidText,
    pub organization_id: UuidText,
    pub resource_id: UuidText,
    pub user_id: UuidText,
    pub name: String,
    pub path: String,
    pub mime_type: String,
    pub deleted: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl File {
    /// The file reuses the resource's pre-allocated source entity id as its
    /// own primary key.
    pub fn for_resource(
        organization: &Organization,
        resource: &Resource,
        file_name: &str,
        mime_type: &str,
        user: &User,
    ) -> Self {
        Self {
            file_id: resource.source_entity_id,
            organization_id: organization.organization_id,
            resource_id: resource.resource_id,
            user_id: user.user_id,
            name: file_name.to_string(),
            path: format!("files/{}", resource.source_entity_id),
            mime_type: mime_type.to_string(),
            deleted: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Recording audio lands under the recording's file id, which doubles
    /// as the resource back-reference for recording files.
    pub fn for_meeting_recording(
        organization: &Organization,
        recording: &MeetingRecording,
        file_name: &str,
        mime_type: &str,
        user: &User,
    ) -> Self {
        Self {
            file_id: recording.file_id,
            organization_id: organization.organization_id,
            resource_id: recording.file_id,
            user_id: user.user_id,
            name: file_name.to_string(),
            path: format!("meetings/{}", recording.file_id),
            mime_type: mime_type.to_string(),
            deleted: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = schema::meetings)]
pub struct Meeting {
    pub meeting_id: UuidText,
    pub organization_id: UuidText,
    pub resource_id: UuidText,
    pub user_id: UuidText,
    pub provider: String,
    pub provider_meeting_id: Option<String>,
    pub provider_meeting_password: Option<String>,
    pub provider_meeting_url: Option<String>,
    pub status: String,
    pub status_updated_at: DateTime<Utc>,
    pub transcriptions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Meeting {
    pub fn for_resource(organization: &Organization, resource: &Resource, user: &User) -> Self {
        let now = Utc::now();
        Self {
            meeting_id: resource.source_entity_id,
            organization_id: organization.organization_id,
            resource_id: resource.resource_id,
            user_id: user.user_id,
            provider: "internal".to_string(),
            provider_meeting_id: None,
            provider_meeting_password: None,
            provider_meeting_url: None,
            status: "pending".to_string(),
            status_updated_at: now,
            transcriptions: None,
            created_at: now,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = schema::meeting_participants)]
pub struct MeetingParticipant {
    pub meeting_id: UuidText,
    pub participant_id: UuidText,
    pub organization_id: UuidText,
    pub name: String,
    pub joined_at: Option<DateTime<Utc>>,
    pub left_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = schema::meeting_recordings)]
pub struct MeetingRecording {
    pub meeting_id: UuidText,
    pub recording_id: UuidText,
    pub organization_id: UuidText,
    pub participant_id: Option<UuidText>,
    pub file_id: UuidText,
    /// "audio" or "video".
    #[serde(rename = "type")]
    pub kind: String,
    /// Audio subtype: "mixed", "one-way", "share", "interpreter".
    pub subtype: String,
    pub transcriptions: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MeetingRecording {
    pub fn mixed_audio(organization_id: Uuid, meeting_id: Uuid, file_id: Uuid) -> Self {
        Self {
            meeting_id: UuidText(meeting_id),
            recording_id: UuidText::generate(),
            organization_id: UuidText(organization_id),
            participant_id: None,
            file_id: UuidText(file_id),
            kind: "audio".to_string(),
            subtype: "mixed".to_string(),
            transcriptions: None,
            started_at: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = schema::websites)]
pub struct Website {
    pub website_id: UuidText,
    pub organization_id: UuidText,
    pub resource_id: UuidText,
    pub user_id: Option<UuidText>,
    pub name: String,
    pub url: String,
    pub parsed_urls: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Website {
    pub fn for_resource(
        organization: &Organization,
        resource: &Resource,
        user: &User,
        url: &str,
    ) -> Self {
        Self {
            website_id: resource.source_entity_id,
            organization_id: organization.organization_id,
            resource_id: resource.resource_id,
            user_id: Some(user.user_id),
            name: format!("Website {}", Uuid::new_v4()),
            url: url.to_string(),
            parsed_urls: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// Conversation owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = schema::chats)]
pub struct Chat {
    pub chat_id: UuidText,
    pub organization_id: UuidText,
    pub owner_user_id: UuidText,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Chat {
    pub fn new(organization_id: Uuid, owner_user_id: Uuid, kind: &str, name: &str) -> Self {
        Self {
            chat_id: UuidText::generate(),
            organization_id: UuidText(organization_id),
            owner_user_id: UuidText(owner_user_id),
            kind: kind.to_string(),
            name: name.to_string(),
            summary: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = schema::chat_collections)]
pub struct ChatCollection {
    pub chat_id: UuidText,
    pub collection_id: UuidText,
    pub organization_id: UuidText,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = schema::chat_users)]
pub struct ChatUser {
    pub chat_id: UuidText,
    pub user_id: UuidText,
    pub organization_id: UuidText,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = schema::chat_resources)]
pub struct ChatResource {
    pub chat_id: UuidText,
    pub resource_id: UuidText,
    pub organization_id: UuidText,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Append-only log entry in a chat, ordered by creation time.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = schema::chat_messages)]
pub struct ChatMessage {
    pub chat_id: UuidText,
    pub message_id: UuidText,
    pub organization_id: UuidText,
    pub user_id: Option<UuidText>,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    /// Opaque key/value payload; stored as-is, never validated here.
    pub arguments: serde_json::Value,
    pub is_summarized: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ChatMessage {
    pub fn new(
        organization_id: Uuid,
        chat_id: Uuid,
        message_id: Uuid,
        user_id: Option<Uuid>,
        kind: &str,
        content: &str,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            chat_id: UuidText(chat_id),
            message_id: UuidText(message_id),
            organization_id: UuidText(organization_id),
            user_id: user_id.map(UuidText),
            kind: kind.to_string(),
            content: content.to_string(),
            arguments: serde_json::Value::Object(arguments),
            is_summarized: false,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}
