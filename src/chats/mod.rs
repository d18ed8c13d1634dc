use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::shards::{EntityFamily, ShardSet};
use crate::shared::error::StoreError;
use crate::shared::models::schema::{
    chat_collections, chat_messages, chat_resources, chat_users, chats,
};
use crate::shared::models::{
    Chat, ChatCollection, ChatMessage, ChatResource, ChatUser, UuidText,
};
use crate::shared::utils::{get_conn, DbPool};

/// How much of the tail of a conversation a single read returns.
pub const CHAT_HISTORY_LIMIT: i64 = 40;

/// Repository for the chats shard: conversations, their association rows,
/// and the append-only message log.
pub struct ChatRepo {
    pool: DbPool,
}

impl ChatRepo {
    pub fn new(shards: &ShardSet) -> Result<Self, StoreError> {
        Ok(Self {
            pool: shards.pool(EntityFamily::Chats)?,
        })
    }

    pub fn get_chat(&self, chat_id: Uuid, organization_id: Uuid) -> Result<Chat, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        chats::table
            .filter(chats::chat_id.eq(UuidText(chat_id)))
            .filter(chats::organization_id.eq(UuidText(organization_id)))
            .first::<Chat>(&mut conn)
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("chat {chat_id}")))
    }

    pub fn create_chat(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        kind: &str,
        name: &str,
    ) -> Result<Chat, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        let chat: Chat = diesel::insert_into(chats::table)
            .values(Chat::new(organization_id, user_id, kind, name))
            .get_result(&mut conn)?;

        Ok(chat)
    }

    pub fn update_chat_name(&self, chat_id: Uuid, name: &str) -> Result<Chat, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        conn.transaction::<Chat, StoreError, _>(|conn| {
            let chat = chats::table
                .filter(chats::chat_id.eq(UuidText(chat_id)))
                .first::<Chat>(conn)
                .optional()?
                .ok_or_else(|| StoreError::NotFound(format!("chat {chat_id}")))?;

            let updated: Chat = diesel::update(chats::table.filter(chats::chat_id.eq(chat.chat_id)))
                .set((
                    chats::name.eq(name.to_string()),
                    chats::updated_at.eq(Some(Utc::now())),
                ))
                .get_result(conn)?;

            Ok(updated)
        })
    }

    /// Commit an association row; the resource is not existence-checked
    /// against its own shard.
    pub fn add_resource_to_chat(
        &self,
        organization_id: Uuid,
        chat_id: Uuid,
        resource_id: Uuid,
    ) -> Result<ChatResource, StoreError> {
        let row = ChatResource {
            chat_id: UuidText(chat_id),
            resource_id: UuidText(resource_id),
            organization_id: UuidText(organization_id),
            created_at: Utc::now(),
            updated_at: None,
        };

        let mut conn = get_conn(&self.pool)?;
        let row: ChatResource = diesel::insert_into(chat_resources::table)
            .values(row)
            .get_result(&mut conn)?;

        Ok(row)
    }

    pub fn add_collection_to_chat(
        &self,
        organization_id: Uuid,
        chat_id: Uuid,
        collection_id: Uuid,
    ) -> Result<ChatCollection, StoreError> {
        let row = ChatCollection {
            chat_id: UuidText(chat_id),
            collection_id: UuidText(collection_id),
            organization_id: UuidText(organization_id),
            created_at: Utc::now(),
            updated_at: None,
        };

        let mut conn = get_conn(&self.pool)?;
        let row: ChatCollection = diesel::insert_into(chat_collections::table)
            .values(row)
            .get_result(&mut conn)?;

        Ok(row)
    }

    pub fn add_user_to_chat(
        &self,
        organization_id: Uuid,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> Result<ChatUser, StoreError> {
        let row = ChatUser {
            chat_id: UuidText(chat_id),
            user_id: UuidText(user_id),
            organization_id: UuidText(organization_id),
            created_at: Utc::now(),
            updated_at: None,
        };

        let mut conn = get_conn(&self.pool)?;
        let row: ChatUser = diesel::insert_into(chat_users::table)
            .values(row)
            .get_result(&mut conn)?;

        Ok(row)
    }

    pub fn get_chat_resources(&self, chat_id: Uuid) -> Result<Vec<ChatResource>, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        let rows = chat_resources::table
            .filter(chat_resources::chat_id.eq(UuidText(chat_id)))
            .load::<ChatResource>(&mut conn)?;

        Ok(rows)
    }

    pub fn get_chat_collections(&self, chat_id: Uuid) -> Result<Vec<ChatCollection>, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        let rows = chat_collections::table
            .filter(chat_collections::chat_id.eq(UuidText(chat_id)))
            .load::<ChatCollection>(&mut conn)?;

        Ok(rows)
    }

    pub fn get_chat_users(&self, chat_id: Uuid) -> Result<Vec<ChatUser>, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        let rows = chat_users::table
            .filter(chat_users::chat_id.eq(UuidText(chat_id)))
            .load::<ChatUser>(&mut conn)?;

        Ok(rows)
    }

    /// Append one message. A missing `message_id` is generated; a missing
    /// payload becomes the empty mapping.
    pub fn create_chat_message(
        &self,
        organization_id: Uuid,
        chat_id: Uuid,
        kind: &str,
        content: &str,
        message_id: Option<Uuid>,
        owner_user_id: Option<Uuid>,
        arguments: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<ChatMessage, StoreError> {
        let message = ChatMessage::new(
            organization_id,
            chat_id,
            message_id.unwrap_or_else(Uuid::new_v4),
            owner_user_id,
            kind,
            content,
            arguments.unwrap_or_default(),
        );

        let mut conn = get_conn(&self.pool)?;
        let message: ChatMessage = diesel::insert_into(chat_messages::table)
            .values(message)
            .get_result(&mut conn)?;

        Ok(message)
    }

    /// The 40 most recent messages, returned oldest-first.
    ///
    /// The storage query walks newest-first so the cap lands on the tail
    /// of the log; the page is re-reversed before returning so callers
    /// always see chronological order.
    pub fn get_chat_messages(&self, chat_id: Uuid) -> Result<Vec<ChatMessage>, StoreError> {
        let mut conn = get_conn(&self.pool)?;

        let mut messages = chat_messages::table
            .filter(chat_messages::chat_id.eq(UuidText(chat_id)))
            .order(chat_messages::created_at.desc())
            .limit(CHAT_HISTORY_LIMIT)
            .load::<ChatMessage>(&mut conn)?;

        messages.reverse();
        Ok(messages)
    }
}
