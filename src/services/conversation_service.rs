use chrono::Utc;
use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::{FindOneOptions, FindOptions};

use crate::{
    models::{Conversation, ConversationSummary, HistoryEntry, LastMessage, Message},
    AppState,
};

pub const MAX_TITLE_CHARS: usize = 60;
const LIST_LIMIT: i64 = 50;

/// Title for a new conversation: the explicit title, else the first message,
/// else "new session", cut to `MAX_TITLE_CHARS` characters.
pub fn conversation_title(title: Option<&str>, from_message: Option<&str>) -> String {
    let source = [title, from_message]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("new session");

    source.chars().take(MAX_TITLE_CHARS).collect()
}

/// Latest conversations of `user_id` with a preview of their newest message.
pub async fn list_conversations(
    state: &AppState,
    user_id: &str,
) -> Result<Vec<ConversationSummary>, String> {
    let conversations = state.db.collection::<Conversation>("conversations");
    let messages = state.db.collection::<Message>("messages");

    let find_opts = FindOptions::builder()
        .sort(doc! { "updated_at": -1 })
        .limit(LIST_LIMIT)
        .build();

    let mut cursor = conversations
        .find(doc! { "user": user_id }, find_opts)
        .await
        .map_err(|e| e.to_string())?;

    let mut items: Vec<ConversationSummary> = Vec::new();
    while let Some(res) = cursor.next().await {
        let c = res.map_err(|e| e.to_string())?;
        let id = c.id.to_hex();

        let last_opts = FindOneOptions::builder().sort(doc! { "created_at": -1 }).build();
        let last = messages
            .find_one(doc! { "conversation": &id }, last_opts)
            .await
            .map_err(|e| e.to_string())?;

        items.push(ConversationSummary {
            id,
            title: c.title,
            created_at: c.created_at,
            updated_at: c.updated_at,
            last_message: last.map(|m| LastMessage {
                role: m.role,
                content: m.content,
            }),
        });
    }

    Ok(items)
}

pub async fn create_conversation(
    state: &AppState,
    user_id: &str,
    title: String,
) -> Result<Conversation, String> {
    let conversations = state.db.collection::<Conversation>("conversations");
    let now = Utc::now().timestamp();

    let conv = Conversation {
        id: ObjectId::new(),
        user: user_id.to_string(),
        title,
        created_at: now,
        updated_at: now,
    };

    conversations
        .insert_one(&conv, None)
        .await
        .map_err(|e| e.to_string())?;

    Ok(conv)
}

/// Conversation `conversation_id` if it belongs to `user_id`.
///
/// A malformed id is treated the same as a missing conversation.
pub async fn find_owned(
    state: &AppState,
    conversation_id: &str,
    user_id: &str,
) -> Result<Option<Conversation>, String> {
    let Ok(oid) = ObjectId::parse_str(conversation_id) else {
        return Ok(None);
    };

    let conversations = state.db.collection::<Conversation>("conversations");
    conversations
        .find_one(doc! { "_id": oid, "user": user_id }, None)
        .await
        .map_err(|e| e.to_string())
}

/// Messages of `conv`, oldest first.
pub async fn history(state: &AppState, conv: &Conversation) -> Result<Vec<HistoryEntry>, String> {
    let messages = state.db.collection::<Message>("messages");
    let find_opts = FindOptions::builder().sort(doc! { "created_at": 1 }).build();

    let mut cursor = messages
        .find(doc! { "conversation": conv.id.to_hex() }, find_opts)
        .await
        .map_err(|e| e.to_string())?;

    let mut items: Vec<HistoryEntry> = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res.map_err(|e| e.to_string())?.into());
    }

    Ok(items)
}

/// Stop the conversation's monitors, then delete its messages and the conversation.
pub async fn delete_conversation(state: &AppState, conv: &Conversation) -> Result<(), String> {
    let conversation_id = conv.id.to_hex();

    let stopped = state.monitor.stop_all(&conversation_id);
    if stopped > 0 {
        tracing::info!(conversation_id = %conversation_id, stopped, "stopped monitors of deleted conversation");
    }

    let messages = state.db.collection::<Message>("messages");
    messages
        .delete_many(doc! { "conversation": &conversation_id }, None)
        .await
        .map_err(|e| e.to_string())?;

    let conversations = state.db.collection::<Conversation>("conversations");
    conversations
        .delete_one(doc! { "_id": conv.id, "user": &conv.user }, None)
        .await
        .map_err(|e| e.to_string())?;

    Ok(())
}
