use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    // owner user id
    pub user: String,

    #[serde(default)]
    pub title: String,

    pub created_at: i64,

    // bumped whenever a message is added; drives the list order
    #[serde(default)]
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    // conversation id as hex string
    pub conversation: String,

    // "user" | "model"
    pub role: String,
    pub content: String,

    pub created_at: i64,
}

/// Role and text of the newest message, shown in conversation lists.
#[derive(Debug, Clone, Serialize)]
pub struct LastMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub last_message: Option<LastMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryPart {
    pub text: String,
}

/// One chat turn in the `{role, parts: [{text}]}` shape chat clients replay.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub role: String,
    pub parts: Vec<HistoryPart>,
}

impl From<Message> for HistoryEntry {
    fn from(m: Message) -> Self {
        HistoryEntry {
            role: m.role,
            parts: vec![HistoryPart { text: m.content }],
        }
    }
}
