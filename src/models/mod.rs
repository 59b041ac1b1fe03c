pub mod user;
pub mod conversation;
pub mod monitor;

pub use user::CurrentUser;
pub use conversation::{Conversation, ConversationSummary, HistoryEntry, HistoryPart, LastMessage, Message};
pub use monitor::{MonitorHit, MonitorStatus, MonitorTask, StartMonitor, ThresholdRule};
