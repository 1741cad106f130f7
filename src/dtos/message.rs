//! Message DTOs - Data Transfer Objects per messaggi

use crate::entities::{Message, MessageType, Reaction, ReadReceipt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Struct per gestire io col client
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MessageDTO {
    pub message_id: i64,
    pub chat_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub message_type: MessageType,
    pub reply_to_id: Option<i64>,
    pub is_edited: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub read_by: Vec<ReadReceiptDTO>,
    pub reactions: Vec<ReactionSummaryDTO>,
}

impl From<Message> for MessageDTO {
    fn from(value: Message) -> Self {
        Self {
            message_id: value.message_id,
            chat_id: value.chat_id,
            sender_id: value.sender_id,
            // un messaggio cancellato non espone mai il contenuto
            content: if value.is_deleted { String::new() } else { value.content },
            message_type: value.message_type,
            reply_to_id: value.reply_to_id,
            is_edited: value.is_edited,
            is_deleted: value.is_deleted,
            created_at: value.created_at,
            updated_at: value.updated_at,
            read_by: Vec::new(),
            reactions: Vec::new(),
        }
    }
}

impl MessageDTO {
    /// Join messages with their receipts and reactions, keeping the order of `messages`
    pub fn assemble(
        messages: Vec<Message>,
        receipts: Vec<ReadReceipt>,
        reactions: Vec<Reaction>,
    ) -> Vec<MessageDTO> {
        let mut receipts_by_message: HashMap<i64, Vec<ReadReceiptDTO>> = HashMap::new();
        for receipt in receipts {
            receipts_by_message
                .entry(receipt.message_id)
                .or_default()
                .push(ReadReceiptDTO {
                    user_id: receipt.user_id,
                    read_at: receipt.read_at,
                });
        }

        let mut reactions_by_message: HashMap<i64, Vec<Reaction>> = HashMap::new();
        for reaction in reactions {
            reactions_by_message
                .entry(reaction.message_id)
                .or_default()
                .push(reaction);
        }

        messages
            .into_iter()
            .map(|message| {
                let id = message.message_id;
                let mut dto = MessageDTO::from(message);
                dto.read_by = receipts_by_message.remove(&id).unwrap_or_default();
                dto.reactions = ReactionSummaryDTO::aggregate(
                    reactions_by_message.remove(&id).unwrap_or_default(),
                );
                dto
            })
            .collect()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReadReceiptDTO {
    pub user_id: i64,
    pub read_at: DateTime<Utc>,
}

/// Reazioni raggruppate per emoji
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReactionSummaryDTO {
    pub emoji: String,
    pub count: usize,
    pub user_ids: Vec<i64>,
}

impl ReactionSummaryDTO {
    /// Groups by emoji in order of first appearance
    pub fn aggregate(reactions: Vec<Reaction>) -> Vec<ReactionSummaryDTO> {
        let mut summaries: Vec<ReactionSummaryDTO> = Vec::new();
        for reaction in reactions {
            match summaries.iter_mut().find(|s| s.emoji == reaction.emoji) {
                Some(summary) => {
                    summary.count += 1;
                    summary.user_ids.push(reaction.user_id);
                }
                None => summaries.push(ReactionSummaryDTO {
                    emoji: reaction.emoji,
                    count: 1,
                    user_ids: vec![reaction.user_id],
                }),
            }
        }
        summaries
    }
}

fn default_message_type() -> MessageType {
    MessageType::Text
}

/// Body di POST /chats/{id}/messages
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct SendMessageDTO {
    #[validate(length(min = 1, max = 5000, message = "Message content must be between 1 and 5000 characters"))]
    pub content: String,
    #[serde(default = "default_message_type")]
    pub message_type: MessageType,
    pub reply_to_id: Option<i64>,
}

/// DTO per creare un nuovo messaggio (senza message_id)
#[derive(Debug, Clone)]
pub struct CreateMessageDTO {
    pub chat_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub message_type: MessageType,
    pub reply_to_id: Option<i64>,
}

/// DTO per aggiornare un messaggio (solo campi modificabili)
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct UpdateMessageDTO {
    #[validate(length(min = 1, max = 5000, message = "Message content must be between 1 and 5000 characters"))]
    pub content: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct ReactionDTO {
    #[validate(length(min = 1, max = 16))]
    pub emoji: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ReactionToggledDTO {
    pub message_id: i64,
    pub emoji: String,
    pub added: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct MarkReadResultDTO {
    pub chat_id: i64,
    pub marked: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reaction(message_id: i64, user_id: i64, emoji: &str) -> Reaction {
        Reaction {
            message_id,
            user_id,
            emoji: emoji.to_string(),
            created_at: Utc::now(),
        }
    }

    fn message(id: i64, deleted: bool) -> Message {
        let now = Utc::now();
        Message {
            message_id: id,
            chat_id: 1,
            sender_id: 1,
            content: "hello".to_string(),
            message_type: MessageType::Text,
            reply_to_id: None,
            is_edited: false,
            is_deleted: deleted,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn reactions_are_grouped_by_emoji() {
        let summary = ReactionSummaryDTO::aggregate(vec![
            reaction(1, 10, "👍"),
            reaction(1, 11, "🎉"),
            reaction(1, 12, "👍"),
        ]);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].emoji, "👍");
        assert_eq!(summary[0].count, 2);
        assert_eq!(summary[0].user_ids, vec![10, 12]);
        assert_eq!(summary[1].count, 1);
    }

    #[test]
    fn assemble_attaches_receipts_to_the_right_message() {
        let now = Utc::now();
        let dtos = MessageDTO::assemble(
            vec![message(2, false), message(1, true)],
            vec![ReadReceipt { message_id: 1, user_id: 5, read_at: now }],
            vec![reaction(2, 5, "🔥")],
        );
        assert_eq!(dtos[0].message_id, 2);
        assert!(dtos[0].read_by.is_empty());
        assert_eq!(dtos[0].reactions.len(), 1);
        assert_eq!(dtos[1].read_by.len(), 1);
        assert_eq!(dtos[1].content, "");
    }
}
