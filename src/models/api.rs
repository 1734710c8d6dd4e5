use crate::models::chat::ChatSummary;
use serde::{ Serialize, Deserialize };

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct LastMessagesRequest {
    #[serde(default)]
    pub character_avatar: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(untagged)]
pub enum LastMessagesResponse {
    Success {
        success: bool,
        #[serde(rename = "chatLastMessages")]
        chat_last_messages: Vec<ChatSummary>,
    },
    Failure {
        success: bool,
        error: String,
    },
}

impl LastMessagesResponse {
    pub fn ok(chat_last_messages: Vec<ChatSummary>) -> Self {
        LastMessagesResponse::Success { success: true, chat_last_messages }
    }

    pub fn error(message: impl Into<String>) -> Self {
        LastMessagesResponse::Failure { success: false, error: message.into() }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PingResponse {
    pub success: bool,
    pub message: String,
}
