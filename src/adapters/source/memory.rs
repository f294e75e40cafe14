//! In-memory document source

use super::traits::DocumentSource;
use crate::domain::message::InboundMessage;
use crate::domain::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;

/// Replays a fixed list of messages
#[derive(Debug, Default)]
pub struct StaticSource {
    messages: VecDeque<InboundMessage>,
}

impl StaticSource {
    pub fn new(messages: impl IntoIterator<Item = InboundMessage>) -> Self {
        Self {
            messages: messages.into_iter().collect(),
        }
    }

    /// `Start` for the given documents, the documents, then `End`
    pub fn from_documents(documents: impl IntoIterator<Item = Value>) -> Self {
        let documents: Vec<Value> = documents.into_iter().collect();
        let mut messages = VecDeque::with_capacity(documents.len() + 2);
        messages.push_back(InboundMessage::Start {
            expected: documents.len() as u64,
        });
        messages.extend(documents.into_iter().map(InboundMessage::Document));
        messages.push_back(InboundMessage::End);
        Self { messages }
    }

    pub fn remaining(&self) -> usize {
        self.messages.len()
    }
}

#[async_trait]
impl DocumentSource for StaticSource {
    async fn next_message(&mut self) -> Result<Option<InboundMessage>> {
        Ok(self.messages.pop_front())
    }

    fn describe(&self) -> String {
        format!("static ({} messages)", self.messages.len())
    }
}
