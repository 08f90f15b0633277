use crate::errors::AppError;
use shop_types::domain::chat::{ChatMessage, SenderRole};
use shop_types::domain::views::ConversationView;
use shop_types::ports::store::ShopStore;

/// Customer-support messaging: one conversation per customer, staff-side
/// read/unread tracking.
pub struct ChatService<S: ShopStore> {
    store: S,
}

impl<S: ShopStore> ChatService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Fetch the caller's conversation, creating it on first use.
    pub async fn open_conversation(&self, host_id: i64) -> Result<ConversationView, AppError> {
        let conversation = match self.store.conversation_for_host(host_id).await? {
            Some(c) => c,
            None => self.store.create_conversation(host_id).await?,
        };
        self.view(conversation.id).await
    }

    pub async fn send_message(
        &self,
        conversation_id: i64,
        sender_id: i64,
        sender_role: SenderRole,
        content: String,
    ) -> Result<ConversationView, AppError> {
        if content.trim().is_empty() {
            return Err(AppError::validation(
                "empty_message",
                "message content cannot be empty",
            ));
        }
        self.require_conversation(conversation_id).await?;
        let message = ChatMessage::new(conversation_id, sender_id, sender_role, content);
        self.store.append_message(message).await?;
        self.view(conversation_id).await
    }

    pub async fn conversation(&self, id: i64) -> Result<ConversationView, AppError> {
        self.require_conversation(id).await?;
        self.view(id).await
    }

    pub async fn list_conversations(&self) -> Result<Vec<ConversationView>, AppError> {
        let conversations = self.store.list_conversations().await?;
        let mut views = Vec::with_capacity(conversations.len());
        for c in conversations {
            views.push(self.view(c.id).await?);
        }
        Ok(views)
    }

    pub async fn mark_read(&self, id: i64) -> Result<(), AppError> {
        if !self.store.mark_conversation_read(id).await? {
            return Err(AppError::not_found(
                "conversation_not_found",
                format!("conversation {id} not found"),
            ));
        }
        Ok(())
    }

    async fn require_conversation(&self, id: i64) -> Result<(), AppError> {
        self.store
            .get_conversation(id)
            .await?
            .map(|_| ())
            .ok_or_else(|| {
                AppError::not_found(
                    "conversation_not_found",
                    format!("conversation {id} not found"),
                )
            })
    }

    async fn view(&self, id: i64) -> Result<ConversationView, AppError> {
        let conversation = self.store.get_conversation(id).await?.ok_or_else(|| {
            AppError::not_found(
                "conversation_not_found",
                format!("conversation {id} not found"),
            )
        })?;
        let messages = self.store.conversation_messages(id).await?;
        Ok(ConversationView {
            id: conversation.id,
            host_id: conversation.host_id,
            is_read: conversation.is_read,
            messages,
        })
    }
}
