use reqwest::Method;

use crate::types::{ConversationQuery, ConversationRecord, ListResponse, MessageRecord};
use crate::{WabaClient, WabaResult, decode};

impl WabaClient {
    /// List conversations for a phone number, newest activity first.
    ///
    /// Paging is not exposed; callers bound the result with
    /// [`ConversationQuery::limit`] instead.
    pub async fn list_conversations(
        &self,
        phone_number_id: &str,
        query: &ConversationQuery,
    ) -> WabaResult<Vec<ConversationRecord>> {
        let mut params = vec![("phone_number_id", phone_number_id.to_string())];
        if let Some(status) = &query.status {
            params.push(("status", status.clone()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(fields) = &query.fields {
            params.push(("fields", fields.clone()));
        }

        let response = self
            .request(Method::GET, "/conversations")
            .query(&params)
            .send()
            .await?;
        let list: ListResponse<ConversationRecord> = decode(response).await?;
        Ok(list.data)
    }

    /// Fetch the message history of one conversation. The full envelope is
    /// returned so paging data survives a pass-through.
    pub async fn list_messages(
        &self,
        phone_number_id: &str,
        conversation_id: &str,
        limit: Option<u32>,
    ) -> WabaResult<ListResponse<MessageRecord>> {
        let mut params = vec![("phone_number_id", phone_number_id.to_string())];
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }

        let response = self
            .request(Method::GET, &format!("/conversations/{conversation_id}/messages"))
            .query(&params)
            .send()
            .await?;
        decode(response).await
    }
}
