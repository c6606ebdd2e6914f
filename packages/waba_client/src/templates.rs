use reqwest::Method;

use crate::types::{ListResponse, TemplateRecord};
use crate::{WabaClient, WabaResult, decode};

impl WabaClient {
    /// List the message templates of a WhatsApp Business account.
    pub async fn list_templates(&self, waba_id: &str) -> WabaResult<Vec<TemplateRecord>> {
        let response = self
            .request(Method::GET, "/message_templates")
            .query(&[("waba_id", waba_id)])
            .send()
            .await?;
        let list: ListResponse<TemplateRecord> = decode(response).await?;
        Ok(list.data)
    }
}
