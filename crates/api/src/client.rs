use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use snafu::{OptionExt, ResultExt};

use super::credentials::CredentialSource;
use super::error::{
    AssistantResult, AttachmentMimeSnafu, BuildClientSnafu, MalformedBodySnafu,
    MissingCredentialSnafu, ReadAttachmentSnafu, StatusSnafu, TransportSnafu,
};
use super::types::{
    AskJsonBody, AskReply, AskRequest, ConversationDetail, ConversationId, ConversationSummary,
};

pub const ASK_PATH: &str = "/v1/ask_mom";
pub const CONVERSATIONS_PATH: &str = "/v1/conversations";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Remote assistant backend as seen by the session controller.
pub trait AssistantApi: Send + Sync {
    fn ask<'a>(&'a self, request: AskRequest) -> BoxFuture<'a, AssistantResult<AskReply>>;

    /// Lists past conversations, optionally full-text filtered by `query`.
    fn list_conversations<'a>(
        &'a self,
        query: Option<String>,
    ) -> BoxFuture<'a, AssistantResult<Vec<ConversationSummary>>>;

    fn load_conversation<'a>(
        &'a self,
        conversation_id: ConversationId,
    ) -> BoxFuture<'a, AssistantResult<ConversationDetail>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim().trim_end_matches('/').to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct HttpAssistantClient {
    http: reqwest::Client,
    config: ClientConfig,
    credentials: Arc<dyn CredentialSource>,
}

impl HttpAssistantClient {
    pub fn new(
        config: ClientConfig,
        credentials: Arc<dyn CredentialSource>,
    ) -> AssistantResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context(BuildClientSnafu {
                stage: "build-http-client",
            })?;

        Ok(Self {
            http,
            config,
            credentials,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn bearer_token(&self, stage: &'static str) -> AssistantResult<String> {
        self.credentials
            .bearer_token()
            .context(MissingCredentialSnafu { stage })
    }

    async fn send(
        &self,
        builder: RequestBuilder,
        endpoint: &str,
        stage: &'static str,
    ) -> AssistantResult<String> {
        let response: Response = builder.send().await.context(TransportSnafu {
            stage,
            endpoint: endpoint.to_string(),
        })?;
        let status = response.status();
        let body = response.text().await.context(TransportSnafu {
            stage,
            endpoint: endpoint.to_string(),
        })?;

        if !status.is_success() {
            tracing::warn!(
                endpoint = %endpoint,
                status = status.as_u16(),
                stage,
                "assistant backend returned a non-success status"
            );
            return StatusSnafu {
                stage,
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            }
            .fail();
        }

        Ok(body)
    }

    async fn multipart_form(request: &AskRequest) -> AssistantResult<Form> {
        let mut form = Form::new().text("text", request.text.clone());
        if let Some(conversation_id) = request.conversation_id {
            form = form.text("conversation_id", conversation_id.to_string());
        }

        // Parts are appended in selection order; the backend keeps that order.
        for (index, uri) in request.images.iter().enumerate() {
            let (file_name, mime) = filename_and_mime(uri, index);
            let bytes = tokio::fs::read(local_path(uri))
                .await
                .context(ReadAttachmentSnafu {
                    stage: "read-attachment",
                    uri: uri.clone(),
                })?;
            let part = Part::bytes(bytes)
                .file_name(file_name)
                .mime_str(mime)
                .context(AttachmentMimeSnafu {
                    stage: "attachment-mime",
                    uri: uri.clone(),
                    mime,
                })?;
            form = form.part("images[]", part);
        }

        Ok(form)
    }

    async fn ask_inner(&self, request: AskRequest) -> AssistantResult<AskReply> {
        let token = self.bearer_token("ask-credential")?;
        let endpoint = self.endpoint(ASK_PATH);
        let builder = self.http.post(&endpoint).bearer_auth(token);

        let builder = if request.is_multipart() {
            tracing::debug!(
                image_count = request.images.len(),
                "sending ask request as multipart"
            );
            builder.multipart(Self::multipart_form(&request).await?)
        } else {
            builder.json(&AskJsonBody {
                text: &request.text,
                conversation_id: request.conversation_id,
            })
        };

        let body = self.send(builder, &endpoint, "ask-send").await?;
        parse_body(&body, &endpoint, "ask-parse")
    }

    async fn list_inner(&self, query: Option<String>) -> AssistantResult<Vec<ConversationSummary>> {
        let token = self.bearer_token("list-credential")?;
        let endpoint = self.endpoint(CONVERSATIONS_PATH);
        let mut builder = self.http.get(&endpoint).bearer_auth(token);

        if let Some(query) = query.as_deref().map(str::trim)
            && !query.is_empty()
        {
            builder = builder.query(&[("q", query)]);
        }

        let body = self.send(builder, &endpoint, "list-send").await?;
        let value: serde_json::Value = if body.trim().is_empty() {
            serde_json::Value::Null
        } else {
            parse_body(&body, &endpoint, "list-parse-value")?
        };

        if !value.is_array() {
            tracing::warn!(endpoint = %endpoint, "conversation list body is not an array");
            return Ok(Vec::new());
        }

        serde_json::from_value(value).context(MalformedBodySnafu {
            stage: "list-parse-rows",
            endpoint,
        })
    }

    async fn load_inner(
        &self,
        conversation_id: ConversationId,
    ) -> AssistantResult<ConversationDetail> {
        let token = self.bearer_token("load-credential")?;
        let endpoint = self.endpoint(&format!("{CONVERSATIONS_PATH}/{conversation_id}"));
        let builder = self.http.get(&endpoint).bearer_auth(token);

        let body = self.send(builder, &endpoint, "load-send").await?;
        parse_body(&body, &endpoint, "load-parse")
    }
}

impl AssistantApi for HttpAssistantClient {
    fn ask<'a>(&'a self, request: AskRequest) -> BoxFuture<'a, AssistantResult<AskReply>> {
        Box::pin(self.ask_inner(request))
    }

    fn list_conversations<'a>(
        &'a self,
        query: Option<String>,
    ) -> BoxFuture<'a, AssistantResult<Vec<ConversationSummary>>> {
        Box::pin(self.list_inner(query))
    }

    fn load_conversation<'a>(
        &'a self,
        conversation_id: ConversationId,
    ) -> BoxFuture<'a, AssistantResult<ConversationDetail>> {
        Box::pin(self.load_inner(conversation_id))
    }
}

fn parse_body<T: DeserializeOwned>(
    body: &str,
    endpoint: &str,
    stage: &'static str,
) -> AssistantResult<T> {
    serde_json::from_str(body).context(MalformedBodySnafu {
        stage,
        endpoint: endpoint.to_string(),
    })
}

fn local_path(uri: &str) -> &str {
    uri.strip_prefix("file://").unwrap_or(uri)
}

/// Upload file name and mime type guessed from the image handle.
pub fn filename_and_mime(uri: &str, fallback_index: usize) -> (String, &'static str) {
    let without_query = uri.split(['?', '#']).next().unwrap_or_default();
    let file_name = without_query
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("photo-{fallback_index}.jpg"));

    let extension = file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    let mime = match extension.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "image/jpeg",
    };

    (file_name, mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_strips_query_and_fragment() {
        assert_eq!(
            filename_and_mime("file:///var/mobile/IMG_0001.PNG?size=large#x", 0),
            ("IMG_0001.PNG".to_string(), "image/png")
        );
    }

    #[test]
    fn filename_falls_back_to_indexed_photo_name() {
        assert_eq!(
            filename_and_mime("content://media/", 3),
            ("photo-3.jpg".to_string(), "image/jpeg")
        );
    }

    #[test]
    fn unknown_extensions_upload_as_jpeg() {
        assert_eq!(filename_and_mime("/tmp/scan.tiff", 0).1, "image/jpeg");
        assert_eq!(filename_and_mime("/tmp/live.heic", 0).1, "image/heic");
        assert_eq!(filename_and_mime("/tmp/shot.webp", 0).1, "image/webp");
    }

    #[test]
    fn config_trims_trailing_slash() {
        let config = ClientConfig::new(" https://api.example.com/ ");
        assert_eq!(config.base_url, "https://api.example.com");
    }
}
