//! HTTP client for the ComfyUI API.

use async_trait::async_trait;
use comfy_bridge_common::{JobHandle, JobState, SubmitReceipt, Workflow};
use reqwest::{Client, Method, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::history::{classify_history, classify_queue};
use super::ComfyEngine;
use crate::config::EngineConfig;
use crate::error::{Error, Result};

/// ComfyUI engine reached over HTTP.
///
/// Every request is bounded by the configured timeout; exceeding it is
/// reported exactly like a refused connection.
pub struct ComfyClient {
    http_client: Client,
    base_url: Url,
}

impl ComfyClient {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| Error::Transport(format!("invalid engine URL {}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Transport(format!(
                "invalid engine URL {}: not a base URL",
                config.base_url
            )));
        }

        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Build an endpoint URL, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get(&self, segments: &[&str]) -> Result<Value> {
        self.send(Method::GET, segments, None::<&()>).await
    }

    async fn post<B: Serialize + Sync>(&self, segments: &[&str], body: Option<&B>) -> Result<Value> {
        self.send(Method::POST, segments, body).await
    }

    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<Value> {
        let url = self.endpoint(segments);
        tracing::debug!("ComfyUI request: {} {}", method, url);

        let mut request = self.http_client.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!("ComfyUI request {} {} failed: {}", method, url, e);
            Error::from(e)
        })?;

        read_json(response).await
    }
}

/// Decode a response body, treating an empty success body as `{}`.
async fn read_json(response: Response) -> Result<Value> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::warn!("ComfyUI returned {}: {}", status, body);
        return Err(Error::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    if body.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    serde_json::from_str(&body).map_err(|e| Error::Malformed(e.to_string()))
}

// ============================================================================
// ComfyUI API types
// ============================================================================

#[derive(Debug, Serialize)]
struct PromptRequest<'a> {
    prompt: &'a Workflow,
    client_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct PromptResponse {
    #[serde(default)]
    prompt_id: Option<String>,
    #[serde(default)]
    number: Option<u64>,
}

#[derive(Debug, Serialize)]
struct FreeRequest {
    free_memory: bool,
    unload_models: bool,
}

// ============================================================================
// ComfyEngine implementation
// ============================================================================

#[async_trait]
impl ComfyEngine for ComfyClient {
    async fn object_info(&self, node_type: Option<&str>) -> Result<Value> {
        match node_type {
            Some(node_type) => self.get(&["object_info", node_type]).await,
            None => self.get(&["object_info"]).await,
        }
    }

    async fn submit(&self, workflow: &Workflow, client_id: &str) -> Result<SubmitReceipt> {
        let request = PromptRequest {
            prompt: workflow,
            client_id,
        };
        let value = self.post(&["prompt"], Some(&request)).await?;

        let response: PromptResponse =
            serde_json::from_value(value).map_err(|e| Error::Malformed(e.to_string()))?;
        let prompt_id = response
            .prompt_id
            .ok_or_else(|| Error::Malformed("submission response has no prompt_id".to_string()))?;

        tracing::info!(
            "Queued workflow of {} nodes as {} (position {:?})",
            workflow.len(),
            prompt_id,
            response.number
        );
        Ok(SubmitReceipt::new(JobHandle::new(prompt_id), response.number))
    }

    async fn job_status(&self, handle: &JobHandle) -> Result<JobState> {
        let history = self.get(&["history", handle.as_str()]).await?;
        if let Some(state) = classify_history(handle, &history) {
            return Ok(state);
        }

        let queue = self.get(&["queue"]).await?;
        Ok(classify_queue(handle, &queue))
    }

    async fn system_stats(&self) -> Result<Value> {
        self.get(&["system_stats"]).await
    }

    async fn free(&self, unload_models: bool) -> Result<Value> {
        let request = FreeRequest {
            free_memory: true,
            unload_models,
        };
        self.post(&["free"], Some(&request)).await
    }

    async fn interrupt(&self) -> Result<Value> {
        self.post(&["interrupt"], None::<&()>).await
    }
}
