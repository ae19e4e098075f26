use async_trait::async_trait;
use relaycore::action::API_ACTION;
use relaycore::{ActionContext, ActionError, ActionExecutor, ActionOutput, ApiAction};
use relayruntime::{ExecutorFactory, ExecutorMetadata};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::{Map, Value};

/// Executor for `api` nodes: one outbound HTTP request per node
pub struct ApiExecutor {
    client: reqwest::Client,
}

impl ApiExecutor {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ApiExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionExecutor for ApiExecutor {
    fn node_type(&self) -> &str {
        API_ACTION
    }

    async fn execute(&self, ctx: ActionContext) -> Result<ActionOutput, ActionError> {
        let action = ApiAction::from_fields(&ctx.fields);

        // Both JSON fields are checked before anything touches the network.
        let headers = action.headers()?;
        let body = action.body()?;

        let endpoint = action
            .endpoint
            .as_deref()
            .ok_or_else(|| ActionError::Api("missing Endpoint field".to_string()))?;
        let method_name = action.method();
        let method = Method::from_bytes(method_name.as_bytes())
            .map_err(|_| ActionError::Api(format!("invalid HTTP method: {}", method_name)))?;

        ctx.events.info(format!("{} {}", method, endpoint));

        let response = self
            .client
            .request(method, endpoint)
            .headers(header_map(headers)?)
            .json(&body)
            .send()
            .await
            .map_err(|e| ActionError::Api(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ActionError::Api(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            ctx.events.warn(format!("Response status: {}", status.as_u16()));
            return Err(ActionError::Api(format!(
                "Request failed with status code {}",
                status.as_u16()
            )));
        }

        ctx.events.info(format!("Response status: {}", status.as_u16()));
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(ActionOutput::new().with_response(status.as_u16(), body))
    }
}

/// Non-string JSON values are sent as their JSON text
fn header_map(headers: Map<String, Value>) -> Result<HeaderMap, ActionError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let text = match value {
            Value::String(s) => s,
            other => other.to_string(),
        };
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ActionError::Api(format!("invalid header name {}: {}", name, e)))?;
        let header_value = HeaderValue::from_str(&text)
            .map_err(|e| ActionError::Api(format!("invalid value for header {}: {}", name, e)))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

pub struct ApiExecutorFactory {
    client: reqwest::Client,
}

impl ApiExecutorFactory {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ApiExecutorFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutorFactory for ApiExecutorFactory {
    fn create(&self) -> Result<Box<dyn ActionExecutor>, ActionError> {
        Ok(Box::new(ApiExecutor::with_client(self.client.clone())))
    }

    fn node_type(&self) -> &str {
        API_ACTION
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            description: "Make HTTP requests (Endpoint, Method, Headers, Body)".to_string(),
            category: "http".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_header_map_stringifies_values() {
        let headers = json!({"X-Retry": 3, "Authorization": "Bearer t"});
        let map = header_map(headers.as_object().unwrap().clone()).unwrap();
        assert_eq!(map["x-retry"], "3");
        assert_eq!(map["authorization"], "Bearer t");
    }

    #[test]
    fn test_header_map_rejects_bad_name() {
        let headers = json!({"bad name": "x"});
        let err = header_map(headers.as_object().unwrap().clone()).unwrap_err();
        assert_eq!(err.kind(), "ApiError");
    }
}
