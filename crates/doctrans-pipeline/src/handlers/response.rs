//! Handler results
//!
//! Every entry point answers with a [`HandlerResponse`] in the API Gateway
//! proxy shape, whatever triggered it. Bodies follow one JSON envelope:
//! `{"success": true, "data": ...}` or
//! `{"success": false, "error": {"code": ..., "message": ...}}`.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

use crate::error::PipelineError;

/// Structured result returned to the trigger source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl HandlerResponse {
    /// 200 with `data` wrapped in the success envelope.
    pub fn success<T: Serialize>(data: &T) -> Self {
        let body = match serde_json::to_value(data) {
            Ok(data) => json!({ "success": true, "data": data }),
            Err(e) => {
                tracing::error!("Failed to serialize response: {}", e);
                return Self {
                    status_code: 500,
                    headers: json_headers(),
                    body: json!({
                        "success": false,
                        "error": {
                            "code": "INTERNAL_ERROR",
                            "message": "response could not be serialized",
                        }
                    })
                    .to_string(),
                };
            },
        };

        Self {
            status_code: 200,
            headers: json_headers(),
            body: body.to_string(),
        }
    }

    /// Error envelope with the error's status code.
    pub fn error(err: &PipelineError) -> Self {
        let body = json!({
            "success": false,
            "error": {
                "code": err.code(),
                "message": err.to_string(),
            }
        });

        Self {
            status_code: err.status_code(),
            headers: json_headers(),
            body: body.to_string(),
        }
    }

    /// Add permissive CORS headers for browser clients.
    pub fn with_cors(mut self) -> Self {
        for (name, value) in [
            ("Access-Control-Allow-Origin", "*"),
            ("Access-Control-Allow-Headers", "*"),
            ("Access-Control-Allow-Methods", "OPTIONS,POST"),
        ] {
            self.headers.insert(name.to_string(), value.to_string());
        }
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Parsed body, `Null` when it is not JSON.
    pub fn body_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

impl From<Result<HandlerResponse, PipelineError>> for HandlerResponse {
    fn from(result: Result<HandlerResponse, PipelineError>) -> Self {
        result.unwrap_or_else(|err| HandlerResponse::error(&err))
    }
}

fn json_headers() -> BTreeMap<String, String> {
    BTreeMap::from([("Content-Type".to_string(), "application/json".to_string())])
}
