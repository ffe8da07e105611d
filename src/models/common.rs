use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Error payload inside the `{"success": false, "error": …}` envelope.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
}
