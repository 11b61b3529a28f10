use serde::{Deserialize, Serialize};

/// Twilio's `POST .../Messages.json` request body, form-encoded.
#[derive(Debug, Serialize)]
pub struct SendMessageRequest {
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Body")]
    pub body: String,
}

/// The fields of Twilio's response this transport actually inspects.
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub sid: Option<String>,
    pub status: Option<String>,
    pub error_code: Option<i64>,
    pub error_message: Option<String>,
}
