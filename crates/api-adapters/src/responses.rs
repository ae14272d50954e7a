//! JSON envelopes returned by the HTTP surface. Every body carries
//! `success`; failures add `error`.

use domains::Ad;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct LobbyResponse {
    pub success: bool,
    pub ads: Vec<Ad>,
    pub count: usize,
}

/// `ads` is `null` when the caller should show its house promo.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReplayResponse {
    pub success: bool,
    pub ads: Option<Vec<Ad>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SweepResponse {
    pub success: bool,
    pub message: String,
    pub expired: usize,
    pub ads: Vec<Ad>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdResponse {
    pub success: bool,
    pub ad: Ad,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DbHealthResponse {
    pub rtt_ms: u64,
}
