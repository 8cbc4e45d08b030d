use super::super::domain::model::Priority;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct EnqueueRequest {
    pub user_identifier: String,
    pub priority: Option<Priority>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionResponse {
    pub position: u64,
    pub estimated_wait_seconds: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateQueueRequest {
    pub name: String,
    pub description: Option<String>,
    pub max_concurrent_users: u32,
    pub release_rate_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateQueueRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub max_concurrent_users: Option<u32>,
    pub release_rate_per_minute: Option<u32>,
    pub active: Option<bool>,
}
