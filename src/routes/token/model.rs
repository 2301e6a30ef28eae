use serde::{Deserialize, Serialize};

use crate::token::{Credentials, LogoutOutcome};

#[derive(Debug, Deserialize)]
pub struct GenerateQuery {
    pub count: usize,
}

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub username: String,
    pub password: String,
}

impl From<GenerateRequest> for Credentials {
    fn from(req: GenerateRequest) -> Self {
        Credentials::new(req.username, req.password)
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    /// 已入队的签发任务数，签发结果异步可见
    pub accepted: usize,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub id: i64,
    #[serde(flatten)]
    pub outcome: LogoutOutcome,
}
