use super::entities::{Badge, Progress};
use serde::Serialize;
use ts_rs::TS;

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/progress.ts")]
pub struct ProgressListResponse {
    pub items: Vec<Progress>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/progress.ts")]
pub struct BadgeListResponse {
    pub items: Vec<Badge>,
}

// 徽章同步结果：本次新授予的徽章与当前持有总数
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/progress.ts")]
pub struct BadgeSyncResponse {
    pub awarded: Vec<Badge>,
    pub total: usize,
}
