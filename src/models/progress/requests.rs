use serde::Deserialize;
use ts_rs::TS;

// 更新课程进度：提交完整的已完成章节列表
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/progress.ts")]
pub struct UpdateProgressRequest {
    pub completed_chapters: Vec<i32>,
}
