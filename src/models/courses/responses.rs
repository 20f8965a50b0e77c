use super::entities::Course;
use crate::models::materials::entities::StudyMaterial;
use crate::models::progress::entities::Progress;
use serde::Serialize;
use ts_rs::TS;

// 课程详情：课程本身、已生成资料与当前用户进度
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/course.ts")]
pub struct CourseDetailResponse {
    pub course: Course,
    pub materials: Vec<StudyMaterial>,
    pub progress: Option<Progress>,
}

// 课程创建或重新生成后的受理结果
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/course.ts")]
pub struct CourseAcceptedResponse {
    pub course: Course,
    pub credits_remaining: i64,
}
