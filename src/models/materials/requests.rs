use super::entities::MaterialType;
use serde::Deserialize;
use ts_rs::TS;

// 生成单份学习资料
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/material.ts")]
pub struct GenerateMaterialRequest {
    pub material_type: MaterialType,
    pub chapter_index: i32,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/material.ts")]
pub struct MaterialListParams {
    pub material_type: Option<MaterialType>,
}
