use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::models::materials::requests::{GenerateMaterialRequest, MaterialListParams};
use crate::services::MaterialService;
use crate::utils::SafeCourseIdI64;

static MATERIAL_SERVICE: Lazy<MaterialService> = Lazy::new(MaterialService::new_lazy);

pub async fn list_materials(
    req: HttpRequest,
    course_id: SafeCourseIdI64,
    query: web::Query<MaterialListParams>,
) -> ActixResult<HttpResponse> {
    MATERIAL_SERVICE
        .list_materials(&req, course_id.0, query.into_inner())
        .await
}

pub async fn generate_material(
    req: HttpRequest,
    course_id: SafeCourseIdI64,
    body: web::Json<GenerateMaterialRequest>,
) -> ActixResult<HttpResponse> {
    MATERIAL_SERVICE
        .generate_material(&req, course_id.0, body.into_inner())
        .await
}
