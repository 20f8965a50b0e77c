use super::SeaOrmStorage;
use crate::entity::study_materials::{ActiveModel, Column, Entity as StudyMaterials};
use crate::errors::{LearnHubError, Result};
use crate::models::materials::entities::{MaterialStatus, MaterialType, StudyMaterial};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
    sea_query::Expr,
};

impl SeaOrmStorage {
    /// 写入或覆盖一份资料；content 为 None 时清空旧内容
    pub async fn upsert_material_impl(
        &self,
        course_id: i64,
        material_type: MaterialType,
        chapter_index: i32,
        status: MaterialStatus,
        content: Option<serde_json::Value>,
    ) -> Result<StudyMaterial> {
        let now = chrono::Utc::now().timestamp();
        let raw = content.as_ref().map(serde_json::to_string).transpose()?;

        let existing = StudyMaterials::find()
            .filter(Column::CourseId.eq(course_id))
            .filter(Column::MaterialType.eq(material_type.to_string()))
            .filter(Column::ChapterIndex.eq(chapter_index))
            .one(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询学习资料失败: {e}")))?;

        let result = match existing {
            Some(model) => {
                let mut active: ActiveModel = model.into();
                active.content = Set(raw);
                active.status = Set(status.to_string());
                active.updated_at = Set(now);
                active.update(&self.db).await.map_err(|e| {
                    LearnHubError::database_operation(format!("更新学习资料失败: {e}"))
                })?
            }
            None => ActiveModel {
                course_id: Set(course_id),
                material_type: Set(material_type.to_string()),
                chapter_index: Set(chapter_index),
                content: Set(raw),
                status: Set(status.to_string()),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("创建学习资料失败: {e}")))?,
        };

        Ok(result.into_material())
    }

    /// 将资料置为 generating 并清空旧内容
    ///
    /// 已处于 generating 时返回 None，保证同一份资料同时只有一个生成任务
    pub async fn claim_material_impl(
        &self,
        course_id: i64,
        material_type: MaterialType,
        chapter_index: i32,
    ) -> Result<Option<StudyMaterial>> {
        let now = chrono::Utc::now().timestamp();
        let generating = MaterialStatus::Generating.to_string();

        let result = StudyMaterials::update_many()
            .col_expr(Column::Content, Expr::value(Option::<String>::None))
            .col_expr(Column::Status, Expr::value(generating.clone()))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::CourseId.eq(course_id))
            .filter(Column::MaterialType.eq(material_type.to_string()))
            .filter(Column::ChapterIndex.eq(chapter_index))
            .filter(Column::Status.ne(generating.clone()))
            .exec(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("更新学习资料失败: {e}")))?;

        if result.rows_affected > 0 {
            return self
                .get_material_impl(course_id, material_type, chapter_index)
                .await;
        }

        if self
            .get_material_impl(course_id, material_type, chapter_index)
            .await?
            .is_some()
        {
            return Ok(None);
        }

        let inserted = ActiveModel {
            course_id: Set(course_id),
            material_type: Set(material_type.to_string()),
            chapter_index: Set(chapter_index),
            content: Set(None),
            status: Set(generating),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await;

        match inserted {
            Ok(model) => Ok(Some(model.into_material())),
            // 唯一索引冲突说明另一个请求刚刚插入了同一份资料
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(None)
            }
            Err(e) => Err(LearnHubError::database_operation(format!(
                "创建学习资料失败: {e}"
            ))),
        }
    }

    pub async fn get_material_impl(
        &self,
        course_id: i64,
        material_type: MaterialType,
        chapter_index: i32,
    ) -> Result<Option<StudyMaterial>> {
        let result = StudyMaterials::find()
            .filter(Column::CourseId.eq(course_id))
            .filter(Column::MaterialType.eq(material_type.to_string()))
            .filter(Column::ChapterIndex.eq(chapter_index))
            .one(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询学习资料失败: {e}")))?;

        Ok(result.map(|m| m.into_material()))
    }

    /// 按章节顺序列出课程资料
    pub async fn list_materials_impl(
        &self,
        course_id: i64,
        material_type: Option<MaterialType>,
    ) -> Result<Vec<StudyMaterial>> {
        let mut select = StudyMaterials::find().filter(Column::CourseId.eq(course_id));

        if let Some(material_type) = material_type {
            select = select.filter(Column::MaterialType.eq(material_type.to_string()));
        }

        let materials = select
            .order_by_asc(Column::ChapterIndex)
            .order_by_asc(Column::MaterialType)
            .all(&self.db)
            .await
            .map_err(|e| LearnHubError::database_operation(format!("查询学习资料失败: {e}")))?;

        Ok(materials.into_iter().map(|m| m.into_material()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{seed_course, storage_with_user};
    use super::*;

    #[tokio::test]
    async fn test_claim_material_once_while_generating() {
        let (storage, user) = storage_with_user(0).await;
        let course = seed_course(&storage, user.id, 0).await;

        let first = storage
            .claim_material_impl(course.id, MaterialType::Quiz, 0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.status, MaterialStatus::Generating);

        let second = storage
            .claim_material_impl(course.id, MaterialType::Quiz, 0)
            .await
            .unwrap();
        assert!(second.is_none());

        // 其他章节不受影响
        assert!(
            storage
                .claim_material_impl(course.id, MaterialType::Quiz, 1)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_claim_material_after_finished_clears_content() {
        let (storage, user) = storage_with_user(0).await;
        let course = seed_course(&storage, user.id, 0).await;
        storage
            .upsert_material_impl(
                course.id,
                MaterialType::Notes,
                2,
                MaterialStatus::Ready,
                Some(serde_json::json!({"sections": []})),
            )
            .await
            .unwrap();

        let claimed = storage
            .claim_material_impl(course.id, MaterialType::Notes, 2)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.status, MaterialStatus::Generating);
        assert!(claimed.content.is_none());

        let all = storage.list_materials_impl(course.id, None).await.unwrap();
        assert_eq!(all.len(), 1);
    }
}
