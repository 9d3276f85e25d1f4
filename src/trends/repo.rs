use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{NewTrendData, TrendData, TrendFilter};

#[async_trait]
pub trait TrendRepository: Send + Sync {
    async fn list_by_user(
        &self,
        user_id: Uuid,
        filter: &TrendFilter,
    ) -> anyhow::Result<Vec<TrendData>>;

    async fn find_by_user_and_id(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> anyhow::Result<Option<TrendData>>;

    async fn create(&self, new: NewTrendData) -> anyhow::Result<TrendData>;

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool>;
}

pub struct PgTrendRepository {
    db: PgPool,
}

impl PgTrendRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TrendRepository for PgTrendRepository {
    async fn list_by_user(
        &self,
        user_id: Uuid,
        filter: &TrendFilter,
    ) -> anyhow::Result<Vec<TrendData>> {
        let rows = sqlx::query_as::<_, TrendData>(
            r#"
            SELECT id, user_id, test_name, start_date, end_date, count, min_value, max_value,
                   average, median, standard_deviation, created_at, updated_at
            FROM trend_data
            WHERE user_id = $1
              AND ($2::text IS NULL OR test_name = $2)
            ORDER BY test_name ASC, end_date DESC
            "#,
        )
        .bind(user_id)
        .bind(&filter.test_name)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_by_user_and_id(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> anyhow::Result<Option<TrendData>> {
        let row = sqlx::query_as::<_, TrendData>(
            r#"
            SELECT id, user_id, test_name, start_date, end_date, count, min_value, max_value,
                   average, median, standard_deviation, created_at, updated_at
            FROM trend_data
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn create(&self, new: NewTrendData) -> anyhow::Result<TrendData> {
        let row = sqlx::query_as::<_, TrendData>(
            r#"
            INSERT INTO trend_data (id, user_id, test_name, start_date, end_date, count,
                                    min_value, max_value, average, median, standard_deviation)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, user_id, test_name, start_date, end_date, count, min_value, max_value,
                      average, median, standard_deviation, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(&new.test_name)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.count)
        .bind(new.min_value)
        .bind(new.max_value)
        .bind(new.average)
        .bind(new.median)
        .bind(new.standard_deviation)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"DELETE FROM trend_data WHERE id = $1 AND user_id = $2"#)
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
