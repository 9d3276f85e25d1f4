use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{NewUser, User};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    /// Inserts a user. `None` when the email is already taken.
    async fn create(&self, new: NewUser) -> anyhow::Result<Option<User>>;

    /// Writes the profile fields of `user`. The onboarding flag only ever goes
    /// from false to true, so a stale row cannot clear it.
    async fn update(&self, user: &User) -> anyhow::Result<Option<User>>;

    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<()>;
}

pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, date_of_birth, gender,
                   phone, last_login, onboarding_completed, password_reset_token,
                   password_reset_expires, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, date_of_birth, gender,
                   phone, last_login, onboarding_completed, password_reset_token,
                   password_reset_expires, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new: NewUser) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name,
                               date_of_birth, gender, phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email, password_hash, first_name, last_name, date_of_birth, gender,
                      phone, last_login, onboarding_completed, password_reset_token,
                      password_reset_expires, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(new.date_of_birth)
        .bind(&new.gender)
        .bind(&new.phone)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn update(&self, user: &User) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET first_name = $2,
                   last_name = $3,
                   date_of_birth = $4,
                   gender = $5,
                   phone = $6,
                   onboarding_completed = onboarding_completed OR $7,
                   updated_at = now()
             WHERE id = $1
            RETURNING id, email, password_hash, first_name, last_name, date_of_birth, gender,
                      phone, last_login, onboarding_completed, password_reset_token,
                      password_reset_expires, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.date_of_birth)
        .bind(&user.gender)
        .bind(&user.phone)
        .bind(user.onboarding_completed)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE users SET last_login = $2 WHERE id = $1"#)
            .bind(id)
            .bind(at)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
