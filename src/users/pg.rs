use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::Date;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::model::{NewUser, User, UserFilter};
use super::store::{BulkInsertOutcome, StoreError, UniquenessPolicy, UserStore};

const USER_COLUMNS: &str = "id, name, email, phone, birth_date, created_at, updated_at";

/// Postgres-backed user store.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Creates the `users` table and its indexes if missing. Unique indexes on
    /// `email` and `phone` are only created under `Enforced`; `Relaxed` never
    /// drops indexes that already exist.
    pub async fn ensure_schema(&self, policy: UniquenessPolicy) -> Result<(), StoreError> {
        for stmt in schema_statements(policy) {
            sqlx::query(stmt).execute(&self.db).await?;
        }

        if policy == UniquenessPolicy::Relaxed {
            let existing: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM pg_indexes WHERE tablename = 'users' AND indexname::text = ANY($1)",
            )
            .bind(&UNIQUE_INDEXES[..])
            .fetch_one(&self.db)
            .await?;
            if existing > 0 {
                warn!(
                    existing,
                    "relaxed uniqueness requested but unique contact indexes exist; duplicates will still be rejected"
                );
            }
        }

        info!(?policy, "users schema ready");
        Ok(())
    }
}

const UNIQUE_INDEXES: [&str; 2] = ["users_email_key", "users_phone_key"];

fn schema_statements(policy: UniquenessPolicy) -> Vec<&'static str> {
    let mut statements = vec![
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name        TEXT NOT NULL CHECK (name <> ''),
            email       TEXT NOT NULL CHECK (email <> ''),
            phone       TEXT NOT NULL CHECK (phone <> ''),
            birth_date  DATE NOT NULL,
            created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
        "CREATE INDEX IF NOT EXISTS users_name_idx ON users (name)",
    ];
    if policy == UniquenessPolicy::Enforced {
        statements.push("CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users (email)");
        statements.push("CREATE UNIQUE INDEX IF NOT EXISTS users_phone_key ON users (phone)");
    }
    statements
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    let mut sep = " WHERE ";
    if let Some(pattern) = filter.name_pattern() {
        qb.push(sep).push("name ~* ").push_bind(pattern);
        sep = " AND ";
    }
    if let Some(email) = filter.email() {
        qb.push(sep).push("email = ").push_bind(email.to_string());
        sep = " AND ";
    }
    if let Some(phone) = filter.phone() {
        qb.push(sep).push("phone = ").push_bind(phone.to_string());
    }
}

fn to_sql_int(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn exists_any(&self) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users)")
            .fetch_one(&self.db)
            .await?;
        Ok(exists)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find(
        &self,
        filter: &UserFilter,
        skip: u64,
        take: u64,
    ) -> Result<Vec<User>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at, id LIMIT ")
            .push_bind(to_sql_int(take))
            .push(" OFFSET ")
            .push_bind(to_sql_int(skip));

        let rows = qb.build_query_as::<User>().fetch_all(&self.db).await?;
        Ok(rows)
    }

    async fn count(&self, filter: &UserFilter) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_filter(&mut qb, filter);
        let total: i64 = qb.build_query_scalar().fetch_one(&self.db).await?;
        Ok(total.max(0) as u64)
    }

    async fn insert(&self, user: &NewUser) -> Result<User, StoreError> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, phone, birth_date)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.birth_date)
        .fetch_one(&self.db)
        .await?;
        Ok(created)
    }

    async fn insert_many_unordered(
        &self,
        batch: &[NewUser],
    ) -> Result<BulkInsertOutcome, StoreError> {
        if batch.is_empty() {
            return Ok(BulkInsertOutcome::default());
        }

        let mut names = Vec::with_capacity(batch.len());
        let mut emails = Vec::with_capacity(batch.len());
        let mut phones = Vec::with_capacity(batch.len());
        let mut births: Vec<Date> = Vec::with_capacity(batch.len());
        for u in batch {
            names.push(u.name.as_str());
            emails.push(u.email.as_str());
            phones.push(u.phone.as_str());
            births.push(u.birth_date);
        }

        // Conflicting rows are dropped individually; the rest of the batch lands.
        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, phone, birth_date)
            SELECT * FROM UNNEST($1::text[], $2::text[], $3::text[], $4::date[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&names)
        .bind(&emails)
        .bind(&phones)
        .bind(&births)
        .execute(&self.db)
        .await?;

        let inserted = result.rows_affected();
        let skipped = (batch.len() as u64).saturating_sub(inserted);
        debug!(size = batch.len(), inserted, skipped, "bulk insert");
        Ok(BulkInsertOutcome { inserted, skipped })
    }
}
