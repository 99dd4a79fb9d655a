use anyhow::{Context as _, Result};
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    ConnectOptions, SqlitePool,
};
use std::{path::Path, str::FromStr, time::Duration};
use uuid::Uuid;

use crate::progression::{self, Progress};
use crate::records::ActivityRecord;

/// Default timeout for individual SQLite queries.
/// Prevents hung queries from blocking the service indefinitely.
const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Pool defaults; both are overridable through `[storage]` config.
const DEFAULT_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30;

/// Execute a future with the standard query timeout.
async fn with_timeout<T>(fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "database query timed out after {}s",
            QUERY_TIMEOUT.as_secs()
        )),
    }
}

// ─── Rows ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub major: String,
    pub level: i64,
    pub exp: i64,
    pub max_exp: i64,
    pub character_title: String,
    pub created_at: String,
    pub updated_at: String,
}

impl UserRow {
    pub fn progress(&self) -> Progress {
        Progress {
            level: self.level,
            exp: self.exp,
            max_exp: self.max_exp,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecordRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub category: String,
    pub date: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    /// JSON array of strings, e.g. `["rust","teamwork"]`.
    pub tags: String,
    pub year: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl RecordRow {
    /// Convert to the domain shape consumed by the aggregation engine and
    /// the AI gateway. Unparseable tag blobs degrade to an empty list.
    pub fn into_activity(self) -> ActivityRecord {
        let tags = serde_json::from_str(&self.tags).unwrap_or_default();
        ActivityRecord {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            category: self.category,
            date: self.date,
            description: self.description,
            content: self.content,
            tags,
            year: self.year,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommunityRow {
    pub id: String,
    pub name: String,
    pub major: String,
    pub level: i64,
    pub job: String,
    /// JSON array of strings.
    pub tags: String,
    pub role: String,
    pub created_at: String,
}

impl CommunityRow {
    pub fn tags_vec(&self) -> Vec<String> {
        serde_json::from_str(&self.tags).unwrap_or_default()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResumeBaseRow {
    pub id: String,
    pub user_id: String,
    pub category: String,
    pub title: String,
    pub content: String,
    /// JSON array of strings.
    pub keywords: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ResumeBaseRow {
    pub fn keywords_vec(&self) -> Vec<String> {
        serde_json::from_str(&self.keywords).unwrap_or_default()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompanyRow {
    pub id: String,
    pub name: String,
    pub year: Option<String>,
    pub half: Option<String>,
    /// JSON object with arbitrary structured metadata.
    pub metadata: String,
    pub created_at: String,
    pub updated_at: String,
}

impl CompanyRow {
    pub fn metadata_value(&self) -> serde_json::Value {
        serde_json::from_str(&self.metadata).unwrap_or(serde_json::Value::Null)
    }
}

// ─── Progression write results ───────────────────────────────────────────────

/// Persisted outcome of one EXP award.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExpAward {
    pub previous_level: i64,
    pub level: i64,
    pub exp: i64,
    pub max_exp: i64,
    pub leveled_up: bool,
    pub levels_gained: i64,
    pub remaining_exp: i64,
}

/// Result of the guarded progression update.
#[derive(Debug)]
pub enum ExpAwardResult {
    Applied(ExpAward),
    UserMissing,
    /// The guard `WHERE level = ? AND exp = ?` matched nothing — another
    /// writer got there first. The transaction is rolled back.
    Conflict,
}

/// Result of the atomic record-insert + EXP-award transaction.
#[derive(Debug)]
pub enum RecordCreation {
    Created { record: RecordRow, exp: ExpAward },
    UserMissing,
    Conflict,
}

// ─── Storage ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        Self::new_with_options(
            data_dir,
            DEFAULT_MAX_CONNECTIONS,
            DEFAULT_IDLE_TIMEOUT_SECS,
            0,
        )
        .await
    }

    /// Create storage with an explicit pool bound, idle-connection
    /// reclamation timeout, and optional slow-query logging.
    ///
    /// `slow_query_ms` is the threshold in milliseconds — queries exceeding
    /// it are logged at WARN level. Set to 0 to disable.
    pub async fn new_with_options(
        data_dir: &Path,
        max_connections: u32,
        idle_timeout_secs: u64,
        slow_query_ms: u64,
    ) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("campusd.db");
        let mut opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .create_if_missing(true);

        if slow_query_ms > 0 {
            opts = opts.log_slow_statements(
                log::LevelFilter::Warn,
                Duration::from_millis(slow_query_ms),
            );
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(Duration::from_secs(idle_timeout_secs))
            .connect_with(opts)
            .await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        sqlx::migrate!("src/storage/migrations")
            .run(pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// `true` when a trivial query succeeds — used by the health endpoint.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    // ─── Users ───────────────────────────────────────────────────────────────

    pub async fn create_user(
        &self,
        name: &str,
        major: &str,
        character_title: &str,
    ) -> Result<UserRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (id, name, major, level, exp, max_exp, character_title, created_at, updated_at)
             VALUES (?, ?, ?, 1, 0, 1000, ?, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(major)
        .bind(character_title)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        self.get_user(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user not found after insert"))
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<UserRow>> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Partial profile update. `None` fields keep their current value.
    /// Returns `None` when the user does not exist.
    pub async fn update_user_profile(
        &self,
        id: &str,
        name: Option<&str>,
        major: Option<&str>,
        character_title: Option<&str>,
    ) -> Result<Option<UserRow>> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE users SET
               name = COALESCE(?, name),
               major = COALESCE(?, major),
               character_title = COALESCE(?, character_title),
               updated_at = ?
             WHERE id = ?",
        )
        .bind(name)
        .bind(major)
        .bind(character_title)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_user(id).await
    }

    /// Apply an EXP award atomically.
    ///
    /// The read-modify-write runs in one transaction, and the UPDATE is
    /// guarded on the level/exp values that were read. A concurrent award
    /// that slipped in between makes the guard match nothing; the
    /// transaction rolls back and `Conflict` is returned instead of a lost
    /// update.
    pub async fn award_user_exp(&self, user_id: &str, amount: i64) -> Result<ExpAwardResult> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(i64, i64, i64)> =
            sqlx::query_as("SELECT level, exp, max_exp FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((level, exp, max_exp)) = row else {
            return Ok(ExpAwardResult::UserMissing);
        };

        let current = Progress { level, exp, max_exp };
        let outcome = progression::award_experience(current, amount)
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE users SET level = ?, exp = ?, max_exp = ?, updated_at = ?
             WHERE id = ? AND level = ? AND exp = ?",
        )
        .bind(outcome.progress.level)
        .bind(outcome.progress.exp)
        .bind(outcome.progress.max_exp)
        .bind(&now)
        .bind(user_id)
        .bind(level)
        .bind(exp)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(ExpAwardResult::Conflict);
        }
        tx.commit().await?;

        Ok(ExpAwardResult::Applied(ExpAward {
            previous_level: level,
            level: outcome.progress.level,
            exp: outcome.progress.exp,
            max_exp: outcome.progress.max_exp,
            leveled_up: outcome.leveled_up,
            levels_gained: outcome.levels_gained,
            remaining_exp: outcome.progress.max_exp - outcome.progress.exp,
        }))
    }

    // ─── Records ─────────────────────────────────────────────────────────────

    /// Insert a record and award the creation EXP in one transaction.
    /// Prefer this over separate insert + award calls — a reader must never
    /// observe the record without the EXP delta.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_record_and_award_exp(
        &self,
        user_id: &str,
        title: &str,
        category: &str,
        date: Option<&str>,
        description: Option<&str>,
        content: Option<&str>,
        tags_json: &str,
        year: &str,
        status: &str,
    ) -> Result<RecordCreation> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(i64, i64, i64)> =
            sqlx::query_as("SELECT level, exp, max_exp FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((level, exp, max_exp)) = row else {
            return Ok(RecordCreation::UserMissing);
        };

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO records
             (id, user_id, title, category, date, description, content, tags, year, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(title)
        .bind(category)
        .bind(date)
        .bind(description)
        .bind(content)
        .bind(tags_json)
        .bind(year)
        .bind(status)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let current = Progress { level, exp, max_exp };
        let outcome = progression::award_experience(current, progression::RECORD_CREATION_EXP)
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        let result = sqlx::query(
            "UPDATE users SET level = ?, exp = ?, max_exp = ?, updated_at = ?
             WHERE id = ? AND level = ? AND exp = ?",
        )
        .bind(outcome.progress.level)
        .bind(outcome.progress.exp)
        .bind(outcome.progress.max_exp)
        .bind(&now)
        .bind(user_id)
        .bind(level)
        .bind(exp)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(RecordCreation::Conflict);
        }
        tx.commit().await?;

        let record = self
            .get_record(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("record not found after insert"))?;
        Ok(RecordCreation::Created {
            record,
            exp: ExpAward {
                previous_level: level,
                level: outcome.progress.level,
                exp: outcome.progress.exp,
                max_exp: outcome.progress.max_exp,
                leveled_up: outcome.leveled_up,
                levels_gained: outcome.levels_gained,
                remaining_exp: outcome.progress.max_exp - outcome.progress.exp,
            },
        })
    }

    pub async fn get_record(&self, id: &str) -> Result<Option<RecordRow>> {
        Ok(sqlx::query_as("SELECT * FROM records WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// All records for a user, newest insert first. Facet filtering and
    /// pagination happen in the aggregation layer.
    pub async fn list_user_records(&self, user_id: &str) -> Result<Vec<RecordRow>> {
        with_timeout(async {
            Ok(sqlx::query_as(
                "SELECT * FROM records WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
        })
        .await
    }

    /// Records ordered by activity date, most recent first, dateless rows
    /// last. This is the ordering the AI gateway feeds the provider.
    pub async fn list_user_records_by_date(&self, user_id: &str) -> Result<Vec<RecordRow>> {
        with_timeout(async {
            Ok(sqlx::query_as(
                "SELECT * FROM records WHERE user_id = ?
                 ORDER BY date IS NULL, date DESC, created_at DESC",
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
        })
        .await
    }

    pub async fn count_user_records(&self, user_id: &str) -> Result<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM records WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 as u64)
    }

    /// Partial record update. When `date` changes the derived `year` must
    /// be passed alongside it. Returns `None` when the record is missing.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_record(
        &self,
        id: &str,
        title: Option<&str>,
        category: Option<&str>,
        date: Option<&str>,
        year: Option<&str>,
        description: Option<&str>,
        content: Option<&str>,
        tags_json: Option<&str>,
        status: Option<&str>,
    ) -> Result<Option<RecordRow>> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE records SET
               title = COALESCE(?, title),
               category = COALESCE(?, category),
               date = COALESCE(?, date),
               year = COALESCE(?, year),
               description = COALESCE(?, description),
               content = COALESCE(?, content),
               tags = COALESCE(?, tags),
               status = COALESCE(?, status),
               updated_at = ?
             WHERE id = ?",
        )
        .bind(title)
        .bind(category)
        .bind(date)
        .bind(year)
        .bind(description)
        .bind(content)
        .bind(tags_json)
        .bind(status)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_record(id).await
    }

    /// Delete a record. Records are only ever deleted by explicit request.
    pub async fn delete_record(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM records WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ─── Community ───────────────────────────────────────────────────────────

    /// Directory listing, highest level first. `role` and `tag` narrow the
    /// result; a NULL parameter is a wildcard. Tag matching looks for the
    /// JSON-encoded string inside the tags array.
    pub async fn list_community(
        &self,
        role: Option<&str>,
        tag: Option<&str>,
        limit: i64,
    ) -> Result<Vec<CommunityRow>> {
        with_timeout(async {
            Ok(sqlx::query_as(
                "SELECT * FROM community
                 WHERE (?1 IS NULL OR role = ?1)
                   AND (?2 IS NULL OR tags LIKE '%\"' || ?2 || '\"%')
                 ORDER BY level DESC, created_at DESC
                 LIMIT ?3",
            )
            .bind(role)
            .bind(tag)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
        })
        .await
    }

    pub async fn create_community_member(
        &self,
        name: &str,
        major: &str,
        level: i64,
        job: &str,
        tags_json: &str,
        role: &str,
    ) -> Result<CommunityRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO community (id, name, major, level, job, tags, role, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(major)
        .bind(level)
        .bind(job)
        .bind(tags_json)
        .bind(role)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(sqlx::query_as("SELECT * FROM community WHERE id = ?")
            .bind(&id)
            .fetch_one(&self.pool)
            .await?)
    }

    // ─── Resume base ─────────────────────────────────────────────────────────

    pub async fn list_resume_base(
        &self,
        user_id: &str,
        category: Option<&str>,
    ) -> Result<Vec<ResumeBaseRow>> {
        if let Some(cat) = category {
            Ok(sqlx::query_as(
                "SELECT * FROM resume_base WHERE user_id = ? AND category = ?
                 ORDER BY updated_at DESC",
            )
            .bind(user_id)
            .bind(cat)
            .fetch_all(&self.pool)
            .await?)
        } else {
            Ok(sqlx::query_as(
                "SELECT * FROM resume_base WHERE user_id = ? ORDER BY updated_at DESC",
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
        }
    }

    /// At most one snippet per (user, category): inserts create, repeats
    /// overwrite in place.
    pub async fn upsert_resume_base(
        &self,
        user_id: &str,
        category: &str,
        title: &str,
        content: &str,
        keywords_json: &str,
    ) -> Result<ResumeBaseRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO resume_base (id, user_id, category, title, content, keywords, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id, category) DO UPDATE SET
               title = excluded.title,
               content = excluded.content,
               keywords = excluded.keywords,
               updated_at = excluded.updated_at",
        )
        .bind(&id)
        .bind(user_id)
        .bind(category)
        .bind(title)
        .bind(content)
        .bind(keywords_json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        // Fetch by (user_id, category) in case the ON CONFLICT branch ran.
        Ok(sqlx::query_as(
            "SELECT * FROM resume_base WHERE user_id = ? AND category = ?",
        )
        .bind(user_id)
        .bind(category)
        .fetch_one(&self.pool)
        .await?)
    }

    // ─── Companies ───────────────────────────────────────────────────────────

    /// Company listing with optional year/half facets and a free-text
    /// query over name + metadata.
    pub async fn list_companies(
        &self,
        year: Option<&str>,
        half: Option<&str>,
        q: Option<&str>,
    ) -> Result<Vec<CompanyRow>> {
        with_timeout(async {
            Ok(sqlx::query_as(
                "SELECT * FROM company_profiles
                 WHERE (?1 IS NULL OR year = ?1)
                   AND (?2 IS NULL OR half = ?2)
                   AND (?3 IS NULL OR name LIKE '%' || ?3 || '%' OR metadata LIKE '%' || ?3 || '%')
                 ORDER BY created_at DESC
                 LIMIT 200",
            )
            .bind(year)
            .bind(half)
            .bind(q)
            .fetch_all(&self.pool)
            .await?)
        })
        .await
    }

    pub async fn get_company(&self, id: &str) -> Result<Option<CompanyRow>> {
        Ok(sqlx::query_as("SELECT * FROM company_profiles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn create_company(
        &self,
        name: &str,
        year: Option<&str>,
        half: Option<&str>,
        metadata_json: &str,
    ) -> Result<CompanyRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO company_profiles (id, name, year, half, metadata, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(year)
        .bind(half)
        .bind(metadata_json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        self.get_company(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("company not found after insert"))
    }

    pub async fn update_company(
        &self,
        id: &str,
        name: Option<&str>,
        year: Option<&str>,
        half: Option<&str>,
        metadata_json: Option<&str>,
    ) -> Result<Option<CompanyRow>> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE company_profiles SET
               name = COALESCE(?, name),
               year = COALESCE(?, year),
               half = COALESCE(?, half),
               metadata = COALESCE(?, metadata),
               updated_at = ?
             WHERE id = ?",
        )
        .bind(name)
        .bind(year)
        .bind(half)
        .bind(metadata_json)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_company(id).await
    }

    pub async fn delete_company(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM company_profiles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
