use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

use crate::error::{MatchError, MatchResult};
use crate::models::{
    CandidateQuery, Gender, Like, LikeOutcome, MatchedPartner, ResetSummary, UserPreference,
};
use crate::services::store::{pair_lock_key, InterestLedger, PreferenceStore};

/// Errors that can occur while setting up PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
}

impl From<PostgresError> for MatchError {
    fn from(err: PostgresError) -> Self {
        MatchError::Unavailable(err.to_string())
    }
}

#[derive(Debug, FromRow)]
struct PreferenceRow {
    uid: String,
    age: i32,
    gender: String,
    description: String,
    lifestyles: Vec<String>,
    interests: Vec<String>,
    location: String,
    min_budget: f64,
    max_budget: f64,
    completed: bool,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PreferenceRow> for UserPreference {
    type Error = MatchError;

    fn try_from(row: PreferenceRow) -> Result<Self, Self::Error> {
        let gender = row.gender.parse::<Gender>().map_err(|e| {
            MatchError::Unavailable(format!("Corrupt preference row {}: {}", row.uid, e))
        })?;

        Ok(UserPreference {
            uid: row.uid,
            age: row.age,
            gender,
            description: row.description,
            lifestyles: row.lifestyles.into_iter().collect::<BTreeSet<_>>(),
            interests: row.interests.into_iter().collect::<BTreeSet<_>>(),
            location: row.location,
            min_budget: row.min_budget,
            max_budget: row.max_budget,
            completed: row.completed,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct LikeRow {
    liker_uid: String,
    liked_uid: String,
    mutual: bool,
    created_at: DateTime<Utc>,
    matched_at: Option<DateTime<Utc>>,
}

impl From<LikeRow> for Like {
    fn from(row: LikeRow) -> Self {
        Like {
            liker_uid: row.liker_uid,
            liked_uid: row.liked_uid,
            mutual: row.mutual,
            created_at: row.created_at,
            matched_at: row.matched_at,
        }
    }
}

const PREFERENCE_COLUMNS: &str = "uid, age, gender, description, lifestyles, interests, \
     location, min_budget, max_budget, completed, updated_at";

/// Two-key advisory lock class for per-user locks. Pair locks use the
/// single-bigint key space, which never overlaps the two-int4 one.
const USER_LOCK_CLASS: i32 = 1;

/// PostgreSQL-backed preference store and interest ledger
///
/// Locking, all transaction-scoped advisory locks:
/// - pair writes (`record_like`, `delete_pair`) take a shared lock on each
///   user, in uid order, then an exclusive lock on the unordered pair, so
///   opposite likes submitted concurrently are applied one after the other;
/// - `reset_all` takes the exclusive lock on its user, so it never interleaves
///   with a pair write touching that user.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL store from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    async fn lock_users_shared(
        tx: &mut Transaction<'_, Postgres>,
        uid_a: &str,
        uid_b: &str,
    ) -> Result<(), sqlx::Error> {
        let (first, second) = if uid_a <= uid_b { (uid_a, uid_b) } else { (uid_b, uid_a) };
        for uid in [first, second] {
            sqlx::query("SELECT pg_advisory_xact_lock_shared($1, hashtext($2))")
                .bind(USER_LOCK_CLASS)
                .bind(uid)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    async fn lock_user(tx: &mut Transaction<'_, Postgres>, uid: &str) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock($1, hashtext($2))")
            .bind(USER_LOCK_CLASS)
            .bind(uid)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn lock_pair(
        tx: &mut Transaction<'_, Postgres>,
        uid_a: &str,
        uid_b: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(pair_lock_key(uid_a, uid_b))
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for PostgresStore {
    async fn upsert_preference(&self, preference: UserPreference) -> MatchResult<UserPreference> {
        let query = format!(
            r#"
            INSERT INTO user_preferences ({cols})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
            ON CONFLICT (uid)
            DO UPDATE SET
                age = EXCLUDED.age,
                gender = EXCLUDED.gender,
                description = EXCLUDED.description,
                lifestyles = EXCLUDED.lifestyles,
                interests = EXCLUDED.interests,
                location = EXCLUDED.location,
                min_budget = EXCLUDED.min_budget,
                max_budget = EXCLUDED.max_budget,
                completed = EXCLUDED.completed,
                updated_at = EXCLUDED.updated_at
            RETURNING {cols}
            "#,
            cols = PREFERENCE_COLUMNS
        );

        let row: PreferenceRow = sqlx::query_as(&query)
            .bind(&preference.uid)
            .bind(preference.age)
            .bind(preference.gender.as_str())
            .bind(&preference.description)
            .bind(preference.lifestyles.iter().cloned().collect::<Vec<_>>())
            .bind(preference.interests.iter().cloned().collect::<Vec<_>>())
            .bind(&preference.location)
            .bind(preference.min_budget)
            .bind(preference.max_budget)
            .bind(preference.completed)
            .fetch_one(&self.pool)
            .await?;

        tracing::debug!("Upserted preference for {}", preference.uid);

        row.try_into()
    }

    async fn get_preference(&self, uid: &str) -> MatchResult<Option<UserPreference>> {
        let query = format!(
            "SELECT {} FROM user_preferences WHERE uid = $1",
            PREFERENCE_COLUMNS
        );

        let row: Option<PreferenceRow> = sqlx::query_as(&query)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserPreference::try_from).transpose()
    }

    async fn get_preferences(&self, uids: &[String]) -> MatchResult<Vec<UserPreference>> {
        if uids.is_empty() {
            return Ok(vec![]);
        }

        let query = format!(
            "SELECT {} FROM user_preferences WHERE uid = ANY($1)",
            PREFERENCE_COLUMNS
        );

        let rows: Vec<PreferenceRow> = sqlx::query_as(&query)
            .bind(uids)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(UserPreference::try_from).collect()
    }

    async fn delete_preference(&self, uid: &str) -> MatchResult<bool> {
        let result = sqlx::query("DELETE FROM user_preferences WHERE uid = $1")
            .bind(uid)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn query_candidates(&self, query: &CandidateQuery) -> MatchResult<Vec<UserPreference>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM user_preferences
            WHERE completed = TRUE
              AND uid <> $1
              AND NOT (uid = ANY($2))
              AND ($3::TEXT IS NULL OR location = $3)
              AND ($5::FLOAT8 IS NULL OR min_budget <= $5)
              AND ($4::FLOAT8 IS NULL OR max_budget >= $4)
              AND ($6::TEXT IS NULL OR gender = $6)
              AND ($7::INT4 IS NULL OR age >= $7)
              AND ($8::INT4 IS NULL OR age <= $8)
            ORDER BY random()
            LIMIT $9
            "#,
            PREFERENCE_COLUMNS
        );

        let rows: Vec<PreferenceRow> = sqlx::query_as(&sql)
            .bind(&query.requester_uid)
            .bind(&query.exclude_uids)
            .bind(query.location.as_deref())
            .bind(query.budget_range.map(|b| b.min))
            .bind(query.budget_range.map(|b| b.max))
            .bind(query.gender.map(|g| g.as_str()))
            .bind(query.age_range.map(|a| a.min))
            .bind(query.age_range.map(|a| a.max))
            .bind(query.limit as i64)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(
            "Queried {} candidates for {}",
            rows.len(),
            query.requester_uid
        );

        rows.into_iter().map(UserPreference::try_from).collect()
    }

    async fn health_check(&self) -> MatchResult<bool> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl InterestLedger for PostgresStore {
    async fn record_like(&self, liker_uid: &str, liked_uid: &str) -> MatchResult<LikeOutcome> {
        let mut tx = self.pool.begin().await?;
        Self::lock_users_shared(&mut tx, liker_uid, liked_uid).await?;
        Self::lock_pair(&mut tx, liker_uid, liked_uid).await?;

        let existing: Option<bool> =
            sqlx::query_scalar("SELECT mutual FROM likes WHERE liker_uid = $1 AND liked_uid = $2")
                .bind(liker_uid)
                .bind(liked_uid)
                .fetch_optional(&mut *tx)
                .await?;

        if let Some(mutual) = existing {
            tx.commit().await?;
            return Ok(LikeOutcome {
                mutual,
                created: false,
            });
        }

        let reverse: Option<bool> = sqlx::query_scalar(
            "SELECT mutual FROM likes WHERE liker_uid = $1 AND liked_uid = $2 FOR UPDATE",
        )
        .bind(liked_uid)
        .bind(liker_uid)
        .fetch_optional(&mut *tx)
        .await?;

        let mutual = reverse.is_some();

        // NOW() is fixed for the whole transaction, so both rows share matched_at
        sqlx::query(
            r#"
            INSERT INTO likes (liker_uid, liked_uid, mutual, created_at, matched_at)
            VALUES ($1, $2, $3, NOW(), CASE WHEN $3 THEN NOW() END)
            ON CONFLICT (liker_uid, liked_uid) DO NOTHING
            "#,
        )
        .bind(liker_uid)
        .bind(liked_uid)
        .bind(mutual)
        .execute(&mut *tx)
        .await?;

        if mutual {
            sqlx::query(
                "UPDATE likes SET mutual = TRUE, matched_at = NOW() \
                 WHERE liker_uid = $1 AND liked_uid = $2",
            )
            .bind(liked_uid)
            .bind(liker_uid)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            "Recorded like: {} -> {} (mutual: {})",
            liker_uid,
            liked_uid,
            mutual
        );

        Ok(LikeOutcome {
            mutual,
            created: true,
        })
    }

    async fn record_pass(&self, user_uid: &str, passed_uid: &str) -> MatchResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO passes (user_uid, passed_uid, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_uid, passed_uid) DO NOTHING
            "#,
        )
        .bind(user_uid)
        .bind(passed_uid)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_like(&self, liker_uid: &str, liked_uid: &str) -> MatchResult<Option<Like>> {
        let row: Option<LikeRow> = sqlx::query_as(
            r#"
            SELECT liker_uid, liked_uid, mutual, created_at, matched_at
            FROM likes
            WHERE liker_uid = $1 AND liked_uid = $2
            "#,
        )
        .bind(liker_uid)
        .bind(liked_uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Like::from))
    }

    async fn excluded_uids(&self, uid: &str) -> MatchResult<Vec<String>> {
        let query = r#"
            SELECT liked_uid AS target_uid FROM likes WHERE liker_uid = $1
            UNION
            SELECT passed_uid AS target_uid FROM passes WHERE user_uid = $1
        "#;

        let rows = sqlx::query(query).bind(uid).fetch_all(&self.pool).await?;

        let excluded: Vec<String> = rows.iter().map(|row| row.get("target_uid")).collect();

        tracing::debug!("User {} has {} excluded uids", uid, excluded.len());

        Ok(excluded)
    }

    async fn list_mutual(&self, uid: &str) -> MatchResult<Vec<MatchedPartner>> {
        let query = r#"
            SELECT liked_uid, COALESCE(matched_at, created_at) AS matched_at
            FROM likes
            WHERE liker_uid = $1 AND mutual = TRUE
            ORDER BY matched_at DESC
        "#;

        let rows = sqlx::query(query).bind(uid).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| MatchedPartner {
                uid: row.get("liked_uid"),
                matched_at: row.get("matched_at"),
            })
            .collect())
    }

    async fn delete_pair(&self, uid_a: &str, uid_b: &str) -> MatchResult<u64> {
        let mut tx = self.pool.begin().await?;
        Self::lock_users_shared(&mut tx, uid_a, uid_b).await?;
        Self::lock_pair(&mut tx, uid_a, uid_b).await?;

        let result = sqlx::query(
            r#"
            DELETE FROM likes
            WHERE (liker_uid = $1 AND liked_uid = $2)
               OR (liker_uid = $2 AND liked_uid = $1)
            "#,
        )
        .bind(uid_a)
        .bind(uid_b)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(result.rows_affected())
    }

    async fn reset_all(&self, uid: &str) -> MatchResult<ResetSummary> {
        let mut tx = self.pool.begin().await?;
        // Waits for in-flight pair writes involving uid and blocks new ones
        Self::lock_user(&mut tx, uid).await?;

        let likes = sqlx::query("DELETE FROM likes WHERE liker_uid = $1 OR liked_uid = $1")
            .bind(uid)
            .execute(&mut *tx)
            .await?;

        let passes = sqlx::query("DELETE FROM passes WHERE user_uid = $1")
            .bind(uid)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let summary = ResetSummary {
            deleted_matches: likes.rows_affected(),
            deleted_passes: passes.rows_affected(),
        };

        tracing::info!(
            "Reset interests for {}: {} likes, {} passes deleted",
            uid,
            summary.deleted_matches,
            summary.deleted_passes
        );

        Ok(summary)
    }
}
