//! Conversation history database operations
//!
//! Handles all database interactions for conversation history and
//! per-agent usage stats.

use crate::chat::models::{now_rfc3339, AgentStats, Conversation, NewConversation};
use crate::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

/// Database connection pool for conversation history
pub struct HistoryDb {
    pool: SqlitePool,
}

impl HistoryDb {
    /// Initialize database connection pool
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    ///
    /// # Returns
    /// * `Ok(HistoryDb)` if successful
    /// * `Err(AppError)` if connection failed
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        // Ensure parent directory exists
        if let Some(parent) = PathBuf::from(db_path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to create db directory: {}", e))
            })?;
        }

        // SQLite connection string format: sqlite://path/to/db.db
        let connection_string = if db_path.starts_with("sqlite:") {
            db_path.to_string()
        } else {
            format!("sqlite:{}", db_path)
        };

        let options = SqliteConnectOptions::from_str(&connection_string)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid database path: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to connect to database: {}", e))
            })?;

        info!("Connected to SQLite database at: {}", db_path);

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations...");

        // Read migration file
        let migration_sql = include_str!("../../migrations/001_create_history.sql");

        // Remove comments (lines starting with --) and normalize whitespace
        let mut cleaned_sql = String::new();
        for line in migration_sql.lines() {
            let trimmed = line.trim();
            // Skip empty lines and comment-only lines
            if trimmed.is_empty() || trimmed.starts_with("--") {
                continue;
            }
            // Remove inline comments (everything after --)
            let without_comments = if let Some(comment_pos) = trimmed.find("--") {
                &trimmed[..comment_pos]
            } else {
                trimmed
            };
            cleaned_sql.push_str(without_comments.trim());
            cleaned_sql.push(' ');
        }

        // Split by semicolon and filter out empty statements
        let statements: Vec<&str> = cleaned_sql
            .split(';')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();

        // Execute each statement separately
        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::Internal(anyhow::anyhow!(
                        "Migration failed: {} - Statement: {}",
                        e,
                        statement.chars().take(100).collect::<String>()
                    ))
                })?;
        }

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Record a completed chat exchange and bump the agent's usage counters
    pub async fn record_conversation(&self, exchange: &NewConversation) -> Result<(), AppError> {
        let created_at = now_rfc3339();

        sqlx::query(
            "INSERT INTO conversations (agent_id, user_message, agent_response, user_timestamp, agent_timestamp, usage_data, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&exchange.agent_id)
        .bind(&exchange.user_message)
        .bind(&exchange.agent_response)
        .bind(&exchange.user_timestamp)
        .bind(&exchange.agent_timestamp)
        .bind(exchange.usage_json())
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to record conversation: {}", e)))?;

        sqlx::query(
            "INSERT INTO agent_stats (agent_id, total_conversations, total_tokens_used, last_used, created_at, updated_at) \
             VALUES (?, 1, ?, ?, ?, ?) \
             ON CONFLICT(agent_id) DO UPDATE SET \
                 total_conversations = total_conversations + 1, \
                 total_tokens_used = total_tokens_used + excluded.total_tokens_used, \
                 last_used = excluded.last_used, \
                 updated_at = excluded.updated_at",
        )
        .bind(&exchange.agent_id)
        .bind(exchange.total_tokens())
        .bind(&exchange.agent_timestamp)
        .bind(&created_at)
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to update agent stats: {}", e)))?;

        debug!("Recorded conversation for agent {}", exchange.agent_id);
        Ok(())
    }

    /// Get an agent's recent conversations, newest first
    pub async fn history(&self, agent_id: &str, limit: i64) -> Result<Vec<Conversation>, AppError> {
        let conversations = sqlx::query_as::<_, Conversation>(
            "SELECT id, agent_id, user_message, agent_response, user_timestamp, agent_timestamp, usage_data, created_at \
             FROM conversations WHERE agent_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(agent_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to fetch history: {}", e)))?;

        Ok(conversations)
    }

    /// Get an agent's usage counters, if it has any recorded exchanges
    pub async fn agent_stats(&self, agent_id: &str) -> Result<Option<AgentStats>, AppError> {
        let stats = sqlx::query_as::<_, AgentStats>(
            "SELECT agent_id, total_conversations, total_tokens_used, last_used, created_at, updated_at \
             FROM agent_stats WHERE agent_id = ?",
        )
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to fetch agent stats: {}", e)))?;

        Ok(stats)
    }

    /// Count all stored conversations across every agent
    pub async fn total_conversations(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM conversations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to count conversations: {}", e))
            })?;

        Ok(count)
    }

    /// Delete conversations older than the given number of days
    ///
    /// Usage counters in `agent_stats` are cumulative and are not touched.
    /// Returns the number of rows removed.
    pub async fn prune_older_than(&self, days: u32) -> Result<u64, AppError> {
        let cutoff = (chrono::Utc::now() - chrono::Duration::days(i64::from(days)))
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let result = sqlx::query("DELETE FROM conversations WHERE created_at < ?")
            .bind(&cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to prune conversations: {}", e))
            })?;

        let removed = result.rows_affected();
        if removed > 0 {
            info!("Pruned {} conversations older than {} days", removed, days);
        }
        Ok(removed)
    }

    /// Get the database pool (for advanced operations if needed)
    #[allow(dead_code)]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::TokenUsage;
    use tempfile::TempDir;

    async fn test_db(dir: &TempDir) -> HistoryDb {
        let path = dir.path().join("history.db");
        HistoryDb::new(path.to_str().unwrap()).await.unwrap()
    }

    fn exchange(agent_id: &str, message: &str, usage: Option<TokenUsage>) -> NewConversation {
        NewConversation {
            agent_id: agent_id.to_string(),
            user_message: message.to_string(),
            agent_response: format!("reply to {}", message),
            user_timestamp: now_rfc3339(),
            agent_timestamp: now_rfc3339(),
            usage,
        }
    }

    fn usage(total: u32) -> TokenUsage {
        TokenUsage {
            prompt_tokens: total / 2,
            completion_tokens: total - total / 2,
            total_tokens: total,
        }
    }

    #[tokio::test]
    async fn test_record_and_fetch_history() {
        let dir = TempDir::new().unwrap();
        let db = test_db(&dir).await;

        db.record_conversation(&exchange("agent-1", "first", Some(usage(10))))
            .await
            .unwrap();
        db.record_conversation(&exchange("agent-1", "second", None))
            .await
            .unwrap();
        db.record_conversation(&exchange("agent-2", "other", None))
            .await
            .unwrap();

        let rows = db.history("agent-1", 50).await.unwrap();
        assert_eq!(rows.len(), 2);
        // Newest first
        assert_eq!(rows[0].user_message, "second");
        assert_eq!(rows[1].user_message, "first");
        assert_eq!(rows[1].usage().unwrap().total_tokens, 10);
        assert!(rows[0].usage().is_none());

        let limited = db.history("agent-1", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].user_message, "second");

        assert!(db.history("missing", 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats_accumulate_across_exchanges() {
        let dir = TempDir::new().unwrap();
        let db = test_db(&dir).await;

        let first = exchange("agent-1", "first", Some(usage(15)));
        let second = exchange("agent-1", "second", None);
        db.record_conversation(&first).await.unwrap();
        db.record_conversation(&second).await.unwrap();

        let stats = db.agent_stats("agent-1").await.unwrap().unwrap();
        assert_eq!(stats.total_conversations, 2);
        assert_eq!(stats.total_tokens_used, 15);
        assert_eq!(stats.last_used.as_deref(), Some(second.agent_timestamp.as_str()));
    }

    #[tokio::test]
    async fn test_stats_missing_agent() {
        let dir = TempDir::new().unwrap();
        let db = test_db(&dir).await;

        assert!(db.agent_stats("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_total_conversations() {
        let dir = TempDir::new().unwrap();
        let db = test_db(&dir).await;

        assert_eq!(db.total_conversations().await.unwrap(), 0);

        db.record_conversation(&exchange("agent-1", "first", None))
            .await
            .unwrap();
        db.record_conversation(&exchange("agent-2", "second", None))
            .await
            .unwrap();

        assert_eq!(db.total_conversations().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_prune_removes_only_old_rows() {
        let dir = TempDir::new().unwrap();
        let db = test_db(&dir).await;

        db.record_conversation(&exchange("agent-1", "recent", None))
            .await
            .unwrap();

        // Backdate one row past the retention window
        sqlx::query(
            "INSERT INTO conversations (agent_id, user_message, agent_response, user_timestamp, agent_timestamp, usage_data, created_at) VALUES (?, ?, ?, ?, ?, NULL, ?)"
        )
        .bind("agent-1")
        .bind("ancient")
        .bind("reply")
        .bind("2020-01-01T00:00:00.000Z")
        .bind("2020-01-01T00:00:01.000Z")
        .bind("2020-01-01T00:00:01.000Z")
        .execute(db.pool())
        .await
        .unwrap();

        let removed = db.prune_older_than(30).await.unwrap();
        assert_eq!(removed, 1);

        let rows = db.history("agent-1", 50).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_message, "recent");
    }
}
