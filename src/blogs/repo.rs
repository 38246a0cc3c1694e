use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Blog {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Blog row joined with the public fields of its author.
#[derive(Debug, Clone, FromRow)]
pub struct BlogWithAuthor {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub author_id: i64,
    pub author_email: String,
    pub author_name: String,
    pub author_role: String,
}

impl Blog {
    /// List a page of blogs, newest first.
    pub async fn list(
        db: &SqlitePool,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<BlogWithAuthor>> {
        let rows = sqlx::query_as::<_, BlogWithAuthor>(
            r#"
            SELECT b.id, b.title, b.content, b.created_at, b.updated_at,
                   u.id AS author_id, u.email AS author_email,
                   u.name AS author_name, u.role AS author_role
            FROM blogs b
            JOIN users u ON u.id = b.author_id
            ORDER BY b.created_at DESC, b.id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn count(db: &SqlitePool) -> anyhow::Result<i64> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM blogs")
            .fetch_one(db)
            .await?;
        Ok(total)
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> anyhow::Result<Option<BlogWithAuthor>> {
        let row = sqlx::query_as::<_, BlogWithAuthor>(
            r#"
            SELECT b.id, b.title, b.content, b.created_at, b.updated_at,
                   u.id AS author_id, u.email AS author_email,
                   u.name AS author_name, u.role AS author_role
            FROM blogs b
            JOIN users u ON u.id = b.author_id
            WHERE b.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Create a blog owned by `author_id`.
    pub async fn create(
        db: &SqlitePool,
        author_id: i64,
        title: &str,
        content: &str,
    ) -> anyhow::Result<Blog> {
        let now = OffsetDateTime::now_utc();
        let blog = sqlx::query_as::<_, Blog>(
            r#"
            INSERT INTO blogs (title, content, author_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, title, content, author_id, created_at, updated_at
            "#,
        )
        .bind(title)
        .bind(content)
        .bind(author_id)
        .bind(now)
        .bind(now)
        .fetch_one(db)
        .await?;
        Ok(blog)
    }

    /// Author id of a blog, for ownership checks inside a transaction.
    pub async fn author_of(
        tx: &mut Transaction<'_, Sqlite>,
        id: i64,
    ) -> anyhow::Result<Option<i64>> {
        let author_id =
            sqlx::query_scalar::<_, i64>("SELECT author_id FROM blogs WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?;
        Ok(author_id)
    }

    /// Replace title and content; created_at and author are immutable.
    pub async fn update_content(
        tx: &mut Transaction<'_, Sqlite>,
        id: i64,
        title: &str,
        content: &str,
    ) -> anyhow::Result<()> {
        let now = OffsetDateTime::now_utc();
        sqlx::query("UPDATE blogs SET title = ?, content = ?, updated_at = ? WHERE id = ?")
            .bind(title)
            .bind(content)
            .bind(now)
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn delete(tx: &mut Transaction<'_, Sqlite>, id: i64) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM blogs WHERE id = ?")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
