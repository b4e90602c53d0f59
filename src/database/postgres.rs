use std::time::Duration;

use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use log::{info, warn};
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};

use super::schema::init_db;
use super::{FeedQuery, Store};
use crate::error::{Error, Result};
use crate::models::{Link, NewLink, NewUser, User, UserRecord, Vote};

// Give up on the initial connection after this long
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const LINK_COLUMNS: &str = "id, description, url, created_at, posted_by_id";

pub struct PgStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct VoterRow {
    link_id: i32,
    id: i32,
    name: String,
    email: String,
}

impl PgStore {
    // Connects with exponential backoff, then makes sure the tables exist
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(CONNECT_TIMEOUT),
            ..Default::default()
        };
        let pool = retry(backoff, move || async move {
            PgPoolOptions::new()
                .max_connections(max_connections)
                .connect(url)
                .await
                .map_err(|e| {
                    warn!("Database connection failed: {}. Retrying...", e);
                    backoff::Error::transient(e)
                })
        })
        .await?;
        init_db(&pool).await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        PgStore { pool }
    }
}

// Adds the case-sensitive "description or url contains" condition
fn push_filter(builder: &mut QueryBuilder<'static, Postgres>, filter: Option<&str>) {
    if let Some(filter) = filter {
        builder.push(" WHERE strpos(description, ");
        builder.push_bind(filter.to_owned());
        builder.push(") > 0 OR strpos(url, ");
        builder.push_bind(filter.to_owned());
        builder.push(") > 0");
    }
}

fn list_query(query: &FeedQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {LINK_COLUMNS} FROM links"));
    push_filter(&mut builder, query.filter());

    // Column names come from a closed enum, never from user input
    builder.push(" ORDER BY ");
    for order in &query.order_by {
        builder.push(order.field.column());
        builder.push(" ");
        builder.push(order.direction.sql());
        builder.push(", ");
    }
    builder.push("id ASC");

    if let Some(take) = query.take {
        builder.push(" LIMIT ");
        builder.push_bind(take);
    }
    if let Some(skip) = query.skip {
        builder.push(" OFFSET ");
        builder.push_bind(skip);
    }
    builder
}

fn count_query(filter: Option<&str>) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM links");
    push_filter(&mut builder, filter.filter(|f| !f.is_empty()));
    builder
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error().is_some_and(|e| e.is_unique_violation())
}

fn violated_foreign_key(err: &sqlx::Error) -> Option<String> {
    let db_err = err.as_database_error().filter(|e| e.is_foreign_key_violation())?;
    Some(db_err.constraint().unwrap_or_default().to_string())
}

#[async_trait]
impl Store for PgStore {
    async fn find_link(&self, id: i32) -> Result<Option<Link>> {
        let link = sqlx::query_as(&format!("SELECT {LINK_COLUMNS} FROM links WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(link)
    }

    async fn links_by_ids(&self, ids: &[i32]) -> Result<Vec<Link>> {
        let links = sqlx::query_as(&format!("SELECT {LINK_COLUMNS} FROM links WHERE id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(links)
    }

    async fn list_links(&self, query: &FeedQuery) -> Result<Vec<Link>> {
        let links = list_query(query).build_query_as().fetch_all(&self.pool).await?;
        Ok(links)
    }

    async fn count_links(&self, filter: Option<&str>) -> Result<i64> {
        let (count,): (i64,) = count_query(filter).build_query_as().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn create_link(&self, link: NewLink) -> Result<Link> {
        sqlx::query_as(&format!(
            "INSERT INTO links (description, url, posted_by_id) VALUES ($1, $2, $3) RETURNING {LINK_COLUMNS}"
        ))
        .bind(&link.description)
        .bind(&link.url)
        .bind(link.posted_by_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match violated_foreign_key(&e) {
            Some(_) => Error::not_found("User", link.posted_by_id),
            None => e.into(),
        })
    }

    async fn update_link(&self, id: i32, description: String, url: String) -> Result<Link> {
        let link: Option<Link> = sqlx::query_as(&format!(
            "UPDATE links SET description = $1, url = $2 WHERE id = $3 RETURNING {LINK_COLUMNS}"
        ))
        .bind(description)
        .bind(url)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        link.ok_or_else(|| Error::not_found("Link", id))
    }

    async fn delete_link(&self, id: i32) -> Result<Link> {
        let link: Option<Link> =
            sqlx::query_as(&format!("DELETE FROM links WHERE id = $1 RETURNING {LINK_COLUMNS}"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        link.ok_or_else(|| Error::not_found("Link", id))
    }

    async fn links_posted_by(&self, user_ids: &[i32]) -> Result<Vec<Link>> {
        let links = sqlx::query_as(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE posted_by_id = ANY($1) ORDER BY id"
        ))
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(links)
    }

    async fn users_by_ids(&self, ids: &[i32]) -> Result<Vec<User>> {
        let users = sqlx::query_as("SELECT id, name, email FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn voters_of(&self, link_ids: &[i32]) -> Result<Vec<(i32, User)>> {
        let rows: Vec<VoterRow> = sqlx::query_as(
            r#"
            SELECT v.link_id, u.id, u.name, u.email
            FROM votes v JOIN users u ON u.id = v.user_id
            WHERE v.link_id = ANY($1)
            ORDER BY v.id
            "#,
        )
        .bind(link_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let user = User { id: row.id, name: row.name, email: row.email };
                (row.link_id, user)
            })
            .collect())
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        sqlx::query_as("INSERT INTO users (name, email, password) VALUES ($1, $2, $3) RETURNING id, name, email")
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::Conflict(format!("A user with email {} already exists", user.email))
                } else {
                    e.into()
                }
            })
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let record = sqlx::query_as("SELECT id, name, email, password FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn create_vote(&self, link_id: i32, user_id: i32) -> Result<Vote> {
        sqlx::query_as("INSERT INTO votes (link_id, user_id) VALUES ($1, $2) RETURNING id, link_id, user_id")
            .bind(link_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    return Error::Conflict(format!("User {user_id} already voted for link {link_id}"));
                }
                match violated_foreign_key(&e).as_deref() {
                    Some("votes_user_id_fkey") => Error::not_found("User", user_id),
                    Some(_) => Error::not_found("Link", link_id),
                    None => e.into(),
                }
            })
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Closed PostgreSQL pool");
    }
}
