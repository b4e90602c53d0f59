use sqlx::{Pool, Postgres};

// Creates the users, links and votes tables when they do not exist yet
pub async fn init_db(pool: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id SERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS links (
            id SERIAL PRIMARY KEY,
            description TEXT NOT NULL,
            url TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            posted_by_id INTEGER REFERENCES users (id) ON DELETE SET NULL
        );
        CREATE TABLE IF NOT EXISTS votes (
            id SERIAL PRIMARY KEY,
            link_id INTEGER NOT NULL REFERENCES links (id) ON DELETE CASCADE,
            user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
            UNIQUE (link_id, user_id)
        );
        CREATE INDEX IF NOT EXISTS idx_links_posted_by ON links (posted_by_id);
        CREATE INDEX IF NOT EXISTS idx_votes_link ON votes (link_id);
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
