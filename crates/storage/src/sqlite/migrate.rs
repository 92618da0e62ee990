use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_VERSION: &str = "1";

/// Creates the `meta`/`cards`/`skills` schema if it does not already exist,
/// then applies any additive column upgrades an older database is still
/// missing. Column names, types, and indexes match the upstream store exactly
/// (§3) so that a database produced by either implementation reads back the
/// same way.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS meta (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS cards (
                card_id               INTEGER PRIMARY KEY,
                name                  TEXT NOT NULL,
                evolve_marker         TEXT,
                card_type             TEXT,
                hp                    INTEGER,
                element_code          TEXT,
                element               TEXT,
                regulation_mark       TEXT,
                collector_number      TEXT,
                expansion_code        TEXT,
                expansion_name        TEXT,
                expansion_symbol_url  TEXT,
                illustrator           TEXT,
                image_url             TEXT,
                weakness_code         TEXT,
                weakness_value        TEXT,
                resistance_code       TEXT,
                resistance_value      TEXT,
                retreat_cost          INTEGER,
                pokedex_no            INTEGER,
                height_m              REAL,
                weight_kg             REAL,
                description           TEXT,
                source_url            TEXT NOT NULL,
                fetched_at            TEXT NOT NULL,
                raw_json              TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cards_name ON cards(name);")
        .execute(&mut *tx)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cards_expansion_code ON cards(expansion_code);")
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_cards_collector_number ON cards(collector_number);",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS skills (
                skill_id          INTEGER PRIMARY KEY AUTOINCREMENT,
                card_id           INTEGER NOT NULL REFERENCES cards(card_id) ON DELETE CASCADE,
                idx               INTEGER NOT NULL,
                kind              TEXT,
                name              TEXT,
                cost_json         TEXT,
                damage            TEXT,
                effect            TEXT,
                effect_text_norm  TEXT,
                instructions_json TEXT
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_skills_card_id ON skills(card_id);")
        .execute(&mut *tx)
        .await?;

    // Databases created before `effect_text_norm`/`instructions_json` existed
    // need these columns added in place; a fresh database already has them
    // from the CREATE TABLE above, so a "duplicate column" failure here is
    // expected and swallowed rather than propagated.
    for stmt in [
        "ALTER TABLE skills ADD COLUMN effect_text_norm TEXT;",
        "ALTER TABLE skills ADD COLUMN instructions_json TEXT;",
    ] {
        if let Err(err) = sqlx::query(stmt).execute(&mut *tx).await {
            if !is_duplicate_column(&err) {
                return Err(err.into());
            }
        }
    }

    sqlx::query("INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', ?1);")
        .bind(SCHEMA_VERSION)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

fn is_duplicate_column(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.message().contains("duplicate column name"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let version: String = sqlx::query_scalar("SELECT value FROM meta WHERE key = 'schema_version';")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }
}
