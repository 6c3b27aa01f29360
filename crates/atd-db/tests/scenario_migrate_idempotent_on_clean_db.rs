/// Migrating twice must be a no-op the second time.
///
/// DB-backed test, skipped if ATD_DATABASE_URL is not set.
#[tokio::test]
async fn migrate_idempotent_on_clean_db() -> anyhow::Result<()> {
    let url = match std::env::var(atd_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: ATD_DATABASE_URL not set");
            return Ok(());
        }
    };

    let pool = atd_db::connect(&url).await?;
    atd_db::migrate(&pool).await?;
    atd_db::migrate(&pool).await?;

    let st = atd_db::status(&pool).await?;
    assert!(st.ok);
    assert!(st.has_sessions_table);
    Ok(())
}
