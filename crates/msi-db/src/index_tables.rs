//! Main/shadow table pair for a stock index.
//!
//! A full rebuild runs with `IndexScopeState::use_temporary_index()` and
//! writes into the shadow table prepared by [`ensure_index_tables`]; then
//! [`swap_index_tables`] exchanges the two names in one transaction so
//! readers switch from the old contents to the new ones atomically.
//!
//! Table names come from `IndexTableResolver`, which only admits plain SQL
//! identifiers; they are still quoted here.

use anyhow::{bail, Context, Result};
use msi_indexer::IndexTableResolver;
use sqlx::PgPool;
use tracing::info;

fn quoted(name: &str) -> String {
    format!("\"{name}\"")
}

/// Create the main table if missing and reset the shadow table to an empty
/// copy of its structure.
pub async fn ensure_index_tables(pool: &PgPool, resolver: &IndexTableResolver) -> Result<()> {
    let main = quoted(resolver.main_table());
    let temp = quoted(resolver.temporary_table());

    let mut tx = pool.begin().await.context("begin index table setup failed")?;

    sqlx::query(&format!(
        r#"
        create table if not exists {main} (
            sku         text    primary key,
            quantity    numeric not null default 0,
            is_salable  boolean not null default false
        )
        "#
    ))
    .execute(&mut *tx)
    .await
    .with_context(|| format!("create index table {main} failed"))?;

    sqlx::query(&format!("drop table if exists {temp}"))
        .execute(&mut *tx)
        .await
        .with_context(|| format!("drop shadow table {temp} failed"))?;

    sqlx::query(&format!("create table {temp} (like {main} including all)"))
        .execute(&mut *tx)
        .await
        .with_context(|| format!("create shadow table {temp} failed"))?;

    tx.commit().await.context("commit index table setup failed")?;
    Ok(())
}

/// Exchange main and shadow tables. After the swap the shadow name holds the
/// previous main contents.
pub async fn swap_index_tables(pool: &PgPool, resolver: &IndexTableResolver) -> Result<()> {
    let main_name = resolver.main_table();
    let temp_name = resolver.temporary_table();
    let parking_name = format!("{temp_name}_swap");
    if parking_name.len() > 63 {
        bail!("index swap table name '{parking_name}' exceeds 63 bytes");
    }
    let parking = quoted(&parking_name);
    let main = quoted(main_name);
    let temp = quoted(temp_name);

    let mut tx = pool.begin().await.context("begin index swap failed")?;

    for stmt in [
        format!("alter table {main} rename to {parking}"),
        format!("alter table {temp} rename to {main}"),
        format!("alter table {parking} rename to {temp}"),
    ] {
        sqlx::query(&stmt)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("index swap step failed: {stmt}"))?;
    }

    tx.commit().await.context("commit index swap failed")?;

    info!(main = main_name, temporary = temp_name, "index tables swapped");
    Ok(())
}
