//! Postgres persistence for stock ↔ source links.
//!
//! The row-level helpers take a `&mut PgConnection` so they compose inside a
//! caller's transaction (`&mut *tx`). [`process_stock_links`] is the
//! transactional reconcile: validate, lock the stock, fetch, plan, save,
//! delete, commit. Either every change of one call lands or none does.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use msi_reconcile::{
    Link, LinkError, LinkPatch, LinkReconciler, PersistenceError, ProcessOutcome, StoreOp,
};
use serde_json::Value;
use sqlx::{PgConnection, PgPool};

type LinkRow = (i64, i64, String, i32, Value);

fn link_from_row((link_id, stock_id, source_code, priority, extension): LinkRow) -> Result<Link> {
    let extension = match extension {
        Value::Object(map) => map.into_iter().collect(),
        Value::Null => BTreeMap::new(),
        other => bail!("link {link_id} has non-object extension: {other}"),
    };
    Ok(Link {
        link_id: Some(link_id),
        stock_id,
        source_code,
        priority,
        extension,
    })
}

/// Every persisted link of `stock_id`, ordered by source code.
pub async fn fetch_links_for_stock(conn: &mut PgConnection, stock_id: i64) -> Result<Vec<Link>> {
    let rows = sqlx::query_as::<_, LinkRow>(
        r#"
        select link_id, stock_id, source_code, priority, extension
        from inventory_stock_source_link
        where stock_id = $1
        order by source_code
        "#,
    )
    .bind(stock_id)
    .fetch_all(&mut *conn)
    .await
    .context("fetch_links_for_stock failed")?;

    rows.into_iter().map(link_from_row).collect()
}

/// Upsert keyed by `(stock_id, source_code)`.
pub async fn save_links(conn: &mut PgConnection, links: &[Link]) -> Result<()> {
    for link in links {
        let extension: serde_json::Map<String, Value> = link
            .extension
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        sqlx::query(
            r#"
            insert into inventory_stock_source_link (stock_id, source_code, priority, extension)
            values ($1, $2, $3, $4)
            on conflict (stock_id, source_code)
            do update set priority = excluded.priority, extension = excluded.extension
            "#,
        )
        .bind(link.stock_id)
        .bind(&link.source_code)
        .bind(link.priority)
        .bind(Value::Object(extension))
        .execute(&mut *conn)
        .await
        .with_context(|| {
            format!(
                "save_links failed for stock {} source '{}'",
                link.stock_id, link.source_code
            )
        })?;
    }
    Ok(())
}

/// Delete by natural key; unknown keys are ignored.
pub async fn delete_links(conn: &mut PgConnection, links: &[Link]) -> Result<u64> {
    let mut by_stock: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    for link in links {
        by_stock
            .entry(link.stock_id)
            .or_default()
            .push(link.source_code.clone());
    }

    let mut removed = 0;
    for (stock_id, codes) in by_stock {
        let res = sqlx::query(
            r#"
            delete from inventory_stock_source_link
            where stock_id = $1 and source_code = any($2)
            "#,
        )
        .bind(stock_id)
        .bind(&codes)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("delete_links failed for stock {stock_id}"))?;
        removed += res.rows_affected();
    }
    Ok(removed)
}

/// Serialize reconciles of the same stock until the transaction ends.
async fn lock_stock(conn: &mut PgConnection, stock_id: i64) -> Result<()> {
    sqlx::query("select pg_advisory_xact_lock($1)")
        .bind(stock_id)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("advisory lock for stock {stock_id} failed"))?;
    Ok(())
}

fn store_err(op: StoreOp) -> impl Fn(anyhow::Error) -> PersistenceError {
    move |e| PersistenceError::new(op, format!("{e:#}"))
}

/// Transactional replace-strategy reconcile of one stock's links.
///
/// Same semantics as `LinkReconciler::process`; in addition, both batches
/// commit together and concurrent calls for the same stock queue on an
/// advisory lock. A failed commit is reported as a `Save` failure.
pub async fn process_stock_links(
    pool: &PgPool,
    reconciler: &LinkReconciler,
    stock_id: i64,
    desired: &[LinkPatch],
) -> Result<ProcessOutcome, LinkError> {
    let valid = reconciler.validate(stock_id, desired)?;

    let mut tx = pool
        .begin()
        .await
        .context("begin link transaction failed")
        .map_err(store_err(StoreOp::Fetch))?;

    lock_stock(&mut *tx, stock_id)
        .await
        .map_err(store_err(StoreOp::Fetch))?;
    let existing = fetch_links_for_stock(&mut *tx, stock_id)
        .await
        .map_err(store_err(StoreOp::Fetch))?;

    let plan = reconciler.plan_fetched(stock_id, existing, &valid);

    if !plan.save.is_empty() {
        save_links(&mut *tx, &plan.save)
            .await
            .map_err(store_err(StoreOp::Save))?;
    }
    if !plan.delete.is_empty() {
        delete_links(&mut *tx, &plan.delete)
            .await
            .map_err(store_err(StoreOp::Delete))?;
    }

    tx.commit()
        .await
        .context("commit link transaction failed")
        .map_err(store_err(StoreOp::Save))?;

    Ok(reconciler.finish(&plan))
}
