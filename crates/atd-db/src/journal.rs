//! Decision and order journal, plus trailing marks.
//!
//! Decisions and orders are append-only: inserts are idempotent on their keys
//! (`decision_id` for both tables) and the only in-place update is
//! `decisions.executed`.

use anyhow::{anyhow, Context, Result};
use atd_schemas::{
    DecisionAction, DecisionRecord, OrderKind, OrderRecord, OrderStatus, Side, StrategyDecision,
    TradeRecord, TrailingMark,
};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Insert a decision row. Returns `false` when a row with the same
/// `decision_id` already exists (retried tick); the existing row is kept.
pub async fn insert_decision(pool: &PgPool, d: &DecisionRecord) -> Result<bool> {
    let payload = serde_json::to_value(&d.decision).context("serialize decision failed")?;

    let res = sqlx::query(
        r#"
        insert into decisions (
          decision_id, session_id, created_at, market, action, executed, decision
        ) values (
          $1, $2, $3, $4, $5, $6, $7
        )
        on conflict (decision_id) do nothing
        "#,
    )
    .bind(d.decision_id)
    .bind(d.session_id)
    .bind(d.created_at)
    .bind(&d.market)
    .bind(d.action.as_str())
    .bind(d.executed)
    .bind(payload)
    .execute(pool)
    .await
    .context("insert_decision failed")?;

    Ok(res.rows_affected() == 1)
}

pub async fn fetch_decision(pool: &PgPool, decision_id: Uuid) -> Result<Option<DecisionRecord>> {
    let row = sqlx::query(
        r#"
        select decision_id, session_id, created_at, market, action, executed, decision
        from decisions
        where decision_id = $1
        "#,
    )
    .bind(decision_id)
    .fetch_optional(pool)
    .await
    .context("fetch_decision failed")?;

    row.map(|r| decision_from_row(&r)).transpose()
}

fn decision_from_row(row: &PgRow) -> Result<DecisionRecord> {
    let action: String = row.try_get("action")?;
    let action = match action.as_str() {
        "execute" => DecisionAction::Execute,
        "skip" => DecisionAction::Skip,
        other => return Err(anyhow!("invalid decision action: {other}")),
    };
    let payload: serde_json::Value = row.try_get("decision")?;
    let decision: StrategyDecision =
        serde_json::from_value(payload).context("decode decision payload failed")?;

    Ok(DecisionRecord {
        decision_id: row.try_get("decision_id")?,
        session_id: row.try_get("session_id")?,
        created_at: row.try_get("created_at")?,
        market: row.try_get("market")?,
        action,
        executed: row.try_get("executed")?,
        decision,
    })
}

pub async fn mark_decision_executed(pool: &PgPool, decision_id: Uuid) -> Result<()> {
    sqlx::query("update decisions set executed = true where decision_id = $1")
        .bind(decision_id)
        .execute(pool)
        .await
        .context("mark_decision_executed failed")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Insert the order for a decision. Returns `false` when the decision already
/// has one; the existing row wins.
pub async fn insert_order(pool: &PgPool, o: &OrderRecord) -> Result<bool> {
    let res = sqlx::query(
        r#"
        insert into orders (
          order_id, decision_id, session_id, client_order_id, market, side, kind,
          notional_usd, status, filled_price, filled_size, venue_order_id, error, created_at
        ) values (
          $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14
        )
        on conflict (decision_id) do nothing
        "#,
    )
    .bind(o.order_id)
    .bind(o.decision_id)
    .bind(o.session_id)
    .bind(&o.client_order_id)
    .bind(&o.market)
    .bind(o.side.map(|s| s.to_string()))
    .bind(o.kind.map(|k| k.as_str()))
    .bind(o.notional_usd)
    .bind(o.status.as_str())
    .bind(o.filled_price)
    .bind(o.filled_size)
    .bind(&o.venue_order_id)
    .bind(&o.error)
    .bind(o.created_at)
    .execute(pool)
    .await
    .context("insert_order failed")?;

    Ok(res.rows_affected() == 1)
}

pub async fn fetch_order_for_decision(
    pool: &PgPool,
    decision_id: Uuid,
) -> Result<Option<OrderRecord>> {
    let row = sqlx::query(
        r#"
        select order_id, decision_id, session_id, client_order_id, market, side, kind,
               notional_usd, status, filled_price, filled_size, venue_order_id, error, created_at
        from orders
        where decision_id = $1
        "#,
    )
    .bind(decision_id)
    .fetch_optional(pool)
    .await
    .context("fetch_order_for_decision failed")?;

    row.map(|r| order_from_row(&r)).transpose()
}

fn order_from_row(row: &PgRow) -> Result<OrderRecord> {
    let status: String = row.try_get("status")?;
    let side: Option<String> = row.try_get("side")?;
    let kind: Option<String> = row.try_get("kind")?;

    Ok(OrderRecord {
        order_id: row.try_get("order_id")?,
        decision_id: row.try_get("decision_id")?,
        session_id: row.try_get("session_id")?,
        client_order_id: row.try_get("client_order_id")?,
        market: row.try_get("market")?,
        side: side.as_deref().map(parse_side).transpose()?,
        kind: kind.as_deref().map(parse_kind).transpose()?,
        notional_usd: row.try_get("notional_usd")?,
        status: OrderStatus::parse(&status)
            .ok_or_else(|| anyhow!("invalid order status: {status}"))?,
        filled_price: row.try_get("filled_price")?,
        filled_size: row.try_get("filled_size")?,
        venue_order_id: row.try_get("venue_order_id")?,
        error: row.try_get("error")?,
        created_at: row.try_get("created_at")?,
    })
}

fn parse_side(s: &str) -> Result<Side> {
    match s {
        "buy" => Ok(Side::Buy),
        "sell" => Ok(Side::Sell),
        other => Err(anyhow!("invalid order side: {other}")),
    }
}

fn parse_kind(s: &str) -> Result<OrderKind> {
    match s {
        "entry" => Ok(OrderKind::Entry),
        "exit" => Ok(OrderKind::Exit),
        other => Err(anyhow!("invalid order kind: {other}")),
    }
}

/// Orders that reached the venue since `since`, oldest first. Feeds the
/// trade-frequency, cooldown and re-entry rules.
pub async fn recent_trades(
    pool: &PgPool,
    session_id: Uuid,
    since: DateTime<Utc>,
) -> Result<Vec<TradeRecord>> {
    let rows = sqlx::query(
        r#"
        select market, side, kind, created_at
        from orders
        where session_id = $1
          and created_at >= $2
          and status in ('sent', 'filled')
          and side is not null
          and kind is not null
        order by created_at asc
        "#,
    )
    .bind(session_id)
    .bind(since)
    .fetch_all(pool)
    .await
    .context("recent_trades failed")?;

    rows.iter()
        .map(|r| {
            Ok(TradeRecord {
                market: r.try_get("market")?,
                side: parse_side(&r.try_get::<String, _>("side")?)?,
                kind: parse_kind(&r.try_get::<String, _>("kind")?)?,
                at: r.try_get("created_at")?,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Trailing marks
// ---------------------------------------------------------------------------

pub async fn load_trailing_mark(
    pool: &PgPool,
    session_id: Uuid,
    market: &str,
) -> Result<Option<TrailingMark>> {
    let row = sqlx::query(
        r#"
        select market, position_opened_at, peak, trough
        from trailing_marks
        where session_id = $1 and market = $2
        "#,
    )
    .bind(session_id)
    .bind(market)
    .fetch_optional(pool)
    .await
    .context("load_trailing_mark failed")?;

    let Some(r) = row else {
        return Ok(None);
    };
    Ok(Some(TrailingMark {
        market: r.try_get("market")?,
        position_opened_at: r.try_get("position_opened_at")?,
        peak: r.try_get("peak")?,
        trough: r.try_get("trough")?,
    }))
}

pub async fn save_trailing_mark(pool: &PgPool, session_id: Uuid, m: &TrailingMark) -> Result<()> {
    sqlx::query(
        r#"
        insert into trailing_marks (session_id, market, position_opened_at, peak, trough, updated_at)
        values ($1, $2, $3, $4, $5, now())
        on conflict (session_id, market) do update
          set position_opened_at = excluded.position_opened_at,
              peak = excluded.peak,
              trough = excluded.trough,
              updated_at = now()
        "#,
    )
    .bind(session_id)
    .bind(&m.market)
    .bind(m.position_opened_at)
    .bind(m.peak)
    .bind(m.trough)
    .execute(pool)
    .await
    .context("save_trailing_mark failed")?;
    Ok(())
}

pub async fn clear_trailing_mark(pool: &PgPool, session_id: Uuid, market: &str) -> Result<()> {
    sqlx::query("delete from trailing_marks where session_id = $1 and market = $2")
        .bind(session_id)
        .bind(market)
        .execute(pool)
        .await
        .context("clear_trailing_mark failed")?;
    Ok(())
}
