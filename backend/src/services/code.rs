//! Allocation of sequential entity codes
//!
//! A counter per namespace lives in `code_sequences`. The first allocation in
//! a namespace seeds the counter from the greatest existing code, so data
//! created before the counter existed is respected. Allocation runs on the
//! caller's transaction; a rollback returns the number to the pool.

use chrono::{NaiveDate, Utc};
use shared::CodeKind;
use sqlx::{Postgres, Transaction};

use crate::error::AppResult;

/// Table and column holding the codes of `kind`
fn code_column(kind: CodeKind) -> (&'static str, &'static str) {
    match kind {
        CodeKind::Customer => ("customers", "code"),
        CodeKind::Supplier => ("suppliers", "code"),
        CodeKind::Machine => ("machines", "code"),
        CodeKind::Material => ("materials", "code"),
        CodeKind::Measurement => ("measurements", "code"),
        CodeKind::PurchaseOrder => ("purchase_orders", "po_number"),
    }
}

/// Allocate the next code of `kind` for today
pub async fn next_code(tx: &mut Transaction<'_, Postgres>, kind: CodeKind) -> AppResult<String> {
    next_code_on(tx, kind, Utc::now().date_naive()).await
}

/// Allocate the next code of `kind` in the namespace of `date`
#[tracing::instrument(skip(tx))]
pub async fn next_code_on(
    tx: &mut Transaction<'_, Postgres>,
    kind: CodeKind,
    date: NaiveDate,
) -> AppResult<String> {
    let scope = kind.scope(date);
    let (table, column) = code_column(kind);

    let last = sqlx::query_scalar::<_, String>(&format!(
        "SELECT {column} FROM {table} WHERE {column} LIKE $1 || '%' ORDER BY {column} DESC LIMIT 1"
    ))
    .bind(&scope)
    .fetch_optional(&mut **tx)
    .await?;

    let seed = match last.as_deref() {
        Some(code) => i64::from(kind.sequence_of(date, code)?),
        None => 0,
    };

    let sequence = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO code_sequences (scope, last_value)
        VALUES ($1, $2 + 1)
        ON CONFLICT (scope) DO UPDATE
            SET last_value = GREATEST(code_sequences.last_value, $2) + 1
        RETURNING last_value
        "#,
    )
    .bind(&scope)
    .bind(seed)
    .fetch_one(&mut **tx)
    .await?;

    let sequence = u32::try_from(sequence).map_err(|_| shared::CodeError::Exhausted {
        prefix: scope.clone(),
        width: shared::SEQUENCE_WIDTH,
    })?;
    let code = kind.render(date, sequence)?;
    tracing::debug!(%code, "Allocated code");
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_columns() {
        assert_eq!(code_column(CodeKind::PurchaseOrder), ("purchase_orders", "po_number"));
        assert_eq!(code_column(CodeKind::Measurement), ("measurements", "code"));
    }
}
