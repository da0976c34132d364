//! Atomic certificate-number sequences.
//!
//! One counter per (certificate type, year), incremented with a single
//! `INSERT .. ON CONFLICT .. RETURNING` statement so concurrent requests can
//! never observe the same value.

use sqlx::{PgPool, Row};

/// Claim the next sequence value for a certificate type in a given year.
pub async fn next_sequence_value(
    pool: &PgPool,
    certificate_type: &str,
    year: i32,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO certificate_sequences (certificate_type, year, counter)
        VALUES ($1, $2, 1)
        ON CONFLICT (certificate_type, year) DO UPDATE SET
            counter = certificate_sequences.counter + 1
        RETURNING counter
        "#,
    )
    .bind(certificate_type)
    .bind(year)
    .fetch_one(pool)
    .await?;

    row.try_get("counter")
}
