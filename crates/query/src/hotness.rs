//! Time-decayed popularity ("hotness").
//!
//! `hotness = sign(score) * log10(max(|score|, 1)) + (created - EPOCH_ORIGIN) / TIME_SCALE`
//!
//! Every [`TIME_SCALE`] seconds of recency is worth one order of magnitude of
//! net votes, so fresh entries can outrank older ones with more votes while
//! large absolute scores still dominate.

/// Reference instant (seconds since the Unix epoch) the age term is measured from.
pub const EPOCH_ORIGIN: i64 = 1_134_028_003;

/// Seconds of age per unit of hotness.
pub const TIME_SCALE: f64 = 45_000.0;

/// Hotness of an entry with signed vote total `score` created at
/// `created_at` (Unix seconds, fractional like Postgres `EXTRACT(EPOCH ...)`).
pub fn hotness(score: i64, created_at: f64) -> f64 {
    let order = (score.unsigned_abs().max(1) as f64).log10();
    let sign = score.signum() as f64;
    sign * order + (created_at - EPOCH_ORIGIN as f64) / TIME_SCALE
}

/// Render the hotness formula as a Postgres expression over a signed score
/// column and a `timestamptz` column.
pub fn sql_expression(score: &str, created_at: &str) -> String {
    format!(
        "(SIGN({score}::float8) * LOG(GREATEST(ABS({score}), 1)::float8) \
         + (EXTRACT(EPOCH FROM {created_at})::float8 - {EPOCH_ORIGIN}) / {TIME_SCALE:.1})"
    )
}
