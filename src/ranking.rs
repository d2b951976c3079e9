//! Deterministic ordering of scored records.
//!
//! Higher score first, then newer year (a missing year counts as 0), then
//! author and title alphabetically, both compared case-insensitively.

use std::cmp::Reverse;

use crate::models::UnifiedRecord;

type RankKey = (Reverse<i64>, Reverse<i32>, String, String);

fn rank_key(r: &UnifiedRecord) -> RankKey {
    (
        Reverse(r.score),
        Reverse(r.year.unwrap_or(0)),
        r.author.to_lowercase(),
        r.title.to_lowercase(),
    )
}

/// Sort `records` in ranking order.
pub fn rank(mut records: Vec<UnifiedRecord>) -> Vec<UnifiedRecord> {
    records.sort_by_cached_key(rank_key);
    records
}
