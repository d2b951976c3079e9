//! Additive relevance scoring with early exclusion.
//!
//! Criteria are evaluated in a fixed order: keyword, author, year, then
//! the supervisor bonus. An unmatched author or year excludes the record
//! immediately if nothing before it has scored, even when a later
//! criterion or the bonus would have made the total positive.
//!
//! | Criterion | Absent | Match | No match |
//! |-----------|--------|-------|----------|
//! | keyword | +1 | title +10, author +5 | +1 if found in any field |
//! | author | +1 | +15 | exclude if score is 0 |
//! | year | +1 | +10 | exclude if score is 0 |
//! | supervisor | | +5 | |

use crate::metadata::Supervisor;
use crate::models::{Criteria, UnifiedRecord};

const BASELINE: i64 = 1;
const KEYWORD_IN_TITLE: i64 = 10;
const KEYWORD_IN_AUTHOR: i64 = 5;
const KEYWORD_WEAK: i64 = 1;
const AUTHOR_MATCH: i64 = 15;
const YEAR_MATCH: i64 = 10;
const SUPERVISOR_BONUS: i64 = 5;

#[derive(Debug, Clone, Default)]
pub struct RelevanceScorer {
    supervisor: Supervisor,
}

impl RelevanceScorer {
    pub fn new(supervisor: Supervisor) -> Self {
        Self { supervisor }
    }

    /// Score `record` against `criteria`, or `None` if it is excluded.
    pub fn score(&self, record: &UnifiedRecord, criteria: &Criteria) -> Option<i64> {
        let mut score = 0;

        match criteria.keyword.as_deref() {
            None => score += BASELINE,
            Some(keyword) => {
                let keyword = keyword.to_lowercase();
                if record.title.to_lowercase().contains(&keyword) {
                    score += KEYWORD_IN_TITLE;
                }
                if record.author.to_lowercase().contains(&keyword) {
                    score += KEYWORD_IN_AUTHOR;
                }
                if score == 0
                    && record
                        .field_strings()
                        .iter()
                        .any(|f| f.to_lowercase().contains(&keyword))
                {
                    score += KEYWORD_WEAK;
                }
            }
        }

        match criteria.author.as_deref() {
            None => score += BASELINE,
            Some(author) => {
                if record.author.to_lowercase().contains(&author.to_lowercase()) {
                    score += AUTHOR_MATCH;
                } else if score == 0 {
                    return None;
                }
            }
        }

        match criteria.year {
            None => score += BASELINE,
            Some(year) => {
                if record.year == Some(year) {
                    score += YEAR_MATCH;
                } else if score == 0 {
                    return None;
                }
            }
        }

        if self.supervisor.is_mentioned_in(&record.author) {
            score += SUPERVISOR_BONUS;
        }

        (score > 0).then_some(score)
    }

    /// Keep the records that survive `criteria`, with `score` filled in.
    pub fn filter(&self, records: Vec<UnifiedRecord>, criteria: &Criteria) -> Vec<UnifiedRecord> {
        records
            .into_iter()
            .filter_map(|mut record| {
                record.score = self.score(&record, criteria)?;
                Some(record)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;

    fn record(title: &str, author: &str, year: Option<i32>) -> UnifiedRecord {
        UnifiedRecord {
            id: String::new(),
            title: title.to_string(),
            author: author.to_string(),
            year,
            source: SourceKind::Local,
            path: format!("/refs/{}.pdf", title.replace(' ', "_")),
            size: 0,
            modified: String::new(),
            kind: "pdf".to_string(),
            score: 0,
        }
    }

    fn scorer() -> RelevanceScorer {
        RelevanceScorer::default()
    }

    #[test]
    fn no_criteria_gives_baseline_of_three() {
        let r = record("Elliptic curves", "Silverman", Some(1986));
        assert_eq!(scorer().score(&r, &Criteria::new()), Some(3));
    }

    #[test]
    fn keyword_matches_title_case_insensitively() {
        let r = record("Elliptic Curves", "Silverman", None);
        assert_eq!(scorer().score(&r, &Criteria::new().keyword("CURVES")), Some(12));
    }

    #[test]
    fn keyword_in_title_and_author_accumulates() {
        let r = record("Silverman lectures", "Silverman", None);
        assert_eq!(scorer().score(&r, &Criteria::new().keyword("silver")), Some(17));
    }

    #[test]
    fn keyword_in_author_only() {
        let r = record("Arithmetic", "Silverman", None);
        assert_eq!(scorer().score(&r, &Criteria::new().keyword("silver")), Some(7));
    }

    #[test]
    fn keyword_weak_match_on_other_fields() {
        let r = record("Arithmetic", "Silverman", None);
        // Only the source label "Local" contains it.
        assert_eq!(scorer().score(&r, &Criteria::new().keyword("loc")), Some(3));
    }

    #[test]
    fn keyword_without_any_match_contributes_nothing() {
        let r = record("Arithmetic", "Silverman", Some(1986));
        assert_eq!(scorer().score(&r, &Criteria::new().keyword("zeta")), Some(2));
    }

    #[test]
    fn author_match_adds_fifteen() {
        let r = record("Arithmetic", "Joseph Silverman", None);
        assert_eq!(scorer().score(&r, &Criteria::new().author("silverman")), Some(17));
    }

    #[test]
    fn unmatched_author_excludes_when_nothing_scored_yet() {
        let r = record("Arithmetic", "Silverman", None);
        let c = Criteria::new().keyword("zeta").author("Tate");
        assert_eq!(scorer().score(&r, &c), None);
    }

    #[test]
    fn unmatched_author_survives_on_keyword_baseline() {
        let r = record("Arithmetic", "Silverman", None);
        assert_eq!(scorer().score(&r, &Criteria::new().author("Tate")), Some(2));
    }

    #[test]
    fn exclusion_fires_before_supervisor_bonus() {
        let r = record("Notes", "Mayrand, Maxence", Some(2021));
        let c = Criteria::new().keyword("zeta").author("Tate");
        assert_eq!(scorer().score(&r, &c), None);
    }

    #[test]
    fn exclusion_fires_before_year_would_match() {
        let r = record("Notes", "Silverman", Some(2021));
        let c = Criteria::new().keyword("zeta").author("Tate").year(2021);
        assert_eq!(scorer().score(&r, &c), None);
    }

    #[test]
    fn unmatched_year_excludes_when_nothing_scored_yet() {
        let r = record("Arithmetic", "Silverman", Some(1986));
        let c = Criteria::new().keyword("zeta").author("Tate").year(1990);
        assert_eq!(scorer().score(&r, &c), None);

        let c = Criteria::new().keyword("zeta").year(1990);
        // Author baseline keeps the running score positive.
        assert_eq!(scorer().score(&r, &c), Some(1));
    }

    #[test]
    fn year_match_adds_ten() {
        let r = record("Arithmetic", "Silverman", Some(1986));
        assert_eq!(scorer().score(&r, &Criteria::new().year(1986)), Some(12));
    }

    #[test]
    fn supervisor_bonus_applies_without_criteria() {
        let r = record("Notes", "Mayrand, Maxence", None);
        assert_eq!(scorer().score(&r, &Criteria::new()), Some(8));
    }

    #[test]
    fn filter_sets_scores_and_drops_excluded() {
        let records = vec![
            record("Zeta functions", "Tate", None),
            record("Arithmetic", "Silverman", None),
        ];
        let c = Criteria::new().keyword("zeta").author("Tate");
        let kept = scorer().filter(records, &c);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].author, "Tate");
        assert_eq!(kept[0].score, 26);
    }
}
