// Form-to-record validation. Pure: no I/O, same draft always yields the same verdict.
use std::fmt;

use crate::core::record::{Summary, SummaryInput};

/// Raw form values exactly as a user typed them.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Draft {
    pub summary_id: String,
    pub original_text: String,
    pub summary: String,
    pub keywords: String,
    pub rating: String,
    pub word_count: String,
}

impl Draft {
    /// Form view of an existing record: keywords rejoined with ", ",
    /// numbers stringified.
    pub fn from_summary(record: &Summary) -> Self {
        Self {
            summary_id: record.summary_id.clone(),
            original_text: record.original_text.clone(),
            summary: record.summary.clone(),
            keywords: record.keywords.join(", "),
            rating: record.rating.to_string(),
            word_count: record.word_count.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Rejection {
    RequiredFieldsMissing,
    KeywordsMissing,
    RatingOutOfRange,
    WordCountInvalid,
}

impl Rejection {
    pub fn as_str(self) -> &'static str {
        match self {
            Rejection::RequiredFieldsMissing => "required fields missing",
            Rejection::KeywordsMissing => "at least one keyword required",
            Rejection::RatingOutOfRange => "rating out of range",
            Rejection::WordCountInvalid => "word count invalid",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for Rejection {}

pub const MIN_RATING: f64 = 1.0;
pub const MAX_RATING: f64 = 5.0;

pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|keyword| !keyword.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn derive_word_count(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}

pub fn rating_in_range(rating: f64) -> bool {
    rating.is_finite() && (MIN_RATING..=MAX_RATING).contains(&rating)
}

/// Rules run in order; the first failure wins.
pub fn validate_draft(draft: &Draft) -> Result<SummaryInput, Rejection> {
    if draft.summary_id.trim().is_empty()
        || draft.original_text.trim().is_empty()
        || draft.summary.trim().is_empty()
    {
        return Err(Rejection::RequiredFieldsMissing);
    }

    let keywords = parse_keywords(&draft.keywords);
    if keywords.is_empty() {
        return Err(Rejection::KeywordsMissing);
    }

    let rating = draft
        .rating
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|rating| rating_in_range(*rating))
        .ok_or(Rejection::RatingOutOfRange)?;

    let word_count = match draft.word_count.trim() {
        "" => derive_word_count(&draft.original_text),
        explicit => parse_word_count(explicit).ok_or(Rejection::WordCountInvalid)?,
    };

    Ok(SummaryInput {
        summary_id: draft.summary_id.clone(),
        original_text: draft.original_text.clone(),
        summary: draft.summary.clone(),
        keywords,
        rating,
        word_count,
    })
}

// Accepts "4" and "4.0"; rejects negatives, fractions, and values past u32.
fn parse_word_count(raw: &str) -> Option<u32> {
    let value = raw.parse::<f64>().ok()?;
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return None;
    }
    Some(value as u32)
}

#[cfg(test)]
mod tests {
    use super::{Draft, Rejection, derive_word_count, parse_keywords, validate_draft};

    fn draft() -> Draft {
        Draft {
            summary_id: "S-1".to_string(),
            original_text: "the quick brown fox".to_string(),
            summary: "fox runs".to_string(),
            keywords: "animal, speed".to_string(),
            rating: "4.5".to_string(),
            word_count: String::new(),
        }
    }

    #[test]
    fn keywords_are_split_trimmed_and_filtered() {
        assert_eq!(parse_keywords("a, b ,c"), ["a", "b", "c"]);
        assert!(parse_keywords("").is_empty());
        assert!(parse_keywords(",").is_empty());
        assert!(parse_keywords(" , ,, ").is_empty());
    }

    #[test]
    fn word_count_is_whitespace_token_count() {
        assert_eq!(derive_word_count("the quick brown fox"), 4);
        assert_eq!(derive_word_count("  spaced\tout\n words  "), 3);
        assert_eq!(derive_word_count("   "), 0);
    }

    #[test]
    fn complete_draft_is_accepted_with_derived_word_count() {
        let input = validate_draft(&draft()).expect("valid");
        assert_eq!(input.summary_id, "S-1");
        assert_eq!(input.keywords, ["animal", "speed"]);
        assert_eq!(input.rating, 4.5);
        assert_eq!(input.word_count, 4);
    }

    #[test]
    fn explicit_word_count_wins_over_derived() {
        let mut d = draft();
        d.word_count = " 12 ".to_string();
        assert_eq!(validate_draft(&d).expect("valid").word_count, 12);
        d.word_count = "7.0".to_string();
        assert_eq!(validate_draft(&d).expect("valid").word_count, 7);
    }

    #[test]
    fn each_required_field_is_checked() {
        let clears: [fn(&mut Draft); 3] = [
            |d: &mut Draft| d.summary_id = "  ".to_string(),
            |d: &mut Draft| d.original_text = String::new(),
            |d: &mut Draft| d.summary = "\t".to_string(),
        ];
        for clear in clears {
            let mut d = draft();
            clear(&mut d);
            assert_eq!(validate_draft(&d), Err(Rejection::RequiredFieldsMissing));
        }
    }

    #[test]
    fn first_failing_rule_wins() {
        let d = Draft {
            keywords: ",".to_string(),
            rating: "9".to_string(),
            word_count: "-1".to_string(),
            ..Draft::default()
        };
        assert_eq!(validate_draft(&d), Err(Rejection::RequiredFieldsMissing));

        let mut d = draft();
        d.keywords = ",".to_string();
        d.rating = "9".to_string();
        assert_eq!(validate_draft(&d), Err(Rejection::KeywordsMissing));
    }

    #[test]
    fn rating_bounds_are_inclusive() {
        for (rating, ok) in [
            ("1", true),
            ("5.0", true),
            (" 3.25 ", true),
            ("0.99", false),
            ("5.01", false),
            ("", false),
            ("abc", false),
            ("NaN", false),
            ("inf", false),
        ] {
            let mut d = draft();
            d.rating = rating.to_string();
            let verdict = validate_draft(&d);
            if ok {
                assert!(verdict.is_ok(), "rating {rating:?} should pass");
            } else {
                assert_eq!(verdict, Err(Rejection::RatingOutOfRange), "rating {rating:?}");
            }
        }
    }

    #[test]
    fn bad_word_counts_are_rejected() {
        for raw in ["-1", "abc", "2.5", "1e12"] {
            let mut d = draft();
            d.word_count = raw.to_string();
            assert_eq!(validate_draft(&d), Err(Rejection::WordCountInvalid), "{raw}");
        }
    }

    #[test]
    fn rejection_messages_are_user_facing() {
        assert_eq!(
            Rejection::RequiredFieldsMissing.to_string(),
            "required fields missing"
        );
        assert_eq!(
            Rejection::KeywordsMissing.to_string(),
            "at least one keyword required"
        );
    }
}
