// Named form fields so presenting layers can edit a draft by field name.
use std::fmt;
use std::str::FromStr;

use crate::core::error::{Error, ErrorKind};
use crate::core::validate::Draft;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FormField {
    SummaryId,
    OriginalText,
    Summary,
    Keywords,
    Rating,
    WordCount,
}

impl FormField {
    pub const ALL: [FormField; 6] = [
        FormField::SummaryId,
        FormField::OriginalText,
        FormField::Summary,
        FormField::Keywords,
        FormField::Rating,
        FormField::WordCount,
    ];

    /// Wire/schema name of the field.
    pub fn name(self) -> &'static str {
        match self {
            FormField::SummaryId => "summaryID",
            FormField::OriginalText => "originalText",
            FormField::Summary => "summary",
            FormField::Keywords => "keywords",
            FormField::Rating => "rating",
            FormField::WordCount => "wordCount",
        }
    }

    pub fn slot(self, draft: &mut Draft) -> &mut String {
        match self {
            FormField::SummaryId => &mut draft.summary_id,
            FormField::OriginalText => &mut draft.original_text,
            FormField::Summary => &mut draft.summary,
            FormField::Keywords => &mut draft.keywords,
            FormField::Rating => &mut draft.rating,
            FormField::WordCount => &mut draft.word_count,
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FormField {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        FormField::ALL
            .into_iter()
            .find(|field| field.name() == name)
            .ok_or_else(|| {
                Error::new(ErrorKind::Usage)
                    .with_message(format!("unknown form field: {name}"))
                    .with_hint(
                        "Use summaryID, originalText, summary, keywords, rating, or wordCount.",
                    )
            })
    }
}
