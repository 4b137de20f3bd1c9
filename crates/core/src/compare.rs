//! Block alignment and back-translation scoring.

use crate::progress::{Progress, ProgressSink};
use crate::similarity::similarity_score;
use crate::types::{BlockKey, Presentation};
use crate::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default minimum similarity for a row to be considered OK.
pub const DEFAULT_THRESHOLD: f64 = 0.70;

/// Translates text back into the language of the source deck.
pub trait BackTranslator {
    fn back_translate(&mut self, text: &str) -> Result<String>;

    /// Language code translations are produced in (e.g. "en").
    fn target_language(&self) -> &str;
}

impl<T: BackTranslator + ?Sized> BackTranslator for Box<T> {
    fn back_translate(&mut self, text: &str) -> Result<String> {
        (**self).back_translate(text)
    }

    fn target_language(&self) -> &str {
        (**self).target_language()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CompareOptions {
    /// Rows scoring at or above this similarity are OK.
    pub threshold: f64,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl CompareOptions {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }
}

/// Outcome of comparing one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowStatus {
    Ok,
    NeedsReview,
    MissingTranslation,
    EmptyBlock,
    ExtraTranslation,
}

impl RowStatus {
    pub fn label(self) -> &'static str {
        match self {
            RowStatus::Ok => "OK",
            RowStatus::NeedsReview => "Needs Review",
            RowStatus::MissingTranslation => "Missing translation",
            RowStatus::EmptyBlock => "Empty block",
            RowStatus::ExtraTranslation => "Extra translation (no source)",
        }
    }

    /// CSS class used for the report row.
    pub fn css_class(self) -> &'static str {
        match self {
            RowStatus::Ok | RowStatus::EmptyBlock => "ok",
            RowStatus::NeedsReview => "review",
            RowStatus::MissingTranslation | RowStatus::ExtraTranslation => "missing",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub key: BlockKey,
    pub source_text: String,
    pub translated_text: String,
    pub back_translated: String,
    /// Similarity as a percentage rounded to two decimals.
    pub similarity: f64,
    pub status: RowStatus,
}

/// Row counts per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub total: usize,
    pub ok: usize,
    pub needs_review: usize,
    pub missing: usize,
    pub extra: usize,
    pub empty: usize,
}

impl ComparisonSummary {
    pub fn from_rows(rows: &[ComparisonRow]) -> Self {
        let mut summary = Self {
            total: rows.len(),
            ..Self::default()
        };
        for row in rows {
            match row.status {
                RowStatus::Ok => summary.ok += 1,
                RowStatus::NeedsReview => summary.needs_review += 1,
                RowStatus::MissingTranslation => summary.missing += 1,
                RowStatus::ExtraTranslation => summary.extra += 1,
                RowStatus::EmptyBlock => summary.empty += 1,
            }
        }
        summary
    }

    /// Rows a reviewer should look at.
    pub fn flagged(&self) -> usize {
        self.needs_review + self.missing + self.extra
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub source_name: String,
    pub translated_name: String,
    pub threshold: f64,
    /// Language the back-translations are in.
    pub back_translation_language: String,
    pub generated_at: DateTime<Local>,
    pub rows: Vec<ComparisonRow>,
    pub summary: ComparisonSummary,
}

/// Compare every block of `source` with the block at the same position in
/// `translated`.
///
/// Translation failures never abort the comparison: the failing row gets an
/// empty back-translation and is scored against that.
pub fn compare_presentations(
    source: &Presentation,
    translated: &Presentation,
    translator: &mut dyn BackTranslator,
    options: &CompareOptions,
    progress: &dyn ProgressSink,
) -> ComparisonReport {
    let source_map = source.text_map();
    let translated_map = translated.text_map();

    let keys: BTreeSet<BlockKey> = source_map
        .keys()
        .chain(translated_map.keys())
        .copied()
        .collect();
    let total = keys.len();

    log::info!(
        "Comparing {} ({} blocks) with {} ({} blocks): {} rows",
        source.filename,
        source_map.len(),
        translated.filename,
        translated_map.len(),
        total
    );

    let mut state = Progress {
        total,
        ..Progress::starting()
    };
    progress.update(&state);

    let mut rows = Vec::with_capacity(total);
    for (idx, key) in keys.into_iter().enumerate() {
        let item = idx + 1;
        state.current = item;
        state.message = format!("Processing slide {} (item {}/{})", key.slide, item, total);
        progress.update(&state);

        let source_text = source_map.get(&key).copied().unwrap_or("");
        let translated_text = translated_map.get(&key).copied().unwrap_or("");
        rows.push(compare_block(
            key,
            source_text,
            translated_text,
            translator,
            options,
        ));
    }

    let summary = ComparisonSummary::from_rows(&rows);
    log::info!(
        "Comparison finished: {} ok, {} need review, {} missing, {} extra",
        summary.ok,
        summary.needs_review,
        summary.missing,
        summary.extra
    );

    state.done = true;
    state.message = "Report ready".to_string();
    progress.update(&state);

    ComparisonReport {
        source_name: source.filename.clone(),
        translated_name: translated.filename.clone(),
        threshold: options.threshold,
        back_translation_language: translator.target_language().to_string(),
        generated_at: Local::now(),
        rows,
        summary,
    }
}

fn compare_block(
    key: BlockKey,
    source_text: &str,
    translated_text: &str,
    translator: &mut dyn BackTranslator,
    options: &CompareOptions,
) -> ComparisonRow {
    if translated_text.is_empty() {
        let status = if source_text.is_empty() {
            RowStatus::EmptyBlock
        } else {
            RowStatus::MissingTranslation
        };
        return ComparisonRow {
            key,
            source_text: source_text.to_string(),
            translated_text: String::new(),
            back_translated: String::new(),
            similarity: 0.0,
            status,
        };
    }

    let back_translated = match translator.back_translate(translated_text) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("Back-translation failed for block {}: {}", key, e);
            String::new()
        }
    };

    let sim = similarity_score(source_text, &back_translated);
    let status = if source_text.is_empty() {
        RowStatus::ExtraTranslation
    } else if sim >= options.threshold {
        RowStatus::Ok
    } else {
        RowStatus::NeedsReview
    };

    ComparisonRow {
        key,
        source_text: source_text.to_string(),
        translated_text: translated_text.to_string(),
        back_translated,
        similarity: round_percent(sim),
        status,
    }
}

fn round_percent(ratio: f64) -> f64 {
    (ratio * 10_000.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PresentationFormat, TextBlock};
    use crate::{Error, NoProgress};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FixedTranslator {
        answers: HashMap<String, String>,
        calls: Vec<String>,
    }

    impl FixedTranslator {
        fn new(pairs: &[(&str, &str)]) -> Self {
            Self {
                answers: pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                calls: Vec::new(),
            }
        }
    }

    impl BackTranslator for FixedTranslator {
        fn back_translate(&mut self, text: &str) -> Result<String> {
            self.calls.push(text.to_string());
            self.answers
                .get(text)
                .cloned()
                .ok_or_else(|| Error::Translation(format!("no answer for {}", text)))
        }

        fn target_language(&self) -> &str {
            "en"
        }
    }

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<Progress>>);

    impl ProgressSink for RecordingSink {
        fn update(&self, progress: &Progress) {
            self.0.lock().unwrap().push(progress.clone());
        }
    }

    fn deck(name: &str, blocks: &[((usize, usize, usize), &str)]) -> Presentation {
        let mut p = Presentation::new(name, PresentationFormat::Pptx);
        for &((s, sh, para), text) in blocks {
            p.add_block(TextBlock::new(BlockKey::new(s, sh, para), text));
        }
        p
    }

    #[test]
    fn test_statuses() {
        let source = deck(
            "en.pptx",
            &[
                ((1, 0, 0), "Quarterly results"),
                ((1, 1, 0), "Revenue grew strongly"),
                ((2, 0, 0), "Thank you"),
                ((2, 1, 0), ""),
            ],
        );
        let translated = deck(
            "fr.pptx",
            &[
                ((1, 0, 0), "Résultats trimestriels"),
                ((1, 1, 0), "Les ventes ont chuté"),
                ((2, 1, 0), ""),
                ((3, 0, 0), "Questions ?"),
            ],
        );
        let mut translator = FixedTranslator::new(&[
            ("Résultats trimestriels", "Quarterly results"),
            ("Les ventes ont chuté", "Sales fell"),
            ("Questions ?", "Questions?"),
        ]);

        let report = compare_presentations(
            &source,
            &translated,
            &mut translator,
            &CompareOptions::default(),
            &NoProgress,
        );

        let statuses: Vec<_> = report.rows.iter().map(|r| (r.key, r.status)).collect();
        assert_eq!(
            statuses,
            vec![
                (BlockKey::new(1, 0, 0), RowStatus::Ok),
                (BlockKey::new(1, 1, 0), RowStatus::NeedsReview),
                (BlockKey::new(2, 0, 0), RowStatus::MissingTranslation),
                (BlockKey::new(2, 1, 0), RowStatus::EmptyBlock),
                (BlockKey::new(3, 0, 0), RowStatus::ExtraTranslation),
            ]
        );
        assert_eq!(report.rows[0].similarity, 100.0);
        assert_eq!(report.rows[2].similarity, 0.0);
        // Empty translated text never reaches the translator.
        assert_eq!(translator.calls.len(), 3);
        assert_eq!(report.summary.flagged(), 3);
        assert_eq!(report.summary.total, 5);
        assert_eq!(report.back_translation_language, "en");
    }

    #[test]
    fn test_translation_failure_is_scored_as_empty() {
        let source = deck("en.pptx", &[((1, 0, 0), "Hello")]);
        let translated = deck("de.pptx", &[((1, 0, 0), "Hallo")]);
        let mut translator = FixedTranslator::new(&[]);

        let report = compare_presentations(
            &source,
            &translated,
            &mut translator,
            &CompareOptions::default(),
            &NoProgress,
        );

        let row = &report.rows[0];
        assert_eq!(row.back_translated, "");
        assert_eq!(row.similarity, 0.0);
        assert_eq!(row.status, RowStatus::NeedsReview);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let source = deck("en.pptx", &[((1, 0, 0), "abcd")]);
        let translated = deck("xx.pptx", &[((1, 0, 0), "wxyz")]);
        let mut translator = FixedTranslator::new(&[("wxyz", "bcde")]);

        let report = compare_presentations(
            &source,
            &translated,
            &mut translator,
            &CompareOptions::default().with_threshold(0.75),
            &NoProgress,
        );
        assert_eq!(report.rows[0].similarity, 75.0);
        assert_eq!(report.rows[0].status, RowStatus::Ok);
    }

    #[test]
    fn test_progress_updates() {
        let source = deck("en.pptx", &[((1, 0, 0), "One"), ((2, 0, 0), "Two")]);
        let translated = deck("xx.pptx", &[((1, 0, 0), "Uno"), ((2, 0, 0), "Dos")]);
        let mut translator = FixedTranslator::new(&[("Uno", "One"), ("Dos", "Two")]);
        let sink = RecordingSink::default();

        compare_presentations(
            &source,
            &translated,
            &mut translator,
            &CompareOptions::default(),
            &sink,
        );

        let updates = sink.0.into_inner().unwrap();
        assert_eq!(updates.first().map(|p| p.total), Some(2));
        assert!(updates
            .iter()
            .any(|p| p.message == "Processing slide 2 (item 2/2)"));
        let last = updates.last().unwrap();
        assert!(last.done);
        assert_eq!(last.message, "Report ready");
        assert_eq!(last.current, 2);
    }

    #[test]
    fn test_round_percent() {
        assert_eq!(round_percent(0.123456), 12.35);
        assert_eq!(round_percent(1.0), 100.0);
        assert_eq!(round_percent(2.0 / 3.0), 66.67);
    }
}
