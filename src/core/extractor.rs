use scraper::{CaseSensitivity, ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{BattleOutcome, ExtractedBattles};

/// Errors raised while compiling selector rules
#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("Invalid selector for {rule} ({selector:?}): {reason}")]
    InvalidSelector {
        rule: &'static str,
        selector: String,
        reason: String,
    },

    #[error("Invalid label filter: offset {offset} must be smaller than stride {stride}")]
    InvalidLabelFilter { stride: usize, offset: usize },
}

/// Markup matching rules for the GAC history pages
///
/// Kept as data so a change in the site's markup only needs a config edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorRules {
    /// Anchors on the history index that link to individual matches
    pub endings_anchor: String,
    /// Container holding the player's offense battles
    pub offense_container: String,
    /// One block per battle, either outcome
    pub battle_wrapper: String,
    /// Class present on wrappers of won battles
    pub win_marker_class: String,
    /// Rows listing the opposing squad inside a wrapper
    pub opponent_row: String,
    /// Elements whose text becomes a raw label
    pub opponent_label: String,
    /// Keep raw labels at positions `offset, offset + stride, ...`
    pub label_stride: usize,
    pub label_offset: usize,
}

impl Default for SelectorRules {
    fn default() -> Self {
        Self {
            endings_anchor: "a.d-block.brighten-on-hover.text-white".to_string(),
            offense_container: "div#battles-attack".to_string(),
            battle_wrapper: ".paper.mt-2.paper--positive, .paper.mt-2.paper--negative".to_string(),
            win_marker_class: "paper--positive".to_string(),
            opponent_row: ".d-flex.col-gap-2.align-items-center.justify-content-md-center.justify-content-lg-start"
                .to_string(),
            opponent_label: "div:not([class])".to_string(),
            label_stride: 2,
            label_offset: 1,
        }
    }
}

/// Compile one CSS selector, tagging failures with the rule name
pub fn compile_selector(rule: &'static str, selector: &str) -> Result<Selector, ExtractorError> {
    Selector::parse(selector).map_err(|e| ExtractorError::InvalidSelector {
        rule,
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Strategy for turning a match page into win/loss opponent labels
pub trait BattleExtractor: Send + Sync {
    fn extract(&self, html: &str) -> ExtractedBattles;
}

/// Extracts offense battles using compiled [`SelectorRules`]
#[derive(Debug, Clone)]
pub struct OffenseExtractor {
    container: Selector,
    wrapper: Selector,
    row: Selector,
    label: Selector,
    win_marker_class: String,
    label_stride: usize,
    label_offset: usize,
}

impl OffenseExtractor {
    pub fn new(rules: &SelectorRules) -> Result<Self, ExtractorError> {
        if rules.label_stride == 0 || rules.label_offset >= rules.label_stride {
            return Err(ExtractorError::InvalidLabelFilter {
                stride: rules.label_stride,
                offset: rules.label_offset,
            });
        }

        Ok(Self {
            container: compile_selector("offense_container", &rules.offense_container)?,
            wrapper: compile_selector("battle_wrapper", &rules.battle_wrapper)?,
            row: compile_selector("opponent_row", &rules.opponent_row)?,
            label: compile_selector("opponent_label", &rules.opponent_label)?,
            win_marker_class: rules.win_marker_class.clone(),
            label_stride: rules.label_stride,
            label_offset: rules.label_offset,
        })
    }

    fn outcome_of(&self, wrapper: &ElementRef) -> BattleOutcome {
        if wrapper
            .value()
            .has_class(&self.win_marker_class, CaseSensitivity::CaseSensitive)
        {
            BattleOutcome::Win
        } else {
            BattleOutcome::Loss
        }
    }

    /// Non-empty label texts of one wrapper, in document order
    fn raw_labels(&self, wrapper: &ElementRef) -> Vec<String> {
        wrapper
            .select(&self.row)
            .flat_map(|row| row.select(&self.label).map(|el| stripped_text(&el)))
            .filter(|text| !text.is_empty())
            .collect()
    }
}

impl Default for OffenseExtractor {
    fn default() -> Self {
        // The built-in rules are known to compile
        Self::new(&SelectorRules::default()).unwrap_or_else(|e| unreachable!("{e}"))
    }
}

impl BattleExtractor for OffenseExtractor {
    fn extract(&self, html: &str) -> ExtractedBattles {
        let document = Html::parse_document(html);
        let mut battles = ExtractedBattles::default();

        let Some(container) = document.select(&self.container).next() else {
            return battles;
        };

        for wrapper in container.select(&self.wrapper) {
            let outcome = self.outcome_of(&wrapper);
            let raw = self.raw_labels(&wrapper);
            battles.push_all(
                outcome,
                keep_positional(raw, self.label_stride, self.label_offset),
            );
        }

        tracing::trace!(
            wins = battles.wins.len(),
            losses = battles.losses.len(),
            "extracted offense battles"
        );

        battles
    }
}

/// Text of an element with every text node trimmed, joined without separator
pub fn stripped_text(element: &ElementRef) -> String {
    element.text().map(str::trim).collect()
}

/// Keep the items at positions `offset, offset + stride, offset + 2 * stride, ...`
///
/// Opponent rows interleave a header text with each name, so the default
/// (stride 2, offset 1) keeps the odd positions.
pub fn keep_positional<T>(items: Vec<T>, stride: usize, offset: usize) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter(|(i, _)| stride > 0 && i % stride == offset)
        .map(|(_, item)| item)
        .collect()
}
