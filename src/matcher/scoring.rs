// Similarity scoring between a search term and a catalog name
use crate::model::{PriceSource, ReferenceCatalogEntry};
use crate::normalizer::{contains_term, digit_tokens, tokenize};
use crate::parser::vocab::{AGGREGATOR_PREFERRED_BRANDS, BRANDS, MODEL_CODES};
use std::collections::HashSet;

pub const MIN_SCORE: f64 = 0.4;
const RECENT_YEAR: i32 = 1400;

/// One folded search phrase with its precomputed tokens and model codes.
#[derive(Debug, Clone)]
pub struct SearchTerm {
    pub text: String,
    tokens: Vec<String>,
    codes: Vec<String>,
}

impl SearchTerm {
    pub fn new(folded: &str) -> Self {
        Self {
            text: folded.to_string(),
            tokens: tokenize(folded).into_iter().map(str::to_string).collect(),
            codes: model_codes(folded),
        }
    }
}

/// What the whole search knows about the vehicle, shared by every term.
#[derive(Debug, Clone, Default)]
pub struct SearchContext {
    pub year: Option<i32>,
    /// Model codes named by any term.
    pub codes: Vec<String>,
    pub wants_tu5: bool,
    pub aggregator_preferred: bool,
}

impl SearchContext {
    pub fn new(terms: &[SearchTerm], year: Option<i32>) -> Self {
        let mut codes: Vec<String> = Vec::new();
        for code in terms.iter().flat_map(|t| t.codes.iter()) {
            if !codes.contains(code) {
                codes.push(code.clone());
            }
        }
        Self {
            year,
            codes,
            wants_tu5: terms.iter().any(|t| t.tokens.iter().any(|w| w == "tu5")),
            aggregator_preferred: terms
                .iter()
                .any(|t| AGGREGATOR_PREFERRED_BRANDS.iter().any(|b| t.text.contains(b))),
        }
    }

    /// Distinct model codes on both sides mean distinct trims. A TU5 engine
    /// only ships in the 207.
    pub fn disqualifies(&self, folded_name: &str) -> bool {
        let candidate = model_codes(folded_name);
        let code_clash = !self.codes.is_empty()
            && !candidate.is_empty()
            && !candidate.iter().any(|c| self.codes.contains(c));
        let tu5_clash = self.wants_tu5 && !candidate.iter().any(|c| c == "207");
        code_clash || tu5_clash
    }

    /// Old cars are never priced from a luxury-range catalog row.
    pub fn implausible_price(&self, price: u64) -> bool {
        self.year.is_some_and(|y| y < RECENT_YEAR) && price > 2_000_000_000
    }
}

fn model_codes(folded: &str) -> Vec<String> {
    digit_tokens(folded)
        .into_iter()
        .filter(|t| MODEL_CODES.contains(t))
        .map(str::to_string)
        .collect()
}

/// Additive similarity of `term` against one catalog entry.
pub fn score(term: &SearchTerm, ctx: &SearchContext, entry: &ReferenceCatalogEntry, folded_name: &str) -> f64 {
    let mut score = 0.0;
    let name_tokens: HashSet<&str> = tokenize(folded_name).into_iter().collect();

    if term.text == folded_name {
        score += 1.0;
    } else if folded_name.contains(&term.text) {
        let overlap = term
            .tokens
            .iter()
            .filter(|t| name_tokens.contains(t.as_str()))
            .count();
        score += if overlap as f64 >= term.tokens.len() as f64 * 0.8 {
            0.9
        } else {
            0.6
        };
    } else if term.text.contains(folded_name) {
        score += 0.5;
    }

    let brand_hit = BRANDS.iter().any(|b| {
        b.keywords.iter().any(|k| contains_term(&term.text, k))
            && b.keywords.iter().any(|k| contains_term(folded_name, k))
    });
    if brand_hit {
        score += 0.3;
    }

    let model_hit = term.codes.iter().any(|c| name_tokens.contains(c.as_str()));
    if model_hit {
        score += 0.4;
    }
    if brand_hit && model_hit {
        score += 0.5;
    }

    let common: HashSet<&str> = term
        .tokens
        .iter()
        .map(String::as_str)
        .filter(|t| name_tokens.contains(t))
        .collect();
    score += common.len() as f64 * 0.3;

    // Year and source only rank candidates the text already relates to.
    if score <= 0.0 {
        return 0.0;
    }

    if let Some(year) = ctx.year {
        if folded_name.contains(&year.to_string()) {
            score += 0.4;
        }
    }

    score + source_nudge(entry.source, ctx)
}

fn source_nudge(source: PriceSource, ctx: &SearchContext) -> f64 {
    let recent = ctx.year.is_some_and(|y| y >= RECENT_YEAR);
    match source {
        PriceSource::MarketplaceAggregator => {
            let mut nudge = if recent { 0.1 } else { 0.0 };
            if ctx.aggregator_preferred {
                nudge += 0.15;
            }
            nudge
        }
        PriceSource::MechanicNetwork if !recent => 0.1,
        PriceSource::MechanicNetwork => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, source: PriceSource) -> ReferenceCatalogEntry {
        ReferenceCatalogEntry {
            name: name.to_string(),
            price: 1,
            source,
        }
    }

    #[test]
    fn codes_are_whole_numbers() {
        assert_eq!(model_codes("پژو 207 مدل 1405"), vec!["207"]);
        assert!(model_codes("سال 1405").is_empty());
    }

    #[test]
    fn different_codes_disqualify() {
        let terms = [SearchTerm::new("peugeot 207 tu5")];
        let ctx = SearchContext::new(&terms, None);
        assert!(ctx.disqualifies("peugeot 508"));
        assert!(!ctx.disqualifies("peugeot 207 tu5"));
        // tu5 without a 207 in the candidate
        assert!(ctx.disqualifies("پژو پارس tu5"));
    }

    #[test]
    fn exact_match_outscores_partial() {
        let term = SearchTerm::new("کیا سراتو");
        let ctx = SearchContext::new(std::slice::from_ref(&term), Some(1395));
        let exact = score(&term, &ctx, &entry("کیا سراتو", PriceSource::MechanicNetwork), "کیا سراتو");
        let partial = score(&term, &ctx, &entry("کیا سراتو اتوماتیک", PriceSource::MechanicNetwork), "کیا سراتو اتوماتیک");
        let unrelated = score(&term, &ctx, &entry("تویوتا کمری", PriceSource::MechanicNetwork), "تویوتا کمری");
        assert!(exact > partial);
        assert!(partial > MIN_SCORE);
        assert_eq!(unrelated, 0.0);
    }

    #[test]
    fn shared_year_alone_is_not_a_match() {
        let term = SearchTerm::new("کیا");
        let ctx = SearchContext::new(std::slice::from_ref(&term), Some(1398));
        let s = score(&term, &ctx, &entry("سراتو 1398", PriceSource::MechanicNetwork), "سراتو 1398");
        assert_eq!(s, 0.0);
    }

    #[test]
    fn year_and_source_nudges() {
        let term = SearchTerm::new("سمند");
        let ctx = SearchContext::new(std::slice::from_ref(&term), Some(1402));
        let with_year = score(&term, &ctx, &entry("سمند 1402", PriceSource::MarketplaceAggregator), "سمند 1402");
        let without = score(&term, &ctx, &entry("سمند ال ایکس", PriceSource::MechanicNetwork), "سمند ال ایکس");
        assert!((with_year - without - 0.5).abs() < 1e-9);
    }

    #[test]
    fn old_cars_skip_expensive_rows() {
        let ctx = SearchContext {
            year: Some(1390),
            ..Default::default()
        };
        assert!(ctx.implausible_price(3_000_000_000));
        assert!(!ctx.implausible_price(900_000_000));
    }
}
