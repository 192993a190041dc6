// Matcher module: finds the reference catalog price for a vehicle.

pub mod scoring;

use crate::catalog::ReferenceCatalog;
use crate::model::{PriceSource, VehicleDescriptor};
use crate::normalizer::{contains_term, fold_text};
use crate::parser::vocab::{brand_by_name, BRAND_FALLBACK_KEYWORDS};
use scoring::{MIN_SCORE, SearchContext, SearchTerm};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    Scored,
    Fallback,
}

/// The catalog entry chosen for a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchOutcome {
    pub name: String,
    pub price: u64,
    pub source: PriceSource,
    pub score: f64,
    pub phase: MatchPhase,
}

type CacheKey = (String, Option<String>, Option<String>, Option<i32>);

/// Two-phase catalog search with a memo of previous lookups.
///
/// The cache is only valid for one catalog; callers clear it whenever the
/// catalog changes (the pipeline does so at the start of every batch).
#[derive(Debug, Default)]
pub struct PriceMatcher {
    cache: HashMap<CacheKey, Option<MatchOutcome>>,
}

impl PriceMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Market price and its source, or `(None, None)` when nothing matches.
    pub fn find_price(
        &mut self,
        descriptor: &VehicleDescriptor,
        catalog: &ReferenceCatalog,
        raw_brand_type: Option<&str>,
    ) -> (Option<u64>, Option<PriceSource>) {
        match self.lookup(descriptor, catalog, raw_brand_type) {
            Some(outcome) => (Some(outcome.price), Some(outcome.source)),
            None => (None, None),
        }
    }

    pub fn lookup(
        &mut self,
        descriptor: &VehicleDescriptor,
        catalog: &ReferenceCatalog,
        raw_brand_type: Option<&str>,
    ) -> Option<MatchOutcome> {
        if catalog.is_empty() {
            return None;
        }
        let key = (
            raw_brand_type.map(fold_text).unwrap_or_default(),
            descriptor.brand.clone(),
            descriptor.model_hint.clone(),
            descriptor.year,
        );
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }
        let outcome = search(descriptor, catalog, raw_brand_type);
        self.cache.insert(key, outcome.clone());
        outcome
    }
}

fn search(
    descriptor: &VehicleDescriptor,
    catalog: &ReferenceCatalog,
    raw_brand_type: Option<&str>,
) -> Option<MatchOutcome> {
    let raw = raw_brand_type.map(fold_text).filter(|r| !r.is_empty());
    let terms = search_terms(descriptor, raw.as_deref());
    let ctx = SearchContext::new(&terms, descriptor.year);

    if let Some(outcome) = scored_search(&terms, &ctx, catalog) {
        return Some(outcome);
    }
    let outcome = fallback_search(descriptor.brand.as_deref(), raw.as_deref(), &ctx, catalog);
    if outcome.is_none() {
        debug!(brand = ?descriptor.brand, raw = ?raw, "no catalog entry matched");
    }
    outcome
}

fn search_terms(descriptor: &VehicleDescriptor, raw: Option<&str>) -> Vec<SearchTerm> {
    let brand = descriptor.brand.as_deref().map(fold_text);
    let with_hint = match (&brand, descriptor.model_hint.as_deref()) {
        (Some(b), Some(hint)) => Some(format!("{b} {}", fold_text(hint))),
        _ => None,
    };

    let mut texts: Vec<String> = Vec::new();
    for text in [raw.map(str::to_string), brand, with_hint].into_iter().flatten() {
        if !text.is_empty() && !texts.contains(&text) {
            texts.push(text);
        }
    }
    texts.iter().map(|t| SearchTerm::new(t)).collect()
}

fn scored_search(terms: &[SearchTerm], ctx: &SearchContext, catalog: &ReferenceCatalog) -> Option<MatchOutcome> {
    if terms.is_empty() {
        return None;
    }
    let mut best: Option<MatchOutcome> = None;
    let mut best_score = MIN_SCORE;

    for (entry, folded) in catalog.iter_folded() {
        if ctx.implausible_price(entry.price) {
            continue;
        }
        if ctx.disqualifies(folded) {
            debug!(candidate = %entry.name, "disqualified by model code");
            continue;
        }
        let score = terms
            .iter()
            .map(|term| scoring::score(term, ctx, entry, folded))
            .fold(0.0, f64::max);
        if score > best_score {
            best_score = score;
            best = Some(MatchOutcome {
                name: entry.name.clone(),
                price: entry.price,
                source: entry.source,
                score,
                phase: MatchPhase::Scored,
            });
        }
    }

    if let Some(outcome) = &best {
        debug!(name = %outcome.name, score = outcome.score, "scored catalog match");
    }
    best
}

/// Keyword search over a wider alias table, used when scoring finds nothing.
fn fallback_search(
    brand: Option<&str>,
    raw: Option<&str>,
    ctx: &SearchContext,
    catalog: &ReferenceCatalog,
) -> Option<MatchOutcome> {
    let keywords = fallback_keywords(brand, raw)?;
    let year = ctx.year.map(|y| y.to_string());

    let mut first = None;
    for (entry, folded) in catalog.iter_folded() {
        if ctx.implausible_price(entry.price) || ctx.disqualifies(folded) {
            continue;
        }
        if !keywords.iter().any(|k| contains_term(folded, k)) {
            continue;
        }
        if year.as_deref().is_some_and(|y| folded.contains(y)) {
            first = Some(entry);
            break;
        }
        first.get_or_insert(entry);
    }

    first.map(|entry| {
        debug!(name = %entry.name, "fallback catalog match");
        MatchOutcome {
            name: entry.name.clone(),
            price: entry.price,
            source: entry.source,
            score: 0.0,
            phase: MatchPhase::Fallback,
        }
    })
}

fn fallback_keywords(brand: Option<&str>, raw: Option<&str>) -> Option<&'static [&'static str]> {
    if let Some(brand) = brand {
        if let Some((_, keywords)) = BRAND_FALLBACK_KEYWORDS.iter().find(|(name, _)| *name == brand) {
            return Some(*keywords);
        }
        // Brands without a wider alias table still search by their own keywords.
        if let Some(entry) = brand_by_name(brand) {
            return Some(entry.keywords);
        }
    }
    let raw = raw?;
    BRAND_FALLBACK_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| contains_term(raw, k)))
        .map(|(_, keywords)| *keywords)
}
