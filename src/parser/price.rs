// Price strings: catalog cells and ad prices, in toman
use crate::normalizer::{fold_text, strip_separators};
use once_cell::sync::Lazy;
use regex::Regex;

static AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]+(?:\.[0-9]+)?)\s*(میلیارد|billion|میلیون|million|هزار|thousand)?").unwrap()
});

/// `1.234.000.000`: dots used as thousands separators.
static DOT_GROUPED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[0-9]{1,3}(?:\.[0-9]{3}){2,}\b").unwrap());

/// A bare number below this is a price written in millions (`950` for 950M).
const MILLIONS_BELOW: f64 = 100_000.0;

const NEGOTIABLE: &[&str] = &["توافقی", "تماس", "call", "negotiable"];

fn unit_multiplier(unit: &str) -> f64 {
    match unit {
        "میلیارد" | "billion" => 1_000_000_000.0,
        "میلیون" | "million" => 1_000_000.0,
        "هزار" | "thousand" => 1_000.0,
        _ => 1.0,
    }
}

/// Parses a price such as `۱٬۲۵۰٬۰۰۰٬۰۰۰`, `1.5 میلیارد` or
/// `1 میلیارد و 200 میلیون`.
///
/// When the first amount carries a unit word, every following amount with a
/// unit is added to it. Otherwise the first plain number is the price and
/// anything after it (a second bound of a range, a phone number) is ignored.
/// A small plain number takes the unit of a later bound (`850 تا 900 میلیون`)
/// or is read as millions when no unit follows.
pub fn parse_price(text: &str) -> Option<u64> {
    let cleaned = strip_separators(&fold_text(text));
    let cleaned = DOT_GROUPED.replace_all(&cleaned, |caps: &regex::Captures| caps[0].replace('.', ""));
    let amounts: Vec<(f64, Option<&str>)> = AMOUNT
        .captures_iter(&cleaned)
        .filter_map(|cap| {
            let value: f64 = cap[1].parse().ok()?;
            Some((value, cap.get(2).map(|u| u.as_str())))
        })
        .collect();

    let (value, unit) = *amounts.first()?;
    let total = match unit {
        Some(unit) => {
            let rest: f64 = amounts[1..]
                .iter()
                .filter_map(|(v, u)| u.map(|u| v * unit_multiplier(u)))
                .sum();
            value * unit_multiplier(unit) + rest
        }
        None if value < MILLIONS_BELOW => {
            let later_unit = amounts[1..].iter().find_map(|(_, u)| *u);
            value * later_unit.map_or(1_000_000.0, unit_multiplier)
        }
        None => value,
    };

    let rounded = total.round();
    if rounded >= 1.0 && rounded < u64::MAX as f64 {
        Some(rounded as u64)
    } else {
        None
    }
}

/// Asking price of an ad. Negotiable listings (`توافقی`) have no price.
pub fn parse_ad_price(text: &str) -> Option<u64> {
    let folded = fold_text(text);
    if NEGOTIABLE.iter().any(|w| folded.contains(w)) {
        return None;
    }
    parse_price(&folded)
}
