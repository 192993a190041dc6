// Condition issue detection from status columns and free text
use crate::model::{present, AdRecord, IssueSet, IssueTag};
use crate::normalizer::fold_text;
use once_cell::sync::Lazy;
use regex::Regex;

static PART_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|\s)([0-9]+|یک|دو|سه|چهار|پنج|شش|هفت|هشت)\s*(?:ناحیه|قطعه|تیکه|تکه|لکه|جای|جا)(?:\s|$|،|,)")
        .unwrap()
});

const NEGATION_PREFIXES: &[&str] = &["بدون", "بی", "فاقد", "هیچ"];
const NEGATION_SUFFIXES: &[&str] = &["ندارد", "نداره", "نخورده", "نیست", "ندیده", "نشده"];

const COLOURS: &[&str] = &[
    "سفید", "مشکی", "نقره", "نقره ای", "خاکستری", "آبی", "قرمز", "سبز", "زرد", "قهوه ای", "بژ",
    "سرمه ای", "نوک مدادی", "کرم", "بنفش", "طلایی", "مسی", "یشمی", "عنابی", "دلفینی", "اطلسی",
    "بادمجانی", "گیلاسی", "تیتانیوم",
];

/// Words after `رنگ` that mean the factory paint is intact.
const ORIGINAL_PAINT: &[&str] = &["فابریک", "اصلی", "کارخانه", "کارخونه", "خالی"];

const HEALTHY_PREFIXES: &[&str] = &["سالم", "بدون", "بی ", "عالی", "تمیز", "در حد صفر"];
const UNDETERMINED: &[&str] = &["تعیین نشده", "نامشخص", "اعلام نشده"];

const BODY_HEALTHY: &[&str] = &[
    "سالم",
    "سالم و بی خط و خش",
    "سالم و بدون خط و خش",
    "بی خط و خش",
    "بدون خط و خش",
    "عالی",
    "بدون رنگ",
    "بی رنگ",
    "سالم و بی رنگ",
    "سالم و بدون رنگ",
    "فابریک",
    "تمام فابریک",
    "رنگ فابریک",
    "رنگ اصلی",
];
const CHASSIS_HEALTHY: &[&str] = &[
    "سالم",
    "سالم و پلمپ",
    "پلمپ",
    "پلمپ کارخانه",
    "سالم و پلمپ کارخانه",
    "بدون مشکل",
    "عالی",
];
const MECHANICAL_HEALTHY: &[&str] = &["سالم", "بدون مشکل", "سالم و بدون مشکل", "عالی", "بی نقص", "در حد صفر"];

const FULL_PAINT: &[&str] = &["تمام رنگ", "کامل رنگ", "فول رنگ", "دوررنگ", "دور رنگ", "رنگ کامل", "تمام بدنه رنگ"];
const ROOF_PAINT: &[&str] = &["رنگ سقف", "سقف رنگ"];
const PILLAR_PAINT: &[&str] = &["رنگ ستون", "ستون رنگ", "ستون ها رنگ"];
const PAINT_WORDS: &[&str] = &["رنگ", "نقاشی"];
const PANELS: &[&str] = &["گلگیر", "درب", "کاپوت", "صندوق", "سپر", "رکاب"];
const SCRATCHES: &[&str] = &["خط و خش", "خط وخش", "خراش"];

const BODY_DAMAGE: &[&str] = &["تصادف", "ضربه", "آسیب"];
const CHASSIS_DAMAGE: &[&str] = &["آسیب", "ضربه", "تصادف", "خسارت", "جوش", "تعمیر", "تعویض"];
const ENGINE_DEFECTS: &[&str] = &["تعمیر", "اورهال", "بازسازی", "تعویض", "معیوب", "خراب", "مشکل دار", "نیاز به"];
const GEARBOX_DEFECTS: &[&str] = &["تعمیر", "تعویض", "خراب", "معیوب", "اورهال", "مشکل", "صدا"];

const TEXT_ACCIDENT: &[&str] = &["تصادف", "ضربه خورده", "ضربه دیده", "خسارت", "آسیب دیده", "چپ کرده", "واژگون"];
const TEXT_CHASSIS: &[&str] = &["شاسی آسیب", "شاسی ضربه", "شاسی تعمیر", "شاسی رنگ", "رنگ شاسی", "شاسی جوش"];
const TEXT_ROOF_PILLAR: &[&str] = &["تعمیر سقف", "سقف تعمیر", "تعمیر ستون", "ستون تعمیر", "ستون جوش", "سقف جوش"];
const TEXT_REPLACEMENT: &[&str] = &[
    "تعویض گلگیر", "گلگیر تعویض", "تعویض درب", "درب تعویض", "تعویض کاپوت", "کاپوت تعویض",
    "تعویض صندوق", "صندوق تعویض", "قطعه تعویض",
];
const TEXT_ENGINE: &[&str] = &[
    "تعمیر موتور", "موتور تعمیر", "اورهال موتور", "موتور اورهال", "موتور خراب", "موتور معیوب",
    "تعویض موتور", "موتور تعویض", "موتور بازسازی", "مشکل موتور", "موتور مشکل", "روغن ریزی",
    "روغن سوزی", "دود میکند", "دود می کند", "صدای موتور", "موتور صدا",
];
const TEXT_GEARBOX: &[&str] = &[
    "تعمیر گیربکس", "گیربکس تعمیر", "گیربکس خراب", "گیربکس معیوب", "مشکل گیربکس", "گیربکس مشکل",
    "تعویض گیربکس", "گیربکس تعویض", "صدای گیربکس", "گیربکس صدا", "دنده سخت", "کلاچ خراب",
    "تعویض کلاچ", "کلاچ تعویض",
];
const TEXT_SUSPENSION: &[&str] = &[
    "جلوبندی خراب", "جلوبندی مشکل", "جلوبندی صدا", "جلو بندی صدا", "جلوبندی نیاز", "کمک فنر خراب",
    "کمک فنر تعویض", "کمک ها خراب", "تعلیق مشکل", "سیبک خراب",
];
const TEXT_ELECTRICAL: &[&str] = &[
    "مشکل برق", "برق مشکل", "ایراد برقی", "مشکل برقی", "سیم کشی", "باتری خراب", "دینام خراب", "استارت خراب",
];
const TEXT_OPTIONS: &[&str] = &[
    "آپشن خراب", "کولر خراب", "کولر ایراد", "کولر کار نمیکند", "شیشه بالابر خراب", "سانروف خراب",
    "ضبط خراب", "مانیتور خراب", "ایربگ ایراد",
];
const TEXT_TIRES: &[&str] = &[
    "لاستیک کهنه", "لاستیک ها کهنه", "لاستیک فرسوده", "لاستیک قدیمی", "لاستیک نیاز به تعویض",
    "لاستیک ها نیاز", "تایر کهنه",
];
const TEXT_INTERIOR: &[&str] = &[
    "صندلی پاره", "صندلی ها پاره", "داشبورد ترک", "داشبورد شکسته", "تودوزی پاره", "تودوزی کهنه",
    "موکت کثیف", "رودری پاره",
];
const TEXT_HIGH_MILEAGE: &[&str] = &["کارکرد بالا", "کارکرد زیاد", "پرکار", "کیلومتر بالا"];

const URGENT_SALE: &[&str] = &[
    "پول لازم", "فروش فوری", "نیاز مالی", "زیر قیمت", "فوری فروش", "نقدی فوری", "ضروری فروش",
    "سریع فروش", "گیر پولم", "عجله دارم", "فوری نقد", "قیمت پایین", "ارزان فروش",
];

/// Free-text condition columns of one ad.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionFields<'a> {
    pub engine: Option<&'a str>,
    pub chassis: Option<&'a str>,
    pub body: Option<&'a str>,
    pub gearbox: Option<&'a str>,
}

impl<'a> ConditionFields<'a> {
    pub fn from_ad(ad: &'a AdRecord) -> Self {
        Self {
            engine: present(&ad.engine_status),
            chassis: present(&ad.chassis_status),
            body: present(&ad.body_status),
            gearbox: present(&ad.gearbox_status),
        }
    }
}

/// What a single status column says. `Unknown` never produces a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusReading {
    Healthy,
    Defect(IssueTag),
    Unknown,
}

impl StatusReading {
    pub fn is_recognized(&self) -> bool {
        !matches!(self, StatusReading::Unknown)
    }

    fn tag(&self) -> Option<IssueTag> {
        match self {
            StatusReading::Defect(tag) => Some(*tag),
            _ => None,
        }
    }
}

pub struct IssueDetector;

impl IssueDetector {
    pub fn new() -> Self {
        Self
    }

    /// Tags from the status columns plus free text.
    ///
    /// A recognized body status is authoritative for paint and scratches;
    /// accident and mechanical tags add up from every source.
    pub fn detect(&self, title: &str, description: &str, fields: &ConditionFields) -> IssueSet {
        let text = fold_text(&format!("{title} {description}"));
        let mut issues = IssueSet::new();

        let body = fields.body.map_or(StatusReading::Unknown, read_body);
        let readings = [
            body,
            fields.chassis.map_or(StatusReading::Unknown, read_chassis),
            fields.engine.map_or(StatusReading::Unknown, read_engine),
            fields.gearbox.map_or(StatusReading::Unknown, read_gearbox),
        ];
        for tag in readings.iter().filter_map(StatusReading::tag) {
            issues.insert(tag);
        }

        if !body.is_recognized() {
            if let Some(paint) = paint_from_text(&text) {
                issues.insert(paint);
            }
            if any_mention(&text, SCRATCHES) {
                issues.insert(IssueTag::MinorScratches);
            }
        }

        let text_rules: [(&[&str], IssueTag); 12] = [
            (TEXT_ACCIDENT, IssueTag::AccidentHistory),
            (TEXT_CHASSIS, IssueTag::PaintChassisDamage),
            (TEXT_ROOF_PILLAR, IssueTag::RoofPillarRepair),
            (TEXT_REPLACEMENT, IssueTag::BodyPartReplacement),
            (TEXT_ENGINE, IssueTag::EngineOverhaul),
            (TEXT_GEARBOX, IssueTag::GearboxRepair),
            (TEXT_SUSPENSION, IssueTag::SuspensionDefect),
            (TEXT_ELECTRICAL, IssueTag::ElectricalIssues),
            (TEXT_OPTIONS, IssueTag::OptionDefect),
            (TEXT_TIRES, IssueTag::OldTires),
            (TEXT_INTERIOR, IssueTag::InteriorDamage),
            (TEXT_HIGH_MILEAGE, IssueTag::HighMileage),
        ];
        for (keywords, tag) in text_rules {
            if any_mention(&text, keywords) {
                issues.insert(tag);
            }
        }

        issues
    }

    pub fn detect_for_ad(&self, ad: &AdRecord) -> IssueSet {
        self.detect(&ad.title, ad.description_text(), &ConditionFields::from_ad(ad))
    }
}

impl Default for IssueDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// True when the text carries a hurried-sale phrase.
pub fn detect_urgent_sale(text: &str) -> bool {
    let folded = fold_text(text);
    URGENT_SALE.iter().any(|k| folded.contains(k))
}

pub fn read_body(status: &str) -> StatusReading {
    read_status(status, BODY_HEALTHY, body_defect)
}

pub fn read_chassis(status: &str) -> StatusReading {
    read_status(status, CHASSIS_HEALTHY, |f| {
        if any_paint_mention(f) {
            Some(IssueTag::PaintChassisDamage)
        } else if any_mention(f, CHASSIS_DAMAGE) {
            Some(IssueTag::AccidentHistory)
        } else {
            None
        }
    })
}

pub fn read_engine(status: &str) -> StatusReading {
    read_status(status, MECHANICAL_HEALTHY, |f| {
        any_mention(f, ENGINE_DEFECTS).then_some(IssueTag::EngineOverhaul)
    })
}

pub fn read_gearbox(status: &str) -> StatusReading {
    read_status(status, MECHANICAL_HEALTHY, |f| {
        any_mention(f, GEARBOX_DEFECTS).then_some(IssueTag::GearboxRepair)
    })
}

fn read_status(
    status: &str,
    healthy: &[&str],
    defect: impl Fn(&str) -> Option<IssueTag>,
) -> StatusReading {
    let folded = fold_text(status);
    if folded.is_empty() || UNDETERMINED.iter().any(|u| folded.contains(u)) {
        return StatusReading::Unknown;
    }
    if healthy.contains(&folded.as_str()) {
        return StatusReading::Healthy;
    }
    if let Some(tag) = defect(&folded) {
        return StatusReading::Defect(tag);
    }
    if HEALTHY_PREFIXES.iter().any(|p| folded.starts_with(p)) {
        StatusReading::Healthy
    } else {
        StatusReading::Unknown
    }
}

fn body_defect(folded: &str) -> Option<IssueTag> {
    if let Some(paint) = paint_from_text(folded) {
        return Some(paint);
    }
    if any_mention(folded, &["تعویض"]) {
        Some(IssueTag::BodyPartReplacement)
    } else if any_mention(folded, BODY_DAMAGE) {
        Some(IssueTag::AccidentHistory)
    } else if any_mention(folded, SCRATCHES) || any_mention(folded, &["صافکاری"]) {
        Some(IssueTag::MinorScratches)
    } else {
        None
    }
}

/// Paint tag by severity: full repaint, roof, pillar, then part count.
fn paint_from_text(folded: &str) -> Option<IssueTag> {
    let full_paint = FULL_PAINT.iter().any(|k| {
        occurrences(folded, k).any(|(before, after)| !is_negated(before, after) && !is_original_paint(after))
    });
    if full_paint {
        return Some(IssueTag::FullPaint);
    }
    if !any_paint_mention(folded) {
        return None;
    }
    if any_mention(folded, ROOF_PAINT) {
        return Some(IssueTag::RoofPaint);
    }
    if any_mention(folded, PILLAR_PAINT) {
        return Some(IssueTag::PillarPaint);
    }
    let parts = part_count(folded)
        .unwrap_or_else(|| PANELS.iter().filter(|p| mentions(folded, p)).count() as u32)
        .max(1);
    IssueTag::paint_for_parts(parts)
}

fn part_count(folded: &str) -> Option<u32> {
    PART_COUNT
        .captures_iter(folded)
        .filter_map(|cap| number_word(&cap[1]))
        .max()
}

fn number_word(word: &str) -> Option<u32> {
    match word {
        "یک" => Some(1),
        "دو" => Some(2),
        "سه" => Some(3),
        "چهار" => Some(4),
        "پنج" => Some(5),
        "شش" => Some(6),
        "هفت" => Some(7),
        "هشت" => Some(8),
        digits => digits.parse().ok().filter(|n| *n > 0 && *n < 20),
    }
}

fn any_mention(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| mentions(text, k))
}

fn any_paint_mention(text: &str) -> bool {
    PAINT_WORDS.iter().any(|k| {
        occurrences(text, k).any(|(before, after)| {
            !is_negated(before, after) && !is_colour_reference(before, after) && !is_original_paint(after)
        })
    })
}

/// At least one occurrence of `keyword` that is not negated.
fn mentions(text: &str, keyword: &str) -> bool {
    occurrences(text, keyword).any(|(before, after)| !is_negated(before, after))
}

fn occurrences<'t>(text: &'t str, keyword: &'t str) -> impl Iterator<Item = (&'t str, &'t str)> + 't {
    text.match_indices(keyword)
        .map(move |(i, m)| (&text[..i], &text[i + m.len()..]))
}

/// `بدون رنگ`, `بیرنگ`, `بدون رنگ و تصادف`, `تصادفی ندارد`.
fn is_negated(before: &str, after: &str) -> bool {
    let glued = before.rsplit(char::is_whitespace).next().unwrap_or("");
    if glued.is_empty() {
        let mut words = before.split_whitespace().rev();
        let mut hops = 0;
        while let Some(word) = words.next() {
            if NEGATION_PREFIXES.contains(&word) {
                return true;
            }
            // walk back over "x و y و" lists
            if word == "و" && hops < 3 {
                hops += 1;
                words.next();
                continue;
            }
            break;
        }
    } else if NEGATION_PREFIXES.contains(&glued) {
        return true;
    }

    let tail = after.trim_start_matches(|c: char| !c.is_whitespace());
    let next = tail.split_whitespace().next().unwrap_or("");
    NEGATION_SUFFIXES.contains(&next)
}

/// Text after a keyword, or `None` when the keyword is glued to more letters.
fn following_text(after: &str) -> Option<&str> {
    let whole_word = after.is_empty() || after.starts_with(|c: char| c.is_whitespace() || c == ':');
    whole_word.then(|| after.trim_start_matches(|c: char| c.is_whitespace() || c == ':'))
}

/// `رنگ سفید` or `سفید رنگ` names the car's colour, not a repaint.
fn is_colour_reference(before: &str, after: &str) -> bool {
    let Some(next) = following_text(after) else {
        return false;
    };
    let prev = before.trim_end();
    COLOURS
        .iter()
        .any(|colour| next.starts_with(colour) || prev.ends_with(colour))
}

/// `رنگ فابریک`, `رنگ اصلی`.
fn is_original_paint(after: &str) -> bool {
    following_text(after).is_some_and(|next| ORIGINAL_PAINT.iter().any(|w| next.starts_with(w)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(title: &str, description: &str, fields: ConditionFields) -> IssueSet {
        IssueDetector::new().detect(title, description, &fields)
    }

    #[test]
    fn healthy_body_suppresses_text_paint() {
        let fields = ConditionFields {
            body: Some("سالم"),
            ..Default::default()
        };
        let issues = detect("پژو ۲۰۷", "یک لکه رنگ روی گلگیر دارد", fields);
        assert_eq!(issues.paint(), None);
    }

    #[test]
    fn body_status_vocabulary() {
        assert_eq!(read_body("سالم و بی‌خط و خش"), StatusReading::Healthy);
        assert_eq!(read_body("رنگ‌شدگی در ۲ ناحیه"), StatusReading::Defect(IssueTag::PaintTwoParts));
        assert_eq!(read_body("رنگ شدگی در چهار ناحیه"), StatusReading::Defect(IssueTag::PaintFourPlus));
        assert_eq!(read_body("دوررنگ"), StatusReading::Defect(IssueTag::FullPaint));
        assert_eq!(read_body("تمام‌رنگ"), StatusReading::Defect(IssueTag::FullPaint));
        assert_eq!(read_body("خط و خش جزیی"), StatusReading::Defect(IssueTag::MinorScratches));
        assert_eq!(read_body("صافکاری بدون رنگ"), StatusReading::Defect(IssueTag::MinorScratches));
        assert_eq!(read_body("تصادفی"), StatusReading::Defect(IssueTag::AccidentHistory));
        assert_eq!(read_body("؟"), StatusReading::Unknown);
    }

    #[test]
    fn chassis_and_engine_states() {
        assert_eq!(read_chassis("سالم و پلمپ"), StatusReading::Healthy);
        assert_eq!(read_chassis("تعیین نشده"), StatusReading::Unknown);
        assert_eq!(read_chassis("ضربه‌خورده"), StatusReading::Defect(IssueTag::AccidentHistory));
        assert_eq!(read_chassis("رنگ شده و ضربه خورده"), StatusReading::Defect(IssueTag::PaintChassisDamage));
        assert_eq!(read_engine("نیاز به تعمیر"), StatusReading::Defect(IssueTag::EngineOverhaul));
        assert_eq!(read_engine("بدون مشکل"), StatusReading::Healthy);
        assert_eq!(read_gearbox("سالم"), StatusReading::Healthy);
        assert_eq!(read_gearbox("گیربکس تعمیر شده"), StatusReading::Defect(IssueTag::GearboxRepair));
    }

    #[test]
    fn unknown_status_emits_nothing() {
        let fields = ConditionFields {
            engine: Some("نامشخص"),
            chassis: Some("تعیین نشده"),
            body: Some("---"),
            gearbox: None,
        };
        assert!(detect("سمند", "", fields).is_empty());
    }

    #[test]
    fn text_paint_by_severity() {
        let none = ConditionFields::default();
        assert_eq!(detect("", "ماشین تمام رنگ است", none).paint(), Some(IssueTag::FullPaint));
        assert_eq!(detect("", "سقف رنگ شده", none).paint(), Some(IssueTag::RoofPaint));
        assert_eq!(detect("", "سه جا رنگ دارد", none).paint(), Some(IssueTag::PaintThreeParts));
        assert_eq!(detect("", "گلگیر و درب رنگ شده", none).paint(), Some(IssueTag::PaintTwoParts));
        assert_eq!(detect("", "رنگ سفید، بدون رنگ", none).paint(), None);
        assert_eq!(detect("", "بیرنگ و بی تصادف", none), IssueSet::new());
    }

    #[test]
    fn factory_paint_is_not_a_repaint() {
        let none = ConditionFields::default();
        assert!(detect("", "بدنه رنگ فابریک", none).is_empty());
        assert!(detect("", "رنگ اصلی و پلمپ", none).is_empty());
        assert!(detect("", "بدنه رنگ خالی", none).is_empty());
        assert_eq!(detect("", "تمام رنگ فابریک", none).paint(), None);
        assert_eq!(
            detect("", "رنگ فابریک، فقط گلگیر رنگ", none).paint(),
            Some(IssueTag::PaintOnePart)
        );

        assert_eq!(read_body("فابریک"), StatusReading::Healthy);
        assert_eq!(read_body("رنگ فابریک"), StatusReading::Healthy);
        assert_eq!(read_body("رنگ اصلی"), StatusReading::Healthy);
    }

    #[test]
    fn accident_and_mechanical_tags_are_additive() {
        let fields = ConditionFields {
            body: Some("سالم"),
            engine: Some("سالم"),
            ..Default::default()
        };
        let issues = detect("", "تصادف جزئی داشته، گیربکس صدا میده و روغن ریزی دارد", fields);
        assert!(issues.contains(IssueTag::AccidentHistory));
        assert!(issues.contains(IssueTag::GearboxRepair));
        assert!(issues.contains(IssueTag::EngineOverhaul));
        assert_eq!(issues.paint(), None);
    }

    #[test]
    fn negated_mentions_are_ignored() {
        let none = ConditionFields::default();
        assert!(detect("", "بدون رنگ و تصادف", none).is_empty());
        assert!(detect("", "تصادفی ندارد", none).is_empty());
    }

    #[test]
    fn urgent_sale_phrases() {
        assert!(detect_urgent_sale("به دلیل نیاز مالی فروش فوری"));
        assert!(!detect_urgent_sale("فروش به شرط کارشناسی"));
    }
}
