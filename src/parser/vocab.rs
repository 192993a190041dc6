// Brand and model vocabularies. Keywords are written in folded form
// (see `normalizer::fold_text`): lowercase, no ZWNJ, ASCII digits.

#[derive(Debug)]
pub struct BrandEntry {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

const fn brand(name: &'static str, keywords: &'static [&'static str]) -> BrandEntry {
    BrandEntry { name, keywords }
}

/// Brand detection table. Order matters: the first brand with a matching
/// keyword wins, so earlier entries take priority on ambiguous text.
pub static BRANDS: &[BrandEntry] = &[
    brand("پژو", &["پژو", "peugeot"]),
    brand("سمند", &["سمند", "samand"]),
    brand("پراید", &["پراید", "pride"]),
    brand("تیبا", &["تیبا", "tiba"]),
    brand("دنا", &["دنا", "dena"]),
    brand("رانا", &["رانا", "rana"]),
    brand("سایپا", &["سایپا", "saipa"]),
    brand("کوییک", &["کوییک", "کوئیک"]),
    brand("آریو", &["آریو", "ario"]),
    brand("شاهین", &["شاهین", "shahin"]),
    brand("تارا", &["تارا", "tara"]),
    brand("ساینا", &["ساینا", "saina"]),
    brand("تویوتا", &["تویوتا", "toyota"]),
    brand("هوندا", &["هوندا", "honda"]),
    brand("نیسان", &["نیسان", "nissan"]),
    brand("هیوندای", &["هیوندای", "هیوندا", "hyundai"]),
    brand("کیا", &["کیا", "kia"]),
    brand("مزدا", &["مزدا", "mazda"]),
    brand("میتسوبیشی", &["میتسوبیشی", "mitsubishi"]),
    brand("سوبارو", &["سوبارو", "subaru"]),
    brand("بی ام و", &["بی ام و", "bmw"]),
    brand("بنز", &["بنز", "مرسدس", "benz", "mercedes"]),
    brand("آئودی", &["آئودی", "آودی", "audi"]),
    brand("فولکس", &["فولکس", "volkswagen"]),
    brand("رنو", &["رنو", "renault"]),
    brand("سیتروئن", &["سیتروئن", "citroen"]),
    brand("پورشه", &["پورشه", "porsche"]),
    brand("فراری", &["فراری", "ferrari"]),
    brand("لامبورگینی", &["لامبورگینی", "lamborghini"]),
    brand("مازراتی", &["مازراتی", "maserati"]),
    brand("لکسوس", &["لکسوس", "lexus"]),
    brand("اینفینیتی", &["اینفینیتی", "infiniti"]),
    brand("اکورا", &["اکورا", "acura"]),
    brand("کادیلاک", &["کادیلاک", "cadillac"]),
    brand("لینکلن", &["لینکلن", "lincoln"]),
    brand("جگوار", &["جگوار", "jaguar"]),
    brand("لندرور", &["لندرور", "land rover", "range rover"]),
    brand("بنتلی", &["بنتلی", "bentley"]),
    brand("رولزرویس", &["رولزرویس", "رولز رویس", "rolls royce"]),
    brand("چری", &["چری", "chery"]),
    brand("ام وی ام", &["ام وی ام", "mvm"]),
    brand("هاوال", &["هاوال", "haval"]),
    brand("گک", &["گک", "gac"]),
    brand("چانگان", &["چانگان", "changan"]),
    brand("جیلی", &["جیلی", "geely"]),
    brand("بی وای دی", &["بی وای دی", "byd"]),
    brand("لیفان", &["لیفان", "lifan"]),
    brand("گریت وال", &["گریت وال", "great wall"]),
    brand("ولوو", &["ولوو", "volvo"]),
    brand("مینی", &["مینی", "mini cooper"]),
    brand("اسمارت", &["اسمارت", "smart fortwo"]),
    brand("تسلا", &["تسلا", "tesla"]),
    brand("آلفارومئو", &["آلفارومئو", "alfa romeo"]),
    brand("فیات", &["فیات", "fiat"]),
    brand("دوو", &["دوو", "daewoo"]),
];

/// Numeric model codes. Two different codes denote genuinely different
/// trims, which the matcher treats as a hard mismatch.
pub static MODEL_CODES: &[&str] = &[
    "206", "207", "405", "508", "2008", "3008", "5008", "111", "131", "132", "141", "151",
];

/// Engine/trim codes that are useful as a model hint but never disqualify.
pub static TRIM_CODES: &[&str] = &[
    "tu3", "tu5", "ef7", "xu7", "x22", "x33", "x55", "x60", "x70", "h2", "h6", "h9", "sd", "rd",
];

/// Wider alias table for the keyword fallback search: transliterations and
/// well-known model names per brand.
pub static BRAND_FALLBACK_KEYWORDS: &[(&str, &[&str])] = &[
    ("پژو", &["پژو", "peugeot", "206", "207", "405", "پارس"]),
    ("پراید", &["پراید", "pride", "131", "132"]),
    ("سمند", &["سمند", "samand"]),
    ("دنا", &["دنا", "dena"]),
    ("رانا", &["رانا", "rana"]),
    ("تیبا", &["تیبا", "tiba"]),
    ("ساینا", &["ساینا", "saina"]),
    ("آریو", &["آریو", "ario"]),
    ("شاهین", &["شاهین", "shahin"]),
    ("تارا", &["تارا", "tara"]),
    ("کوییک", &["کوییک", "کوئیک"]),
    ("تویوتا", &["تویوتا", "toyota", "کمری", "کرولا", "پرادو", "لندکروزر"]),
    ("هوندا", &["هوندا", "honda", "سیویک", "آکورد", "crv"]),
    ("نیسان", &["نیسان", "nissan", "قشقایی", "تینا", "سانی", "مورانو"]),
    ("هیوندای", &["هیوندای", "hyundai", "النترا", "سوناتا", "توسان", "آزرا"]),
    ("کیا", &["کیا", "kia", "سراتو", "اسپورتیج", "سورنتو", "پیکانتو"]),
    ("مزدا", &["مزدا", "mazda", "323", "626"]),
    ("میتسوبیشی", &["میتسوبیشی", "mitsubishi", "لنسر", "پاجرو", "اوتلندر"]),
    ("بی ام و", &["بی ام و", "bmw", "سری", "x1", "x3", "x5", "x6"]),
    ("بنز", &["بنز", "mercedes", "مرسدس", "کلاس"]),
    ("آئودی", &["آئودی", "audi", "a3", "a4", "a6", "q3", "q5", "q7"]),
    ("فولکس", &["فولکس", "volkswagen", "پاسات", "جتا", "گلف"]),
    ("رنو", &["رنو", "renault", "ساندرو", "تندر", "فلوئنس"]),
    ("پورشه", &["پورشه", "porsche", "911", "کاین", "ماکان"]),
    ("لکسوس", &["لکسوس", "lexus", "es", "ls", "rx", "lx", "nx"]),
    ("اینفینیتی", &["اینفینیتی", "infiniti", "g35", "fx35", "qx56"]),
    ("جگوار", &["جگوار", "jaguar", "xf", "xj", "f-pace"]),
    ("لندرور", &["لندرور", "land rover", "range rover", "discovery"]),
    ("چری", &["چری", "chery", "آریزو", "تیگو"]),
    ("ام وی ام", &["ام وی ام", "mvm", "x33", "x22", "315", "110"]),
    ("هاوال", &["هاوال", "haval", "h2", "h6", "h9"]),
    ("گک", &["گک", "gac", "گونو", "امزوم", "امکو"]),
    ("لیفان", &["لیفان", "lifan", "x60", "x70", "520", "620"]),
    ("گریت وال", &["گریت وال", "great wall", "ولکس", "وینگل"]),
    ("ولوو", &["ولوو", "volvo", "xc60", "xc90", "s60", "v40"]),
    ("مینی", &["مینی", "mini cooper", "countryman"]),
    ("فیات", &["فیات", "fiat", "پاندا", "پونتو"]),
    ("دوو", &["دوو", "daewoo", "سیلو", "نکسیا", "ماتیز"]),
];

/// Brands that the marketplace aggregator prices more accurately.
pub static AGGREGATOR_PREFERRED_BRANDS: &[&str] = &["پراید", "پژو", "peugeot", "pride"];

pub fn brand_by_name(name: &str) -> Option<&'static BrandEntry> {
    BRANDS.iter().find(|b| b.name == name)
}
