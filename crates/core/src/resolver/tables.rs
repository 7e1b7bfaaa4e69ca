//! Static category and keyword tables.

use crate::chart::codes;

/// Logical category keys and the accounts they map to.
pub const CATEGORY_ACCOUNTS: &[(&str, &str)] = &[
    ("OFFICE_SUPPLIES", codes::OFFICE_SUPPLIES),
    ("SUPPLIES", codes::OFFICE_SUPPLIES),
    ("SOFTWARE", codes::SOFTWARE),
    ("SUBSCRIPTIONS", codes::SOFTWARE),
    ("HOSTING", codes::HOSTING),
    ("CLOUD", codes::HOSTING),
    ("UTILITIES", codes::UTILITIES),
    ("TELEPHONE", codes::TELEPHONE),
    ("INTERNET", codes::TELEPHONE),
    ("BANK_FEES", codes::BANK_FEES),
    ("PAYMENT_FEES", codes::BANK_FEES),
    ("TRAVEL", codes::TRAVEL),
    ("MEALS", codes::MEALS),
    ("RENT", codes::RENT),
    ("ADVERTISING", codes::ADVERTISING),
    ("MARKETING", codes::ADVERTISING),
    ("PROFESSIONAL_SERVICES", codes::PROFESSIONAL_SERVICES),
    ("LEGAL", codes::PROFESSIONAL_SERVICES),
    ("INSURANCE", codes::INSURANCE),
    ("INVENTORY", codes::INVENTORY),
    ("COST_OF_GOODS_SOLD", codes::COST_OF_GOODS_SOLD),
    ("DEPRECIATION", codes::DEPRECIATION_EXPENSE),
    ("GENERAL", codes::GENERAL_EXPENSE),
    ("OTHER", codes::GENERAL_EXPENSE),
];

/// Keywords and the category they imply, checked in order.
pub const KEYWORD_CATEGORIES: &[(&str, &str)] = &[
    ("paper", "OFFICE_SUPPLIES"),
    ("printer", "OFFICE_SUPPLIES"),
    ("toner", "OFFICE_SUPPLIES"),
    ("stationery", "OFFICE_SUPPLIES"),
    ("pens", "OFFICE_SUPPLIES"),
    ("staples", "OFFICE_SUPPLIES"),
    ("subscription", "SOFTWARE"),
    ("license", "SOFTWARE"),
    ("saas", "SOFTWARE"),
    ("github", "SOFTWARE"),
    ("slack", "SOFTWARE"),
    ("adobe", "SOFTWARE"),
    ("notion", "SOFTWARE"),
    ("figma", "SOFTWARE"),
    ("jetbrains", "SOFTWARE"),
    ("hotel", "TRAVEL"),
    ("flight", "TRAVEL"),
    ("airline", "TRAVEL"),
    ("airbnb", "TRAVEL"),
    ("uber", "TRAVEL"),
    ("lyft", "TRAVEL"),
    ("taxi", "TRAVEL"),
    ("train", "TRAVEL"),
    ("restaurant", "MEALS"),
    ("cafe", "MEALS"),
    ("coffee", "MEALS"),
    ("lunch", "MEALS"),
    ("dinner", "MEALS"),
    ("catering", "MEALS"),
    ("office space", "RENT"),
    ("lease", "RENT"),
    ("rent", "RENT"),
    ("google ads", "ADVERTISING"),
    ("facebook ads", "ADVERTISING"),
    ("advertising", "ADVERTISING"),
    ("marketing", "ADVERTISING"),
    ("lawyer", "PROFESSIONAL_SERVICES"),
    ("legal", "PROFESSIONAL_SERVICES"),
    ("accountant", "PROFESSIONAL_SERVICES"),
    ("bookkeeping", "PROFESSIONAL_SERVICES"),
    ("consulting", "PROFESSIONAL_SERVICES"),
    ("audit", "PROFESSIONAL_SERVICES"),
    ("insurance", "INSURANCE"),
    ("premium", "INSURANCE"),
    ("phone", "TELEPHONE"),
    ("mobile", "TELEPHONE"),
    ("internet", "TELEPHONE"),
    ("broadband", "TELEPHONE"),
    ("bank fee", "BANK_FEES"),
    ("wire fee", "BANK_FEES"),
];

/// Uppercases a category key and turns spaces and dashes into underscores.
#[must_use]
pub fn normalize_category(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

/// Account mapped to a category key.
#[must_use]
pub fn category_account(key: &str) -> Option<&'static str> {
    let key = normalize_category(key);
    CATEGORY_ACCOUNTS
        .iter()
        .find(|(category, _)| *category == key)
        .map(|(_, code)| *code)
}

/// Lowercase text with every non-alphanumeric run collapsed to one space,
/// padded so whole-word matches can use `contains(" word ")`.
#[must_use]
pub fn word_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(' ');
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        out.push_str(&word.to_lowercase());
        out.push(' ');
    }
    out
}

/// First keyword category matching whole words of `text`.
#[must_use]
pub fn keyword_category(text: &str) -> Option<&'static str> {
    let words = word_text(text);
    KEYWORD_CATEGORIES
        .iter()
        .find(|(keyword, _)| words.contains(&format!(" {keyword} ")))
        .map(|(_, category)| *category)
}
