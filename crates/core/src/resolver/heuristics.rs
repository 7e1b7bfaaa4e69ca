//! Deterministic vendor pattern families, checked before any network call.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::chart::codes;

/// A named pattern family and the account it implies.
pub struct PatternFamily {
    /// Family name, logged when it matches.
    pub name: &'static str,
    /// Account code for matches.
    pub account_code: &'static str,
    /// Case-insensitive pattern.
    pub pattern: Regex,
}

fn family(name: &'static str, account_code: &'static str, pattern: &str) -> Option<PatternFamily> {
    match Regex::new(pattern) {
        Ok(pattern) => Some(PatternFamily {
            name,
            account_code,
            pattern,
        }),
        Err(e) => {
            tracing::error!(family = name, error = %e, "Invalid heuristic pattern");
            None
        }
    }
}

/// Pattern families in evaluation order.
pub static PATTERN_FAMILIES: Lazy<Vec<PatternFamily>> = Lazy::new(|| {
    [
        family(
            "utilities",
            codes::UTILITIES,
            r"(?i)\b(electric(ity)?|power\s+company|water(\s+delivery)?|gas\s+bill|utilit(y|ies)|sewer|pln|pdam|aqua\s+galon|bottled\s+water)\b",
        ),
        family(
            "payment_processor_fees",
            codes::BANK_FEES,
            r"(?i)\b(stripe|paypal|square\s*up|braintree|adyen|xendit|midtrans|(processing|merchant|transaction)\s+fees?)\b",
        ),
        family(
            "cloud_hosting",
            codes::HOSTING,
            r"(?i)\b(aws|amazon\s+web\s+services|google\s+cloud|gcp|azure|digitalocean|linode|vercel|netlify|heroku|cloudflare|hetzner|fly\.io)\b",
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
});

/// First family matching `text`.
#[must_use]
pub fn match_family(text: &str) -> Option<&'static PatternFamily> {
    PATTERN_FAMILIES.iter().find(|f| f.pattern.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(PATTERN_FAMILIES.len(), 3);
    }

    #[test]
    fn test_families() {
        let hit = |text| match_family(text).map(|f| f.account_code);
        assert_eq!(hit("PLN Electricity token"), Some(codes::UTILITIES));
        assert_eq!(hit("Aqua Galon water delivery"), Some(codes::UTILITIES));
        assert_eq!(hit("Stripe processing fees"), Some(codes::BANK_FEES));
        assert_eq!(hit("AWS EMEA invoice"), Some(codes::HOSTING));
        assert_eq!(hit("DigitalOcean droplet"), Some(codes::HOSTING));
        assert_eq!(hit("Staples"), None);
        // Word boundary: "laws" is not "aws".
        assert_eq!(hit("Legal fees for laws review"), None);
    }
}
