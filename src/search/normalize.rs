//! Text normalization used by the search tiers.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Words dropped by aggressive normalization.
pub const STOPWORDS: [&str; 3] = ["the", "a", "an"];

#[allow(clippy::expect_used)]
static NUMERIC_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&#(?:[xX]([0-9a-fA-F]{1,6})|([0-9]{1,7}));").expect("entity regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s]").expect("alnum regex is valid")); // Static pattern, safe to panic

#[allow(clippy::expect_used)]
static VOLUME_INDICATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bvol(?:ume)?\s*[0-9ivxlcdm]+\b").expect("volume regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static TRAILING_DISAMBIGUATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(\d+\)\s*$").expect("disambiguator regex is valid")); // Static pattern, safe to panic

#[allow(clippy::expect_used)]
static LEADING_ARTICLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:the|a|an)\s+").expect("article regex is valid")); // Static pattern, safe to panic

/// Decodes the HTML entities Gazelle emits in artist and album names.
///
/// Handles the common named entities plus decimal and hex numeric
/// references. `&amp;` is decoded last so `&amp;lt;` yields `&lt;`.
#[must_use]
pub fn html_unescape(value: &str) -> String {
    let numeric = NUMERIC_ENTITY.replace_all(value, |caps: &Captures<'_>| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(dec)) => dec.as_str().parse::<u32>().ok(),
            _ => None,
        };
        code.and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), |c| c.to_string())
    });
    numeric
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&ndash;", "\u{2013}")
        .replace("&mdash;", "\u{2014}")
        .replace("&nbsp;", "\u{00a0}")
        .replace("&amp;", "&")
}

/// Collapses runs of whitespace and trims.
fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercases, turns everything except `[a-z0-9\s]` into spaces, collapses.
#[must_use]
pub fn normalize_text(value: &str) -> String {
    let lowered = value.to_lowercase();
    collapse_whitespace(&NON_ALNUM.replace_all(&lowered, " "))
}

/// Drops `the`, `a` and `an` tokens.
#[must_use]
pub fn remove_stopwords(value: &str) -> String {
    value
        .split_whitespace()
        .filter(|word| !STOPWORDS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Removes `vol 2`, `volume ii` and similar markers.
#[must_use]
pub fn remove_volume_indicators(value: &str) -> String {
    collapse_whitespace(&VOLUME_INDICATOR.replace_all(value, ""))
}

/// Strips a trailing `(N)` artist disambiguator, as in `Nirvana (2)`.
#[must_use]
pub fn strip_disambiguator(value: &str) -> String {
    TRAILING_DISAMBIGUATOR.replace(value, "").trim().to_string()
}

/// Strips one leading `The `, `A ` or `An ` (case-insensitive).
#[must_use]
pub fn strip_leading_article(value: &str) -> String {
    LEADING_ARTICLE.replace(value, "").trim().to_string()
}

/// Full aggressive normalization: unescape, normalize, drop stopwords.
#[must_use]
pub fn aggressive(value: &str) -> String {
    remove_stopwords(&normalize_text(&html_unescape(value)))
}
