//! Text normalization and similarity scoring shared across the pipeline.
//!
//! The deduplicator, track mapper, and gap analyzer all score text pairs
//! with the same normalized token-overlap function, so a pair judged
//! "near-identical" at dedup time is judged the same way at gap time.
//! Numeric-term extraction feeds the `conflicting` gap check: two texts that
//! read alike but disagree on a threshold or percentage.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

/// Normalize text for comparison: lowercase, Arabic-Indic digits folded to
/// ASCII, diacritics and tatweel stripped, punctuation replaced by spaces,
/// whitespace collapsed.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = true;
    for c in text.chars() {
        let c = fold_digit(c);
        // Arabic diacritics and tatweel carry no lexical signal.
        if ('\u{064B}'..='\u{0652}').contains(&c) || c == '\u{0640}' {
            continue;
        }
        if c.is_alphanumeric() {
            for lc in c.to_lowercase() {
                out.push(lc);
            }
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Fold Arabic-Indic and Eastern Arabic-Indic digits to ASCII.
fn fold_digit(c: char) -> char {
    match c {
        '٠'..='٩' => char::from(b'0' + (c as u32 - '٠' as u32) as u8),
        '۰'..='۹' => char::from(b'0' + (c as u32 - '۰' as u32) as u8),
        _ => c,
    }
}

fn token_set(normalized: &str) -> BTreeSet<&str> {
    normalized.split_whitespace().collect()
}

/// Jaccard token-overlap between two texts after normalization, in `[0, 1]`.
///
/// Two empty texts score `0.0`; identical normalized texts score `1.0`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let na = normalize_text(a);
    let nb = normalize_text(b);
    if !na.is_empty() && na == nb {
        return 1.0;
    }
    let ta = token_set(&na);
    let tb = token_set(&nb);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    intersection as f64 / union as f64
}

/// Fraction of query tokens present in the candidate text, in `[0, 1]`.
///
/// Used by keyword retrieval, where the asymmetric direction matters: a long
/// chunk should not be penalized for containing more than the query asked.
pub fn query_coverage(query: &str, text: &str) -> f64 {
    let nq = normalize_text(query);
    let nt = normalize_text(text);
    let qt = token_set(&nq);
    if qt.is_empty() {
        return 0.0;
    }
    let tt = token_set(&nt);
    let matched = qt.iter().filter(|t| tt.contains(**t)).count();
    matched as f64 / qt.len() as f64
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // The percent sign may precede the number in Arabic text ("%10").
    RE.get_or_init(|| Regex::new(r"(%|٪)?\s*(\d+(?:[.,]\d+)?)\s*(%|٪)?").expect("static pattern"))
}

/// Extract the numeric/operative terms of a text: numbers and percentages,
/// normalized (`"10%"`, `"3"`), sorted and deduplicated.
///
/// Arabic-Indic digits and the Arabic percent sign are folded first, so
/// `"٣٪"` and `"3%"` compare equal.
pub fn numeric_terms(text: &str) -> Vec<String> {
    let normalized: String = text.chars().map(fold_digit).collect();
    let mut terms = BTreeSet::new();
    for cap in number_regex().captures_iter(&normalized) {
        let value = cap[2].replace(',', ".");
        if cap.get(1).is_some() || cap.get(3).is_some() {
            terms.insert(format!("{}%", value));
        } else {
            terms.insert(value);
        }
    }
    terms.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation_and_case() {
        assert_eq!(
            normalize_text("The Deduction, must NOT exceed: one-third!"),
            "the deduction must not exceed one third"
        );
    }

    #[test]
    fn test_normalize_folds_arabic_digits() {
        assert_eq!(normalize_text("٣٪ من الراتب"), "3 من الراتب");
    }

    #[test]
    fn test_similarity_identical_after_normalization() {
        let a = "يجب ألا تتجاوز الحسميات ثلث الراتب.";
        let b = "يجب ألا تتجاوز الحسميات ثلث الراتب";
        assert!((similarity(a, b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_disjoint_is_zero() {
        assert_eq!(similarity("invoice tariff bracket", "site handover minutes"), 0.0);
        assert_eq!(similarity("", ""), 0.0);
    }

    #[test]
    fn test_similarity_partial_in_unit_interval() {
        let s = similarity(
            "the deduction must not exceed one third of base salary",
            "total deductions must not exceed a third of the base salary",
        );
        assert!(s > 0.0 && s < 1.0);
    }

    #[test]
    fn test_query_coverage_asymmetric() {
        let chunk = "the deduction must not exceed one third of base salary and other text";
        assert!((query_coverage("deduction salary", chunk) - 1.0).abs() < 1e-9);
        assert!(query_coverage(chunk, "deduction salary") < 1.0);
        assert_eq!(query_coverage("", chunk), 0.0);
    }

    #[test]
    fn test_numeric_terms_percentages() {
        assert_eq!(numeric_terms("لا يتجاوز 3% من الصافي"), vec!["3%"]);
        assert_eq!(numeric_terms("ألا تقل نسبته عن %10 من القيمة"), vec!["10%"]);
        assert_eq!(numeric_terms("within 45 days, not 30"), vec!["30", "45"]);
        assert!(numeric_terms("no numbers here").is_empty());
    }

    #[test]
    fn test_numeric_terms_arabic_digits_fold() {
        assert_eq!(numeric_terms("٣٪"), numeric_terms("3%"));
    }
}
