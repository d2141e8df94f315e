//! Text helpers shared by the similarity model, title generation and scoring.
//!
//! "Meaningful words" are lowercase alphanumeric tokens of at least four
//! characters that are neither stop words nor opaque platform identifiers
//! (e.g. Slack user ids like `w0a1b2c3d4` that would otherwise match across
//! unrelated messages).

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Minimum token length for a word to count as meaningful.
pub const MIN_WORD_LEN: usize = 4;

/// Jaro-Winkler score at or above which two customer names are the same customer.
const CUSTOMER_NAME_MATCH: f64 = 0.92;

const STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "also", "another", "anyone", "anything",
    "because", "been", "before", "being", "below", "between", "both", "cannot", "could",
    "customer", "customers", "didn", "does", "doesn", "doing", "done", "down", "during", "each",
    "even", "every", "from", "further", "getting", "going", "have", "having", "hello", "here",
    "into", "just", "know", "like", "made", "make", "many", "more", "most", "much", "must",
    "need", "needs", "only", "other", "ours", "over", "please", "really", "same", "seems",
    "should", "since", "some", "still", "such", "team", "than", "thank", "thanks", "that",
    "their", "them", "then", "there", "these", "they", "thing", "things", "think", "this",
    "those", "through", "under", "until", "used", "using", "very", "want", "wants", "were",
    "what", "when", "where", "which", "while", "will", "with", "within", "without", "would",
    "your", "yours",
];

fn stop_words() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

fn generated_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^w[a-z0-9]{7,}$").expect("valid generated-id regex"))
}

fn customer_mention_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(?:[Cc]ustomer|[Cc]lient|[Aa]ccount)s?\s*:?\s+([A-Z][A-Za-z0-9&.\-]*(?:\s+[A-Z][A-Za-z0-9&.\-]*){0,2})",
        )
        .expect("valid customer mention regex")
    })
}

/// True for tokens that look like generated platform ids rather than words.
/// The pattern alone would also catch ordinary words ("workflow"), so a digit is required.
pub fn is_generated_id(token: &str) -> bool {
    generated_id_pattern().is_match(token) && token.bytes().any(|b| b.is_ascii_digit())
}

/// Meaningful words in order of appearance, duplicates kept (used for frequency counts).
pub fn meaningful_words(text: &str) -> Vec<String> {
    let stops = stop_words();
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .filter(|t| t.chars().count() >= MIN_WORD_LEN)
        .filter(|t| !stops.contains(t.as_str()))
        .filter(|t| !t.chars().all(|c| c.is_ascii_digit()))
        .filter(|t| !is_generated_id(t))
        .collect()
}

/// Distinct meaningful words.
pub fn word_set(text: &str) -> HashSet<String> {
    meaningful_words(text).into_iter().collect()
}

/// |A ∩ B| / |A ∪ B|, zero when both sets are empty.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count();
    let union = a.len() + b.len() - inter;
    inter as f64 / union as f64
}

/// Lowercase, strip punctuation, drop legal suffixes and collapse whitespace.
pub fn normalize_customer_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect();
    let mut words: Vec<&str> = cleaned.split_whitespace().collect();
    while words.len() > 1
        && matches!(
            words.last().copied(),
            Some("inc" | "llc" | "ltd" | "corp" | "co" | "gmbh" | "plc")
        )
    {
        words.pop();
    }
    words.join(" ")
}

/// Whether two raw customer names refer to the same customer.
pub fn customers_match(a: &str, b: &str) -> bool {
    let a = normalize_customer_name(a);
    let b = normalize_customer_name(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    if short.len() >= 3 && long.contains(short.as_str()) {
        return true;
    }
    strsim::jaro_winkler(&a, &b) >= CUSTOMER_NAME_MATCH
}

/// Fuzzy overlap coefficient of two customer lists: matched names over the shorter list.
pub fn customer_overlap(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (shorter, target) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let matched = shorter
        .iter()
        .filter(|p| target.iter().any(|t| customers_match(p, t)))
        .count();
    matched as f64 / shorter.len() as f64
}

/// Overlap coefficient of two label lists (case-insensitive).
pub fn label_overlap(a: &[String], b: &[String]) -> f64 {
    let normalize = |list: &[String]| -> HashSet<String> {
        list.iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    };
    let a = normalize(a);
    let b = normalize(b);
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / smaller as f64
}

/// Customer names mentioned in free text ("customer Acme", "Client: Globex Corp").
pub fn extract_customer_mentions(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for cap in customer_mention_pattern().captures_iter(text) {
        if let Some(m) = cap.get(1) {
            let name = m.as_str().trim_end_matches(['.', '-']).to_string();
            if !name.is_empty() && !found.iter().any(|f| customers_match(f, &name)) {
                found.push(name);
            }
        }
    }
    found
}

/// Lowercase and collapse whitespace; used as the stored `normalized_content`.
pub fn normalize_content(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncate to at most `max` characters on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meaningful_words_filters_short_and_stop_words() {
        let words = meaningful_words("Dashboard is slow for customer Acme");
        assert_eq!(words, vec!["dashboard", "slow", "acme"]);
    }

    #[test]
    fn test_generated_ids_are_dropped() {
        let words = meaningful_words("ping w0a1b2c3d4 about the workflow");
        assert!(words.contains(&"workflow".to_string()));
        assert!(!words.iter().any(|w| w.starts_with("w0a1")));
    }

    #[test]
    fn test_jaccard_empty_sets() {
        assert_eq!(jaccard(&HashSet::new(), &HashSet::new()), 0.0);
    }

    #[test]
    fn test_customer_names_fuzzy_match() {
        assert!(customers_match("Acme Inc.", "acme"));
        assert!(customers_match("Globex Corporation", "Globex"));
        assert!(customers_match("Initech", "Initec"));
        assert!(!customers_match("Acme", "Umbrella"));
    }

    #[test]
    fn test_customer_overlap_uses_shorter_list() {
        let a = vec!["Acme".to_string()];
        let b = vec!["ACME, Inc".to_string(), "Globex".to_string()];
        assert_eq!(customer_overlap(&a, &b), 1.0);
        assert_eq!(customer_overlap(&a, &[]), 0.0);
    }

    #[test]
    fn test_extract_customer_mentions() {
        let found = extract_customer_mentions("Dashboard is slow for customer Acme");
        assert_eq!(found, vec!["Acme"]);
        let found = extract_customer_mentions("Client: Globex Corp reported an outage");
        assert_eq!(found, vec!["Globex Corp"]);
        assert!(extract_customer_mentions("no names here").is_empty());
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
