//! FILENAME: core/table-engine/src/highlight.rs
//! Wraps filter term matches in rendered cell HTML with `<mark>`.
//!
//! Only text between tags is searched. Entities such as `&amp;` are never
//! split, and text already inside a `<mark>` element is left alone, so
//! highlighting twice yields the same markup.

use log::warn;
use regex::{Regex, RegexBuilder};

use crate::filter_bar::FilterBar;

#[derive(Debug, Clone)]
pub struct Highlighter {
    pattern: Regex,
}

impl Highlighter {
    /// Builds a highlighter for the filter's terms; None when there is
    /// nothing to highlight.
    pub fn new(filter: &FilterBar) -> Option<Self> {
        Self::from_terms(filter.terms(), filter.case_sensitive())
    }

    pub fn from_terms(terms: &[String], case_sensitive: bool) -> Option<Self> {
        let mut terms: Vec<&str> = terms
            .iter()
            .map(String::as_str)
            .filter(|t| !t.is_empty())
            .collect();
        if terms.is_empty() {
            return None;
        }
        // Longest first so overlapping terms prefer the longer match
        terms.sort_by(|a, b| b.len().cmp(&a.len()));
        terms.dedup();

        let alternation = terms
            .iter()
            .map(|t| regex::escape(&escape_entities(t)))
            .collect::<Vec<_>>()
            .join("|");
        match RegexBuilder::new(&alternation)
            .case_insensitive(!case_sensitive)
            .build()
        {
            Ok(pattern) => Some(Highlighter { pattern }),
            Err(e) => {
                warn!(target: "FILTER", "highlight pattern rejected: {}", e);
                None
            }
        }
    }

    /// Highlights matches in an HTML fragment.
    pub fn highlight(&self, html: &str) -> String {
        let mut out = String::with_capacity(html.len());
        let mut mark_depth = 0usize;
        let mut rest = html;

        while !rest.is_empty() {
            if rest.starts_with('<') {
                let end = rest.find('>').map_or(rest.len(), |i| i + 1);
                let tag = &rest[..end];
                let lower = tag.to_ascii_lowercase();
                if lower.starts_with("<mark") {
                    mark_depth += 1;
                } else if lower.starts_with("</mark") {
                    mark_depth = mark_depth.saturating_sub(1);
                }
                out.push_str(tag);
                rest = &rest[end..];
                continue;
            }

            let end = rest.find('<').unwrap_or(rest.len());
            let text = &rest[..end];
            if mark_depth > 0 {
                out.push_str(text);
            } else {
                self.highlight_text(text, &mut out);
            }
            rest = &rest[end..];
        }
        out
    }

    fn highlight_text(&self, text: &str, out: &mut String) {
        let mut last = 0;
        let mut from = 0;
        while let Some(found) = self.pattern.find_at(text, from) {
            if found.is_empty() || splits_entity(text, found.start()) || splits_entity(text, found.end()) {
                // Rejected matches are retried one character later
                let step = text[found.start()..].chars().next().map_or(1, char::len_utf8);
                from = found.start() + step;
                if from > text.len() {
                    break;
                }
                continue;
            }
            out.push_str(&text[last..found.start()]);
            out.push_str("<mark>");
            out.push_str(found.as_str());
            out.push_str("</mark>");
            last = found.end();
            from = found.end();
        }
        out.push_str(&text[last..]);
    }
}

/// Terms are typed as plain text but matched against escaped HTML.
fn escape_entities(term: &str) -> String {
    engine::escape_html(term)
}

/// True when `position` falls strictly inside an `&...;` entity.
fn splits_entity(text: &str, position: usize) -> bool {
    let before = &text[..position];
    let Some(amp) = before.rfind('&') else {
        return false;
    };
    let candidate = &text[amp + 1..];
    let Some(semi) = candidate.find(';') else {
        return false;
    };
    let name = &candidate[..semi];
    let is_entity = !name.is_empty()
        && name.len() <= 10
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '#');
    is_entity && position > amp && position <= amp + 1 + semi
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn highlighter(terms: &[&str], case_sensitive: bool) -> Highlighter {
        let terms: Vec<String> = terms.iter().map(|s| s.to_string()).collect();
        Highlighter::from_terms(&terms, case_sensitive).unwrap()
    }

    #[test]
    fn wraps_matches_case_insensitively() {
        let h = highlighter(&["par"], false);
        assert_eq!(h.highlight("Paris"), "<mark>Par</mark>is");
    }

    #[test]
    fn respects_case_sensitivity() {
        let h = highlighter(&["par"], true);
        assert_eq!(h.highlight("Paris"), "Paris");
    }

    #[test]
    fn leaves_tags_and_attributes_alone() {
        let h = highlighter(&["a"], false);
        assert_eq!(
            h.highlight(r#"<a href="/a">bar</a>"#),
            r#"<a href="/a">b<mark>a</mark>r</a>"#
        );
    }

    #[test]
    fn is_idempotent() {
        let h = highlighter(&["ar"], false);
        let once = h.highlight("<b>bar</b>");
        assert_eq!(h.highlight(&once), once);
    }

    #[test]
    fn longer_terms_win_over_their_prefixes() {
        let h = highlighter(&["new", "new york"], false);
        assert_eq!(h.highlight("New York"), "<mark>New York</mark>");
    }

    #[test]
    fn entities_are_not_broken() {
        let h = highlighter(&["amp"], false);
        assert_eq!(h.highlight("a &amp; b"), "a &amp; b");

        let h = highlighter(&["a&b"], false);
        assert_eq!(h.highlight("x a&amp;b y"), "x <mark>a&amp;b</mark> y");
    }

    #[test]
    fn terms_overlapping_a_rejected_match_still_highlight() {
        let h = highlighter(&["p;x", "xy"], false);
        assert_eq!(h.highlight("&amp;xy"), "&amp;<mark>xy</mark>");

        let h = highlighter(&["mp; b", "b"], false);
        assert_eq!(h.highlight("a &amp; b"), "a &amp; <mark>b</mark>");
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let h = highlighter(&["1.5"], false);
        assert_eq!(h.highlight("105 and 1.5"), "105 and <mark>1.5</mark>");
    }

    #[test]
    fn no_terms_means_no_highlighter() {
        assert!(Highlighter::from_terms(&[], false).is_none());
    }
}
