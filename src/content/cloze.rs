//! Cloze deletion parsing and rendering.
//!
//! Syntax:
//! - `{{g1::text}}` - deletion in group 1
//! - `{{g1::text::hint}}` - deletion with a hint shown in place of the blank
//!
//! Deletions sharing a group number are hidden and revealed together, and each
//! distinct group becomes its own review item. Text that does not parse as a
//! deletion is kept verbatim.
//!
//! Parsing is done once into segments; rendering walks the segments.

use std::collections::BTreeSet;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const SEPARATOR: &str = "::";
const GROUP_PREFIX: char = 'g';

/// Blank shown for an active deletion without a hint
pub const MASK_PLACEHOLDER: &str = "[...]";

/// A single `{{gN::answer::hint}}` deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deletion {
    pub group: u32,
    pub answer: String,
    pub hint: Option<String>,
}

impl Deletion {
    fn masked(&self) -> String {
        match &self.hint {
            Some(hint) => format!("[{}]", hint),
            None => MASK_PLACEHOLDER.to_string(),
        }
    }

    fn highlighted(&self) -> String {
        format!("**{}**", self.answer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Deletion(Deletion),
}

/// Card text split into literal runs and deletions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClozeText {
    segments: Vec<Segment>,
    groups: Vec<u32>,
}

impl ClozeText {
    pub fn parse(text: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal_start = 0;
        let mut cursor = 0;

        while let Some(offset) = text[cursor..].find(OPEN) {
            let start = cursor + offset;
            match scan_marker(&text[start..]) {
                Scan::Deletion(deletion, len) => {
                    if literal_start < start {
                        segments.push(Segment::Text(text[literal_start..start].to_string()));
                    }
                    segments.push(Segment::Deletion(deletion));
                    cursor = start + len;
                    literal_start = cursor;
                }
                // Skip of 1 keeps `{{{g1::x}}` working: the marker starts at the second brace
                Scan::Literal(skip) => cursor = start + skip,
                // No `}}` left, so no later opener can close either
                Scan::Unclosed => break,
            }
        }
        if literal_start < text.len() {
            segments.push(Segment::Text(text[literal_start..].to_string()));
        }

        let groups: BTreeSet<u32> = segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Deletion(d) => Some(d.group),
                Segment::Text(_) => None,
            })
            .collect();

        Self {
            segments,
            groups: groups.into_iter().collect(),
        }
    }

    /// Distinct group numbers, ascending
    pub fn groups(&self) -> &[u32] {
        &self.groups
    }

    pub fn has_deletions(&self) -> bool {
        !self.groups.is_empty()
    }

    pub fn deletions(&self) -> impl Iterator<Item = &Deletion> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Deletion(d) => Some(d),
            Segment::Text(_) => None,
        })
    }

    /// All answers in reading order
    pub fn answers(&self) -> Vec<&str> {
        self.deletions().map(|d| d.answer.as_str()).collect()
    }

    /// Question side for one group: its deletions are blanked, all others
    /// read as plain answer text.
    pub fn question(&self, group: u32) -> String {
        self.render(|d| {
            if d.group == group {
                d.masked()
            } else {
                d.answer.clone()
            }
        })
    }

    /// Question side with every deletion blanked
    pub fn question_all(&self) -> String {
        self.render(Deletion::masked)
    }

    /// Answer side for one group: its deletions are highlighted, others plain.
    pub fn answer(&self, group: u32) -> String {
        self.render(|d| {
            if d.group == group {
                d.highlighted()
            } else {
                d.answer.clone()
            }
        })
    }

    fn render(&self, deletion: impl Fn(&Deletion) -> String) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Deletion(d) => out.push_str(&deletion(d)),
            }
        }
        out
    }
}

/// Outcome of scanning one `{{` opener
enum Scan {
    /// A deletion and the number of bytes it spans
    Deletion(Deletion, usize),
    /// Not a deletion; resume scanning this many bytes on
    Literal(usize),
    /// No closing `}}` anywhere after the opener
    Unclosed,
}

/// Scan the marker at the start of `input` (which begins with `{{`).
///
/// Work is bounded by the distance to the next `{{` or `}}`, so a whole text
/// is scanned in linear time.
fn scan_marker(input: &str) -> Scan {
    let Some(number_and_rest) = input
        .strip_prefix(OPEN)
        .and_then(|body| body.strip_prefix(GROUP_PREFIX))
    else {
        return Scan::Literal(1);
    };
    let digits = number_and_rest.bytes().take_while(u8::is_ascii_digit).count();
    let number = &number_and_rest[..digits];
    if digits == 0 || !number_and_rest[digits..].starts_with(SEPARATOR) {
        return Scan::Literal(1);
    }

    let header_len = OPEN.len() + GROUP_PREFIX.len_utf8() + digits + SEPARATOR.len();
    let content = &input[header_len..];
    let Some(pos) = content
        .as_bytes()
        .windows(2)
        .position(|pair| pair == OPEN.as_bytes() || pair == CLOSE.as_bytes())
    else {
        return Scan::Unclosed;
    };
    // A nested opener means this span is not a single deletion
    if content[pos..].starts_with(OPEN) {
        return Scan::Literal(header_len + pos);
    }

    let Some(group) = number.parse::<u32>().ok().filter(|n| *n > 0) else {
        return Scan::Literal(1);
    };
    let inner = &content[..pos];
    let (answer, hint) = match inner.split_once(SEPARATOR) {
        Some((answer, hint)) => (answer, Some(hint)),
        None => (inner, None),
    };
    if answer.is_empty() {
        return Scan::Literal(1);
    }

    let deletion = Deletion {
        group,
        answer: answer.to_string(),
        hint: hint.filter(|h| !h.is_empty()).map(str::to_string),
    };
    Scan::Deletion(deletion, header_len + pos + CLOSE.len())
}

/// Check if text contains at least one valid deletion.
pub fn is_valid_cloze(text: &str) -> bool {
    ClozeText::parse(text).has_deletions()
}

/// Authoring-time problems with cloze text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClozeSyntaxError {
    NoDeletions,
    MismatchedBraces,
    MalformedDeletion,
}

impl std::fmt::Display for ClozeSyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClozeSyntaxError::NoDeletions => {
                write!(f, "No valid cloze deletions found. Use {{{{g1::text}}}} syntax.")
            }
            ClozeSyntaxError::MismatchedBraces => {
                write!(f, "Mismatched braces. Ensure each {{{{ has a matching }}}}.")
            }
            ClozeSyntaxError::MalformedDeletion => write!(
                f,
                "Some cloze deletions are malformed. Use {{{{g1::text}}}} or {{{{g1::text::hint}}}} format."
            ),
        }
    }
}

impl std::error::Error for ClozeSyntaxError {}

/// Validate cloze syntax for the card editor and deck import.
///
/// The parser itself never fails; this is the strict check run when a cloze
/// card is authored. An empty list means the text is fine.
pub fn validate_cloze_syntax(text: &str) -> Vec<ClozeSyntaxError> {
    let parsed = ClozeText::parse(text);
    if !parsed.has_deletions() {
        return vec![ClozeSyntaxError::NoDeletions];
    }

    let mut errors = Vec::new();
    if text.matches(OPEN).count() != text.matches(CLOSE).count() {
        errors.push(ClozeSyntaxError::MismatchedBraces);
    }
    if count_brace_spans(text) > parsed.deletions().count() {
        errors.push(ClozeSyntaxError::MalformedDeletion);
    }
    errors
}

/// Count `{{...}}` spans whose inside has no closing brace
fn count_brace_spans(text: &str) -> usize {
    let mut count = 0;
    let mut rest = text;
    while let Some(open) = rest.find(OPEN) {
        let after = &rest[open + OPEN.len()..];
        match after.find('}') {
            Some(close) if after[close..].starts_with(CLOSE) => {
                count += 1;
                rest = &after[close + CLOSE.len()..];
            }
            Some(close) => rest = &after[close + 1..],
            None => break,
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_groups_mask_independently() {
        let cloze = ClozeText::parse("{{g1::Paris}} is the capital of {{g2::France}}");
        assert_eq!(cloze.groups(), &[1, 2]);
        assert_eq!(cloze.question(1), "[...] is the capital of France");
        assert_eq!(cloze.question(2), "Paris is the capital of [...]");
        assert_eq!(cloze.answer(1), "**Paris** is the capital of France");
        assert_eq!(cloze.answer(2), "Paris is the capital of **France**");
    }

    #[test]
    fn test_shared_group_masked_together() {
        let cloze = ClozeText::parse("{{g1::H}}2{{g1::O}} is {{g2::water}}");
        assert_eq!(cloze.groups(), &[1, 2]);
        assert_eq!(cloze.question(1), "[...]2[...] is water");
        assert_eq!(cloze.answer(1), "**H**2**O** is water");
    }

    #[test]
    fn test_hint_replaces_blank() {
        let cloze = ClozeText::parse("The {{g1::mitochondria::organelle}} makes ATP");
        assert_eq!(cloze.question(1), "The [organelle] makes ATP");
        assert_eq!(cloze.answer(1), "The **mitochondria** makes ATP");
        let deletion = cloze.deletions().next().unwrap();
        assert_eq!(deletion.hint.as_deref(), Some("organelle"));
    }

    #[test]
    fn test_empty_hint_is_no_hint() {
        let cloze = ClozeText::parse("{{g1::answer::}}");
        assert_eq!(cloze.question(1), "[...]");
    }

    #[test]
    fn test_groups_sorted_numerically() {
        let cloze = ClozeText::parse("{{g10::a}} {{g2::b}} {{g1::c}} {{g2::d}}");
        assert_eq!(cloze.groups(), &[1, 2, 10]);
    }

    #[test]
    fn test_question_all_masks_everything() {
        let cloze = ClozeText::parse("{{g1::a}} and {{g2::b::letter}}");
        assert_eq!(cloze.question_all(), "[...] and [letter]");
    }

    #[test]
    fn test_unknown_group_reveals_everything() {
        let cloze = ClozeText::parse("{{g1::a}} and {{g2::b}}");
        assert_eq!(cloze.question(7), "a and b");
    }

    #[test]
    fn test_plain_text_has_no_groups() {
        let cloze = ClozeText::parse("No deletions here");
        assert!(cloze.groups().is_empty());
        assert!(!cloze.has_deletions());
        assert_eq!(cloze.question_all(), "No deletions here");
    }

    #[test]
    fn test_malformed_markers_stay_literal() {
        for text in [
            "{{g1::unterminated",
            "{{g1}}",
            "{{g1::}}",
            "{{c1::other prefix}}",
            "{{g0::zero group}}",
            "{{gx::not a number}}",
            "{{g::no number}}",
            "{{ g1::space}}",
        ] {
            let cloze = ClozeText::parse(text);
            assert!(cloze.groups().is_empty(), "{} should not parse", text);
            assert_eq!(cloze.question_all(), text);
        }
    }

    #[test]
    fn test_valid_marker_after_malformed_one() {
        let cloze = ClozeText::parse("{{oops {{g1::ok}} done");
        assert_eq!(cloze.groups(), &[1]);
        assert_eq!(cloze.question(1), "{{oops [...] done");
    }

    #[test]
    fn test_extra_leading_brace() {
        let cloze = ClozeText::parse("{{{g1::x}}");
        assert_eq!(cloze.question(1), "{[...]");
    }

    #[test]
    fn test_long_run_of_unclosed_openers() {
        let text = "{{".repeat(100_000);
        let cloze = ClozeText::parse(&text);
        assert!(!cloze.has_deletions());
        assert_eq!(cloze.question_all(), text);

        let text = format!("{}}}}}", "{{x ".repeat(50_000));
        assert_eq!(ClozeText::parse(&text).question_all(), text);

        let text = "{{g1::".repeat(50_000);
        assert_eq!(ClozeText::parse(&text).question_all(), text);
    }

    #[test]
    fn test_nested_opener_starts_next_marker() {
        let cloze = ClozeText::parse("{{g1::outer {{g2::inner}} tail}}");
        assert_eq!(cloze.groups(), &[2]);
        assert_eq!(cloze.question(2), "{{g1::outer [...] tail}}");

        let text = format!("{}{{{{g3::last}}}}", "{{g1::a ".repeat(20_000));
        let cloze = ClozeText::parse(&text);
        assert_eq!(cloze.groups(), &[3]);
        assert_eq!(cloze.answers(), vec!["last"]);
    }

    #[test]
    fn test_unclosed_marker_keeps_earlier_deletions() {
        let cloze = ClozeText::parse("{{g1::a}} then {{g2::never closed {{ {{");
        assert_eq!(cloze.groups(), &[1]);
        assert_eq!(cloze.question(1), "[...] then {{g2::never closed {{ {{");
    }

    #[test]
    fn test_colon_inside_answer() {
        let cloze = ClozeText::parse("Meeting at {{g1::12:30}}");
        assert_eq!(cloze.answers(), vec!["12:30"]);
        assert_eq!(cloze.question(1), "Meeting at [...]");
    }

    #[test]
    fn test_unicode_text_is_preserved() {
        let cloze = ClozeText::parse("안녕 {{g1::하세요}} · ok");
        assert_eq!(cloze.question(1), "안녕 [...] · ok");
        assert_eq!(cloze.answer(1), "안녕 **하세요** · ok");
    }

    #[test]
    fn test_parse_is_deterministic() {
        let text = "{{g2::b}} {{g1::a::hint}} tail";
        let first = ClozeText::parse(text);
        let second = ClozeText::parse(text);
        assert_eq!(first, second);
        assert_eq!(first.question(1), second.question(1));
        assert_eq!(first.answer(2), second.answer(2));
    }

    #[test]
    fn test_is_valid_cloze() {
        assert!(is_valid_cloze("{{g1::yes}}"));
        assert!(!is_valid_cloze("{{g1::}} nope"));
    }

    #[test]
    fn test_validate_cloze_syntax_ok() {
        assert!(validate_cloze_syntax("{{g1::a}} {{g2::b::hint}}").is_empty());
    }

    #[test]
    fn test_validate_cloze_syntax_no_deletions() {
        assert_eq!(
            validate_cloze_syntax("plain text"),
            vec![ClozeSyntaxError::NoDeletions]
        );
    }

    #[test]
    fn test_validate_cloze_syntax_mismatched_braces() {
        let errors = validate_cloze_syntax("{{g1::a}} and {{g2::b");
        assert!(errors.contains(&ClozeSyntaxError::MismatchedBraces));
    }

    #[test]
    fn test_validate_cloze_syntax_malformed() {
        let errors = validate_cloze_syntax("{{g1::a}} and {{x2::b}}");
        assert_eq!(errors, vec![ClozeSyntaxError::MalformedDeletion]);
    }

    #[test]
    fn test_syntax_error_messages() {
        assert_eq!(
            ClozeSyntaxError::NoDeletions.to_string(),
            "No valid cloze deletions found. Use {{g1::text}} syntax."
        );
    }
}
