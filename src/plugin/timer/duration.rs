//! Natural-language duration parsing for timer text.
//!
//! Timer text mixes duration tokens with free text, in either order:
//! `in 8min45sec to do that thing`, `to water my plants in 2 hours`,
//! `every 30 minutes stretch`.  Tokens are matched and stripped from the
//! start of the text, then from the end, with an explicit scanner rather
//! than a backtracking regex so the ambiguity tie-break below stays a
//! visible, testable branch.

use super::TimerError;
use std::time::Duration;

/// Bounds for a timer's one-shot duration
pub const ONE_SHOT_MIN: Duration = Duration::from_secs(60);
pub const ONE_SHOT_MAX: Duration = Duration::from_secs(24 * 60 * 60);
/// Bounds for a timer's repeat interval
pub const REPEAT_MIN: Duration = Duration::from_secs(2 * 60);
pub const REPEAT_MAX: Duration = Duration::from_secs(24 * 60 * 60);

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * 60;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;
const SECS_PER_WEEK: u64 = 7 * SECS_PER_DAY;

/// Result of parsing timer text: the duration token(s) plus whatever text was left over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTimer {
    /// Time until the first (or only) firing
    pub duration: Option<Duration>,
    /// Interval between repeated firings
    pub repeat: Option<Duration>,
    /// Residual free text with all duration tokens stripped
    pub label: String,
}

/// Parse free-form timer text into `(one-shot, repeat, label)`.
///
/// At most one plain/`in` token and one `every` token are consumed per scan direction; a token
/// targeting an already-filled slot stops that direction.  An `every` token with no plain token
/// doubles as the one-shot duration so a repeating timer always has a first firing.
pub fn parse_timer_text(text: &str) -> Result<ParsedTimer, TimerError> {
    let mut label = text.trim().to_string();
    let mut duration = None;
    let mut repeat = None;

    scan(&mut label, &mut duration, &mut repeat, Anchor::Start)?;
    scan(&mut label, &mut duration, &mut repeat, Anchor::End)?;

    let duration = duration.or(repeat);

    // `in 2 hours to do the thing` leaves a leading "to" behind
    if label == "to" {
        label.clear();
    } else if let Some(rest) = label.strip_prefix("to ") {
        label = rest.trim_start().to_string();
    }

    Ok(ParsedTimer {
        duration,
        repeat,
        label,
    })
}

/// Parse text that must be nothing but a duration, e.g. the argument to `;timer modify time`.
/// No marker words, no residual label.  Returns `Ok(None)` when no duration token is present.
pub fn parse_plain_duration(
    text: &str,
    repeating: bool,
) -> Result<Option<Duration>, TimerError> {
    parse_compound(text, repeating)
}

/// Render a duration the way replies and `due_in_text` show it, e.g. `8 minutes, 45 seconds`.
/// Zero-valued units are skipped so the rendering survives a round-trip through the parser.
pub fn humanize(duration: Duration) -> String {
    const PERIODS: &[(&str, u64)] = &[
        ("week", SECS_PER_WEEK),
        ("day", SECS_PER_DAY),
        ("hour", SECS_PER_HOUR),
        ("minute", SECS_PER_MINUTE),
        ("second", 1),
    ];

    let mut secs = duration.as_secs();
    let mut parts = Vec::new();
    for (name, span) in PERIODS {
        let count = secs / span;
        if count == 0 {
            continue;
        }
        secs -= count * span;
        if count == 1 {
            parts.push(format!("1 {}", name));
        } else {
            parts.push(format!("{} {}s", count, name));
        }
    }

    if parts.is_empty() {
        return "0 seconds".to_string();
    }
    parts.join(", ")
}

#[derive(Clone, Copy)]
enum Anchor {
    Start,
    End,
}

/// One matched duration token within the text
struct TokenMatch {
    /// Token was introduced by `every` and targets the repeat slot
    every: bool,
    /// Byte range of the whole token, marker word included
    span: (usize, usize),
    /// Byte range of the `<int><unit>` chain, marker word excluded
    group: (usize, usize),
}

/// Repeatedly match-and-strip duration tokens at one end of the text.
fn scan(
    text: &mut String,
    duration: &mut Option<Duration>,
    repeat: &mut Option<Duration>,
    anchor: Anchor,
) -> Result<(), TimerError> {
    while let Some(tok) = find_token(text, anchor) {
        // First match wins per slot; a second token for a filled slot ends this direction.
        if (tok.every && repeat.is_some()) || (!tok.every && duration.is_some()) {
            break;
        }

        let Some(parsed) = parse_group(&text[tok.group.0..tok.group.1], tok.every)? else {
            // Ambiguous group (see parse_group); leave the token in the label and stop.
            break;
        };

        let stripped = format!("{}{}", &text[..tok.span.0], &text[tok.span.1..]);
        *text = stripped.trim().to_string();

        if tok.every {
            *repeat = Some(parsed);
        } else {
            *duration = Some(parsed);
        }
    }

    Ok(())
}

fn find_token(text: &str, anchor: Anchor) -> Option<TokenMatch> {
    match anchor {
        Anchor::Start => match_token(text, 0),
        Anchor::End => {
            // Leftmost token that runs exactly to the end of the text, i.e. the longest suffix.
            for (i, _) in text.char_indices() {
                if !word_boundary_at(text, i) {
                    continue;
                }
                if let Some(tok) = match_token(text, i) {
                    if tok.span.1 == text.len() {
                        return Some(tok);
                    }
                }
            }
            None
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn word_boundary_at(text: &str, at: usize) -> bool {
    let Some(c) = text[at..].chars().next() else {
        return false;
    };
    if !is_word_char(c) {
        return false;
    }
    match text[..at].chars().next_back() {
        Some(prev) => !is_word_char(prev),
        None => true,
    }
}

/// Match a duration token at `start`: an optional `in`/`every` marker followed by one or more
/// `<int><unit>` groups joined by commas, whitespace, and/or `and`.  The token must end on a
/// word boundary.
fn match_token(text: &str, start: usize) -> Option<TokenMatch> {
    let mut pos = start;
    let mut every = false;

    for (marker, marks_every) in [("in", false), ("every", true)] {
        let Some(candidate) = text.get(pos..pos + marker.len()) else {
            continue;
        };
        if !candidate.eq_ignore_ascii_case(marker) {
            continue;
        }
        // The marker must be its own word
        let after = pos + marker.len();
        if !text[after..].starts_with(char::is_whitespace) {
            continue;
        }
        every = marks_every;
        pos = after + skip_whitespace(&text[after..]);
        break;
    }

    let group_start = pos;
    let mut end = match_group(text, pos)?;

    // Further groups, e.g. `12h30m` or `6 hours and 15 minutes`
    loop {
        let mut p = end;
        while let Some(c) = text[p..].chars().next() {
            if c.is_whitespace() || c == ',' {
                p += c.len_utf8();
            } else {
                break;
            }
        }
        if text[p..].len() >= 3 && text[p..p + 3].eq_ignore_ascii_case("and") {
            p += 3;
        }
        p += skip_whitespace(&text[p..]);

        match match_group(text, p) {
            Some(e) => end = e,
            None => break,
        }
    }

    // Mirrors the trailing word boundary: `in 5m2` is not a token
    if let Some(next) = text[end..].chars().next() {
        if is_word_char(next) {
            return None;
        }
    }

    Some(TokenMatch {
        every,
        span: (start, end),
        group: (group_start, end),
    })
}

fn skip_whitespace(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

/// Match one `<int><unit>` group at `start`, returning the byte offset just past the unit.
fn match_group(text: &str, start: usize) -> Option<usize> {
    let digits = text[start..]
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len() - start);
    if digits == 0 {
        return None;
    }

    let mut pos = start + digits;
    pos += skip_whitespace(&text[pos..]);

    let (unit_len, _) = match_unit(&text[pos..])?;
    Some(pos + unit_len)
}

/// Longest unit word that prefixes `rest`.  Returns the matched length and the unit's length
/// in seconds.
fn match_unit(rest: &str) -> Option<(usize, u64)> {
    // Longest spellings first so `minutes` wins over `min` wins over `m`
    const UNITS: &[(&str, u64)] = &[
        ("minutes", SECS_PER_MINUTE),
        ("seconds", 1),
        ("minute", SECS_PER_MINUTE),
        ("second", 1),
        ("hours", SECS_PER_HOUR),
        ("weeks", SECS_PER_WEEK),
        ("mins", SECS_PER_MINUTE),
        ("secs", 1),
        ("hour", SECS_PER_HOUR),
        ("week", SECS_PER_WEEK),
        ("days", SECS_PER_DAY),
        ("min", SECS_PER_MINUTE),
        ("sec", 1),
        ("hrs", SECS_PER_HOUR),
        ("day", SECS_PER_DAY),
        ("hr", SECS_PER_HOUR),
        ("w", SECS_PER_WEEK),
        ("d", SECS_PER_DAY),
        ("h", SECS_PER_HOUR),
        ("m", SECS_PER_MINUTE),
        ("s", 1),
    ];

    for (word, secs) in UNITS {
        let Some(candidate) = rest.get(..word.len()) else {
            continue;
        };
        if !candidate.eq_ignore_ascii_case(word) {
            continue;
        }
        // Bare `m` must not start `mo`, so `1 month` never reads as minutes
        if *word == "m" && rest[1..].starts_with(['o', 'O']) {
            return None;
        }
        return Some((word.len(), *secs));
    }

    None
}

/// Parse one matched group chain, chunk by chunk, with the numeric-accumulation tie-break:
/// if extending the chain with another chunk parses to the same duration as before, the extra
/// chunk contributed nothing (e.g. a `0 seconds` tail) and the whole group is rejected as
/// ambiguous rather than silently double-counted.
fn parse_group(group: &str, repeating: bool) -> Result<Option<Duration>, TimerError> {
    let mut result: Option<Duration> = None;
    let mut testing = String::new();

    for chunk in group.split_whitespace() {
        if chunk.eq_ignore_ascii_case("and") {
            continue;
        }
        if chunk.bytes().all(|b| b.is_ascii_digit()) {
            testing.push_str(chunk);
            continue;
        }
        testing.push_str(chunk.trim_end_matches(','));

        let parsed = parse_compound(&testing, repeating)?;
        if parsed == result {
            return Ok(None);
        }
        result = parsed;
    }

    Ok(result)
}

/// Sum every `<int><unit>` pair in `s` (other text is ignored) and bounds-check the total.
/// `Ok(None)` when no pair was found at all.
fn parse_compound(s: &str, repeating: bool) -> Result<Option<Duration>, TimerError> {
    let mut total: u64 = 0;
    let mut found = false;

    let mut pos = 0;
    while pos < s.len() {
        let Some(c) = s[pos..].chars().next() else {
            break;
        };
        if !c.is_ascii_digit() {
            pos += c.len_utf8();
            continue;
        }

        let digits = s[pos..]
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(s.len() - pos);
        let value: u64 = s[pos..pos + digits].parse().map_err(|_| too_large(repeating))?;
        pos += digits;
        pos += skip_whitespace(&s[pos..]);

        let Some((unit_len, unit_secs)) = match_unit(&s[pos..]) else {
            continue;
        };
        pos += unit_len;
        found = true;

        if repeating && unit_secs != SECS_PER_HOUR && unit_secs != SECS_PER_MINUTE {
            return Err(TimerError::Invalid(
                "For the repeating timers, only hours and minutes are valid units of time."
                    .to_string(),
            ));
        }

        total = value
            .checked_mul(unit_secs)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(|| too_large(repeating))?;
    }

    if !found {
        return Ok(None);
    }

    let (min, max) = if repeating {
        (REPEAT_MIN, REPEAT_MAX)
    } else {
        (ONE_SHOT_MIN, ONE_SHOT_MAX)
    };

    let total = Duration::from_secs(total);
    if total < min {
        return Err(too_small(repeating));
    }
    if total > max {
        return Err(too_large(repeating));
    }
    Ok(Some(total))
}

fn too_small(repeating: bool) -> TimerError {
    if repeating {
        TimerError::Invalid(format!(
            "For the repeating timers, that amount of time is too small. (Minimum: {})",
            humanize(REPEAT_MIN)
        ))
    } else {
        TimerError::Invalid(format!(
            "That amount of time is too small. (Minimum: {})",
            humanize(ONE_SHOT_MIN)
        ))
    }
}

fn too_large(repeating: bool) -> TimerError {
    if repeating {
        TimerError::Invalid(format!(
            "For the repeating timers, that amount of time is too large. (Maximum: {})",
            humanize(REPEAT_MAX)
        ))
    } else {
        TimerError::Invalid(format!(
            "That amount of time is too large. (Maximum: {})",
            humanize(ONE_SHOT_MAX)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn parse(text: &str) -> ParsedTimer {
        match parse_timer_text(text) {
            Ok(parsed) => parsed,
            Err(e) => panic!("parse of {:?} failed: {}", text, e),
        }
    }

    #[test]
    fn time_then_text() {
        let parsed = parse("in 8min45sec to do that thing");
        assert_eq!(parsed.duration, Some(secs(8 * 60 + 45)));
        assert_eq!(parsed.repeat, None);
        assert_eq!(parsed.label, "do that thing");
    }

    #[test]
    fn text_then_time() {
        let parsed = parse("to water my plants in 2 hours");
        assert_eq!(parsed.duration, Some(secs(2 * 60 * 60)));
        assert_eq!(parsed.repeat, None);
        assert_eq!(parsed.label, "water my plants");
    }

    #[test]
    fn bare_time_no_text() {
        let parsed = parse("8h");
        assert_eq!(parsed.duration, Some(secs(8 * 60 * 60)));
        assert_eq!(parsed.repeat, None);
        assert_eq!(parsed.label, "");
    }

    #[test]
    fn commas_spaces_and() {
        let parsed = parse("in 6 hours and 15 minutes stretch your legs");
        assert_eq!(parsed.duration, Some(secs(6 * 3600 + 15 * 60)));
        assert_eq!(parsed.label, "stretch your legs");

        let parsed = parse("12h30m go home");
        assert_eq!(parsed.duration, Some(secs(12 * 3600 + 30 * 60)));
        assert_eq!(parsed.label, "go home");
    }

    #[test]
    fn every_fills_both_slots() {
        let parsed = parse("every 2 hours water my plants");
        assert_eq!(parsed.duration, Some(secs(2 * 3600)));
        assert_eq!(parsed.repeat, Some(secs(2 * 3600)));
        assert_eq!(parsed.label, "water my plants");
    }

    #[test]
    fn explicit_one_shot_and_repeat() {
        let parsed = parse("in 1 hour every 30 minutes stretch");
        assert_eq!(parsed.duration, Some(secs(3600)));
        assert_eq!(parsed.repeat, Some(secs(30 * 60)));
        assert_eq!(parsed.label, "stretch");
    }

    #[test]
    fn repeat_token_at_the_end() {
        let parsed = parse("drink water every 90 minutes");
        assert_eq!(parsed.duration, Some(secs(90 * 60)));
        assert_eq!(parsed.repeat, Some(secs(90 * 60)));
        assert_eq!(parsed.label, "drink water");
    }

    #[test]
    fn no_duration_leaves_text_untouched() {
        let parsed = parse("water my plants");
        assert_eq!(parsed.duration, None);
        assert_eq!(parsed.repeat, None);
        assert_eq!(parsed.label, "water my plants");
    }

    #[test]
    fn empty_input() {
        let parsed = parse("");
        assert_eq!(parsed.duration, None);
        assert_eq!(parsed.repeat, None);
        assert_eq!(parsed.label, "");
    }

    #[test]
    fn month_is_not_minutes() {
        let parsed = parse("in 1 month call the dentist");
        assert_eq!(parsed.duration, None);
        assert_eq!(parsed.label, "in 1 month call the dentist");
    }

    #[test]
    fn below_one_minute_floor() {
        let err = parse_timer_text("in 30 seconds").unwrap_err();
        assert!(err.to_string().contains("too small"), "got: {}", err);
    }

    #[test]
    fn above_24_hour_cap() {
        let err = parse_timer_text("in 2 days").unwrap_err();
        assert!(err.to_string().contains("too large"), "got: {}", err);
    }

    #[test]
    fn repeat_below_two_minute_floor() {
        let err = parse_plain_duration("90 seconds", true).unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("For the repeating timers"), "got: {}", msg);
    }

    #[test]
    fn repeat_rejects_day_units() {
        let err = parse_timer_text("every 2 days water my plants").unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("For the repeating timers"), "got: {}", msg);
        assert!(msg.contains("hours and minutes"), "got: {}", msg);
    }

    #[test]
    fn ambiguous_zero_tail_stops_parsing() {
        // The `0 seconds` chunk parses to the same total as the chunk before it, which trips
        // the tie-break: the token is left in the label rather than consumed.
        let parsed = parse("in 5 minutes and 0 seconds");
        assert_eq!(parsed.duration, None);
        assert_eq!(parsed.label, "in 5 minutes and 0 seconds");
    }

    #[test]
    fn second_one_shot_token_is_not_consumed() {
        // First match wins; the second plain token stays in the label.
        let parsed = parse("in 5 minutes in 10 minutes");
        assert_eq!(parsed.duration, Some(secs(5 * 60)));
        assert_eq!(parsed.label, "in 10 minutes");
    }

    #[test]
    fn label_stripping_is_idempotent() {
        let first = parse("in 8min45sec to do that thing");
        let second = parse(&first.label);
        assert_eq!(second.duration, None);
        assert_eq!(second.repeat, None);
        assert_eq!(second.label, first.label);
    }

    #[test]
    fn humanize_formats() {
        assert_eq!(humanize(secs(8 * 60 + 45)), "8 minutes, 45 seconds");
        assert_eq!(humanize(secs(3600)), "1 hour");
        assert_eq!(humanize(secs(0)), "0 seconds");
        assert_eq!(
            humanize(secs(SECS_PER_WEEK + SECS_PER_DAY + 61)),
            "1 week, 1 day, 1 minute, 1 second"
        );
    }

    #[test]
    fn humanized_durations_round_trip() {
        for total in [60, 8 * 60 + 45, 3600, 2 * 3600, 10 * 3600 + 15 * 60 + 30, 86400] {
            let rendered = format!("in {}", humanize(secs(total)));
            let parsed = parse(&rendered);
            assert_eq!(parsed.duration, Some(secs(total)), "through {:?}", rendered);
            assert_eq!(parsed.label, "");
        }
    }

    #[test]
    fn plain_duration_has_no_label_handling() {
        assert_eq!(parse_plain_duration("10 minutes", false), Ok(Some(secs(600))));
        assert_eq!(parse_plain_duration("tomorrow", false), Ok(None));
    }
}
