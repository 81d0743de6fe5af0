//! Comment-track parser.
//!
//! A track is a sequence of `<d p="time,type,size,color[,sent,pool,sender,id]">text</d>`
//! records. Parsing is total: malformed records are skipped and an empty or
//! unreadable payload yields no comments.

use once_cell::sync::Lazy;
use playplane_model::{Comment, CommentLayer};
use regex::{Captures, Regex};
use tracing::{debug, trace};

static RECORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<d\s+p\s*=\s*(?:"([^"]*)"|'([^']*)')\s*>([^<]*)</d>"#)
        .expect("comment record regex should compile")
});

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]{1,6}|#[0-9]{1,7}|amp|lt|gt|quot|apos);")
        .expect("entity regex should compile")
});

const MIN_FIELDS: usize = 4;
const SENDER_FIELD: usize = 6;
const SOURCE_ID_FIELD: usize = 7;

/// Comments in source order plus the number of records that were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    pub comments: Vec<Comment>,
    pub skipped: usize,
}

/// Parse a raw comment track. Never fails.
pub fn parse(bytes: &[u8]) -> Vec<Comment> {
    parse_with_report(bytes).comments
}

pub fn parse_with_report(bytes: &[u8]) -> ParseReport {
    let mut report = ParseReport::default();
    if bytes.is_empty() {
        return report;
    }

    let payload = String::from_utf8_lossy(bytes);
    for captures in RECORD_RE.captures_iter(&payload) {
        let attributes = captures
            .get(1)
            .or_else(|| captures.get(2))
            .map_or("", |m| m.as_str());
        let text = captures.get(3).map_or("", |m| m.as_str());

        match parse_record(attributes, text) {
            Some(comment) => report.comments.push(comment),
            None => {
                trace!(attributes, "skipping malformed comment record");
                report.skipped += 1;
            }
        }
    }

    debug!(
        parsed = report.comments.len(),
        skipped = report.skipped,
        "comment track parsed"
    );
    report
}

fn parse_record(attributes: &str, text: &str) -> Option<Comment> {
    let fields: Vec<&str> = attributes.split(',').map(str::trim).collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }

    let show_at_ms = seconds_to_ms(fields[0].parse::<f64>().ok()?)?;
    let layer = CommentLayer::from_type_code(fields[1].parse::<i32>().ok()?);

    let font_size_px = fields[2].parse::<f32>().ok()?;
    if !font_size_px.is_finite() || font_size_px < 0.0 {
        return None;
    }

    let color = fields[3].parse::<i64>().ok()?;
    if color < 0 {
        return None;
    }
    let color_rgb = (color & 0xFF_FFFF) as u32;

    let sender = fields.get(SENDER_FIELD).copied().unwrap_or_default();
    let source_id = fields.get(SOURCE_ID_FIELD).copied().unwrap_or_default();

    Some(
        Comment::new(show_at_ms, decode_entities(text), layer, font_size_px, color_rgb)
            .with_sender(sender)
            .with_source_id(source_id),
    )
}

fn seconds_to_ms(seconds: f64) -> Option<u64> {
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    let ms = (seconds * 1000.0).round();
    if ms > u64::MAX as f64 {
        return None;
    }
    Some(ms as u64)
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    ENTITY_RE
        .replace_all(raw, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => numeric_entity(entity),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

fn numeric_entity(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u32>().ok()?,
    };
    char::from_u32(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_required_and_optional_fields() {
        let track = br#"<i><d p="12.345,5,25,16711680,1700000000,0,ab12cd,9001">hello</d></i>"#;
        let comments = parse(track);

        assert_eq!(comments.len(), 1);
        let comment = &comments[0];
        assert_eq!(comment.show_at_ms, 12_345);
        assert_eq!(comment.layer, CommentLayer::TopFixed);
        assert_eq!(comment.font_size_px, 25.0);
        assert_eq!(comment.color_rgb, 0xFF0000);
        assert_eq!(comment.sender_key, "ab12cd");
        assert_eq!(comment.source_id, "9001");
    }

    #[test]
    fn rounds_fractional_milliseconds() {
        let comments = parse(br#"<d p="1.2346,1,25,0">a</d><d p="1.0004,1,25,0">b</d>"#);
        assert_eq!(comments[0].show_at_ms, 1_235);
        assert_eq!(comments[1].show_at_ms, 1_000);
    }

    #[test]
    fn skips_malformed_records_and_keeps_going() {
        let track = br#"
            <d p="1,1,25">too few fields</d>
            <d p="abc,1,25,0">bad time</d>
            <d p="-1,1,25,0">negative time</d>
            <d p="2,x,25,0">bad type</d>
            <d p="3,1,25,-5">bad color</d>
            <d p="4,1,25,16777215">ok</d>
        "#;
        let report = parse_with_report(track);

        assert_eq!(report.skipped, 5);
        assert_eq!(report.comments.len(), 1);
        assert_eq!(report.comments[0].text, "ok");
    }

    #[test]
    fn unterminated_record_does_not_swallow_its_neighbour() {
        let comments = parse(br#"<d p="1,1,25,0">a<d p="2,1,25,0">b</d>"#);
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].text, "b");
        assert_eq!(comments[0].show_at_ms, 2_000);
    }

    #[test]
    fn empty_and_garbage_input_yield_nothing() {
        assert!(parse(b"").is_empty());
        assert!(parse(b"\xff\xfe not a track").is_empty());
        assert!(parse(b"<d p=\"1,1,25,0\">unterminated").is_empty());
    }

    #[test]
    fn decodes_entities_and_single_quotes() {
        let comments =
            parse(br#"<d p='1,1,25,0'>a &amp; b &lt;3 &#x4E2D;&#25991; &bogus;</d>"#);
        assert_eq!(comments[0].text, "a & b <3 \u{4E2D}\u{6587} &bogus;");
    }

    #[test]
    fn keeps_source_order() {
        let comments = parse(br#"<d p="9,1,25,0">late</d><d p="1,1,25,0">early</d>"#);
        let texts: Vec<_> = comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["late", "early"]);
    }

    #[test]
    fn unknown_type_codes_scroll() {
        let comments = parse(br#"<d p="1,99,25,0">x</d>"#);
        assert_eq!(comments[0].layer, CommentLayer::ScrollRL);
    }
}
