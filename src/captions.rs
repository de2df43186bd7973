use std::path::Path;

use regex::Regex;
use tracing::warn;

pub const CANVAS_WIDTH: u32 = 1080;
pub const CANVAS_HEIGHT: u32 = 1920;

const FONT_SIZE: u32 = 56;
const OUTLINE_WIDTH: u32 = 3;
// Caption block is anchored 80% down the canvas: alignment 2 (bottom
// center) with a bottom margin of 20% of the canvas height.
const MARGIN_V: u32 = CANVAS_HEIGHT / 5;
const MARGIN_H: u32 = 40;
// ASS alpha 0x87 over black, matching a roughly half-opaque caption box.
const BOX_COLOUR: &str = "&H87000000";
// Budget of 1000px at an average advance of ~0.55em for the caption face.
const MAX_LINE_CHARS: usize = 32;

const PREFERRED_FONTS: &[(&str, &str)] = &[
    (
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
        "DejaVu Sans",
    ),
    (
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "DejaVu Sans",
    ),
];
const FALLBACK_FONT: &str = "Sans";

/// One timed caption unit: a sentence and its half-open visibility window.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// Split narration at sentence-terminating punctuation followed by
/// whitespace, keeping the terminator with its sentence. Non-empty input
/// with no terminator yields the whole text as one sentence; segmentation
/// never produces zero sentences for non-empty input.
pub fn split_sentences(script: &str) -> Vec<String> {
    let boundary = Regex::new(r"[.!?]\s+").unwrap();
    let mut sentences = Vec::new();
    let mut last = 0;
    for m in boundary.find_iter(script) {
        // The terminator is a single ASCII byte at m.start().
        let sentence = script[last..m.start() + 1].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        last = m.end();
    }
    let tail = script[last..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Uniform time partition: segment `i` of `n` occupies
/// `[i/n * duration, (i+1)/n * duration)`. An even split by count, not by
/// sentence length.
pub fn segment_windows(sentences: &[String], duration: f64) -> Vec<Segment> {
    let n = sentences.len();
    sentences
        .iter()
        .enumerate()
        .map(|(i, text)| Segment {
            text: text.clone(),
            start: i as f64 / n as f64 * duration,
            end: (i + 1) as f64 / n as f64 * duration,
        })
        .collect()
}

pub fn timed_segments(script: &str, duration: f64) -> Vec<Segment> {
    segment_windows(&split_sentences(script), duration)
}

/// Greedy word wrap against the caption line budget. Words longer than the
/// budget get a line of their own.
pub fn wrap_caption(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Pick the caption font family, falling back to the default face when no
/// preferred font file is present. A missing font never fails the run.
pub fn resolve_font() -> &'static str {
    pick_font(|p| Path::new(p).exists())
}

fn pick_font(exists: impl Fn(&str) -> bool) -> &'static str {
    for &(path, family) in PREFERRED_FONTS {
        if exists(path) {
            return family;
        }
    }
    warn!("No preferred caption font found, using the libass default face");
    FALLBACK_FONT
}

pub fn format_ass_time(seconds: f64) -> String {
    let total_cs = (seconds * 100.0).round() as u64;
    let cs = total_cs % 100;
    let total_sec = total_cs / 100;
    let s = total_sec % 60;
    let total_min = total_sec / 60;
    let m = total_min % 60;
    let h = total_min / 60;
    format!("{}:{:02}:{:02}.{:02}", h, m, s, cs)
}

fn escape_event_text(text: &str) -> String {
    // Braces open ASS override blocks inside event text.
    text.replace('{', "(").replace('}', ")")
}

/// Render the full ASS document for a segment list: one style (centered,
/// outlined light-on-dark glyphs over a semi-transparent box at the 80%
/// anchor) and one Dialogue event per segment, pre-wrapped with \N breaks.
pub fn build_ass(segments: &[Segment], font: &str) -> String {
    let mut doc = String::new();
    doc.push_str("[Script Info]\n");
    doc.push_str("ScriptType: v4.00+\n");
    doc.push_str(&format!("PlayResX: {CANVAS_WIDTH}\n"));
    doc.push_str(&format!("PlayResY: {CANVAS_HEIGHT}\n"));
    doc.push_str("WrapStyle: 2\n");
    doc.push_str("ScaledBorderAndShadow: yes\n\n");

    doc.push_str("[V4+ Styles]\n");
    doc.push_str(
        "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, \
         OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, \
         ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, \
         Alignment, MarginL, MarginR, MarginV, Encoding\n",
    );
    // BorderStyle 4: background box plus glyph outline (libass).
    doc.push_str(&format!(
        "Style: Caption,{font},{FONT_SIZE},&H00FFFFFF,&H00FFFFFF,&H00000000,\
         {BOX_COLOUR},-1,0,0,0,100,100,0,0,4,{OUTLINE_WIDTH},0,2,\
         {MARGIN_H},{MARGIN_H},{MARGIN_V},1\n\n",
    ));

    doc.push_str("[Events]\n");
    doc.push_str("Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n");
    for segment in segments {
        let wrapped = wrap_caption(&segment.text, MAX_LINE_CHARS).join("\\N");
        doc.push_str(&format!(
            "Dialogue: 0,{},{},Caption,,0,0,0,,{}\n",
            format_ass_time(segment.start),
            format_ass_time(segment.end),
            escape_event_text(&wrapped),
        ));
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminators_followed_by_whitespace() {
        assert_eq!(
            split_sentences("Hi there. Run now!"),
            vec!["Hi there.", "Run now!"]
        );
    }

    #[test]
    fn terminator_without_whitespace_does_not_split() {
        assert_eq!(split_sentences("v1.2 is out! Get it."), vec![
            "v1.2 is out!",
            "Get it."
        ]);
    }

    #[test]
    fn no_terminator_yields_one_sentence() {
        assert_eq!(split_sentences("just one long thought"), vec![
            "just one long thought"
        ]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(split_sentences("   ").is_empty());
    }

    #[test]
    fn two_sentences_split_the_duration_evenly() {
        let segments = timed_segments("Hi there. Run now!", 10.0);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments[0].end, 5.0);
        assert_eq!(segments[1].start, 5.0);
        assert_eq!(segments[1].end, 10.0);
    }

    #[test]
    fn windows_are_contiguous_and_cover_the_duration() {
        let script = "One. Two. Three. Four. Five. Six. Seven.";
        let duration = 29.5;
        let segments = timed_segments(script, duration);
        assert_eq!(segments.len(), 7);
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments.last().unwrap().end, duration);
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert!(pair[0].start < pair[0].end);
        }
    }

    #[test]
    fn wrap_respects_the_line_budget() {
        let lines = wrap_caption("the quick brown fox jumps over the lazy dog", 15);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.chars().count() <= 15, "line too long: {line}");
        }
        assert_eq!(
            lines.join(" "),
            "the quick brown fox jumps over the lazy dog"
        );
    }

    #[test]
    fn overlong_word_gets_its_own_line() {
        let lines = wrap_caption("a pneumonoultramicroscopic b", 10);
        assert_eq!(lines, vec!["a", "pneumonoultramicroscopic", "b"]);
    }

    #[test]
    fn ass_time_formatting() {
        assert_eq!(format_ass_time(0.0), "0:00:00.00");
        assert_eq!(format_ass_time(5.125), "0:00:05.13"); // rounds to centiseconds
        assert_eq!(format_ass_time(65.25), "0:01:05.25");
        assert_eq!(format_ass_time(3601.0), "1:00:01.00");
    }

    #[test]
    fn ass_document_has_one_event_per_segment() {
        let segments = timed_segments("Hi there. Run now!", 10.0);
        let doc = build_ass(&segments, "DejaVu Sans");
        assert_eq!(doc.matches("Dialogue:").count(), 2);
        assert!(doc.contains("Dialogue: 0,0:00:00.00,0:00:05.00,Caption"));
        assert!(doc.contains("Dialogue: 0,0:00:05.00,0:00:10.00,Caption"));
        assert!(doc.contains("Style: Caption,DejaVu Sans"));
        assert!(doc.contains(&format!("PlayResY: {CANVAS_HEIGHT}")));
    }

    #[test]
    fn long_captions_carry_line_breaks() {
        let segments = vec![Segment {
            text: "this caption is far too long to fit on a single caption line and must wrap"
                .into(),
            start: 0.0,
            end: 3.0,
        }];
        let doc = build_ass(&segments, "Sans");
        assert!(doc.contains("\\N"));
    }

    #[test]
    fn braces_are_neutralized_in_event_text() {
        let segments = vec![Segment {
            text: "beware {\\b1}markup".into(),
            start: 0.0,
            end: 1.0,
        }];
        let doc = build_ass(&segments, "Sans");
        assert!(!doc.contains('{'));
        assert!(doc.contains("(\\b1)markup"));
    }

    #[test]
    fn font_probe_falls_back_to_default_face() {
        assert_eq!(pick_font(|_| false), FALLBACK_FONT);
        assert_eq!(
            pick_font(|p| p.ends_with("DejaVuSans-Bold.ttf")),
            "DejaVu Sans"
        );
    }
}
