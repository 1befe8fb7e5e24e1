//! Component C — Context Extractor.
//!
//! Attaches a [`FieldContext`] to each [`FormField`] by decoding each page's
//! content stream into its `Tj`/`TJ` text runs and approximating their
//! layout as a flat list of text elements, ranked by proximity and
//! label-likeness. Per spec §4.C, true per-glyph coordinates are
//! implementation freedom the pack doesn't need: `extract_page_text` derives
//! one synthetic line per text-positioning operator rather than tracking the
//! text matrix, which is the seam a real layout engine would replace.

use std::collections::HashMap;

use pdf::content::{Op, TextDrawAdjusted};
use pdf::object::Resolve;
use pdf::primitive::PdfString;

use crate::error::Result;
use crate::loader::LoadedDocument;
use crate::model::{FieldContext, FormField, VisualGroup};

const CHAR_WIDTH: f64 = 6.0;
const MAX_NEARBY: usize = 10;

const LABEL_KEYWORDS: &[&str] = &["name", "address", "phone", "email", "date", "amount", "signature"];
const SECTION_KEYWORDS: &[&str] = &["section", "part", "information"];

/// The synthetic-layout tunables a caller may override via [`crate::PipelineConfig`].
#[derive(Debug, Clone, Copy)]
pub struct LayoutConfig {
    pub top_margin: f64,
    pub line_spacing: f64,
    pub text_x: f64,
    pub proximity_threshold: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            top_margin: 800.0,
            line_spacing: 15.0,
            text_x: 100.0,
            proximity_threshold: 100.0,
        }
    }
}

#[derive(Debug, Clone)]
struct TextElement {
    text: String,
    x: f64,
    y: f64,
    width: f64,
}

impl TextElement {
    fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Derive a [`FieldContext`] for every field, keyed by `field_id`, using the
/// default layout tunables.
pub fn extract_context(doc: &LoadedDocument, fields: &[FormField]) -> Result<Vec<FieldContext>> {
    extract_context_with_config(doc, fields, &LayoutConfig::default())
}

/// Derive a [`FieldContext`] for every field using caller-supplied layout tunables.
pub fn extract_context_with_config(
    doc: &LoadedDocument,
    fields: &[FormField],
    config: &LayoutConfig,
) -> Result<Vec<FieldContext>> {
    let resolver = doc.resolver();
    let mut page_cache: HashMap<u32, Vec<TextElement>> = HashMap::new();
    let mut page_header: HashMap<u32, Option<String>> = HashMap::new();

    let mut out = Vec::with_capacity(fields.len());
    for field in fields {
        let elements = page_cache
            .entry(field.page)
            .or_insert_with(|| extract_page_elements(doc, &resolver, field.page, config));
        let header = page_header
            .entry(field.page)
            .or_insert_with(|| derive_section_header(elements))
            .clone();

        out.push(derive_context(field, elements, header, config.proximity_threshold));
    }
    Ok(out)
}

/// Extract the page's raw text once and convert it into the synthetic
/// layout approximation described in spec §4.C step 1.
fn extract_page_elements(
    doc: &LoadedDocument,
    resolver: &impl Resolve,
    page: u32,
    config: &LayoutConfig,
) -> Vec<TextElement> {
    let text = extract_page_text(doc, resolver, page).unwrap_or_default();

    let mut y = config.top_margin;
    let mut elements = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            elements.push(TextElement {
                text: trimmed.to_string(),
                x: config.text_x,
                y,
                width: trimmed.chars().count() as f64 * CHAR_WIDTH,
            });
        }
        y -= config.line_spacing;
    }
    elements
}

/// Decode one page's content stream into its text runs, one synthetic line
/// per text-positioning operator (`BT`, `T*`/`Td`/`TD`). Returns `None` when
/// the page has no content stream or no decodable text operators, which
/// degrades gracefully into empty nearby-text/labels rather than an error.
fn extract_page_text(doc: &LoadedDocument, _resolver: &impl Resolve, page: u32) -> Option<String> {
    let page_rc = doc.file.pages().nth((page.saturating_sub(1)) as usize)?.ok()?;
    let content = page_rc.contents.as_ref()?;

    let mut lines: Vec<String> = vec![String::new()];
    for op in &content.operations {
        match op {
            Op::BeginText | Op::TextNewline | Op::MoveTextPosition { .. } => lines.push(String::new()),
            Op::TextDraw { text } => append_decoded(&mut lines, text),
            Op::TextDrawAdjusted { array } => {
                for element in array {
                    if let TextDrawAdjusted::Text(text) = element {
                        append_decoded(&mut lines, text);
                    }
                }
            }
            _ => {}
        }
    }

    let joined = lines
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

fn append_decoded(lines: &mut [String], text: &PdfString) {
    if let Some(last) = lines.last_mut() {
        last.push_str(&text.to_string_lossy());
    }
}

fn derive_section_header(elements: &[TextElement]) -> Option<String> {
    elements.iter().find_map(|el| {
        let is_uppercase = el.text.chars().any(|c| c.is_alphabetic())
            && el.text.chars().filter(|c| c.is_alphabetic()).all(|c| c.is_uppercase());
        let has_keyword = SECTION_KEYWORDS
            .iter()
            .any(|kw| el.text.to_lowercase().contains(kw));
        let short_colon = el.text.ends_with(':') && el.word_count() <= 4;
        if is_uppercase || has_keyword || short_colon {
            Some(el.text.clone())
        } else {
            None
        }
    })
}

fn derive_context(
    field: &FormField,
    elements: &[TextElement],
    section_header: Option<String>,
    proximity_threshold: f64,
) -> FieldContext {
    let anchor_x = field.rect[0];
    let anchor_y = field.rect[1];

    let mut nearby: Vec<&TextElement> = elements
        .iter()
        .filter(|el| distance(el.x, el.y, anchor_x, anchor_y) <= proximity_threshold)
        .collect();

    nearby.sort_by(|a, b| rank_key(a).cmp(&rank_key(b)).then(a.text.len().cmp(&b.text.len())));
    nearby.truncate(MAX_NEARBY);

    let label = derive_label(&nearby);
    let nearby_text = nearby.iter().map(|el| el.text.clone()).collect::<Vec<_>>();

    let text_above = closest_directional(elements, anchor_x, anchor_y, Direction::Above);
    let text_below = closest_directional(elements, anchor_x, anchor_y, Direction::Below);
    let text_left = closest_directional(elements, anchor_x, anchor_y, Direction::Left);
    let text_right = closest_directional(elements, anchor_x, anchor_y, Direction::Right);

    let visual_group = bucket_visual_group(anchor_y);

    let mut confidence: f64 = 0.3;
    let has_strong_label = label
        .as_ref()
        .map(|l| {
            let lower = l.to_lowercase();
            LABEL_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
        .unwrap_or(false);
    if has_strong_label {
        confidence += 0.3;
    }
    if label.is_some() {
        confidence += 0.1;
    }
    if nearby.len() >= 3 {
        confidence += 0.2;
    } else if !nearby.is_empty() {
        confidence += 0.1;
    }
    if section_header.is_some() {
        confidence += 0.1;
    }
    if text_above.is_some() || text_below.is_some() || text_left.is_some() || text_right.is_some() {
        confidence += 0.1;
    }
    confidence = confidence.min(1.0);

    FieldContext {
        field_id: field.id.clone(),
        label,
        section_header,
        nearby_text,
        text_above,
        text_below,
        text_left,
        text_right,
        visual_group,
        confidence,
    }
}

fn derive_label(ranked: &[&TextElement]) -> Option<String> {
    if let Some(colon) = ranked.iter().find(|el| el.text.ends_with(':')) {
        return Some(colon.text.trim_end_matches(':').trim().to_string());
    }
    if let Some(keyword) = ranked.iter().find(|el| {
        let lower = el.text.to_lowercase();
        LABEL_KEYWORDS.iter().any(|kw| lower.contains(kw))
    }) {
        return Some(keyword.text.clone());
    }
    if let Some(short) = ranked.iter().find(|el| el.word_count() <= 5) {
        return Some(short.text.clone());
    }
    None
}

/// Ordering key for label-likeness ranking (spec §4.C step 2): colon-terminated
/// first, question-terminated second, short strings third, everything else last.
fn rank_key(el: &TextElement) -> u8 {
    if el.text.ends_with(':') {
        0
    } else if el.text.ends_with('?') {
        1
    } else if el.word_count() <= 5 {
        2
    } else {
        3
    }
}

fn distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    ((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt()
}

enum Direction {
    Above,
    Below,
    Left,
    Right,
}

fn closest_directional(
    elements: &[TextElement],
    anchor_x: f64,
    anchor_y: f64,
    direction: Direction,
) -> Option<String> {
    elements
        .iter()
        .filter(|el| match direction {
            Direction::Above => el.y > anchor_y,
            Direction::Below => el.y < anchor_y,
            Direction::Left => el.x < anchor_x,
            Direction::Right => el.x > anchor_x,
        })
        .min_by(|a, b| {
            let da = match direction {
                Direction::Above | Direction::Below => (a.y - anchor_y).abs(),
                Direction::Left | Direction::Right => (a.x - anchor_x).abs(),
            };
            let db = match direction {
                Direction::Above | Direction::Below => (b.y - anchor_y).abs(),
                Direction::Left | Direction::Right => (b.x - anchor_x).abs(),
            };
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|el| el.text.clone())
}

fn bucket_visual_group(y: f64) -> VisualGroup {
    if y >= 700.0 {
        VisualGroup::Header
    } else if y >= 500.0 {
        VisualGroup::Upper
    } else if y >= 300.0 {
        VisualGroup::Middle
    } else if y >= 100.0 {
        VisualGroup::Lower
    } else {
        VisualGroup::Footer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(text: &str, x: f64, y: f64) -> TextElement {
        TextElement {
            text: text.to_string(),
            x,
            y,
            width: text.len() as f64 * CHAR_WIDTH,
        }
    }

    #[test]
    fn ranks_colon_before_question_before_long() {
        let a = element("A long descriptive sentence with many words here", 100.0, 800.0);
        let b = element("Is this correct?", 100.0, 785.0);
        let c = element("Name:", 100.0, 770.0);
        let mut ranked = vec![&a, &b, &c];
        ranked.sort_by(|x, y| rank_key(x).cmp(&rank_key(y)).then(x.text.len().cmp(&y.text.len())));
        assert_eq!(ranked[0].text, "Name:");
        assert_eq!(ranked[1].text, "Is this correct?");
    }

    #[test]
    fn derives_label_from_colon() {
        let name = element("First Name:", 100.0, 800.0);
        let ranked = vec![&name];
        assert_eq!(derive_label(&ranked), Some("First Name".to_string()));
    }

    #[test]
    fn buckets_visual_group_by_band() {
        assert_eq!(bucket_visual_group(750.0), VisualGroup::Header);
        assert_eq!(bucket_visual_group(50.0), VisualGroup::Footer);
    }

    #[test]
    fn confidence_is_capped_at_one() {
        let field = FormField {
            id: "field_000000".into(),
            name: "Test".into(),
            kind: crate::flags::FieldKind::Text,
            page: 1,
            rect: [100.0, 790.0, 200.0, 805.0],
            value: String::new(),
            flags: Default::default(),
            options: Vec::new(),
            tooltip: None,
            mapping_name: None,
            max_length: None,
            default_appearance: None,
            parent_id: None,
            children_ids: Vec::new(),
            is_group_container: false,
        };
        let elements = vec![
            element("SECTION ONE", 100.0, 800.0),
            element("Name:", 100.0, 795.0),
            element("Address:", 100.0, 790.0),
            element("Phone:", 100.0, 785.0),
        ];
        let ctx = derive_context(&field, &elements, Some("SECTION ONE".to_string()), LayoutConfig::default().proximity_threshold);
        assert!(ctx.confidence <= 1.0);
    }
}
