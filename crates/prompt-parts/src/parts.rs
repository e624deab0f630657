//! Prompt document model
//!
//! A prompt is an ordered sequence of parts: free text interleaved with
//! image attachments. Order is significant, so the document is a plain
//! `Vec<PromptPart>` kept in normalized form:
//!
//! - no empty text part
//! - no two adjacent text parts
//! - every image part has a non-empty `id` and `data`
//!
//! Plain text and annotation text are derived views, recomputed on demand.

use serde::{Deserialize, Serialize};

/// One atomic unit of prompt content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PromptPart {
    /// Free text
    Text { text: String },
    /// An attached image
    Image(ImagePart),
}

impl PromptPart {
    /// Create a text part
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Get the image payload if this is an image part
    pub fn as_image(&self) -> Option<&ImagePart> {
        match self {
            Self::Image(image) => Some(image),
            Self::Text { .. } => None,
        }
    }
}

/// An image attachment inside a prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePart {
    /// Unique within one document
    pub id: String,
    /// Base64 payload (no data-URL prefix)
    pub data: String,
    /// MIME type of `data`, e.g. `image/jpeg`
    pub mime_type: String,
    /// User note attached to the image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

impl ImagePart {
    /// Create an image part with no annotation
    pub fn new(id: impl Into<String>, data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
            mime_type: mime_type.into(),
            annotation: None,
        }
    }

    /// An image part is usable only with both an id and a payload
    pub fn is_valid(&self) -> bool {
        !self.id.is_empty() && !self.data.is_empty()
    }

    /// Decoded byte size estimated from the base64 length
    pub fn estimated_bytes(&self) -> usize {
        estimate_base64_bytes(&self.data)
    }

    /// Annotation with surrounding whitespace removed, if any is left
    pub fn trimmed_annotation(&self) -> Option<&str> {
        self.annotation
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }

    /// `data:` URL suitable for a thumbnail
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Generate a fresh image id
pub fn new_image_id() -> String {
    format!("img-{}", uuid::Uuid::new_v4())
}

/// Estimate decoded size of a base64 string
pub fn estimate_base64_bytes(data: &str) -> usize {
    let trimmed = data.trim_end();
    let padding = trimmed.chars().rev().take_while(|c| *c == '=').count().min(2);
    (trimmed.len() * 3 / 4).saturating_sub(padding)
}

/// Normalize a part sequence.
///
/// Consecutive text parts are concatenated, invalid image parts are dropped,
/// and empty text parts disappear. Idempotent.
pub fn normalize(parts: &[PromptPart]) -> Vec<PromptPart> {
    let mut out = Vec::with_capacity(parts.len());
    let mut pending = String::new();

    for part in parts {
        match part {
            PromptPart::Text { text } => pending.push_str(text),
            PromptPart::Image(image) if image.is_valid() => {
                flush_text(&mut out, &mut pending);
                out.push(PromptPart::Image(image.clone()));
            }
            PromptPart::Image(image) => {
                log::debug!("Dropping image part without id or data: {:?}", image.id);
            }
        }
    }
    flush_text(&mut out, &mut pending);
    out
}

fn flush_text(out: &mut Vec<PromptPart>, pending: &mut String) {
    if !pending.is_empty() {
        out.push(PromptPart::Text {
            text: std::mem::take(pending),
        });
    }
}

/// Concatenation of all text parts in order
pub fn to_plain_text(parts: &[PromptPart]) -> String {
    parts
        .iter()
        .filter_map(|part| match part {
            PromptPart::Text { text } => Some(text.as_str()),
            PromptPart::Image(_) => None,
        })
        .collect()
}

/// Newline-joined, trimmed, non-empty image annotations in order
pub fn to_annotations_text(parts: &[PromptPart]) -> String {
    parts
        .iter()
        .filter_map(PromptPart::as_image)
        .filter_map(ImagePart::trimmed_annotation)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn has_images(parts: &[PromptPart]) -> bool {
    parts.iter().any(|p| p.as_image().is_some())
}

/// Submit gate: something worth sending exists
pub fn has_effective_content(plain_text: &str, parts: &[PromptPart]) -> bool {
    !plain_text.trim().is_empty() || has_images(parts) || !to_annotations_text(parts).is_empty()
}

/// Decode persisted parts leniently.
///
/// Entries that are neither a text part nor an image part are skipped
/// instead of failing the whole document.
pub fn parse_stored_parts(value: &serde_json::Value) -> Vec<PromptPart> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    let parts: Vec<PromptPart> = items
        .iter()
        .filter_map(|item| match serde_json::from_value::<PromptPart>(item.clone()) {
            Ok(part) => Some(part),
            Err(e) => {
                log::debug!("Skipping unreadable prompt part: {}", e);
                None
            }
        })
        .collect();
    normalize(&parts)
}

/// What the editor hands to its owner on every commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptChange {
    pub plain_text: String,
    /// Omitted for text-only documents, which persist as a bare string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_parts: Option<Vec<PromptPart>>,
}

/// A normalized prompt document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptDocument {
    parts: Vec<PromptPart>,
}

impl PromptDocument {
    /// Build from arbitrary parts, normalizing them
    pub fn new(parts: &[PromptPart]) -> Self {
        Self {
            parts: normalize(parts),
        }
    }

    /// Build from what a caller persisted.
    ///
    /// Structured parts win when they contain an image; otherwise the
    /// legacy plain string is authoritative.
    pub fn from_stored(parts: Option<&[PromptPart]>, legacy_text: &str) -> Self {
        match parts {
            Some(parts) if has_images(parts) => Self::new(parts),
            _ if !legacy_text.is_empty() => Self::new(&[PromptPart::text(legacy_text)]),
            Some(parts) => Self::new(parts),
            None => Self::default(),
        }
    }

    pub fn parts(&self) -> &[PromptPart] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<PromptPart> {
        self.parts
    }

    pub fn plain_text(&self) -> String {
        to_plain_text(&self.parts)
    }

    pub fn annotations_text(&self) -> String {
        to_annotations_text(&self.parts)
    }

    pub fn has_images(&self) -> bool {
        has_images(&self.parts)
    }

    pub fn image_count(&self) -> usize {
        self.images().count()
    }

    pub fn images(&self) -> impl Iterator<Item = &ImagePart> {
        self.parts.iter().filter_map(PromptPart::as_image)
    }

    /// Sum of estimated decoded sizes of all attached images
    pub fn estimated_image_bytes(&self) -> usize {
        self.images().map(ImagePart::estimated_bytes).sum()
    }

    pub fn has_effective_content(&self) -> bool {
        has_effective_content(&self.plain_text(), &self.parts)
    }

    /// Project into the shape handed to the owning caller
    pub fn to_change(&self) -> PromptChange {
        PromptChange {
            plain_text: self.plain_text(),
            structured_parts: self.has_images().then(|| self.parts.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: &str) -> PromptPart {
        PromptPart::Image(ImagePart::new(id, "aGVsbG8=", "image/png"))
    }

    #[test]
    fn test_normalize_merges_and_drops() {
        let parts = vec![
            PromptPart::text("a"),
            PromptPart::text(""),
            PromptPart::text("b"),
            image("one"),
            PromptPart::Image(ImagePart::new("", "abc", "image/png")),
            PromptPart::text("c"),
            PromptPart::Image(ImagePart::new("two", "", "image/png")),
            PromptPart::text("d"),
        ];
        let normalized = normalize(&parts);
        assert_eq!(
            normalized,
            vec![PromptPart::text("ab"), image("one"), PromptPart::text("cd")]
        );
        assert_eq!(normalize(&normalized), normalized);
    }

    #[test]
    fn test_normalize_never_leaves_adjacent_or_empty_text() {
        let parts = vec![
            PromptPart::text(""),
            image("x"),
            PromptPart::text(""),
            PromptPart::text(""),
            image("y"),
            PromptPart::text("tail"),
            PromptPart::text(""),
        ];
        let normalized = normalize(&parts);
        for pair in normalized.windows(2) {
            assert!(!matches!(
                pair,
                [PromptPart::Text { .. }, PromptPart::Text { .. }]
            ));
        }
        assert!(normalized
            .iter()
            .all(|p| !matches!(p, PromptPart::Text { text } if text.is_empty())));
        assert_eq!(normalized.len(), 3);
    }

    #[test]
    fn test_plain_text_keeps_relative_order() {
        let parts = vec![
            PromptPart::text("a cat "),
            image("1"),
            PromptPart::text("on a "),
            image("2"),
            PromptPart::text("mat"),
        ];
        assert_eq!(to_plain_text(&normalize(&parts)), "a cat on a mat");
        assert_eq!(to_plain_text(&[image("1")]), "");
        assert_eq!(to_plain_text(&[]), "");
    }

    #[test]
    fn test_annotations_text() {
        let mut first = ImagePart::new("1", "YQ==", "image/png");
        first.annotation = Some("  face reference ".to_string());
        let mut second = ImagePart::new("2", "YQ==", "image/png");
        second.annotation = Some("   ".to_string());
        let mut third = ImagePart::new("3", "YQ==", "image/png");
        third.annotation = Some("pose".to_string());

        let parts = vec![
            PromptPart::Image(first),
            PromptPart::text("x"),
            PromptPart::Image(second),
            PromptPart::Image(third),
        ];
        assert_eq!(to_annotations_text(&parts), "face reference\npose");
        assert_eq!(to_annotations_text(&[PromptPart::text("only text")]), "");
    }

    #[test]
    fn test_effective_content() {
        let parts = vec![PromptPart::text("a"), image("img1"), PromptPart::text("b")];
        assert!(has_effective_content("", &parts));
        assert!(has_effective_content(&to_plain_text(&parts), &parts));

        assert!(!has_effective_content("   ", &[PromptPart::text("   ")]));
        assert!(!has_effective_content("", &[]));
    }

    #[test]
    fn test_from_stored_prefers_parts_with_images() {
        let parts = vec![PromptPart::text("with "), image("1")];
        let doc = PromptDocument::from_stored(Some(&parts), "ignored");
        assert_eq!(doc.parts(), parts.as_slice());

        let text_only = vec![PromptPart::text("stale")];
        let doc = PromptDocument::from_stored(Some(&text_only), "fresh");
        assert_eq!(doc.parts(), &[PromptPart::text("fresh")]);

        let doc = PromptDocument::from_stored(None, "");
        assert!(doc.parts().is_empty());
    }

    #[test]
    fn test_change_omits_parts_without_images() {
        let doc = PromptDocument::new(&[PromptPart::text("hello")]);
        let change = doc.to_change();
        assert_eq!(change.plain_text, "hello");
        assert!(change.structured_parts.is_none());

        let json = serde_json::to_value(&change).unwrap();
        assert!(json.get("structuredParts").is_none());

        let doc = PromptDocument::new(&[PromptPart::text("hi "), image("1")]);
        assert_eq!(doc.to_change().structured_parts.map(|p| p.len()), Some(2));
    }

    #[test]
    fn test_parse_stored_parts_skips_unknown_entries() {
        let value = serde_json::json!([
            {"type": "text", "text": "a"},
            {"type": "video", "url": "x"},
            {"type": "text", "text": "b"},
            {"type": "image", "id": "i1", "data": "YQ==", "mimeType": "image/png", "annotation": "n"},
            42
        ]);
        let parts = parse_stored_parts(&value);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], PromptPart::text("ab"));
        assert_eq!(
            parts[1].as_image().and_then(|i| i.annotation.as_deref()),
            Some("n")
        );
    }

    #[test]
    fn test_estimated_bytes() {
        assert_eq!(estimate_base64_bytes("aGVsbG8="), 5);
        assert_eq!(estimate_base64_bytes("YQ=="), 1);
        assert_eq!(estimate_base64_bytes(""), 0);
        let doc = PromptDocument::new(&[image("1"), image("2")]);
        assert_eq!(doc.estimated_image_bytes(), 10);
    }
}
