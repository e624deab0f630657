//! Building blocks of the editable region: child nodes, caret positions,
//! selections, and the input events a host forwards to the editor.

use serde::Serialize;

/// One child of the editable region
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceNode {
    /// A plain text run
    Text(String),
    /// A hard line break element
    LineBreak,
    /// Atomic, non-editable image token
    Token { image_id: String },
    /// Anything else the platform inserted, reduced to its text content
    Foreign(String),
}

impl SurfaceNode {
    /// Number of caret steps this node spans.
    ///
    /// Text-like nodes span one step per character; line breaks and tokens
    /// are a single unit.
    pub fn width(&self) -> usize {
        match self {
            Self::Text(text) | Self::Foreign(text) => text.chars().count(),
            Self::LineBreak | Self::Token { .. } => 1,
        }
    }

    pub fn token_id(&self) -> Option<&str> {
        match self {
            Self::Token { image_id } => Some(image_id),
            _ => None,
        }
    }
}

/// A caret position, expressed the way the platform reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Inside text node `node`, `offset` characters from its start
    InText { node: usize, offset: usize },
    /// At region level, directly before child `index`
    Between(usize),
}

/// Anchor/focus selection; collapsed when both ends coincide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub focus: Position,
}

impl Selection {
    pub fn new(anchor: Position, focus: Position) -> Self {
        Self { anchor, focus }
    }

    /// A collapsed selection
    pub fn caret(at: Position) -> Self {
        Self {
            anchor: at,
            focus: at,
        }
    }
}

/// Keys the editor intercepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    Backspace,
    Delete,
    Enter,
}

/// What a key press did to the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// An adjacent image token was removed instead of a character
    TokenRemoved(String),
    /// A literal newline was inserted
    NewlineInserted,
    /// Ordinary text deletion happened
    Edited,
    /// Nothing to do (no caret, or nothing to delete)
    Unchanged,
}

/// Which part of a token was clicked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenTarget {
    RemoveControl,
    Body,
}

/// Result of a click on a token. Token clicks never fall through to
/// caret placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Removed(String),
    /// Host should open the annotation editor for this image
    EditAnnotation {
        image_id: String,
        annotation: Option<String>,
    },
    /// No token with that id is on the surface
    Ignored,
}

/// Clipboard payload offered on paste
#[derive(Debug, Clone, Default)]
pub struct ClipboardData {
    pub plain_text: Option<String>,
    /// Rich content; always discarded
    pub html: Option<String>,
}

impl ClipboardData {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            plain_text: Some(text.into()),
            html: None,
        }
    }
}

/// Render data for one image token
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenView {
    pub image_id: String,
    pub thumbnail_url: String,
    /// Badge text, when the image carries a note
    pub annotation: Option<String>,
}
