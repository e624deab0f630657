//! Headless rich prompt editor
//!
//! The editor keeps an editable region (a list of [`SurfaceNode`]s plus a
//! selection) consistent with a prompt document in both directions:
//!
//! - [`PromptEditor::render`] projects a document onto the region. It is
//!   suppressed while the region has focus so in-progress edits and caret
//!   state survive external updates.
//! - [`PromptEditor::extract`] walks the region and rebuilds the document.
//!
//! Image tokens are atomic: they are inserted, deleted and clicked as whole
//! units, and their payloads live in a side table owned by the editor.
//!
//! Every direct input event, focus loss, and structural mutation commits the
//! document to the [`ChangeSink`]. Caret movement never does.

pub mod node;

use std::collections::HashMap;
use std::sync::Arc;

use crate::parts::{normalize, ImagePart, PromptChange, PromptDocument, PromptPart};

pub use node::{
    ClickOutcome, ClipboardData, EditKey, KeyOutcome, Position, Selection, SurfaceNode,
    TokenTarget, TokenView,
};

/// Receives the document every time the editor commits
///
/// This abstracts over how the owner persists prompts (canvas node store,
/// channel, test collector).
pub trait ChangeSink: Send + Sync {
    fn on_change(&self, change: &PromptChange);
}

impl<F> ChangeSink for F
where
    F: Fn(&PromptChange) + Send + Sync,
{
    fn on_change(&self, change: &PromptChange) {
        self(change)
    }
}

/// Sink that drops every change
pub struct NullSink;

impl ChangeSink for NullSink {
    fn on_change(&self, _change: &PromptChange) {}
}

/// Selection captured before focus left the region, as flat offsets so
/// structural edits made in the meantime can shift it
#[derive(Debug, Clone, Copy)]
struct SavedSelection {
    anchor: usize,
    focus: usize,
    /// Render epoch the selection belongs to; a re-render detaches it
    epoch: u64,
}

impl SavedSelection {
    fn shift(&mut self, map: impl Fn(usize) -> usize) {
        self.anchor = map(self.anchor);
        self.focus = map(self.focus);
    }
}

/// Editable prompt surface with inline image tokens
pub struct PromptEditor {
    nodes: Vec<SurfaceNode>,
    /// id -> payload for every token on the surface
    images: HashMap<String, ImagePart>,
    selection: Option<Selection>,
    saved: Option<SavedSelection>,
    focused: bool,
    epoch: u64,
    sink: Arc<dyn ChangeSink>,
}

impl PromptEditor {
    /// Create an empty editor
    pub fn new(sink: Arc<dyn ChangeSink>) -> Self {
        Self {
            nodes: Vec::new(),
            images: HashMap::new(),
            selection: None,
            saved: None,
            focused: false,
            epoch: 0,
            sink,
        }
    }

    /// Create an editor showing `parts`
    pub fn with_parts(parts: &[PromptPart], sink: Arc<dyn ChangeSink>) -> Self {
        let mut editor = Self::new(sink);
        editor.render(parts);
        editor
    }

    pub fn nodes(&self) -> &[SurfaceNode] {
        &self.nodes
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn image(&self, id: &str) -> Option<&ImagePart> {
        self.images.get(id)
    }

    /// Number of image tokens currently on the surface
    pub fn image_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.token_id().is_some()).count()
    }

    /// The document as currently shown
    pub fn document(&self) -> PromptDocument {
        PromptDocument::new(&self.extract())
    }

    /// Render data for every token in region order
    pub fn token_views(&self) -> Vec<TokenView> {
        self.nodes
            .iter()
            .filter_map(SurfaceNode::token_id)
            .filter_map(|id| self.images.get(id))
            .map(|image| TokenView {
                image_id: image.id.clone(),
                thumbnail_url: image.data_url(),
                annotation: image.trimmed_annotation().map(str::to_string),
            })
            .collect()
    }

    // ─── PROJECTION ─────────────────────────────────────────────────

    /// Replace the region contents with `parts`.
    ///
    /// Returns `false` when the render was skipped: either the region holds
    /// focus, or it already shows exactly this document.
    pub fn render(&mut self, parts: &[PromptPart]) -> bool {
        if self.focused {
            log::trace!("Skipping prompt render while the editor has focus");
            return false;
        }
        let parts = normalize(parts);
        if parts == self.extract() {
            return false;
        }

        self.nodes.clear();
        self.images.clear();
        for part in parts {
            match part {
                PromptPart::Text { text } => self.nodes.push(SurfaceNode::Text(text)),
                PromptPart::Image(image) => {
                    self.nodes.push(SurfaceNode::Token {
                        image_id: image.id.clone(),
                    });
                    self.images.insert(image.id.clone(), image);
                }
            }
        }
        self.selection = None;
        self.epoch += 1;
        true
    }

    /// Walk the region and rebuild the (normalized) document
    pub fn extract(&self) -> Vec<PromptPart> {
        let mut parts = Vec::new();
        let mut text = String::new();

        for node in &self.nodes {
            match node {
                SurfaceNode::Text(run) | SurfaceNode::Foreign(run) => text.push_str(run),
                SurfaceNode::LineBreak => text.push('\n'),
                SurfaceNode::Token { image_id } => match self.images.get(image_id) {
                    Some(image) => {
                        if !text.is_empty() {
                            parts.push(PromptPart::Text {
                                text: std::mem::take(&mut text),
                            });
                        }
                        parts.push(PromptPart::Image(image.clone()));
                    }
                    None => log::warn!("Token {} has no backing image, skipping", image_id),
                },
            }
        }
        if !text.is_empty() {
            parts.push(PromptPart::Text { text });
        }
        normalize(&parts)
    }

    /// Emit the current document to the owner
    pub fn commit(&self) -> PromptChange {
        let change = self.document().to_change();
        self.sink.on_change(&change);
        change
    }

    // ─── FOCUS AND SELECTION ────────────────────────────────────────

    pub fn focus(&mut self) {
        self.focused = true;
        if !self.selection.is_some_and(|s| self.is_valid(&s)) {
            self.selection = Some(Selection::caret(self.end_position()));
        }
    }

    /// Focus loss commits the document
    pub fn blur(&mut self) -> PromptChange {
        self.focused = false;
        self.selection = None;
        self.commit()
    }

    /// Move the caret or selection. Returns `false` if it lies outside the region.
    pub fn set_selection(&mut self, selection: Selection) -> bool {
        if !self.is_valid(&selection) {
            return false;
        }
        self.selection = Some(selection);
        true
    }

    /// Capture the selection before something takes focus away
    pub fn save_selection(&mut self) {
        self.saved = self
            .selection_offsets()
            .map(|(anchor, focus)| SavedSelection {
                anchor,
                focus,
                epoch: self.epoch,
            });
    }

    /// Put the saved selection back, or the end of the document when the
    /// saved one is missing or no longer belongs to the region
    pub fn restore_selection(&mut self) {
        let width = self.total_width();
        let restored = self
            .saved
            .take()
            .filter(|saved| saved.epoch == self.epoch)
            .filter(|saved| saved.anchor <= width && saved.focus <= width)
            .map(|saved| {
                Selection::new(self.position_at(saved.anchor), self.position_at(saved.focus))
            });
        self.selection = Some(restored.unwrap_or_else(|| Selection::caret(self.end_position())));
    }

    // ─── INPUT EVENTS ───────────────────────────────────────────────

    /// Typed text at the caret, replacing any selection
    pub fn type_text(&mut self, text: &str) -> Option<PromptChange> {
        if text.is_empty() || self.selection.is_none() {
            return None;
        }
        let at = self.take_selected();
        self.insert_text_at(at, text);
        self.place_caret(at + text.chars().count());
        Some(self.commit())
    }

    /// Paste always degrades to the plain-text payload
    pub fn paste(&mut self, clipboard: &ClipboardData) -> Option<PromptChange> {
        if clipboard.html.is_some() {
            log::trace!("Discarding rich clipboard content");
        }
        let text = clipboard.plain_text.as_deref()?.replace("\r\n", "\n");
        self.type_text(&text)
    }

    pub fn key_down(&mut self, key: EditKey) -> KeyOutcome {
        let Some((start, end)) = self.selected_range() else {
            return KeyOutcome::Unchanged;
        };
        let collapsed = start == end;

        let outcome = match key {
            EditKey::Enter => {
                let at = self.take_selected();
                self.insert_text_at(at, "\n");
                self.place_caret(at + 1);
                KeyOutcome::NewlineInserted
            }
            EditKey::Backspace if collapsed && start > 0 && self.token_at(start - 1).is_some() => {
                let id = self.remove_atom(start - 1);
                self.place_caret(start - 1);
                KeyOutcome::TokenRemoved(id)
            }
            EditKey::Delete if collapsed && self.token_at(start).is_some() => {
                let id = self.remove_atom(start);
                self.place_caret(start);
                KeyOutcome::TokenRemoved(id)
            }
            EditKey::Backspace | EditKey::Delete if !collapsed => {
                self.delete_range(start, end);
                self.place_caret(start);
                KeyOutcome::Edited
            }
            EditKey::Backspace if start > 0 => {
                self.delete_range(start - 1, start);
                self.place_caret(start - 1);
                KeyOutcome::Edited
            }
            EditKey::Delete if start < self.total_width() => {
                self.delete_range(start, start + 1);
                self.place_caret(start);
                KeyOutcome::Edited
            }
            EditKey::Backspace | EditKey::Delete => return KeyOutcome::Unchanged,
        };
        self.commit();
        outcome
    }

    /// Clicks on a token never reach generic caret placement
    pub fn click_token(&mut self, image_id: &str, target: TokenTarget) -> ClickOutcome {
        if !self.nodes.iter().any(|n| n.token_id() == Some(image_id)) {
            return ClickOutcome::Ignored;
        }
        match target {
            TokenTarget::RemoveControl => {
                self.remove_image(image_id);
                ClickOutcome::Removed(image_id.to_string())
            }
            TokenTarget::Body => {
                self.save_selection();
                ClickOutcome::EditAnnotation {
                    image_id: image_id.to_string(),
                    annotation: self.images.get(image_id).and_then(|i| i.annotation.clone()),
                }
            }
        }
    }

    /// Adopt the children the platform left behind after native editing
    pub fn sync_from_platform(
        &mut self,
        nodes: Vec<SurfaceNode>,
        selection: Option<Selection>,
    ) -> PromptChange {
        self.nodes = nodes;
        self.selection = selection.filter(|s| self.is_valid(s));
        let live: Vec<String> = self
            .nodes
            .iter()
            .filter_map(|n| n.token_id().map(str::to_string))
            .collect();
        self.images.retain(|id, _| live.contains(id));
        self.commit()
    }

    // ─── STRUCTURAL MUTATIONS ───────────────────────────────────────

    /// Insert an image at the caret (restoring a saved caret first when the
    /// region is not focused) and commit
    pub fn insert_image(&mut self, image: ImagePart) -> PromptChange {
        if !self.focused || self.selection.is_none() {
            self.restore_selection();
        }
        self.insert_token(image);
        self.commit()
    }

    /// Remove the token for `image_id` from the region and the side table.
    /// The selection stays where the user left it, shifted past the gap.
    pub fn remove_image(&mut self, image_id: &str) -> bool {
        let Some(at) = self.token_offset(image_id) else {
            return false;
        };
        let kept = self.selection_offsets();
        self.remove_atom(at);
        if let Some((anchor, focus)) = kept {
            let anchor = self.position_at(shifted_for_delete(anchor, at, at + 1));
            let focus = self.position_at(shifted_for_delete(focus, at, at + 1));
            self.selection = Some(Selection::new(anchor, focus));
        }
        self.commit();
        true
    }

    /// Set or clear an image's annotation and commit
    pub fn apply_annotation(&mut self, image_id: &str, annotation: Option<String>) -> bool {
        let Some(image) = self.images.get_mut(image_id) else {
            return false;
        };
        image.annotation = annotation.filter(|a| !a.trim().is_empty());
        self.commit();
        true
    }

    /// Insert a token at the current selection without committing.
    /// The caret ends up directly after the new token.
    pub(crate) fn insert_token(&mut self, image: ImagePart) {
        if self.selection.is_none() {
            self.selection = Some(Selection::caret(self.end_position()));
        }
        let at = self.take_selected();
        let image_id = image.id.clone();
        self.images.insert(image_id.clone(), image);
        self.shift_saved(|offset| shifted_for_insert(offset, at, 1));
        self.insert_node_at(at, SurfaceNode::Token { image_id });
        self.normalize_nodes();
        let index = self.atom_index(at).map_or(self.nodes.len(), |i| i + 1);
        self.selection = Some(Selection::caret(Position::Between(index)));
    }

    // ─── OFFSET MATH ────────────────────────────────────────────────
    //
    // Positions are mapped onto a flat offset space where each character is
    // one step and each atomic node is one step.

    fn total_width(&self) -> usize {
        self.nodes.iter().map(SurfaceNode::width).sum()
    }

    fn node_start(&self, index: usize) -> usize {
        self.nodes[..index].iter().map(SurfaceNode::width).sum()
    }

    fn offset_of(&self, position: Position) -> Option<usize> {
        match position {
            Position::Between(index) if index <= self.nodes.len() => Some(self.node_start(index)),
            Position::InText { node, offset } => match self.nodes.get(node) {
                Some(SurfaceNode::Text(text)) if offset <= text.chars().count() => {
                    Some(self.node_start(node) + offset)
                }
                _ => None,
            },
            Position::Between(_) => None,
        }
    }

    fn position_at(&self, offset: usize) -> Position {
        let mut start = 0;
        for (index, node) in self.nodes.iter().enumerate() {
            let width = node.width();
            if matches!(node, SurfaceNode::Text(_)) && start <= offset && offset <= start + width {
                return Position::InText {
                    node: index,
                    offset: offset - start,
                };
            }
            if start >= offset {
                return Position::Between(index);
            }
            start += width;
        }
        Position::Between(self.nodes.len())
    }

    fn end_position(&self) -> Position {
        self.position_at(self.total_width())
    }

    fn is_valid(&self, selection: &Selection) -> bool {
        self.offset_of(selection.anchor).is_some() && self.offset_of(selection.focus).is_some()
    }

    /// Anchor and focus as flat offsets, direction preserved
    fn selection_offsets(&self) -> Option<(usize, usize)> {
        let selection = self.selection?;
        Some((self.offset_of(selection.anchor)?, self.offset_of(selection.focus)?))
    }

    fn shift_saved(&mut self, map: impl Fn(usize) -> usize) {
        if let Some(saved) = self.saved.as_mut() {
            saved.shift(map);
        }
    }

    fn selected_range(&self) -> Option<(usize, usize)> {
        let selection = self.selection?;
        let a = self.offset_of(selection.anchor)?;
        let b = self.offset_of(selection.focus)?;
        Some((a.min(b), a.max(b)))
    }

    fn place_caret(&mut self, offset: usize) {
        self.selection = Some(Selection::caret(self.position_at(offset)));
    }

    /// Delete the selected content; returns where the caret collapses to
    fn take_selected(&mut self) -> usize {
        match self.selected_range() {
            Some((start, end)) => {
                if start < end {
                    self.delete_range(start, end);
                }
                start
            }
            None => self.total_width(),
        }
    }

    /// Index of the node covering the step at `offset`
    fn atom_index(&self, offset: usize) -> Option<usize> {
        let mut start = 0;
        for (index, node) in self.nodes.iter().enumerate() {
            let end = start + node.width();
            if start <= offset && offset < end {
                return Some(index);
            }
            start = end;
        }
        None
    }

    fn token_at(&self, offset: usize) -> Option<&str> {
        self.atom_index(offset)
            .and_then(|index| self.nodes[index].token_id())
    }

    fn token_offset(&self, image_id: &str) -> Option<usize> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.token_id() == Some(image_id))?;
        Some(self.node_start(index))
    }

    /// Remove the atomic node at `offset`, returning its token id if any
    fn remove_atom(&mut self, offset: usize) -> String {
        let id = self.token_at(offset).map(str::to_string).unwrap_or_default();
        self.delete_range(offset, offset + 1);
        id
    }

    fn delete_range(&mut self, from: usize, to: usize) {
        self.shift_saved(|offset| shifted_for_delete(offset, from, to));
        let mut kept = Vec::with_capacity(self.nodes.len());
        let mut start = 0;

        for node in std::mem::take(&mut self.nodes) {
            let width = node.width();
            let end = start + width;
            if end <= from || start >= to {
                kept.push(node);
            } else {
                match node {
                    SurfaceNode::Text(text) | SurfaceNode::Foreign(text) => {
                        let cut_from = from.saturating_sub(start);
                        let cut_to = (to - start).min(width);
                        let mut rest: String = text.chars().take(cut_from).collect();
                        rest.extend(text.chars().skip(cut_to));
                        kept.push(SurfaceNode::Text(rest));
                    }
                    SurfaceNode::Token { image_id } => {
                        self.images.remove(&image_id);
                    }
                    SurfaceNode::LineBreak => {}
                }
            }
            start = end;
        }
        self.nodes = kept;
        self.normalize_nodes();
    }

    fn insert_node_at(&mut self, offset: usize, node: SurfaceNode) {
        let mut start = 0;
        for index in 0..self.nodes.len() {
            let width = self.nodes[index].width();
            if start >= offset {
                self.nodes.insert(index, node);
                return;
            }
            if offset < start + width {
                // Strictly inside a text run: split it around the new node
                if let SurfaceNode::Text(text) | SurfaceNode::Foreign(text) = &self.nodes[index] {
                    let split = byte_index(text, offset - start);
                    let (left, right) = (text[..split].to_string(), text[split..].to_string());
                    self.nodes[index] = SurfaceNode::Text(left);
                    self.nodes.insert(index + 1, node);
                    self.nodes.insert(index + 2, SurfaceNode::Text(right));
                    return;
                }
            }
            start += width;
        }
        self.nodes.push(node);
    }

    fn insert_text_at(&mut self, offset: usize, inserted: &str) {
        let width = inserted.chars().count();
        self.shift_saved(|saved| shifted_for_insert(saved, offset, width));
        let mut start = 0;
        for node in self.nodes.iter_mut() {
            let width = node.width();
            if let SurfaceNode::Text(text) = node {
                if start <= offset && offset <= start + width {
                    let at = byte_index(text, offset - start);
                    text.insert_str(at, inserted);
                    return;
                }
            }
            start += width;
        }
        self.insert_node_at(offset, SurfaceNode::Text(inserted.to_string()));
        self.normalize_nodes();
    }

    /// Merge adjacent text runs, drop empty ones, and absorb foreign nodes
    fn normalize_nodes(&mut self) {
        let mut merged: Vec<SurfaceNode> = Vec::with_capacity(self.nodes.len());
        for node in std::mem::take(&mut self.nodes) {
            let node = match node {
                SurfaceNode::Foreign(text) => SurfaceNode::Text(text),
                other => other,
            };
            if let SurfaceNode::Text(text) = &node {
                if text.is_empty() {
                    continue;
                }
                if let Some(SurfaceNode::Text(previous)) = merged.last_mut() {
                    previous.push_str(text);
                    continue;
                }
            }
            merged.push(node);
        }
        self.nodes = merged;
    }
}

/// Where `offset` lands once the steps in `from..to` are gone
fn shifted_for_delete(offset: usize, from: usize, to: usize) -> usize {
    if offset >= to {
        offset - (to - from)
    } else {
        offset.min(from)
    }
}

/// Where `offset` lands once `width` steps are inserted at `at`
fn shifted_for_insert(offset: usize, at: usize, width: usize) -> usize {
    if offset > at {
        offset + width
    } else {
        offset
    }
}

fn byte_index(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(index, _)| index)
}
