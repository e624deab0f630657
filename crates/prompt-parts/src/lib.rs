//! Prompt parts - rich prompt documents with inline image attachments
//!
//! This crate holds everything on the prompt-authoring side of the
//! workbench:
//!
//! - **Document model** ([`parts`]): ordered text/image parts and the
//!   normalization rules that keep them canonical
//! - **Editable surface** ([`surface`]): a headless editor that keeps a
//!   region of text runs and atomic image tokens in sync with the document
//! - **Ingestion** ([`ingest`]): file -> processed image -> budget checks ->
//!   insertion at the caret
//!
//! # Example
//!
//! ```rust,ignore
//! use prompt_parts::{ImageProcessor, PromptEditor, AttachmentPolicy, NullSink};
//! use std::sync::Arc;
//!
//! let mut editor = PromptEditor::new(Arc::new(NullSink));
//! editor.focus();
//! editor.type_text("a watercolor fox, style like ");
//! editor.save_selection();
//! let notices = editor.attach_files(files, &AttachmentPolicy::default(), &ImageProcessor).await;
//! ```

pub mod encoder;
pub mod ingest;
pub mod parts;
pub mod surface;

// Re-exports for convenience
pub use encoder::{EncodeError, EncodedImage, ImageEncoder, ImageProcessor};
pub use ingest::{
    append_attachments, prepare_attachments, AttachmentFile, AttachmentPolicy, IngestNotice,
    IngestOutcome, NoticeSeverity, OutputFormat,
};
pub use parts::{
    has_effective_content, has_images, new_image_id, normalize, parse_stored_parts,
    to_annotations_text, to_plain_text, ImagePart, PromptChange, PromptDocument, PromptPart,
};
pub use surface::{
    ChangeSink, ClickOutcome, ClipboardData, EditKey, KeyOutcome, NullSink, Position,
    PromptEditor, Selection, SurfaceNode, TokenTarget, TokenView,
};
