//! Printable pass rendering: a QR summary code plus a fixed single-page layout.

pub mod barcode;
pub mod document;
pub mod layout;

pub use barcode::GrayImage;
pub use document::{PassDocument, PassDocumentError, PassDocumentGenerator};
