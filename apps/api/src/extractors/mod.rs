//! Single-call wrappers around the PDF parser and the speech service.

pub mod document;
pub mod speech;
