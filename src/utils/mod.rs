pub mod content_guard;
pub mod gemini;
pub mod pdf;
pub mod pdf_export;
pub mod pdf_source;
