pub mod document;
pub mod subset;

pub use document::PdfDocument;
