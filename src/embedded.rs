// ── EmbeddedFile ─────────────────────────────────────────────────────────────

/// The bytes of a file embedded inside a PDF document, as read from the
/// embedded-file stream of a file specification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedFile {
    /// Name the file is registered under (name-tree key or annotation label).
    pub name: String,

    /// Stream content with any PDF-level filters already removed.
    pub data: Vec<u8>,

    /// MIME type declared in the PDF `/Subtype` entry (e.g.
    /// `"application/json"`), lowercase; empty when the producer set none.
    pub mime_type: String,
}

impl EmbeddedFile {
    /// Returns `true` when the declared MIME type contains `needle`
    /// (case-insensitive).
    ///
    /// ```
    /// # use receiptpdf::EmbeddedFile;
    /// let file = EmbeddedFile { mime_type: "application/gzip".into(), ..Default::default() };
    /// assert!(file.declares("GZIP"));
    /// assert!(!file.declares("json"));
    /// ```
    pub fn declares(&self, needle: &str) -> bool {
        self.mime_type.contains(&needle.to_ascii_lowercase())
    }
}

// ── FileSpecification ────────────────────────────────────────────────────────

/// A PDF file specification, reduced to the two shapes this crate cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSpecification {
    /// A dictionary specification. Carries the embedded file when its `/EF`
    /// entry has a readable `/F` or `/UF` stream, `None` otherwise.
    Complex(Option<EmbeddedFile>),

    /// Any other shape (e.g. a plain file-name string); the payload names
    /// the PDF object kind that was found.
    Unsupported(String),
}
