use crate::file_discovery::FileSpecDiscovery;
use crate::file_parsing::FileSpecParser;
use crate::ExtractorConfig;
use lopdf::Document;

/// Finds the first embedded attachment that decodes into acceptable text.
pub struct ExtractionEngine<'a> {
    document: &'a Document,
    config: &'a ExtractorConfig,
}

impl<'a> ExtractionEngine<'a> {
    pub fn new(document: &'a Document, config: &'a ExtractorConfig) -> Self {
        Self { document, config }
    }

    /// Search the name tree, then the page annotations; first match wins.
    ///
    /// Returns `None` when no attachment yields acceptable text, which is
    /// not an error: callers fall back to page text.
    pub fn find_embedded_text(&self) -> Option<String> {
        self.from_name_tree().or_else(|| self.from_annotations())
    }

    /// Count the candidate attachments, decodable or not.
    pub fn count_candidates(&self) -> usize {
        let discovery = FileSpecDiscovery::new(self.document);
        let in_tree = discovery.embedded_files_tree().map_or(0, |tree| tree.len());
        in_tree + discovery.annotation_specs().len()
    }

    fn from_name_tree(&self) -> Option<String> {
        let tree = FileSpecDiscovery::new(self.document).embedded_files_tree()?;
        let parser = FileSpecParser::new(self.document, self.config);
        tree.first_match(&mut |name, spec| parser.decode_specification(name, Some(spec)))
    }

    fn from_annotations(&self) -> Option<String> {
        let parser = FileSpecParser::new(self.document, self.config);
        FileSpecDiscovery::new(self.document)
            .annotation_specs()
            .into_iter()
            .find_map(|(name, spec)| parser.decode_specification(&name, spec))
    }
}
