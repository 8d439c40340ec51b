use crate::{container, pdf_utils, sanitizer, sniffer};
use crate::{EmbeddedFile, ExtractorConfig, FileSpecification};
use log::{debug, warn};
use lopdf::{Dictionary, Document, Object, Stream};

/// Turns file specification objects into accepted payload text.
///
/// This module contains logic to:
/// - Classify file specification objects
/// - Read the embedded stream from the `/EF` dictionary
/// - Run the sniff → unwrap → sanitize → accept pipeline on its bytes
pub struct FileSpecParser<'a> {
    document: &'a Document,
    config: &'a ExtractorConfig,
}

impl<'a> FileSpecParser<'a> {
    pub fn new(document: &'a Document, config: &'a ExtractorConfig) -> Self {
        Self { document, config }
    }

    /// Decode one file specification into payload text.
    ///
    /// Returns `None`, after logging why, when the specification is absent,
    /// not a dictionary, carries no embedded stream, or holds bytes that do
    /// not sanitize into acceptable text.
    pub fn decode_specification(&self, name: &str, spec: Option<&Object>) -> Option<String> {
        let spec = spec?;
        let file = match self.parse_file_spec(name, spec) {
            FileSpecification::Complex(Some(file)) => file,
            FileSpecification::Complex(None) => {
                debug!("'{name}': file specification has no embedded file");
                return None;
            }
            FileSpecification::Unsupported(kind) => {
                warn!("'{name}': unsupported file specification ({kind}); skipping");
                return None;
            }
        };

        let kind = sniffer::classify(&file.data, &file.mime_type);
        let payload = container::decode_container(&file.data, kind);
        let text = sanitizer::sanitize(&payload);
        if text.is_empty() {
            debug!("'{name}': embedded file is empty after sanitizing");
            return None;
        }

        // A JSON MIME tag alone is not trusted when a parseable payload is required.
        let hint = if self.config.require_json_payload && file.declares("json") {
            ""
        } else {
            file.mime_type.as_str()
        };

        if sanitizer::is_acceptable(&text, hint) {
            Some(text)
        } else {
            debug!("'{name}': embedded {kind:?} payload ({}) is not JSON; skipping", file.mime_type);
            None
        }
    }

    /// Classify a file-specification object and, for dictionaries, read the
    /// embedded file.
    ///
    /// Layout of a file specification (PDF spec §7.11.3):
    ///
    /// ```text
    /// <<
    ///   /Type  /Filespec
    ///   /F     (ascii filename)
    ///   /UF    (unicode filename)
    ///   /EF    <<
    ///              /F   <stream-ref>       ← preferred
    ///              /UF  <stream-ref>       ← fallback
    ///          >>
    /// >>
    /// ```
    pub fn parse_file_spec(&self, name: &str, spec: &Object) -> FileSpecification {
        let resolved = match pdf_utils::resolve(self.document, spec) {
            Some(object) => object,
            None => return FileSpecification::Unsupported("dangling reference".into()),
        };

        match resolved {
            Object::Dictionary(spec_dict) => {
                FileSpecification::Complex(self.read_embedded_file(name, spec_dict))
            }
            other => FileSpecification::Unsupported(pdf_utils::object_kind(other).into()),
        }
    }

    fn read_embedded_file(&self, name: &str, spec_dict: &Dictionary) -> Option<EmbeddedFile> {
        let ef_dict = pdf_utils::get_dict(self.document, spec_dict, b"EF")?;
        let stream = self.extract_embedded_stream(ef_dict)?;

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());

        let mime_type = pdf_utils::mime_type_from_dict(&stream.dict)
            .or_else(|| pdf_utils::mime_type_from_dict(spec_dict))
            .unwrap_or_default();

        Some(EmbeddedFile {
            name: name.into(),
            data,
            mime_type,
        })
    }

    /// The embedded stream: `/F` (locale-neutral slot) preferred over `/UF`.
    fn extract_embedded_stream<'s>(&'s self, ef_dict: &'s Dictionary) -> Option<&'s Stream> {
        [b"F" as &[u8], b"UF"].into_iter().find_map(|key| {
            let value = ef_dict.get(key).ok()?;
            pdf_utils::resolve(self.document, value)?.as_stream().ok()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, StringFormat};

    fn doc_with_stream(content: &[u8], subtype: Option<&str>) -> (Document, lopdf::ObjectId) {
        let mut doc = Document::with_version("1.7");
        let mut dict = dictionary! { "Type" => "EmbeddedFile" };
        if let Some(subtype) = subtype {
            dict.set("Subtype", Object::Name(subtype.as_bytes().to_vec()));
        }
        let stream_id = doc.add_object(Stream::new(dict, content.to_vec()));
        (doc, stream_id)
    }

    fn spec_with(ef: Dictionary) -> Object {
        Object::Dictionary(dictionary! {
            "Type" => "Filespec",
            "F" => Object::string_literal("receipt.json"),
            "EF" => ef,
        })
    }

    #[test]
    fn string_specification_is_unsupported() {
        let doc = Document::with_version("1.7");
        let config = ExtractorConfig::default();
        let parser = FileSpecParser::new(&doc, &config);

        let spec = Object::String(b"receipt.json".to_vec(), StringFormat::Literal);
        assert_eq!(
            parser.parse_file_spec("r", &spec),
            FileSpecification::Unsupported("string".into())
        );
        assert_eq!(parser.decode_specification("r", Some(&spec)), None);
    }

    #[test]
    fn null_specification_yields_nothing() {
        let doc = Document::with_version("1.7");
        let config = ExtractorConfig::default();
        let parser = FileSpecParser::new(&doc, &config);
        assert_eq!(parser.decode_specification("r", None), None);
    }

    #[test]
    fn missing_ef_slot_is_complex_without_file() {
        let doc = Document::with_version("1.7");
        let config = ExtractorConfig::default();
        let parser = FileSpecParser::new(&doc, &config);

        let spec = spec_with(Dictionary::new());
        assert_eq!(parser.parse_file_spec("r", &spec), FileSpecification::Complex(None));
    }

    #[test]
    fn f_slot_is_preferred_over_uf() {
        let (mut doc, f_id) = doc_with_stream(b"{\"slot\":\"F\"}", None);
        let uf_id = doc.add_object(Stream::new(Dictionary::new(), b"{\"slot\":\"UF\"}".to_vec()));
        let config = ExtractorConfig::default();
        let parser = FileSpecParser::new(&doc, &config);

        let spec = spec_with(dictionary! { "UF" => uf_id, "F" => f_id });
        assert_eq!(
            parser.decode_specification("r", Some(&spec)).as_deref(),
            Some("{\"slot\":\"F\"}")
        );

        let spec = spec_with(dictionary! { "UF" => uf_id });
        assert_eq!(
            parser.decode_specification("r", Some(&spec)).as_deref(),
            Some("{\"slot\":\"UF\"}")
        );
    }

    #[test]
    fn mime_type_comes_from_stream_subtype() {
        let (doc, id) = doc_with_stream(b"hello", Some("application#2Fjson"));
        let config = ExtractorConfig::default();
        let parser = FileSpecParser::new(&doc, &config);

        let spec = spec_with(dictionary! { "F" => id });
        match parser.parse_file_spec("r", &spec) {
            FileSpecification::Complex(Some(file)) => {
                assert_eq!(file.mime_type, "application/json");
                assert_eq!(file.data, b"hello");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(parser.decode_specification("r", Some(&spec)).as_deref(), Some("hello"));
    }

    #[test]
    fn require_json_payload_ignores_mime_hint() {
        let (doc, id) = doc_with_stream(b"hello", Some("application/json"));
        let config = ExtractorConfig {
            require_json_payload: true,
            ..Default::default()
        };
        let parser = FileSpecParser::new(&doc, &config);

        let spec = spec_with(dictionary! { "F" => id });
        assert_eq!(parser.decode_specification("r", Some(&spec)), None);
    }

    #[test]
    fn non_json_attachment_is_rejected() {
        let (doc, id) = doc_with_stream(b"\x89PNG\r\n\x1a\n", Some("image/png"));
        let config = ExtractorConfig::default();
        let parser = FileSpecParser::new(&doc, &config);

        let spec = spec_with(dictionary! { "F" => id });
        assert_eq!(parser.decode_specification("logo", Some(&spec)), None);
    }

    #[test]
    fn whitespace_only_attachment_is_rejected() {
        let (doc, id) = doc_with_stream(b" \n\t ", Some("application/json"));
        let config = ExtractorConfig::default();
        let parser = FileSpecParser::new(&doc, &config);

        let spec = spec_with(dictionary! { "F" => id });
        assert_eq!(parser.decode_specification("blank", Some(&spec)), None);
    }
}
