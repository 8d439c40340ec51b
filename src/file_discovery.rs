use crate::pdf_utils;
use log::warn;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashSet;

/// Name trees deeper than this are truncated.
const MAX_NAME_TREE_DEPTH: usize = 32;

// ── NameTreeNode ─────────────────────────────────────────────────────────────

/// One node of the `/EmbeddedFiles` name tree, with its `(name, value)`
/// entries and its child nodes in stored order.
///
/// Values are left as raw PDF objects so that nothing is read from the
/// embedded streams until a traversal actually asks for it.
#[derive(Debug, Clone, Default)]
pub struct NameTreeNode<'a> {
    pub entries: Vec<(String, &'a Object)>,
    pub children: Vec<NameTreeNode<'a>>,
}

impl<'a> NameTreeNode<'a> {
    /// Depth-first search for the first entry `f` maps to `Some`.
    ///
    /// A node's own entries are tried before any of its children.
    pub fn first_match<T, F>(&self, f: &mut F) -> Option<T>
    where
        F: FnMut(&str, &'a Object) -> Option<T>,
    {
        self.entries
            .iter()
            .find_map(|(name, value)| f(name, *value))
            .or_else(|| self.children.iter().find_map(|child| child.first_match(f)))
    }

    /// Total number of entries in this subtree.
    pub fn len(&self) -> usize {
        self.entries.len() + self.children.iter().map(NameTreeNode::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── FileSpecDiscovery ────────────────────────────────────────────────────────

/// Finds embedded file specifications in a PDF document.
///
/// Two sources are searched:
/// 1. The `/Names/EmbeddedFiles` name tree in the document catalog
/// 2. `/FileAttachment` annotations on pages
pub struct FileSpecDiscovery<'a> {
    document: &'a Document,
}

impl<'a> FileSpecDiscovery<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Build the `/Names/EmbeddedFiles` tree, or `None` when the catalog has
    /// no such entry.
    pub fn embedded_files_tree(&self) -> Option<NameTreeNode<'a>> {
        let catalog = self.document.catalog().ok()?;
        let names_dict = pdf_utils::get_dict(self.document, catalog, b"Names")?;
        let root = names_dict.get(b"EmbeddedFiles").ok()?;

        let mut visited = HashSet::new();
        self.build_node(root, 0, &mut visited)
    }

    fn build_node(
        &self,
        value: &'a Object,
        depth: usize,
        visited: &mut HashSet<ObjectId>,
    ) -> Option<NameTreeNode<'a>> {
        if depth > MAX_NAME_TREE_DEPTH {
            warn!("embedded-files name tree deeper than {MAX_NAME_TREE_DEPTH}; ignoring the rest");
            return None;
        }
        if let Object::Reference(id) = value {
            if !visited.insert(*id) {
                warn!("embedded-files name tree revisits object {} {}; skipping", id.0, id.1);
                return None;
            }
        }

        let dict = pdf_utils::resolve_dict(self.document, value)?;
        let entries = dict
            .get(b"Names")
            .ok()
            .and_then(|v| pdf_utils::resolve_array(self.document, v))
            .map(|arr| Self::process_names_array(arr))
            .unwrap_or_default();

        let children = dict
            .get(b"Kids")
            .ok()
            .and_then(|v| pdf_utils::resolve_array(self.document, v))
            .map(|kids| {
                kids.iter()
                    .filter_map(|kid| self.build_node(kid, depth + 1, visited))
                    .collect()
            })
            .unwrap_or_default();

        Some(NameTreeNode { entries, children })
    }

    /// Split a names array `[key value key value …]` into `(name, value)` pairs.
    fn process_names_array(names_array: &'a [Object]) -> Vec<(String, &'a Object)> {
        names_array
            .chunks_exact(2)
            .filter_map(|pair| {
                let name = pair[0].as_str().ok()?;
                Some((String::from_utf8_lossy(name).into_owned(), &pair[1]))
            })
            .collect()
    }

    /// File specifications referenced by `/FileAttachment` annotations, in
    /// page order and then annotation order.
    ///
    /// The specification is `None` when the annotation has no `/FS` entry.
    pub fn annotation_specs(&self) -> Vec<(String, Option<&'a Object>)> {
        self.document
            .get_pages()
            .into_values()
            .flat_map(|page_id| self.process_page_annotations(page_id))
            .collect()
    }

    fn process_page_annotations(&self, page_id: ObjectId) -> Vec<(String, Option<&'a Object>)> {
        let annots = self
            .document
            .get_dictionary(page_id)
            .ok()
            .and_then(|page| page.get(b"Annots").ok())
            .and_then(|v| pdf_utils::resolve_array(self.document, v));

        match annots {
            Some(annots) => annots
                .iter()
                .filter_map(|item| pdf_utils::resolve_dict(self.document, item))
                .filter_map(Self::process_file_attachment_annotation)
                .collect(),
            None => Vec::new(),
        }
    }

    fn process_file_attachment_annotation(dict: &'a Dictionary) -> Option<(String, Option<&'a Object>)> {
        let subtype = dict.get(b"Subtype").ok()?.as_name().ok()?;
        if subtype != b"FileAttachment" {
            return None;
        }
        Some((Self::annotation_name(dict), dict.get(b"FS").ok()))
    }

    /// Extract a display name from a FileAttachment annotation dictionary.
    /// Falls back to `"attachment"` if neither `/Contents` nor `/T` is set.
    fn annotation_name(dict: &Dictionary) -> String {
        for key in [b"Contents" as &[u8], b"T"] {
            if let Some(name) = pdf_utils::extract_string_from_dict(dict, key) {
                return name;
            }
        }
        "attachment".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn leaf<'a>(entries: &[(&str, &'a Object)]) -> NameTreeNode<'a> {
        NameTreeNode {
            entries: entries.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
            children: Vec::new(),
        }
    }

    #[test]
    fn entries_are_tried_before_children() {
        let value = Object::Null;
        let tree = NameTreeNode {
            entries: vec![("a".into(), &value), ("b".into(), &value)],
            children: vec![leaf(&[("c", &value)])],
        };

        let mut visited = Vec::new();
        let found = tree.first_match(&mut |name, _| {
            visited.push(name.to_string());
            None::<()>
        });

        assert!(found.is_none());
        assert_eq!(visited, ["a", "b", "c"]);
    }

    #[test]
    fn first_match_short_circuits() {
        let value = Object::Null;
        let tree = NameTreeNode {
            entries: vec![("skip".into(), &value)],
            children: vec![leaf(&[("hit", &value)]), leaf(&[("never", &value)])],
        };

        let mut visited = Vec::new();
        let found = tree.first_match(&mut |name, _| {
            visited.push(name.to_string());
            (name == "hit").then(|| name.to_uppercase())
        });

        assert_eq!(found.as_deref(), Some("HIT"));
        assert_eq!(visited, ["skip", "hit"]);
    }

    #[test]
    fn empty_node_yields_nothing() {
        let tree = NameTreeNode::default();
        assert!(tree.is_empty());
        assert!(tree.first_match(&mut |_, _| Some(1)).is_none());
    }

    #[test]
    fn odd_names_array_ignores_dangling_key() {
        let arr = vec![
            Object::string_literal("one"),
            Object::Integer(1),
            Object::Integer(7),
            Object::Integer(2),
            Object::string_literal("dangling"),
        ];
        let pairs = FileSpecDiscovery::process_names_array(&arr);
        let names: Vec<_> = pairs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["one"]);
    }

    #[test]
    fn self_referencing_kids_terminate() {
        let mut doc = Document::with_version("1.5");
        let node_id = doc.new_object_id();
        doc.objects.insert(
            node_id,
            Object::Dictionary(dictionary! {
                "Names" => vec![Object::string_literal("x"), Object::Null],
                "Kids" => vec![Object::Reference(node_id)],
            }),
        );

        let discovery = FileSpecDiscovery::new(&doc);
        let root = Object::Reference(node_id);
        let tree = discovery.build_node(&root, 0, &mut HashSet::new()).unwrap();
        assert_eq!(tree.len(), 1);
        assert!(tree.children.is_empty());
    }
}
