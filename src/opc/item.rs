//! A single item (part) of a package and its classification.
//!
//! An item is a `(root_uri, uri, blob)` triple. Classification is a pure
//! function of the uri, so replacing the blob never changes what kind of item
//! it is.
use crate::opc::constants::uri as names;
use crate::opc::error::Result;
use crate::opc::xml::XmlDocument;
use std::path::PathBuf;
use std::sync::Arc;

/// The role of an item within a package, derived from its uri.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// The `[Content_Types].xml` manifest
    ContentTypes,
    /// A relationships item (`.rels` suffix)
    Rels,
    /// Any other part with an `.xml` suffix
    XmlPart,
    /// Binary media and anything else
    Other,
}

impl ItemKind {
    /// Classify an item by its uri.
    pub fn from_uri(uri: &str) -> Self {
        if uri == names::CONTENT_TYPES {
            ItemKind::ContentTypes
        } else if uri.ends_with(names::RELS_SUFFIX) {
            ItemKind::Rels
        } else if uri.ends_with(names::XML_SUFFIX) {
            ItemKind::XmlPart
        } else {
            ItemKind::Other
        }
    }

    /// Whether items of this kind carry XML content.
    #[inline]
    pub fn is_xml(self) -> bool {
        !matches!(self, ItemKind::Other)
    }
}

/// One uri-addressable piece of package content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkgItem {
    /// Origin of the package this item was read from, shared by all its items
    root_uri: Arc<str>,

    /// Forward-slash path of the item relative to the package root
    uri: String,

    /// Raw content
    blob: Vec<u8>,
}

impl PkgItem {
    pub fn new(root_uri: impl Into<Arc<str>>, uri: impl Into<String>, blob: Vec<u8>) -> Self {
        Self {
            root_uri: root_uri.into(),
            uri: uri.into(),
            blob,
        }
    }

    pub fn root_uri(&self) -> &str {
        &self.root_uri
    }

    pub(crate) fn shared_root_uri(&self) -> &Arc<str> {
        &self.root_uri
    }

    pub(crate) fn set_root_uri(&mut self, root_uri: Arc<str>) {
        self.root_uri = root_uri;
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// Replace the content of this item. The uri is unaffected.
    pub fn set_blob(&mut self, blob: Vec<u8>) {
        self.blob = blob;
    }

    pub fn into_blob(self) -> Vec<u8> {
        self.blob
    }

    #[inline]
    pub fn kind(&self) -> ItemKind {
        ItemKind::from_uri(&self.uri)
    }

    pub fn is_content_types(&self) -> bool {
        self.kind() == ItemKind::ContentTypes
    }

    pub fn is_rels_item(&self) -> bool {
        self.kind() == ItemKind::Rels
    }

    pub fn is_xml_part(&self) -> bool {
        self.kind() == ItemKind::XmlPart
    }

    /// Effective filesystem path of this item: the root uri joined with each
    /// uri segment using the host path separator.
    ///
    /// Used for display and extraction only, never for identity.
    pub fn path(&self) -> PathBuf {
        let mut path = PathBuf::from(&*self.root_uri);
        for segment in self.uri.split(names::SEPARATOR).filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }

    /// Parse the blob as XML.
    ///
    /// Only meaningful for XML-bearing items; binary media fails with a
    /// malformed-xml error.
    pub fn element(&self) -> Result<XmlDocument> {
        XmlDocument::parse(&self.blob).map_err(|e| e.for_uri(&self.uri))
    }

    /// Replace the blob with its pretty-printed form.
    ///
    /// Output is UTF-8 with a `standalone='yes'` declaration, two-space
    /// indentation and a trailing newline. Applying it twice gives the same
    /// bytes as applying it once.
    pub fn prettify_xml(&mut self) -> Result<()> {
        let pretty = self.element()?.to_pretty_bytes();
        self.blob = pretty;
        Ok(())
    }
}
