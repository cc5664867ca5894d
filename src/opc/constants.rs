//! Fixed names used throughout the package model.
//!
//! Item classification is driven entirely by these values.

/// Part names and suffixes that determine an item's role
pub mod uri {
    /// The content-types manifest, always at the package root
    pub const CONTENT_TYPES: &str = "[Content_Types].xml";

    /// The package-level relationships item
    pub const PACKAGE_RELS: &str = "_rels/.rels";

    /// Suffix identifying a relationships item
    pub const RELS_SUFFIX: &str = ".rels";

    /// Suffix identifying an XML part
    pub const XML_SUFFIX: &str = ".xml";

    /// Separator between the segments of a part uri
    pub const SEPARATOR: char = '/';
}

/// Element and attribute names the presenter sorts on
pub mod element {
    pub const DEFAULT: &str = "Default";
    pub const OVERRIDE: &str = "Override";
    pub const RELATIONSHIP: &str = "Relationship";

    pub const ATTR_EXTENSION: &str = "Extension";
    pub const ATTR_PART_NAME: &str = "PartName";
    pub const ATTR_ID: &str = "Id";
}

/// Serialization settings for pretty-printed XML
pub mod pretty {
    /// Declaration emitted at the top of every prettified XML blob
    pub const XML_DECLARATION: &str = "<?xml version='1.0' encoding='UTF-8' standalone='yes'?>";

    /// Indentation added per nesting level
    pub const INDENT: &str = "  ";
}
