//! In-memory model of Open Packaging Conventions (OPC) packages.
//!
//! A package is held as a flat mapping of part uri to [`PkgItem`]. This module
//! provides:
//!
//! - Reading and writing packages as ZIP archives or expanded directories
//! - Classification of items (content types, relationships, XML parts, other)
//! - Lookup by uri tail, pretty-printing of XML items and item substitution
//!
//! Parts are opaque blobs. Relationship targets and declared content types
//! are never validated.

pub mod constants;
pub mod error;
pub mod item;
pub mod package;
pub mod phys_pkg;
pub mod xml;

// Re-export commonly used types
pub use error::{ErrorKind, OpcError, Result};
pub use item::{ItemKind, PkgItem};
pub use package::Package;
pub use phys_pkg::{BlobCollection, DirPhysPkg, PhysPkg, PhysPkgBackend, ZipPhysPkg};
pub use xml::{XmlDocument, XmlElement, XmlNode};
