//! The in-memory package model.
//!
//! A [`Package`] is a mapping of uri to [`PkgItem`], read from and saved to a
//! physical representation through a [`PhysPkgBackend`]. Parts are treated as
//! opaque blobs; nothing here checks relationships or content types.
use crate::opc::constants::uri as names;
use crate::opc::error::{OpcError, Result};
use crate::opc::item::PkgItem;
use crate::opc::phys_pkg::{BlobCollection, DirPhysPkg, PhysPkg, PhysPkgBackend, ZipPhysPkg};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Origin the package was read from
    root_uri: Arc<str>,

    /// All items, keyed by their own uri
    items: BTreeMap<String, PkgItem>,
}

impl Package {
    /// Create a package from items. Each item is keyed by its own uri; a later
    /// item with the same uri replaces an earlier one.
    ///
    /// Every item is rebound to `root_uri`, so all items share the package's
    /// root whatever they were created with.
    pub fn new(root_uri: impl Into<Arc<str>>, items: impl IntoIterator<Item = PkgItem>) -> Self {
        let root_uri: Arc<str> = root_uri.into();
        let items = items
            .into_iter()
            .map(|mut item| {
                item.set_root_uri(Arc::clone(&root_uri));
                (item.uri().to_string(), item)
            })
            .collect();
        Self { root_uri, items }
    }

    /// Read a package from a ZIP archive or an expanded directory.
    ///
    /// # Example
    /// ```no_run
    /// use opc_diag::opc::Package;
    ///
    /// let pkg = Package::read("presentation.pptx")?;
    /// let core = pkg.find_item_by_uri_tail("core.xml")?;
    /// println!("{}", core.path().display());
    /// # Ok::<(), opc_diag::opc::OpcError>(())
    /// ```
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_phys_pkg(PhysPkg::read(path)?))
    }

    /// Read a package using a specific backend.
    pub fn read_with<B: PhysPkgBackend + ?Sized>(backend: &B, path: &Path) -> Result<Self> {
        Ok(Self::from_phys_pkg(backend.read(path)?))
    }

    fn from_phys_pkg(phys_pkg: PhysPkg) -> Self {
        let (root_uri, blobs) = phys_pkg.into_parts();
        let items = blobs
            .into_iter()
            .map(|(uri, blob)| {
                let item = PkgItem::new(Arc::clone(&root_uri), uri.clone(), blob);
                (uri, item)
            })
            .collect();
        Self { root_uri, items }
    }

    pub fn root_uri(&self) -> &str {
        &self.root_uri
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the item with exactly this uri.
    pub fn get(&self, uri: &str) -> Option<&PkgItem> {
        self.items.get(uri)
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.items.contains_key(uri)
    }

    /// All uris, sorted ascending.
    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    /// All items, sorted ascending by uri.
    pub fn items(&self) -> impl Iterator<Item = &PkgItem> {
        self.items.values()
    }

    /// Find the unique item whose uri ends with `tail` on a segment boundary.
    ///
    /// `"core.xml"` matches `"docProps/core.xml"` but not `"docProps/mycore.xml"`.
    /// A tail that starts with `/` carries its own boundary.
    ///
    /// # Errors
    /// [`OpcError::ItemNotFound`] if nothing matches, [`OpcError::AmbiguousUri`]
    /// if more than one item does.
    pub fn find_item_by_uri_tail(&self, tail: &str) -> Result<&PkgItem> {
        let mut matches = self
            .items
            .values()
            .filter(|item| uri_has_tail(item.uri(), tail));

        let first = matches
            .next()
            .ok_or_else(|| OpcError::ItemNotFound(tail.to_string()))?;

        let rest: Vec<&PkgItem> = matches.collect();
        if rest.is_empty() {
            return Ok(first);
        }

        let matches = std::iter::once(first)
            .chain(rest)
            .map(|item| item.uri().to_string())
            .collect();
        Err(OpcError::AmbiguousUri {
            tail: tail.to_string(),
            matches,
        })
    }

    /// Relationship items, sorted by uri.
    pub fn rels_items(&self) -> Vec<&PkgItem> {
        self.items.values().filter(|item| item.is_rels_item()).collect()
    }

    /// XML parts (excluding the content-types manifest), sorted by uri.
    pub fn xml_parts(&self) -> Vec<&PkgItem> {
        self.items.values().filter(|item| item.is_xml_part()).collect()
    }

    /// Pretty-print every XML-bearing item in place. Binary items are left
    /// untouched.
    ///
    /// Stops at the first malformed item; items before it stay prettified.
    pub fn prettify_xml(&mut self) -> Result<()> {
        for item in self.items.values_mut().filter(|item| item.kind().is_xml()) {
            item.prettify_xml()?;
        }
        Ok(())
    }

    /// Replace the blob of the item with the same uri as `other`.
    ///
    /// # Errors
    /// [`OpcError::ItemNotFound`] if this package has no item at that uri.
    pub fn substitute_item(&mut self, other: &PkgItem) -> Result<()> {
        let item = self
            .items
            .get_mut(other.uri())
            .ok_or_else(|| OpcError::ItemNotFound(other.uri().to_string()))?;
        item.set_blob(other.blob().to_vec());
        debug!(uri = other.uri(), from = other.root_uri(), "substituted item");
        Ok(())
    }

    /// Flatten to uri → blob.
    pub fn blob_collection(&self) -> BlobCollection {
        self.items
            .iter()
            .map(|(uri, item)| (uri.clone(), item.blob().to_vec()))
            .collect()
    }

    /// Save as a ZIP archive at `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save_with(&ZipPhysPkg, path.as_ref())
    }

    /// Save as an expanded directory at `path`.
    pub fn save_to_dir<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save_with(&DirPhysPkg, path.as_ref())
    }

    pub fn save_with<B: PhysPkgBackend + ?Sized>(&self, backend: &B, path: &Path) -> Result<()> {
        backend.write(&self.blob_collection(), path)
    }
}

/// Whether `uri` ends with `tail` at a segment boundary.
fn uri_has_tail(uri: &str, tail: &str) -> bool {
    if tail.is_empty() || !uri.ends_with(tail) {
        return false;
    }
    let head = &uri[..uri.len() - tail.len()];
    head.is_empty() || head.ends_with(names::SEPARATOR) || tail.starts_with(names::SEPARATOR)
}
