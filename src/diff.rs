//! Comparison of two packages.
//!
//! [`diff`] partitions the uris of two packages into those only in the first,
//! only in the second, and in both; items in both are compared byte for byte.
//! Changed items are rendered as unified line diffs of their presented text
//! (see [`ItemPresenter`]). [`diff_item`] renders one named item regardless of
//! whether it changed.

use crate::opc::error::Result;
use crate::opc::item::PkgItem;
use crate::opc::package::Package;
use crate::presenter::ItemPresenter;
use similar::TextDiff;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Tunables for rendering diffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
    /// Unchanged lines shown around each change
    pub context_lines: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self { context_lines: 3 }
    }
}

/// Uris of two packages partitioned by presence, each sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriSets {
    pub only_in_a: Vec<String>,
    pub only_in_b: Vec<String>,
    pub in_both: Vec<String>,
}

impl UriSets {
    pub fn of(a: &Package, b: &Package) -> Self {
        let uris_a: BTreeSet<&str> = a.uris().collect();
        let uris_b: BTreeSet<&str> = b.uris().collect();

        Self {
            only_in_a: uris_a
                .difference(&uris_b)
                .map(|uri| uri.to_string())
                .collect(),
            only_in_b: uris_b
                .difference(&uris_a)
                .map(|uri| uri.to_string())
                .collect(),
            in_both: uris_a
                .intersection(&uris_b)
                .map(|uri| uri.to_string())
                .collect(),
        }
    }
}

/// The rendered difference between one item in two packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDiff {
    pub uri: String,
    /// Unified diff body; empty when the two sides present identically
    pub body: String,
}

impl ItemDiff {
    /// Render the line diff between two versions of an item.
    ///
    /// XML items are compared on their presented text. If either side is not
    /// XML the body is a single line noting the difference.
    pub fn render(a: &PkgItem, b: &PkgItem, options: &DiffOptions) -> Result<Self> {
        let body = if a.kind().is_xml() && b.kind().is_xml() {
            let text_a = ItemPresenter::new(a).text()?;
            let text_b = ItemPresenter::new(b).text()?;
            unified_diff(&text_a, &text_b, a, b, options)
        } else if a.blob() == b.blob() {
            String::new()
        } else {
            format!(
                "Binary items {} and {} differ\n",
                a.path().display(),
                b.path().display()
            )
        };

        Ok(Self {
            uri: a.uri().to_string(),
            body,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

impl fmt::Display for ItemDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.body)
    }
}

/// Result of diffing two packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDiff {
    pub label_a: String,
    pub label_b: String,
    pub only_in_a: Vec<String>,
    pub only_in_b: Vec<String>,
    /// Items present in both packages whose blobs differ, sorted by uri
    pub changed: Vec<ItemDiff>,
    /// Uris present in both packages with identical blobs
    pub unchanged: Vec<String>,
}

impl PackageDiff {
    /// True when the packages hold the same uris with the same blobs.
    pub fn is_identical(&self) -> bool {
        self.only_in_a.is_empty() && self.only_in_b.is_empty() && self.changed.is_empty()
    }

    pub fn changed_uris(&self) -> impl Iterator<Item = &str> {
        self.changed.iter().map(|d| d.uri.as_str())
    }
}

impl fmt::Display for PackageDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Only in {} ({}):", self.label_a, self.only_in_a.len())?;
        for uri in &self.only_in_a {
            writeln!(f, "  {}", uri)?;
        }

        writeln!(f, "Only in {} ({}):", self.label_b, self.only_in_b.len())?;
        for uri in &self.only_in_b {
            writeln!(f, "  {}", uri)?;
        }

        writeln!(f, "Changed ({}):", self.changed.len())?;
        for item_diff in &self.changed {
            writeln!(f, "  {}", item_diff.uri)?;
        }
        for item_diff in &self.changed {
            f.write_str(&item_diff.body)?;
        }

        writeln!(f, "Unchanged: {}", self.unchanged.len())
    }
}

/// Compare every item of two packages. Neither package is modified.
pub fn diff(a: &Package, b: &Package, options: &DiffOptions) -> Result<PackageDiff> {
    let sets = UriSets::of(a, b);
    let mut changed = Vec::new();
    let mut unchanged = Vec::new();

    for (item_a, item_b) in a
        .items()
        .filter_map(|item_a| b.get(item_a.uri()).map(|item_b| (item_a, item_b)))
    {
        if item_a.blob() == item_b.blob() {
            unchanged.push(item_a.uri().to_string());
        } else {
            changed.push(ItemDiff::render(item_a, item_b, options)?);
        }
    }

    debug!(
        only_in_a = sets.only_in_a.len(),
        only_in_b = sets.only_in_b.len(),
        changed = changed.len(),
        unchanged = unchanged.len(),
        "diffed packages"
    );

    Ok(PackageDiff {
        label_a: a.root_uri().to_string(),
        label_b: b.root_uri().to_string(),
        only_in_a: sets.only_in_a,
        only_in_b: sets.only_in_b,
        changed,
        unchanged,
    })
}

/// Diff the item matching `uri_tail` in each package.
///
/// The body is empty when both sides present identically.
pub fn diff_item(
    a: &Package,
    b: &Package,
    uri_tail: &str,
    options: &DiffOptions,
) -> Result<ItemDiff> {
    let item_a = a.find_item_by_uri_tail(uri_tail)?;
    let item_b = b.find_item_by_uri_tail(uri_tail)?;
    ItemDiff::render(item_a, item_b, options)
}

fn unified_diff(text_a: &str, text_b: &str, a: &PkgItem, b: &PkgItem, options: &DiffOptions) -> String {
    if text_a == text_b {
        return String::new();
    }
    let path_a = a.path().display().to_string();
    let path_b = b.path().display().to_string();
    TextDiff::from_lines(text_a, text_b)
        .unified_diff()
        .context_radius(options.context_lines)
        .header(&path_a, &path_b)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CT: &str = r#"<Types><Default Extension="xml" ContentType="application/xml"/></Types>"#;
    const S1: &str = "<p:sldMaster><p:cSld name=\"one\"/><p:clrMap/></p:sldMaster>";
    const S2: &str = "<p:sldMaster><p:cSld name=\"two\"/><p:clrMap/></p:sldMaster>";
    const SLIDE_MASTER: &str = "ppt/slideMasters/slideMaster1.xml";

    fn package(root: &str, items: &[(&str, &str)]) -> Package {
        Package::new(
            root,
            items
                .iter()
                .map(|(uri, blob)| PkgItem::new(root, *uri, blob.as_bytes().to_vec())),
        )
    }

    #[test]
    fn test_diff_against_itself() {
        let pkg = package("a", &[("[Content_Types].xml", CT), (SLIDE_MASTER, S1)]);
        let result = diff(&pkg, &pkg, &DiffOptions::default()).unwrap();

        assert!(result.is_identical());
        assert_eq!(result.unchanged, vec!["[Content_Types].xml", SLIDE_MASTER]);
        assert_eq!(
            result.to_string(),
            "Only in a (0):\nOnly in a (0):\nChanged (0):\nUnchanged: 2\n"
        );
    }

    #[test]
    fn test_diff_reports_changed_slide_master() {
        let a = package("base", &[("[Content_Types].xml", CT), (SLIDE_MASTER, S1)]);
        let b = package("changed", &[("[Content_Types].xml", CT), (SLIDE_MASTER, S2)]);
        let result = diff(&a, &b, &DiffOptions::default()).unwrap();

        assert!(result.only_in_a.is_empty());
        assert!(result.only_in_b.is_empty());
        assert_eq!(result.changed_uris().collect::<Vec<_>>(), vec![SLIDE_MASTER]);
        assert_eq!(result.unchanged, vec!["[Content_Types].xml"]);

        let body = &result.changed[0].body;
        assert!(body.contains("-  <p:cSld name=\"one\"/>\n"), "{body}");
        assert!(body.contains("+  <p:cSld name=\"two\"/>\n"), "{body}");
        assert!(body.contains(&format!("--- {}", a.get(SLIDE_MASTER).unwrap().path().display())));
    }

    #[test]
    fn test_diff_presence_sets() {
        let a = package("a", &[("only/a.xml", "<a/>"), ("both.xml", "<x/>")]);
        let b = package("b", &[("only/b.xml", "<b/>"), ("both.xml", "<x/>")]);
        let sets = UriSets::of(&a, &b);

        assert_eq!(sets.only_in_a, vec!["only/a.xml"]);
        assert_eq!(sets.only_in_b, vec!["only/b.xml"]);
        assert_eq!(sets.in_both, vec!["both.xml"]);

        let report = diff(&a, &b, &DiffOptions::default()).unwrap().to_string();
        assert_eq!(
            report,
            "Only in a (1):\n  only/a.xml\nOnly in b (1):\n  only/b.xml\nChanged (0):\nUnchanged: 1\n"
        );
    }

    #[test]
    fn test_diff_binary_item() {
        let a = Package::new("a", [PkgItem::new("a", "media/image1.png", vec![1, 2, 3])]);
        let b = Package::new("b", [PkgItem::new("b", "media/image1.png", vec![1, 2, 4])]);
        let result = diff(&a, &b, &DiffOptions::default()).unwrap();
        assert_eq!(result.changed.len(), 1);
        assert!(result.changed[0].body.starts_with("Binary items "));
    }

    #[test]
    fn test_diff_item_identical_has_empty_body() {
        let a = package("a", &[(SLIDE_MASTER, S1)]);
        let b = package("b", &[(SLIDE_MASTER, S1)]);
        let item_diff = diff_item(&a, &b, "slideMaster1.xml", &DiffOptions::default()).unwrap();
        assert_eq!(item_diff.uri, SLIDE_MASTER);
        assert!(item_diff.is_empty());
    }

    #[test]
    fn test_diff_item_ignores_formatting_only_changes() {
        let a = package("a", &[(SLIDE_MASTER, S1)]);
        let reformatted = "<?xml version=\"1.0\"?>\n<p:sldMaster>\n<p:cSld name=\"one\"/>\n<p:clrMap/>\n</p:sldMaster>";
        let b = package("b", &[(SLIDE_MASTER, reformatted)]);
        let item_diff = diff_item(&a, &b, SLIDE_MASTER, &DiffOptions::default()).unwrap();
        assert!(item_diff.is_empty());
    }

    #[test]
    fn test_diff_item_context_lines() {
        let a = package("a", &[("x.xml", "<r><a/><b/><c/><d/><e/><f/><g/></r>")]);
        let b = package("b", &[("x.xml", "<r><a/><b/><c/><D/><e/><f/><g/></r>")]);

        let narrow = diff_item(&a, &b, "x.xml", &DiffOptions { context_lines: 0 }).unwrap();
        assert!(!narrow.body.contains("  <c/>"));

        let wide = diff_item(&a, &b, "x.xml", &DiffOptions { context_lines: 1 }).unwrap();
        assert!(wide.body.contains("  <c/>"));
        assert!(!wide.body.contains("  <b/>"));
    }

    #[test]
    fn test_diff_item_missing() {
        let a = package("a", &[("x.xml", "<a/>")]);
        let b = package("b", &[("y.xml", "<a/>")]);
        assert!(diff_item(&a, &b, "x.xml", &DiffOptions::default()).is_err());
    }
}
