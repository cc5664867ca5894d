//! Text presentation of package items.
//!
//! Every XML item is shown pretty-printed. The content-types manifest and
//! relationship items are additionally normalized so that two packages
//! declaring the same things in a different order present identically:
//! `Default` entries sort by extension ahead of `Override` entries sorted by
//! part name, and relationships sort by id in natural order (`rId2` before
//! `rId10`).

use crate::opc::constants::element;
use crate::opc::error::Result;
use crate::opc::item::{ItemKind, PkgItem};
use crate::opc::xml::{XmlElement, XmlNode};
use std::cmp::Ordering;

/// Formats a single item for display.
pub struct ItemPresenter<'a> {
    item: &'a PkgItem,
}

impl<'a> ItemPresenter<'a> {
    pub fn new(item: &'a PkgItem) -> Self {
        Self { item }
    }

    pub fn item(&self) -> &'a PkgItem {
        self.item
    }

    /// Presented text of the item, always ending in a newline.
    ///
    /// # Errors
    /// Malformed-xml if the item's blob does not parse, which includes any
    /// binary media.
    pub fn text(&self) -> Result<String> {
        let mut doc = self.item.element()?;
        match self.item.kind() {
            ItemKind::ContentTypes => sort_elements(doc.root_mut(), content_types_order),
            ItemKind::Rels => sort_elements(doc.root_mut(), rels_order),
            ItemKind::XmlPart | ItemKind::Other => {}
        }

        let mut text = doc.to_pretty_string();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        Ok(text)
    }
}

/// Stable-sort the children of `root`. Non-element children keep their
/// relative order after the elements.
fn sort_elements(root: &mut XmlElement, order: fn(&XmlElement, &XmlElement) -> Ordering) {
    root.children_mut().sort_by(|a, b| match (a, b) {
        (XmlNode::Element(a), XmlNode::Element(b)) => order(a, b),
        (XmlNode::Element(_), _) => Ordering::Less,
        (_, XmlNode::Element(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    });
}

fn content_types_order(a: &XmlElement, b: &XmlElement) -> Ordering {
    content_types_key(a).cmp(&content_types_key(b))
}

fn content_types_key(e: &XmlElement) -> (u8, &str) {
    match e.local_name() {
        element::DEFAULT => (0, e.attribute(element::ATTR_EXTENSION).unwrap_or("")),
        element::OVERRIDE => (1, e.attribute(element::ATTR_PART_NAME).unwrap_or("")),
        _ => (2, ""),
    }
}

fn rels_order(a: &XmlElement, b: &XmlElement) -> Ordering {
    rels_key(a).cmp(&rels_key(b))
}

fn rels_key(e: &XmlElement) -> (bool, NaturalKey<'_>) {
    let is_rel = e.local_name() == element::RELATIONSHIP;
    (!is_rel, NaturalKey::new(e.attribute(element::ATTR_ID).unwrap_or("")))
}

/// Sort key splitting an id into its text prefix and trailing number.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct NaturalKey<'a> {
    prefix: &'a str,
    number: Option<u64>,
    raw: &'a str,
}

impl<'a> NaturalKey<'a> {
    fn new(raw: &'a str) -> Self {
        let digits_at = raw
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(i, _)| i)
            .unwrap_or(raw.len());
        let (prefix, digits) = raw.split_at(digits_at);
        Self {
            prefix,
            number: digits.parse().ok(),
            raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::error::OpcError;

    const DECL: &str = "<?xml version='1.0' encoding='UTF-8' standalone='yes'?>\n";

    #[test]
    fn test_content_types_are_sorted() {
        let item = PkgItem::new(
            "root",
            "[Content_Types].xml",
            br#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Override PartName="/ppt/slides/slide1.xml" ContentType="a"/><Default Extension="xml" ContentType="b"/><Override PartName="/docProps/core.xml" ContentType="c"/><Default Extension="rels" ContentType="d"/></Types>"#
                .to_vec(),
        );
        let text = ItemPresenter::new(&item).text().unwrap();
        let expected = format!(
            "{DECL}<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\n\
             \x20 <Default Extension=\"rels\" ContentType=\"d\"/>\n\
             \x20 <Default Extension=\"xml\" ContentType=\"b\"/>\n\
             \x20 <Override PartName=\"/docProps/core.xml\" ContentType=\"c\"/>\n\
             \x20 <Override PartName=\"/ppt/slides/slide1.xml\" ContentType=\"a\"/>\n\
             </Types>\n"
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_rels_are_sorted_naturally() {
        let item = PkgItem::new(
            "root",
            "ppt/_rels/presentation.xml.rels",
            br#"<Relationships><Relationship Id="rId10" Target="a"/><Relationship Id="rId2" Target="b"/><Relationship Id="rId1" Target="c"/></Relationships>"#
                .to_vec(),
        );
        let text = ItemPresenter::new(&item).text().unwrap();
        let ids: Vec<&str> = text
            .lines()
            .filter_map(|line| line.trim().strip_prefix("<Relationship Id=\""))
            .map(|rest| rest.split('"').next().unwrap())
            .collect();
        assert_eq!(ids, vec!["rId1", "rId2", "rId10"]);
    }

    #[test]
    fn test_xml_part_is_not_reordered() {
        let item = PkgItem::new("root", "docProps/core.xml", b"<cp><b/><a/></cp>".to_vec());
        let text = ItemPresenter::new(&item).text().unwrap();
        assert_eq!(text, format!("{DECL}<cp>\n  <b/>\n  <a/>\n</cp>\n"));
    }

    #[test]
    fn test_binary_item_is_not_presentable() {
        let item = PkgItem::new("root", "ppt/media/image1.png", vec![0x89, b'P', b'N', b'G']);
        let err = ItemPresenter::new(&item).text().unwrap_err();
        assert!(matches!(err, OpcError::MalformedXml { .. }));
    }

    #[test]
    fn test_natural_key() {
        let mut ids = vec!["rId10", "rId9", "rId1", "x", "rId", "rId02"];
        ids.sort_by(|a, b| NaturalKey::new(a).cmp(&NaturalKey::new(b)));
        assert_eq!(ids, vec!["rId", "rId1", "rId02", "rId9", "rId10", "x"]);
    }
}
