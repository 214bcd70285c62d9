//! XMP packet parsing with `quick-xml`.
//!
//! The packet is flattened into `XMP:<prefix>:<name>` keys:
//!
//! - attributes of `rdf:Description` (and other property elements) become text values
//! - simple property elements become text values
//! - `rdf:Bag` / `rdf:Seq` / `rdf:Alt` containers become lists of their `rdf:li` items
//!
//! Namespace declarations and RDF plumbing (`rdf:about`, `xml:lang`, ...) are skipped.

use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::path::Path;

use super::{MetaValue, MetadataMap, XMP_PREFIX};
use crate::container;

/// Read the XMP packet embedded in an image, if any.
///
/// An image without a packet yields an empty map.
pub fn read_xmp_map(path: &Path) -> Result<MetadataMap> {
    match container::xmp_packet(path)? {
        Some(packet) => parse_xmp(&packet),
        None => Ok(MetadataMap::new()),
    }
}

/// Flatten an XMP packet into a [`MetadataMap`].
pub fn parse_xmp(packet: &str) -> Result<MetadataMap> {
    let mut reader = Reader::from_str(packet);
    reader.config_mut().trim_text(true);

    let mut map = MetadataMap::new();
    // Qualified names of the open elements
    let mut stack: Vec<String> = Vec::new();
    // (owning property, items) for each open rdf container
    let mut lists: Vec<(String, Vec<String>)> = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            anyhow::anyhow!("Malformed XMP at byte {}: {e}", reader.buffer_position())
        })?;

        match event {
            Event::Start(e) => {
                let name = qualified_name(&e);
                collect_attributes(&e, &name, &mut map)?;
                if is_container(&name) {
                    let owner = stack.last().cloned().unwrap_or_default();
                    lists.push((owner, Vec::new()));
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                let name = qualified_name(&e);
                collect_attributes(&e, &name, &mut map)?;
            }
            Event::Text(t) => {
                let text = t.unescape().context("Bad XMP text")?.trim().to_string();
                if text.is_empty() {
                    continue;
                }
                match stack.last() {
                    Some(current) if current == "rdf:li" => {
                        if let Some((_, items)) = lists.last_mut() {
                            items.push(text);
                        }
                    }
                    Some(current) if is_property(current) => {
                        insert(&mut map, current, MetaValue::Text(text));
                    }
                    _ => {}
                }
            }
            Event::End(_) => {
                if let Some(name) = stack.pop() {
                    if is_container(&name) {
                        if let Some((owner, items)) = lists.pop() {
                            if is_property(&owner) && !items.is_empty() {
                                insert(&mut map, &owner, MetaValue::List(items));
                            }
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        anyhow::bail!("XMP packet ends inside <{open}>");
    }

    Ok(map)
}

fn qualified_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_string()
}

fn collect_attributes(e: &BytesStart<'_>, element: &str, map: &mut MetadataMap) -> Result<()> {
    for attr in e.attributes() {
        let attr = attr.context("Bad XMP attribute")?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value().context("Bad XMP attribute value")?;

        // <xmpMM:DerivedFrom rdf:resource="..."/> carries the property value
        if key == "rdf:resource" && is_property(element) {
            insert(map, element, MetaValue::Text(value.to_string()));
            continue;
        }
        if is_property(&key) && !value.trim().is_empty() {
            insert(map, &key, MetaValue::Text(value.trim().to_string()));
        }
    }
    Ok(())
}

/// `rdf:Bag`, `rdf:Seq`, `rdf:Alt`.
fn is_container(name: &str) -> bool {
    matches!(name, "rdf:Bag" | "rdf:Seq" | "rdf:Alt")
}

/// Anything outside the RDF/XML plumbing namespaces.
fn is_property(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with("rdf:")
        && !name.starts_with("x:")
        && !name.starts_with("xml:")
        && !name.starts_with("xmlns")
}

/// First occurrence of a property wins.
fn insert(map: &mut MetadataMap, name: &str, value: MetaValue) {
    map.entry(format!("{XMP_PREFIX}{name}")).or_insert(value);
}
