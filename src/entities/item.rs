//! Library items: folders, bitmaps, sounds, and symbols.
//!
//! Items are keyed by their path-like name ("folder/sub/item"); the slash
//! hierarchy is a naming convention, folders exist as items of their own.
//! Use counts are advisory (how many placements reference the item), they
//! never gate removal.

use serde::{Deserialize, Serialize};

use crate::entities::element::SymbolType;
use crate::entities::timeline::Timeline;
use crate::error::{Result, XflError};
use crate::markup::Node;

/// Kind-specific payload of a library item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ItemData {
    Folder,
    Bitmap {
        href: String,
        bitmap_data_href: String,
        width: u32,
        height: u32,
    },
    Sound {
        href: String,
        sound_data_href: String,
        sample_rate: u32,
        sample_count: u64,
        duration_secs: f64,
    },
    Symbol {
        href: String,
        symbol_type: SymbolType,
        timeline: Box<Timeline>,
    },
}

/// One entry in the library registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    name: String,
    use_count: usize,
    pub data: ItemData,
}

impl Item {
    pub fn folder(name: impl Into<String>) -> Self {
        Self { name: name.into(), use_count: 0, data: ItemData::Folder }
    }

    pub fn bitmap(name: impl Into<String>, href: String, bitmap_data_href: String, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            use_count: 0,
            data: ItemData::Bitmap { href, bitmap_data_href, width, height },
        }
    }

    pub fn sound(
        name: impl Into<String>,
        href: String,
        sound_data_href: String,
        sample_rate: u32,
        sample_count: u64,
        duration_secs: f64,
    ) -> Self {
        Self {
            name: name.into(),
            use_count: 0,
            data: ItemData::Sound { href, sound_data_href, sample_rate, sample_count, duration_secs },
        }
    }

    /// New empty symbol: one timeline named after the last path segment,
    /// with a single layer spanning one frame.
    pub fn new_symbol(name: impl Into<String>, symbol_type: SymbolType) -> Self {
        let name = name.into();
        let mut timeline = Timeline::new(last_segment(&name));
        timeline.add_new_layer("Layer_1", crate::entities::layer::LayerType::Normal);
        Self {
            name: name.clone(),
            use_count: 0,
            data: ItemData::Symbol {
                href: format!("{}.xml", name),
                symbol_type,
                timeline: Box::new(timeline),
            },
        }
    }

    // ========== Accessors ==========

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn use_count(&self) -> usize {
        self.use_count
    }

    pub(crate) fn increment_use(&mut self) {
        self.use_count += 1;
    }

    pub(crate) fn decrement_use(&mut self) {
        self.use_count = self.use_count.saturating_sub(1);
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.data, ItemData::Folder)
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self.data, ItemData::Symbol { .. })
    }

    pub fn is_sound(&self) -> bool {
        matches!(self.data, ItemData::Sound { .. })
    }

    pub fn is_bitmap(&self) -> bool {
        matches!(self.data, ItemData::Bitmap { .. })
    }

    pub fn href(&self) -> Option<&str> {
        match &self.data {
            ItemData::Folder => None,
            ItemData::Bitmap { href, .. } => Some(href),
            ItemData::Sound { href, .. } => Some(href),
            ItemData::Symbol { href, .. } => Some(href),
        }
    }

    pub fn symbol_timeline(&self) -> Option<&Timeline> {
        match &self.data {
            ItemData::Symbol { timeline, .. } => Some(timeline),
            _ => None,
        }
    }

    pub fn symbol_timeline_mut(&mut self) -> Option<&mut Timeline> {
        match &mut self.data {
            ItemData::Symbol { timeline, .. } => Some(timeline),
            _ => None,
        }
    }

    /// Rename the item in place, cascading to its href and (for symbols)
    /// its timeline name. Registry re-keying is the library's job.
    pub(crate) fn set_name(&mut self, new_name: &str) {
        self.name = new_name.to_string();
        match &mut self.data {
            ItemData::Folder => {}
            ItemData::Bitmap { href, .. } | ItemData::Sound { href, .. } => {
                *href = new_name.to_string();
            }
            ItemData::Symbol { href, timeline, .. } => {
                *href = format!("{}.xml", new_name);
                timeline.name = last_segment(new_name).to_string();
            }
        }
    }

    // ========== Markup ==========

    /// Node for the library section of the document (folders/media groups,
    /// or the `<Include>` reference for symbols).
    pub fn to_library_node(&self) -> Node {
        match &self.data {
            ItemData::Folder => {
                Node::new("DOMFolderItem").with_attr("name", &self.name)
            }
            ItemData::Bitmap { href, bitmap_data_href, width, height } => {
                let mut n = Node::new("DOMBitmapItem");
                n.set_attr("name", &self.name);
                n.set_attr("href", href);
                n.set_attr("bitmapDataHRef", bitmap_data_href);
                n.set_attr_unless("hPixels", width, &0);
                n.set_attr_unless("vPixels", height, &0);
                n
            }
            ItemData::Sound { href, sound_data_href, sample_rate, sample_count, duration_secs } => {
                let mut n = Node::new("DOMSoundItem");
                n.set_attr("name", &self.name);
                n.set_attr("href", href);
                n.set_attr("soundDataHRef", sound_data_href);
                n.set_attr_unless("sampleRate", sample_rate, &0);
                n.set_attr_unless("sampleCount", sample_count, &0);
                n.set_attr_unless("duration", duration_secs, &0.0);
                n
            }
            ItemData::Symbol { href, .. } => {
                Node::new("Include").with_attr("href", href)
            }
        }
    }

    /// Root node of a symbol's own document ("LIBRARY/<href>").
    pub fn symbol_document_node(&self) -> Option<Node> {
        match &self.data {
            ItemData::Symbol { symbol_type, timeline, .. } => {
                let mut n = Node::new("DOMSymbolItem");
                n.set_attr("name", &self.name);
                n.set_attr_unless("symbolType", symbol_type, &SymbolType::MovieClip);
                let mut wrap = Node::new("timeline");
                wrap.push(timeline.to_node());
                n.push(wrap);
                Some(n)
            }
            _ => None,
        }
    }

    pub fn folder_from_node(node: &Node) -> Result<Item> {
        Ok(Item::folder(required_name(node)?))
    }

    pub fn bitmap_from_node(node: &Node) -> Result<Item> {
        let name = required_name(node)?;
        Ok(Item::bitmap(
            name,
            node.attr_str("href", ""),
            node.attr_str("bitmapDataHRef", ""),
            node.attr_or("hPixels", 0)?,
            node.attr_or("vPixels", 0)?,
        ))
    }

    pub fn sound_from_node(node: &Node) -> Result<Item> {
        let name = required_name(node)?;
        Ok(Item::sound(
            name,
            node.attr_str("href", ""),
            node.attr_str("soundDataHRef", ""),
            node.attr_or("sampleRate", 0)?,
            node.attr_or("sampleCount", 0)?,
            node.attr_or("duration", 0.0)?,
        ))
    }

    /// Build a symbol item from its own document root.
    pub fn symbol_from_document(node: &Node, href: &str) -> Result<Item> {
        if node.name != "DOMSymbolItem" {
            return Err(XflError::validation(format!(
                "expected <DOMSymbolItem>, got <{}>",
                node.name
            )));
        }
        let name = required_name(node)?;
        let timeline = match node.child("timeline").and_then(|w| w.child("DOMTimeline")) {
            Some(t) => Timeline::from_node(t)?,
            None => Timeline::new(last_segment(&name)),
        };
        Ok(Item {
            name,
            use_count: 0,
            data: ItemData::Symbol {
                href: href.to_string(),
                symbol_type: node.attr_or("symbolType", SymbolType::MovieClip)?,
                timeline: Box::new(timeline),
            },
        })
    }
}

fn required_name(node: &Node) -> Result<String> {
    let name = node.attr_str("name", "");
    if name.is_empty() {
        return Err(XflError::validation(format!(
            "<{}> without a name attribute",
            node.name
        )));
    }
    Ok(name)
}

/// Last path segment of an item name ("a/b/c" → "c").
pub(crate) fn last_segment(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
