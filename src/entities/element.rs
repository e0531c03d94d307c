//! Elements placed on keyframes: shapes, symbol/bitmap instances, text,
//! and groups.
//!
//! Every placement gets a runtime uuid. The uuid never persists; it exists
//! so the library event bus can hold non-owning handles to instances.

use std::collections::HashSet;

use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::transform::{Matrix, Point};
use crate::entities::xfl_enum;
use crate::error::Result;
use crate::markup::Node;

xfl_enum! {
    /// How a graphic symbol instance advances relative to its host timeline.
    LoopMode {
        #[default]
        Loop => "loop",
        PlayOnce => "play once",
        SingleFrame => "single frame",
        LoopReverse => "loop reverse",
        PlayOnceReverse => "play once reverse",
    }
}

xfl_enum! {
    /// Behavior class of a symbol.
    SymbolType {
        #[default]
        MovieClip => "movie clip",
        Graphic => "graphic",
        Button => "button",
    }
}

xfl_enum! {
    /// Compositing mode of an instance.
    BlendMode {
        #[default]
        Normal => "normal",
        Layer => "layer",
        Darken => "darken",
        Multiply => "multiply",
        Lighten => "lighten",
        Screen => "screen",
        Overlay => "overlay",
        Hardlight => "hardlight",
        Add => "add",
        Subtract => "subtract",
        Difference => "difference",
        Invert => "invert",
        Alpha => "alpha",
        Erase => "erase",
    }
}

xfl_enum! {
    /// Paragraph alignment of a text element.
    TextAlign {
        #[default]
        Left => "left",
        Center => "center",
        Right => "right",
        Justify => "justify",
    }
}

/// State shared by every element variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementCommon {
    pub id: Uuid,
    pub name: String,
    pub selected: bool,
    pub matrix: Matrix,
    pub transformation_point: Point,
}

impl Default for ElementCommon {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            selected: false,
            matrix: Matrix::default(),
            transformation_point: Point::default(),
        }
    }
}

impl ElementCommon {
    fn write_into(&self, node: &mut Node) {
        node.set_attr_unless("name", &self.name, &String::new());
        if self.selected {
            node.set_attr("isSelected", "true");
        }
        if !self.matrix.is_default() {
            let mut wrap = Node::new("matrix");
            wrap.push(self.matrix.to_node());
            node.push(wrap);
        }
        if !self.transformation_point.is_default() {
            let mut wrap = Node::new("transformationPoint");
            wrap.push(self.transformation_point.to_node());
            node.push(wrap);
        }
    }

    fn read_from(node: &Node) -> Result<Self> {
        let matrix = match node.child("matrix").and_then(|w| w.child("Matrix")) {
            Some(m) => Matrix::from_node(m)?,
            None => Matrix::default(),
        };
        let transformation_point = match node
            .child("transformationPoint")
            .and_then(|w| w.child("Point"))
        {
            Some(p) => Point::from_node(p)?,
            None => Point::default(),
        };
        Ok(Self {
            id: Uuid::new_v4(),
            name: node.attr_str("name", ""),
            selected: node.attr_or("isSelected", false)?,
            matrix,
            transformation_point,
        })
    }
}

/// Vector shape. Fill and edge subtrees are carried opaquely so documents
/// round-trip; shape reconstruction is out of scope for this model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Shape {
    pub common: ElementCommon,
    pub fills: Vec<Node>,
    pub edges: Vec<Node>,
}

/// Placement of a library symbol on a keyframe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolInstance {
    pub common: ElementCommon,
    pub library_item_name: String,
    pub symbol_type: SymbolType,
    pub first_frame: usize,
    pub last_frame: Option<usize>,
    pub loop_mode: LoopMode,
    pub blend_mode: BlendMode,
}

impl SymbolInstance {
    pub fn new(library_item_name: impl Into<String>, symbol_type: SymbolType) -> Self {
        Self {
            common: ElementCommon::default(),
            library_item_name: library_item_name.into(),
            symbol_type,
            first_frame: 0,
            last_frame: None,
            loop_mode: LoopMode::default(),
            blend_mode: BlendMode::default(),
        }
    }
}

/// Placement of a library bitmap on a keyframe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitmapInstance {
    pub common: ElementCommon,
    pub library_item_name: String,
}

impl BitmapInstance {
    pub fn new(library_item_name: impl Into<String>) -> Self {
        Self {
            common: ElementCommon::default(),
            library_item_name: library_item_name.into(),
        }
    }
}

/// Static text block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Text {
    pub common: ElementCommon,
    pub width: f64,
    pub height: f64,
    pub characters: String,
    pub alignment: TextAlign,
}

/// Nested group of elements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Group {
    pub common: ElementCommon,
    pub members: Vec<Element>,
}

/// Anything that can sit on a keyframe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Element {
    Shape(Shape),
    SymbolInstance(SymbolInstance),
    BitmapInstance(BitmapInstance),
    Text(Text),
    Group(Group),
}

impl Element {
    pub fn common(&self) -> &ElementCommon {
        match self {
            Element::Shape(e) => &e.common,
            Element::SymbolInstance(e) => &e.common,
            Element::BitmapInstance(e) => &e.common,
            Element::Text(e) => &e.common,
            Element::Group(e) => &e.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut ElementCommon {
        match self {
            Element::Shape(e) => &mut e.common,
            Element::SymbolInstance(e) => &mut e.common,
            Element::BitmapInstance(e) => &mut e.common,
            Element::Text(e) => &mut e.common,
            Element::Group(e) => &mut e.common,
        }
    }

    pub fn id(&self) -> Uuid {
        self.common().id
    }

    /// The library item this element references, for instance variants.
    pub fn library_item_name(&self) -> Option<&str> {
        match self {
            Element::SymbolInstance(e) => Some(&e.library_item_name),
            Element::BitmapInstance(e) => Some(&e.library_item_name),
            _ => None,
        }
    }

    /// Deep clone with fresh uuids on every placement. Callers re-register
    /// the clone's references with the library.
    pub fn clone_with_new_ids(&self) -> Element {
        let mut cloned = self.clone();
        cloned.refresh_ids();
        cloned
    }

    fn refresh_ids(&mut self) {
        self.common_mut().id = Uuid::new_v4();
        if let Element::Group(g) = self {
            for m in &mut g.members {
                m.refresh_ids();
            }
        }
    }

    /// Visit every library reference in this element (recursing groups).
    pub(crate) fn for_each_reference(&self, f: &mut impl FnMut(Uuid, &str)) {
        match self {
            Element::SymbolInstance(e) => f(e.common.id, &e.library_item_name),
            Element::BitmapInstance(e) => f(e.common.id, &e.library_item_name),
            Element::Group(g) => {
                for m in &g.members {
                    m.for_each_reference(f);
                }
            }
            _ => {}
        }
    }

    /// Rewrite stored names after a library rename. Only receivers in `ids`
    /// are touched; every id seen is recorded in `matched` for pruning.
    pub(crate) fn apply_renamed(
        &mut self,
        old: &str,
        new: &str,
        ids: &HashSet<Uuid>,
        matched: &mut HashSet<Uuid>,
    ) {
        match self {
            Element::SymbolInstance(e) if ids.contains(&e.common.id) => {
                matched.insert(e.common.id);
                if e.library_item_name == old {
                    e.library_item_name = new.to_string();
                }
            }
            Element::BitmapInstance(e) if ids.contains(&e.common.id) => {
                matched.insert(e.common.id);
                if e.library_item_name == old {
                    e.library_item_name = new.to_string();
                }
            }
            Element::Group(g) => {
                for m in &mut g.members {
                    m.apply_renamed(old, new, ids, matched);
                }
            }
            _ => {}
        }
    }

    // ========== Markup ==========

    pub fn to_node(&self) -> Node {
        match self {
            Element::Shape(e) => {
                let mut n = Node::new("DOMShape");
                e.common.write_into(&mut n);
                n.push_group("fills", e.fills.clone());
                n.push_group("edges", e.edges.clone());
                n
            }
            Element::SymbolInstance(e) => {
                let mut n = Node::new("DOMSymbolInstance");
                n.set_attr("libraryItemName", &e.library_item_name);
                n.set_attr_unless("symbolType", &e.symbol_type, &SymbolType::MovieClip);
                n.set_attr_unless("firstFrame", &e.first_frame, &0);
                if let Some(last) = e.last_frame {
                    n.set_attr("lastFrame", last);
                }
                n.set_attr_unless("loop", &e.loop_mode, &LoopMode::Loop);
                n.set_attr_unless("blendMode", &e.blend_mode, &BlendMode::Normal);
                e.common.write_into(&mut n);
                n
            }
            Element::BitmapInstance(e) => {
                let mut n = Node::new("DOMBitmapInstance");
                n.set_attr("libraryItemName", &e.library_item_name);
                e.common.write_into(&mut n);
                n
            }
            Element::Text(e) => {
                let mut n = Node::new("DOMStaticText");
                n.set_attr("width", e.width);
                n.set_attr("height", e.height);
                n.set_attr_unless("alignment", &e.alignment, &TextAlign::Left);
                n.set_attr_unless("characters", &e.characters, &String::new());
                e.common.write_into(&mut n);
                n
            }
            Element::Group(e) => {
                let mut n = Node::new("DOMGroup");
                e.common.write_into(&mut n);
                n.push_group("members", e.members.iter().map(Element::to_node).collect());
                n
            }
        }
    }

    /// Build an element from its node. Unhandled element kinds are skipped
    /// (`Ok(None)`) so an unfamiliar document still loads.
    pub fn from_node(node: &Node) -> Result<Option<Element>> {
        let el = match node.name.as_str() {
            "DOMShape" => Element::Shape(Shape {
                common: ElementCommon::read_from(node)?,
                fills: node.grandchildren("fills").cloned().collect(),
                edges: node.grandchildren("edges").cloned().collect(),
            }),
            "DOMSymbolInstance" => Element::SymbolInstance(SymbolInstance {
                common: ElementCommon::read_from(node)?,
                library_item_name: node.attr_str("libraryItemName", ""),
                symbol_type: node.attr_or("symbolType", SymbolType::MovieClip)?,
                first_frame: node.attr_or("firstFrame", 0)?,
                last_frame: match node.attr("lastFrame") {
                    Some(_) => Some(node.attr_req("lastFrame")?),
                    None => None,
                },
                loop_mode: node.attr_or("loop", LoopMode::Loop)?,
                blend_mode: node.attr_or("blendMode", BlendMode::Normal)?,
            }),
            "DOMBitmapInstance" => Element::BitmapInstance(BitmapInstance {
                common: ElementCommon::read_from(node)?,
                library_item_name: node.attr_str("libraryItemName", ""),
            }),
            "DOMStaticText" => Element::Text(Text {
                common: ElementCommon::read_from(node)?,
                width: node.attr_or("width", 0.0)?,
                height: node.attr_or("height", 0.0)?,
                characters: node.attr_str("characters", ""),
                alignment: node.attr_or("alignment", TextAlign::Left)?,
            }),
            "DOMGroup" => {
                let mut members = Vec::new();
                for child in node.grandchildren("members") {
                    if let Some(m) = Element::from_node(child)? {
                        members.push(m);
                    }
                }
                Element::Group(Group {
                    common: ElementCommon::read_from(node)?,
                    members,
                })
            }
            other => {
                warn!("skipping unhandled element <{}>", other);
                return Ok(None);
            }
        };
        Ok(Some(el))
    }
}

/// Remove instances of a deleted item from an element list, recursing into
/// groups. Only receivers in `ids` are detached; seen ids go to `matched`.
pub(crate) fn detach_removed(
    elements: &mut Vec<Element>,
    name: &str,
    ids: &HashSet<Uuid>,
    matched: &mut HashSet<Uuid>,
) {
    elements.retain_mut(|el| match el {
        Element::SymbolInstance(e) if ids.contains(&e.common.id) => {
            matched.insert(e.common.id);
            e.library_item_name != name
        }
        Element::BitmapInstance(e) if ids.contains(&e.common.id) => {
            matched.insert(e.common.id);
            e.library_item_name != name
        }
        Element::Group(g) => {
            detach_removed(&mut g.members, name, ids, matched);
            true
        }
        _ => true,
    });
}
