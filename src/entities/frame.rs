//! Keyframes. A `Frame` value is one span in a layer's run-length frame
//! list: it starts at `start_frame` and covers `duration` frames.
//!
//! Reference discipline: whenever a frame stores a library item name (its
//! sound, or an instance it holds) the owning library's bus gets a receiver
//! handle and the item's use count moves with it. Every attach path has a
//! matching detach path.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::event_bus::{Receiver, ReceiverKind};
use crate::entities::element::{self, BitmapInstance, Element, SymbolInstance};
use crate::entities::item::ItemData;
use crate::entities::library::Library;
use crate::entities::transform::Point;
use crate::entities::xfl_enum;
use crate::error::{Result, XflError};
use crate::markup::Node;

xfl_enum! {
    /// Role of a frame's label.
    LabelType {
        #[default]
        None => "none",
        Name => "name",
        Comment => "comment",
        Anchor => "anchor",
    }
}

xfl_enum! {
    /// How the frame's sound is synchronized with playback.
    SoundSync {
        #[default]
        Event => "event",
        Start => "start",
        Stop => "stop",
        Stream => "stream",
    }
}

xfl_enum! {
    /// Tween applied over this span.
    TweenType {
        #[default]
        None => "none",
        Motion => "motion",
        Shape => "shape",
    }
}

/// Authoring-tool key mode constants persisted in `keyMode`.
pub mod key_mode {
    pub const NORMAL: u32 = 9728;
    pub const CLASSIC_TWEEN: u32 = 22017;
    pub const SHAPE_TWEEN: u32 = 17922;
    pub const MOTION_TWEEN: u32 = 8195;
    pub const SHAPE_LAYERS: u32 = 8192;
}

/// Easing curve attached to a tweened span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Ease {
    /// Named easing method applied to one target property.
    Method { target: String, method: String },
    /// Free-form bezier ease.
    Custom { target: String, points: Vec<Point> },
}

impl Ease {
    pub fn to_node(&self) -> Node {
        match self {
            Ease::Method { target, method } => Node::new("Ease")
                .with_attr("target", target)
                .with_attr("method", method),
            Ease::Custom { target, points } => {
                let mut n = Node::new("CustomEase").with_attr("target", target);
                for p in points {
                    n.push(p.to_node());
                }
                n
            }
        }
    }

    pub fn from_node(node: &Node) -> Result<Option<Ease>> {
        match node.name.as_str() {
            "Ease" => Ok(Some(Ease::Method {
                target: node.attr_str("target", "all"),
                method: node.attr_str("method", ""),
            })),
            "CustomEase" => {
                let mut points = Vec::new();
                for p in node.children_named("Point") {
                    points.push(Point::from_node(p)?);
                }
                Ok(Some(Ease::Custom {
                    target: node.attr_str("target", "all"),
                    points,
                }))
            }
            _ => Ok(None),
        }
    }
}

/// One keyframe span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    id: Uuid,
    start_frame: usize,
    duration: usize,
    pub key_mode: u32,
    pub label_type: LabelType,
    /// Frame label; meaningful when `label_type` is not `None`.
    pub name: String,
    sound_name: String,
    pub sound_sync: SoundSync,
    pub tween_type: TweenType,
    pub motion_tween_snap: bool,
    eases: Vec<Ease>,
    elements: Vec<Element>,
}

impl Frame {
    pub fn new(start_frame: usize, duration: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_frame,
            duration: duration.max(1),
            key_mode: key_mode::NORMAL,
            label_type: LabelType::None,
            name: String::new(),
            sound_name: String::new(),
            sound_sync: SoundSync::Event,
            tween_type: TweenType::None,
            motion_tween_snap: false,
            eases: Vec::new(),
            elements: Vec::new(),
        }
    }

    // ========== Span geometry ==========

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn start_frame(&self) -> usize {
        self.start_frame
    }

    pub fn duration(&self) -> usize {
        self.duration
    }

    /// One past the last frame index this span covers.
    pub fn end_frame(&self) -> usize {
        self.start_frame + self.duration
    }

    pub fn covers(&self, frame_index: usize) -> bool {
        frame_index >= self.start_frame && frame_index < self.end_frame()
    }

    pub fn set_duration(&mut self, duration: usize) -> Result<()> {
        if duration == 0 {
            return Err(XflError::validation("frame duration must be at least 1"));
        }
        self.duration = duration;
        Ok(())
    }

    pub(crate) fn set_duration_raw(&mut self, duration: usize) {
        self.duration = duration;
    }

    pub(crate) fn set_start_frame(&mut self, start_frame: usize) {
        self.start_frame = start_frame;
    }

    pub(crate) fn shift_start(&mut self, delta: isize) {
        self.start_frame = (self.start_frame as isize + delta) as usize;
    }

    // ========== Contents ==========

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element_mut(&mut self, index: usize) -> Option<&mut Element> {
        self.elements.get_mut(index)
    }

    pub(crate) fn elements_mut(&mut self) -> &mut Vec<Element> {
        &mut self.elements
    }

    /// A keyframe with no elements ("blank").
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn eases(&self) -> &[Ease] {
        &self.eases
    }

    pub fn has_custom_ease(&self) -> bool {
        self.eases.iter().any(|e| matches!(e, Ease::Custom { .. }))
    }

    /// Method name of the first named ease, if any.
    pub fn ease_method_name(&self) -> Option<&str> {
        self.eases.iter().find_map(|e| match e {
            Ease::Method { method, .. } => Some(method.as_str()),
            Ease::Custom { .. } => None,
        })
    }

    pub fn sound_name(&self) -> &str {
        &self.sound_name
    }

    /// Assign or clear ("" clears) this frame's sound, keeping bus
    /// registration and use counts in step. A name that does not resolve in
    /// the library is stored without registration.
    pub fn set_sound_name(&mut self, name: &str, library: &mut Library) {
        if self.sound_name == name {
            return;
        }
        if !self.sound_name.is_empty() && library.item_exists(&self.sound_name) {
            let old = self.sound_name.clone();
            library.bus_mut().unregister(&old, self.id);
            library.decrement_use(&old);
        }
        self.sound_name = name.to_string();
        if !name.is_empty() && library.item_exists(name) {
            library
                .bus_mut()
                .register(name, Receiver { id: self.id, kind: ReceiverKind::FrameSound });
            library.increment_use(name);
        }
    }

    /// Place a library item on this keyframe. Sounds attach to the frame
    /// itself (`Ok(None)`); symbols and bitmaps become instances and the new
    /// element is returned. Folders are not placeable.
    pub fn add_item(&mut self, item_name: &str, library: &mut Library) -> Result<Option<&mut Element>> {
        // Classify first so the registry borrow ends before any mutation.
        enum Placed {
            Sound,
            Symbol(crate::entities::element::SymbolType),
            Bitmap,
        }
        let placed = {
            let item = library
                .item(item_name)
                .ok_or_else(|| XflError::not_found(format!("library item '{}'", item_name)))?;
            match &item.data {
                ItemData::Folder => {
                    return Err(XflError::validation(format!(
                        "folder '{}' cannot be placed on a frame",
                        item_name
                    )));
                }
                ItemData::Sound { .. } => Placed::Sound,
                ItemData::Symbol { symbol_type, .. } => Placed::Symbol(*symbol_type),
                ItemData::Bitmap { .. } => Placed::Bitmap,
            }
        };

        let element = match placed {
            Placed::Sound => {
                self.set_sound_name(item_name, library);
                return Ok(None);
            }
            Placed::Symbol(symbol_type) => {
                Element::SymbolInstance(SymbolInstance::new(item_name, symbol_type))
            }
            Placed::Bitmap => Element::BitmapInstance(BitmapInstance::new(item_name)),
        };

        library
            .bus_mut()
            .register(item_name, Receiver { id: element.id(), kind: ReceiverKind::Instance });
        library.increment_use(item_name);
        self.elements.push(element);
        Ok(self.elements.last_mut())
    }

    /// Drop all elements, releasing their library references.
    pub fn clear_elements(&mut self, library: &mut Library) {
        for el in &self.elements {
            el.for_each_reference(&mut |id, name| {
                if library.item_exists(name) {
                    library.bus_mut().unregister(name, id);
                    library.decrement_use(name);
                }
            });
        }
        self.elements.clear();
    }

    // ========== Reference wiring ==========

    /// Register this frame's sound and instance references (load wiring,
    /// and re-wiring after a clone).
    pub(crate) fn attach_references(&self, library: &mut Library) {
        if !self.sound_name.is_empty() && library.item_exists(&self.sound_name) {
            library
                .bus_mut()
                .register(&self.sound_name, Receiver { id: self.id, kind: ReceiverKind::FrameSound });
            library.increment_use(&self.sound_name);
        }
        for el in &self.elements {
            el.for_each_reference(&mut |id, name| {
                if library.item_exists(name) {
                    library
                        .bus_mut()
                        .register(name, Receiver { id, kind: ReceiverKind::Instance });
                    library.increment_use(name);
                }
            });
        }
    }

    /// Release everything `attach_references` acquired (span disposal).
    pub(crate) fn detach_references(&self, library: &mut Library) {
        if !self.sound_name.is_empty() && library.item_exists(&self.sound_name) {
            library.bus_mut().unregister(&self.sound_name, self.id);
            library.decrement_use(&self.sound_name);
        }
        for el in &self.elements {
            el.for_each_reference(&mut |id, name| {
                if library.item_exists(name) {
                    library.bus_mut().unregister(name, id);
                    library.decrement_use(name);
                }
            });
        }
    }

    /// Clone this span for a keyframe split or a layer duplicate: fresh
    /// ids everywhere, references registered for the clone. `blank` drops
    /// the element payload.
    pub(crate) fn duplicate(&self, blank: bool, library: &mut Library) -> Frame {
        let frame = Frame {
            id: Uuid::new_v4(),
            start_frame: self.start_frame,
            duration: self.duration,
            key_mode: self.key_mode,
            label_type: self.label_type,
            name: self.name.clone(),
            sound_name: self.sound_name.clone(),
            sound_sync: self.sound_sync,
            tween_type: self.tween_type,
            motion_tween_snap: self.motion_tween_snap,
            eases: self.eases.clone(),
            elements: if blank {
                Vec::new()
            } else {
                self.elements.iter().map(Element::clone_with_new_ids).collect()
            },
        };
        frame.attach_references(library);
        frame
    }

    // ========== Tweens ==========

    /// Classic motion tween over this span.
    pub fn create_motion_tween(&mut self, ease: Option<Ease>) {
        self.tween_type = TweenType::Motion;
        self.motion_tween_snap = true;
        self.key_mode = key_mode::CLASSIC_TWEEN;
        self.eases.clear();
        if let Some(e) = ease {
            self.eases.push(e);
        }
    }

    pub fn remove_tween(&mut self) {
        self.tween_type = TweenType::None;
        self.motion_tween_snap = false;
        self.key_mode = key_mode::NORMAL;
        self.eases.clear();
    }

    // ========== Library event application ==========

    pub(crate) fn apply_renamed(
        &mut self,
        old: &str,
        new: &str,
        ids: &HashSet<Uuid>,
        matched: &mut HashSet<Uuid>,
    ) {
        if ids.contains(&self.id) {
            matched.insert(self.id);
            if self.sound_name == old {
                self.sound_name = new.to_string();
            }
        }
        for el in &mut self.elements {
            el.apply_renamed(old, new, ids, matched);
        }
    }

    pub(crate) fn apply_removed(&mut self, name: &str, ids: &HashSet<Uuid>, matched: &mut HashSet<Uuid>) {
        if ids.contains(&self.id) {
            matched.insert(self.id);
            if self.sound_name == name {
                self.sound_name.clear();
            }
        }
        element::detach_removed(&mut self.elements, name, ids, matched);
    }

    // ========== Markup ==========

    pub fn to_node(&self) -> Node {
        let mut n = Node::new("DOMFrame");
        n.set_attr("index", self.start_frame);
        n.set_attr_unless("duration", &self.duration, &1);
        n.set_attr_unless("keyMode", &self.key_mode, &key_mode::NORMAL);
        if !self.name.is_empty() {
            n.set_attr("name", &self.name);
            n.set_attr_unless("labelType", &self.label_type, &LabelType::None);
        }
        n.set_attr_unless("soundName", &self.sound_name, &String::new());
        n.set_attr_unless("soundSync", &self.sound_sync, &SoundSync::Event);
        n.set_attr_unless("tweenType", &self.tween_type, &TweenType::None);
        if self.motion_tween_snap {
            n.set_attr("motionTweenSnap", "true");
        }
        // Both derived from the eases list; `from_node` re-derives rather
        // than reading them back.
        if self.has_custom_ease() {
            n.set_attr("hasCustomEase", "true");
        }
        if let Some(method) = self.ease_method_name() {
            n.set_attr("easeMethodName", method);
        }
        n.push_group("eases", self.eases.iter().map(Ease::to_node).collect());
        n.push_group("elements", self.elements.iter().map(Element::to_node).collect());
        n
    }

    /// Build a frame from its node. References are not registered here;
    /// the document wires them once the whole library is loaded.
    pub fn from_node(node: &Node) -> Result<Frame> {
        let mut frame = Frame::new(node.attr_req("index")?, node.attr_or("duration", 1)?);
        frame.key_mode = node.attr_or("keyMode", key_mode::NORMAL)?;
        frame.name = node.attr_str("name", "");
        frame.label_type = node.attr_or("labelType", LabelType::None)?;
        frame.sound_name = node.attr_str("soundName", "");
        frame.sound_sync = node.attr_or("soundSync", SoundSync::Event)?;
        frame.tween_type = node.attr_or("tweenType", TweenType::None)?;
        frame.motion_tween_snap = node.attr_or("motionTweenSnap", false)?;
        for ease_node in node.grandchildren("eases") {
            if let Some(e) = Ease::from_node(ease_node)? {
                frame.eases.push(e);
            }
        }
        for el_node in node.grandchildren("elements") {
            if let Some(el) = Element::from_node(el_node)? {
                frame.elements.push(el);
            }
        }
        Ok(frame)
    }
}
