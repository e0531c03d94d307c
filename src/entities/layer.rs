//! Layers and the keyframe span index.
//!
//! A layer's frame list is run-length encoded: each `Frame` covers
//! `[start_frame, start_frame + duration)`. Invariants maintained by every
//! mutation here:
//! - spans are sorted by `start_frame` and gap-free,
//! - the first span starts at 0,
//! - every duration is at least 1.
//!
//! Lookups binary-search the list; a miss inside the nominal range means a
//! broken invariant and surfaces as a Structural error.
//!
//! Folder layers carry no frames; frame operations on them are rejected.

use log::debug;

use serde::{Deserialize, Serialize};

use crate::entities::element::{Element, LoopMode};
use crate::entities::frame::Frame;
use crate::entities::library::Library;
use crate::entities::xfl_enum;
use crate::error::{Result, XflError};
use crate::markup::Node;

xfl_enum! {
    /// Role of a layer in the timeline.
    LayerType {
        #[default]
        Normal => "normal",
        Guide => "guide",
        Guided => "guided",
        Mask => "mask",
        Masked => "masked",
        Folder => "folder",
        Camera => "camera",
    }
}

const DEFAULT_COLOR: &str = "#4FFF4F";

/// One layer: a keyframe span list plus folder back-pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub layer_type: LayerType,
    pub color: String,
    pub locked: bool,
    pub current: bool,
    pub selected: bool,
    pub visible: bool,
    /// Flat-list index of the containing folder layer, if any.
    pub parent_layer_index: Option<usize>,
    frames: Vec<Frame>,
}

impl Layer {
    pub fn new(name: impl Into<String>, layer_type: LayerType) -> Self {
        Self {
            name: name.into(),
            layer_type,
            color: DEFAULT_COLOR.to_string(),
            locked: false,
            current: false,
            selected: false,
            visible: true,
            parent_layer_index: None,
            frames: Vec::new(),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.layer_type == LayerType::Folder
    }

    fn reject_folder(&self, op: &str) -> Result<()> {
        if self.is_folder() {
            return Err(XflError::validation(format!(
                "{} on folder layer '{}'",
                op, self.name
            )));
        }
        Ok(())
    }

    // ========== Span index ==========

    /// Number of frames this layer spans (one past the last covered index).
    pub fn frame_count(&self) -> usize {
        self.frames.last().map(Frame::end_frame).unwrap_or(0)
    }

    pub fn keyframe_count(&self) -> usize {
        self.frames.len()
    }

    pub fn keyframes(&self) -> &[Frame] {
        &self.frames
    }

    pub fn keyframe(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn keyframe_mut(&mut self, index: usize) -> Option<&mut Frame> {
        self.frames.get_mut(index)
    }

    pub(crate) fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub(crate) fn frames_mut(&mut self) -> &mut Vec<Frame> {
        &mut self.frames
    }

    /// Index into the keyframe list of the span covering `frame_index`.
    ///
    /// Out-of-range is `NotFound`; a miss inside the range means the list
    /// lost its sorted gap-free shape and is `Structural`.
    pub fn get_keyframe_index(&self, frame_index: usize) -> Result<usize> {
        if frame_index >= self.frame_count() {
            return Err(XflError::not_found(format!(
                "frame {} on layer '{}' (spans {})",
                frame_index,
                self.name,
                self.frame_count()
            )));
        }
        let mut lo = 0usize;
        let mut hi = self.frames.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            let f = &self.frames[mid];
            if f.covers(frame_index) {
                return Ok(mid);
            }
            if frame_index < f.start_frame() {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        Err(XflError::structural(format!(
            "no keyframe span covers frame {} on layer '{}'",
            frame_index, self.name
        )))
    }

    /// The span covering `frame_index`.
    pub fn get_frame(&self, frame_index: usize) -> Result<&Frame> {
        let idx = self.get_keyframe_index(frame_index)?;
        Ok(&self.frames[idx])
    }

    pub fn get_frame_mut(&mut self, frame_index: usize) -> Result<&mut Frame> {
        let idx = self.get_keyframe_index(frame_index)?;
        Ok(&mut self.frames[idx])
    }

    /// Does a keyframe start exactly at `frame_index`?
    pub fn is_keyframe(&self, frame_index: usize) -> Result<bool> {
        let idx = self.get_keyframe_index(frame_index)?;
        Ok(self.frames[idx].start_frame() == frame_index)
    }

    // ========== Keyframe insertion ==========

    /// Split the covering span so a new keyframe starts at `frame_index`,
    /// copying the current content forward. If `frame_index` is already a
    /// keyframe start the split moves one frame right (authoring-tool
    /// behavior); `Ok(false)` when no split is possible there.
    pub fn insert_keyframe(&mut self, frame_index: usize, library: &mut Library) -> Result<bool> {
        self.insert_keyframe_inner(frame_index, false, library)
    }

    /// Like `insert_keyframe` but the new span starts empty.
    pub fn insert_blank_keyframe(
        &mut self,
        frame_index: usize,
        library: &mut Library,
    ) -> Result<bool> {
        self.insert_keyframe_inner(frame_index, true, library)
    }

    fn insert_keyframe_inner(
        &mut self,
        mut frame_index: usize,
        blank: bool,
        library: &mut Library,
    ) -> Result<bool> {
        self.reject_folder("insert_keyframe")?;
        let index = self.get_keyframe_index(frame_index)?;
        if self.frames[index].start_frame() == frame_index {
            frame_index += 1;
        }
        if frame_index >= self.frame_count() {
            return Ok(false);
        }
        if self.get_keyframe_index(frame_index)? != index {
            // Slid onto the next span's start, which is already a keyframe.
            return Ok(false);
        }
        self.split_span(index, frame_index, blank, library);
        Ok(true)
    }

    /// Split `frames[index]` at `at` (strictly inside the span). The new
    /// span inherits the content (unless blank) and, for looping symbol
    /// instances, a re-derived first frame so playback phase is preserved.
    fn split_span(&mut self, index: usize, at: usize, blank: bool, library: &mut Library) {
        let old_start = self.frames[index].start_frame();
        let old_duration = self.frames[index].duration();

        let mut new_frame = self.frames[index].duplicate(blank, library);
        new_frame.set_start_frame(at);
        new_frame.set_duration_raw(old_duration + old_start - at);
        self.frames[index].set_duration_raw(at - old_start);

        if !blank {
            rederive_loop_phase(new_frame.elements_mut(), at - old_start, library);
        }
        self.frames.insert(index + 1, new_frame);
        debug!(
            "layer '{}': split span [{}, {}) at {}",
            self.name,
            old_start,
            old_start + old_duration,
            at
        );
    }

    /// Make every frame in `[start, end]` a keyframe. `Ok(true)` if any
    /// span was split.
    pub fn convert_to_keyframes(
        &mut self,
        start: usize,
        end: usize,
        library: &mut Library,
    ) -> Result<bool> {
        self.reject_folder("convert_to_keyframes")?;
        if end < start {
            return Err(XflError::validation("empty keyframe conversion range"));
        }
        let mut changed = false;
        for frame_index in start..=end {
            let index = self.get_keyframe_index(frame_index)?;
            if self.frames[index].start_frame() != frame_index {
                self.split_span(index, frame_index, false, library);
                changed = true;
            }
        }
        Ok(changed)
    }

    // ========== Keyframe removal ==========

    /// Remove the keyframe starting at `frame_index`, merging its span into
    /// a neighbor. `Ok(false)` when `frame_index` is not a keyframe start.
    /// The only keyframe of a layer is not removed, just emptied.
    pub fn clear_keyframe(&mut self, frame_index: usize, library: &mut Library) -> Result<bool> {
        self.reject_folder("clear_keyframe")?;
        let index = self.get_keyframe_index(frame_index)?;
        if self.frames[index].start_frame() != frame_index {
            return Ok(false);
        }

        if self.frames.len() == 1 {
            self.frames[0].clear_elements(library);
            return Ok(true);
        }

        if index == 0 {
            // No predecessor: the successor absorbs the span and re-bases
            // to frame 0.
            let duration = self.frames[0].duration();
            let next_duration = self.frames[1].duration();
            self.frames[1].set_duration_raw(next_duration + duration);
            self.frames[1].set_start_frame(0);
        } else {
            let duration = self.frames[index].duration();
            let prev_duration = self.frames[index - 1].duration();
            self.frames[index - 1].set_duration_raw(prev_duration + duration);
        }
        let removed = self.frames.remove(index);
        removed.detach_references(library);
        Ok(true)
    }

    // ========== Frame count changes ==========

    /// Stretch the span covering `at` by `count` frames, shifting every
    /// later span right.
    pub fn insert_frames(&mut self, count: usize, at: usize) -> Result<()> {
        self.reject_folder("insert_frames")?;
        if count == 0 {
            return Ok(());
        }
        let index = self.get_keyframe_index(at)?;
        let duration = self.frames[index].duration();
        self.frames[index].set_duration_raw(duration + count);
        for f in &mut self.frames[index + 1..] {
            f.shift_start(count as isize);
        }
        Ok(())
    }

    /// Remove `count` frames starting at `at`, span by span. Spans emptied
    /// entirely are dropped (and their references released); partially
    /// covered spans shrink. Trailing spans re-base left after each step.
    pub fn remove_frames(&mut self, count: usize, at: usize, library: &mut Library) -> Result<()> {
        self.reject_folder("remove_frames")?;
        if count == 0 {
            return Ok(());
        }
        if at + count > self.frame_count() {
            return Err(XflError::not_found(format!(
                "frame range [{}, {}) on layer '{}' (spans {})",
                at,
                at + count,
                self.name,
                self.frame_count()
            )));
        }

        let mut remaining = count;
        while remaining > 0 {
            let index = self.get_keyframe_index(at)?;
            let span_start = self.frames[index].start_frame();
            let span_duration = self.frames[index].duration();
            let available = span_start + span_duration - at;
            let take = remaining.min(available);

            let shift_from;
            if at == span_start && take == span_duration {
                let removed = self.frames.remove(index);
                removed.detach_references(library);
                shift_from = index;
            } else {
                self.frames[index].set_duration_raw(span_duration - take);
                shift_from = index + 1;
            }
            for f in &mut self.frames[shift_from..] {
                f.shift_start(-(take as isize));
            }
            remaining -= take;
        }
        Ok(())
    }

    // ========== Duplication & disposal ==========

    /// Deep copy for layer duplication: every span cloned with fresh ids
    /// and re-registered references.
    pub(crate) fn duplicate(&self, library: &mut Library) -> Layer {
        Layer {
            name: self.name.clone(),
            layer_type: self.layer_type,
            color: self.color.clone(),
            locked: self.locked,
            current: false,
            selected: false,
            visible: self.visible,
            parent_layer_index: self.parent_layer_index,
            frames: self.frames.iter().map(|f| f.duplicate(false, library)).collect(),
        }
    }

    pub(crate) fn attach_references(&self, library: &mut Library) {
        for f in &self.frames {
            f.attach_references(library);
        }
    }

    pub(crate) fn detach_references(&self, library: &mut Library) {
        for f in &self.frames {
            f.detach_references(library);
        }
    }

    // ========== Markup ==========

    pub fn to_node(&self) -> Node {
        let mut n = Node::new("DOMLayer");
        n.set_attr("name", &self.name);
        n.set_attr_unless("color", &self.color, &DEFAULT_COLOR.to_string());
        n.set_attr_unless("layerType", &self.layer_type, &LayerType::Normal);
        if self.locked {
            n.set_attr("locked", "true");
        }
        if self.current {
            n.set_attr("current", "true");
        }
        if self.selected {
            n.set_attr("isSelected", "true");
        }
        if !self.visible {
            n.set_attr("visible", "false");
        }
        if let Some(parent) = self.parent_layer_index {
            n.set_attr("parentLayerIndex", parent);
        }
        n.push_group("frames", self.frames.iter().map(Frame::to_node).collect());
        n
    }

    pub fn from_node(node: &Node) -> Result<Layer> {
        let mut layer = Layer::new(node.attr_str("name", ""), node.attr_or("layerType", LayerType::Normal)?);
        layer.color = node.attr_str("color", DEFAULT_COLOR);
        layer.locked = node.attr_or("locked", false)?;
        layer.current = node.attr_or("current", false)?;
        layer.selected = node.attr_or("isSelected", false)?;
        layer.visible = node.attr_or("visible", true)?;
        layer.parent_layer_index = match node.attr("parentLayerIndex") {
            Some(_) => Some(node.attr_req("parentLayerIndex")?),
            None => None,
        };
        for frame_node in node.grandchildren("frames") {
            if frame_node.name == "DOMFrame" {
                layer.frames.push(Frame::from_node(frame_node)?);
            }
        }
        Ok(layer)
    }
}

/// Re-derive the first frame of looping symbol instances after a span
/// split, so the second half keeps the phase the first half reached.
/// `distance` is how far into the original span the split happened.
///
/// The loop window comes from the instance itself: an explicit
/// `last_frame` bounds it (`last_frame - first_frame + 1` frames, play
/// once clamps to `last_frame`); otherwise the window is the referenced
/// symbol timeline's full frame count.
fn rederive_loop_phase(elements: &mut [Element], distance: usize, library: &Library) {
    for el in elements {
        match el {
            Element::SymbolInstance(inst) => {
                let len = match inst.last_frame {
                    Some(last) => last.saturating_sub(inst.first_frame) + 1,
                    None => match library.symbol_loop_length(&inst.library_item_name) {
                        Some(n) => n,
                        None => continue,
                    },
                };
                if len == 0 {
                    continue;
                }
                let last = inst.last_frame.unwrap_or(len - 1);
                inst.first_frame = match inst.loop_mode {
                    LoopMode::Loop => (inst.first_frame + distance) % len,
                    LoopMode::PlayOnce => (inst.first_frame + distance).min(last),
                    LoopMode::LoopReverse => {
                        (inst.first_frame as isize - distance as isize).rem_euclid(len as isize)
                            as usize
                    }
                    LoopMode::PlayOnceReverse => inst.first_frame.saturating_sub(distance),
                    LoopMode::SingleFrame => inst.first_frame,
                };
            }
            Element::Group(g) => rederive_loop_phase(&mut g.members, distance, library),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::element::SymbolType;
    use crate::entities::item::Item;

    fn span_layer(durations: &[usize]) -> Layer {
        let mut layer = Layer::new("L", LayerType::Normal);
        let mut start = 0;
        for &d in durations {
            layer.push_frame(Frame::new(start, d));
            start += d;
        }
        layer
    }

    fn spans(layer: &Layer) -> Vec<(usize, usize)> {
        layer
            .keyframes()
            .iter()
            .map(|f| (f.start_frame(), f.duration()))
            .collect()
    }

    fn assert_gap_free(layer: &Layer) {
        let mut expected = 0;
        for f in layer.keyframes() {
            assert_eq!(f.start_frame(), expected, "gap before span");
            assert!(f.duration() >= 1);
            expected = f.end_frame();
        }
    }

    #[test]
    fn test_get_keyframe_index() {
        let layer = span_layer(&[5, 3, 10]);
        assert_eq!(layer.frame_count(), 18);
        assert_eq!(layer.get_keyframe_index(0).unwrap(), 0);
        assert_eq!(layer.get_keyframe_index(4).unwrap(), 0);
        assert_eq!(layer.get_keyframe_index(5).unwrap(), 1);
        assert_eq!(layer.get_keyframe_index(17).unwrap(), 2);
        assert!(matches!(
            layer.get_keyframe_index(18),
            Err(XflError::NotFound(_))
        ));
    }

    #[test]
    fn test_lookup_miss_is_structural() {
        let mut layer = Layer::new("L", LayerType::Normal);
        // Corrupt list: gap between spans.
        layer.push_frame(Frame::new(0, 2));
        layer.push_frame(Frame::new(5, 3));
        assert!(matches!(
            layer.get_keyframe_index(3),
            Err(XflError::Structural(_))
        ));
    }

    #[test]
    fn test_insert_keyframe_splits_span() {
        let mut lib = Library::new();
        let mut layer = span_layer(&[10]);

        assert!(layer.insert_keyframe(4, &mut lib).unwrap());
        assert_eq!(spans(&layer), vec![(0, 4), (4, 6)]);
        assert_gap_free(&layer);

        // At an existing keyframe start the split slides one right.
        assert!(layer.insert_keyframe(4, &mut lib).unwrap());
        assert_eq!(spans(&layer), vec![(0, 4), (4, 1), (5, 5)]);
    }

    #[test]
    fn test_insert_keyframe_inside_last_span_splits() {
        let mut lib = Library::new();
        let mut layer = span_layer(&[4, 4]);

        // Interior of the last span is an ordinary split.
        assert!(layer.insert_keyframe(7, &mut lib).unwrap());
        assert_eq!(spans(&layer), vec![(0, 4), (4, 3), (7, 1)]);
        assert_gap_free(&layer);
    }

    #[test]
    fn test_insert_keyframe_refusals() {
        let mut lib = Library::new();

        // Sliding off the end: the only frame is already a keyframe start.
        let mut layer = span_layer(&[1]);
        assert!(!layer.insert_keyframe(0, &mut lib).unwrap());
        assert_eq!(spans(&layer), vec![(0, 1)]);

        // Sliding onto the next span's start, which is already a keyframe.
        let mut layer = span_layer(&[1, 4]);
        assert!(!layer.insert_keyframe(0, &mut lib).unwrap());
        assert_eq!(spans(&layer), vec![(0, 1), (1, 4)]);

        assert!(matches!(
            layer.insert_keyframe(99, &mut lib),
            Err(XflError::NotFound(_))
        ));

        let mut folder = Layer::new("F", LayerType::Folder);
        assert!(matches!(
            folder.insert_keyframe(0, &mut lib),
            Err(XflError::Validation(_))
        ));
    }

    #[test]
    fn test_insert_blank_keyframe_drops_content() {
        let mut lib = Library::new();
        lib.insert_item(Item::new_symbol("s", SymbolType::Graphic));
        let mut layer = span_layer(&[6]);
        layer
            .keyframe_mut(0)
            .unwrap()
            .add_item("s", &mut lib)
            .unwrap();

        assert!(layer.insert_blank_keyframe(3, &mut lib).unwrap());
        assert_eq!(spans(&layer), vec![(0, 3), (3, 3)]);
        assert!(!layer.keyframe(0).unwrap().is_empty());
        assert!(layer.keyframe(1).unwrap().is_empty());
        // Only the surviving copy counts.
        assert_eq!(lib.use_count("s"), Some(1));
    }

    #[test]
    fn test_loop_phase_rederivation() {
        let mut lib = Library::new();
        lib.insert_item(Item::new_symbol("cycle", SymbolType::Graphic));
        // Symbol timeline spanning 8 frames.
        lib.with_symbol_timeline("cycle", |tl, lib| {
            tl.layer_mut(0).unwrap().insert_frames(7, 0).unwrap();
            let _ = lib;
        })
        .unwrap();

        let mut layer = span_layer(&[10]);
        {
            let el = layer
                .keyframe_mut(0)
                .unwrap()
                .add_item("cycle", &mut lib)
                .unwrap()
                .unwrap();
            if let Element::SymbolInstance(inst) = el {
                inst.first_frame = 5;
            }
        }

        // Split 6 frames in: loop phase (5 + 6) % 8 = 3.
        assert!(layer.insert_keyframe(6, &mut lib).unwrap());
        let second = layer.keyframe(1).unwrap();
        match &second.elements()[0] {
            Element::SymbolInstance(inst) => assert_eq!(inst.first_frame, 3),
            other => panic!("wrong variant: {:?}", other),
        }
        // First half untouched.
        match &layer.keyframe(0).unwrap().elements()[0] {
            Element::SymbolInstance(inst) => assert_eq!(inst.first_frame, 5),
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_insert_then_clear_restores_span() {
        let mut lib = Library::new();
        let mut layer = span_layer(&[24]);

        assert!(layer.insert_keyframe(10, &mut lib).unwrap());
        assert_eq!(spans(&layer), vec![(0, 10), (10, 14)]);
        assert!(layer.clear_keyframe(10, &mut lib).unwrap());
        assert_eq!(spans(&layer), vec![(0, 24)]);
    }

    #[test]
    fn test_insert_then_remove_frames_restores_spans() {
        let mut lib = Library::new();
        let mut layer = span_layer(&[5, 5, 5]);
        let before = spans(&layer);

        layer.insert_frames(4, 6).unwrap();
        assert_eq!(layer.frame_count(), 19);
        layer.remove_frames(4, 6, &mut lib).unwrap();
        assert_eq!(spans(&layer), before);
    }

    #[test]
    fn test_loop_phase_window_from_last_frame() {
        let mut lib = Library::new();
        lib.insert_item(Item::new_symbol("clip", SymbolType::Graphic));
        lib.with_symbol_timeline("clip", |tl, _| {
            tl.layer_mut(0).unwrap().insert_frames(11, 0).unwrap();
        })
        .unwrap();

        let mut layer = span_layer(&[10]);
        for loop_mode in [LoopMode::Loop, LoopMode::PlayOnce] {
            let el = layer
                .keyframe_mut(0)
                .unwrap()
                .add_item("clip", &mut lib)
                .unwrap()
                .unwrap();
            if let Element::SymbolInstance(inst) = el {
                inst.loop_mode = loop_mode;
                inst.first_frame = 2;
                inst.last_frame = Some(5);
            }
        }

        // The window is [2, 5]: four frames, not the symbol's twelve.
        assert!(layer.insert_keyframe(6, &mut lib).unwrap());
        let second = layer.keyframe(1).unwrap();
        match &second.elements()[0] {
            // (2 + 6) % 4
            Element::SymbolInstance(inst) => assert_eq!(inst.first_frame, 0),
            other => panic!("wrong variant: {:?}", other),
        }
        match &second.elements()[1] {
            // min(2 + 6, last_frame)
            Element::SymbolInstance(inst) => assert_eq!(inst.first_frame, 5),
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_loop_phase_reverse_modes() {
        let mut lib = Library::new();
        lib.insert_item(Item::new_symbol("cycle", SymbolType::Graphic));
        lib.with_symbol_timeline("cycle", |tl, _| {
            tl.layer_mut(0).unwrap().insert_frames(7, 0).unwrap();
        })
        .unwrap();

        let mut layer = span_layer(&[10]);
        for (loop_mode, first) in [(LoopMode::LoopReverse, 2), (LoopMode::PlayOnceReverse, 3)] {
            let el = layer
                .keyframe_mut(0)
                .unwrap()
                .add_item("cycle", &mut lib)
                .unwrap()
                .unwrap();
            if let Element::SymbolInstance(inst) = el {
                inst.loop_mode = loop_mode;
                inst.first_frame = first;
            }
        }

        assert!(layer.insert_keyframe(5, &mut lib).unwrap());
        let second = layer.keyframe(1).unwrap();
        match &second.elements()[0] {
            // (2 - 5) wrapped over 8 frames
            Element::SymbolInstance(inst) => assert_eq!(inst.first_frame, 5),
            other => panic!("wrong variant: {:?}", other),
        }
        match &second.elements()[1] {
            // 3 - 5 clamped at 0
            Element::SymbolInstance(inst) => assert_eq!(inst.first_frame, 0),
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_clear_keyframe_merges() {
        let mut lib = Library::new();
        let mut layer = span_layer(&[4, 3, 5]);

        // Middle: predecessor absorbs.
        assert!(layer.clear_keyframe(4, &mut lib).unwrap());
        assert_eq!(spans(&layer), vec![(0, 7), (7, 5)]);

        // First: successor absorbs and re-bases to 0.
        assert!(layer.clear_keyframe(0, &mut lib).unwrap());
        assert_eq!(spans(&layer), vec![(0, 12)]);

        // Not a keyframe start.
        assert!(!layer.clear_keyframe(3, &mut lib).unwrap());

        // Last remaining keyframe is emptied, not removed.
        assert!(layer.clear_keyframe(0, &mut lib).unwrap());
        assert_eq!(spans(&layer), vec![(0, 12)]);
        assert_gap_free(&layer);
    }

    #[test]
    fn test_insert_frames_stretches_cover() {
        let mut layer = span_layer(&[4, 4]);
        layer.insert_frames(3, 2).unwrap();
        assert_eq!(spans(&layer), vec![(0, 7), (7, 4)]);
        layer.insert_frames(2, 7).unwrap();
        assert_eq!(spans(&layer), vec![(0, 7), (7, 6)]);
        assert_gap_free(&layer);
    }

    #[test]
    fn test_remove_frames_span_by_span() {
        let mut lib = Library::new();

        // Shrink inside one span.
        let mut layer = span_layer(&[10, 5]);
        layer.remove_frames(4, 3, &mut lib).unwrap();
        assert_eq!(spans(&layer), vec![(0, 6), (6, 5)]);

        // Removal crossing spans: tail of first, all of second, head of third.
        let mut layer = span_layer(&[4, 2, 6]);
        layer.remove_frames(5, 2, &mut lib).unwrap();
        assert_eq!(spans(&layer), vec![(0, 2), (2, 5)]);
        assert_gap_free(&layer);

        // Whole-span removal drops the keyframe.
        let mut layer = span_layer(&[4, 2, 6]);
        layer.remove_frames(2, 4, &mut lib).unwrap();
        assert_eq!(spans(&layer), vec![(0, 4), (4, 6)]);

        // Out of range.
        let mut layer = span_layer(&[4]);
        assert!(matches!(
            layer.remove_frames(5, 0, &mut lib),
            Err(XflError::NotFound(_))
        ));
    }

    #[test]
    fn test_remove_frames_releases_references() {
        let mut lib = Library::new();
        lib.insert_item(Item::new_symbol("s", SymbolType::Graphic));
        let mut layer = span_layer(&[2, 3]);
        layer
            .keyframe_mut(1)
            .unwrap()
            .add_item("s", &mut lib)
            .unwrap();
        assert_eq!(lib.use_count("s"), Some(1));

        layer.remove_frames(3, 2, &mut lib).unwrap();
        assert_eq!(spans(&layer), vec![(0, 2)]);
        assert_eq!(lib.use_count("s"), Some(0));
        assert!(lib.bus().is_empty());
    }

    #[test]
    fn test_convert_to_keyframes() {
        let mut lib = Library::new();
        let mut layer = span_layer(&[6]);
        assert!(layer.convert_to_keyframes(1, 3, &mut lib).unwrap());
        assert_eq!(spans(&layer), vec![(0, 1), (1, 1), (2, 1), (3, 3)]);
        // Second run changes nothing.
        assert!(!layer.convert_to_keyframes(1, 3, &mut lib).unwrap());
    }

    #[test]
    fn test_node_round_trip() {
        let mut layer = span_layer(&[3, 7]);
        layer.name = "fg".into();
        layer.locked = true;
        layer.parent_layer_index = Some(2);

        let n = layer.to_node();
        assert_eq!(n.attr("parentLayerIndex"), Some("2"));
        let back = Layer::from_node(&n).unwrap();
        assert_eq!(back.name, "fg");
        assert!(back.locked);
        assert_eq!(back.parent_layer_index, Some(2));
        assert_eq!(spans(&back), vec![(0, 3), (3, 7)]);
    }
}
