//! Timelines: a flat layer list where folder membership is expressed by
//! `parent_layer_index` back-pointers.
//!
//! Ordering invariants maintained here:
//! - a layer's folder always sits above it (parent index < own index),
//! - a folder's subtree occupies a contiguous run directly below it.
//!
//! The contiguity invariant is checked, not assumed: operations that walk a
//! folder block surface a Structural error when the run is broken, instead
//! of quietly corrupting the hierarchy. Reorder and delete renumber every
//! affected back-pointer by hand; there is no tree structure to lean on
//! because the persisted format is this flat list.

use std::collections::HashSet;

use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::event_bus::LibraryEvent;
use crate::entities::frame::Frame;
use crate::entities::layer::{Layer, LayerType};
use crate::entities::library::Library;
use crate::error::{Result, XflError};
use crate::markup::Node;

/// One scene (or one symbol's timeline).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    pub name: String,
    /// Playhead position; `None` when the authoring tool never stored one.
    pub current_frame: Option<usize>,
    layers: Vec<Layer>,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new("timeline")
    }
}

impl Timeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current_frame: None,
            layers: Vec::new(),
        }
    }

    // ========== Layer access ==========

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, index: usize) -> Result<&Layer> {
        self.layers
            .get(index)
            .ok_or_else(|| XflError::not_found(format!("layer {} on timeline '{}'", index, self.name)))
    }

    pub fn layer_mut(&mut self, index: usize) -> Result<&mut Layer> {
        if index >= self.layers.len() {
            return Err(XflError::not_found(format!(
                "layer {} on timeline '{}'",
                index, self.name
            )));
        }
        Ok(&mut self.layers[index])
    }

    /// Frames this timeline spans: the longest layer wins.
    pub fn frame_count(&self) -> usize {
        self.layers.iter().map(Layer::frame_count).max().unwrap_or(0)
    }

    /// All layers with this name, in order.
    pub fn find_layer_index(&self, name: &str) -> Vec<usize> {
        self.layers
            .iter()
            .enumerate()
            .filter(|(_, l)| l.name == name)
            .map(|(i, _)| i)
            .collect()
    }

    // ========== Cursors ==========

    pub fn current_layer(&self) -> Option<usize> {
        self.layers.iter().position(|l| l.current)
    }

    pub fn set_current_layer(&mut self, index: usize) -> Result<()> {
        self.layer(index)?;
        for l in &mut self.layers {
            l.current = false;
        }
        self.layers[index].current = true;
        Ok(())
    }

    pub fn set_selected_layer(&mut self, index: usize, append: bool) -> Result<()> {
        self.layer(index)?;
        if !append {
            for l in &mut self.layers {
                l.selected = false;
            }
        }
        self.layers[index].selected = true;
        Ok(())
    }

    // ========== Adding layers ==========

    /// Append a layer. Non-folder layers start with one keyframe spanning
    /// the timeline's current frame count.
    pub fn add_new_layer(&mut self, name: impl Into<String>, layer_type: LayerType) -> usize {
        let span = self.frame_count().max(1);
        let mut layer = Layer::new(name, layer_type);
        if layer_type != LayerType::Folder {
            layer.push_frame(Frame::new(0, span));
        }
        self.layers.push(layer);
        self.layers.len() - 1
    }

    // ========== Folder subtree geometry ==========

    /// Does the parent chain of `index` pass through `ancestor`?
    fn resolves_to(&self, mut index: usize, ancestor: usize) -> bool {
        while let Some(p) = self.layers[index].parent_layer_index {
            if p == ancestor {
                return true;
            }
            if p >= index {
                // Malformed back-pointer; stop rather than loop.
                return false;
            }
            index = p;
        }
        false
    }

    /// Index of the last layer in `folder`'s subtree, verifying that the
    /// subtree is one contiguous run.
    fn subtree_extent(&self, folder: usize) -> Result<usize> {
        let mut last = folder;
        for i in folder + 1..self.layers.len() {
            if self.resolves_to(i, folder) {
                last = i;
            }
        }
        for i in folder + 1..=last {
            if !self.resolves_to(i, folder) {
                return Err(XflError::structural(format!(
                    "folder '{}' (layer {}) has a non-contiguous subtree: layer {} is not a member",
                    self.layers[folder].name, folder, i
                )));
            }
        }
        Ok(last)
    }

    // ========== Reordering ==========

    /// Move `from` next to `near` (`before` picks which side). Moving a
    /// folder moves its whole subtree block; a folder targeted into its own
    /// block is left where it is.
    pub fn reorder_layer(&mut self, from: usize, near: usize, before: bool) -> Result<()> {
        self.layer(from)?;
        self.layer(near)?;
        if from == near {
            return Ok(());
        }
        if self.layers[from].is_folder() {
            self.reorder_folder(from, near, before)
        } else {
            self.reorder_single(from, near, before)
        }
    }

    fn reorder_single(&mut self, from: usize, near: usize, before: bool) -> Result<()> {
        let mut target = near + if before { 0 } else { 1 };
        if from == target {
            return Ok(());
        }
        let near_is_folder = self.layers[near].is_folder();

        let mut layer = self.layers.remove(from);
        if from < target {
            target -= 1;
        }
        for l in &mut self.layers {
            if let Some(p) = l.parent_layer_index {
                if p > from {
                    l.parent_layer_index = Some(p - 1);
                }
            }
        }

        // Dropping a layer right below a folder row puts it inside that
        // folder; otherwise it adopts the neighbor's folder.
        let near_adjusted = if near > from { near - 1 } else { near };
        let parent = if near_is_folder && !before {
            Some(target - 1)
        } else {
            self.layers[near_adjusted].parent_layer_index
        };
        layer.parent_layer_index = parent;
        self.layers.insert(target, layer);

        // Back-pointers at or past the insertion point went stale by one.
        for (i, l) in self.layers.iter_mut().enumerate() {
            if i == target {
                continue;
            }
            if let Some(p) = l.parent_layer_index {
                if p >= target {
                    l.parent_layer_index = Some(p + 1);
                }
            }
        }
        debug!("timeline '{}': moved layer to {}", self.name, target);
        Ok(())
    }

    fn reorder_folder(&mut self, folder: usize, near: usize, before: bool) -> Result<()> {
        let last = self.subtree_extent(folder)?;
        let block_len = last - folder + 1;
        let mut target = near + if before { 0 } else { 1 };
        if target == folder {
            return Ok(());
        }
        // A target inside the folder's own block is meaningless; leave the
        // hierarchy untouched.
        if near >= folder && near <= last {
            return Ok(());
        }
        let near_is_folder = self.layers[near].is_folder();

        let mut block: Vec<Layer> = self.layers.drain(folder..=last).collect();
        if folder < target {
            target -= block_len;
        }
        for l in &mut self.layers {
            if let Some(p) = l.parent_layer_index {
                if p > last {
                    l.parent_layer_index = Some(p - block_len);
                }
            }
        }

        let near_adjusted = if near > last { near - block_len } else { near };
        let distance = target as isize - folder as isize;
        block[0].parent_layer_index = if near_is_folder && !before {
            Some(target - 1)
        } else {
            self.layers[near_adjusted].parent_layer_index
        };
        for member in &mut block[1..] {
            if let Some(p) = member.parent_layer_index {
                member.parent_layer_index = Some((p as isize + distance) as usize);
            }
        }
        self.layers.splice(target..target, block);

        for (i, l) in self.layers.iter_mut().enumerate() {
            if i >= target && i < target + block_len {
                continue;
            }
            if let Some(p) = l.parent_layer_index {
                if p >= target {
                    l.parent_layer_index = Some(p + block_len);
                }
            }
        }
        debug!(
            "timeline '{}': moved folder block of {} to {}",
            self.name, block_len, target
        );
        Ok(())
    }

    // ========== Duplication ==========

    /// Deep-copy a layer (folders: the whole subtree block) and insert the
    /// copy right below the original block. Every copied layer gets a
    /// `_copy` name suffix; the copy becomes current and selected. Returns
    /// the copy's index.
    pub fn duplicate_layer(&mut self, index: usize, library: &mut Library) -> Result<usize> {
        self.layer(index)?;
        let last = if self.layers[index].is_folder() {
            self.subtree_extent(index)?
        } else {
            index
        };
        let block_len = last - index + 1;
        let insert_at = last + 1;
        let offset = insert_at as isize - index as isize;

        let mut clones = Vec::with_capacity(block_len);
        for i in index..=last {
            let mut clone = self.layers[i].duplicate(library);
            clone.name.push_str("_copy");
            // Parents inside the block map to the cloned block; the block
            // root keeps pointing at the original's folder.
            if let Some(p) = clone.parent_layer_index {
                if p >= index && i > index {
                    clone.parent_layer_index = Some((p as isize + offset) as usize);
                }
            }
            clones.push(clone);
        }
        self.layers.splice(insert_at..insert_at, clones);

        // Back-pointers past the inserted block went stale.
        for (i, l) in self.layers.iter_mut().enumerate() {
            if i < insert_at + block_len {
                continue;
            }
            if let Some(p) = l.parent_layer_index {
                if p >= insert_at {
                    l.parent_layer_index = Some(p + block_len);
                }
            }
        }
        self.set_selected_layer(insert_at, false)?;
        self.set_current_layer(insert_at)?;
        Ok(insert_at)
    }

    // ========== Deletion ==========

    /// Delete a layer; folders take their subtree with them. All released
    /// library references are detached.
    pub fn delete_layer(&mut self, index: usize, library: &mut Library) -> Result<()> {
        self.layer(index)?;
        if self.layers[index].is_folder() {
            let mut i = index + 1;
            while i < self.layers.len() {
                if self.layers[i].parent_layer_index == Some(index) {
                    self.delete_layer(i, library)?;
                } else {
                    i += 1;
                }
            }
        }
        let removed = self.layers.remove(index);
        removed.detach_references(library);
        for l in &mut self.layers {
            if let Some(p) = l.parent_layer_index {
                if p > index {
                    l.parent_layer_index = Some(p - 1);
                }
            }
        }
        Ok(())
    }

    // ========== Frame operations ==========

    /// Insert frames at `at`, on one layer or (with `None`) on every
    /// non-folder layer. The all-layer form validates `at` against every
    /// target first, so a short layer cannot leave earlier layers already
    /// stretched.
    pub fn insert_frames(&mut self, count: usize, at: usize, layer: Option<usize>) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        match layer {
            Some(index) => {
                self.layer(index)?;
                if self.layers[index].is_folder() {
                    return Err(XflError::validation(format!(
                        "insert_frames on folder layer '{}'",
                        self.layers[index].name
                    )));
                }
                self.layers[index].insert_frames(count, at)
            }
            None => {
                for l in &self.layers {
                    if !l.is_folder() {
                        l.get_keyframe_index(at)?;
                    }
                }
                for l in &mut self.layers {
                    if l.is_folder() {
                        continue;
                    }
                    l.insert_frames(count, at)?;
                }
                Ok(())
            }
        }
    }

    /// Remove frames at `at`, on one layer or on every non-folder layer.
    /// The all-layer form validates the range against every target first.
    pub fn remove_frames(
        &mut self,
        count: usize,
        at: usize,
        layer: Option<usize>,
        library: &mut Library,
    ) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        match layer {
            Some(index) => {
                self.layer(index)?;
                self.layers[index].remove_frames(count, at, library)
            }
            None => {
                for l in &self.layers {
                    if !l.is_folder() && at + count > l.frame_count() {
                        return Err(XflError::not_found(format!(
                            "frame range [{}, {}) on layer '{}' (spans {})",
                            at,
                            at + count,
                            l.name,
                            l.frame_count()
                        )));
                    }
                }
                for l in &mut self.layers {
                    if l.is_folder() {
                        continue;
                    }
                    l.remove_frames(count, at, library)?;
                }
                Ok(())
            }
        }
    }

    // ========== Library plumbing ==========

    /// Apply a library event to every frame, collecting which receiver ids
    /// actually resolved.
    pub(crate) fn apply_library_event(
        &mut self,
        event: &LibraryEvent,
        ids: &HashSet<Uuid>,
        matched: &mut HashSet<Uuid>,
    ) {
        for layer in &mut self.layers {
            for frame in layer.frames_mut() {
                match event {
                    LibraryEvent::Renamed { old, new } => frame.apply_renamed(old, new, ids, matched),
                    LibraryEvent::Removed { name } => frame.apply_removed(name, ids, matched),
                }
            }
        }
    }

    pub(crate) fn attach_references(&self, library: &mut Library) {
        for layer in &self.layers {
            layer.attach_references(library);
        }
    }

    // ========== Markup ==========

    pub fn to_node(&self) -> Node {
        let mut n = Node::new("DOMTimeline");
        n.set_attr("name", &self.name);
        if let Some(cf) = self.current_frame {
            n.set_attr("currentFrame", cf);
        }
        n.push_group("layers", self.layers.iter().map(Layer::to_node).collect());
        n
    }

    pub fn from_node(node: &Node) -> Result<Timeline> {
        let mut tl = Timeline::new(node.attr_str("name", "timeline"));
        tl.current_frame = match node.attr("currentFrame") {
            Some(_) => Some(node.attr_req("currentFrame")?),
            None => None,
        };
        for layer_node in node.grandchildren("layers") {
            if layer_node.name == "DOMLayer" {
                tl.layers.push(Layer::from_node(layer_node)?);
            }
        }
        Ok(tl)
    }
}
