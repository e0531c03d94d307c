//! The document: stage settings, scene timelines, and the library.
//!
//! Library events originate in the library (which updates itself and its
//! symbol timelines) and are routed here to the scene timelines by receiver
//! id; receivers no routing pass resolves are pruned afterward. The
//! persisted `currentTimeline` attribute is 1-based; the API is 0-based.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::workers::Workers;
use crate::entities::library::{EventDelivery, Library};
use crate::entities::timeline::Timeline;
use crate::error::{Result, XflError};
use crate::io::{Container, MarkupIo, MediaProbe};
use crate::markup::Node;

/// Container member holding the main document.
pub const DOCUMENT_PATH: &str = "DOMDocument.xml";

const DEFAULT_WIDTH: u32 = 1280;
const DEFAULT_HEIGHT: u32 = 720;
const DEFAULT_FRAME_RATE: f64 = 24.0;

/// One authoring document.
#[derive(Debug, Serialize, Deserialize)]
pub struct Document {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    current_timeline: usize,
    timelines: Vec<Timeline>,
    library: Library,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document with stage defaults and no scenes.
    pub fn new() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            frame_rate: DEFAULT_FRAME_RATE,
            current_timeline: 0,
            timelines: Vec::new(),
            library: Library::new(),
        }
    }

    // ========== Timelines ==========

    pub fn timelines(&self) -> &[Timeline] {
        &self.timelines
    }

    pub fn timeline_count(&self) -> usize {
        self.timelines.len()
    }

    pub fn get_timeline(&self, index: usize) -> Result<&Timeline> {
        self.timelines
            .get(index)
            .ok_or_else(|| XflError::not_found(format!("timeline {}", index)))
    }

    pub fn get_timeline_mut(&mut self, index: usize) -> Result<&mut Timeline> {
        if index >= self.timelines.len() {
            return Err(XflError::not_found(format!("timeline {}", index)));
        }
        Ok(&mut self.timelines[index])
    }

    /// Index of the active scene (0-based).
    pub fn current_timeline(&self) -> usize {
        self.current_timeline
    }

    pub fn set_current_timeline(&mut self, index: usize) -> Result<()> {
        self.get_timeline(index)?;
        self.current_timeline = index;
        Ok(())
    }

    /// Append a scene with one layer. Unnamed scenes get "Scene N".
    pub fn add_new_scene(&mut self, name: Option<&str>) -> usize {
        let name = match name {
            Some(n) => n.to_string(),
            None => format!("Scene {}", self.timelines.len() + 1),
        };
        let mut timeline = Timeline::new(name);
        timeline.add_new_layer("Layer_1", crate::entities::layer::LayerType::Normal);
        self.timelines.push(timeline);
        self.timelines.len() - 1
    }

    /// Move scene `from` next to scene `near`.
    pub fn reorder_scene(&mut self, from: usize, near: usize, before: bool) -> Result<()> {
        self.get_timeline(from)?;
        self.get_timeline(near)?;
        let mut target = near + if before { 0 } else { 1 };
        if from == target {
            return Ok(());
        }
        let timeline = self.timelines.remove(from);
        if from < target {
            target -= 1;
        }
        self.timelines.insert(target, timeline);
        Ok(())
    }

    // ========== Library ==========

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut Library {
        &mut self.library
    }

    /// Import an external media or symbol file into the library.
    /// `Ok(false)` when the source does not exist.
    pub fn import_file(
        &mut self,
        source: &Path,
        folder: Option<&str>,
        probe: &dyn MediaProbe,
    ) -> Result<bool> {
        Ok(self.library.import_item(source, folder, probe)?.is_some())
    }

    /// Place a library item on the current frame of the current layer of
    /// the current scene. `Ok(false)` when the item does not exist.
    pub fn add_item_to_document(&mut self, item_name: &str, x: f64, y: f64) -> Result<bool> {
        if !self.library.item_exists(item_name) {
            return Ok(false);
        }
        let Document { timelines, library, current_timeline, .. } = self;
        let timeline = timelines
            .get_mut(*current_timeline)
            .ok_or_else(|| XflError::not_found("current scene".to_string()))?;
        let layer_index = timeline
            .current_layer()
            .unwrap_or(0);
        let frame_index = timeline.current_frame.unwrap_or(0);
        let frame = timeline.layer_mut(layer_index)?.get_frame_mut(frame_index)?;
        if let Some(element) = frame.add_item(item_name, library)? {
            let common = element.common_mut();
            common.matrix.tx = x;
            common.matrix.ty = y;
        }
        Ok(true)
    }

    /// Rename a library item and rewrite every stored reference to it in
    /// this document's timelines. Use counts are untouched.
    pub fn rename_item(&mut self, old: &str, new: &str) -> Result<()> {
        let deliveries = self.library.rename_item(old, new)?;
        self.route_deliveries(deliveries);
        Ok(())
    }

    /// Remove a library item; frames lose its sound, instances of it are
    /// detached from their keyframes.
    pub fn remove_item(&mut self, name: &str) -> Result<()> {
        let deliveries = self.library.remove_item(name)?;
        self.route_deliveries(deliveries);
        Ok(())
    }

    pub fn move_to_folder(&mut self, folder: &str, item_name: &str) -> Result<()> {
        let deliveries = self.library.move_to_folder(folder, item_name)?;
        self.route_deliveries(deliveries);
        Ok(())
    }

    fn route_deliveries(&mut self, deliveries: Vec<EventDelivery>) {
        for mut delivery in deliveries {
            let ids: HashSet<Uuid> = delivery.receivers.iter().map(|r| r.id).collect();
            for timeline in &mut self.timelines {
                timeline.apply_library_event(&delivery.event, &ids, &mut delivery.matched);
            }
            self.library.finish_delivery(delivery);
        }
    }

    // ========== Load & save ==========

    /// Load a document from its container via the markup port.
    pub fn load(io: &dyn MarkupIo) -> Result<Document> {
        let root = io.load_node(DOCUMENT_PATH)?;
        Self::from_node(&root, io)
    }

    /// Save: flush the library's journaled file operations first, then
    /// write every symbol document and the main document.
    pub fn save(
        &mut self,
        io: &dyn MarkupIo,
        container: &Arc<dyn Container>,
        workers: &Workers,
    ) -> Result<()> {
        self.library.flush(container, workers)?;
        for item in self.library.items() {
            if let (Some(href), Some(node)) = (item.href(), item.symbol_document_node()) {
                io.save_node(&format!("LIBRARY/{}", href), &node)?;
            }
        }
        io.save_node(DOCUMENT_PATH, &self.to_node())?;
        info!(
            "document saved: {} scene(s), {} library item(s)",
            self.timelines.len(),
            self.library.item_count()
        );
        Ok(())
    }

    pub fn to_node(&self) -> Node {
        let mut n = Node::new("DOMDocument");
        n.set_attr_unless("width", &self.width, &DEFAULT_WIDTH);
        n.set_attr_unless("height", &self.height, &DEFAULT_HEIGHT);
        n.set_attr_unless("frameRate", &self.frame_rate, &DEFAULT_FRAME_RATE);
        if !self.timelines.is_empty() {
            // Stored 1-based.
            n.set_attr("currentTimeline", self.current_timeline + 1);
        }
        self.library.write_into(&mut n);
        n.push_group(
            "timelines",
            self.timelines.iter().map(Timeline::to_node).collect(),
        );
        n
    }

    pub fn from_node(root: &Node, io: &dyn MarkupIo) -> Result<Document> {
        if root.name != "DOMDocument" {
            return Err(XflError::validation(format!(
                "expected <DOMDocument>, got <{}>",
                root.name
            )));
        }
        let library = Library::from_document_node(root, io)?;
        let mut timelines = Vec::new();
        for node in root.grandchildren("timelines") {
            if node.name == "DOMTimeline" {
                timelines.push(Timeline::from_node(node)?);
            }
        }
        let stored: usize = root.attr_or("currentTimeline", 1)?;
        let mut doc = Document {
            width: root.attr_or("width", DEFAULT_WIDTH)?,
            height: root.attr_or("height", DEFAULT_HEIGHT)?,
            frame_rate: root.attr_or("frameRate", DEFAULT_FRAME_RATE)?,
            current_timeline: stored.saturating_sub(1).min(timelines.len().saturating_sub(1)),
            timelines,
            library,
        };
        doc.wire_references()?;
        Ok(doc)
    }

    /// Post-load pass: register every stored sound and instance reference
    /// with the bus and bump use counts, in scene and symbol timelines.
    fn wire_references(&mut self) -> Result<()> {
        let Document { timelines, library, .. } = self;
        for timeline in timelines.iter() {
            timeline.attach_references(library);
        }
        let symbol_names: Vec<String> = library
            .items()
            .filter(|i| i.is_symbol())
            .map(|i| i.name().to_string())
            .collect();
        for name in symbol_names {
            library.with_symbol_timeline(&name, |tl, lib| tl.attach_references(lib))?;
        }
        Ok(())
    }
}
