//! The library: every reusable item of a document, keyed by its path-like
//! name, with use counts, rename/removal notification, and a journal of
//! file operations flushed at save time.
//!
//! Mutations here are synchronous: when `rename_item` returns, the
//! registry, the hrefs, the bus table, and every symbol timeline owned by
//! this library are already consistent. Scene timelines live outside the
//! library, so notify methods hand the affected receiver set back to the
//! caller (`Document`) as `EventDelivery` values for routing there.
//!
//! File work is deferred: import/rename/remove only touch the model and
//! append to the journal; `flush` replays the journal against a
//! `Container` at save time, spreading runs of consecutive Adds across the
//! worker pool.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam::sync::WaitGroup;
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::event_bus::{LibraryEvent, LibraryEventBus, Receiver};
use crate::core::workers::Workers;
use crate::entities::element::SymbolType;
use crate::entities::item::{last_segment, Item, ItemData};
use crate::entities::timeline::Timeline;
use crate::error::{Result, XflError};
use crate::io::{Container, MarkupIo, MediaProbe};
use crate::markup::Node;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac"];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Journaled file operation, replayed at save time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemOperation {
    /// Copy an external file into the container's LIBRARY directory.
    Add { name: String, source: PathBuf },
    /// Delete the item's file (and its decoded data blob, if any).
    Remove { name: String, data_href: Option<String> },
    /// Rename the item's file.
    Rename { old: String, new: String },
}

/// One notified library event plus who it was delivered to.
///
/// `matched` collects the receiver ids that resolved while routing; the
/// document prunes the rest once its own timelines have been walked.
#[derive(Debug)]
pub struct EventDelivery {
    pub event: LibraryEvent,
    pub receivers: Vec<Receiver>,
    pub(crate) matched: HashSet<Uuid>,
}

/// Item registry of one document.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Library {
    items: IndexMap<String, Item>,
    pending: Vec<ItemOperation>,
    #[serde(skip)]
    bus: LibraryEventBus,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Queries ==========

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn item_exists(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn item(&self, name: &str) -> Option<&Item> {
        self.items.get(name)
    }

    pub(crate) fn item_mut(&mut self, name: &str) -> Option<&mut Item> {
        self.items.get_mut(name)
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn use_count(&self, name: &str) -> Option<usize> {
        self.items.get(name).map(Item::use_count)
    }

    /// Non-folder items nothing currently references. Advisory, like the
    /// counts themselves.
    pub fn unused_items(&self) -> Vec<&Item> {
        self.items
            .values()
            .filter(|i| !i.is_folder() && i.use_count() == 0)
            .collect()
    }

    pub fn pending_operations(&self) -> &[ItemOperation] {
        &self.pending
    }

    /// Drop the journal without replaying it; the recovery hook after a
    /// failed flush.
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    pub fn bus(&self) -> &LibraryEventBus {
        &self.bus
    }

    pub(crate) fn bus_mut(&mut self) -> &mut LibraryEventBus {
        &mut self.bus
    }

    pub(crate) fn insert_item(&mut self, item: Item) {
        self.items.insert(item.name().to_string(), item);
    }

    // ========== Use counts ==========

    pub(crate) fn increment_use(&mut self, name: &str) {
        if let Some(item) = self.items.get_mut(name) {
            item.increment_use();
        }
    }

    pub(crate) fn decrement_use(&mut self, name: &str) {
        if let Some(item) = self.items.get_mut(name) {
            item.decrement_use();
        }
    }

    // ========== Symbols ==========

    /// Frame count of a symbol's timeline; the loop length of instances
    /// referencing it. `None` when the name is not a symbol.
    pub fn symbol_loop_length(&self, name: &str) -> Option<usize> {
        self.items
            .get(name)?
            .symbol_timeline()
            .map(Timeline::frame_count)
    }

    /// Mutate a symbol's timeline with library access. The timeline is
    /// taken out for the callback so frame operations can register and
    /// release references against this same library.
    pub fn with_symbol_timeline<R>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Timeline, &mut Library) -> R,
    ) -> Result<R> {
        let item = self
            .items
            .get_mut(name)
            .ok_or_else(|| XflError::not_found(format!("library item '{}'", name)))?;
        let slot = item
            .symbol_timeline_mut()
            .ok_or_else(|| XflError::validation(format!("'{}' is not a symbol", name)))?;
        let mut timeline = std::mem::take(slot);
        let result = f(&mut timeline, self);
        if let Some(item) = self.items.get_mut(name) {
            if let Some(slot) = item.symbol_timeline_mut() {
                *slot = timeline;
            }
        }
        Ok(result)
    }

    /// Create a new empty symbol. Its document is written at save time.
    pub fn add_new_item(&mut self, symbol_type: SymbolType, name: &str) -> Result<()> {
        if self.items.contains_key(name) {
            return Err(XflError::validation(format!(
                "library item '{}' already exists",
                name
            )));
        }
        self.create_parent_folders(name)?;
        self.insert_item(Item::new_symbol(name, symbol_type));
        debug!("library: added new {} symbol '{}'", symbol_type, name);
        Ok(())
    }

    // ========== Folders ==========

    /// Create a folder item (plus any missing ancestors). `false` when it
    /// already exists.
    pub fn new_folder(&mut self, name: &str) -> bool {
        if self.items.contains_key(name) {
            return false;
        }
        if self.create_parent_folders(name).is_err() {
            return false;
        }
        self.insert_item(Item::folder(name));
        true
    }

    /// Folder items for every ancestor path component of `name`.
    fn create_parent_folders(&mut self, name: &str) -> Result<()> {
        let components: Vec<&str> = name.split('/').collect();
        let mut prefix = String::new();
        for component in &components[..components.len().saturating_sub(1)] {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(component);
            match self.items.get(&prefix) {
                None => self.insert_item(Item::folder(prefix.clone())),
                Some(existing) if existing.is_folder() => {}
                Some(_) => {
                    return Err(XflError::validation(format!(
                        "'{}' exists and is not a folder",
                        prefix
                    )));
                }
            }
        }
        Ok(())
    }

    /// Move an item (or a folder with its contents) into `folder`.
    pub fn move_to_folder(&mut self, folder: &str, item_name: &str) -> Result<Vec<EventDelivery>> {
        let target = self
            .items
            .get(folder)
            .ok_or_else(|| XflError::not_found(format!("folder '{}'", folder)))?;
        if !target.is_folder() {
            return Err(XflError::validation(format!("'{}' is not a folder", folder)));
        }
        let new_name = format!("{}/{}", folder, last_segment(item_name));
        self.rename_item(item_name, &new_name)
    }

    // ========== Import ==========

    /// Bring an external file into the library. The source is classified
    /// by extension; its metadata comes from the `MediaProbe` port; the
    /// actual copy is journaled for save time. A missing source is
    /// `Ok(None)`; name collisions get a " copy" suffix.
    pub fn import_item(
        &mut self,
        source: &Path,
        folder: Option<&str>,
        probe: &dyn MediaProbe,
    ) -> Result<Option<String>> {
        if !source.is_file() {
            warn!("import: source {:?} does not exist", source);
            return Ok(None);
        }
        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| XflError::validation(format!("unusable file name in {:?}", source)))?;
        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        let base = match folder {
            Some(f) => {
                self.ensure_folder_path(f)?;
                format!("{}/{}", f, file_name)
            }
            None => file_name.to_string(),
        };

        if extension == "xml" {
            // Symbol document: the item name carries no extension, the
            // member file does.
            let stem = base.strip_suffix(".xml").unwrap_or(&base).to_string();
            let name = self.uncollided_name(&stem);
            let mut item = Item::new_symbol(&name, SymbolType::MovieClip);
            // The real content is the imported file, copied at flush time.
            if let ItemData::Symbol { href, .. } = &mut item.data {
                self.pending.push(ItemOperation::Add {
                    name: href.clone(),
                    source: source.to_path_buf(),
                });
            }
            self.insert_item(item);
            info!("import: symbol '{}' from {:?}", name, source);
            return Ok(Some(name));
        }

        let name = self.uncollided_name(&base);
        let item = if AUDIO_EXTENSIONS.contains(&extension.as_str()) {
            let sound = probe.sound_info(source)?;
            Item::sound(
                &name,
                name.clone(),
                format!("{}.dat", last_segment(&name)),
                sound.sample_rate,
                sound.sample_count,
                sound.duration_secs,
            )
        } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            let (width, height) = probe.bitmap_size(source)?;
            Item::bitmap(
                &name,
                name.clone(),
                format!("{}.dat", last_segment(&name)),
                width,
                height,
            )
        } else {
            return Err(XflError::validation(format!(
                "unsupported import extension '{}'",
                extension
            )));
        };
        self.pending.push(ItemOperation::Add {
            name: name.clone(),
            source: source.to_path_buf(),
        });
        self.insert_item(item);
        info!("import: '{}' from {:?}", name, source);
        Ok(Some(name))
    }

    /// Folder path that must exist (created on demand) before placing an
    /// item inside it.
    fn ensure_folder_path(&mut self, folder: &str) -> Result<()> {
        self.create_parent_folders(&format!("{}/x", folder))?;
        match self.items.get(folder) {
            None => {
                self.insert_item(Item::folder(folder));
                Ok(())
            }
            Some(existing) if existing.is_folder() => Ok(()),
            Some(_) => Err(XflError::validation(format!(
                "'{}' exists and is not a folder",
                folder
            ))),
        }
    }

    /// Append " copy" until the name is free.
    fn uncollided_name(&self, base: &str) -> String {
        let mut name = base.to_string();
        while self.items.contains_key(&name) {
            name = match name.rsplit_once('.') {
                Some((stem, ext)) if !ext.contains('/') => format!("{} copy.{}", stem, ext),
                _ => format!("{} copy", name),
            };
        }
        name
    }

    // ========== Rename & removal ==========

    /// Rename an item, cascading into a folder's contents. Hrefs, the bus
    /// table, the journal, and this library's symbol timelines are updated
    /// before returning; the caller routes the deliveries to its own
    /// timelines.
    pub fn rename_item(&mut self, old: &str, new: &str) -> Result<Vec<EventDelivery>> {
        if !self.items.contains_key(old) {
            return Err(XflError::not_found(format!("library item '{}'", old)));
        }
        if self.items.contains_key(new) {
            return Err(XflError::validation(format!(
                "library item '{}' already exists",
                new
            )));
        }
        let is_folder = self.items[old].is_folder();
        let mut deliveries = vec![self.rename_single(old, new)?];
        if is_folder {
            let prefix = format!("{}/", old);
            let children: Vec<String> = self
                .items
                .keys()
                .filter(|k| k.starts_with(&prefix))
                .cloned()
                .collect();
            for child in children {
                let child_new = format!("{}/{}", new, &child[prefix.len()..]);
                deliveries.push(self.rename_single(&child, &child_new)?);
            }
        }
        Ok(deliveries)
    }

    fn rename_single(&mut self, old: &str, new: &str) -> Result<EventDelivery> {
        let index = self
            .items
            .get_index_of(old)
            .ok_or_else(|| XflError::not_found(format!("library item '{}'", old)))?;
        if self.items.contains_key(new) {
            return Err(XflError::validation(format!(
                "library item '{}' already exists",
                new
            )));
        }
        let Some(mut item) = self.items.shift_remove(old) else {
            return Err(XflError::not_found(format!("library item '{}'", old)));
        };
        let old_member = item.href().map(str::to_string);
        item.set_name(new);
        let new_member = item.href().map(str::to_string);
        self.items.insert(new.to_string(), item);
        let end = self.items.len() - 1;
        self.items.move_index(end, index);

        if let (Some(o), Some(n)) = (old_member, new_member) {
            self.pending.push(ItemOperation::Rename { old: o, new: n });
        }

        let receivers = self.bus.notify_renamed(old, new);
        let ids: HashSet<Uuid> = receivers.iter().map(|r| r.id).collect();
        let mut matched = HashSet::new();
        let event = LibraryEvent::Renamed { old: old.to_string(), new: new.to_string() };
        self.route_to_symbols(&event, &ids, &mut matched);
        info!("library: renamed '{}' -> '{}' ({} receiver(s))", old, new, receivers.len());
        Ok(EventDelivery { event, receivers, matched })
    }

    /// Remove an item, cascading into a folder's contents. Referencing
    /// frames and instances are notified; removal never blocks on use
    /// counts.
    pub fn remove_item(&mut self, name: &str) -> Result<Vec<EventDelivery>> {
        if !self.items.contains_key(name) {
            return Err(XflError::not_found(format!("library item '{}'", name)));
        }
        let mut targets = vec![name.to_string()];
        if self.items[name].is_folder() {
            let prefix = format!("{}/", name);
            targets.extend(self.items.keys().filter(|k| k.starts_with(&prefix)).cloned());
        }

        let mut deliveries = Vec::new();
        for target in targets {
            let Some(item) = self.items.shift_remove(&target) else {
                continue;
            };
            let data_href = match &item.data {
                ItemData::Sound { sound_data_href, .. } => Some(sound_data_href.clone()),
                ItemData::Bitmap { bitmap_data_href, .. } => Some(bitmap_data_href.clone()),
                _ => None,
            };
            if let Some(member) = item.href() {
                self.pending.push(ItemOperation::Remove {
                    name: member.to_string(),
                    data_href,
                });
            }
            let receivers = self.bus.notify_removed(&target);
            let ids: HashSet<Uuid> = receivers.iter().map(|r| r.id).collect();
            let mut matched = HashSet::new();
            let event = LibraryEvent::Removed { name: target.clone() };
            self.route_to_symbols(&event, &ids, &mut matched);
            info!("library: removed '{}' ({} receiver(s))", target, receivers.len());
            deliveries.push(EventDelivery { event, receivers, matched });
        }
        Ok(deliveries)
    }

    fn route_to_symbols(&mut self, event: &LibraryEvent, ids: &HashSet<Uuid>, matched: &mut HashSet<Uuid>) {
        for item in self.items.values_mut() {
            if let Some(tl) = item.symbol_timeline_mut() {
                tl.apply_library_event(event, ids, matched);
            }
        }
    }

    /// Drop bus entries for receivers that no routing pass resolved.
    pub(crate) fn finish_delivery(&mut self, delivery: EventDelivery) {
        if let LibraryEvent::Renamed { new, .. } = &delivery.event {
            let stale: Vec<Uuid> = delivery
                .receivers
                .iter()
                .map(|r| r.id)
                .filter(|id| !delivery.matched.contains(id))
                .collect();
            self.bus.prune(new, &stale);
        }
    }

    // ========== Save-time flush ==========

    /// Replay the journal against the container. Runs of consecutive Adds
    /// are partitioned across the worker pool and joined before any Remove
    /// or Rename executes; the first error wins and the journal is not
    /// restored (recovery is `clear_pending` plus reload).
    pub fn flush(&mut self, container: &Arc<dyn Container>, workers: &Workers) -> Result<()> {
        let ops = std::mem::take(&mut self.pending);
        if ops.is_empty() {
            return Ok(());
        }
        info!("library: flushing {} journaled operation(s)", ops.len());
        let mut adds: Vec<(String, PathBuf)> = Vec::new();
        for op in ops {
            match op {
                ItemOperation::Add { name, source } => adds.push((name, source)),
                ItemOperation::Remove { name, data_href } => {
                    Self::flush_adds(&mut adds, container, workers)?;
                    let member = format!("LIBRARY/{}", name);
                    if container.exists(&member) {
                        container.remove(&member)?;
                    }
                    if let Some(href) = data_href {
                        let blob = format!("bin/{}", href);
                        if container.exists(&blob) {
                            container.remove(&blob)?;
                        }
                    }
                }
                ItemOperation::Rename { old, new } => {
                    Self::flush_adds(&mut adds, container, workers)?;
                    let from = format!("LIBRARY/{}", old);
                    if container.exists(&from) {
                        container.rename(&from, &format!("LIBRARY/{}", new))?;
                    }
                }
            }
        }
        Self::flush_adds(&mut adds, container, workers)
    }

    fn flush_adds(
        adds: &mut Vec<(String, PathBuf)>,
        container: &Arc<dyn Container>,
        workers: &Workers,
    ) -> Result<()> {
        if adds.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(adds);
        debug!("library: copying {} asset(s) on {} worker(s)", batch.len(), workers.thread_count());
        let chunk_size = batch.len().div_ceil(workers.thread_count());
        let wg = WaitGroup::new();
        let (err_tx, err_rx) = crossbeam_channel::bounded::<XflError>(batch.len());

        for chunk in batch.chunks(chunk_size) {
            let chunk = chunk.to_vec();
            let container = Arc::clone(container);
            let wg = wg.clone();
            let err_tx = err_tx.clone();
            workers.execute(move || {
                for (name, source) in chunk {
                    let member = format!("LIBRARY/{}", name);
                    if container.exists(&member) {
                        continue;
                    }
                    let copied = std::fs::read(&source)
                        .map_err(XflError::from)
                        .and_then(|bytes| container.write(&member, &bytes));
                    if let Err(e) = copied {
                        let _ = err_tx.send(e);
                    }
                }
                drop(wg);
            });
        }
        drop(err_tx);
        wg.wait();
        match err_rx.try_recv() {
            Ok(e) => Err(e),
            Err(_) => Ok(()),
        }
    }

    // ========== Markup ==========

    /// Write the folders/media/symbols groups into the document root.
    pub(crate) fn write_into(&self, root: &mut Node) {
        let folders: Vec<Node> = self
            .items
            .values()
            .filter(|i| i.is_folder())
            .map(Item::to_library_node)
            .collect();
        let media: Vec<Node> = self
            .items
            .values()
            .filter(|i| i.is_bitmap() || i.is_sound())
            .map(Item::to_library_node)
            .collect();
        let symbols: Vec<Node> = self
            .items
            .values()
            .filter(|i| i.is_symbol())
            .map(Item::to_library_node)
            .collect();
        root.push_group("folders", folders);
        root.push_group("media", media);
        root.push_group("symbols", symbols);
    }

    /// Load the registry from a document root, pulling each symbol's own
    /// document through the markup port.
    pub(crate) fn from_document_node(root: &Node, io: &dyn MarkupIo) -> Result<Library> {
        let mut library = Library::new();
        for node in root.grandchildren("folders") {
            if node.name == "DOMFolderItem" {
                library.insert_item(Item::folder_from_node(node)?);
            }
        }
        for node in root.grandchildren("media") {
            match node.name.as_str() {
                "DOMBitmapItem" => library.insert_item(Item::bitmap_from_node(node)?),
                "DOMSoundItem" => library.insert_item(Item::sound_from_node(node)?),
                other => warn!("skipping unhandled media item <{}>", other),
            }
        }
        for node in root.grandchildren("symbols") {
            if node.name != "Include" {
                continue;
            }
            let href = node.attr_str("href", "");
            if href.is_empty() {
                return Err(XflError::validation("<Include> without href"));
            }
            let symbol_doc = io.load_node(&format!("LIBRARY/{}", href))?;
            library.insert_item(Item::symbol_from_document(&symbol_doc, &href)?);
        }
        Ok(library)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_folder_and_ancestors() {
        let mut lib = Library::new();
        assert!(lib.new_folder("a/b/c"));
        assert!(lib.item_exists("a"));
        assert!(lib.item_exists("a/b"));
        assert!(lib.item_exists("a/b/c"));
        assert!(!lib.new_folder("a/b/c"));
    }

    #[test]
    fn test_add_new_item_rejects_duplicates() {
        let mut lib = Library::new();
        lib.add_new_item(SymbolType::Graphic, "fx/spark").unwrap();
        assert!(lib.item_exists("fx"));
        assert!(lib.item("fx/spark").unwrap().is_symbol());
        assert!(matches!(
            lib.add_new_item(SymbolType::Graphic, "fx/spark"),
            Err(XflError::Validation(_))
        ));
    }

    #[test]
    fn test_rename_missing_and_colliding() {
        let mut lib = Library::new();
        lib.add_new_item(SymbolType::Graphic, "a").unwrap();
        lib.add_new_item(SymbolType::Graphic, "b").unwrap();
        assert!(matches!(
            lib.rename_item("nope", "c"),
            Err(XflError::NotFound(_))
        ));
        assert!(matches!(
            lib.rename_item("a", "b"),
            Err(XflError::Validation(_))
        ));
    }

    #[test]
    fn test_rename_preserves_registry_order() {
        let mut lib = Library::new();
        lib.add_new_item(SymbolType::Graphic, "first").unwrap();
        lib.add_new_item(SymbolType::Graphic, "second").unwrap();
        lib.add_new_item(SymbolType::Graphic, "third").unwrap();

        lib.rename_item("second", "renamed").unwrap();
        let names: Vec<&str> = lib.items().map(Item::name).collect();
        assert_eq!(names, vec!["first", "renamed", "third"]);
    }

    #[test]
    fn test_folder_rename_cascades() {
        let mut lib = Library::new();
        lib.add_new_item(SymbolType::Graphic, "chars/hero").unwrap();
        lib.add_new_item(SymbolType::Graphic, "chars/sub/extra").unwrap();

        let deliveries = lib.rename_item("chars", "actors").unwrap();
        // Folder itself plus three descendants (sub, hero, sub/extra).
        assert_eq!(deliveries.len(), 4);
        assert!(lib.item_exists("actors/hero"));
        assert!(lib.item_exists("actors/sub/extra"));
        assert!(!lib.item_exists("chars/hero"));
        assert_eq!(lib.item("actors/hero").unwrap().href(), Some("actors/hero.xml"));
    }

    #[test]
    fn test_remove_folder_cascades() {
        let mut lib = Library::new();
        lib.add_new_item(SymbolType::Graphic, "fx/a").unwrap();
        lib.add_new_item(SymbolType::Graphic, "fx/b").unwrap();
        lib.add_new_item(SymbolType::Graphic, "keep").unwrap();

        lib.remove_item("fx").unwrap();
        assert!(!lib.item_exists("fx"));
        assert!(!lib.item_exists("fx/a"));
        assert!(lib.item_exists("keep"));
        // Two symbol files journaled for deletion; the folder has no file.
        let removes = lib
            .pending_operations()
            .iter()
            .filter(|op| matches!(op, ItemOperation::Remove { .. }))
            .count();
        assert_eq!(removes, 2);
    }

    #[test]
    fn test_move_to_folder() {
        let mut lib = Library::new();
        lib.add_new_item(SymbolType::Graphic, "hero").unwrap();
        lib.new_folder("chars");

        lib.move_to_folder("chars", "hero").unwrap();
        assert!(lib.item_exists("chars/hero"));

        assert!(matches!(
            lib.move_to_folder("nope", "chars/hero"),
            Err(XflError::NotFound(_))
        ));
        assert!(matches!(
            lib.move_to_folder("chars/hero", "chars"),
            Err(XflError::Validation(_))
        ));
    }

    #[test]
    fn test_uncollided_name() {
        let mut lib = Library::new();
        lib.insert_item(Item::folder("x"));
        assert_eq!(lib.uncollided_name("y"), "y");
        assert_eq!(lib.uncollided_name("x"), "x copy");
        lib.insert_item(Item::folder("x copy"));
        assert_eq!(lib.uncollided_name("x"), "x copy copy");
        // Extension-aware suffixing.
        lib.insert_item(Item::folder("pic.png"));
        assert_eq!(lib.uncollided_name("pic.png"), "pic copy.png");
    }

    #[test]
    fn test_import_collision_gets_copy_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("foo.png");
        std::fs::write(&source, b"png").unwrap();

        let mut lib = Library::new();
        let probe = crate::io::NullProbe;
        let first = lib.import_item(&source, None, &probe).unwrap();
        assert_eq!(first.as_deref(), Some("foo.png"));
        let second = lib.import_item(&source, None, &probe).unwrap();
        assert_eq!(second.as_deref(), Some("foo copy.png"));

        let missing = lib
            .import_item(&dir.path().join("nope.png"), None, &probe)
            .unwrap();
        assert!(missing.is_none());
        // Two Adds journaled, nothing for the miss.
        assert_eq!(lib.pending_operations().len(), 2);
    }

    #[test]
    fn test_symbol_import_strips_one_extension() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.xml.xml");
        std::fs::write(&source, b"<DOMSymbolItem/>").unwrap();

        let mut lib = Library::new();
        let name = lib
            .import_item(&source, None, &crate::io::NullProbe)
            .unwrap();
        assert_eq!(name.as_deref(), Some("a.xml"));
        assert!(lib.item("a.xml").unwrap().is_symbol());
        assert_eq!(lib.item("a.xml").unwrap().href(), Some("a.xml.xml"));
    }

    #[test]
    fn test_unused_items() {
        let mut lib = Library::new();
        lib.new_folder("dir");
        lib.add_new_item(SymbolType::Graphic, "used").unwrap();
        lib.add_new_item(SymbolType::Graphic, "idle").unwrap();
        lib.increment_use("used");

        let unused: Vec<&str> = lib.unused_items().iter().map(|i| i.name()).collect();
        assert_eq!(unused, vec!["idle"]);
    }

    #[test]
    fn test_with_symbol_timeline() {
        let mut lib = Library::new();
        lib.add_new_item(SymbolType::Graphic, "s").unwrap();
        let count = lib
            .with_symbol_timeline("s", |tl, lib| {
                let _ = lib;
                tl.layer_mut(0).unwrap().insert_frames(4, 0).unwrap();
                tl.frame_count()
            })
            .unwrap();
        assert_eq!(count, 5);
        assert_eq!(lib.symbol_loop_length("s"), Some(5));

        assert!(matches!(
            lib.with_symbol_timeline("nope", |_, _| ()),
            Err(XflError::NotFound(_))
        ));
    }
}
