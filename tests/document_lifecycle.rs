//! End-to-end document lifecycle: build, edit, save, reload.

use std::sync::Arc;

use xfldoc::entities::SymbolType;
use xfldoc::{
    Container, DirContainer, Document, Element, MarkupIo, MemoryMarkup, NullProbe, Workers,
};

fn write_asset(dir: &std::path::Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let _ = env_logger::builder().is_test(true).try_init();
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn test_build_save_reload() {
    let assets = tempfile::tempdir().unwrap();
    let pic = write_asset(assets.path(), "pic.png", b"png-bytes");
    let hit = write_asset(assets.path(), "hit.wav", b"wav-bytes");

    let mut doc = Document::new();
    doc.add_new_scene(None);
    doc.add_new_scene(Some("outro"));
    doc.set_current_timeline(0).unwrap();

    doc.library_mut()
        .add_new_item(SymbolType::Graphic, "chars/hero")
        .unwrap();
    assert!(doc.import_file(&pic, None, &NullProbe).unwrap());
    assert!(doc.import_file(&hit, Some("audio"), &NullProbe).unwrap());
    assert!(!doc
        .import_file(&assets.path().join("missing.png"), None, &NullProbe)
        .unwrap());

    assert!(doc.add_item_to_document("chars/hero", 100.0, 50.0).unwrap());
    assert!(doc.add_item_to_document("pic.png", 0.0, 0.0).unwrap());
    // Sounds attach to the frame instead of becoming instances.
    assert!(doc.add_item_to_document("audio/hit.wav", 0.0, 0.0).unwrap());

    let frame = doc
        .get_timeline(0)
        .unwrap()
        .layer(0)
        .unwrap()
        .get_frame(0)
        .unwrap();
    assert_eq!(frame.elements().len(), 2);
    assert_eq!(frame.sound_name(), "audio/hit.wav");
    assert_eq!(doc.library().use_count("chars/hero"), Some(1));
    assert_eq!(doc.library().use_count("audio/hit.wav"), Some(1));

    // Save: the journal replays against the container, markup goes
    // through the port.
    let out = tempfile::tempdir().unwrap();
    let container: Arc<dyn Container> = Arc::new(DirContainer::new(out.path()));
    let io = MemoryMarkup::new();
    let workers = Workers::new(2);
    doc.save(&io, &container, &workers).unwrap();

    assert!(container.exists("LIBRARY/pic.png"));
    assert!(container.exists("LIBRARY/audio/hit.wav"));
    assert_eq!(container.read("LIBRARY/pic.png").unwrap(), b"png-bytes");
    assert!(io.paths().contains(&"DOMDocument.xml".to_string()));
    assert!(io.paths().contains(&"LIBRARY/chars/hero.xml".to_string()));
    assert!(doc.library().pending_operations().is_empty());

    // Reload: structure back, references re-wired, counts restored.
    let loaded = Document::load(&io).unwrap();
    assert_eq!(loaded.timeline_count(), 2);
    assert_eq!(loaded.get_timeline(0).unwrap().name, "Scene 1");
    assert_eq!(loaded.get_timeline(1).unwrap().name, "outro");
    assert_eq!(loaded.current_timeline(), 0);
    assert_eq!(loaded.library().item_count(), doc.library().item_count());
    assert_eq!(loaded.library().use_count("chars/hero"), Some(1));
    assert_eq!(loaded.library().use_count("pic.png"), Some(1));
    assert_eq!(loaded.library().use_count("audio/hit.wav"), Some(1));

    let frame = loaded
        .get_timeline(0)
        .unwrap()
        .layer(0)
        .unwrap()
        .get_frame(0)
        .unwrap();
    assert_eq!(frame.elements().len(), 2);
    assert_eq!(frame.sound_name(), "audio/hit.wav");
}

#[test]
fn test_rename_reaches_placed_references() {
    let assets = tempfile::tempdir().unwrap();
    let hit = write_asset(assets.path(), "hit.wav", b"wav");

    let mut doc = Document::new();
    doc.add_new_scene(None);
    doc.library_mut()
        .add_new_item(SymbolType::MovieClip, "chars/hero")
        .unwrap();
    doc.import_file(&hit, None, &NullProbe).unwrap();
    doc.add_item_to_document("chars/hero", 0.0, 0.0).unwrap();
    doc.add_item_to_document("hit.wav", 0.0, 0.0).unwrap();

    // Folder rename cascades to the contained symbol and on into the
    // placed instance.
    doc.rename_item("chars", "cast").unwrap();
    doc.rename_item("hit.wav", "boom.wav").unwrap();

    let frame = doc
        .get_timeline(0)
        .unwrap()
        .layer(0)
        .unwrap()
        .get_frame(0)
        .unwrap();
    assert_eq!(frame.elements()[0].library_item_name(), Some("cast/hero"));
    assert_eq!(frame.sound_name(), "boom.wav");
    assert_eq!(doc.library().use_count("cast/hero"), Some(1));
    assert_eq!(doc.library().use_count("boom.wav"), Some(1));
}

#[test]
fn test_remove_detaches_and_deletes_files() {
    let assets = tempfile::tempdir().unwrap();
    let pic = write_asset(assets.path(), "pic.png", b"png");

    let mut doc = Document::new();
    doc.add_new_scene(None);
    doc.import_file(&pic, None, &NullProbe).unwrap();
    doc.add_item_to_document("pic.png", 0.0, 0.0).unwrap();

    let out = tempfile::tempdir().unwrap();
    let container: Arc<dyn Container> = Arc::new(DirContainer::new(out.path()));
    let io = MemoryMarkup::new();
    let workers = Workers::new(1);
    doc.save(&io, &container, &workers).unwrap();
    assert!(container.exists("LIBRARY/pic.png"));

    doc.remove_item("pic.png").unwrap();
    let frame = doc
        .get_timeline(0)
        .unwrap()
        .layer(0)
        .unwrap()
        .get_frame(0)
        .unwrap();
    assert!(frame.is_empty());
    assert!(!doc.library().item_exists("pic.png"));

    doc.save(&io, &container, &workers).unwrap();
    assert!(!container.exists("LIBRARY/pic.png"));
}

#[test]
fn test_unknown_placements_survive_roundtrip() {
    // A stored instance whose item never resolves stays in the document
    // untouched; it simply gets no bus receiver.
    let mut doc = Document::new();
    doc.add_new_scene(None);
    doc.library_mut()
        .add_new_item(SymbolType::Graphic, "s")
        .unwrap();
    doc.add_item_to_document("s", 0.0, 0.0).unwrap();

    let io = MemoryMarkup::new();
    let out = tempfile::tempdir().unwrap();
    let container: Arc<dyn Container> = Arc::new(DirContainer::new(out.path()));
    doc.save(&io, &container, &Workers::new(1)).unwrap();

    // Drop the symbol from the saved library section but keep the
    // placement in the scene.
    let mut root = io.load_node("DOMDocument.xml").unwrap();
    if let Some(symbols) = root.child_mut("symbols") {
        symbols.children.clear();
    }
    io.save_node("DOMDocument.xml", &root).unwrap();

    let loaded = Document::load(&io).unwrap();
    assert!(!loaded.library().item_exists("s"));
    let frame = loaded
        .get_timeline(0)
        .unwrap()
        .layer(0)
        .unwrap()
        .get_frame(0)
        .unwrap();
    assert_eq!(frame.elements().len(), 1);
    match &frame.elements()[0] {
        Element::SymbolInstance(inst) => assert_eq!(inst.library_item_name, "s"),
        other => panic!("wrong variant: {:?}", other),
    }
}
