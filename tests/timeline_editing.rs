//! Timeline editing sessions: keyframe spans, folder blocks, reference
//! bookkeeping across a longer sequence of operations.

use xfldoc::entities::{Element, LayerType, SymbolType};
use xfldoc::{Library, Timeline, XflError};

fn assert_well_formed(tl: &Timeline) {
    for (i, layer) in tl.layers().iter().enumerate() {
        if let Some(p) = layer.parent_layer_index {
            assert!(p < i, "layer {} points at a folder below it", i);
            assert!(tl.layers()[p].is_folder());
        }
        let mut expected = 0;
        for f in layer.keyframes() {
            assert_eq!(f.start_frame(), expected, "gap in layer {}", i);
            assert!(f.duration() >= 1);
            expected = f.end_frame();
        }
    }
}

#[test]
fn test_keyframe_editing_session() {
    let mut lib = Library::new();
    lib.add_new_item(SymbolType::Graphic, "cycle").unwrap();
    lib.with_symbol_timeline("cycle", |tl, _| {
        tl.layer_mut(0).unwrap().insert_frames(11, 0).unwrap();
    })
    .unwrap();

    let mut tl = Timeline::new("Scene 1");
    tl.add_new_layer("anim", LayerType::Normal);
    tl.insert_frames(23, 0, None).unwrap();
    assert_eq!(tl.frame_count(), 24);

    tl.layer_mut(0)
        .unwrap()
        .get_frame_mut(0)
        .unwrap()
        .add_item("cycle", &mut lib)
        .unwrap();

    // Keyframe every 8 frames; the looping instance keeps phase.
    let layer = tl.layer_mut(0).unwrap();
    assert!(layer.insert_keyframe(8, &mut lib).unwrap());
    assert!(layer.insert_keyframe(16, &mut lib).unwrap());
    assert_eq!(layer.keyframe_count(), 3);
    assert_eq!(lib.use_count("cycle"), Some(3));

    for (i, expected_phase) in [(0usize, 0usize), (1, 8), (2, 4)] {
        match &layer.keyframe(i).unwrap().elements()[0] {
            Element::SymbolInstance(inst) => {
                assert_eq!(inst.first_frame, expected_phase, "keyframe {}", i)
            }
            other => panic!("wrong variant: {:?}", other),
        }
    }

    // Collapse the middle keyframe back into its predecessor.
    assert!(layer.clear_keyframe(8, &mut lib).unwrap());
    assert_eq!(layer.keyframe_count(), 2);
    assert_eq!(lib.use_count("cycle"), Some(2));

    // Trim the tail across the whole timeline.
    tl.remove_frames(8, 16, None, &mut lib).unwrap();
    assert_eq!(tl.frame_count(), 16);
    assert_eq!(lib.use_count("cycle"), Some(1));
    assert_well_formed(&tl);
}

#[test]
fn test_folder_editing_session() {
    let mut lib = Library::new();
    let mut tl = Timeline::new("Scene 1");
    tl.add_new_layer("bg", LayerType::Normal);
    let folder = tl.add_new_layer("fx", LayerType::Folder);
    tl.add_new_layer("spark", LayerType::Normal);
    tl.add_new_layer("smoke", LayerType::Normal);
    tl.layer_mut(2).unwrap().parent_layer_index = Some(folder);
    tl.layer_mut(3).unwrap().parent_layer_index = Some(folder);
    tl.add_new_layer("fg", LayerType::Normal);
    assert_well_formed(&tl);

    // Move the folder block below fg, then pull bg inside it.
    tl.reorder_layer(1, 4, false).unwrap();
    assert_well_formed(&tl);
    let fx = tl.find_layer_index("fx")[0];
    tl.reorder_layer(0, fx, false).unwrap();
    assert_well_formed(&tl);
    let fx = tl.find_layer_index("fx")[0];
    assert_eq!(
        tl.layer(fx + 1).unwrap().parent_layer_index,
        Some(fx),
        "bg joined the folder"
    );

    // Duplicate the folder, then delete the original block.
    let copy = tl.duplicate_layer(fx, &mut lib).unwrap();
    assert_well_formed(&tl);
    assert_eq!(tl.layer(copy).unwrap().name, "fx_copy");
    tl.delete_layer(fx, &mut lib).unwrap();
    assert_well_formed(&tl);
    assert_eq!(tl.find_layer_index("fx"), Vec::<usize>::new());
    assert_eq!(tl.find_layer_index("fx_copy").len(), 1);
    assert_eq!(tl.find_layer_index("bg_copy").len(), 1);
}

#[test]
fn test_folder_layers_reject_frame_ops() {
    let mut lib = Library::new();
    let mut tl = Timeline::new("t");
    let folder = tl.add_new_layer("dir", LayerType::Folder);

    let layer = tl.layer_mut(folder).unwrap();
    assert!(matches!(
        layer.insert_keyframe(0, &mut lib),
        Err(XflError::Validation(_))
    ));
    assert!(matches!(
        layer.insert_frames(3, 0),
        Err(XflError::Validation(_))
    ));
    assert!(matches!(
        layer.remove_frames(1, 0, &mut lib),
        Err(XflError::Validation(_))
    ));
}

#[test]
fn test_symbol_timeline_edits_count_too() {
    // Frame operations inside a symbol's own timeline use the same
    // reference bookkeeping as scene timelines.
    let mut lib = Library::new();
    lib.add_new_item(SymbolType::Graphic, "inner").unwrap();
    lib.add_new_item(SymbolType::MovieClip, "outer").unwrap();

    lib.with_symbol_timeline("outer", |tl, lib| {
        tl.layer_mut(0)
            .unwrap()
            .get_frame_mut(0)
            .unwrap()
            .add_item("inner", lib)
            .unwrap();
    })
    .unwrap();
    assert_eq!(lib.use_count("inner"), Some(1));

    lib.with_symbol_timeline("outer", |tl, lib| {
        tl.delete_layer(0, lib).unwrap();
    })
    .unwrap();
    assert_eq!(lib.use_count("inner"), Some(0));
    assert!(lib.bus().is_empty());
}
