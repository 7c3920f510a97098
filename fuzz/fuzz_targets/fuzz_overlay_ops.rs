#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use overtop_core::{ElementId, InputEvent, Key, Modifiers, PointerEvents};
use overtop_stack::{AnimationSpec, OverlayManager, SurfaceId, SurfaceOptions};

#[derive(Debug, Arbitrary)]
struct Spec {
    modeless: bool,
    trap: bool,
    restore: bool,
    opening: bool,
    closing: bool,
}

#[derive(Debug, Arbitrary)]
enum Op {
    Open(u8),
    Close(u8),
    BringToFront(u8),
    Finish(u8),
    Remove(u8),
    PointerDown(u8),
    PointerUp(u8),
    Click(u8),
    Escape,
    Tab(bool),
    Focus(u8),
    RunTasks,
}

#[derive(Debug, Arbitrary)]
struct Input {
    surfaces: Vec<Spec>,
    ops: Vec<Op>,
}

fuzz_target!(|input: Input| {
    let mut manager = OverlayManager::new();
    let body = manager.document().body();
    let mut ids: Vec<SurfaceId> = Vec::new();
    let mut targets: Vec<ElementId> = vec![manager.document().root(), body];

    for spec in input.surfaces.iter().take(8) {
        let options = SurfaceOptions::new()
            .modeless(spec.modeless)
            .with_backdrop(!spec.modeless)
            .focus_trap(spec.trap)
            .restore_focus_on_close(spec.restore)
            .animation(AnimationSpec {
                opening: spec.opening,
                closing: spec.closing,
            });
        let Ok(id) = manager.create_surface(body, options) else {
            return;
        };
        let Some(region) = manager.surface(id).map(|s| s.region()) else {
            return;
        };
        let doc = manager.document_mut();
        if let Ok(button) = doc.create_child(region, "button") {
            let _ = doc.set_tab_index(button, Some(0));
            targets.push(button);
        }
        ids.push(id);
    }
    if ids.is_empty() {
        return;
    }

    let pick = |i: u8| ids[i as usize % ids.len()];
    for op in input.ops.iter().take(256) {
        let target = |i: u8| targets[i as usize % targets.len()];
        let _ = match *op {
            Op::Open(i) => manager.open(pick(i)),
            Op::Close(i) => manager.close(pick(i), None),
            Op::BringToFront(i) => manager.bring_to_front(pick(i)),
            Op::Finish(i) => manager.animation_finished(pick(i)),
            Op::Remove(i) => manager.remove_surface(pick(i)),
            Op::PointerDown(i) => manager
                .handle_event(&InputEvent::PointerDown { target: target(i) })
                .map(drop),
            Op::PointerUp(i) => manager
                .handle_event(&InputEvent::PointerUp { target: target(i) })
                .map(drop),
            Op::Click(i) => manager.handle_event(&InputEvent::click(target(i))).map(drop),
            Op::Escape => manager.press_key(Key::Escape, Modifiers::empty()).map(drop),
            Op::Tab(back) => {
                let mods = if back { Modifiers::SHIFT } else { Modifiers::empty() };
                manager.press_key(Key::Tab, mods).map(drop)
            }
            Op::Focus(i) => manager
                .document_mut()
                .focus(target(i))
                .map_err(Into::into),
            Op::RunTasks => {
                manager.run_pending_tasks();
                Ok(())
            }
        };

        // Body lock tracks attached modal surfaces.
        let doc = manager.document();
        let inert = doc.pointer_events(doc.body()) == Some(PointerEvents::None);
        assert_eq!(inert, manager.registry().has_attached_modal());

        // Attached list has no duplicates.
        let attached = manager.registry().attached();
        for (n, id) in attached.iter().enumerate() {
            assert!(!attached[n + 1..].contains(id));
        }
    }
});
