//! End-to-end verification of the retained tree -> frame pipeline.
//!
//! Every test drives a real [`Context`] over the headless backend and
//! asserts on what the backend actually received, what the tree published
//! back, and what handlers observed. No internals are reached into: if it
//! is not observable here, it did not happen.

use meridian::prelude::*;
use meridian::{Interaction, ItemId, StyleValue as Sv};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

fn quick_config() -> RuntimeConfig {
    RuntimeConfig {
        target_fps: 1000,
        ..RuntimeConfig::default()
    }
}

fn fixed_container(width: f32, height: f32) -> ItemNode {
    ItemNode::container().with_layout(LayoutSpec::default().with_fixed_size(width, height))
}

/// Draw order of `id` within `frame`, if it was drawn at all.
fn draw_position(context: &Context<HeadlessBackend>, id: ItemId, frame: u64) -> Option<usize> {
    context
        .backend()
        .calls_for_frame(frame)
        .iter()
        .position(|call| call.id == id)
}

#[test]
fn test_auto_siblings_fill_fixed_parent() {
    let tree = SharedTree::new();
    let a = tree.append(tree.root(), fixed_container(100.0, 100.0)).unwrap();
    let b = tree.append(a, ItemNode::container()).unwrap();
    let c = tree.append(a, ItemNode::container()).unwrap();

    let mut context = Context::new(tree.clone(), HeadlessBackend::new(), quick_config());
    context.run_once().unwrap();

    // Two auto siblings split the fixed parent equally and stretch to its
    // full height; the published rects are what the application reads back.
    assert_eq!(tree.resolved_rect(b).unwrap(), Rect::new(0.0, 0.0, 50.0, 100.0));
    assert_eq!(tree.resolved_rect(c).unwrap(), Rect::new(50.0, 0.0, 50.0, 100.0));
}

#[test]
fn test_deferred_reparent_lands_one_frame_later() {
    let tree = SharedTree::new();
    let left = tree.append(tree.root(), fixed_container(100.0, 50.0)).unwrap();
    let right = tree.append(tree.root(), fixed_container(100.0, 50.0)).unwrap();
    let child = tree.append(left, fixed_container(10.0, 10.0)).unwrap();

    let mut context = Context::new(tree.clone(), HeadlessBackend::new(), quick_config());
    let queue = context.mutation_queue();

    queue
        .submit(MutationRequest::Reparent {
            node: child,
            new_parent: right,
            index: 0,
        })
        .unwrap();

    // The request is queued, not applied: the tree is unchanged until a
    // frame commits it.
    assert_eq!(tree.parent_of(child), Some(left));

    // Frame 1 traverses the pre-mutation snapshot, then applies the move.
    context.run_once().unwrap();
    assert!(draw_position(&context, child, 1).unwrap() < draw_position(&context, right, 1).unwrap());
    assert_eq!(tree.parent_of(child), Some(right));

    // Frame 2 draws the child under its new parent.
    context.run_once().unwrap();
    assert!(draw_position(&context, right, 2).unwrap() < draw_position(&context, child, 2).unwrap());
}

#[test]
fn test_removed_subtree_is_never_drawn_again() {
    let tree = SharedTree::new();
    let panel = tree.append(tree.root(), fixed_container(100.0, 100.0)).unwrap();
    let inner = tree.append(panel, fixed_container(10.0, 10.0)).unwrap();

    let mut context = Context::new(tree.clone(), HeadlessBackend::new(), quick_config());
    context.run_once().unwrap();
    assert!(context.backend().was_drawn(inner, 1));

    tree.remove(panel).unwrap();
    // Stale handles degrade to lookup misses immediately.
    assert_eq!(tree.resolved_rect(panel), None);

    for frame in 2..5 {
        context.run_once().unwrap();
        assert!(!context.backend().was_drawn(panel, frame));
        assert!(!context.backend().was_drawn(inner, frame));
    }
}

#[test]
fn test_hidden_subtree_skipped_until_shown() {
    let tree = SharedTree::new();
    let panel = tree.append(tree.root(), fixed_container(100.0, 100.0)).unwrap();
    let inner = tree.append(panel, fixed_container(10.0, 10.0)).unwrap();

    let mut context = Context::new(tree.clone(), HeadlessBackend::new(), quick_config());
    tree.set_visible(panel, false).unwrap();
    context.run_once().unwrap();
    assert!(!context.backend().was_drawn(panel, 1));
    assert!(!context.backend().was_drawn(inner, 1));

    tree.set_visible(panel, true).unwrap();
    context.run_once().unwrap();
    assert!(context.backend().was_drawn(panel, 2));
    assert!(context.backend().was_drawn(inner, 2));
}

#[test]
fn test_concurrent_mutators_never_corrupt_frames() {
    let tree = SharedTree::new();
    let root = tree.root();
    for _ in 0..10 {
        tree.append(root, ItemNode::container()).unwrap();
    }

    let mut context = Context::new(tree.clone(), HeadlessBackend::new(), quick_config());

    let mut writers = Vec::new();
    for _ in 0..4 {
        let tree = tree.clone();
        writers.push(thread::spawn(move || {
            for _ in 0..50 {
                let id = tree.append(root, ItemNode::container()).unwrap();
                let keep = tree.append(root, ItemNode::container()).unwrap();
                tree.remove(id).unwrap();
                let _ = keep;
            }
        }));
    }

    // Frames run while the writers churn; every one must complete.
    for _ in 0..20 {
        context.run_once().unwrap();
    }
    for writer in writers {
        writer.join().unwrap();
    }
    context.run_once().unwrap();

    tree.with(|t| {
        t.validate().unwrap();
        // 1 root + 10 initial + 4 * 50 kept.
        assert_eq!(t.len(), 211);
    });
}

#[test]
fn test_hover_enter_fires_once_in_attachment_order() {
    let tree = SharedTree::new();
    let button = tree.append(tree.root(), fixed_container(40.0, 20.0)).unwrap();

    let log = Arc::new(Mutex::new(Vec::new()));
    for name in ["first", "second"] {
        let log = Arc::clone(&log);
        tree.attach_handler(
            button,
            Arc::new(FnHandler::new(name, move |_, event| {
                if matches!(event, UiEvent::HoverEnter) {
                    log.lock().unwrap().push(name);
                }
                Ok(())
            })),
        )
        .unwrap();
    }

    let mut context = Context::new(tree, HeadlessBackend::new(), quick_config());
    let hover = Interaction {
        hovered: true,
        ..Default::default()
    };
    context.backend_mut().script_input(vec![(button, hover)]);
    context.backend_mut().script_input(vec![(button, hover)]);

    // Hover held across two frames: one enter, delivered in attachment
    // order, never repeated.
    context.run_once().unwrap();
    context.run_once().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
}

#[test]
fn test_widget_value_round_trip() {
    let tree = SharedTree::new();
    let slider = tree
        .append(tree.root(), ItemNode::new(ItemKind::Widget { value: 0.25 }))
        .unwrap();

    let changes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&changes);
    tree.attach_handler(
        slider,
        Arc::new(FnHandler::new("on_change", move |_, event| {
            if let UiEvent::ValueChanged { previous, current } = event {
                assert_eq!(*previous, 0.25);
                assert_eq!(*current, 0.75);
                counter.fetch_add(1, Ordering::Relaxed);
            }
            Ok(())
        })),
    )
    .unwrap();

    let mut context = Context::new(tree.clone(), HeadlessBackend::new(), quick_config());
    context.backend_mut().script_input(vec![(
        slider,
        Interaction {
            value: Some(0.75),
            ..Default::default()
        },
    )]);
    context.run_once().unwrap();

    assert_eq!(changes.load(Ordering::Relaxed), 1);
    // The retained widget value was updated from the backend result.
    tree.with(|t| {
        assert_eq!(t.node(slider).unwrap().kind(), &ItemKind::Widget { value: 0.75 });
    });
}

#[test]
fn test_theme_scopes_to_subtree_and_detaches_next_frame() {
    let red = Color::rgb(0.8, 0.1, 0.1);
    let tree = SharedTree::new();
    let themed = tree.append(tree.root(), fixed_container(100.0, 100.0)).unwrap();
    let inside = tree.append(themed, fixed_container(10.0, 10.0)).unwrap();
    let outside = tree.append(tree.root(), fixed_container(10.0, 10.0)).unwrap();

    tree.attach_theme(
        themed,
        Arc::new(Theme::new().with(StyleKey::BackgroundColor, Sv::Color(red))),
    )
    .unwrap();

    let mut context = Context::new(tree.clone(), HeadlessBackend::new(), quick_config());
    context.run_once().unwrap();

    let background_of = |context: &Context<HeadlessBackend>, id, frame| {
        context
            .backend()
            .calls_for_frame(frame)
            .iter()
            .find(|call| call.id == id)
            .map(|call| call.style.background)
    };

    // The theme covers the attached node and its descendants, nothing else.
    let default_background = background_of(&context, tree.root(), 1).unwrap();
    assert_eq!(background_of(&context, themed, 1).unwrap(), red);
    assert_eq!(background_of(&context, inside, 1).unwrap(), red);
    assert_eq!(background_of(&context, outside, 1).unwrap(), default_background);

    // Detaching takes effect at the next snapshot.
    tree.detach_theme(themed).unwrap();
    context.run_once().unwrap();
    assert_eq!(background_of(&context, themed, 2).unwrap(), default_background);
    assert_eq!(background_of(&context, inside, 2).unwrap(), default_background);
}

#[test]
fn test_stop_from_another_thread() {
    let tree = SharedTree::new();
    tree.append(tree.root(), ItemNode::container()).unwrap();

    let mut context = Context::new(tree, HeadlessBackend::new(), quick_config());
    let stop = context.stop_handle();

    let stopper = thread::spawn(move || {
        stop.stop();
    });
    stopper.join().unwrap();

    let stats = context.run_forever().unwrap();
    assert!(stats.frames >= 1);
    assert_eq!(context.state(), RunState::Stopped);
}
