//! Integration test: simulate a host runtime driving mount, update, and
//! unmount commits through the full engine — registry fan-out, diffing, the
//! unnecessary-render check, aggregation, and the report store.

use std::cell::RefCell;
use std::rc::Rc;

use renderlens_core::{
    Aggregator, Consumer, ConsumerResult, Instrumentation, Options, Phase, RegionKey, RenderEvent,
    label_text,
};
use renderlens_tree::{
    ComponentType, Flags, PropBag, RendererDescriptor, RendererId, RuntimeHook, StateCell, Value,
    WorkNode, WorkTree,
};

#[derive(Default)]
struct Captured {
    events: Vec<RenderEvent>,
}

struct Collector {
    captured: Rc<RefCell<Captured>>,
}

impl Consumer for Collector {
    fn on_render(
        &mut self,
        _tree: &WorkTree,
        _key: renderlens_tree::NodeKey,
        event: &RenderEvent,
    ) -> ConsumerResult {
        self.captured.borrow_mut().events.push(event.clone());
        Ok(())
    }
}

fn engine_with_collector(options: Options) -> (Instrumentation, RendererId, Rc<RefCell<Captured>>) {
    let mut hook = RuntimeHook::new();
    let renderer = hook.inject(RendererDescriptor::development("19.0.0"));
    let mut engine = Instrumentation::new(hook, options);
    let captured = Rc::new(RefCell::new(Captured::default()));
    engine.register("overlay", Box::new(Collector { captured: Rc::clone(&captured) }));
    (engine, renderer, captured)
}

#[test]
fn full_commit_lifecycle() {
    let options = Options { track_unnecessary_renders: true, report: true, ..Options::default() };
    let (mut engine, renderer, captured) = engine_with_collector(options);

    // --- Commit 1: initial mount -------------------------------------------
    let counter_source =
        "function Counter({ label }) { const [count, setCount] = useState(0); return null; }";
    let counter_type = ComponentType::with_source("Counter", counter_source);

    let mut tree = WorkTree::new();
    let root = tree.insert_root(WorkNode::root());
    let app = tree.append_child(
        root,
        WorkNode::composite(ComponentType::new("App"), PropBag::new()),
    );
    let mut counter_props = PropBag::new();
    counter_props.set("label", Value::from("clicks"));
    let counter = tree.append_child(
        app,
        WorkNode::composite(counter_type, counter_props),
    );
    tree.node_mut(counter).unwrap().state = vec![StateCell::observable(Value::from(0.0))];
    let mut span_props = PropBag::new();
    span_props.set("text", Value::from("0"));
    let span = tree.append_child(counter, WorkNode::host("span", span_props));

    for key in [app, counter, span] {
        tree.node_mut(key).unwrap().flags = Flags::PLACEMENT;
    }
    tree.node_mut(app).unwrap().actual_duration = 5.0;
    tree.node_mut(counter).unwrap().actual_duration = 3.0;
    tree.node_mut(span).unwrap().actual_duration = 1.0;
    tree.bubble_flags(root);

    engine.on_commit(renderer, &tree, root);
    tree.clear_flags(root);

    {
        let captured = captured.borrow();
        assert_eq!(captured.events.len(), 2, "App and Counter mount; hosts emit no events");
        assert!(captured.events.iter().all(|e| e.phase == Phase::Mount));
        assert!(captured.events.iter().all(|e| e.changes.is_empty()));
        let counter_event = &captured.events[1];
        assert_eq!(counter_event.component, "Counter");
        // Self time excludes the span child.
        assert!((counter_event.time - 2.0).abs() < f64::EPSILON);
        assert!(counter_event.did_commit);
    }

    // --- Commit 2: state update with a real host change --------------------
    tree.begin_update(counter);
    tree.node_mut(counter).unwrap().state[0] = StateCell::observable(Value::from(1.0));
    tree.node_mut(counter).unwrap().flags = Flags::UPDATE;
    tree.begin_update(span);
    tree.node_mut(span).unwrap().memoized_props.set("text", Value::from("1"));
    tree.node_mut(span).unwrap().flags = Flags::UPDATE;
    tree.bubble_flags(root);

    engine.on_commit(renderer, &tree, root);
    tree.clear_flags(root);

    {
        let captured = captured.borrow();
        assert_eq!(captured.events.len(), 3);
        let update = &captured.events[2];
        assert_eq!(update.phase, Phase::Update);
        assert_eq!(update.component, "Counter");
        assert_eq!(update.changes.len(), 1);
        // State-cell name recovered from the component source.
        assert_eq!(update.changes[0].name, "count");
        assert!(!update.changes[0].stable);
        // The span's text really changed, so the render was necessary.
        assert_eq!(update.unnecessary, Some(false));
    }

    // --- Commit 3: identity-only churn is flagged unnecessary --------------
    tree.begin_update(counter);
    tree.node_mut(counter).unwrap().flags = Flags::UPDATE;
    tree.begin_update(span);
    tree.node_mut(span)
        .unwrap()
        .memoized_props
        .set("on_click", Value::function("", "() => setCount(c => c + 1)"));
    tree.node_mut(span).unwrap().flags = Flags::UPDATE;
    // Next render allocates a fresh closure with identical source.
    tree.begin_update(span);
    tree.node_mut(span)
        .unwrap()
        .memoized_props
        .set("on_click", Value::function("", "() => setCount(c => c + 1)"));
    tree.bubble_flags(root);

    engine.on_commit(renderer, &tree, root);
    tree.clear_flags(root);

    {
        let captured = captured.borrow();
        let churn = captured.events.last().unwrap();
        assert_eq!(churn.phase, Phase::Update);
        assert_eq!(churn.unnecessary, Some(true));
    }

    // --- Report store reflects all three Counter renders -------------------
    let report = engine.report().get_report("Counter").unwrap();
    assert_eq!(report.count, 3);
    assert!(engine.report().node_data(counter).is_some());

    // --- Commit 4: unmount, then host reclaims the subtree -----------------
    tree.mark_deletion(counter);
    tree.bubble_flags(root);
    engine.on_commit(renderer, &tree, root);

    {
        let captured = captured.borrow();
        let unmount = captured.events.last().unwrap();
        assert_eq!(unmount.phase, Phase::Unmount);
        assert_eq!(unmount.component, "Counter");
    }

    tree.remove_subtree(counter);
    // Node-keyed report entries die with the node; the name table survives.
    assert!(engine.report().node_data(counter).is_none());
    assert!(engine.report().get_report("Counter").is_some());
}

#[test]
fn aggregation_over_repeated_commits() {
    let (mut engine, renderer, captured) = engine_with_collector(Options::default());

    let mut tree = WorkTree::new();
    let root = tree.insert_root(WorkNode::root());
    let row = tree.append_child(
        root,
        WorkNode::composite(ComponentType::new("Row"), PropBag::new()),
    );
    tree.node_mut(row).unwrap().flags = Flags::PLACEMENT;
    tree.node_mut(row).unwrap().actual_duration = 1.5;
    tree.bubble_flags(root);
    engine.on_commit(renderer, &tree, root);
    tree.clear_flags(root);

    for _ in 0..2 {
        tree.begin_update(row);
        tree.node_mut(row).unwrap().flags = Flags::UPDATE;
        tree.bubble_flags(root);
        engine.on_commit(renderer, &tree, root);
        tree.clear_flags(root);
    }

    // Feed the captured stream into an aggregator keyed by screen slot.
    let mut aggregator = Aggregator::new(5000.0);
    let key = RegionKey::new(120, 80);
    let mut now = 0.0;
    for event in &captured.borrow().events {
        aggregator.observe(key, event.component.clone(), event, now);
        now += 100.0;
    }

    let aggregate = aggregator.get(key).unwrap();
    assert_eq!(aggregate.repeat_count, 3);
    assert!((aggregate.time - 4.5).abs() < f64::EPSILON);
    assert!(aggregate.committed);

    let label = label_text(&[aggregate]).unwrap();
    assert_eq!(label, "Row ×3 (4.5ms)");

    // The window elapses with no further events: the slot is evicted.
    aggregator.evict_stale(now + 5001.0);
    assert!(aggregator.is_empty());
}
