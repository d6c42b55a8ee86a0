//! End-to-end scenarios for the dispatch engine.

use serde_json::{json, Value};
use statecraft::builder::{MachineBuilder, StructureError, TransitionBuilder};
use statecraft::core::{Action, Event, Guard, HistoryDepth, InputKind, Outbox};
use statecraft::engine::{MachineOptions, Notification};
use statecraft::property::{MachineContext, PropertyBag, RestorePolicy, Settable, UnknownProperty};
use statecraft::StartError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

fn finished_counter<C: MachineContext>(machine: &mut statecraft::Machine<C>) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    machine.on_finished(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    count
}

// ---------------------------------------------------------------------------
// Factorial
// ---------------------------------------------------------------------------

struct Factorial {
    x: i64,
    fac: i64,
}

impl MachineContext for Factorial {}

#[test]
fn factorial_of_six() {
    let mut builder = MachineBuilder::<Factorial>::new("factorial");
    let root = builder.root();
    let compute = builder.simple(root, "compute").unwrap();
    let done = builder.final_state(root, "done").unwrap();

    builder
        .transition(
            TransitionBuilder::new()
                .from(compute)
                .to(compute)
                .on_signal("xChanged")
                .guard(Guard::on_context(|f: &Factorial| f.x > 1))
                .run(|f: &mut Factorial, _: Option<&Event>, out: &mut Outbox| {
                    f.fac *= f.x;
                    f.x -= 1;
                    out.post(Event::signal("factorial", "xChanged"));
                }),
        )
        .unwrap();
    builder
        .transition(
            TransitionBuilder::new()
                .from(compute)
                .to(done)
                .on_signal("xChanged")
                .guard(Guard::on_context(|f: &Factorial| f.x <= 1)),
        )
        .unwrap();

    let mut machine = builder.build();
    let finished = finished_counter(&mut machine);
    let mut ctx = Factorial { x: 6, fac: 1 };

    machine.start(&mut ctx).unwrap();
    machine.post(Event::signal("factorial", "xChanged"));
    machine.process(&mut ctx);

    assert_eq!(ctx.fac, 720);
    assert_eq!(ctx.x, 1);
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert!(!machine.is_running());
    assert!(machine.configuration().is_empty());
}

// ---------------------------------------------------------------------------
// Hover button
// ---------------------------------------------------------------------------

/// Settable that records every assignment it receives.
#[derive(Default)]
struct RecordingButton {
    assignments: Vec<(String, Value)>,
}

impl Settable for RecordingButton {
    fn set(&mut self, name: &str, value: Value) -> Result<(), UnknownProperty> {
        if name != "text" {
            return Err(UnknownProperty::new(name));
        }
        self.assignments.push((name.to_string(), value));
        Ok(())
    }
}

#[derive(Default)]
struct HoverUi {
    button: RecordingButton,
}

impl MachineContext for HoverUi {
    fn target(&mut self, id: &str) -> Option<&mut dyn Settable> {
        match id {
            "button" => Some(&mut self.button),
            _ => None,
        }
    }
}

#[test]
fn hover_button_assigns_in_order() {
    let mut builder = MachineBuilder::<HoverUi>::new("hover");
    let root = builder.root();
    let outside = builder.simple(root, "Outside").unwrap();
    let inside = builder.simple(root, "Inside").unwrap();
    let pressing = builder.simple(root, "Pressing").unwrap();

    builder.assign_property(outside, "button", "text", "idle").unwrap();
    builder.assign_property(inside, "button", "text", "hover").unwrap();
    builder.assign_property(pressing, "button", "text", "pressed").unwrap();

    for (from, to, kind) in [
        (outside, inside, InputKind::Enter),
        (inside, outside, InputKind::Leave),
        (inside, pressing, InputKind::Press),
        (pressing, inside, InputKind::Release),
    ] {
        builder
            .transition(TransitionBuilder::new().from(from).to(to).on_input(kind))
            .unwrap();
    }

    let mut machine = builder.build();
    let mut ui = HoverUi::default();
    machine.start(&mut ui).unwrap();
    ui.button.assignments.clear();

    for kind in [
        InputKind::Enter,
        InputKind::Press,
        InputKind::Release,
        InputKind::Leave,
    ] {
        machine.post(Event::input(kind));
    }
    machine.process(&mut ui);

    assert_eq!(machine.active_names(), vec!["Outside"]);
    let texts: Vec<_> = ui.button.assignments.iter().map(|(_, v)| v.clone()).collect();
    assert_eq!(
        texts,
        vec![json!("hover"), json!("pressed"), json!("hover"), json!("idle")]
    );
}

// ---------------------------------------------------------------------------
// Parallel entry and completion
// ---------------------------------------------------------------------------

#[test]
fn parallel_state_enters_every_region() {
    let mut builder = MachineBuilder::<()>::new("regions");
    let root = builder.root();
    let p = builder.parallel(root, "p").unwrap();

    let mut initials = Vec::new();
    for name in ["audio", "video", "input"] {
        let region = builder.compound(p, name).unwrap();
        builder.simple(region, format!("{name}_off")).unwrap();
        let on = builder.simple(region, format!("{name}_on")).unwrap();
        builder.set_initial(region, on).unwrap();
        initials.push(on);
    }

    let mut machine = builder.build();
    machine.start(&mut ()).unwrap();

    let atomic = machine.configuration().atomic_states(machine.tree());
    assert_eq!(atomic, initials);
    assert!(machine.is_active(p));
    assert_eq!(machine.configuration().len(), 1 + 1 + 3 + 3);
    assert_eq!(machine.check_invariants(), Ok(()));
}

#[test]
fn parallel_root_finishes_once_after_both_regions() {
    let mut builder = MachineBuilder::<()>::new_parallel("jobs");
    let root = builder.root();
    for name in ["left", "right"] {
        let region = builder.compound(root, name).unwrap();
        let working = builder.simple(region, format!("{name}_working")).unwrap();
        let done = builder.final_state(region, format!("{name}_done")).unwrap();
        builder
            .transition(
                TransitionBuilder::new()
                    .from(working)
                    .to(done)
                    .on_signal_from(name, "finish"),
            )
            .unwrap();
    }

    let mut machine = builder.build();
    let finished = finished_counter(&mut machine);
    machine.start(&mut ()).unwrap();

    machine.post(Event::signal("left", "finish"));
    machine.process(&mut ());
    assert_eq!(finished.load(Ordering::SeqCst), 0);
    assert!(machine.is_running());

    machine.post(Event::signal("right", "finish"));
    machine.process(&mut ());
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert!(!machine.is_running());
}

#[test]
fn nested_parallel_region_finishing_last_finishes_the_root() {
    let mut builder = MachineBuilder::<()>::new_parallel("pipeline");
    let root = builder.root();
    let stages = builder.parallel(root, "stages").unwrap();

    let region = |builder: &mut MachineBuilder<()>, parent, name: &str| {
        let region = builder.compound(parent, name).unwrap();
        let working = builder.simple(region, format!("{name}_working")).unwrap();
        let done = builder.final_state(region, format!("{name}_done")).unwrap();
        builder
            .transition(
                TransitionBuilder::new()
                    .from(working)
                    .to(done)
                    .on_signal_from(name, "finish"),
            )
            .unwrap();
    };
    region(&mut builder, stages, "fetch");
    region(&mut builder, stages, "decode");
    region(&mut builder, root, "report");

    let mut machine = builder.build();
    let finished = finished_counter(&mut machine);
    machine.start(&mut ()).unwrap();

    for source in ["report", "fetch"] {
        machine.post(Event::signal(source, "finish"));
        machine.process(&mut ());
        assert_eq!(finished.load(Ordering::SeqCst), 0);
        assert!(machine.is_running());
    }

    machine.post(Event::signal("decode", "finish"));
    machine.process(&mut ());
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert!(!machine.is_running());
    assert!(machine.configuration().is_empty());
}

#[test]
fn completion_event_takes_transition_on_parent() {
    let mut builder = MachineBuilder::<()>::new("download");
    let root = builder.root();
    let job = builder.compound(root, "job").unwrap();
    let fetching = builder.simple(job, "fetching").unwrap();
    let fetched = builder.final_state(job, "fetched").unwrap();
    let report = builder.simple(root, "report").unwrap();
    let ignored = builder.simple(root, "ignored").unwrap();

    builder
        .transition(TransitionBuilder::new().from(fetching).to(fetched).on_signal("done"))
        .unwrap();
    builder
        .transition(TransitionBuilder::new().from(job).to(report).on_completion())
        .unwrap();
    builder
        .transition(TransitionBuilder::new().from(job).to(ignored).on_signal("late"))
        .unwrap();

    let mut machine = builder.build();
    machine.start(&mut ()).unwrap();
    machine.post(Event::signal("net", "done"));
    machine.post(Event::signal("net", "late"));

    let first = machine.step(&mut ()).unwrap();
    assert_eq!(first.event, Event::signal("net", "done"));
    let second = machine.step(&mut ()).unwrap();
    assert_eq!(second.event, Event::Completion(job));
    assert!(machine.is_active(report));

    let third = machine.step(&mut ()).unwrap();
    assert!(third.is_discarded());
    assert!(!machine.is_active(ignored));
    assert!(machine.is_running());
}

#[test]
fn nested_parallel_completion_reaches_enclosing_state() {
    let mut builder = MachineBuilder::<()>::new("setup");
    let root = builder.root();
    let both = builder.parallel(root, "both").unwrap();
    for name in ["db", "cache"] {
        let region = builder.compound(both, name).unwrap();
        let waiting = builder.simple(region, format!("{name}_waiting")).unwrap();
        let ready = builder.final_state(region, format!("{name}_ready")).unwrap();
        builder
            .transition(TransitionBuilder::new().from(waiting).to(ready).on_signal(name))
            .unwrap();
    }
    let serving = builder.simple(root, "serving").unwrap();
    builder
        .transition(TransitionBuilder::new().from(both).to(serving).on_completion())
        .unwrap();

    let mut machine = builder.build();
    machine.start(&mut ()).unwrap();
    machine.post(Event::signal("init", "db"));
    machine.process(&mut ());
    assert!(machine.is_active(both));

    machine.post(Event::signal("init", "cache"));
    machine.process(&mut ());
    assert_eq!(machine.active_names(), vec!["serving"]);
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

type Trace = Arc<Mutex<Vec<String>>>;

fn traced(trace: &Trace, text: String) -> Action<()> {
    let trace = Arc::clone(trace);
    Action::callback(move |_: &mut (), _: Option<&Event>, _: &mut Outbox| {
        trace.lock().unwrap().push(text.clone())
    })
}

#[test]
fn exits_deepest_first_entries_shallowest_first() {
    let trace: Trace = Arc::default();
    let mut builder = MachineBuilder::<()>::new("order");
    let root = builder.root();

    let mut leaves = Vec::new();
    for side in ["a", "b"] {
        let mut parent = root;
        for depth in 1..=3 {
            let name = format!("{side}{depth}");
            let state = builder.simple(parent, name.clone()).unwrap();
            builder.on_entry(state, traced(&trace, format!("enter {name}"))).unwrap();
            builder.on_exit(state, traced(&trace, format!("exit {name}"))).unwrap();
            parent = state;
        }
        leaves.push(parent);
    }
    builder
        .transition(
            TransitionBuilder::new()
                .from(leaves[0])
                .to(leaves[1])
                .on_signal("cross")
                .action(traced(&trace, "transition".into())),
        )
        .unwrap();

    let mut machine = builder.build();
    machine.start(&mut ()).unwrap();
    trace.lock().unwrap().clear();

    machine.post(Event::signal("test", "cross"));
    machine.process(&mut ());

    assert_eq!(
        *trace.lock().unwrap(),
        vec![
            "exit a3", "exit a2", "exit a1", "transition", "enter b1", "enter b2", "enter b3",
        ]
    );
}

#[test]
fn unmatched_events_leave_configuration_unchanged() {
    let mut builder = MachineBuilder::<()>::new("idle");
    let root = builder.root();
    let a = builder.compound(root, "a").unwrap();
    let a1 = builder.simple(a, "a1").unwrap();
    let b = builder.simple(root, "b").unwrap();
    builder
        .transition(TransitionBuilder::new().from(a1).to(b).on_key(InputKind::KeyPress, 13))
        .unwrap();

    let mut machine = builder.build();
    machine.start(&mut ()).unwrap();
    let before = machine.configuration().clone();

    for event in [
        Event::key_press(32),
        Event::key_release(13),
        Event::signal("x", "y"),
        Event::custom(json!({"any": "payload"})),
        Event::Completion(a),
    ] {
        machine.post(event);
    }
    machine.process(&mut ());

    assert_eq!(machine.configuration(), &before);
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[test]
fn shallow_history_restores_last_child() {
    let mut builder = MachineBuilder::<()>::new("player");
    let root = builder.root();
    let player = builder.compound(root, "player").unwrap();
    let playing = builder.simple(player, "playing").unwrap();
    let paused = builder.simple(player, "paused").unwrap();
    let resume = builder.history(player, "resume", HistoryDepth::Shallow).unwrap();
    let menu = builder.simple(root, "menu").unwrap();

    builder
        .transition(TransitionBuilder::new().from(playing).to(paused).on_signal("pause"))
        .unwrap();
    builder
        .transition(TransitionBuilder::new().from(player).to(menu).on_signal("menu"))
        .unwrap();
    builder
        .transition(TransitionBuilder::new().from(menu).to(resume).on_signal("back"))
        .unwrap();

    let mut machine = builder.build();
    machine.start(&mut ()).unwrap();
    assert!(machine.is_active(playing));

    for signal in ["pause", "menu", "back"] {
        machine.post(Event::signal("ui", signal));
    }
    machine.process(&mut ());

    assert!(machine.is_active(paused));
    assert!(!machine.is_active(resume));
}

#[test]
fn deep_history_restores_nested_leaf() {
    let mut builder = MachineBuilder::<()>::new("editor");
    let root = builder.root();
    let editing = builder.compound(root, "editing").unwrap();
    let text = builder.compound(editing, "text").unwrap();
    let typing = builder.simple(text, "typing").unwrap();
    let selecting = builder.simple(text, "selecting").unwrap();
    let deep = builder.history(editing, "deep", HistoryDepth::Deep).unwrap();
    let shallow = builder.history(editing, "shallow", HistoryDepth::Shallow).unwrap();
    let dialog = builder.simple(root, "dialog").unwrap();

    builder
        .transition(TransitionBuilder::new().from(typing).to(selecting).on_signal("select"))
        .unwrap();
    builder
        .transition(TransitionBuilder::new().from(editing).to(dialog).on_signal("open"))
        .unwrap();
    builder
        .transition(TransitionBuilder::new().from(dialog).to(deep).on_signal("close"))
        .unwrap();
    builder
        .transition(TransitionBuilder::new().from(dialog).to(shallow).on_signal("cancel"))
        .unwrap();

    let mut machine = builder.build();
    machine.start(&mut ()).unwrap();
    for signal in ["select", "open", "close"] {
        machine.post(Event::signal("ui", signal));
    }
    machine.process(&mut ());
    assert!(machine.is_active(selecting));

    // Shallow history only remembers `text`, which re-enters its initial child.
    for signal in ["open", "cancel"] {
        machine.post(Event::signal("ui", signal));
    }
    machine.process(&mut ());
    assert_eq!(machine.active_names(), vec!["typing"]);
}

#[test]
fn history_default_is_used_before_anything_is_recorded() {
    let mut builder = MachineBuilder::<()>::new("wizard");
    let root = builder.root();
    let intro = builder.simple(root, "intro").unwrap();
    let steps = builder.compound(root, "steps").unwrap();
    builder.simple(steps, "one").unwrap();
    let two = builder.simple(steps, "two").unwrap();
    let last = builder.history(steps, "last", HistoryDepth::Shallow).unwrap();
    builder.set_history_default(last, two).unwrap();
    builder
        .transition(TransitionBuilder::new().from(intro).to(last).on_signal("continue"))
        .unwrap();

    let mut machine = builder.build();
    machine.start(&mut ()).unwrap();
    machine.post(Event::signal("ui", "continue"));
    machine.process(&mut ());

    assert_eq!(machine.active_names(), vec!["two"]);
}

// ---------------------------------------------------------------------------
// Property restore policy
// ---------------------------------------------------------------------------

struct Panel {
    label: PropertyBag,
}

impl MachineContext for Panel {
    fn target(&mut self, id: &str) -> Option<&mut dyn Settable> {
        (id == "label").then_some(&mut self.label as &mut dyn Settable)
    }
}

fn panel_machine(policy: RestorePolicy) -> (statecraft::Machine<Panel>, Panel) {
    let mut builder = MachineBuilder::<Panel>::new("panel")
        .options(MachineOptions::default().restore_policy(policy));
    let root = builder.root();
    let idle = builder.simple(root, "idle").unwrap();
    let busy = builder.simple(root, "busy").unwrap();
    let done = builder.simple(root, "done").unwrap();

    builder.assign_property(busy, "label", "text", "busy").unwrap();
    builder.assign_property(busy, "label", "colour", "red").unwrap();
    builder.assign_property(done, "label", "text", "done").unwrap();

    for (from, to, signal) in [
        (idle, busy, "work"),
        (busy, idle, "cancel"),
        (busy, done, "finish"),
        (done, idle, "reset"),
    ] {
        builder
            .transition(TransitionBuilder::new().from(from).to(to).on_signal(signal))
            .unwrap();
    }

    let panel = Panel {
        label: PropertyBag::default()
            .property("text", "ready")
            .property("colour", "black"),
    };
    (builder.build(), panel)
}

fn run(machine: &mut statecraft::Machine<Panel>, panel: &mut Panel, signals: &[&str]) {
    for signal in signals {
        machine.post(Event::signal("user", *signal));
    }
    machine.process(panel);
}

#[test]
fn restore_policy_puts_properties_back_on_exit() {
    let (mut machine, mut panel) = panel_machine(RestorePolicy::RestoreProperties);
    machine.start(&mut panel).unwrap();

    run(&mut machine, &mut panel, &["work"]);
    assert_eq!(panel.label.value("text"), Some(&json!("busy")));
    assert_eq!(panel.label.value("colour"), Some(&json!("red")));

    run(&mut machine, &mut panel, &["cancel"]);
    assert_eq!(panel.label.value("text"), Some(&json!("ready")));
    assert_eq!(panel.label.value("colour"), Some(&json!("black")));
}

#[test]
fn restore_policy_keeps_value_assigned_by_next_state() {
    let (mut machine, mut panel) = panel_machine(RestorePolicy::RestoreProperties);
    machine.start(&mut panel).unwrap();

    run(&mut machine, &mut panel, &["work", "finish"]);
    assert_eq!(panel.label.value("text"), Some(&json!("done")));
    assert_eq!(panel.label.value("colour"), Some(&json!("black")));

    run(&mut machine, &mut panel, &["reset"]);
    assert_eq!(panel.label.value("text"), Some(&json!("ready")));
}

#[test]
fn without_restore_policy_assignments_stick() {
    let (mut machine, mut panel) = panel_machine(RestorePolicy::DontRestore);
    machine.start(&mut panel).unwrap();

    run(&mut machine, &mut panel, &["work", "cancel"]);
    assert_eq!(panel.label.value("text"), Some(&json!("busy")));
    assert_eq!(panel.label.value("colour"), Some(&json!("red")));
}

struct CountingLabel {
    text: Value,
    writes: usize,
}

impl Settable for CountingLabel {
    fn set(&mut self, name: &str, value: Value) -> Result<(), UnknownProperty> {
        if name != "text" {
            return Err(UnknownProperty::new(name));
        }
        self.text = value;
        self.writes += 1;
        Ok(())
    }

    fn get(&self, name: &str) -> Option<Value> {
        (name == "text").then(|| self.text.clone())
    }
}

impl MachineContext for CountingLabel {
    fn target(&mut self, id: &str) -> Option<&mut dyn Settable> {
        (id == "label").then_some(self as &mut dyn Settable)
    }
}

#[test]
fn restore_policy_self_transitions_restore_once() {
    let mut builder = MachineBuilder::<CountingLabel>::new("ticker")
        .options(MachineOptions::default().restore_policy(RestorePolicy::RestoreProperties));
    let root = builder.root();
    let ticking = builder.simple(root, "ticking").unwrap();
    let other = builder.simple(root, "other").unwrap();
    builder.assign_property(ticking, "label", "text", "ticking").unwrap();
    builder
        .transition(TransitionBuilder::new().from(ticking).to(ticking).on_signal("tick"))
        .unwrap();
    builder
        .transition(TransitionBuilder::new().from(ticking).to(other).on_signal("leave"))
        .unwrap();

    let mut machine = builder.build();
    let mut label = CountingLabel {
        text: json!("idle"),
        writes: 0,
    };
    machine.start(&mut label).unwrap();
    for _ in 0..100 {
        machine.post(Event::signal("clock", "tick"));
    }
    machine.process(&mut label);
    assert_eq!(label.writes, 101);
    assert_eq!(label.text, json!("ticking"));

    machine.post(Event::signal("clock", "leave"));
    machine.process(&mut label);
    assert_eq!(label.writes, 102);
    assert_eq!(label.text, json!("idle"));
}

// ---------------------------------------------------------------------------
// Internal transitions
// ---------------------------------------------------------------------------

#[test]
fn internal_transition_does_not_reenter_source() {
    let trace: Trace = Arc::default();
    let mut builder = MachineBuilder::<()>::new("tabs");
    let root = builder.root();
    let tabs = builder.compound(root, "tabs").unwrap();
    builder.simple(tabs, "first").unwrap();
    let second = builder.simple(tabs, "second").unwrap();
    builder.on_entry(tabs, traced(&trace, "enter tabs".into())).unwrap();
    builder.on_exit(tabs, traced(&trace, "exit tabs".into())).unwrap();

    builder
        .transition(
            TransitionBuilder::new()
                .from(tabs)
                .to(second)
                .on_signal("internal")
                .internal(),
        )
        .unwrap();
    builder
        .transition(TransitionBuilder::new().from(tabs).to(second).on_signal("external"))
        .unwrap();

    let mut machine = builder.build();
    machine.start(&mut ()).unwrap();
    trace.lock().unwrap().clear();

    machine.post(Event::signal("ui", "internal"));
    machine.process(&mut ());
    assert!(machine.is_active(second));
    assert!(trace.lock().unwrap().is_empty());

    machine.post(Event::signal("ui", "external"));
    machine.process(&mut ());
    assert_eq!(*trace.lock().unwrap(), vec!["exit tabs", "enter tabs"]);
}

// ---------------------------------------------------------------------------
// Failure tolerance
// ---------------------------------------------------------------------------

#[test]
fn failing_guards_count_as_disabled() {
    let mut builder = MachineBuilder::<()>::new("guards");
    let root = builder.root();
    let start = builder.simple(root, "start").unwrap();
    let panicked = builder.simple(root, "panicked").unwrap();
    let errored = builder.simple(root, "errored").unwrap();
    let fallback = builder.simple(root, "fallback").unwrap();

    builder
        .transition(
            TransitionBuilder::new()
                .from(start)
                .to(panicked)
                .on_signal("go")
                .when(|_: &Event, _: &()| panic!("guard blew up")),
        )
        .unwrap();
    builder
        .transition(
            TransitionBuilder::new()
                .from(start)
                .to(errored)
                .on_signal("go")
                .guard(Guard::fallible(|_: &Event, _: &()| {
                    Err::<bool, _>("sensor offline")
                })),
        )
        .unwrap();
    builder
        .transition(TransitionBuilder::new().from(start).to(fallback).on_signal("go"))
        .unwrap();

    let mut machine = builder.build();
    machine.start(&mut ()).unwrap();
    machine.post(Event::signal("ui", "go"));
    machine.process(&mut ());

    assert!(machine.is_active(fallback));
    assert!(machine.is_running());
}

#[derive(Default)]
struct Journal {
    lines: Vec<&'static str>,
}

impl MachineContext for Journal {
    fn emit(&mut self, signal: &str, _args: &[Value], _cause: Option<&Event>) {
        if signal == "explode" {
            panic!("emit handler blew up");
        }
    }
}

#[test]
fn panicking_actions_are_skipped() {
    let mut builder = MachineBuilder::<Journal>::new("actions");
    let root = builder.root();
    let a = builder.simple(root, "a").unwrap();
    let b = builder.compound(root, "b").unwrap();
    let inner = builder.simple(b, "inner").unwrap();

    builder
        .on_entry(
            b,
            Action::callback(|_: &mut Journal, _: Option<&Event>, _: &mut Outbox| {
                panic!("entry action blew up")
            }),
        )
        .unwrap();
    builder.on_entry(b, Action::emit("explode", vec![])).unwrap();
    builder
        .on_entry(
            inner,
            Action::callback(|j: &mut Journal, _: Option<&Event>, _: &mut Outbox| {
                j.lines.push("entered inner")
            }),
        )
        .unwrap();
    builder
        .transition(TransitionBuilder::new().from(a).to(b).on_signal("go"))
        .unwrap();

    let mut machine = builder.build();
    let mut journal = Journal::default();
    machine.start(&mut journal).unwrap();
    machine.post(Event::signal("ui", "go"));

    assert_eq!(machine.process(&mut journal), 1);
    assert!(machine.is_running());
    assert!(machine.is_active(b));
    assert!(machine.is_active(inner));
    assert_eq!(machine.check_invariants(), Ok(()));
    assert_eq!(journal.lines, vec!["entered inner"]);
}

#[test]
fn unknown_targets_and_properties_do_not_stop_the_machine() {
    let mut builder = MachineBuilder::<HoverUi>::new("tolerant");
    let root = builder.root();
    let a = builder.simple(root, "a").unwrap();
    let b = builder.simple(root, "b").unwrap();
    builder.assign_property(b, "nowhere", "text", "x").unwrap();
    builder.assign_property(b, "button", "colour", "red").unwrap();
    builder.assign_property(b, "button", "text", "reached").unwrap();
    builder
        .transition(TransitionBuilder::new().from(a).to(b).on_signal("go"))
        .unwrap();

    let mut machine = builder.build();
    let mut ui = HoverUi::default();
    machine.start(&mut ui).unwrap();
    machine.post(Event::signal("ui", "go"));
    machine.process(&mut ui);

    assert!(machine.is_active(b));
    assert_eq!(
        ui.button.assignments,
        vec![("text".to_string(), json!("reached"))]
    );
}

#[test]
fn posting_before_start_and_after_stop_is_dropped() {
    let mut builder = MachineBuilder::<()>::new("quiet");
    let root = builder.root();
    let a = builder.simple(root, "a").unwrap();
    let b = builder.simple(root, "b").unwrap();
    builder
        .transition(TransitionBuilder::new().from(a).to(b).on_signal("go"))
        .unwrap();

    let mut machine = builder.build();
    let notifications = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&notifications);
    machine.subscribe(move |n| sink.lock().unwrap().push(n.clone()));

    machine.post(Event::signal("ui", "go"));
    machine.start(&mut ()).unwrap();
    assert_eq!(machine.process(&mut ()), 0);
    assert!(machine.is_active(a));

    machine.stop();
    machine.post(Event::signal("ui", "go"));
    assert_eq!(machine.pending(), 0);
    assert_eq!(machine.process(&mut ()), 0);

    let notifications = notifications.lock().unwrap();
    assert_eq!(notifications.first(), Some(&Notification::Started));
    assert_eq!(notifications.last(), Some(&Notification::Stopped));
}

#[test]
fn structural_errors_are_all_reported_at_start() {
    let mut builder = MachineBuilder::<()>::new("broken");
    let root = builder.root();
    builder.compound(root, "empty_compound").unwrap();
    builder.parallel(root, "empty_parallel").unwrap();
    builder.add_state("floating", statecraft::StateKind::Simple);

    let mut machine = builder.build();
    match machine.start(&mut ()) {
        Err(StartError::Invalid(errors)) => {
            assert_eq!(errors.len(), 3);
            assert!(errors
                .iter()
                .any(|e| matches!(e, StructureError::Orphan { name, .. } if name == "floating")));
        }
        other => panic!("expected structural errors, got {other:?}"),
    }
    assert!(!machine.is_running());
}

// ---------------------------------------------------------------------------
// Event sources
// ---------------------------------------------------------------------------

#[test]
fn events_from_another_thread_are_pumped() {
    let mut builder = MachineBuilder::<Factorial>::new("counter");
    let root = builder.root();
    let counting = builder.simple(root, "counting").unwrap();
    builder
        .transition(
            TransitionBuilder::new()
                .from(counting)
                .to(counting)
                .on_signal("tick")
                .internal()
                .run(|c: &mut Factorial, _: Option<&Event>, _: &mut Outbox| c.x += 1),
        )
        .unwrap();

    let mut machine = builder.build();
    let mut ctx = Factorial { x: 0, fac: 1 };
    machine.start(&mut ctx).unwrap();

    let (tx, mut rx) = mpsc::channel();
    let producer = thread::spawn(move || {
        for _ in 0..10 {
            tx.send(Event::signal("clock", "tick")).unwrap();
        }
    });
    producer.join().unwrap();

    assert_eq!(machine.pump(&mut rx, &mut ctx), 10);
    assert_eq!(ctx.x, 10);
    assert_eq!(ctx.fac, 1);
}

#[test]
fn options_load_from_json() {
    let options = MachineOptions::from_json(
        r#"{ "restore_policy": "restore_properties", "max_queue_size": 2 }"#,
    )
    .unwrap();

    let mut builder = MachineBuilder::<()>::new("small").options(options);
    let root = builder.root();
    builder.simple(root, "only").unwrap();
    let mut machine = builder.build();
    machine.start(&mut ()).unwrap();

    for _ in 0..5 {
        machine.post(Event::signal("flood", "x"));
    }
    assert_eq!(machine.pending(), 2);
    assert_eq!(
        machine.options().restore_policy,
        RestorePolicy::RestoreProperties
    );
}
