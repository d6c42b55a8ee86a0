//! Hover Button State Machine
//!
//! This example drives a button's appearance from pointer input. Each state
//! assigns properties on entry, and the restore policy puts the tooltip back
//! once the pointer leaves.
//!
//! Key concepts:
//! - Property assignment through the `Settable` capability
//! - Nested states (pressing inside hovering)
//! - Restoring properties on exit
//! - Subscribing to entry and exit notifications
//!
//! Run with: cargo run --example hover_button

use statecraft::builder::{MachineBuilder, TransitionBuilder};
use statecraft::core::{Event, InputKind};
use statecraft::engine::{MachineOptions, Notification};
use statecraft::property::{MachineContext, PropertyBag, RestorePolicy, Settable};

struct Ui {
    button: PropertyBag,
}

impl MachineContext for Ui {
    fn target(&mut self, id: &str) -> Option<&mut dyn Settable> {
        match id {
            "button" => Some(&mut self.button),
            _ => None,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    println!("=== Hover Button State Machine ===\n");

    let mut builder = MachineBuilder::<Ui>::new("button")
        .options(MachineOptions::default().restore_policy(RestorePolicy::RestoreProperties));
    let root = builder.root();
    let outside = builder.simple(root, "outside").unwrap();
    let hovering = builder.compound(root, "hovering").unwrap();
    let inside = builder.simple(hovering, "inside").unwrap();
    let pressing = builder.simple(hovering, "pressing").unwrap();

    builder.assign_property(outside, "button", "colour", "grey").unwrap();
    builder.assign_property(hovering, "button", "tooltip", "Click me").unwrap();
    builder.assign_property(inside, "button", "colour", "blue").unwrap();
    builder.assign_property(pressing, "button", "colour", "navy").unwrap();

    builder
        .transition(TransitionBuilder::new().from(outside).to(hovering).on_input(InputKind::Enter))
        .unwrap();
    builder
        .transition(TransitionBuilder::new().from(hovering).to(outside).on_input(InputKind::Leave))
        .unwrap();
    builder
        .transition(TransitionBuilder::new().from(inside).to(pressing).on_input(InputKind::Press))
        .unwrap();
    builder
        .transition(TransitionBuilder::new().from(pressing).to(inside).on_input(InputKind::Release))
        .unwrap();

    let mut machine = builder.build();
    let names: Vec<String> = machine
        .tree()
        .ids()
        .map(|id| machine.tree().name(id).to_string())
        .collect();
    machine.subscribe(move |notification| match notification {
        Notification::Entered(id) => println!("  enter {}", names[id.index()]),
        Notification::Exited(id) => println!("  exit  {}", names[id.index()]),
        other => println!("  {other:?}"),
    });

    let mut ui = Ui {
        button: PropertyBag::default()
            .property("colour", "white")
            .property("tooltip", ""),
    };
    machine.start(&mut ui).unwrap();

    for kind in [
        InputKind::Enter,
        InputKind::Press,
        InputKind::Release,
        InputKind::Leave,
    ] {
        println!("\n{kind:?}:");
        machine.post(Event::input(kind));
        machine.process(&mut ui);
        println!(
            "  active: {:?}, colour: {}, tooltip: {}",
            machine.active_names(),
            ui.button.value("colour").cloned().unwrap_or_default(),
            ui.button.value("tooltip").cloned().unwrap_or_default(),
        );
    }

    machine.stop();
    println!("\n=== Example Complete ===");
}
