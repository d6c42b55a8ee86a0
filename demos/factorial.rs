//! Factorial State Machine
//!
//! This example computes 6! by letting a state re-enter itself while a guard
//! holds, then finishes through a final state.
//!
//! Key concepts:
//! - Guarded self-transitions
//! - Actions that post follow-up events
//! - Final states and the finished notification
//!
//! Run with: cargo run --example factorial
//! Set RUST_LOG=statecraft=trace to watch every entry and exit.

use statecraft::builder::{MachineBuilder, TransitionBuilder};
use statecraft::core::{Event, Guard, Outbox};
use statecraft::property::MachineContext;

struct Factorial {
    x: u64,
    fac: u64,
}

impl MachineContext for Factorial {}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    println!("=== Factorial State Machine ===\n");

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
                    println!("  fac = {:>4}, x = {}", f.fac, f.x);
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
    machine.on_finished(|| println!("\nMachine finished"));

    let mut ctx = Factorial { x: 6, fac: 1 };
    machine.start(&mut ctx).unwrap();
    machine.post(Event::signal("factorial", "xChanged"));
    let dispatched = machine.process(&mut ctx);

    println!("Events dispatched: {dispatched}");
    println!("6! = {}", ctx.fac);

    println!("\n=== Example Complete ===");
}
