//! The dispatch engine.

use crate::builder::validate::validate_tree;
use crate::builder::StartError;
use crate::core::{
    panic_message, Action, Event, EventPriority, MicrostepRecord, Outbox, StateId, StateTree, Transition,
    TransitionLog,
};
use crate::engine::configuration::{Configuration, InvariantViolation};
use crate::engine::options::MachineOptions;
use crate::engine::queue::{EventQueue, EventSource};
use crate::engine::resolver::{self, HistoryMemory};
use crate::property::{MachineContext, RestoreLedger, RestorePolicy};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Whether a machine is processing events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineStatus {
    #[default]
    Stopped,
    Running,
}

/// Lifecycle notifications delivered to subscribers.
///
/// `Entered` and `Exited` are delivered after the microstep that caused
/// them has committed, in the order the states were entered or exited.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    Started,
    Entered(StateId),
    Exited(StateId),
    /// The root reached a final configuration. The machine is stopped.
    Finished,
    Stopped,
}

/// Outcome of dispatching one event.
#[derive(Clone, Debug, PartialEq)]
pub struct Dispatch {
    pub event: Event,
    /// Number of transitions that fired; zero when the event was discarded.
    pub transitions: usize,
}

impl Dispatch {
    pub fn is_discarded(&self) -> bool {
        self.transitions == 0
    }
}

type Subscriber = Box<dyn FnMut(&Notification) + Send>;

/// A hierarchical state machine.
///
/// Built by [`MachineBuilder`](crate::builder::MachineBuilder). The host
/// owns the context `C` and passes it to every call that may run guards or
/// actions.
///
/// # Example
///
/// ```rust
/// use statecraft::builder::{MachineBuilder, TransitionBuilder};
/// use statecraft::core::Event;
///
/// let mut builder = MachineBuilder::<()>::new("door");
/// let root = builder.root();
/// let closed = builder.simple(root, "closed").unwrap();
/// let open = builder.simple(root, "open").unwrap();
/// builder
///     .transition(TransitionBuilder::new().from(closed).to(open).on_signal("open"))
///     .unwrap();
///
/// let mut door = builder.build();
/// door.start(&mut ()).unwrap();
/// door.post(Event::signal("handle", "open"));
/// assert_eq!(door.process(&mut ()), 1);
/// assert!(door.is_active(open));
/// ```
pub struct Machine<C> {
    name: String,
    tree: StateTree<C>,
    options: MachineOptions,
    status: MachineStatus,
    configuration: Configuration,
    history: HistoryMemory,
    internal: VecDeque<Event>,
    external: EventQueue,
    ledger: RestoreLedger,
    log: TransitionLog,
    subscribers: Vec<Subscriber>,
}

impl<C: MachineContext> Machine<C> {
    pub(crate) fn from_parts(name: String, tree: StateTree<C>, options: MachineOptions) -> Self {
        Self {
            name,
            tree,
            status: MachineStatus::Stopped,
            configuration: Configuration::new(),
            history: HistoryMemory::new(),
            internal: VecDeque::new(),
            external: EventQueue::new(options.max_queue_size),
            ledger: RestoreLedger::default(),
            log: TransitionLog::new(options.history_limit),
            subscribers: Vec::new(),
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tree(&self) -> &StateTree<C> {
        &self.tree
    }

    pub(crate) fn into_tree(self) -> StateTree<C> {
        self.tree
    }

    pub fn options(&self) -> &MachineOptions {
        &self.options
    }

    pub fn status(&self) -> MachineStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == MachineStatus::Running
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn is_active(&self, state: StateId) -> bool {
        self.configuration.contains(state)
    }

    /// Look a state up by name.
    pub fn find(&self, name: &str) -> Option<StateId> {
        self.tree.find(name)
    }

    /// Names of the active leaf states in document order.
    pub fn active_names(&self) -> Vec<&str> {
        self.configuration.atomic_names(&self.tree)
    }

    /// Events waiting in both queues.
    pub fn pending(&self) -> usize {
        self.internal.len() + self.external.len()
    }

    pub fn transition_log(&self) -> &TransitionLog {
        &self.log
    }

    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        self.configuration.check(&self.tree)
    }

    /// Register a notification listener.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&Notification) + Send + 'static,
    {
        self.subscribers.push(Box::new(listener));
    }

    /// Register a listener for [`Notification::Finished`] only.
    pub fn on_finished<F>(&mut self, mut listener: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.subscribe(move |notification| {
            if *notification == Notification::Finished {
                listener();
            }
        });
    }

    /// Validate the tree and enter the root's default configuration.
    ///
    /// Entry actions run with no triggering event. If the default
    /// configuration is already final the machine finishes right away.
    pub fn start(&mut self, ctx: &mut C) -> Result<(), StartError> {
        if self.is_running() {
            return Err(StartError::AlreadyRunning);
        }
        validate_tree(&self.tree).map_err(StartError::Invalid)?;

        tracing::info!(machine = %self.name, states = self.tree.len(), "starting state machine");
        self.status = MachineStatus::Running;
        self.history.clear();
        self.log.clear();
        self.external.open();
        self.notify(&Notification::Started);

        let Machine {
            tree,
            configuration,
            history,
            ledger,
            internal,
            options,
            ..
        } = self;
        let entering = resolver::default_entry(tree, history, tree.root());
        let mut step = Microstep::new(tree, configuration, ledger, internal, options.restore_policy);
        step.enter(&entering, ctx, None);
        let outcome = step.finish(ctx);

        self.commit(outcome, None);
        Ok(())
    }

    /// Stop immediately. Queued events, the configuration and pending
    /// property restores are discarded; no exit actions run.
    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        tracing::info!(machine = %self.name, "stopping state machine");
        self.halt();
        self.notify(&Notification::Stopped);
    }

    /// Queue an event. Dropped while the machine is stopped.
    pub fn post(&mut self, event: Event) {
        self.external.post(event);
    }

    pub fn post_with_priority(&mut self, event: Event, priority: EventPriority) {
        self.external.post_with_priority(event, priority);
    }

    /// Dispatch the next event, completion events first.
    ///
    /// Returns `None` when the machine is stopped or both queues are empty.
    pub fn step(&mut self, ctx: &mut C) -> Option<Dispatch> {
        if !self.is_running() {
            return None;
        }
        let event = self.internal.pop_front().or_else(|| self.external.next())?;
        let transitions = self.dispatch(&event, ctx);
        Some(Dispatch { event, transitions })
    }

    /// Dispatch until the queues are empty or the machine stops.
    ///
    /// Returns the number of events taken from the queues.
    pub fn process(&mut self, ctx: &mut C) -> usize {
        let mut count = 0;
        while self.step(ctx).is_some() {
            count += 1;
        }
        count
    }

    /// Move everything `source` has ready into the queue and process it.
    pub fn pump<S: EventSource>(&mut self, source: &mut S, ctx: &mut C) -> usize {
        for event in source.drain() {
            self.external.post(event);
        }
        self.process(ctx)
    }

    fn dispatch(&mut self, event: &Event, ctx: &mut C) -> usize {
        let Machine {
            tree,
            configuration,
            history,
            ledger,
            internal,
            options,
            ..
        } = self;

        let transitions = resolver::select_transitions(tree, configuration, history, event, ctx);
        if transitions.is_empty() {
            tracing::trace!(%event, "no enabled transition, event discarded");
            return 0;
        }
        tracing::debug!(%event, transitions = transitions.len(), "dispatching event");

        let exits = resolver::exit_set(tree, configuration, history, &transitions);
        resolver::record_history(tree, configuration, history, &exits);

        let mut step = Microstep::new(tree, configuration, ledger, internal, options.restore_policy);
        step.exit(&exits, ctx, event);
        for transition in &transitions {
            step.fire(transition, ctx, event);
        }
        let entering = resolver::entry_set(tree, history, &transitions);
        step.enter(&entering, ctx, Some(event));
        let outcome = step.finish(ctx);

        let fired = transitions.len();
        self.commit(outcome, Some(event));
        fired
    }

    fn commit(&mut self, outcome: Outcome, event: Option<&Event>) {
        for (posted, priority) in outcome.posted {
            self.external.post_with_priority(posted, priority);
        }

        self.log.record(MicrostepRecord {
            event: event.map(ToString::to_string),
            exited: outcome.exited.clone(),
            entered: outcome.entered.clone(),
            timestamp: Utc::now(),
        });

        for state in outcome.exited {
            self.notify(&Notification::Exited(state));
        }
        for state in outcome.entered {
            self.notify(&Notification::Entered(state));
        }

        debug_assert_eq!(self.configuration.check(&self.tree), Ok(()));

        if outcome.finished {
            tracing::info!(machine = %self.name, "state machine finished");
            self.halt();
            self.notify(&Notification::Finished);
        }
    }

    fn halt(&mut self) {
        self.status = MachineStatus::Stopped;
        self.external.close();
        self.internal.clear();
        self.configuration.clear();
        self.ledger.clear();
    }

    fn notify(&mut self, notification: &Notification) {
        for subscriber in &mut self.subscribers {
            subscriber(notification);
        }
    }
}

impl<C> fmt::Debug for Machine<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("name", &self.name)
            .field("status", &self.status)
            .field("configuration", &self.configuration)
            .field("queued", &(self.internal.len() + self.external.len()))
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// What a microstep produced, applied by `Machine::commit`.
struct Outcome {
    exited: Vec<StateId>,
    entered: Vec<StateId>,
    posted: Vec<(Event, EventPriority)>,
    finished: bool,
}

/// Mutable view of a machine while one microstep runs.
struct Microstep<'m, C> {
    tree: &'m StateTree<C>,
    configuration: &'m mut Configuration,
    ledger: &'m mut RestoreLedger,
    internal: &'m mut VecDeque<Event>,
    restore: RestorePolicy,
    outbox: Outbox,
    exited: Vec<StateId>,
    entered: Vec<StateId>,
    finished: bool,
}

impl<'m, C: MachineContext> Microstep<'m, C> {
    fn new(
        tree: &'m StateTree<C>,
        configuration: &'m mut Configuration,
        ledger: &'m mut RestoreLedger,
        internal: &'m mut VecDeque<Event>,
        restore: RestorePolicy,
    ) -> Self {
        Self {
            tree,
            configuration,
            ledger,
            internal,
            restore,
            outbox: Outbox::new(),
            exited: Vec::new(),
            entered: Vec::new(),
            finished: false,
        }
    }

    fn exit(&mut self, states: &[StateId], ctx: &mut C, event: &Event) {
        let tree = self.tree;
        for state in states {
            tracing::trace!(state = tree.name(*state), "exiting");
            for action in &tree.node(*state).on_exit {
                self.run(action, ctx, Some(event), None);
            }
            self.configuration.remove(*state);
            self.exited.push(*state);
        }
    }

    fn fire(&mut self, transition: &Transition<C>, ctx: &mut C, event: &Event) {
        tracing::debug!(
            source = self.tree.name(transition.source()),
            targets = ?transition.targets().iter().map(|t| self.tree.name(*t)).collect::<Vec<_>>(),
            "transition fired"
        );
        for action in transition.actions() {
            self.run(action, ctx, Some(event), None);
        }
    }

    fn enter(&mut self, states: &[StateId], ctx: &mut C, event: Option<&Event>) {
        let tree = self.tree;
        for state in states {
            tracing::trace!(state = tree.name(*state), "entering");
            self.configuration.insert(*state);
            self.entered.push(*state);
            for action in &tree.node(*state).on_entry {
                self.run(action, ctx, event, Some(*state));
            }
            if tree.is_final(*state) {
                self.reached_final(*state);
            }
        }
    }

    /// Raise completion events for the region `state` finished.
    ///
    /// Completion climbs through every enclosing parallel state whose
    /// regions are all final. Reaching the root finishes the machine.
    fn reached_final(&mut self, state: StateId) {
        let tree = self.tree;
        let Some(parent) = tree.parent(state) else {
            return;
        };

        if parent == tree.root() {
            if !tree.is_parallel(parent)
                || resolver::is_in_final_state(tree, self.configuration, parent)
            {
                self.finished = true;
            }
            return;
        }

        self.internal.push_back(Event::Completion(parent));
        let mut done = parent;
        while let Some(up) = tree.parent(done) {
            if !tree.is_parallel(up) || !resolver::is_in_final_state(tree, self.configuration, up) {
                break;
            }
            if up == tree.root() {
                self.finished = true;
                break;
            }
            self.internal.push_back(Event::Completion(up));
            done = up;
        }
    }

    /// Run one action. A panicking action is skipped and the microstep goes on.
    fn run(&mut self, action: &Action<C>, ctx: &mut C, event: Option<&Event>, owner: Option<StateId>) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.apply(action, ctx, event, owner)));
        if let Err(payload) = result {
            tracing::warn!(
                state = owner.map(|id| self.tree.name(id)),
                panic = %panic_message(payload.as_ref()),
                "action panicked, skipped"
            );
        }
    }

    fn apply(&mut self, action: &Action<C>, ctx: &mut C, event: Option<&Event>, owner: Option<StateId>) {
        match action {
            Action::AssignProperty {
                target,
                property,
                value,
            } => self.assign(ctx, target, property, value.clone(), owner),
            Action::EmitSignal { signal, args } => ctx.emit(signal, args, event),
            Action::Callback(callback) => callback.invoke(ctx, event, &mut self.outbox),
        }
    }

    fn assign(&mut self, ctx: &mut C, target: &str, property: &str, value: Value, owner: Option<StateId>) {
        let Some(object) = ctx.target(target) else {
            tracing::warn!(object = target, property, "unknown property target, assignment skipped");
            return;
        };

        let tracked = owner.filter(|_| self.restore == RestorePolicy::RestoreProperties);
        let original = tracked.and_then(|_| object.get(property));

        match object.set(property, value) {
            Ok(()) => {
                if let Some(owner) = tracked {
                    let configuration = &*self.configuration;
                    if !self
                        .ledger
                        .adopt(target, property, owner, |id| configuration.contains(id))
                    {
                        self.ledger.remember(target, property, original, owner);
                    }
                }
            }
            Err(error) => tracing::warn!(object = target, %error, "property assignment failed"),
        }
    }

    /// Put back properties whose assigning state is no longer active.
    fn restore_released(&mut self, ctx: &mut C) {
        let configuration = &*self.configuration;
        for entry in self.ledger.take_released(|id| configuration.contains(id)) {
            match ctx.target(&entry.target) {
                Some(object) => {
                    if let Err(error) = object.set(&entry.property, entry.original) {
                        tracing::warn!(object = %entry.target, %error, "property restore failed");
                    }
                }
                None => tracing::warn!(object = %entry.target, "restore target disappeared"),
            }
        }
    }

    fn finish(mut self, ctx: &mut C) -> Outcome {
        if self.restore == RestorePolicy::RestoreProperties {
            self.restore_released(ctx);
        }
        Outcome {
            exited: self.exited,
            entered: self.entered,
            posted: self.outbox.take(),
            finished: self.finished,
        }
    }
}
