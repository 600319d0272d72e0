//=========================================================================
// Lumen Engine
//
// Main entry point and coordinator for the engine.
//
// Architecture:
// ```text
//     EngineBuilder  ──build()──>  Engine  ──run(presenter)──>  [Runtime]
//         │                          │
//         ├─ with_tps()              ├─ init(|systems| ...)
//         └─ with_*_capacity()       └─ spawns update + render threads
//                                       blocks until exit
// ```
//
//=========================================================================

//=== External Dependencies ===============================================

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{error, info, warn};

//=== Internal Dependencies ===============================================

use crate::core::error::{DefinitionError, EngineError};
use crate::core::event::{Command, EventSystem};
use crate::core::host_bridge::{EventCollector, HostEvent, HostHandle, TickControl};
use crate::core::state::{StateKey, StateMachine, StateMachineBuilder};
use crate::core::sync::FrameHandoff;

//=== ExitFlag ============================================================

/// Cooperative shutdown signal shared by the host and the update thread.
///
/// Checked between ticks; setting it never interrupts a tick.
#[derive(Debug, Clone, Default)]
pub struct ExitFlag(Arc<AtomicBool>);

impl ExitFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

//=== UpdateContext =======================================================

/// Context handed to every state callback on the update thread.
pub struct UpdateContext {
    /// The event system, already updated for the current tick.
    pub events: EventSystem,
    exit: ExitFlag,
}

impl UpdateContext {
    /// Number of completed ticks.
    pub fn tick(&self) -> u64 {
        self.events.tick_count()
    }

    /// Stops the engine once the current frame has been handed off.
    pub fn request_exit(&self) {
        self.exit.request();
    }

    pub fn exit_flag(&self) -> &ExitFlag {
        &self.exit
    }
}

//=== Presenter ===========================================================

/// Consumes published frames on the render thread.
///
/// Implemented for any `FnMut(&F) + Send + 'static`.
pub trait Presenter<F>: Send + 'static {
    fn present(&mut self, frame: &F);
}

impl<F, P> Presenter<F> for P
where
    P: FnMut(&F) + Send + 'static,
{
    fn present(&mut self, frame: &F) {
        self(frame)
    }
}

type FrameExtractor<F> = Box<dyn FnMut(&UpdateContext, &mut F) + Send>;

//=== EngineSystems =======================================================

/// Systems configurable before the engine runs.
///
/// # Available Systems
///
/// - `events`: module registry and graph instances
/// - `states`: one state per key of `K`
pub struct EngineSystems<K: StateKey, F> {
    pub events: EventSystem,
    pub states: StateMachineBuilder<K, UpdateContext>,
    extractor: Option<FrameExtractor<F>>,
}

impl<K: StateKey, F> EngineSystems<K, F> {
    fn new(command_capacity: usize) -> Self {
        Self {
            events: EventSystem::with_command_capacity(command_capacity),
            states: StateMachineBuilder::new(),
            extractor: None,
        }
    }

    /// Sets how the update thread fills the back frame buffer each tick.
    ///
    /// Without an extractor, frames keep whatever the buffers held.
    pub fn set_frame_extractor<E>(&mut self, extractor: E)
    where
        E: FnMut(&UpdateContext, &mut F) + Send + 'static,
    {
        self.extractor = Some(Box::new(extractor));
    }
}

//=== EngineBuilder =======================================================

/// Builder for configuring and constructing an [`Engine`].
///
/// # Default Values
///
/// - **TPS**: 60.0 (update ticks per second)
/// - **Host channel capacity**: 128 events
/// - **Command channel capacity**: 256 commands
/// - **Max host events per tick**: 100
///
/// # Examples
///
/// ```no_run
/// use lumen_engine::prelude::*;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum Flow { Main }
/// impl StateKey for Flow { const ALL: &'static [Self] = &[Flow::Main]; }
///
/// struct Main;
/// impl State<Flow, UpdateContext> for Main {
///     fn update(&mut self, _dt: f64, ctx: &mut UpdateContext, _t: &mut Transitions<Flow>) {
///         if ctx.tick() == 600 {
///             ctx.request_exit();
///         }
///     }
/// }
///
/// # fn main() -> Result<(), EngineError> {
/// EngineBuilder::<Flow, u64>::new(Flow::Main)
///     .with_tps(120.0)
///     .build()
///     .init(|systems| {
///         register_builtin_modules(&mut systems.events)?;
///         systems.states.register(Flow::Main, Main);
///         systems.set_frame_extractor(|ctx, frame| *frame = ctx.tick());
///         Ok(())
///     })?
///     .run(|frame: &u64| println!("frame {}", frame))
/// # }
/// ```
pub struct EngineBuilder<K: StateKey, F> {
    initial_state: K,
    tps: f64,
    host_channel_capacity: usize,
    command_channel_capacity: usize,
    max_host_events: usize,
    _phantom: PhantomData<fn() -> F>,
}

impl<K: StateKey, F: Default + Send + 'static> EngineBuilder<K, F> {
    /// Creates a new builder with default settings.
    ///
    /// `initial_state` is entered on the first tick.
    pub fn new(initial_state: K) -> Self {
        Self {
            initial_state,
            tps: 60.0,
            host_channel_capacity: 128,
            command_channel_capacity: EventSystem::DEFAULT_COMMAND_CAPACITY,
            max_host_events: 100,
            _phantom: PhantomData,
        }
    }

    /// Sets the target ticks per second for the update thread.
    ///
    /// Every tick advances simulation time by `1.0 / tps` seconds. The
    /// update thread sleeps away whatever is left of a tick's budget.
    ///
    /// Default: 60.0
    ///
    /// # Panics
    ///
    /// Panics if `tps <= 0.0`.
    pub fn with_tps(mut self, tps: f64) -> Self {
        assert!(tps > 0.0, "TPS must be positive, got {}", tps);
        self.tps = tps;
        self
    }

    /// Sets the channel capacity for host → update thread events.
    ///
    /// Default: 128
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn with_host_channel_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Host channel capacity must be positive");
        self.host_channel_capacity = capacity;
        self
    }

    /// Sets the capacity of the fire-and-forget command channel.
    ///
    /// Commands issued while the channel is full are dropped.
    ///
    /// Default: 256
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn with_command_channel_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Command channel capacity must be positive");
        self.command_channel_capacity = capacity;
        self
    }

    /// Caps how many host events are applied per tick.
    ///
    /// Default: 100
    ///
    /// # Panics
    ///
    /// Panics if `max == 0`.
    pub fn with_max_host_events(mut self, max: usize) -> Self {
        assert!(max > 0, "Max host events must be positive");
        self.max_host_events = max;
        self
    }

    /// Builds the engine instance.
    pub fn build(self) -> Engine<K, F> {
        info!(
            target: "engine",
            "Building engine (TPS: {}, host channel: {}, command channel: {})",
            self.tps,
            self.host_channel_capacity,
            self.command_channel_capacity
        );

        let (host_sender, host_receiver) = bounded(self.host_channel_capacity);

        Engine {
            systems: EngineSystems::new(self.command_channel_capacity),
            initial_state: self.initial_state,
            tps: self.tps,
            max_host_events: self.max_host_events,
            host_sender,
            host_receiver,
            exit: ExitFlag::new(),
        }
    }
}

//=== Engine ==============================================================

/// Lumen Engine runtime.
///
/// # Architecture
///
/// ```text
/// Engine (Controlling Thread)
///   ├─► Update Thread (@ TPS)
///   │     host events → EventSystem → StateMachine → produce frame
///   │
///   └─► Render Thread
///         consume frame → Presenter
///
/// Communication: HostEvent channel, FrameHandoff (double buffer)
/// ```
pub struct Engine<K: StateKey, F> {
    systems: EngineSystems<K, F>,
    initial_state: K,
    tps: f64,
    max_host_events: usize,
    host_sender: Sender<HostEvent>,
    host_receiver: Receiver<HostEvent>,
    exit: ExitFlag,
}

impl<K: StateKey, F: Default + Send + 'static> Engine<K, F> {
    //--- Initialization ---------------------------------------------------

    /// Configures engine systems before execution.
    ///
    /// # Errors
    ///
    /// Whatever `init_fn` returns, wrapped in [`EngineError::Definition`].
    pub fn init<I>(mut self, init_fn: I) -> Result<Self, EngineError>
    where
        I: FnOnce(&mut EngineSystems<K, F>) -> Result<(), DefinitionError>,
    {
        info!(target: "engine", "Initializing engine systems");
        init_fn(&mut self.systems)?;
        info!(target: "engine", "Engine initialization complete");
        Ok(self)
    }

    /// Handle for sending host events while the engine runs.
    pub fn host_handle(&self) -> HostHandle {
        HostHandle::new(self.host_sender.clone())
    }

    /// Flag that stops the engine when set.
    pub fn exit_flag(&self) -> ExitFlag {
        self.exit.clone()
    }

    /// Receiving end of the command channel nodes send to.
    pub fn command_receiver(&self) -> Receiver<Command> {
        self.systems.events.command_receiver()
    }

    //--- Execution --------------------------------------------------------

    /// Starts the update and render threads and blocks until both exit.
    ///
    /// # Lifecycle
    ///
    /// 1. Builds the state machine (every state key must be registered)
    /// 2. Spawns the update thread running at the configured TPS
    /// 3. Spawns the render thread feeding frames to `presenter`
    /// 4. On exit: update thread closes the handoff → render thread drains
    ///    the last frame and terminates
    ///
    /// # Errors
    ///
    /// - [`EngineError::Definition`] if a state is missing
    /// - [`EngineError::ThreadSpawn`] if a worker thread cannot start
    /// - [`EngineError::ThreadPanicked`] if a worker thread panicked
    pub fn run<P>(self, presenter: P) -> Result<(), EngineError>
    where
        P: Presenter<F>,
    {
        info!(target: "engine", "Starting engine runtime (TPS: {})", self.tps);

        let Self {
            systems,
            initial_state,
            tps,
            max_host_events,
            host_sender,
            host_receiver,
            exit,
        } = self;

        //--- 1. Assemble update-side state --------------------------------
        let machine = systems.states.build(initial_state)?;
        let handoff = Arc::new(FrameHandoff::new(F::default(), F::default()));

        let update = UpdateLoop {
            context: UpdateContext {
                events: systems.events,
                exit: exit.clone(),
            },
            machine,
            extractor: systems.extractor,
            collector: EventCollector::new(host_receiver, max_host_events),
            handoff: Arc::clone(&handoff),
            tps,
        };

        //--- 2. Spawn the update thread ----------------------------------
        let update_handle = thread::Builder::new()
            .name("update".into())
            .spawn(move || update.run())
            .map_err(|source| EngineError::ThreadSpawn {
                thread: "update",
                source,
            })?;
        info!(target: "engine", "Update thread spawned");

        //--- 3. Spawn the render thread ----------------------------------
        let render_handoff = Arc::clone(&handoff);
        let render_handle = match thread::Builder::new()
            .name("render".into())
            .spawn(move || render_loop(render_handoff, presenter))
        {
            Ok(handle) => handle,
            Err(source) => {
                error!(target: "engine", "Failed to spawn render thread: {}", source);
                exit.request();
                handoff.close();
                let _ = update_handle.join();
                return Err(EngineError::ThreadSpawn {
                    thread: "render",
                    source,
                });
            }
        };
        info!(target: "engine", "Render thread spawned");

        //--- 4. Wait for both threads -------------------------------------
        let update_result = join("update", update_handle);
        let render_result = join("render", render_handle);
        drop(host_sender);

        info!(
            target: "engine",
            "Engine shutdown complete ({} frames published)",
            handoff.frames_published()
        );
        update_result.and(render_result)
    }
}

fn join(name: &'static str, handle: JoinHandle<()>) -> Result<(), EngineError> {
    match handle.join() {
        Ok(()) => {
            info!(target: "engine", "{} thread terminated cleanly", name);
            Ok(())
        }
        Err(_) => {
            error!(target: "engine", "{} thread panicked", name);
            Err(EngineError::ThreadPanicked(name))
        }
    }
}

//=== Worker Threads ======================================================

/// Closes the handoff when a worker exits, even by panicking, so the
/// other worker never waits forever.
struct CloseOnDrop<F>(Arc<FrameHandoff<F>>);

impl<F> Drop for CloseOnDrop<F> {
    fn drop(&mut self) {
        self.0.close();
    }
}

struct UpdateLoop<K: StateKey, F> {
    context: UpdateContext,
    machine: StateMachine<K, UpdateContext>,
    extractor: Option<FrameExtractor<F>>,
    collector: EventCollector,
    handoff: Arc<FrameHandoff<F>>,
    tps: f64,
}

impl<K: StateKey, F> UpdateLoop<K, F> {
    /// Each tick:
    ///  1. Collects host events
    ///  2. Updates the event system
    ///  3. Updates the state machine
    ///  4. Hands the frame to the render thread
    ///  5. Sleeps to maintain fixed pacing
    fn run(mut self) {
        let _close = CloseOnDrop(Arc::clone(&self.handoff));
        let frame_duration = Duration::from_secs_f64(1.0 / self.tps);
        let delta_time = frame_duration.as_secs_f64();

        loop {
            let frame_start = Instant::now();

            if self.context.exit.is_requested() {
                info!(target: "engine", "Exit requested, update thread stopping");
                break;
            }

            //--- Step 1: Gather host events ---------------------------------
            if self.collector.collect_frame(&mut self.context.events) == TickControl::Exit {
                info!(target: "engine", "Host requested exit, update thread stopping");
                self.context.exit.request();
                break;
            }

            //--- Step 2: Evaluate graphs ------------------------------------
            self.context.events.update(delta_time);

            //--- Step 3: Update game flow -----------------------------------
            self.machine.update(delta_time, &mut self.context);

            //--- Step 4: Frame handoff --------------------------------------
            let Self {
                context,
                extractor,
                handoff,
                ..
            } = &mut self;
            let produced = handoff.producer_wait_and_produce(|frame| {
                if let Some(extract) = extractor.as_mut() {
                    extract(context, frame);
                }
            });
            if produced.is_err() {
                warn!(target: "engine", "Frame handoff closed, update thread stopping");
                break;
            }

            //--- Step 5: Maintain deterministic pacing ----------------------
            let elapsed = frame_start.elapsed();
            if elapsed < frame_duration {
                thread::sleep(frame_duration - elapsed);
            }
        }
    }
}

fn render_loop<F, P: Presenter<F>>(handoff: Arc<FrameHandoff<F>>, mut presenter: P) {
    let _close = CloseOnDrop(Arc::clone(&handoff));

    while handoff
        .consumer_wait_and_consume(|frame| presenter.present(frame))
        .is_ok()
    {}

    info!(target: "engine", "Render thread stopping");
}

//=========================================================================
// Unit Tests
//=========================================================================
