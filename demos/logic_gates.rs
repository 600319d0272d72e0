//=========================================================================
// Logic Gates Demo
//=========================================================================
//
// A pressure-plate door driven by a graph loaded from RON.
//
//   plate_a ─┐
//            and ── latch(set) ── rising_edge ── world.send("play_sound")
//   plate_b ─┘        │
//   reset ────────────┘ latch(reset) ── world.set_bool(door_open)
//
// The host thread steps on the plates and reads issued commands; the
// render thread prints the door whenever it changes.
//
// Run with: RUST_LOG=info cargo run --example logic_gates
//
//=========================================================================

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{error, info};
use lumen_engine::prelude::*;

const DOOR_GRAPH: &str = r#"
(
    name: "door",
    inputs: [
        (name: "plate_a", ty: Bool),
        (name: "plate_b", ty: Bool),
        (name: "reset", ty: Bool),
    ],
    nodes: [
        (id: "both", kind: "logic.and"),
        (id: "open", kind: "logic.latch"),
        (id: "edge", kind: "logic.rising_edge"),
        (id: "sound", kind: "world.send", constants: {1: Text("play_sound"), 2: Text("door_open")}),
        (id: "record", kind: "world.set_bool", constants: {2: Text("door_open")}),
    ],
    edges: [
        (from: "both", output: 0, to: "open", input: 0),
        (from: "open", output: 0, to: "edge", input: 0),
        (from: "edge", output: 0, to: "sound", input: 0),
        (from: "open", output: 0, to: "record", input: 3),
    ],
    bindings: [
        (input: "plate_a", node: "both", port: 0),
        (input: "plate_b", node: "both", port: 1),
        (input: "reset", node: "open", port: 1),
    ],
    outputs: [(name: "open", node: "open", port: 0)],
)
"#;

//=== Game Flow ===========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Flow {
    Intro,
    Gameplay,
}

impl StateKey for Flow {
    const ALL: &'static [Self] = &[Flow::Intro, Flow::Gameplay];
}

struct Intro {
    remaining: f64,
}

impl State<Flow, UpdateContext> for Intro {
    fn update(&mut self, dt: f64, _ctx: &mut UpdateContext, transitions: &mut Transitions<Flow>) {
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            transitions.request(Flow::Gameplay);
        }
    }
}

struct Gameplay {
    door: GraphId,
    remaining: f64,
}

impl State<Flow, UpdateContext> for Gameplay {
    fn on_enter(&mut self, ctx: &mut UpdateContext) {
        info!("Gameplay started, door logic enabled");
        ctx.events.set_enabled(self.door, true);
    }

    fn update(&mut self, dt: f64, ctx: &mut UpdateContext, _transitions: &mut Transitions<Flow>) {
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            ctx.request_exit();
        }
    }
}

//=== Frame ===============================================================

#[derive(Debug, Default, Clone, Copy)]
struct DoorFrame {
    tick: u64,
    open: bool,
}

//=== Main ================================================================

fn main() -> Result<(), EngineError> {
    env_logger::init();

    let mut door_graph = None;
    let engine = EngineBuilder::<Flow, DoorFrame>::new(Flow::Intro)
        .with_tps(60.0)
        .build()
        .init(|systems| {
            register_builtin_modules(&mut systems.events)?;

            let definition = GraphDefinition::from_ron(DOOR_GRAPH)?;
            let graph = Arc::new(systems.events.load_graph(&definition)?);
            let door = systems.events.instantiate(&graph);
            systems.events.set_enabled(door, false);
            door_graph = Some(door);

            systems
                .states
                .register(Flow::Intro, Intro { remaining: 0.5 })
                .register(
                    Flow::Gameplay,
                    Gameplay {
                        door,
                        remaining: 3.0,
                    },
                );

            systems.set_frame_extractor(move |ctx, frame| {
                frame.tick = ctx.tick();
                frame.open = ctx
                    .events
                    .graph(door)
                    .and_then(|g| g.output("open"))
                    .and_then(PortValue::get::<bool>)
                    .unwrap_or(false);
            });
            Ok(())
        })?;

    let Some(door) = door_graph else {
        return Ok(());
    };
    let handle = engine.host_handle();
    let commands = engine.command_receiver();

    let host = thread::spawn(move || {
        let script = [
            (800, "plate_a", true),
            (1200, "plate_b", true),
            (1600, "plate_a", false),
            (2000, "reset", true),
            (2200, "reset", false),
        ];

        let mut elapsed = 0;
        for (at, input, value) in script {
            thread::sleep(Duration::from_millis(at - elapsed));
            elapsed = at;
            info!("Host: {} = {}", input, value);
            if handle.set_graph_input(door, input, value).is_err() {
                return;
            }
            for command in commands.try_iter() {
                info!("Host received command `{}` {:?}", command.name, command.payload);
            }
        }
    });

    let mut last = None;
    engine.run(move |frame: &DoorFrame| {
        if last != Some(frame.open) {
            println!("tick {:>4}: door {}", frame.tick, if frame.open { "OPEN" } else { "closed" });
            last = Some(frame.open);
        }
    })?;

    if host.join().is_err() {
        error!("Host script thread panicked");
    }
    Ok(())
}
