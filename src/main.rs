//! Headless demo driver
//!
//! Runs a built-in board at a fixed 60 Hz for ten simulated seconds, pokes
//! it with a few scripted inputs and logs what happens. Set `RUST_LOG=info`
//! (or `debug`) to see the board's own logging.

use pingball::{Board, BoardResult, EngineConfig, InputEvent, KeyEvent};

const FRAME: f64 = 1.0 / 60.0;
const FRAMES: u32 = 600;

const DEMO_BOARD: &str = r#"{
    "name": "demo",
    "physics": { "gravity": 25.0, "friction1": 0.025, "friction2": 0.025 },
    "balls": [
        { "x": 1.25, "y": 1.25, "vx": 0.0, "vy": 0.0 },
        { "x": 10.25, "y": 3.0, "vx": 5.0, "vy": 0.0 },
        { "x": 17.5, "y": 2.0, "vx": -3.0, "vy": 1.0 }
    ],
    "gadgets": [
        { "kind": "squareBumper", "name": "square", "x": 0, "y": 10 },
        { "kind": "circleBumper", "name": "circleA", "x": 4, "y": 3 },
        { "kind": "circleBumper", "name": "circleB", "x": 15, "y": 6 },
        { "kind": "triangleBumper", "name": "tri", "x": 19, "y": 0, "orientation": 90 },
        { "kind": "leftFlipper", "name": "flipL", "x": 6, "y": 15 },
        { "kind": "rightFlipper", "name": "flipR", "x": 12, "y": 15 },
        { "kind": "portal", "name": "gateA", "x": 2, "y": 6, "other_portal": "gateB" },
        { "kind": "portal", "name": "gateB", "x": 17, "y": 12, "other_portal": "gateA" },
        { "kind": "absorber", "name": "abs", "x": 0, "y": 19, "width": 20, "height": 1 }
    ],
    "links": [
        { "source": "circleA", "target": "flipL" },
        { "source": "circleB", "target": "flipR" },
        { "source": "abs", "target": "abs" }
    ],
    "key_bindings": [
        { "key": "keydown:z", "gadget": "flipL" },
        { "key": "keydown:m", "gadget": "flipR" },
        { "key": "keydown:space", "gadget": "abs" }
    ],
    "seed": 42
}"#;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Pingball demo starting...");

    if let Err(err) = run() {
        log::error!("Demo failed: {err}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // No headless driver on the web
}

fn run() -> BoardResult<()> {
    let config = EngineConfig::default();
    let mut board = Board::from_json(DEMO_BOARD, &config)?;
    let input = board.input_sender();

    let mut collisions = 0;
    for frame in 0..FRAMES {
        match frame {
            90 => queue(&input, KeyEvent::down("z").into()),
            150 => queue(&input, KeyEvent::down("m").into()),
            300 => queue(&input, InputEvent::PointerDrag { x: 10.0, y: 8.0 }),
            360 => queue(&input, InputEvent::PointerRelease),
            _ => {}
        }

        let report = board.advance(FRAME);
        collisions += report.collisions;
        if report.truncated {
            log::warn!("Frame {frame}: collision cap reached");
        }

        for envelope in board.drain_outbound() {
            if let Some(message) = envelope.to_message(board.name()) {
                log::info!("Would send {message}");
            }
        }

        if frame % 60 == 59 {
            log::info!(
                "t = {:.1}s: {} ball(s), {} collision(s) so far",
                (frame + 1) as f64 * FRAME,
                board.ball_count(),
                collisions
            );
        }
    }

    println!("{}", board.snapshot().render_text());
    println!("{board}");

    board.restart();
    log::info!("Restarted with {} ball(s)", board.ball_count());
    Ok(())
}

fn queue(input: &crossbeam_channel::Sender<InputEvent>, event: InputEvent) {
    if input.try_send(event).is_err() {
        log::warn!("Input queue full, event dropped");
    }
}
