mod display;

use std::collections::HashMap;
use std::fs::File;
use std::io::{stdout, BufWriter, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, KeyboardEnhancementFlags, MouseButton, MouseEvent, MouseEventKind,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    terminal, ExecutableCommand,
};
use rand::thread_rng;

use display::Canvas;
use eco_defender::compute::{init_state, step, FrameInput};
use eco_defender::config::Config;
use eco_defender::entities::GameState;

/// Environment variable naming the log file.
const LOG_ENV: &str = "ECO_DEFENDER_LOG";

/// A key is considered "held" if its last press/repeat event arrived within
/// this many frames.  Covers terminals that don't emit key-release events.
/// Once OS auto-repeat kicks in (≥ 15 Hz) the 8-frame window (≈133 ms at
/// 60 FPS) is refreshed before it expires, but the initial repeat delay
/// (typically 250-600 ms) is longer: holding a key there moves for about nine
/// frames, stalls until the first repeat arrives, then moves steadily.
const HOLD_WINDOW: u64 = 8;

// ── Input ─────────────────────────────────────────────────────────────────────

/// One-shot signals gathered while draining the event queue.
#[derive(Debug, Default)]
struct Polled {
    quit: bool,
    /// Throw edges: Space presses and left clicks.
    throws: u32,
    /// Any of Enter / Space / left click.
    confirm: bool,
}

/// Tracks which keys are currently held.
///
/// Instead of acting on each key event individually, we record the frame
/// number of the last press/repeat event for every key.  Each frame we check
/// which keys are still "fresh" (within `HOLD_WINDOW` frames).  Terminals
/// with keyboard enhancement send `Release` and keys drop out immediately;
/// classic terminals only send `Press`, so keys expire after the window.
struct Keyboard {
    key_frame: HashMap<KeyCode, u64>,
    frame: u64,
}

impl Keyboard {
    fn new() -> Self {
        Self {
            key_frame: HashMap::new(),
            frame: 0,
        }
    }

    /// Drain all pending terminal events without blocking.
    fn poll(&mut self) -> std::io::Result<Polled> {
        self.frame += 1;
        let mut polled = Polled::default();
        while event::poll(Duration::ZERO)? {
            self.handle(event::read()?, &mut polled);
        }
        Ok(polled)
    }

    /// Fold one terminal event into the held-key map and this frame's signals.
    /// Only `Press` edges throw; `Repeat` just keeps the key held.
    fn handle(&mut self, event: Event, polled: &mut Polled) {
        match event {
            Event::Key(KeyEvent {
                code,
                kind,
                modifiers,
                ..
            }) => match kind {
                KeyEventKind::Press => {
                    match code {
                        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                            polled.quit = true;
                        }
                        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                            polled.quit = true;
                        }
                        KeyCode::Char(' ') => {
                            polled.throws += 1;
                            polled.confirm = true;
                        }
                        KeyCode::Enter => polled.confirm = true,
                        _ => {}
                    }
                    self.key_frame.insert(code, self.frame);
                }
                KeyEventKind::Repeat => {
                    self.key_frame.insert(code, self.frame);
                }
                KeyEventKind::Release => {
                    self.key_frame.remove(&code);
                }
            },
            Event::Mouse(MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                ..
            }) => {
                polled.throws += 1;
                polled.confirm = true;
            }
            _ => {}
        }
    }

    fn is_held(&self, keys: &[KeyCode]) -> bool {
        keys.iter().any(|key| {
            self.key_frame
                .get(key)
                .map(|&last| self.frame.saturating_sub(last) <= HOLD_WINDOW)
                .unwrap_or(false)
        })
    }

    fn frame_input(&self, throws: u32) -> FrameInput {
        use KeyCode::{Char, Down, Left, Right, Up};
        FrameInput {
            left: self.is_held(&[Left, Char('a'), Char('A')]),
            right: self.is_held(&[Right, Char('d'), Char('D')]),
            up: self.is_held(&[Up, Char('w'), Char('W')]),
            down: self.is_held(&[Down, Char('s'), Char('S')]),
            throws,
        }
    }
}

// ── Frame pacing ──────────────────────────────────────────────────────────────

/// Sleep out the remainder of the frame that began at `frame_start`.
fn pace(frame_start: Instant, frame: Duration) {
    let elapsed = frame_start.elapsed();
    if elapsed < frame {
        std::thread::sleep(frame - elapsed);
    }
}

/// Everything the screens share: terminal writer, canvas mapping, tuning and
/// the input tracker.
struct Session<'a, W: Write> {
    out: &'a mut W,
    canvas: Canvas,
    config: Config,
    keyboard: Keyboard,
}

impl<W: Write> Session<'_, W> {
    fn frame(&self) -> Duration {
        Duration::from_millis(self.config.frame_millis())
    }
}

enum Outcome {
    Quit,
    Won(GameState),
}

// ── Screens ───────────────────────────────────────────────────────────────────

/// Show the instructions until a start signal or the timeout.
/// Returns `false` if the player quit instead.
fn show_instructions<W: Write>(ctx: &mut Session<'_, W>) -> Result<bool> {
    let started = Instant::now();
    let timeout = Duration::from_millis(ctx.config.intro_timeout_ms);
    let mut blink: u32 = 0;

    loop {
        let frame_start = Instant::now();
        blink = (blink + 1) % ctx.config.frame_rate;

        let polled = ctx.keyboard.poll().context("reading terminal input")?;
        if polled.quit {
            log::info!("Quit from instructions screen");
            return Ok(false);
        }
        if polled.confirm {
            return Ok(true);
        }
        if started.elapsed() >= timeout {
            log::info!("Instructions timed out, starting game");
            return Ok(true);
        }

        // Prompt visible for two thirds of every second
        let prompt = blink < ctx.config.frame_rate * 2 / 3;
        display::render_instructions(ctx.out, &ctx.canvas, prompt)
            .context("drawing instructions")?;
        pace(frame_start, ctx.frame());
    }
}

fn game_loop<W: Write>(ctx: &mut Session<'_, W>) -> Result<Outcome> {
    let mut rng = thread_rng();
    let mut state = init_state(ctx.config);
    let started = Instant::now();
    log::info!("Game started with {} clouds", state.pollution());

    loop {
        let frame_start = Instant::now();

        let polled = ctx.keyboard.poll().context("reading terminal input")?;
        if polled.quit {
            log::info!(
                "Quit at frame {} ({} neutral, {} clouds destroyed)",
                state.frame,
                state.times_neutral,
                state.clouds_destroyed
            );
            return Ok(Outcome::Quit);
        }

        let input = ctx.keyboard.frame_input(polled.throws);
        let now = started.elapsed().as_millis() as u64;
        state = step(&state, &input, now, &mut rng);

        display::render(ctx.out, &ctx.canvas, &state).context("drawing frame")?;

        if state.is_won() {
            log::info!("Victory at frame {}", state.frame);
            return Ok(Outcome::Won(state));
        }
        pace(frame_start, ctx.frame());
    }
}

/// Closing screen, held for a fixed time (quit cuts it short).
fn show_victory<W: Write>(ctx: &mut Session<'_, W>, state: &GameState) -> Result<()> {
    let started = Instant::now();
    let hold = Duration::from_millis(ctx.config.victory_screen_ms);
    while started.elapsed() < hold {
        let frame_start = Instant::now();
        if ctx.keyboard.poll().context("reading terminal input")?.quit {
            break;
        }
        display::render_victory(ctx.out, &ctx.canvas, state).context("drawing victory screen")?;
        pace(frame_start, ctx.frame());
    }
    Ok(())
}

/// Render the failure on screen for a fixed number of frames.
fn show_error<W: Write>(ctx: &mut Session<'_, W>, err: &anyhow::Error) -> Result<()> {
    let text = format!("Eco Defender stopped:\n{err:?}");
    for _ in 0..ctx.config.error_hold_frames {
        let frame_start = Instant::now();
        display::render_error(ctx.out, &ctx.canvas, &text).context("drawing error screen")?;
        pace(frame_start, ctx.frame());
    }
    Ok(())
}

fn play<W: Write>(ctx: &mut Session<'_, W>) -> Result<()> {
    if !show_instructions(ctx)? {
        return Ok(());
    }
    match game_loop(ctx)? {
        Outcome::Quit => Ok(()),
        Outcome::Won(state) => show_victory(ctx, &state),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run the game; any error or panic ends on the diagnostic screen and the
/// process still exits normally.
fn run<W: Write>(out: &mut W, config: Config) -> Result<()> {
    let canvas = Canvas::from_terminal(&config).context("querying terminal size")?;
    let mut ctx = Session {
        out,
        canvas,
        config,
        keyboard: Keyboard::new(),
    };

    let err = match panic::catch_unwind(AssertUnwindSafe(|| play(&mut ctx))) {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(err)) => err,
        Err(payload) => anyhow!("panic: {}", panic_message(payload.as_ref())),
    };
    log::error!("{err:?}");
    show_error(&mut ctx, &err)
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn init_logging() {
    let path = std::env::var_os(LOG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("eco_defender.log"));

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    // The terminal is in raw mode on the alternate screen, so logs go to a file
    match File::create(&path) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(_) => {
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    builder.init();
}

fn main() -> Result<()> {
    init_logging();
    let config = Config::from_env()?;
    log::debug!("Tuning: {config:?}");

    // Panics are reported on the error screen; keep the default hook from
    // scribbling over the alternate screen.
    panic::set_hook(Box::new(|info| log::error!("{info}")));

    let raw_out = stdout();
    let mut out = BufWriter::new(raw_out);

    terminal::enable_raw_mode()?;
    out.execute(terminal::EnterAlternateScreen)?;
    out.execute(cursor::Hide)?;
    out.execute(EnableMouseCapture)?;

    // Request key-release (and key-repeat) events from the terminal.
    // kitty-protocol terminals support this; others fall back gracefully.
    let keyboard_enhanced = out
        .execute(PushKeyboardEnhancementFlags(
            KeyboardEnhancementFlags::REPORT_EVENT_TYPES,
        ))
        .is_ok();

    let result = run(&mut out, config);

    // Always restore the terminal
    if keyboard_enhanced {
        let _ = out.execute(PopKeyboardEnhancementFlags);
    }
    let _ = out.execute(DisableMouseCapture);
    let _ = out.execute(cursor::Show);
    let _ = out.execute(terminal::LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();

    log::info!("Eco Defender exiting");
    result
}
