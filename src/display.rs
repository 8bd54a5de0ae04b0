/// Rendering layer — all terminal I/O lives here.
///
/// Each function receives a mutable writer, the canvas mapping and an
/// immutable view of the game state.  No game logic is performed; this module
/// only translates logical-pixel state into terminal commands.

use std::io::Write;

use crossterm::{
    cursor,
    style::{self, Color, Print},
    terminal,
    QueueableCommand,
};
use eco_defender::config::Config;
use eco_defender::entities::{GameState, Leaf, LeafPhase, Rect, Tree};

// ── Colour palette ────────────────────────────────────────────────────────────

const C_TEXT: Color = Color::White;
const C_HINT: Color = Color::DarkGrey;
const C_GROUND: Color = Color::DarkGreen;
const C_FACTORY: Color = Color::DarkGrey;
const C_FACTORY_GREEN: Color = Color::Green;
const C_LEAF: Color = Color::Green;
const C_LEAF_PLANTED: Color = Color::DarkYellow;
const C_TREE_CROWN: Color = Color::DarkGreen;
const C_TREE_TRUNK: Color = Color::DarkYellow;
const C_CLOUD: Color = Color::Grey;
const C_HEAD: Color = Color::Yellow;
const C_BODY: Color = Color::Blue;
const C_BANNER: Color = Color::Green;
const C_ERROR: Color = Color::Red;

/// Horizontal offsets of the three avatars drawn around the player anchor.
const GROUP_OFFSETS: [i32; 3] = [-20, 0, 20];

// ── Canvas mapping ────────────────────────────────────────────────────────────

/// Maps the fixed logical canvas onto the terminal grid.
#[derive(Clone, Copy, Debug)]
pub struct Canvas {
    pub cols: u16,
    pub rows: u16,
    width: i32,
    height: i32,
}

impl Canvas {
    pub fn new(cols: u16, rows: u16, config: &Config) -> Self {
        Self {
            cols: cols.max(1),
            rows: rows.max(1),
            width: config.screen_width,
            height: config.screen_height,
        }
    }

    pub fn from_terminal(config: &Config) -> std::io::Result<Self> {
        let (cols, rows) = terminal::size()?;
        Ok(Self::new(cols, rows, config))
    }

    fn col(&self, x: i32) -> i32 {
        x * self.cols as i32 / self.width
    }

    fn row(&self, y: i32) -> i32 {
        y * self.rows as i32 / self.height
    }

    /// Cell span `(col, row, cols, rows)` covered by `rect`, clipped to the
    /// terminal.  Anything visible covers at least one cell.
    fn cells(&self, rect: &Rect) -> Option<(u16, u16, u16, u16)> {
        if rect.right() <= 0 || rect.bottom() <= 0 || rect.x >= self.width || rect.y >= self.height
        {
            return None;
        }
        let c0 = self.col(rect.x).max(0);
        let r0 = self.row(rect.y).max(0);
        let c1 = self.col(rect.right()).max(c0 + 1).min(self.cols as i32);
        let r1 = self.row(rect.bottom()).max(r0 + 1).min(self.rows as i32);
        Some((c0 as u16, r0 as u16, (c1 - c0) as u16, (r1 - r0) as u16))
    }
}

// ── Public entry points ───────────────────────────────────────────────────────

/// Render one complete gameplay frame.
pub fn render<W: Write>(out: &mut W, canvas: &Canvas, state: &GameState) -> std::io::Result<()> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;

    let cfg = &state.config;
    fill_rect(out, canvas, &cfg.ground_rect(), '▒', C_GROUND)?;
    draw_factory(out, canvas, state)?;

    for tree in &state.trees {
        draw_tree(out, canvas, tree)?;
    }
    draw_group(out, canvas, state)?;
    for leaf in &state.leaves {
        draw_leaf(out, canvas, leaf)?;
    }
    for cloud in &state.clouds {
        fill_rect(out, canvas, &cloud.rect, '░', C_CLOUD)?;
    }

    draw_hud(out, canvas, state)?;
    finish(out, canvas)
}

/// Instructions screen; `prompt` toggles the blinking start prompt.
pub fn render_instructions<W: Write>(
    out: &mut W,
    canvas: &Canvas,
    prompt: bool,
) -> std::io::Result<()> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;

    let top = (canvas.rows / 2).saturating_sub(5);
    print_centered(out, canvas, top, "E C O   D E F E N D E R", C_BANNER)?;

    let lines = [
        "How to Play:",
        "• Use the ARROW KEYS (or W A S D) to move your group.",
        "• Press SPACE to throw leaves.",
        "• Leaves destroy pollution clouds.",
        "• Plant leaves to grow trees that auto-shoot leaves.",
        "• Make the factory carbon neutral 10 times to win!",
    ];
    for (i, line) in lines.iter().enumerate() {
        print_centered(out, canvas, top + 2 + i as u16, line, C_TEXT)?;
    }

    if prompt {
        print_centered(
            out,
            canvas,
            canvas.rows.saturating_sub(3),
            "Press ENTER or SPACE to start",
            C_TEXT,
        )?;
    }
    finish(out, canvas)
}

pub fn render_victory<W: Write>(out: &mut W, canvas: &Canvas, state: &GameState) -> std::io::Result<()> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;
    let mid = canvas.rows / 2;
    print_centered(out, canvas, mid, "You've made the factory carbon neutral!", C_BANNER)?;
    let stats = format!(
        "{} clouds cleared, {} trees standing",
        state.clouds_destroyed,
        state.trees.len()
    );
    print_centered(out, canvas, mid + 2, &stats, C_HINT)?;
    finish(out, canvas)
}

/// Diagnostic screen: the last lines of `text` that fit on the terminal.
pub fn render_error<W: Write>(out: &mut W, canvas: &Canvas, text: &str) -> std::io::Result<()> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;
    out.queue(style::SetForegroundColor(C_ERROR))?;

    let room = canvas.rows.saturating_sub(1).max(1) as usize;
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(room);
    for (row, line) in lines[start..].iter().enumerate() {
        let clipped: String = line.chars().take(canvas.cols as usize).collect();
        out.queue(cursor::MoveTo(0, row as u16))?;
        out.queue(Print(clipped))?;
    }
    finish(out, canvas)
}

// ── Scenery ───────────────────────────────────────────────────────────────────

fn draw_factory<W: Write>(out: &mut W, canvas: &Canvas, state: &GameState) -> std::io::Result<()> {
    let rect = state.config.factory_rect();
    let color = if state.pollution() == 0 {
        C_FACTORY_GREEN
    } else {
        C_FACTORY
    };
    fill_rect(out, canvas, &rect, '█', color)?;

    // Label sits on the ground just below the factory
    let label = "Factory";
    let col = canvas
        .col(rect.center_x())
        .saturating_sub(label.len() as i32 / 2)
        .clamp(0, (canvas.cols as i32 - label.len() as i32).max(0));
    let row = (canvas.row(rect.bottom()) + 1).min(canvas.rows as i32 - 1);
    out.queue(cursor::MoveTo(col as u16, row as u16))?;
    out.queue(style::SetForegroundColor(C_TEXT))?;
    out.queue(Print(label))?;
    Ok(())
}

// ── Entities ──────────────────────────────────────────────────────────────────

fn draw_group<W: Write>(out: &mut W, canvas: &Canvas, state: &GameState) -> std::io::Result<()> {
    let cfg = &state.config;
    let p = &state.player;
    for dx in GROUP_OFFSETS {
        // Each avatar: a head over a narrow body, centred in the group slot
        let cx = p.x + cfg.player_width / 2 - 20 + dx;
        let head = Rect::new(cx - 5, p.y, 10, 20);
        let body = Rect::new(cx - 5, p.y + 20, 10, cfg.player_height - 30);
        fill_rect(out, canvas, &head, '☻', C_HEAD)?;
        fill_rect(out, canvas, &body, '█', C_BODY)?;
    }
    Ok(())
}

fn draw_leaf<W: Write>(out: &mut W, canvas: &Canvas, leaf: &Leaf) -> std::io::Result<()> {
    match leaf.phase {
        LeafPhase::Planted { .. } => fill_rect(out, canvas, &leaf.rect, '♠', C_LEAF_PLANTED),
        _ => fill_rect(out, canvas, &leaf.rect, '♣', C_LEAF),
    }
}

fn draw_tree<W: Write>(out: &mut W, canvas: &Canvas, tree: &Tree) -> std::io::Result<()> {
    let r = tree.rect;
    let crown = Rect::new(r.x, r.y, r.w, r.h / 2);
    let trunk = Rect::new(r.center_x() - 5, r.y + r.h / 2, 10, r.h - r.h / 2);
    fill_rect(out, canvas, &trunk, '┃', C_TREE_TRUNK)?;
    fill_rect(out, canvas, &crown, '▓', C_TREE_CROWN)
}

// ── HUD ───────────────────────────────────────────────────────────────────────

fn draw_hud<W: Write>(out: &mut W, canvas: &Canvas, state: &GameState) -> std::io::Result<()> {
    out.queue(style::SetForegroundColor(C_TEXT))?;
    out.queue(cursor::MoveTo(1, 0))?;
    out.queue(Print(format!("Pollution Level: {}", state.pollution())))?;
    out.queue(cursor::MoveTo(1, 1))?;
    out.queue(Print(format!(
        "Factory Neutral Count: {}/{}",
        state.times_neutral, state.config.neutral_target
    )))?;

    let cleared = format!("Clouds cleared: {}", state.clouds_destroyed);
    let cx = canvas.cols.saturating_sub(cleared.chars().count() as u16 + 1);
    out.queue(cursor::MoveTo(cx, 0))?;
    out.queue(style::SetForegroundColor(C_HINT))?;
    out.queue(Print(&cleared))?;

    let bottom = canvas.rows.saturating_sub(2);
    if state.neutral_banner_since.is_some() {
        print_centered(out, canvas, bottom, "Factory is temporarily carbon neutral!", C_BANNER)?;
    } else if state.pollution() > 0 {
        print_centered(
            out,
            canvas,
            bottom,
            "Destroy pollution to make factory carbon neutral",
            C_TEXT,
        )?;
    }

    out.queue(cursor::MoveTo(1, canvas.rows.saturating_sub(1)))?;
    out.queue(style::SetForegroundColor(C_HINT))?;
    out.queue(Print("←↑↓→ / WASD : Move   SPACE : Throw   Q : Quit"))?;
    Ok(())
}

// ── Primitives ────────────────────────────────────────────────────────────────

fn fill_rect<W: Write>(
    out: &mut W,
    canvas: &Canvas,
    rect: &Rect,
    glyph: char,
    color: Color,
) -> std::io::Result<()> {
    let Some((col, row, w, h)) = canvas.cells(rect) else {
        return Ok(());
    };
    let line: String = std::iter::repeat(glyph).take(w as usize).collect();
    out.queue(style::SetForegroundColor(color))?;
    for r in row..row + h {
        out.queue(cursor::MoveTo(col, r))?;
        out.queue(Print(&line))?;
    }
    Ok(())
}

fn print_centered<W: Write>(
    out: &mut W,
    canvas: &Canvas,
    row: u16,
    text: &str,
    color: Color,
) -> std::io::Result<()> {
    let col = (canvas.cols / 2).saturating_sub(text.chars().count() as u16 / 2);
    out.queue(cursor::MoveTo(col, row))?;
    out.queue(style::SetForegroundColor(color))?;
    out.queue(Print(text))?;
    Ok(())
}

/// Park cursor in a harmless spot and flush.
fn finish<W: Write>(out: &mut W, canvas: &Canvas) -> std::io::Result<()> {
    out.queue(style::ResetColor)?;
    out.queue(cursor::MoveTo(0, canvas.rows.saturating_sub(1)))?;
    out.flush()?;
    Ok(())
}
