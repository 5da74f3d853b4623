/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into the `front` buffer
///   2. Compare each terminal cell with `back` (previous frame)
///   3. Emit commands only for cells that changed, batched with `queue!`
///   4. Swap front/back
///
/// One arena cell is two terminal columns. Glyphs come from a `GlyphAtlas`
/// looked up by name; a missing name draws the `MISSING` glyph instead.

use std::collections::HashMap;
use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use blastgrid::domain::entity::{BlastDir, Body, Facing, Player, EXPLOSION_FRAMES};
use blastgrid::domain::grid::{Cell, Grid};
use blastgrid::domain::state::LifeState;
use blastgrid::sim::session::{AssetProvider, Renderer, Snapshot};
use blastgrid::sim::world::{Mode, Outcome};

const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };
const FLOOR_BG: Color = Color::Rgb { r: 34, g: 44, b: 34 };

// ── Glyphs ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Glyph {
    pub text: [char; 2],
    pub fg: Color,
}

impl Glyph {
    const fn new(a: char, b: char, fg: Color) -> Self {
        Glyph { text: [a, b], fg }
    }
}

pub const MISSING: Glyph = Glyph::new('?', '?', Color::Magenta);

/// Named glyph table standing in for sprite images.
pub struct GlyphAtlas {
    glyphs: HashMap<&'static str, Glyph>,
}

impl GlyphAtlas {
    pub fn new() -> Self {
        let entries = [
            ("wall_unbreakable", Glyph::new('█', '█', Color::Rgb { r: 110, g: 110, b: 130 })),
            ("wall_breakable", Glyph::new('▒', '▒', Color::Rgb { r: 170, g: 120, b: 70 })),
            ("wall_hard", Glyph::new('▓', '▓', Color::Rgb { r: 150, g: 150, b: 190 })),
            ("bomb", Glyph::new('(', ')', Color::Rgb { r: 230, g: 230, b: 230 })),
            ("explosion_center", Glyph::new('✹', '✹', Color::Yellow)),
            ("explosion_h", Glyph::new('═', '═', Color::Yellow)),
            ("explosion_v", Glyph::new('║', ' ', Color::Yellow)),
            ("powerup_bomb_count", Glyph::new('+', 'B', Color::Rgb { r: 255, g: 120, b: 120 })),
            ("powerup_bomb_power", Glyph::new('+', 'P', Color::Rgb { r: 255, g: 200, b: 60 })),
            ("powerup_speed_boost", Glyph::new('+', 'S', Color::Rgb { r: 120, g: 220, b: 255 })),
            ("powerup_skateboard", Glyph::new('»', '»', Color::Rgb { r: 120, g: 255, b: 200 })),
            ("powerup_wall_pass", Glyph::new('W', 'P', Color::Rgb { r: 200, g: 140, b: 255 })),
            ("opponent_random_walk", Glyph::new('ö', ' ', Color::Rgb { r: 255, g: 90, b: 90 })),
            ("opponent_greedy_chase", Glyph::new('Ö', ' ', Color::Rgb { r: 255, g: 60, b: 160 })),
            ("opponent_shortest_path", Glyph::new('Ø', ' ', Color::Rgb { r: 255, g: 140, b: 40 })),
        ];
        GlyphAtlas { glyphs: entries.into_iter().collect() }
    }

    pub fn glyph(&self, name: &str) -> Glyph {
        self.get_image(name).copied().unwrap_or(MISSING)
    }
}

impl AssetProvider for GlyphAtlas {
    type Image = Glyph;

    fn get_image(&self, name: &str) -> Option<&Glyph> {
        self.glyphs.get(name)
    }
}

fn player_color(id: u8) -> Color {
    match id {
        1 => Color::Rgb { r: 120, g: 200, b: 255 },
        2 => Color::Rgb { r: 255, g: 170, b: 60 },
        3 => Color::Rgb { r: 120, g: 255, b: 120 },
        _ => Color::Rgb { r: 230, g: 120, b: 255 },
    }
}

fn facing_char(f: Facing) -> char {
    match f {
        Facing::Up => '▲',
        Facing::Down => '▼',
        Facing::Left => '◀',
        Facing::Right => '▶',
    }
}

fn scale(c: Color, k: f32) -> Color {
    match c {
        Color::Rgb { r, g, b } => {
            let f = |v: u8| (v as f32 * k.clamp(0.0, 1.0)) as u8;
            Color::Rgb { r: f(r), g: f(g), b: f(b) }
        }
        other => other,
    }
}

/// Yellow at ignition fading to dark red.
fn explosion_color(frame: u32) -> Color {
    let t = frame as f32 / (EXPLOSION_FRAMES - 1).max(1) as f32;
    Color::Rgb { r: 255 - (t * 90.0) as u8, g: 230 - (t * 200.0) as u8, b: 60 - (t * 50.0) as u8 }
}

/// The cell a mover is drawn in: the one under its box center.
fn draw_cell(grid: &Grid, body: &Body) -> Cell {
    grid.cell_of(body.x + body.size / 2, body.y + body.size / 2)
}

// ── Terminal cells ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct TermCell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl TermCell {
    const BLANK: TermCell = TermCell { ch: ' ', fg: Color::White, bg: BASE_BG };
    /// Differs from every real cell; forces a repaint.
    const INVALID: TermCell = TermCell { ch: '\u{0}', fg: Color::Magenta, bg: Color::Magenta };
}

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<TermCell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![TermCell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            *self = FrameBuffer::new(w, h);
        }
    }

    fn clear(&mut self) {
        self.cells.fill(TermCell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: TermCell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> TermCell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            TermCell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, TermCell { ch, fg, bg });
        }
    }

    fn put_glyph(&mut self, x: usize, y: usize, g: Glyph, bg: Color) {
        self.set(x, y, TermCell { ch: g.text[0], fg: g.fg, bg });
        self.set(x + 1, y, TermCell { ch: g.text[1], fg: g.fg, bg });
    }

    #[cfg(test)]
    fn row_text(&self, y: usize) -> String {
        (0..self.width).map(|x| self.get(x, y).ch).collect()
    }
}

// ── Renderer ──

const CELL_W: usize = 2;
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

pub struct TerminalRenderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    atlas: GlyphAtlas,
    term_w: usize,
    term_h: usize,
    /// Set after the first failed frame so the log isn't flooded.
    failed: bool,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        TerminalRenderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            atlas: GlyphAtlas::new(),
            term_w: 0,
            term_h: 0,
            failed: false,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(BASE_BG),
            Clear(ClearType::All)
        )?;
        self.sync_size(true)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    fn sync_size(&mut self, force: bool) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if force || tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(TermCell::INVALID);
            queue!(self.writer, SetBackgroundColor(BASE_BG), Clear(ClearType::All))?;
        }
        Ok(())
    }

    fn draw(&mut self, snap: &Snapshot<'_>) -> io::Result<()> {
        self.sync_size(false)?;
        self.front.clear();
        compose(&mut self.front, &self.atlas, snap);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }
}

impl Renderer for TerminalRenderer {
    fn render(&mut self, snapshot: &Snapshot<'_>) {
        match self.draw(snapshot) {
            Ok(()) => self.failed = false,
            Err(e) if !self.failed => {
                log::warn!("frame not drawn: {e}");
                self.failed = true;
            }
            Err(_) => {}
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Compose: build front buffer content
// ══════════════════════════════════════════════════════════════

fn compose(buf: &mut FrameBuffer, atlas: &GlyphAtlas, s: &Snapshot<'_>) {
    compose_hud(buf, s);

    let grid = s.grid;
    let at = |c: Cell| (c.x as usize * CELL_W, MAP_ROW + c.y as usize);

    // Floor
    for y in 0..grid.height {
        for x in 0..grid.width {
            let (col, row) = at(Cell::new(x, y));
            buf.put_glyph(col, row, Glyph::new(' ', ' ', Color::White), FLOOR_BG);
        }
    }

    for w in s.walls.iter().filter(|w| !w.is_destroyed()) {
        let mut g = atlas.glyph(&format!("wall_{}", w.kind.name()));
        g.fg = scale(g.fg, 0.35 + 0.65 * w.intensity());
        let (col, row) = at(w.cell);
        buf.put_glyph(col, row, g, FLOOR_BG);
    }

    for pu in s.powerups.iter().filter(|p| !p.is_collected()) {
        let mut g = atlas.glyph(&format!("powerup_{}", pu.kind.name()));
        // bob: dim on the low half of the float cycle
        if pu.float_offset < 0.0 {
            g.fg = scale(g.fg, 0.7);
        }
        let (col, row) = at(pu.cell);
        buf.put_glyph(col, row, g, FLOOR_BG);
    }

    for b in s.bombs.iter().filter(|b| !b.is_exploded()) {
        let mut g = atlas.glyph("bomb");
        if b.fuse_fraction() > 0.75 {
            g.fg = Color::Rgb { r: 255, g: 80, b: 60 };
        }
        if !b.blink_visible() {
            g.fg = scale(g.fg, 0.4);
        }
        let (col, row) = at(b.cell);
        buf.put_glyph(col, row, g, FLOOR_BG);
    }

    for e in s.explosions {
        let name = match e.dir {
            BlastDir::Center => "explosion_center",
            d if d.is_horizontal() => "explosion_h",
            _ => "explosion_v",
        };
        let mut g = atlas.glyph(name);
        g.fg = explosion_color(e.frame());
        let (col, row) = at(e.cell);
        buf.put_glyph(col, row, g, Color::Rgb { r: 90, g: 30, b: 10 });
    }

    for o in s.opponents.iter().filter(|o| o.alive) {
        let g = atlas.glyph(&format!("opponent_{}", o.strategy.kind().name()));
        let (col, row) = at(draw_cell(&grid, &o.body));
        buf.put_glyph(col, row, g, FLOOR_BG);
    }

    for p in s.players.iter().filter(|p| p.is_alive()) {
        let (col, row) = at(draw_cell(&grid, &p.body));
        buf.put_glyph(col, row, player_glyph(p, s.elapsed_ms), FLOOR_BG);
    }

    compose_footer(buf, s, MAP_ROW + grid.height as usize + 1);
}

fn player_glyph(p: &Player, elapsed_ms: u64) -> Glyph {
    let digit = char::from_digit(p.id as u32, 10).unwrap_or('P');
    let mut fg = player_color(p.id);
    match p.state {
        LifeState::Invincible { .. } if (elapsed_ms / 100) % 2 == 0 => fg = Color::White,
        LifeState::Stunned { .. } => return Glyph::new(digit, '*', scale(fg, 0.6)),
        _ => {}
    }
    Glyph::new(digit, facing_char(p.facing), fg)
}

fn compose_hud(buf: &mut FrameBuffer, s: &Snapshot<'_>) {
    let secs = s.elapsed_ms / 1000;
    let mut x = 0;
    let title = format!(" BLASTGRID  {:02}:{:02} ", secs / 60, secs % 60);
    buf.put_str(x, HUD_ROW, &title, Color::Rgb { r: 255, g: 220, b: 50 }, BASE_BG);
    x += title.chars().count();

    for p in s.players {
        let rec = s.scoreboard.record(p.id);
        let tag = if p.remote { "net" } else { p.state.name() };
        let text = format!(
            " P{} {:>5}  ●{} ✶{} »{}{} [{}] ",
            p.id,
            rec.score,
            p.stats.max_bombs,
            p.stats.power,
            p.stats.speed,
            if p.stats.wall_pass { " WP" } else { "" },
            tag
        );
        let fg = if p.is_alive() { player_color(p.id) } else { Color::DarkGrey };
        buf.put_str(x, HUD_ROW, &text, fg, BASE_BG);
        x += text.chars().count();
    }

    if s.mode.has_opponents() {
        let left = s.opponents.iter().filter(|o| o.alive).count();
        buf.put_str(x, HUD_ROW, &format!(" foes {left} "), Color::Rgb { r: 255, g: 90, b: 90 }, BASE_BG);
    }
}

fn compose_footer(buf: &mut FrameBuffer, s: &Snapshot<'_>, row: usize) {
    let banner = match s.outcome {
        Some(Outcome::Won { winner }) if s.mode == Mode::Solo => {
            Some((format!("ARENA CLEARED! player {winner} wins"), Color::Rgb { r: 80, g: 255, b: 80 }))
        }
        Some(Outcome::Won { winner }) => Some((format!("PLAYER {winner} WINS!"), player_color(winner))),
        Some(Outcome::Lost) => Some(("GAME OVER".to_string(), Color::Rgb { r: 255, g: 60, b: 60 })),
        Some(Outcome::Draw) => Some(("DRAW".to_string(), Color::Rgb { r: 200, g: 200, b: 200 })),
        None if s.paused => Some(("PAUSED".to_string(), Color::Rgb { r: 255, g: 220, b: 50 })),
        None => None,
    };
    if let Some((text, fg)) = banner {
        buf.put_str(1, row, &text, fg, BASE_BG);
    }

    let help = if s.outcome.is_some() {
        "R: play again   ESC: quit"
    } else {
        "P1 arrows+SPACE   P2 WASD+F   P: pause   R: restart   ESC: quit"
    };
    buf.put_str(1, row + 1, help, Color::DarkGrey, BASE_BG);
}

#[cfg(test)]
mod tests {
    use super::*;
    use blastgrid::config::GameConfig;
    use blastgrid::sim::level::parse_map;
    use blastgrid::sim::session::Match;
    use blastgrid::sim::world::WorldState;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn missing_glyph_falls_back() {
        let atlas = GlyphAtlas::new();
        assert!(atlas.get_image("wall_neon").is_none());
        assert_eq!(atlas.glyph("wall_neon"), MISSING);
        assert_eq!(atlas.glyph("bomb").text, ['(', ')']);
    }

    #[test]
    fn arena_is_drawn_two_columns_per_cell() {
        let layout = parse_map("#####\n#1+a#\n#####\n").unwrap();
        let world =
            WorldState::from_layout(GameConfig::default(), Mode::Solo, layout, Pcg32::seed_from_u64(1)).unwrap();
        let m = Match::from_world(world);
        let mut buf = FrameBuffer::new(80, 10);
        compose(&mut buf, &GlyphAtlas::new(), &m.snapshot());

        assert!(buf.row_text(HUD_ROW).contains("P1"));
        assert!(buf.row_text(MAP_ROW).starts_with("██████████"));
        assert!(buf.row_text(MAP_ROW + 1).starts_with("██1▼▒▒Ø ██"));
        assert!(buf.row_text(MAP_ROW + 5).contains("P1 arrows"));
    }

    #[test]
    fn explosion_fades() {
        assert_eq!(explosion_color(0), Color::Rgb { r: 255, g: 230, b: 60 });
        assert_eq!(explosion_color(EXPLOSION_FRAMES - 1), Color::Rgb { r: 165, g: 30, b: 10 });
    }
}
