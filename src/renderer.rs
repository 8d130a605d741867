// Renderer Module - Terminal drawing of the board, menu and round-over banner
use anyhow::{anyhow, Result};
use crossterm::cursor::Show;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::{Frame, Terminal};
use std::io::{self, Stdout};
use std::str::FromStr;

use crate::config::GameConfig;
use crate::cycle::LightCycle;
use crate::game::{Outcome, Renderer, Snapshot, Winner};
use crate::types::{Axis, Heading, Position};

pub const TITLE: &str = "TR0N: CYCL3S";
const HEADER_ROWS: u16 = 1;
const CELL_WIDTH: u16 = 2;  // Terminal columns per grid cell

// Colours and names resolved once from the config file
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub player_color: Color,
    pub pursuer_color: Color,
    pub obstacle_color: Color,
    pub wall_color: Color,
    pub banner_color: Color,
    pub player_name: String,
    pub pursuer_name: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            player_color: Color::Cyan,
            pursuer_color: Color::Yellow,
            obstacle_color: Color::White,
            wall_color: Color::Gray,
            banner_color: Color::Red,
            player_name: "USER".to_string(),
            pursuer_name: "RINZLER".to_string(),
        }
    }
}

impl RenderConfig {
    pub fn from_config(config: &GameConfig) -> Result<Self> {
        Ok(RenderConfig {
            player_color: parse_color(&config.player_color)?,
            pursuer_color: parse_color(&config.pursuer_color)?,
            obstacle_color: parse_color(&config.obstacle_color)?,
            wall_color: parse_color(&config.wall_color)?,
            banner_color: parse_color(&config.banner_color)?,
            player_name: config.player_name.clone(),
            pursuer_name: config.pursuer_name.clone(),
        })
    }
}

fn parse_color(name: &str) -> Result<Color> {
    Color::from_str(name).map_err(|_| anyhow!("Invalid color '{}' (use a name like 'cyan' or hex like '#00ffff')", name))
}

// What occupies a board cell, in increasing draw priority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Empty,
    Wall,
    Obstacle,
    PursuerTrail,
    PlayerTrail,
    PursuerHead,
    PlayerHead,
}

pub fn wall_glyph(axis: Axis) -> char {
    match axis {
        Axis::Horizontal => '─',
        Axis::Vertical => '|',
    }
}

pub fn obstacle_glyph(axis: Axis) -> char {
    match axis {
        Axis::Horizontal => '▬',
        Axis::Vertical => '▮',
    }
}

pub fn trail_glyph(axis: Axis) -> char {
    match axis {
        Axis::Horizontal => '═',
        Axis::Vertical => '║',
    }
}

pub fn head_glyph(heading: Heading) -> char {
    obstacle_glyph(heading.axis())
}

/// Glyph grid for one frame, row-major, `size` x `size`
pub fn board_cells(snapshot: &Snapshot<'_>) -> Vec<Vec<(char, CellKind)>> {
    let size = snapshot.world.size().max(0) as usize;
    let mut cells = vec![vec![(' ', CellKind::Empty); size]; size];

    let mut put = |x: i32, y: i32, glyph: char, kind: CellKind| {
        if x >= 0 && y >= 0 && (x as usize) < size && (y as usize) < size {
            cells[y as usize][x as usize] = (glyph, kind);
        }
    };

    for y in 0..size as i32 {
        for x in 0..size as i32 {
            if let Some(axis) = snapshot.world.wall_axis(Position::new(x, y)) {
                put(x, y, wall_glyph(axis), CellKind::Wall);
            }
        }
    }

    for (pos, axis) in snapshot.world.obstacles() {
        put(pos.x, pos.y, obstacle_glyph(*axis), CellKind::Obstacle);
    }

    let mut stamp_trail = |cycle: &LightCycle, kind: CellKind| {
        for segment in cycle.trail().iter() {
            put(segment.pos.x, segment.pos.y, trail_glyph(segment.axis), kind);
        }
    };
    stamp_trail(snapshot.pursuer, CellKind::PursuerTrail);
    stamp_trail(snapshot.player, CellKind::PlayerTrail);

    let pursuer = snapshot.pursuer.pos();
    put(pursuer.x, pursuer.y, head_glyph(snapshot.pursuer.heading()), CellKind::PursuerHead);
    let player = snapshot.player.pos();
    put(player.x, player.y, head_glyph(snapshot.player.heading()), CellKind::PlayerHead);

    cells
}

/// Lines of the round-over box, plus the colour they are drawn in
pub fn banner_lines(outcome: &Outcome, config: &RenderConfig) -> (Vec<String>, Color) {
    let derez = |name: &str| format!("{}: DE-REZOLUTION", name);
    match outcome.winner() {
        Winner::Player => (
            vec![derez(&config.pursuer_name), format!("{} WINS", config.player_name)],
            config.player_color,
        ),
        Winner::Pursuer => (
            vec![derez(&config.player_name), format!("{} WINS", config.pursuer_name)],
            config.pursuer_color,
        ),
        Winner::Draw => (
            vec![derez(&config.player_name), derez(&config.pursuer_name), "NO WINNER".to_string()],
            config.banner_color,
        ),
    }
}

/// A `width` x `height` rect centred in `area`, shrunk to fit
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Terminal rows and columns a `grid_size` board needs
pub fn required_size(grid_size: i32) -> (u16, u16) {
    let size = grid_size.max(0) as u16;
    (size * CELL_WIDTH, size + HEADER_ROWS)
}

fn cell_style(config: &RenderConfig, kind: CellKind) -> Style {
    match kind {
        CellKind::Empty => Style::default(),
        CellKind::Wall => Style::default().fg(config.wall_color),
        CellKind::Obstacle => Style::default().fg(config.obstacle_color),
        CellKind::PlayerTrail => Style::default().fg(config.player_color),
        CellKind::PursuerTrail => Style::default().fg(config.pursuer_color),
        CellKind::PlayerHead => Style::default().fg(config.player_color).add_modifier(Modifier::BOLD),
        CellKind::PursuerHead => Style::default().fg(config.pursuer_color).add_modifier(Modifier::BOLD),
    }
}

fn board_lines(config: &RenderConfig, snapshot: &Snapshot<'_>) -> Vec<Line<'static>> {
    board_cells(snapshot)
        .into_iter()
        .map(|row| {
            let spans: Vec<Span<'static>> = row
                .into_iter()
                .map(|(glyph, kind)| {
                    // Horizontal strokes run through both columns, everything else is padded
                    let filler = match glyph {
                        '─' | '═' | '▬' => glyph,
                        _ => ' ',
                    };
                    Span::styled(format!("{}{}", glyph, filler), cell_style(config, kind))
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

fn header_line(config: &RenderConfig, snapshot: &Snapshot<'_>) -> Line<'static> {
    Line::from(vec![
        Span::styled(TITLE, Style::default().fg(config.player_color).add_modifier(Modifier::BOLD)),
        Span::raw(format!(
            " | {:.1}s | tick {} | {}ms/tick | arrows or WASD to steer, Ctrl+C to quit",
            snapshot.elapsed.as_secs_f64(),
            snapshot.tick,
            snapshot.delay.as_millis()
        )),
    ])
}

// Header plus board; returns the board area so overlays can centre on it
fn render_board(f: &mut Frame, config: &RenderConfig, snapshot: &Snapshot<'_>) -> Rect {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_ROWS),  // Header
            Constraint::Min(0),               // Board
        ])
        .split(f.size());

    f.render_widget(Paragraph::new(header_line(config, snapshot)), chunks[0]);
    f.render_widget(Paragraph::new(board_lines(config, snapshot)), chunks[1]);
    chunks[1]
}

pub struct TerminalRenderer<B: Backend> {
    terminal: Terminal<B>,
    config: RenderConfig,
}

impl<B: Backend> TerminalRenderer<B> {
    pub fn new(terminal: Terminal<B>, config: RenderConfig) -> Self {
        TerminalRenderer { terminal, config }
    }

    #[cfg(test)]
    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }
}

impl<B: Backend> Renderer for TerminalRenderer<B> {
    fn fits(&mut self, grid_size: i32) -> Result<bool> {
        let area = self.terminal.size()?;
        let (cols, rows) = required_size(grid_size);
        Ok(area.width >= cols && area.height >= rows)
    }

    fn draw_menu(&mut self) -> Result<()> {
        let title_style = Style::default().fg(self.config.player_color).add_modifier(Modifier::BOLD);
        self.terminal.draw(|f| {
            let lines = vec![
                Line::from(Span::styled(TITLE, title_style)),
                Line::from(""),
                Line::from("P - Play"),
                Line::from("Q - Quit"),
            ];
            let area = centered_rect(f.size(), 24, lines.len() as u16 + 2);
            let menu = Paragraph::new(lines)
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(menu, area);
        })?;
        Ok(())
    }

    fn draw_too_small(&mut self, grid_size: i32) -> Result<()> {
        let (cols, rows) = required_size(grid_size);
        self.terminal.draw(|f| {
            let area = f.size();
            let notice = Paragraph::new(vec![
                Line::from("Terminal window is too small"),
                Line::from(format!("need {}x{}, have {}x{}", cols, rows, area.width, area.height)),
            ])
            .alignment(Alignment::Center);
            f.render_widget(notice, centered_rect(area, area.width, 2));
        })?;
        Ok(())
    }

    fn draw(&mut self, snapshot: &Snapshot<'_>) -> Result<()> {
        let config = &self.config;
        self.terminal.draw(|f| {
            render_board(f, config, snapshot);
        })?;
        Ok(())
    }

    fn draw_round_over(&mut self, snapshot: &Snapshot<'_>, outcome: &Outcome) -> Result<()> {
        let config = &self.config;
        let (text, text_color) = banner_lines(outcome, config);
        let width = text.iter().map(|line| line.chars().count()).max().unwrap_or(0) as u16 + 6;
        let height = text.len() as u16 + 2;
        let lines: Vec<Line> = text
            .into_iter()
            .map(|line| Line::from(Span::styled(line, Style::default().fg(text_color).add_modifier(Modifier::BOLD))))
            .collect();

        self.terminal.draw(|f| {
            let board = render_board(f, config, snapshot);
            let area = centered_rect(board, width, height);
            let banner = Paragraph::new(lines)
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(config.banner_color)));
            f.render_widget(Clear, area);
            f.render_widget(banner, area);
        })?;
        Ok(())
    }
}

/// Raw mode plus alternate screen, cursor hidden
pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    terminal.hide_cursor()?;
    Ok(terminal)
}

/// Undo `setup_terminal`; safe to call after a failed or partial setup
pub fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(LeaveAlternateScreen)?;
    stdout.execute(Show)?;
    Ok(())
}

/// Restore the terminal before the default hook prints the panic message
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        default_hook(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::LossCause;
    use crate::grid::{GridWorld, ObstacleShape};
    use ratatui::backend::TestBackend;
    use std::time::Duration;

    fn buffer_text(renderer: &TerminalRenderer<TestBackend>) -> String {
        renderer.terminal().backend().buffer().content.iter().map(|cell| cell.symbol()).collect()
    }

    fn test_renderer(width: u16, height: u16) -> TerminalRenderer<TestBackend> {
        let terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        TerminalRenderer::new(terminal, RenderConfig::default())
    }

    #[test]
    fn test_glyphs_by_axis() {
        assert_eq!(wall_glyph(Axis::Horizontal), '─');
        assert_eq!(wall_glyph(Axis::Vertical), '|');
        assert_eq!(obstacle_glyph(Axis::Horizontal), '▬');
        assert_eq!(trail_glyph(Axis::Vertical), '║');
        assert_eq!(trail_glyph(Axis::Horizontal), '═');
        assert_eq!(head_glyph(Heading::Left), '▬');
        assert_eq!(head_glyph(Heading::Up), '▮');
    }

    #[test]
    fn test_board_cells_layering() {
        let mut world = GridWorld::new(10);
        world.stamp(ObstacleShape::Horizontal, Position::new(2, 2));
        let mut player = LightCycle::new(Position::new(5, 8), Heading::Up, 5);
        player.commit(Position::new(5, 7));
        player.commit(Position::new(5, 6));
        let pursuer = LightCycle::new(Position::new(5, 1), Heading::Down, 5);
        let snapshot = Snapshot {
            world: &world,
            player: &player,
            pursuer: &pursuer,
            tick: 2,
            elapsed: Duration::ZERO,
            delay: Duration::from_millis(300),
        };

        let cells = board_cells(&snapshot);
        assert_eq!(cells.len(), 10);
        assert_eq!(cells[0][0], ('|', CellKind::Wall)); // Side walls win at the corners
        assert_eq!(cells[0][4], ('─', CellKind::Wall));
        assert_eq!(cells[2][3], ('▬', CellKind::Obstacle));
        assert_eq!(cells[7][5], ('║', CellKind::PlayerTrail));
        assert_eq!(cells[6][5], ('▮', CellKind::PlayerHead)); // Head drawn over the newest trail cell
        assert_eq!(cells[1][5], ('▮', CellKind::PursuerHead));
        assert_eq!(cells[4][4], (' ', CellKind::Empty));
    }

    #[test]
    fn test_banner_lines_name_the_loser() {
        let config = RenderConfig::default();
        let player_lost = Outcome { player: Some(LossCause::Collision), pursuer: None };
        let (lines, color) = banner_lines(&player_lost, &config);
        assert_eq!(lines, vec!["USER: DE-REZOLUTION", "RINZLER WINS"]);
        assert_eq!(color, Color::Yellow);

        let pursuer_lost = Outcome { player: None, pursuer: Some(LossCause::OutOfBounds) };
        let (lines, color) = banner_lines(&pursuer_lost, &config);
        assert_eq!(lines, vec!["RINZLER: DE-REZOLUTION", "USER WINS"]);
        assert_eq!(color, Color::Cyan);

        let draw = Outcome { player: Some(LossCause::Collision), pursuer: Some(LossCause::Collision) };
        let (lines, color) = banner_lines(&draw, &config);
        assert_eq!(lines.last().map(String::as_str), Some("NO WINNER"));
        assert_eq!(color, Color::Red);
    }

    #[test]
    fn test_centered_rect_shrinks_to_fit() {
        let area = Rect::new(0, 0, 40, 20);
        assert_eq!(centered_rect(area, 10, 4), Rect::new(15, 8, 10, 4));
        assert_eq!(centered_rect(area, 80, 40), area);
    }

    #[test]
    fn test_fits_needs_two_columns_per_cell_plus_header() {
        assert_eq!(required_size(32), (64, 33));
        assert!(test_renderer(64, 33).fits(32).unwrap());
        assert!(!test_renderer(63, 33).fits(32).unwrap());
        assert!(!test_renderer(64, 32).fits(32).unwrap());
    }

    #[test]
    fn test_menu_lists_choices() {
        let mut renderer = test_renderer(40, 12);
        renderer.draw_menu().unwrap();
        let text = buffer_text(&renderer);
        assert!(text.contains(TITLE));
        assert!(text.contains("P - Play"));
        assert!(text.contains("Q - Quit"));
    }

    #[test]
    fn test_panic_hook_still_reports_the_panic() {
        install_panic_hook();
        let result = std::panic::catch_unwind(|| panic!("round loop failed"));
        let _ = std::panic::take_hook();

        let payload = result.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"round loop failed"));
    }

    #[test]
    fn test_invalid_color_is_rejected() {
        let config = GameConfig {
            pursuer_color: "not-a-colour".to_string(),
            ..Default::default()
        };
        assert!(RenderConfig::from_config(&config).is_err());
        assert!(RenderConfig::from_config(&GameConfig::default()).is_ok());
    }
}
