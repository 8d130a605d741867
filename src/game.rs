// Game Module - Round simulation, the MENU/PLAYING/ROUND_OVER state machine and the paced game loop
use anyhow::Result;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

use crate::collision::{is_blocked, CellSet};
use crate::cycle::LightCycle;
use crate::grid::GridWorld;
use crate::pursuit::PursuitAi;
use crate::speed::SpeedRamp;
use crate::types::{ExitReason, Heading, Position};

/// Per-round tuning, frozen when a round starts
#[derive(Debug, Clone)]
pub struct RoundConfig {
    pub grid_size: i32,
    pub player_trail_length: usize,
    pub pursuer_trail_length: usize,
    pub obstacle_count: usize,
    pub pursuit_depth: usize,
    pub speed: SpeedRamp,
    pub round_over_pause: Duration,
    pub resize_retry: Duration,
    pub seed: Option<u64>,  // None = fresh entropy every process
}

impl RoundConfig {
    pub fn player_spawn(&self) -> Position {
        Position::new(self.grid_size / 2, self.grid_size - 2)
    }

    pub fn pursuer_spawn(&self) -> Position {
        Position::new(self.grid_size / 2, 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Menu,
    Playing,
    RoundOver,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossCause {
    OutOfBounds,  // Touched the boundary wall
    Collision,    // Hit a trail, an obstacle, or the other cycle head-on
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Player,
    Pursuer,
    Draw,
}

/// How a round ended. At least one side has a loss cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub player: Option<LossCause>,
    pub pursuer: Option<LossCause>,
}

impl Outcome {
    pub fn winner(&self) -> Winner {
        match (self.player, self.pursuer) {
            (Some(_), Some(_)) => Winner::Draw,
            (Some(_), None) => Winner::Pursuer,
            _ => Winner::Player,
        }
    }

    fn from_checks(player_lost: bool, pursuer_lost: bool, cause: LossCause) -> Option<Outcome> {
        if !player_lost && !pursuer_lost {
            return None;
        }
        Some(Outcome {
            player: player_lost.then_some(cause),
            pursuer: pursuer_lost.then_some(cause),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickResult {
    Continue,
    RoundOver(Outcome),
}

/// Read-only view handed to the renderer once per tick
pub struct Snapshot<'a> {
    pub world: &'a GridWorld,
    pub player: &'a LightCycle,
    pub pursuer: &'a LightCycle,
    pub tick: u64,
    pub elapsed: Duration,
    pub delay: Duration,
}

/// One PLAYING phase: the board plus both cycles. Dropped when the round ends.
pub struct Round {
    world: GridWorld,
    player: LightCycle,
    pursuer: LightCycle,
    ai: PursuitAi,
    ticks: u64,
}

impl Round {
    /// Fresh board and both cycles at their spawn cells
    pub fn generate<R: Rng>(config: &RoundConfig, rng: &mut R) -> Self {
        let world = GridWorld::generate(config.grid_size, config.obstacle_count, rng);
        Round::with_world(world, config)
    }

    pub fn with_world(world: GridWorld, config: &RoundConfig) -> Self {
        let player = LightCycle::new(config.player_spawn(), Heading::Up, config.player_trail_length);
        let pursuer = LightCycle::new(config.pursuer_spawn(), Heading::Down, config.pursuer_trail_length);
        Round::with_cycles(world, player, pursuer, PursuitAi::new(config.pursuit_depth))
    }

    pub fn with_cycles(world: GridWorld, player: LightCycle, pursuer: LightCycle, ai: PursuitAi) -> Self {
        Round {
            world,
            player,
            pursuer,
            ai,
            ticks: 0,
        }
    }

    pub fn world(&self) -> &GridWorld {
        &self.world
    }

    #[cfg(test)]
    pub fn player(&self) -> &LightCycle {
        &self.player
    }

    #[cfg(test)]
    pub fn pursuer(&self) -> &LightCycle {
        &self.pursuer
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advance both cycles by one cell.
    ///
    /// `requested` is the player's sticky key; reversals are ignored for both
    /// cycles. Nothing is committed unless both cycles survive the boundary check
    /// and then the collision check, which run against the trails as they were
    /// before this tick.
    pub fn tick(&mut self, requested: Option<Heading>) -> TickResult {
        self.ticks += 1;

        if let Some(heading) = requested {
            self.player.steer(heading);
        }

        let pursuit = {
            let blocked: [&dyn CellSet; 3] = [self.player.trail(), self.pursuer.trail(), &self.world];
            self.ai.choose_heading(self.pursuer.pos(), self.player.pos(), self.world.size(), &blocked)
        };
        self.pursuer.steer(pursuit);

        let player_next = self.player.advance(self.player.heading());
        let pursuer_next = self.pursuer.advance(self.pursuer.heading());

        let outcome = Outcome::from_checks(
            self.world.is_out_of_bounds(player_next),
            self.world.is_out_of_bounds(pursuer_next),
            LossCause::OutOfBounds,
        )
        .or_else(|| {
            let blocked: [&dyn CellSet; 3] = [self.player.trail(), self.pursuer.trail(), &self.world];
            let head_on = player_next == pursuer_next;
            Outcome::from_checks(
                head_on || is_blocked(player_next, &blocked),
                head_on || is_blocked(pursuer_next, &blocked),
                LossCause::Collision,
            )
        });

        if let Some(outcome) = outcome {
            if outcome.player.is_some() {
                self.player.crash_at(player_next);
            }
            if outcome.pursuer.is_some() {
                self.pursuer.crash_at(pursuer_next);
            }
            return TickResult::RoundOver(outcome);
        }

        self.player.commit(player_next);
        self.pursuer.commit(pursuer_next);
        TickResult::Continue
    }

    pub fn snapshot(&self, elapsed: Duration, delay: Duration) -> Snapshot<'_> {
        Snapshot {
            world: &self.world,
            player: &self.player,
            pursuer: &self.pursuer,
            tick: self.ticks,
            elapsed,
            delay,
        }
    }
}

// Input delivered by the InputSource between ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Steer(Heading),  // Most recent navigational key
    Interrupt,       // Ctrl+C
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Play,
    Quit,
}

/// Non-blocking source of the most recent key, if any
pub trait InputSource {
    fn poll(&mut self) -> Result<Option<InputEvent>>;
}

/// Blocks until the user decides at the menu
pub trait MenuController {
    fn choose(&mut self) -> Result<MenuChoice>;
}

/// Draws frames; must never mutate what it is shown
pub trait Renderer {
    /// Whether a `grid_size` board fits the output surface right now
    fn fits(&mut self, grid_size: i32) -> Result<bool>;
    fn draw_menu(&mut self) -> Result<()>;
    fn draw_too_small(&mut self, grid_size: i32) -> Result<()>;
    fn draw(&mut self, snapshot: &Snapshot<'_>) -> Result<()>;
    fn draw_round_over(&mut self, snapshot: &Snapshot<'_>, outcome: &Outcome) -> Result<()>;
}

/// Owns the collaborators and runs rounds until the user quits
pub struct GameLoop<R, I, M> {
    renderer: R,
    input: I,
    menu: M,
    config: RoundConfig,
    rng: StdRng,
    phase: Phase,
}

impl<R: Renderer, I: InputSource, M: MenuController> GameLoop<R, I, M> {
    pub fn new(renderer: R, input: I, menu: M, config: RoundConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        GameLoop {
            renderer,
            input,
            menu,
            config,
            rng,
            phase: Phase::Menu,
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[cfg(test)]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Drive MENU -> PLAYING -> ROUND_OVER -> MENU until quit or interrupt
    pub async fn run(&mut self) -> Result<ExitReason> {
        loop {
            match self.phase {
                Phase::Menu => {
                    self.renderer.draw_menu()?;
                    self.phase = match self.menu.choose()? {
                        MenuChoice::Play => Phase::Playing,
                        MenuChoice::Quit => Phase::Terminated,
                    };
                }
                Phase::Playing => {
                    let round = Round::generate(&self.config, &mut self.rng);
                    match self.play_round(round).await? {
                        Some(()) => self.phase = Phase::RoundOver,
                        None => {
                            self.phase = Phase::Terminated;
                            return Ok(ExitReason::Interrupted);
                        }
                    }
                }
                Phase::RoundOver => {
                    tokio::time::sleep(self.config.round_over_pause).await;
                    self.phase = Phase::Menu;
                }
                Phase::Terminated => return Ok(ExitReason::MenuQuit),
            }
        }
    }

    // Returns None when the user interrupted mid-round
    async fn play_round(&mut self, mut round: Round) -> Result<Option<()>> {
        let started = Instant::now();
        let mut last_key: Option<Heading> = None;
        let size = self.config.grid_size;
        info!(
            "Round started: {}x{} grid, {} obstacle cells",
            size,
            size,
            round.world().obstacles().len()
        );

        loop {
            let tick_start = Instant::now();

            if !self.renderer.fits(size)? {
                self.renderer.draw_too_small(size)?;
                tokio::time::sleep(self.config.resize_retry).await;
                continue;
            }

            match self.input.poll()? {
                Some(InputEvent::Steer(heading)) => last_key = Some(heading),
                Some(InputEvent::Interrupt) => {
                    info!("Round interrupted after {} ticks", round.ticks());
                    return Ok(None);
                }
                None => {}
            }

            let result = round.tick(last_key);
            let elapsed = started.elapsed();
            let delay = self.config.speed.delay(elapsed);

            match result {
                TickResult::Continue => {
                    self.renderer.draw(&round.snapshot(elapsed, delay))?;
                    let budget = self.config.speed.sleep_budget(elapsed, tick_start.elapsed());
                    debug!("Tick {} delay {:?} sleep {:?}", round.ticks(), delay, budget);
                    tokio::time::sleep(budget).await;
                }
                TickResult::RoundOver(outcome) => {
                    info!(
                        "Round over after {} ticks ({:.1}s): {:?} wins, player {:?}, pursuer {:?}",
                        round.ticks(),
                        elapsed.as_secs_f64(),
                        outcome.winner(),
                        outcome.player,
                        outcome.pursuer
                    );
                    self.renderer.draw_round_over(&round.snapshot(elapsed, delay), &outcome)?;
                    return Ok(Some(()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::ObstacleShape;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    fn test_config(grid_size: i32) -> RoundConfig {
        RoundConfig {
            grid_size,
            player_trail_length: 20,
            pursuer_trail_length: 30,
            obstacle_count: 0,
            pursuit_depth: 3,
            speed: SpeedRamp::from_millis(1, 1, 0),
            round_over_pause: Duration::ZERO,
            resize_retry: Duration::from_millis(1),
            seed: Some(42),
        }
    }

    fn run_to_end(round: &mut Round, key: Option<Heading>, limit: u64) -> Outcome {
        for _ in 0..limit {
            if let TickResult::RoundOver(outcome) = round.tick(key) {
                return outcome;
            }
        }
        panic!("round did not end within {} ticks", limit);
    }

    #[test]
    fn test_head_to_head_on_empty_even_grid() {
        for size in [8, 10, 12, 16, 32] {
            let config = test_config(size);
            let mut round = Round::with_world(GridWorld::new(size), &config);
            let outcome = run_to_end(&mut round, None, 1000);

            assert_eq!(round.ticks(), (size as u64 - 2) / 2, "grid {}", size);
            assert_eq!(outcome.player, Some(LossCause::Collision), "grid {}", size);
            assert_eq!(outcome.pursuer, None, "grid {}", size);
            assert_eq!(outcome.winner(), Winner::Pursuer);

            // The fatal cell is reported but never recorded
            let fatal = round.player().pos();
            assert!(round.pursuer().trail().contains(fatal));
            assert!(!round.player().trail().contains(fatal));
        }
    }

    #[test]
    fn test_reversal_request_is_ignored() {
        let config = test_config(16);
        let mut round = Round::with_world(GridWorld::new(16), &config);
        let start = round.player().pos();

        assert_eq!(round.tick(Some(Heading::Down)), TickResult::Continue);
        assert_eq!(round.player().heading(), Heading::Up);
        assert_eq!(round.player().pos(), Position::new(start.x, start.y - 1));
    }

    #[test]
    fn test_sticky_turn_is_applied() {
        let config = test_config(16);
        let mut round = Round::with_world(GridWorld::new(16), &config);
        let start = round.player().pos();

        round.tick(Some(Heading::Left));
        round.tick(Some(Heading::Left));
        assert_eq!(round.player().heading(), Heading::Left);
        assert_eq!(round.player().pos(), Position::new(start.x - 2, start.y));
        assert_eq!(round.player().trail().len(), 2);
    }

    #[test]
    fn test_boundary_loss_skips_trail_update() {
        let player = LightCycle::new(Position::new(1, 5), Heading::Left, 10);
        let pursuer = LightCycle::new(Position::new(8, 1), Heading::Down, 10);
        let mut round = Round::with_cycles(GridWorld::new(10), player, pursuer, PursuitAi::default());

        let outcome = run_to_end(&mut round, None, 1);
        assert_eq!(outcome.player, Some(LossCause::OutOfBounds));
        assert_eq!(outcome.pursuer, None);
        assert_eq!(round.player().pos(), Position::new(0, 5));
        assert!(round.player().trail().is_empty());
        assert!(round.pursuer().trail().is_empty());
        assert_eq!(round.pursuer().pos(), Position::new(8, 1));
    }

    // Pursuer at (2,1) facing the top wall, sealed in by obstacles: no candidate has a
    // path, the Down fallback is a reversal, so it keeps going Up into the wall
    fn boxed_pursuer() -> (GridWorld, LightCycle) {
        let mut world = GridWorld::new(10);
        world.stamp(ObstacleShape::Vertical, Position::new(1, 2));
        world.stamp(ObstacleShape::Vertical, Position::new(3, 1));
        world.stamp(ObstacleShape::Horizontal, Position::new(2, 2));
        (world, LightCycle::new(Position::new(2, 1), Heading::Up, 10))
    }

    #[test]
    fn test_pursuer_boundary_loss_is_player_win() {
        let (world, pursuer) = boxed_pursuer();
        let player = LightCycle::new(Position::new(5, 5), Heading::Up, 10);
        let mut round = Round::with_cycles(world, player, pursuer, PursuitAi::default());

        let outcome = run_to_end(&mut round, None, 1);
        assert_eq!(outcome.pursuer, Some(LossCause::OutOfBounds));
        assert_eq!(outcome.player, None);
        assert_eq!(outcome.winner(), Winner::Player);
        assert_eq!(round.pursuer().pos(), Position::new(2, 0));
    }

    #[test]
    fn test_both_out_of_bounds_is_draw() {
        let (world, pursuer) = boxed_pursuer();
        let player = LightCycle::new(Position::new(1, 5), Heading::Left, 10);
        let mut round = Round::with_cycles(world, player, pursuer, PursuitAi::default());

        let outcome = run_to_end(&mut round, None, 1);
        assert_eq!(outcome.player, Some(LossCause::OutOfBounds));
        assert_eq!(outcome.pursuer, Some(LossCause::OutOfBounds));
        assert_eq!(outcome.winner(), Winner::Draw);
    }

    #[test]
    fn test_pursuer_with_two_cell_trail_turns_instead_of_reversing() {
        // Heading down at (5,6) with a wall of obstacles below; the previous cell is still on the trail
        let mut world = GridWorld::new(12);
        world.stamp(ObstacleShape::Vertical, Position::new(5, 7));
        let mut pursuer = LightCycle::new(Position::new(5, 4), Heading::Down, 2);
        pursuer.commit(Position::new(5, 5));
        pursuer.commit(Position::new(5, 6));
        let player = LightCycle::new(Position::new(2, 9), Heading::Up, 10);
        let mut round = Round::with_cycles(world, player, pursuer, PursuitAi::default());

        assert_eq!(round.tick(None), TickResult::Continue);
        assert_eq!(round.pursuer().heading(), Heading::Left);
        assert_eq!(round.pursuer().pos(), Position::new(4, 6));
    }

    #[test]
    fn test_obstacle_collision() {
        let mut world = GridWorld::new(16);
        world.stamp(ObstacleShape::Horizontal, Position::new(7, 13));
        let config = test_config(16);
        let mut round = Round::with_world(world, &config);

        let outcome = run_to_end(&mut round, None, 1);
        assert_eq!(outcome.player, Some(LossCause::Collision));
        assert_eq!(round.player().pos(), Position::new(8, 13));
    }

    #[test]
    fn test_head_on_into_same_cell_is_draw() {
        let player = LightCycle::new(Position::new(5, 5), Heading::Up, 10);
        let pursuer = LightCycle::new(Position::new(5, 3), Heading::Down, 10);
        let mut round = Round::with_cycles(GridWorld::new(10), player, pursuer, PursuitAi::default());

        let outcome = run_to_end(&mut round, None, 1);
        assert_eq!(outcome.player, Some(LossCause::Collision));
        assert_eq!(outcome.pursuer, Some(LossCause::Collision));
        assert_eq!(round.player().pos(), Position::new(5, 4));
        assert_eq!(round.pursuer().pos(), Position::new(5, 4));
    }

    proptest! {
        #[test]
        fn rounds_keep_trail_bounds_and_always_resolve(
            seed in any::<u64>(),
            keys in prop::collection::vec(0u8..5, 1..300),
        ) {
            let mut config = test_config(16);
            config.obstacle_count = 8;
            config.player_trail_length = 5;
            config.pursuer_trail_length = 7;
            let mut rng = StdRng::seed_from_u64(seed);
            let mut round = Round::generate(&config, &mut rng);

            for key in keys {
                let requested = match key {
                    0 => None,
                    1 => Some(Heading::Up),
                    2 => Some(Heading::Down),
                    3 => Some(Heading::Left),
                    _ => Some(Heading::Right),
                };
                let result = round.tick(requested);
                prop_assert!(round.player().trail().len() <= 5);
                prop_assert!(round.pursuer().trail().len() <= 7);
                if let TickResult::RoundOver(outcome) = result {
                    prop_assert!(outcome.player.is_some() || outcome.pursuer.is_some());
                    break;
                }
                prop_assert!(!round.world().is_out_of_bounds(round.player().pos()));
                prop_assert!(!round.world().is_out_of_bounds(round.pursuer().pos()));
            }
        }
    }

    // Scripted collaborators for driving the whole loop

    #[derive(Default)]
    struct RecordingRenderer {
        menus: usize,
        frames: usize,
        too_small: usize,
        unfit_checks: usize,  // Number of fits() calls that report a small terminal
        outcomes: Vec<Outcome>,
    }

    impl Renderer for RecordingRenderer {
        fn fits(&mut self, _grid_size: i32) -> Result<bool> {
            if self.unfit_checks > 0 {
                self.unfit_checks -= 1;
                return Ok(false);
            }
            Ok(true)
        }

        fn draw_menu(&mut self) -> Result<()> {
            self.menus += 1;
            Ok(())
        }

        fn draw_too_small(&mut self, _grid_size: i32) -> Result<()> {
            self.too_small += 1;
            Ok(())
        }

        fn draw(&mut self, snapshot: &Snapshot<'_>) -> Result<()> {
            assert!(snapshot.player.trail().len() <= snapshot.player.trail().capacity());
            self.frames += 1;
            Ok(())
        }

        fn draw_round_over(&mut self, _snapshot: &Snapshot<'_>, outcome: &Outcome) -> Result<()> {
            self.outcomes.push(*outcome);
            Ok(())
        }
    }

    struct ScriptedInput(VecDeque<Option<InputEvent>>);

    impl InputSource for ScriptedInput {
        fn poll(&mut self) -> Result<Option<InputEvent>> {
            Ok(self.0.pop_front().flatten())
        }
    }

    struct ScriptedMenu(VecDeque<MenuChoice>);

    impl MenuController for ScriptedMenu {
        fn choose(&mut self) -> Result<MenuChoice> {
            Ok(self.0.pop_front().unwrap_or(MenuChoice::Quit))
        }
    }

    fn scripted_loop(
        renderer: RecordingRenderer,
        input: Vec<Option<InputEvent>>,
        menu: Vec<MenuChoice>,
    ) -> GameLoop<RecordingRenderer, ScriptedInput, ScriptedMenu> {
        GameLoop::new(
            renderer,
            ScriptedInput(input.into()),
            ScriptedMenu(menu.into()),
            test_config(10),
        )
    }

    #[tokio::test]
    async fn test_loop_plays_rounds_until_quit() {
        let mut game = scripted_loop(
            RecordingRenderer::default(),
            Vec::new(),
            vec![MenuChoice::Play, MenuChoice::Play, MenuChoice::Quit],
        );

        let reason = game.run().await.unwrap();
        assert_eq!(reason, ExitReason::MenuQuit);
        assert_eq!(game.phase(), Phase::Terminated);

        let renderer = game.renderer();
        assert_eq!(renderer.menus, 3);
        assert_eq!(renderer.outcomes.len(), 2);
        assert!(renderer.outcomes.iter().all(|o| o.winner() == Winner::Pursuer));
        assert_eq!(renderer.frames, 2 * 3); // 4 ticks per round on a 10x10 board, the last one ends it
    }

    #[tokio::test]
    async fn test_loop_stops_on_interrupt() {
        let mut game = scripted_loop(
            RecordingRenderer::default(),
            vec![None, Some(InputEvent::Interrupt)],
            vec![MenuChoice::Play],
        );

        let reason = game.run().await.unwrap();
        assert_eq!(reason, ExitReason::Interrupted);
        assert_eq!(game.phase(), Phase::Terminated);
        assert_eq!(game.renderer().frames, 1);
        assert!(game.renderer().outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_loop_waits_while_terminal_too_small() {
        let renderer = RecordingRenderer {
            unfit_checks: 2,
            ..Default::default()
        };
        let mut game = scripted_loop(renderer, Vec::new(), vec![MenuChoice::Play]);

        game.run().await.unwrap();
        assert_eq!(game.renderer().too_small, 2);
        assert_eq!(game.renderer().outcomes.len(), 1);
    }

    #[tokio::test]
    async fn test_player_turn_reaches_the_round() {
        // Turning left on the first tick avoids the meeting in the middle
        let mut game = scripted_loop(
            RecordingRenderer::default(),
            vec![Some(InputEvent::Steer(Heading::Left))],
            vec![MenuChoice::Play],
        );

        game.run().await.unwrap();
        let renderer = game.renderer();
        assert_eq!(renderer.outcomes.len(), 1);
        assert_eq!(renderer.outcomes[0].player, Some(LossCause::OutOfBounds));
        assert_eq!(renderer.frames, 4); // runs left along the bottom row into the side wall
    }
}
