use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::constants::{
    ACTION_POINTS_PER_TURN, LOST_VICTIMS_TO_LOSE, MAX_STRUCTURAL_DAMAGE, RESCUES_TO_WIN,
};
use crate::error::CommandError;
use crate::rng::Rng;
use crate::types::{
    Cell, Direction, FireState, FirefighterId, FirefighterView, GameEvent, GameStateView,
    GridCellView, Outcome, Phase, PoiCounts, PoiId, PoiKind, PoiReport, PoiView, Role,
    StepReport, WallCellView, WallKind,
};
use crate::world::GridWorld;

mod agent_system;
mod fire_system;
pub mod pathfinding;
mod poi_system;
mod role_system;
#[cfg(test)]
mod test_support;
mod utils;

pub use self::poi_system::{ActivePoi, Poi, PoiFate, PoiLedger, PoiLocation};
pub use self::role_system::plan_rescuers;

#[derive(Clone, Debug)]
struct Firefighter {
    id: FirefighterId,
    pos: Cell,
    action_points: u8,
    // Points spent since the start of the firefighter's latest turn.
    spent: u8,
    role: Role,
    target: Option<PoiId>,
    carrying: Option<PoiId>,
    knockout_timer: u8,
    // Cached route; `path[0]` is the current cell while it is valid.
    path: Vec<Cell>,
}

impl Firefighter {
    fn new(id: FirefighterId, pos: Cell) -> Self {
        Self {
            id,
            pos,
            action_points: ACTION_POINTS_PER_TURN,
            spent: 0,
            role: Role::None,
            target: None,
            carrying: None,
            knockout_timer: 0,
            path: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GameEngine {
    config: GameConfig,
    seed: u32,
    world: GridWorld,
    rng: Rng,
    pois: PoiLedger,
    firefighters: Vec<Firefighter>,
    events: Vec<GameEvent>,

    phase: Phase,
    current_agent: usize,
    round_count: u64,
    step_count: u64,
    damage_count: u32,
    outcome: Option<Outcome>,
    end_reason: String,
}

impl GameEngine {
    pub fn new(config: GameConfig, seed: u32) -> Self {
        let mut rng = Rng::new(seed);
        let mut world = GridWorld::from_layout(&config.layout);
        let mut pois = PoiLedger::new_shuffled(&mut rng);
        let placed = pois.place_initial(&world, &mut rng);

        for cell in &config.initial_fires {
            world.set_fire_state(*cell, FireState::Fire);
        }

        let spawn_cells: Vec<Cell> = world
            .cells()
            .filter(|cell| world.fire_state(*cell) == Some(FireState::Clear) && pois.is_free(*cell))
            .collect();
        let firefighters = rng
            .sample(&spawn_cells, config.firefighter_count)
            .into_iter()
            .enumerate()
            .map(|(id, cell)| Firefighter::new(id, cell))
            .collect();

        let mut engine = Self {
            config,
            seed,
            world,
            rng,
            pois,
            firefighters,
            events: Vec::new(),
            phase: Phase::Agent,
            current_agent: 0,
            round_count: 0,
            step_count: 0,
            damage_count: 0,
            outcome: None,
            end_reason: String::new(),
        };
        for (poi, cell) in placed {
            engine.events.push(GameEvent::PoiPlaced {
                poi,
                x: cell.x,
                y: cell.y,
            });
        }
        engine.assign_roles();
        debug!(
            seed,
            firefighters = engine.firefighters.len(),
            "game initialized"
        );
        engine
    }

    pub fn reset(&mut self, seed: u32) {
        let config = self.config.clone();
        *self = Self::new(config, seed);
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn world(&self) -> &GridWorld {
        &self.world
    }

    pub fn pois(&self) -> &PoiLedger {
        &self.pois
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn damage_count(&self) -> u32 {
        self.damage_count
    }

    pub fn step(&mut self) -> StepReport {
        if self.is_over() {
            return self.build_step_report(self.phase, false, "game is over".to_string());
        }

        let ran = self.phase;
        let message = match ran {
            Phase::Agent => self.run_agent_phase(),
            Phase::Fire => self.run_fire_phase(),
        };
        self.step_count += 1;
        self.build_step_report(ran, true, message)
    }

    fn run_agent_phase(&mut self) -> String {
        if self.firefighters.is_empty() {
            self.phase = Phase::Fire;
            return "no firefighters to move".to_string();
        }
        let idx = self.current_agent % self.firefighters.len();
        self.run_agent_turn(idx);
        self.current_agent = (idx + 1) % self.firefighters.len();
        self.phase = Phase::Fire;
        format!("firefighter {idx} finished its turn")
    }

    fn run_fire_phase(&mut self) -> String {
        debug!(round = self.round_count, "fire phase");
        self.spread_once();
        let mut lost = Vec::new();
        if !self.is_over() {
            self.smoke_to_fire_cascade();
            lost = self.check_pois_in_danger();
            if !lost.is_empty() {
                self.assign_roles();
            }
        }
        self.round_count += 1;
        self.phase = Phase::Agent;
        if lost.is_empty() {
            format!("fire spread (round {})", self.round_count)
        } else {
            format!(
                "fire spread (round {}), {} POI(s) lost",
                self.round_count,
                lost.len()
            )
        }
    }

    fn build_step_report(&mut self, phase: Phase, advanced: bool, message: String) -> StepReport {
        StepReport {
            message,
            step: self.step_count,
            phase,
            advanced,
            fires: self.fires(),
            agents: self.firefighters(),
            events: self.drain_events(),
        }
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    fn damage_wall(&mut self, cell: Cell, direction: Direction) -> bool {
        let hit = self.world.damage_wall(cell, direction);
        if hit.damaged {
            self.damage_count += 1;
            self.events.push(GameEvent::WallDamaged {
                x: cell.x,
                y: cell.y,
                direction,
                wall: self.world.wall(cell, direction).unwrap_or(WallKind::None),
                damage_count: self.damage_count,
            });
            self.check_damage_loss();
        }
        hit.passable
    }

    fn check_damage_loss(&mut self) {
        if self.damage_count > MAX_STRUCTURAL_DAMAGE {
            let reason = format!(
                "Defeat: structural damage reached {} (limit {})",
                self.damage_count, MAX_STRUCTURAL_DAMAGE
            );
            self.end_game(Outcome::Lost, reason);
        }
    }

    fn check_lost_victims(&mut self) {
        let lost = self.pois.lost_count();
        if lost >= LOST_VICTIMS_TO_LOSE {
            self.end_game(Outcome::Lost, format!("Defeat: {lost} victims lost to fire"));
        }
    }

    fn check_win(&mut self) {
        let rescued = self.pois.rescued_count();
        if rescued >= RESCUES_TO_WIN {
            self.end_game(Outcome::Won, format!("Victory: {rescued} victims rescued"));
        }
    }

    fn end_game(&mut self, outcome: Outcome, reason: String) {
        if self.outcome.is_some() {
            return;
        }
        info!(
            ?outcome,
            %reason,
            rescued = self.pois.rescued_count(),
            lost = self.pois.lost_count(),
            damage = self.damage_count,
            rounds = self.round_count,
            "game over"
        );
        self.outcome = Some(outcome);
        self.end_reason = reason.clone();
        self.events.push(GameEvent::GameOver { outcome, reason });
    }

    pub fn reveal_at(&mut self, cell: Cell) -> Result<PoiReport, CommandError> {
        let result = self.reveal_command(cell);
        if let Err(error) = &result {
            warn!(%error, x = cell.x, y = cell.y, "reveal rejected");
        }
        result
    }

    fn reveal_command(&mut self, cell: Cell) -> Result<PoiReport, CommandError> {
        if !self.world.in_bounds(cell) {
            return Err(CommandError::out_of_bounds(cell));
        }
        if self.is_over() {
            return Err(CommandError::GameOver);
        }
        let Some(active) = self.pois.at(cell).copied() else {
            return Err(CommandError::no_poi(cell));
        };
        if active.poi.revealed {
            return Err(CommandError::already_revealed(cell));
        }

        self.reveal_poi_at(cell);
        let message = match active.poi.kind {
            PoiKind::Victim => "victim found".to_string(),
            PoiKind::FalseAlarm => "false alarm".to_string(),
        };
        Ok(PoiReport {
            success: true,
            poi_type: active.poi.kind,
            was_revealed: false,
            destroyed: false,
            message,
        })
    }

    pub fn check_and_resolve_fire_at_poi(&mut self, cell: Cell) -> Result<PoiReport, CommandError> {
        let result = self.fire_check_command(cell);
        if let Err(error) = &result {
            warn!(%error, x = cell.x, y = cell.y, "fire check rejected");
        }
        result
    }

    fn fire_check_command(&mut self, cell: Cell) -> Result<PoiReport, CommandError> {
        if !self.world.in_bounds(cell) {
            return Err(CommandError::out_of_bounds(cell));
        }
        let Some(active) = self.pois.at(cell).copied() else {
            return Err(CommandError::no_poi(cell));
        };
        let poi = active.poi;
        let untouched = if self.is_over() {
            Some("game is over")
        } else if !self.world.is_on_fire(cell) {
            Some("POI is not on fire")
        } else {
            None
        };
        if let Some(message) = untouched {
            return Ok(PoiReport {
                success: false,
                poi_type: poi.kind,
                was_revealed: poi.revealed,
                destroyed: false,
                message: message.to_string(),
            });
        }

        self.burn_poi(poi, cell);
        self.check_lost_victims();
        let message = match poi.kind {
            PoiKind::Victim => "victim lost to fire".to_string(),
            PoiKind::FalseAlarm => "false alarm destroyed by fire".to_string(),
        };
        Ok(PoiReport {
            success: true,
            poi_type: poi.kind,
            was_revealed: poi.revealed,
            destroyed: true,
            message,
        })
    }

    pub fn fires(&self) -> Vec<GridCellView> {
        self.world
            .cells_in_state(FireState::Fire)
            .into_iter()
            .map(GridCellView::from)
            .collect()
    }

    pub fn smoke(&self) -> Vec<GridCellView> {
        self.world
            .cells_in_state(FireState::Smoke)
            .into_iter()
            .map(GridCellView::from)
            .collect()
    }

    pub fn walls(&self) -> Vec<WallCellView> {
        self.world.wall_views()
    }

    pub fn poi_views(&self) -> Vec<PoiView> {
        self.pois
            .placed()
            .map(|(poi, cell)| poi_view(poi, cell))
            .collect()
    }

    pub fn firefighters(&self) -> Vec<FirefighterView> {
        self.firefighters
            .iter()
            .map(|ff| FirefighterView {
                id: ff.id,
                x: ff.pos.x,
                y: ff.pos.y,
                role: ff.role,
                knocked_out: ff.knockout_timer > 0,
                is_carrying_victim: ff.carrying.is_some(),
                target_poi: ff.target.and_then(|id| {
                    let active = self.pois.get(id)?;
                    Some(poi_view(active.poi, active.cell()?))
                }),
                action_points: ff.action_points,
                action_points_spent: ff.spent,
                knockout_timer: ff.knockout_timer,
            })
            .collect()
    }

    pub fn game_state(&self) -> GameStateView {
        GameStateView {
            phase: self.phase,
            current_agent: self.current_agent,
            damage_count: self.damage_count,
            round_count: self.round_count,
            step: self.step_count,
            game_over: self.is_over(),
            game_won: self.outcome == Some(Outcome::Won),
            outcome: self.outcome,
            end_reason: self.end_reason.clone(),
            rescued: self.pois.rescued_count(),
            lost: self.pois.lost_count(),
        }
    }

    pub fn poi_counts(&self) -> PoiCounts {
        self.pois.counts()
    }
}

fn poi_view(poi: Poi, cell: Cell) -> PoiView {
    PoiView {
        id: poi.id,
        x: cell.x,
        y: cell.y,
        kind: poi.kind,
        revealed: poi.revealed,
    }
}
