use super::pathfinding::find_path;
use super::utils::nearest;
use super::*;
use crate::constants::KNOCKOUT_TURNS;

impl GameEngine {
    pub(super) fn run_agent_turn(&mut self, idx: usize) {
        let Some(ff) = self.firefighters.get_mut(idx) else {
            return;
        };
        ff.action_points = ACTION_POINTS_PER_TURN;
        ff.spent = 0;
        if ff.knockout_timer > 0 {
            ff.knockout_timer -= 1;
            let knockout_timer = ff.knockout_timer;
            self.events.push(GameEvent::TurnSkipped {
                firefighter: idx,
                knockout_timer,
            });
            return;
        }

        let role = ff.role;
        self.events.push(GameEvent::TurnStarted {
            firefighter: idx,
            role,
        });
        match role {
            Role::Rescuer => self.rescuer_turn(idx),
            Role::Extinguisher => self.extinguisher_turn(idx),
            Role::None => {}
        }
        self.knock_out_if_burning(idx);
    }

    fn rescuer_turn(&mut self, idx: usize) {
        if let Some(poi) = self.firefighters[idx].carrying {
            let pos = self.firefighters[idx].pos;
            let Some(exit) = nearest(pos, self.config.exits.iter().copied()) else {
                return;
            };
            self.advance_towards(idx, exit);
            if self.firefighters[idx].pos == exit && !self.is_over() {
                self.deliver_victim(idx, poi);
            }
            return;
        }

        let Some(target) = self.firefighters[idx].target else {
            return;
        };
        let Some(cell) = self.pois.get(target).and_then(ActivePoi::cell) else {
            self.firefighters[idx].target = None;
            return;
        };
        self.advance_towards(idx, cell);
        let ff = &self.firefighters[idx];
        if ff.pos == cell && ff.action_points > 0 && !self.is_over() {
            self.reveal_target(idx, target, cell);
        }
    }

    fn extinguisher_turn(&mut self, idx: usize) {
        while self.firefighters[idx].action_points > 0 && !self.is_over() {
            let pos = self.firefighters[idx].pos;
            let burning = self.world.cells().filter(|cell| {
                matches!(
                    self.world.fire_state(*cell),
                    Some(FireState::Fire | FireState::Smoke)
                )
            });
            let Some(target) = nearest(pos, burning) else {
                break;
            };
            if pos == target {
                self.extinguish(idx, target);
            } else if !self.move_towards(idx, target) {
                break;
            }
        }
    }

    fn advance_towards(&mut self, idx: usize, goal: Cell) {
        while self.firefighters[idx].action_points > 0
            && self.firefighters[idx].pos != goal
            && !self.is_over()
        {
            if !self.move_towards(idx, goal) {
                break;
            }
        }
    }

    pub(super) fn move_towards(&mut self, idx: usize, target: Cell) -> bool {
        let ff = &self.firefighters[idx];
        let pos = ff.pos;
        if ff.action_points == 0 || pos == target {
            return false;
        }
        if ff.path.first() != Some(&pos) || ff.path.last() != Some(&target) {
            let path = find_path(&self.world, pos, target);
            self.firefighters[idx].path = path;
        }

        let Some(&next) = self.firefighters[idx].path.get(1) else {
            return false;
        };
        let Some(direction) = Direction::between(pos, next) else {
            self.firefighters[idx].path.clear();
            return false;
        };
        let Some(wall) = self.world.wall(pos, direction) else {
            return false;
        };
        if self.firefighters[idx].action_points < wall.step_cost() {
            return false;
        }

        match wall {
            WallKind::Intact => {
                self.chop_wall(idx, direction);
                true
            }
            WallKind::Damaged => {
                self.chop_wall(idx, direction);
                self.step_to(idx, next, 1)
            }
            WallKind::ClosedDoor => {
                self.spend(idx, 1);
                if self.world.open_door(pos, direction) {
                    self.events.push(GameEvent::DoorOpened {
                        x: pos.x,
                        y: pos.y,
                        direction,
                    });
                }
                true
            }
            WallKind::None | WallKind::OpenDoor => self.step_to(idx, next, wall.step_cost()),
        }
    }

    fn step_to(&mut self, idx: usize, next: Cell, cost: u8) -> bool {
        let occupied = self
            .firefighters
            .iter()
            .any(|other| other.id != idx && other.pos == next);
        if occupied {
            self.firefighters[idx].path.clear();
            return false;
        }
        self.spend(idx, cost);
        let ff = &mut self.firefighters[idx];
        ff.pos = next;
        if !ff.path.is_empty() {
            ff.path.remove(0);
        }
        self.events.push(GameEvent::Moved {
            firefighter: idx,
            x: next.x,
            y: next.y,
        });
        true
    }

    fn chop_wall(&mut self, idx: usize, direction: Direction) {
        self.spend(idx, 1);
        let pos = self.firefighters[idx].pos;
        self.damage_wall(pos, direction);
    }

    // Fire takes two points to clear outright; with one point left it is
    // knocked down to smoke.
    fn extinguish(&mut self, idx: usize, cell: Cell) {
        let points = self.firefighters[idx].action_points;
        let (cost, state) = match (self.world.fire_state(cell), points) {
            (Some(FireState::Fire), 2..) => (2, FireState::Clear),
            (Some(FireState::Fire), 1) => (1, FireState::Smoke),
            (Some(FireState::Smoke), 1..) => (1, FireState::Clear),
            _ => return,
        };
        self.spend(idx, cost);
        self.world.set_fire_state(cell, state);
        self.events.push(GameEvent::Extinguished {
            firefighter: idx,
            row: cell.y,
            col: cell.x,
            state,
        });
    }

    fn reveal_target(&mut self, idx: usize, target: PoiId, cell: Cell) {
        self.spend(idx, 1);
        self.firefighters[idx].target = None;
        self.reveal_poi_at(cell);
        // A false alarm is gone by now; a victim revealed earlier is still taken.
        let Some(active) = self.pois.get(target).copied() else {
            return;
        };
        if active.cell() == Some(cell) && active.poi.kind == PoiKind::Victim {
            self.pick_up(idx, target);
        }
    }

    fn pick_up(&mut self, idx: usize, poi: PoiId) {
        if !self.pois.pick_up(poi, idx) {
            return;
        }
        let ff = &mut self.firefighters[idx];
        ff.carrying = Some(poi);
        ff.role = Role::Rescuer;
        ff.target = None;
        ff.path.clear();
        debug!(firefighter = idx, poi, "victim picked up");
        self.events.push(GameEvent::VictimPickedUp {
            firefighter: idx,
            poi,
        });
        self.assign_roles();
    }

    fn deliver_victim(&mut self, idx: usize, poi: PoiId) {
        self.firefighters[idx].carrying = None;
        self.firefighters[idx].path.clear();
        if self.pois.retire(poi, PoiFate::Rescued).is_none() {
            return;
        }
        let rescued = self.pois.rescued_count();
        info!(firefighter = idx, poi, rescued, "victim rescued");
        self.events.push(GameEvent::VictimRescued {
            firefighter: idx,
            poi,
            rescued,
        });
        self.check_win();
        self.place_new_poi();
    }

    fn knock_out_if_burning(&mut self, idx: usize) {
        let ff = &mut self.firefighters[idx];
        if !self.world.is_on_fire(ff.pos) {
            return;
        }
        ff.knockout_timer = KNOCKOUT_TURNS;
        ff.path.clear();
        let pos = ff.pos;
        debug!(firefighter = idx, x = pos.x, y = pos.y, "firefighter knocked out");
        self.events.push(GameEvent::KnockedOut {
            firefighter: idx,
            x: pos.x,
            y: pos.y,
        });
    }

    fn spend(&mut self, idx: usize, cost: u8) {
        let ff = &mut self.firefighters[idx];
        debug_assert!(ff.action_points >= cost, "overspent action points");
        ff.action_points = ff.action_points.saturating_sub(cost);
        ff.spent = ff.spent.saturating_add(cost);
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{add_firefighter, open_config, place_poi, quiet_engine};
    use super::*;

    #[test]
    fn rescuer_chops_through_intact_wall_and_picks_up() {
        let mut engine = quiet_engine(open_config(3, 1));
        let ff = add_firefighter(&mut engine, Cell::new(0, 0));
        engine.world.set_wall(Cell::new(0, 0), Direction::East, WallKind::Intact);
        let victim = place_poi(&mut engine, PoiKind::Victim, Cell::new(1, 0));
        engine.assign_roles();

        engine.run_agent_turn(ff);

        let state = &engine.firefighters[ff];
        assert_eq!(state.pos, Cell::new(1, 0));
        assert_eq!(state.carrying, Some(victim));
        assert_eq!(state.action_points, 0);
        assert_eq!(engine.damage_count(), 2);
        assert_eq!(
            engine.world.wall(Cell::new(0, 0), Direction::East),
            Some(WallKind::None)
        );
        assert!(engine.pois.is_free(Cell::new(1, 0)));
    }

    #[test]
    fn closed_door_costs_a_point_to_open() {
        let mut engine = quiet_engine(open_config(3, 1));
        let ff = add_firefighter(&mut engine, Cell::new(0, 0));
        engine.world.set_wall(Cell::new(0, 0), Direction::East, WallKind::ClosedDoor);
        place_poi(&mut engine, PoiKind::Victim, Cell::new(1, 0));
        engine.assign_roles();

        engine.run_agent_turn(ff);

        assert_eq!(
            engine.world.wall(Cell::new(0, 0), Direction::East),
            Some(WallKind::OpenDoor)
        );
        let state = &engine.firefighters[ff];
        assert_eq!(state.pos, Cell::new(1, 0));
        // open 1, step 1, reveal 1
        assert_eq!(state.action_points, 1);
        assert_eq!(state.spent, 3);
        assert!(state.carrying.is_some());
        assert_eq!(engine.damage_count(), 0);
    }

    #[test]
    fn carrier_walks_to_exit_and_delivers() {
        let mut engine = quiet_engine(open_config(4, 1));
        let ff = add_firefighter(&mut engine, Cell::new(3, 0));
        let victim = engine.pois.force_carry(ff).expect("victim available");
        engine.firefighters[ff].carrying = Some(victim);
        engine.firefighters[ff].role = Role::Rescuer;

        engine.run_agent_turn(ff);

        assert_eq!(engine.firefighters[ff].pos, Cell::new(0, 0));
        assert_eq!(engine.firefighters[ff].carrying, None);
        assert_eq!(engine.poi_counts().rescued, 1);
        assert!(engine.pois.get(victim).is_none());
        assert_eq!(engine.poi_counts().active, 1);
    }

    #[test]
    fn seventh_rescue_wins() {
        let mut engine = quiet_engine(open_config(4, 4));
        let ff = add_firefighter(&mut engine, Cell::new(0, 0));
        for _ in 0..7 {
            let victim = engine.pois.force_carry(ff).expect("victim available");
            engine.firefighters[ff].carrying = Some(victim);
            engine.firefighters[ff].role = Role::Rescuer;
            engine.firefighters[ff].pos = Cell::new(0, 0);
            engine.run_agent_turn(ff);
        }
        let state = engine.game_state();
        assert_eq!(state.rescued, 7);
        assert!(state.game_won);
        assert_eq!(state.outcome, Some(Outcome::Won));
    }

    #[test]
    fn extinguisher_clears_fire_with_two_points() {
        let mut engine = quiet_engine(open_config(4, 1));
        let ff = add_firefighter(&mut engine, Cell::new(0, 0));
        engine.firefighters[ff].role = Role::Extinguisher;
        engine.world.set_fire_state(Cell::new(2, 0), FireState::Fire);

        engine.run_agent_turn(ff);

        assert_eq!(
            engine.world.fire_state(Cell::new(2, 0)),
            Some(FireState::Clear)
        );
        assert_eq!(engine.firefighters[ff].pos, Cell::new(2, 0));
        assert_eq!(engine.firefighters[ff].action_points, 0);
        assert_eq!(engine.firefighters[ff].knockout_timer, 0);
    }

    #[test]
    fn extinguisher_with_one_point_left_turns_fire_to_smoke() {
        let mut engine = quiet_engine(open_config(4, 1));
        let ff = add_firefighter(&mut engine, Cell::new(0, 0));
        engine.firefighters[ff].role = Role::Extinguisher;
        engine.world.set_fire_state(Cell::new(3, 0), FireState::Fire);

        engine.run_agent_turn(ff);

        assert_eq!(
            engine.world.fire_state(Cell::new(3, 0)),
            Some(FireState::Smoke)
        );
        assert_eq!(engine.firefighters[ff].knockout_timer, 0);
    }

    #[test]
    fn extinguisher_clears_several_smoke_cells() {
        let mut engine = quiet_engine(open_config(4, 1));
        let ff = add_firefighter(&mut engine, Cell::new(0, 0));
        engine.firefighters[ff].role = Role::Extinguisher;
        engine.world.set_fire_state(Cell::new(0, 0), FireState::Smoke);
        engine.world.set_fire_state(Cell::new(1, 0), FireState::Smoke);

        engine.run_agent_turn(ff);

        assert!(engine.world.cells_in_state(FireState::Smoke).is_empty());
        // clear 1, step 1, clear 1
        assert_eq!(engine.firefighters[ff].action_points, 1);
    }

    #[test]
    fn burning_cell_knocks_out_for_five_turns() {
        let mut engine = quiet_engine(open_config(3, 3));
        let ff = add_firefighter(&mut engine, Cell::new(1, 1));
        engine.world.set_fire_state(Cell::new(1, 1), FireState::Fire);

        engine.run_agent_turn(ff);
        assert_eq!(engine.firefighters[ff].knockout_timer, KNOCKOUT_TURNS);
        engine.world.set_fire_state(Cell::new(1, 1), FireState::Clear);

        for remaining in (0..KNOCKOUT_TURNS).rev() {
            engine.run_agent_turn(ff);
            assert_eq!(engine.firefighters[ff].knockout_timer, remaining);
            assert_eq!(engine.firefighters[ff].action_points, ACTION_POINTS_PER_TURN);
        }
        let skipped = engine
            .drain_events()
            .iter()
            .filter(|event| matches!(event, GameEvent::TurnSkipped { .. }))
            .count();
        assert_eq!(skipped, KNOCKOUT_TURNS as usize);

        engine.run_agent_turn(ff);
        assert!(engine
            .drain_events()
            .iter()
            .any(|event| matches!(event, GameEvent::TurnStarted { .. })));
    }

    #[test]
    fn occupied_cell_blocks_the_step() {
        let mut engine = quiet_engine(open_config(3, 1));
        let mover = add_firefighter(&mut engine, Cell::new(0, 0));
        add_firefighter(&mut engine, Cell::new(1, 0));

        assert!(!engine.move_towards(mover, Cell::new(2, 0)));
        assert_eq!(engine.firefighters[mover].pos, Cell::new(0, 0));
        assert_eq!(engine.firefighters[mover].action_points, ACTION_POINTS_PER_TURN);
        assert!(engine.firefighters[mover].path.is_empty());
    }

    #[test]
    fn chopped_damaged_wall_stays_open_when_the_cell_beyond_is_taken() {
        let mut engine = quiet_engine(open_config(3, 1));
        let mover = add_firefighter(&mut engine, Cell::new(0, 0));
        add_firefighter(&mut engine, Cell::new(1, 0));
        engine.world.set_wall(Cell::new(0, 0), Direction::East, WallKind::Damaged);

        assert!(!engine.move_towards(mover, Cell::new(2, 0)));
        assert_eq!(
            engine.world.wall(Cell::new(0, 0), Direction::East),
            Some(WallKind::None)
        );
        assert_eq!(engine.damage_count(), 1);
        let state = &engine.firefighters[mover];
        assert_eq!(state.pos, Cell::new(0, 0));
        assert_eq!(state.action_points, ACTION_POINTS_PER_TURN - 1);
        assert_eq!(state.spent, 1);
        assert!(!engine
            .drain_events()
            .iter()
            .any(|event| matches!(event, GameEvent::Moved { .. })));
    }

    #[test]
    fn move_refuses_when_points_do_not_cover_the_wall() {
        let mut engine = quiet_engine(open_config(2, 1));
        let ff = add_firefighter(&mut engine, Cell::new(0, 0));
        engine.world.set_wall(Cell::new(0, 0), Direction::East, WallKind::Intact);
        engine.firefighters[ff].action_points = 2;

        assert!(!engine.move_towards(ff, Cell::new(1, 0)));
        assert_eq!(engine.damage_count(), 0);
        assert_eq!(engine.firefighters[ff].action_points, 2);
    }
}
