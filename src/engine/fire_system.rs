use super::*;

impl GameEngine {
    pub(super) fn spread_once(&mut self) {
        let x = self.rng.int(0, self.world.width() - 1);
        let y = self.rng.int(0, self.world.height() - 1);
        let cell = Cell::new(x, y);
        match self.world.fire_state(cell) {
            Some(FireState::Clear) => self.set_fire(cell, FireState::Smoke),
            Some(FireState::Smoke) => self.set_fire(cell, FireState::Fire),
            Some(FireState::Fire) => self.explode(cell),
            None => {}
        }
    }

    pub(super) fn explode(&mut self, cell: Cell) {
        debug!(x = cell.x, y = cell.y, "explosion");
        self.events.push(GameEvent::Explosion {
            row: cell.y,
            col: cell.x,
        });
        for adjacent in self.world.adjacent(cell) {
            if self.damage_wall(cell, adjacent.direction) {
                self.set_fire(adjacent.cell, FireState::Fire);
            }
        }
    }

    // Smoke next to fire ignites when nothing stands between them. Only the
    // fire present at the start of the pass spreads; new fire waits a round.
    pub(super) fn smoke_to_fire_cascade(&mut self) {
        let mut ignite = Vec::new();
        for fire in self.world.cells_in_state(FireState::Fire) {
            for adjacent in self.world.adjacent(fire) {
                if adjacent.wall == WallKind::None
                    && self.world.fire_state(adjacent.cell) == Some(FireState::Smoke)
                    && !ignite.contains(&adjacent.cell)
                {
                    ignite.push(adjacent.cell);
                }
            }
        }
        for cell in ignite {
            self.set_fire(cell, FireState::Fire);
        }
    }

    pub(super) fn check_pois_in_danger(&mut self) -> Vec<Poi> {
        let burning: Vec<(Poi, Cell)> = self
            .pois
            .placed()
            .filter(|(_, cell)| self.world.is_on_fire(*cell))
            .collect();
        let mut burned = Vec::with_capacity(burning.len());
        for (poi, cell) in burning {
            self.burn_poi(poi, cell);
            burned.push(poi);
        }
        if !burned.is_empty() {
            self.check_lost_victims();
        }
        burned
    }

    fn set_fire(&mut self, cell: Cell, state: FireState) {
        if self.world.fire_state(cell) == Some(state) {
            return;
        }
        if self.world.set_fire_state(cell, state) {
            self.events.push(GameEvent::FireChanged {
                row: cell.y,
                col: cell.x,
                state,
            });
        }
    }
}
