use super::*;
use crate::constants::{FALSE_ALARM_COUNT, INITIAL_FALSE_ALARMS, INITIAL_VICTIMS, VICTIM_COUNT};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Poi {
    pub id: PoiId,
    pub kind: PoiKind,
    pub revealed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoiLocation {
    Cell(Cell),
    CarriedBy(FirefighterId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivePoi {
    pub poi: Poi,
    pub location: PoiLocation,
}

impl ActivePoi {
    pub fn cell(&self) -> Option<Cell> {
        match self.location {
            PoiLocation::Cell(cell) => Some(cell),
            PoiLocation::CarriedBy(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoiFate {
    Rescued,
    Lost,
    Discarded,
}

#[derive(Clone, Debug, Default)]
pub struct PoiLedger {
    pool: Vec<Poi>,
    active: Vec<ActivePoi>,
    rescued: Vec<Poi>,
    lost: Vec<Poi>,
    discarded: Vec<Poi>,
}

impl PoiLedger {
    pub fn new_shuffled(rng: &mut Rng) -> Self {
        let victims = (1..=VICTIM_COUNT as PoiId).map(|id| Poi {
            id,
            kind: PoiKind::Victim,
            revealed: false,
        });
        let alarms = (1..=FALSE_ALARM_COUNT as PoiId).map(|n| Poi {
            id: VICTIM_COUNT as PoiId + n,
            kind: PoiKind::FalseAlarm,
            revealed: false,
        });
        let mut pool: Vec<Poi> = victims.chain(alarms).collect();
        rng.shuffle(&mut pool);
        Self {
            pool,
            ..Self::default()
        }
    }

    pub fn place_initial(&mut self, world: &GridWorld, rng: &mut Rng) -> Vec<(PoiId, Cell)> {
        let mut picked = Vec::new();
        let mut victims = 0;
        let mut alarms = 0;
        for (idx, poi) in self.pool.iter().enumerate() {
            let wanted = match poi.kind {
                PoiKind::Victim if victims < INITIAL_VICTIMS => {
                    victims += 1;
                    true
                }
                PoiKind::FalseAlarm if alarms < INITIAL_FALSE_ALARMS => {
                    alarms += 1;
                    true
                }
                _ => false,
            };
            if wanted {
                picked.push(idx);
            }
        }

        let cells = rng.sample(&self.free_cells(world), picked.len());
        picked.truncate(cells.len());
        // Back to front so the earlier indices stay valid.
        let mut pois: Vec<Poi> = picked.into_iter().rev().map(|idx| self.pool.remove(idx)).collect();
        pois.reverse();

        let mut placed = Vec::with_capacity(pois.len());
        for (poi, cell) in pois.into_iter().zip(cells) {
            self.active.push(ActivePoi {
                poi,
                location: PoiLocation::Cell(cell),
            });
            placed.push((poi.id, cell));
        }
        placed
    }

    pub fn place_new(&mut self, world: &mut GridWorld, rng: &mut Rng) -> Option<(Poi, Cell)> {
        if self.pool.is_empty() {
            return None;
        }
        let free = self.free_cells(world);
        if free.is_empty() {
            return None;
        }
        let poi = self.pool.remove(rng.pick_index(self.pool.len()));
        let cell = free[rng.pick_index(free.len())];
        world.set_fire_state(cell, FireState::Clear);
        self.active.push(ActivePoi {
            poi,
            location: PoiLocation::Cell(cell),
        });
        Some((poi, cell))
    }

    pub fn free_cells(&self, world: &GridWorld) -> Vec<Cell> {
        world.cells().filter(|cell| self.is_free(*cell)).collect()
    }

    pub fn is_free(&self, cell: Cell) -> bool {
        self.at(cell).is_none()
    }

    pub fn at(&self, cell: Cell) -> Option<&ActivePoi> {
        self.active
            .iter()
            .find(|active| active.location == PoiLocation::Cell(cell))
    }

    pub fn get(&self, id: PoiId) -> Option<&ActivePoi> {
        self.active.iter().find(|active| active.poi.id == id)
    }

    pub fn placed(&self) -> impl Iterator<Item = (Poi, Cell)> + '_ {
        self.active
            .iter()
            .filter_map(|active| Some((active.poi, active.cell()?)))
    }

    pub fn reveal(&mut self, cell: Cell) -> Option<Poi> {
        let active = self
            .active
            .iter_mut()
            .find(|active| active.location == PoiLocation::Cell(cell))?;
        if active.poi.revealed {
            return None;
        }
        active.poi.revealed = true;
        Some(active.poi)
    }

    pub fn pick_up(&mut self, id: PoiId, carrier: FirefighterId) -> bool {
        let Some(active) = self.active.iter_mut().find(|active| active.poi.id == id) else {
            return false;
        };
        if active.cell().is_none() {
            return false;
        }
        active.location = PoiLocation::CarriedBy(carrier);
        true
    }

    pub fn retire(&mut self, id: PoiId, fate: PoiFate) -> Option<Poi> {
        let idx = self.active.iter().position(|active| active.poi.id == id)?;
        let poi = self.active.remove(idx).poi;
        match fate {
            PoiFate::Rescued => self.rescued.push(poi),
            PoiFate::Lost => self.lost.push(poi),
            PoiFate::Discarded => self.discarded.push(poi),
        }
        Some(poi)
    }

    pub fn rescued_count(&self) -> usize {
        self.rescued.len()
    }

    pub fn lost_count(&self) -> usize {
        self.lost.len()
    }

    pub fn counts(&self) -> PoiCounts {
        PoiCounts {
            pool: self.pool.len(),
            active: self.active.len(),
            rescued: self.rescued.len(),
            lost: self.lost.len(),
            discarded: self.discarded.len(),
        }
    }

    pub fn kind_totals(&self) -> (usize, usize) {
        let all = self
            .pool
            .iter()
            .chain(self.active.iter().map(|active| &active.poi))
            .chain(&self.rescued)
            .chain(&self.lost)
            .chain(&self.discarded);
        all.fold((0, 0), |(victims, alarms), poi| match poi.kind {
            PoiKind::Victim => (victims + 1, alarms),
            PoiKind::FalseAlarm => (victims, alarms + 1),
        })
    }

    #[cfg(test)]
    pub(super) fn recall_all(&mut self) {
        for active in self.active.drain(..) {
            self.pool.push(Poi {
                revealed: false,
                ..active.poi
            });
        }
    }

    #[cfg(test)]
    pub(super) fn force_place(&mut self, kind: PoiKind, cell: Cell) -> Option<PoiId> {
        debug_assert!(self.is_free(cell));
        let idx = self.pool.iter().position(|poi| poi.kind == kind)?;
        let poi = self.pool.remove(idx);
        self.active.push(ActivePoi {
            poi,
            location: PoiLocation::Cell(cell),
        });
        Some(poi.id)
    }

    #[cfg(test)]
    pub(super) fn force_carry(&mut self, carrier: FirefighterId) -> Option<PoiId> {
        if let Some(idx) = self.pool.iter().position(|poi| poi.kind == PoiKind::Victim) {
            let poi = self.pool.remove(idx);
            self.active.push(ActivePoi {
                poi,
                location: PoiLocation::CarriedBy(carrier),
            });
            return Some(poi.id);
        }
        let active = self
            .active
            .iter_mut()
            .find(|active| active.poi.kind == PoiKind::Victim && active.cell().is_some())?;
        active.location = PoiLocation::CarriedBy(carrier);
        Some(active.poi.id)
    }
}

impl GameEngine {
    pub(super) fn place_new_poi(&mut self) -> Option<PoiId> {
        let placed = self.pois.place_new(&mut self.world, &mut self.rng);
        if let Some((poi, cell)) = placed {
            debug!(poi = poi.id, x = cell.x, y = cell.y, "POI placed");
            self.events.push(GameEvent::PoiPlaced {
                poi: poi.id,
                x: cell.x,
                y: cell.y,
            });
        }
        self.assign_roles();
        placed.map(|(poi, _)| poi.id)
    }

    pub(super) fn reveal_poi_at(&mut self, cell: Cell) -> Option<Poi> {
        let poi = self.pois.reveal(cell)?;
        self.events.push(GameEvent::PoiRevealed {
            poi: poi.id,
            kind: poi.kind,
            x: cell.x,
            y: cell.y,
        });
        if poi.kind == PoiKind::FalseAlarm {
            self.pois.retire(poi.id, PoiFate::Discarded);
            self.place_new_poi();
        }
        Some(poi)
    }

    pub(super) fn burn_poi(&mut self, poi: Poi, cell: Cell) {
        let fate = match poi.kind {
            PoiKind::Victim => PoiFate::Lost,
            PoiKind::FalseAlarm => PoiFate::Discarded,
        };
        if self.pois.retire(poi.id, fate).is_none() {
            return;
        }
        debug!(poi = poi.id, x = cell.x, y = cell.y, ?fate, "POI burned");
        self.events.push(GameEvent::PoiLost {
            poi: poi.id,
            kind: poi.kind,
            x: cell.x,
            y: cell.y,
        });
        self.place_new_poi();
    }
}
