use super::*;

pub(super) fn open_config(width: usize, height: usize) -> GameConfig {
    GameConfig {
        layout: vec![vec![[WallKind::None; 4]; width]; height],
        exits: vec![Cell::new(0, 0)],
        initial_fires: Vec::new(),
        firefighter_count: 0,
    }
}

pub(super) fn quiet_engine(config: GameConfig) -> GameEngine {
    let mut engine = GameEngine::new(config, 1);
    engine.pois.recall_all();
    let cells: Vec<Cell> = engine.world.cells().collect();
    for cell in cells {
        engine.world.set_fire_state(cell, FireState::Clear);
    }
    engine.firefighters.clear();
    engine.events.clear();
    engine
}

pub(super) fn add_firefighter(engine: &mut GameEngine, cell: Cell) -> FirefighterId {
    let id = engine.firefighters.len();
    engine.firefighters.push(Firefighter::new(id, cell));
    id
}

pub(super) fn place_poi(engine: &mut GameEngine, kind: PoiKind, cell: Cell) -> PoiId {
    engine
        .pois
        .force_place(kind, cell)
        .expect("pool holds a POI of the requested kind")
}
