use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_FIREFIGHTER_COUNT, INITIAL_FALSE_ALARMS, INITIAL_VICTIMS};
use crate::error::ConfigError;
use crate::types::{Cell, WallKind};

/// Wall codes per cell in N, E, S, W order: 0 none, 1 damaged, 2 intact,
/// 3 open door, 4 closed door.
const DEFAULT_LAYOUT: [[[u8; 4]; 8]; 6] = [
    [
        [2, 0, 2, 2],
        [2, 0, 2, 0],
        [2, 4, 2, 0],
        [2, 0, 0, 4],
        [2, 0, 0, 0],
        [2, 2, 0, 0],
        [2, 0, 0, 2],
        [2, 2, 0, 0],
    ],
    [
        [2, 0, 0, 2],
        [2, 0, 0, 0],
        [2, 2, 0, 0],
        [0, 0, 2, 2],
        [0, 0, 2, 0],
        [0, 4, 4, 0],
        [0, 0, 0, 4],
        [0, 2, 0, 0],
    ],
    [
        [0, 0, 0, 3],
        [0, 0, 2, 0],
        [0, 2, 0, 0],
        [2, 0, 0, 2],
        [2, 0, 0, 0],
        [4, 2, 0, 0],
        [0, 0, 0, 2],
        [0, 2, 0, 0],
    ],
    [
        [0, 2, 4, 2],
        [2, 2, 0, 2],
        [0, 2, 0, 2],
        [0, 0, 2, 2],
        [0, 0, 0, 0],
        [0, 2, 0, 0],
        [0, 0, 2, 2],
        [0, 2, 2, 0],
    ],
    [
        [4, 0, 0, 2],
        [0, 2, 0, 0],
        [0, 0, 2, 2],
        [2, 3, 2, 0],
        [0, 0, 4, 3],
        [0, 3, 2, 0],
        [2, 0, 0, 3],
        [2, 3, 0, 0],
    ],
    [
        [0, 0, 2, 2],
        [0, 0, 2, 0],
        [2, 0, 2, 0],
        [2, 0, 2, 0],
        [4, 0, 2, 0],
        [2, 2, 2, 0],
        [0, 0, 2, 2],
        [0, 2, 2, 0],
    ],
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub layout: Vec<Vec<[WallKind; 4]>>,
    pub exits: Vec<Cell>,
    #[serde(rename = "initialFires", default)]
    pub initial_fires: Vec<Cell>,
    #[serde(rename = "firefighterCount", default = "default_firefighter_count")]
    pub firefighter_count: usize,
}

fn default_firefighter_count() -> usize {
    DEFAULT_FIREFIGHTER_COUNT
}

impl Default for GameConfig {
    fn default() -> Self {
        let layout = DEFAULT_LAYOUT
            .iter()
            .map(|row| {
                row.iter()
                    .map(|codes| codes.map(|code| WallKind::from_code(code).unwrap_or(WallKind::None)))
                    .collect()
            })
            .collect();
        Self {
            layout,
            exits: vec![Cell::new(0, 2), Cell::new(7, 4)],
            initial_fires: vec![Cell::new(1, 3), Cell::new(3, 3), Cell::new(5, 1)],
            firefighter_count: DEFAULT_FIREFIGHTER_COUNT,
        }
    }
}

impl GameConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn width(&self) -> i32 {
        self.layout.first().map(Vec::len).unwrap_or(0) as i32
    }

    pub fn height(&self) -> i32 {
        self.layout.len() as i32
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let width = self.width();
        if width == 0 {
            return Err(ConfigError::Invalid("layout has no cells".to_string()));
        }
        if let Some(row) = self.layout.iter().position(|row| row.len() as i32 != width) {
            return Err(ConfigError::Invalid(format!(
                "row {row} has {} cells, expected {width}",
                self.layout[row].len()
            )));
        }
        let in_bounds =
            |cell: &Cell| cell.x >= 0 && cell.y >= 0 && cell.x < width && cell.y < self.height();
        if self.exits.is_empty() {
            return Err(ConfigError::Invalid("at least one exit is required".to_string()));
        }
        if let Some(exit) = self.exits.iter().find(|cell| !in_bounds(cell)) {
            return Err(ConfigError::Invalid(format!(
                "exit ({}, {}) is outside the grid",
                exit.x, exit.y
            )));
        }
        if let Some(fire) = self.initial_fires.iter().find(|cell| !in_bounds(cell)) {
            return Err(ConfigError::Invalid(format!(
                "initial fire ({}, {}) is outside the grid",
                fire.x, fire.y
            )));
        }
        let cells = (width * self.height()) as usize;
        let needed = INITIAL_VICTIMS + INITIAL_FALSE_ALARMS + self.firefighter_count;
        if cells < needed {
            return Err(ConfigError::Invalid(format!(
                "grid has {cells} cells but {needed} are needed for POIs and firefighters"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_board_is_valid() {
        let config = GameConfig::default();
        assert_eq!(config.width(), 8);
        assert_eq!(config.height(), 6);
        config.validate().expect("built-in layout validates");
        assert_eq!(config.layout[0][2][1], WallKind::ClosedDoor);
        assert_eq!(config.layout[2][0][3], WallKind::OpenDoor);
    }

    #[test]
    fn ragged_layout_is_rejected() {
        let mut config = GameConfig::default();
        config.layout[3].pop();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn exits_must_be_on_the_grid() {
        let mut config = GameConfig::default();
        config.exits.push(Cell::new(8, 0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn json_layout_round_trips_through_wall_codes() {
        let raw = r#"{
            "layout": [[[0,0,0,0],[2,0,0,0]],[[0,4,0,0],[0,0,0,3]]],
            "exits": [{"x":0,"y":0}],
            "initialFires": [{"x":1,"y":1}],
            "firefighterCount": 1
        }"#;
        let config: GameConfig = serde_json::from_str(raw).expect("config parses");
        config.validate().expect("small board validates");
        assert_eq!(config.layout[0][1][0], WallKind::Intact);
        assert_eq!(config.layout[1][0][1], WallKind::ClosedDoor);
        assert_eq!(config.firefighter_count, 1);
    }

    #[test]
    fn load_reports_missing_file() {
        let missing = std::env::temp_dir().join("fire-rescue-missing-layout").join("board.json");
        assert!(matches!(
            GameConfig::load(&missing),
            Err(ConfigError::Io { .. })
        ));
    }
}
