use std::path::PathBuf;

use crate::types::Cell;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("coordinates ({x}, {y}) are outside the grid")]
    OutOfBounds { x: i32, y: i32 },
    #[error("no POI at ({x}, {y})")]
    NoPoi { x: i32, y: i32 },
    #[error("POI at ({x}, {y}) was already revealed")]
    AlreadyRevealed { x: i32, y: i32 },
    #[error("game is over")]
    GameOver,
    #[error("missing coordinate `{0}`")]
    MissingCoordinate(&'static str),
    #[error("coordinate `{field}` is not an integer: {raw:?}")]
    InvalidCoordinate { field: &'static str, raw: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read layout file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse layout file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid layout: {0}")]
    Invalid(String),
}

impl CommandError {
    pub fn out_of_bounds(cell: Cell) -> Self {
        Self::OutOfBounds {
            x: cell.x,
            y: cell.y,
        }
    }

    pub fn no_poi(cell: Cell) -> Self {
        Self::NoPoi {
            x: cell.x,
            y: cell.y,
        }
    }

    pub fn already_revealed(cell: Cell) -> Self {
        Self::AlreadyRevealed {
            x: cell.x,
            y: cell.y,
        }
    }
}
