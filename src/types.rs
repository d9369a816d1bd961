use serde::{Deserialize, Serialize};

pub type PoiId = u32;
pub type FirefighterId = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn manhattan(self, other: Self) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Self::North, Self::East, Self::South, Self::West];

    pub fn index(self) -> usize {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }

    pub fn between(from: Cell, to: Cell) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|direction| from.offset(*direction) == to)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum WallKind {
    None,
    Damaged,
    Intact,
    OpenDoor,
    ClosedDoor,
}

impl WallKind {
    pub fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Damaged => 1,
            Self::Intact => 2,
            Self::OpenDoor => 3,
            Self::ClosedDoor => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Damaged),
            2 => Some(Self::Intact),
            3 => Some(Self::OpenDoor),
            4 => Some(Self::ClosedDoor),
            _ => None,
        }
    }

    pub fn step_cost(self) -> u8 {
        match self {
            Self::None | Self::OpenDoor => 1,
            Self::Damaged | Self::ClosedDoor => 2,
            Self::Intact => 3,
        }
    }
}

impl TryFrom<u8> for WallKind {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("unknown wall code {code}"))
    }
}

impl From<WallKind> for u8 {
    fn from(kind: WallKind) -> Self {
        kind.code()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FireState {
    #[default]
    Clear,
    Smoke,
    Fire,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoiKind {
    Victim,
    FalseAlarm,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    None,
    Rescuer,
    Extinguisher,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    #[default]
    Agent,
    Fire,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Won,
    Lost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GridCellView {
    pub row: i32,
    pub col: i32,
}

impl From<Cell> for GridCellView {
    fn from(cell: Cell) -> Self {
        Self {
            row: cell.y,
            col: cell.x,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WallCellView {
    pub row: i32,
    pub col: i32,
    pub walls: [u8; 4],
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PoiView {
    pub id: PoiId,
    pub x: i32,
    pub y: i32,
    #[serde(rename = "type")]
    pub kind: PoiKind,
    pub revealed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FirefighterView {
    pub id: FirefighterId,
    pub x: i32,
    pub y: i32,
    pub role: Role,
    pub knocked_out: bool,
    #[serde(rename = "isCarryingVictim")]
    pub is_carrying_victim: bool,
    #[serde(rename = "targetPOI")]
    pub target_poi: Option<PoiView>,
    #[serde(rename = "actionPoints")]
    pub action_points: u8,
    #[serde(rename = "actionPointsSpent")]
    pub action_points_spent: u8,
    #[serde(rename = "knockoutTimer")]
    pub knockout_timer: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GameStateView {
    pub phase: Phase,
    #[serde(rename = "currentAgent")]
    pub current_agent: usize,
    #[serde(rename = "damageCount")]
    pub damage_count: u32,
    #[serde(rename = "roundCount")]
    pub round_count: u64,
    pub step: u64,
    #[serde(rename = "gameOver")]
    pub game_over: bool,
    #[serde(rename = "gameWon")]
    pub game_won: bool,
    pub outcome: Option<Outcome>,
    #[serde(rename = "endReason")]
    pub end_reason: String,
    pub rescued: usize,
    pub lost: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PoiCounts {
    pub pool: usize,
    pub active: usize,
    pub rescued: usize,
    pub lost: usize,
    pub discarded: usize,
}

impl PoiCounts {
    pub fn total(&self) -> usize {
        self.pool + self.active + self.rescued + self.lost + self.discarded
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PoiReport {
    pub success: bool,
    #[serde(rename = "poiType")]
    pub poi_type: PoiKind,
    #[serde(rename = "wasRevealed")]
    pub was_revealed: bool,
    pub destroyed: bool,
    pub message: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct StepReport {
    pub message: String,
    pub step: u64,
    pub phase: Phase,
    pub advanced: bool,
    pub fires: Vec<GridCellView>,
    pub agents: Vec<FirefighterView>,
    pub events: Vec<GameEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    TurnStarted {
        firefighter: FirefighterId,
        role: Role,
    },
    TurnSkipped {
        firefighter: FirefighterId,
        #[serde(rename = "knockoutTimer")]
        knockout_timer: u8,
    },
    KnockedOut {
        firefighter: FirefighterId,
        x: i32,
        y: i32,
    },
    Moved {
        firefighter: FirefighterId,
        x: i32,
        y: i32,
    },
    WallDamaged {
        x: i32,
        y: i32,
        direction: Direction,
        wall: WallKind,
        #[serde(rename = "damageCount")]
        damage_count: u32,
    },
    DoorOpened {
        x: i32,
        y: i32,
        direction: Direction,
    },
    FireChanged {
        row: i32,
        col: i32,
        state: FireState,
    },
    Explosion {
        row: i32,
        col: i32,
    },
    Extinguished {
        firefighter: FirefighterId,
        row: i32,
        col: i32,
        state: FireState,
    },
    PoiPlaced {
        poi: PoiId,
        x: i32,
        y: i32,
    },
    PoiRevealed {
        poi: PoiId,
        kind: PoiKind,
        x: i32,
        y: i32,
    },
    VictimPickedUp {
        firefighter: FirefighterId,
        poi: PoiId,
    },
    VictimRescued {
        firefighter: FirefighterId,
        poi: PoiId,
        rescued: usize,
    },
    PoiLost {
        poi: PoiId,
        kind: PoiKind,
        x: i32,
        y: i32,
    },
    RolesAssigned {
        rescuers: Vec<FirefighterId>,
    },
    GameOver {
        outcome: Outcome,
        reason: String,
    },
}
