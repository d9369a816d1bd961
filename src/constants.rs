pub const ACTION_POINTS_PER_TURN: u8 = 4;
pub const KNOCKOUT_TURNS: u8 = 5;

pub const VICTIM_COUNT: usize = 10;
pub const FALSE_ALARM_COUNT: usize = 5;
pub const TOTAL_POI_COUNT: usize = VICTIM_COUNT + FALSE_ALARM_COUNT;
pub const INITIAL_VICTIMS: usize = 2;
pub const INITIAL_FALSE_ALARMS: usize = 1;

pub const MAX_RESCUERS: usize = 3;
pub const RESCUER_CANDIDATES_PER_POI: usize = 3;

pub const RESCUES_TO_WIN: usize = 7;
pub const LOST_VICTIMS_TO_LOSE: usize = 4;
/// Loss triggers once damage strictly exceeds this.
pub const MAX_STRUCTURAL_DAMAGE: u32 = 24;

pub const DEFAULT_FIREFIGHTER_COUNT: usize = 5;
pub const DEFAULT_PORT: u16 = 3690;
