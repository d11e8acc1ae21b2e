//! Protocol-visible kinematic constants. The client hard-codes the inverse math for
//! these, so they are echoed verbatim in the setup message and never configurable.

pub const MAX_SNAKE_PARTS: u32 = 411;
pub const MOVE_DISTANCE: f64 = 42.0;

pub const NSP1: u16 = 539;
pub const NSP2: u16 = 40;
pub const NSP3: u16 = 1400;
pub const SPANGDV: u8 = 48;
pub const MAMU: u16 = 33;
pub const MANU2: u16 = 28;
pub const CST: u16 = 430;

pub const BASE_SPEED: f64 = NSP1 as f64 / 100.0;
pub const SPEED_PER_SCALE: f64 = NSP2 as f64 / 100.0;
pub const BOOST_SPEED: f64 = NSP3 as f64 / 100.0;
pub const ANGULAR_SPEED_COEFF: f64 = SPANGDV as f64 / 10.0;
pub const BASE_ANGULAR_RATE: f64 = MAMU as f64 / 1000.0;
pub const PREY_ANGULAR_RATE: f64 = MANU2 as f64 / 1000.0;

pub const MAX_SCALE: f64 = 6.0;
pub const SEGMENTS_PER_SCALE: f64 = 106.0;
pub const HEAD_RADIUS_PER_SCALE: f64 = 14.5;
pub const HEAD_CONTACT_FACTOR: f64 = 0.8;

pub const FOOD_EAT_MARGIN: f64 = 25.0;
pub const PREY_EAT_MARGIN: f64 = 20.0;
pub const FOOD_VALUE_BASE: f64 = 46.0;
pub const FAM_SCALE: f64 = 16_777_216.0;

pub const MOVE_INTERVAL_TICKS: f64 = 32.0;
pub const MOVE_INTERVAL_MIN_MS: f64 = 30.0;
pub const MOVE_INTERVAL_MAX_MS: f64 = 500.0;
pub const MAX_MOVE_STEPS_PER_TICK: usize = 4;

pub const ROTATION_BROADCAST_ANGLE: f64 = 0.05;

pub const MINIMAP_SIZE: usize = 80;
pub const MINIMAP_PART_STRIDE: usize = 3;
pub const SECTOR_VIEW_RANGE: i32 = 5;
pub const LEADERBOARD_SIZE: usize = 10;
pub const FOOD_BATCH_CHUNK: usize = 100;
pub const SECRET_LEN: usize = 30;
pub const SPAWN_MARKER: u8 = 48;

pub const FOOD_ID_WRAP: u32 = 2_000_000_000;
pub const FOOD_COLORS: u8 = 9;
pub const SKIN_COUNT: u8 = 39;
