use serde::Serialize;

pub type AgentId = u16;
pub type FoodId = u32;
pub type PreyId = u16;

/// World coordinates, origin at the top-left of the `2 * game_radius` square.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

impl Point {
  pub const fn new(x: f64, y: f64) -> Self {
    Self { x, y }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
  Collision { killer: Option<AgentId> },
  Boundary,
  Disconnect,
}

impl DeathCause {
  pub fn drops_food(self) -> bool {
    !matches!(self, DeathCause::Boundary)
  }
}
