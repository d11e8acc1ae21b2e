use super::agent::Agent;
use super::angle::Angle;
use super::constants::{FOOD_COLORS, PREY_ANGULAR_RATE};
use super::math::{distance_sq, point_at};
use super::types::{FoodId, Point, PreyId};
use crate::config::GameConfig;
use rand::Rng;
use std::f64::consts::{PI, TAU};

const EDGE_MARGIN: f64 = 50.0;
const EDGE_INSET: f64 = 100.0;
const NATURAL_SPREAD: f64 = 0.9;
const PREY_SPREAD: f64 = 0.85;
const DEATH_FOOD_JITTER: f64 = 5.0;
const DEATH_FOOD_SIZE_PER_SCALE: f64 = 9.0;
const DEATH_FOOD_TAIL_SHRINK: f64 = 0.6;
const SIDE_FOOD_MIN_SCALE: f64 = 1.5;
const SIDE_FOOD_SHRINK: f64 = 0.85;
const BODY_WIDTH_PER_SCALE: f64 = 10.0;
const BOOST_DROP_BASE_SIZE: f64 = 24.0;

const PREY_MIN_SIZE: u8 = 10;
const PREY_SIZE_RANGE: u8 = 20;
const PREY_WALL_MARGIN: f64 = 500.0;
const PREY_SPEED_PER_MS: f64 = 0.1;
const PREY_FIRST_TURN_MS: f64 = 3000.0;
const PREY_TURN_MIN_MS: f64 = 1000.0;
const PREY_TURN_JITTER_MS: f64 = 3000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoodOrigin {
    Natural,
    BoostDrop,
    Death,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Food {
    pub id: FoodId,
    pub position: Point,
    pub color: u8,
    pub size: u8,
    pub origin: FoodOrigin,
}

impl Food {
    /// Growth value handed to the eater; see `Agent::eat`.
    pub fn value(&self) -> f64 {
        self.size as f64
    }
}

/// A pellet about to be placed, before it has an id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoodDrop {
    pub position: Point,
    pub color: u8,
    pub size: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreyTurn {
    Straight = 0,
    Left = 1,
    Right = 2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prey {
    pub id: PreyId,
    pub position: Point,
    pub color: u8,
    pub size: u8,
    pub heading: Angle,
    pub wanted_heading: Angle,
    pub speed: f64,
    pub turn: PreyTurn,
    next_turn_in_ms: f64,
}

impl Prey {
    pub fn spawn(id: PreyId, config: &GameConfig, rng: &mut impl Rng) -> Self {
        let position = random_disc_point(config, PREY_SPREAD, rng);
        let heading = Angle::from_radians(rng.gen::<f64>() * TAU);
        Self {
            id,
            position,
            color: rng.gen_range(0..FOOD_COLORS),
            size: PREY_MIN_SIZE + rng.gen_range(0..PREY_SIZE_RANGE),
            heading,
            wanted_heading: heading,
            speed: 0.5 + rng.gen::<f64>() * 0.5,
            turn: PreyTurn::Straight,
            next_turn_in_ms: rng.gen::<f64>() * PREY_FIRST_TURN_MS,
        }
    }

    pub fn value(&self) -> f64 {
        self.size as f64
    }

    /// Random walk: occasionally picks a new turn direction, drifts forward and
    /// bounces off an inset wall.
    pub fn update(&mut self, dt_ms: f64, world_size: f64, rng: &mut impl Rng) {
        self.next_turn_in_ms -= dt_ms;
        if self.next_turn_in_ms <= 0.0 {
            self.turn = match rng.gen_range(0..3) {
                1 => PreyTurn::Left,
                2 => PreyTurn::Right,
                _ => PreyTurn::Straight,
            };
            if self.turn != PreyTurn::Straight {
                self.wanted_heading = Angle::from_radians(rng.gen::<f64>() * TAU);
            }
            self.next_turn_in_ms = PREY_TURN_MIN_MS + rng.gen::<f64>() * PREY_TURN_JITTER_MS;
        }

        let mut heading = self.heading.radians();
        match self.turn {
            PreyTurn::Left => heading -= PREY_ANGULAR_RATE * dt_ms,
            PreyTurn::Right => heading += PREY_ANGULAR_RATE * dt_ms,
            PreyTurn::Straight => {}
        }
        self.position = point_at(self.position, heading, self.speed * dt_ms * PREY_SPEED_PER_MS);

        let low = PREY_WALL_MARGIN;
        let high = world_size - PREY_WALL_MARGIN;
        if self.position.x < low || self.position.x > high {
            heading = PI - heading;
            self.position.x = self.position.x.clamp(low, high.max(low));
        }
        if self.position.y < low || self.position.y > high {
            heading = -heading;
            self.position.y = self.position.y.clamp(low, high.max(low));
        }
        self.heading = Angle::from_radians(heading);
    }
}

/// Pulls a point that strays near the rim back inside the playable disc.
pub fn clamp_to_play_area(config: &GameConfig, point: Point) -> Point {
    let center = config.center();
    let dist = distance_sq(point, center).sqrt();
    if dist > config.play_radius - EDGE_MARGIN {
        let angle = (point.y - center.y).atan2(point.x - center.x);
        return point_at(center, angle, config.play_radius - EDGE_INSET);
    }
    point
}

fn random_disc_point(config: &GameConfig, spread: f64, rng: &mut impl Rng) -> Point {
    let angle = rng.gen::<f64>() * TAU;
    let radius = rng.gen::<f64>().sqrt() * config.play_radius * spread;
    point_at(config.center(), angle, radius)
}

pub fn natural_food(config: &GameConfig, rng: &mut impl Rng) -> FoodDrop {
    FoodDrop {
        position: random_disc_point(config, NATURAL_SPREAD, rng),
        color: rng.gen_range(0..FOOD_COLORS),
        size: rng.gen_range(config.min_natural_food_size..config.max_natural_food_size),
    }
}

/// Pellet shed from the tail while boosting.
pub fn boost_drop(config: &GameConfig, position: Point, scale: f64, rng: &mut impl Rng) -> FoodDrop {
    let size = BOOST_DROP_BASE_SIZE + (2.0 * scale).floor() + rng.gen_range(0..2) as f64;
    let world = config.world_size();
    FoodDrop {
        position: Point::new(
            position.x.clamp(EDGE_MARGIN, world - EDGE_MARGIN),
            position.y.clamp(EDGE_MARGIN, world - EDGE_MARGIN),
        ),
        color: rng.gen_range(0..FOOD_COLORS),
        size: size.min(u8::MAX as f64) as u8,
    }
}

/// Converts a dead agent's body into a trail of pellets, larger toward the head.
pub fn death_food(config: &GameConfig, agent: &Agent, rng: &mut impl Rng) -> Vec<FoodDrop> {
    let scale = agent.mass_scale();
    let min_size = config.min_death_food_size as f64;
    let max_size = min_size + (scale * DEATH_FOOD_SIZE_PER_SCALE).floor();
    let size_range = max_size - min_size;

    let positions: Vec<Point> = agent.body_polyline().collect();
    let body_len = agent.parts.len().saturating_sub(1).max(1) as f64;
    let target = (agent.sct as usize * 2).min(positions.len() * 2);
    if target == 0 {
        return Vec::new();
    }
    let spacing = (positions.len() as f64 / target as f64).max(1.0);

    let mut drops = Vec::with_capacity(target);
    let mut cursor = 0.0;
    while drops.len() < target {
        let index = cursor as usize;
        let Some(&position) = positions.get(index) else { break };
        let progress = if index == 0 { 0.0 } else { (index - 1) as f64 / body_len };
        let size = (max_size - size_range * progress * DEATH_FOOD_TAIL_SHRINK).floor();

        let anchor = clamp_to_play_area(config, position);
        let jitter = point_at(
            anchor,
            rng.gen::<f64>() * TAU,
            rng.gen::<f64>() * DEATH_FOOD_JITTER,
        );
        drops.push(FoodDrop {
            position: jitter,
            color: rng.gen_range(0..FOOD_COLORS),
            size: size.min(u8::MAX as f64) as u8,
        });

        if drops.len() < target && index > 0 && scale > SIDE_FOOD_MIN_SCALE {
            let prev = positions[index - 1];
            let next = positions[(index + 1).min(positions.len() - 1)];
            if prev != next {
                let across = (next.y - prev.y).atan2(next.x - prev.x) + PI / 2.0;
                let side = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                let offset = BODY_WIDTH_PER_SCALE * scale * 0.5 * side;
                let side_size = (size * SIDE_FOOD_SHRINK).floor().max(min_size);
                drops.push(FoodDrop {
                    position: clamp_to_play_area(config, point_at(position, across, offset)),
                    color: rng.gen_range(0..FOOD_COLORS),
                    size: side_size.min(u8::MAX as f64) as u8,
                });
            }
        }
        cursor += spacing;
    }
    drops
}
