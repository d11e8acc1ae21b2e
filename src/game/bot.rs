use super::agent::Agent;
use super::angle::Angle;
use super::food::{Food, Prey};
use super::math::distance_sq;
use super::types::{FoodId, Point};
use rand::rngs::StdRng;
use rand::Rng;
use std::f64::consts::TAU;

const THINK_INTERVAL_MS: f64 = 100.0;
const DANGER_SCAN_RADIUS: f64 = 200.0;
const DANGER_HEAD_DISTANCE: f64 = 80.0;
const DANGER_BODY_DISTANCE: f64 = 60.0;
const DANGER_JITTER: f64 = 0.5;
const EDGE_RETREAT_FACTOR: f64 = 0.8;
const FOOD_SEARCH_RADIUS: f64 = 150.0;
const FOOD_RETARGET_CHANCE: f64 = 0.1;
const FOOD_REACHED_DISTANCE: f64 = 30.0;
const WANDER_DRIFT_CHANCE: f64 = 0.03;
const WANDER_DRIFT: f64 = 0.5;
const BOOST_MIN_SEGMENTS: u32 = 20;
const BOOST_CHANCE: f64 = 0.005;
const BOOST_BURST_MS: f64 = 300.0;

/// Read-only world queries available to bot controllers.
pub trait WorldView {
    fn agents_near(&self, center: Point, radius: f64) -> Vec<&Agent>;
    fn food_near(&self, center: Point, radius: f64) -> Vec<&Food>;
    fn prey_near(&self, center: Point, radius: f64) -> Vec<&Prey>;
    fn has_food(&self, id: FoodId) -> bool;
    fn center(&self) -> Point;
    fn play_radius(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotIntent {
    pub heading: Angle,
    pub boost: bool,
}

/// Steering source for a non-human agent. Intents are applied exactly like a
/// client's turn and boost messages.
pub trait BotController: Send + std::fmt::Debug {
    fn update(&mut self, agent: &Agent, world: &dyn WorldView, dt_ms: f64) -> Option<BotIntent>;
}

/// Avoids nearby bodies, retreats from the rim, chases close pellets and otherwise wanders.
#[derive(Debug)]
pub struct ForagingBot {
    rng: StdRng,
    since_think_ms: f64,
    target_food: Option<(FoodId, Point)>,
    wander_heading: f64,
    boost_left_ms: f64,
}

impl ForagingBot {
    pub fn new(mut rng: StdRng) -> Self {
        let wander_heading = rng.gen::<f64>() * TAU;
        Self {
            rng,
            since_think_ms: THINK_INTERVAL_MS,
            target_food: None,
            wander_heading,
            boost_left_ms: 0.0,
        }
    }

    fn nearest_danger(agent: &Agent, world: &dyn WorldView) -> Option<Point> {
        let mut best: Option<(Point, f64)> = None;
        let mut consider = |point: Point, limit: f64| {
            let dist = distance_sq(point, agent.position).sqrt();
            if dist < limit && best.map_or(true, |(_, best_dist)| dist < best_dist) {
                best = Some((point, dist));
            }
        };
        for other in world.agents_near(agent.position, DANGER_SCAN_RADIUS) {
            if other.id == agent.id {
                continue;
            }
            consider(other.position, DANGER_HEAD_DISTANCE);
            for part in &other.parts {
                consider(*part, DANGER_BODY_DISTANCE);
            }
        }
        best.map(|(point, _)| point)
    }

    fn steer(&mut self, agent: &Agent, world: &dyn WorldView) -> f64 {
        let head = agent.position;
        if let Some(danger) = Self::nearest_danger(agent, world) {
            let away = (head.y - danger.y).atan2(head.x - danger.x);
            return away + (self.rng.gen::<f64>() - 0.5) * DANGER_JITTER;
        }

        let center = world.center();
        if distance_sq(head, center).sqrt() > world.play_radius() * EDGE_RETREAT_FACTOR {
            return (center.y - head.y).atan2(center.x - head.x);
        }

        if self.target_food.is_none() || self.rng.gen_bool(FOOD_RETARGET_CHANCE) {
            self.target_food = world
                .food_near(head, FOOD_SEARCH_RADIUS)
                .into_iter()
                .min_by(|a, b| {
                    distance_sq(a.position, head).total_cmp(&distance_sq(b.position, head))
                })
                .map(|food| (food.id, food.position));
        }
        if let Some((id, target)) = self.target_food {
            let close = distance_sq(target, head) < FOOD_REACHED_DISTANCE * FOOD_REACHED_DISTANCE;
            if close || !world.has_food(id) {
                self.target_food = None;
            } else {
                return (target.y - head.y).atan2(target.x - head.x);
            }
        }

        if self.rng.gen_bool(WANDER_DRIFT_CHANCE) {
            self.wander_heading =
                (self.wander_heading + (self.rng.gen::<f64>() - 0.5) * WANDER_DRIFT).rem_euclid(TAU);
        }
        if agent.sct > BOOST_MIN_SEGMENTS && self.rng.gen_bool(BOOST_CHANCE) {
            self.boost_left_ms = BOOST_BURST_MS;
        }
        self.wander_heading
    }
}

impl BotController for ForagingBot {
    fn update(&mut self, agent: &Agent, world: &dyn WorldView, dt_ms: f64) -> Option<BotIntent> {
        self.boost_left_ms = (self.boost_left_ms - dt_ms).max(0.0);
        self.since_think_ms += dt_ms;
        if self.since_think_ms < THINK_INTERVAL_MS {
            return None;
        }
        self.since_think_ms = 0.0;
        let heading = self.steer(agent, world);
        Some(BotIntent {
            heading: Angle::from_radians(heading),
            boost: self.boost_left_ms > 0.0,
        })
    }
}

/// How many bots to add (positive) or remove (negative) this rebalance pass.
pub fn rebalance_delta(humans: usize, bots: usize, min_players: usize, max_bots: usize) -> i32 {
    let target = max_bots.min(min_players.saturating_sub(humans));
    if bots < target {
        (target - bots).min(2) as i32
    } else if bots > target && humans > 0 {
        -1
    } else {
        0
    }
}
