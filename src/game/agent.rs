use super::angle::{radians_to_units, Angle};
use super::constants::{
    ANGULAR_SPEED_COEFF, BASE_ANGULAR_RATE, BASE_SPEED, BOOST_SPEED, FAM_SCALE, FOOD_VALUE_BASE,
    HEAD_CONTACT_FACTOR, HEAD_RADIUS_PER_SCALE, MAX_MOVE_STEPS_PER_TICK,
    MAX_SCALE, MAX_SNAKE_PARTS, MOVE_DISTANCE, MOVE_INTERVAL_MAX_MS, MOVE_INTERVAL_MIN_MS,
    MOVE_INTERVAL_TICKS, SEGMENTS_PER_SCALE, SPEED_PER_SCALE,
};
use super::math::{clamp, point_at};
use super::types::{AgentId, Point};
use std::f64::consts::PI;
use std::sync::OnceLock;

const MIN_PARTS: u32 = 2;
const FAM_MAX: f64 = 0.999_999;
/// Relative turn bytes are measured in frames of this many milliseconds.
const TURN_FRAME_MS: f64 = 8.0;

#[derive(Debug, Clone, Default)]
pub struct AgentSpawn {
    pub name: String,
    pub skin: u8,
    pub custom_skin: Vec<u8>,
    pub team: u8,
    pub is_bot: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveStep {
    /// A deferred segment was spliced onto the tail during this step.
    pub grew: bool,
    /// Boosting burned through `fam`; a segment's worth of mass is dropped here.
    pub dropped_tail: Option<Point>,
    /// The dropped segment came off the body rather than out of pending growth.
    pub tail_removed: bool,
    pub fam_changed: bool,
}

#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub skin: u8,
    pub custom_skin: Vec<u8>,
    pub team: u8,
    pub is_bot: bool,
    pub position: Point,
    pub heading: Angle,
    pub wanted_heading: Angle,
    pub speed: f64,
    pub boosting: bool,
    /// Trailing segments, head to tail.
    pub parts: Vec<Point>,
    pub sct: u32,
    pub fam: f64,
    pub pending_growth: u32,
    pub kills: u32,
    /// Where the latest move step started, until the next collision pass checks it.
    pub sweep_origin: Option<Point>,
    move_elapsed_ms: f64,
    rotation_elapsed_ms: f64,
    last_sent_heading: Angle,
}

impl Agent {
    pub fn new(id: AgentId, spawn: AgentSpawn, position: Point, heading: Angle, parts: u32) -> Self {
        let sct = parts.clamp(MIN_PARTS, MAX_SNAKE_PARTS);
        let tail_angle = heading.radians() + PI;
        let body = (0..sct)
            .map(|index| point_at(position, tail_angle, (index + 1) as f64 * MOVE_DISTANCE))
            .collect();
        let mut agent = Self {
            id,
            name: spawn.name,
            skin: spawn.skin,
            custom_skin: spawn.custom_skin,
            team: spawn.team,
            is_bot: spawn.is_bot,
            position,
            heading,
            wanted_heading: heading,
            speed: BASE_SPEED,
            boosting: false,
            parts: body,
            sct,
            fam: 0.0,
            pending_growth: 0,
            kills: 0,
            sweep_origin: None,
            move_elapsed_ms: 0.0,
            rotation_elapsed_ms: 0.0,
            last_sent_heading: heading,
        };
        agent.speed = agent.target_speed();
        agent
    }

    /// Segment count as the client renders it; growth shows up one movement step late.
    pub fn visible_segments(&self) -> u32 {
        self.sct.saturating_sub(self.pending_growth).max(MIN_PARTS)
    }

    pub fn scale(&self) -> f64 {
        (1.0 + (self.visible_segments() - MIN_PARTS) as f64 / SEGMENTS_PER_SCALE).min(MAX_SCALE)
    }

    /// Scale of everything the agent has earned, spliced or not.
    pub fn mass_scale(&self) -> f64 {
        (1.0 + (self.sct.max(MIN_PARTS) - MIN_PARTS) as f64 / SEGMENTS_PER_SCALE).min(MAX_SCALE)
    }

    /// Bigger snakes turn more stiffly.
    pub fn scale_turn_factor(&self) -> f64 {
        let ratio = (7.0 - self.scale()) / 6.0;
        0.13 + 0.87 * ratio * ratio
    }

    pub fn speed_turn_factor(&self) -> f64 {
        (self.speed / ANGULAR_SPEED_COEFF).min(1.0)
    }

    pub fn base_speed(&self) -> f64 {
        BASE_SPEED + SPEED_PER_SCALE * self.scale()
    }

    pub fn target_speed(&self) -> f64 {
        if self.boosting {
            BOOST_SPEED
        } else {
            self.base_speed()
        }
    }

    pub fn head_radius(&self) -> f64 {
        HEAD_RADIUS_PER_SCALE * self.scale()
    }

    pub fn body_radius(&self) -> f64 {
        HEAD_RADIUS_PER_SCALE * self.scale()
    }

    pub fn contact_radius(&self) -> f64 {
        self.head_radius() * HEAD_CONTACT_FACTOR
    }

    pub fn max_turn_radians(&self, dt_ms: f64) -> f64 {
        BASE_ANGULAR_RATE * (dt_ms / TURN_FRAME_MS) * self.scale_turn_factor() * self.speed_turn_factor()
    }

    /// Angle tick: turns toward the wanted heading and settles the current speed.
    pub fn update_heading(&mut self, dt_ms: f64) {
        let max_units = radians_to_units(self.max_turn_radians(dt_ms.max(0.0)));
        self.heading = self.heading.step_toward(self.wanted_heading, max_units);
        self.speed = self.target_speed();
    }

    pub fn move_interval_ms(&self) -> f64 {
        clamp(
            MOVE_DISTANCE * MOVE_INTERVAL_TICKS / self.speed.max(f64::EPSILON),
            MOVE_INTERVAL_MIN_MS,
            MOVE_INTERVAL_MAX_MS,
        )
    }

    /// Accumulates motion time and returns how many movement steps are now due.
    pub fn due_move_steps(&mut self, dt_ms: f64) -> usize {
        self.move_elapsed_ms += dt_ms.max(0.0);
        let interval = self.move_interval_ms();
        let mut steps = 0;
        while self.move_elapsed_ms >= interval && steps < MAX_MOVE_STEPS_PER_TICK {
            self.move_elapsed_ms -= interval;
            steps += 1;
        }
        if steps == MAX_MOVE_STEPS_PER_TICK {
            self.move_elapsed_ms = self.move_elapsed_ms.min(interval);
        }
        steps
    }

    /// Advances the head one `MOVE_DISTANCE` and drags the body along behind it.
    pub fn move_step(&mut self) -> MoveStep {
        let grew = self.pending_growth > 0;
        if grew {
            let extension = self.tail_extension();
            self.parts.push(extension);
        }

        let previous_head = self.position;
        self.position = point_at(self.position, self.heading.radians(), MOVE_DISTANCE);
        for index in (1..self.parts.len()).rev() {
            self.parts[index] = self.parts[index - 1];
        }
        if let Some(first) = self.parts.first_mut() {
            *first = previous_head;
        }
        self.sweep_origin = Some(previous_head);

        if grew {
            self.pending_growth -= 1;
        }

        let fam_before = self.fam;
        let shed = self.burn_boost();
        MoveStep {
            grew,
            dropped_tail: shed.map(|(point, _)| point),
            tail_removed: shed.map_or(false, |(_, removed)| removed),
            fam_changed: (self.fam - fam_before).abs() > 1e-3,
        }
    }

    fn tail_extension(&self) -> Point {
        let len = self.parts.len();
        let tail = self.parts.last().copied().unwrap_or(self.position);
        let before_tail = if len >= 2 { self.parts[len - 2] } else { self.position };
        let dx = tail.x - before_tail.x;
        let dy = tail.y - before_tail.y;
        let angle = if dx == 0.0 && dy == 0.0 {
            self.heading.radians() + PI
        } else {
            dy.atan2(dx)
        };
        point_at(tail, angle, MOVE_DISTANCE)
    }

    /// Burns one unit of `fam`; on underflow sheds a segment, preferring one still
    /// pending. Returns where to drop it and whether it came off the visible body.
    fn burn_boost(&mut self) -> Option<(Point, bool)> {
        if !self.boosting {
            return None;
        }
        if self.sct <= MIN_PARTS {
            self.boosting = false;
            return None;
        }
        self.fam -= 1.0;
        if self.fam >= 0.0 {
            return None;
        }
        self.fam += 1.0;
        self.sct -= 1;
        let dropped = if self.pending_growth > 0 && self.parts.len() as u32 + self.pending_growth > self.sct {
            self.pending_growth -= 1;
            let tail = self.parts.last().copied().unwrap_or(self.position);
            Some((tail, false))
        } else {
            self.parts.pop().map(|tail| (tail, true))
        };
        if self.sct <= MIN_PARTS {
            self.boosting = false;
        }
        dropped
    }

    /// Feeds a pellet or prey of `size`; returns how many segments were earned.
    pub fn eat(&mut self, size: f64) -> u32 {
        self.fam += size * size * FOOD_VALUE_BASE * FOOD_VALUE_BASE / FAM_SCALE;
        let mut grown = 0;
        while self.fam >= 1.0 && self.sct < MAX_SNAKE_PARTS {
            self.fam -= 1.0;
            self.sct += 1;
            self.pending_growth += 1;
            grown += 1;
        }
        self.fam = self.fam.min(FAM_MAX);
        grown
    }

    pub fn score(&self) -> i64 {
        score_for(self.visible_segments(), self.fam)
    }

    pub fn set_wanted_heading(&mut self, heading: Angle) {
        self.wanted_heading = heading;
    }

    /// Absolute steering byte in `0..=250`.
    pub fn apply_target_byte(&mut self, value: u8) {
        self.wanted_heading = Angle::from_target_byte(value);
    }

    /// Relative steering byte: `<128` turns counter-clockwise, `>=128` clockwise, each
    /// step worth one frame of passive turning.
    pub fn apply_turn_byte(&mut self, value: u8) {
        let (frames, sign) = if value < 128 {
            (value as f64, -1.0)
        } else {
            ((value - 128) as f64, 1.0)
        };
        let radians = frames * self.max_turn_radians(TURN_FRAME_MS);
        let delta = (radians_to_units(radians) * sign).round() as i64;
        self.wanted_heading = self.heading.offset(delta);
    }

    pub fn set_boost(&mut self, boosting: bool) {
        if !boosting || self.sct > MIN_PARTS {
            self.boosting = boosting;
        }
    }

    /// True when a rotation update should be broadcast for this angle tick.
    pub fn rotation_due(&mut self, dt_ms: f64, interval_ms: f64, min_radians: f64) -> bool {
        self.rotation_elapsed_ms += dt_ms.max(0.0);
        let moved = self.last_sent_heading.shortest_diff(self.heading).unsigned_abs() as f64;
        if self.rotation_elapsed_ms >= interval_ms || moved > radians_to_units(min_radians) {
            self.rotation_elapsed_ms = 0.0;
            self.last_sent_heading = self.heading;
            return true;
        }
        false
    }

    /// Head followed by every body segment; the poly-line other heads collide against.
    pub fn body_polyline(&self) -> impl Iterator<Item = Point> + '_ {
        std::iter::once(self.position).chain(self.parts.iter().copied())
    }
}

fn mass_tables() -> &'static (Vec<f64>, Vec<f64>) {
    static TABLES: OnceLock<(Vec<f64>, Vec<f64>)> = OnceLock::new();
    TABLES.get_or_init(|| {
        let max = MAX_SNAKE_PARTS as usize;
        let fmlts: Vec<f64> = (0..max)
            .map(|n| (1.0 - n as f64 / MAX_SNAKE_PARTS as f64).powf(2.25))
            .collect();
        let mut fpsls = Vec::with_capacity(max + 1);
        fpsls.push(0.0);
        for n in 1..=max {
            fpsls.push(fpsls[n - 1] + 1.0 / fmlts[n - 1]);
        }
        (fmlts, fpsls)
    })
}

pub fn fmlts(n: u32) -> f64 {
    let (fmlts, _) = mass_tables();
    let index = (n as usize).min(MAX_SNAKE_PARTS as usize - 1);
    fmlts[index]
}

pub fn fpsls(n: u32) -> f64 {
    let (_, fpsls) = mass_tables();
    fpsls[(n as usize).min(MAX_SNAKE_PARTS as usize)]
}

/// Client-visible score for `segments` visible segments and growth fraction `fam`.
pub fn score_for(segments: u32, fam: f64) -> i64 {
    (15.0 * (fpsls(segments) + fam / fmlts(segments) - 1.0) - 5.0).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::math::distance_sq;

    fn agent_with_parts(parts: u32) -> Agent {
        Agent::new(
            1,
            AgentSpawn {
                name: "test".to_string(),
                ..AgentSpawn::default()
            },
            Point::new(2000.0, 2000.0),
            Angle::ZERO,
            parts,
        )
    }

    #[test]
    fn spawn_seeds_tail_opposite_heading() {
        let agent = agent_with_parts(4);
        assert_eq!(agent.parts.len(), 4);
        for (index, part) in agent.parts.iter().enumerate() {
            let expected_x = 2000.0 - (index + 1) as f64 * MOVE_DISTANCE;
            assert!((part.x - expected_x).abs() < 1e-9);
            assert!((part.y - 2000.0).abs() < 1e-9);
        }
    }

    #[test]
    fn minimum_snake_scores_ten() {
        assert_eq!(score_for(2, 0.0), 10);
        assert_eq!(agent_with_parts(2).score(), 10);
    }

    #[test]
    fn score_is_monotonic_in_fam_and_across_segment_boundary() {
        for segments in [2u32, 10, 100, 300, MAX_SNAKE_PARTS - 1] {
            let mut last = i64::MIN;
            for step in 0..100 {
                let score = score_for(segments, step as f64 / 100.0);
                assert!(score >= last);
                last = score;
            }
            assert!(score_for(segments + 1, 0.0) >= score_for(segments, 0.99));
        }
    }

    #[test]
    fn fmlts_clamps_at_max_parts() {
        assert_eq!(fmlts(MAX_SNAKE_PARTS), fmlts(MAX_SNAKE_PARTS - 1));
        assert_eq!(fmlts(0), 1.0);
        assert!(fmlts(MAX_SNAKE_PARTS - 1) > 0.0);
    }

    #[test]
    fn eating_adds_quadratic_fam() {
        let mut agent = agent_with_parts(2);
        let grown = agent.eat(47.0);
        assert_eq!(grown, 0);
        let expected = 47.0 * 47.0 * 46.0 * 46.0 / 16_777_216.0;
        assert!((agent.fam - expected).abs() < 1e-12);
    }

    #[test]
    fn crossing_one_full_fam_adds_exactly_one_segment() {
        let mut agent = agent_with_parts(2);
        let mut meals = 0;
        while agent.sct == 2 {
            agent.eat(30.0);
            meals += 1;
            assert!(meals < 1000);
        }
        assert_eq!(agent.sct, 3);
        assert_eq!(agent.pending_growth, 1);
        assert!(agent.fam < 1.0);
    }

    #[test]
    fn growth_never_exceeds_max_parts() {
        let mut agent = agent_with_parts(MAX_SNAKE_PARTS - 1);
        for _ in 0..200 {
            agent.eat(255.0);
        }
        assert_eq!(agent.sct, MAX_SNAKE_PARTS);
        assert!(agent.fam < 1.0);
    }

    #[test]
    fn body_matches_sct_once_pending_growth_settles() {
        let mut agent = agent_with_parts(2);
        for _ in 0..20 {
            agent.eat(200.0);
        }
        assert!(agent.pending_growth > 0);
        while agent.pending_growth > 0 {
            let step = agent.move_step();
            assert!(step.grew);
            assert_eq!(agent.parts.len() as u32 + agent.pending_growth, agent.sct);
        }
        for _ in 0..5 {
            let step = agent.move_step();
            assert!(!step.grew);
        }
        assert_eq!(agent.parts.len() as u32, agent.sct);
    }

    #[test]
    fn move_step_shifts_body_behind_head() {
        let mut agent = agent_with_parts(3);
        let old_head = agent.position;
        let old_first = agent.parts[0];
        agent.move_step();
        assert!((agent.position.x - (old_head.x + MOVE_DISTANCE)).abs() < 1e-9);
        assert_eq!(agent.parts[0], old_head);
        assert_eq!(agent.parts[1], old_first);
        assert_eq!(agent.sweep_origin, Some(old_head));
    }

    #[test]
    fn boosting_sheds_tail_segments_as_food() {
        let mut agent = agent_with_parts(5);
        agent.set_boost(true);
        assert!(agent.boosting);
        let tail_before_shift = agent.parts[3];
        let step = agent.move_step();
        assert_eq!(step.dropped_tail, Some(tail_before_shift));
        assert!(step.tail_removed);
        assert_eq!(agent.sct, 4);
        assert_eq!(agent.parts.len(), 4);
        for _ in 0..10 {
            agent.move_step();
        }
        assert_eq!(agent.sct, 2);
        assert!(!agent.boosting);
    }

    #[test]
    fn boosting_through_pending_growth_still_drops_food() {
        let mut agent = agent_with_parts(5);
        agent.eat(200.0);
        let pending = agent.pending_growth;
        let sct = agent.sct;
        assert!(pending > 0);
        agent.fam = 0.5;
        agent.set_boost(true);

        let step = agent.move_step();
        assert!(step.grew);
        assert!(!step.tail_removed);
        assert_eq!(step.dropped_tail, agent.parts.last().copied());
        assert_eq!(agent.sct, sct - 1);
        assert_eq!(agent.pending_growth, pending - 2);
        assert_eq!(agent.parts.len() as u32 + agent.pending_growth, agent.sct);
    }

    #[test]
    fn cannot_start_boost_at_minimum_length() {
        let mut agent = agent_with_parts(2);
        agent.set_boost(true);
        assert!(!agent.boosting);
    }

    #[test]
    fn heading_turn_is_rate_limited_then_snaps() {
        let mut agent = agent_with_parts(2);
        agent.set_wanted_heading(Angle::from_radians(PI / 2.0));
        let max_turn = agent.max_turn_radians(16.0);
        agent.update_heading(16.0);
        assert!((agent.heading.radians() - max_turn).abs() < 1e-5);
        for _ in 0..200 {
            agent.update_heading(16.0);
        }
        assert_eq!(agent.heading, agent.wanted_heading);
    }

    #[test]
    fn larger_snakes_turn_slower() {
        let small = agent_with_parts(2);
        let large = agent_with_parts(400);
        assert!(large.scale_turn_factor() < small.scale_turn_factor());
        assert!((small.scale_turn_factor() - 1.0).abs() < 1e-12);
        assert!((large.scale() - (1.0 + 398.0 / 106.0)).abs() < 1e-12);
    }

    #[test]
    fn speed_depends_on_scale_unless_boosting() {
        let mut agent = agent_with_parts(2);
        assert!((agent.speed - 5.79).abs() < 1e-9);
        agent.sct = 50;
        agent.set_boost(true);
        agent.update_heading(16.0);
        assert!((agent.speed - 14.0).abs() < 1e-9);
    }

    #[test]
    fn move_interval_tracks_speed_within_bounds() {
        let mut agent = agent_with_parts(2);
        let normal = agent.move_interval_ms();
        assert!((normal - 42.0 * 32.0 / 5.79).abs() < 1e-9);
        agent.speed = 0.0;
        assert_eq!(agent.move_interval_ms(), MOVE_INTERVAL_MAX_MS);
        agent.speed = 1000.0;
        assert_eq!(agent.move_interval_ms(), MOVE_INTERVAL_MIN_MS);
    }

    #[test]
    fn due_move_steps_accumulates_time() {
        let mut agent = agent_with_parts(2);
        let interval = agent.move_interval_ms();
        assert_eq!(agent.due_move_steps(interval * 0.5), 0);
        assert_eq!(agent.due_move_steps(interval * 0.6), 1);
        assert_eq!(agent.due_move_steps(interval * 100.0), MAX_MOVE_STEPS_PER_TICK);
    }

    #[test]
    fn turn_byte_and_target_byte_share_representation() {
        let mut agent = agent_with_parts(2);
        agent.apply_turn_byte(128 + 10);
        let clockwise = agent.heading.shortest_diff(agent.wanted_heading);
        agent.apply_turn_byte(10);
        let counter = agent.heading.shortest_diff(agent.wanted_heading);
        assert!(clockwise > 0);
        assert_eq!(clockwise, -counter);

        agent.apply_target_byte(0);
        assert_eq!(agent.wanted_heading, Angle::ZERO);
    }

    #[test]
    fn contact_radius_is_smaller_than_head() {
        let agent = agent_with_parts(2);
        assert!((agent.head_radius() - 14.5).abs() < 1e-12);
        assert!(agent.contact_radius() < agent.head_radius());
        let gap = distance_sq(agent.position, agent.parts[0]).sqrt();
        assert!((gap - MOVE_DISTANCE).abs() < 1e-9);
    }
}
