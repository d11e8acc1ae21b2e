use super::agent::{Agent, AgentSpawn};
use super::angle::Angle;
use super::bot::{rebalance_delta, BotController, ForagingBot, WorldView};
use super::collision::{can_eat_food, can_eat_prey, outside_play_area, resolve_agent_collisions};
use super::constants::{
    FOOD_ID_WRAP, LEADERBOARD_SIZE, MINIMAP_PART_STRIDE, MINIMAP_SIZE, ROTATION_BROADCAST_ANGLE,
    SKIN_COUNT,
};
use super::food::{boost_drop, death_food, natural_food, Food, FoodDrop, FoodOrigin, Prey};
use super::math::{distance_sq, point_at};
use super::types::{AgentId, DeathCause, FoodId, Point, PreyId};
use crate::config::GameConfig;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::f64::consts::TAU;

const SPAWN_SPREAD: f64 = 0.85;
const DEFAULT_BOT_NAME: &str = "Bot";

/// Something that happened during a tick that sessions may need to hear about.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    AgentSpawned(AgentId),
    AgentDied {
        id: AgentId,
        cause: DeathCause,
        segments: u32,
    },
    KillCredited {
        killer: AgentId,
        kills: u32,
    },
    Moved {
        id: AgentId,
        grew: bool,
    },
    FamChanged(AgentId),
    TailDropped(AgentId),
    Rotated(AgentId),
    FoodSpawned(Food),
    FoodEaten {
        position: Point,
        eater: AgentId,
    },
    PreySpawned(Prey),
    PreyEaten {
        id: PreyId,
        eater: AgentId,
    },
    LeaderboardDue,
    MinimapDue,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HighscoreRecord {
    pub name: String,
    pub segments: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HighscoreBanner {
    pub segments: u32,
    pub fam: f64,
    pub name: String,
    pub message: String,
}

/// Every agent, pellet and prey in the arena. Mutated only through tick methods
/// and the spawn/remove operations below.
#[derive(Debug)]
pub struct World {
    pub config: GameConfig,
    agents: BTreeMap<AgentId, Agent>,
    foods: BTreeMap<FoodId, Food>,
    prey: BTreeMap<PreyId, Prey>,
    bots: BTreeMap<AgentId, Box<dyn BotController>>,
    rng: StdRng,
    next_agent_id: AgentId,
    next_food_id: FoodId,
    next_prey_id: PreyId,
    tick_count: u64,
    highscore: HighscoreRecord,
}

impl World {
    /// A populated arena seeded from entropy.
    pub fn new(config: GameConfig) -> Self {
        let mut world = Self::from_rng(config, StdRng::from_entropy());
        world.populate();
        world
    }

    /// An empty, deterministic arena.
    pub fn with_seed(config: GameConfig, seed: u64) -> Self {
        Self::from_rng(config, StdRng::seed_from_u64(seed))
    }

    fn from_rng(config: GameConfig, rng: StdRng) -> Self {
        Self {
            config,
            agents: BTreeMap::new(),
            foods: BTreeMap::new(),
            prey: BTreeMap::new(),
            bots: BTreeMap::new(),
            rng,
            next_agent_id: 1,
            next_food_id: 1,
            next_prey_id: 1,
            tick_count: 0,
            highscore: HighscoreRecord::default(),
        }
    }

    pub fn populate(&mut self) {
        for _ in 0..self.config.initial_food_count {
            let drop = natural_food(&self.config, &mut self.rng);
            self.add_food(drop, FoodOrigin::Natural);
        }
        for _ in 0..self.config.initial_prey_count {
            self.spawn_prey();
        }
        tracing::info!(
            food = self.foods.len(),
            prey = self.prey.len(),
            "world populated"
        );
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn food_count(&self) -> usize {
        self.foods.len()
    }

    pub fn bot_count(&self) -> usize {
        self.bots.len()
    }

    pub fn human_count(&self) -> usize {
        self.agents.values().filter(|agent| !agent.is_bot).count()
    }

    fn allocate_agent_id(&mut self) -> AgentId {
        loop {
            let id = self.next_agent_id;
            self.next_agent_id = self.next_agent_id.wrapping_add(1);
            if id != 0 && !self.agents.contains_key(&id) {
                return id;
            }
        }
    }

    fn allocate_food_id(&mut self) -> FoodId {
        let id = self.next_food_id;
        self.next_food_id += 1;
        if self.next_food_id > FOOD_ID_WRAP {
            self.next_food_id = 1;
        }
        id
    }

    fn allocate_prey_id(&mut self) -> PreyId {
        loop {
            let id = self.next_prey_id;
            self.next_prey_id = self.next_prey_id.wrapping_add(1);
            if id != 0 && !self.prey.contains_key(&id) {
                return id;
            }
        }
    }

    pub fn random_spawn_point(&mut self) -> Point {
        let angle = self.rng.gen::<f64>() * TAU;
        let radius = self.rng.gen::<f64>().sqrt() * self.config.play_radius * SPAWN_SPREAD;
        point_at(self.config.center(), angle, radius)
    }

    pub fn spawn_agent(&mut self, spawn: AgentSpawn) -> AgentId {
        let position = self.random_spawn_point();
        let heading = Angle::from_radians(self.rng.gen::<f64>() * TAU);
        self.spawn_agent_at(spawn, position, heading)
    }

    pub fn spawn_agent_at(&mut self, spawn: AgentSpawn, position: Point, heading: Angle) -> AgentId {
        let id = self.allocate_agent_id();
        let agent = Agent::new(id, spawn, position, heading, self.config.initial_parts);
        tracing::debug!(agent_id = id, is_bot = agent.is_bot, name = %agent.name, "agent spawned");
        self.agents.insert(id, agent);
        id
    }

    /// Team assignment for a new agent: random side in team mode, none otherwise.
    pub fn pick_team(&mut self) -> u8 {
        if self.config.team_mode() {
            if self.rng.gen_bool(0.5) {
                1
            } else {
                2
            }
        } else {
            0
        }
    }

    pub fn spawn_bot(&mut self) -> AgentId {
        let name = self
            .config
            .bot_names
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_else(|| DEFAULT_BOT_NAME.to_string());
        let spawn = AgentSpawn {
            name,
            skin: self.rng.gen_range(0..SKIN_COUNT),
            custom_skin: Vec::new(),
            team: self.pick_team(),
            is_bot: true,
        };
        let id = self.spawn_agent(spawn);
        let bot_rng = StdRng::seed_from_u64(self.rng.gen());
        self.bots.insert(id, Box::new(ForagingBot::new(bot_rng)));
        id
    }

    /// Removes an agent, turning its body into food unless the cause forbids it.
    pub fn remove_agent(&mut self, id: AgentId, cause: DeathCause) -> Vec<WorldEvent> {
        let mut events = Vec::new();
        self.bots.remove(&id);
        let Some(agent) = self.agents.remove(&id) else {
            return events;
        };
        if cause.drops_food() && agent.sct > 2 {
            let drops = death_food(&self.config, &agent, &mut self.rng);
            let world_size = self.config.world_size();
            for drop in drops {
                let inside = (0.0..=world_size).contains(&drop.position.x)
                    && (0.0..=world_size).contains(&drop.position.y);
                if inside {
                    let food_id = self.add_food(drop, FoodOrigin::Death);
                    if let Some(food) = self.foods.get(&food_id) {
                        events.push(WorldEvent::FoodSpawned(food.clone()));
                    }
                }
            }
        }
        tracing::debug!(agent_id = id, is_bot = agent.is_bot, ?cause, segments = agent.sct, "agent removed");
        events.push(WorldEvent::AgentDied {
            id,
            cause,
            segments: agent.sct,
        });
        events
    }

    pub fn add_food(&mut self, drop: FoodDrop, origin: FoodOrigin) -> FoodId {
        let id = self.allocate_food_id();
        self.foods.insert(
            id,
            Food {
                id,
                position: drop.position,
                color: drop.color,
                size: drop.size,
                origin,
            },
        );
        id
    }

    pub fn spawn_prey(&mut self) -> PreyId {
        let id = self.allocate_prey_id();
        let prey = Prey::spawn(id, &self.config, &mut self.rng);
        self.prey.insert(id, prey);
        id
    }

    /// Angle tick: turns every agent and reports which ones need a rotation update.
    pub fn angle_tick(&mut self, dt_ms: f64) -> Vec<WorldEvent> {
        let interval = self.config.rotation_broadcast_ms;
        let mut events = Vec::new();
        for agent in self.agents.values_mut() {
            agent.update_heading(dt_ms);
            if agent.rotation_due(dt_ms, interval, ROTATION_BROADCAST_ANGLE) {
                events.push(WorldEvent::Rotated(agent.id));
            }
        }
        events
    }

    /// Motion tick: runs whatever movement steps each agent's speed has made due.
    pub fn motion_tick(&mut self, dt_ms: f64) -> Vec<WorldEvent> {
        let mut events = Vec::new();
        let mut drops = Vec::new();
        for agent in self.agents.values_mut() {
            let steps = agent.due_move_steps(dt_ms);
            for _ in 0..steps {
                let step = agent.move_step();
                events.push(WorldEvent::Moved {
                    id: agent.id,
                    grew: step.grew,
                });
                if let Some(tail) = step.dropped_tail {
                    drops.push((tail, agent.scale()));
                }
                if step.tail_removed {
                    events.push(WorldEvent::TailDropped(agent.id));
                } else if step.fam_changed {
                    events.push(WorldEvent::FamChanged(agent.id));
                }
            }
        }
        for (tail, scale) in drops {
            let drop = boost_drop(&self.config, tail, scale, &mut self.rng);
            let id = self.add_food(drop, FoodOrigin::BoostDrop);
            if let Some(food) = self.foods.get(&id) {
                events.push(WorldEvent::FoodSpawned(food.clone()));
            }
        }
        events
    }

    /// World tick: eating, bots, prey, collisions, boundary, respawns and
    /// periodic broadcasts, in that order.
    pub fn tick(&mut self) -> Vec<WorldEvent> {
        self.tick_count += 1;
        let dt_ms = self.config.tick_ms as f64;
        let mut events = Vec::new();

        self.resolve_eating(&mut events);
        self.update_bots(dt_ms);
        let world_size = self.config.world_size();
        for prey in self.prey.values_mut() {
            prey.update(dt_ms, world_size, &mut self.rng);
        }
        self.resolve_collisions(&mut events);
        for agent in self.agents.values_mut() {
            agent.sweep_origin = None;
        }
        self.resolve_boundary(&mut events);
        self.respawn_food(&mut events);

        if self.prey.len() < self.config.max_prey_count
            && self.rng.gen_bool(self.config.prey_spawn_chance.clamp(0.0, 1.0))
        {
            let id = self.spawn_prey();
            if let Some(prey) = self.prey.get(&id) {
                events.push(WorldEvent::PreySpawned(prey.clone()));
            }
        }

        if self.tick_count % self.config.leaderboard_interval == 0 {
            events.push(WorldEvent::LeaderboardDue);
        }
        if self.tick_count % self.config.minimap_interval == 0 {
            events.push(WorldEvent::MinimapDue);
        }
        if self.tick_count % self.config.bot_rebalance_interval == 0 {
            self.rebalance_bots(&mut events);
        }
        events
    }

    fn resolve_eating(&mut self, events: &mut Vec<WorldEvent>) {
        for agent in self.agents.values_mut() {
            let eaten: Vec<FoodId> = self
                .foods
                .values()
                .filter(|food| can_eat_food(agent, food.position))
                .map(|food| food.id)
                .collect();
            let prey: Vec<PreyId> = self
                .prey
                .values()
                .filter(|prey| can_eat_prey(agent, prey.position))
                .map(|prey| prey.id)
                .collect();
            if eaten.is_empty() && prey.is_empty() {
                continue;
            }
            for id in eaten {
                if let Some(food) = self.foods.remove(&id) {
                    agent.eat(food.value());
                    events.push(WorldEvent::FoodEaten {
                        position: food.position,
                        eater: agent.id,
                    });
                }
            }
            for id in prey {
                if let Some(prey) = self.prey.remove(&id) {
                    agent.eat(prey.value());
                    events.push(WorldEvent::PreyEaten { id, eater: agent.id });
                }
            }
            events.push(WorldEvent::FamChanged(agent.id));
        }
    }

    fn update_bots(&mut self, dt_ms: f64) {
        if self.bots.is_empty() {
            return;
        }
        let mut bots = std::mem::take(&mut self.bots);
        let mut intents = Vec::with_capacity(bots.len());
        for (id, bot) in bots.iter_mut() {
            let Some(agent) = self.agents.get(id) else { continue };
            if let Some(intent) = bot.update(agent, &*self, dt_ms) {
                intents.push((*id, intent));
            }
        }
        self.bots = bots;
        for (id, intent) in intents {
            if let Some(agent) = self.agents.get_mut(&id) {
                agent.set_wanted_heading(intent.heading);
                agent.set_boost(intent.boost);
            }
        }
    }

    fn resolve_collisions(&mut self, events: &mut Vec<WorldEvent>) {
        let kills = {
            let agents: Vec<&Agent> = self.agents.values().collect();
            resolve_agent_collisions(&agents, self.config.team_mode())
        };
        for kill in &kills {
            if let Some(killer) = kill.killer.and_then(|id| self.agents.get_mut(&id)) {
                killer.kills += 1;
                events.push(WorldEvent::KillCredited {
                    killer: killer.id,
                    kills: killer.kills,
                });
            }
        }
        for kill in kills {
            events.extend(self.remove_agent(
                kill.victim,
                DeathCause::Collision {
                    killer: kill.killer,
                },
            ));
        }
    }

    fn resolve_boundary(&mut self, events: &mut Vec<WorldEvent>) {
        let center = self.config.center();
        let play_radius = self.config.play_radius;
        let escaped: Vec<AgentId> = self
            .agents
            .values()
            .filter(|agent| outside_play_area(agent, center, play_radius))
            .map(|agent| agent.id)
            .collect();
        for id in escaped {
            events.extend(self.remove_agent(id, DeathCause::Boundary));
        }
    }

    fn respawn_food(&mut self, events: &mut Vec<WorldEvent>) {
        if self.tick_count % self.config.food_spawn_interval != 0 {
            return;
        }
        if self.foods.len() >= self.config.max_food_count {
            return;
        }
        for _ in 0..self.config.food_per_spawn {
            let drop = natural_food(&self.config, &mut self.rng);
            let id = self.add_food(drop, FoodOrigin::Natural);
            if let Some(food) = self.foods.get(&id) {
                events.push(WorldEvent::FoodSpawned(food.clone()));
            }
        }
    }

    fn rebalance_bots(&mut self, events: &mut Vec<WorldEvent>) {
        let humans = self.human_count();
        let delta = rebalance_delta(
            humans,
            self.bots.len(),
            self.config.min_players,
            self.config.max_bots,
        );
        if delta > 0 {
            for _ in 0..delta {
                let id = self.spawn_bot();
                events.push(WorldEvent::AgentSpawned(id));
            }
        } else if delta < 0 {
            let doomed: Vec<AgentId> = self.bots.keys().take(delta.unsigned_abs() as usize).copied().collect();
            for id in doomed {
                events.extend(self.remove_agent(id, DeathCause::Disconnect));
            }
        }
        if delta != 0 {
            tracing::debug!(humans, bots = self.bots.len(), delta, "bots rebalanced");
        }
    }

    /// Agents ordered by score, best first; ties keep the older agent first.
    pub fn ranked_agents(&self) -> Vec<&Agent> {
        let mut ranked: Vec<(i64, &Agent)> = self.agents.values().map(|agent| (agent.score(), agent)).collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.id.cmp(&b.1.id)));
        ranked.into_iter().map(|(_, agent)| agent).collect()
    }

    pub fn leaderboard(&self) -> Vec<&Agent> {
        let mut ranked = self.ranked_agents();
        ranked.truncate(LEADERBOARD_SIZE);
        ranked
    }

    /// 1-based rank by score, or 0 when the agent is gone.
    pub fn rank_of(&self, id: AgentId) -> u16 {
        self.ranked_agents()
            .iter()
            .position(|agent| agent.id == id)
            .map(|index| (index + 1).min(u16::MAX as usize) as u16)
            .unwrap_or(0)
    }

    /// Summed scores of team 1 and team 2.
    pub fn team_scores(&self) -> (u32, u32) {
        self.agents.values().fold((0, 0), |(first, second), agent| {
            let score = agent.score().max(0) as u32;
            match agent.team {
                1 => (first.saturating_add(score), second),
                2 => (first, second.saturating_add(score)),
                _ => (first, second),
            }
        })
    }

    /// Occupancy grid of `MINIMAP_SIZE` squared cells covering the whole world.
    pub fn minimap_cells(&self) -> Vec<bool> {
        let mut cells = vec![false; MINIMAP_SIZE * MINIMAP_SIZE];
        let cell_size = self.config.world_size() / MINIMAP_SIZE as f64;
        let mut mark = |point: Point| {
            let x = (point.x / cell_size).floor();
            let y = (point.y / cell_size).floor();
            if x >= 0.0 && y >= 0.0 && (x as usize) < MINIMAP_SIZE && (y as usize) < MINIMAP_SIZE {
                cells[y as usize * MINIMAP_SIZE + x as usize] = true;
            }
        };
        for agent in self.agents.values() {
            mark(agent.position);
            for part in agent.parts.iter().step_by(MINIMAP_PART_STRIDE) {
                mark(*part);
            }
        }
        cells
    }

    pub fn highscore(&self) -> &HighscoreRecord {
        &self.highscore
    }

    /// Stores a player's parting message if their final length ties or beats the record.
    pub fn record_victory(&mut self, name: &str, segments: u32, message: &str) -> bool {
        if segments < self.highscore.segments {
            return false;
        }
        self.highscore = HighscoreRecord {
            name: name.to_string(),
            segments,
            message: message.to_string(),
        };
        tracing::info!(name, segments, "new highscore message");
        true
    }

    /// The recorded champion while it still matches the live leader, else the live leader.
    pub fn highscore_banner(&self) -> Option<HighscoreBanner> {
        let leader = self.ranked_agents().into_iter().next();
        let record = &self.highscore;
        if record.segments > 0 && record.segments >= leader.map_or(0, |agent| agent.sct) {
            return Some(HighscoreBanner {
                segments: record.segments,
                fam: 0.0,
                name: record.name.clone(),
                message: record.message.clone(),
            });
        }
        leader.map(|agent| HighscoreBanner {
            segments: agent.sct,
            fam: agent.fam,
            name: agent.name.clone(),
            message: String::new(),
        })
    }
}

impl WorldView for World {
    fn agents_near(&self, center: Point, radius: f64) -> Vec<&Agent> {
        let radius_sq = radius * radius;
        self.agents
            .values()
            .filter(|agent| distance_sq(agent.position, center) <= radius_sq)
            .collect()
    }

    fn food_near(&self, center: Point, radius: f64) -> Vec<&Food> {
        let radius_sq = radius * radius;
        self.foods
            .values()
            .filter(|food| distance_sq(food.position, center) <= radius_sq)
            .collect()
    }

    fn prey_near(&self, center: Point, radius: f64) -> Vec<&Prey> {
        let radius_sq = radius * radius;
        self.prey
            .values()
            .filter(|prey| distance_sq(prey.position, center) <= radius_sq)
            .collect()
    }

    fn has_food(&self, id: FoodId) -> bool {
        self.foods.contains_key(&id)
    }

    fn center(&self) -> Point {
        self.config.center()
    }

    fn play_radius(&self) -> f64 {
        self.config.play_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> GameConfig {
        GameConfig {
            initial_food_count: 0,
            initial_prey_count: 0,
            max_food_count: 0,
            max_prey_count: 0,
            min_players: 0,
            max_bots: 0,
            ..GameConfig::default()
        }
    }

    fn named(name: &str) -> AgentSpawn {
        AgentSpawn {
            name: name.to_string(),
            ..AgentSpawn::default()
        }
    }

    fn pellet_at(position: Point, size: u8) -> FoodDrop {
        FoodDrop {
            position,
            color: 1,
            size,
        }
    }

    #[test]
    fn eating_a_pellet_adds_quadratic_growth() {
        let mut world = World::with_seed(quiet_config(), 1);
        let head = world.config.center();
        let id = world.spawn_agent_at(named("a"), head, Angle::ZERO);
        world.add_food(pellet_at(head, 47), FoodOrigin::Natural);
        let events = world.tick();
        let agent = world.agent(id).cloned().unwrap_or_else(|| panic!("agent missing"));
        let expected = 47.0 * 47.0 * 46.0 * 46.0 / 16_777_216.0;
        assert!((agent.fam - expected).abs() < 1e-12);
        assert_eq!(agent.sct, 2);
        assert_eq!(world.food_count(), 0);
        assert!(events.contains(&WorldEvent::FoodEaten {
            position: head,
            eater: id,
        }));
    }

    #[test]
    fn a_big_meal_schedules_deferred_growth() {
        let mut world = World::with_seed(quiet_config(), 2);
        let head = world.config.center();
        let id = world.spawn_agent_at(named("a"), head, Angle::ZERO);
        for _ in 0..5 {
            world.add_food(pellet_at(head, 255), FoodOrigin::Natural);
        }
        world.tick();
        let Some(agent) = world.agent(id) else { panic!("agent missing") };
        let fam_total: f64 = 5.0 * 255.0 * 255.0 * 46.0 * 46.0 / 16_777_216.0;
        let grown = fam_total.floor() as u32;
        assert_eq!(agent.sct, 2 + grown);
        assert_eq!(agent.pending_growth, grown);
        assert!((agent.fam - (fam_total - grown as f64)).abs() < 1e-9);
        assert_eq!(agent.parts.len(), 2);
    }

    #[test]
    fn motion_tick_splices_growth_before_next_collision_pass() {
        let mut world = World::with_seed(quiet_config(), 3);
        let head = world.config.center();
        let id = world.spawn_agent_at(named("a"), head, Angle::ZERO);
        if let Some(agent) = world.agent_mut(id) {
            agent.eat(255.0);
        }
        let interval = world.agent(id).map(|agent| agent.move_interval_ms()).unwrap_or(1.0);
        let events = world.motion_tick(interval + 1.0);
        assert!(events.contains(&WorldEvent::Moved { id, grew: true }));
        let Some(agent) = world.agent(id) else { panic!("agent missing") };
        assert_eq!(agent.parts.len(), 3);
        assert_eq!(agent.pending_growth, agent.sct - 3);
    }

    #[test]
    fn equal_head_on_collision_clears_both_from_leaderboard() {
        let mut world = World::with_seed(quiet_config(), 4);
        let center = world.config.center();
        let a = world.spawn_agent_at(named("a"), center, Angle::ZERO);
        let b = world.spawn_agent_at(
            named("b"),
            Point::new(center.x + 20.0, center.y),
            Angle::from_radians(std::f64::consts::PI),
        );
        let events = world.tick();
        assert!(world.agent(a).is_none());
        assert!(world.agent(b).is_none());
        assert!(world.leaderboard().is_empty());
        let deaths: Vec<_> = events
            .iter()
            .filter(|event| matches!(event, WorldEvent::AgentDied { .. }))
            .collect();
        assert_eq!(deaths.len(), 2);
        assert!(!events.iter().any(|event| matches!(event, WorldEvent::KillCredited { .. })));
    }

    #[test]
    fn larger_agent_wins_head_on_and_gets_credit() {
        let mut world = World::with_seed(quiet_config(), 5);
        let center = world.config.center();
        let big = world.spawn_agent_at(named("big"), center, Angle::ZERO);
        let small = world.spawn_agent_at(
            named("small"),
            Point::new(center.x + 20.0, center.y),
            Angle::from_radians(std::f64::consts::PI),
        );
        if let Some(agent) = world.agent_mut(big) {
            agent.sct = 3;
            agent.parts.push(Point::new(center.x - 126.0, center.y));
        }
        let events = world.tick();
        assert!(world.agent(small).is_none());
        assert_eq!(world.agent(big).map(|agent| agent.kills), Some(1));
        assert!(events.contains(&WorldEvent::KillCredited { killer: big, kills: 1 }));
    }

    #[test]
    fn boundary_death_drops_no_food() {
        let mut world = World::with_seed(quiet_config(), 6);
        let center = world.config.center();
        let radius = world.config.play_radius;
        let outside = world.spawn_agent_at(
            named("out"),
            Point::new(center.x + radius + 1.0, center.y),
            Angle::ZERO,
        );
        let inside = world.spawn_agent_at(
            named("in"),
            Point::new(center.x - radius + 1.0, center.y),
            Angle::from_radians(std::f64::consts::PI),
        );
        if let Some(agent) = world.agent_mut(outside) {
            agent.sct = 50;
        }
        let events = world.tick();
        assert!(world.agent(outside).is_none());
        assert!(world.agent(inside).is_some());
        assert_eq!(world.food_count(), 0);
        assert!(events.contains(&WorldEvent::AgentDied {
            id: outside,
            cause: DeathCause::Boundary,
            segments: 50,
        }));
    }

    #[test]
    fn disconnect_turns_body_into_food() {
        let mut config = quiet_config();
        config.initial_parts = 30;
        let mut world = World::with_seed(config, 7);
        let center = world.config.center();
        let id = world.spawn_agent_at(named("a"), center, Angle::ZERO);
        let events = world.remove_agent(id, DeathCause::Disconnect);
        assert!(world.food_count() > 0);
        let spawned = events
            .iter()
            .filter(|event| matches!(event, WorldEvent::FoodSpawned(_)))
            .count();
        assert_eq!(spawned, world.food_count());
        assert!(world.remove_agent(id, DeathCause::Disconnect).is_empty());
    }

    #[test]
    fn boosting_sheds_food_during_motion() {
        let mut config = quiet_config();
        config.initial_parts = 10;
        let mut world = World::with_seed(config, 8);
        let center = world.config.center();
        let id = world.spawn_agent_at(named("a"), center, Angle::ZERO);
        if let Some(agent) = world.agent_mut(id) {
            agent.set_boost(true);
            agent.update_heading(16.0);
        }
        let interval = world.agent(id).map(|agent| agent.move_interval_ms()).unwrap_or(1.0);
        let events = world.motion_tick(interval);
        assert!(events.contains(&WorldEvent::TailDropped(id)));
        assert_eq!(world.food_count(), 1);
        assert_eq!(world.agent(id).map(|agent| agent.sct), Some(9));
    }

    #[test]
    fn boosting_through_pending_growth_drops_food_without_tail_removal() {
        let mut config = quiet_config();
        config.initial_parts = 10;
        let mut world = World::with_seed(config, 8);
        let center = world.config.center();
        let id = world.spawn_agent_at(named("a"), center, Angle::ZERO);
        if let Some(agent) = world.agent_mut(id) {
            agent.eat(200.0);
            agent.fam = 0.5;
            agent.set_boost(true);
            agent.update_heading(16.0);
        }
        let interval = world.agent(id).map(|agent| agent.move_interval_ms()).unwrap_or(1.0);
        let events = world.motion_tick(interval);
        assert!(!events.contains(&WorldEvent::TailDropped(id)));
        assert!(events.contains(&WorldEvent::Moved { id, grew: true }));
        assert_eq!(world.food_count(), 1);
        assert_eq!(world.agent(id).map(|agent| agent.sct), Some(14));
    }

    #[test]
    fn world_tick_settles_pending_sweeps() {
        let mut world = World::with_seed(quiet_config(), 8);
        let center = world.config.center();
        let id = world.spawn_agent_at(named("a"), center, Angle::ZERO);
        let interval = world.agent(id).map(|agent| agent.move_interval_ms()).unwrap_or(1.0);
        world.motion_tick(interval);
        assert!(world.agent(id).and_then(|agent| agent.sweep_origin).is_some());
        world.tick();
        assert_eq!(world.agent(id).and_then(|agent| agent.sweep_origin), None);
    }

    #[test]
    fn leaderboard_orders_by_score() {
        let mut world = World::with_seed(quiet_config(), 9);
        let small = world.spawn_agent_at(named("small"), Point::new(1000.0, 1000.0), Angle::ZERO);
        let big = world.spawn_agent_at(named("big"), Point::new(3000.0, 3000.0), Angle::ZERO);
        if let Some(agent) = world.agent_mut(big) {
            agent.eat(255.0);
        }
        let ids: Vec<AgentId> = world.leaderboard().iter().map(|agent| agent.id).collect();
        assert_eq!(ids, vec![big, small]);
        assert_eq!(world.rank_of(big), 1);
        assert_eq!(world.rank_of(small), 2);
        assert_eq!(world.rank_of(999), 0);
    }

    #[test]
    fn highscore_prefers_record_until_overtaken() {
        let mut world = World::with_seed(quiet_config(), 10);
        assert!(world.highscore_banner().is_none());
        let id = world.spawn_agent_at(named("live"), Point::new(1000.0, 1000.0), Angle::ZERO);
        assert!(world.record_victory("champ", 5, "gg"));
        assert!(!world.record_victory("late", 4, "nope"));
        let banner = world.highscore_banner();
        assert_eq!(banner.as_ref().map(|b| b.name.as_str()), Some("champ"));
        assert_eq!(banner.as_ref().map(|b| b.message.as_str()), Some("gg"));

        if let Some(agent) = world.agent_mut(id) {
            agent.sct = 6;
        }
        let banner = world.highscore_banner();
        assert_eq!(banner.map(|b| b.name), Some("live".to_string()));
    }

    #[test]
    fn minimap_marks_agent_cells() {
        let mut world = World::with_seed(quiet_config(), 11);
        world.spawn_agent_at(named("a"), Point::new(25.0, 25.0), Angle::ZERO);
        world.spawn_agent_at(named("b"), Point::new(3990.0, 3990.0), Angle::ZERO);
        let cells = world.minimap_cells();
        assert_eq!(cells.len(), MINIMAP_SIZE * MINIMAP_SIZE);
        assert!(cells[0]);
        assert!(cells[MINIMAP_SIZE * MINIMAP_SIZE - 1]);
    }

    #[test]
    fn bots_fill_up_to_target() {
        let mut config = quiet_config();
        config.min_players = 3;
        config.max_bots = 5;
        config.bot_rebalance_interval = 1;
        let mut world = World::with_seed(config, 12);
        world.tick();
        assert_eq!(world.bot_count(), 2);
        world.tick();
        assert_eq!(world.bot_count(), 3);
        world.tick();
        assert_eq!(world.bot_count(), 3);
        assert!(world.agents().all(|agent| agent.is_bot));
    }

    #[test]
    fn agent_ids_skip_zero_and_live_ids() {
        let mut world = World::with_seed(quiet_config(), 13);
        world.next_agent_id = u16::MAX;
        let first = world.spawn_agent_at(named("a"), Point::new(1000.0, 1000.0), Angle::ZERO);
        let second = world.spawn_agent_at(named("b"), Point::new(1500.0, 1000.0), Angle::ZERO);
        assert_eq!(first, u16::MAX);
        assert_eq!(second, 1);
    }
}
