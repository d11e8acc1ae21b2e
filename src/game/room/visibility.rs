use super::*;
use crate::game::constants::SECTOR_VIEW_RANGE;
use std::collections::BTreeSet;

impl RoomState {
    /// Everything a freshly spawned player needs before the first tick reaches it.
    pub(super) fn send_world_snapshot(&mut self, session_id: &str, agent_id: AgentId) {
        let Some(center) = self.world.agent(agent_id).map(|agent| agent.position) else { return };
        let range = self.config.view_range;

        let mut payloads = Vec::new();
        let mut seen = Vec::new();
        for agent in self.world.agents_near(center, range) {
            if agent.id == agent_id {
                continue;
            }
            payloads.push(messages::encode_agent_spawn(agent));
            seen.push(agent.id);
        }
        payloads.extend(messages::encode_food_batch(self.world.food_near(center, range)));
        for prey in self.world.prey_near(center, range) {
            payloads.push(messages::encode_prey_spawn(prey));
        }
        let window = sector_window(&self.config, center);
        for &(x, y) in &window {
            payloads.push(messages::encode_add_sector(x, y));
        }
        payloads.push(leaderboard_payload(&self.world, Some(agent_id)));
        if let Some(banner) = highscore_payload(&self.world) {
            payloads.push(banner);
        }

        if let Some(session) = self.sessions.get_mut(session_id) {
            session.visible_agents.extend(seen);
            session.sectors = window;
        }
        for payload in payloads {
            self.send_to(session_id, payload);
        }
    }

    /// Tells every other player in range that `agent_id` has appeared.
    pub(super) fn announce_agent(&mut self, agent_id: AgentId) {
        let Some(agent) = self.world.agent(agent_id) else { return };
        let payload = messages::encode_agent_spawn(agent);
        let range = self.config.view_range;
        for (session_id, session) in self.sessions.iter_mut() {
            if session.agent_id == Some(agent_id) {
                continue;
            }
            let Some(viewer) = session.agent_id.and_then(|id| self.world.agent(id)) else { continue };
            if !within_radius(viewer.position, agent.position, range) {
                continue;
            }
            session.visible_agents.insert(agent_id);
            if !session.send(payload.clone()) {
                self.stale.push(session_id.clone());
            }
        }
    }

    /// Spawns agents that came into range, drops those that left, and slides the sector window.
    pub(super) fn refresh_visibility(&mut self) {
        let range = self.config.view_range;
        let world = &self.world;
        for (session_id, session) in self.sessions.iter_mut() {
            let Some(own) = session.agent_id.and_then(|id| world.agent(id)) else { continue };
            let mut payloads = Vec::new();

            for agent in world.agents_near(own.position, range) {
                if agent.id != own.id && session.visible_agents.insert(agent.id) {
                    payloads.push(messages::encode_agent_spawn(agent));
                }
            }
            let departed: Vec<AgentId> = session
                .visible_agents
                .iter()
                .copied()
                .filter(|id| {
                    world
                        .agent(*id)
                        .map_or(true, |agent| !within_radius(agent.position, own.position, range))
                })
                .collect();
            for id in departed {
                session.visible_agents.remove(&id);
                if world.agent(id).is_some() {
                    payloads.push(messages::encode_agent_remove(id, false));
                }
            }

            let window = sector_window(&self.config, own.position);
            for &(x, y) in window.difference(&session.sectors) {
                payloads.push(messages::encode_add_sector(x, y));
            }
            for &(x, y) in session.sectors.difference(&window) {
                payloads.push(messages::encode_remove_sector(x, y));
            }
            session.sectors = window;

            if !payloads.into_iter().all(|payload| session.send(payload)) {
                self.stale.push(session_id.clone());
            }
        }
    }
}

/// Sectors within `SECTOR_VIEW_RANGE` of the sector containing `position`.
pub(super) fn sector_window(config: &GameConfig, position: Point) -> BTreeSet<(u8, u8)> {
    let size = f64::from(config.sector_size.max(1));
    let count = i32::from(config.sector_count).min(i32::from(u8::MAX) + 1);
    let sector_x = (position.x / size).floor() as i32;
    let sector_y = (position.y / size).floor() as i32;

    let mut window = BTreeSet::new();
    for y in (sector_y - SECTOR_VIEW_RANGE).max(0)..=(sector_y + SECTOR_VIEW_RANGE).min(count - 1) {
        for x in (sector_x - SECTOR_VIEW_RANGE).max(0)..=(sector_x + SECTOR_VIEW_RANGE).min(count - 1) {
            window.insert((x as u8, y as u8));
        }
    }
    window
}
