mod session;
mod visibility;


use self::session::SessionEntry;
use super::agent::{Agent, AgentSpawn};
use super::bot::WorldView;
use super::math::within_radius;
use super::types::{AgentId, DeathCause, Point};
use super::world::{World, WorldEvent};
use crate::config::GameConfig;
use crate::protocol::messages;
use crate::protocol::{self, ClientMessage, Login, SessionPhase};
use crate::shared::names::sanitize_player_name;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use uuid::Uuid;

const MAX_CUSTOM_SKIN_LEN: usize = 255;

/// The arena: one world, every connected session, and the timers that drive them.
#[derive(Debug)]
pub struct Room {
  config: Arc<GameConfig>,
  state: Mutex<RoomState>,
  running: AtomicBool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inbound {
  Continue,
  Joined,
  Close,
}

#[derive(Debug)]
struct RoomState {
  config: Arc<GameConfig>,
  world: World,
  sessions: HashMap<String, SessionEntry>,
  stale: Vec<String>,
}

impl Room {
  pub fn new(config: Arc<GameConfig>) -> Self {
    let world = World::new(config.as_ref().clone());
    Self {
      state: Mutex::new(RoomState::new(Arc::clone(&config), world)),
      config,
      running: AtomicBool::new(false),
    }
  }

  pub async fn add_session(&self, sender: UnboundedSender<Vec<u8>>) -> String {
    let mut state = self.state.lock().await;
    state.add_session(sender)
  }

  pub async fn remove_session(&self, session_id: &str) {
    let mut state = self.state.lock().await;
    state.disconnect_session(session_id);
    state.flush_stale();
  }

  /// Feeds one inbound frame through the session's state machine. Returns `false`
  /// when the connection should be closed.
  pub async fn handle_binary_message(self: &Arc<Self>, session_id: &str, data: &[u8]) -> bool {
    let mut state = self.state.lock().await;
    let inbound = state.handle_binary(session_id, data);
    drop(state);
    match inbound {
      Inbound::Continue => true,
      Inbound::Joined => {
        self.ensure_loop();
        true
      }
      Inbound::Close => false,
    }
  }

  fn ensure_loop(self: &Arc<Self>) {
    if self
      .running
      .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
      .is_err()
    {
      return;
    }

    let room = Arc::clone(self);
    tokio::spawn(async move {
      let mut world_timer = timer(room.config.tick_ms);
      let mut motion_timer = timer(room.config.motion_tick_ms);
      let mut angle_timer = timer(room.config.angle_tick_ms);
      let mut last_motion = Instant::now();
      let mut last_angle = Instant::now();
      tracing::info!(
        tick_ms = room.config.tick_ms,
        motion_tick_ms = room.config.motion_tick_ms,
        angle_tick_ms = room.config.angle_tick_ms,
        "room loop started"
      );

      loop {
        tokio::select! {
          _ = world_timer.tick() => {
            let mut state = room.state.lock().await;
            if state.sessions.is_empty() {
              room.running.store(false, Ordering::SeqCst);
              break;
            }
            state.world_tick();
          }
          _ = motion_timer.tick() => {
            let dt_ms = elapsed_ms(&mut last_motion);
            room.state.lock().await.motion_tick(dt_ms);
          }
          _ = angle_timer.tick() => {
            let dt_ms = elapsed_ms(&mut last_angle);
            room.state.lock().await.angle_tick(dt_ms);
          }
        }
      }
      tracing::info!("room loop stopped");
    });
  }
}

fn timer(period_ms: u64) -> Interval {
  let mut interval = tokio::time::interval(Duration::from_millis(period_ms));
  interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
  interval
}

fn elapsed_ms(last: &mut Instant) -> f64 {
  let now = Instant::now();
  let elapsed = now.duration_since(*last);
  *last = now;
  elapsed.as_secs_f64() * 1000.0
}

/// Sends `build`'s payload, if any, to each session; unreachable sessions are queued as stale.
fn broadcast(
  sessions: &mut HashMap<String, SessionEntry>,
  stale: &mut Vec<String>,
  mut build: impl FnMut(&mut SessionEntry) -> Option<Vec<u8>>,
) {
  for (session_id, session) in sessions.iter_mut() {
    let Some(payload) = build(session) else { continue };
    if !session.send(payload) {
      stale.push(session_id.clone());
    }
  }
}

fn viewer_in_range(world: &World, session: &SessionEntry, point: Point, range: f64) -> bool {
  session
    .agent_id
    .and_then(|id| world.agent(id))
    .map_or(false, |agent| within_radius(agent.position, point, range))
}

fn leaderboard_payload(world: &World, agent_id: Option<AgentId>) -> Vec<u8> {
  let rank = agent_id.map_or(0, |id| world.rank_of(id));
  let count = world.agent_count().min(u16::MAX as usize) as u16;
  messages::encode_leaderboard(rank, count, &world.leaderboard())
}

fn highscore_payload(world: &World) -> Option<Vec<u8>> {
  world
    .highscore_banner()
    .map(|banner| messages::encode_highscore(banner.segments, banner.fam, &banner.name, &banner.message))
}

impl RoomState {
  fn new(config: Arc<GameConfig>, world: World) -> Self {
    Self {
      config,
      world,
      sessions: HashMap::new(),
      stale: Vec::new(),
    }
  }

  fn add_session(&mut self, sender: UnboundedSender<Vec<u8>>) -> String {
    let session_id = Uuid::new_v4().to_string();
    self.sessions.insert(
      session_id.clone(),
      SessionEntry::new(sender, self.config.default_protocol_version),
    );
    tracing::debug!(session_id = %session_id, "session connected");
    session_id
  }

  fn disconnect_session(&mut self, session_id: &str) {
    let Some(session) = self.sessions.remove(session_id) else { return };
    tracing::info!(session_id, agent_id = ?session.agent_id, "session disconnected");
    if let Some(agent_id) = session.agent_id {
      let events = self.world.remove_agent(agent_id, DeathCause::Disconnect);
      self.dispatch(events);
    }
  }

  fn flush_stale(&mut self) {
    loop {
      let stale = std::mem::take(&mut self.stale);
      if stale.is_empty() {
        break;
      }
      for session_id in stale {
        if self.sessions.contains_key(&session_id) {
          tracing::warn!(session_id = %session_id, "dropping unreachable session");
          self.disconnect_session(&session_id);
        }
      }
    }
  }

  fn send_to(&mut self, session_id: &str, payload: Vec<u8>) {
    let Some(session) = self.sessions.get_mut(session_id) else { return };
    if !session.send(payload) {
      self.stale.push(session_id.to_string());
    }
  }

  fn handle_binary(&mut self, session_id: &str, data: &[u8]) -> Inbound {
    let Some(phase) = self.sessions.get(session_id).map(|session| session.phase) else {
      return Inbound::Close;
    };
    let message = match protocol::decode_client_message(phase, data) {
      Ok(message) => message,
      Err(error) => {
        tracing::debug!(session_id, ?phase, %error, "dropping malformed message");
        return Inbound::Continue;
      }
    };
    let inbound = self.handle_client_message(session_id, message);
    self.flush_stale();
    inbound
  }

  fn handle_client_message(&mut self, session_id: &str, message: ClientMessage) -> Inbound {
    match message {
      ClientMessage::SelectMode { time_header } => {
        if let Some(session) = self.sessions.get_mut(session_id) {
          session.time_header = time_header;
          session.phase = SessionPhase::GotMode;
        }
      }
      ClientMessage::StartLogin => {
        if let Some(session) = self.sessions.get_mut(session_id) {
          session.phase = SessionPhase::WaitingSecret;
        }
        self.send_to(session_id, messages::encode_pre_init());
      }
      ClientMessage::SecretResponse => {
        tracing::debug!(session_id, "ignoring secret response");
      }
      ClientMessage::SetUsername(login) => {
        if self.handle_login(session_id, login) {
          return Inbound::Joined;
        }
      }
      ClientMessage::Ping => self.send_to(session_id, messages::encode_pong()),
      ClientMessage::TargetAngle(value) => self.steer(session_id, |agent| agent.apply_target_byte(value)),
      ClientMessage::Turn(value) => self.steer(session_id, |agent| agent.apply_turn_byte(value)),
      ClientMessage::BoostStart => self.steer(session_id, |agent| agent.set_boost(true)),
      ClientMessage::BoostEnd => self.steer(session_id, |agent| agent.set_boost(false)),
      ClientMessage::VictoryMessage(text) => self.handle_victory_message(session_id, &text),
      ClientMessage::Close => return Inbound::Close,
      ClientMessage::Unrecognized(command) => {
        tracing::debug!(session_id, command, "ignoring unrecognized message");
      }
    }
    Inbound::Continue
  }

  fn steer(&mut self, session_id: &str, apply: impl FnOnce(&mut Agent)) {
    let Some(agent_id) = self.sessions.get(session_id).and_then(|session| session.agent_id) else {
      return;
    };
    if let Some(agent) = self.world.agent_mut(agent_id) {
      apply(agent);
    }
  }

  fn handle_login(&mut self, session_id: &str, login: Login) -> bool {
    if !self.sessions.contains_key(session_id) {
      return false;
    }
    let name = sanitize_player_name(&login.name, "");
    let mut custom_skin = login.custom_skin;
    custom_skin.truncate(MAX_CUSTOM_SKIN_LEN);
    let team = self.world.pick_team();
    let agent_id = self.world.spawn_agent(AgentSpawn {
      name: name.clone(),
      skin: login.skin,
      custom_skin,
      team,
      is_bot: false,
    });
    let negotiated = self.sessions.get(session_id).map(|session| session.protocol_version);
    let protocol_version = login
      .protocol_version
      .or(negotiated)
      .unwrap_or(self.config.default_protocol_version);

    if let Some(session) = self.sessions.get_mut(session_id) {
      session.phase = SessionPhase::Playing;
      session.name = name.clone();
      session.protocol_version = protocol_version;
      session.agent_id = Some(agent_id);
      session.visible_agents.clear();
      session.sectors.clear();
    }
    tracing::info!(
      session_id,
      agent_id,
      name = %name,
      client_version = login.client_version,
      protocol_version,
      "player joined"
    );

    let setup = messages::encode_initial_setup(&self.config, protocol_version, team);
    self.send_to(session_id, setup);
    let own = self.world.agent(agent_id).map(messages::encode_agent_spawn);
    if let Some(payload) = own {
      self.send_to(session_id, payload);
    }
    self.send_world_snapshot(session_id, agent_id);
    self.announce_agent(agent_id);
    true
  }

  fn handle_victory_message(&mut self, session_id: &str, text: &str) {
    let Some(session) = self.sessions.get(session_id) else { return };
    let name = session.name.clone();
    let segments = session.last_segments;
    tracing::debug!(session_id, segments, "victory message");
    self.world.record_victory(&name, segments, text);
  }

  fn world_tick(&mut self) {
    let events = self.world.tick();
    self.dispatch(events);
    self.refresh_visibility();
    self.flush_stale();
  }

  fn motion_tick(&mut self, dt_ms: f64) {
    let events = self.world.motion_tick(dt_ms);
    self.dispatch(events);
    self.flush_stale();
  }

  fn angle_tick(&mut self, dt_ms: f64) {
    let events = self.world.angle_tick(dt_ms);
    self.dispatch(events);
    self.flush_stale();
  }

  fn dispatch(&mut self, events: Vec<WorldEvent>) {
    for event in events {
      self.dispatch_event(event);
    }
  }

  fn dispatch_event(&mut self, event: WorldEvent) {
    let world = &self.world;
    let range = self.config.view_range;
    let sessions = &mut self.sessions;
    let stale = &mut self.stale;

    match event {
      WorldEvent::AgentSpawned(_) => {}
      WorldEvent::AgentDied { id, cause, segments } => {
        broadcast(sessions, stale, |session| {
          if session.agent_id == Some(id) {
            tracing::info!(agent_id = id, ?cause, segments, name = %session.name, "player died");
            session.agent_id = None;
            session.last_segments = segments;
            session.visible_agents.clear();
            session.sectors.clear();
            return Some(messages::encode_death(messages::DEATH_NORMAL));
          }
          session
            .visible_agents
            .remove(&id)
            .then(|| messages::encode_agent_remove(id, true))
        });
      }
      WorldEvent::KillCredited { killer, kills } => {
        broadcast(sessions, stale, |session| {
          (session.agent_id == Some(killer)).then(|| messages::encode_kill(killer, kills))
        });
      }
      WorldEvent::Moved { id, grew } => {
        let Some(agent) = world.agent(id) else { return };
        broadcast(sessions, stale, |session| {
          let own = session.agent_id == Some(id);
          session.watches(id).then(|| {
            if grew {
              messages::encode_increase(agent, own)
            } else {
              messages::encode_move(agent, own)
            }
          })
        });
      }
      WorldEvent::FamChanged(id) => {
        let Some(agent) = world.agent(id) else { return };
        let payload = messages::encode_fam_update(agent);
        broadcast(sessions, stale, |session| session.watches(id).then(|| payload.clone()));
      }
      WorldEvent::TailDropped(id) => {
        let Some(agent) = world.agent(id) else { return };
        let payload = messages::encode_remove_part(agent);
        broadcast(sessions, stale, |session| session.watches(id).then(|| payload.clone()));
      }
      WorldEvent::Rotated(id) => {
        let Some(agent) = world.agent(id) else { return };
        let payload = messages::encode_rotation(agent);
        broadcast(sessions, stale, |session| session.watches(id).then(|| payload.clone()));
      }
      WorldEvent::FoodSpawned(food) => {
        let payload = messages::encode_food_spawn(&food);
        broadcast(sessions, stale, |session| {
          viewer_in_range(world, session, food.position, range).then(|| payload.clone())
        });
      }
      WorldEvent::FoodEaten { position, eater } => {
        let payload = messages::encode_food_eaten(position, eater);
        broadcast(sessions, stale, |session| {
          viewer_in_range(world, session, position, range).then(|| payload.clone())
        });
      }
      WorldEvent::PreySpawned(prey) => {
        let payload = messages::encode_prey_spawn(&prey);
        broadcast(sessions, stale, |session| session.agent_id.is_some().then(|| payload.clone()));
      }
      WorldEvent::PreyEaten { id, eater } => {
        let payload = messages::encode_prey_eaten(id, eater);
        broadcast(sessions, stale, |session| session.agent_id.is_some().then(|| payload.clone()));
      }
      WorldEvent::LeaderboardDue => {
        broadcast(sessions, stale, |session| {
          session
            .is_playing()
            .then(|| leaderboard_payload(world, session.agent_id))
        });
        if self.config.team_mode() {
          let (first, second) = world.team_scores();
          let payload = messages::encode_team_scores(first, second);
          broadcast(sessions, stale, |session| session.is_playing().then(|| payload.clone()));
        }
      }
      WorldEvent::MinimapDue => {
        let payload = messages::encode_minimap(&world.minimap_cells());
        broadcast(sessions, stale, |session| session.is_playing().then(|| payload.clone()));
      }
    }
  }
}
