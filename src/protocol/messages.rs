//! Server-to-client message builders. Every payload starts with its command byte;
//! the optional per-session time header is prepended at send time.

use super::codec::Writer;
use super::*;
use crate::config::GameConfig;
use crate::game::agent::Agent;
use crate::game::constants::{
  CST, FOOD_BATCH_CHUNK, LEADERBOARD_SIZE, MAMU, MANU2, MAX_SNAKE_PARTS, MOVE_DISTANCE, NSP1, NSP2,
  NSP3, SECRET_LEN, SPANGDV, SPAWN_MARKER,
};
use crate::game::food::{Food, FoodOrigin, Prey};
use crate::game::types::{AgentId, Point, PreyId};

const FAM_UNITS: f64 = 16_777_216.0;
const U24_MASK: u32 = 0x00FF_FFFF;
const POSITION_SCALE: f64 = 5.0;
const SPEED_SCALE: f64 = 1000.0;
const ROTATION_SPEED_SCALE: f64 = 18.0;
const FOOD_SIZE_DIVISOR: u8 = 5;
const MINIMAP_EMPTY_RUN: u8 = 128;
const MINIMAP_MAX_RUN: usize = 127;
const MINIMAP_BITS_PER_BYTE: usize = 7;
const SETUP_RADIUS_FACTOR: f64 = 0.98;

pub const DEATH_NORMAL: u8 = 0;

pub fn fam_units(fam: f64) -> u32 {
  ((fam.max(0.0) * FAM_UNITS) as u32) & U24_MASK
}

fn scaled_u24(value: f64) -> u32 {
  ((value * POSITION_SCALE).floor().max(0.0) as u32) & U24_MASK
}

fn coarse(value: f64) -> u16 {
  value.floor() as u16
}

fn packet(command: u8, capacity: usize) -> Writer {
  let mut writer = Writer::with_capacity(capacity + 1);
  writer.write_u8(command);
  writer
}

/// Fixed alternating upper/lower-case pattern the client expects as its login challenge.
pub fn secret() -> [u8; SECRET_LEN] {
  let mut secret = [0u8; SECRET_LEN];
  for (index, byte) in secret.iter_mut().enumerate() {
    let base = if index % 2 == 0 { b'A' } else { b'a' };
    *byte = base + (index % 26) as u8;
  }
  secret
}

pub fn encode_pre_init() -> Vec<u8> {
  let mut writer = packet(TYPE_PRE_INIT, SECRET_LEN);
  writer.write_bytes(&secret());
  writer.build()
}

pub fn encode_initial_setup(config: &GameConfig, protocol_version: u8, team: u8) -> Vec<u8> {
  let mut writer = packet(TYPE_INITIAL_SETUP, 32);
  writer
    .write_u24(config.game_radius as u32)
    .write_u16(MAX_SNAKE_PARTS as u16)
    .write_u16(config.sector_size)
    .write_u16(config.sector_count)
    .write_u8(SPANGDV)
    .write_u16(NSP1)
    .write_u16(NSP2)
    .write_u16(NSP3)
    .write_u16(MAMU)
    .write_u16(MANU2)
    .write_u16(CST)
    .write_u8(protocol_version)
    .write_u8(MOVE_DISTANCE as u8)
    .write_u16(config.server_id)
    .write_u24((config.game_radius * SETUP_RADIUS_FACTOR).floor() as u32)
    .write_u8(config.game_mode)
    .write_u8(team);
  writer.build()
}

fn delta_byte(delta: f64) -> u8 {
  ((delta * 2.0).round() + 127.0).clamp(0.0, 255.0) as u8
}

/// Full description of an agent: header, then the tail position and per-segment
/// deltas walking back toward the head.
pub fn encode_agent_spawn(agent: &Agent) -> Vec<u8> {
  let mut writer = packet(
    TYPE_SNAKE,
    40 + agent.name.len() + agent.custom_skin.len() + agent.parts.len() * 2,
  );
  writer
    .write_u16(agent.id)
    .write_u24(agent.heading.units())
    .write_u8(SPAWN_MARKER)
    .write_u24(agent.wanted_heading.units())
    .write_u16((agent.speed * SPEED_SCALE).floor().clamp(0.0, u16::MAX as f64) as u16)
    .write_u24(fam_units(agent.fam))
    .write_u8(agent.skin)
    .write_u24(scaled_u24(agent.position.x))
    .write_u24(scaled_u24(agent.position.y))
    .write_short_str(&agent.name)
    .write_short_bytes(&agent.custom_skin);

  let tail = agent.parts.last().copied().unwrap_or_else(|| {
    let back = agent.heading.radians();
    Point::new(
      agent.position.x - back.cos() * MOVE_DISTANCE,
      agent.position.y - back.sin() * MOVE_DISTANCE,
    )
  });
  writer.write_u24(scaled_u24(tail.x)).write_u24(scaled_u24(tail.y));

  let mut previous = tail;
  for part in agent.parts.iter().rev().skip(1) {
    writer
      .write_u8(delta_byte(part.x - previous.x))
      .write_u8(delta_byte(part.y - previous.y));
    previous = *part;
  }
  writer.build()
}

pub fn encode_agent_remove(id: AgentId, died: bool) -> Vec<u8> {
  let mut writer = packet(TYPE_SNAKE, 3);
  writer.write_u16(id).write_u8(u8::from(died));
  writer.build()
}

fn write_head(writer: &mut Writer, agent: &Agent, own: bool) {
  if !own {
    writer.write_u16(agent.id);
  }
  writer
    .write_u16(coarse(agent.position.x))
    .write_u16(coarse(agent.position.y));
}

/// Head moved one step; the recipient's own agent omits the id.
pub fn encode_move(agent: &Agent, own: bool) -> Vec<u8> {
  let mut writer = packet(TYPE_MOVE, 6);
  write_head(&mut writer, agent, own);
  writer.build()
}

/// Head moved and the body grew by one segment.
pub fn encode_increase(agent: &Agent, own: bool) -> Vec<u8> {
  let mut writer = packet(TYPE_INCREASE, 9);
  write_head(&mut writer, agent, own);
  writer.write_u24(fam_units(agent.fam));
  writer.build()
}

pub fn encode_fam_update(agent: &Agent) -> Vec<u8> {
  let mut writer = packet(TYPE_UPDATE_FAM, 5);
  writer.write_u16(agent.id).write_u24(fam_units(agent.fam));
  writer.build()
}

pub fn encode_remove_part(agent: &Agent) -> Vec<u8> {
  let mut writer = packet(TYPE_REMOVE_PART, 5);
  writer.write_u16(agent.id).write_u24(fam_units(agent.fam));
  writer.build()
}

pub fn encode_rotation(agent: &Agent) -> Vec<u8> {
  let command = if agent.heading.shortest_diff(agent.wanted_heading) < 0 {
    TYPE_ROTATE_CCW
  } else {
    TYPE_ROTATE_CW
  };
  let speed = (agent.speed * ROTATION_SPEED_SCALE).round().clamp(0.0, 255.0) as u8;
  let mut writer = packet(command, 5);
  writer
    .write_u16(agent.id)
    .write_u8(agent.heading.to_byte())
    .write_u8(agent.wanted_heading.to_byte())
    .write_u8(speed);
  writer.build()
}

fn write_food(writer: &mut Writer, food: &Food) {
  writer
    .write_u8(food.color)
    .write_u16(coarse(food.position.x))
    .write_u16(coarse(food.position.y))
    .write_u8(food.size / FOOD_SIZE_DIVISOR);
}

/// Snapshot of nearby pellets, split into messages of at most `FOOD_BATCH_CHUNK`.
pub fn encode_food_batch<'a>(foods: impl IntoIterator<Item = &'a Food>) -> Vec<Vec<u8>> {
  let foods: Vec<&Food> = foods.into_iter().collect();
  foods
    .chunks(FOOD_BATCH_CHUNK)
    .map(|chunk| {
      let mut writer = packet(TYPE_FOOD_BATCH, chunk.len() * 6);
      for food in chunk {
        write_food(&mut writer, food);
      }
      writer.build()
    })
    .collect()
}

/// A single pellet appearing; dropped pellets use their own command so the client
/// can animate them differently.
pub fn encode_food_spawn(food: &Food) -> Vec<u8> {
  let command = match food.origin {
    FoodOrigin::Natural => TYPE_FOOD_SPAWN,
    FoodOrigin::BoostDrop | FoodOrigin::Death => TYPE_FOOD_DROP,
  };
  let mut writer = packet(command, 6);
  write_food(&mut writer, food);
  writer.build()
}

pub fn encode_food_eaten(position: Point, eater: AgentId) -> Vec<u8> {
  let mut writer = packet(TYPE_EAT_FOOD, 6);
  writer
    .write_u16(coarse(position.x))
    .write_u16(coarse(position.y))
    .write_u16(eater);
  writer.build()
}

pub fn encode_prey_spawn(prey: &Prey) -> Vec<u8> {
  let mut writer = packet(TYPE_PREY, 22);
  writer
    .write_u16(prey.id)
    .write_u8(prey.color)
    .write_u24(scaled_u24(prey.position.x))
    .write_u24(scaled_u24(prey.position.y))
    .write_u8(prey.size / FOOD_SIZE_DIVISOR)
    .write_u8(prey.turn as u8 + SPAWN_MARKER)
    .write_u24(prey.wanted_heading.units())
    .write_u24(prey.heading.units())
    .write_u16((prey.speed * SPEED_SCALE).floor() as u16);
  writer.build()
}

pub fn encode_prey_eaten(id: PreyId, eater: AgentId) -> Vec<u8> {
  let mut writer = packet(TYPE_PREY, 4);
  writer.write_u16(id).write_u16(eater);
  writer.build()
}

/// `own_rank` is 1-based; 0 means the recipient is not playing.
pub fn encode_leaderboard(own_rank: u16, agent_count: u16, leaders: &[&Agent]) -> Vec<u8> {
  let mut writer = packet(TYPE_LEADERBOARD, 5 + leaders.len() * 24);
  let top_rank = if own_rank as usize <= LEADERBOARD_SIZE {
    own_rank as u8
  } else {
    0
  };
  writer.write_u8(top_rank).write_u16(own_rank).write_u16(agent_count);
  for agent in leaders {
    writer
      .write_u16(agent.visible_segments().min(u16::MAX as u32) as u16)
      .write_u24(fam_units(agent.fam))
      .write_u8(0)
      .write_short_str(&agent.name);
  }
  writer.build()
}

pub fn encode_highscore(segments: u32, fam: f64, name: &str, message: &str) -> Vec<u8> {
  let mut writer = packet(TYPE_HIGHSCORE, 8 + name.len() + message.len());
  writer
    .write_u24(segments)
    .write_u24(fam_units(fam))
    .write_short_str(name)
    .write_str(message);
  writer.build()
}

pub fn encode_death(kind: u8) -> Vec<u8> {
  let mut writer = packet(TYPE_DEATH, 1);
  writer.write_u8(kind);
  writer.build()
}

pub fn encode_kill(killer: AgentId, kills: u32) -> Vec<u8> {
  let mut writer = packet(TYPE_KILL, 5);
  writer.write_u16(killer).write_u24(kills);
  writer.build()
}

pub fn encode_team_scores(first: u32, second: u32) -> Vec<u8> {
  let mut writer = packet(TYPE_TEAM_SCORES, 8);
  writer.write_u32(first).write_u32(second);
  writer.build()
}

pub fn encode_add_sector(x: u8, y: u8) -> Vec<u8> {
  let mut writer = packet(TYPE_ADD_SECTOR, 2);
  writer.write_u8(x).write_u8(y);
  writer.build()
}

pub fn encode_remove_sector(x: u8, y: u8) -> Vec<u8> {
  let mut writer = packet(TYPE_REMOVE_SECTOR, 2);
  writer.write_u8(x).write_u8(y);
  writer.build()
}

pub fn encode_pong() -> Vec<u8> {
  packet(TYPE_PONG, 0).build()
}

/// Run-length packs the occupancy grid: `128 + n` skips `n` empty cells, any other
/// byte carries seven cells as a bitmask (lowest bit first).
pub fn encode_minimap(cells: &[bool]) -> Vec<u8> {
  let mut writer = packet(TYPE_MINIMAP, cells.len() / MINIMAP_BITS_PER_BYTE);
  let mut index = 0;
  while index < cells.len() {
    let empty = cells[index..]
      .iter()
      .take(MINIMAP_MAX_RUN)
      .take_while(|cell| !**cell)
      .count();
    if empty > 0 {
      writer.write_u8(MINIMAP_EMPTY_RUN + empty as u8);
      index += empty;
      continue;
    }
    let mut bits = 0u8;
    for (offset, cell) in cells[index..].iter().take(MINIMAP_BITS_PER_BYTE).enumerate() {
      if *cell {
        bits |= 1 << offset;
      }
    }
    writer.write_u8(bits);
    index += MINIMAP_BITS_PER_BYTE.min(cells.len() - index);
  }
  writer.build()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::game::agent::AgentSpawn;
  use crate::game::angle::Angle;
  use crate::protocol::codec::Reader;

  fn angle_from_u24(units: u32) -> Angle {
    Angle::from_units(units as i64)
  }

  fn sample_agent() -> Agent {
    let mut agent = Agent::new(
      513,
      AgentSpawn {
        name: "Viper".to_string(),
        skin: 7,
        custom_skin: vec![9, 8, 7],
        ..AgentSpawn::default()
      },
      Point::new(2000.7, 1500.3),
      Angle::from_units(1_234_567),
      4,
    );
    agent.fam = 0.25;
    agent
  }

  #[test]
  fn secret_is_alternating_case() {
    let secret = secret();
    assert_eq!(secret.len(), 30);
    assert_eq!(&secret[..4], b"AbCd");
    assert_eq!(secret[26], b'A');
    assert_eq!(secret[29], b'd');
  }

  #[test]
  fn spawn_round_trips_quantized_fields() {
    let agent = sample_agent();
    let data = encode_agent_spawn(&agent);
    let mut reader = Reader::new(&data);
    assert_eq!(reader.read_u8(), Ok(TYPE_SNAKE));
    assert_eq!(reader.read_u16(), Ok(513));
    let heading = reader.read_u24().map(angle_from_u24);
    assert_eq!(heading, Ok(agent.heading));
    assert_eq!(reader.read_u8(), Ok(SPAWN_MARKER));
    assert_eq!(reader.read_u24(), Ok(agent.wanted_heading.units()));
    assert_eq!(reader.read_u16(), Ok((agent.speed * 1000.0).floor() as u16));
    assert_eq!(reader.read_u24(), Ok(1 << 22));
    assert_eq!(reader.read_u8(), Ok(7));
    assert_eq!(reader.read_u24(), Ok(10003));
    assert_eq!(reader.read_u24(), Ok(7501));
    let name_len = reader.read_u8().unwrap_or_default() as usize;
    assert_eq!(reader.read_string(name_len).as_deref(), Ok("Viper"));
    let skin_len = reader.read_u8().unwrap_or_default() as usize;
    assert_eq!(reader.read_bytes(skin_len), Ok(&[9u8, 8, 7][..]));
    let tail = agent.parts[3];
    assert_eq!(reader.read_u24(), Ok((tail.x * 5.0).floor() as u32));
    assert_eq!(reader.read_u24(), Ok((tail.y * 5.0).floor() as u32));
    assert_eq!(reader.remaining(), 3 * 2);
  }

  #[test]
  fn spawn_deltas_walk_tail_to_head() {
    let agent = sample_agent();
    let data = encode_agent_spawn(&agent);
    let deltas = &data[data.len() - 6..];
    for (step, pair) in deltas.chunks(2).enumerate() {
      let from = agent.parts[3 - step];
      let to = agent.parts[2 - step];
      assert_eq!(pair[0], delta_byte(to.x - from.x));
      assert_eq!(pair[1], delta_byte(to.y - from.y));
    }
    assert_eq!(delta_byte(500.0), 255);
    assert_eq!(delta_byte(-500.0), 0);
    assert_eq!(delta_byte(0.0), 127);
  }

  #[test]
  fn move_and_increase_have_own_and_other_variants() {
    let agent = sample_agent();
    assert_eq!(encode_move(&agent, true).len(), 5);
    assert_eq!(encode_move(&agent, false).len(), 7);
    assert_eq!(encode_increase(&agent, true).len(), 8);
    assert_eq!(encode_increase(&agent, false), {
      let mut expected = vec![TYPE_INCREASE, 2, 1, 0x07, 0xD0, 0x05, 0xDC];
      expected.extend_from_slice(&[0x40, 0, 0]);
      expected
    });
  }

  #[test]
  fn rotation_command_follows_turn_direction() {
    let mut agent = sample_agent();
    agent.wanted_heading = agent.heading.offset(-1000);
    assert_eq!(encode_rotation(&agent)[0], TYPE_ROTATE_CCW);
    agent.wanted_heading = agent.heading.offset(1000);
    let data = encode_rotation(&agent);
    assert_eq!(data[0], TYPE_ROTATE_CW);
    assert_eq!(data.len(), 6);
    assert_eq!(data[5], (agent.speed * 18.0).round() as u8);
  }

  #[test]
  fn food_batch_is_chunked() {
    let foods: Vec<Food> = (0..250)
      .map(|id| Food {
        id,
        position: Point::new(100.0, 200.0),
        color: 3,
        size: 47,
        origin: FoodOrigin::Natural,
      })
      .collect();
    let batches = encode_food_batch(&foods);
    assert_eq!(batches.len(), 3);
    assert_eq!(batches[0].len(), 1 + 100 * 6);
    assert_eq!(batches[2].len(), 1 + 50 * 6);
    assert_eq!(&batches[0][1..7], &[3, 0, 100, 0, 200, 9]);
  }

  #[test]
  fn leaderboard_reports_rank_and_rows() {
    let agent = sample_agent();
    let data = encode_leaderboard(12, 30, &[&agent]);
    assert_eq!(&data[..6], &[TYPE_LEADERBOARD, 0, 0, 12, 0, 30]);
    assert_eq!(&data[6..8], &[0, 4]);
    assert_eq!(data[11], 0);
    assert_eq!(data[12], 5);
    assert_eq!(&data[13..], b"Viper");
    assert_eq!(encode_leaderboard(3, 30, &[])[1], 3);
  }

  #[test]
  fn minimap_packs_runs_and_bitmasks() {
    let mut cells = vec![false; 140];
    cells[130] = true;
    cells[132] = true;
    let data = encode_minimap(&cells);
    assert_eq!(data[0], TYPE_MINIMAP);
    assert_eq!(data[1], 128 + 127);
    assert_eq!(data[2], 128 + 3);
    assert_eq!(data[3], 0b101);
    assert_eq!(data[4], 128 + 3);
    assert_eq!(data.len(), 5);
  }

  #[test]
  fn setup_echoes_protocol_constants() {
    let config = GameConfig::default();
    let data = encode_initial_setup(&config, 14, 0);
    assert_eq!(data[0], TYPE_INITIAL_SETUP);
    assert_eq!(&data[1..4], &[0, 0x07, 0xD0]);
    assert_eq!(&data[4..6], &411u16.to_be_bytes());
    assert_eq!(data[10], SPANGDV);
    assert_eq!(data[23], 14);
    assert_eq!(data[24], 42);
    assert_eq!(data.len(), 32);
  }
}
