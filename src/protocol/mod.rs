pub mod codec;
pub mod messages;

use codec::{DecodeError, Reader};

pub const CLIENT_MODE_PLAIN: u8 = 1;
pub const CLIENT_MODE_TIME_HEADER: u8 = 2;
pub const CLIENT_START_LOGIN: u8 = b'c';
pub const CLIENT_SET_USERNAME: u8 = b's';
pub const CLIENT_VICTORY_MESSAGE: u8 = 118;
pub const CLIENT_MAX_TARGET_ANGLE: u8 = 250;
pub const CLIENT_PING: u8 = 251;
pub const CLIENT_TURN: u8 = 252;
pub const CLIENT_BOOST_START: u8 = 253;
pub const CLIENT_BOOST_END: u8 = 254;
pub const CLIENT_CLOSE: u8 = 255;

pub const TYPE_PRE_INIT: u8 = b'6';
pub const TYPE_INITIAL_SETUP: u8 = b'a';
pub const TYPE_ROTATE_CCW: u8 = b'e';
pub const TYPE_ROTATE_CW: u8 = b'4';
pub const TYPE_UPDATE_FAM: u8 = b'h';
pub const TYPE_REMOVE_PART: u8 = b'r';
pub const TYPE_MOVE: u8 = b'g';
pub const TYPE_INCREASE: u8 = b'n';
pub const TYPE_LEADERBOARD: u8 = b'l';
pub const TYPE_DEATH: u8 = b'v';
pub const TYPE_ADD_SECTOR: u8 = b'W';
pub const TYPE_REMOVE_SECTOR: u8 = b'w';
pub const TYPE_HIGHSCORE: u8 = b'm';
pub const TYPE_PONG: u8 = b'p';
pub const TYPE_MINIMAP: u8 = b'u';
pub const TYPE_SNAKE: u8 = b's';
pub const TYPE_FOOD_BATCH: u8 = b'F';
pub const TYPE_FOOD_DROP: u8 = b'b';
pub const TYPE_FOOD_SPAWN: u8 = b'f';
pub const TYPE_EAT_FOOD: u8 = b'c';
pub const TYPE_PREY: u8 = b'y';
pub const TYPE_KILL: u8 = b'k';
pub const TYPE_TEAM_SCORES: u8 = b'o';

const LOGIN_RESERVED_BYTES: usize = 20;
const LOGIN_TRAILER_BYTES: usize = 2;

/// Handshake position of a connection; decides how the next inbound message is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
  #[default]
  Connected,
  GotMode,
  WaitingSecret,
  Playing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Login {
  pub client_version: u16,
  pub protocol_version: Option<u8>,
  pub skin: u8,
  pub name: String,
  pub custom_skin: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
  SelectMode { time_header: bool },
  StartLogin,
  SecretResponse,
  SetUsername(Login),
  Ping,
  TargetAngle(u8),
  Turn(u8),
  BoostStart,
  BoostEnd,
  VictoryMessage(String),
  Close,
  Unrecognized(u8),
}

pub fn decode_client_message(phase: SessionPhase, data: &[u8]) -> Result<ClientMessage, DecodeError> {
  let Some(&first) = data.first() else {
    return Err(DecodeError::Empty);
  };
  match phase {
    SessionPhase::Connected => Ok(match first {
      CLIENT_MODE_PLAIN => ClientMessage::SelectMode { time_header: false },
      CLIENT_MODE_TIME_HEADER => ClientMessage::SelectMode { time_header: true },
      CLIENT_START_LOGIN => ClientMessage::StartLogin,
      other => ClientMessage::Unrecognized(other),
    }),
    SessionPhase::GotMode => Ok(match first {
      CLIENT_START_LOGIN => ClientMessage::StartLogin,
      other => ClientMessage::Unrecognized(other),
    }),
    SessionPhase::WaitingSecret => {
      if first == CLIENT_SET_USERNAME {
        decode_login(data).map(ClientMessage::SetUsername)
      } else {
        Ok(ClientMessage::SecretResponse)
      }
    }
    SessionPhase::Playing => decode_playing(data),
  }
}

fn decode_playing(data: &[u8]) -> Result<ClientMessage, DecodeError> {
  let mut reader = Reader::new(data);
  let mut command = reader.read_u8()?;
  let mut prefixed = false;
  if command == CLIENT_CLOSE {
    if reader.remaining() == 0 {
      return Ok(ClientMessage::Close);
    }
    command = reader.read_u8()?;
    prefixed = true;
  }
  match command {
    CLIENT_PING => Ok(ClientMessage::Ping),
    CLIENT_TURN => Ok(ClientMessage::Turn(reader.read_u8()?)),
    CLIENT_BOOST_START => Ok(ClientMessage::BoostStart),
    CLIENT_BOOST_END => Ok(ClientMessage::BoostEnd),
    CLIENT_CLOSE => Ok(ClientMessage::Close),
    CLIENT_VICTORY_MESSAGE if prefixed || reader.remaining() > 0 => {
      let text = String::from_utf8_lossy(reader.read_rest()).into_owned();
      Ok(ClientMessage::VictoryMessage(text))
    }
    value if value <= CLIENT_MAX_TARGET_ANGLE && !prefixed => Ok(ClientMessage::TargetAngle(value)),
    other => Ok(ClientMessage::Unrecognized(other)),
  }
}

fn decode_login(data: &[u8]) -> Result<Login, DecodeError> {
  let mut reader = Reader::new(data);
  reader.skip(2)?;
  let client_version = reader.read_u16()?;
  reader.skip(LOGIN_RESERVED_BYTES)?;
  let skin = reader.read_u8()?;
  let name_len = reader.read_u8()? as usize;
  let name = if name_len > 0 && reader.remaining() >= name_len {
    reader.read_string(name_len)?
  } else {
    String::new()
  };
  if reader.remaining() >= LOGIN_TRAILER_BYTES {
    reader.skip(LOGIN_TRAILER_BYTES)?;
  }
  let custom_skin = reader.read_rest().to_vec();
  Ok(Login {
    client_version,
    protocol_version: protocol_for_client(client_version),
    skin,
    name,
    custom_skin,
  })
}

/// Newer clients announce which protocol revision they speak; older ones get the default.
pub fn protocol_for_client(client_version: u16) -> Option<u8> {
  match client_version {
    333..=u16::MAX => Some(14),
    291..=332 => Some(11),
    _ => None,
  }
}
