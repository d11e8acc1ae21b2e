use crate::game::types::AgentId;
use crate::protocol::codec::Writer;
use crate::protocol::SessionPhase;
use std::collections::{BTreeSet, HashSet};
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;

const TIME_HEADER_MAX_MS: u128 = u16::MAX as u128;

/// One connected client: handshake progress, outbound channel and what it currently sees.
#[derive(Debug)]
pub(super) struct SessionEntry {
    sender: UnboundedSender<Vec<u8>>,
    pub(super) phase: SessionPhase,
    /// Prefix every outbound message with the milliseconds since the previous one.
    pub(super) time_header: bool,
    last_send: Instant,
    pub(super) protocol_version: u8,
    pub(super) name: String,
    pub(super) agent_id: Option<AgentId>,
    /// Segment count of the most recently lost agent, used for the victory message.
    pub(super) last_segments: u32,
    pub(super) visible_agents: HashSet<AgentId>,
    pub(super) sectors: BTreeSet<(u8, u8)>,
}

impl SessionEntry {
    pub(super) fn new(sender: UnboundedSender<Vec<u8>>, protocol_version: u8) -> Self {
        Self {
            sender,
            phase: SessionPhase::default(),
            time_header: false,
            last_send: Instant::now(),
            protocol_version,
            name: String::new(),
            agent_id: None,
            last_segments: 0,
            visible_agents: HashSet::new(),
            sectors: BTreeSet::new(),
        }
    }

    pub(super) fn is_playing(&self) -> bool {
        self.phase == SessionPhase::Playing
    }

    /// True for the session's own agent and any agent it has been told about.
    pub(super) fn watches(&self, id: AgentId) -> bool {
        self.agent_id == Some(id) || self.visible_agents.contains(&id)
    }

    /// Queues one message; `false` once the receiving half has gone away.
    pub(super) fn send(&mut self, payload: Vec<u8>) -> bool {
        let framed = self.frame(payload, Instant::now());
        self.sender.send(framed).is_ok()
    }

    fn frame(&mut self, payload: Vec<u8>, now: Instant) -> Vec<u8> {
        if !self.time_header {
            return payload;
        }
        let elapsed = now
            .saturating_duration_since(self.last_send)
            .as_millis()
            .min(TIME_HEADER_MAX_MS) as u16;
        self.last_send = now;
        let mut writer = Writer::with_capacity(payload.len() + 2);
        writer.write_u16(elapsed).write_bytes(&payload);
        writer.build()
    }
}
