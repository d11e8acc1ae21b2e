use super::agent::Agent;
use super::constants::{FOOD_EAT_MARGIN, PREY_EAT_MARGIN};
use super::math::{distance_sq, point_segment_distance_sq, segment_distance_sq, within_radius};
use super::types::{AgentId, Point};

const SWEEP_TOLERANCE_SQ: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kill {
    pub victim: AgentId,
    pub killer: Option<AgentId>,
}

pub fn can_eat_food(agent: &Agent, food: Point) -> bool {
    within_radius(agent.position, food, agent.head_radius() + FOOD_EAT_MARGIN)
}

pub fn can_eat_prey(agent: &Agent, prey: Point) -> bool {
    within_radius(agent.position, prey, agent.head_radius() + PREY_EAT_MARGIN)
}

pub fn outside_play_area(agent: &Agent, center: Point, play_radius: f64) -> bool {
    distance_sq(agent.position, center) > play_radius * play_radius
}

/// True when `attacker`'s head touches `target`'s head-plus-body poly-line, or its
/// last unchecked move step passed straight through it. An agent never collides with itself.
pub fn head_hits_body(attacker: &Agent, target: &Agent) -> bool {
    if attacker.id == target.id {
        return false;
    }
    let reach = attacker.contact_radius() + target.body_radius();
    let reach_sq = reach * reach;
    let head = attacker.position;
    let body: Vec<Point> = target.body_polyline().collect();

    if segments(&body).any(|(from, to)| point_segment_distance_sq(head, from, to) <= reach_sq) {
        return true;
    }
    let Some(origin) = attacker.sweep_origin else {
        return false;
    };
    let swept = segments(&body).any(|(from, to)| segment_distance_sq(origin, head, from, to) <= SWEEP_TOLERANCE_SQ);
    swept
}

/// Heads overlap within the sum of their full radii.
pub fn heads_touch(a: &Agent, b: &Agent) -> bool {
    within_radius(a.position, b.position, a.head_radius() + b.head_radius())
}

fn segments(points: &[Point]) -> impl Iterator<Item = (Point, Point)> + '_ {
    let single = (points.len() == 1).then(|| (points[0], points[0]));
    single
        .into_iter()
        .chain(points.windows(2).map(|pair| (pair[0], pair[1])))
}

fn record(kills: &mut Vec<Kill>, victim: AgentId, killer: Option<AgentId>) {
    if !is_dead(kills, victim) {
        kills.push(Kill { victim, killer });
    }
}

fn is_dead(kills: &[Kill], id: AgentId) -> bool {
    kills.iter().any(|kill| kill.victim == id)
}

/// Pairwise agent-vs-agent resolution for one world tick. `agents` must be in a
/// stable order; the first death recorded for a victim wins.
pub fn resolve_agent_collisions(agents: &[&Agent], team_mode: bool) -> Vec<Kill> {
    let mut kills = Vec::new();
    for (index, a) in agents.iter().enumerate() {
        for b in &agents[index + 1..] {
            if team_mode && a.team != 0 && a.team == b.team {
                continue;
            }
            let a_dead = is_dead(&kills, a.id);
            let b_dead = is_dead(&kills, b.id);
            if a_dead && b_dead {
                continue;
            }
            let a_hits_b = !a_dead && head_hits_body(a, b);
            let b_hits_a = !b_dead && head_hits_body(b, a);
            match (a_hits_b, b_hits_a) {
                (false, false) => {}
                (true, false) => record(&mut kills, a.id, Some(b.id)),
                (false, true) => record(&mut kills, b.id, Some(a.id)),
                (true, true) if !heads_touch(a, b) => {
                    record(&mut kills, a.id, None);
                    record(&mut kills, b.id, None);
                }
                (true, true) => {
                    if a.sct > b.sct {
                        record(&mut kills, b.id, Some(a.id));
                    } else if b.sct > a.sct {
                        record(&mut kills, a.id, Some(b.id));
                    } else {
                        record(&mut kills, a.id, None);
                        record(&mut kills, b.id, None);
                    }
                }
            }
        }
    }
    kills
}
