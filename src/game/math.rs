use super::types::Point;

pub fn distance_sq(a: Point, b: Point) -> f64 {
  let dx = a.x - b.x;
  let dy = a.y - b.y;
  dx * dx + dy * dy
}

pub fn within_radius(a: Point, b: Point, radius: f64) -> bool {
  distance_sq(a, b) <= radius * radius
}

pub fn point_at(origin: Point, angle: f64, distance: f64) -> Point {
  Point {
    x: origin.x + angle.cos() * distance,
    y: origin.y + angle.sin() * distance,
  }
}

pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
  value.min(max).max(min)
}

pub fn point_segment_distance_sq(point: Point, a: Point, b: Point) -> f64 {
  let abx = b.x - a.x;
  let aby = b.y - a.y;
  let len_sq = abx * abx + aby * aby;
  if len_sq <= f64::EPSILON {
    return distance_sq(point, a);
  }
  let t = clamp(((point.x - a.x) * abx + (point.y - a.y) * aby) / len_sq, 0.0, 1.0);
  distance_sq(
    point,
    Point {
      x: a.x + abx * t,
      y: a.y + aby * t,
    },
  )
}

fn cross(o: Point, a: Point, b: Point) -> f64 {
  (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn segments_cross(p1: Point, q1: Point, p2: Point, q2: Point) -> bool {
  let d1 = cross(p2, q2, p1);
  let d2 = cross(p2, q2, q1);
  let d3 = cross(p1, q1, p2);
  let d4 = cross(p1, q1, q2);
  ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
    && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

/// Squared distance between segments `p1q1` and `p2q2`; zero when they cross.
pub fn segment_distance_sq(p1: Point, q1: Point, p2: Point, q2: Point) -> f64 {
  if segments_cross(p1, q1, p2, q2) {
    return 0.0;
  }
  point_segment_distance_sq(p1, p2, q2)
    .min(point_segment_distance_sq(q1, p2, q2))
    .min(point_segment_distance_sq(p2, p1, q1))
    .min(point_segment_distance_sq(q2, p1, q1))
}
