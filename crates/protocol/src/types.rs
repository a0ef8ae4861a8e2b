use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in logical pixels, origin at the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// Inclusive on all four edges, so a pointer sitting exactly on the
    /// boundary between two siblings hits the first one walked.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.right()
            && point.y >= self.y
            && point.y <= self.bottom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_edge_inclusive() {
        let r = Rect::new(10.0, 20.0, 30.0, 22.0);
        assert!(r.contains(Point::new(10.0, 20.0)));
        assert!(r.contains(Point::new(40.0, 42.0)));
        assert!(r.contains(Point::new(25.0, 30.0)));
        assert!(!r.contains(Point::new(40.1, 30.0)));
        assert!(!r.contains(Point::new(25.0, 19.9)));
    }

    #[test]
    fn serializes_as_plain_object() {
        let r = Rect::new(0.0, 24.0, 100.0, 22.0);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"x":0.0,"y":24.0,"w":100.0,"h":22.0}"#);
    }
}
