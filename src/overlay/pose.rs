use super::Point;
use std::collections::HashMap;

pub const BOX_KEYS: [&str; 4] = ["Box_X1", "Box_Y1", "Box_X2", "Box_Y2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub const BOTH: [Hand; 2] = [Hand::Left, Hand::Right];

    pub fn name(self) -> &'static str {
        match self {
            Hand::Left => "left",
            Hand::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joint {
    Shoulder,
    Elbow,
    Wrist,
}

impl Joint {
    /// Arm order: shoulder → elbow → wrist.
    pub const ARM: [Joint; 3] = [Joint::Shoulder, Joint::Elbow, Joint::Wrist];

    pub fn name(self) -> &'static str {
        match self {
            Joint::Shoulder => "shoulder",
            Joint::Elbow => "elbow",
            Joint::Wrist => "wrist",
        }
    }
}

pub const FINGERS: [&str; 5] = ["thumb", "index", "middle", "ring", "pinky"];

pub fn joint_keys(hand: Hand, joint: Joint) -> (String, String) {
    (
        format!("X_{}_{}", hand.name(), joint.name()),
        format!("Y_{}_{}", hand.name(), joint.name()),
    )
}

pub fn tip_keys(hand: Hand, finger: &str) -> (String, String) {
    (
        format!("X_{}_{finger}_tip", hand.name()),
        format!("Y_{}_{finger}_tip", hand.name()),
    )
}

/// One pose-table row with its column names restored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayFrame {
    fields: HashMap<String, f64>,
}

impl OverlayFrame {
    /// Pairs `keys[i]` with `row[i]`. The two sequences are positionally bound;
    /// extra entries on either side are dropped.
    pub fn from_row(keys: &[String], row: &[f64]) -> Self {
        let fields = keys
            .iter()
            .zip(row.iter())
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        Self { fields }
    }

    /// Raw value, possibly NaN for a null cell.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.fields.get(key).copied()
    }

    /// Present and finite.
    pub fn numeric(&self, key: &str) -> Option<f64> {
        self.get(key).filter(|v| v.is_finite())
    }

    pub fn point(&self, x_key: &str, y_key: &str) -> Option<Point> {
        Some(Point::new(self.numeric(x_key)?, self.numeric(y_key)?))
    }

    pub fn joint(&self, hand: Hand, joint: Joint) -> Option<Point> {
        let (x, y) = joint_keys(hand, joint);
        self.point(&x, &y)
    }

    pub fn tip(&self, hand: Hand, finger: &str) -> Option<Point> {
        let (x, y) = tip_keys(hand, finger);
        self.point(&x, &y)
    }

    /// `(x1, y1, x2, y2)` when all four corners are numeric.
    pub fn bounding_box(&self) -> Option<(f64, f64, f64, f64)> {
        let [x1, y1, x2, y2] = BOX_KEYS;
        Some((
            self.numeric(x1)?,
            self.numeric(y1)?,
            self.numeric(x2)?,
            self.numeric(y2)?,
        ))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
