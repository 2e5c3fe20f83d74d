//! Colour classification and steering

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Colour seen by the downward facing sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorClass {
    White,
    Black,
    Yellow,
    Orange,
    Blue,
    Unknown,
}

/// How the speed demand is split between the two wheels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Steering {
    /// Right wheel at full demand, left wheel at half
    FavorRight,

    /// Left wheel at full demand, right wheel at half
    FavorLeft,

    /// Both wheels at full demand
    Straight,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Classify a normalised RGB sample.
///
/// Classes are tested in order, the first matching one wins.
pub fn classify(rgb: [f64; 3]) -> ColorClass {
    let [r, g, b] = rgb;

    if r > 0.1 && g > 0.1 && b > 0.1 {
        ColorClass::White
    } else if r < 0.1 && g < 0.1 && b < 0.1 {
        ColorClass::Black
    } else if r >= 0.2 && g > 0.05 && g <= 0.10 && b <= 0.05 {
        ColorClass::Yellow
    } else if r >= 0.14 && g > 0.05 && g <= 0.10 && b <= 0.05 {
        ColorClass::Orange
    } else if r <= 0.1 && g >= 0.1 && b < 0.1 {
        ColorClass::Blue
    } else {
        ColorClass::Unknown
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ColorClass {
    /// The steering to apply when this colour is under the sensor.
    pub fn steering(self) -> Steering {
        match self {
            ColorClass::Black | ColorClass::Yellow => Steering::FavorRight,
            ColorClass::White | ColorClass::Unknown => Steering::FavorLeft,
            ColorClass::Orange | ColorClass::Blue => Steering::Straight,
        }
    }
}

impl Steering {
    /// Fraction of the speed demand given to the (left, right) wheels.
    pub fn wheel_fractions(self) -> (f64, f64) {
        match self {
            Steering::FavorRight => (0.5, 1.0),
            Steering::FavorLeft => (1.0, 0.5),
            Steering::Straight => (1.0, 1.0),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify([0.0, 0.0, 0.0]), ColorClass::Black);
        assert_eq!(classify([0.01, 0.02, 0.01]), ColorClass::Black);
        assert_eq!(classify([0.3, 0.3, 0.3]), ColorClass::White);
        assert_eq!(classify([0.25, 0.08, 0.02]), ColorClass::Yellow);
        assert_eq!(classify([0.16, 0.07, 0.02]), ColorClass::Orange);
        assert_eq!(classify([0.05, 0.15, 0.05]), ColorClass::Blue);

        // Strong red with too much blue for a mark
        assert_eq!(classify([0.3, 0.07, 0.09]), ColorClass::Unknown);
    }

    #[test]
    fn test_steering() {
        let s = classify([0.0, 0.0, 0.0]).steering();
        assert_eq!(s, Steering::FavorRight);
        assert_eq!(s.wheel_fractions(), (0.5, 1.0));

        assert_eq!(ColorClass::Unknown.steering(), Steering::FavorLeft);
        assert_eq!(ColorClass::White.steering().wheel_fractions(), (1.0, 0.5));
        assert_eq!(ColorClass::Orange.steering(), Steering::Straight);
        assert_eq!(ColorClass::Blue.steering().wheel_fractions(), (1.0, 1.0));
    }
}
