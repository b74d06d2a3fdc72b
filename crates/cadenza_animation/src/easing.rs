//! Easing functions for animations

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnimationError;

/// Where the jump happens inside each interval of a stepped easing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StepPosition {
    /// Jump at the start of each interval
    Start,
    /// Jump at the end of each interval
    #[default]
    End,
}

/// Easing function type
///
/// `Ease`, `EaseIn`, `EaseOut` and `EaseInOut` are the CSS timing curves.
/// The `*Quad`, `*Cubic` and `*Quart` variants are polynomial curves.
/// Parses from and formats to CSS easing syntax.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Easing {
    #[default]
    Linear,
    Ease,
    EaseIn,
    EaseOut,
    EaseInOut,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    CubicBezier(f64, f64, f64, f64),
    Steps(u32, StepPosition),
}

impl Easing {
    /// Apply the easing function to a progress value (0.0 to 1.0)
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Easing::Linear => t,
            Easing::Ease => cubic_bezier_ease(t, 0.25, 0.1, 0.25, 1.0),
            Easing::EaseIn => cubic_bezier_ease(t, 0.42, 0.0, 1.0, 1.0),
            Easing::EaseOut => cubic_bezier_ease(t, 0.0, 0.0, 0.58, 1.0),
            Easing::EaseInOut => cubic_bezier_ease(t, 0.42, 0.0, 0.58, 1.0),
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::EaseInCubic => t * t * t,
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::EaseInQuart => t * t * t * t,
            Easing::EaseOutQuart => 1.0 - (1.0 - t).powi(4),
            Easing::EaseInOutQuart => {
                if t < 0.5 {
                    8.0 * t * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }
            Easing::CubicBezier(x1, y1, x2, y2) => cubic_bezier_ease(t, *x1, *y1, *x2, *y2),
            Easing::Steps(count, position) => steps_ease(t, *count, *position),
        }
    }

    /// Whether this is the identity curve
    pub fn is_linear(&self) -> bool {
        matches!(self, Easing::Linear)
    }
}

const NAMED: [(&str, Easing); 14] = [
    ("linear", Easing::Linear),
    ("ease", Easing::Ease),
    ("ease-in", Easing::EaseIn),
    ("ease-out", Easing::EaseOut),
    ("ease-in-out", Easing::EaseInOut),
    ("ease-in-quad", Easing::EaseInQuad),
    ("ease-out-quad", Easing::EaseOutQuad),
    ("ease-in-out-quad", Easing::EaseInOutQuad),
    ("ease-in-cubic", Easing::EaseInCubic),
    ("ease-out-cubic", Easing::EaseOutCubic),
    ("ease-in-out-cubic", Easing::EaseInOutCubic),
    ("ease-in-quart", Easing::EaseInQuart),
    ("ease-out-quart", Easing::EaseOutQuart),
    ("ease-in-out-quart", Easing::EaseInOutQuart),
];

impl FromStr for Easing {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let invalid = || AnimationError::InvalidEasing(s.to_string());

        if let Some((_, easing)) = NAMED.iter().find(|(name, _)| *name == input) {
            return Ok(*easing);
        }

        match input {
            "step-start" => return Ok(Easing::Steps(1, StepPosition::Start)),
            "step-end" => return Ok(Easing::Steps(1, StepPosition::End)),
            _ => {}
        }

        if let Some(args) = function_args(input, "cubic-bezier") {
            let values = args
                .iter()
                .map(|a| a.parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| invalid())?;
            let &[x1, y1, x2, y2] = values.as_slice() else {
                return Err(invalid());
            };
            if !(0.0..=1.0).contains(&x1) || !(0.0..=1.0).contains(&x2) {
                return Err(invalid());
            }
            return Ok(Easing::CubicBezier(x1, y1, x2, y2));
        }

        if let Some(args) = function_args(input, "steps") {
            let count = args
                .first()
                .and_then(|c| c.parse::<u32>().ok())
                .filter(|c| *c > 0)
                .ok_or_else(invalid)?;
            let position = match args.get(1).copied() {
                None | Some("end") | Some("jump-end") => StepPosition::End,
                Some("start") | Some("jump-start") => StepPosition::Start,
                Some(_) => return Err(invalid()),
            };
            if args.len() > 2 {
                return Err(invalid());
            }
            return Ok(Easing::Steps(count, position));
        }

        Err(invalid())
    }
}

impl TryFrom<String> for Easing {
    type Error = AnimationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Easing> for String {
    fn from(easing: Easing) -> Self {
        easing.to_string()
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((name, _)) = NAMED.iter().find(|(_, easing)| easing == self) {
            return f.write_str(name);
        }
        match self {
            Easing::CubicBezier(x1, y1, x2, y2) => {
                write!(f, "cubic-bezier({}, {}, {}, {})", x1, y1, x2, y2)
            }
            Easing::Steps(count, StepPosition::Start) => write!(f, "steps({}, start)", count),
            Easing::Steps(count, StepPosition::End) => write!(f, "steps({}, end)", count),
            // Every other variant is in NAMED
            _ => f.write_str("linear"),
        }
    }
}

/// Split `name(a, b, ...)` into its trimmed arguments
fn function_args<'a>(input: &'a str, name: &str) -> Option<Vec<&'a str>> {
    let inner = input
        .strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')?;
    Some(inner.split(',').map(str::trim).collect())
}

fn steps_ease(t: f64, count: u32, position: StepPosition) -> f64 {
    if t >= 1.0 {
        return 1.0;
    }
    let t = t.max(0.0);
    let step = 1.0 / count as f64;
    let shifted = match position {
        StepPosition::Start => t + step,
        StepPosition::End => t,
    };
    (shifted - shifted % step).min(1.0)
}

/// Cubic bezier easing calculation (matches browser `cubic-bezier()`).
///
/// Uses Newton-Raphson with binary-search fallback for robustness.
fn cubic_bezier_ease(t: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    // Endpoints are always exact
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }

    let x = t;

    // Solve for parameter `p` where bezier_x(p) == x using Newton-Raphson,
    // falling back to binary search if the slope is too flat.
    let mut p = x; // initial guess
    for _ in 0..8 {
        let err = bezier_sample(p, x1, x2) - x;
        if err.abs() < 1e-7 {
            return bezier_sample(p, y1, y2);
        }
        let slope = bezier_slope(p, x1, x2);
        if slope.abs() < 1e-7 {
            break; // slope too flat, switch to binary search
        }
        p -= err / slope;
    }

    // Binary search fallback (always converges)
    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    p = x;
    for _ in 0..30 {
        let val = bezier_sample(p, x1, x2);
        if (val - x).abs() < 1e-7 {
            break;
        }
        if val < x {
            lo = p;
        } else {
            hi = p;
        }
        p = (lo + hi) * 0.5;
    }

    bezier_sample(p, y1, y2)
}

/// Evaluate cubic bezier at parameter t: B(t) = 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³
#[inline]
fn bezier_sample(t: f64, p1: f64, p2: f64) -> f64 {
    // Horner form: ((1-3p2+3p1)t + 3p2-6p1)t + 3p1) * t
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    ((a * t + b) * t + c) * t
}

/// Derivative of cubic bezier: B'(t) = 3(1-t)²·p1 + 6(1-t)t·(p2-p1) + 3t²·(1-p2)
#[inline]
fn bezier_slope(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    (3.0 * a * t + 2.0 * b) * t + c
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_endpoints_are_exact() {
        let curves = [
            Easing::Linear,
            Easing::Ease,
            Easing::EaseInOut,
            Easing::EaseOutCubic,
            Easing::CubicBezier(0.68, -0.55, 0.265, 1.55),
            Easing::Steps(4, StepPosition::End),
        ];
        for easing in curves {
            assert_eq!(easing.apply(0.0), 0.0, "{easing}");
            assert_eq!(easing.apply(1.0), 1.0, "{easing}");
        }
    }

    #[test]
    fn test_css_curves_match_bezier_form() {
        assert!(approx(
            Easing::EaseIn.apply(0.3),
            Easing::CubicBezier(0.42, 0.0, 1.0, 1.0).apply(0.3)
        ));
        // Symmetric curve passes through the midpoint
        assert!(approx(Easing::EaseInOut.apply(0.5), 0.5));
        // `ease` front-loads progress
        assert!(Easing::Ease.apply(0.25) > 0.25);
    }

    #[test]
    fn test_steps() {
        let end = Easing::Steps(4, StepPosition::End);
        assert_eq!(end.apply(0.1), 0.0);
        assert_eq!(end.apply(0.3), 0.25);
        assert_eq!(end.apply(0.99), 0.75);

        let start = Easing::Steps(4, StepPosition::Start);
        assert_eq!(start.apply(0.0), 0.25);
        assert_eq!(start.apply(0.3), 0.5);
    }

    #[test]
    fn test_parse_named_and_functions() {
        assert_eq!("ease-in-out".parse::<Easing>(), Ok(Easing::EaseInOut));
        assert_eq!("ease-out-quart".parse::<Easing>(), Ok(Easing::EaseOutQuart));
        assert_eq!(
            "cubic-bezier(0.1, 0.7, 1.0, 0.1)".parse::<Easing>(),
            Ok(Easing::CubicBezier(0.1, 0.7, 1.0, 0.1))
        );
        assert_eq!(
            "steps(3)".parse::<Easing>(),
            Ok(Easing::Steps(3, StepPosition::End))
        );
        assert_eq!(
            "steps(2, start)".parse::<Easing>(),
            Ok(Easing::Steps(2, StepPosition::Start))
        );
        assert_eq!(
            "step-start".parse::<Easing>(),
            Ok(Easing::Steps(1, StepPosition::Start))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in [
            "bounce",
            "cubic-bezier(1.5, 0, 0, 1)",
            "cubic-bezier(0, 0, 1)",
            "steps(0)",
            "steps(2, middle)",
            "steps(two)",
        ] {
            assert!(
                matches!(input.parse::<Easing>(), Err(AnimationError::InvalidEasing(_))),
                "{input}"
            );
        }
    }

    #[test]
    fn test_display_round_trips() {
        let curves = [
            Easing::Linear,
            Easing::EaseInOutQuad,
            Easing::CubicBezier(0.25, 0.5, 0.75, 1.0),
            Easing::Steps(5, StepPosition::Start),
        ];
        for easing in curves {
            assert_eq!(easing.to_string().parse::<Easing>(), Ok(easing));
        }
    }
}
