//! Declarative animation commands.
//!
//! Asset data stores vector literals as text in two formats, `"(x, y)"`
//! and `"x<TAB>y"`; [`parse_point`] accepts both. [`AnimCommand`] is the
//! serializable record form of the vector operations, so hosts can keep
//! scripted motion in data files and apply it to a fresh vector.

use crate::error::{CelError, CelResult};
use crate::geom::{Point, Tick};

use super::vector::AnimVector;

/// One recorded vector operation. Times are absolute milliseconds.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AnimCommand {
    Move {
        x: i32,
        y: i32,
    },
    Offset {
        dx: i32,
        dy: i32,
    },
    RelMove {
        dx: i32,
        dy: i32,
        t0: i32,
        t1: i32,
        #[serde(default)]
        bounce: bool,
        #[serde(default)]
        pingpong: bool,
        #[serde(default)]
        replace: bool,
    },
    RelOffset {
        dx: i32,
        dy: i32,
        t0: i32,
        t1: i32,
    },
    Rotate {
        angle_rad: f64,
        period_ms: i32,
        ease_ms: i32,
    },
}

impl AnimCommand {
    pub fn apply(&self, vector: &AnimVector, now: Tick) {
        match *self {
            Self::Move { x, y } => vector.move_to(x, y),
            Self::Offset { dx, dy } => vector.offset(dx, dy),
            Self::RelMove {
                dx,
                dy,
                t0,
                t1,
                bounce,
                pingpong,
                replace,
            } => vector.rel_move(dx, dy, Tick(t0), Tick(t1), bounce, pingpong, replace),
            Self::RelOffset { dx, dy, t0, t1 } => {
                vector.rel_offset(dx, dy, Tick(t0), Tick(t1));
            }
            Self::Rotate {
                angle_rad,
                period_ms,
                ease_ms,
            } => vector.rotate(angle_rad, period_ms, ease_ms, now),
        }
    }
}

/// Applies a command list in order against one vector.
pub fn apply_all(commands: &[AnimCommand], vector: &AnimVector, now: Tick) {
    for cmd in commands {
        cmd.apply(vector, now);
    }
}

/// Parses a vector literal: `"(x, y)"` or tab-separated `"x\ty"`.
pub fn parse_point(text: &str) -> CelResult<Point> {
    let text = text.trim();
    let (xs, ys) = if let Some(inner) = text.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        inner
            .split_once(',')
            .ok_or_else(|| CelError::invalid_argument(format!("malformed vector literal {text:?}")))?
    } else {
        text.split_once('\t')
            .ok_or_else(|| CelError::invalid_argument(format!("malformed vector literal {text:?}")))?
    };
    let x = xs
        .trim()
        .parse::<i32>()
        .map_err(|_| CelError::invalid_argument(format!("bad X component in {text:?}")))?;
    let y = ys
        .trim()
        .parse::<i32>()
        .map_err(|_| CelError::invalid_argument(format!("bad Y component in {text:?}")))?;
    Ok(Point::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_point_paren_format() {
        assert_eq!(parse_point("(10, -20)").unwrap(), Point::new(10, -20));
        assert_eq!(parse_point(" (0,0) ").unwrap(), Point::ZERO);
    }

    #[test]
    fn parse_point_tab_format() {
        assert_eq!(parse_point("15\t25").unwrap(), Point::new(15, 25));
    }

    #[test]
    fn parse_point_rejects_garbage() {
        for bad in ["", "(1)", "1 2", "(a, b)", "(1, 2", "3,4"] {
            assert!(parse_point(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn commands_json_roundtrip() {
        let cmds = vec![
            AnimCommand::Move { x: 3, y: 4 },
            AnimCommand::RelMove {
                dx: 100,
                dy: 0,
                t0: 0,
                t1: 200,
                bounce: false,
                pingpong: true,
                replace: false,
            },
            AnimCommand::Rotate {
                angle_rad: 1.0,
                period_ms: 500,
                ease_ms: 100,
            },
        ];
        let json = serde_json::to_string(&cmds).unwrap();
        let back: Vec<AnimCommand> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmds);
    }

    #[test]
    fn apply_all_runs_in_order() {
        let v = AnimVector::new();
        apply_all(
            &[
                AnimCommand::Move { x: 10, y: 10 },
                AnimCommand::RelMove {
                    dx: 90,
                    dy: 0,
                    t0: 0,
                    t1: 100,
                    bounce: false,
                    pingpong: false,
                    replace: false,
                },
            ],
            &v,
            Tick(0),
        );
        assert_eq!(v.x(Tick(50)), 55);
        assert_eq!(v.x(Tick(100)), 100);
    }
}
