//! Invocation descriptor: one solve request and the solver arguments derived from it.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

/// Number of fields along one edge of the board.
pub const BOARD_SIZE: u8 = 16;

/// A field on the board, `0..BOARD_SIZE` in both directions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Coord {
    pub x: u8,
    pub y: u8,
}

impl Coord {
    pub fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    pub fn on_board(&self) -> bool {
        self.x < BOARD_SIZE && self.y < BOARD_SIZE
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Parses the `x,y` form used on the command line and in query strings.
impl FromStr for Coord {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| anyhow!("coordinate {s:?} must have the form x,y"))?;
        let x = x
            .trim()
            .parse()
            .with_context(|| format!("parse x of coordinate {s:?}"))?;
        let y = y
            .trim()
            .parse()
            .with_context(|| format!("parse y of coordinate {s:?}"))?;
        Ok(Self { x, y })
    }
}

/// The four board tiles, one per quadrant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tiles {
    pub top_left: String,
    pub top_right: String,
    pub bottom_left: String,
    pub bottom_right: String,
}

/// Robot positions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Robots {
    pub yellow: Coord,
    pub red: Coord,
    pub green: Coord,
    pub blue: Coord,
}

impl Robots {
    fn named(&self) -> [(&'static str, Coord); 4] {
        [
            ("yellow", self.yellow),
            ("red", self.red),
            ("green", self.green),
            ("blue", self.blue),
        ]
    }
}

/// One solve request.
///
/// Every solver of a dispatch receives the same argument list; solvers differ
/// only in which binary runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub tiles: Tiles,
    pub robots: Robots,
    pub target: String,
}

impl Task {
    /// Reject requests no solver could make sense of.
    pub fn validate(&self) -> Result<()> {
        let tiles = [
            ("top_left", &self.tiles.top_left),
            ("top_right", &self.tiles.top_right),
            ("bottom_left", &self.tiles.bottom_left),
            ("bottom_right", &self.tiles.bottom_right),
        ];
        for (name, tile) in tiles {
            if tile.trim().is_empty() {
                bail!("tile {name} must not be empty");
            }
        }
        if self.target.trim().is_empty() {
            bail!("target must not be empty");
        }

        let robots = self.robots.named();
        for (name, pos) in robots {
            if !pos.on_board() {
                bail!("robot {name} at {pos} is off the {BOARD_SIZE}x{BOARD_SIZE} board");
            }
        }
        for (i, (name, pos)) in robots.iter().enumerate() {
            if let Some((other, _)) = robots[i + 1..].iter().find(|(_, p)| p == pos) {
                bail!("robots {name} and {other} share field {pos}");
            }
        }
        Ok(())
    }

    /// Ordered solver arguments.
    pub fn cmd_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(18);
        let mut push = |flag: &str, value: String| {
            args.push(format!("-{flag}"));
            args.push(value);
        };
        push("tl", self.tiles.top_left.clone());
        push("tr", self.tiles.top_right.clone());
        push("bl", self.tiles.bottom_left.clone());
        push("br", self.tiles.bottom_right.clone());
        for (name, pos) in self.robots.named() {
            push(name, pos.to_string());
        }
        push("target", self.target.clone());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_task;

    #[test]
    fn cmd_args_follow_fixed_order() {
        let args = sample_task().cmd_args();
        assert_eq!(
            args,
            vec![
                "-tl", "A1", "-tr", "B2", "-bl", "C3", "-br", "D4", "-yellow", "0,0", "-red",
                "15,0", "-green", "0,15", "-blue", "15,15", "-target", "yellow-pyramid",
            ]
        );
    }

    #[test]
    fn cmd_args_are_deterministic() {
        let task = sample_task();
        assert_eq!(task.cmd_args(), task.clone().cmd_args());
    }

    #[test]
    fn coord_parses_with_whitespace() {
        let coord: Coord = " 3, 12 ".parse().expect("parse");
        assert_eq!(coord, Coord::new(3, 12));
    }

    #[test]
    fn coord_rejects_missing_separator() {
        let err = "312".parse::<Coord>().unwrap_err();
        assert!(err.to_string().contains("x,y"));
    }

    #[test]
    fn validate_accepts_sample() {
        sample_task().validate().expect("valid");
    }

    #[test]
    fn validate_rejects_off_board_robot() {
        let mut task = sample_task();
        task.robots.green = Coord::new(16, 2);
        let err = task.validate().unwrap_err();
        assert!(err.to_string().contains("green"));
    }

    #[test]
    fn validate_rejects_shared_field() {
        let mut task = sample_task();
        task.robots.blue = task.robots.red;
        let err = task.validate().unwrap_err();
        assert!(err.to_string().contains("red and blue"));
    }

    #[test]
    fn validate_rejects_blank_target() {
        let mut task = sample_task();
        task.target = "  ".to_string();
        assert!(task.validate().is_err());
    }
}
