//! Definition of the [`Side`] structure.

use std::ops::Not;

use rand::distributions::{Distribution, Standard};
use rand::Rng;

/// Enumeration symbolizing sides of the field : left for player 1, right for player 2.
///
/// The [`Not`] trait is implemented to support inversion using `!s` syntax.
///
/// An implementation of [`Distribution`] of [`Side`]s for [`Standard`] is given to make it easy to pick a random
/// serve direction.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Sign of the horizontal axis pointing towards this side of the field.
    pub fn x_sign(self) -> f64 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }
}

impl Not for Side {
    type Output = Side;
    fn not(self) -> Self::Output {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl Distribution<Side> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Side {
        match rng.gen() {
            true => Side::Left,
            false => Side::Right,
        }
    }
}

/// Index of the side in `[player1, player2]` arrays.
impl From<Side> for usize {
    fn from(value: Side) -> Self {
        match value {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}
