//! Digit identities and fixed-size per-digit storage

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// One finger of the hand
///
/// Indices are fixed: 0 = thumb, 1 = index, 2 = middle, 3 = ring, 4 = pinky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Digit {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Digit {
    /// All digits in processing order
    pub const ALL: [Digit; 5] = [
        Digit::Thumb,
        Digit::Index,
        Digit::Middle,
        Digit::Ring,
        Digit::Pinky,
    ];

    /// Digits driven by a three-finger (grip) binding
    pub const THREE_FINGER: [Digit; 3] = [Digit::Middle, Digit::Ring, Digit::Pinky];

    pub const fn index(self) -> usize {
        match self {
            Digit::Thumb => 0,
            Digit::Index => 1,
            Digit::Middle => 2,
            Digit::Ring => 3,
            Digit::Pinky => 4,
        }
    }

    /// Animation layer driven by this digit (layer 0 is the base pose)
    pub const fn layer(self) -> usize {
        self.index() + 1
    }
}

impl fmt::Display for Digit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Digit::Thumb => write!(f, "Thumb"),
            Digit::Index => write!(f, "Index"),
            Digit::Middle => write!(f, "Middle"),
            Digit::Ring => write!(f, "Ring"),
            Digit::Pinky => write!(f, "Pinky"),
        }
    }
}

/// Input target of a binding: a single digit or the middle/ring/pinky group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FingerTarget {
    Digit(Digit),
    ThreeFinger,
}

impl FingerTarget {
    /// Digits an event on this target fans out to
    pub fn digits(&self) -> &'static [Digit] {
        match self {
            FingerTarget::Digit(Digit::Thumb) => &[Digit::Thumb],
            FingerTarget::Digit(Digit::Index) => &[Digit::Index],
            FingerTarget::Digit(Digit::Middle) => &[Digit::Middle],
            FingerTarget::Digit(Digit::Ring) => &[Digit::Ring],
            FingerTarget::Digit(Digit::Pinky) => &[Digit::Pinky],
            FingerTarget::ThreeFinger => &Digit::THREE_FINGER,
        }
    }
}

impl fmt::Display for FingerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FingerTarget::Digit(digit) => write!(f, "{}", digit),
            FingerTarget::ThreeFinger => write!(f, "ThreeFinger"),
        }
    }
}

/// Five-slot record indexed by [`Digit`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DigitMap<T>([T; 5]);

impl<T> DigitMap<T> {
    pub fn from_fn(mut f: impl FnMut(Digit) -> T) -> Self {
        Self(Digit::ALL.map(&mut f))
    }

    /// Iterates in thumb → pinky order
    pub fn iter(&self) -> impl Iterator<Item = (Digit, &T)> {
        Digit::ALL.into_iter().zip(self.0.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Digit, &mut T)> {
        Digit::ALL.into_iter().zip(self.0.iter_mut())
    }

    pub fn map<U>(&self, mut f: impl FnMut(Digit, &T) -> U) -> DigitMap<U> {
        DigitMap::from_fn(|digit| f(digit, &self.0[digit.index()]))
    }
}

impl<T: Copy> DigitMap<T> {
    pub fn splat(value: T) -> Self {
        Self([value; 5])
    }
}

impl<T> Index<Digit> for DigitMap<T> {
    type Output = T;

    fn index(&self, digit: Digit) -> &T {
        &self.0[digit.index()]
    }
}

impl<T> IndexMut<Digit> for DigitMap<T> {
    fn index_mut(&mut self, digit: Digit) -> &mut T {
        &mut self.0[digit.index()]
    }
}
