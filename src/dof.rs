//! Oriented degrees of freedom.
use nalgebra::RealField;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A DOF index together with an orientation flag.
///
/// Adjacent elements may traverse a shared edge or face in opposite directions, in which case
/// the local basis function of one element is the negative of the global one. The flag records
/// this flip explicitly instead of packing it into the sign of the index.
///
/// The packed encoding used by many finite element libraries (`v >= 0` is an unflipped index,
/// `v < 0` encodes index `-1 - v` with a flip) is supported through
/// [`from_packed`](Self::from_packed) and [`to_packed`](Self::to_packed).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignedDof {
    index: usize,
    flipped: bool,
}

impl SignedDof {
    pub const fn new(index: usize, flipped: bool) -> Self {
        Self { index, flipped }
    }

    pub fn positive(index: usize) -> Self {
        Self::new(index, false)
    }

    pub fn negative(index: usize) -> Self {
        Self::new(index, true)
    }

    /// Decodes the packed representation, in which a negative value `v` denotes index `-1 - v`
    /// with a sign flip.
    pub fn from_packed(packed: i64) -> Self {
        if packed >= 0 {
            Self::positive(packed as usize)
        } else {
            Self::negative((-1 - packed) as usize)
        }
    }

    pub fn to_packed(&self) -> i64 {
        let index = self.index as i64;
        if self.flipped {
            -1 - index
        } else {
            index
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    /// Returns the same DOF with the opposite orientation.
    pub fn flip(&self) -> Self {
        Self::new(self.index, !self.flipped)
    }

    /// Replaces the index while keeping the orientation.
    pub fn with_index(&self, index: usize) -> Self {
        Self::new(index, self.flipped)
    }

    /// Whether the product of the two orientations is a flip.
    pub fn relative_flip(&self, other: &SignedDof) -> bool {
        self.flipped != other.flipped
    }

    /// Applies the orientation to a value, i.e. negates it if the DOF is flipped.
    pub fn apply<T: RealField>(&self, value: T) -> T {
        apply_flip(self.flipped, value)
    }
}

impl fmt::Debug for SignedDof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.flipped {
            write!(f, "-{}", self.index)
        } else {
            write!(f, "+{}", self.index)
        }
    }
}

impl From<usize> for SignedDof {
    fn from(index: usize) -> Self {
        Self::positive(index)
    }
}

#[inline]
pub(crate) fn apply_flip<T: RealField>(flipped: bool, value: T) -> T {
    if flipped {
        -value
    } else {
        value
    }
}
