//! Sizes in one, two and three dimensions
//!
//! Dimensions are stored as `i16` to match the native window protocol. Nothing
//! here enforces positivity; callers that hand an extent to a platform validate
//! it with [`Extent2d::validate`].

use serde::{Deserialize, Serialize};

/// Size of a single dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Extent {
    /// Length of the extent
    pub length: i16,
}

/// Sizes of two dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Extent2d {
    /// Width of the extent
    pub width: i16,
    /// Height of the extent
    pub height: i16,
}

/// Sizes of three dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Extent3d {
    /// Width of the extent
    pub width: i16,
    /// Height of the extent
    pub height: i16,
    /// Depth of the extent
    pub depth: i16,
}

impl Extent {
    /// Create a new one dimensional extent
    pub const fn new(length: i16) -> Self {
        Self { length }
    }
}

impl Extent2d {
    /// Create a new two dimensional extent
    pub const fn new(width: i16, height: i16) -> Self {
        Self { width, height }
    }

    /// Returns the dimensions as unsigned values if both are strictly positive
    pub fn validate(self) -> Option<(u16, u16)> {
        let width = u16::try_from(self.width).ok().filter(|w| *w > 0)?;
        let height = u16::try_from(self.height).ok().filter(|h| *h > 0)?;
        Some((width, height))
    }
}

impl Extent3d {
    /// Create a new three dimensional extent
    pub const fn new(width: i16, height: i16, depth: i16) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// The width and height of this extent
    pub const fn to_2d(self) -> Extent2d {
        Extent2d::new(self.width, self.height)
    }
}

impl std::fmt::Display for Extent2d {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_extent_validates() {
        assert_eq!(Extent2d::new(800, 600).validate(), Some((800, 600)));
        assert_eq!(Extent2d::new(1, 1).validate(), Some((1, 1)));
        assert_eq!(Extent2d::new(i16::MAX, 2).validate(), Some((32767, 2)));
    }

    #[test]
    fn test_non_positive_extent_rejected() {
        assert_eq!(Extent2d::new(0, 600).validate(), None);
        assert_eq!(Extent2d::new(800, 0).validate(), None);
        assert_eq!(Extent2d::new(-1, 600).validate(), None);
        assert_eq!(Extent2d::new(800, i16::MIN).validate(), None);
    }

    #[test]
    fn test_display_and_projection() {
        assert_eq!(Extent2d::new(10, 20).to_string(), "10x20");
        assert_eq!(Extent3d::new(4, 5, 6).to_2d(), Extent2d::new(4, 5));
    }
}
