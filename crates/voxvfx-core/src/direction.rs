use glam::{IVec3, Vec3};

/// One of the six axis-aligned faces of a voxel. Y-up convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Face {
    Top = 0,
    Right = 1,
    Bottom = 2,
    Left = 3,
    Front = 4,
    Back = 5,
}

/// All six faces in bit order.
pub const ALL_FACES: [Face; 6] = [
    Face::Top,
    Face::Right,
    Face::Bottom,
    Face::Left,
    Face::Front,
    Face::Back,
];

impl Face {
    /// Unit offset toward the neighbor across this face.
    pub fn offset(self) -> IVec3 {
        match self {
            Face::Top => IVec3::new(0, 1, 0),
            Face::Right => IVec3::new(1, 0, 0),
            Face::Bottom => IVec3::new(0, -1, 0),
            Face::Left => IVec3::new(-1, 0, 0),
            Face::Front => IVec3::new(0, 0, 1),
            Face::Back => IVec3::new(0, 0, -1),
        }
    }

    /// Outward normal as a float vector.
    pub fn normal(self) -> Vec3 {
        self.offset().as_vec3()
    }

    /// Bit for this face inside a [`FaceMask`].
    pub fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Six-bit set of visible faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FaceMask(pub u8);

impl FaceMask {
    pub const NONE: FaceMask = FaceMask(0);
    pub const ALL: FaceMask = FaceMask(0b11_1111);

    pub fn contains(self, face: Face) -> bool {
        self.0 & face.bit() != 0
    }

    pub fn insert(&mut self, face: Face) {
        self.0 |= face.bit();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Iterate the visible faces in bit order.
    pub fn faces(self) -> impl Iterator<Item = Face> {
        ALL_FACES.into_iter().filter(move |f| self.contains(*f))
    }

    /// Build a mask from a per-face predicate.
    pub fn from_fn(mut visible: impl FnMut(Face) -> bool) -> Self {
        let mut mask = FaceMask::NONE;
        for face in ALL_FACES {
            if visible(face) {
                mask.insert(face);
            }
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faces_unique_offsets() {
        for (i, a) in ALL_FACES.iter().enumerate() {
            for (j, b) in ALL_FACES.iter().enumerate() {
                if i != j {
                    assert_ne!(a.offset(), b.offset(), "faces {i} and {j} share offset");
                }
            }
        }
    }

    #[test]
    fn test_opposite_faces_cancel() {
        assert_eq!(Face::Top.offset() + Face::Bottom.offset(), IVec3::ZERO);
        assert_eq!(Face::Right.offset() + Face::Left.offset(), IVec3::ZERO);
        assert_eq!(Face::Front.offset() + Face::Back.offset(), IVec3::ZERO);
    }

    #[test]
    fn test_all_mask_contains_every_face() {
        for face in ALL_FACES {
            assert!(FaceMask::ALL.contains(face));
            assert!(!FaceMask::NONE.contains(face));
        }
        assert_eq!(FaceMask::ALL.count(), 6);
    }

    #[test]
    fn test_from_fn_and_iter() {
        let mask = FaceMask::from_fn(|f| matches!(f, Face::Top | Face::Back));
        let faces: Vec<Face> = mask.faces().collect();
        assert_eq!(faces, vec![Face::Top, Face::Back]);
        assert_eq!(mask.0, 0b10_0001);
    }
}
