use nalgebra::Vector3;

/// Axis held fixed by an axis-aligned cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// One of the six axis-aligned faces of a volume's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::PosX,
        Face::NegX,
        Face::PosY,
        Face::NegY,
        Face::PosZ,
        Face::NegZ,
    ];

    /// Outward unit normal
    pub fn normal(self) -> Vector3<f64> {
        match self {
            Face::PosX => Vector3::x(),
            Face::NegX => -Vector3::x(),
            Face::PosY => Vector3::y(),
            Face::NegY => -Vector3::y(),
            Face::PosZ => Vector3::z(),
            Face::NegZ => -Vector3::z(),
        }
    }

    /// Box corners bounding this face. Corner `i` has x set when bit 0 is
    /// set, y for bit 1 and z for bit 2.
    pub fn corners(self) -> [usize; 4] {
        match self {
            Face::PosX => [1, 3, 7, 5],
            Face::NegX => [0, 2, 6, 4],
            Face::PosY => [2, 3, 7, 6],
            Face::NegY => [0, 1, 5, 4],
            Face::PosZ => [4, 5, 7, 6],
            Face::NegZ => [0, 1, 3, 2],
        }
    }
}

#[derive(Default)]
pub enum SortBy {
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}
