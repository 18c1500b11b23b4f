use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Material identifier, stored as one byte in the arena
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Pod, Zeroable,
)]
#[repr(transparent)]
pub struct Material(pub u8);

impl Material {
    pub const AIR: Material = Material(0);
    pub const DEBUG_RED: Material = Material(1);
    pub const DEBUG_GREEN: Material = Material(2);
    pub const DEBUG_BLUE: Material = Material(3);
    pub const STONE: Material = Material(4);
    pub const DIRT: Material = Material(5);
    pub const GRASS: Material = Material(6);

    pub const fn new(id: u8) -> Self {
        Material(id)
    }

    pub const fn is_air(self) -> bool {
        self.0 == Self::AIR.0
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Material::AIR => write!(f, "Air"),
            Material::DEBUG_RED => write!(f, "Debug Red"),
            Material::DEBUG_GREEN => write!(f, "Debug Green"),
            Material::DEBUG_BLUE => write!(f, "Debug Blue"),
            Material::STONE => write!(f, "Stone"),
            Material::DIRT => write!(f, "Dirt"),
            Material::GRASS => write!(f, "Grass"),
            _ => write!(f, "Material({})", self.0),
        }
    }
}

/// One voxel as laid out in a terminal node's voxel array
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct Voxel {
    pub material: Material,
}

static_assertions::const_assert_eq!(
    std::mem::size_of::<Voxel>(),
    crate::constants::layout::VOXEL_SIZE
);

impl Voxel {
    pub const AIR: Voxel = Voxel::new(Material::AIR);

    pub const fn new(material: Material) -> Self {
        Self { material }
    }

    pub const fn is_air(self) -> bool {
        self.material.is_air()
    }
}

impl From<Material> for Voxel {
    fn from(material: Material) -> Self {
        Voxel::new(material)
    }
}
