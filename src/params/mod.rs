pub mod mutation;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

pub use self::mutation::apply;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Characteristic {
    Thickness,
    Density,
    Roughness,
    #[strum(to_string = "Linked Roughness", serialize = "LinkedRoughness")]
    LinkedRoughness,
}

impl Characteristic {
    pub fn unit(self) -> &'static str {
        match self {
            Characteristic::Density => "g/cm^3",
            _ => "Angstrom",
        }
    }
}

/// Which form-factor table a scattering-factor shift applies to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum FormFactorMode {
    Structural,
    Magnetic,
}

/// Names the sample attribute one entry of the optimization vector controls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParameterDescriptor {
    ScalingFactor,
    BackgroundShift,
    ScatteringFactorShift {
        element: String,
        mode: FormFactorMode,
    },
    /// Same characteristic for every element of a layer.
    StructuralCompound {
        layer: usize,
        characteristic: Characteristic,
    },
    StructuralElement {
        layer: usize,
        element: String,
        characteristic: Characteristic,
    },
    /// Occupancy of one of exactly two polymorphs; the other gets the complement.
    Polymorphous {
        layer: usize,
        element: String,
        polymorph: String,
    },
    Magnetic {
        layer: usize,
        element: String,
        #[serde(default)]
        polymorph: Option<String>,
    },
}

impl ParameterDescriptor {
    pub fn layer(&self) -> Option<usize> {
        match self {
            ParameterDescriptor::StructuralCompound { layer, .. }
            | ParameterDescriptor::StructuralElement { layer, .. }
            | ParameterDescriptor::Polymorphous { layer, .. }
            | ParameterDescriptor::Magnetic { layer, .. } => Some(*layer),
            _ => None,
        }
    }

    pub fn property(&self) -> &'static str {
        match self {
            ParameterDescriptor::ScalingFactor => "Scaling Factor",
            ParameterDescriptor::BackgroundShift => "Background Shift",
            ParameterDescriptor::ScatteringFactorShift { .. } => "Scattering Factor",
            ParameterDescriptor::StructuralCompound { .. }
            | ParameterDescriptor::StructuralElement { .. } => "Structural",
            ParameterDescriptor::Polymorphous { .. } => "Polymorphous",
            ParameterDescriptor::Magnetic { .. } => "Magnetic",
        }
    }
}
