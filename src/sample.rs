use crate::error::{XfResult, XrayFitError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// One element of a layer. Densities are in mol/cm^3, lengths in Angstrom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSlab {
    pub symbol: String,
    #[serde(default = "one")]
    pub stoichiometry: f64,
    pub molar_mass: f64,
    pub thickness: f64,
    pub density: f64,
    #[serde(default)]
    pub roughness: f64,
    #[serde(default)]
    pub linked_roughness: Option<f64>,

    #[serde(default)]
    pub polymorphs: Vec<String>,
    #[serde(default)]
    pub poly_ratio: Vec<f64>,
    #[serde(default)]
    pub mag_density: Vec<f64>,
}

fn one() -> f64 {
    1.0
}

impl ElementSlab {
    pub fn is_polymorphous(&self) -> bool {
        !self.polymorphs.is_empty()
    }

    pub fn is_magnetic(&self) -> bool {
        !self.mag_density.is_empty()
    }

    pub fn polymorph_index(&self, polymorph: &str) -> Option<usize> {
        self.polymorphs.iter().position(|p| p == polymorph)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub elements: Vec<ElementSlab>,
}

impl Layer {
    pub fn element(&self, symbol: &str) -> Option<&ElementSlab> {
        self.elements.iter().find(|e| e.symbol == symbol)
    }

    pub fn element_mut(&mut self, symbol: &str) -> Option<&mut ElementSlab> {
        self.elements.iter_mut().find(|e| e.symbol == symbol)
    }

    /// Chemical formula, stoichiometry of 1 omitted: `SrTiO3`.
    pub fn formula(&self) -> String {
        self.elements
            .iter()
            .map(|e| {
                if e.stoichiometry == 1.0 {
                    e.symbol.clone()
                } else {
                    format!("{}{}", e.symbol, e.stoichiometry)
                }
            })
            .collect()
    }

    pub fn polymorphous_elements(&self) -> Vec<&str> {
        self.elements
            .iter()
            .filter(|e| e.is_polymorphous())
            .map(|e| e.symbol.as_str())
            .collect()
    }

    pub fn magnetic_elements(&self) -> Vec<&str> {
        self.elements
            .iter()
            .filter(|e| e.is_magnetic())
            .map(|e| e.symbol.as_str())
            .collect()
    }
}

/// Layered sample model. Cloning gives an independent copy for one objective evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub layers: Vec<Layer>,
    #[serde(default = "one")]
    pub scaling_factor: f64,
    #[serde(default)]
    pub background_shift: f64,
    /// Energy offsets (eV) of the structural form-factor tables, by element.
    #[serde(default)]
    pub form_factor_shifts: BTreeMap<String, f64>,
    /// Energy offsets (eV) of the magnetic form-factor tables, by element.
    #[serde(default)]
    pub magnetic_form_factor_shifts: BTreeMap<String, f64>,
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            layers: Vec::new(),
            scaling_factor: 1.0,
            background_shift: 0.0,
            form_factor_shifts: BTreeMap::new(),
            magnetic_form_factor_shifts: BTreeMap::new(),
        }
    }
}

impl Sample {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> XfResult<Self> {
        let content = fs::read_to_string(path)?;
        let sample: Sample = serde_json::from_str(&content)?;
        sample.check()?;
        Ok(sample)
    }

    pub fn layer(&self, index: usize) -> XfResult<&Layer> {
        self.layers
            .get(index)
            .ok_or(XrayFitError::UnknownLayerIndex(index))
    }

    pub fn layer_mut(&mut self, index: usize) -> XfResult<&mut Layer> {
        self.layers
            .get_mut(index)
            .ok_or(XrayFitError::UnknownLayerIndex(index))
    }

    pub fn element_mut(&mut self, layer: usize, element: &str) -> XfResult<&mut ElementSlab> {
        self.layer_mut(layer)?
            .element_mut(element)
            .ok_or_else(|| XrayFitError::UnknownElement {
                layer,
                element: element.to_string(),
            })
    }

    /// All element symbols in order of first appearance.
    pub fn element_symbols(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for layer in &self.layers {
            for e in &layer.elements {
                if !out.contains(&e.symbol) {
                    out.push(e.symbol.clone());
                }
            }
        }
        out
    }

    /// Structural consistency of polymorph and molar-mass data.
    pub fn check(&self) -> XfResult<()> {
        for (i, layer) in self.layers.iter().enumerate() {
            for e in &layer.elements {
                if e.molar_mass <= 0.0 {
                    return Err(XrayFitError::Validation(format!(
                        "Layer {}: element '{}' needs a positive molar mass",
                        i, e.symbol
                    )));
                }
                if e.poly_ratio.len() != e.polymorphs.len() {
                    return Err(XrayFitError::Validation(format!(
                        "Layer {}: element '{}' lists {} polymorphs but {} ratios",
                        i,
                        e.symbol,
                        e.polymorphs.len(),
                        e.poly_ratio.len()
                    )));
                }
            }
        }
        Ok(())
    }
}
