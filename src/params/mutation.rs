use super::{Characteristic, FormFactorMode, ParameterDescriptor};
use crate::error::{XfResult, XrayFitError};
use crate::sample::{ElementSlab, Sample};

/// Writes the optimization vector `x` into `sample`, entry `p` going to the attribute named by
/// `descriptors[p]`. Deterministic; the only writer of sample state during a fit.
pub fn apply(x: &[f64], descriptors: &[ParameterDescriptor], sample: &mut Sample) -> XfResult<()> {
    if x.len() != descriptors.len() {
        return Err(XrayFitError::MismatchedLengths(format!(
            "{} parameter values for {} descriptors",
            x.len(),
            descriptors.len()
        )));
    }

    for (&value, descriptor) in x.iter().zip(descriptors) {
        apply_one(value, descriptor, sample)?;
    }
    Ok(())
}

fn apply_one(value: f64, descriptor: &ParameterDescriptor, sample: &mut Sample) -> XfResult<()> {
    match descriptor {
        ParameterDescriptor::ScalingFactor => sample.scaling_factor = value,
        ParameterDescriptor::BackgroundShift => sample.background_shift = value,
        ParameterDescriptor::ScatteringFactorShift { element, mode } => {
            let shifts = match mode {
                FormFactorMode::Structural => &mut sample.form_factor_shifts,
                FormFactorMode::Magnetic => &mut sample.magnetic_form_factor_shifts,
            };
            shifts.insert(element.clone(), value);
        }
        ParameterDescriptor::StructuralCompound {
            layer,
            characteristic,
        } => {
            let layer = sample.layer_mut(*layer)?;
            for slab in &mut layer.elements {
                match characteristic {
                    // Molar density of the compound -> elemental density
                    Characteristic::Density => {
                        slab.density = value * slab.stoichiometry / slab.molar_mass
                    }
                    c => set_characteristic(slab, *c, value),
                }
            }
        }
        ParameterDescriptor::StructuralElement {
            layer,
            element,
            characteristic,
        } => {
            let slab = sample.element_mut(*layer, element)?;
            set_characteristic(slab, *characteristic, value);
        }
        ParameterDescriptor::Polymorphous {
            layer,
            element,
            polymorph,
        } => {
            let slab = sample.element_mut(*layer, element)?;
            if slab.polymorphs.len() != 2 || slab.poly_ratio.len() != 2 {
                return Err(XrayFitError::Config(format!(
                    "Layer {}: '{}' must have exactly two polymorphs to vary their ratio",
                    layer, element
                )));
            }
            let idx = slab
                .polymorph_index(polymorph)
                .ok_or_else(|| unknown_polymorph(*layer, element, polymorph))?;
            slab.poly_ratio[idx] = value;
            slab.poly_ratio[1 - idx] = 1.0 - value;
        }
        ParameterDescriptor::Magnetic {
            layer,
            element,
            polymorph,
        } => {
            let slab = sample.element_mut(*layer, element)?;
            let idx = match polymorph {
                None => 0,
                Some(p) => slab
                    .polymorph_index(p)
                    .ok_or_else(|| unknown_polymorph(*layer, element, p))?,
            };
            let slot = slab.mag_density.get_mut(idx).ok_or_else(|| {
                XrayFitError::Config(format!(
                    "Layer {}: '{}' has no magnetic density slot {}",
                    layer, element, idx
                ))
            })?;
            *slot = value;
        }
    }
    Ok(())
}

fn set_characteristic(slab: &mut ElementSlab, characteristic: Characteristic, value: f64) {
    match characteristic {
        Characteristic::Thickness => slab.thickness = value,
        Characteristic::Density => slab.density = value,
        Characteristic::Roughness => slab.roughness = value,
        Characteristic::LinkedRoughness => slab.linked_roughness = Some(value),
    }
}

fn unknown_polymorph(layer: usize, element: &str, polymorph: &str) -> XrayFitError {
    XrayFitError::UnknownPolymorph {
        layer,
        element: element.to_string(),
        polymorph: polymorph.to_string(),
    }
}
