use super::input::parse_number;
use super::prompt::{Prompter, Reply};
use super::tables::{layer_table, selection_table};
use crate::bounds::ParameterBound;
use crate::error::{XfResult, XrayFitError};
use crate::params::{Characteristic, FormFactorMode, ParameterDescriptor};
use crate::plan::ParameterSelection;
use crate::sample::{Layer, Sample};
use std::io::{BufRead, Write};
use strum::IntoEnumIterator;

/// How a dialog ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Done,
    Return,
    Exit,
}

/// Unwraps a reply or leaves the enclosing dialog.
macro_rules! value_or_leave {
    ($reply:expr) => {
        match $reply {
            Reply::Value(v) => v,
            Reply::Return => return Ok(Flow::Return),
            Reply::Exit => return Ok(Flow::Exit),
        }
    };
}

struct ParameterWizard<'a, R, W> {
    prompter: &'a mut Prompter<R, W>,
    sample: &'a Sample,
    selection: ParameterSelection,
}

/// Interactive parameter selection. `None` when the user typed `EXIT`.
pub fn select_parameters<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    sample: &Sample,
) -> XfResult<Option<ParameterSelection>> {
    if sample.layers.is_empty() {
        return Err(XrayFitError::Validation("sample has no layers".into()));
    }
    let table = layer_table(sample).to_string();
    prompter.set_show(table.clone());
    prompter.say("PARAMETER SELECTION")?;
    prompter.say(&table)?;

    let mut wizard = ParameterWizard {
        prompter,
        sample,
        selection: ParameterSelection::default(),
    };

    if wizard.global_stage()? == Flow::Exit {
        return Ok(None);
    }
    loop {
        match wizard.layer_stage()? {
            Flow::Exit => return Ok(None),
            Flow::Return => continue,
            Flow::Done => {}
        }
        match wizard.prompter.confirm("Would you like to select another layer")? {
            Reply::Value(true) | Reply::Return => continue,
            Reply::Value(false) => break,
            Reply::Exit => return Ok(None),
        }
    }

    let summary = selection_table(sample, &wizard.selection).to_string();
    wizard.prompter.say(&summary)?;
    Ok(Some(wizard.selection))
}

impl<'a, R: BufRead, W: Write> ParameterWizard<'a, R, W> {
    fn push(&mut self, descriptor: ParameterDescriptor, bound: ParameterBound) {
        self.selection.push(descriptor, bound);
    }

    fn taken(&self, descriptor: &ParameterDescriptor) -> bool {
        self.selection.contains(descriptor)
    }

    /// Lower then upper bound; asked again as a pair until `lower <= upper`.
    fn ask_bound(
        &mut self,
        what: &str,
        unit: Option<&str>,
        range: Option<(f64, f64)>,
    ) -> XfResult<Reply<ParameterBound>> {
        let unit = unit.map(|u| format!(" ({})", u)).unwrap_or_default();
        let within = move |s: &str| {
            let v = parse_number(s)?;
            match range {
                Some((lo, hi)) if !(lo..=hi).contains(&v) => Err(XrayFitError::InvalidSelection(
                    format!("{} is outside [{}, {}]", v, lo, hi),
                )),
                _ => Ok(v),
            }
        };
        loop {
            let prompt = format!("Select the lower bound of the {}{}: ", what, unit);
            let lower = match self.prompter.ask(&prompt, within)? {
                Reply::Value(v) => v,
                Reply::Return => return Ok(Reply::Return),
                Reply::Exit => return Ok(Reply::Exit),
            };
            let prompt = format!("Select the upper bound of the {}{}: ", what, unit);
            let upper = match self.prompter.ask(&prompt, within)? {
                Reply::Value(v) => v,
                Reply::Return => return Ok(Reply::Return),
                Reply::Exit => return Ok(Reply::Exit),
            };
            match ParameterBound::new(lower, upper) {
                Ok(b) => return Ok(Reply::Value(b)),
                Err(_) => self
                    .prompter
                    .say("  The lower bound must not exceed the upper bound.")?,
            }
        }
    }

    fn menu_of(&mut self, title: &str, options: &[String]) -> XfResult<Reply<usize>> {
        let labels: Vec<&str> = options.iter().map(String::as_str).collect();
        self.prompter.menu(title, &labels)
    }

    fn another(&mut self, what: &str) -> XfResult<Reply<bool>> {
        self.prompter
            .confirm(&format!("Would you like to select another {}", what))
    }

    // ---- global parameters ----

    fn global_stage(&mut self) -> XfResult<Flow> {
        const CONTINUE: &str = "Continue to layers";
        loop {
            let mut options: Vec<String> = Vec::new();
            if !self.taken(&ParameterDescriptor::ScalingFactor) {
                options.push(ParameterDescriptor::ScalingFactor.property().into());
            }
            if !self.taken(&ParameterDescriptor::BackgroundShift) {
                options.push(ParameterDescriptor::BackgroundShift.property().into());
            }
            options.push("Scattering Factor Shift".into());
            options.push(CONTINUE.into());

            let choice = match self.menu_of("\nGlobal parameters:", &options)? {
                Reply::Value(i) => options[i].clone(),
                Reply::Return => return Ok(Flow::Done),
                Reply::Exit => return Ok(Flow::Exit),
            };

            let flow = match choice.as_str() {
                CONTINUE => return Ok(Flow::Done),
                "Scaling Factor" => self.simple_global(ParameterDescriptor::ScalingFactor, None)?,
                "Background Shift" => {
                    self.simple_global(ParameterDescriptor::BackgroundShift, Some("log10 units"))?
                }
                _ => self.scattering_factor_shift()?,
            };
            if flow == Flow::Exit {
                return Ok(Flow::Exit);
            }
        }
    }

    fn simple_global(
        &mut self,
        descriptor: ParameterDescriptor,
        unit: Option<&str>,
    ) -> XfResult<Flow> {
        let what = descriptor.property().to_lowercase();
        let bound = value_or_leave!(self.ask_bound(&what, unit, None)?);
        self.push(descriptor, bound);
        Ok(Flow::Done)
    }

    fn scattering_factor_shift(&mut self) -> XfResult<Flow> {
        let elements = self.sample.element_symbols();
        let i = value_or_leave!(self.menu_of("\nElement:", &elements)?);
        let element = elements[i].clone();

        let modes: Vec<FormFactorMode> = FormFactorMode::iter()
            .filter(|mode| {
                !self.taken(&ParameterDescriptor::ScatteringFactorShift {
                    element: element.clone(),
                    mode: *mode,
                })
            })
            .collect();
        if modes.is_empty() {
            self.prompter
                .say(&format!("  Every form-factor shift of {} is already selected.", element))?;
            return Ok(Flow::Done);
        }
        let labels: Vec<String> = modes.iter().map(|m| m.to_string()).collect();
        let mode = modes[value_or_leave!(self.menu_of("\nForm factor:", &labels)?)];

        let what = format!("{} {} energy shift", element, mode.to_string().to_lowercase());
        let bound = value_or_leave!(self.ask_bound(&what, Some("eV"), None)?);
        self.push(ParameterDescriptor::ScatteringFactorShift { element, mode }, bound);
        Ok(Flow::Done)
    }

    // ---- layer parameters ----

    fn layer_stage(&mut self) -> XfResult<Flow> {
        let n = self.sample.layers.len();
        let reply = self.prompter.ask(
            &format!("Select layer to fit (0-{}): ", n - 1),
            |s| {
                let i = s
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| XrayFitError::InvalidSelection(s.trim().to_string()))?;
                if i < n {
                    Ok(i)
                } else {
                    Err(XrayFitError::UnknownLayerIndex(i))
                }
            },
        )?;
        let index = match reply {
            Reply::Value(i) => i,
            // Nothing above the layer prompt to return to.
            Reply::Return => return Ok(Flow::Return),
            Reply::Exit => return Ok(Flow::Exit),
        };
        let sample: &'a Sample = self.sample;
        let layer = &sample.layers[index];

        let mut options = vec!["Structural".to_string()];
        if !layer.polymorphous_elements().is_empty() {
            options.push("Polymorphous".into());
        }
        if !layer.magnetic_elements().is_empty() {
            options.push("Magnetic".into());
        }
        let i = value_or_leave!(self.menu_of(&format!("\nLayer {} property:", index), &options)?);
        match options[i].as_str() {
            "Structural" => self.structural(index, layer),
            "Polymorphous" => self.polymorphous(index, layer),
            _ => self.magnetic(index, layer),
        }
    }

    fn structural(&mut self, index: usize, layer: &Layer) -> XfResult<Flow> {
        let modes = ["Compound".to_string(), "Element".to_string()];
        match value_or_leave!(self.menu_of("\nStructural mode:", &modes)?) {
            0 => self.compound(index, layer),
            _ => self.element(index, layer),
        }
    }

    fn compound(&mut self, index: usize, layer: &Layer) -> XfResult<Flow> {
        loop {
            let remaining: Vec<Characteristic> = Characteristic::iter()
                .filter(|c| {
                    !self.taken(&ParameterDescriptor::StructuralCompound {
                        layer: index,
                        characteristic: *c,
                    })
                })
                .collect();
            if remaining.is_empty() {
                self.prompter
                    .say("  Every characteristic of this layer is already selected.")?;
                return Ok(Flow::Done);
            }
            let labels: Vec<String> = remaining.iter().map(|c| c.to_string()).collect();
            let c = remaining[value_or_leave!(self.menu_of("\nCharacteristic:", &labels)?)];

            let what = format!("{} {}", layer.formula(), c.to_string().to_lowercase());
            let bound = value_or_leave!(self.ask_bound(&what, Some(c.unit()), None)?);
            self.push(
                ParameterDescriptor::StructuralCompound {
                    layer: index,
                    characteristic: c,
                },
                bound,
            );

            if !value_or_leave!(self.another("characteristic")?) {
                return Ok(Flow::Done);
            }
        }
    }

    fn element_characteristics_left(&self, index: usize, element: &str) -> Vec<Characteristic> {
        Characteristic::iter()
            .filter(|c| {
                !self.taken(&ParameterDescriptor::StructuralElement {
                    layer: index,
                    element: element.to_string(),
                    characteristic: *c,
                })
            })
            .collect()
    }

    fn element(&mut self, index: usize, layer: &Layer) -> XfResult<Flow> {
        loop {
            let elements: Vec<String> = layer
                .elements
                .iter()
                .map(|e| e.symbol.clone())
                .filter(|e| !self.element_characteristics_left(index, e).is_empty())
                .collect();
            if elements.is_empty() {
                self.prompter
                    .say("  Every element characteristic of this layer is already selected.")?;
                return Ok(Flow::Done);
            }
            let element = elements[value_or_leave!(self.menu_of("\nElement:", &elements)?)].clone();

            loop {
                let remaining = self.element_characteristics_left(index, &element);
                if remaining.is_empty() {
                    break;
                }
                let labels: Vec<String> = remaining.iter().map(|c| c.to_string()).collect();
                let c = remaining[value_or_leave!(self.menu_of("\nCharacteristic:", &labels)?)];

                let what = format!("{} {}", element, c.to_string().to_lowercase());
                let bound = value_or_leave!(self.ask_bound(&what, Some(c.unit()), None)?);
                self.push(
                    ParameterDescriptor::StructuralElement {
                        layer: index,
                        element: element.clone(),
                        characteristic: c,
                    },
                    bound,
                );

                if !value_or_leave!(self.another("characteristic")?) {
                    break;
                }
            }

            if !value_or_leave!(self.another("element")?) {
                return Ok(Flow::Done);
            }
        }
    }

    fn polymorphous(&mut self, index: usize, layer: &Layer) -> XfResult<Flow> {
        loop {
            // One ratio per element: the second polymorph takes the complement.
            let elements: Vec<String> = layer
                .polymorphous_elements()
                .into_iter()
                .filter(|e| {
                    !self.selection.descriptors.iter().any(|d| {
                        matches!(d, ParameterDescriptor::Polymorphous { layer: l, element, .. }
                            if *l == index && element == e)
                    })
                })
                .map(String::from)
                .collect();
            if elements.is_empty() {
                self.prompter
                    .say("  Every polymorphous element of this layer is already selected.")?;
                return Ok(Flow::Done);
            }
            let element = elements[value_or_leave!(self.menu_of("\nElement:", &elements)?)].clone();
            let polymorphs = layer
                .element(&element)
                .map(|e| e.polymorphs.clone())
                .unwrap_or_default();
            let polymorph =
                polymorphs[value_or_leave!(self.menu_of("\nPolymorph:", &polymorphs)?)].clone();

            let what = format!("{} density ratio", polymorph);
            let bound = value_or_leave!(self.ask_bound(&what, None, Some((0.0, 1.0)))?);
            self.push(
                ParameterDescriptor::Polymorphous {
                    layer: index,
                    element,
                    polymorph,
                },
                bound,
            );

            if !value_or_leave!(self.another("polymorphous element")?) {
                return Ok(Flow::Done);
            }
        }
    }

    fn magnetic_slots_left(&self, index: usize, layer: &Layer, element: &str) -> Vec<Option<String>> {
        let slots: Vec<Option<String>> = match layer.element(element) {
            Some(e) if e.is_polymorphous() => e.polymorphs.iter().cloned().map(Some).collect(),
            Some(_) => vec![None],
            None => Vec::new(),
        };
        slots
            .into_iter()
            .filter(|p| {
                !self.taken(&ParameterDescriptor::Magnetic {
                    layer: index,
                    element: element.to_string(),
                    polymorph: p.clone(),
                })
            })
            .collect()
    }

    fn magnetic(&mut self, index: usize, layer: &Layer) -> XfResult<Flow> {
        loop {
            let elements: Vec<String> = layer
                .magnetic_elements()
                .into_iter()
                .filter(|e| !self.magnetic_slots_left(index, layer, e).is_empty())
                .map(String::from)
                .collect();
            if elements.is_empty() {
                self.prompter
                    .say("  Every magnetic element of this layer is already selected.")?;
                return Ok(Flow::Done);
            }
            let element = elements[value_or_leave!(self.menu_of("\nElement:", &elements)?)].clone();

            loop {
                let slots = self.magnetic_slots_left(index, layer, &element);
                let Some(first) = slots.first() else {
                    break;
                };
                let polymorph = if first.is_some() {
                    let labels: Vec<String> = slots.iter().flatten().cloned().collect();
                    slots[value_or_leave!(self.menu_of("\nPolymorph:", &labels)?)].clone()
                } else {
                    None
                };

                let what = format!(
                    "{} magnetic density",
                    polymorph.as_deref().unwrap_or(&element)
                );
                let bound = value_or_leave!(self.ask_bound(&what, Some("mol/cm^3"), None)?);
                self.push(
                    ParameterDescriptor::Magnetic {
                        layer: index,
                        element: element.clone(),
                        polymorph: polymorph.clone(),
                    },
                    bound,
                );

                if polymorph.is_none() || !value_or_leave!(self.another("polymorph")?) {
                    break;
                }
            }

            if !value_or_leave!(self.another("magnetic element")?) {
                return Ok(Flow::Done);
            }
        }
    }
}
