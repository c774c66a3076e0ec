use super::preview::PreviewRequest;
use crate::bounds::ParameterBound;
use crate::params::ParameterDescriptor;
use crate::plan::ParameterSelection;
use crate::sample::Sample;
use crate::scan::{Dataset, ScanRecord};
use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
        );
    table
}

fn join_or_dash(items: &[&str]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

pub fn scan_table(dataset: &Dataset) -> Table {
    record_table(&dataset.records)
}

pub fn record_table(records: &[ScanRecord]) -> Table {
    let mut table = new_table(&["Scan Number", "Scan Type", "Scan Name"]);
    for r in records {
        table.add_row(vec![
            Cell::new(r.scan_number).set_alignment(CellAlignment::Right),
            Cell::new(r.scan_type),
            Cell::new(&r.name),
        ]);
    }
    table
}

pub fn layer_table(sample: &Sample) -> Table {
    let mut table = new_table(&["Layer", "Formula", "Polymorphs", "Magnetic"]);
    for (i, layer) in sample.layers.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i).set_alignment(CellAlignment::Right),
            Cell::new(layer.formula()),
            Cell::new(join_or_dash(&layer.polymorphous_elements())),
            Cell::new(join_or_dash(&layer.magnetic_elements())),
        ]);
    }
    table
}

fn describe(sample: &Sample, d: &ParameterDescriptor) -> [String; 5] {
    let dash = || "-".to_string();
    let layer = d.layer().map_or_else(dash, |l| l.to_string());
    match d {
        ParameterDescriptor::ScalingFactor | ParameterDescriptor::BackgroundShift => {
            [dash(), d.property().into(), dash(), dash(), dash()]
        }
        ParameterDescriptor::ScatteringFactorShift { element, mode } => [
            dash(),
            d.property().into(),
            element.clone(),
            dash(),
            format!("{} Energy Shift", mode),
        ],
        ParameterDescriptor::StructuralCompound {
            layer: l,
            characteristic,
        } => [
            layer,
            d.property().into(),
            sample
                .layers
                .get(*l)
                .map_or_else(dash, |layer| layer.formula()),
            dash(),
            characteristic.to_string(),
        ],
        ParameterDescriptor::StructuralElement {
            element,
            characteristic,
            ..
        } => [
            layer,
            d.property().into(),
            element.clone(),
            dash(),
            characteristic.to_string(),
        ],
        ParameterDescriptor::Polymorphous {
            element, polymorph, ..
        } => [
            layer,
            d.property().into(),
            element.clone(),
            polymorph.clone(),
            "Density Ratio".into(),
        ],
        ParameterDescriptor::Magnetic {
            element, polymorph, ..
        } => [
            layer,
            d.property().into(),
            element.clone(),
            polymorph.clone().unwrap_or_else(dash),
            "Magnetic Density".into(),
        ],
    }
}

pub fn parameter_table(
    sample: &Sample,
    descriptors: &[ParameterDescriptor],
    bounds: &[ParameterBound],
) -> Table {
    let mut table = new_table(&[
        "Layer",
        "Property",
        "Element",
        "Polymorph",
        "Characteristic",
        "Lower Bound",
        "Upper Bound",
    ]);
    for (d, b) in descriptors.iter().zip(bounds) {
        let mut row: Vec<Cell> = describe(sample, d).into_iter().map(Cell::new).collect();
        row.push(Cell::new(format!("{:.4}", b.lower)).set_alignment(CellAlignment::Right));
        row.push(Cell::new(format!("{:.4}", b.upper)).set_alignment(CellAlignment::Right));
        table.add_row(row);
    }
    table
}

pub fn selection_table(sample: &Sample, selection: &ParameterSelection) -> Table {
    parameter_table(sample, &selection.descriptors, &selection.bounds)
}

/// Point count and axis span of each scan in a preview request.
pub fn preview_table(request: &PreviewRequest) -> Table {
    let mut table = new_table(&["Scan", "Points", "Axis Start", "Axis End", "Simulated"]);
    for r in &request.scans {
        let Some(data) = request.measured.get(&r.name) else {
            continue;
        };
        let (start, end) = data
            .axis_range(r.scan_type)
            .map_or(("-".into(), "-".into()), |(a, b)| {
                (format!("{:.4}", a), format!("{:.4}", b))
            });
        table.add_row(vec![
            Cell::new(&r.name),
            Cell::new(data.len()).set_alignment(CellAlignment::Right),
            Cell::new(start).set_alignment(CellAlignment::Right),
            Cell::new(end).set_alignment(CellAlignment::Right),
            Cell::new(if request.simulated.contains_key(&r.name) {
                "yes"
            } else {
                "no"
            }),
        ]);
    }
    table
}
