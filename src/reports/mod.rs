use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use xrayfit::objective::ScoreDetails;
use xrayfit::optimizer::FitOutcome;
use xrayfit::params::ParameterDescriptor;
use xrayfit::plan::FitPlan;
use xrayfit::sample::Sample;
use xrayfit::wizard::tables;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn print_score_report(title: &str, details: &ScoreDetails) {
    let mut table = new_table();
    table.add_row(vec![
        Cell::new("Scan").add_attribute(Attribute::Bold),
        Cell::new("Name"),
        Cell::new("Type"),
        Cell::new("Points"),
        Cell::new("Chi2").fg(Color::Cyan),
        Cell::new("Share"),
    ]);
    for i in [0, 3, 4, 5] {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }

    let total = if details.total > 0.0 { details.total } else { 1.0 };
    for c in &details.scans {
        table.add_row(vec![
            Cell::new(c.scan_number).add_attribute(Attribute::Bold),
            Cell::new(&c.name),
            Cell::new(c.scan_type),
            Cell::new(c.points_used),
            Cell::new(format!("{:.4}", c.chi2)).fg(Color::Cyan),
            Cell::new(format!("{:.1}%", c.chi2 / total * 100.0)),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total").add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(""),
        Cell::new(details.scans.iter().map(|c| c.points_used).sum::<usize>()),
        Cell::new(format!("{:.4}", details.total)).add_attribute(Attribute::Bold),
        Cell::new(""),
    ]);
    println!("\n{}\n{}", title, table);
}

/// Per-scan chi-squared before and after the fit.
pub fn print_comparison_report(before: &ScoreDetails, after: &ScoreDetails) {
    let mut table = new_table();
    table.add_row(vec![
        Cell::new("Scan").add_attribute(Attribute::Bold),
        Cell::new("Name"),
        Cell::new("Before"),
        Cell::new("After"),
        Cell::new("Change"),
    ]);
    for i in [0, 2, 3, 4] {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }

    let delta_cell = |b: f64, a: f64| {
        let d = a - b;
        let cell = Cell::new(format!("{:+.4}", d));
        if d < 0.0 {
            cell.fg(Color::Green)
        } else if d > 0.0 {
            cell.fg(Color::Red)
        } else {
            cell
        }
    };

    for a in &after.scans {
        let b = before.contribution(a.scan_number).map(|c| c.chi2);
        table.add_row(vec![
            Cell::new(a.scan_number).add_attribute(Attribute::Bold),
            Cell::new(&a.name),
            Cell::new(b.map_or("-".into(), |v| format!("{:.4}", v))),
            Cell::new(format!("{:.4}", a.chi2)),
            b.map_or(Cell::new("-"), |v| delta_cell(v, a.chi2)),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total").add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(format!("{:.4}", before.total)),
        Cell::new(format!("{:.4}", after.total)).add_attribute(Attribute::Bold),
        delta_cell(before.total, after.total),
    ]);
    println!("\n📊 Before / After\n{}", table);
}

pub fn print_fit_result(plan: &FitPlan, base: &Sample, outcome: &FitOutcome) {
    let r = &outcome.result;
    println!(
        "\n✅ {} finished: chi2 = {:.6} after {} iterations ({} evaluations)",
        r.strategy, r.chi2, r.iterations, r.evaluations
    );

    let mut out = new_table();
    out.set_header(vec![
        Cell::new("Parameter").add_attribute(Attribute::Bold),
        Cell::new("Lower"),
        Cell::new("Upper"),
        Cell::new("Fitted").fg(Color::Cyan),
    ]);
    for ((d, b), v) in plan.parameters.iter().zip(&plan.bounds).zip(&r.x) {
        let label = match d.layer() {
            Some(l) => format!("L{} {}", l, describe_short(base, d)),
            None => describe_short(base, d),
        };
        out.add_row(vec![
            Cell::new(label),
            Cell::new(format!("{:.4}", b.lower)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.4}", b.upper)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.6}", v))
                .fg(Color::Cyan)
                .set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{}", out);

    if let Some(before) = &outcome.before {
        print_comparison_report(before, &outcome.after);
    } else {
        print_score_report("📊 Fitted score", &outcome.after);
    }
}

pub fn print_layers(sample: &Sample) {
    println!("\n🧱 Layers\n{}", tables::layer_table(sample));
}

fn describe_short(sample: &Sample, d: &ParameterDescriptor) -> String {
    use ParameterDescriptor as P;
    match d {
        P::ScalingFactor | P::BackgroundShift => d.property().to_string(),
        P::ScatteringFactorShift { element, mode } => format!("{} {} shift", element, mode),
        P::StructuralCompound {
            layer,
            characteristic,
        } => {
            let formula = sample.layers.get(*layer).map(|l| l.formula());
            format!("{} {}", formula.unwrap_or_default(), characteristic)
        }
        P::StructuralElement {
            element,
            characteristic,
            ..
        } => format!("{} {}", element, characteristic),
        P::Polymorphous {
            element, polymorph, ..
        } => format!("{} ratio {}", element, polymorph),
        P::Magnetic {
            element, polymorph, ..
        } => match polymorph {
            Some(p) => format!("{} magnetic {}", element, p),
            None => format!("{} magnetic", element),
        },
    }
}
