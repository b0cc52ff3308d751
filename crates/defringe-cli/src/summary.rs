use console::Style;
use defringe_core::pipeline::{ModelOutput, RemovalOutput};
use defringe_core::setup::{ModelConfig, RemovalConfig, RemovalTarget};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    good: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            good: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

fn print_title(s: &Styles, title: &str) {
    println!();
    println!("  {}", s.title.apply_to(title));
    println!(
        "  {}",
        s.title.apply_to("\u{2550}".repeat(title.chars().count()))
    );
    println!();
}

pub fn print_model_summary(config: &ModelConfig) {
    let s = Styles::new();
    print_title(&s, "Fringe Model");

    println!(
        "  {:<14}{}",
        s.label.apply_to("Images"),
        s.path.apply_to(config.image_folder.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(config.model_name.display())
    );
    match config.sample_count {
        Some(n) if n > 0 => println!(
            "  {:<14}{}",
            s.label.apply_to("Samples"),
            s.value.apply_to(n)
        ),
        _ => println!(
            "  {:<14}{}",
            s.label.apply_to("Samples"),
            s.disabled.apply_to("one per image")
        ),
    }
    match config.seed {
        Some(seed) => println!(
            "  {:<14}{}",
            s.label.apply_to("Seed"),
            s.value.apply_to(seed)
        ),
        None => println!(
            "  {:<14}{}",
            s.label.apply_to("Seed"),
            s.disabled.apply_to("random")
        ),
    }
    println!();
}

pub fn print_model_result(output: &ModelOutput) {
    let s = Styles::new();
    let (rows, cols) = output.shape;

    println!();
    println!("  {}", s.header.apply_to("Model saved"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("File"),
        s.path.apply_to(output.path.display())
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Size"),
        s.value.apply_to(format!("{cols}x{rows}"))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Samples"),
        s.value.apply_to(output.provenance.sample_count)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Images"),
        s.good.apply_to(output.images)
    );
    if output.skipped > 0 {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Skipped"),
            s.disabled.apply_to(output.skipped)
        );
    }
    println!();
}

pub fn print_removal_summary(config: &RemovalConfig) {
    let s = Styles::new();
    print_title(&s, "Fringe Removal");

    let (label, target) = match &config.target {
        RemovalTarget::Image(path) => ("Image", path),
        RemovalTarget::Folder(path) => ("Folder", path),
    };
    println!(
        "  {:<14}{}",
        s.label.apply_to(label),
        s.path.apply_to(target.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Model"),
        s.path.apply_to(config.model_name.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Pairs"),
        s.path.apply_to(config.control_pairs.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Box width"),
        s.value.apply_to(format!("{} px", 2 * config.box_radius() + 1))
    );
    println!();
}

pub fn print_removal_result(output: &RemovalOutput) {
    let s = Styles::new();
    let summary = &output.summary;

    println!();
    println!("  {}", s.header.apply_to("Corrected"));
    for (path, ratio) in &summary.corrected {
        println!(
            "    {}  {}",
            s.path.apply_to(path.display()),
            s.label.apply_to(format!("ratio {ratio:.4}"))
        );
    }
    if !summary.skipped.is_empty() {
        println!();
        println!("  {}", s.header.apply_to("Skipped"));
        for (path, reason) in &summary.skipped {
            println!(
                "    {}  {}",
                s.path.apply_to(path.display()),
                s.disabled.apply_to(reason)
            );
        }
    }
    println!();
    println!(
        "  {} corrected, {} skipped ({} usable control pairs, {} px box)",
        s.good.apply_to(summary.corrected.len()),
        s.disabled.apply_to(summary.skipped.len()),
        s.value.apply_to(output.usable_pairs),
        output.box_width
    );
    println!();
}
