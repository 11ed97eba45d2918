use std::fmt::Write;
use std::io::{self, IsTerminal};

use console::Style;
use quakestack_domain::{LogicalId, ResourceKind, RoutingMode, Stack, SynthReport};

mod error;
mod options;

pub use error::ReportError;
pub use options::{ColorChoice, OutputFormat, RenderOptions};

/// Render a synthesized stack in the requested output format.
///
/// Secret environment values are rendered as `[REDACTED]` in both formats.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_synth(
    report: &SynthReport,
    format: OutputFormat,
    options: &RenderOptions,
) -> std::result::Result<String, ReportError> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report)
            .map_err(|source| ReportError::JsonSerialize { source }),
        OutputFormat::Text => Ok(render_synth_text(report, options)),
    }
}

// ---------------------------------------------------------------------------
// Synth text
// ---------------------------------------------------------------------------

fn render_synth_text(report: &SynthReport, options: &RenderOptions) -> String {
    let mut output = String::new();
    let style = TextStyle::new(options.color);
    let stack = &report.stack;

    append_header(&mut output, "synth", &stack.name, &style);
    let _ = writeln!(
        output,
        "  {}",
        style.dim(&format!(
            "account {} · region {}",
            stack.environment.account, stack.environment.region
        ))
    );

    let _ = writeln!(output);
    for id in &report.creation_order {
        append_resource_line(&mut output, stack, id, options, &style);
    }

    if let Some(path) = &report.template_path {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "  {} {}",
            style.dim("template"),
            style.primary_text(&path.display().to_string())
        );
    }

    if options.verbose {
        let short = &report.template_digest[..report.template_digest.len().min(12)];
        let _ = writeln!(
            output,
            "  {}",
            style.dim(&format!("digest:   sha256:{short}"))
        );
        let teardown = report
            .teardown_order()
            .iter()
            .map(LogicalId::to_string)
            .collect::<Vec<_>>()
            .join(" -> ");
        let _ = writeln!(output, "  {}", style.dim(&format!("teardown: {teardown}")));
    }

    let _ = writeln!(output);
    let tally = SynthTally::from_report(report);
    let _ = writeln!(output, "{}", tally.format(&style));

    output
}

// ---------------------------------------------------------------------------
// Line renderers
// ---------------------------------------------------------------------------

fn append_header(output: &mut String, command: &str, target: &str, style: &TextStyle) {
    let _ = writeln!(
        output,
        "{} {}",
        style.header_command(command),
        style.header_target(target)
    );
}

fn append_resource_line(
    output: &mut String,
    stack: &Stack,
    id: &LogicalId,
    options: &RenderOptions,
    style: &TextStyle,
) {
    let graph = &stack.graph;
    match graph.kind_of(id) {
        Some(ResourceKind::Layer) => {
            let label = TextStyle::pad_label(&style.reference_label("layer"));
            let _ = writeln!(
                output,
                "  {} {label}{} {}",
                style.reference_symbol("="),
                style.primary_text(graph.layer.layer.name.as_str()),
                style.dim(&format!("v{}", graph.layer.layer.version))
            );
            if options.verbose {
                let _ = writeln!(output, "    {}", style.dim(&graph.layer.layer.arn()));
            }
        }
        Some(ResourceKind::Function) => {
            let function = &graph.function;
            let label = TextStyle::pad_label(&style.add_label("function"));
            let _ = writeln!(
                output,
                "  {} {label}{}",
                style.add_symbol("+"),
                style.primary_text(&function.function_name)
            );
            if options.verbose {
                let _ = writeln!(
                    output,
                    "    {}",
                    style.dim(&format!(
                        "{} · {}s timeout · {} from {}",
                        function.architecture,
                        function.timeout_seconds,
                        function.artifact.binary_name,
                        function.artifact.manifest_path.display()
                    ))
                );
                for (key, value) in &function.environment {
                    let _ = writeln!(output, "    {}", style.dim(&format!("{key}={value}")));
                }
            }
        }
        Some(ResourceKind::RestApi) => {
            let api = &graph.api;
            let label = TextStyle::pad_label(&style.add_label("rest api"));
            let routing = match api.routing {
                RoutingMode::Proxy => "proxy",
            };
            let _ = writeln!(
                output,
                "  {} {label}{} {}",
                style.add_symbol("+"),
                style.primary_text(&api.rest_api_name),
                style.dim(&format!("({routing} -> {})", api.handler))
            );
        }
        None => {
            let _ = writeln!(
                output,
                "  {} {}",
                style.error_prefix("error:"),
                style.error_detail(&format!("unknown resource {id}"))
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tally
// ---------------------------------------------------------------------------

struct SynthTally {
    created: usize,
    referenced: usize,
}

impl SynthTally {
    fn from_report(report: &SynthReport) -> Self {
        let mut tally = Self {
            created: 0,
            referenced: 0,
        };
        for id in &report.creation_order {
            match report.stack.graph.kind_of(id) {
                Some(ResourceKind::Layer) => tally.referenced += 1,
                Some(ResourceKind::Function | ResourceKind::RestApi) => tally.created += 1,
                None => {}
            }
        }
        tally
    }

    fn format(&self, style: &TextStyle) -> String {
        let mut parts = Vec::new();
        if self.created > 0 {
            parts.push(style.add_label(&format!("{} to create", self.created)));
        }
        if self.referenced > 0 {
            parts.push(style.dim(&format!("{} referenced", self.referenced)));
        }
        if parts.is_empty() {
            format!("{} nothing to do", style.tally_label("Synth:"))
        } else {
            format!("{} {}", style.tally_label("Synth:"), parts.join(", "))
        }
    }
}

// ---------------------------------------------------------------------------
// Styling
// ---------------------------------------------------------------------------

const LABEL_WIDTH: usize = 10;

struct TextStyle {
    color_enabled: bool,
    add_sym_style: Style,
    reference_sym_style: Style,
    add_label_style: Style,
    reference_label_style: Style,
    primary_style: Style,
    dim_style: Style,
    error_detail_style: Style,
    header_cmd_style: Style,
    header_target_style: Style,
    error_prefix_style: Style,
    tally_label_style: Style,
}

impl TextStyle {
    fn new(choice: ColorChoice) -> Self {
        let enabled = should_color(choice);
        Self {
            color_enabled: enabled,
            add_sym_style: Style::new().green().bold(),
            reference_sym_style: Style::new().dim(),
            add_label_style: Style::new().green(),
            reference_label_style: Style::new().dim(),
            primary_style: Style::new().white(),
            dim_style: Style::new().dim(),
            error_detail_style: Style::new().red(),
            header_cmd_style: Style::new().white().bold(),
            header_target_style: Style::new().dim(),
            error_prefix_style: Style::new().red().bold(),
            tally_label_style: Style::new().white().bold(),
        }
    }

    fn paint<T: std::fmt::Display>(&self, style: &Style, text: T) -> String {
        if self.color_enabled {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn pad_label(painted: &str) -> String {
        // Compute visible length (strip ANSI codes)
        let visible_len = console::measure_text_width(painted);
        if visible_len < LABEL_WIDTH {
            format!("{painted}{}", " ".repeat(LABEL_WIDTH - visible_len))
        } else {
            format!("{painted} ")
        }
    }

    // Symbols
    fn add_symbol(&self, s: &str) -> String {
        self.paint(&self.add_sym_style, s)
    }
    fn reference_symbol(&self, s: &str) -> String {
        self.paint(&self.reference_sym_style, s)
    }

    // Labels
    fn add_label(&self, s: &str) -> String {
        self.paint(&self.add_label_style, s)
    }
    fn reference_label(&self, s: &str) -> String {
        self.paint(&self.reference_label_style, s)
    }

    // Content
    fn primary_text(&self, s: &str) -> String {
        self.paint(&self.primary_style, s)
    }
    fn dim(&self, s: &str) -> String {
        self.paint(&self.dim_style, s)
    }
    fn error_detail(&self, s: &str) -> String {
        self.paint(&self.error_detail_style, s)
    }

    // Header
    fn header_command(&self, s: &str) -> String {
        self.paint(&self.header_cmd_style, s)
    }
    fn header_target(&self, s: &str) -> String {
        self.paint(&self.header_target_style, s)
    }

    // Prefixes
    fn error_prefix(&self, s: &str) -> String {
        self.paint(&self.error_prefix_style, s)
    }

    // Tally
    fn tally_label(&self, s: &str) -> String {
        self.paint(&self.tally_label_style, s)
    }
}

fn should_color(choice: ColorChoice) -> bool {
    match choice {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => io::stdout().is_terminal(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests;
