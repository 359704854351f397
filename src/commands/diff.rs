//! Handler for the `contextsmith diff` command.
//!
//! Resolves CLI/config inputs into [`BuildOptions`], runs the diff-context
//! pipeline, and writes the resulting bundle in the user's chosen format.

use std::path::PathBuf;

use colored::Colorize;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::diffctx::{self, BuildOptions, DiffContext};
use crate::error::Result;
use crate::output::{Format, FormatOptions};
use crate::utils::cli_format_to_output_format;

// ---------------------------------------------------------------------------
// Public interface
// ---------------------------------------------------------------------------

/// All inputs needed to run the diff command.
#[derive(Debug)]
pub struct DiffCommandOptions {
    /// Repository root directory.
    pub root: PathBuf,
    /// Revision range to diff; defaults to `HEAD`.
    pub range: Option<String>,
    /// Token budget for the selected fragment set.
    pub budget: Option<usize>,
    /// Restart probability for personalized PageRank.
    pub alpha: Option<f64>,
    /// Density-ratio stopping threshold for the selector.
    pub tau: Option<f64>,
    /// Omit fragment content from the rendered bundle.
    pub no_content: bool,
    /// Extra ignore-file to honor during universe expansion.
    pub ignore_file: Option<PathBuf>,
    /// Skip `.gitignore` during universe expansion.
    pub no_default_ignores: bool,
    /// Bundle every changed file in full, skipping graph-based selection.
    pub full: bool,
    /// Output format.
    pub format: OutputFormat,
    /// Write output to this file path.
    pub out: Option<PathBuf>,
    /// Write output to stdout.
    pub stdout: bool,
    /// Suppress non-essential output.
    pub quiet: bool,
    /// Path to config file.
    pub config_path: Option<PathBuf>,
}

/// Run the diff command end-to-end.
pub fn run(options: DiffCommandOptions) -> Result<()> {
    let config = load_config(&options)?;

    let build_options = BuildOptions {
        range: options.range.clone().unwrap_or_else(|| "HEAD".to_string()),
        budget_tokens: options.budget.or(Some(config.diffctx.default_budget)),
        alpha: options.alpha.unwrap_or(config.diffctx.alpha),
        tau: options.tau.unwrap_or(config.diffctx.tau),
        no_content: options.no_content,
        ignore_file: options.ignore_file.clone(),
        no_default_ignores: options.no_default_ignores,
        full: options.full,
        reserve_tokens_per_fragment: config.diffctx.reserve_tokens_per_fragment,
    };

    let context = diffctx::build_diff_context(&options.root, &build_options)?;

    let format = cli_format_to_output_format(&options.format);
    let formatted = render(&context, format)?;
    crate::output::write_output(
        &formatted,
        &FormatOptions {
            format,
            stdout: options.stdout,
            out: options.out.clone(),
        },
    )?;

    if !options.quiet && !options.stdout {
        print_summary(&context, build_options.budget_tokens);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Render a [`DiffContext`] in the requested format.
///
/// JSON uses serde directly on the schema; the other formats are rendered
/// by hand since `DiffContext`'s shape (fragments with `lines`/`symbol`/
/// `preview`) doesn't map onto [`crate::output::Bundle`]'s file-section
/// model.
fn render(context: &DiffContext, format: Format) -> Result<String> {
    match format {
        Format::Json => serde_json::to_string_pretty(context).map_err(|e| {
            crate::error::ContextSmithError::config_with_source(
                "failed to serialize diff context as JSON",
                e,
            )
        }),
        Format::Markdown => Ok(render_markdown(context)),
        Format::Plain => Ok(render_plain(context)),
        Format::Xml => Ok(render_xml(context)),
    }
}

fn render_markdown(context: &DiffContext) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", context.name));
    out.push_str(&format!("> {} fragment{}\n\n", context.fragment_count, if context.fragment_count == 1 { "" } else { "s" }));

    for fragment in &context.fragments {
        out.push_str(&format!("## `{}` (lines {})\n", fragment.path, fragment.lines));
        if let Some(symbol) = &fragment.symbol {
            out.push_str(&format!("*{} — {}*\n", fragment.kind, symbol));
        } else {
            out.push_str(&format!("*{}*\n", fragment.kind));
        }
        if fragment.content.is_empty() {
            out.push_str(&format!("{}\n\n", fragment.preview));
        } else {
            out.push_str(&format!("```\n{}", fragment.content));
            if !fragment.content.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n\n");
        }
    }

    out
}

fn render_plain(context: &DiffContext) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} ({} fragments)\n\n", context.name, context.fragment_count));
    for fragment in &context.fragments {
        out.push_str(&format!("--- {} ({}) ---\n", fragment.path, fragment.lines));
        let body = if fragment.content.is_empty() { &fragment.preview } else { &fragment.content };
        out.push_str(body);
        if !body.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

fn render_xml(context: &DiffContext) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<diff_context>\n");
    out.push_str(&format!("  <name>{}</name>\n", escape_xml(&context.name)));
    out.push_str(&format!("  <fragment_count>{}</fragment_count>\n", context.fragment_count));
    for fragment in &context.fragments {
        out.push_str("  <fragment>\n");
        out.push_str(&format!("    <path>{}</path>\n", escape_xml(&fragment.path)));
        out.push_str(&format!("    <lines>{}</lines>\n", fragment.lines));
        out.push_str(&format!("    <kind>{}</kind>\n", escape_xml(&fragment.kind)));
        if let Some(symbol) = &fragment.symbol {
            out.push_str(&format!("    <symbol>{}</symbol>\n", escape_xml(symbol)));
        }
        out.push_str("    <content><![CDATA[");
        out.push_str(&fragment.content);
        out.push_str("]]></content>\n");
        out.push_str(&format!("    <preview>{}</preview>\n", escape_xml(&fragment.preview)));
        out.push_str("  </fragment>\n");
    }
    out.push_str("</diff_context>\n");
    out
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Load config from explicit path or discovery.
fn load_config(options: &DiffCommandOptions) -> Result<Config> {
    let config_path = crate::config::find_config_file(options.config_path.as_deref());
    match config_path {
        Some(p) => Config::load(&p),
        None => Ok(Config::default()),
    }
}

/// Print a coloured summary of the bundle to stderr.
fn print_summary(context: &DiffContext, budget: Option<usize>) {
    let budget_info = match budget {
        Some(b) => format!(" (budget: {b})"),
        None => String::new(),
    };
    eprintln!(
        "{} {} fragment{} selected{}",
        "diff:".green().bold(),
        context.fragment_count,
        if context.fragment_count == 1 { "" } else { "s" },
        budget_info,
    );
}
