//! Xof CLI - Command-line tool for inspecting DirectX `.x` files.
//!
//! This is the main entry point for the xof command-line application.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use xof::prelude::*;
use xof::xfile::Severity;

/// Xof - DirectX .x file tool
#[derive(Parser)]
#[command(name = "xof")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Do not preload the standard DirectX templates
    #[arg(long, global = true, env = "XOF_NO_STANDARD")]
    no_standard: bool,

    /// Drop records that fail to repack instead of stopping
    #[arg(long, global = true)]
    skip_bad_records: bool,

    /// Treat data left over at the end of a record as an error
    #[arg(long, global = true)]
    strict: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a file and report what it contains
    Check {
        /// Input .x file
        input: PathBuf,
    },

    /// Read a file and write it back out
    Roundtrip {
        /// Input .x file
        input: PathBuf,

        /// Output .x file
        output: PathBuf,

        /// Spaces per indentation level
        #[arg(long, default_value_t = 2)]
        indent: usize,
    },

    /// Print the record tree
    Dump {
        /// Input .x file
        input: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List templates (the standard library when no file is given)
    Templates {
        /// Input .x file
        input: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let library = if cli.no_standard {
        StandardLibrary::empty()
    } else {
        StandardLibrary::load().context("Failed to load standard templates")?
    };
    let options = ReadOptions::default()
        .skip_bad_records(cli.skip_bad_records)
        .strict_trailing_data(cli.strict);

    match cli.command {
        Commands::Check { input } => cmd_check(&input, &library, &options)?,
        Commands::Roundtrip { input, output, indent } => {
            cmd_roundtrip(&input, &output, indent, &library, &options)?
        }
        Commands::Dump { input, json } => cmd_dump(&input, json, &library, &options)?,
        Commands::Templates { input } => cmd_templates(input.as_deref(), &library, &options)?,
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_file(input: &Path, library: &StandardLibrary, options: &ReadOptions) -> Result<XFile> {
    let data = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    XFile::read_with(&data, library, options)
        .with_context(|| format!("Failed to parse {}", input.display()))
}

fn cmd_check(input: &Path, library: &StandardLibrary, options: &ReadOptions) -> Result<()> {
    let start = Instant::now();
    let file = read_file(input, library, options)?;
    let header = file.header();

    println!(
        "{}: version {}.{}, {} body, {}-bit floats",
        input.display(),
        header.major,
        header.minor,
        header.format,
        header.float_size.bits()
    );

    let declared = file.templates().iter().filter(|t| !t.is_standard()).count();
    println!(
        "Loaded in {:?}: {} templates ({} declared), {} records",
        start.elapsed(),
        file.templates().len(),
        declared,
        file.records().count()
    );

    let mut errors = 0;
    for diagnostic in file.diagnostics() {
        if diagnostic.severity == Severity::Error {
            errors += 1;
        }
        println!("  {}", diagnostic);
    }
    if errors > 0 {
        anyhow::bail!("{} records were skipped", errors);
    }

    Ok(())
}

fn cmd_roundtrip(
    input: &Path,
    output: &Path,
    indent: usize,
    library: &StandardLibrary,
    options: &ReadOptions,
) -> Result<()> {
    println!("Round trip: {} -> {}", input.display(), output.display());

    let file = read_file(input, library, options)?;
    let data = file.write_with(&WriteOptions { indent });
    fs::write(output, &data).context("Failed to write output file")?;

    println!("Wrote {} bytes", data.len());

    Ok(())
}

fn cmd_dump(input: &Path, as_json: bool, library: &StandardLibrary, options: &ReadOptions) -> Result<()> {
    let file = read_file(input, library, options)?;

    if as_json {
        let nodes: Vec<_> = file
            .root_children()
            .iter()
            .filter_map(|node| node_json(&file, node))
            .collect();
        let doc = json!({
            "header": file.header(),
            "nodes": nodes,
            "diagnostics": file.diagnostics(),
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        for node in file.root_children().iter() {
            print_node(&file, node, 0);
        }
    }

    Ok(())
}

fn node_json(file: &XFile, node: NodeRef) -> Option<serde_json::Value> {
    match node {
        NodeRef::Template(id) => {
            let template = file.template(id)?;
            Some(json!({
                "kind": "template",
                "name": template.name(),
                "guid": template.guid(),
                "open": template.is_open(),
                "fields": template.fields(),
            }))
        }
        NodeRef::Record(id) => {
            let record = file.record(id)?;
            let children: Vec<_> = record
                .children()
                .iter()
                .filter_map(|child| node_json(file, child))
                .collect();
            Some(json!({
                "kind": "record",
                "template": file.template(record.template()).map(|t| t.name()),
                "name": record.name(),
                "guid": record.guid(),
                "fields": record.fields(),
                "children": children,
            }))
        }
        NodeRef::Reference(id) => {
            let target = file.record(id)?;
            Some(json!({
                "kind": "reference",
                "name": target.name(),
                "guid": target.guid(),
            }))
        }
    }
}

fn print_node(file: &XFile, node: NodeRef, depth: usize) {
    let pad = "  ".repeat(depth);
    match node {
        NodeRef::Template(id) => {
            if let Some(template) = file.template(id) {
                println!("{}template {} <{}>", pad, template.name(), template.guid());
            }
        }
        NodeRef::Record(id) => {
            let Some(record) = file.record(id) else {
                return;
            };
            let template = file.template(record.template()).map(|t| t.name()).unwrap_or("?");
            println!("{}{} {}", pad, template, record.name().unwrap_or("(unnamed)"));

            if let Some(t) = file.template(record.template()) {
                for (def, value) in t.fields().iter().zip(record.fields()) {
                    let text = value.to_string();
                    let chars = text.chars().count();
                    let text = if chars > 96 {
                        let short: String = text.chars().take(96).collect();
                        format!("{}... ({} chars)", short, chars)
                    } else {
                        text
                    };
                    println!("{}  .{} = {}", pad, def.name().unwrap_or("_"), text);
                }
            }
            for child in record.children().iter() {
                print_node(file, child, depth + 1);
            }
        }
        NodeRef::Reference(id) => {
            if let Some(target) = file.record(id) {
                println!("{}-> {}", pad, target.name().unwrap_or("?"));
            }
        }
    }
}

fn cmd_templates(input: Option<&Path>, library: &StandardLibrary, options: &ReadOptions) -> Result<()> {
    let file = match input {
        Some(input) => read_file(input, library, options)?,
        None => XFile::new(library),
    };

    for template in file.templates() {
        let mut flags = String::new();
        if template.is_standard() {
            flags.push_str(" [standard]");
        }
        if template.is_open() {
            flags.push_str(" [open]");
        }
        println!(
            "{:<24} <{}> {} fields{}",
            template.name(),
            template.guid(),
            template.fields().len(),
            flags
        );
    }

    println!("\nTotal: {} templates", file.templates().len());

    Ok(())
}
