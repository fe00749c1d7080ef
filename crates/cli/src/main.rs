//! CLI tool for assembling a slide deck from templates and content.

use anyhow::{Context, Result};
use clap::Parser;
use deck_assembly::{
    Assembler, AssemblyConfig, ConversionService, LexicalMatchProvider, LogFormatter, MatchProvider, Selection,
    SourceDeck, StructureStep,
};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Assemble a deck: match each structure keyword to template and content
/// slides, then copy and fill them into a new deck.
#[derive(Parser, Debug)]
#[command(name = "deck-assemble")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Template deck(s) (.pptx). The first one provides the destination theme
    #[arg(short, long = "template")]
    templates: Vec<PathBuf>,

    /// Content deck (.pptx, or .pdf with a converter)
    #[arg(short, long)]
    content: PathBuf,

    /// Structure file: JSON array of {"keyword", "action"}
    #[arg(short, long)]
    structure: PathBuf,

    /// Output deck (default: <content>.assembled.pptx next to the content)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Override a candidate, as STEP:layout=INDEX or STEP:content=INDEX
    #[arg(long = "select")]
    selections: Vec<Selection>,

    /// Write the step log as JSON to this file
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Print the plan as JSON and stop before executing it
    #[arg(long)]
    dry_run: bool,

    /// Assembly config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Media type of the content deck, when it cannot be sniffed
    #[arg(long)]
    content_type: Option<String>,

    /// Match provider endpoint (default: built-in word overlap matcher)
    #[cfg(feature = "http")]
    #[arg(long)]
    provider: Option<String>,

    /// Conversion service base URL, for non-PPTX content
    #[cfg(feature = "http")]
    #[arg(long)]
    converter: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let config = match &args.config {
        Some(path) => AssemblyConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AssemblyConfig::default(),
    };

    let structure_json = std::fs::read_to_string(&args.structure)
        .with_context(|| format!("Failed to read {}", args.structure.display()))?;
    let structure = StructureStep::parse_list(&structure_json)
        .with_context(|| format!("Invalid structure file {}", args.structure.display()))?;

    let mut templates = Vec::new();
    for path in &args.templates {
        let bytes = read_input(path)?;
        let deck = SourceDeck::from_bytes(display_name(path), &bytes)
            .with_context(|| format!("Failed to load template {}", path.display()))?;
        if args.verbose {
            eprintln!("Template {}: {} slides", path.display(), deck.len());
        }
        templates.push(Arc::new(deck));
    }

    let converter = converter(&args);
    let content_bytes = read_input(&args.content)?;
    let content = SourceDeck::load(
        display_name(&args.content),
        &content_bytes,
        args.content_type.as_deref(),
        converter.as_deref(),
    )
    .await
    .with_context(|| format!("Failed to load content {}", args.content.display()))?;
    if args.verbose {
        eprintln!("Content {}: {} slides", args.content.display(), content.len());
    }

    let assembler = Assembler::new(provider(&args)).with_config(config);
    let mut plan = assembler
        .generate_plan(&structure, templates, Arc::new(content))
        .await
        .context("Failed to generate plan")?;

    for selection in &args.selections {
        plan.apply(selection)
            .with_context(|| format!("Cannot apply --select {}", selection))?;
    }

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    plan.review()?;
    let assembly = assembler.execute(&mut plan, None).context("Failed to assemble deck")?;

    let output_path = get_output_path(&args.content, args.output.as_ref())?;
    write_output(&output_path, &assembly.bytes)?;
    eprint!("{}", LogFormatter::new().format_with_newline(&assembly.log));
    eprintln!(
        "Wrote {} slides to {}",
        assembly.log.executed_count(),
        output_path.display()
    );

    if let Some(log_path) = &args.log {
        write_output(log_path, assembly.log.to_json()?.as_bytes())?;
    }

    Ok(())
}

#[cfg(feature = "http")]
fn provider(args: &Args) -> Arc<dyn MatchProvider> {
    match &args.provider {
        Some(url) => Arc::new(deck_assembly::HttpMatchProvider::new(url.clone())),
        None => Arc::new(LexicalMatchProvider::new()),
    }
}

#[cfg(not(feature = "http"))]
fn provider(_args: &Args) -> Arc<dyn MatchProvider> {
    Arc::new(LexicalMatchProvider::new())
}

#[cfg(feature = "http")]
fn converter(args: &Args) -> Option<Box<dyn ConversionService>> {
    args.converter
        .as_ref()
        .map(|url| Box::new(deck_assembly::HttpConversionService::new(url.clone())) as Box<dyn ConversionService>)
}

#[cfg(not(feature = "http"))]
fn converter(_args: &Args) -> Option<Box<dyn ConversionService>> {
    None
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to open {}", path.display()))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Determine the output path for the assembled deck.
fn get_output_path(content_path: &Path, output: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(path) = output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
        }
        return Ok(path.clone());
    }

    let stem = content_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let output_filename = format!("{}.assembled.pptx", stem);

    Ok(match content_path.parent() {
        Some(parent) => parent.join(output_filename),
        None => PathBuf::from(output_filename),
    })
}

/// Write output to a file.
fn write_output(path: &Path, content: &[u8]) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content)
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        let path = get_output_path(Path::new("decks/content.pdf"), None).unwrap();
        assert_eq!(path, PathBuf::from("decks/content.assembled.pptx"));
    }

    #[test]
    fn test_args_parse_selections() {
        let args = Args::try_parse_from([
            "deck-assemble",
            "-t",
            "a.pptx",
            "--template",
            "b.pptx",
            "-c",
            "content.pptx",
            "-s",
            "structure.json",
            "--select",
            "1:layout=2",
            "--select",
            "Timeline:content=0",
        ])
        .unwrap();
        assert_eq!(args.templates.len(), 2);
        assert_eq!(args.selections.len(), 2);
        assert_eq!(args.selections[1].to_string(), "Timeline:content=0");
    }

    #[test]
    fn test_bad_selection_is_rejected() {
        let result = Args::try_parse_from([
            "deck-assemble",
            "-c",
            "content.pptx",
            "-s",
            "structure.json",
            "--select",
            "1:theme=2",
        ]);
        assert!(result.is_err());
    }
}
