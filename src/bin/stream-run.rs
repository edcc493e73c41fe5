//! CLI tool to run a line-stream pipeline over a text file.
//!
//! Builds a transformer from the selected flags (filter, then map, then
//! skip/take, in that order) and pull-wires it over the input lines.

use clap::Parser;
use copipe::Transformer;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process;

/// Run a line pipeline against a text file.
#[derive(Parser)]
#[command(name = "stream-run")]
struct Cli {
    /// Input file, or `-` for stdin
    input: String,

    /// Keep only lines containing this substring
    #[arg(long)]
    contains: Option<String>,

    /// Uppercase every line
    #[arg(long)]
    upper: bool,

    /// Suppress the first N lines
    #[arg(long, value_name = "N")]
    skip: Option<usize>,

    /// Stop after N lines, without reading further input
    #[arg(long, value_name = "N")]
    take: Option<usize>,

    /// Sort the surviving lines
    #[arg(long)]
    sort: bool,

    /// Print the number of surviving lines instead of the lines
    #[arg(long)]
    count: bool,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Show the composed pipeline and line counts on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn read_input(path: &str) -> io::Result<String> {
    if path == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        fs::read_to_string(path)
    }
}

fn build_stage(cli: &Cli) -> Transformer<String, String> {
    let mut stage = Transformer::<String, String>::identity();
    if let Some(needle) = cli.contains.clone() {
        stage = stage.filter(move |line: &String| line.contains(&needle));
    }
    if cli.upper {
        stage = stage.map(|line: String| line.to_uppercase());
    }
    if let Some(n) = cli.skip {
        stage = stage.skip(n);
    }
    if let Some(n) = cli.take {
        stage = stage.take(n);
    }
    stage
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let input_text = match read_input(&cli.input) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading input '{}': {e}", cli.input);
            process::exit(1);
        }
    };
    let lines = input_text.lines().map(|line| line.to_string());

    let stage = build_stage(&cli);
    if cli.verbose {
        eprintln!("Input:    {}", cli.input);
        eprintln!("Pipeline: {}", stage.name());
        eprintln!("Output:   {}", cli.output.as_deref().unwrap_or("(stdout)"));
    }

    let in_count = input_text.lines().count();
    let (out_count, output) = if cli.count {
        let mut counter = stage.count();
        if let Err(e) = counter.feed_all(lines) {
            eprintln!("Pipeline error: {e}");
            process::exit(1);
        }
        let n = counter.into_result().unwrap_or(0);
        (n, format!("{n}\n"))
    } else if cli.sort {
        let mut sorter = stage.sort();
        if let Err(e) = sorter.feed_all(lines) {
            eprintln!("Pipeline error: {e}");
            process::exit(1);
        }
        let sorted = sorter.into_result().unwrap_or_default();
        (sorted.len(), join_lines(&sorted))
    } else {
        let surviving: Vec<String> = stage.connect_to_source(lines).collect();
        (surviving.len(), join_lines(&surviving))
    };

    if let Some(out_path) = &cli.output {
        if let Some(parent) = Path::new(out_path.as_str()).parent()
            && !parent.as_os_str().is_empty()
            && fs::create_dir_all(parent).is_err()
        {
            eprintln!("Error creating output directory for '{out_path}'");
            process::exit(1);
        }
        if let Err(e) = fs::write(out_path, &output) {
            eprintln!("Error writing output file '{out_path}': {e}");
            process::exit(1);
        }
    } else if let Err(e) = io::stdout().write_all(output.as_bytes()) {
        eprintln!("Error writing output: {e}");
        process::exit(1);
    }

    if cli.verbose {
        eprintln!("Lines:    {in_count} in -> {out_count} out");
    }
}

fn join_lines(lines: &[String]) -> String {
    let mut joined = String::new();
    for line in lines {
        joined.push_str(line);
        joined.push('\n');
    }
    joined
}
