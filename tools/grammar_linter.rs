/// Grammar Linter — validates grammar files and reports quality warnings.
///
/// Usage: grammar_linter <path>... [--strict]
///
/// Each path is a `.ron` grammar file or a directory searched recursively.
/// Construction errors (cycles, unknown categories, malformed tokens, empty
/// rules) are errors; unreachable rules, capitalized literals, and unused
/// categories are warnings.

use clap::Parser;
use sentence_engine::core::grammar::Grammar;
use sentence_engine::schema::category::Category;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser, Debug)]
#[command(name = "grammar_linter", about = "Validate sentence grammar files")]
struct Args {
    /// Grammar files or directories
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Treat warnings as errors
    #[arg(long)]
    strict: bool,
}

fn main() {
    let args = Args::parse();

    let mut files = Vec::new();
    for path in &args.paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            collect_ron_files(path, &mut files);
        } else {
            eprintln!("ERROR: Path '{}' does not exist", path.display());
            process::exit(1);
        }
    }
    files.sort();

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for file in &files {
        match Grammar::load_from_ron(file) {
            Ok(grammar) => {
                println!(
                    "  Loaded: {} ({} rules, start '{}')",
                    file.display(),
                    grammar.len(),
                    grammar.start()
                );
                warnings.extend(
                    lint_grammar(&grammar)
                        .into_iter()
                        .map(|w| format!("{}: {}", file.display(), w)),
                );
            }
            Err(e) => errors.push(format!("{}: {}", file.display(), e)),
        }
    }

    println!("\n=== Grammar Lint Report ===\n");

    if files.is_empty() {
        warnings.push("No .ron grammar files found".to_string());
    }

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} files, {} errors, {} warnings",
        files.len(),
        errors.len(),
        warnings.len()
    );

    let failed = !errors.is_empty() || (args.strict && !warnings.is_empty());
    process::exit(if failed { 1 } else { 0 });
}

fn collect_ron_files(dir: &Path, files: &mut Vec<PathBuf>) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                collect_ron_files(&path, files);
            } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                files.push(path);
            }
        }
    }
}

fn lint_grammar(grammar: &Grammar) -> Vec<String> {
    let mut warnings = Vec::new();

    for name in grammar.unreachable_rules() {
        warnings.push(format!(
            "Rule '{}' is not reachable from start symbol '{}'",
            name,
            grammar.start()
        ));
    }

    for (rule, literal) in grammar.suspicious_literals() {
        warnings.push(format!(
            "Rule '{}' emits literal '{}' (missing rule or typo?)",
            rule, literal
        ));
    }

    let used = grammar.categories();
    for category in Category::ALL {
        if !used.contains(&category) {
            warnings.push(format!("Category '{}' is never referenced", category));
        }
    }

    warnings
}
