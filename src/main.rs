use std::{fs, path::PathBuf};

use clap::Parser;
use miette::Result;
use protoscope::{convention::ResourceNameResolver, Analyzer, Error};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
pub struct Args {
    /// Encoded file descriptor set(s) containing the files to check.
    #[clap(value_name = "DESCRIPTOR_SETS", required = true, value_parser)]
    files: Vec<PathBuf>,
    /// Suppress diagnostics with the given rule identifier.
    #[clap(long = "disable", value_name = "RULE")]
    disabled_rules: Vec<String>,
    /// Resolve resource type names in `google.api.resource_reference` options.
    #[clap(long)]
    aip: bool,
    /// Skip the check for proto3 fields with conflicting JSON names.
    #[clap(long)]
    no_json_names: bool,
    /// Report warnings as errors.
    #[clap(long)]
    warnings_as_errors: bool,
}

pub fn main() -> Result<()> {
    miette::set_panic_hook();

    let args = Args::parse();
    let mut analyzer = Analyzer::new();
    analyzer
        .check_json_names(!args.no_json_names)
        .warnings_as_errors(args.warnings_as_errors);
    for rule in args.disabled_rules {
        analyzer.disable_rule(rule);
    }
    if args.aip {
        analyzer.register_resolver(ResourceNameResolver::new());
    }

    for path in &args.files {
        let bytes = fs::read(path).map_err(|err| Error::open_file(path, err))?;
        analyzer.add_file_descriptor_set(bytes.as_slice())?;
    }

    let validation = analyzer.validate_all(&CancellationToken::new());
    for (id, diagnostics) in validation.files.iter() {
        let name = analyzer.file(*id).map_or("", |file| file.name());
        for diagnostic in diagnostics {
            eprintln!("{}: {:?}", name, miette::Report::new(diagnostic.clone()));
        }
    }

    if validation.has_errors() {
        return Err(miette::miette!("validation failed"));
    }
    Ok(())
}
