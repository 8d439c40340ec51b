//! CLI front end for the receiptpdf host operations.
//!
//! Runs one host method against one document and prints the JSON result on
//! stdout, or a JSON error object on stderr.

use receiptpdf::{host, ExtractorConfig};
use std::{env, process};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("receiptpdf");

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage(program);
        process::exit(0);
    }

    let (flags, positional): (Vec<&String>, Vec<&String>) =
        args.iter().skip(1).partition(|a| a.starts_with("--"));

    if positional.len() != 2 {
        print_usage(program);
        process::exit(1);
    }

    let config = match parse_flags(&flags) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{message}");
            process::exit(1);
        }
    };

    let method = method_name(positional[0]);
    match host::dispatch(method, positional[1], &config) {
        Ok(value) => println!("{value}"),
        Err(e) => {
            eprintln!("{}", e.to_json());
            process::exit(2);
        }
    }
}

/// Accept both `extractTextPages` and `extract-text-pages`.
fn method_name(arg: &str) -> &str {
    match arg {
        "extract-text-pages" => "extractTextPages",
        "page-count" => "pageCount",
        "file-hash" => "fileHash",
        "read-text-file" => "readTextFile",
        other => other,
    }
}

fn parse_flags(flags: &[&String]) -> Result<ExtractorConfig, String> {
    let mut config = ExtractorConfig::default();
    for flag in flags {
        match flag.as_str() {
            "--stream-order" => config.sort_by_position = false,
            "--pages-only" => config.prefer_embedded_payload = false,
            "--strict-json" => config.require_json_payload = true,
            other => match other.strip_prefix("--max-size=") {
                Some(value) => {
                    let limit = value
                        .parse()
                        .map_err(|_| format!("invalid --max-size value '{value}'"))?;
                    config.max_document_size = Some(limit);
                }
                None => return Err(format!("unknown option '{other}'")),
            },
        }
    }
    Ok(config)
}

fn print_usage(program_name: &str) {
    println!("receiptpdf - embedded receipt payload & PDF text extraction");
    println!();
    println!("USAGE:");
    println!("    {} [OPTIONS] <method> <pdf_file>", program_name);
    println!();
    println!("METHODS:");
    println!("    extract-text-pages   Embedded payload, or the text of every page");
    println!("    page-count           Number of pages");
    println!("    file-hash            SHA-256 of the file, lowercase hex");
    println!("    read-text-file       Whole file as UTF-8 text");
    println!();
    println!("OPTIONS:");
    println!("    --stream-order       Keep content-stream order instead of reading order");
    println!("    --pages-only         Ignore embedded attachments");
    println!("    --strict-json        Require attachments to parse as JSON");
    println!("    --max-size=<bytes>   Refuse larger documents");
    println!("    -h, --help           Show this help message");
    println!();
    println!("EXAMPLES:");
    println!("    {} extract-text-pages receipt.pdf", program_name);
    println!("    RUST_LOG=debug {} page-count scan.pdf", program_name);
}
