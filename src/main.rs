use std::io::Read as _;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use pagefuse::{AssetSet, BundleError, BundleOptions, bundle};

/// Bundle an HTML page and its external assets into one self-contained file.
#[derive(Parser, Debug)]
#[command(name = "pagefuse", version, about)]
struct Args {
    /// Prefix for resolving references; a directory or a remote URL.
    #[arg(long, default_value = "")]
    root: String,

    /// Comma-separated asset classes to inline from the local filesystem
    /// (css, js, img, font). An empty value disables local inlining.
    #[arg(long, default_value = "css,js,img")]
    local: String,

    /// Comma-separated asset classes to inline from the network
    /// (css, js, img, font). An empty value disables remote inlining.
    #[arg(long, default_value = "css,js,img")]
    remote: String,

    /// Comma-separated content types to minify (css, js, html). An empty
    /// value disables minification.
    #[arg(long, default_value = "css,js,html")]
    minify: String,

    /// Abort on the first asset that cannot be fetched or parsed instead of
    /// warning and leaving its reference alone.
    #[arg(long)]
    strict: bool,

    /// Suppress warnings about skipped assets.
    #[arg(long)]
    quiet: bool,

    /// Write the result back to FILE instead of printing it to stdout.
    #[arg(short, long)]
    write: bool,

    /// Input document; reads stdin when absent or "-".
    file: Option<String>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("pagefuse: error: {err:#}");
            if err.downcast_ref::<BundleError>()
                .is_some_and(|e| matches!(e, BundleError::Config(_)))
            {
                eprintln!("pagefuse: run with --help for usage");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let options = BundleOptions {
        root: args.root,
        strict: args.strict,
        quiet: args.quiet,
        local: AssetSet::parse_include(&args.local, "local")?,
        remote: AssetSet::parse_include(&args.remote, "remote")?,
        minify: AssetSet::parse_minify(&args.minify)?,
    };

    let file = args.file.as_deref().filter(|f| *f != "-");
    if args.write && file.is_none() {
        return Err(BundleError::Config("--write requires a file argument".into()).into());
    }

    let html = match file {
        Some(path) => std::fs::read(path).with_context(|| format!("could not read {path}"))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("could not read stdin")?;
            buf
        }
    };

    let out = bundle(&html, options)?;

    match file {
        Some(path) if args.write => {
            std::fs::write(path, out).with_context(|| format!("could not write {path}"))?;
        }
        _ => print!("{out}"),
    }
    Ok(())
}
