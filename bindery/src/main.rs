use std::path::PathBuf;
use std::time::Instant;

use quire::value::Dict;
use tracing_subscriber::EnvFilter;

mod flags {
    use std::path::PathBuf;

    xflags::xflags! {
        /// Builds the static site in a directory.
        cmd bindery {
            /// The site's base directory. Defaults to the current directory.
            optional input: PathBuf
            /// Where to write the site. Defaults to `<input>/output`.
            optional -o, --output output: PathBuf
            /// Overrides a configuration value, parsed as YAML.
            repeated -D, --define define: String
            /// Prints where each error in a chain was raised.
            optional -d, --debug
            /// Logs progress at the `info` level.
            optional -v, --verbose
        }
    }
}

fn overrides(defines: &[String]) -> quire::Result<Dict> {
    let mut dict = Dict::new();
    for define in defines {
        let (key, value) = quire::config::parse_define(define)?;
        dict.insert(key, value);
    }

    Ok(dict)
}

fn main() {
    let flags = flags::Bindery::from_env_or_exit();

    let filter = match flags.verbose {
        true => EnvFilter::new("info"),
        false => EnvFilter::from_default_env(),
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let start = Instant::now();
    let input = flags.input.unwrap_or_else(|| PathBuf::from("."));
    let result = overrides(&flags.define)
        .and_then(|overrides| quire::build(&input, flags.output, overrides));

    match result {
        Ok(report) => {
            tracing::info!(files = report.total(), elapsed_ms = start.elapsed().as_millis() as u64, "build finished");
        }
        Err(e) if flags.debug => {
            eprintln!("error: {}", e.verbose());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
