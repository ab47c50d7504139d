//! Sitix entrypoint: parses CLI args (spec §6), wires the filesystem
//! stores into a [`sitix_watch::Driver`], runs an initial full build, and
//! optionally hands off to watch mode. Ground truth for the startup
//! shape (logging setup, panic hook): `ox-bin`'s `AppStartup`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Once;

use clap::Parser;
use sitix_store::{FsOutputStore, FsSourceStore, OutputStore};
use sitix_watch::{Driver, FsChangeStream};
use tracing_appender::non_blocking::WorkerGuard;

/// `sitix SOURCE_DIR [-o OUTPUT_DIR] [-c NAME [VALUE]]... [-w]` (spec §6).
#[derive(Parser, Debug)]
#[command(name = "sitix", version, about = "A static site generator")]
struct Args {
    /// Directory tree to render.
    source_dir: PathBuf,

    /// Directory to write rendered output into.
    #[arg(short = 'o', long = "output", default_value = "output")]
    output_dir: PathBuf,

    /// Register a root-level config object: `-c NAME` (empty) or
    /// `-c NAME VALUE`. Repeatable; each occurrence groups its own 1-2
    /// tokens, so `-c a -c b v` and `-c a v -c b` both parse unambiguously.
    #[arg(short = 'c', num_args = 1..=2, value_names = ["NAME", "VALUE"], action = clap::ArgAction::Append)]
    config: Vec<Vec<String>>,

    /// Keep running and re-render on filesystem changes.
    #[arg(short = 'w', long = "watch")]
    watch: bool,
}

struct Logging {
    _guard: Option<WorkerGuard>,
}

impl Logging {
    fn init() -> Self {
        let file_appender = tracing_appender::rolling::never(".", "sitix.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        let result = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .try_init();
        Self {
            _guard: match result {
                Ok(()) => Some(guard),
                Err(_) => None,
            },
        }
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn main() -> ExitCode {
    let args = Args::parse();
    let _logging = Logging::init();
    install_panic_hook();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(target: "runtime", %err, "sitix failed");
            eprintln!("sitix: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    if !args.source_dir.is_dir() {
        anyhow::bail!("source directory {:?} does not exist", args.source_dir);
    }

    let source = FsSourceStore::new(&args.source_dir);
    let mut output = FsOutputStore::new(&args.output_dir);

    let initialised = output.empty_with_confirmation(|| {
        print!(
            "output directory {:?} is not managed by sitix; empty it anyway? [y/N] ",
            args.output_dir
        );
        use std::io::Write as _;
        let _ = std::io::stdout().flush();
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer).is_ok() && answer.trim().eq_ignore_ascii_case("y")
    })?;
    if !initialised {
        anyhow::bail!("refusing to write into an unmanaged, non-empty output directory");
    }

    let mut driver = Driver::new(Box::new(source), Box::new(output));
    for entry in &args.config {
        let name = entry.first().ok_or_else(|| anyhow::anyhow!("-c requires at least a NAME"))?;
        driver.add_config(name, entry.get(1).map(String::as_str));
    }

    tracing::info!(target: "runtime", source = ?args.source_dir, output = ?args.output_dir, "building");
    driver.build_all();

    if args.watch {
        tracing::info!(target: "runtime", source = ?args.source_dir, "watching for changes");
        let stream = FsChangeStream::new(&args.source_dir)?;
        driver.watch(stream);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse_positional_and_flags() {
        let args = Args::parse_from([
            "sitix",
            "site",
            "-o",
            "build",
            "-c",
            "sitename",
            "Example",
            "-w",
        ]);
        assert_eq!(args.source_dir, PathBuf::from("site"));
        assert_eq!(args.output_dir, PathBuf::from("build"));
        assert!(args.watch);
        assert_eq!(args.config, vec![vec!["sitename".to_string(), "Example".to_string()]]);
    }

    #[test]
    fn output_defaults_to_output_dir() {
        let args = Args::parse_from(["sitix", "site"]);
        assert_eq!(args.output_dir, PathBuf::from("output"));
        assert!(!args.watch);
    }
}
