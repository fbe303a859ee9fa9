mod debug_report;

use soundshift::{InitialActive, ShiftConfig, ShiftError, SoundChanger};
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "SOUNDSHIFT_LOG";

fn main() {
    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };
    init_logging(args.verbose);

    if let Err(err) = run(&args) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(args: &CliArgs) -> Result<(), ShiftError> {
    let config = args.resolve()?;
    let changer = SoundChanger::from_config(&config)?;

    let corpus = match &config.corpus {
        Some(path) => std::fs::read_to_string(path).map_err(|source| ShiftError::Io { path: path.clone(), source })?,
        None => read_stdin().map_err(|source| ShiftError::Io { path: PathBuf::from("<stdin>"), source })?,
    };

    if args.trace {
        let (result, metrics) = changer.run_corpus_with_metrics(&corpus, config.parallel);
        debug_report::print_corpus(&changer, &result, &metrics, args.color);
    } else {
        let result = changer.run_corpus(&corpus, config.parallel);
        for word in &result.words {
            println!("{}", changer.format(&word.derivation));
        }
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("soundshift=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("soundshift=warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).with_target(false).init();
}

#[derive(Debug, Default)]
struct CliArgs {
    config: Option<PathBuf>,
    features: Option<PathBuf>,
    rules: Option<PathBuf>,
    categories: Option<PathBuf>,
    active: Option<PathBuf>,
    corpus: Option<PathBuf>,
    all_active: bool,
    parallel: bool,
    trace: bool,
    color: bool,
    verbose: bool,
}

impl CliArgs {
    /// The config file (if any) with command-line paths layered on top.
    fn resolve(&self) -> Result<ShiftConfig, ShiftError> {
        let mut config = match &self.config {
            Some(path) => ShiftConfig::load(path)?,
            None => ShiftConfig::default(),
        };
        if let Some(path) = &self.features {
            config.features = path.clone();
        }
        if let Some(path) = &self.rules {
            config.rules = path.clone();
        }
        for (slot, value) in [
            (&mut config.categories, &self.categories),
            (&mut config.active, &self.active),
            (&mut config.corpus, &self.corpus),
        ] {
            if value.is_some() {
                slot.clone_from(value);
            }
        }
        if self.all_active {
            config.initial_active = InitialActive::All;
        }
        config.parallel |= self.parallel;
        config.validate()?;
        Ok(config)
    }
}

fn parse_args() -> Result<CliArgs, String> {
    let mut cli = CliArgs { color: io::stdout().is_terminal(), ..Default::default() };
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = |name: &str| -> Result<PathBuf, String> {
            inline
                .clone()
                .or_else(|| args.next())
                .map(PathBuf::from)
                .ok_or_else(|| format!("error: {name} expects a value"))
        };
        match flag.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("soundshift {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => cli.config = Some(value("--config")?),
            "--features" | "-f" => cli.features = Some(value("--features")?),
            "--rules" | "-r" => cli.rules = Some(value("--rules")?),
            "--categories" => cli.categories = Some(value("--categories")?),
            "--active" => cli.active = Some(value("--active")?),
            "--corpus" | "-i" => cli.corpus = Some(value("--corpus")?),
            "--all-active" => cli.all_active = true,
            "--parallel" => cli.parallel = true,
            "--trace" => cli.trace = true,
            "--color" => cli.color = true,
            "--no-color" => cli.color = false,
            "--verbose" | "-v" => cli.verbose = true,
            _ if arg.starts_with('-') => return Err(format!("error: unknown option '{arg}'")),
            _ => return Err(format!("error: unexpected argument '{arg}'\n\n{}", help_text())),
        }
    }

    if cli.config.is_none() && (cli.features.is_none() || cli.rules.is_none()) {
        return Err(format!("error: --features and --rules are required without --config\n\n{}", help_text()));
    }
    Ok(cli)
}

fn read_stdin() -> io::Result<String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "soundshift {version}

Apply ordered feature-based sound changes to a word list.

Usage:
  soundshift --features <table> --rules <file> [OPTIONS]
  soundshift --config <soundshift.toml> [OPTIONS]

Options:
  -c, --config <file>        TOML run configuration. Flags below override it.
  -f, --features <file>      Feature table (comma or tab separated).
  -r, --rules <file>         Rule file: rules and `add` directives, in order.
  --categories <file>        Category table, one `X,member,...` per line.
  --active <file>            Sounds to activate before the rule file runs.
  --all-active               Start with every declared sound active.
  -i, --corpus <file>        Words to derive, one per line. Default: stdin.
  --parallel                 Derive words on all cores (output order kept).
  --trace                    Print every stage with the rule that produced it.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -v, --verbose              Log compilation details to stderr.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Environment:
  {log_env}              Log filter (default: soundshift=warn).

Exit codes:
  0  Success.
  1  Load or compile error; no word was derived.
  2  Invalid arguments.
",
        version = env!("CARGO_PKG_VERSION"),
        log_env = LOG_ENV,
    )
}
