use std::path::PathBuf;

use anyhow::{Result, bail};

pub const USAGE: &str = "Usage: waterfall <trace.json> [--search <query>] [--op <name>]... \
[--errors <errors.json>] [--config <config.json>]";

/// Command-line arguments.
#[derive(Debug, Default, PartialEq)]
pub struct Args {
    pub trace: PathBuf,
    pub search: Option<String>,
    pub ops: Vec<String>,
    pub errors: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

impl Args {
    /// Parse arguments, excluding the program name.
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut args = args.into_iter();
        let mut trace = None;
        let mut parsed = Args::default();

        while let Some(arg) = args.next() {
            let mut value = |flag: &str| match args.next() {
                Some(v) => Ok(v),
                None => bail!("{flag} needs a value\n{USAGE}"),
            };
            match arg.as_str() {
                "--search" => parsed.search = Some(value("--search")?),
                "--op" => parsed.ops.push(value("--op")?),
                "--errors" => parsed.errors = Some(PathBuf::from(value("--errors")?)),
                "--config" => parsed.config = Some(PathBuf::from(value("--config")?)),
                flag if flag.starts_with("--") => bail!("unknown option {flag}\n{USAGE}"),
                path if trace.is_none() => trace = Some(PathBuf::from(path)),
                extra => bail!("unexpected argument {extra}\n{USAGE}"),
            }
        }

        match trace {
            Some(trace) => {
                parsed.trace = trace;
                Ok(parsed)
            }
            None => bail!("{USAGE}"),
        }
    }
}
