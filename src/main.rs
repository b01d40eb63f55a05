use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use revdiff::{InMemoryRevisionStore, RevdiffConfig};
use tracing_subscriber::EnvFilter;

const CLI_SLUG: &str = "cli";
const LOG_ENV: &str = "REVDIFF_LOG";

const USAGE: &str = "\
usage: revdiff <file-a> <file-b> [options]

options:
  --granularity <character|word|sentence|paragraph>
  --algorithm <syntactic|semantic|hybrid>
  --threshold <0.0-1.0>
  --config <path.yaml>
  --log-json            emit logs as JSON on stderr
  --pretty              pretty-print the response
  -h, --help";

#[derive(Debug, Default)]
struct CliArgs {
    file_a: PathBuf,
    file_b: PathBuf,
    granularity: Option<String>,
    algorithm: Option<String>,
    threshold: Option<f64>,
    config: Option<PathBuf>,
    log_json: bool,
    pretty: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Option<CliArgs>> {
    let mut parsed = CliArgs::default();
    let mut files = Vec::new();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .with_context(|| format!("{flag} expects a value"))
        };
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--granularity" => parsed.granularity = Some(value("--granularity")?),
            "--algorithm" => parsed.algorithm = Some(value("--algorithm")?),
            "--threshold" => {
                let raw = value("--threshold")?;
                let threshold = raw
                    .parse()
                    .with_context(|| format!("--threshold: `{raw}` is not a number"))?;
                parsed.threshold = Some(threshold);
            }
            "--config" => parsed.config = Some(PathBuf::from(value("--config")?)),
            "--log-json" => parsed.log_json = true,
            "--pretty" => parsed.pretty = true,
            flag if flag.starts_with("--") => bail!("unknown option {flag}"),
            _ => files.push(PathBuf::from(arg)),
        }
    }
    let [file_a, file_b]: [PathBuf; 2] = files
        .try_into()
        .map_err(|files: Vec<PathBuf>| anyhow::anyhow!("expected 2 files, got {}", files.len()))?;
    parsed.file_a = file_a;
    parsed.file_b = file_b;
    Ok(Some(parsed))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let Some(args) = parse_args(std::env::args().skip(1))? else {
        println!("{USAGE}");
        return Ok(());
    };
    init_tracing(args.log_json);

    let config = match &args.config {
        Some(path) => RevdiffConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RevdiffConfig::default(),
    };

    let text_a = std::fs::read_to_string(&args.file_a)
        .with_context(|| format!("reading {}", args.file_a.display()))?;
    let text_b = std::fs::read_to_string(&args.file_b)
        .with_context(|| format!("reading {}", args.file_b.display()))?;
    let store = InMemoryRevisionStore::new();
    store.insert(CLI_SLUG, 1, text_a);
    store.insert(CLI_SLUG, 2, text_b);

    let comparator = config.comparator_builder(Arc::new(store))?.build()?;

    let mut request = config.request(CLI_SLUG, 1, 2);
    if let Some(granularity) = args.granularity {
        request = request.with_granularity(granularity);
    }
    if let Some(algorithm) = args.algorithm {
        request = request.with_algorithm(algorithm);
    }
    if let Some(threshold) = args.threshold {
        request = request.with_threshold(threshold);
    }

    let result = comparator.compare(&request).await?;
    let response = result.to_response();
    let body = if args.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{body}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> anyhow::Result<Option<CliArgs>> {
        parse_args(raw.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_files_and_options() {
        let parsed = args(&[
            "old.md",
            "--granularity",
            "sentence",
            "new.md",
            "--threshold",
            "0.65",
            "--pretty",
        ])
        .unwrap()
        .unwrap();
        assert_eq!(parsed.file_a, PathBuf::from("old.md"));
        assert_eq!(parsed.file_b, PathBuf::from("new.md"));
        assert_eq!(parsed.granularity.as_deref(), Some("sentence"));
        assert_eq!(parsed.threshold, Some(0.65));
        assert!(parsed.pretty);
        assert!(!parsed.log_json);
    }

    #[test]
    fn help_short_circuits() {
        assert!(args(&["--help"]).unwrap().is_none());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(args(&["only-one.md"]).is_err());
        assert!(args(&["a", "b", "--threshold", "high"]).is_err());
        assert!(args(&["a", "b", "--algorithm"]).is_err());
        assert!(args(&["a", "b", "--verbose"]).is_err());
    }
}
