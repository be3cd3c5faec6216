use std::env;
use std::io::{self, BufRead, Write};

use anyhow::{bail, Result};

use coursiva_rust::ReconcileArgs;

const USAGE: &str = "\
Usage: coursiva-reconcile [OPTIONS]

Ensures a certificate exists for every eligible exam attempt.

Options:
  --course-id <ID>   Only attempts for this course
  --user-id <ID>     Only attempts by this user
  --force-update     Re-derive snapshot data for existing certificates
  --recreate         Delete ALL certificates first, then re-issue (asks
                     for confirmation unless --yes is given)
  --yes              Skip the interactive confirmation
  --help             Show this message";

#[tokio::main]
async fn main() -> Result<()> {
    let args = match parse_args(env::args().skip(1)) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            println!("{USAGE}");
            return Ok(());
        }
        Err(err) => {
            eprintln!("{err}");
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };

    if args.reconcile.recreate && !args.assume_yes && !confirm_recreate()? {
        println!("Aborted.");
        return Ok(());
    }

    if let Err(e) = coursiva_rust::run_reconcile(args.reconcile).await {
        eprintln!("coursiva-reconcile fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

struct CliArgs {
    reconcile: ReconcileArgs,
    assume_yes: bool,
}

fn parse_args(raw: impl Iterator<Item = String>) -> Result<Option<CliArgs>> {
    let mut reconcile = ReconcileArgs::default();
    let mut assume_yes = false;

    let mut raw = raw.peekable();
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(None),
            "--course-id" => {
                reconcile.course_id =
                    Some(raw.next().ok_or_else(|| missing_value("--course-id"))?);
            }
            "--user-id" => {
                reconcile.user_id = Some(raw.next().ok_or_else(|| missing_value("--user-id"))?);
            }
            "--force-update" => reconcile.force_update = true,
            "--recreate" => reconcile.recreate = true,
            "--yes" => assume_yes = true,
            other => bail!("Unknown argument: {other}"),
        }
    }

    if reconcile.recreate && reconcile.force_update {
        bail!("--recreate and --force-update are mutually exclusive");
    }

    Ok(Some(CliArgs { reconcile, assume_yes }))
}

fn missing_value(flag: &str) -> anyhow::Error {
    anyhow::anyhow!("{flag} requires a value")
}

fn confirm_recreate() -> Result<bool> {
    print!("This will DELETE every certificate and re-issue from scratch. Continue? [y/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

#[cfg(test)]
mod tests {
    use super::parse_args;

    fn args<'a>(values: &'a [&'a str]) -> impl Iterator<Item = String> + 'a {
        values.iter().map(|value| value.to_string())
    }

    #[test]
    fn parses_filters_and_flags() {
        let parsed = parse_args(args(&["--course-id", "c1", "--force-update"]))
            .unwrap()
            .unwrap();
        assert_eq!(parsed.reconcile.course_id.as_deref(), Some("c1"));
        assert!(parsed.reconcile.force_update);
        assert!(!parsed.reconcile.recreate);
        assert!(!parsed.assume_yes);
    }

    #[test]
    fn help_short_circuits() {
        assert!(parse_args(args(&["--help"])).unwrap().is_none());
    }

    #[test]
    fn rejects_unknown_and_conflicting_flags() {
        assert!(parse_args(args(&["--bogus"])).is_err());
        assert!(parse_args(args(&["--recreate", "--force-update"])).is_err());
        assert!(parse_args(args(&["--course-id"])).is_err());
    }
}
