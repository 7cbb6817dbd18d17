use structopt::StructOpt;
use dialoguer::Password;
use log::{error, LevelFilter};
use std::path::PathBuf;
use std::process;

use ad_lookup::commands::{self, Format, Request};
use ad_lookup::terminal::{Console, Scripted, Terminal};
use ad_lookup::*;

/// Help desk lookups against Active Directory
#[derive(StructOpt)]
struct Args {
    /// Configuration file to use instead of the per-user one
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,
    /// Account to bind as (defaults to the configured username)
    #[structopt(short = "u", long = "user")]
    username: Option<String>,
    /// Password to use to authenticate (rather than prompting)
    #[structopt(short, long)]
    password: Option<String>,
    /// Increase logging (-v, -vv)
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
enum Command {
    /// Look up a user account
    User(Search),
    /// Look up a group
    Group(Search),
    /// Look up a computer account
    Computer(Search),
}

#[derive(StructOpt)]
struct Search {
    /// Search terms; every term must match one of the search fields
    terms: Vec<String>,
    /// Field to match terms against (repeatable)
    #[structopt(short, long = "field", number_of_values = 1)]
    fields: Vec<String>,
    /// Employee ID to match (repeatable, users only)
    #[structopt(short, long = "employee-id", number_of_values = 1)]
    employee_ids: Vec<String>,
    /// Match `*` and `?` as plain characters
    #[structopt(short, long)]
    literal: bool,
    /// Most results to return (1 to 100)
    #[structopt(short, long)]
    max: Option<usize>,
    /// Only search below this DN
    #[structopt(long)]
    scope: Option<String>,
    /// Print the result as JSON
    #[structopt(long)]
    json: bool,
    /// Answer the selection prompt with this instead of asking
    #[structopt(long)]
    pick: Option<String>,
}

impl Command {
    fn into_parts(self) -> (ObjectKind, Search) {
        match self {
            Command::User(search) => (ObjectKind::User, search),
            Command::Group(search) => (ObjectKind::Group, search),
            Command::Computer(search) => (ObjectKind::Computer, search),
        }
    }
}

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

/// A scripted answer is never asked for again
fn session_config(config: Config, scripted: bool) -> Config {
    Config {
        retry_on_invalid_selection: config.retry_on_invalid_selection && !scripted,
        ..config
    }
}

fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;

    let auth_user = args.username
        .or_else(|| config.username.clone())
        .ok_or_else(|| Error::Usage("No account to bind as; pass --user".to_owned()))?;
    let password = args.password.map(Ok).unwrap_or_else(|| {
        let mut password = Password::new();
        password.with_prompt("Enter directory password");
        password.interact()
    })?;

    let (kind, search) = args.command.into_parts();
    let request = Request {
        kind,
        terms: search.terms,
        fields: search.fields,
        employee_ids: search.employee_ids,
        literal: search.literal,
        cap: search.max,
        scope: search.scope,
    };
    let output = if search.json { Format::Json } else { Format::Table };
    let config = session_config(config, search.pick.is_some());

    let mut conn = Conn::bind(&config.url, config.base.clone(), &config.domain, auth_user, password)?;
    let mut terminal: Box<dyn Terminal> = match search.pick {
        Some(pick) => Box::new(Scripted::new(vec![pick])),
        None => Box::new(Console),
    };

    match commands::run(&mut conn, &config, &request, terminal.as_mut(), output) {
        Ok(Some(text)) => println!("{}", text),
        Ok(None) => println!("Nothing selected"),
        Err(Error::NoResults) => println!("No {} matched", kind),
        Err(error) => return Err(error),
    }

    Ok(())
}

fn main() {
    let args = Args::from_args();
    init_logger(args.verbose);

    if let Err(e) = run(args) {
        error!("{}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search(argv: &[&str]) -> Search {
        let args = Args::from_iter(argv.iter().copied());
        let (_, search) = args.command.into_parts();
        search
    }

    #[test]
    fn field_takes_one_value() {
        let search = search(&["ad-lookup", "user", "--field", "sn", "doe"]);
        assert_eq!(search.fields, vec!["sn"]);
        assert_eq!(search.terms, vec!["doe"]);
    }

    #[test]
    fn repeated_options_accumulate() {
        let search = search(&[
            "ad-lookup", "user", "-f", "sn", "-f", "givenName",
            "--employee-id", "1001", "--employee-id", "1002", "jdoe",
        ]);
        assert_eq!(search.fields, vec!["sn", "givenName"]);
        assert_eq!(search.employee_ids, vec!["1001", "1002"]);
        assert_eq!(search.terms, vec!["jdoe"]);
    }

    #[test]
    fn employee_id_leaves_terms_alone() {
        let search = search(&["ad-lookup", "user", "--employee-id", "1001", "jdoe"]);
        assert_eq!(search.employee_ids, vec!["1001"]);
        assert_eq!(search.terms, vec!["jdoe"]);
    }

    #[test]
    fn picked_answers_do_not_retry() {
        let config = Config { retry_on_invalid_selection: true, ..Config::default() };
        assert!(!session_config(config.clone(), true).retry_on_invalid_selection);
        assert!(session_config(config, false).retry_on_invalid_selection);
    }
}
