use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::model::*;

/// Parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Reserve(ReservationRequest),
    Quote(ReservationRequest),
    Cancel(ReservationId),
    List,
    Show(ReservationId),
    Resources,
    Locations,
    Location(String),
    AddResource {
        name: String,
        capacity: u32,
        unit_price: u64,
    },
    AddLocation {
        name: String,
        base_price: u64,
        required: BTreeSet<String>,
        optional: BTreeSet<String>,
    },
    DeleteResource(String),
    DeleteLocation(String),
    Price {
        name: String,
        value: u64,
    },
    Quantity {
        name: String,
        value: u32,
    },
    Refresh,
    Save(Option<PathBuf>),
    Load(Option<PathBuf>),
    Help,
    Quit,
}

impl Command {
    /// Whether a successful run of this command changes the model.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Command::Reserve(_)
                | Command::Cancel(_)
                | Command::AddResource { .. }
                | Command::AddLocation { .. }
                | Command::DeleteResource(_)
                | Command::DeleteLocation(_)
                | Command::Price { .. }
                | Command::Quantity { .. }
                | Command::Refresh
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    BadDate(String),
    #[error("invalid number {0:?}")]
    BadNumber(String),
    #[error(transparent)]
    BadId(#[from] InvalidReservationId),
    #[error("unterminated quote")]
    UnterminatedQuote,
}

pub const HELP: &str = "\
commands:
  reserve <start> <end> <location> [optionals]   book a stay (dates YYYY-MM-DD, inclusive)
  quote <start> <end> <location> [optionals]     price a stay without booking
  cancel <id>                                    delete a reservation
  list                                           reservations in schedule order
  show <id>                                      reservation details and price
  resources | locations                          catalog listings
  location <name>                                location details
  add-resource <name> <quantity> <price>
  add-location <name> <price> <required> [optionals]
  delete-resource <name> | delete-location <name>
  price <name> <value>                           set a resource or location price
  quantity <resource> <value>                    set a resource quantity
  refresh                                        re-check the whole schedule
  save [file] | load [file]
  help | quit
lists are comma separated (`Chair,Projector`); `-` is the empty list.
names containing spaces go in double quotes.";

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let tokens = tokenize(line)?;
    let Some((head, args)) = tokens.split_first() else {
        return Err(CommandError::Empty);
    };
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match head.to_ascii_lowercase().as_str() {
        "reserve" | "book" => parse_request(&args, "reserve <start> <end> <location> [optionals]").map(Command::Reserve),
        "quote" => parse_request(&args, "quote <start> <end> <location> [optionals]").map(Command::Quote),
        "cancel" | "delete" => match args[..] {
            [id] => Ok(Command::Cancel(id.parse()?)),
            _ => Err(CommandError::Usage("cancel <id>")),
        },
        "list" => no_args(&args, "list", Command::List),
        "show" => match args[..] {
            [id] => Ok(Command::Show(id.parse()?)),
            _ => Err(CommandError::Usage("show <id>")),
        },
        "resources" => no_args(&args, "resources", Command::Resources),
        "locations" => no_args(&args, "locations", Command::Locations),
        "location" => match args[..] {
            [name] => Ok(Command::Location(name.to_string())),
            _ => Err(CommandError::Usage("location <name>")),
        },
        "add-resource" => match args[..] {
            [name, capacity, price] => Ok(Command::AddResource {
                name: name.to_string(),
                capacity: parse_number(capacity)?,
                unit_price: parse_number(price)?,
            }),
            _ => Err(CommandError::Usage("add-resource <name> <quantity> <price>")),
        },
        "add-location" => match args[..] {
            [name, price, required] | [name, price, required, _] => Ok(Command::AddLocation {
                name: name.to_string(),
                base_price: parse_number(price)?,
                required: parse_list(required),
                optional: args.get(3).map_or_else(BTreeSet::new, |o| parse_list(o)),
            }),
            _ => Err(CommandError::Usage("add-location <name> <price> <required> [optionals]")),
        },
        "delete-resource" => match args[..] {
            [name] => Ok(Command::DeleteResource(name.to_string())),
            _ => Err(CommandError::Usage("delete-resource <name>")),
        },
        "delete-location" => match args[..] {
            [name] => Ok(Command::DeleteLocation(name.to_string())),
            _ => Err(CommandError::Usage("delete-location <name>")),
        },
        "price" => match args[..] {
            [name, value] => Ok(Command::Price {
                name: name.to_string(),
                value: parse_amount(value)?,
            }),
            _ => Err(CommandError::Usage("price <name> <value>")),
        },
        "quantity" => match args[..] {
            [name, value] => Ok(Command::Quantity {
                name: name.to_string(),
                value: u32::try_from(parse_amount(value)?).map_err(|_| CommandError::BadNumber(value.to_string()))?,
            }),
            _ => Err(CommandError::Usage("quantity <resource> <value>")),
        },
        "refresh" => no_args(&args, "refresh", Command::Refresh),
        "save" => match args[..] {
            [] => Ok(Command::Save(None)),
            [file] => Ok(Command::Save(Some(PathBuf::from(file)))),
            _ => Err(CommandError::Usage("save [file]")),
        },
        "load" => match args[..] {
            [] => Ok(Command::Load(None)),
            [file] => Ok(Command::Load(Some(PathBuf::from(file)))),
            _ => Err(CommandError::Usage("load [file]")),
        },
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn no_args(args: &[&str], usage: &'static str, cmd: Command) -> Result<Command, CommandError> {
    if args.is_empty() { Ok(cmd) } else { Err(CommandError::Usage(usage)) }
}

fn parse_request(args: &[&str], usage: &'static str) -> Result<ReservationRequest, CommandError> {
    let (start, end, location, optionals) = match args {
        [start, end, location] => (start, end, location, BTreeSet::new()),
        [start, end, location, optionals] => (start, end, location, parse_list(optionals)),
        _ => return Err(CommandError::Usage(usage)),
    };
    Ok(ReservationRequest {
        start: parse_date(start)?,
        end: parse_date(end)?,
        location: location.to_string(),
        optionals,
    })
}

fn parse_date(s: &str) -> Result<NaiveDate, CommandError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| CommandError::BadDate(s.to_string()))
}

fn parse_number<T: std::str::FromStr>(s: &str) -> Result<T, CommandError> {
    s.parse().map_err(|_| CommandError::BadNumber(s.to_string()))
}

/// Non-positive amounts come through as zero, which the manager ignores.
fn parse_amount(s: &str) -> Result<u64, CommandError> {
    let value: i64 = parse_number(s)?;
    Ok(value.max(0).unsigned_abs())
}

/// `a,b,c` into a set; `-` or an empty string is the empty list.
fn parse_list(s: &str) -> BTreeSet<String> {
    if s == "-" {
        return BTreeSet::new();
    }
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whitespace-separated tokens; double quotes group words. `#` starts a comment.
fn tokenize(line: &str) -> Result<Vec<String>, CommandError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            '#' if !quoted => break,
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if quoted {
        return Err(CommandError::UnterminatedQuote);
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
