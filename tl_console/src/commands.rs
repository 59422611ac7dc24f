use std::fmt;
use std::path::PathBuf;
use tourney_lineup::arrangement::{ContentType, Gender, ItemFilters, ItemId, SectionId};

/// A toolbar action or gesture typed at the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Fetch the arrangement for the current scope.
    Load,
    /// Fetch the content catalog for the current scope.
    Catalog,
    SetContentType(ContentType),
    SetCompetition(String),
    /// Server-side allocation; `randomize: false` keeps registration order.
    Randomize {
        randomize: bool,
        filters: ItemFilters,
    },
    /// Place a pool item (by id) into a section.
    Add { section: SectionId, item: ItemId },
    /// Drop a raw drag payload onto a section.
    Drop { section: SectionId, payload: String },
    Remove { section: SectionId, item: ItemId },
    Move {
        section: SectionId,
        item: ItemId,
        delta: isize,
    },
    Shuffle(SectionId),
    Seed(SectionId),
    AutoAssign { section: SectionId, count: usize },
    /// Print an item card together with its drag payload.
    Card(ItemId),
    ResetAll,
    Save,
    Export(Option<PathBuf>),
    Pool(ItemFilters),
    Show,
    Help,
    Quit,
}

/// Errors that can occur during command parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Command given without the arguments it needs.
    MissingArgument {
        command: &'static str,
        usage: &'static str,
    },
    /// Content type other than quyen or music.
    InvalidContentType(String),
    /// Count that is not a non-negative integer.
    InvalidCount(String),
    /// Filter that is not `gender=...` or `form=...`.
    InvalidFilter(String),
    /// Unrecognized command.
    UnrecognizedCommand(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingArgument { command, usage } => {
                write!(f, "'{}' needs more arguments (e.g., '{}')", command, usage)
            }
            Self::InvalidContentType(value) => write!(
                f,
                "Invalid content type '{}'. Use 'type quyen' or 'type music'",
                value
            ),
            Self::InvalidCount(value) => write!(
                f,
                "Invalid count '{}'. Must be a whole number (e.g., 'auto c1 3')",
                value
            ),
            Self::InvalidFilter(value) => write!(
                f,
                "Invalid filter '{}'. Use 'gender=male|female|mixed' or 'form=LABEL'",
                value
            ),
            Self::UnrecognizedCommand(cmd) => write!(
                f,
                "Unrecognized command '{}'. Type 'help' to see available commands",
                cmd
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse a command string into a ConsoleCommand.
///
/// # Examples
///
/// ```
/// use tl_console::commands::{ConsoleCommand, parse_command};
///
/// // Single-word commands
/// assert!(matches!(parse_command("save"), Ok(ConsoleCommand::Save)));
/// assert!(matches!(parse_command("show"), Ok(ConsoleCommand::Show)));
///
/// // Multi-word commands
/// assert!(matches!(
///     parse_command("auto c1 3"),
///     Ok(ConsoleCommand::AutoAssign { count: 3, .. })
/// ));
/// ```
pub fn parse_command(input: &str) -> Result<ConsoleCommand, ParseError> {
    let trimmed = input.trim();

    // Try single-word commands first
    match trimmed {
        "load" => return Ok(ConsoleCommand::Load),
        "catalog" => return Ok(ConsoleCommand::Catalog),
        "reset" => return Ok(ConsoleCommand::ResetAll),
        "save" => return Ok(ConsoleCommand::Save),
        "show" => return Ok(ConsoleCommand::Show),
        "help" | "?" => return Ok(ConsoleCommand::Help),
        "quit" | "exit" => return Ok(ConsoleCommand::Quit),
        _ => {}
    }

    // Drag payloads may contain spaces, so split only the first two words off
    if let Some(rest) = trimmed.strip_prefix("drop ") {
        return parse_drop_command(rest);
    }

    let parts: Vec<&str> = trimmed.split_ascii_whitespace().collect();
    match parts.first() {
        Some(&"type") => parse_type_command(&parts),
        Some(&"competition") => match parts.get(1) {
            Some(id) => Ok(ConsoleCommand::SetCompetition(id.to_string())),
            None => Err(ParseError::MissingArgument {
                command: "competition",
                usage: "competition spring-cup",
            }),
        },
        Some(&"randomize") => parse_randomize_command(&parts[1..]),
        Some(&"add") => {
            let (section, item) = section_and_item(&parts, "add", "add c1 42")?;
            Ok(ConsoleCommand::Add { section, item })
        }
        Some(&"remove") => {
            let (section, item) = section_and_item(&parts, "remove", "remove c1 42")?;
            Ok(ConsoleCommand::Remove { section, item })
        }
        Some(&"up") => {
            let (section, item) = section_and_item(&parts, "up", "up c1 42")?;
            Ok(ConsoleCommand::Move {
                section,
                item,
                delta: -1,
            })
        }
        Some(&"down") => {
            let (section, item) = section_and_item(&parts, "down", "down c1 42")?;
            Ok(ConsoleCommand::Move {
                section,
                item,
                delta: 1,
            })
        }
        Some(&"shuffle") => {
            single_argument(&parts, "shuffle", "shuffle c1").map(ConsoleCommand::Shuffle)
        }
        Some(&"seed") => single_argument(&parts, "seed", "seed c1").map(ConsoleCommand::Seed),
        Some(&"card") => single_argument(&parts, "card", "card 42").map(ConsoleCommand::Card),
        Some(&"auto") => parse_auto_command(&parts),
        Some(&"export") => Ok(ConsoleCommand::Export(parts.get(1).map(PathBuf::from))),
        Some(&"pool") => parse_filters(&parts[1..]).map(ConsoleCommand::Pool),
        _ => Err(ParseError::UnrecognizedCommand(trimmed.to_string())),
    }
}

fn single_argument(
    parts: &[&str],
    command: &'static str,
    usage: &'static str,
) -> Result<String, ParseError> {
    parts
        .get(1)
        .map(|value| value.to_string())
        .ok_or(ParseError::MissingArgument { command, usage })
}

fn section_and_item(
    parts: &[&str],
    command: &'static str,
    usage: &'static str,
) -> Result<(SectionId, ItemId), ParseError> {
    match (parts.get(1), parts.get(2)) {
        (Some(section), Some(item)) => Ok((section.to_string(), item.to_string())),
        _ => Err(ParseError::MissingArgument { command, usage }),
    }
}

/// Parse a content type switch: "type quyen|music"
fn parse_type_command(parts: &[&str]) -> Result<ConsoleCommand, ParseError> {
    let value = parts.get(1).ok_or(ParseError::MissingArgument {
        command: "type",
        usage: "type music",
    })?;
    value
        .parse::<ContentType>()
        .map(ConsoleCommand::SetContentType)
        .map_err(|_| ParseError::InvalidContentType(value.to_string()))
}

/// Parse "drop SECTION PAYLOAD"; the payload is kept verbatim
fn parse_drop_command(rest: &str) -> Result<ConsoleCommand, ParseError> {
    let missing = ParseError::MissingArgument {
        command: "drop",
        usage: "drop c1 {\"item\": ...}",
    };
    let rest = rest.trim_start();
    let (section, payload) = rest.split_once(char::is_whitespace).ok_or(missing.clone())?;
    let payload = payload.trim();
    if section.is_empty() || payload.is_empty() {
        return Err(missing);
    }
    Ok(ConsoleCommand::Drop {
        section: section.to_string(),
        payload: payload.to_string(),
    })
}

/// Parse "auto SECTION COUNT"
fn parse_auto_command(parts: &[&str]) -> Result<ConsoleCommand, ParseError> {
    let (section, count) = section_and_item(parts, "auto", "auto c1 3")?;
    let count = count
        .parse::<usize>()
        .map_err(|_| ParseError::InvalidCount(count.clone()))?;
    Ok(ConsoleCommand::AutoAssign { section, count })
}

/// Parse "randomize [keep] [gender=...] [form=...]"
fn parse_randomize_command(args: &[&str]) -> Result<ConsoleCommand, ParseError> {
    let (randomize, filters) = match args.first() {
        Some(&"keep") => (false, &args[1..]),
        _ => (true, args),
    };
    Ok(ConsoleCommand::Randomize {
        randomize,
        filters: parse_filters(filters)?,
    })
}

/// Parse `gender=...` / `form=...` words; words without `=` continue the form label
fn parse_filters(args: &[&str]) -> Result<ItemFilters, ParseError> {
    let mut filters = ItemFilters::default();
    let mut in_form = false;

    for arg in args {
        match arg.split_once('=') {
            Some(("gender", value)) => {
                in_form = false;
                let gender = value
                    .parse::<Gender>()
                    .map_err(|_| ParseError::InvalidFilter(arg.to_string()))?;
                filters.gender = Some(gender);
            }
            Some(("form", value)) if !value.is_empty() => {
                in_form = true;
                filters.form_label = Some(value.to_string());
            }
            None if in_form => {
                if let Some(label) = filters.form_label.as_mut() {
                    label.push(' ');
                    label.push_str(arg);
                }
            }
            _ => return Err(ParseError::InvalidFilter(arg.to_string())),
        }
    }

    Ok(filters)
}
