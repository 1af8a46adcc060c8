//! Reads the command file: one comma-separated command per line, operation name first.
//!
//! ```text
//! insert,<name>,<salary>,<priority>
//! delete,<name>,<priority>
//! update,<name>,<salary>,<priority>
//! search,<name>,<priority>
//! print,<priority>
//! ```
//!
//! Malformed lines are skipped with a warning; they never stop the run.

use crate::command::{Command, CommandKind};
use std::io::{self, BufRead};
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown operation {0:?}")]
    UnknownOperation(String),
    #[error("Missing {field} for {kind}")]
    MissingField {
        kind: CommandKind,
        field: &'static str,
    },
    #[error("Invalid {field} {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

fn operation(token: &str) -> Result<CommandKind, ParseError> {
    match token.to_ascii_lowercase().as_str() {
        "insert" => Ok(CommandKind::Insert),
        "delete" => Ok(CommandKind::Delete),
        "update" => Ok(CommandKind::Update),
        "search" => Ok(CommandKind::Search),
        "print" => Ok(CommandKind::Print),
        _ => Err(ParseError::UnknownOperation(token.to_string())),
    }
}

struct Fields<'a> {
    kind: CommandKind,
    rest: std::str::Split<'a, char>,
}

impl<'a> Fields<'a> {
    fn text(&mut self, field: &'static str) -> Result<&'a str, ParseError> {
        match self.rest.next().map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(ParseError::MissingField {
                kind: self.kind,
                field,
            }),
        }
    }

    fn number<T: FromStr>(&mut self, field: &'static str) -> Result<T, ParseError> {
        let value = self.text(field)?;
        value.parse().map_err(|_| ParseError::InvalidNumber {
            field,
            value: value.to_string(),
        })
    }

    fn name(&mut self) -> Result<String, ParseError> {
        self.text("name").map(str::to_string)
    }
}

/// Parses one line. Blank lines yield `Ok(None)`; fields past the last expected one are ignored.
pub fn parse_line(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let mut tokens = line.split(',');
    let kind = operation(tokens.next().unwrap_or_default().trim())?;
    let mut fields = Fields { kind, rest: tokens };
    let command = match kind {
        CommandKind::Insert => {
            let name = fields.name()?;
            let salary = fields.number("salary")?;
            Command::insert(name, salary, fields.number("priority")?)
        }
        CommandKind::Update => {
            let name = fields.name()?;
            let salary = fields.number("salary")?;
            Command::update(name, salary, fields.number("priority")?)
        }
        CommandKind::Delete => {
            let name = fields.name()?;
            Command::delete(name, fields.number("priority")?)
        }
        CommandKind::Search => {
            let name = fields.name()?;
            Command::search(name, fields.number("priority")?)
        }
        CommandKind::Print => Command::print(fields.number("priority")?),
    };
    Ok(Some(command))
}

/// Parses every line of `reader`, skipping (and logging) the malformed ones.
pub fn parse_commands<R: BufRead>(reader: R) -> io::Result<Vec<Command>> {
    let mut commands = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        match parse_line(&line) {
            Ok(Some(command)) => commands.push(command),
            Ok(None) => {}
            Err(err) => warn!(line = index + 1, %err, text = %line, "skipping malformed command"),
        }
    }
    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::record::MAX_NAME_LEN;
    use std::io::Cursor;

    #[test]
    fn test_each_operation() {
        assert_eq!(
            parse_line("insert,Broc,50000,1").unwrap(),
            Some(Command::insert("Broc", 50000, 1))
        );
        assert_eq!(
            parse_line("delete,Broc,2").unwrap(),
            Some(Command::delete("Broc", 2))
        );
        assert_eq!(
            parse_line("update,Alice,80000,3").unwrap(),
            Some(Command::update("Alice", 80000, 3))
        );
        assert_eq!(
            parse_line("search,Alice,4").unwrap(),
            Some(Command::search("Alice", 4))
        );
        assert_eq!(parse_line("print,5").unwrap(), Some(Command::print(5)));
    }

    #[test]
    fn test_case_and_whitespace() {
        assert_eq!(
            parse_line("  INSERT , Shigeru Miyamoto , 40000 , 7 \r").unwrap(),
            Some(Command::insert("Shigeru Miyamoto", 40000, 7))
        );
        assert_eq!(parse_line("Print,-1").unwrap(), Some(Command::print(-1)));
        assert_eq!(parse_line("   ").unwrap(), None);
    }

    #[test]
    fn test_malformed_lines() {
        assert_eq!(
            parse_line("threads,4,0"),
            Err(ParseError::UnknownOperation("threads".to_string()))
        );
        assert_eq!(
            parse_line("insert,Broc,50000"),
            Err(ParseError::MissingField {
                kind: CommandKind::Insert,
                field: "priority"
            })
        );
        assert_eq!(
            parse_line("delete,,3"),
            Err(ParseError::MissingField {
                kind: CommandKind::Delete,
                field: "name"
            })
        );
        assert_eq!(
            parse_line("insert,Broc,lots,1"),
            Err(ParseError::InvalidNumber {
                field: "salary",
                value: "lots".to_string()
            })
        );
        assert!(parse_line("print").is_err());
    }

    #[test]
    fn test_long_names_are_cut() {
        let line = format!("search,{},1", "n".repeat(70));
        let command = parse_line(&line).unwrap().unwrap();
        assert_eq!(command.name.len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_parse_commands_skips_bad_lines() {
        let input = "insert,Broc,50000,1\n\nbogus,1\nsearch,Broc\nsearch,Broc,2\nprint,3\n";
        let commands = parse_commands(Cursor::new(input)).unwrap();
        assert_eq!(
            commands,
            vec![
                Command::insert("Broc", 50000, 1),
                Command::search("Broc", 2),
                Command::print(3),
            ]
        );
        assert!(parse_commands(Cursor::new("")).unwrap().is_empty());
    }
}
