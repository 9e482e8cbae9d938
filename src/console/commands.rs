use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::domain::{
    settings::{MAX_COUNTRIES, MAX_LANGUAGES, SUPPORTED_COUNTRIES, SUPPORTED_LANGUAGES},
    types::WEIGHT_LIMIT,
};

static DOMAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}$").expect("valid regex"));

/// Article positions are 0-based here; users type them 1-based.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    Refresh,
    Show(usize),
    Like(usize),
    Dislike(usize),
    Save(usize),
    Saved,
    Unsave { index: usize, confirmed: bool },
    Tags,
    TagAdd(String),
    TagRemove(String),
    TagSet { name: String, value: f64 },
    Settings,
    SetList { field: ListField, values: Vec<String> },
    SetToggle { field: ToggleField, enabled: bool },
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListField {
    Languages,
    Countries,
    Sources,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleField {
    Quality,
    Newsdata,
    Rss,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`; type `help`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("`{0}` is not an article number")]
    BadIndex(String),
    #[error("`{0}` is not a number")]
    BadNumber(String),
    #[error("unsupported {field} code `{code}`")]
    UnsupportedCode { field: &'static str, code: String },
    #[error("`{0}` is not a domain name")]
    BadDomain(String),
    #[error("at most {max} {field} allowed")]
    TooMany { field: &'static str, max: usize },
}

pub fn parse(line: &str) -> Result<Command, ParseError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, args)) = words.split_first() else {
        return Err(ParseError::Empty);
    };

    match (head.to_lowercase().as_str(), args) {
        ("list" | "ls", []) => Ok(Command::List),
        ("refresh" | "r", []) => Ok(Command::Refresh),
        ("show", [n]) => Ok(Command::Show(index(n)?)),
        ("show", _) => Err(ParseError::Usage("show N")),
        ("like", [n]) => Ok(Command::Like(index(n)?)),
        ("like", _) => Err(ParseError::Usage("like N")),
        ("dislike", [n]) => Ok(Command::Dislike(index(n)?)),
        ("dislike", _) => Err(ParseError::Usage("dislike N")),
        ("save", [n]) => Ok(Command::Save(index(n)?)),
        ("save", _) => Err(ParseError::Usage("save N")),
        ("saved", []) => Ok(Command::Saved),
        ("unsave", [n]) => Ok(Command::Unsave {
            index: index(n)?,
            confirmed: false,
        }),
        ("unsave", [n, "--yes" | "-y"]) => Ok(Command::Unsave {
            index: index(n)?,
            confirmed: true,
        }),
        ("unsave", _) => Err(ParseError::Usage("unsave N [--yes]")),
        ("tags", []) => Ok(Command::Tags),
        ("tag", rest) => parse_tag(rest),
        ("settings", []) => Ok(Command::Settings),
        ("set", rest) => parse_set(rest),
        ("help" | "?", _) => Ok(Command::Help),
        ("quit" | "exit" | "q", []) => Ok(Command::Quit),
        (other, _) => Err(ParseError::Unknown(other.to_string())),
    }
}

fn parse_tag(args: &[&str]) -> Result<Command, ParseError> {
    match args {
        ["add", name @ ..] if !name.is_empty() => Ok(Command::TagAdd(name.join(" "))),
        ["rm" | "remove", name @ ..] if !name.is_empty() => Ok(Command::TagRemove(name.join(" "))),
        ["set", name @ .., value] if !name.is_empty() => {
            let value: f64 = value
                .parse()
                .ok()
                .filter(|v: &f64| v.is_finite())
                .ok_or_else(|| ParseError::BadNumber(value.to_string()))?;
            Ok(Command::TagSet {
                name: name.join(" "),
                value: value.clamp(-WEIGHT_LIMIT, WEIGHT_LIMIT),
            })
        }
        _ => Err(ParseError::Usage("tag add NAME | tag rm NAME | tag set NAME VALUE")),
    }
}

fn parse_set(args: &[&str]) -> Result<Command, ParseError> {
    const USAGE: &str = "set languages|countries|sources LIST | set quality|newsdata|rss on|off";
    let Some((&field, rest)) = args.split_first() else {
        return Err(ParseError::Usage(USAGE));
    };
    let list = rest.join(" ");

    match field.to_lowercase().as_str() {
        "languages" | "language" => Ok(Command::SetList {
            field: ListField::Languages,
            values: codes(&list, "language", SUPPORTED_LANGUAGES, MAX_LANGUAGES)?,
        }),
        "countries" | "country" => Ok(Command::SetList {
            field: ListField::Countries,
            values: codes(&list, "country", SUPPORTED_COUNTRIES, MAX_COUNTRIES)?,
        }),
        "sources" => Ok(Command::SetList {
            field: ListField::Sources,
            values: domains(&list)?,
        }),
        "quality" => toggle(ToggleField::Quality, rest),
        "newsdata" => toggle(ToggleField::Newsdata, rest),
        "rss" => toggle(ToggleField::Rss, rest),
        _ => Err(ParseError::Usage(USAGE)),
    }
}

fn toggle(field: ToggleField, args: &[&str]) -> Result<Command, ParseError> {
    let enabled = match args {
        ["on" | "true" | "yes"] => true,
        ["off" | "false" | "no"] => false,
        _ => return Err(ParseError::Usage("set quality|newsdata|rss on|off")),
    };
    Ok(Command::SetToggle { field, enabled })
}

fn index(raw: &str) -> Result<usize, ParseError> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(ParseError::BadIndex(raw.to_string())),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(|item| item.trim().to_lowercase())
        .filter(|item| !item.is_empty())
    {
        if !items.contains(&item) {
            items.push(item);
        }
    }
    items
}

fn codes(
    raw: &str,
    field: &'static str,
    supported: &[&str],
    max: usize,
) -> Result<Vec<String>, ParseError> {
    let codes = split_list(raw);
    if codes.is_empty() {
        return Err(ParseError::Usage("set languages|countries CODE[,CODE...]"));
    }
    if let Some(code) = codes.iter().find(|code| !supported.contains(&code.as_str())) {
        return Err(ParseError::UnsupportedCode {
            field,
            code: code.clone(),
        });
    }
    if codes.len() > max {
        return Err(ParseError::TooMany { field, max });
    }
    Ok(codes)
}

/// An empty list clears the preferred sources.
fn domains(raw: &str) -> Result<Vec<String>, ParseError> {
    let domains = split_list(raw);
    match domains.iter().find(|domain| !DOMAIN_RE.is_match(domain)) {
        Some(bad) => Err(ParseError::BadDomain(bad.clone())),
        None => Ok(domains),
    }
}
