//! Parsing of the job description text.
//!
//! The format, top to bottom (blank lines between sections are ignored):
//! a preorder tree line of comma-separated `<key>r` / `<key>b` / `f` tokens
//! (`NULL`, `null`, or a lone `f` for an empty tree), a `Search threads: N`
//! line, a `Modify threads: N` line, then operations `search(k)` /
//! `insert(k)` / `delete(k)` separated by `||`, across as many lines as
//! needed.

use thiserror::Error;

use crate::dispatch::Operation;
use crate::rbtree::{Color, PreorderItem};

/// Everything a run needs, parsed but not yet materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub shape: Vec<PreorderItem>,
    pub search_workers: usize,
    pub modify_workers: usize,
    pub ops: Vec<Operation>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("input ended before the {0} line")]
    MissingSection(&'static str),
    #[error("bad tree token {0:?}: want <key>r, <key>b, or f")]
    BadNodeToken(String),
    #[error("bad worker count line {0:?}: want a label, a colon, and a number")]
    BadWorkerCount(String),
    #[error("bad operation {0:?}: want search(<key>), insert(<key>), or delete(<key>)")]
    BadOperation(String),
}

pub fn parse_job(text: &str) -> Result<JobSpec, ParseError> {
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

    let shape = parse_shape(lines.next().ok_or(ParseError::MissingSection("tree"))?)?;
    let search_workers =
        parse_worker_count(lines.next().ok_or(ParseError::MissingSection("search worker count"))?)?;
    let modify_workers =
        parse_worker_count(lines.next().ok_or(ParseError::MissingSection("modify worker count"))?)?;

    let mut ops = Vec::new();
    for line in lines {
        for token in line.split("||") {
            ops.push(parse_operation(token.trim())?);
        }
    }

    Ok(JobSpec { shape, search_workers, modify_workers, ops })
}

fn parse_shape(line: &str) -> Result<Vec<PreorderItem>, ParseError> {
    let tokens: Vec<&str> = line.split(',').map(str::trim).collect();
    if let [single] = tokens[..] {
        if single.eq_ignore_ascii_case("null") {
            return Ok(vec![PreorderItem::Leaf]);
        }
    }
    tokens.iter().map(|token| parse_node_token(token)).collect()
}

fn parse_node_token(token: &str) -> Result<PreorderItem, ParseError> {
    if token == "f" {
        return Ok(PreorderItem::Leaf);
    }
    let bad = || ParseError::BadNodeToken(token.to_string());
    let (key, color) = match token.strip_suffix('r') {
        Some(key) => (key, Color::Red),
        None => (token.strip_suffix('b').ok_or_else(bad)?, Color::Black),
    };
    let key: i64 = key.parse().map_err(|_| bad())?;
    Ok(PreorderItem::Node { key, color })
}

/// The label before the colon is not interpreted; the number after it is.
fn parse_worker_count(line: &str) -> Result<usize, ParseError> {
    let bad = || ParseError::BadWorkerCount(line.to_string());
    let (_, count) = line.split_once(':').ok_or_else(bad)?;
    count.trim().parse().map_err(|_| bad())
}

fn parse_operation(token: &str) -> Result<Operation, ParseError> {
    let bad = || ParseError::BadOperation(token.to_string());
    let inner = token.strip_suffix(')').ok_or_else(bad)?;
    let (name, key) = inner.split_once('(').ok_or_else(bad)?;
    let key: i64 = key.trim().parse().map_err(|_| bad())?;
    match name.trim() {
        "search" => Ok(Operation::Search(key)),
        "insert" => Ok(Operation::Insert(key)),
        "delete" => Ok(Operation::Delete(key)),
        _ => Err(bad()),
    }
}
