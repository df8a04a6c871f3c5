//! ServerQuery line format
//!
//! A response is zero or more data lines followed by a status line:
//!
//!   `virtualserver_name=My\sServer virtualserver_uptime=3600`
//!   `error id=0 msg=ok`
//!
//! Records in a data line are separated by `|`, properties by spaces. Values
//! are escaped so neither separator appears literally.

use std::collections::HashMap;

use crate::error::{QueryError, QueryResult};

/// Escape a value for use in a command parameter.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '/' => out.push_str("\\/"),
            ' ' => out.push_str("\\s"),
            '|' => out.push_str("\\p"),
            '\u{7}' => out.push_str("\\a"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{b}' => out.push_str("\\v"),
            c => out.push(c),
        }
    }
    out
}

/// Decode an escaped value. Unknown escapes keep the escaped character.
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('s') => out.push(' '),
            Some('p') => out.push('|'),
            Some('a') => out.push('\u{7}'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\u{b}'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// One `key=value` property set. Flags without `=` map to an empty value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record(HashMap<String, String>);

impl Record {
    pub fn parse(text: &str) -> Self {
        let props = text
            .split(' ')
            .filter(|p| !p.is_empty())
            .map(|prop| match prop.split_once('=') {
                Some((k, v)) => (k.to_string(), unescape(v)),
                None => (prop.to_string(), String::new()),
            })
            .collect();
        Self(props)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Required string property.
    pub fn str(&self, key: &str) -> QueryResult<&str> {
        self.get(key)
            .ok_or_else(|| QueryError::Protocol(format!("missing property {}", key)))
    }

    /// Required numeric property.
    pub fn u64(&self, key: &str) -> QueryResult<u64> {
        let raw = self.str(key)?;
        raw.parse()
            .map_err(|_| QueryError::Protocol(format!("{}={} is not a number", key, raw)))
    }

    /// Optional numeric property; absent or malformed reads as zero.
    pub fn u64_or_zero(&self, key: &str) -> u64 {
        self.get(key).and_then(|v| v.parse().ok()).unwrap_or(0)
    }

    /// Optional `0`/`1` flag; absent reads as false.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).map(|v| v == "1").unwrap_or(false)
    }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

/// Split a data line into its `|`-separated records.
pub fn parse_records(line: &str) -> Vec<Record> {
    line.split('|')
        .map(Record::parse)
        .filter(|r| !r.is_empty())
        .collect()
}

/// The `error id=.. msg=..` line that terminates every response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub id: u32,
    pub msg: String,
}

impl Status {
    /// `None` when `line` is not a status line.
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.strip_prefix("error ")?;
        let record = Record::parse(rest);
        let id = record.get("id")?.parse().ok()?;
        let msg = record.get("msg").unwrap_or_default().to_string();
        Some(Self { id, msg })
    }

    pub fn is_ok(&self) -> bool { self.id == 0 }

    pub fn into_result(self) -> QueryResult<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(QueryError::Server { id: self.id, msg: self.msg })
        }
    }
}

/// Render a command line from its name, `key=value` parameters and options.
pub fn command(name: &str, params: &[(&str, &str)], options: &[&str]) -> String {
    let mut line = name.to_string();
    for (key, value) in params {
        line.push(' ');
        line.push_str(key);
        line.push('=');
        line.push_str(&escape(value));
    }
    for opt in options {
        line.push(' ');
        line.push_str(opt);
    }
    line
}
