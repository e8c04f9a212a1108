//! Inventory list parsing
//!
//! Reads line-oriented card records into [`InventoryEntry`] values. Two line
//! formats are understood:
//!
//! - delimited: `quantity,name,set,condition,foil` (delimiter configurable,
//!   quoting handled by the `csv` crate)
//! - board: tappedout.net board lists such as `4x Lightning Bolt (LEA) *F* *SL*`

use crate::error::{MalformedLineError, MalformedReason, ParseError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Physical condition of an owned card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    #[default]
    NearMint,
    LightlyPlayed,
    ModeratelyPlayed,
    HeavilyPlayed,
    Damaged,
}

impl Condition {
    /// Canonical short token (e.g., "NM", "LP")
    pub fn token(&self) -> &'static str {
        match self {
            Condition::NearMint => "NM",
            Condition::LightlyPlayed => "LP",
            Condition::ModeratelyPlayed => "MP",
            Condition::HeavilyPlayed => "HP",
            Condition::Damaged => "DMG",
        }
    }

    /// Human readable name shown in the binder view
    pub fn display_name(&self) -> &'static str {
        match self {
            Condition::NearMint => "Near Mint",
            Condition::LightlyPlayed => "Lightly Played",
            Condition::ModeratelyPlayed => "Moderately Played",
            Condition::HeavilyPlayed => "Heavily Played",
            Condition::Damaged => "Damaged",
        }
    }

    /// Marker used in board lists; near mint has none
    fn board_symbol(&self) -> Option<&'static str> {
        match self {
            Condition::NearMint => None,
            Condition::LightlyPlayed => Some("SL"),
            Condition::ModeratelyPlayed => Some("ME"),
            Condition::HeavilyPlayed => Some("HE"),
            Condition::Damaged => Some("DM"),
        }
    }

    /// Parse a condition token, case-insensitive
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_uppercase().as_str() {
            "NM" | "M" | "MINT" => Some(Condition::NearMint),
            "LP" | "SP" | "SL" | "EX" => Some(Condition::LightlyPlayed),
            "MP" | "ME" | "GD" => Some(Condition::ModeratelyPlayed),
            "HP" | "HE" | "PL" => Some(Condition::HeavilyPlayed),
            "DMG" | "DM" | "PO" => Some(Condition::Damaged),
            _ => None,
        }
    }
}

/// One owned card line from an inventory list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    quantity: u32,
    name: String,
    set_code: Option<String>,
    condition: Condition,
    foil: bool,
}

impl InventoryEntry {
    /// Build an entry, rejecting a zero quantity or blank name
    pub fn new(
        quantity: u32,
        name: &str,
        set_code: Option<&str>,
        condition: Condition,
        foil: bool,
    ) -> Result<Self, MalformedReason> {
        if quantity == 0 {
            return Err(MalformedReason::ZeroQuantity);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(MalformedReason::MissingName);
        }
        Ok(Self {
            quantity,
            name: name.to_string(),
            set_code: set_code
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            condition,
            foil,
        })
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_code(&self) -> Option<&str> {
        self.set_code.as_deref()
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }

    pub fn is_foil(&self) -> bool {
        self.foil
    }
}

/// Layout of a single inventory line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineFormat {
    #[default]
    Delimited,
    Board,
}

/// Inventory parsing options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub format: LineFormat,
    /// Field separator for delimited lines
    pub delimiter: u8,
    /// Lines starting with this prefix (after trimming) are skipped
    pub comment_prefix: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            format: LineFormat::Delimited,
            delimiter: b',',
            comment_prefix: "#".to_string(),
        }
    }
}

impl ParseOptions {
    fn is_skipped(&self, line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.is_empty()
            || (!self.comment_prefix.is_empty() && trimmed.starts_with(&self.comment_prefix))
    }
}

/// Lazy iterator over the entries of an inventory source
pub struct InventoryLines<'a, R> {
    reader: R,
    buf: Vec<u8>,
    line_number: usize,
    options: &'a ParseOptions,
}

impl<R: BufRead> InventoryLines<'_, R> {
    /// Next raw line without its terminator; `None` at end of input
    fn read_line(&mut self) -> Option<io::Result<Vec<u8>>> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.ends_with(b"\n") {
                    self.buf.pop();
                    if self.buf.ends_with(b"\r") {
                        self.buf.pop();
                    }
                }
                Some(Ok(std::mem::take(&mut self.buf)))
            }
            Err(e) => Some(Err(e)),
        }
    }

    fn malformed(&self, line: String, reason: MalformedReason) -> ParseError {
        ParseError::Malformed(MalformedLineError {
            line_number: self.line_number,
            line,
            reason,
        })
    }
}

impl<R: BufRead> Iterator for InventoryLines<'_, R> {
    type Item = Result<InventoryEntry, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let bytes = match self.read_line()? {
                Ok(bytes) => bytes,
                Err(e) => return Some(Err(ParseError::Io(e))),
            };
            self.line_number += 1;

            let line = match String::from_utf8(bytes) {
                Ok(line) => line,
                Err(e) => {
                    let raw = String::from_utf8_lossy(e.as_bytes()).into_owned();
                    return Some(Err(self.malformed(raw, MalformedReason::InvalidEncoding)));
                }
            };

            if self.options.is_skipped(&line) {
                continue;
            }

            return Some(
                parse_line(&line, self.options).map_err(|reason| self.malformed(line, reason)),
            );
        }
    }
}

/// Parse entries lazily from a reader.
///
/// Restart by calling again on a fresh reader over the same source.
pub fn parse_inventory<R: BufRead>(reader: R, options: &ParseOptions) -> InventoryLines<'_, R> {
    InventoryLines {
        reader,
        buf: Vec::new(),
        line_number: 0,
        options,
    }
}

/// Read a whole inventory file, failing on the first malformed line
pub fn read_inventory(path: &Path, options: &ParseOptions) -> Result<Vec<InventoryEntry>, ParseError> {
    let file = File::open(path)?;
    parse_inventory(BufReader::new(file), options).collect()
}

/// Parse one non-blank, non-comment line
pub fn parse_line(line: &str, options: &ParseOptions) -> Result<InventoryEntry, MalformedReason> {
    match options.format {
        LineFormat::Delimited => parse_delimited(line, options.delimiter),
        LineFormat::Board => parse_board(line),
    }
}

/// Render an entry back into a line of the configured format
pub fn format_line(entry: &InventoryEntry, options: &ParseOptions) -> String {
    match options.format {
        LineFormat::Delimited => format_delimited(entry, options.delimiter),
        LineFormat::Board => format_board(entry),
    }
}

fn parse_quantity(raw: &str) -> Result<u32, MalformedReason> {
    if raw.is_empty() {
        return Err(MalformedReason::MissingQuantity);
    }
    let quantity: u32 = raw
        .parse()
        .map_err(|_| MalformedReason::InvalidQuantity(raw.to_string()))?;
    if quantity == 0 {
        return Err(MalformedReason::ZeroQuantity);
    }
    Ok(quantity)
}

fn parse_foil(raw: &str) -> Result<bool, MalformedReason> {
    match raw.to_lowercase().as_str() {
        "" | "false" | "0" | "no" | "n" => Ok(false),
        "true" | "1" | "yes" | "y" | "foil" => Ok(true),
        _ => Err(MalformedReason::UnknownFoil(raw.to_string())),
    }
}

fn parse_condition(raw: &str) -> Result<Condition, MalformedReason> {
    if raw.is_empty() {
        return Ok(Condition::default());
    }
    Condition::from_token(raw).ok_or_else(|| MalformedReason::UnknownCondition(raw.to_string()))
}

fn split_fields(line: &str, delimiter: u8) -> Result<Vec<String>, MalformedReason> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());

    let mut record = csv::StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => Ok(record.iter().map(str::to_string).collect()),
        Ok(false) => Ok(Vec::new()),
        Err(e) => Err(MalformedReason::Unparseable(e.to_string())),
    }
}

fn parse_delimited(line: &str, delimiter: u8) -> Result<InventoryEntry, MalformedReason> {
    let fields = split_fields(line, delimiter)?;
    if fields.len() > 5 {
        return Err(MalformedReason::TooManyFields(fields.len()));
    }
    let field = |i: usize| fields.get(i).map(String::as_str).unwrap_or("");

    let quantity = parse_quantity(field(0))?;
    let condition = parse_condition(field(3))?;
    let foil = parse_foil(field(4))?;
    InventoryEntry::new(quantity, field(1), Some(field(2)), condition, foil)
}

fn format_delimited(entry: &InventoryEntry, delimiter: u8) -> String {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let quantity = entry.quantity.to_string();
    let foil = if entry.foil { "true" } else { "false" };
    let record = [
        quantity.as_str(),
        entry.name.as_str(),
        entry.set_code().unwrap_or(""),
        entry.condition.token(),
        foil,
    ];

    // Writing into a Vec cannot fail on I/O; fall back to a plain join anyway
    let written = writer
        .write_record(record)
        .ok()
        .and_then(|_| writer.into_inner().ok())
        .and_then(|bytes| String::from_utf8(bytes).ok());

    match written {
        Some(line) => line.trim_end_matches(['\r', '\n']).to_string(),
        None => record.join(&(delimiter as char).to_string()),
    }
}

fn parse_board(line: &str) -> Result<InventoryEntry, MalformedReason> {
    let line = line.trim();
    let (raw_quantity, rest) = line
        .split_once(char::is_whitespace)
        .ok_or(MalformedReason::MissingName)?;
    let raw_quantity = raw_quantity.trim_end_matches(['x', 'X']);
    let quantity = parse_quantity(raw_quantity)?;

    // Peel `*F*` / `*SL*` style markers off the end
    let mut rest = rest.trim();
    let mut foil = false;
    let mut condition = Condition::default();
    while let Some((head, last)) = rest.rsplit_once(char::is_whitespace) {
        if !(last.len() >= 2 && last.starts_with('*') && last.ends_with('*')) {
            break;
        }
        let marker = &last[1..last.len() - 1];
        if marker.eq_ignore_ascii_case("F") {
            foil = true;
        } else {
            condition = Condition::from_token(marker)
                .ok_or_else(|| MalformedReason::UnknownCondition(marker.to_string()))?;
        }
        rest = head.trim_end();
    }

    // Optional trailing "(SET)" or "(SET:NUM)"
    let (name, set_code) = match rest.rsplit_once(" (") {
        Some((name, set_part)) if set_part.ends_with(')') => {
            let inner = &set_part[..set_part.len() - 1];
            let set = inner.split(':').next().unwrap_or(inner);
            (name, Some(set))
        }
        _ => (rest, None),
    };

    InventoryEntry::new(quantity, name, set_code, condition, foil)
}

fn format_board(entry: &InventoryEntry) -> String {
    let mut line = format!("{}x {}", entry.quantity, entry.name);
    if let Some(set) = entry.set_code() {
        line.push_str(&format!(" ({})", set));
    }
    if entry.foil {
        line.push_str(" *F*");
    }
    if let Some(symbol) = entry.condition.board_symbol() {
        line.push_str(&format!(" *{}*", symbol));
    }
    line
}

#[cfg(test)]
#[path = "inventory_tests.rs"]
mod tests;
