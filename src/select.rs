//! Narrowing a set of search results down to one.
//!
//! A lone result is returned straight away. Anything more is shown as a
//! numbered table and the operator is asked once for a row number. Looping
//! on bad input is up to the caller.

use crate::record::Record;
use crate::terminal::Terminal;
use crate::{Error, Result};
use tabled::builder::Builder;
use tabled::settings::Style;
use std::fmt;

/// Header marking the row-number column
pub const INDEX_HEADER: &str = "#";

/// One column of a selection table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayColumn {
    pub header: String,
    pub field: String,
}

impl DisplayColumn {
    pub fn new(header: impl Into<String>, field: impl Into<String>) -> Self {
        DisplayColumn { header: header.into(), field: field.into() }
    }

    /// The synthetic 1-based row number
    pub fn index() -> Self {
        DisplayColumn::new(INDEX_HEADER, "")
    }

    pub fn is_index(&self) -> bool {
        self.header == INDEX_HEADER
    }
}

/// How the prompt behaves
#[derive(Debug, Clone)]
pub struct SelectOptions {
    pub prompt: String,
    /// Accept `0` as an explicit cancel
    pub allow_zero_cancel: bool,
}

impl Default for SelectOptions {
    fn default() -> Self {
        SelectOptions {
            prompt: "Select an entry (empty to cancel)".to_owned(),
            allow_zero_cancel: false,
        }
    }
}

/// Outcome of a selection
#[derive(Debug, PartialEq)]
pub enum Selection<'a, R> {
    /// `index` is the 0-based position of `record` in the input
    Picked { index: usize, record: &'a R },
    Cancelled,
}

impl<'a, R> Selection<'a, R> {
    pub fn record(&self) -> Option<&'a R> {
        match self {
            Selection::Picked { record, .. } => Some(*record),
            Selection::Cancelled => None,
        }
    }
}

/// Operator input that picks nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionFault {
    NoRecords,
    NotANumber(String),
    OutOfRange { choice: i64, min: usize, max: usize },
}

impl fmt::Display for SelectionFault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use SelectionFault::*;
        match self {
            NoRecords => write!(f, "There is nothing to select from"),
            NotANumber(input) => write!(f, "{:?} is not a number", input),
            OutOfRange { choice, min, max } => {
                write!(f, "{} is not between {} and {}", choice, min, max)
            }
        }
    }
}

impl std::error::Error for SelectionFault {}

/// Pick one record, asking the operator only when there is a choice
pub fn select<'a, R, T>(
    records: &'a [R],
    columns: &[DisplayColumn],
    terminal: &mut T,
    options: &SelectOptions,
) -> Result<Selection<'a, R>>
where
    R: Record,
    T: Terminal + ?Sized,
{
    match records {
        [] => Err(SelectionFault::NoRecords.into()),
        [only] => Ok(Selection::Picked { index: 0, record: only }),
        _ => {
            terminal.show(&render_table(records, columns));
            let input = terminal.read_line(&options.prompt)?;
            match parse_choice(&input, records.len(), options.allow_zero_cancel)? {
                Some(index) => Ok(Selection::Picked { index, record: &records[index] }),
                None => Ok(Selection::Cancelled),
            }
        }
    }
}

/// Turn operator input into a 0-based index; `None` means cancel
pub fn parse_choice(input: &str, count: usize, allow_zero: bool) -> std::result::Result<Option<usize>, SelectionFault> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    let choice: i64 = input
        .parse()
        .map_err(|_| SelectionFault::NotANumber(input.to_owned()))?;
    let min = if allow_zero { 0 } else { 1 };
    if choice < min as i64 || choice > count as i64 {
        return Err(SelectionFault::OutOfRange { choice, min, max: count });
    }
    if choice == 0 {
        Ok(None)
    } else {
        Ok(Some(choice as usize - 1))
    }
}

/// Header plus one row of cells per record
pub fn table_rows<R: Record>(records: &[R], columns: &[DisplayColumn]) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(records.len() + 1);
    rows.push(columns.iter().map(|column| column.header.clone()).collect());
    for (index, record) in records.iter().enumerate() {
        let row = columns
            .iter()
            .map(|column| {
                if column.is_index() {
                    (index + 1).to_string()
                } else {
                    record.display(&column.field)
                }
            })
            .collect();
        rows.push(row);
    }
    rows
}

pub fn render_table<R: Record>(records: &[R], columns: &[DisplayColumn]) -> String {
    let mut builder = Builder::default();
    for row in table_rows(records, columns) {
        builder.push_record(row);
    }
    let mut table = builder.build();
    table.with(Style::psql());
    table.to_string()
}

impl From<SelectionFault> for Error {
    fn from(error: SelectionFault) -> Self {
        Error::Selection(error)
    }
}
