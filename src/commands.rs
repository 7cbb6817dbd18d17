//! The `user`, `group` and `computer` lookups.

use crate::config::Config;
use crate::directory::{DirectoryClient, ObjectKind};
use crate::filter::{FilterClause, QuerySpec};
use crate::record::DirectoryEntry;
use crate::select::{select, DisplayColumn, SelectOptions};
use crate::sheet::{self, ComputerSheet, GroupSheet, Sheet, UserSheet};
use crate::terminal::Terminal;
use crate::{Error, Result};
use log::{info, warn};

/// What the operator asked to look up
#[derive(Debug, Clone)]
pub struct Request {
    pub kind: ObjectKind,
    /// Each term must match one of `fields`
    pub terms: Vec<String>,
    /// Fields the terms are matched against; empty means the kind's defaults
    pub fields: Vec<String>,
    /// Any of these must match the employee identifier
    pub employee_ids: Vec<String>,
    pub literal: bool,
    pub cap: Option<usize>,
    pub scope: Option<String>,
}

impl Request {
    pub fn new(kind: ObjectKind) -> Self {
        Request {
            kind,
            terms: Vec::new(),
            fields: Vec::new(),
            employee_ids: Vec::new(),
            literal: false,
            cap: None,
            scope: None,
        }
    }

    /// Build the query, retrieving `attrs` for every result
    pub fn query(&self, config: &Config, attrs: &[&str]) -> Result<QuerySpec> {
        if !self.employee_ids.is_empty() && self.kind != ObjectKind::User {
            return Err(Error::Usage(format!("{}s have no employee ID", self.kind)));
        }

        let fields: Vec<String> = if self.fields.is_empty() {
            self.kind.search_fields().iter().map(|field| field.to_string()).collect()
        } else {
            self.fields.clone()
        };

        let mut query = QuerySpec::new(self.kind)
            .cap(self.cap.unwrap_or(config.default_cap))
            .scope(self.scope.clone())
            .literal(self.literal);
        for term in &self.terms {
            query = query.clause(FilterClause::new(vec![term.clone()], fields.clone()));
        }
        if !self.employee_ids.is_empty() {
            let clause = FilterClause::new(self.employee_ids.clone(), vec![config.employee_id_field.clone()]);
            query = query.clause(clause);
        }

        let mut wanted: Vec<String> = Vec::new();
        let columns = columns(self.kind, config);
        let column_fields = columns.iter().filter(|column| !column.is_index()).map(|column| column.field.as_str());
        for attr in attrs.iter().copied().chain(column_fields) {
            if !wanted.iter().any(|known| known.eq_ignore_ascii_case(attr)) {
                wanted.push(attr.to_owned());
            }
        }
        Ok(query.fields(wanted))
    }
}

/// Columns of the selection table for each kind
pub fn columns(kind: ObjectKind, config: &Config) -> Vec<DisplayColumn> {
    let mut columns = vec![DisplayColumn::index()];
    match kind {
        ObjectKind::User => {
            columns.push(DisplayColumn::new("Account", "sAMAccountName"));
            columns.push(DisplayColumn::new("Name", "displayName"));
            columns.push(DisplayColumn::new("Email", "mail"));
            columns.push(DisplayColumn::new("Employee ID", config.employee_id_field.as_str()));
            columns.push(DisplayColumn::new("Department", "department"));
        }
        ObjectKind::Group => {
            columns.push(DisplayColumn::new("Name", "sAMAccountName"));
            columns.push(DisplayColumn::new("Description", "description"));
        }
        ObjectKind::Computer => {
            columns.push(DisplayColumn::new("Name", "name"));
            columns.push(DisplayColumn::new("Host name", "dNSHostName"));
            columns.push(DisplayColumn::new("Operating system", "operatingSystem"));
        }
    }
    columns
}

/// Search and let the operator pick one result
///
/// `Ok(None)` means the operator cancelled. No matches at all is
/// `Error::NoResults`.
pub fn find<C, T>(
    client: &mut C,
    config: &Config,
    request: &Request,
    terminal: &mut T,
    attrs: &[&str],
) -> Result<Option<DirectoryEntry>>
where
    C: DirectoryClient + ?Sized,
    T: Terminal + ?Sized,
{
    let query = request.query(config, attrs)?.compile(&config.scope_rule())?;
    let entries = client.search(&query)?;
    if entries.is_empty() {
        return Err(Error::NoResults);
    }
    info!("{} {} matches", entries.len(), request.kind);
    choose(&entries, &columns(request.kind, config), terminal, config)
}

/// Run the selector, reprompting on bad input when configured to
pub fn choose<T>(
    entries: &[DirectoryEntry],
    columns: &[DisplayColumn],
    terminal: &mut T,
    config: &Config,
) -> Result<Option<DirectoryEntry>>
where
    T: Terminal + ?Sized,
{
    let options = SelectOptions::default();
    loop {
        match select(entries, columns, terminal, &options) {
            Ok(selection) => return Ok(selection.record().cloned()),
            Err(Error::Selection(fault)) if config.retry_on_invalid_selection => {
                warn!("invalid selection: {}", fault);
                terminal.show(&fault.to_string());
            }
            Err(error) => return Err(error),
        }
    }
}

/// Find one object and build its sheet
pub fn lookup<S, C, T>(
    client: &mut C,
    config: &Config,
    request: &Request,
    terminal: &mut T,
) -> Result<Option<S>>
where
    S: Sheet,
    C: DirectoryClient + ?Sized,
    T: Terminal + ?Sized,
{
    match find(client, config, request, terminal, S::ATTRS)? {
        Some(entry) => Ok(Some(S::from_entry(entry, config)?)),
        None => Ok(None),
    }
}

/// How a sheet is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Table,
    Json,
}

fn format<S: Sheet>(sheet: &S, format: Format) -> Result<String> {
    match format {
        Format::Table => Ok(sheet::render(sheet)),
        Format::Json => Ok(serde_json::to_string_pretty(sheet)?),
    }
}

/// Run one request end to end, returning the text to print
///
/// `Ok(None)` means nothing was selected.
pub fn run<C, T>(
    client: &mut C,
    config: &Config,
    request: &Request,
    terminal: &mut T,
    output: Format,
) -> Result<Option<String>>
where
    C: DirectoryClient + ?Sized,
    T: Terminal + ?Sized,
{
    match request.kind {
        ObjectKind::User => lookup::<UserSheet, _, _>(client, config, request, terminal)?
            .map(|sheet| format(&sheet, output))
            .transpose(),
        ObjectKind::Group => lookup::<GroupSheet, _, _>(client, config, request, terminal)?
            .map(|sheet| format(&sheet, output))
            .transpose(),
        ObjectKind::Computer => lookup::<ComputerSheet, _, _>(client, config, request, terminal)?
            .map(|sheet| format(&sheet, output))
            .transpose(),
    }
}
