//! Compiles search criteria into a single LDAP filter.
//!
//! Criteria are grouped into clauses. Every clause is an OR over each of its
//! (field, argument) pairs and the clauses are ANDed together, so
//! `[(["jdoe"], ["sAMAccountName", "mail"]), (["IT*"], ["department"])]`
//! becomes
//!
//! ```text
//! (&(|(sAMAccountName=jdoe)(mail=jdoe))(department=IT*))
//! ```
//!
//! The output text follows the input order exactly.

use crate::directory::ObjectKind;
use std::fmt;

/// Results returned when the caller asks for no particular cap
pub const DEFAULT_CAP: usize = 20;
/// Largest cap a query may ask for
pub const MAX_CAP: usize = 100;
/// Field holding the organisation's employee identifier
pub const EMPLOYEE_ID_FIELD: &str = "employeeID";
/// Only accounts under this sub-tree carry employee identifiers
pub const EMPLOYEE_SCOPE: &str = "OU=Employees,OU=Accounts,DC=corp,DC=example,DC=com";

/// A set of arguments, any of which may match any of a set of fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterClause {
    pub arguments: Vec<String>,
    pub fields: Vec<String>,
}

impl FilterClause {
    pub fn new<A, F>(arguments: A, fields: F) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        FilterClause {
            arguments: arguments.into_iter().map(Into::into).collect(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    fn targets(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.eq_ignore_ascii_case(field))
    }
}

/// Forces queries touching one field into a fixed sub-tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeRule {
    pub field: String,
    pub scope: String,
}

impl Default for ScopeRule {
    fn default() -> Self {
        ScopeRule {
            field: EMPLOYEE_ID_FIELD.to_owned(),
            scope: EMPLOYEE_SCOPE.to_owned(),
        }
    }
}

/// Everything needed to run one search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub clauses: Vec<FilterClause>,
    pub kind: ObjectKind,
    pub cap: usize,
    /// Fields to retrieve; empty asks for every user attribute
    pub fields: Vec<String>,
    pub scope: Option<String>,
    /// Treat wildcard characters in arguments as plain text
    pub literal: bool,
}

impl QuerySpec {
    pub fn new(kind: ObjectKind) -> Self {
        QuerySpec {
            clauses: Vec::new(),
            kind,
            cap: DEFAULT_CAP,
            fields: Vec::new(),
            scope: None,
            literal: false,
        }
    }

    pub fn clause(mut self, clause: FilterClause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }

    pub fn fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn scope(mut self, scope: Option<String>) -> Self {
        self.scope = scope;
        self
    }

    pub fn literal(mut self, literal: bool) -> Self {
        self.literal = literal;
        self
    }

    /// Validate and turn into the form a directory client executes
    pub fn compile(&self, rule: &ScopeRule) -> Result<CompiledQuery, ValidationFault> {
        if !(1..=MAX_CAP).contains(&self.cap) {
            return Err(ValidationFault::CapOutOfRange(self.cap));
        }
        let filter = build_filter(&self.clauses, self.literal)?;
        let scope = if self.clauses.iter().any(|clause| clause.targets(&rule.field)) {
            Some(rule.scope.clone())
        } else {
            self.scope.clone()
        };
        Ok(CompiledQuery {
            filter,
            kind: self.kind,
            fields: self.fields.clone(),
            cap: self.cap,
            scope,
        })
    }
}

/// A validated query ready to send to the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub filter: String,
    pub kind: ObjectKind,
    pub fields: Vec<String>,
    pub cap: usize,
    pub scope: Option<String>,
}

/// Build the filter text for a list of clauses
///
/// An empty list is rejected rather than turned into a directory-wide scan.
pub fn build_filter(clauses: &[FilterClause], literal: bool) -> Result<String, ValidationFault> {
    if clauses.is_empty() {
        return Err(ValidationFault::NoClauses);
    }

    let mut parts = Vec::with_capacity(clauses.len());
    for (index, clause) in clauses.iter().enumerate() {
        parts.push(clause_filter(index, clause, literal)?);
    }

    if parts.len() == 1 {
        Ok(parts.remove(0))
    } else {
        Ok(format!("(&{})", parts.concat()))
    }
}

fn clause_filter(index: usize, clause: &FilterClause, literal: bool) -> Result<String, ValidationFault> {
    if clause.arguments.is_empty() {
        return Err(ValidationFault::NoArguments { clause: index });
    }
    if clause.fields.is_empty() {
        return Err(ValidationFault::NoFields { clause: index });
    }
    if clause.arguments.iter().any(|argument| argument.is_empty()) {
        return Err(ValidationFault::BlankArgument { clause: index });
    }
    if let Some(field) = clause.fields.iter().find(|field| !valid_field(field)) {
        return Err(ValidationFault::InvalidField { clause: index, field: field.clone() });
    }

    let mut conditions = Vec::with_capacity(clause.fields.len() * clause.arguments.len());
    for field in &clause.fields {
        for argument in &clause.arguments {
            conditions.push(format!("({}={})", field, escape(argument, literal)));
        }
    }

    if conditions.len() == 1 {
        Ok(conditions.remove(0))
    } else {
        Ok(format!("(|{})", conditions.concat()))
    }
}

/// An attribute name or numeric OID, optionally with `;options`
fn valid_field(field: &str) -> bool {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == ';')
}

/// Encode an argument as an LDAP assertion value
///
/// Parentheses, backslash and NUL are always escaped. In literal mode `*`
/// is escaped too; otherwise `*` stays a wildcard and the glob `?`, which
/// LDAP cannot express, widens to `*`. Runs of wildcards collapse to one.
pub fn escape(argument: &str, literal: bool) -> String {
    let mut escaped = String::with_capacity(argument.len());
    for c in argument.chars() {
        match c {
            '*' | '?' if !literal => {
                if !escaped.ends_with('*') {
                    escaped.push('*');
                }
            }
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// A query that can never be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFault {
    NoClauses,
    NoArguments { clause: usize },
    NoFields { clause: usize },
    BlankArgument { clause: usize },
    InvalidField { clause: usize, field: String },
    CapOutOfRange(usize),
}

impl fmt::Display for ValidationFault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ValidationFault::*;
        match self {
            NoClauses => write!(f, "No search criteria were given"),
            NoArguments { clause } => write!(f, "Criterion {} has no search terms", clause + 1),
            NoFields { clause } => write!(f, "Criterion {} has no fields to search", clause + 1),
            BlankArgument { clause } => write!(f, "Criterion {} has an empty search term", clause + 1),
            InvalidField { clause, field } => {
                write!(f, "Criterion {} names an invalid field: {:?}", clause + 1, field)
            }
            CapOutOfRange(cap) => {
                write!(f, "Result limit {} is outside 1 to {}", cap, MAX_CAP)
            }
        }
    }
}

impl std::error::Error for ValidationFault {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_pair_is_one_condition() {
        let clauses = [FilterClause::new(vec!["jdoe"], vec!["sAMAccountName"])];
        assert_eq!(build_filter(&clauses, false).unwrap(), "(sAMAccountName=jdoe)");
    }

    #[test]
    fn pairs_nest_field_then_argument() {
        let clauses = [FilterClause::new(vec!["jdoe", "jsmith"], vec!["sAMAccountName", "mail"])];
        assert_eq!(
            build_filter(&clauses, false).unwrap(),
            "(|(sAMAccountName=jdoe)(sAMAccountName=jsmith)(mail=jdoe)(mail=jsmith))",
        );
    }

    #[test]
    fn clauses_join_in_order() {
        let clauses = [
            FilterClause::new(vec!["j*"], vec!["givenName", "sn"]),
            FilterClause::new(vec!["IT"], vec!["department"]),
        ];
        assert_eq!(
            build_filter(&clauses, false).unwrap(),
            "(&(|(givenName=j*)(sn=j*))(department=IT))",
        );

        let reversed = [clauses[1].clone(), clauses[0].clone()];
        assert_eq!(
            build_filter(&reversed, false).unwrap(),
            "(&(department=IT)(|(givenName=j*)(sn=j*)))",
        );
    }

    #[test]
    fn literal_escaping() {
        assert_eq!(escape("JDOE", true), "JDOE");
        assert_eq!(escape("JDOE", false), "JDOE");
        assert_eq!(escape("a*b?[c]", true), "a\\2ab?[c]");
        assert_eq!(escape("a*?b", false), "a*b");
    }

    #[test]
    fn structural_characters_always_escaped() {
        assert_eq!(escape("x)(uid=*", false), "x\\29\\28uid=*");
        assert_eq!(escape("back\\slash", true), "back\\5cslash");
        assert_eq!(escape("nul\0", false), "nul\\00");
    }

    #[test]
    fn empty_inputs_are_rejected() {
        assert_eq!(build_filter(&[], false), Err(ValidationFault::NoClauses));

        let no_args = [FilterClause::new(Vec::<String>::new(), vec!["cn"])];
        assert_eq!(build_filter(&no_args, false), Err(ValidationFault::NoArguments { clause: 0 }));

        let no_fields = [
            FilterClause::new(vec!["x"], vec!["cn"]),
            FilterClause::new(vec!["x"], Vec::<String>::new()),
        ];
        assert_eq!(build_filter(&no_fields, false), Err(ValidationFault::NoFields { clause: 1 }));

        let blank = [FilterClause::new(vec![""], vec!["cn"])];
        assert_eq!(build_filter(&blank, false), Err(ValidationFault::BlankArgument { clause: 0 }));
    }

    #[test]
    fn malformed_field_names_are_rejected() {
        let clauses = [FilterClause::new(vec!["x"], vec!["cn)(uid"])];
        assert!(matches!(
            build_filter(&clauses, false),
            Err(ValidationFault::InvalidField { clause: 0, .. })
        ));
        assert!(valid_field("userCertificate;binary"));
        assert!(valid_field("1.2.840.113556.1.4.221"));
        assert!(!valid_field(""));
    }

    #[test]
    fn employee_field_forces_scope() {
        let rule = ScopeRule::default();
        let query = QuerySpec::new(ObjectKind::User)
            .clause(FilterClause::new(vec!["jdoe"], vec!["sAMAccountName"]))
            .clause(FilterClause::new(vec!["12345"], vec!["EmployeeID"]))
            .scope(Some("OU=Elsewhere,DC=corp,DC=example,DC=com".into()))
            .compile(&rule)
            .unwrap();
        assert_eq!(query.scope.as_deref(), Some(EMPLOYEE_SCOPE));
    }

    #[test]
    fn caller_scope_kept_otherwise() {
        let query = QuerySpec::new(ObjectKind::Group)
            .clause(FilterClause::new(vec!["Help*"], vec!["name"]))
            .scope(Some("OU=Groups,DC=corp,DC=example,DC=com".into()))
            .compile(&ScopeRule::default())
            .unwrap();
        assert_eq!(query.scope.as_deref(), Some("OU=Groups,DC=corp,DC=example,DC=com"));
        assert_eq!(query.cap, DEFAULT_CAP);
        assert_eq!(query.kind, ObjectKind::Group);
    }

    #[test]
    fn cap_bounds() {
        let base = QuerySpec::new(ObjectKind::Computer)
            .clause(FilterClause::new(vec!["WS-*"], vec!["name"]));
        let rule = ScopeRule::default();
        assert_eq!(base.clone().cap(0).compile(&rule), Err(ValidationFault::CapOutOfRange(0)));
        assert_eq!(base.clone().cap(101).compile(&rule), Err(ValidationFault::CapOutOfRange(101)));
        assert!(base.clone().cap(1).compile(&rule).is_ok());
        assert!(base.cap(MAX_CAP).compile(&rule).is_ok());
    }

    #[test]
    fn literal_mode_reaches_filter() {
        let query = QuerySpec::new(ObjectKind::User)
            .clause(FilterClause::new(vec!["a*"], vec!["cn"]))
            .literal(true)
            .compile(&ScopeRule::default())
            .unwrap();
        assert_eq!(query.filter, "(cn=a\\2a)");
    }
}
