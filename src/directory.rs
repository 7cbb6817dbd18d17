use crate::filter::CompiledQuery;
use crate::record::DirectoryEntry;
use crate::Result;
use ldap3::{LdapConn, LdapResult, Scope, SearchEntry, SearchOptions, SearchResult};
use log::{debug, info};
use std::fmt;

/// LDAP result code for a search that hit its size limit
const SIZE_LIMIT_EXCEEDED: u32 = 4;

/// The kinds of directory object the tool looks up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    User,
    Group,
    Computer,
}

impl ObjectKind {
    /// Filter selecting only objects of this kind
    pub fn class_filter(self) -> &'static str {
        match self {
            ObjectKind::User => "(&(objectCategory=person)(objectClass=user))",
            ObjectKind::Group => "(objectClass=group)",
            ObjectKind::Computer => "(objectClass=computer)",
        }
    }

    /// Fields a bare search term is matched against
    pub fn search_fields(self) -> &'static [&'static str] {
        match self {
            ObjectKind::User => &["sAMAccountName", "displayName", "mail", "userPrincipalName"],
            ObjectKind::Group => &["sAMAccountName", "name", "displayName"],
            ObjectKind::Computer => &["name", "dNSHostName"],
        }
    }

    /// Combine a search filter with this kind's class filter
    pub fn restrict(self, filter: &str) -> String {
        format!("(&{}{})", self.class_filter(), filter)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ObjectKind::User => "user",
            ObjectKind::Group => "group",
            ObjectKind::Computer => "computer",
        };
        write!(f, "{}", name)
    }
}

/// Something that can run a compiled query
///
/// Results come back in server order, at most `query.cap` of them. An empty
/// list is a valid answer.
pub trait DirectoryClient {
    fn search(&mut self, query: &CompiledQuery) -> Result<Vec<DirectoryEntry>>;
}

/// A bound connection to an LDAP directory
pub struct Conn {
    base: String,
    conn: LdapConn,
}

impl Conn {
    /// Connect to `url` and bind as `username@domain`
    pub fn bind(
        url: &str,
        base: impl Into<String>,
        domain: &str,
        username: impl AsRef<str>,
        password: impl AsRef<str>,
    ) -> Result<Self> {
        let mut conn = LdapConn::new(url)?;
        let username = format!("{}@{}", username.as_ref(), domain);
        debug!("binding to {} as {}", url, username);
        conn.simple_bind(&username, password.as_ref())?.success()?;
        Ok(Conn { base: base.into(), conn })
    }
}

impl DirectoryClient for Conn {
    fn search(&mut self, query: &CompiledQuery) -> Result<Vec<DirectoryEntry>> {
        let base = query.scope.as_deref().unwrap_or(&self.base);
        let filter = query.kind.restrict(&query.filter);
        let attrs = if query.fields.is_empty() {
            vec!["*".to_owned()]
        } else {
            query.fields.clone()
        };
        info!("searching {} for {}", base, filter);

        // The cap is at most MAX_CAP so it always fits
        let limit = query.cap as i32;
        let SearchResult(results, status) = self.conn
            .with_search_options(SearchOptions::new().sizelimit(limit))
            .search(base, Scope::Subtree, &filter, attrs)?;
        check(status)?;

        let entries: Vec<DirectoryEntry> = results
            .into_iter()
            .map(SearchEntry::construct)
            .map(DirectoryEntry::from)
            .take(query.cap)
            .collect();
        debug!("{} {} entries returned", entries.len(), query.kind);
        Ok(entries)
    }
}

fn check(status: LdapResult) -> Result<()> {
    match status.rc {
        0 => Ok(()),
        SIZE_LIMIT_EXCEEDED => {
            debug!("size limit reached, results truncated");
            Ok(())
        }
        _ => Err(status.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn status(rc: u32) -> LdapResult {
        LdapResult {
            rc,
            matched: String::new(),
            text: String::new(),
            refs: Vec::new(),
            ctrls: Vec::new(),
        }
    }

    #[test]
    fn size_limit_is_not_an_error() {
        assert!(check(status(0)).is_ok());
        assert!(check(status(SIZE_LIMIT_EXCEEDED)).is_ok());
        assert!(matches!(check(status(32)), Err(Error::Ldap(_))));
        assert!(matches!(check(status(49)), Err(Error::InvalidCredentials)));
    }

    #[test]
    fn kind_restricts_filter() {
        assert_eq!(
            ObjectKind::Computer.restrict("(name=WS-01)"),
            "(&(objectClass=computer)(name=WS-01))",
        );
    }
}
