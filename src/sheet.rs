use crate::config::Config;
use crate::filter::EMPLOYEE_ID_FIELD;
use crate::record::DirectoryEntry;
use crate::{Error, Result};
use serde::{Serialize, Deserialize};
use std::convert::TryFrom;
use std::mem::swap;
use tabled::builder::Builder;
use tabled::settings::Style;

/// `userAccountControl` flag for a disabled account
const ACCOUNTDISABLE: u32 = 0x2;

/// A typed view of one selected directory object
pub trait Sheet: TryFrom<Deconstructor, Error = Error> + Serialize {
    /// Fields needed to build the sheet
    const ATTRS: &'static [&'static str];

    /// Label and text for each line of the sheet
    fn lines(&self) -> Vec<(&'static str, String)>;

    /// Build the sheet for a selected entry under `config`
    fn from_entry(entry: DirectoryEntry, _config: &Config) -> Result<Self> {
        Self::try_from(Deconstructor::new(entry))
    }
}

/// Render a sheet as a two-column table
pub fn render<S: Sheet>(sheet: &S) -> String {
    let mut builder = Builder::default();
    builder.push_record(vec!["Property".to_owned(), "Value".to_owned()]);
    for (label, value) in sheet.lines() {
        builder.push_record(vec![label.to_owned(), value]);
    }
    let mut table = builder.build();
    table.with(Style::psql());
    table.to_string()
}

/// Pulls attributes out of an entry one at a time
pub struct Deconstructor(DirectoryEntry);

impl Deconstructor {
    pub fn new(entry: DirectoryEntry) -> Self {
        Deconstructor(entry)
    }

    fn take_dn(&mut self) -> String {
        let mut removed = String::new();
        swap(&mut removed, &mut self.0.dn);
        removed
    }

    fn take_all_or_none(&mut self, name: &str) -> Option<Vec<String>> {
        let key = self.0.attrs
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))
            .cloned()?;
        self.0.attrs.remove(&key)
    }

    fn take_one(&mut self, name: &'static str) -> Result<String> {
        self.maybe_take_one(name).ok_or(Error::AttributeMissing(name))
    }

    fn maybe_take_one(&mut self, name: &'static str) -> Option<String> {
        self.take_all_or_none(name)
            .and_then(|attrs| attrs.into_iter().next())
    }

    fn take_all(&mut self, name: &'static str) -> Vec<String> {
        self.take_all_or_none(name).unwrap_or_default()
    }

    /// Like `take_all`, but also accepts the `name;range=lo-hi` form AD
    /// uses for attributes with more values than it returns at once
    ///
    /// Only the first range is returned; later ranges need another search.
    fn take_ranged(&mut self, name: &'static str) -> Vec<String> {
        if let Some(values) = self.take_all_or_none(name) {
            return values;
        }
        let prefix = format!("{};range=", name.to_ascii_lowercase());
        let key = self.0.attrs
            .keys()
            .find(|key| key.to_ascii_lowercase().starts_with(&prefix))
            .cloned();
        key.and_then(|key| self.0.attrs.remove(&key)).unwrap_or_default()
    }
}

/// The `CN` of a distinguished name, or the whole name if it has none
pub fn common_name(dn: &str) -> &str {
    let first = dn.split(',').next().unwrap_or(dn);
    match first.find('=') {
        Some(at) if first[..at].trim().eq_ignore_ascii_case("cn") => first[at + 1..].trim(),
        _ => dn,
    }
}

fn optional(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn yes_no(value: bool) -> String {
    let text = if value { "Yes" } else { "No" };
    text.to_owned()
}

fn account_disabled(control: Option<String>) -> bool {
    control
        .and_then(|control| control.parse::<u32>().ok())
        .map(|control| control & ACCOUNTDISABLE != 0)
        .unwrap_or(false)
}

/// A user account
#[derive(Debug, Serialize, Deserialize)]
pub struct UserSheet {
    pub dn: String,
    /// Logon name
    pub account: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,
    pub disabled: bool,
    pub locked_out: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

impl Sheet for UserSheet {
    const ATTRS: &'static [&'static str] = &[
        "sAMAccountName", "displayName", "mail",
        "department", "title",
        "manager", "userAccountControl", "lockoutTime",
        "memberOf",
    ];

    fn lines(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Account", self.account.clone()),
            ("Name", optional(&self.name)),
            ("Email", optional(&self.email)),
            ("Employee ID", optional(&self.employee_id)),
            ("Department", optional(&self.department)),
            ("Title", optional(&self.title)),
            ("Manager", optional(&self.manager)),
            ("Disabled", yes_no(self.disabled)),
            ("Locked out", yes_no(self.locked_out)),
            ("Groups", self.groups.join("; ")),
            ("DN", self.dn.clone()),
        ]
    }

    /// The employee identifier is read from the configured field
    fn from_entry(entry: DirectoryEntry, config: &Config) -> Result<Self> {
        let mut entry = Deconstructor::new(entry);
        let employee_id = entry
            .take_all_or_none(&config.employee_id_field)
            .and_then(|values| values.into_iter().next());
        let mut sheet = UserSheet::try_from(entry)?;
        sheet.employee_id = employee_id;
        Ok(sheet)
    }
}

impl TryFrom<Deconstructor> for UserSheet {
    type Error = Error;

    fn try_from(mut entry: Deconstructor) -> Result<Self> {
        let account = entry.take_one("sAMAccountName")?;
        let name = entry.maybe_take_one("displayName");
        let email = entry.maybe_take_one("mail");
        let employee_id = entry.maybe_take_one(EMPLOYEE_ID_FIELD);
        let department = entry.maybe_take_one("department");
        let title = entry.maybe_take_one("title");
        let manager = entry
            .maybe_take_one("manager")
            .map(|dn| common_name(&dn).to_owned());
        let disabled = account_disabled(entry.maybe_take_one("userAccountControl"));
        let locked_out = entry
            .maybe_take_one("lockoutTime")
            .map(|time| time != "0")
            .unwrap_or(false);
        let groups = entry
            .take_all("memberOf")
            .iter()
            .map(|dn| common_name(dn).to_owned())
            .collect();
        let dn = entry.take_dn();
        Ok(UserSheet {
            dn, account, name, email, employee_id, department, title,
            manager, disabled, locked_out, groups,
        })
    }
}

/// A security or distribution group
#[derive(Debug, Serialize, Deserialize)]
pub struct GroupSheet {
    pub dn: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    /// On the configured protected list
    pub protected: bool,
}

impl Sheet for GroupSheet {
    const ATTRS: &'static [&'static str] = &[
        "sAMAccountName", "description", "member",
    ];

    fn lines(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Name", self.name.clone()),
            ("Description", optional(&self.description)),
            ("Members", self.members.join("; ")),
            ("Protected", yes_no(self.protected)),
            ("DN", self.dn.clone()),
        ]
    }

    fn from_entry(entry: DirectoryEntry, config: &Config) -> Result<Self> {
        let mut sheet = GroupSheet::try_from(Deconstructor::new(entry))?;
        sheet.protected = config.is_protected(&sheet.name, &sheet.dn);
        Ok(sheet)
    }
}

impl TryFrom<Deconstructor> for GroupSheet {
    type Error = Error;

    fn try_from(mut entry: Deconstructor) -> Result<Self> {
        let name = entry.take_one("sAMAccountName")?;
        let description = entry.maybe_take_one("description");
        let members = entry
            .take_ranged("member")
            .iter()
            .map(|dn| common_name(dn).to_owned())
            .collect();
        let dn = entry.take_dn();
        Ok(GroupSheet { dn, name, description, members, protected: false })
    }
}

/// A computer account
#[derive(Debug, Serialize, Deserialize)]
pub struct ComputerSheet {
    pub dn: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub disabled: bool,
}

impl Sheet for ComputerSheet {
    const ATTRS: &'static [&'static str] = &[
        "name", "dNSHostName",
        "operatingSystem", "operatingSystemVersion",
        "description", "userAccountControl",
    ];

    fn lines(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Name", self.name.clone()),
            ("Host name", optional(&self.host_name)),
            ("Operating system", optional(&self.operating_system)),
            ("OS version", optional(&self.os_version)),
            ("Description", optional(&self.description)),
            ("Disabled", yes_no(self.disabled)),
            ("DN", self.dn.clone()),
        ]
    }
}

impl TryFrom<Deconstructor> for ComputerSheet {
    type Error = Error;

    fn try_from(mut entry: Deconstructor) -> Result<Self> {
        let name = entry.take_one("name")?;
        let host_name = entry.maybe_take_one("dNSHostName");
        let operating_system = entry.maybe_take_one("operatingSystem");
        let os_version = entry.maybe_take_one("operatingSystemVersion");
        let description = entry.maybe_take_one("description");
        let disabled = account_disabled(entry.maybe_take_one("userAccountControl"));
        let dn = entry.take_dn();
        Ok(ComputerSheet {
            dn, name, host_name, operating_system, os_version, description, disabled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_sheet_from_entry() {
        let entry = DirectoryEntry::new("CN=John Doe,OU=Employees,DC=corp")
            .with("SAMAccountName", &["jdoe"])
            .with("displayName", &["John Doe"])
            .with("manager", &["CN=Manager A,OU=Employees,DC=corp"])
            .with("userAccountControl", &["514"])
            .with("lockoutTime", &["132514219840000000"])
            .with("memberOf", &["CN=Help Desk,OU=Groups,DC=corp", "CN=VPN Users,OU=Groups,DC=corp"]);

        let sheet = UserSheet::try_from(Deconstructor::new(entry)).unwrap();
        assert_eq!(sheet.account, "jdoe");
        assert_eq!(sheet.manager.as_deref(), Some("Manager A"));
        assert!(sheet.disabled);
        assert!(sheet.locked_out);
        assert_eq!(sheet.groups, vec!["Help Desk", "VPN Users"]);
        assert_eq!(sheet.dn, "CN=John Doe,OU=Employees,DC=corp");
        assert_eq!(sheet.email, None);
    }

    #[test]
    fn unlocked_enabled_user() {
        let entry = DirectoryEntry::new("CN=x")
            .with("sAMAccountName", &["x"])
            .with("userAccountControl", &["512"])
            .with("lockoutTime", &["0"]);
        let sheet = UserSheet::try_from(Deconstructor::new(entry)).unwrap();
        assert!(!sheet.disabled);
        assert!(!sheet.locked_out);
    }

    #[test]
    fn missing_required_attribute() {
        let entry = DirectoryEntry::new("CN=Orphan");
        assert!(matches!(
            GroupSheet::try_from(Deconstructor::new(entry)),
            Err(Error::AttributeMissing("sAMAccountName"))
        ));
    }

    #[test]
    fn ranged_members_are_read() {
        let entry = DirectoryEntry::new("CN=All Staff,OU=Groups,DC=corp")
            .with("sAMAccountName", &["All Staff"])
            .with("member;range=0-1499", &["CN=John Doe,OU=Employees,DC=corp", "CN=Jane Doe,OU=Employees,DC=corp"]);
        let sheet = GroupSheet::try_from(Deconstructor::new(entry)).unwrap();
        assert_eq!(sheet.members, vec!["John Doe", "Jane Doe"]);
    }

    #[test]
    fn configured_employee_field_is_read() {
        let entry = DirectoryEntry::new("CN=John Doe,OU=Employees,DC=corp")
            .with("sAMAccountName", &["jdoe"])
            .with("employeeID", &["stale"])
            .with("employeeNumber", &["1001"]);
        let config = Config { employee_id_field: "employeeNumber".into(), ..Config::default() };
        let sheet = UserSheet::from_entry(entry, &config).unwrap();
        assert_eq!(sheet.employee_id.as_deref(), Some("1001"));
    }

    #[test]
    fn common_names() {
        assert_eq!(common_name("CN=Help Desk,OU=Groups,DC=corp"), "Help Desk");
        assert_eq!(common_name("OU=Groups,DC=corp"), "OU=Groups,DC=corp");
        assert_eq!(common_name("plain"), "plain");
    }

    #[test]
    fn rendered_sheet_lists_properties() {
        let entry = DirectoryEntry::new("CN=WS-0042,OU=Workstations,DC=corp")
            .with("name", &["WS-0042"])
            .with("operatingSystem", &["Windows 11 Enterprise"]);
        let sheet = ComputerSheet::try_from(Deconstructor::new(entry)).unwrap();
        let text = render(&sheet);
        assert!(text.contains("WS-0042"));
        assert!(text.contains("Windows 11 Enterprise"));
        assert!(text.contains("Operating system"));
    }
}
