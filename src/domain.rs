use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MmashError;

/// One per-subject table of the MMASH archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    Sleep,
    Activity,
    UserInfo,
    Questionnaire,
    Rr,
}

impl TableName {
    pub const ALL: [TableName; 5] = [
        TableName::Sleep,
        TableName::Activity,
        TableName::UserInfo,
        TableName::Questionnaire,
        TableName::Rr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::Sleep => "sleep",
            TableName::Activity => "activity",
            TableName::UserInfo => "user_info",
            TableName::Questionnaire => "questionnaire",
            TableName::Rr => "rr",
        }
    }

    /// Source file inside a subject directory. Capitalisation follows the archive.
    pub fn file_name(&self) -> &'static str {
        match self {
            TableName::Sleep => "sleep.csv",
            TableName::Activity => "Activity.csv",
            TableName::UserInfo => "user_info.csv",
            TableName::Questionnaire => "questionnaire.csv",
            TableName::Rr => "RR.csv",
        }
    }

    /// Rendering of the allowed set used in configuration errors.
    pub fn allowed() -> String {
        let names = Self::ALL
            .iter()
            .map(|table| format!("'{}'", table.as_str()))
            .collect::<Vec<_>>();
        format!("[{}]", names.join(", "))
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TableName {
    type Err = MmashError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|table| table.as_str() == value)
            .ok_or_else(|| MmashError::UnsupportedTable {
                table: value.to_string(),
                allowed: Self::allowed(),
            })
    }
}

/// Subject directory name; doubles as patient id and visit id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubjectId {
    type Err = MmashError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.is_empty() || value.contains('/') {
            return Err(MmashError::Filesystem(format!(
                "invalid subject directory name: {value:?}"
            )));
        }
        Ok(Self(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_table_names() {
        for table in TableName::ALL {
            let parsed: TableName = table.as_str().parse().unwrap();
            assert_eq!(parsed, table);
        }
    }

    #[test]
    fn table_names_are_case_sensitive() {
        let err = "Activity".parse::<TableName>().unwrap_err();
        assert_matches!(err, MmashError::UnsupportedTable { table, .. } if table == "Activity");
    }

    #[test]
    fn file_names_keep_archive_capitalisation() {
        assert_eq!(TableName::Activity.file_name(), "Activity.csv");
        assert_eq!(TableName::Rr.file_name(), "RR.csv");
        assert_eq!(TableName::UserInfo.file_name(), "user_info.csv");
    }

    #[test]
    fn subject_id_rejects_empty() {
        assert_matches!("".parse::<SubjectId>(), Err(MmashError::Filesystem(_)));
        assert_eq!("user_1".parse::<SubjectId>().unwrap().as_str(), "user_1");
    }
}
