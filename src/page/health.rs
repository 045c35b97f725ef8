use serde::Serialize;

/// Outcome of a successful status check or pair reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    /// Nothing needed repair
    #[default]
    Ok,
    /// At least one page was restored from its counterpart
    BackupRecovered,
}

impl Health {
    /// Combine two outcomes; any recovery wins.
    pub fn merge(self, other: Health) -> Health {
        if self.is_recovered() || other.is_recovered() {
            Health::BackupRecovered
        } else {
            Health::Ok
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Health::Ok => "ok",
            Health::BackupRecovered => "backup_recovered",
        }
    }

    pub fn is_recovered(self) -> bool {
        self == Health::BackupRecovered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge() {
        assert_eq!(Health::Ok.merge(Health::Ok), Health::Ok);
        assert_eq!(Health::Ok.merge(Health::BackupRecovered), Health::BackupRecovered);
        assert_eq!(Health::BackupRecovered.merge(Health::Ok), Health::BackupRecovered);
    }

    #[test]
    fn test_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Health::BackupRecovered).unwrap(),
            "\"backup_recovered\""
        );
    }
}
