use std::fmt::{self, Display};

use thiserror::Error;

/// Failure of the settings backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("unable to locate config dir")]
    ConfigDir,
}

/// A profile field that can fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    Name,
    Ip,
    Subnet,
    Gateway,
}

impl ProfileField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileField::Name => "name",
            ProfileField::Ip => "ip",
            ProfileField::Subnet => "subnet",
            ProfileField::Gateway => "gateway",
        }
    }
}

impl Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: ProfileField,
    pub reason: String,
}

/// Every field that failed validation, in form order.
///
/// Kept as a list so a UI can flag all bad inputs at once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid profile ({})", join(.0))]
pub struct ValidationErrors(pub Vec<ValidationError>);

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn fields(&self) -> Vec<ProfileField> {
        self.0.iter().map(|e| e.field).collect()
    }

    pub fn contains(&self, field: ProfileField) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }
}
