use crate::db::DatabaseError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Serde goes through the same string form as the database columns.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

str_enum!(Gender {
    Male => "Male",
    Female => "Female",
    Other => "Other",
});

str_enum!(AuditAction {
    Insert => "INSERT",
    Update => "UPDATE",
    SoftDelete => "SOFT_DELETE",
    Restore => "RESTORE",
    Delete => "DELETE",
});

str_enum!(RecordTable {
    Doctors => "doctors",
    Patients => "patients",
});

str_enum!(Role {
    Admin => "admin",
    Staff => "staff",
});

str_enum!(Bucket {
    DoctorImages => "doctor-images",
    PatientReports => "patient-reports",
});

impl RecordTable {
    /// Human-readable entity name for error messages.
    pub fn entity_name(self) -> &'static str {
        match self {
            Self::Doctors => "Doctor",
            Self::Patients => "Patient",
        }
    }

    /// Bucket holding this table's attachments.
    pub fn bucket(self) -> Bucket {
        match self {
            Self::Doctors => Bucket::DoctorImages,
            Self::Patients => Bucket::PatientReports,
        }
    }

    /// `(url_column, path_column)` of the attachment owned by a row.
    pub(crate) fn attachment_columns(self) -> (&'static str, &'static str) {
        match self {
            Self::Doctors => ("image_url", "image_path"),
            Self::Patients => ("report_image_url", "report_image_path"),
        }
    }
}

impl Bucket {
    pub fn owner_table(self) -> RecordTable {
        match self {
            Self::DoctorImages => RecordTable::Doctors,
            Self::PatientReports => RecordTable::Patients,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn audit_action_uses_upper_snake_case() {
        assert_eq!(AuditAction::SoftDelete.as_str(), "SOFT_DELETE");
        assert_eq!(AuditAction::from_str("RESTORE").unwrap(), AuditAction::Restore);
    }

    #[test]
    fn unknown_gender_is_rejected() {
        let err = Gender::from_str("male").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }

    #[test]
    fn serde_uses_column_strings() {
        let json = serde_json::to_string(&AuditAction::SoftDelete).unwrap();
        assert_eq!(json, "\"SOFT_DELETE\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
        assert!(serde_json::from_str::<Role>("\"superuser\"").is_err());
    }

    #[test]
    fn every_table_maps_to_a_bucket_and_back() {
        for table in RecordTable::ALL {
            assert_eq!(table.bucket().owner_table(), *table);
        }
    }
}
