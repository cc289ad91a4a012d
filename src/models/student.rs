//! Student account models.

use serde::{Deserialize, Serialize};

/// A registered student. The password hash stays in the store and is never
/// part of this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub full_name: String,
    pub school: String,
    pub class: String,
    pub email: String,
    pub enrollment_number: String,
    pub guardian_name: String,
    pub guardian_phone: String,
    pub profile_id: String,
    pub created_at: String,
}

/// Request body for registering a student.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub enrollment_number: String,
    #[serde(default)]
    pub guardian_name: String,
    #[serde(default)]
    pub guardian_phone: String,
    #[serde(default)]
    pub password: String,
}

impl CreateStudentRequest {
    /// Names of required fields that are missing or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        for (name, value) in [
            ("fullName", &self.full_name),
            ("school", &self.school),
            ("class", &self.class),
            ("email", &self.email),
            ("enrollmentNumber", &self.enrollment_number),
            ("guardianName", &self.guardian_name),
            ("guardianPhone", &self.guardian_phone),
            ("password", &self.password),
        ] {
            if value.trim().is_empty() {
                missing.push(name);
            }
        }
        missing
    }
}

/// Login request shared by all account types.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_reports_blanks() {
        let request = CreateStudentRequest {
            full_name: "Ana Souza".to_string(),
            school: "Escola Municipal".to_string(),
            class: String::new(),
            email: "ana@example.com".to_string(),
            enrollment_number: "2024-001".to_string(),
            guardian_name: "  ".to_string(),
            guardian_phone: "81990000000".to_string(),
            password: "s3nh4".to_string(),
        };
        assert_eq!(request.missing_fields(), vec!["class", "guardianName"]);
    }
}
