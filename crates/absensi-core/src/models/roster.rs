//! Roster entities: classes, students and special-class memberships.

use serde::{Deserialize, Serialize};

/// Value of `status_aktif` for students on the active roster.
pub const ACTIVE: &str = "Aktif";
/// Value of `status_aktif` for students who left or graduated.
pub const INACTIVE: &str = "Nonaktif";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolClass {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "nama_kelas")]
    pub name: String,
    /// Special/subject classes take their roster from explicit memberships.
    #[serde(rename = "khusus", default)]
    pub special: bool,
}

impl SchoolClass {
    /// Class ids are upper-case and trimmed; the display name equals the id.
    /// Path separators become `-` since the id ends up in document paths and
    /// report file names.
    pub fn normalize_id(raw: &str) -> String {
        raw.trim().to_uppercase().replace(['/', '\\'], "-")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "nama_siswa")]
    pub name: String,
    pub nis: String,
    #[serde(rename = "id_kelas")]
    pub class_id: String,
    #[serde(rename = "status_aktif", default = "default_active")]
    pub status: String,
}

fn default_active() -> String {
    ACTIVE.to_string()
}

impl Student {
    pub fn is_active(&self) -> bool {
        self.status == ACTIVE
    }
}

/// A student waiting in the import queue, not yet written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudent {
    #[serde(rename = "nama")]
    pub name: String,
    pub nis: String,
    #[serde(rename = "kelas")]
    pub class_id: String,
}

impl NewStudent {
    pub fn new(name: &str, nis: &str, class_id: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            nis: nis.trim().to_string(),
            class_id: SchoolClass::normalize_id(class_id),
        }
    }

    pub fn into_student(self) -> Student {
        Student {
            id: String::new(),
            name: self.name,
            nis: self.nis,
            class_id: self.class_id,
            status: ACTIVE.to_string(),
        }
    }
}

/// Partial update of a student document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub nis: Option<String>,
    pub class_id: Option<String>,
    pub active: Option<bool>,
}

impl StudentPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.nis.is_none() && self.class_id.is_none() && self.active.is_none()
    }
}

/// One student as they appear on a class's active roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterMember {
    pub id: String,
    pub name: String,
    pub nis: String,
}

impl From<&Student> for RosterMember {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id.clone(),
            name: student.name.clone(),
            nis: student.nis.clone(),
        }
    }
}

/// Membership of a student in a special class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMembership {
    #[serde(rename = "id_kelas")]
    pub class_id: String,
    #[serde(rename = "id_siswa")]
    pub student_id: String,
}

impl ClassMembership {
    pub fn doc_id(&self) -> String {
        format!("{}_{}", self.class_id, self.student_id)
    }
}

/// Sort roster members by name (case-insensitive), ties by id.
pub fn sort_roster(members: &mut [RosterMember]) {
    members.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
}
