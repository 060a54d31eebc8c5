//! Borrowers and the people directory
//!
//! Students, academics and professionals are loaded from their own flat files
//! and handed to the ledger as keyed lookups. The ledger never owns them.
//!
//! ```text
//! students.txt: S01, P100, Ada Lovelace, 2003-12-10, ada@example.edu
//! staff.txt:    A01, P200, Alan Turing, 1970-06-23, alan@example.edu, academic, Computing
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::storage::codec::{format_optional_date, parse_optional_date, LineRecord};
use crate::storage::{RecordFile, StorageResult, Table};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Student {
    pub student_id: String,
    pub person_id: String,
    pub full_name: String,
    pub birth_date: Option<NaiveDate>,
    pub contact_info: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Academic {
    pub staff_id: String,
    pub person_id: String,
    pub full_name: String,
    pub birth_date: Option<NaiveDate>,
    pub contact_info: String,
    pub expertise: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Professional {
    pub staff_id: String,
    pub person_id: String,
    pub full_name: String,
    pub birth_date: Option<NaiveDate>,
    pub contact_info: String,
    pub department: String,
}

/// Which kind of person a borrower is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BorrowerKind {
    Student,
    Academic,
    Professional,
}

impl fmt::Display for BorrowerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BorrowerKind::Student => "Student",
            BorrowerKind::Academic => "Academic",
            BorrowerKind::Professional => "Professional",
        };
        f.write_str(label)
    }
}

/// Anyone allowed to borrow equipment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind")]
pub enum Borrower {
    Student(Student),
    Academic(Academic),
    Professional(Professional),
}

impl Borrower {
    /// Student ID for students, staff ID for staff
    pub fn borrower_id(&self) -> &str {
        match self {
            Borrower::Student(s) => &s.student_id,
            Borrower::Academic(a) => &a.staff_id,
            Borrower::Professional(p) => &p.staff_id,
        }
    }

    pub fn full_name(&self) -> &str {
        match self {
            Borrower::Student(s) => &s.full_name,
            Borrower::Academic(a) => &a.full_name,
            Borrower::Professional(p) => &p.full_name,
        }
    }

    pub fn kind(&self) -> BorrowerKind {
        match self {
            Borrower::Student(_) => BorrowerKind::Student,
            Borrower::Academic(_) => BorrowerKind::Academic,
            Borrower::Professional(_) => BorrowerKind::Professional,
        }
    }

    /// Students may only borrow under an academic's supervision
    pub fn requires_supervisor(&self) -> bool {
        matches!(self, Borrower::Student(_))
    }
}

impl From<Student> for Borrower {
    fn from(student: Student) -> Self {
        Borrower::Student(student)
    }
}

impl From<Academic> for Borrower {
    fn from(academic: Academic) -> Self {
        Borrower::Academic(academic)
    }
}

impl From<Professional> for Borrower {
    fn from(professional: Professional) -> Self {
        Borrower::Professional(professional)
    }
}

impl LineRecord for Student {
    const KIND: &'static str = "student";
    const FIELD_COUNT: usize = 5;

    fn record_id(&self) -> &str {
        &self.student_id
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.student_id.clone(),
            self.person_id.clone(),
            self.full_name.clone(),
            format_optional_date(self.birth_date),
            self.contact_info.clone(),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, String> {
        if fields[0].is_empty() {
            return Err("student id is empty".to_string());
        }
        Ok(Student {
            student_id: fields[0].to_string(),
            person_id: fields[1].to_string(),
            full_name: fields[2].to_string(),
            birth_date: parse_optional_date(fields[3])?,
            contact_info: fields[4].to_string(),
        })
    }
}

/// A line of the staff file, academic or professional
#[derive(Debug, Clone)]
enum StaffMember {
    Academic(Academic),
    Professional(Professional),
}

impl From<StaffMember> for Borrower {
    fn from(member: StaffMember) -> Self {
        match member {
            StaffMember::Academic(a) => Borrower::Academic(a),
            StaffMember::Professional(p) => Borrower::Professional(p),
        }
    }
}

impl LineRecord for StaffMember {
    const KIND: &'static str = "staff";
    const FIELD_COUNT: usize = 7;

    fn record_id(&self) -> &str {
        match self {
            StaffMember::Academic(a) => &a.staff_id,
            StaffMember::Professional(p) => &p.staff_id,
        }
    }

    fn to_fields(&self) -> Vec<String> {
        match self {
            StaffMember::Academic(a) => vec![
                a.staff_id.clone(),
                a.person_id.clone(),
                a.full_name.clone(),
                format_optional_date(a.birth_date),
                a.contact_info.clone(),
                "academic".to_string(),
                a.expertise.clone(),
            ],
            StaffMember::Professional(p) => vec![
                p.staff_id.clone(),
                p.person_id.clone(),
                p.full_name.clone(),
                format_optional_date(p.birth_date),
                p.contact_info.clone(),
                "professional".to_string(),
                p.department.clone(),
            ],
        }
    }

    fn from_fields(fields: &[&str]) -> Result<Self, String> {
        if fields[0].is_empty() {
            return Err("staff id is empty".to_string());
        }
        let staff_id = fields[0].to_string();
        let person_id = fields[1].to_string();
        let full_name = fields[2].to_string();
        let birth_date = parse_optional_date(fields[3])?;
        let contact_info = fields[4].to_string();
        let extra = fields[6].to_string();

        match fields[5].to_ascii_lowercase().as_str() {
            "academic" => Ok(StaffMember::Academic(Academic {
                staff_id,
                person_id,
                full_name,
                birth_date,
                contact_info,
                expertise: extra,
            })),
            "professional" => Ok(StaffMember::Professional(Professional {
                staff_id,
                person_id,
                full_name,
                birth_date,
                contact_info,
                department: extra,
            })),
            other => Err(format!("invalid staff type '{}'", other)),
        }
    }
}

/// Every known borrower, keyed by borrower ID
#[derive(Debug, Clone, Default)]
pub struct People {
    borrowers: BTreeMap<String, Borrower>,
}

impl People {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load students and staff from their files
    ///
    /// Missing files yield no entries; malformed lines are skipped.
    pub fn load(students_path: &Path, staff_path: &Path) -> StorageResult<Self> {
        let mut people = Self::new();

        let students: Table<Student> = Table::new(RecordFile::new(students_path));
        for student in students.load()? {
            people.insert(student);
        }

        let staff: Table<StaffMember> = Table::new(RecordFile::new(staff_path));
        for member in staff.load()? {
            people.insert(member);
        }

        Ok(people)
    }

    /// Add a borrower; the first entry wins on duplicate IDs
    pub fn insert(&mut self, borrower: impl Into<Borrower>) -> bool {
        let borrower = borrower.into();
        let id = borrower.borrower_id().to_string();
        if self.borrowers.contains_key(&id) {
            warn!(borrower_id = %id, "Ignoring duplicate borrower ID");
            return false;
        }
        self.borrowers.insert(id, borrower);
        true
    }

    pub fn borrower(&self, id: &str) -> Option<&Borrower> {
        self.borrowers.get(id)
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        match self.borrowers.get(id) {
            Some(Borrower::Student(s)) => Some(s),
            _ => None,
        }
    }

    pub fn academic(&self, id: &str) -> Option<&Academic> {
        match self.borrowers.get(id) {
            Some(Borrower::Academic(a)) => Some(a),
            _ => None,
        }
    }

    /// Whether `id` names a student (unknown IDs are not students)
    pub fn is_student(&self, id: &str) -> bool {
        self.student(id).is_some()
    }

    /// All borrowers ordered by ID
    pub fn iter(&self) -> impl Iterator<Item = &Borrower> {
        self.borrowers.values()
    }

    pub fn len(&self) -> usize {
        self.borrowers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.borrowers.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn student(id: &str, name: &str) -> Student {
        Student {
            student_id: id.to_string(),
            person_id: format!("P-{}", id),
            full_name: name.to_string(),
            birth_date: None,
            contact_info: format!("{}@example.edu", id.to_lowercase()),
        }
    }

    pub fn academic(id: &str, name: &str) -> Academic {
        Academic {
            staff_id: id.to_string(),
            person_id: format!("P-{}", id),
            full_name: name.to_string(),
            birth_date: None,
            contact_info: format!("{}@example.edu", id.to_lowercase()),
            expertise: "Physics".to_string(),
        }
    }

    pub fn professional(id: &str, name: &str) -> Professional {
        Professional {
            staff_id: id.to_string(),
            person_id: format!("P-{}", id),
            full_name: name.to_string(),
            birth_date: None,
            contact_info: format!("{}@example.edu", id.to_lowercase()),
            department: "Facilities".to_string(),
        }
    }

    /// S01/S02 students, A01/A02 academics, P01 professional
    pub fn people() -> People {
        let mut people = People::new();
        people.insert(student("S01", "Ada Lovelace"));
        people.insert(student("S02", "Grace Hopper"));
        people.insert(academic("A01", "Alan Turing"));
        people.insert(academic("A02", "Barbara Liskov"));
        people.insert(professional("P01", "Ken Thompson"));
        people
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_borrower_capabilities() {
        let student: Borrower = fixtures::student("S01", "Ada Lovelace").into();
        assert_eq!(student.borrower_id(), "S01");
        assert_eq!(student.full_name(), "Ada Lovelace");
        assert_eq!(student.kind(), BorrowerKind::Student);
        assert!(student.requires_supervisor());

        let academic: Borrower = fixtures::academic("A01", "Alan Turing").into();
        assert!(!academic.requires_supervisor());
        assert_eq!(academic.kind().to_string(), "Academic");
    }

    #[test]
    fn test_typed_lookups() {
        let people = fixtures::people();
        assert!(people.student("S01").is_some());
        assert!(people.student("A01").is_none());
        assert!(people.academic("A01").is_some());
        assert!(people.academic("P01").is_none());
        assert!(people.is_student("S02"));
        assert!(!people.is_student("NOPE"));
        assert_eq!(people.len(), 5);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let mut people = People::new();
        assert!(people.insert(fixtures::student("S01", "First")));
        assert!(!people.insert(fixtures::student("S01", "Second")));
        assert_eq!(people.borrower("S01").unwrap().full_name(), "First");
    }

    #[test]
    fn test_load_from_files() {
        let temp_dir = TempDir::new().unwrap();
        let students_path = temp_dir.path().join("students.txt");
        let staff_path = temp_dir.path().join("staff.txt");

        std::fs::write(
            &students_path,
            "S01, P100, Ada Lovelace, 2003-12-10, ada@example.edu\nbroken line\n",
        )
        .unwrap();
        std::fs::write(
            &staff_path,
            "A01, P200, Alan Turing, 1970-06-23, alan@example.edu, academic, Computing\n\
             P01, P300, Ken Thompson, N/A, ken@example.edu, Professional, IT Services\n\
             X01, P400, Nobody, N/A, x@example.edu, visitor, None\n",
        )
        .unwrap();

        let people = People::load(&students_path, &staff_path).unwrap();
        assert_eq!(people.len(), 3);
        assert_eq!(
            people.student("S01").unwrap().birth_date,
            NaiveDate::from_ymd_opt(2003, 12, 10)
        );
        assert_eq!(people.academic("A01").unwrap().expertise, "Computing");
        assert!(matches!(
            people.borrower("P01"),
            Some(Borrower::Professional(p)) if p.department == "IT Services"
        ));
        assert!(people.borrower("X01").is_none());
    }

    #[test]
    fn test_staff_line_keeps_type_column() {
        let line = "P01, P300, Ken Thompson, N/A, ken@example.edu, professional, IT Services";
        let member = StaffMember::decode(line).unwrap();
        assert_eq!(member.record_id(), "P01");
        assert_eq!(member.to_fields().len(), StaffMember::FIELD_COUNT);
        assert_eq!(member.encode(), line);

        let borrower: Borrower = member.into();
        assert_eq!(borrower.kind(), BorrowerKind::Professional);
    }

    #[test]
    fn test_load_missing_files() {
        let temp_dir = TempDir::new().unwrap();
        let people = People::load(
            &temp_dir.path().join("students.txt"),
            &temp_dir.path().join("staff.txt"),
        )
        .unwrap();
        assert!(people.is_empty());
    }
}
