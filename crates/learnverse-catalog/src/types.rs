//! Catalog domain types.
//!
//! The hierarchy is Branch → Year → Syllabus (curriculum) → Subject →
//! materials. Each detail document embeds summaries of its children and a
//! reference to its parent; the parent reference is what lets the bot walk
//! back up the tree without remembering anything between requests.

use serde::{Deserialize, Serialize};

use learnverse_core::{BranchId, FileId, SubjectId, SyllabusId, YearId};

use crate::de::{id_or_doc, null_default, opt_string_or_number, string_or_number, unit_number};

/// An academic branch, e.g. Computer Science.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    /// Catalog id.
    #[serde(rename = "_id")]
    pub id: BranchId,
    /// Display name.
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    /// Short code, e.g. `CS`.
    #[serde(default, deserialize_with = "null_default")]
    pub code: String,
    /// Years offered by the branch.
    #[serde(default, deserialize_with = "null_default")]
    pub years: Vec<YearRef>,
}

/// Summary of a year (as embedded in a branch) or a populated year
/// reference (as embedded in a syllabus).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRef {
    /// Catalog id.
    #[serde(rename = "_id")]
    pub id: YearId,
    /// Short code, e.g. `2024` or `TE`.
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub code: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

impl From<String> for YearRef {
    fn from(id: String) -> Self {
        Self {
            id: YearId::from(id),
            ..Self::default()
        }
    }
}

/// Reference from a year back to its branch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchRef {
    /// Catalog id, when present.
    #[serde(rename = "_id", default)]
    pub id: Option<BranchId>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// University the branch belongs to.
    #[serde(default)]
    pub university: Option<String>,
}

impl From<String> for BranchRef {
    fn from(id: String) -> Self {
        Self {
            id: Some(BranchId::from(id)),
            ..Self::default()
        }
    }
}

/// An academic year of a branch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Year {
    /// Catalog id.
    #[serde(rename = "_id")]
    pub id: YearId,
    /// Short code.
    #[serde(default, deserialize_with = "string_or_number")]
    pub code: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Parent branch.
    #[serde(default, deserialize_with = "id_or_doc")]
    pub branch: Option<BranchRef>,
    /// Curricula available in this year.
    #[serde(default, deserialize_with = "null_default")]
    pub syllabuses: Vec<SyllabusSummary>,
}

impl Year {
    /// Parent branch id, when the catalog supplied one.
    pub fn branch_id(&self) -> Option<&BranchId> {
        self.branch.as_ref().and_then(|b| b.id.as_ref())
    }

    /// Name if present, otherwise the code.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(&self.code)
    }
}

/// Summary of a curriculum embedded in a year.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyllabusSummary {
    /// Catalog id.
    #[serde(rename = "_id")]
    pub id: SyllabusId,
    /// Pattern year, e.g. `2019`.
    #[serde(default, deserialize_with = "string_or_number")]
    pub pattern_year: String,
}

/// A curriculum (syllabus pattern) within a year.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Syllabus {
    /// Catalog id.
    #[serde(rename = "_id")]
    pub id: SyllabusId,
    /// Pattern year.
    #[serde(default, deserialize_with = "string_or_number")]
    pub pattern_year: String,
    /// Parent year.
    #[serde(default, deserialize_with = "id_or_doc")]
    pub academic_year: Option<YearRef>,
    /// Subjects taught under this curriculum.
    #[serde(default, deserialize_with = "null_default")]
    pub subjects: Vec<SubjectSummary>,
}

impl Syllabus {
    /// Parent year id, when the catalog supplied one.
    pub fn year_id(&self) -> Option<&YearId> {
        self.academic_year.as_ref().map(|y| &y.id)
    }
}

/// Summary of a subject embedded in a syllabus.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    /// Catalog id.
    #[serde(rename = "_id")]
    pub id: SubjectId,
    /// Subject code.
    #[serde(default, deserialize_with = "string_or_number")]
    pub code: String,
    /// Subject name.
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
}

/// Reference from a subject back to its syllabus.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyllabusRef {
    /// Catalog id, when present.
    #[serde(rename = "_id", default)]
    pub id: Option<SyllabusId>,
    /// Pattern year.
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub pattern_year: Option<String>,
}

impl From<String> for SyllabusRef {
    fn from(id: String) -> Self {
        Self {
            id: Some(SyllabusId::from(id)),
            ..Self::default()
        }
    }
}

/// A downloadable file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    /// Catalog id.
    #[serde(rename = "_id")]
    pub id: FileId,
    /// Original file name.
    #[serde(default, deserialize_with = "null_default")]
    pub file_name: String,
}

impl FileRef {
    /// Link to the web viewer for this file.
    pub fn viewer_url(&self, web_base_url: &str) -> String {
        format!("{}/viewer/{}", web_base_url.trim_end_matches('/'), self.id)
    }
}

/// Lecture notes for one unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    /// Unit number; unparseable numbers sort last.
    #[serde(default, deserialize_with = "unit_number")]
    pub unit_number: u32,
    /// Note files.
    #[serde(default, deserialize_with = "null_default")]
    pub files: Vec<FileRef>,
}

/// Previous-year question papers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousYear {
    /// Mid-semester papers.
    #[serde(default, deserialize_with = "null_default")]
    pub insem: Vec<FileRef>,
    /// End-semester papers.
    #[serde(default, deserialize_with = "null_default")]
    pub endsem: Vec<FileRef>,
}

/// A subject and all of its materials.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    /// Catalog id.
    #[serde(rename = "_id")]
    pub id: SubjectId,
    /// Subject name.
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    /// Subject code.
    #[serde(default, deserialize_with = "string_or_number")]
    pub code: String,
    /// Parent syllabus.
    #[serde(default, deserialize_with = "id_or_doc")]
    pub syllabus: Option<SyllabusRef>,
    /// Notes, by unit.
    #[serde(default, deserialize_with = "null_default")]
    pub units: Vec<Unit>,
    /// Previous-year question papers.
    #[serde(default, deserialize_with = "null_default")]
    pub previous_year: PreviousYear,
    /// Solved-paper decodes.
    #[serde(default, deserialize_with = "null_default")]
    pub decodes: Vec<FileRef>,
    /// Reference books.
    #[serde(default, deserialize_with = "null_default")]
    pub books: Vec<FileRef>,
}

impl Subject {
    /// Parent syllabus id, when the catalog supplied one.
    pub fn syllabus_id(&self) -> Option<&SyllabusId> {
        self.syllabus.as_ref().and_then(|s| s.id.as_ref())
    }

    /// Pattern year of the parent syllabus, when known.
    pub fn pattern_year(&self) -> Option<&str> {
        self.syllabus.as_ref().and_then(|s| s.pattern_year.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_parses_with_years() {
        let b: Branch = serde_json::from_value(serde_json::json!({
            "_id": "b1", "name": "Computer Science", "code": "CS",
            "years": [{"_id": "y1", "code": "2024"}]
        }))
        .unwrap();
        assert_eq!(b.id.as_str(), "b1");
        assert_eq!(b.years[0].code.as_deref(), Some("2024"));
    }

    #[test]
    fn null_lists_become_empty() {
        let b: Branch = serde_json::from_value(serde_json::json!({
            "_id": "b1", "name": "CS", "code": "CS", "years": null
        }))
        .unwrap();
        assert!(b.years.is_empty());
    }

    #[test]
    fn year_branch_accepts_bare_id_or_document() {
        let bare: Year = serde_json::from_value(serde_json::json!({
            "_id": "y1", "code": 2024, "branch": "b1"
        }))
        .unwrap();
        assert_eq!(bare.branch_id().map(BranchId::as_str), Some("b1"));
        assert_eq!(bare.code, "2024");

        let doc: Year = serde_json::from_value(serde_json::json!({
            "_id": "y1", "code": "2024",
            "branch": {"_id": "b2", "university": "SPPU"}
        }))
        .unwrap();
        assert_eq!(doc.branch_id().map(BranchId::as_str), Some("b2"));
        assert_eq!(doc.branch.unwrap().university.as_deref(), Some("SPPU"));
    }

    #[test]
    fn pattern_year_accepts_numbers() {
        let s: Syllabus = serde_json::from_value(serde_json::json!({
            "_id": "s1", "patternYear": 2019,
            "academicYear": {"_id": "y1", "name": "Third Year", "code": "TE"}
        }))
        .unwrap();
        assert_eq!(s.pattern_year, "2019");
        assert_eq!(s.year_id().map(YearId::as_str), Some("y1"));
    }

    #[test]
    fn subject_parses_materials() {
        let s: Subject = serde_json::from_value(serde_json::json!({
            "_id": "u1", "name": "Operating Systems", "code": "310243",
            "syllabus": {"_id": "s1", "patternYear": "2019"},
            "units": [{"unitNumber": "2", "files": [{"_id": "f2", "fileName": "u2.pdf"}]}],
            "previousYear": {"insem": [{"_id": "f3", "fileName": "in.pdf"}], "endsem": null},
            "decodes": null
        }))
        .unwrap();
        assert_eq!(s.units[0].unit_number, 2);
        assert_eq!(s.previous_year.insem.len(), 1);
        assert!(s.previous_year.endsem.is_empty());
        assert!(s.decodes.is_empty());
        assert!(s.books.is_empty());
        assert_eq!(s.syllabus_id().map(SyllabusId::as_str), Some("s1"));
        assert_eq!(s.pattern_year(), Some("2019"));
    }

    #[test]
    fn unparseable_unit_number_sorts_last() {
        let u: Unit = serde_json::from_value(serde_json::json!({"unitNumber": "IV"})).unwrap();
        assert_eq!(u.unit_number, u32::MAX);
    }

    #[test]
    fn viewer_url_joins_without_double_slash() {
        let f = FileRef {
            id: FileId::new("abc"),
            file_name: "x.pdf".into(),
        };
        assert_eq!(
            f.viewer_url("https://learnverse.live/"),
            "https://learnverse.live/viewer/abc"
        );
    }

    #[test]
    fn year_display_name_prefers_name() {
        let y: Year = serde_json::from_value(serde_json::json!({"_id": "y", "code": "TE"})).unwrap();
        assert_eq!(y.display_name(), "TE");
        let y: Year =
            serde_json::from_value(serde_json::json!({"_id": "y", "code": "TE", "name": "Third Year"}))
                .unwrap();
        assert_eq!(y.display_name(), "Third Year");
    }
}
