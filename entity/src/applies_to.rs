use serde::{Deserialize, Serialize};

/// Targeting mode of a payment concept: the rule class used to compute
/// which students owe it. Exactly one mode holds at a time.
///
/// Serialized values match the wire labels of the upstream admin system,
/// which are Spanish.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum AppliesTo {
    /// Every eligible, non-deleted student
    #[serde(rename = "todos")]
    All,
    /// Students enrolled in any of the listed careers
    #[serde(rename = "carrera")]
    Career,
    /// Students currently in any of the listed semesters
    #[serde(rename = "semestre")]
    Semester,
    /// Students matching both a listed career and a listed semester
    #[serde(rename = "carrera_semestre")]
    CareerSemester,
    /// Exactly the listed student ids
    #[serde(rename = "estudiantes")]
    Students,
    /// Students carrying any of the listed applicant tags
    #[serde(rename = "tag")]
    Tag,
}

impl AppliesTo {
    /// True iff the concept applies to the whole student body.
    /// Must agree with `PaymentConcept::is_global`.
    pub fn is_global(&self) -> bool {
        matches!(self, AppliesTo::All)
    }

    /// Exceptions only make sense when the audience is rule-derived.
    /// An explicit student list already is the audience, so exceptions
    /// are forced empty in Students mode.
    pub fn allows_exceptions(&self) -> bool {
        !matches!(self, AppliesTo::Students)
    }
}

impl std::fmt::Display for AppliesTo {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppliesTo::All => write!(fmt, "todos"),
            AppliesTo::Career => write!(fmt, "carrera"),
            AppliesTo::Semester => write!(fmt, "semestre"),
            AppliesTo::CareerSemester => write!(fmt, "carrera_semestre"),
            AppliesTo::Students => write!(fmt, "estudiantes"),
            AppliesTo::Tag => write!(fmt, "tag"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_wire_labels() {
        assert_eq!(AppliesTo::All.to_string(), "todos");
        assert_eq!(AppliesTo::Career.to_string(), "carrera");
        assert_eq!(AppliesTo::Semester.to_string(), "semestre");
        assert_eq!(AppliesTo::CareerSemester.to_string(), "carrera_semestre");
        assert_eq!(AppliesTo::Students.to_string(), "estudiantes");
        assert_eq!(AppliesTo::Tag.to_string(), "tag");
    }

    #[test]
    fn test_only_all_is_global() {
        assert!(AppliesTo::All.is_global());
        assert!(!AppliesTo::Career.is_global());
        assert!(!AppliesTo::Students.is_global());
    }

    #[test]
    fn test_students_mode_disallows_exceptions() {
        assert!(!AppliesTo::Students.allows_exceptions());
        assert!(AppliesTo::All.allows_exceptions());
        assert!(AppliesTo::Tag.allows_exceptions());
    }
}
