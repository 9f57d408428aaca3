//! The fixed policy-category vocabulary and the query-only "All Categories"
//! sentinel.
//!
//! Chunks always carry a concrete [`PolicyCategory`]; `General` is the
//! permanent default for documents ingested without one. The sentinel lives
//! only in [`CategoryFilter`] and is never stored.

/// Classification tag attached to every stored chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PolicyCategory {
    Recruitment,
    Onboarding,
    CompensationAndBenefits,
    PerformanceManagement,
    LearningAndDevelopment,
    EmployeeRelations,
    HealthAndSafety,
    Termination,
    CodeOfConduct,
    DiversityAndInclusion,
    RemoteWork,
    LeavePolicies,
    Other,
    /// Default for chunks ingested without an explicit category.
    #[default]
    General,
}

impl PolicyCategory {
    /// Every storable category, in display order.
    pub const ALL: [PolicyCategory; 14] = [
        PolicyCategory::Recruitment,
        PolicyCategory::Onboarding,
        PolicyCategory::CompensationAndBenefits,
        PolicyCategory::PerformanceManagement,
        PolicyCategory::LearningAndDevelopment,
        PolicyCategory::EmployeeRelations,
        PolicyCategory::HealthAndSafety,
        PolicyCategory::Termination,
        PolicyCategory::CodeOfConduct,
        PolicyCategory::DiversityAndInclusion,
        PolicyCategory::RemoteWork,
        PolicyCategory::LeavePolicies,
        PolicyCategory::Other,
        PolicyCategory::General,
    ];

    /// The label used on the wire and in user-facing listings.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyCategory::Recruitment => "Recruitment",
            PolicyCategory::Onboarding => "Onboarding",
            PolicyCategory::CompensationAndBenefits => "Compensation & Benefits",
            PolicyCategory::PerformanceManagement => "Performance Management",
            PolicyCategory::LearningAndDevelopment => "Learning & Development",
            PolicyCategory::EmployeeRelations => "Employee Relations",
            PolicyCategory::HealthAndSafety => "Health & Safety",
            PolicyCategory::Termination => "Termination",
            PolicyCategory::CodeOfConduct => "Code of Conduct",
            PolicyCategory::DiversityAndInclusion => "Diversity & Inclusion",
            PolicyCategory::RemoteWork => "Remote Work",
            PolicyCategory::LeavePolicies => "Leave Policies",
            PolicyCategory::Other => "Other",
            PolicyCategory::General => "General",
        }
    }

    /// Exact-label lookup. Returns `None` for anything outside the vocabulary,
    /// including the query-only sentinel.
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(label))
    }

    /// Interprets a label read back from the store. Unknown or empty labels
    /// fold into `General`, matching how missing categories are ingested.
    pub fn from_stored(label: &str) -> Self {
        Self::parse(label).unwrap_or_default()
    }
}

impl std::fmt::Display for PolicyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retrieval-time category constraint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    /// The universal sentinel: search every category.
    #[default]
    All,
    /// Equality filter on a single category.
    Only(PolicyCategory),
}

impl CategoryFilter {
    /// Label of the universal sentinel as presented to callers.
    pub const ALL_LABEL: &'static str = "All Categories";

    /// Parses a caller-facing label, accepting the sentinel.
    pub fn parse(label: &str) -> Option<Self> {
        if label.eq_ignore_ascii_case(Self::ALL_LABEL) {
            return Some(CategoryFilter::All);
        }
        PolicyCategory::parse(label).map(CategoryFilter::Only)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip() {
        for category in PolicyCategory::ALL {
            assert_eq!(PolicyCategory::parse(category.as_str()), Some(category));
        }
    }

    #[test]
    fn unknown_store_labels_fold_into_general() {
        assert_eq!(PolicyCategory::from_stored(""), PolicyCategory::General);
        assert_eq!(
            PolicyCategory::from_stored("Mystery"),
            PolicyCategory::General
        );
        assert_eq!(
            PolicyCategory::from_stored("remote work"),
            PolicyCategory::RemoteWork
        );
    }

    #[test]
    fn sentinel_parses_only_as_filter() {
        assert_eq!(
            CategoryFilter::parse("All Categories"),
            Some(CategoryFilter::All)
        );
        assert_eq!(PolicyCategory::parse("All Categories"), None);
        assert_eq!(
            CategoryFilter::parse("Termination"),
            Some(CategoryFilter::Only(PolicyCategory::Termination))
        );
        assert_eq!(CategoryFilter::parse("nope"), None);
    }
}
