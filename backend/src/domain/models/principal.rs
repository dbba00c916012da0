use crate::domain::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    TrackWellness,
    ViewOwnAnalytics,
    ViewAnyStudent,
    ViewCohorts,
}

/// Authenticated caller, resolved once at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    Student { id: i64 },
    Staff { id: i64 },
}

impl Principal {
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Principal::Student { .. } => &[Capability::TrackWellness, Capability::ViewOwnAnalytics],
            Principal::Staff { .. } => &[Capability::ViewAnyStudent, Capability::ViewCohorts],
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    pub fn require(&self, capability: Capability) -> Result<(), DomainError> {
        if self.has(capability) {
            Ok(())
        } else {
            Err(DomainError::Forbidden(format!(
                "{:?} lacks capability {:?}",
                self, capability
            )))
        }
    }

    /// The student id a tracking submission is recorded against.
    pub fn tracking_student(&self) -> Result<i64, DomainError> {
        self.require(Capability::TrackWellness)?;
        match self {
            Principal::Student { id } => Ok(*id),
            Principal::Staff { .. } => Err(DomainError::Forbidden(
                "Only students can submit tracking data".to_string(),
            )),
        }
    }

    /// Students may read their own analytics, staff may read anyone's.
    pub fn authorize_student_access(&self, student_id: i64) -> Result<(), DomainError> {
        if self.has(Capability::ViewAnyStudent) {
            return Ok(());
        }
        match self {
            Principal::Student { id } if *id == student_id && self.has(Capability::ViewOwnAnalytics) => Ok(()),
            _ => Err(DomainError::Forbidden(format!(
                "Not allowed to view analytics of student {}",
                student_id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_reads_only_own_analytics() {
        let student = Principal::Student { id: 7 };
        assert!(student.authorize_student_access(7).is_ok());
        assert!(matches!(
            student.authorize_student_access(8),
            Err(DomainError::Forbidden(_))
        ));
    }

    #[test]
    fn test_staff_reads_any_student_but_cannot_track() {
        let staff = Principal::Staff { id: 1 };
        assert!(staff.authorize_student_access(42).is_ok());
        assert!(staff.require(Capability::ViewCohorts).is_ok());
        assert!(staff.tracking_student().is_err());
    }

    #[test]
    fn test_student_cannot_view_cohorts() {
        let student = Principal::Student { id: 3 };
        assert!(student.require(Capability::ViewCohorts).is_err());
        assert_eq!(student.tracking_student().ok(), Some(3));
    }
}
