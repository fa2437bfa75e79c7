use credence_core::{CoreError, DisputeId, ErrorKind, RecordId, SubjectId, Timestamp};
use thiserror::Error;

/// Errors raised by the score engine.
#[derive(Error, Debug)]
pub enum ScoreError {
    /// Score impact outside `[-50, 50]`.
    #[error("score impact {impact} outside [-{max}, {max}]")]
    ImpactOutOfRange {
        /// Requested impact.
        impact: i32,
        /// Permitted magnitude.
        max: i32,
    },

    /// Provider records must carry a positive amount.
    #[error("record amount must be positive")]
    ZeroAmount,

    /// No profile exists for the subject.
    #[error("no credit profile for {0}")]
    ProfileNotFound(SubjectId),

    /// No record at this position in the subject's history.
    #[error("no record {index} for {subject}")]
    RecordNotFound {
        /// Subject whose history was indexed.
        subject: SubjectId,
        /// Requested position.
        index: usize,
    },

    /// The profile is frozen against provider-initiated updates.
    #[error("credit profile of {0} is frozen")]
    ProfileFrozen(SubjectId),

    /// The profile is already frozen.
    #[error("credit profile of {0} is already frozen")]
    AlreadyFrozen(SubjectId),

    /// The profile is not frozen.
    #[error("credit profile of {0} is not frozen")]
    NotFrozen(SubjectId),

    /// The record was already marked repaid.
    #[error("{0} is already repaid")]
    AlreadyRepaid(RecordId),

    /// Only the provider that submitted a record may mark it repaid.
    #[error("{record} was submitted by {provider}, not {caller}")]
    NotOriginalProvider {
        /// The record.
        record: RecordId,
        /// Its provider.
        provider: SubjectId,
        /// The caller.
        caller: SubjectId,
    },

    /// Configuration values are inconsistent.
    #[error("invalid score configuration: {0}")]
    InvalidConfig(String),

    /// Primitive arithmetic or validation failure.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ScoreError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ImpactOutOfRange { .. } | Self::ZeroAmount | Self::InvalidConfig(_) => {
                ErrorKind::Validation
            }
            Self::ProfileNotFound(_) | Self::RecordNotFound { .. } => ErrorKind::NotFound,
            Self::ProfileFrozen(_) => ErrorKind::Compliance,
            Self::AlreadyFrozen(_)
            | Self::NotFrozen(_)
            | Self::AlreadyRepaid(_)
            | Self::NotOriginalProvider { .. } => ErrorKind::State,
            Self::Core(e) => e.kind(),
        }
    }
}

/// Errors raised by the dispute manager.
#[derive(Error, Debug)]
pub enum DisputeError {
    /// Only a record's subject may dispute it.
    #[error("{caller} may not dispute records of {subject}")]
    NotRecordSubject {
        /// The caller.
        caller: SubjectId,
        /// The record's subject.
        subject: SubjectId,
    },

    /// A dispute needs a reason.
    #[error("dispute reason must not be empty")]
    EmptyReason,

    /// The record is already under (or past) dispute.
    #[error("{0} has already been disputed")]
    AlreadyDisputed(RecordId),

    /// The dispute window for the record has closed.
    #[error("dispute window for {record} closed at {deadline} (now {now})")]
    WindowClosed {
        /// The record.
        record: RecordId,
        /// Last instant a dispute was accepted.
        deadline: Timestamp,
        /// Time of the attempt.
        now: Timestamp,
    },

    /// No dispute with this id.
    #[error("{0} not found")]
    NotFound(DisputeId),

    /// The dispute has already been resolved.
    #[error("{0} is already resolved")]
    AlreadyResolved(DisputeId),

    /// Lookup or reversal failure in the score engine.
    #[error(transparent)]
    Score(#[from] ScoreError),
}

impl DisputeError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotRecordSubject { .. } => ErrorKind::Authorization,
            Self::EmptyReason => ErrorKind::Validation,
            Self::AlreadyDisputed(_) | Self::AlreadyResolved(_) => ErrorKind::State,
            Self::WindowClosed { .. } => ErrorKind::Temporal,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Score(e) => e.kind(),
        }
    }
}
