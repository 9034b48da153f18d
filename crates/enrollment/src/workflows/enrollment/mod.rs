//! Multi-step enrollment: the application form with its cascading address selects and
//! conditional groups, document staging, review, submission, and the step gate tying them
//! together.

pub mod conditional;
pub mod dashboard;
pub mod documents;
pub mod domain;
pub mod form;
pub mod location;
pub mod navigation;
pub mod notices;
pub mod persistence;
pub mod registry;
pub mod review;
pub mod router;
pub mod session;
pub mod submission;
pub mod validation;

#[cfg(test)]
mod tests;

pub use conditional::{ConditionalFieldController, GroupChange, GroupId};
pub use dashboard::{DashboardDocument, DashboardView, DocumentReview};
pub use documents::{
    format_size, DocumentSlot, DocumentSlotId, DocumentStaging, DocumentStatus, FileRejected,
    IncomingFile, RemovalError, StagedUpload, MAX_FILE_BYTES, UPLOAD_STORAGE_WARNING,
};
pub use domain::{
    AddressError, AddressKind, AddressSelection, FieldKey, FieldValue, LocationLevel,
    LocationNode, LocationOption,
};
pub use form::{hydrate, EnrollmentForm, FieldUpdate, FormError, RestoreReport};
pub use location::{
    LoadOutcome, LoadTicket, LocationHierarchyResolver, LocationLookup, LookupError, PsgcClient,
    RegistryLoadError, StaticLocationLookup,
};
pub use navigation::{GateDecision, Identity, IdentityProvider, Step, StepGate};
pub use notices::{
    plan_continue, ContinueDecision, MissingDocumentsPrompt, Notice, NoticeLevel, NoticeQueue,
    PromptError,
};
pub use persistence::{
    keys, FormStateStore, MemorySessionStore, PersistedFormSnapshot, SaveOutcome, SessionStore,
    StorageError,
};
pub use review::{ReviewAssembler, ReviewProgress, ReviewView};
pub use router::{enrollment_router, EnrollmentApi, ReviewRequest};
pub use session::{FieldError, FieldState, FormSession, SessionView};
pub use submission::{
    ApplicationRepository, RepositoryError, SubmissionError, SubmissionReceipt, SubmissionService,
    SubmissionStatus, SubmittedApplication,
};
pub use validation::{FieldIssue, FormReport, FormValidator};
