// Résumé intake: file receiver, record store, workflow trigger and the
// analysis callback that closes the loop.
// Status writes always go through the guarded `ResumeStore::transition`/`complete`.

pub mod callback;
pub mod compensation;
pub mod files;
pub mod handlers;
pub mod reconcile;
pub mod store;
pub mod trigger;
pub mod upload;

pub use files::FileReceiver;
pub use store::{PgResumeStore, ResumeStore};
pub use trigger::{WebhookTrigger, WorkflowTrigger};
