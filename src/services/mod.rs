// Note generation
pub mod debit_note;
pub mod mapper;

// Collaborators and their in-memory implementations
pub mod in_memory;
pub mod lookups;
pub mod totals;

// Helpers
pub mod serial_no;

pub use debit_note::{DebitNoteService, RequestContext, SignPolicy};
