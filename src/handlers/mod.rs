pub mod debit_notes;
pub mod health;
