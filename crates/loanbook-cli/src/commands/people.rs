//! People command handlers

use anyhow::Result;

use loanbook_core::{Borrower, Store};

use crate::output::Output;

/// List every known borrower
pub fn list(store: &Store, output: &Output) -> Result<()> {
    let people: Vec<&Borrower> = store.people().iter().collect();
    output.print_people(&people)
}

/// List students an academic supervises on active loans
pub fn supervised(store: &Store, academic_id: String, output: &Output) -> Result<()> {
    let students: Vec<Borrower> = store
        .supervised_students(&academic_id)?
        .into_iter()
        .cloned()
        .map(Borrower::Student)
        .collect();
    let refs: Vec<&Borrower> = students.iter().collect();
    output.print_people(&refs)
}
