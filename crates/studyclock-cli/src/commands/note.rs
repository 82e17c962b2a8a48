use chrono::Utc;
use clap::Subcommand;
use studyclock_core::{CoreError, Database};

use super::{print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum NoteAction {
    /// Add a note stamped with the current date and time
    Add {
        /// Note text
        text: String,
    },
    /// List notes, pinned first
    List,
    /// Toggle the pinned flag of a note
    Pin {
        /// Note ID
        id: String,
    },
    /// Delete a note
    Rm {
        /// Note ID
        id: String,
    },
}

fn note_not_found(id: String) -> CoreError {
    CoreError::NotFound { entity: "note", id }
}

pub fn run(ctx: &Context, action: NoteAction) -> CmdResult {
    let db = Database::open()?;

    match action {
        NoteAction::Add { text } => {
            if text.trim().is_empty() {
                return Err("note text cannot be empty".into());
            }
            let note = db.add_note(&ctx.user, text.trim(), Utc::now())?;
            print_json(&note)?;
        }
        NoteAction::List => {
            let notes = db.list_notes(&ctx.user)?;
            print_json(&notes)?;
        }
        NoteAction::Pin { id } => match db.toggle_note_pin(&id)? {
            Some(true) => println!("pinned {id}"),
            Some(false) => println!("unpinned {id}"),
            None => return Err(note_not_found(id).into()),
        },
        NoteAction::Rm { id } => {
            if !db.delete_note(&id)? {
                return Err(note_not_found(id).into());
            }
            println!("deleted {id}");
        }
    }
    Ok(())
}
