use clap::Subcommand;
use serde::Serialize;
use studyclock_core::{
    BlockDraft, BlockKind, CoreError, Database, Schedule, ScheduleCatalog, ScheduleDraft,
    SchedulePatch, ValidationError,
};

use super::{print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// List your schedules
    List,
    /// Show one schedule with its blocks (the active one by default)
    Show {
        /// Schedule ID
        id: Option<String>,
    },
    /// Create a schedule
    Create {
        /// Schedule name
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Hex color such as "#4a8f7a"
        #[arg(long)]
        color: Option<String>,
        /// Blocks as a JSON array of {name, kind, duration_min, subject?, notes?, start_time?}
        #[arg(long)]
        blocks: Option<String>,
    },
    /// Rename a schedule
    Rename {
        /// Schedule ID
        id: String,
        /// New name
        name: String,
    },
    /// Change a schedule's description or color
    Update {
        /// Schedule ID
        id: String,
        #[arg(long)]
        description: Option<String>,
        /// Hex color such as "#4a8f7a"
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a schedule
    Delete {
        /// Schedule ID
        id: String,
    },
    /// Make a schedule the active one
    Activate {
        /// Schedule ID
        id: String,
    },
    /// Append a block, or insert it with --at
    AddBlock {
        /// Schedule ID
        id: String,
        #[arg(long)]
        name: String,
        /// "study" or "break"
        #[arg(long, default_value = "study")]
        kind: String,
        #[arg(long)]
        minutes: u32,
        #[arg(long, default_value = "")]
        subject: String,
        #[arg(long, default_value = "")]
        notes: String,
        /// Wall-clock hint such as "06:00"
        #[arg(long, default_value = "")]
        start: String,
        /// Insert before this index instead of appending
        #[arg(long)]
        at: Option<usize>,
    },
    /// Change fields of the block at an index; omitted fields are kept
    EditBlock {
        /// Schedule ID
        id: String,
        index: usize,
        #[arg(long)]
        name: Option<String>,
        /// "study" or "break"
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        minutes: Option<u32>,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        start: Option<String>,
    },
    /// Remove the block at an index
    RemoveBlock {
        /// Schedule ID
        id: String,
        index: usize,
    },
    /// Move a block to another position
    MoveBlock {
        /// Schedule ID
        id: String,
        from: usize,
        to: usize,
    },
    /// Install the built-in sample schedules
    Seed,
}

#[derive(Serialize)]
struct ScheduleSummary<'a> {
    id: &'a str,
    name: &'a str,
    blocks: usize,
    study_blocks: usize,
    total_minutes: u64,
    active: bool,
}

fn not_found(id: String) -> CoreError {
    CoreError::NotFound {
        entity: "schedule",
        id,
    }
}

fn parse_kind(kind: &str) -> Result<BlockKind, String> {
    BlockKind::parse(&kind.to_ascii_lowercase())
        .ok_or_else(|| format!("unknown block kind '{kind}' (expected study or break)"))
}

pub fn run(ctx: &Context, action: ScheduleAction) -> CmdResult {
    let db = Database::open()?;
    let catalog = ScheduleCatalog::new(&db);

    match action {
        ScheduleAction::List => {
            let active = catalog.get_active(&ctx.user)?.map(|s| s.id);
            let schedules = catalog.list(&ctx.user)?;
            let summaries: Vec<_> = schedules
                .iter()
                .map(|s| ScheduleSummary {
                    id: &s.id,
                    name: &s.name,
                    blocks: s.len(),
                    study_blocks: s.study_count(),
                    total_minutes: s.total_minutes(),
                    active: active.as_deref() == Some(s.id.as_str()),
                })
                .collect();
            print_json(&summaries)?;
        }
        ScheduleAction::Show { id } => {
            let schedule: Option<Schedule> = match &id {
                Some(id) => catalog.get(id)?,
                None => catalog.get_active(&ctx.user)?,
            };
            match (schedule, id) {
                (Some(schedule), _) => print_json(&schedule)?,
                (None, Some(id)) => return Err(not_found(id).into()),
                (None, None) => return Err("no active schedule".into()),
            }
        }
        ScheduleAction::Create {
            name,
            description,
            color,
            blocks,
        } => {
            let blocks: Vec<BlockDraft> = match blocks {
                Some(json) => serde_json::from_str(&json)?,
                None => Vec::new(),
            };
            let schedule = catalog.create(
                &ctx.user,
                ScheduleDraft {
                    name,
                    description,
                    color,
                    blocks,
                },
            )?;
            print_json(&schedule)?;
        }
        ScheduleAction::Rename { id, name } => {
            let schedule = catalog.update(
                &id,
                SchedulePatch {
                    name: Some(name),
                    ..Default::default()
                },
            )?;
            println!("renamed {} to {}", schedule.id, schedule.name);
        }
        ScheduleAction::Update {
            id,
            description,
            color,
        } => {
            if description.is_none() && color.is_none() {
                return Err("nothing to update (pass --description and/or --color)".into());
            }
            let schedule = catalog.update(
                &id,
                SchedulePatch {
                    description,
                    color,
                    ..Default::default()
                },
            )?;
            print_json(&schedule)?;
        }
        ScheduleAction::Delete { id } => {
            if !catalog.delete(&id)? {
                return Err(not_found(id).into());
            }
            println!("deleted {id}");
        }
        ScheduleAction::Activate { id } => {
            if !catalog.set_active(&ctx.user, &id)? {
                return Err(not_found(id).into());
            }
            println!("active schedule: {id}");
        }
        ScheduleAction::AddBlock {
            id,
            name,
            kind,
            minutes,
            subject,
            notes,
            start,
            at,
        } => {
            let draft = BlockDraft {
                id: None,
                name,
                kind: parse_kind(&kind)?,
                start_time: start,
                duration_min: minutes,
                subject,
                notes,
            };
            let schedule = catalog.edit(&id, |s| {
                match at {
                    Some(at) => s.insert_block(at, draft)?,
                    None => s.push_block(draft)?,
                };
                Ok(())
            })?;
            print_json(&schedule)?;
        }
        ScheduleAction::EditBlock {
            id,
            index,
            name,
            kind,
            minutes,
            subject,
            notes,
            start,
        } => {
            let kind = kind.as_deref().map(parse_kind).transpose()?;
            let schedule = catalog.edit(&id, |s| {
                let Some(block) = s.block(index) else {
                    return Err(ValidationError::OutOfBounds {
                        collection: "blocks".into(),
                        index,
                        len: s.len(),
                    }
                    .into());
                };
                let mut draft = BlockDraft::from(block.clone());
                if let Some(name) = name {
                    draft.name = name;
                }
                if let Some(kind) = kind {
                    draft.kind = kind;
                }
                if let Some(minutes) = minutes {
                    draft.duration_min = minutes;
                }
                if let Some(subject) = subject {
                    draft.subject = subject;
                }
                if let Some(notes) = notes {
                    draft.notes = notes;
                }
                if let Some(start) = start {
                    draft.start_time = start;
                }
                s.replace_block(index, draft)?;
                Ok(())
            })?;
            print_json(&schedule)?;
        }
        ScheduleAction::RemoveBlock { id, index } => {
            let schedule = catalog.edit(&id, |s| {
                s.remove_block(index)?;
                Ok(())
            })?;
            print_json(&schedule)?;
        }
        ScheduleAction::MoveBlock { id, from, to } => {
            let schedule = catalog.edit(&id, |s| Ok(s.move_block(from, to)?))?;
            print_json(&schedule)?;
        }
        ScheduleAction::Seed => {
            let seeded = catalog.seed_samples(&ctx.user)?;
            for schedule in &seeded {
                println!("{}  {}", schedule.id, schedule.name);
            }
        }
    }
    Ok(())
}
