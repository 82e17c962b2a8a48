//! Schedule catalog: a user's schedules and their active-schedule pointer.

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{CoreError, Result};
use crate::schedule::{sample_schedules, Schedule, ScheduleDraft, SchedulePatch};
use crate::storage::Database;

/// CRUD over schedules plus the per-user active pointer.
pub struct ScheduleCatalog<'a> {
    db: &'a Database,
}

impl<'a> ScheduleCatalog<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Store a new schedule. Fresh ids are assigned to the schedule and to
    /// every block that lacks one.
    pub fn create(&self, owner_id: &str, draft: ScheduleDraft) -> Result<Schedule> {
        let schedule = Schedule::from_draft(owner_id, draft, Utc::now())?;
        self.db.insert_schedule(&schedule)?;
        info!(id = %schedule.id, owner = owner_id, blocks = schedule.len(), "schedule created");
        Ok(schedule)
    }

    /// Merge `patch` into the stored schedule and refresh `updated_at`.
    pub fn update(&self, id: &str, patch: SchedulePatch) -> Result<Schedule> {
        let mut schedule = self.get(id)?.ok_or_else(|| not_found(id))?;
        schedule.apply(patch, Utc::now())?;
        if !self.db.update_schedule(&schedule)? {
            return Err(not_found(id));
        }
        info!(id, "schedule updated");
        Ok(schedule)
    }

    /// Apply an arbitrary edit to a stored schedule, e.g. one of the
    /// block-editing helpers, and persist the result.
    pub fn edit<F>(&self, id: &str, edit: F) -> Result<Schedule>
    where
        F: FnOnce(&mut Schedule) -> Result<()>,
    {
        let mut schedule = self.get(id)?.ok_or_else(|| not_found(id))?;
        edit(&mut schedule)?;
        schedule.updated_at = Utc::now();
        if !self.db.update_schedule(&schedule)? {
            return Err(not_found(id));
        }
        debug!(id, blocks = schedule.len(), "schedule edited");
        Ok(schedule)
    }

    /// Delete a schedule. Users that had it active are moved to the
    /// owner's first remaining schedule, or left with none.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let Some(schedule) = self.get(id)? else {
            return Ok(false);
        };
        let affected = self.db.users_with_active(id)?;
        if !self.db.delete_schedule(id)? {
            return Ok(false);
        }

        let fallback = self.list(&schedule.owner_id)?.into_iter().next();
        for user in affected {
            match &fallback {
                Some(next) => {
                    self.db.set_active_schedule_id(&user, &next.id)?;
                    info!(user = %user, active = %next.id, "active schedule reassigned");
                }
                None => {
                    self.db.clear_active_schedule(&user)?;
                    info!(user = %user, "active schedule cleared");
                }
            }
        }
        info!(id, "schedule deleted");
        Ok(true)
    }

    /// The owner's schedules in creation order.
    pub fn list(&self, owner_id: &str) -> Result<Vec<Schedule>> {
        self.db.list_schedules(owner_id)
    }

    pub fn get(&self, id: &str) -> Result<Option<Schedule>> {
        self.db.get_schedule(id)
    }

    pub fn get_active(&self, user_id: &str) -> Result<Option<Schedule>> {
        match self.db.active_schedule_id(user_id)? {
            Some(id) => self.get(&id),
            None => Ok(None),
        }
    }

    /// Point `user_id` at `schedule_id`. Returns `false` when no such
    /// schedule exists. Ownership is not checked.
    pub fn set_active(&self, user_id: &str, schedule_id: &str) -> Result<bool> {
        if self.get(schedule_id)?.is_none() {
            return Ok(false);
        }
        self.db.set_active_schedule_id(user_id, schedule_id)?;
        info!(user = user_id, active = schedule_id, "active schedule set");
        Ok(true)
    }

    /// Install the built-in sample schedules for `owner_id`. The first one
    /// becomes active if the owner has no active schedule yet.
    pub fn seed_samples(&self, owner_id: &str) -> Result<Vec<Schedule>> {
        let created = sample_schedules()
            .into_iter()
            .map(|draft| self.create(owner_id, draft))
            .collect::<Result<Vec<_>>>()?;
        if self.get_active(owner_id)?.is_none() {
            if let Some(first) = created.first() {
                self.set_active(owner_id, &first.id)?;
            }
        }
        Ok(created)
    }
}

fn not_found(id: &str) -> CoreError {
    CoreError::NotFound {
        entity: "schedule",
        id: id.to_string(),
    }
}
