//! Pure record lifecycle state machine.
//!
//! The coordinator consults [`RecordLifecycle::apply`] before issuing any I/O,
//! so an invalid transition never reaches the record store or the search
//! index. The machine only tracks the three lifecycle columns; everything
//! else about a record is opaque to it.

use crate::record::{Record, UserId};
use thiserror::Error;

/// Lifecycle columns of one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordLifecycle {
    /// `is_published`
    pub published: bool,
    /// `is_deleted`
    pub deleted: bool,
    /// `locked_by_user`
    pub locked_by: Option<UserId>,
}

impl From<&Record> for RecordLifecycle {
    fn from(record: &Record) -> Self {
        Self {
            published: record.is_published,
            deleted: record.is_deleted,
            locked_by: record.locked_by_user.clone(),
        }
    }
}

/// A requested lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleCommand {
    /// Take the edit lock
    Lock(UserId),
    /// Release the edit lock
    Unlock {
        /// Requesting user
        user: UserId,
        /// Bypass ownership (administrator)
        force: bool,
    },
    /// Make the record publicly visible
    Publish {
        /// Whether the owning exhibit is published
        exhibit_published: bool,
        /// Whether the owning container is published, for nested kinds
        container_published: Option<bool>,
    },
    /// Hide the record from the public index
    Suppress,
    /// Move to the recycle bin
    SoftDelete,
    /// Bring back from the recycle bin as a draft
    Restore,
    /// Remove permanently
    Purge,
}

/// Rejected lifecycle transition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// Publishing requires a published exhibit.
    #[error("Exhibit must be published first")]
    ExhibitNotPublished,

    /// Publishing a nested record requires a published container.
    #[error("Container must be published first")]
    ContainerNotPublished,

    /// The record is in the recycle bin.
    #[error("Record is deleted")]
    Deleted,

    /// The record is not in the recycle bin.
    #[error("Record is not in the recycle bin")]
    NotDeleted,

    /// Another user holds the edit lock.
    #[error("Record is locked by {0}")]
    LockedBy(UserId),

    /// Only the lock holder may release the lock.
    #[error("Only the lock owner can unlock this record")]
    NotLockOwner,
}

impl RecordLifecycle {
    /// A freshly created record: unpublished, active, unlocked.
    #[must_use]
    pub const fn draft() -> Self {
        Self {
            published: false,
            deleted: false,
            locked_by: None,
        }
    }

    /// Compute the state after `command`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when the command is not allowed from this state.
    pub fn apply(&self, command: &LifecycleCommand) -> Result<Self, TransitionError> {
        let mut next = self.clone();
        match command {
            LifecycleCommand::Lock(user) => {
                if self.deleted {
                    return Err(TransitionError::Deleted);
                }
                match &self.locked_by {
                    Some(holder) if holder != user => {
                        return Err(TransitionError::LockedBy(holder.clone()));
                    }
                    _ => next.locked_by = Some(user.clone()),
                }
            }
            LifecycleCommand::Unlock { user, force } => {
                if let Some(holder) = &self.locked_by {
                    if holder != user && !force {
                        return Err(TransitionError::NotLockOwner);
                    }
                }
                next.locked_by = None;
            }
            LifecycleCommand::Publish {
                exhibit_published,
                container_published,
            } => {
                if self.deleted {
                    return Err(TransitionError::Deleted);
                }
                if !exhibit_published {
                    return Err(TransitionError::ExhibitNotPublished);
                }
                if *container_published == Some(false) {
                    return Err(TransitionError::ContainerNotPublished);
                }
                next.published = true;
            }
            LifecycleCommand::Suppress => next.published = false,
            LifecycleCommand::SoftDelete => {
                next.deleted = true;
                next.published = false;
                next.locked_by = None;
            }
            LifecycleCommand::Restore => {
                if !self.deleted {
                    return Err(TransitionError::NotDeleted);
                }
                next.deleted = false;
                next.published = false;
            }
            LifecycleCommand::Purge => {
                if !self.deleted {
                    return Err(TransitionError::NotDeleted);
                }
            }
        }
        Ok(next)
    }
}
