use crate::api::{ListApi, MutationMethod};
use crate::banner::Banner;
use crate::controller::{ListController, LoadOutcome};
use log::{error, info, warn};
use serde::Serialize;
use shared::dto::refund::{RefundDecision, RefundDecisionForm};
use shared::error::{ClientError, Result};
use shared::models::refund::Refunds;
use shared::resource::{ListResource, ListRow, RowAction};
use std::sync::{Mutex, PoisonError};
use validator::Validate;

/// A mutation in progress or waiting for confirmation.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingAction {
    Delete { id: String, label: String },
    Refund {
        id: String,
        decision: RefundDecision,
        form: RefundDecisionForm,
    },
    /// Create or edit; these are sent without confirmation.
    Save { method: MutationMethod, path: String },
}

impl PendingAction {
    /// Row id, or the target path for a save.
    pub fn id(&self) -> &str {
        match self {
            PendingAction::Delete { id, .. } | PendingAction::Refund { id, .. } => id,
            PendingAction::Save { path, .. } => path,
        }
    }

    /// Question shown while confirming.
    pub fn prompt(&self) -> String {
        match self {
            PendingAction::Delete { label, .. } => format!("Delete {}? This cannot be undone.", label),
            PendingAction::Refund { id, decision, .. } => match decision {
                RefundDecision::Approve => format!("Approve refund {}?", id),
                RefundDecision::Deny => format!("Deny refund {}?", id),
            },
            PendingAction::Save { method, path } => format!("{} {}", method, path),
        }
    }
}

/// Mutation flow of one list.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ActionPhase {
    #[default]
    Idle,
    Confirming(PendingAction),
    Submitting(PendingAction),
    Succeeded(String),
    Failed(String),
}

/// Holds the current [`ActionPhase`] of a controller.
#[derive(Debug, Default)]
pub struct ActionFlow {
    phase: Mutex<ActionPhase>,
}

impl ActionFlow {
    pub fn phase(&self) -> ActionPhase {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set(&self, next: ActionPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Moves `Confirming` to `Submitting` and hands back the action.
    fn begin_submit(&self) -> Option<PendingAction> {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        match std::mem::take(&mut *phase) {
            ActionPhase::Confirming(action) => {
                *phase = ActionPhase::Submitting(action.clone());
                Some(action)
            }
            other => {
                *phase = other;
                None
            }
        }
    }

    fn is_submitting(&self) -> bool {
        matches!(
            *self.phase.lock().unwrap_or_else(PoisonError::into_inner),
            ActionPhase::Submitting(_)
        )
    }
}

impl<L: ListResource, A: ListApi> ListController<L, A> {
    pub fn action_phase(&self) -> ActionPhase {
        self.actions().phase()
    }

    fn ensure_allowed(&self, action: RowAction) -> Result<()> {
        let role = self.role();
        if L::ACTIONS.contains(&action) && action.allowed_for(role) {
            Ok(())
        } else {
            warn!("{} may not {} on {}", role, action.label(), L::NAME);
            Err(ClientError::Rejected(format!(
                "You do not have permission to {} {}.",
                action.label(),
                L::NAME
            )))
        }
    }

    /// Records a failure in both the flow and the banner.
    fn fail(&self, error: ClientError) -> ClientError {
        let message = error.user_message();
        error!("{} action failed: {}", L::NAME, error);
        self.actions().set(ActionPhase::Failed(message));
        self.set_banner(Banner::from(&error));
        error
    }

    fn succeed(&self, message: String) {
        info!("{}", message);
        self.set_banner(Banner::success(message.clone()));
        self.actions().set(ActionPhase::Succeeded(message));
    }

    /// Asks for confirmation before deleting the row with `id`.
    pub fn request_delete(&self, id: &str) -> Result<PendingAction> {
        self.ensure_allowed(RowAction::Delete)?;
        let label = {
            let view = self.lock_view();
            let row = view
                .data
                .find(id)
                .ok_or_else(|| ClientError::Validation(format!("No {} row with id {}", L::NAME, id)))?;
            format!("{} {}", row.display_name(), id)
        };
        self.begin_confirm(PendingAction::Delete {
            id: id.to_string(),
            label,
        })
    }

    pub(crate) fn begin_confirm(&self, action: PendingAction) -> Result<PendingAction> {
        if self.actions().is_submitting() {
            return Err(ClientError::Rejected(
                "Another change is still being saved.".to_string(),
            ));
        }
        self.actions().set(ActionPhase::Confirming(action.clone()));
        Ok(action)
    }

    /// Backs out of a confirmation. Returns whether one was open.
    pub fn cancel_action(&self) -> bool {
        if matches!(self.action_phase(), ActionPhase::Confirming(_)) {
            self.actions().set(ActionPhase::Idle);
            true
        } else {
            false
        }
    }

    /// Sends the action awaiting confirmation.
    ///
    /// A delete removes the row locally on success without re-fetching; a
    /// refund decision re-fetches the list.
    pub async fn confirm(&self) -> Result<()> {
        let action = self.actions().begin_submit().ok_or_else(|| {
            ClientError::Validation("Nothing is waiting for confirmation.".to_string())
        })?;

        match action {
            PendingAction::Save { method, path } => {
                // Saves never wait in Confirming; only a misuse lands here.
                self.actions().set(ActionPhase::Idle);
                Err(ClientError::Validation(format!("{} {} needs no confirmation", method, path)))
            }
            PendingAction::Delete { id, label } => {
                let path = L::item_path(&id);
                let result = self
                    .api()
                    .mutate(self.session(), MutationMethod::Delete, &path, None)
                    .await
                    .and_then(|response| response.into_result());
                match result {
                    Ok(_) => {
                        let removed = self.lock_view().data.remove_row(&id);
                        if removed.is_none() {
                            warn!("Deleted {} {} was no longer on the page", L::NAME, id);
                        }
                        self.api().invalidate(L::PATH);
                        self.succeed(format!("Deleted {}", label));
                        Ok(())
                    }
                    Err(e) => Err(self.fail(e)),
                }
            }
            PendingAction::Refund { id, decision, form } => {
                let path = format!("{}/{}", L::item_path(&id), decision.endpoint());
                let body = serde_json::to_value(&form).map_err(|e| self.fail(e.into()))?;
                let result = self
                    .api()
                    .mutate(self.session(), MutationMethod::Post, &path, Some(body))
                    .await
                    .and_then(|response| response.into_result());
                match result {
                    Ok(response) => {
                        let message = response.message.unwrap_or_else(|| match decision {
                            RefundDecision::Approve => format!("Refund {} approved", id),
                            RefundDecision::Deny => format!("Refund {} denied", id),
                        });
                        self.succeed(message);
                        self.refetch_after_change().await;
                        Ok(())
                    }
                    Err(e) => Err(self.fail(e)),
                }
            }
        }
    }

    /// Validates and saves an edit of the row with `id`, then re-fetches.
    pub async fn update_row<F>(&self, id: &str, form: &F) -> Result<()>
    where
        F: Validate + Serialize + Sync,
    {
        self.ensure_allowed(RowAction::Edit).map_err(|e| self.fail(e))?;
        form.validate().map_err(|e| self.fail(e.into()))?;
        let body = serde_json::to_value(form).map_err(|e| self.fail(e.into()))?;

        let path = L::item_path(id);
        self.submit(MutationMethod::Put, &path, body, format!("Saved {} {}", L::NAME, id))
            .await
    }

    /// Validates and creates a new row, then re-fetches.
    pub async fn create_row<F>(&self, form: &F) -> Result<()>
    where
        F: Validate + Serialize + Sync,
    {
        self.ensure_allowed(RowAction::Edit).map_err(|e| self.fail(e))?;
        form.validate().map_err(|e| self.fail(e.into()))?;
        let body = serde_json::to_value(form).map_err(|e| self.fail(e.into()))?;

        self.submit(MutationMethod::Post, L::PATH, body, format!("Created {} entry", L::NAME))
            .await
    }

    async fn submit(
        &self,
        method: MutationMethod,
        path: &str,
        body: serde_json::Value,
        success: String,
    ) -> Result<()> {
        self.actions().set(ActionPhase::Submitting(PendingAction::Save {
            method,
            path: path.to_string(),
        }));

        let result = self
            .api()
            .mutate(self.session(), method, path, Some(body))
            .await
            .and_then(|response| response.into_result());
        match result {
            Ok(response) => {
                self.succeed(response.message.unwrap_or(success));
                self.refetch_after_change().await;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn refetch_after_change(&self) {
        if let LoadOutcome::Failed(e) = self.refresh().await {
            warn!("Re-fetch after change failed: {}", e);
        }
    }

    /// CSV export of everything matching the current filters.
    pub async fn export_csv(&self) -> Result<Vec<u8>> {
        self.ensure_allowed(RowAction::Export)?;
        let query = self.query().without_pagination();
        match self
            .api()
            .export(self.session(), &L::export_path(), &query)
            .await
        {
            Ok(bytes) => {
                info!("Exported {} bytes of {}", bytes.len(), L::NAME);
                Ok(bytes)
            }
            Err(e) => Err(self.fail(e)),
        }
    }
}

impl<A: ListApi> ListController<Refunds, A> {
    /// Asks for confirmation before approving or denying a pending refund.
    pub fn request_refund_decision(
        &self,
        id: &str,
        decision: RefundDecision,
        form: RefundDecisionForm,
    ) -> Result<PendingAction> {
        let action = match decision {
            RefundDecision::Approve => RowAction::ApproveRefund,
            RefundDecision::Deny => RowAction::DenyRefund,
        };
        self.ensure_allowed(action)?;
        form.validate()?;

        let decidable = {
            let view = self.lock_view();
            let row = view
                .data
                .find(id)
                .ok_or_else(|| ClientError::Validation(format!("No refund with id {}", id)))?;
            row.is_decidable()
        };
        if !decidable {
            return Err(ClientError::Rejected(format!(
                "Refund {} has already been decided.",
                id
            )));
        }

        self.begin_confirm(PendingAction::Refund {
            id: id.to_string(),
            decision,
            form,
        })
    }
}
