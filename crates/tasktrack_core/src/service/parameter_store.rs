//! Parameter store: owner of the controlled vocabulary.
//!
//! # Responsibility
//! - Load the registry once and write it through after every mutation.
//! - Fall back to the default vocabulary when storage is missing or unreadable.
//!
//! # Invariants
//! - Rejected mutations (duplicate, unknown value, bad order) change nothing.
//! - A failed write keeps the in-memory registry and reports `StorageWrite`.

use crate::model::parameter::{ParameterCategory, ParameterError, ParameterSet};
use crate::model::task::TaskFields;
use crate::repo::parameter_repo::ParameterRepository;
use crate::repo::task_repo::RepoError;
use log::{info, warn};
use thiserror::Error;

/// Errors reported by parameter store operations.
#[derive(Debug, Error)]
pub enum ParameterStoreError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    #[error("could not read parameter storage, using defaults: {0}")]
    StorageRead(#[source] RepoError),
    #[error("could not write parameter storage, the change may not survive a restart: {0}")]
    StorageWrite(#[source] RepoError),
}

impl ParameterStoreError {
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::StorageRead(_) | Self::StorageWrite(_))
    }
}

/// Write-through owner of the parameter registry.
pub struct ParameterStore<R: ParameterRepository> {
    repo: R,
    parameters: ParameterSet,
    load_warning: Option<ParameterStoreError>,
}

impl<R: ParameterRepository> ParameterStore<R> {
    /// Creates a store and loads the registry once.
    pub fn open(repo: R) -> Self {
        let mut store = Self {
            repo,
            parameters: ParameterSet::default(),
            load_warning: None,
        };
        store.load_warning = store.load().err();
        store
    }

    /// Reloads the registry. Missing storage yields the defaults.
    ///
    /// # Errors
    /// - `StorageRead` when storage is unreadable; the defaults are used.
    pub fn load(&mut self) -> Result<&ParameterSet, ParameterStoreError> {
        match self.repo.load_parameters() {
            Ok(Some(parameters)) => {
                self.parameters = parameters;
                info!(
                    "event=parameters_load module=store status=ok backend={} source=storage",
                    self.repo.backend_name()
                );
                Ok(&self.parameters)
            }
            Ok(None) => {
                self.parameters = ParameterSet::default();
                info!(
                    "event=parameters_load module=store status=ok backend={} source=defaults",
                    self.repo.backend_name()
                );
                Ok(&self.parameters)
            }
            Err(err) => {
                warn!(
                    "event=parameters_load module=store status=warn backend={} fallback=defaults error={}",
                    self.repo.backend_name(),
                    err
                );
                self.parameters = ParameterSet::default();
                Err(ParameterStoreError::StorageRead(err))
            }
        }
    }

    pub fn persist(&self) -> Result<(), ParameterStoreError> {
        self.repo
            .save_parameters(&self.parameters)
            .map_err(ParameterStoreError::StorageWrite)
    }

    pub fn load_warning(&self) -> Option<&ParameterStoreError> {
        self.load_warning.as_ref()
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn values(&self, category: ParameterCategory) -> &[String] {
        self.parameters.values(category)
    }

    /// Registry check for a submitted field set.
    pub fn check_fields(&self, fields: &TaskFields) -> Result<(), ParameterError> {
        self.parameters.check_fields(fields)
    }

    /// Appends a value; duplicates are rejected.
    pub fn add(
        &mut self,
        category: ParameterCategory,
        value: &str,
    ) -> Result<(), ParameterStoreError> {
        self.mutate("parameter_add", category, |set| set.add(category, value))
    }

    pub fn remove(
        &mut self,
        category: ParameterCategory,
        value: &str,
    ) -> Result<(), ParameterStoreError> {
        self.mutate("parameter_remove", category, |set| set.remove(category, value))
    }

    pub fn move_up(
        &mut self,
        category: ParameterCategory,
        value: &str,
    ) -> Result<(), ParameterStoreError> {
        self.mutate("parameter_move_up", category, |set| set.move_up(category, value))
    }

    pub fn move_down(
        &mut self,
        category: ParameterCategory,
        value: &str,
    ) -> Result<(), ParameterStoreError> {
        self.mutate("parameter_move_down", category, |set| {
            set.move_down(category, value)
        })
    }

    /// Replaces the whole order of a category.
    pub fn reorder(
        &mut self,
        category: ParameterCategory,
        order: Vec<String>,
    ) -> Result<(), ParameterStoreError> {
        self.mutate("parameter_reorder", category, |set| set.reorder(category, order))
    }

    fn mutate<F>(
        &mut self,
        event: &str,
        category: ParameterCategory,
        apply: F,
    ) -> Result<(), ParameterStoreError>
    where
        F: FnOnce(&mut ParameterSet) -> Result<(), ParameterError>,
    {
        apply(&mut self.parameters)?;
        match self.repo.save_parameters(&self.parameters) {
            Ok(()) => {
                info!(
                    "event={} module=store status=ok backend={} category={} count={}",
                    event,
                    self.repo.backend_name(),
                    category,
                    self.parameters.values(category).len()
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event={} module=store status=warn backend={} category={} persisted=false error={}",
                    event,
                    self.repo.backend_name(),
                    category,
                    err
                );
                Err(ParameterStoreError::StorageWrite(err))
            }
        }
    }
}
