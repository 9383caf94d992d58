use estimpro::error::AppError;
use estimpro::workflows::estimation::{
    EstimationServices, EstimationWizard, WireEnum, WizardError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Shared state behind the estimation routes.
#[derive(Clone)]
pub(crate) struct ApiState {
    pub(crate) services: EstimationServices,
    pub(crate) sessions: InMemoryWizardStore,
}

impl ApiState {
    pub(crate) fn new(services: EstimationServices) -> Self {
        Self {
            services,
            sessions: InMemoryWizardStore::default(),
        }
    }
}

/// Wizard sessions live for the lifetime of the process only. Stored wizards
/// never sit at `Submitting`; an in-flight submission is tracked separately
/// and released when its guard drops, even if the request is abandoned.
#[derive(Default, Clone)]
pub(crate) struct InMemoryWizardStore {
    sessions: Arc<Mutex<HashMap<String, EstimationWizard>>>,
    submitting: Arc<Mutex<HashSet<String>>>,
    next_id: Arc<AtomicU64>,
}

/// Marks a session as submitting until dropped.
pub(crate) struct SubmissionGuard {
    submitting: Arc<Mutex<HashSet<String>>>,
    id: String,
}

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        self.submitting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

impl InMemoryWizardStore {
    pub(crate) fn create(&self) -> (String, EstimationWizard) {
        let id = format!("wiz-{:06}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let wizard = EstimationWizard::new();
        self.lock().insert(id.clone(), wizard.clone());
        (id, wizard)
    }

    pub(crate) fn fetch(&self, id: &str) -> Result<EstimationWizard, AppError> {
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))
    }

    pub(crate) fn store(&self, id: &str, wizard: EstimationWizard) {
        self.lock().insert(id.to_string(), wizard);
    }

    pub(crate) fn remove(&self, id: &str) -> Option<EstimationWizard> {
        self.lock().remove(id)
    }

    /// Refuses edits while the session's draft is being submitted.
    pub(crate) fn ensure_idle(&self, id: &str) -> Result<(), AppError> {
        if self.submitting_ids().contains(id) {
            return Err(WizardError::Submitting.into());
        }
        Ok(())
    }

    pub(crate) fn begin_submission(&self, id: &str) -> Result<SubmissionGuard, AppError> {
        if !self.submitting_ids().insert(id.to_string()) {
            return Err(WizardError::Submitting.into());
        }
        Ok(SubmissionGuard {
            submitting: Arc::clone(&self.submitting),
            id: id.to_string(),
        })
    }

    fn submitting_ids(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.submitting.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, EstimationWizard>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// clap value parser for the closed option sets.
pub(crate) fn parse_wire<T: WireEnum>(raw: &str) -> Result<T, String> {
    T::from_wire(raw).ok_or_else(|| {
        let expected = T::ALL
            .iter()
            .map(|option| option.as_wire())
            .collect::<Vec<_>>()
            .join(", ");
        format!("unknown option '{raw}', expected one of {expected}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use estimpro::workflows::estimation::{Parking, PropertyType};

    #[test]
    fn sessions_round_trip_through_the_store() {
        let store = InMemoryWizardStore::default();
        let (first, _) = store.create();
        let (second, _) = store.create();
        assert_ne!(first, second);

        let mut wizard = store.fetch(&first).expect("session exists");
        wizard.next();
        store.store(&first, wizard.clone());
        assert_eq!(store.fetch(&first).expect("session exists"), wizard);

        store.remove(&first);
        assert!(matches!(
            store.fetch(&first),
            Err(AppError::SessionNotFound(_))
        ));
    }

    #[test]
    fn dropped_submission_guard_frees_the_session() {
        let store = InMemoryWizardStore::default();
        let (id, _) = store.create();

        let guard = store.begin_submission(&id).expect("first submission");
        assert!(matches!(
            store.begin_submission(&id),
            Err(AppError::Wizard(WizardError::Submitting))
        ));
        assert!(store.ensure_idle(&id).is_err());

        drop(guard);
        assert!(store.ensure_idle(&id).is_ok());
        assert!(store.begin_submission(&id).is_ok());
    }

    #[test]
    fn wire_parser_lists_the_options() {
        assert_eq!(parse_wire::<Parking>("garage"), Ok(Parking::Garage));
        let err = parse_wire::<PropertyType>("castle").unwrap_err();
        assert!(err.contains("apartment, house, studio, loft, duplex"));
    }
}
