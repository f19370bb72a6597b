//! Engine - Executes operations against a store
//!
//! TigerStyle: one entry point, exhaustive dispatch, fixed callback order.
//!
//! # Outcome Rules
//!
//! ```text
//! failing_record_ids non-empty  → Err(partial failure)   (wins over everything)
//! whole_operation_error set     → Err(whole_operation_error)
//! otherwise                     → Ok
//! ```
//!
//! Query ignores `failing_record_ids`; only the whole-operation error applies.
//!
//! Execution is synchronous: every callback has fired by the time
//! [`execute`] returns. Outcomes are only ever reported through callbacks.

use std::collections::{BTreeMap, BTreeSet};

use crate::constants::{PROGRESS_COMPLETE, QUERY_RESULTS_COUNT_MAX, QUERY_RESULTS_LIMIT_AUTOMATIC};
use crate::fault::CloudError;
use crate::operation::{
    DatabaseOperation, FetchRecordsOperation, ModifyRecordsOperation, QueryOperation, SavePolicy,
};
use crate::record::{Record, RecordId};
use crate::registry::FaultRegistry;
use crate::store::RecordStore;

/// Execute an operation against a store, consulting the registry's faults.
pub fn execute(operation: DatabaseOperation, store: &mut RecordStore, registry: &mut FaultRegistry) {
    tracing::debug!(
        scope = %store.scope(),
        kind = %operation.kind(),
        seed = registry.seed(),
        "executing operation"
    );
    store.set_last_operation(operation.summary());

    match operation {
        DatabaseOperation::Modify(op) => execute_modify(op, store, registry),
        DatabaseOperation::Fetch(op) => execute_fetch(op, store, registry),
        DatabaseOperation::Query(op) => execute_query(op, store, registry),
    }
}

/// Number of matches a query with `results_limit` may deliver under `ceiling`.
///
/// # Panics
/// Panics unless `1 <= ceiling <= QUERY_RESULTS_COUNT_MAX`.
#[must_use]
pub fn effective_results_limit(results_limit: usize, ceiling: usize) -> usize {
    assert!(
        (1..=QUERY_RESULTS_COUNT_MAX).contains(&ceiling),
        "results ceiling {} outside 1..={}",
        ceiling,
        QUERY_RESULTS_COUNT_MAX
    );

    if results_limit == QUERY_RESULTS_LIMIT_AUTOMATIC || results_limit > ceiling {
        ceiling
    } else {
        results_limit
    }
}

// =============================================================================
// Modify
// =============================================================================

fn execute_modify(
    mut op: ModifyRecordsOperation,
    store: &mut RecordStore,
    registry: &mut FaultRegistry,
) {
    let failing = registry.failing();
    let whole = registry.whole_operation_error.clone();

    if op.save_policy != SavePolicy::default() {
        tracing::trace!(policy = ?op.save_policy, "save policy has no effect; saves always overwrite");
    }

    let saves = std::mem::take(&mut op.records_to_save);
    let deletes = std::mem::take(&mut op.record_ids_to_delete);

    // Failing records are saved anyway; the failure is only reported.
    store.add(saves.iter().cloned());

    let mut partial = BTreeMap::new();

    for record in &saves {
        if failing.contains(&record.id) {
            let fault = partial_fault(&mut partial, &record.id, registry);
            tracing::trace!(id = %record.id, code = fault.code().raw(), "save failed");
            op.report_progress(&record.id, registry.incomplete_progress());
            op.report_save(&record.id, Err(fault));
        } else {
            tracing::trace!(id = %record.id, "save succeeded");
            op.report_progress(&record.id, PROGRESS_COMPLETE);
            op.report_save(&record.id, Ok(record.clone()));
        }
    }

    for id in &deletes {
        if !store.contains(id) {
            tracing::trace!(id = %id, "delete of unknown record, no callback");
            continue;
        }
        if failing.contains(id) {
            let fault = partial_fault(&mut partial, id, registry);
            tracing::trace!(id = %id, code = fault.code().raw(), "delete failed");
            op.report_delete(id, Err(fault));
        } else {
            tracing::trace!(id = %id, "delete succeeded");
            op.report_delete(id, Ok(()));
        }
    }

    // Deletion is unconditional, even for records reported as failing.
    store.remove(&deletes);

    let result = terminal_result(&failing, whole, partial, registry);
    log_outcome("modify", &result);
    op.finish(result);
}

// =============================================================================
// Fetch
// =============================================================================

fn execute_fetch(
    mut op: FetchRecordsOperation,
    store: &mut RecordStore,
    registry: &mut FaultRegistry,
) {
    let matched = store.get_matching_ids(&op.record_ids);
    let failing = registry.failing();
    let whole = registry.whole_operation_error.clone();

    tracing::trace!(
        requested = op.record_ids.len(),
        found = matched.len(),
        "resolved fetch"
    );

    let mut partial = BTreeMap::new();

    for record in &matched {
        let visible = record.visible(op.desired_keys.as_ref());
        if failing.contains(&record.id) {
            let fault = partial_fault(&mut partial, &record.id, registry);
            tracing::trace!(id = %record.id, code = fault.code().raw(), "fetch failed");
            op.report_progress(&record.id, registry.incomplete_progress());
            op.report_result(&record.id, Err(fault));
        } else {
            op.report_progress(&record.id, PROGRESS_COMPLETE);
            op.report_result(&record.id, Ok(visible));
        }
    }

    let result = terminal_result(&failing, whole, partial, registry);
    log_outcome("fetch", &result);
    op.finish(result);
}

// =============================================================================
// Query
// =============================================================================

fn execute_query(mut op: QueryOperation, store: &mut RecordStore, registry: &mut FaultRegistry) {
    let limit = effective_results_limit(op.results_limit, registry.results_limit_max());

    let all_matches: Vec<&Record> = store.iter().filter(|r| op.query.matches(r)).collect();
    if all_matches.len() > limit {
        // No cursor is produced for the truncated remainder.
        tracing::debug!(
            matched = all_matches.len(),
            limit,
            "query truncated without cursor"
        );
    }
    let delivered: Vec<Record> = all_matches
        .into_iter()
        .take(limit)
        .map(|r| r.visible(op.desired_keys.as_ref()))
        .collect();

    if registry.failing_record_ids.is_some() {
        tracing::trace!("query ignores failing record ids");
    }

    match registry.whole_operation_error.clone() {
        Some(error) => {
            for record in &delivered {
                op.report_match(&record.id, Err(error.clone()));
            }
            tracing::debug!(code = error.code().raw(), "query failed");
            op.finish(Err(error));
        }
        None => {
            let count = delivered.len();
            for record in delivered {
                let id = record.id.clone();
                op.report_match(&id, Ok(record));
            }
            tracing::debug!(count, "query succeeded");
            op.finish(Ok(None));
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

// The partial-failure map holds every failing id; ids this operation never
// touched get a fresh fault.
fn terminal_result(
    failing: &BTreeSet<RecordId>,
    whole: Option<CloudError>,
    mut partial: BTreeMap<String, CloudError>,
    registry: &mut FaultRegistry,
) -> Result<(), CloudError> {
    if failing.is_empty() {
        return whole.map_or(Ok(()), Err);
    }

    if whole.is_some() {
        tracing::debug!("partial failure takes precedence over whole-operation error");
    }
    for id in failing {
        partial
            .entry(id.partial_key())
            .or_insert_with(|| registry.synthesize_fault());
    }
    Err(CloudError::partial_failure(partial))
}

// A repeated failing id reuses the fault it was first given.
fn partial_fault(
    partial: &mut BTreeMap<String, CloudError>,
    id: &RecordId,
    registry: &mut FaultRegistry,
) -> CloudError {
    partial
        .entry(id.partial_key())
        .or_insert_with(|| registry.synthesize_fault())
        .clone()
}

fn log_outcome(kind: &str, result: &Result<(), CloudError>) {
    match result {
        Ok(()) => tracing::debug!(kind, "operation succeeded"),
        Err(e) => tracing::debug!(kind, code = e.code().raw(), category = %e.category(), "operation failed"),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::config::MockConfig;
    use crate::fault::{FaultCategory, FaultCode};
    use crate::operation::{Query, QueryCursor};
    use crate::predicate::Predicate;
    use crate::store::DatabaseScope;

    type Log = Rc<RefCell<Vec<String>>>;

    fn setup() -> (RecordStore, FaultRegistry) {
        (
            RecordStore::new(DatabaseScope::Private),
            FaultRegistry::new(&MockConfig::with_seed(42)),
        )
    }

    fn note(name: &str) -> Record {
        Record::builder("Note", RecordId::named(name))
            .field("title", name)
            .field("body", "text")
            .build()
    }

    fn logged_modify(op: ModifyRecordsOperation, log: &Log) -> ModifyRecordsOperation {
        let (a, b, c, d, e) = (log.clone(), log.clone(), log.clone(), log.clone(), log.clone());
        op.on_per_record_progress(move |id, p| a.borrow_mut().push(format!("progress {id} {p}")))
            .on_per_record_save(move |id, r| {
                b.borrow_mut().push(format!("save {id} {}", if r.is_ok() { "ok" } else { "err" }));
            })
            .on_per_record_delete(move |id, r| {
                c.borrow_mut().push(format!("delete {id} {}", if r.is_ok() { "ok" } else { "err" }));
            })
            .on_modify_records_result(move |r| {
                d.borrow_mut().push(format!("result {}", if r.is_ok() { "ok" } else { "err" }));
            })
            .on_completion(move || e.borrow_mut().push("completion".to_string()))
    }

    #[test]
    fn test_modify_callback_order() {
        let (mut store, mut registry) = setup();
        store.add(vec![note("old")]);
        registry.fail_records(["b"]);
        let log: Log = Rc::default();

        let op = ModifyRecordsOperation::new(
            vec![note("a"), note("b")],
            vec![RecordId::named("old"), RecordId::named("never")],
        );
        execute(logged_modify(op, &log).into(), &mut store, &mut registry);

        assert_eq!(
            *log.borrow(),
            vec![
                "progress a 1".to_string(),
                "save a ok".to_string(),
                "progress b 0.5".to_string(),
                "save b err".to_string(),
                "delete old ok".to_string(),
                "result err".to_string(),
                "completion".to_string(),
            ]
        );
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_modify_failing_delete_still_removes() {
        let (mut store, mut registry) = setup();
        store.add(vec![note("a"), note("b")]);
        registry.fail_records(["a"]);
        let log: Log = Rc::default();

        let op = ModifyRecordsOperation::new(vec![], vec![RecordId::named("a")]);
        execute(logged_modify(op, &log).into(), &mut store, &mut registry);

        assert!(!store.contains(&RecordId::named("a")));
        assert!(log.borrow().contains(&"delete a err".to_string()));
    }

    #[test]
    fn test_per_item_fault_matches_partial_map() {
        let (mut store, mut registry) = setup();
        registry.fail_records(["a", "ghost"]);
        let item: Rc<RefCell<Option<CloudError>>> = Rc::default();
        let terminal: Rc<RefCell<Option<CloudError>>> = Rc::default();

        let (i, t) = (item.clone(), terminal.clone());
        let op = ModifyRecordsOperation::new(vec![note("a")], vec![])
            .on_per_record_save(move |_, r| *i.borrow_mut() = r.err())
            .on_modify_records_result(move |r| *t.borrow_mut() = r.err());
        execute(op.into(), &mut store, &mut registry);

        let terminal = terminal.borrow().clone().unwrap();
        let partial = terminal.partial_errors().unwrap();
        assert_eq!(Some(&partial["a"]), item.borrow().as_ref());
        assert!(partial.contains_key("ghost"));
    }

    #[test]
    fn test_partial_failure_wins_over_whole_error() {
        let (mut store, mut registry) = setup();
        store.add(vec![note("a")]);
        registry.fail_operation(FaultCode::QuotaExceeded);
        registry.fail_records(["a"]);
        let terminal: Rc<RefCell<Option<CloudError>>> = Rc::default();

        let t = terminal.clone();
        let op = FetchRecordsOperation::new(vec![RecordId::named("a")])
            .on_fetch_records_result(move |r| *t.borrow_mut() = r.err());
        execute(op.into(), &mut store, &mut registry);

        let error = terminal.borrow().clone().unwrap();
        assert_eq!(error.category(), FaultCategory::PartialFailure);
    }

    #[test]
    fn test_whole_error_without_failing_records() {
        let (mut store, mut registry) = setup();
        registry.fail_operation(FaultCode::NetworkFailure);
        let terminal: Rc<RefCell<Option<Result<(), CloudError>>>> = Rc::default();

        let t = terminal.clone();
        let op = ModifyRecordsOperation::new(vec![note("a")], vec![])
            .on_modify_records_result(move |r| *t.borrow_mut() = Some(r));
        execute(op.into(), &mut store, &mut registry);

        let result = terminal.borrow().clone().unwrap();
        assert_eq!(result.unwrap_err().code(), FaultCode::NetworkFailure);
        // The save still lands.
        assert!(store.contains(&RecordId::named("a")));
    }

    #[test]
    fn test_fetch_projection_leaves_store_untouched() {
        let (mut store, mut registry) = setup();
        store.add(vec![note("a")]);
        let seen: Rc<RefCell<Vec<Record>>> = Rc::default();

        let s = seen.clone();
        let op = FetchRecordsOperation::new(vec![RecordId::named("a")])
            .with_desired_keys(["title"])
            .on_per_record_result(move |_, r| s.borrow_mut().extend(r.ok()));
        execute(op.into(), &mut store, &mut registry);

        assert_eq!(seen.borrow()[0].keys().collect::<Vec<_>>(), vec!["title"]);
        let stored = store.record(&RecordId::named("a")).unwrap();
        assert_eq!(stored.keys().count(), 2);
    }

    #[test]
    fn test_query_whole_error_fails_every_match() {
        let (mut store, mut registry) = setup();
        store.add(vec![note("a"), note("b")]);
        registry.fail_operation(FaultCode::ZoneBusy);
        let failures = Rc::new(RefCell::new(0));
        let terminal: Rc<RefCell<Option<Result<Option<QueryCursor>, CloudError>>>> = Rc::default();

        let (f, t) = (failures.clone(), terminal.clone());
        let op = QueryOperation::new(Query::new("Note", Predicate::True))
            .on_record_matched(move |_, r| {
                if r.is_err() {
                    *f.borrow_mut() += 1;
                }
            })
            .on_query_result(move |r| *t.borrow_mut() = Some(r));
        execute(op.into(), &mut store, &mut registry);

        assert_eq!(*failures.borrow(), 2);
        let result = terminal.borrow().clone().unwrap();
        assert_eq!(result.unwrap_err().code(), FaultCode::ZoneBusy);
    }

    #[test]
    fn test_query_ignores_failing_records() {
        let (mut store, mut registry) = setup();
        store.add(vec![note("a")]);
        registry.fail_records(["a"]);
        let terminal: Rc<RefCell<Option<Result<Option<QueryCursor>, CloudError>>>> = Rc::default();

        let t = terminal.clone();
        let op = QueryOperation::new(Query::new("Note", Predicate::True))
            .on_query_result(move |r| *t.borrow_mut() = Some(r));
        execute(op.into(), &mut store, &mut registry);

        assert_eq!(terminal.borrow().clone().unwrap(), Ok(None));
    }

    #[test]
    fn test_effective_results_limit() {
        let max = QUERY_RESULTS_COUNT_MAX;
        assert_eq!(effective_results_limit(0, max), 50);
        assert_eq!(effective_results_limit(9999, max), 50);
        assert_eq!(effective_results_limit(51, max), 50);
        assert_eq!(effective_results_limit(50, max), 50);
        assert_eq!(effective_results_limit(10, max), 10);
        assert_eq!(effective_results_limit(1, max), 1);
    }

    #[test]
    fn test_effective_results_limit_lower_ceiling() {
        assert_eq!(effective_results_limit(0, 5), 5);
        assert_eq!(effective_results_limit(20, 5), 5);
        assert_eq!(effective_results_limit(3, 5), 3);
    }

    #[test]
    #[should_panic(expected = "results ceiling")]
    fn test_effective_results_limit_rejects_oversized_ceiling() {
        let _ = effective_results_limit(10, QUERY_RESULTS_COUNT_MAX + 1);
    }

    #[test]
    fn test_query_uses_configured_ceiling() {
        let mut store = RecordStore::new(DatabaseScope::Private);
        let mut registry =
            FaultRegistry::new(&MockConfig::with_seed(42).with_results_limit_max(3));
        store.add((0..10).map(|i| note(&format!("n{i}"))));
        let count = Rc::new(RefCell::new(0));

        let c = count.clone();
        let op = QueryOperation::new(Query::new("Note", Predicate::True))
            .on_record_matched(move |_, _| *c.borrow_mut() += 1);
        execute(op.into(), &mut store, &mut registry);

        assert_eq!(*count.borrow(), 3);
    }

    #[test]
    fn test_same_name_in_two_zones_keeps_both_faults() {
        let (mut store, mut registry) = setup();
        let zone_a = RecordId::in_zone("r1", "ZoneA");
        let zone_b = RecordId::in_zone("r1", "ZoneB");
        registry.fail_records([zone_a.clone(), zone_b.clone()]);
        let items: Rc<RefCell<Vec<(RecordId, CloudError)>>> = Rc::default();
        let terminal: Rc<RefCell<Option<CloudError>>> = Rc::default();

        let (i, t) = (items.clone(), terminal.clone());
        let op = ModifyRecordsOperation::new(
            vec![
                Record::builder("Note", zone_a.clone()).build(),
                Record::builder("Note", zone_b.clone()).build(),
            ],
            vec![],
        )
        .on_per_record_save(move |id, r| i.borrow_mut().extend(r.err().map(|e| (id.clone(), e))))
        .on_modify_records_result(move |r| *t.borrow_mut() = r.err());
        execute(op.into(), &mut store, &mut registry);

        let terminal = terminal.borrow().clone().unwrap();
        let partial = terminal.partial_errors().unwrap();
        assert_eq!(partial.len(), 2);
        for (id, fault) in items.borrow().iter() {
            assert_eq!(partial.get(&id.partial_key()), Some(fault));
        }
        assert!(partial.contains_key("ZoneA:r1"));
        assert!(partial.contains_key("ZoneB:r1"));
    }

    #[test]
    fn test_repeated_failing_save_reuses_fault() {
        let (mut store, mut registry) = setup();
        registry.fail_records(["a"]);
        let items: Rc<RefCell<Vec<CloudError>>> = Rc::default();
        let terminal: Rc<RefCell<Option<CloudError>>> = Rc::default();

        let (i, t) = (items.clone(), terminal.clone());
        let op = ModifyRecordsOperation::new(vec![note("a"), note("a")], vec![])
            .on_per_record_save(move |_, r| i.borrow_mut().extend(r.err()))
            .on_modify_records_result(move |r| *t.borrow_mut() = r.err());
        execute(op.into(), &mut store, &mut registry);

        let items = items.borrow();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], items[1]);
        let terminal = terminal.borrow().clone().unwrap();
        assert_eq!(terminal.partial_errors().unwrap().get("a"), Some(&items[0]));
    }

    #[test]
    fn test_records_last_operation() {
        let (mut store, mut registry) = setup();
        let op = QueryOperation::new(Query::new("Note", Predicate::True)).with_results_limit(3);
        execute(op.into(), &mut store, &mut registry);

        assert!(matches!(
            store.last_operation(),
            Some(crate::operation::OperationSummary::Query { results_limit: 3, .. })
        ));
    }
}
