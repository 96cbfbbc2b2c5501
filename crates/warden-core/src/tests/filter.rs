//! Filter module control scenarios.

use std::sync::Arc;

use crate::error::{OsError, OsOperation, WardenError};
use crate::filter::FilterModuleController;
use crate::tests::mocks::{CountingElevator, FakeFilterRegistry};
use crate::types::Outcome;

fn setup(registry: FakeFilterRegistry) -> (FilterModuleController, Arc<FakeFilterRegistry>, Arc<CountingElevator>) {
    let registry = Arc::new(registry);
    let elevator = Arc::new(CountingElevator::new());
    let controller = FilterModuleController::new(registry.clone(), elevator.clone());
    (controller, registry, elevator)
}

#[test]
fn load_then_load_again_is_idempotent() {
    let (controller, registry, elevator) = setup(FakeFilterRegistry::new());

    assert_eq!(controller.load("P4vfsFlt").unwrap(), Outcome::Applied);
    assert_eq!(
        controller.load("P4vfsFlt").unwrap(),
        Outcome::AlreadyInDesiredState
    );
    assert_eq!(registry.loaded(), vec!["P4vfsFlt"]);
    assert_eq!(elevator.calls(), 2);
}

#[test]
fn load_failure_is_surfaced_verbatim() {
    let (controller, registry, _) = setup(FakeFilterRegistry::new());
    registry.fail_load(OsError::FILE_NOT_FOUND);

    let err = controller.load("missing").unwrap_err();
    assert!(matches!(
        err,
        WardenError::Os {
            op: OsOperation::FilterLoad,
            source: OsError::FILE_NOT_FOUND
        }
    ));
}

#[test]
fn unload_of_unloaded_name_issues_no_request() {
    let (controller, registry, _) = setup(FakeFilterRegistry::with_loaded(&["bindflt"]));

    assert_eq!(
        controller.unload("P4vfsFlt").unwrap(),
        Outcome::AlreadyInDesiredState
    );
    assert_eq!(registry.unloads(), 0);
}

#[test]
fn unload_matches_case_insensitively() {
    let (controller, registry, _) = setup(FakeFilterRegistry::with_loaded(&["P4vfsFlt", "bindflt"]));

    assert_eq!(controller.unload("p4vfsflt").unwrap(), Outcome::Applied);
    assert_eq!(registry.unloads(), 1);
    assert_eq!(registry.loaded(), vec!["bindflt"]);
    assert!(!controller.is_loaded("P4vfsFlt").unwrap());
}

#[test]
fn unload_surfaces_enumeration_failure() {
    let (controller, registry, _) = setup(FakeFilterRegistry::with_loaded(&["P4vfsFlt"]));
    registry.fail_find(OsError::ACCESS_DENIED);

    let err = controller.unload("P4vfsFlt").unwrap_err();
    assert!(matches!(
        err,
        WardenError::Os {
            op: OsOperation::FilterEnumerate,
            ..
        }
    ));
    assert_eq!(registry.unloads(), 0);
}

#[test]
fn empty_names_are_rejected_before_any_call() {
    let (controller, registry, elevator) = setup(FakeFilterRegistry::new());

    for name in ["", " ", "\t"] {
        assert!(controller.load(name).unwrap_err().is_invalid_argument());
        assert!(controller.unload(name).unwrap_err().is_invalid_argument());
        assert!(controller.is_loaded(name).unwrap_err().is_invalid_argument());
    }
    assert_eq!(registry.loads(), 0);
    assert_eq!(registry.unloads(), 0);
    assert_eq!(registry.finds(), 0);
    assert_eq!(elevator.calls(), 0);
}

#[test]
fn is_loaded_is_locale_invariant() {
    let (controller, _, _) = setup(FakeFilterRegistry::with_loaded(&["FILTER"]));

    assert!(controller.is_loaded("filter").unwrap());
    assert!(!controller.is_loaded("fİlter").unwrap());
}

#[test]
fn enumeration_deduplicates_across_pages() {
    let registry = FakeFilterRegistry::with_loaded(&["wcifs", "bindflt", "wcifs", "FileInfo", "bindflt"])
        .per_page(2);
    let (controller, registry, _) = setup(registry);

    assert_eq!(
        controller.enumerate().unwrap(),
        vec!["wcifs", "bindflt", "FileInfo"]
    );
    assert_eq!(registry.cursors_closed(), 1);
}

#[test]
fn enumeration_never_yields_empty_names() {
    let (controller, _, _) = setup(FakeFilterRegistry::with_loaded(&["", "bindflt"]));

    assert_eq!(controller.enumerate().unwrap(), vec!["bindflt"]);
    assert_eq!(controller.records().unwrap().len(), 1);
}

#[test]
fn enumeration_keeps_names_differing_only_by_case() {
    let (controller, _, _) = setup(FakeFilterRegistry::with_loaded(&["Luafv", "luafv"]));
    assert_eq!(controller.enumerate().unwrap(), vec!["Luafv", "luafv"]);
}

#[test]
fn page_failure_closes_cursor_and_surfaces() {
    let registry = FakeFilterRegistry::with_loaded(&["a1", "b2", "c3"]).per_page(1);
    let (controller, registry, _) = setup(registry);
    registry.fail_page(1, OsError::INVALID_HANDLE);

    let err = controller.enumerate().unwrap_err();
    assert_eq!(err.os_error(), Some(OsError::INVALID_HANDLE));
    assert_eq!(registry.cursors_closed(), 1);
}

#[test]
fn page_too_small_for_a_record_is_surfaced() {
    let registry = FakeFilterRegistry::with_loaded(&["AVeryLongFilterModuleName"]);
    let registry = Arc::new(registry);
    let controller =
        FilterModuleController::new(registry.clone(), Arc::new(CountingElevator::new())).with_page_size(16);

    let err = controller.enumerate().unwrap_err();
    assert_eq!(err.os_error(), Some(OsError::INSUFFICIENT_BUFFER));
}

#[test]
fn records_report_frame_and_instances() {
    let (controller, _, _) = setup(FakeFilterRegistry::with_loaded(&["WdFilter"]));

    let records = controller.records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "WdFilter");
    assert_eq!(records[0].instances, 1);
}
