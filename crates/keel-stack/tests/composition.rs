//! Stack assembly, validation and the derived requirement/option views

mod common;

use common::*;
use keel_stack::{
    ArtifactStore, ComponentSet, ContainerRegistry, LifecycleConfig, Stack, StackComponent,
    StackError, StackValidator,
};
use keel_types::ComponentCategory;
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// Records the `component` field of every WARN event
#[derive(Clone, Default)]
struct WarningRecorder(Arc<Mutex<Vec<String>>>);

impl WarningRecorder {
    fn components(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

struct ComponentField(Option<String>);

impl Visit for ComponentField {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "component" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S: Subscriber> Layer<S> for WarningRecorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            let mut field = ComponentField(None);
            event.record(&mut field);
            self.0.lock().unwrap().push(field.0.unwrap_or_default());
        }
    }
}

fn three_slot(journal: &Journal) -> ComponentSet {
    ComponentSet::new(
        Arc::new(orchestrator(journal)),
        Arc::new(metadata_store(journal)),
        Arc::new(artifact_store(journal)),
    )
}

#[test]
fn test_stack_without_registry_exposes_three_components() {
    let journal = Journal::default();
    let stack = Stack::new("dev", three_slot(&journal)).unwrap();

    let components = stack.components();
    assert_eq!(
        components.keys().copied().collect::<Vec<_>>(),
        vec![
            ComponentCategory::Orchestrator,
            ComponentCategory::MetadataStore,
            ComponentCategory::ArtifactStore,
        ]
    );
    assert_eq!(components[&ComponentCategory::MetadataStore].name(), "metadata_store");
    assert!(stack.container_registry().is_none());
    assert!(journal.entries().is_empty());
}

#[test]
fn test_stack_with_registry_exposes_four_components() {
    let journal = Journal::default();
    let stack = Stack::new("full", full_components(&journal)).unwrap();

    let components = stack.components();
    assert_eq!(components.len(), 4);
    assert_eq!(
        components[&ComponentCategory::ContainerRegistry].name(),
        "container_registry"
    );
    assert_eq!(stack.container_registry().unwrap().uri(), "mock://registry");
}

#[test]
fn test_failing_validator_prevents_construction() {
    let journal = Journal::default();
    let components = ComponentSet::new(
        Arc::new(orchestrator(&journal)),
        Arc::new(metadata_store(&journal)),
        Arc::new(
            artifact_store(&journal)
                .with_validator(StackValidator::from_fn(|_| Err("never compatible".into()))),
        ),
    );

    let err = Stack::new("broken", components).unwrap_err();
    assert!(err.is_validation_error());
    assert_eq!(err.component(), Some("artifact_store"));
    match err {
        StackError::Validation {
            category, reason, ..
        } => {
            assert_eq!(category, ComponentCategory::ArtifactStore);
            assert_eq!(reason, "never compatible");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_validator_requiring_missing_registry() {
    let journal = Journal::default();
    let validator = StackValidator::requiring([ComponentCategory::ContainerRegistry]);

    let err = Stack::new(
        "no-registry",
        ComponentSet::new(
            Arc::new(orchestrator(&journal).with_validator(validator.clone())),
            Arc::new(metadata_store(&journal)),
            Arc::new(artifact_store(&journal)),
        ),
    )
    .unwrap_err();
    assert!(err
        .to_string()
        .contains("missing required components: container_registry"));

    let stack = Stack::new(
        "with-registry",
        ComponentSet::new(
            Arc::new(orchestrator(&journal).with_validator(validator)),
            Arc::new(metadata_store(&journal)),
            Arc::new(artifact_store(&journal)),
        )
        .with_container_registry(Arc::new(container_registry(&journal))),
    );
    assert!(stack.is_ok());
}

#[test]
fn test_custom_validator_inspects_other_components() {
    let journal = Journal::default();
    let validator = StackValidator::from_fn(|stack| {
        if stack.artifact_store().path().starts_with("/mock") {
            Ok(())
        } else {
            Err("artifact store must be a mock".into())
        }
    });

    let stack = Stack::new(
        "inspected",
        ComponentSet::new(
            Arc::new(orchestrator(&journal)),
            Arc::new(metadata_store(&journal).with_validator(validator)),
            Arc::new(artifact_store(&journal)),
        ),
    );
    assert!(stack.is_ok());
}

#[test]
fn test_component_in_wrong_slot_is_rejected() {
    let journal = Journal::default();
    let err = Stack::new(
        "misplaced",
        ComponentSet::new(
            Arc::new(orchestrator(&journal)),
            Arc::new(artifact_store(&journal)),
            Arc::new(artifact_store(&journal)),
        ),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        StackError::MisplacedComponent {
            slot: ComponentCategory::MetadataStore,
            found: ComponentCategory::ArtifactStore,
            ..
        }
    ));
}

#[test]
fn test_local_only_component_under_remote_orchestrator() {
    let journal = Journal::default();
    let components = || {
        ComponentSet::new(
            Arc::new(orchestrator(&journal).remote_only()),
            Arc::new(metadata_store(&journal)),
            Arc::new(artifact_store(&journal).local_only()),
        )
    };

    let err = Stack::new("remote", components()).unwrap_err();
    assert!(matches!(
        err,
        StackError::UnsupportedExecutionMode {
            category: ComponentCategory::ArtifactStore,
            ..
        }
    ));

    let relaxed = LifecycleConfig {
        enforce_execution_mode: false,
        ..Default::default()
    };
    assert!(Stack::with_config("remote", components(), relaxed).is_ok());
}

#[test]
fn test_invalid_lifecycle_config_is_rejected() {
    let journal = Journal::default();
    let config = LifecycleConfig {
        event_capacity: 0,
        ..Default::default()
    };

    let err = Stack::with_config("dev", three_slot(&journal), config).unwrap_err();
    assert!(matches!(err, StackError::Config(_)));
}

#[test]
fn test_requirements_concatenate_in_lifecycle_order() {
    let journal = Journal::default();
    let stack = Stack::new(
        "reqs",
        ComponentSet::new(
            Arc::new(orchestrator(&journal).with_requirements(&["kfp==1.8", "requests"])),
            Arc::new(metadata_store(&journal).with_requirements(&["sqlalchemy"])),
            Arc::new(artifact_store(&journal).with_requirements(&["gcsfs", "requests"])),
        )
        .with_container_registry(Arc::new(
            container_registry(&journal).with_requirements(&["docker"]),
        )),
    )
    .unwrap();

    assert_eq!(
        stack.requirements(&BTreeSet::new()),
        vec!["kfp==1.8", "requests", "sqlalchemy", "gcsfs", "requests", "docker"]
    );
    assert_eq!(
        stack.requirements(&BTreeSet::from([
            ComponentCategory::Orchestrator,
            ComponentCategory::ContainerRegistry,
        ])),
        vec!["sqlalchemy", "gcsfs", "requests"]
    );
}

#[test]
fn test_duplicate_runtime_options_last_writer_wins() {
    let journal = Journal::default();
    let stack = Stack::new(
        "options",
        ComponentSet::new(
            Arc::new(
                orchestrator(&journal)
                    .with_option("image", json!("orchestrator-image"))
                    .with_option("parallelism", json!(4)),
            ),
            Arc::new(metadata_store(&journal).with_option("image", json!("metadata-image"))),
            Arc::new(artifact_store(&journal).with_option("compress", json!(true))),
        )
        .with_container_registry(Arc::new(
            container_registry(&journal).with_option("image", json!("registry-image")),
        )),
    )
    .unwrap();

    let options = stack.runtime_options();
    assert_eq!(options.len(), 3);
    assert_eq!(options["image"], json!("registry-image"));
    assert_eq!(options["parallelism"], json!(4));
    assert_eq!(options["compress"], json!(true));
    assert_eq!(stack.duplicate_runtime_options(), vec!["image".to_string()]);
}

#[test]
fn test_runtime_option_collision_is_warned_once() {
    let journal = Journal::default();
    let stack = Stack::new(
        "options",
        ComponentSet::new(
            Arc::new(
                orchestrator(&journal)
                    .with_option("retries", json!(1))
                    .with_option("image", json!("base")),
            ),
            Arc::new(metadata_store(&journal).with_option("retries", json!(3))),
            Arc::new(artifact_store(&journal).with_option("compress", json!(true))),
        ),
    )
    .unwrap();

    let recorder = WarningRecorder::default();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());
    let (options, duplicates) = tracing::subscriber::with_default(subscriber, || {
        (stack.runtime_options(), stack.duplicate_runtime_options())
    });

    assert_eq!(options["retries"], json!(3));
    assert_eq!(duplicates, vec!["retries".to_string()]);
    assert_eq!(recorder.components(), vec!["metadata_store".to_string()]);
}

#[test]
fn test_distinct_runtime_options_are_not_warned() {
    let journal = Journal::default();
    let stack = Stack::new("options", three_slot(&journal)).unwrap();

    let recorder = WarningRecorder::default();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());
    tracing::subscriber::with_default(subscriber, || stack.runtime_options());

    assert!(recorder.components().is_empty());
}

#[test]
fn test_distinct_runtime_options_have_no_duplicates() {
    let journal = Journal::default();
    let stack = Stack::new(
        "options",
        ComponentSet::new(
            Arc::new(orchestrator(&journal).with_option("a", json!(1))),
            Arc::new(metadata_store(&journal).with_option("b", json!(2))),
            Arc::new(artifact_store(&journal)),
        ),
    )
    .unwrap();

    assert_eq!(stack.runtime_options().len(), 2);
    assert!(stack.duplicate_runtime_options().is_empty());
}

fn category_strategy() -> impl Strategy<Value = BTreeSet<ComponentCategory>> {
    proptest::sample::subsequence(ComponentCategory::ALL.to_vec(), 0..=4)
        .prop_map(|categories| categories.into_iter().collect())
}

proptest! {
    #[test]
    fn prop_requirements_skip_excluded_categories(
        lists in proptest::collection::vec(
            proptest::collection::vec("[a-z]{1,6}", 0..4),
            4,
        ),
        exclude in category_strategy(),
    ) {
        let journal = Journal::default();
        let as_refs = |i: usize| lists[i].iter().map(String::as_str).collect::<Vec<_>>();
        let stack = Stack::new(
            "prop",
            ComponentSet::new(
                Arc::new(orchestrator(&journal).with_requirements(&as_refs(0))),
                Arc::new(metadata_store(&journal).with_requirements(&as_refs(1))),
                Arc::new(artifact_store(&journal).with_requirements(&as_refs(2))),
            )
            .with_container_registry(Arc::new(
                container_registry(&journal).with_requirements(&as_refs(3)),
            )),
        )
        .unwrap();

        let expected: Vec<String> = ComponentCategory::ALL
            .iter()
            .zip(lists.iter())
            .filter(|(category, _)| !exclude.contains(*category))
            .flat_map(|(_, list)| list.clone())
            .collect();

        prop_assert_eq!(stack.requirements(&exclude), expected);
    }
}
