//! Tests for the `RemoteData` algebra and its aggregation combinators.

use std::collections::{BTreeMap, HashMap};
use std::future::ready;

use pretty_assertions::assert_eq;

use fhir_core::remote_data::{
    apply_data_transformer, apply_error_transformer, ensure, is_failure_any, is_loading_any,
    is_not_asked_any, is_success_all, resolve_array, resolve_map, sequence_array, sequence_map,
};
use fhir_core::{FhirError, RemoteData, Sequence};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type Tagged = RemoteData<usize, usize>;

/// Build the result for one position: 0 NotAsked, 1 Loading, 2 Success, 3 Failure.
/// Payloads carry the position so ordering can be checked.
fn tagged(tag: usize, position: usize) -> Tagged {
    match tag {
        0 => RemoteData::NotAsked,
        1 => RemoteData::Loading,
        2 => RemoteData::Success(position),
        _ => RemoteData::Failure(position),
    }
}

/// Every tag combination of the given length.
fn combinations(len: usize) -> Vec<Vec<usize>> {
    (0..4usize.pow(len as u32))
        .map(|mut code| {
            (0..len)
                .map(|_| {
                    let tag = code % 4;
                    code /= 4;
                    tag
                })
                .collect()
        })
        .collect()
}

fn expected_sequence(tags: &[usize]) -> RemoteData<Vec<usize>, Vec<usize>> {
    let positions_with = |wanted: usize| -> Vec<usize> {
        tags.iter()
            .enumerate()
            .filter(|(_, tag)| **tag == wanted)
            .map(|(position, _)| position)
            .collect()
    };

    if tags.iter().all(|tag| *tag == 2) {
        RemoteData::Success(positions_with(2))
    } else if tags.contains(&3) {
        RemoteData::Failure(positions_with(3))
    } else if tags.contains(&1) {
        RemoteData::Loading
    } else {
        RemoteData::NotAsked
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_exactly_one_predicate_holds() {
    let states: Vec<RemoteData<i32, String>> = vec![
        RemoteData::NotAsked,
        RemoteData::Loading,
        RemoteData::Success(1),
        RemoteData::Failure("boom".to_string()),
    ];

    for state in &states {
        let holding = [
            state.is_not_asked(),
            state.is_loading(),
            state.is_success(),
            state.is_failure(),
        ]
        .iter()
        .filter(|flag| **flag)
        .count();
        assert_eq!(holding, 1, "state {state:?}");
    }
}

#[test]
fn test_default_is_not_asked() {
    assert_eq!(RemoteData::<i32, String>::default(), RemoteData::NotAsked);
}

#[test]
fn test_map_identity_on_other_variants() {
    let loading: RemoteData<i32, String> = RemoteData::Loading;
    assert_eq!(loading.clone().map_success(|x| x + 1), RemoteData::Loading);
    assert_eq!(loading.map_failure(|e| e.len()), RemoteData::Loading);

    let not_asked: RemoteData<i32, String> = RemoteData::NotAsked;
    assert_eq!(not_asked.map_success(|x| x * 2), RemoteData::NotAsked);

    let failure: RemoteData<i32, String> = RemoteData::Failure("boom".to_string());
    assert_eq!(
        failure.clone().map_success(|x| x + 1),
        RemoteData::Failure("boom".to_string())
    );
    assert_eq!(failure.map_failure(|e| e.len()), RemoteData::Failure(4));

    let success: RemoteData<i32, String> = RemoteData::Success(20);
    assert_eq!(success.clone().map_success(|x| x + 1), RemoteData::Success(21));
    assert_eq!(success.map_failure(|e| e.len()), RemoteData::Success(20));
}

#[test]
fn test_accessors_are_optional() {
    let success: RemoteData<i32, String> = RemoteData::Success(3);
    assert_eq!(success.success(), Some(&3));
    assert_eq!(success.failure(), None);
    assert_eq!(success.as_ref(), RemoteData::Success(&3));
    assert_eq!(success.into_success(), Some(3));

    let failure: RemoteData<i32, String> = RemoteData::Failure("x".to_string());
    assert_eq!(failure.success(), None);
    assert_eq!(failure.into_failure(), Some("x".to_string()));
}

#[test]
fn test_and_then_and_fold() {
    let success: RemoteData<i32, String> = RemoteData::Success(2);
    let chained = success.and_then(|x| {
        if x > 1 {
            RemoteData::Success(x * 10)
        } else {
            RemoteData::Failure("too small".to_string())
        }
    });
    assert_eq!(chained, RemoteData::Success(20));

    let loading: RemoteData<i32, String> = RemoteData::Loading;
    assert_eq!(loading.and_then(RemoteData::Success), RemoteData::Loading);

    let render = |state: RemoteData<i32, String>| {
        state.fold(
            || "idle".to_string(),
            || "spinner".to_string(),
            |data| format!("data {data}"),
            |error| format!("error {error}"),
        )
    };
    assert_eq!(render(RemoteData::NotAsked), "idle");
    assert_eq!(render(RemoteData::Loading), "spinner");
    assert_eq!(render(RemoteData::Success(5)), "data 5");
    assert_eq!(render(RemoteData::Failure("x".to_string())), "error x");
}

#[test]
fn test_bulk_predicates() {
    let states: Vec<RemoteData<i32, i32>> = vec![
        RemoteData::Success(1),
        RemoteData::Loading,
        RemoteData::NotAsked,
    ];
    assert!(!is_success_all(&states));
    assert!(!is_failure_any(&states));
    assert!(is_loading_any(&states));
    assert!(is_not_asked_any(&states));

    let empty: Vec<RemoteData<i32, i32>> = Vec::new();
    assert!(is_success_all(&empty));
    assert!(!is_failure_any(&empty));
}

#[test]
fn test_sequence_array_precedence_for_every_combination() {
    for len in 2..=5 {
        for tags in combinations(len) {
            let results: Vec<Tagged> = tags
                .iter()
                .enumerate()
                .map(|(position, tag)| tagged(*tag, position))
                .collect();

            assert_eq!(
                sequence_array(results),
                expected_sequence(&tags),
                "tags {tags:?}"
            );
        }
    }
}

#[test]
fn test_sequence_array_keeps_only_failures_in_order() {
    let results: Vec<RemoteData<i32, &str>> = vec![
        RemoteData::Success(1),
        RemoteData::Failure("first"),
        RemoteData::Loading,
        RemoteData::Failure("second"),
    ];

    assert_eq!(
        sequence_array(results),
        RemoteData::Failure(vec!["first", "second"])
    );
}

#[test]
fn test_sequence_array_empty_is_success() {
    let results: Vec<RemoteData<i32, i32>> = Vec::new();
    assert_eq!(sequence_array(results), RemoteData::Success(Vec::new()));
}

#[test]
fn test_sequence_map_preserves_keys() {
    let results = vec![
        ("patient", RemoteData::<i32, String>::Success(1)),
        ("practitioner", RemoteData::Success(2)),
    ];

    let merged: RemoteData<BTreeMap<&str, i32>, Vec<String>> = sequence_map(results);
    let expected: BTreeMap<&str, i32> = [("patient", 1), ("practitioner", 2)].into();
    assert_eq!(merged, RemoteData::Success(expected));
}

#[test]
fn test_sequence_map_failure_and_loading() {
    let failed = vec![
        ("a", RemoteData::<i32, &str>::Success(1)),
        ("b", RemoteData::Failure("bad")),
        ("c", RemoteData::Loading),
    ];
    let merged: RemoteData<HashMap<&str, i32>, Vec<&str>> = sequence_map(failed);
    assert_eq!(merged, RemoteData::Failure(vec!["bad"]));

    let pending = vec![
        ("a", RemoteData::<i32, &str>::Success(1)),
        ("b", RemoteData::Loading),
    ];
    let merged: RemoteData<HashMap<&str, i32>, Vec<&str>> = sequence_map(pending);
    assert_eq!(merged, RemoteData::Loading);
}

#[test]
fn test_sequence_tuples_of_mixed_payloads() {
    let all: (RemoteData<i32, String>, RemoteData<&str, String>) =
        (RemoteData::Success(1), RemoteData::Success("two"));
    assert_eq!(all.sequence(), RemoteData::Success((1, "two")));

    let failed: (
        RemoteData<i32, String>,
        RemoteData<bool, String>,
        RemoteData<&str, String>,
    ) = (
        RemoteData::Failure("one".to_string()),
        RemoteData::Loading,
        RemoteData::Failure("three".to_string()),
    );
    assert_eq!(
        failed.sequence(),
        RemoteData::Failure(vec!["one".to_string(), "three".to_string()])
    );

    type Slot = RemoteData<i32, ()>;
    let loading: (Slot, Slot, Slot, Slot) = (
        RemoteData::Success(1),
        RemoteData::NotAsked,
        RemoteData::Loading,
        RemoteData::Success(4),
    );
    assert_eq!(loading.sequence(), RemoteData::Loading);

    let idle: (Slot, RemoteData<u8, ()>) = (RemoteData::Success(1), RemoteData::NotAsked);
    assert_eq!(idle.sequence(), RemoteData::NotAsked);
}

#[test]
fn test_ensure() {
    assert_eq!(ensure(RemoteData::<i32, String>::Success(7)), Ok(7));
    assert_eq!(
        ensure(RemoteData::<i32, String>::Loading),
        Err(FhirError::NotSuccessful("loading".to_string()))
    );
    assert!(ensure(RemoteData::<i32, String>::Failure("bad".to_string())).is_err());
}

#[tokio::test]
async fn test_resolve_array_and_map() {
    let resolved = resolve_array(vec![
        ready(RemoteData::<i32, String>::Success(1)),
        ready(RemoteData::Success(2)),
    ])
    .await;
    assert_eq!(resolved, RemoteData::Success(vec![1, 2]));

    let resolved: RemoteData<BTreeMap<&str, i32>, Vec<String>> = resolve_map(vec![
        ("a", ready(RemoteData::<i32, String>::Success(1))),
        ("b", ready(RemoteData::Failure("bad".to_string()))),
    ])
    .await;
    assert_eq!(resolved, RemoteData::Failure(vec!["bad".to_string()]));
}

#[tokio::test]
async fn test_apply_transformers() {
    let doubled =
        apply_data_transformer(ready(RemoteData::<i32, String>::Success(4)), |x| x * 2).await;
    assert_eq!(doubled, RemoteData::Success(8));

    let described = apply_error_transformer(
        ready(RemoteData::<i32, String>::Failure("bad".to_string())),
        |error| format!("error: {error}"),
    )
    .await;
    assert_eq!(described, RemoteData::Failure("error: bad".to_string()));
}
