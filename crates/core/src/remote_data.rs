//! Four-state outcome of an asynchronous operation.
//!
//! `RemoteData` distinguishes an operation that was never started, one that is
//! in flight, and the two settled outcomes. The aggregation combinators follow
//! one precedence order everywhere:
//!
//! `Success` (all) > `Failure` (any) > `Loading` (any) > `NotAsked`

use std::future::Future;

use futures::future::join_all;

use crate::error::FhirError;

/// Lifecycle of a single remote operation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RemoteData<S, F = serde_json::Value> {
    NotAsked,
    Loading,
    Success(S),
    Failure(F),
}

impl<S, F> Default for RemoteData<S, F> {
    fn default() -> Self {
        RemoteData::NotAsked
    }
}

impl<S, F> RemoteData<S, F> {
    pub fn is_not_asked(&self) -> bool {
        matches!(self, RemoteData::NotAsked)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, RemoteData::Loading)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RemoteData::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RemoteData::Failure(_))
    }

    /// Borrow the success payload, if any
    pub fn success(&self) -> Option<&S> {
        match self {
            RemoteData::Success(data) => Some(data),
            _ => None,
        }
    }

    /// Borrow the failure payload, if any
    pub fn failure(&self) -> Option<&F> {
        match self {
            RemoteData::Failure(error) => Some(error),
            _ => None,
        }
    }

    pub fn into_success(self) -> Option<S> {
        match self {
            RemoteData::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn into_failure(self) -> Option<F> {
        match self {
            RemoteData::Failure(error) => Some(error),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> RemoteData<&S, &F> {
        match self {
            RemoteData::NotAsked => RemoteData::NotAsked,
            RemoteData::Loading => RemoteData::Loading,
            RemoteData::Success(data) => RemoteData::Success(data),
            RemoteData::Failure(error) => RemoteData::Failure(error),
        }
    }

    /// Transform the success payload; every other state passes through untouched.
    pub fn map_success<R>(self, transformer: impl FnOnce(S) -> R) -> RemoteData<R, F> {
        match self {
            RemoteData::NotAsked => RemoteData::NotAsked,
            RemoteData::Loading => RemoteData::Loading,
            RemoteData::Success(data) => RemoteData::Success(transformer(data)),
            RemoteData::Failure(error) => RemoteData::Failure(error),
        }
    }

    /// Transform the failure payload; every other state passes through untouched.
    pub fn map_failure<R>(self, transformer: impl FnOnce(F) -> R) -> RemoteData<S, R> {
        match self {
            RemoteData::NotAsked => RemoteData::NotAsked,
            RemoteData::Loading => RemoteData::Loading,
            RemoteData::Success(data) => RemoteData::Success(data),
            RemoteData::Failure(error) => RemoteData::Failure(transformer(error)),
        }
    }

    /// Chain a dependent step onto a success.
    pub fn and_then<R>(self, next: impl FnOnce(S) -> RemoteData<R, F>) -> RemoteData<R, F> {
        match self {
            RemoteData::NotAsked => RemoteData::NotAsked,
            RemoteData::Loading => RemoteData::Loading,
            RemoteData::Success(data) => next(data),
            RemoteData::Failure(error) => RemoteData::Failure(error),
        }
    }

    /// Collapse the four states into one value, one handler per state.
    pub fn fold<R>(
        self,
        not_asked: impl FnOnce() -> R,
        loading: impl FnOnce() -> R,
        success: impl FnOnce(S) -> R,
        failure: impl FnOnce(F) -> R,
    ) -> R {
        match self {
            RemoteData::NotAsked => not_asked(),
            RemoteData::Loading => loading(),
            RemoteData::Success(data) => success(data),
            RemoteData::Failure(error) => failure(error),
        }
    }
}

impl<S, F> From<Result<S, F>> for RemoteData<S, F> {
    fn from(result: Result<S, F>) -> Self {
        match result {
            Ok(data) => RemoteData::Success(data),
            Err(error) => RemoteData::Failure(error),
        }
    }
}

/// Unwrap a success, reporting any other state as an error.
pub fn ensure<S, F: std::fmt::Debug>(result: RemoteData<S, F>) -> Result<S, FhirError> {
    match result {
        RemoteData::Success(data) => Ok(data),
        RemoteData::NotAsked => Err(FhirError::NotSuccessful("not asked".to_string())),
        RemoteData::Loading => Err(FhirError::NotSuccessful("loading".to_string())),
        RemoteData::Failure(error) => Err(FhirError::NotSuccessful(format!("{error:?}"))),
    }
}

pub fn is_success_all<'a, S: 'a, F: 'a>(
    results: impl IntoIterator<Item = &'a RemoteData<S, F>>,
) -> bool {
    results.into_iter().all(RemoteData::is_success)
}

pub fn is_failure_any<'a, S: 'a, F: 'a>(
    results: impl IntoIterator<Item = &'a RemoteData<S, F>>,
) -> bool {
    results.into_iter().any(RemoteData::is_failure)
}

pub fn is_loading_any<'a, S: 'a, F: 'a>(
    results: impl IntoIterator<Item = &'a RemoteData<S, F>>,
) -> bool {
    results.into_iter().any(RemoteData::is_loading)
}

pub fn is_not_asked_any<'a, S: 'a, F: 'a>(
    results: impl IntoIterator<Item = &'a RemoteData<S, F>>,
) -> bool {
    results.into_iter().any(RemoteData::is_not_asked)
}

/// Reduce an ordered collection of results into one.
///
/// A failure keeps only the failure payloads, in their original order.
pub fn sequence_array<T, F>(
    results: impl IntoIterator<Item = RemoteData<T, F>>,
) -> RemoteData<Vec<T>, Vec<F>> {
    let results: Vec<RemoteData<T, F>> = results.into_iter().collect();

    if is_success_all(&results) {
        return RemoteData::Success(
            results
                .into_iter()
                .filter_map(RemoteData::into_success)
                .collect(),
        );
    }

    if is_failure_any(&results) {
        return RemoteData::Failure(
            results
                .into_iter()
                .filter_map(RemoteData::into_failure)
                .collect(),
        );
    }

    if is_loading_any(&results) {
        return RemoteData::Loading;
    }

    RemoteData::NotAsked
}

/// Zip keys back onto positional values.
fn keys_map_transformer<K, T, M>(keys: Vec<K>) -> impl FnOnce(Vec<T>) -> M
where
    M: FromIterator<(K, T)>,
{
    move |values| keys.into_iter().zip(values).collect()
}

/// Keyed counterpart of [`sequence_array`]; the success payload keeps the keys.
pub fn sequence_map<K, T, F, M>(
    results: impl IntoIterator<Item = (K, RemoteData<T, F>)>,
) -> RemoteData<M, Vec<F>>
where
    M: FromIterator<(K, T)>,
{
    let (keys, values): (Vec<K>, Vec<RemoteData<T, F>>) = results.into_iter().unzip();
    sequence_array(values).map_success(keys_map_transformer(keys))
}

/// Sequencing for tuples of results with different payload types.
pub trait Sequence {
    type Output;
    type Error;

    fn sequence(self) -> RemoteData<Self::Output, Vec<Self::Error>>;
}

macro_rules! impl_sequence_for_tuple {
    ($($ty:ident $var:ident),+) => {
        impl<X, $($ty),+> Sequence for ($(RemoteData<$ty, X>,)+) {
            type Output = ($($ty,)+);
            type Error = X;

            fn sequence(self) -> RemoteData<Self::Output, Vec<X>> {
                match self {
                    ($(RemoteData::Success($var),)+) => RemoteData::Success(($($var,)+)),
                    ($($var,)+) => {
                        let failed = false $(|| $var.is_failure())+;
                        if failed {
                            let mut errors = Vec::new();
                            $(
                                if let RemoteData::Failure(error) = $var {
                                    errors.push(error);
                                }
                            )+
                            return RemoteData::Failure(errors);
                        }

                        if false $(|| $var.is_loading())+ {
                            RemoteData::Loading
                        } else {
                            RemoteData::NotAsked
                        }
                    }
                }
            }
        }
    };
}

impl_sequence_for_tuple!(A a, B b);
impl_sequence_for_tuple!(A a, B b, C c);
impl_sequence_for_tuple!(A a, B b, C c, D d);
impl_sequence_for_tuple!(A a, B b, C c, D d, E e);
impl_sequence_for_tuple!(A a, B b, C c, D d, E e, G g);

/// Await every pending result concurrently, then sequence them.
pub async fn resolve_array<T, F, Fut>(
    pending: impl IntoIterator<Item = Fut>,
) -> RemoteData<Vec<T>, Vec<F>>
where
    Fut: Future<Output = RemoteData<T, F>>,
{
    sequence_array(join_all(pending).await)
}

/// Keyed counterpart of [`resolve_array`].
pub async fn resolve_map<K, T, F, M, Fut>(
    pending: impl IntoIterator<Item = (K, Fut)>,
) -> RemoteData<M, Vec<F>>
where
    Fut: Future<Output = RemoteData<T, F>>,
    M: FromIterator<(K, T)>,
{
    let (keys, futures): (Vec<K>, Vec<Fut>) = pending.into_iter().unzip();
    let results = join_all(futures).await;
    sequence_map(keys.into_iter().zip(results))
}

/// Alias of [`resolve_map`] for maps of service calls.
pub async fn resolve_service_map<K, T, F, M, Fut>(
    pending: impl IntoIterator<Item = (K, Fut)>,
) -> RemoteData<M, Vec<F>>
where
    Fut: Future<Output = RemoteData<T, F>>,
    M: FromIterator<(K, T)>,
{
    resolve_map(pending).await
}

pub async fn apply_data_transformer<S, F, R>(
    pending: impl Future<Output = RemoteData<S, F>>,
    transformer: impl FnOnce(S) -> R,
) -> RemoteData<R, F> {
    pending.await.map_success(transformer)
}

pub async fn apply_error_transformer<S, F, R>(
    pending: impl Future<Output = RemoteData<S, F>>,
    transformer: impl FnOnce(F) -> R,
) -> RemoteData<S, R> {
    pending.await.map_failure(transformer)
}
