//! FHIR search parameters and query-string encoding

/// Chained-search parameter serialized as `_has:value` instead of `_has=value`
const HAS_PARAM: &str = "_has";

/// Value of a single search parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchParam {
    Value(String),
    /// Repeated as `key=v1&key=v2`
    Values(Vec<String>),
    /// Present in the map but omitted from the query string
    Unset,
}

impl SearchParam {
    pub fn values(&self) -> &[String] {
        match self {
            SearchParam::Value(value) => std::slice::from_ref(value),
            SearchParam::Values(values) => values,
            SearchParam::Unset => &[],
        }
    }

    /// First value, if any
    pub fn first(&self) -> Option<&str> {
        self.values().first().map(String::as_str)
    }
}

impl From<&str> for SearchParam {
    fn from(value: &str) -> Self {
        SearchParam::Value(value.to_string())
    }
}

impl From<String> for SearchParam {
    fn from(value: String) -> Self {
        SearchParam::Value(value)
    }
}

impl From<&String> for SearchParam {
    fn from(value: &String) -> Self {
        SearchParam::Value(value.clone())
    }
}

macro_rules! search_param_from_display {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for SearchParam {
                fn from(value: $ty) -> Self {
                    SearchParam::Value(value.to_string())
                }
            }
        )+
    };
}

search_param_from_display!(bool, i32, i64, u32, u64, usize);

impl<T: ToString> From<Vec<T>> for SearchParam {
    fn from(values: Vec<T>) -> Self {
        SearchParam::Values(values.iter().map(ToString::to_string).collect())
    }
}

impl<T: ToString, const N: usize> From<[T; N]> for SearchParam {
    fn from(values: [T; N]) -> Self {
        SearchParam::Values(values.iter().map(ToString::to_string).collect())
    }
}

impl<T: Into<SearchParam>> From<Option<T>> for SearchParam {
    fn from(value: Option<T>) -> Self {
        value.map_or(SearchParam::Unset, Into::into)
    }
}

/// Ordered search parameters.
///
/// Keys keep their first insertion position; inserting an existing key
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams(Vec<(String, SearchParam)>);

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<SearchParam>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<SearchParam>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&SearchParam> {
        self.0
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn remove(&mut self, key: &str) -> Option<SearchParam> {
        let index = self.0.iter().position(|(existing, _)| existing == key)?;
        Some(self.0.remove(index).1)
    }

    /// Append every key of `defaults` that `self` does not already hold.
    ///
    /// A key present here wins even when its value is
    /// [`SearchParam::Unset`], which drops the default from the query.
    pub fn with_defaults(mut self, defaults: &SearchParams) -> Self {
        for (key, value) in defaults.iter() {
            if self.get(key).is_none() {
                self.0.push((key.clone(), value.clone()));
            }
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, SearchParam)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_query_string(&self) -> String {
        build_query_params(self)
    }
}

impl<K: Into<String>, V: Into<SearchParam>> FromIterator<(K, V)> for SearchParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = SearchParams::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// Serialize search parameters into a query string (without the leading `?`).
///
/// Multi-valued parameters repeat their key, unset parameters are dropped and
/// `_has` is joined with `:`. Values are percent-encoded except for `_has`,
/// whose value carries its own `:`/`=` syntax.
pub fn build_query_params(params: &SearchParams) -> String {
    params
        .iter()
        .flat_map(|(key, value)| {
            value.values().iter().map(move |item| {
                if key == HAS_PARAM {
                    format!("{key}:{item}")
                } else {
                    format!("{key}={}", urlencoding::encode(item))
                }
            })
        })
        .collect::<Vec<_>>()
        .join("&")
}
