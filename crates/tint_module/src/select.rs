//! Ranking interface records against a request
//!
//! ```text
//!   rank = registration match            (0 drops the candidate)
//!        + can_handle rank of the queries (negative drops the candidate)
//!        × PREFERRED_BOOST                (preferred module only)
//! ```
//!
//! Ties keep discovery order.

use crate::api::{Api, ApiKind};
use crate::info::ModuleId;
use crate::interfaces::Query;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::HashSet;
use tint_core::object::Ref;
use tint_core::registration::{registration_match, strip_implementation_attrs};

/// Rank multiplier for the preferred module
pub const PREFERRED_BOOST: u32 = 10;

/// What to select
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SelectRequest {
    pub pattern: String,
    pub kind: Option<ApiKind>,
    pub preferred: Option<ModuleId>,
    pub queries: Vec<Query>,
    /// Keep only the best of candidates equal up to implementation attributes
    pub dedupe: bool,
}

impl SelectRequest {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Default::default()
        }
    }

    pub fn kind(mut self, kind: ApiKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn preferred(mut self, id: ModuleId) -> Self {
        self.preferred = Some(id);
        self
    }

    pub fn query(mut self, query: Query) -> Self {
        self.queries.push(query);
        self
    }

    pub fn dedupe(mut self) -> Self {
        self.dedupe = true;
        self
    }
}

/// A selected record with its rank
#[derive(Clone, Debug)]
pub struct Ranked {
    pub api: Ref<Api>,
    pub module: ModuleId,
    pub rank: u32,
}

/// Rank validated `candidates` (in discovery order) against `request`
pub fn rank(candidates: impl IntoIterator<Item = Ref<Api>>, request: &SelectRequest) -> Vec<Ranked> {
    let mut ranked = Vec::new();

    for api in candidates {
        let Some(kind) = (*api).kind() else { continue };
        if !api.is_valid() || request.kind.is_some_and(|k| k != kind) {
            continue;
        }

        let matched = registration_match(api.registration(), &request.pattern, kind.digit());
        if matched == 0 {
            continue;
        }

        let mut rank = matched;
        if let Some(can_handle) = &api.header().can_handle {
            let answer = can_handle.rank(&request.queries);
            if answer < 0 {
                log::warn!(
                    "{} '{}' of module '{}' cannot handle the request ({})",
                    kind,
                    api.registration(),
                    api.module(),
                    answer
                );
                continue;
            }
            rank = rank.saturating_add(answer.unsigned_abs());
        }

        if request.preferred == Some(api.module()) {
            rank = rank.saturating_mul(PREFERRED_BOOST);
        }

        ranked.push(Ranked {
            module: api.module(),
            api,
            rank,
        });
    }

    // Stable: equal ranks keep discovery order
    ranked.sort_by(|a, b| b.rank.cmp(&a.rank));

    if request.dedupe {
        let mut seen = HashSet::new();
        ranked.retain(|r| seen.insert(strip_implementation_attrs(r.api.registration())));
    }

    ranked
}

/// Selection results keyed by request, cleared whenever modules change
#[derive(Default)]
pub struct SelectionCache {
    entries: Mutex<HashMap<SelectRequest, Vec<Ranked>>>,
}

impl SelectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, request: &SelectRequest) -> Option<Vec<Ranked>> {
        self.entries.lock().get(request).cloned()
    }

    pub fn insert(&self, request: SelectRequest, ranked: Vec<Ranked>) {
        self.entries.lock().insert(request, ranked);
    }

    pub fn clear(&self) {
        // Drop the cached refs outside the lock
        let entries = std::mem::take(&mut *self.entries.lock());
        drop(entries);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiDecl, ApiHeader, ApiPayload};
    use crate::check::Validation;
    use crate::interfaces::{CanHandle, DataExchangeApi, QueryKind, Request};
    use std::sync::Arc;
    use tint_core::Version;

    struct IccOnly;

    impl CanHandle for IccOnly {
        fn can_handle(&self, query: QueryKind, value: i64) -> bool {
            query == QueryKind::ProfileFormat && value == 1
        }
    }

    fn valid(id: &str, registration: &str) -> Ref<Api> {
        let api = Api::standalone(
            ModuleId::new(id).unwrap(),
            ApiDecl::new(
                ApiHeader::new(registration, Version::new(1, 0, 0)),
                ApiPayload::DataExchange(DataExchangeApi::default()),
            ),
        );
        api.set_validation(Validation::Valid(ApiKind::DataExchange));
        api
    }

    #[test]
    fn test_ties_keep_discovery_order() {
        let a = valid("aaaa", "org/test/color/icc_color.one");
        let b = valid("bbbb", "org/test/color/icc_color.two");
        let ranked = rank(vec![a, b], &SelectRequest::new("//color/icc_color"));
        let ids: Vec<String> = ranked.iter().map(|r| r.module.to_string()).collect();
        assert_eq!(ids, vec!["aaaa", "bbbb"]);
    }

    #[test]
    fn test_unvalidated_and_mismatched_are_dropped() {
        let a = valid("aaaa", "org/test/color/icc_color.one");
        let pending = Api::standalone(
            ModuleId::new("bbbb").unwrap(),
            ApiDecl::new(
                ApiHeader::new("org/test/color/icc_color.two", Version::new(1, 0, 0)),
                ApiPayload::DataExchange(DataExchangeApi::default()),
            ),
        );
        let other = valid("cccc", "org/test/color/device.monitor");
        let ranked = rank(vec![a, pending, other], &SelectRequest::new("//color/icc_color"));
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].module.to_string(), "aaaa");
    }

    #[test]
    fn test_hard_query_excludes() {
        let header = ApiHeader::new("org/test/color/icc_color.one", Version::new(1, 0, 0))
            .can_handle(Arc::new(IccOnly));
        let api = Api::standalone(
            ModuleId::new("aaaa").unwrap(),
            ApiDecl::new(header, ApiPayload::DataExchange(DataExchangeApi::default())),
        );
        api.set_validation(Validation::Valid(ApiKind::DataExchange));

        let icc = SelectRequest::new("//color/icc_color")
            .query(Query::new(QueryKind::ProfileFormat, 1, Request::Much));
        assert_eq!(rank(vec![api.clone()], &icc)[0].rank, 2 + 3);

        let hdr = SelectRequest::new("//color/icc_color")
            .query(Query::new(QueryKind::Hdr, 16, Request::Hard));
        assert!(rank(vec![api], &hdr).is_empty());
    }

    #[test]
    fn test_huge_answers_saturate() {
        struct Eager;
        impl CanHandle for Eager {
            fn can_handle(&self, _query: QueryKind, _value: i64) -> bool {
                true
            }

            fn rank(&self, _queries: &[Query]) -> i32 {
                i32::MAX
            }
        }

        let header = ApiHeader::new("org/test/color/icc_color.one", Version::new(1, 0, 0))
            .can_handle(Arc::new(Eager));
        let api = Api::standalone(
            ModuleId::new("aaaa").unwrap(),
            ApiDecl::new(header, ApiPayload::DataExchange(DataExchangeApi::default())),
        );
        api.set_validation(Validation::Valid(ApiKind::DataExchange));

        let request =
            SelectRequest::new("//color/icc_color").preferred(ModuleId::new("aaaa").unwrap());
        assert_eq!(rank(vec![api], &request)[0].rank, u32::MAX);
    }

    #[test]
    fn test_dedupe_keeps_best() {
        let a = valid("aaaa", "org/test/color/icc_color._fast");
        let b = valid("bbbb", "org/test/color/icc_color._exact");
        let request = SelectRequest::new("//color/icc_color._exact").dedupe();
        let ranked = rank(vec![a, b], &request);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].module.to_string(), "bbbb");
    }

    #[test]
    fn test_cache() {
        let cache = SelectionCache::new();
        let request = SelectRequest::new("//color");
        cache.insert(request.clone(), Vec::new());
        assert!(cache.get(&request).is_some());
        cache.clear();
        assert!(cache.is_empty());
    }
}
