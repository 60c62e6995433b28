// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Document queries: exact-match filters, ordering and paging.

use rv_core::{Relval, RelvalStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Newest campaign first, then id
    #[default]
    CampaignDesc,
    /// By id
    Id,
}

/// Filters are ANDed; unset filters match everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub status: Option<RelvalStatus>,
    pub cmssw_release: Option<String>,
    pub batch_name: Option<String>,
    /// Id namespace, i.e. the id without its serial
    pub namespace: Option<String>,
    pub sort: SortOrder,
    /// Zero-based page index
    pub page: usize,
    /// Page size; 0 means unlimited
    pub limit: usize,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            status: None,
            cmssw_release: None,
            batch_name: None,
            namespace: None,
            sort: SortOrder::default(),
            page: 0,
            limit: 50,
        }
    }
}

impl Query {
    /// Every live document, unpaged.
    pub fn all() -> Self {
        Self {
            limit: 0,
            ..Self::default()
        }
    }

    /// Every live document in `status`, unpaged.
    pub fn with_status(status: RelvalStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::all()
        }
    }

    pub fn matches(&self, relval: &Relval) -> bool {
        if relval.deleted {
            return false;
        }
        if self.status.is_some_and(|s| s != relval.status) {
            return false;
        }
        if let Some(release) = &self.cmssw_release {
            if release != &relval.cmssw_release {
                return false;
            }
        }
        if let Some(batch) = &self.batch_name {
            if batch != &relval.batch_name {
                return false;
            }
        }
        if let Some(namespace) = &self.namespace {
            if relval.id.namespace() != Some(namespace.as_str()) {
                return false;
            }
        }
        true
    }

    /// Filter, order and page `docs`.
    pub fn apply<'a>(&self, docs: impl Iterator<Item = &'a Relval>) -> Page {
        let mut matched: Vec<Relval> = docs.filter(|r| self.matches(r)).cloned().collect();
        match self.sort {
            SortOrder::CampaignDesc => matched.sort_by(|a, b| {
                b.campaign_timestamp
                    .cmp(&a.campaign_timestamp)
                    .then_with(|| a.id.cmp(&b.id))
            }),
            SortOrder::Id => matched.sort_by(|a, b| a.id.cmp(&b.id)),
        }
        let total = matched.len();
        let items = if self.limit == 0 {
            matched
        } else {
            matched
                .into_iter()
                .skip(self.page.saturating_mul(self.limit))
                .take(self.limit)
                .collect()
        };
        Page { items, total }
    }
}

/// One page of query results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Relval>,
    /// Matches across all pages
    pub total: usize,
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
