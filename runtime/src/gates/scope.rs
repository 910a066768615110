//! Scope and uniqueness gate.

use super::normalize::host_of;
use super::Verdict;
use crate::config::RunConfig;
use dashmap::DashSet;

/// Keeps a run inside its target domain and lets each canonical URL through once.
#[derive(Debug)]
pub struct ScopeGate {
    domain: Option<String>,
    wildcard: bool,
    dedup: bool,
    seen: DashSet<String>,
}

impl ScopeGate {
    pub fn new(domain: Option<&str>, wildcard: bool, dedup: bool) -> Self {
        Self {
            domain: domain.map(str::to_ascii_lowercase),
            wildcard,
            dedup,
            seen: DashSet::new(),
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.domain.as_deref(), config.wildcard, !config.no_dedup)
    }

    /// Pass iff the URL is in scope and, with dedup on, has not passed before.
    pub fn check(&self, canonical: &str) -> Verdict {
        if self.domain.is_some() {
            match host_of(canonical) {
                Some(host) if self.in_scope(&host) => {}
                _ => return Verdict::Drop,
            }
        }

        if !self.dedup {
            return Verdict::Pass;
        }

        // DashSet::insert is a single locked operation on the key's shard.
        if self.seen.insert(canonical.to_string()) {
            Verdict::Pass
        } else {
            Verdict::Drop
        }
    }

    /// Exact domain match, or a strict subdomain in wildcard mode.
    pub fn in_scope(&self, host: &str) -> bool {
        let Some(domain) = &self.domain else {
            return true;
        };
        let host = host.to_ascii_lowercase();
        if host == *domain {
            return true;
        }
        self.wildcard
            && host
                .strip_suffix(domain.as_str())
                .is_some_and(|prefix| prefix.len() > 1 && prefix.ends_with('.'))
    }

    /// Number of distinct URLs accepted so far.
    pub fn accepted(&self) -> usize {
        self.seen.len()
    }
}
