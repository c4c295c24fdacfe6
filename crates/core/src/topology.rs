//! Positional comparison of a domain's servers against an earlier observation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Domain, Server};

/// Which server fields take part in topology comparison.
///
/// Address, country and owner always do. Grade is tracked separately on the
/// domain, so whether a grade-only difference counts as a topology change is
/// left to configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TopologyPolicy {
    pub compare_grade: bool,
}

impl Default for TopologyPolicy {
    fn default() -> Self {
        Self { compare_grade: true }
    }
}

impl TopologyPolicy {
    fn same_server(&self, current: &Server, historical: &Server) -> bool {
        current.address == historical.address
            && current.country == historical.country
            && current.owner == historical.owner
            && (!self.compare_grade || current.ssl_grade == historical.ssl_grade)
    }
}

/// Whether `current`'s servers differ from `historical`'s.
///
/// The walk is positional over the historical list and stops at the first
/// index that does not match; a reordered but otherwise identical list is
/// therefore a change. A current list shorter than the historical one is a
/// change. Servers beyond the historical length are not examined.
pub fn topology_changed(current: &Domain, historical: &Domain, policy: TopologyPolicy) -> bool {
    if std::ptr::eq(current, historical) {
        return false;
    }
    if current.servers.len() < historical.servers.len() {
        return true;
    }

    let matched = historical
        .servers
        .iter()
        .zip(&current.servers)
        .take_while(|(old, new)| policy.same_server(new, old))
        .count();

    matched != historical.servers.len()
}

/// Whether the domain grade differs from the historical one.
pub fn grade_changed(current: &Domain, historical: &Domain) -> bool {
    current.ssl_grade != historical.ssl_grade
}
