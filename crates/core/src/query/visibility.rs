//! Which records a viewer may see.
//!
//! The rules are expressed twice: as a predicate over a single record
//! ([`VisibilityPolicy::is_visible`]) and as a pushdown filter value
//! ([`VisibilityFilter`]) that both backends translate into their native
//! query language. The two must agree for every record inside the query's
//! owner scope.

use serde::Serialize;

use crate::record::{Record, TorrentFlags, UserId};
use crate::viewer::Viewer;

use super::types::{QualityFilter, QuerySpec};

pub struct VisibilityPolicy;

impl VisibilityPolicy {
    /// Rules, in order:
    /// 1. privileged override skips visibility filtering,
    /// 2. deleted and hidden records are excluded,
    /// 3. with an owner scope that is not the viewer, anonymous uploads are excluded,
    /// 4. the quality filter must match regardless of the above.
    pub fn is_visible(
        record: &Record,
        viewer: &Viewer,
        owner: Option<UserId>,
        privileged_override: bool,
        quality: QualityFilter,
    ) -> bool {
        if let Some((flag, expected)) = quality.predicate() {
            if record.has(flag) != expected {
                return false;
            }
        }

        if privileged_override {
            return true;
        }

        if record.flags.intersects(TorrentFlags::DELETED | TorrentFlags::HIDDEN) {
            return false;
        }

        match owner {
            Some(owner) if !viewer.is(owner) => !record.has(TorrentFlags::ANONYMOUS),
            _ => true,
        }
    }
}

/// Pushdown form of the visibility rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisibilityFilter {
    /// Flags that must all be clear.
    pub forbidden: TorrentFlags,
    /// A flag that must be in the given state.
    pub quality: Option<(TorrentFlags, bool)>,
}

impl VisibilityFilter {
    pub fn for_spec(spec: &QuerySpec) -> Self {
        let mut forbidden = TorrentFlags::empty();
        if !spec.privileged_override() {
            forbidden |= TorrentFlags::DELETED | TorrentFlags::HIDDEN;
            if let Some(owner) = spec.owner_id() {
                if !spec.viewer().is(owner) {
                    forbidden |= TorrentFlags::ANONYMOUS;
                }
            }
        }
        Self {
            forbidden,
            quality: spec.quality().predicate(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        if record.flags.intersects(self.forbidden) {
            return false;
        }
        match self.quality {
            Some((flag, expected)) => record.has(flag) == expected,
            None => true,
        }
    }

    /// Flags that must be clear, one by one.
    pub fn forbidden_flags(&self) -> impl Iterator<Item = TorrentFlags> + '_ {
        self.forbidden.iter()
    }
}
