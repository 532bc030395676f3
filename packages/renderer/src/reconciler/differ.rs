//! Keyed child list diff.
//!
//! Four cursors walk the old and new lists from both ends. While they agree,
//! fibers are patched in place; crossed ends become moves; anything else
//! falls back to a key lookup. Between steps the document holds, in order:
//! the already placed prefix of the new list, the untouched old window, the
//! already placed suffix of the new list, then the tail anchor.

use super::Reconciler;
use crate::arena::FiberId;
use crate::context::Context;
use crate::error::{RenderError, RenderResult};
use crate::handle::{Anchor, NodeHandle};
use crate::vnode::{Key, VNode};
use std::collections::HashMap;
use std::ops::Range;
use tracing::{trace, warn};

impl Reconciler {
    pub(super) fn patch_children(
        &mut self,
        parent: FiberId,
        container: &NodeHandle,
        mut old: Vec<Option<FiberId>>,
        children: Vec<VNode>,
        context: &Context,
        tail: &Anchor,
    ) -> RenderResult<Vec<Option<FiberId>>> {
        let mut next: Vec<Option<VNode>> = children.into_iter().map(Some).collect();
        let mut result: Vec<Option<FiberId>> = vec![None; next.len()];
        let mut keyed: Option<HashMap<Key, usize>> = None;

        let (mut old_start, mut old_end) = (0, old.len());
        let (mut new_start, mut new_end) = (0, next.len());

        while old_start < old_end && new_start < new_end {
            let Some(old_first) = old[old_start] else {
                old_start += 1;
                continue;
            };
            let Some(old_last) = old[old_end - 1] else {
                old_end -= 1;
                continue;
            };

            if self.same(old_first, next[new_start].as_ref())? {
                let vnode = take(&mut next, new_start)?;
                result[new_start] =
                    Some(self.patch(Some(old_first), vnode, Some(parent), context, &Anchor::End)?);
                old_start += 1;
                new_start += 1;
            } else if self.same(old_last, next[new_end - 1].as_ref())? {
                let vnode = take(&mut next, new_end - 1)?;
                result[new_end - 1] =
                    Some(self.patch(Some(old_last), vnode, Some(parent), context, &Anchor::End)?);
                old_end -= 1;
                new_end -= 1;
            } else if self.same(old_first, next[new_end - 1].as_ref())? {
                // First of the window belongs at its end.
                let anchor = self.before_suffix(&result, new_end, tail)?;
                let vnode = take(&mut next, new_end - 1)?;
                let id = self.patch(Some(old_first), vnode, Some(parent), context, &Anchor::End)?;
                self.move_fiber(container, id, anchor)?;
                result[new_end - 1] = Some(id);
                old_start += 1;
                new_end -= 1;
            } else if self.same(old_last, next[new_start].as_ref())? {
                // Last of the window belongs at its start.
                let anchor =
                    self.before_window(&old, old_start..old_end - 1, &result, new_end, tail)?;
                let vnode = take(&mut next, new_start)?;
                let id = self.patch(Some(old_last), vnode, Some(parent), context, &Anchor::End)?;
                self.move_fiber(container, id, anchor)?;
                result[new_start] = Some(id);
                old_end -= 1;
                new_start += 1;
            } else {
                let vnode = take(&mut next, new_start)?;
                if keyed.is_none() {
                    keyed = Some(self.key_index(&old, old_start..old_end)?);
                }
                let candidate = match &keyed {
                    Some(index) if !vnode.key.is_empty() => index.get(&vnode.key).copied(),
                    _ => None,
                };

                let mut reused = None;
                if let Some(i) = candidate.filter(|i| (old_start..old_end).contains(i)) {
                    if let Some(id) = old[i] {
                        if self.fiber(id)?.matches(&vnode) {
                            old[i] = None;
                            reused = Some(id);
                        }
                    }
                }

                let anchor = self.before_window(&old, old_start..old_end, &result, new_end, tail)?;
                let id = match reused {
                    Some(id) => {
                        trace!(key = %vnode.key, fiber = %id, "reusing keyed fiber");
                        let id = self.patch(Some(id), vnode, Some(parent), context, &Anchor::End)?;
                        self.move_fiber(container, id, anchor)?;
                        id
                    }
                    None => self.patch(None, vnode, Some(parent), context, &anchor)?,
                };
                result[new_start] = Some(id);
                new_start += 1;
            }
        }

        if new_start < new_end {
            let anchor = self.before_suffix(&result, new_end, tail)?;
            for i in new_start..new_end {
                let vnode = take(&mut next, i)?;
                result[i] = Some(self.patch(None, vnode, Some(parent), context, &anchor)?);
            }
        }

        for id in old[old_start..old_end].iter().flatten() {
            self.unmount(Some(container), *id)?;
        }

        Ok(result)
    }

    fn same(&self, old: FiberId, next: Option<&VNode>) -> RenderResult<bool> {
        let next = next.ok_or(RenderError::Invariant("child description consumed twice"))?;
        Ok(self.fiber(old)?.matches(next))
    }

    fn key_index(
        &self,
        old: &[Option<FiberId>],
        window: Range<usize>,
    ) -> RenderResult<HashMap<Key, usize>> {
        let mut index = HashMap::new();
        for i in window {
            let Some(id) = old[i] else { continue };
            let key = &self.fiber(id)?.key;
            if key.is_empty() {
                continue;
            }
            if index.contains_key(key) {
                warn!(key = %key, "duplicate sibling key, later siblings are remounted");
                continue;
            }
            index.insert(key.clone(), i);
        }
        Ok(index)
    }

    /// Position in front of the first node still in the old window.
    fn before_window(
        &self,
        old: &[Option<FiberId>],
        window: Range<usize>,
        result: &[Option<FiberId>],
        new_end: usize,
        tail: &Anchor,
    ) -> RenderResult<Anchor> {
        for id in old[window].iter().flatten() {
            if let Some(handle) = self.first_handle(*id)? {
                return Ok(Anchor::Before(handle));
            }
        }
        self.before_suffix(result, new_end, tail)
    }

    /// Position in front of the already placed suffix.
    fn before_suffix(
        &self,
        result: &[Option<FiberId>],
        new_end: usize,
        tail: &Anchor,
    ) -> RenderResult<Anchor> {
        for id in result[new_end..].iter().flatten() {
            if let Some(handle) = self.first_handle(*id)? {
                return Ok(Anchor::Before(handle));
            }
        }
        Ok(tail.clone())
    }
}

fn take(next: &mut [Option<VNode>], i: usize) -> RenderResult<VNode> {
    next.get_mut(i)
        .and_then(Option::take)
        .ok_or(RenderError::Invariant("child description consumed twice"))
}
