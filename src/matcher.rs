//! Wildcard queries.
//!
//! A query is a sequence of [`Token`]s. `Single` matches exactly one path
//! segment, `Multi` matches any run of zero or more segments, and `Key`
//! matches one segment by equality.
//!
//! The search is a backtracking descent with no memoization, driven by an
//! explicit frame stack instead of native recursion. Frames are pushed in
//! reverse so that popping them visits nodes in the same order a recursive
//! descent over the current sibling order would. With several `Multi` tokens
//! the same node can be reached along more than one route and is then
//! reported once per route.

use std::fmt;
use std::rc::Rc;

use crate::arena::SlotId;
use crate::node::{Nodes, ROOT};

/// One element of a query.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Token<K> {
    /// Matches a segment equal to the key.
    Key(K),
    /// Matches exactly one segment.
    Single,
    /// Matches zero or more consecutive segments.
    Multi,
}

type Predicate<K> = Rc<dyn Fn(&K) -> bool>;

/// Predicates that turn raw query segments into [`Token`]s.
///
/// There is no catch-all default: [`Wildcards::none`] never
/// classifies anything as a wildcard, and any other policy has to be spelled
/// out when the map is built.
pub struct Wildcards<K> {
    single: Option<Predicate<K>>,
    multi: Option<Predicate<K>>,
}

impl<K> Wildcards<K> {
    /// Every segment is a plain key.
    pub fn none() -> Self {
        Self {
            single: None,
            multi: None,
        }
    }

    /// Classify with the given single- and multi-segment predicates.
    pub fn new<S, M>(single: S, multi: M) -> Self
    where
        S: Fn(&K) -> bool + 'static,
        M: Fn(&K) -> bool + 'static,
    {
        Self {
            single: Some(Rc::new(single)),
            multi: Some(Rc::new(multi)),
        }
    }

    /// Replace the single-segment predicate.
    pub fn with_single<S>(mut self, single: S) -> Self
    where
        S: Fn(&K) -> bool + 'static,
    {
        self.single = Some(Rc::new(single));
        self
    }

    /// Replace the multi-segment predicate.
    pub fn with_multi<M>(mut self, multi: M) -> Self
    where
        M: Fn(&K) -> bool + 'static,
    {
        self.multi = Some(Rc::new(multi));
        self
    }

    /// Tag a segment. The single-segment predicate is consulted first.
    pub fn classify(&self, segment: K) -> Token<K> {
        if self.single.as_ref().is_some_and(|p| p(&segment)) {
            Token::Single
        } else if self.multi.as_ref().is_some_and(|p| p(&segment)) {
            Token::Multi
        } else {
            Token::Key(segment)
        }
    }
}

impl<K: PartialEq + 'static> Wildcards<K> {
    /// Treat segments equal to `single` or `multi` as wildcards, e.g.
    /// `Wildcards::symbols("*", "**")`.
    pub fn symbols(single: K, multi: K) -> Self {
        Self::new(move |k| *k == single, move |k| *k == multi)
    }
}

impl<K> Clone for Wildcards<K> {
    fn clone(&self) -> Self {
        Self {
            single: self.single.clone(),
            multi: self.multi.clone(),
        }
    }
}

impl<K> fmt::Debug for Wildcards<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wildcards")
            .field("single", &self.single.is_some())
            .field("multi", &self.multi.is_some())
            .finish()
    }
}

enum Frame {
    /// Match `query[at..]` starting at `node`.
    Match { node: SlotId, at: usize },
    /// Report every value in the subtree at `node`.
    Subtree(SlotId),
}

impl<K: Eq> Nodes<K> {
    /// Run `query` from the sentinel, calling `emit` for each match.
    ///
    /// Returns the number of frames processed.
    pub(crate) fn search<F>(&self, query: &[Token<K>], mut emit: F) -> usize
    where
        F: FnMut(SlotId),
    {
        let mut stack = vec![Frame::Match { node: ROOT, at: 0 }];
        let mut frames = 0usize;

        while let Some(frame) = stack.pop() {
            frames += 1;
            match frame {
                Frame::Subtree(node) => {
                    if self[node].has_value() {
                        emit(node);
                    }
                    self.push_children(node, &mut stack, Frame::Subtree);
                }
                Frame::Match { node, at } => {
                    let Some(token) = query.get(at) else {
                        if self[node].has_value() {
                            emit(node);
                        }
                        continue;
                    };
                    match token {
                        Token::Key(key) => {
                            if let Some(child) = self.child_by_key(node, key) {
                                stack.push(Frame::Match {
                                    node: child,
                                    at: at + 1,
                                });
                            }
                        }
                        Token::Single => {
                            self.push_children(node, &mut stack, |child| Frame::Match {
                                node: child,
                                at: at + 1,
                            });
                        }
                        Token::Multi => {
                            let mut last = at;
                            while matches!(query.get(last + 1), Some(Token::Multi)) {
                                last += 1;
                            }
                            if last + 1 == query.len() {
                                stack.push(Frame::Subtree(node));
                            } else {
                                // Children keep the wildcard; popped after the
                                // zero-length match below.
                                self.push_children(node, &mut stack, |child| Frame::Match {
                                    node: child,
                                    at: last,
                                });
                                stack.push(Frame::Match {
                                    node,
                                    at: last + 1,
                                });
                            }
                        }
                    }
                }
            }
        }

        frames
    }

    /// Push a frame per child of `node`, last child first.
    fn push_children<F>(&self, node: SlotId, stack: &mut Vec<Frame>, frame: F)
    where
        F: Fn(SlotId) -> Frame,
    {
        let mut cur = self.last_child(node);
        while !cur.is_null() {
            stack.push(frame(cur));
            cur = self[cur].prev;
        }
    }
}
