//! Nested handler arguments and their flattening.
//!
//! Registration accepts handlers nested to any depth, e.g.
//! `handlers![cors, handlers![json, handlers![handlers![body]]]]`. Before a
//! chain is stored it is flattened depth-first into one ordered sequence.

use std::sync::Arc;

use super::{BoxedHandler, Handler};

/// A single handler or an ordered group of handler trees.
#[derive(Clone)]
pub enum HandlerTree {
    Leaf(BoxedHandler),
    Branch(Vec<HandlerTree>),
}

impl HandlerTree {
    /// Flatten into one ordered chain, preserving left-to-right order at
    /// every depth.
    pub fn flatten(self) -> Vec<BoxedHandler> {
        let mut chain = Vec::new();
        let mut pending = vec![self];

        while let Some(tree) = pending.pop() {
            match tree {
                HandlerTree::Leaf(handler) => chain.push(handler),
                HandlerTree::Branch(children) => pending.extend(children.into_iter().rev()),
            }
        }

        chain
    }
}

impl std::fmt::Debug for HandlerTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerTree::Leaf(_) => f.write_str("Leaf(..)"),
            HandlerTree::Branch(children) => f.debug_tuple("Branch").field(children).finish(),
        }
    }
}

/// Anything that can be registered as handlers.
pub trait IntoHandlers {
    fn into_tree(self) -> HandlerTree;
}

impl<H: Handler> IntoHandlers for H {
    fn into_tree(self) -> HandlerTree {
        HandlerTree::Leaf(Arc::new(self))
    }
}

impl IntoHandlers for HandlerTree {
    fn into_tree(self) -> HandlerTree {
        self
    }
}

impl<T: IntoHandlers> IntoHandlers for Vec<T> {
    fn into_tree(self) -> HandlerTree {
        HandlerTree::Branch(self.into_iter().map(IntoHandlers::into_tree).collect())
    }
}

impl<T: IntoHandlers, const N: usize> IntoHandlers for [T; N] {
    fn into_tree(self) -> HandlerTree {
        HandlerTree::Branch(self.into_iter().map(IntoHandlers::into_tree).collect())
    }
}

/// Build a [`HandlerTree`] from handlers of mixed types.
///
/// Nested `handlers![..]` groups are flattened in order at registration.
#[macro_export]
macro_rules! handlers {
    ($($handler:expr),* $(,)?) => {
        $crate::handler::HandlerTree::Branch(vec![
            $($crate::handler::IntoHandlers::into_tree($handler)),*
        ])
    };
}
