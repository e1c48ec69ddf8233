//! A batch of concurrent searches and mutations against one red-black tree,
//! with every search completing before any mutation begins.

// the tree
pub mod rbtree;

// concurrency primitives
pub mod gate;

// batch execution
pub mod dispatch;

// text interfaces
pub mod input;
pub mod report;
