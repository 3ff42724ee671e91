//! Ordering of fetched posts into the final collection

use crate::content::{Blog, Post};

/// Sort posts by filename, descending (byte-wise).
///
/// With date-prefixed filenames this puts the newest post first.
pub fn assemble(mut posts: Vec<Post>) -> Blog {
    posts.sort_unstable_by(|a, b| b.filename.cmp(&a.filename));
    Blog { posts }
}
