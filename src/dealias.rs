//! Source dealiasing.
//!
//! When two copies read overlapping sources, the planner could clobber the shared bytes while
//! moving the first copy, before the second copy got to read them. To prevent this, the second
//! copy is rewritten to read from the _destination_ of the first one, and deferred until the
//! main plan is done.

use alloc::vec::Vec;

use fail::Result;
use movelist::Frag;
use vec::TryPush;

/// Dealias a list of fragments.
///
/// After this, no two fragments left in `frags` have overlapping sources. The rewritten parts are
/// returned as the post-copy list, which must be executed after everything in `frags`.
///
/// # Example
///
/// `m` reads partly from the same bytes as the earlier fragment `x`:
///
/// ```notrust
///     x.src      |========|
///     m.src   |hhh|~~~~~~~~|ttt|
/// ```
///
/// The head (`h`) and tail (`t`) stay in the list and are examined again, as they might alias
/// other fragments. The middle part is redirected to read from `x.dst`.
pub(crate) fn dealias(frags: &mut Vec<Frag>) -> Result<Vec<Frag>> {
    let mut postcopy = Vec::new();
    let mut i = 0;

    while i < frags.len() {
        let m = frags[i];
        let x = match frags[..i].iter().find(|x| x.src_block().overlaps(&m.src_block())) {
            Some(&x) => x,
            None => {
                i += 1;
                continue;
            },
        };

        // One fragment is removed and at most two are inserted.
        frags.try_reserve(1)?;
        frags.remove(i);

        let mut rest = m;
        let mut at = i;
        if rest.src < x.src {
            let (head, body) = rest.split(x.src - rest.src);
            frags.insert(at, head);
            at += 1;
            rest = body;
        }
        if rest.src_last() > x.src_last() {
            let (body, tail) = rest.split(x.src_last() - rest.src + 1);
            frags.insert(at, tail);
            rest = body;
        }

        rest.src = x.dst + (rest.src - x.src);
        postcopy.try_push(rest)?;
    }

    Ok(postcopy)
}
