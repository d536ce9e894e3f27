// Copyright (c) 2018 King's College London
// created by the Software Development Team <http://soft-dev.org/>
//
// The Universal Permissive License (UPL), Version 1.0
//
// Subject to the condition set forth below, permission is hereby granted to any person obtaining a
// copy of this software, associated documentation and/or data (collectively the "Software"), free
// of charge and under any and all copyright rights in the Software, and any and all patent rights
// owned or freely licensable by each licensor hereunder covering either (i) the unmodified
// Software as contributed to or provided by such licensor, or (ii) the Larger Works (as defined
// below), to deal in both
//
// (a) the Software, and
// (b) any piece of software and/or hardware listed in the lrgrwrks.txt file
// if one is included with the Software (each a "Larger Work" to which the Software is contributed
// by such licensors),
//
// without restriction, including without limitation the rights to copy, create derivative works
// of, display, perform, and distribute the Software and make, use, sell, offer for sale, import,
// export, have made, and have sold the Software and the Larger Work(s), and to sublicense the
// foregoing rights on either these or other terms.
//
// This license is subject to the following condition: The above copyright notice and either this
// complete permission notice or at a minimum a reference to the UPL must be included in all copies
// or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
// BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Position-indexed memoization.
//!
//! A cached grammar runs at most once per start position per buffer: the first arrival claims
//! the position, bumps the path's merge depth, and runs the inner grammar; every later arrival
//! merely enqueues its continuation and yields. When the inner grammar completes at some end
//! position, the result is handed to every waiter — independently per result without merging, or
//! folded per end position when a merge function is configured. Merge depth is what makes this
//! sound: the scheduler runs deeper residuals first at equal positions, so a cache frame has
//! finalised a position's fold before any same-position waiter resumes.

use std::cell::RefCell;
use std::rc::Rc;

use pcbuf::PosTbl;

use comb::Grm;
use cont::{null_err, Cont, LazyVal, Reject, Val};
use sched::Sched;

type MergeFn = Rc<dyn Fn(Val, Val) -> Result<Val, Reject>>;

struct Entry {
    // Continuations parked at this start position, with the merge depth to restore on resume;
    // resumed in insertion order.
    waiting: Vec<(Cont, u32)>,
    // Per end position: the lazy values produced there, folded on first force.
    slots: PosTbl<Rc<RefCell<MergeSlot>>>
}

struct MergeSlot {
    vals: Vec<LazyVal>,
    // Set when the fold has run; a result arriving afterwards is a protocol violation.
    too_late: bool
}

fn cache_fn<T: 'static>(g: Grm<T>, merge: Option<MergeFn>) -> Grm<T> {
    let tbl: Rc<RefCell<PosTbl<Rc<RefCell<Entry>>>>> = Rc::new(RefCell::new(PosTbl::new()));
    Grm::raw(move |s, env, k, err| {
        let existing = tbl.borrow().get(&env.cur_buf, env.cur_col).cloned();
        if let Some(entry) = existing {
            entry.borrow_mut().waiting.push((k, env.depth));
            err(s);
            return;
        }
        let entry = Rc::new(RefCell::new(Entry {
            waiting: vec![(k, env.depth)],
            slots: PosTbl::new()
        }));
        tbl.borrow_mut().insert(&env.cur_buf, env.cur_col, Rc::clone(&entry));
        let merge = merge.clone();
        let k0 = Cont::base(move |s: &mut Sched, envq, lv, errq| {
            match merge {
                None => {
                    // Deliver this result, as is, to every waiter enqueued so far.
                    let waiting = entry.borrow().waiting.clone();
                    for (kw, wd) in waiting {
                        kw.call(s, envq.with_depth(wd), lv.clone(), null_err());
                        if s.stopped() {
                            return;
                        }
                    }
                    errq(s)
                }
                Some(ref mf) => {
                    let slot = entry.borrow().slots.get(&envq.cur_buf, envq.cur_col).cloned();
                    if let Some(slot) = slot {
                        let mut sb = slot.borrow_mut();
                        if sb.too_late {
                            panic!("cache: result arrived after its merge was finalised");
                        }
                        sb.vals.push(lv);
                        drop(sb);
                        errq(s);
                        return;
                    }
                    // First result at this end position: park it in a fresh slot and hand every
                    // waiter one shared lazy fold over whatever the slot accumulates before it is
                    // first forced.
                    let slot = Rc::new(RefCell::new(MergeSlot {
                        vals: vec![lv],
                        too_late: false
                    }));
                    entry
                        .borrow_mut()
                        .slots
                        .insert(&envq.cur_buf, envq.cur_col, Rc::clone(&slot));
                    let mf = Rc::clone(mf);
                    let combined = LazyVal::thunk(move || {
                        let mut sb = slot.borrow_mut();
                        sb.too_late = true;
                        let vals = sb.vals.clone();
                        drop(sb);
                        let mut acc: Option<Val> = None;
                        for l in vals {
                            // A queued value whose deferred actions reject simply drops out of
                            // the fold.
                            if let Ok(v) = l.force() {
                                acc = Some(match acc {
                                    None => v,
                                    Some(a) => mf(a, v)?
                                });
                            }
                        }
                        acc.ok_or(Reject::NoParse)
                    });
                    let waiting = entry.borrow().waiting.clone();
                    for (kw, wd) in waiting {
                        kw.call(s, envq.with_depth(wd), combined.clone(), null_err());
                        if s.stopped() {
                            return;
                        }
                    }
                    errq(s)
                }
            }
        });
        let env2 = env.with_depth(env.depth + 1);
        g.call(s, env2, k0, err)
    })
}

/// Memoize `g` per start position. Transparent: the cached grammar accepts the same language and
/// yields the same results, but `g` itself runs at most once per position, which is what makes
/// non-ambiguous grammars polynomial.
pub fn cache<T: 'static>(g: Grm<T>) -> Grm<T> {
    cache_fn(g, None)
}

/// As [`cache`], additionally folding together all results that end at the same position with
/// `merge`. An ambiguous grammar whose alternatives reconverge then delivers one value per end
/// position instead of one per derivation.
pub fn cache_merge<T, F>(g: Grm<T>, f: F) -> Grm<T>
where
    T: 'static,
    F: Fn(&T, &T) -> T + 'static
{
    let mf: MergeFn = Rc::new(move |a: Val, b: Val| {
        let a = a.downcast::<T>().unwrap();
        let b = b.downcast::<T>().unwrap();
        Ok(Rc::new(f(&a, &b)) as Val)
    });
    cache_fn(g, Some(mf))
}
