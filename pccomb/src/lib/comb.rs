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

//! The grammar combinators.
//!
//! A grammar is a first-class value: a function over (scheduler, environment, continuation,
//! error thunk). The control discipline, which every combinator in this module preserves, is:
//!
//!   * A grammar consumes its error thunk exactly once per control path: either it fails
//!     synchronously (and invokes it), or its next lexeme succeeds (and the scheduler invokes it
//!     at the residual, so that the alternatives it represents advance in parallel), or the
//!     terminal continuation consumes it after recording a result.
//!   * A grammar that consumes no input calls its continuation synchronously; a grammar that
//!     consumes input suspends into the scheduler. Combinators never call continuations after
//!     consuming input themselves.
//!
//! The second point is why alternation here is not backtracking: a failing branch has already
//! recorded its furthest progress, and the branches that survive each lexeme all get to continue.

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;
use std::rc::Rc;

use pcbuf::{Buf, Pos};
use pclex::{BlankFn, Terminal};
use pcset::CharSet;

use assoc::Key;
use cont::{fn_val, Cont, ErrFn, LazyVal, Reject, Val};
use env::Env;
use sched::{Residual, Sched};

pub(crate) type GrmFn = Rc<dyn Fn(&mut Sched, Env, Cont, ErrFn)>;

/// A grammar producing values of type `T`. Grammars are immutable and cheap to clone; building
/// one never parses anything.
pub struct Grm<T> {
    f: GrmFn,
    marker: PhantomData<fn() -> T>
}

impl<T> Clone for Grm<T> {
    fn clone(&self) -> Self {
        Grm {
            f: Rc::clone(&self.f),
            marker: PhantomData
        }
    }
}

impl<T: 'static> Grm<T> {
    pub(crate) fn raw<F: Fn(&mut Sched, Env, Cont, ErrFn) + 'static>(f: F) -> Grm<T> {
        Grm {
            f: Rc::new(f),
            marker: PhantomData
        }
    }

    pub(crate) fn fun(&self) -> GrmFn {
        Rc::clone(&self.f)
    }

    pub(crate) fn call(&self, s: &mut Sched, env: Env, k: Cont, err: ErrFn) {
        if s.stopped() {
            return;
        }
        (self.f)(s, env, k, err)
    }
}

// Conversion step shared by the binary combinators: turn the second value `b` into the function
// `|a| f(a, b)`, so that the pending argument step completes the pair.
fn combine2<A: 'static, B: 'static, C: 'static>(
    f: Rc<dyn Fn(&A, &B) -> C>
) -> impl Fn(Val) -> Result<Val, Reject> {
    move |bval| {
        let f = Rc::clone(&f);
        let b = bval.downcast::<B>().unwrap();
        Ok(fn_val(move |aval| {
            let a = aval.downcast::<A>().unwrap();
            Ok(Rc::new(f(&a, &b)) as Val)
        }))
    }
}

/// The grammar recognising nothing, not even the empty string.
pub fn fail<T: 'static>() -> Grm<T> {
    Grm::raw(|s, env, _, err| {
        env.record_fail();
        err(s)
    })
}

/// As [`fail`], but contributing `msg` to the expectation messages at the current position.
pub fn error_msg<T: 'static>(msg: &str) -> Grm<T> {
    let msg = msg.to_owned();
    Grm::raw(move |s, env, _, err| {
        env.record_expect(&msg);
        err(s)
    })
}

/// The grammar matching the empty string, producing `x`.
pub fn empty<T: Clone + 'static>(x: T) -> Grm<T> {
    Grm::raw(move |s, env, k, err| k.call(s, env, LazyVal::ready(x.clone()), err))
}

/// Lift a terminal into a grammar. This is the engine's only synchronization point: on success
/// the key store is reset, blanks are skipped, and the parse suspends into the scheduler instead
/// of continuing on the native stack. The scheduler eagerizes the continuation when it resumes
/// the residual (running every semantic action deferred since the previous lexeme).
pub fn lexeme<T: 'static>(t: Terminal<T>) -> Grm<T> {
    Grm::raw(move |s, env, k, err| match t.parse(&env.cur_buf, env.cur_col) {
        Err(te) => {
            env.record_term_err(&te);
            err(s)
        }
        Ok((v, end)) => {
            let env = env.advance(end);
            s.suspend(Residual {
                env,
                cont: k,
                err,
                val: LazyVal::ready(v)
            });
        }
    })
}

/// `g1` then `g2`, combining the two values with `f`. The first value is threaded through the
/// continuation as a deferred argument, so `f` does not run until the next lexeme succeeds.
pub fn seq<A, B, C, F>(g1: Grm<A>, g2: Grm<B>, f: F) -> Grm<C>
where
    A: 'static,
    B: 'static,
    C: 'static,
    F: Fn(&A, &B) -> C + 'static
{
    let f: Rc<dyn Fn(&A, &B) -> C> = Rc::new(f);
    Grm::raw(move |s, env, k, err| {
        let g2 = g2.clone();
        let f = Rc::clone(&f);
        let k1 = Cont::base(move |s, env2, lv_a, err2| {
            let k2 = k.with_lazy_arg(lv_a).with_app(combine2::<A, B, C>(Rc::clone(&f)));
            g2.call(s, env2, k2, err2)
        });
        g1.call(s, env, k1, err)
    })
}

/// Keep only the first value of a sequence.
pub fn seq_left<A: Clone + 'static, B: 'static>(g1: Grm<A>, g2: Grm<B>) -> Grm<A> {
    seq(g1, g2, |a, _| a.clone())
}

/// Keep only the second value of a sequence.
pub fn seq_right<A: 'static, B: Clone + 'static>(g1: Grm<A>, g2: Grm<B>) -> Grm<B> {
    seq(g1, g2, |_, b| b.clone())
}

/// Dependent sequence: `g1` produces a pair whose first component selects the grammar to run
/// next. This is the one place a parsed value is branched on, and hence the one place a pending
/// lazy value must be forced outside a lexeme: the forcing happens on continuation entry, which
/// is still a lexeme boundary of `g1`'s last terminal.
pub fn dseq<A, B, C, D, S, F>(g1: Grm<(A, B)>, sel: S, f: F) -> Grm<D>
where
    A: 'static,
    B: Clone + 'static,
    C: 'static,
    D: 'static,
    S: Fn(&A) -> Grm<C> + 'static,
    F: Fn(&B, &C) -> D + 'static
{
    let sel = Rc::new(sel);
    let f: Rc<dyn Fn(&B, &C) -> D> = Rc::new(f);
    Grm::raw(move |s, env, k, err| {
        let sel = Rc::clone(&sel);
        let f = Rc::clone(&f);
        let k1 = Cont::base(move |s, env2, lv, err2| match lv.force() {
            Err(rej) => {
                env2.record_reject(&rej);
                err2(s)
            }
            Ok(v) => {
                let ab = v.downcast::<(A, B)>().unwrap();
                let g2 = sel(&ab.0);
                let k2 = k
                    .with_arg(Rc::new(ab.1.clone()) as Val)
                    .with_app(combine2::<B, C, D>(Rc::clone(&f)));
                g2.call(s, env2, k2, err2)
            }
        });
        g1.call(s, env, k1, err)
    })
}

/// Alternation with one-byte lookahead. If the next byte predicts only one branch, only that
/// branch runs; if it predicts both, both are explored in parallel (the second branch rides the
/// first's error thunk, which the scheduler fires at the next residual whether or not the first
/// branch succeeded). If it predicts neither, both branches' expectations are recorded.
pub fn alt<T: 'static>(cs1: CharSet, g1: Grm<T>, cs2: CharSet, g2: Grm<T>) -> Grm<T> {
    Grm::raw(move |s, env, k, err| {
        let b = env.cur_byte();
        match (cs1.contains(b), cs2.contains(b)) {
            (true, false) => g1.call(s, env, k, err),
            (false, true) => g2.call(s, env, k, err),
            (true, true) => {
                let g2 = g2.clone();
                let env2 = env.clone();
                let k2 = k.clone();
                let err2 = Rc::clone(&err);
                let alt_err: ErrFn = Rc::new(move |s: &mut Sched| {
                    g2.call(s, env2.clone(), k2.clone(), Rc::clone(&err2))
                });
                g1.call(s, env, k, alt_err)
            }
            (false, false) => {
                env.record_expect(&format!("{}", cs1));
                env.record_expect(&format!("{}", cs2));
                err(s)
            }
        }
    })
}

/// `g`, or the empty string producing `x` when the next byte does not predict `g` — and also in
/// parallel with `g` when it does, since `g` matching something does not preclude the empty
/// alternative in an ambiguous grammar.
pub fn option<T: Clone + 'static>(x: T, cs: CharSet, g: Grm<T>) -> Grm<T> {
    Grm::raw(move |s, env, k, err| {
        if cs.contains(env.cur_byte()) {
            let x = x.clone();
            let env2 = env.clone();
            let k2 = k.clone();
            let err2 = Rc::clone(&err);
            let empty_err: ErrFn = Rc::new(move |s: &mut Sched| {
                k2.call(s, env2.clone(), LazyVal::ready(x.clone()), Rc::clone(&err2))
            });
            g.call(s, env, k, empty_err)
        } else {
            k.call(s, env, LazyVal::ready(x.clone()), err)
        }
    })
}

// Results of repetition accumulate as a shared cons list so that extending one is O(1) no
// matter how long the parse: a `Vec` here would clone its whole spine once per element. The
// list is converted to a `Vec` once, when a repetition completes.
struct ChainNode<T> {
    head: T,
    tail: Chain<T>
}

type Chain<T> = Option<Rc<ChainNode<T>>>;

impl<T> Drop for ChainNode<T> {
    // Unlink iteratively: the default recursive drop would overflow the stack on the very long
    // chains deep repetition produces.
    fn drop(&mut self) {
        let mut tail = self.tail.take();
        while let Some(rc) = tail {
            match Rc::try_unwrap(rc) {
                Ok(mut node) => tail = node.tail.take(),
                Err(_) => break
            }
        }
    }
}

/// Zero or more `g`, where `cs` predicts `g`'s first byte. Right-recursive, but runs in linear
/// time and constant native stack: every iteration suspends at `g`'s first lexeme and defers its
/// semantic work, so neither the scheduler nor the transformer chains re-traverse the prefix.
pub fn star<T: Clone + 'static>(cs: CharSet, g: Grm<T>) -> Grm<Vec<T>> {
    let cell: GrmCell<Chain<T>> = GrmCell::new("star");
    let rec = cell.grammar();
    cell.set(option(
        None,
        cs.clone(),
        seq(g, rec, |x: &T, xs: &Chain<T>| {
            Some(Rc::new(ChainNode {
                head: x.clone(),
                tail: xs.clone()
            }))
        })
    ));
    map(cell.grammar(), |chain: &Chain<T>| {
        let mut out = Vec::new();
        let mut cur = chain;
        while let Some(ref node) = *cur {
            out.push(node.head.clone());
            cur = &node.tail;
        }
        out
    })
}

/// One or more `g`.
pub fn plus<T: Clone + 'static>(cs: CharSet, g: Grm<T>) -> Grm<Vec<T>> {
    seq(g.clone(), star(cs, g), |x: &T, xs: &Vec<T>| {
        let mut v = Vec::with_capacity(xs.len() + 1);
        v.push(x.clone());
        v.extend(xs.iter().cloned());
        v
    })
}

/// Apply a semantic action that may reject. Rejection is converted into a furthest-progress
/// update when the deferred action eventually runs at a lexeme boundary.
pub fn app<A, B, F>(g: Grm<A>, f: F) -> Grm<B>
where
    A: 'static,
    B: 'static,
    F: Fn(&A) -> Result<B, Reject> + 'static
{
    let f = Rc::new(f);
    Grm::raw(move |s, env, k, err| {
        let f = Rc::clone(&f);
        let k2 = k.with_app(move |v: Val| {
            let a = v.downcast::<A>().unwrap();
            f(&a).map(|b| Rc::new(b) as Val)
        });
        g.call(s, env, k2, err)
    })
}

/// Apply a pure semantic action.
pub fn map<A, B, F>(g: Grm<A>, f: F) -> Grm<B>
where
    A: 'static,
    B: 'static,
    F: Fn(&A) -> B + 'static
{
    app(g, move |a| Ok(f(a)))
}

/// A predicate over ((pre-blank buffer, column), (current buffer, column)).
pub type TestFn = Rc<dyn Fn(&Buf, usize, &Buf, usize) -> bool>;

/// Run `g` only if `p` holds at entry.
pub fn test_before<T: 'static>(p: TestFn, g: Grm<T>) -> Grm<T> {
    Grm::raw(move |s, env, k, err| {
        if p(&env.lex_buf, env.lex_col, &env.cur_buf, env.cur_col) {
            g.call(s, env, k, err)
        } else {
            env.record_fail();
            err(s)
        }
    })
}

/// Run `g`, but only accept it if `p` holds when its continuation is entered.
pub fn test_after<T: 'static>(p: TestFn, g: Grm<T>) -> Grm<T> {
    Grm::raw(move |s, env, k, err| {
        let p = Rc::clone(&p);
        let k2 = Cont::base(move |s, env2, lv, err2| {
            if p(&env2.lex_buf, env2.lex_col, &env2.cur_buf, env2.cur_col) {
                k.call(s, env2, lv, err2)
            } else {
                env2.record_fail();
                err2(s)
            }
        });
        g.call(s, env, k2, err)
    })
}

fn combine_pos<A: 'static, B: 'static>(
    f: Rc<dyn Fn(&Pos, &A) -> B>
) -> impl Fn(Val) -> Result<Val, Reject> {
    move |aval| {
        let f = Rc::clone(&f);
        let a = aval.downcast::<A>().unwrap();
        Ok(fn_val(move |pval| {
            let p = pval.downcast::<Pos>().unwrap();
            Ok(Rc::new(f(&p, &a)) as Val)
        }))
    }
}

/// Combine `g`'s value with the position at which it starts.
pub fn left_pos<A, B, F>(g: Grm<A>, f: F) -> Grm<B>
where
    A: 'static,
    B: 'static,
    F: Fn(&Pos, &A) -> B + 'static
{
    let f: Rc<dyn Fn(&Pos, &A) -> B> = Rc::new(f);
    Grm::raw(move |s, env, k, err| {
        let pos = env.cur_buf.pos(env.cur_col);
        let k2 = k
            .with_arg(Rc::new(pos) as Val)
            .with_app(combine_pos::<A, B>(Rc::clone(&f)));
        g.call(s, env, k2, err)
    })
}

/// Combine `g`'s value with the position at which it ends (pre-blank). The position is not known
/// until `g`'s last lexeme succeeds, so it travels as a shared cell that the continuation writes
/// on invocation and a pending step reads back; eagerization snapshots the cell at the next
/// lexeme, before any other parse path can overwrite it.
pub fn right_pos<A, B, F>(g: Grm<A>, f: F) -> Grm<B>
where
    A: 'static,
    B: 'static,
    F: Fn(&Pos, &A) -> B + 'static
{
    let f: Rc<dyn Fn(&Pos, &A) -> B> = Rc::new(f);
    Grm::raw(move |s, env, k, err| {
        let cell: ::cont::PosCell = Rc::new(RefCell::new(None));
        let k2 = k.clone();
        let wrapper = Cont::base(move |s, env2, lv, err2| k2.call(s, env2, lv, err2))
            .capturing(Rc::clone(&cell));
        let k3 = wrapper
            .with_pos_arg(cell)
            .with_app(combine_pos::<A, B>(Rc::clone(&f)));
        g.call(s, env, k3, err)
    })
}

struct LrLoop {
    gf: GrmFn,
    key: u64,
    // Left-position staging for `lr_pos`: (position key, position value).
    posk: Option<(u64, LazyVal)>,
    k: Cont
}

// One round of the left-recursion protocol. The value `v` delivered by the seed (or by a
// previous round of `gf`) is handed to the outer continuation together with an error thunk
// which, when the scheduler fires it, stages `v` in the key store and attempts one more `gf`.
// `gf` succeeding loops; `gf` failing simply ends the iteration, the last `v` having already
// been delivered. Because the key store is reset on every lexeme success, a staged value is
// only visible between the lexeme that completed it and the next one.
fn lr_deliver(me: &Rc<LrLoop>, s: &mut Sched, env: Env, lv: LazyVal, err: ErrFn) {
    let me2 = Rc::clone(me);
    let env2 = env.clone();
    let lv2 = lv.clone();
    let err2 = Rc::clone(&err);
    let again: ErrFn = Rc::new(move |s: &mut Sched| {
        let mut keys = env2.keys.insert(me2.key, lv2.clone());
        if let Some((pk, ref pv)) = me2.posk {
            keys = keys.insert(pk, pv.clone());
        }
        let env3 = env2.with_keys(keys);
        let me3 = Rc::clone(&me2);
        let kf = Cont::base(move |s, env4, lv4, err4| lr_deliver(&me3, s, env4, lv4, err4));
        (me2.gf)(s, env3, kf, Rc::clone(&err2));
    });
    me.k.call(s, env, lv, again);
}

/// Left-recursion elimination: parses `g gf*`, folding left-associatively, where `gf` reads the
/// value accumulated so far with [`read_tbl`]`(key)`.
pub fn lr<T: 'static>(g: Grm<T>, key: Key<T>, gf: Grm<T>) -> Grm<T> {
    Grm::raw(move |s, env, k, err| {
        let me = Rc::new(LrLoop {
            gf: gf.fun(),
            key: key.id(),
            posk: None,
            k
        });
        let k1 = Cont::base(move |s, env2, lv, err2| lr_deliver(&me, s, env2, lv, err2));
        g.call(s, env, k1, err)
    })
}

/// As [`lr`], additionally staging the left position of the whole expression under `pos_key`,
/// for the repeated body to read with [`read_pos`].
pub fn lr_pos<T: 'static>(g: Grm<T>, key: Key<T>, pos_key: Key<Pos>, gf: Grm<T>) -> Grm<T> {
    Grm::raw(move |s, env, k, err| {
        let pos = env.cur_buf.pos(env.cur_col);
        let me = Rc::new(LrLoop {
            gf: gf.fun(),
            key: key.id(),
            posk: Some((pos_key.id(), LazyVal::ready(pos))),
            k
        });
        let k1 = Cont::base(move |s, env2, lv, err2| lr_deliver(&me, s, env2, lv, err2));
        g.call(s, env, k1, err)
    })
}

/// The value staged under `key` by an enclosing [`lr`] round; fails outside one.
pub fn read_tbl<T: 'static>(key: Key<T>) -> Grm<T> {
    Grm::raw(move |s, env, k, err| match env.keys.get(key.id()) {
        Some(lv) => k.call(s, env, lv, err),
        None => {
            env.record_fail();
            err(s)
        }
    })
}

/// The position staged under `key` by an enclosing [`lr_pos`] round, combined with `g`'s value.
pub fn read_pos<A, B, F>(key: Key<Pos>, g: Grm<A>, f: F) -> Grm<B>
where
    A: 'static,
    B: 'static,
    F: Fn(&Pos, &A) -> B + 'static
{
    seq(read_tbl(key), g, move |p, a| f(p, a))
}

/// Which blank functions apply at the boundaries of a [`change_layout`] region: the old one
/// and/or the new one, before and after the inner grammar. The default gives the new layout the
/// whole region, including its leading and trailing gaps, and leaves the boundary after the
/// region to the restored outer blank.
#[derive(Clone, Copy, Debug)]
pub struct LayoutConfig {
    pub old_before: bool,
    pub new_before: bool,
    pub new_after: bool,
    pub old_after: bool
}

impl Default for LayoutConfig {
    fn default() -> LayoutConfig {
        LayoutConfig {
            old_before: true,
            new_before: true,
            new_after: true,
            old_after: false
        }
    }
}

/// Parse `g` under a different blank function. The replacement is scoped: the outer blank
/// function is restored on the continuation edge, which survives lexeme residuals because the
/// continuation closes over the restored value rather than mutating shared state.
pub fn change_layout<T: 'static>(blank2: BlankFn, cfg: LayoutConfig, g: Grm<T>) -> Grm<T> {
    Grm::raw(move |s, env, k, err| {
        let old_blank = Rc::clone(&env.blank);
        let mut col = if cfg.old_before { env.cur_col } else { env.lex_col };
        if cfg.new_before {
            col = blank2(&env.cur_buf, col);
        }
        let env2 = env.with_blank(Rc::clone(&blank2), col);
        let k2 = Cont::base(move |s, env3, lv, err2| {
            let mut col = if cfg.new_after { env3.cur_col } else { env3.lex_col };
            if cfg.old_after {
                col = old_blank(&env3.cur_buf, col);
            }
            let env4 = env3.with_blank(Rc::clone(&old_blank), col);
            k.call(s, env4, lv, err2)
        });
        g.call(s, env2, k2, err)
    })
}

/// A declared grammar: a named mutable slot, dereferenced at invocation time, through which
/// recursive and mutually recursive grammars tie their knots. Until [`set`](#method.set) is
/// called the slot behaves as a failing grammar labelled with its name.
pub struct GrmCell<T> {
    name: Rc<str>,
    slot: Rc<RefCell<Option<GrmFn>>>,
    marker: PhantomData<fn() -> T>
}

impl<T> Clone for GrmCell<T> {
    fn clone(&self) -> Self {
        GrmCell {
            name: Rc::clone(&self.name),
            slot: Rc::clone(&self.slot),
            marker: PhantomData
        }
    }
}

impl<T: 'static> GrmCell<T> {
    pub fn new(name: &str) -> GrmCell<T> {
        GrmCell {
            name: Rc::from(name),
            slot: Rc::new(RefCell::new(None)),
            marker: PhantomData
        }
    }

    /// The grammar that dereferences this slot.
    pub fn grammar(&self) -> Grm<T> {
        let name = Rc::clone(&self.name);
        let slot = Rc::clone(&self.slot);
        Grm::raw(move |s, env, k, err| {
            let g = slot.borrow().clone();
            match g {
                Some(f) => f(s, env, k, err),
                None => {
                    env.record_expect(&name);
                    err(s)
                }
            }
        })
    }

    /// Install the slot's definition. Calling `set` again replaces it.
    pub fn set(&self, g: Grm<T>) {
        *self.slot.borrow_mut() = Some(g.fun());
    }
}

/// A parametric family of grammars: one memoized [`GrmCell`] per parameter value. The defining
/// function may itself call [`get`](#method.get), including on the same parameter, which is what
/// lets parameterised grammars recurse.
pub struct GrmFamily<P, T> {
    name: Rc<str>,
    cells: Rc<RefCell<HashMap<P, GrmCell<T>>>>,
    def: Rc<RefCell<Option<Rc<dyn Fn(&P) -> Grm<T>>>>>
}

impl<P, T> Clone for GrmFamily<P, T> {
    fn clone(&self) -> Self {
        GrmFamily {
            name: Rc::clone(&self.name),
            cells: Rc::clone(&self.cells),
            def: Rc::clone(&self.def)
        }
    }
}

impl<P: Clone + Eq + Hash + 'static, T: 'static> GrmFamily<P, T> {
    pub fn new(name: &str) -> GrmFamily<P, T> {
        GrmFamily {
            name: Rc::from(name),
            cells: Rc::new(RefCell::new(HashMap::new())),
            def: Rc::new(RefCell::new(None))
        }
    }

    /// The member grammar for parameter `p`.
    pub fn get(&self, p: &P) -> Grm<T> {
        if let Some(cell) = self.cells.borrow().get(p) {
            return cell.grammar();
        }
        let cell = GrmCell::new(&self.name);
        // Insert before defining, so a self-referential definition finds the slot.
        self.cells.borrow_mut().insert(p.clone(), cell.clone());
        let def = self.def.borrow().clone();
        if let Some(def) = def {
            cell.set(def(p));
        }
        cell.grammar()
    }

    /// Install the defining function, filling every member requested so far and all future ones.
    pub fn set_def<F: Fn(&P) -> Grm<T> + 'static>(&self, f: F) {
        let f: Rc<dyn Fn(&P) -> Grm<T>> = Rc::new(f);
        *self.def.borrow_mut() = Some(Rc::clone(&f));
        let params: Vec<P> = self.cells.borrow().keys().cloned().collect();
        for p in params {
            let cell = self.cells.borrow().get(&p).unwrap().clone();
            cell.set(f(&p));
        }
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use pcbuf::{Buf, Pos};
    use pclex::{blank_charset, blank_none, char_t, ident, nat, BlankFn};
    use pcset::CharSet;

    use assoc::Key;
    use cont::Reject;
    use parse::{parse_str, partial_parse_str};
    use super::*;

    fn sp() -> BlankFn {
        blank_charset(CharSet::from_bytes(b" "))
    }

    fn num() -> Grm<i64> {
        map(lexeme(nat::<u64>()), |n| *n as i64)
    }

    #[test]
    fn test_seq_combines() {
        let g = seq(num(), seq_right(lexeme(char_t('+')), num()), |a, b| a + b);
        assert_eq!(parse_str(&g, &sp(), "t", "1 + 2").unwrap(), 3);
        assert!(parse_str(&g, &sp(), "t", "1 +").is_err());
    }

    #[test]
    fn test_empty_and_fail() {
        assert_eq!(parse_str(&empty(9u8), &sp(), "t", "").unwrap(), 9);
        assert!(parse_str(&fail::<u8>(), &sp(), "t", "").is_err());
        let g = seq_right(lexeme(char_t('a')), error_msg::<u8>("nope"));
        let e = parse_str(&g, &sp(), "t", "a b").unwrap_err();
        assert!(e.msgs().iter().any(|m| m == "nope"));
        assert_eq!(e.col(), 2);
    }

    #[test]
    fn test_alt_prunes_and_reports() {
        let g = alt(
            CharSet::from_bytes(b"a"),
            map(lexeme(char_t('a')), |_| 1),
            CharSet::from_bytes(b"b"),
            map(lexeme(char_t('b')), |_| 2)
        );
        assert_eq!(parse_str(&g, &sp(), "t", "a").unwrap(), 1);
        assert_eq!(parse_str(&g, &sp(), "t", "b").unwrap(), 2);
        let e = parse_str(&g, &sp(), "t", "c").unwrap_err();
        assert_eq!(e.msgs(), &["[a]".to_owned(), "[b]".to_owned()]);
    }

    #[test]
    fn test_option_takes_both_paths() {
        let g = seq(
            option(0, CharSet::from_bytes(b"0123456789"), num()),
            map(lexeme(char_t('x')), |_| ()),
            |n, _| *n
        );
        assert_eq!(parse_str(&g, &sp(), "t", "7 x").unwrap(), 7);
        assert_eq!(parse_str(&g, &sp(), "t", "x").unwrap(), 0);
    }

    #[test]
    fn test_dseq_selects_on_value() {
        let g1 = map(lexeme(nat::<u32>()), |n| (*n % 2, *n));
        let g = dseq(
            g1,
            |parity: &u32| {
                if *parity == 0 {
                    map(lexeme(char_t('e')), |_| "even")
                } else {
                    map(lexeme(char_t('o')), |_| "odd")
                }
            },
            |n: &u32, tag: &&str| format!("{}{}", tag, n)
        );
        assert_eq!(parse_str(&g, &sp(), "t", "4 e").unwrap(), "even4");
        assert_eq!(parse_str(&g, &sp(), "t", "3 o").unwrap(), "odd3");
        assert!(parse_str(&g, &sp(), "t", "4 o").is_err());
    }

    #[test]
    fn test_app_rejection_becomes_error() {
        let g = app(map(lexeme(nat::<u64>()), |n| *n), |n: &u64| {
            if *n < 100 {
                Ok(*n)
            } else {
                Err(Reject::give_up("small number"))
            }
        });
        assert_eq!(parse_str(&g, &sp(), "t", "42").unwrap(), 42);
        let e = parse_str(&g, &sp(), "t", "120").unwrap_err();
        assert!(e.msgs().iter().any(|m| m == "small number"));
    }

    #[test]
    fn test_tests_constrain_layout() {
        let no_gap: TestFn = Rc::new(|_: &Buf, c1: usize, _: &Buf, c2: usize| c1 == c2);
        let g = seq(
            map(lexeme(ident()), |s: &String| s.clone()),
            test_before(Rc::clone(&no_gap), map(lexeme(char_t('!')), |c| *c)),
            |s, _| s.clone()
        );
        assert_eq!(parse_str(&g, &sp(), "t", "x!").unwrap(), "x");
        assert!(parse_str(&g, &sp(), "t", "x !").is_err());

        let g2 = test_after(no_gap, map(lexeme(ident()), |s: &String| s.clone()));
        assert_eq!(parse_str(&g2, &sp(), "t", "x").unwrap(), "x");
        assert!(parse_str(&g2, &sp(), "t", "x ").is_err());
    }

    #[test]
    fn test_positions() {
        let g = right_pos(
            left_pos(map(lexeme(ident()), |s: &String| s.clone()), |p: &Pos, s: &String| {
                (p.clone(), s.clone())
            }),
            |p: &Pos, t: &(Pos, String)| (t.0.clone(), p.clone())
        );
        let (l, r) = parse_str(&g, &sp(), "t", "  abc ").unwrap();
        assert_eq!((l.line(), l.col()), (1, 2));
        assert_eq!((r.line(), r.col()), (1, 5));
    }

    #[test]
    fn test_lr_folds_left() {
        let k = Key::<i64>::new();
        let g = lr(
            num(),
            k,
            seq(seq_left(read_tbl(k), lexeme(char_t('-'))), num(), |l, r| l - r)
        );
        // ((1-2)-3), not (1-(2-3)); identical to the explicit left fold.
        assert_eq!(parse_str(&g, &sp(), "t", "1 - 2 - 3").unwrap(), -4);
        assert_eq!(
            parse_str(&g, &sp(), "t", "1 - 2 - 3").unwrap(),
            vec![2i64, 3].into_iter().fold(1, |a, b| a - b)
        );
        assert_eq!(parse_str(&g, &sp(), "t", "5").unwrap(), 5);
    }

    #[test]
    fn test_lr_pos_stages_left_position() {
        let k = Key::<i64>::new();
        let pk = Key::<Pos>::new();
        // Each iteration folds in the column of the whole expression's first byte. Both staged
        // values are read before the '@' lexeme, which would clear them.
        let g = lr_pos(
            num(),
            k,
            pk,
            read_pos(
                pk,
                seq(read_tbl(k), lexeme(char_t('@')), |v: &i64, _| *v),
                |p: &Pos, v: &i64| *v + p.col() as i64
            )
        );
        assert_eq!(parse_str(&g, &sp(), "t", "  7@@").unwrap(), 7 + 2 + 2);
    }

    #[test]
    fn test_key_store_cleared_by_lexeme() {
        let k = Key::<i64>::new();
        // The loop body consumes a lexeme before reading the staged value; the read must fail,
        // so the loop never applies and only the seed parses.
        let g = lr(num(), k, seq_right(lexeme(char_t('!')), read_tbl(k)));
        assert!(parse_str(&g, &blank_none(), "t", "1!").is_err());
        let (v, _, end) = partial_parse_str(&g, &blank_none(), false, "t", "1!").unwrap();
        assert_eq!((v, end), (1, 1));
    }

    #[test]
    fn test_star_plus() {
        let d = map(lexeme(nat::<u64>()), |n| *n);
        let g = star(CharSet::range(b'0', b'9'), d.clone());
        assert_eq!(parse_str(&g, &sp(), "t", "1 2 3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_str(&g, &sp(), "t", "").unwrap(), Vec::<u64>::new());
        let p = plus(CharSet::range(b'0', b'9'), d);
        assert_eq!(parse_str(&p, &sp(), "t", "7").unwrap(), vec![7]);
        assert!(parse_str(&p, &sp(), "t", "").is_err());
    }

    #[test]
    fn test_cell_unset_is_labelled_failure() {
        let cell: GrmCell<u8> = GrmCell::new("widget");
        let e = parse_str(&cell.grammar(), &blank_none(), "t", "x").unwrap_err();
        assert!(e.msgs().iter().any(|m| m == "widget"));
    }

    #[test]
    fn test_family_memoizes_per_parameter() {
        let fam: GrmFamily<u32, u32> = GrmFamily::new("count");
        let f2 = fam.clone();
        fam.set_def(move |n: &u32| {
            if *n == 0 {
                empty(0u32)
            } else {
                seq(lexeme(char_t('a')), f2.get(&(*n - 1)), |_, m: &u32| m + 1)
            }
        });
        let g = fam.get(&3);
        assert_eq!(parse_str(&g, &blank_none(), "t", "aaa").unwrap(), 3);
        assert!(parse_str(&g, &blank_none(), "t", "aa").is_err());
        assert_eq!(parse_str(&fam.get(&0), &blank_none(), "t", "").unwrap(), 0);
    }
}
