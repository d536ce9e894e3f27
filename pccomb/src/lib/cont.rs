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

//! Continuations and deferred semantic actions.
//!
//! Calling a continuation never runs the semantic actions accumulated so far. Instead each
//! continuation carries a transformer: a chain of pending steps (apply to an argument, apply to a
//! deferred argument, apply to a captured position, post-compose a function) that is only
//! evaluated when a lazy value is forced — which the engine arranges to happen exactly at lexeme
//! successes and when the driver records a final result. This keeps the cost of a deeply
//! right-recursive descent linear: descending extends the chain by O(1) per combinator, and each
//! lexeme pays O(chain depth) once.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use cactus::Cactus;

use env::Env;
use sched::Sched;

/// The recoverable rejection signal. `NoParse` is a bare local mismatch; `GiveUp` additionally
/// contributes an expectation message at the position of the rejection. Terminals and semantic
/// actions communicate failure exclusively through this type; it never crosses the scheduler.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Reject {
    NoParse,
    GiveUp(String)
}

impl Reject {
    pub fn give_up<S: Into<String>>(msg: S) -> Reject {
        Reject::GiveUp(msg.into())
    }
}

/// A type-erased semantic value. The typed combinator surface guarantees by construction that
/// every downcast on these succeeds; a failing downcast is an engine bug.
pub(crate) type Val = Rc<dyn Any>;

/// A function value: what a grammar in argument-position evaluates to before the pending
/// arguments are applied.
pub(crate) struct FnVal(pub(crate) Rc<dyn Fn(Val) -> Result<Val, Reject>>);

pub(crate) fn fn_val<F: Fn(Val) -> Result<Val, Reject> + 'static>(f: F) -> Val {
    Rc::new(FnVal(Rc::new(f)))
}

fn apply(v: Val, arg: Val) -> Result<Val, Reject> {
    match v.downcast::<FnVal>() {
        Ok(f) => (f.0)(arg),
        Err(_) => panic!("transformer applied an argument to a non-function value")
    }
}

/// A possibly deferred semantic value. Thunks may be forced more than once (the cache forces
/// queued values independently), so they are `Fn`, not `FnOnce`.
#[derive(Clone)]
pub enum LazyVal {
    Ready(Val),
    Thunk(Rc<dyn Fn() -> Result<Val, Reject>>)
}

impl LazyVal {
    pub(crate) fn ready<T: 'static>(v: T) -> LazyVal {
        LazyVal::Ready(Rc::new(v))
    }

    pub(crate) fn thunk<F: Fn() -> Result<Val, Reject> + 'static>(f: F) -> LazyVal {
        LazyVal::Thunk(Rc::new(f))
    }

    /// Force the value, surfacing any pending rejection.
    pub(crate) fn force(&self) -> Result<Val, Reject> {
        match *self {
            LazyVal::Ready(ref v) => Ok(Rc::clone(v)),
            LazyVal::Thunk(ref f) => f()
        }
    }
}

/// A cell written with the (buffer, column) of a grammar's right edge when its continuation is
/// invoked; `Step::PosArg` reads it back at evaluation time.
pub(crate) type PosCell = Rc<RefCell<Option<(::pcbuf::Buf, usize)>>>;

#[derive(Clone)]
pub(crate) enum Step {
    /// Apply the value-so-far to an already-forced argument.
    Arg(Val),
    /// Apply to a deferred argument; promoted to `Arg` at the next lexeme success.
    LazyArg(LazyVal),
    /// Apply to the position read from a shared cell; snapshotted to `Arg` at the next lexeme.
    PosArg(PosCell),
    /// Post-compose a (possibly rejecting) function.
    App(Rc<dyn Fn(Val) -> Result<Val, Reject>>)
}

/// A transformer: pending steps applied leaf-first to an incoming value. The chain is an
/// immutable cons list, so extending a continuation shared between alternatives is O(1) and
/// leaves the other alternatives' views untouched.
#[derive(Clone)]
pub(crate) struct Trans {
    steps: Cactus<Step>
}

impl Trans {
    pub(crate) fn identity() -> Trans {
        Trans { steps: Cactus::new() }
    }

    pub(crate) fn is_identity(&self) -> bool {
        self.steps.val().is_none()
    }

    pub(crate) fn push(&self, step: Step) -> Trans {
        Trans {
            steps: self.steps.child(step)
        }
    }

    /// Run the pending steps over `v`. O(depth); only ever called from a lazy value's force.
    pub(crate) fn eval(&self, mut v: Val) -> Result<Val, Reject> {
        for step in self.steps.vals() {
            v = match *step {
                Step::Arg(ref a) => apply(v, Rc::clone(a))?,
                Step::LazyArg(ref l) => apply(v, l.force()?)?,
                Step::PosArg(ref cell) => {
                    let (buf, col) = cell
                        .borrow()
                        .clone()
                        .expect("position cell read before any continuation invocation");
                    apply(v, Rc::new(buf.pos(col)))?
                }
                Step::App(ref f) => f(v)?
            };
        }
        Ok(v)
    }

    /// Promote every deferred step to an eager one: `LazyArg` thunks are forced (surfacing any
    /// pending rejection), `PosArg` cells are snapshotted. Performed exactly when the scheduler
    /// resumes a lexeme-success residual, which is what pins semantic-action evaluation to
    /// lexeme boundaries.
    pub(crate) fn eagerize(&self) -> Result<Trans, Reject> {
        let mut steps = Vec::new();
        for step in self.steps.vals() {
            steps.push(match *step {
                Step::LazyArg(ref l) => Step::Arg(l.force()?),
                Step::PosArg(ref cell) => match cell.borrow().clone() {
                    Some((buf, col)) => Step::Arg(Rc::new(buf.pos(col))),
                    None => Step::PosArg(Rc::clone(cell))
                },
                ref s => s.clone()
            });
        }
        let mut chain = Cactus::new();
        for step in steps.into_iter().rev() {
            chain = chain.child(step);
        }
        Ok(Trans { steps: chain })
    }
}

/// An error thunk: the pending alternatives at some choice point. Invoked exactly once per
/// control path, either synchronously on failure or by the scheduler at a lexeme residual.
pub(crate) type ErrFn = Rc<dyn Fn(&mut Sched)>;

pub(crate) fn null_err() -> ErrFn {
    Rc::new(|_: &mut Sched| ())
}

type KFn = Rc<dyn Fn(&mut Sched, Env, LazyVal, ErrFn)>;

/// A continuation: a base function plus a transformer, and optionally a right-position cell
/// written with the environment's pre-blank position on every invocation.
#[derive(Clone)]
pub(crate) struct Cont {
    k: KFn,
    tr: Trans,
    rpos: Option<PosCell>
}

impl Cont {
    pub(crate) fn base<F: Fn(&mut Sched, Env, LazyVal, ErrFn) + 'static>(f: F) -> Cont {
        Cont {
            k: Rc::new(f),
            tr: Trans::identity(),
            rpos: None
        }
    }

    pub(crate) fn with_arg(&self, v: Val) -> Cont {
        self.extended(Step::Arg(v))
    }

    pub(crate) fn with_lazy_arg(&self, l: LazyVal) -> Cont {
        self.extended(Step::LazyArg(l))
    }

    pub(crate) fn with_pos_arg(&self, cell: PosCell) -> Cont {
        self.extended(Step::PosArg(cell))
    }

    pub(crate) fn with_app<F: Fn(Val) -> Result<Val, Reject> + 'static>(&self, f: F) -> Cont {
        self.extended(Step::App(Rc::new(f)))
    }

    /// Mark this continuation as position-capturing. Only ever applied to a freshly created base
    /// continuation, so no earlier cell can be displaced.
    pub(crate) fn capturing(mut self, cell: PosCell) -> Cont {
        self.rpos = Some(cell);
        self
    }

    fn extended(&self, step: Step) -> Cont {
        Cont {
            k: Rc::clone(&self.k),
            tr: self.tr.push(step),
            rpos: self.rpos.clone()
        }
    }

    /// Invoke the continuation: write the right-position cell if present, wrap the lazy value
    /// with the pending transformer, and enter the base function. No semantic action runs here.
    pub(crate) fn call(&self, s: &mut Sched, env: Env, lv: LazyVal, err: ErrFn) {
        if s.stopped() {
            return;
        }
        if let Some(ref cell) = self.rpos {
            *cell.borrow_mut() = Some(env.lex_pos());
        }
        let lv = if self.tr.is_identity() {
            lv
        } else {
            let tr = self.tr.clone();
            LazyVal::thunk(move || tr.eval(lv.force()?))
        };
        (self.k)(s, env, lv, err)
    }

    /// The lexeme-success promotion: see [`Trans::eagerize`].
    pub(crate) fn eagerize(&self) -> Result<Cont, Reject> {
        Ok(Cont {
            k: Rc::clone(&self.k),
            tr: self.tr.eagerize()?,
            rpos: self.rpos.clone()
        })
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use super::{fn_val, LazyVal, Reject, Step, Trans};

    fn int_fn(v: i64) -> super::Val {
        fn_val(move |a| {
            let a = a.downcast::<i64>().unwrap();
            Ok(Rc::new(v + *a))
        })
    }

    #[test]
    fn test_eval_leaf_first() {
        // Value 10, then App(+1 as a function build), then Arg(5): ((10+)(5)) = 15.
        let tr = Trans::identity()
            .push(Step::Arg(Rc::new(5i64)))
            .push(Step::App(Rc::new(|v| {
                let n = *v.downcast::<i64>().unwrap();
                Ok(int_fn(n))
            })));
        let out = tr.eval(Rc::new(10i64)).unwrap();
        assert_eq!(*out.downcast::<i64>().unwrap(), 15);
    }

    #[test]
    fn test_lazy_arg_defers_rejection() {
        let tr = Trans::identity()
            .push(Step::LazyArg(LazyVal::thunk(|| Err(Reject::give_up("nope")))));
        // Building the chain never runs the thunk; evaluation surfaces the rejection.
        assert_eq!(tr.eval(int_fn(0)).err(), Some(Reject::give_up("nope")));
        // Eagerize forces the thunk too.
        assert_eq!(tr.eagerize().err(), Some(Reject::give_up("nope")));
    }

    #[test]
    fn test_eagerize_preserves_order() {
        let tr = Trans::identity()
            .push(Step::LazyArg(LazyVal::ready(3i64)))
            .push(Step::App(Rc::new(|v| {
                let n = *v.downcast::<i64>().unwrap();
                Ok(int_fn(n * 10))
            })));
        let eager = tr.eagerize().unwrap();
        // (7*10) applied to 3 = 73, identically before and after promotion.
        assert_eq!(*tr.eval(Rc::new(7i64)).unwrap().downcast::<i64>().unwrap(), 73);
        assert_eq!(*eager.eval(Rc::new(7i64)).unwrap().downcast::<i64>().unwrap(), 73);
    }
}
