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

//! The residual scheduler.
//!
//! Every combinator that consumes input suspends itself by pushing a residual rather than
//! calling its continuation directly; everything that consumes nothing runs synchronously. The
//! scheduler therefore trampolines once per lexeme, which is what bounds the native stack on
//! deep right recursion, and it is also what makes alternation breadth-first: when a residual is
//! processed, both its pending alternatives (the error thunk) and its own continuation are run,
//! so all surviving parses advance through the input in lockstep.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use cont::{Cont, ErrFn, LazyVal, Val};
use env::Env;

/// A suspended parse: everything needed to resume one path from a lexeme success.
pub(crate) struct Residual {
    pub(crate) env: Env,
    pub(crate) cont: Cont,
    pub(crate) err: ErrFn,
    pub(crate) val: LazyVal
}

/// Frontier keys order residuals by input position ascending and, at equal position, by merge
/// depth descending, so that a cache frame finalises its results before any same-position waiter
/// is resumed.
type FKey = (usize, Reverse<u32>);

pub(crate) struct Sched {
    frontier: BTreeMap<FKey, Vec<Residual>>,
    results: Vec<(Val, Env)>,
    all: bool,
    stopped: bool
}

impl Sched {
    pub(crate) fn new(all: bool) -> Sched {
        Sched {
            frontier: BTreeMap::new(),
            results: Vec::new(),
            all,
            stopped: false
        }
    }

    pub(crate) fn all(&self) -> bool {
        self.all
    }

    pub(crate) fn stopped(&self) -> bool {
        self.stopped
    }

    /// Raised by the terminal continuation in single-result mode; unwinds nothing, the main loop
    /// and every entry point simply decline to do further work.
    pub(crate) fn stop(&mut self) {
        self.stopped = true;
    }

    pub(crate) fn record(&mut self, v: Val, env: Env) {
        self.results.push((v, env));
    }

    pub(crate) fn suspend(&mut self, r: Residual) {
        let key = (r.env.cur_col, Reverse(r.env.depth));
        self.frontier.entry(key).or_insert_with(Vec::new).push(r);
    }

    /// Drain the frontier. Each iteration snapshots the minimum (position, depth) group; new
    /// residuals produced while processing it — even at the same key — form later groups.
    ///
    /// Two points are load-bearing here. First, both the error thunk and the continuation of
    /// every member run: the error thunk is how the alternatives pending at the residual's
    /// choice point get their turn, whether or not this path succeeded. Second, the
    /// continuation is eagerized only now, not when the residual was created: a deeper cache
    /// frame at the same position may still have results to deliver, and forcing a merged value
    /// early would finalise the fold under it.
    pub(crate) fn drain(&mut self) {
        while !self.stopped {
            let key = match self.frontier.keys().next() {
                Some(k) => *k,
                None => break
            };
            let group = self.frontier.remove(&key).unwrap();
            for r in group {
                if self.stopped {
                    return;
                }
                (r.err)(self);
                match r.cont.eagerize() {
                    Ok(cont) => cont.call(self, r.env, r.val, ::cont::null_err()),
                    Err(rej) => r.env.record_reject(&rej)
                }
            }
        }
    }

    pub(crate) fn into_results(self) -> Vec<(Val, Env)> {
        self.results
    }
}
