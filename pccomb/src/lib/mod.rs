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

//! A scannerless, context-free parser combinator engine.
//!
//! Grammars are first-class values built from terminals ([`lexeme`]) and structural combinators
//! ([`seq`], [`dseq`], [`alt`], [`option`], [`star`], left recursion via [`lr`], memoization via
//! [`cache`], and friends), then run by the driver functions ([`parse_buffer`],
//! [`parse_all_buffer`], [`partial_parse_buffer`] and their string/reader/file wrappers).
//!
//! Three properties distinguish the engine from a backtracking combinator library:
//!
//!   * Ambiguity is first-class. All alternatives a byte of lookahead cannot separate are
//!     explored in parallel, advancing through the input in lockstep on a scheduler, and
//!     `parse_all_buffer` returns every complete derivation's value.
//!   * Left recursion is safe. [`lr`]/[`lr_pos`] parse `g gf*` by iterated application instead
//!     of unbounded descent, staging the accumulated value in a typed per-lexeme key store
//!     ([`read_tbl`], [`read_pos`]).
//!   * Non-ambiguous grammars are polynomial. [`cache`] memoizes a grammar per input position,
//!     and [`cache_merge`] folds ambiguous results that reconverge at the same end position.
//!
//! Semantic actions are deferred: they run when a lexeme succeeds or a final result is
//! recorded, never during grammar descent, which keeps deeply right-recursive grammars linear.
//! Actions may reject an otherwise successful parse by returning [`Reject`].
//!
//! The engine is not thread-safe: grammars, caches and parse state are single-threaded values,
//! and a grammar value containing caches must not be shared between concurrent parses.

extern crate cactus;
extern crate pcbuf;
extern crate pclex;
extern crate pcset;

mod assoc;
mod cache;
mod comb;
mod cont;
mod env;
mod parse;
mod sched;

pub use assoc::Key;
pub use cache::{cache, cache_merge};
pub use comb::{
    alt, app, change_layout, dseq, empty, error_msg, fail, left_pos, lexeme, lr, lr_pos, map,
    option, plus, read_pos, read_tbl, right_pos, seq, seq_left, seq_right, star, test_after,
    test_before, Grm, GrmCell, GrmFamily, LayoutConfig, TestFn
};
pub use cont::Reject;
pub use parse::{
    handle, parse_all_buffer, parse_all_str, parse_buffer, parse_file, parse_read, parse_str,
    partial_parse_buffer, partial_parse_str, report, InputError, ParseError, ParseErrorDisplay
};
