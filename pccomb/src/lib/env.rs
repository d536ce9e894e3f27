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

use std::cell::RefCell;
use std::rc::Rc;

use pcbuf::Buf;
use pclex::{BlankFn, TermErr};

use assoc::KeyStore;
use cont::Reject;

/// The furthest-progress tracker, shared by every branch of one parse so that all alternatives
/// converge on the same best error. Mutation is monotone: a strictly later column resets the
/// expectation list, an equal column appends to it, an earlier one is ignored.
pub(crate) struct Progress {
    buf: Buf,
    col: usize,
    msgs: Vec<String>
}

impl Progress {
    fn new(buf: Buf, col: usize) -> Progress {
        Progress {
            buf,
            col,
            msgs: Vec::new()
        }
    }

    fn record(&mut self, buf: &Buf, col: usize, msg: Option<&str>) {
        if col > self.col {
            self.buf = buf.clone();
            self.col = col;
            self.msgs.clear();
        } else if col < self.col {
            return;
        }
        if let Some(m) = msg {
            if !self.msgs.iter().any(|x| x == m) {
                self.msgs.push(m.to_owned());
            }
        }
    }

    pub(crate) fn snapshot(&self) -> (Buf, usize, Vec<String>) {
        let mut msgs = self.msgs.clone();
        msgs.sort();
        (self.buf.clone(), self.col, msgs)
    }
}

/// Per-parse state. Cheap to clone: buffers, the blank function and the progress tracker are all
/// reference counted, and branching paths shallow-copy the whole record with a field or two
/// replaced.
#[derive(Clone)]
pub(crate) struct Env {
    /// Position of the next lexeme (blanks already skipped).
    pub(crate) cur_buf: Buf,
    pub(crate) cur_col: usize,
    /// End of the last successful lexeme (blanks not skipped); never beyond current.
    pub(crate) lex_buf: Buf,
    pub(crate) lex_col: usize,
    pub(crate) blank: BlankFn,
    progress: Rc<RefCell<Progress>>,
    pub(crate) keys: KeyStore,
    /// Number of cache frames active on this path; orders same-position residuals.
    pub(crate) depth: u32
}

impl Env {
    /// Build the environment for a fresh parse starting at (buf, col): leading blanks are
    /// skipped, and the pre-blank position is the original start.
    pub(crate) fn start(buf: Buf, col: usize, blank: BlankFn) -> Env {
        let cur_col = blank(&buf, col);
        Env {
            cur_buf: buf.clone(),
            cur_col,
            lex_buf: buf.clone(),
            lex_col: col,
            blank,
            progress: Rc::new(RefCell::new(Progress::new(buf, cur_col))),
            keys: KeyStore::new(),
            depth: 0
        }
    }

    pub(crate) fn cur_byte(&self) -> Option<u8> {
        self.cur_buf.byte_at(self.cur_col)
    }

    pub(crate) fn lex_pos(&self) -> (Buf, usize) {
        (self.lex_buf.clone(), self.lex_col)
    }

    /// Advance past a lexeme ending at `lex_end` and re-skip blanks; the key store does not
    /// survive a lexeme.
    pub(crate) fn advance(&self, lex_end: usize) -> Env {
        let cur_col = (self.blank)(&self.cur_buf, lex_end);
        Env {
            cur_buf: self.cur_buf.clone(),
            cur_col,
            lex_buf: self.cur_buf.clone(),
            lex_col: lex_end,
            blank: Rc::clone(&self.blank),
            progress: Rc::clone(&self.progress),
            keys: KeyStore::new(),
            depth: self.depth
        }
    }

    pub(crate) fn with_depth(&self, depth: u32) -> Env {
        let mut env = self.clone();
        env.depth = depth;
        env
    }

    pub(crate) fn with_keys(&self, keys: KeyStore) -> Env {
        let mut env = self.clone();
        env.keys = keys;
        env
    }

    pub(crate) fn with_blank(&self, blank: BlankFn, cur_col: usize) -> Env {
        let mut env = self.clone();
        env.blank = blank;
        env.cur_col = cur_col;
        env
    }

    /// Record a failure at the current position with no message.
    pub(crate) fn record_fail(&self) {
        self.progress.borrow_mut().record(&self.cur_buf, self.cur_col, None);
    }

    /// Record an expectation message at the current position.
    pub(crate) fn record_expect(&self, msg: &str) {
        self.progress.borrow_mut().record(&self.cur_buf, self.cur_col, Some(msg));
    }

    /// Record a terminal failure at the column the terminal reached.
    pub(crate) fn record_term_err(&self, te: &TermErr) {
        self.progress
            .borrow_mut()
            .record(&self.cur_buf, te.col, te.msg.as_ref().map(|s| s.as_str()));
    }

    /// Record a rejection raised by a semantic action at the current position.
    pub(crate) fn record_reject(&self, rej: &Reject) {
        match *rej {
            Reject::NoParse => self.record_fail(),
            Reject::GiveUp(ref m) => self.record_expect(m)
        }
    }

    pub(crate) fn progress_snapshot(&self) -> (Buf, usize, Vec<String>) {
        self.progress.borrow().snapshot()
    }
}

#[cfg(test)]
mod test {
    use pcbuf::Buf;
    use pclex::{blank_charset, TermErr};
    use pcset::CharSet;

    use super::Env;

    fn env() -> Env {
        Env::start(
            Buf::from_str("t", "  ab cd"),
            0,
            blank_charset(CharSet::from_bytes(b" "))
        )
    }

    #[test]
    fn test_start_skips_blanks() {
        let e = env();
        assert_eq!(e.cur_col, 2);
        assert_eq!(e.lex_col, 0);
        assert_eq!(e.cur_byte(), Some(b'a'));
    }

    #[test]
    fn test_advance_clears_keys() {
        let e = env();
        let e2 = e.with_keys(e.keys.insert(0, ::cont::LazyVal::ready(1u8)));
        assert!(!e2.keys.is_empty());
        let e3 = e2.advance(4);
        assert_eq!(e3.lex_col, 4);
        assert_eq!(e3.cur_col, 5);
        assert!(e3.keys.is_empty());
    }

    #[test]
    fn test_progress_monotone() {
        let e = env();
        e.record_expect("x");
        e.record_term_err(&TermErr::give_up(5, "y"));
        e.record_expect("ignored");
        e.record_term_err(&TermErr::give_up(5, "z"));
        e.record_term_err(&TermErr::give_up(5, "y"));
        let (_, col, msgs) = e.progress_snapshot();
        assert_eq!(col, 5);
        assert_eq!(msgs, vec!["y".to_owned(), "z".to_owned()]);
    }
}
