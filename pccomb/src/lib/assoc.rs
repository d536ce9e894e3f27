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

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use cactus::Cactus;

use cont::LazyVal;

static NEXT_KEY: AtomicU64 = AtomicU64::new(0);

/// A typed key for the per-lexeme key store. Each call to [`Key::new`] mints a fresh identity;
/// two fresh keys never compare equal, so a lookup with a `Key<T>` can only ever see a value
/// staged under that same key, whose static type is `T` by construction. The phantom parameter is
/// the equality witness: identity comparison stands in for a type-level proof.
pub struct Key<T> {
    id: u64,
    marker: PhantomData<fn() -> T>
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> Key<T> {
    pub fn new() -> Key<T> {
        Key {
            id: NEXT_KEY.fetch_add(1, Ordering::Relaxed),
            marker: PhantomData
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

/// A chain of (key identity, staged value) pairs. Chains are immutable: insertion conses onto a
/// shared tail, so environment copies stay cheap. Lookup is a linear walk; in practice the chain
/// holds at most one entry per active left-recursion frame.
#[derive(Clone)]
pub(crate) struct KeyStore {
    chain: Cactus<(u64, LazyVal)>
}

impl KeyStore {
    pub(crate) fn new() -> KeyStore {
        KeyStore { chain: Cactus::new() }
    }

    pub(crate) fn insert(&self, id: u64, v: LazyVal) -> KeyStore {
        KeyStore {
            chain: self.chain.child((id, v))
        }
    }

    /// The most recently staged value under `id`, if any.
    pub(crate) fn get(&self, id: u64) -> Option<LazyVal> {
        self.chain.vals().find(|&&(eid, _)| eid == id).map(|&(_, ref v)| v.clone())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.chain.val().is_none()
    }
}

#[cfg(test)]
mod test {
    use super::{Key, KeyStore};
    use cont::LazyVal;

    #[test]
    fn test_fresh_keys_distinct() {
        let k1 = Key::<u32>::new();
        let k2 = Key::<u32>::new();
        assert!(k1.id() != k2.id());
    }

    #[test]
    fn test_chain_shadows() {
        let k = Key::<u32>::new();
        let st = KeyStore::new();
        assert!(st.is_empty());
        assert!(st.get(k.id()).is_none());
        let st2 = st.insert(k.id(), LazyVal::ready(1u32));
        let st3 = st2.insert(k.id(), LazyVal::ready(2u32));
        // The newest staging wins; the older chain is untouched.
        let v3 = st3.get(k.id()).unwrap().force().unwrap();
        assert_eq!(*v3.downcast::<u32>().unwrap(), 2);
        let v2 = st2.get(k.id()).unwrap().force().unwrap();
        assert_eq!(*v2.downcast::<u32>().unwrap(), 1);
        assert!(st.is_empty());
    }
}
