use fxhash::FxHashMap;

use crate::Token;

/// Maps token keys to dense integer ids so alignment compares `u32`s
/// instead of strings. Ids are assigned in first-seen order.
#[derive(Debug, Default)]
pub struct KeyInterner<'a> {
    ids: FxHashMap<&'a str, u32>,
}

impl<'a> KeyInterner<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, key: &'a str) -> u32 {
        let next = self.ids.len() as u32;
        *self.ids.entry(key).or_insert(next)
    }

    /// Intern the keys of `tokens`, returning one id per token.
    pub fn intern_tokens(&mut self, tokens: &'a [Token]) -> Vec<u32> {
        tokens.iter().map(|t| self.intern(t.key())).collect()
    }

    /// Number of distinct keys seen so far.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
