//! Unique names for compiler-synthesized temporaries
//!
//! Generated names start with `__$$_`, which the lexer never accepts in an
//! identifier, so they cannot clash with anything a programmer writes.
//! Each compilation unit owns its generator; there is no process-wide state.

/// Reserved prefix of every generated name
pub const SYNTHETIC_PREFIX: &str = "__$$_";

const SEPARATOR: char = '_';

/// Counter plus a stack of naming contexts
#[derive(Debug, Clone, Default)]
pub struct SymbolGenerator {
    counter: u64,
    contexts: Vec<String>,
}

impl SymbolGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unique name under the active contexts
    pub fn next(&mut self) -> String {
        self.mint(None)
    }

    /// Next unique name with an extra tag for this call only
    pub fn next_with(&mut self, tag: &str) -> String {
        self.mint(Some(tag))
    }

    /// Push a naming context
    pub fn enter(&mut self, name: impl Into<String>) -> &mut Self {
        self.contexts.push(name.into());
        self
    }

    /// Pop the most recently entered context
    pub fn exit(&mut self) -> &mut Self {
        self.contexts.pop();
        self
    }

    /// Number of names minted so far
    pub fn count(&self) -> u64 {
        self.counter
    }

    pub fn depth(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_synthetic(name: &str) -> bool {
        name.starts_with(SYNTHETIC_PREFIX)
    }

    fn mint(&mut self, tag: Option<&str>) -> String {
        let mut name = String::from(SYNTHETIC_PREFIX);
        for part in self
            .contexts
            .iter()
            .map(String::as_str)
            .chain(tag)
            .filter(|part| !part.is_empty())
        {
            name.push_str(part);
            name.push(SEPARATOR);
        }
        // The segment after the last separator is the counter, unique per call.
        name.push_str(&self.counter.to_string());
        self.counter += 1;
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_plain_names() {
        let mut symbols = SymbolGenerator::new();
        assert_eq!(symbols.next(), "__$$_0");
        assert_eq!(symbols.next(), "__$$_1");
    }

    #[test]
    fn test_contexts_and_tags() {
        let mut symbols = SymbolGenerator::new();
        symbols.enter("main").enter("loop");
        assert_eq!(symbols.next(), "__$$_main_loop_0");
        assert_eq!(symbols.next_with("iter"), "__$$_main_loop_iter_1");
        symbols.exit();
        assert_eq!(symbols.next(), "__$$_main_2");
        symbols.exit().exit();
        assert_eq!(symbols.next(), "__$$_3");
        assert_eq!(symbols.depth(), 0);
    }

    #[test]
    fn test_uniqueness_across_contexts() {
        let mut symbols = SymbolGenerator::new();
        let mut seen = FxHashSet::default();
        for round in 0..50 {
            if round % 3 == 0 {
                symbols.enter(format!("ctx{}", round % 4));
            }
            if round % 5 == 0 {
                symbols.exit();
            }
            assert!(seen.insert(symbols.next()));
            assert!(seen.insert(symbols.next_with("tmp")));
        }
        assert_eq!(seen.len(), 100);
        assert_eq!(symbols.count(), 100);
    }

    #[test]
    fn test_reserved_form() {
        let mut symbols = SymbolGenerator::new();
        assert!(SymbolGenerator::is_synthetic(&symbols.next()));
        assert!(!SymbolGenerator::is_synthetic("counter"));
    }
}
