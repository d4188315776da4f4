//! Builds bootstrap chains from an ordered list of sources.
use std::{fmt, sync::Arc};

use crate::{
    options::DatabaseOptions, shard_result::ShardId, source::Source, time_range::TimeRanges,
};

use super::{BootstrapOutcome, Bootstrapper, ChainNode, NoOpBootstrapper};

/// Collects sources in priority order and links them into a chain.
pub struct BootstrapChainBuilder {
    opts: Arc<DatabaseOptions>,
    sources: Vec<Arc<dyn Source>>,
}

impl BootstrapChainBuilder {
    /// Append a source; earlier sources are consulted first.
    pub fn source(mut self, source: Arc<dyn Source>) -> Self {
        self.sources.push(source);
        self
    }

    /// Append several sources in order.
    pub fn sources<I>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Source>>,
    {
        self.sources.extend(sources);
        self
    }

    /// Link the sources back to front, ending in the no-op terminal.
    pub fn build(self) -> BootstrapChain {
        let names = self.sources.iter().map(|s| s.name().to_string()).collect();
        let terminal: Arc<dyn Bootstrapper> = Arc::new(NoOpBootstrapper);
        let head = self.sources.into_iter().rev().fold(terminal, |next, source| {
            Arc::new(ChainNode::new(source, Arc::clone(&self.opts), Some(next)))
                as Arc<dyn Bootstrapper>
        });
        BootstrapChain { head, names }
    }
}

/// An ordered list of sources linked into bootstrappers.
///
/// A chain built from no sources is just the no-op terminal and reports the
/// whole request as unfulfilled.
#[derive(Clone)]
pub struct BootstrapChain {
    head: Arc<dyn Bootstrapper>,
    names: Vec<String>,
}

impl BootstrapChain {
    /// Start a chain whose nodes share `opts`.
    pub fn builder(opts: DatabaseOptions) -> BootstrapChainBuilder {
        BootstrapChainBuilder {
            opts: Arc::new(opts),
            sources: Vec::new(),
        }
    }

    /// First bootstrapper of the chain.
    pub fn head(&self) -> &Arc<dyn Bootstrapper> {
        &self.head
    }

    /// Number of sources, not counting the terminal.
    pub fn depth(&self) -> usize {
        self.names.len()
    }

    /// Source names in consultation order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Bootstrap `shard` for `target` starting at the head of the chain.
    pub fn bootstrap(&self, shard: ShardId, target: &TimeRanges) -> BootstrapOutcome {
        self.head.bootstrap(shard, target)
    }
}

impl fmt::Display for BootstrapChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for name in &self.names {
            write!(f, "{name} -> ")?;
        }
        write!(f, "{}", NoOpBootstrapper)
    }
}

impl fmt::Debug for BootstrapChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapChain")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Source for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn availability(&self, _shard: ShardId, _requested: &TimeRanges) -> TimeRanges {
            TimeRanges::new()
        }

        fn read(&self, _shard: ShardId, _available: &TimeRanges) -> BootstrapOutcome {
            BootstrapOutcome::empty()
        }
    }

    #[test]
    fn display_lists_sources_in_order() {
        let chain = BootstrapChain::builder(DatabaseOptions::new())
            .source(Arc::new(Named("filesystem")))
            .sources([
                Arc::new(Named("commitlog")) as Arc<dyn Source>,
                Arc::new(Named("peers")),
            ])
            .build();

        assert_eq!(chain.depth(), 3);
        assert_eq!(chain.to_string(), "filesystem -> commitlog -> peers -> noop");
        assert_eq!(chain.head().to_string(), "filesystem");
    }

    #[test]
    fn empty_chain_is_the_terminal() {
        let chain = BootstrapChain::builder(DatabaseOptions::new()).build();
        assert_eq!(chain.depth(), 0);
        assert_eq!(chain.to_string(), "noop");
        assert_eq!(chain.head().to_string(), "noop");
    }
}
