//! Turns compiler call-site descriptors into live call sites

use crate::call_site::CallSite;
use crate::runtime::Runtime;
use std::sync::Arc;
use tessel_compiler::CallSiteDescriptor;

/// Links descriptors against one runtime
#[derive(Debug, Clone)]
pub struct Linker {
    runtime: Arc<Runtime>,
}

impl Linker {
    pub fn new(runtime: Arc<Runtime>) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// One unlinked call site per descriptor, in descriptor order
    pub fn link(&self, descriptors: &[CallSiteDescriptor]) -> Vec<Arc<CallSite>> {
        log::debug!("linking {} call sites", descriptors.len());
        descriptors
            .iter()
            .map(|descriptor| self.link_one(descriptor.clone()))
            .collect()
    }

    pub fn link_one(&self, descriptor: CallSiteDescriptor) -> Arc<CallSite> {
        Arc::new(CallSite::new(descriptor, Arc::clone(&self.runtime)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_site::CacheMode;
    use tessel_compiler::{CallKind, NodeId, Operator, Span};

    #[test]
    fn test_link_preserves_order() {
        let descriptors: Vec<CallSiteDescriptor> = [Operator::Plus, Operator::Not]
            .iter()
            .enumerate()
            .map(|(i, op)| CallSiteDescriptor {
                id: i as u32,
                node: NodeId::new(i as u32),
                kind: CallKind::Operator(*op),
                arity: op.arity(),
                span: Span::synthetic(),
            })
            .collect();

        let linker = Linker::new(Arc::new(Runtime::default()));
        let sites = linker.link(&descriptors);
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[1].descriptor().kind, CallKind::Operator(Operator::Not));
        assert!(sites.iter().all(|s| s.mode() == CacheMode::Unlinked));
    }
}
