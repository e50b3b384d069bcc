//! Engine assembly
//!
//! Wires one store, one cache and the strategies into a shared
//! [`MutableAclService`] and [`PermissionEvaluator`] pair.

use crate::audit::{AuditSink, TracingAuditSink};
use crate::authorization::{AclAuthorizationStrategy, DefaultAclAuthorizationStrategy};
use crate::evaluator::PermissionEvaluator;
use crate::granting::{DefaultPermissionGrantingStrategy, PermissionGrantingStrategy};
use crate::lookup::{BasicLookupStrategy, LookupStrategy};
use crate::service::MutableAclService;
use crate::sid_retrieval::{DefaultSidRetrievalStrategy, SidRetrievalStrategy};
use objacl_cache::AclCache;
use objacl_core::{AclConfig, AclConfigLoader, PermissionFactory, Result};
use objacl_store::AclStore;
use std::sync::Arc;
use tracing::info;

/// A fully wired ACL engine
pub struct AclEngine {
    config: AclConfig,
    cache: AclCache,
    service: Arc<MutableAclService>,
    evaluator: Arc<PermissionEvaluator>,
}

impl AclEngine {
    /// Engine with default strategies and a tracing audit sink
    pub fn new(store: Arc<dyn AclStore>, config: AclConfig) -> Result<Self> {
        AclEngineBuilder::new(store).with_config(config).build()
    }

    /// Engine configured from `OBJACL_CONFIG` and `OBJACL_*` variables
    pub fn from_env(store: Arc<dyn AclStore>) -> Result<Self> {
        let loaded = AclConfigLoader::load()?;
        info!(sources = ?loaded.sources, "ACL engine configuration loaded");
        Self::new(store, loaded.config)
    }

    pub fn builder(store: Arc<dyn AclStore>) -> AclEngineBuilder {
        AclEngineBuilder::new(store)
    }

    pub fn config(&self) -> &AclConfig {
        &self.config
    }

    pub fn cache(&self) -> &AclCache {
        &self.cache
    }

    pub fn service(&self) -> &Arc<MutableAclService> {
        &self.service
    }

    pub fn evaluator(&self) -> &Arc<PermissionEvaluator> {
        &self.evaluator
    }
}

/// Builder for [`AclEngine`]
pub struct AclEngineBuilder {
    store: Arc<dyn AclStore>,
    config: Option<AclConfig>,
    cache: Option<AclCache>,
    audit_sink: Option<Arc<dyn AuditSink>>,
    permissions: Option<PermissionFactory>,
    sid_retrieval: Option<Arc<dyn SidRetrievalStrategy>>,
}

impl AclEngineBuilder {
    pub fn new(store: Arc<dyn AclStore>) -> Self {
        Self {
            store,
            config: None,
            cache: None,
            audit_sink: None,
            permissions: None,
            sid_retrieval: None,
        }
    }

    pub fn with_config(mut self, config: AclConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Share an existing cache instead of building one from the config
    pub fn with_cache(mut self, cache: AclCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    /// Permission names accepted by the evaluator, including custom ones
    pub fn with_permission_factory(mut self, permissions: PermissionFactory) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn with_sid_retrieval_strategy(mut self, strategy: Arc<dyn SidRetrievalStrategy>) -> Self {
        self.sid_retrieval = Some(strategy);
        self
    }

    pub fn build(self) -> Result<AclEngine> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let cache = self.cache.unwrap_or_else(|| AclCache::from_config(&config));
        let audit_sink = self
            .audit_sink
            .unwrap_or_else(|| Arc::new(TracingAuditSink));
        let sid_retrieval = self
            .sid_retrieval
            .unwrap_or_else(|| Arc::new(DefaultSidRetrievalStrategy));

        let lookup: Arc<dyn LookupStrategy> = Arc::new(BasicLookupStrategy::new(
            Arc::clone(&self.store),
            cache.clone(),
            &config,
        ));
        let granting: Arc<dyn PermissionGrantingStrategy> = Arc::new(
            DefaultPermissionGrantingStrategy::new(audit_sink, config.audit_enabled),
        );
        let authorization: Arc<dyn AclAuthorizationStrategy> =
            Arc::new(DefaultAclAuthorizationStrategy::new(
                &config,
                Arc::clone(&granting),
                Arc::clone(&sid_retrieval),
            ));

        let service = MutableAclService::new(
            self.store,
            cache.clone(),
            Arc::clone(&lookup),
            authorization,
            config.lookup_timeout,
        );
        let evaluator = PermissionEvaluator::new(
            lookup,
            granting,
            sid_retrieval,
            self.permissions.unwrap_or_default(),
        );

        info!(
            cache_capacity = ?config.cache_capacity,
            lookup_batch_size = config.lookup_batch_size,
            lookup_timeout_ms = config.lookup_timeout.as_millis() as u64,
            audit_enabled = config.audit_enabled,
            "ACL engine ready"
        );
        Ok(AclEngine {
            config,
            cache,
            service: Arc::new(service),
            evaluator: Arc::new(evaluator),
        })
    }
}
