// src/lib.rs
pub use config::{ConfigSource, StackConfig, TagMutability, Topology, keys};
pub use error::SynthError;
pub use graph::{NodeId, ResourceNode, StackGraph};
pub use provider::{AccountId, CallerIdentity, ProviderFacts, StaticFacts};
pub use synth::{Stack, synthesize};
pub use types::{
    AttrValue, Cidr, Direction, Effect, OutputEntry, Outputs, PolicyDocument,
    PolicyPrincipal, Protocol, RefAttr, RefTarget, ResourceKind, RuleSource,
    SecurityRule, Statement,
};

mod config;
mod error;
mod graph;
mod provider;
mod synth;
mod types;
