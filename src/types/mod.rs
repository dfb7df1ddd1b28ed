//! Data model for synthesized stacks.
//!
//! Everything here is plain data: attribute values with typed cross-resource
//! references, CIDR blocks, security rules, IAM-style policy documents, and
//! the named output table. Nothing in this module talks to a provider; the
//! builders in [`crate::synth`] assemble these values and the provider
//! resolves references at declare time.

mod attr_value;
mod cidr;
mod kind;
mod output;
mod policy;
mod security;

pub use attr_value::{AttrValue, RefAttr, RefTarget};
pub use cidr::Cidr;
pub use kind::ResourceKind;
pub use output::{OutputEntry, Outputs};
pub use policy::{Effect, PolicyDocument, PolicyPrincipal, Statement};
pub use security::{Direction, Protocol, RuleSource, SecurityRule};
