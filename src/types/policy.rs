//! IAM-style policy documents.
//!
//! Documents are assembled as typed statements and rendered into the
//! provider's policy-JSON wire form (`Version`/`Statement` with PascalCase
//! keys). Resources may be typed references into the stack graph; the
//! provider substitutes them at declare time.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Result as FmtResult};

use itertools::Itertools;
use serde::{Serialize, Serializer};

use crate::types::AttrValue;

const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny,
}

impl Display for Effect {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Effect::Allow => write!(f, "Allow"),
            Effect::Deny => write!(f, "Deny"),
        }
    }
}

/// The principal a trust-policy statement applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyPrincipal {
    /// A provider service principal, e.g. `ecs-tasks.amazonaws.com`.
    Service(String),
    /// An account-level principal ARN, e.g. `arn:aws:iam::<account>:root`.
    Aws(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sid: Option<String>,
    pub effect: Effect,
    pub actions: BTreeSet<String>,
    pub resources: Vec<AttrValue>,
    pub principal: Option<PolicyPrincipal>,
    pub condition: Option<AttrValue>,
}

impl Statement {
    pub fn allow<I, S>(sid: &str, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Statement {
            sid: Some(sid.to_string()),
            effect: Effect::Allow,
            actions: actions.into_iter().map(Into::into).collect(),
            resources: Vec::new(),
            principal: None,
            condition: None,
        }
    }

    /// Add a resource the statement applies to.
    pub fn on(mut self, resource: AttrValue) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn principal(mut self, principal: PolicyPrincipal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn when(mut self, condition: AttrValue) -> Self {
        self.condition = Some(condition);
        self
    }

    fn to_attr(&self) -> AttrValue {
        let mut entries: Vec<(&str, AttrValue)> = Vec::new();
        if let Some(sid) = &self.sid {
            entries.push(("Sid", AttrValue::Str(sid.clone())));
        }
        entries.push(("Effect", AttrValue::Str(self.effect.to_string())));
        if let Some(principal) = &self.principal {
            let (key, value) = match principal {
                PolicyPrincipal::Service(service) => ("Service", service.clone()),
                PolicyPrincipal::Aws(arn) => ("AWS", arn.clone()),
            };
            entries.push((
                "Principal",
                AttrValue::map([(key, AttrValue::Str(value))]),
            ));
        }
        entries.push((
            "Action",
            collapse(self.actions.iter().map(|a| AttrValue::Str(a.clone())).collect()),
        ));
        if !self.resources.is_empty() {
            entries.push(("Resource", collapse(self.resources.clone())));
        }
        if let Some(condition) = &self.condition {
            entries.push(("Condition", condition.clone()));
        }
        AttrValue::map(entries)
    }
}

/// Single-element arrays collapse to a scalar, so a lone action renders as
/// e.g. `"Action": "sts:AssumeRole"` rather than a one-element list.
fn collapse(mut values: Vec<AttrValue>) -> AttrValue {
    if values.len() == 1 {
        values.remove(0)
    } else {
        AttrValue::List(values)
    }
}

/// An ordered sequence of statements under one policy version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDocument {
    pub statements: Vec<Statement>,
}

impl PolicyDocument {
    pub fn new(statements: Vec<Statement>) -> Self {
        PolicyDocument { statements }
    }

    /// Render into the policy-JSON wire form as a node attribute.
    pub fn to_attr(&self) -> AttrValue {
        AttrValue::map([
            ("Version", AttrValue::Str(POLICY_VERSION.to_string())),
            (
                "Statement",
                AttrValue::List(self.statements.iter().map(Statement::to_attr).collect()),
            ),
        ])
    }

    /// Every action granted by the document, sorted and deduplicated.
    pub fn action_names(&self) -> Vec<String> {
        self.statements
            .iter()
            .flat_map(|s| s.actions.iter().cloned())
            .sorted()
            .dedup()
            .collect()
    }
}

impl Serialize for PolicyDocument {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        self.to_attr().serialize(ser)
    }
}
