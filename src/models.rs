use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identity of a [`Risk`]
    RiskId
);
string_id!(
    /// Identity of a [`SecurityComponent`]
    ComponentId
);
string_id!(
    /// Identity of a [`SecurityControl`]
    ControlId
);

/// A named hazard category with base severity attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Risk {
    pub id: RiskId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Base likelihood classification (0-10)
    #[serde(default)]
    pub base_likelihood: Option<u8>,
    /// Base impact classification (0-10)
    #[serde(default)]
    pub base_impact: Option<u8>,
}

/// A named group of security controls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityComponent {
    pub id: ComponentId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub controls: Vec<ControlId>,
}

/// A checklist item that belongs to a component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityControl {
    pub id: ControlId,
    pub name: String,
    /// Text carried into generated tickets
    #[serde(default)]
    pub description: Option<String>,
    /// Explicit parent; inferred from the component list when absent
    #[serde(default)]
    pub component: Option<ComponentId>,
}

/// The risks, components and controls a weight matrix refers to.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    risks: BTreeMap<RiskId, Risk>,
    components: BTreeMap<ComponentId, SecurityComponent>,
    controls: BTreeMap<ControlId, SecurityControl>,
    parents: HashMap<ControlId, ComponentId>,
}

impl Catalog {
    pub fn new(
        risks: Vec<Risk>,
        components: Vec<SecurityComponent>,
        controls: Vec<SecurityControl>,
    ) -> Self {
        let mut parents = HashMap::new();

        // Component membership first so an explicit parent on the control wins.
        for component in &components {
            for control in &component.controls {
                parents
                    .entry(control.clone())
                    .or_insert_with(|| component.id.clone());
            }
        }
        for control in &controls {
            if let Some(component) = &control.component {
                parents.insert(control.id.clone(), component.clone());
            }
        }

        Self {
            risks: risks.into_iter().map(|r| (r.id.clone(), r)).collect(),
            components: components.into_iter().map(|c| (c.id.clone(), c)).collect(),
            controls: controls.into_iter().map(|c| (c.id.clone(), c)).collect(),
            parents,
        }
    }

    pub fn risk(&self, id: &RiskId) -> Option<&Risk> {
        self.risks.get(id)
    }

    pub fn component(&self, id: &ComponentId) -> Option<&SecurityComponent> {
        self.components.get(id)
    }

    pub fn control(&self, id: &ControlId) -> Option<&SecurityControl> {
        self.controls.get(id)
    }

    /// The component a control belongs to, if one is known.
    pub fn parent_component(&self, control: &ControlId) -> Option<&ComponentId> {
        self.parents.get(control)
    }

    /// Controls grouped under a component, including controls that name it as parent.
    pub fn controls_of(&self, component: &ComponentId) -> Vec<ControlId> {
        let mut controls: Vec<ControlId> = self
            .components
            .get(component)
            .map(|c| c.controls.clone())
            .unwrap_or_default();

        for (control, parent) in &self.parents {
            if parent == component && !controls.contains(control) {
                controls.push(control.clone());
            }
        }
        controls.sort();
        controls
    }

    pub fn risks(&self) -> impl Iterator<Item = &Risk> {
        self.risks.values()
    }

    pub fn components(&self) -> impl Iterator<Item = &SecurityComponent> {
        self.components.values()
    }
}
