//! Weight Matrix Module
//!
//! Holds the `ControlWeightSet` rows that give a Likelihood, Impact and pair of
//! penalties to each (control, risk, component) triple.
//! - `validation`: range and required-relation checks for a single row

mod validation;

pub use validation::{validate_fields, IMPACT_RANGE, LIKELIHOOD_RANGE, PENALTY_RANGE};

use crate::audit::AuditContext;
use crate::errors::{ScoringError, ValidationErrors};
use crate::models::{Catalog, ComponentId, ControlId, RiskId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

/// Identifier assigned to a row when it is first saved.
pub type RowId = u64;

/// One weight-matrix row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlWeightSet {
    #[serde(default)]
    pub id: Option<RowId>,
    #[serde(default)]
    pub control: Option<ControlId>,
    #[serde(default)]
    pub risk: Option<RiskId>,
    /// Derived from the control's parent when left empty
    #[serde(default)]
    pub component: Option<ComponentId>,
    pub likelihood: i32,
    pub impact: i32,
    #[serde(default)]
    pub likelihood_penalty: i32,
    #[serde(default)]
    pub impact_penalty: i32,
}

impl ControlWeightSet {
    /// Lookup key, once control, risk and component are all set.
    pub fn key(&self) -> Option<WeightKey> {
        Some(WeightKey {
            control: self.control.clone()?,
            risk: self.risk.clone()?,
            component: self.component.clone()?,
        })
    }
}

/// The triple that must be unique across the matrix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WeightKey {
    pub control: ControlId,
    pub risk: RiskId,
    pub component: ComponentId,
}

impl WeightKey {
    pub fn new(
        control: impl Into<ControlId>,
        risk: impl Into<RiskId>,
        component: impl Into<ComponentId>,
    ) -> Self {
        Self {
            control: control.into(),
            risk: risk.into(),
            component: component.into(),
        }
    }
}

/// In-memory weight matrix with write-time validation.
#[derive(Debug, Clone, Default)]
pub struct WeightMatrix {
    rows: BTreeMap<RowId, ControlWeightSet>,
    index: HashMap<WeightKey, Vec<RowId>>,
    next_id: RowId,
}

impl WeightMatrix {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Load rows as stored, without write-time validation.
    ///
    /// Rows that cannot form a key even after component derivation are skipped.
    /// Duplicate triples are kept, and lookups on them report ambiguity.
    pub fn load_unchecked(rows: Vec<ControlWeightSet>, catalog: &Catalog) -> Self {
        let mut matrix = Self::new();
        for mut row in rows {
            resolve_component(&mut row, catalog);
            let Some(key) = row.key() else {
                log::warn!("Skipping weight row without control/risk/component: {:?}", row);
                continue;
            };
            let id = row.id.unwrap_or(matrix.next_id);
            if matrix.rows.contains_key(&id) {
                log::warn!("Skipping weight row with repeated id {}", id);
                continue;
            }
            row.id = Some(id);
            matrix.next_id = matrix.next_id.max(id + 1);
            matrix.index.entry(key).or_default().push(id);
            matrix.rows.insert(id, row);
        }
        matrix
    }

    /// Validate and store a row, inserting or editing in place.
    ///
    /// The component is derived from the control's parent before the uniqueness
    /// check, and the derived value is stored on the row.
    pub fn save(
        &mut self,
        mut row: ControlWeightSet,
        catalog: &Catalog,
        ctx: &AuditContext,
    ) -> Result<RowId, ValidationErrors> {
        let mut errors = validate_fields(&row);

        if row.control.is_some() && !resolve_component(&mut row, catalog) {
            errors.add(
                "SecurityComponent",
                "Please select a component; none could be derived from the security control.",
            );
        }

        if let Some(key) = row.key() {
            let clashes = self
                .index
                .get(&key)
                .map(|ids| ids.iter().any(|id| Some(*id) != row.id))
                .unwrap_or(false);
            if clashes {
                errors.add(
                    "SecurityControl",
                    format!(
                        "A weight for control {}, risk {} and component {} already exists.",
                        key.control, key.risk, key.component
                    ),
                );
            }
        }

        errors.into_result()?;

        let id = match row.id {
            Some(id) => {
                self.unindex(id);
                self.next_id = self.next_id.max(id + 1);
                id
            }
            None => {
                let id = self.next_id;
                self.next_id += 1;
                row.id = Some(id);
                id
            }
        };

        if let Some(key) = row.key() {
            self.index.entry(key).or_default().push(id);
        }
        log::info!("{} saved weight row {}: {:?}", ctx.actor, id, row.key());
        self.rows.insert(id, row);
        Ok(id)
    }

    /// Remove a row by id.
    pub fn delete(&mut self, id: RowId, ctx: &AuditContext) -> Option<ControlWeightSet> {
        self.unindex(id);
        let removed = self.rows.remove(&id);
        if removed.is_some() {
            log::info!("{} deleted weight row {}", ctx.actor, id);
        }
        removed
    }

    fn unindex(&mut self, id: RowId) {
        if let Some(key) = self.rows.get(&id).and_then(ControlWeightSet::key) {
            if let Some(ids) = self.index.get_mut(&key) {
                ids.retain(|existing| *existing != id);
                if ids.is_empty() {
                    self.index.remove(&key);
                }
            }
        }
    }

    /// The row for a triple, `None` when no weighting is defined.
    pub fn lookup(&self, key: &WeightKey) -> Result<Option<&ControlWeightSet>, ScoringError> {
        match self.index.get(key).map(Vec::as_slice) {
            None | Some([]) => Ok(None),
            Some([id]) => Ok(self.rows.get(id)),
            Some(ids) => Err(ScoringError::AmbiguousWeighting {
                control: key.control.clone(),
                risk: key.risk.clone(),
                component: key.component.clone(),
                count: ids.len(),
            }),
        }
    }

    pub fn get(&self, id: RowId) -> Option<&ControlWeightSet> {
        self.rows.get(&id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ControlWeightSet> {
        self.rows.values()
    }

    /// SHA-256 over the rows in key order, hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut keyed: Vec<(WeightKey, &ControlWeightSet)> = self
            .rows
            .values()
            .filter_map(|row| row.key().map(|key| (key, row)))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));

        let mut hasher = Sha256::new();
        for (key, row) in keyed {
            hasher.update(
                format!(
                    "{}|{}|{}|{}|{}|{}|{}\n",
                    key.control,
                    key.risk,
                    key.component,
                    row.likelihood,
                    row.impact,
                    row.likelihood_penalty,
                    row.impact_penalty
                )
                .as_bytes(),
            );
        }
        hex::encode(hasher.finalize())
    }
}

/// Fill an empty component from the control's parent. False if none is known.
fn resolve_component(row: &mut ControlWeightSet, catalog: &Catalog) -> bool {
    if row.component.is_some() {
        return true;
    }
    let derived = row
        .control
        .as_ref()
        .and_then(|control| catalog.parent_component(control))
        .cloned();
    if let Some(component) = &derived {
        log::debug!("Derived component {} for weight row {:?}", component, row.id);
    }
    row.component = derived;
    row.component.is_some()
}

/// Leading 12 hex digits of a matrix fingerprint, for display.
pub fn short_fingerprint(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SecurityComponent, SecurityControl};

    fn catalog() -> Catalog {
        Catalog::new(
            vec![],
            vec![SecurityComponent {
                id: ComponentId::from("web"),
                name: "Web".to_string(),
                description: None,
                controls: vec![ControlId::from("tls")],
            }],
            vec![
                SecurityControl {
                    id: ControlId::from("tls"),
                    name: "TLS".to_string(),
                    description: None,
                    component: None,
                },
                SecurityControl {
                    id: ControlId::from("orphan"),
                    name: "Orphan".to_string(),
                    description: None,
                    component: None,
                },
            ],
        )
    }

    fn ctx() -> AuditContext {
        AuditContext::new("tester")
    }

    fn row(control: &str, risk: &str, component: Option<&str>) -> ControlWeightSet {
        ControlWeightSet {
            id: None,
            control: Some(ControlId::from(control)),
            risk: Some(RiskId::from(risk)),
            component: component.map(ComponentId::from),
            likelihood: 8,
            impact: 6,
            likelihood_penalty: 25,
            impact_penalty: 0,
        }
    }

    #[test]
    fn test_component_is_derived_and_stored() {
        let mut matrix = WeightMatrix::new();
        let id = matrix.save(row("tls", "R1", None), &catalog(), &ctx()).unwrap();
        assert_eq!(
            matrix.get(id).unwrap().component,
            Some(ComponentId::from("web"))
        );
        let found = matrix.lookup(&WeightKey::new("tls", "R1", "web")).unwrap();
        assert_eq!(found.unwrap().likelihood, 8);
    }

    #[test]
    fn test_underivable_component_rejected() {
        let mut matrix = WeightMatrix::new();
        let errors = matrix
            .save(row("orphan", "R1", None), &catalog(), &ctx())
            .unwrap_err();
        assert!(errors.has_field("SecurityComponent"));
        assert!(matrix.is_empty());
    }

    #[test]
    fn test_duplicate_triple_rejected() {
        let mut matrix = WeightMatrix::new();
        matrix.save(row("tls", "R1", Some("web")), &catalog(), &ctx()).unwrap();

        // Same triple once the component is derived.
        let errors = matrix
            .save(row("tls", "R1", None), &catalog(), &ctx())
            .unwrap_err();
        assert!(errors.messages()[0].contains("already exists"));
        assert_eq!(matrix.len(), 1);

        // A different risk is a different triple.
        assert!(matrix.save(row("tls", "R2", None), &catalog(), &ctx()).is_ok());
        assert_eq!(matrix.len(), 2);
    }

    #[test]
    fn test_edit_in_place_excludes_self() {
        let mut matrix = WeightMatrix::new();
        let id = matrix.save(row("tls", "R1", None), &catalog(), &ctx()).unwrap();

        let mut edited = matrix.get(id).unwrap().clone();
        edited.likelihood = 3;
        assert_eq!(matrix.save(edited, &catalog(), &ctx()).unwrap(), id);
        assert_eq!(matrix.len(), 1);
        let found = matrix.lookup(&WeightKey::new("tls", "R1", "web")).unwrap();
        assert_eq!(found.unwrap().likelihood, 3);
    }

    #[test]
    fn test_invalid_row_reports_all_errors() {
        let mut matrix = WeightMatrix::new();
        let mut bad = row("tls", "R1", None);
        bad.risk = None;
        bad.impact = 12;
        let errors = matrix.save(bad, &catalog(), &ctx()).unwrap_err();
        assert!(errors.has_field("Risk"));
        assert!(errors.has_field("Impact"));
    }

    #[test]
    fn test_missing_row_is_not_an_error() {
        let matrix = WeightMatrix::new();
        assert!(matrix
            .lookup(&WeightKey::new("tls", "R1", "web"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_delete_frees_the_triple() {
        let mut matrix = WeightMatrix::new();
        let id = matrix.save(row("tls", "R1", None), &catalog(), &ctx()).unwrap();
        assert!(matrix.delete(id, &ctx()).is_some());
        assert!(matrix.delete(id, &ctx()).is_none());
        assert!(matrix.save(row("tls", "R1", None), &catalog(), &ctx()).is_ok());
    }

    #[test]
    fn test_unchecked_duplicates_are_flagged_on_lookup() {
        let matrix = WeightMatrix::load_unchecked(
            vec![row("tls", "R1", None), row("tls", "R1", Some("web"))],
            &catalog(),
        );
        assert_eq!(matrix.len(), 2);
        let err = matrix
            .lookup(&WeightKey::new("tls", "R1", "web"))
            .unwrap_err();
        assert!(matches!(err, ScoringError::AmbiguousWeighting { count: 2, .. }));
    }

    #[test]
    fn test_fingerprint_ignores_insert_order() {
        let a = WeightMatrix::load_unchecked(
            vec![row("tls", "R1", None), row("tls", "R2", None)],
            &catalog(),
        );
        let b = WeightMatrix::load_unchecked(
            vec![row("tls", "R2", None), row("tls", "R1", None)],
            &catalog(),
        );
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
        assert_eq!(short_fingerprint(&a.fingerprint()), &a.fingerprint()[..12]);
        assert_eq!(short_fingerprint("abc"), "abc");

        let mut changed = row("tls", "R2", None);
        changed.impact = 1;
        let c = WeightMatrix::load_unchecked(vec![row("tls", "R1", None), changed], &catalog());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
