//! Skin weight resolution: sparse host binding to a dense (vertex x joint) matrix.
//!
//! Columns follow the caller's joint order exactly; the solver relies on this
//! when it looks bones up by column name. Rows are not normalized.

use hashbrown::{HashMap, HashSet};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{Result, SmearError};
use crate::scene::SceneQuery;

/// Dense row-major weight matrix `W[vertex][joint]`.
#[derive(Clone, Debug, PartialEq)]
pub struct SkinWeightMatrix {
    vertex_count: usize,
    joints: Vec<String>,
    data: Vec<f64>,
}

impl SkinWeightMatrix {
    /// All-zero matrix for `vertex_count` rows and the given joint columns.
    pub fn zeros(vertex_count: usize, joints: Vec<String>) -> Self {
        let data = vec![0.0; vertex_count * joints.len()];
        Self {
            vertex_count,
            joints,
            data,
        }
    }

    /// Wrap existing row-major data.
    pub fn from_rows(joints: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let cols = joints.len();
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in &rows {
            if row.len() != cols {
                return Err(SmearError::ShapeMismatch {
                    what: "weight row",
                    expected: cols,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            vertex_count: rows.len(),
            joints,
            data,
        })
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[inline]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Joint names in column order.
    pub fn joints(&self) -> &[String] {
        &self.joints
    }

    #[inline]
    pub fn weight(&self, vertex: usize, joint: usize) -> f64 {
        self.data[vertex * self.joints.len() + joint]
    }

    #[inline]
    pub fn set(&mut self, vertex: usize, joint: usize, weight: f64) {
        let cols = self.joints.len();
        self.data[vertex * cols + joint] = weight;
    }

    /// Weights of one vertex, in column order.
    pub fn row(&self, vertex: usize) -> &[f64] {
        let cols = self.joints.len();
        &self.data[vertex * cols..(vertex + 1) * cols]
    }

    /// Column of a joint name (first occurrence).
    pub fn column_index(&self, joint: &str) -> Option<usize> {
        self.joints.iter().position(|j| j == joint)
    }

    /// Whether any vertex has a nonzero weight for column `joint`.
    pub fn column_has_weight(&self, joint: usize) -> bool {
        (0..self.vertex_count).any(|v| self.weight(v, joint) != 0.0)
    }
}

/// Build the dense weight matrix of `mesh` under `skin` for `joints`.
///
/// Influences missing from `joints` are dropped with a diagnostic (reported
/// once per influence). Requested joints the binding does not know keep an
/// all-zero column, also with a diagnostic. Malformed influence indices are fatal.
pub fn resolve_skin_weights<S>(
    scene: &S,
    mesh: &str,
    skin: &str,
    joints: &[String],
    diagnostics: &mut Diagnostics,
) -> Result<SkinWeightMatrix>
where
    S: SceneQuery + ?Sized,
{
    let influences = scene.skin_influences(skin)?;
    let sparse = scene.skin_weights(mesh, skin)?;

    let mut col_of_joint: HashMap<&str, usize> = HashMap::with_capacity(joints.len());
    for (col, joint) in joints.iter().enumerate() {
        col_of_joint.entry(joint.as_str()).or_insert(col);
    }

    let influence_names: HashSet<&str> = influences.iter().map(String::as_str).collect();
    for joint in joints {
        if !influence_names.contains(joint.as_str()) {
            diagnostics.push(Diagnostic::JointNotInBinding {
                joint: joint.clone(),
            });
        }
    }

    let column_of_slot: Vec<Option<usize>> = influences
        .iter()
        .map(|name| col_of_joint.get(name.as_str()).copied())
        .collect();
    let mut reported = vec![false; influences.len()];

    let mut matrix = SkinWeightMatrix::zeros(sparse.len(), joints.to_vec());
    for (vertex, pairs) in sparse.iter().enumerate() {
        for &(slot, weight) in pairs {
            if slot >= influences.len() {
                return Err(SmearError::InvalidInfluenceIndex {
                    vertex,
                    index: slot,
                    influence_count: influences.len(),
                });
            }
            if weight == 0.0 {
                continue;
            }
            match column_of_slot[slot] {
                Some(col) => matrix.set(vertex, col, weight),
                None if !reported[slot] => {
                    reported[slot] = true;
                    diagnostics.push(Diagnostic::UnknownInfluence {
                        influence: influences[slot].clone(),
                    });
                }
                None => {}
            }
        }
    }

    log::debug!(
        "resolved skin weights for '{mesh}' via '{skin}': {} vertices x {} joints",
        matrix.vertex_count(),
        matrix.joint_count()
    );
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameRange;
    use crate::scene::{InMemoryScene, MeshRecord, SkinRecord};

    fn scene_with(influences: &[&str], weights: Vec<Vec<(usize, f64)>>) -> InMemoryScene {
        let mut scene = InMemoryScene::new(FrameRange::new(0, 0).unwrap());
        scene
            .insert_mesh(
                "body",
                MeshRecord {
                    skin: Some("skin".into()),
                    ..MeshRecord::default()
                },
            )
            .insert_skin(
                "skin",
                SkinRecord {
                    influences: influences.iter().map(|s| s.to_string()).collect(),
                    weights,
                },
            );
        scene
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn columns_follow_requested_order() {
        let scene = scene_with(
            &["a", "b"],
            vec![vec![(0, 0.25), (1, 0.75)], vec![(1, 1.0)]],
        );
        let mut diags = Diagnostics::new();
        let w = resolve_skin_weights(&scene, "body", "skin", &names(&["b", "a"]), &mut diags)
            .unwrap();
        assert_eq!(w.row(0), &[0.75, 0.25]);
        assert_eq!(w.row(1), &[1.0, 0.0]);
        assert!(diags.is_clean());
    }

    #[test]
    fn unknown_influence_is_dropped_and_reported_once() {
        let scene = scene_with(
            &["a", "hip"],
            vec![vec![(0, 0.5), (1, 0.5)], vec![(1, 1.0)]],
        );
        let mut diags = Diagnostics::new();
        let w = resolve_skin_weights(&scene, "body", "skin", &names(&["a"]), &mut diags).unwrap();
        assert_eq!(w.row(0), &[0.5]);
        assert_eq!(w.row(1), &[0.0]);
        assert_eq!(diags.unknown_influences().collect::<Vec<_>>(), vec!["hip"]);
    }

    #[test]
    fn joint_outside_binding_keeps_zero_column() {
        let scene = scene_with(&["a"], vec![vec![(0, 1.0)]]);
        let mut diags = Diagnostics::new();
        let w = resolve_skin_weights(&scene, "body", "skin", &names(&["a", "tail"]), &mut diags)
            .unwrap();
        assert!(!w.column_has_weight(1));
        assert_eq!(
            diags.entries,
            vec![Diagnostic::JointNotInBinding {
                joint: "tail".into()
            }]
        );
    }

    #[test]
    fn zero_weights_are_skipped_and_rows_not_normalized() {
        let scene = scene_with(&["a", "b"], vec![vec![(0, 0.0), (1, 0.3)]]);
        let mut diags = Diagnostics::new();
        let w = resolve_skin_weights(&scene, "body", "skin", &names(&["a", "b"]), &mut diags)
            .unwrap();
        assert_eq!(w.row(0), &[0.0, 0.3]);
    }

    #[test]
    fn out_of_range_slot_is_fatal() {
        let scene = scene_with(&["a"], vec![vec![(3, 1.0)]]);
        let mut diags = Diagnostics::new();
        let err = resolve_skin_weights(&scene, "body", "skin", &names(&["a"]), &mut diags)
            .unwrap_err();
        assert!(matches!(
            err,
            SmearError::InvalidInfluenceIndex {
                vertex: 0,
                index: 3,
                influence_count: 1
            }
        ));
    }
}
