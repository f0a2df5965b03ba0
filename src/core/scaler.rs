//! Maps normalized (0..1) learned parameters onto physical ranges.

use crate::config::{ConfigError, ParamRange};
use crate::core::edges::{EdgeParams, EdgeTable};

/// Dense `[controller][parameter]` table of de-normalized node values.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeTable {
    rows: Vec<Vec<f64>>,
}

impl NodeTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, controller: usize) -> &[f64] {
        &self.rows[controller]
    }

    pub fn get(&self, controller: usize, param: usize) -> Option<f64> {
        self.rows.get(controller)?.get(param).copied()
    }
}

fn check_normalized(section: &'static str, index: usize, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::NotNormalized {
            section,
            index,
            value,
        })
    }
}

/// Scales `nodeVals.params`; one row per controller, one range per column.
pub fn scale_node_params(
    block: &[Vec<f64>],
    ranges: &[ParamRange],
    expected_nodes: usize,
) -> Result<NodeTable, ConfigError> {
    const SECTION: &str = "nodeVals.params";
    if block.len() != expected_nodes {
        return Err(ConfigError::Shape {
            section: SECTION,
            expected: expected_nodes,
            found: block.len(),
        });
    }
    let mut rows = Vec::with_capacity(block.len());
    for (index, values) in block.iter().enumerate() {
        if values.len() != ranges.len() {
            return Err(ConfigError::ParamCount {
                section: SECTION,
                index,
                expected: ranges.len(),
                found: values.len(),
            });
        }
        let row = values
            .iter()
            .zip(ranges)
            .map(|(&x, range)| check_normalized(SECTION, index, x).map(|x| range.scale(x)))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(row);
    }
    Ok(NodeTable { rows })
}

/// Scales `edgeVals.params` (row-major upper triangle of `[weight, phase]`).
pub fn scale_edge_params(
    block: &[Vec<f64>],
    weight: ParamRange,
    phase: ParamRange,
    nodes: usize,
) -> Result<EdgeTable, ConfigError> {
    const SECTION: &str = "edgeVals.params";
    let expected = EdgeTable::pair_count(nodes);
    if block.len() != expected {
        return Err(ConfigError::Shape {
            section: SECTION,
            expected,
            found: block.len(),
        });
    }
    let mut entries = Vec::with_capacity(expected);
    for (index, pair) in block.iter().enumerate() {
        let &[w, p] = pair.as_slice() else {
            return Err(ConfigError::ParamCount {
                section: SECTION,
                index,
                expected: 2,
                found: pair.len(),
            });
        };
        entries.push(EdgeParams {
            weight: weight.scale(check_normalized(SECTION, index, w)?),
            phase: phase.scale(check_normalized(SECTION, index, p)?),
        });
    }
    EdgeTable::from_entries(nodes, entries).ok_or(ConfigError::Shape {
        section: SECTION,
        expected,
        found: block.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn ranges() -> Vec<ParamRange> {
        vec![ParamRange::new(0.0, 30.0), ParamRange::new(-2.0, 4.0)]
    }

    #[test]
    fn endpoints_map_to_range_bounds() {
        let block = vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![0.5, 0.25]];
        let table = scale_node_params(&block, &ranges(), 3).unwrap();
        assert_eq!(table.row(0), &[0.0, -2.0]);
        assert_eq!(table.row(1), &[30.0, 4.0]);
        assert_eq!(table.row(2), &[15.0, -0.5]);
    }

    #[test]
    fn scaled_values_stay_in_range() {
        let rs = ranges();
        let block: Vec<Vec<f64>> = (0..=20)
            .map(|k| {
                let x = k as f64 / 20.0;
                vec![x, 1.0 - x]
            })
            .collect();
        let table = scale_node_params(&block, &rs, block.len()).unwrap();
        for i in 0..table.len() {
            for (j, r) in rs.iter().enumerate() {
                let v = table.get(i, j).unwrap();
                assert!(v >= r.low && v <= r.high, "[{i}][{j}] = {v}");
            }
        }
    }

    #[test]
    fn controller_count_mismatch_is_config_error() {
        let block = vec![vec![0.1, 0.2]; 3];
        let err = scale_node_params(&block, &ranges(), 4).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Shape {
                section: "nodeVals.params",
                expected: 4,
                found: 3
            }
        );
    }

    #[test]
    fn param_count_mismatch_is_config_error() {
        let block = vec![vec![0.1, 0.2], vec![0.1]];
        assert!(matches!(
            scale_node_params(&block, &ranges(), 2),
            Err(ConfigError::ParamCount { index: 1, .. })
        ));
    }

    #[test]
    fn values_outside_unit_interval_are_rejected() {
        let block = vec![vec![1.5, 0.2]];
        assert!(matches!(
            scale_node_params(&block, &ranges(), 1),
            Err(ConfigError::NotNormalized { .. })
        ));
        let block = vec![vec![f64::NAN, 0.2]];
        assert!(scale_node_params(&block, &ranges(), 1).is_err());
    }

    #[test]
    fn edge_params_fill_the_triangle() {
        let block = vec![vec![1.0, 0.5], vec![0.5, 0.0], vec![0.0, 1.0]];
        let table = scale_edge_params(
            &block,
            ParamRange::new(0.0, 1.0),
            ParamRange::new(-PI, PI),
            3,
        )
        .unwrap();
        assert_eq!(table.get(0, 1).unwrap().weight, 1.0);
        assert!(table.get(1, 0).unwrap().phase.abs() < 1e-12);
        assert_eq!(table.get(2, 0).unwrap().phase, -PI);
        assert_eq!(table.get(1, 2).unwrap().phase, PI);
    }

    #[test]
    fn edge_count_and_width_are_checked() {
        let weight = ParamRange::new(0.0, 1.0);
        let phase = ParamRange::new(-PI, PI);
        let short = vec![vec![0.5, 0.5]; 2];
        assert!(matches!(
            scale_edge_params(&short, weight, phase, 3),
            Err(ConfigError::Shape { expected: 3, found: 2, .. })
        ));
        let ragged = vec![vec![0.5, 0.5], vec![0.5], vec![0.5, 0.5]];
        assert!(matches!(
            scale_edge_params(&ragged, weight, phase, 3),
            Err(ConfigError::ParamCount { index: 1, .. })
        ));
    }
}
