//! Impurity importances of a whole forest.

/// One feature's share of the forest's total squared-error reduction.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RankedFeature {
    pub name: String,
    /// Shares over all features add up to 1 unless no tree ever split.
    pub importance: f64,
    /// 1 for the largest share.
    pub rank: usize,
}

/// Average the per-tree shares, renormalise, and rank them. Equal shares
/// keep column order.
pub(crate) fn aggregate_importances(
    per_tree: &[Vec<f64>],
    names: &[String],
) -> Vec<RankedFeature> {
    if per_tree.is_empty() {
        return Vec::new();
    }
    let totals: Vec<f64> = (0..names.len())
        .map(|feature| per_tree.iter().filter_map(|tree| tree.get(feature)).sum())
        .collect();
    let grand_total: f64 = totals.iter().sum();
    let scale = if grand_total > 0.0 { grand_total.recip() } else { 0.0 };

    let mut ranked: Vec<RankedFeature> = names
        .iter()
        .zip(totals)
        .map(|(name, total)| RankedFeature {
            name: name.clone(),
            importance: total * scale,
            rank: 0,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    for (position, feature) in ranked.iter_mut().enumerate() {
        feature.rank = position + 1;
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn shares_are_pooled_over_trees() {
        let ranked = aggregate_importances(
            &[vec![0.0, 0.25, 0.75], vec![0.0, 0.75, 0.25], vec![0.0, 1.0, 0.0]],
            &names(&["idle", "rooms", "income"]),
        );
        let order: Vec<&str> = ranked.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(order, ["rooms", "income", "idle"]);
        assert!((ranked[0].importance - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(ranked.iter().map(|f| f.rank).collect::<Vec<_>>(), [1, 2, 3]);
    }

    #[test]
    fn stumps_give_zero_shares_in_column_order() {
        let ranked = aggregate_importances(&[vec![0.0, 0.0]], &names(&["b", "a"]));
        assert_eq!(ranked[0].name, "b");
        assert!(ranked.iter().all(|f| f.importance == 0.0));
        assert!(aggregate_importances(&[], &names(&["a"])).is_empty());
    }
}
