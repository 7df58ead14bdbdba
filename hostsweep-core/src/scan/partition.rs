/// Split `items` into consecutive groups of `size`, preserving order. The
/// last group may be shorter. A `size` of zero is treated as one.
pub fn partition_targets<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(<[T]>::to_vec).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_preserve_order_with_short_tail() {
        let items: Vec<u32> = (1..=12).collect();
        let groups = partition_targets(&items, 5);
        assert_eq!(
            groups,
            vec![vec![1, 2, 3, 4, 5], vec![6, 7, 8, 9, 10], vec![11, 12]]
        );
        assert_eq!(groups.concat(), items);
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let groups = partition_targets(&["a", "b", "c", "d"], 2);
        assert_eq!(groups, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(partition_targets::<u8>(&[], 5).is_empty());
        assert_eq!(partition_targets(&[1, 2], 0), vec![vec![1], vec![2]]);
    }
}
