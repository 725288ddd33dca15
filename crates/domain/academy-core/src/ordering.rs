/// Order values for `len` records in list position order: 1, 2, ..., len.
/// Earlier numbering is never carried over.
pub fn dense_orders(len: usize) -> impl Iterator<Item = u32> {
    1..=len as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_follow_list_position() {
        let items = ["c", "a", "b"];
        let ordered: Vec<(u32, &str)> = dense_orders(items.len()).zip(items).collect();
        assert_eq!(ordered, vec![(1, "c"), (2, "a"), (3, "b")]);
    }

    #[test]
    fn empty_list_has_no_orders() {
        assert_eq!(dense_orders(0).count(), 0);
    }
}
