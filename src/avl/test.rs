use super::*;
use proptest::prelude::*;

/// Walks the whole tree checking heights and balance, returning the height.
fn check_node<T: Ord>(tree: &AvlTree<T>, idx: Option<usize>) -> u8 {
    let Some(idx) = idx else {
        return 0;
    };
    let node = tree.node(idx);
    let left = check_node(tree, node.left);
    let right = check_node(tree, node.right);
    assert!(
        (left as i32 - right as i32).abs() <= 1,
        "unbalanced node at slot {}: {} vs {}",
        idx,
        left,
        right
    );
    assert_eq!(node.height, left.max(right) + 1, "stale height at slot {}", idx);
    node.height
}

fn check_invariants<T: Ord + std::fmt::Debug>(tree: &AvlTree<T>) {
    check_node(tree, tree.root);
    let sorted: Vec<_> = tree.iter().collect();
    assert_eq!(sorted.len(), tree.len());
    for pair in sorted.windows(2) {
        assert!(pair[0] <= pair[1], "{:?} is out of order", pair);
    }
}

#[test]
fn test_insert_sorted_input_stays_balanced() {
    let mut tree = AvlTree::new(InsertMethod::Ignore);
    for i in 0..1000 {
        tree.insert(i);
    }
    check_invariants(&tree);
    assert_eq!(tree.len(), 1000);
    // A perfectly balanced tree of 1000 nodes is 10 high; AVL allows ~1.44x.
    assert!(tree.height() <= 14);
    assert_eq!(tree.iter().copied().collect::<Vec<_>>(), (0..1000).collect::<Vec<_>>());
}

#[test]
fn test_ignore_keeps_first() {
    let mut tree = AvlTree::new(InsertMethod::Ignore);
    assert!(tree.insert(Keyed(1, "first")).is_some());
    assert!(tree.insert(Keyed(1, "second")).is_none());
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.find(&1).map(|k| k.1), Some("first"));
}

#[test]
fn test_replace_swaps_value() {
    let mut tree = AvlTree::new(InsertMethod::Replace);
    for i in 0..10 {
        tree.insert(Keyed(i, "old"));
    }
    let old_root = tree.root().unwrap();
    let root_key = tree.get(old_root).unwrap().0;
    let handle = tree.insert(Keyed(root_key, "new")).unwrap();
    assert_eq!(tree.len(), 10);
    assert_eq!(tree.find(&root_key).map(|k| k.1), Some("new"));
    assert_eq!(tree.root(), Some(handle));
    assert!(tree.get(old_root).is_none());
    check_invariants(&tree);
}

#[test]
fn test_insert_greater_keeps_duplicates() {
    let mut tree = AvlTree::new(InsertMethod::Greater);
    let handles: Vec<_> = (0..20)
        .map(|i| tree.insert(Keyed(5, if i % 2 == 0 { "even" } else { "odd" })).unwrap())
        .collect();
    assert_eq!(tree.len(), 20);
    check_invariants(&tree);

    // Removing by identity takes out exactly that entry even though all 20
    // compare equal.
    let target = handles[7];
    assert_eq!(tree.remove_handle(target).map(|k| k.1), Some("odd"));
    assert_eq!(tree.len(), 19);
    assert!(tree.get(target).is_none());
    for (i, handle) in handles.iter().enumerate() {
        if i != 7 {
            assert!(tree.get(*handle).is_some());
        }
    }
    check_invariants(&tree);
}

#[test]
fn test_insert_lesser_keeps_duplicates() {
    let mut tree = AvlTree::new(InsertMethod::Lesser);
    let handles: Vec<_> = (0..8).map(|_| tree.insert(Keyed(3, "x")).unwrap()).collect();
    for handle in handles.into_iter().rev() {
        assert!(tree.remove_handle(handle).is_some());
        check_invariants(&tree);
    }
    assert!(tree.is_empty());
}

#[test]
fn test_remove_by_key() {
    let mut tree = AvlTree::new(InsertMethod::Ignore);
    for i in 0..100 {
        tree.insert(i);
    }
    for i in (0..100).step_by(3) {
        assert_eq!(tree.remove(&i), Some(i));
        check_invariants(&tree);
    }
    assert_eq!(tree.remove(&0), None);
    assert_eq!(tree.len(), 66);
    assert!(tree.find(&3).is_none());
    assert_eq!(tree.find(&4), Some(&4));
}

#[test]
fn test_closest_match() {
    let mut tree = AvlTree::new(InsertMethod::Ignore);
    for i in (10..=100).step_by(10) {
        tree.insert(i);
    }
    assert_eq!(tree.find_closest_above(&35), Some(&40));
    assert_eq!(tree.find_closest_above(&40), Some(&40));
    assert_eq!(tree.find_closest_above(&5), Some(&10));
    assert_eq!(tree.find_closest_above(&101), None);

    assert_eq!(tree.find_closest_below(&35), Some(&30));
    assert_eq!(tree.find_closest_below(&30), Some(&30));
    assert_eq!(tree.find_closest_below(&5), None);
    assert_eq!(tree.find_closest_below(&1000), Some(&100));
}

#[test]
fn test_traversal_orders() {
    let mut tree = AvlTree::new(InsertMethod::Ignore);
    for i in [2, 1, 3] {
        tree.insert(i);
    }
    let collect = |order| {
        let mut out = vec![];
        tree.traverse(order, |_, v| out.push(*v));
        out
    };
    assert_eq!(collect(IterateOrder::TopDownLR), vec![2, 1, 3]);
    assert_eq!(collect(IterateOrder::TopDownRL), vec![2, 3, 1]);
    assert_eq!(collect(IterateOrder::LowestToHighest), vec![1, 2, 3]);
    assert_eq!(collect(IterateOrder::HighestToLowest), vec![3, 2, 1]);
}

#[test]
fn test_slots_are_reused() {
    let mut tree = AvlTree::new(InsertMethod::Ignore);
    for i in 0..16 {
        tree.insert(i);
    }
    for i in 0..16 {
        tree.remove(&i);
    }
    for i in 0..16 {
        tree.insert(i);
    }
    assert_eq!(tree.slots.len(), 16);
    check_invariants(&tree);
}

#[derive(Debug)]
struct Keyed(i32, &'static str);

impl PartialEq for Keyed {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Keyed {}

impl PartialOrd for Keyed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Keyed {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl Borrow<i32> for Keyed {
    fn borrow(&self) -> &i32 {
        &self.0
    }
}

#[derive(Debug, Clone)]
enum Op {
    Insert(u8),
    Remove(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<u8>().prop_map(Op::Insert),
        1 => any::<u8>().prop_map(Op::Remove),
    ]
}

proptest! {
    #[test]
    fn balance_and_order_hold_after_any_operations(
        ops in prop::collection::vec(op_strategy(), 0..300),
        greater in any::<bool>(),
    ) {
        let method = if greater { InsertMethod::Greater } else { InsertMethod::Ignore };
        let mut tree = AvlTree::new(method);
        let mut model = std::collections::BTreeMap::<u8, usize>::new();
        for op in ops {
            match op {
                Op::Insert(v) => {
                    let inserted = tree.insert(v).is_some();
                    let count = model.entry(v).or_insert(0);
                    if greater || *count == 0 {
                        prop_assert!(inserted);
                        *count += 1;
                    } else {
                        prop_assert!(!inserted);
                    }
                }
                Op::Remove(v) => {
                    let removed = tree.remove(&v);
                    match model.get_mut(&v) {
                        Some(count) if *count > 0 => {
                            prop_assert_eq!(removed, Some(v));
                            *count -= 1;
                        }
                        _ => {
                            prop_assert_eq!(removed, None);
                        }
                    }
                }
            }
            check_invariants(&tree);
        }
        let expected: Vec<u8> = model
            .iter()
            .flat_map(|(v, n)| std::iter::repeat(*v).take(*n))
            .collect();
        prop_assert_eq!(tree.iter().copied().collect::<Vec<_>>(), expected);
    }
}
