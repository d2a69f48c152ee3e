use super::*;

#[test]
fn test_layout_follows_key_order() {
    let mut keys = BlackboardKeyManager::new();
    let foo = keys.calculate_key("Foo", 4);
    let bar = keys.calculate_key("bar", 8);
    assert_eq!(keys.calculate_key("FOO", 4), foo);

    let bb = Blackboard::new(&keys).unwrap();
    assert_eq!(bb.total_size(), 12);
    assert_eq!(bb.key_count(), 2);
    assert_eq!(bb.offset_of(foo), Some(0));
    assert_eq!(bb.offset_of(bar), Some(4));
    assert_eq!(bb.size_of(bar), Some(8));
}

#[test]
fn test_offsets_are_prefix_sums() {
    let mut keys = BlackboardKeyManager::new();
    // Registered out of name order so the name index and key order differ.
    let sizes = [("w", 3), ("a", 1), ("q", 16), ("c", 0), ("m", 5)];
    let registered: Vec<_> = sizes
        .iter()
        .map(|(name, size)| keys.calculate_key(name, *size))
        .collect();

    let bb = Blackboard::new(&keys).unwrap();
    let mut expected = 0;
    for (key, (_, size)) in registered.iter().zip(sizes.iter()) {
        assert_eq!(bb.offset_of(*key), Some(expected));
        expected += size;
    }
    assert_eq!(bb.total_size(), expected);
}

#[test]
fn test_out_of_range_key() {
    let mut keys = BlackboardKeyManager::new();
    keys.calculate_key("only", 4);
    let mut bb = Blackboard::new(&keys).unwrap();

    let missing = BlackboardKey::new(1);
    assert!(bb.slot(missing).is_none());
    assert!(bb.slot_mut(missing).is_none());
    assert_eq!(bb.read::<u32>(missing), None);
    assert_eq!(bb.write(missing, 1u32), Err(PetError::InvalidArgument));
}

#[test]
fn test_typed_views() {
    let mut keys = BlackboardKeyManager::new();
    let count = keys.calculate_key("Count", 4);
    let weight = keys.calculate_key("Weight", 8);
    let awake = keys.calculate_key("Awake", 1);
    let mut bb = Blackboard::new(&keys).unwrap();

    bb.write(count, 7u32).unwrap();
    bb.write(weight, 1.5f64).unwrap();
    bb.write(awake, true).unwrap();
    assert_eq!(bb.read::<u32>(count), Some(7));
    assert_eq!(bb.read::<f64>(weight), Some(1.5));
    assert_eq!(bb.read::<bool>(awake), Some(true));

    // A narrower view of a wider slot reads the leading bytes.
    bb.write(weight, -3i16).unwrap();
    assert_eq!(bb.read::<i16>(weight), Some(-3));

    // A value wider than its slot is refused.
    assert_eq!(bb.write(count, 1u64), Err(PetError::InvalidArgument));
    assert_eq!(bb.read::<u64>(count), None);
}

#[test]
fn test_raw_slot_round_trip() {
    let mut keys = BlackboardKeyManager::new();
    let first = keys.calculate_key("first", 3);
    let second = keys.calculate_key("second", 3);
    let mut bb = Blackboard::new(&keys).unwrap();

    bb.slot_mut(first).unwrap().copy_from_slice(&[1, 2, 3]);
    bb.slot_mut(second).unwrap().copy_from_slice(&[4, 5, 6]);
    assert_eq!(bb.slot(first), Some(&[1u8, 2, 3][..]));
    assert_eq!(bb.slot(second), Some(&[4u8, 5, 6][..]));
}

#[test]
fn test_empty_registry() {
    let keys = BlackboardKeyManager::new();
    let bb = Blackboard::new(&keys).unwrap();
    assert_eq!(bb.total_size(), 0);
    assert!(bb.slot(BlackboardKey::new(0)).is_none());
}
