use ems_model::{Allocation, Error};

#[test]
fn test_allocation_totals() {
    let allocation = Allocation::new(vec![0, 1, 5, 1], vec![3, 9, 0, 0]).unwrap();
    assert_eq!(allocation.num_stations(), 4);
    assert_eq!(allocation.total_primary(), 7);
    assert_eq!(allocation.total_secondary(), 12);
    assert_eq!(allocation.primary_equivalent(3), 11.0);
    assert!(allocation.within_caps(5, 9));
    assert!(!allocation.within_caps(5, 5));
    assert_eq!(allocation.swapped().primary(), &[3, 9, 0, 0]);
}

#[test]
fn test_allocation_length_mismatch() {
    assert!(matches!(
        Allocation::new(vec![0, 1], vec![1]),
        Err(Error::InputShape { .. })
    ));
    assert!(serde_json::from_str::<Allocation>(r#"{"primary": [1, 2], "secondary": [3]}"#).is_err());
}

#[test]
fn test_allocation_from_json() {
    let allocation: Allocation =
        serde_json::from_str(r#"{"primary": [1, 2], "secondary": [3, 0]}"#).unwrap();
    assert_eq!(allocation, Allocation::new(vec![1, 2], vec![3, 0]).unwrap());
}
