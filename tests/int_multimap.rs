//! Integer multimap scenarios: serial-numbered duplicates, insertion
//! order among equal keys, and repeated erase draining each run from the
//! front.

use ordtree::TreeMultimap;

const NUMBER_KEYS: i64 = 100_000;
const REPETITIONS: i64 = 3;

type IntMultimap = TreeMultimap<i64, i64>;

/// Key `i` carries the serial values `(i-1)*R + 1 ..= (i-1)*R + R`.
fn serial_value(key: i64, occurrence: i64) -> i64 {
    (key - 1) * REPETITIONS + occurrence
}

#[test]
fn duplicate_inserts_iterate_in_insertion_order() {
    let mut multi = IntMultimap::new();

    for key in 1..=NUMBER_KEYS {
        for occurrence in 1..=REPETITIONS {
            multi.insert(key, serial_value(key, occurrence)).unwrap();
        }
    }

    assert_eq!(multi.len() as i64, NUMBER_KEYS * REPETITIONS);
    multi.validate().unwrap();

    let mut cursor = multi.first().unwrap();
    let mut expected_serial = 1;
    let mut expected_key = 1;
    let mut occurrence = 1;
    loop {
        assert_eq!(*cursor.key(), expected_key);
        assert_eq!(*cursor.value(), expected_serial);

        expected_serial += 1;
        occurrence += 1;
        if occurrence > REPETITIONS {
            occurrence = 1;
            expected_key += 1;
        }
        if !cursor.next() {
            break;
        }
    }
    assert_eq!(expected_serial, NUMBER_KEYS * REPETITIONS + 1);
}

#[test]
fn erase_drains_each_run_from_the_front() {
    let mut multi = IntMultimap::new();

    for key in 1..=NUMBER_KEYS {
        for occurrence in 1..=REPETITIONS {
            multi.insert(key, serial_value(key, occurrence)).unwrap();
        }
    }

    for occurrence in 1..=REPETITIONS {
        for key in 1..=NUMBER_KEYS {
            assert_eq!(
                multi.get(&key),
                Some(&serial_value(key, occurrence)),
                "key {} occurrence {}",
                key,
                occurrence
            );
            assert!(multi.erase(&key), "key {} occurrence {}", key, occurrence);
        }
    }

    assert_eq!(multi.len(), 0);
    assert!(multi.first().is_none());
    multi.validate().unwrap();
}

#[test]
fn equal_range_spans_the_full_run() {
    let mut multi = IntMultimap::new();

    for key in 1..=500 {
        for occurrence in 1..=REPETITIONS {
            multi.insert(key, serial_value(key, occurrence)).unwrap();
        }
    }

    for key in 1..=500 {
        let run: Vec<i64> = multi.equal_range(&key).map(|(_, v)| *v).collect();
        let expected: Vec<i64> = (1..=REPETITIONS)
            .map(|occurrence| serial_value(key, occurrence))
            .collect();
        assert_eq!(run, expected, "key {}", key);
    }

    assert_eq!(multi.equal_range(&0).count(), 0);
    assert_eq!(multi.equal_range(&501).count(), 0);
}

#[test]
fn long_single_key_run_survives_erase_rounds() {
    let mut multi = IntMultimap::new();

    // One key whose run spans many leaves, with traffic on both sides.
    for key in 1..=100 {
        multi.insert(key, 0).unwrap();
    }
    for serial in 1..=2000 {
        multi.insert(500, serial).unwrap();
    }
    for key in 900..=1000 {
        multi.insert(key, 0).unwrap();
    }
    multi.validate().unwrap();

    for serial in 1..=2000 {
        assert_eq!(multi.get(&500), Some(&serial));
        assert!(multi.erase(&500), "serial {}", serial);
    }
    assert!(multi.get(&500).is_none());
    multi.validate().unwrap();

    assert_eq!(multi.len(), 201);
}

#[test]
fn interleaved_keys_keep_their_own_order() {
    let mut multi = IntMultimap::new();

    // Round-robin insertion: all keys get occurrence 1, then 2, then 3.
    for occurrence in 1..=REPETITIONS {
        for key in 1..=1000 {
            multi.insert(key, occurrence).unwrap();
        }
    }

    let entries: Vec<(i64, i64)> = multi.iter().map(|(k, v)| (*k, *v)).collect();
    let mut expected = Vec::new();
    for key in 1..=1000 {
        for occurrence in 1..=REPETITIONS {
            expected.push((key, occurrence));
        }
    }
    assert_eq!(entries, expected);
    multi.validate().unwrap();
}
