#![no_main]

use keylatch_challenge::ChallengeRecord;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    if let Ok(record) = ChallengeRecord::decode(&raw) {
        assert!((1..=9).contains(&record.slot));
        assert!(record.iterations > 0);
        let reencoded = ChallengeRecord::decode(&record.encode()).expect("encoded record decodes");
        assert_eq!(reencoded, record);
    }
});
