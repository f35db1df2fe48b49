#![no_main]

use libfuzzer_sys::fuzz_target;

use netstash::cache::key::fuzzing::sanitize;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let raw: Vec<String> = text.split('\n').map(str::to_owned).collect();

    let segments = sanitize(&raw);
    for token in &segments {
        assert!(!token.is_empty());
        assert!(token != "." && token != "..");
        assert!(!token.contains('/') && !token.contains('\\'));
        assert!(!token.chars().any(char::is_control));
    }

    // Sanitized output must survive a second pass unchanged.
    assert_eq!(sanitize(&segments), segments);
});
