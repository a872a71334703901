#![no_main]

use std::sync::OnceLock;

use libfuzzer_sys::fuzz_target;
use triage_core::{ContentGuard, FileBody};

fn fixture_root() -> &'static std::path::Path {
    static ROOT: OnceLock<std::path::PathBuf> = OnceLock::new();
    ROOT.get_or_init(|| {
        let root = std::env::temp_dir().join("triage-fuzz-content-guard/repo");
        std::fs::create_dir_all(root.join("src")).expect("fixture dir");
        std::fs::write(root.join("src/lib.rs"), "pub fn inside() {}\n").expect("fixture file");
        std::fs::write(root.join("../outside.txt"), "OUTSIDE").expect("outside file");
        root
    })
}

fuzz_target!(|data: &[u8]| {
    let requested = String::from_utf8_lossy(data);
    let guard = ContentGuard::new(fixture_root());
    let content = guard.read(&requested);
    assert_eq!(content.path, requested.as_ref());
    if requested.split('/').any(|segment| segment == "..") {
        assert_eq!(content.body, FileBody::AccessDenied);
    }
    assert!(!content.rendered_body().contains("OUTSIDE"));
});
