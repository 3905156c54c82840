mod common;

use common::{FakeHttp, Reply};
use ota_core::resolver::{ManifestResolver, Resolution, DEFAULT_HOP_BUDGET, MAX_MANIFEST_LEN};
use ota_core::{ManifestError, TransportPolicy, UpdateError};

const CFG: &str = "https://x/cfg.txt";

fn resolve(http: &mut FakeHttp, start: &str, current: u32) -> Result<Resolution, UpdateError> {
    ManifestResolver::new(http, TransportPolicy::for_url(start), current).resolve(start, DEFAULT_HOP_BUDGET)
}

#[test]
fn newer_version_is_available() {
    let mut http = FakeHttp::new(vec![(CFG, Reply::ok("https://x/fw.bin\n5\n\n\n"))]);

    let resolution = resolve(&mut http, CFG, 3).unwrap();
    assert!(resolution.is_available());
    let manifest = resolution.manifest();
    assert_eq!(manifest.binary_url, "https://x/fw.bin");
    assert_eq!(manifest.version, 5);
    assert!(manifest.digest.is_none());
}

#[test]
fn older_or_equal_version_is_up_to_date() {
    let mut http = FakeHttp::new(vec![(CFG, Reply::ok("https://x/fw.bin\n2\n\n\n"))]);
    assert!(matches!(resolve(&mut http, CFG, 3), Ok(Resolution::UpToDate(m)) if m.version == 2));

    let mut http = FakeHttp::new(vec![(CFG, Reply::ok("https://x/fw.bin\n3\n\n\n"))]);
    assert!(!resolve(&mut http, CFG, 3).unwrap().is_available());
}

#[test]
fn malformed_digest_fails_resolution() {
    let body = format!("https://x/fw.bin\n5\n{}\n", "a".repeat(31));
    let mut http = FakeHttp::new(vec![(CFG, Reply::ok(body))]);

    assert_eq!(
        resolve(&mut http, CFG, 3),
        Err(UpdateError::Manifest(ManifestError::MalformedDigest))
    );
}

#[test]
fn manifest_without_url_or_version_fails() {
    let mut http = FakeHttp::new(vec![(CFG, Reply::ok("\n5\n"))]);
    assert_eq!(resolve(&mut http, CFG, 0), Err(UpdateError::Manifest(ManifestError::MissingBinaryUrl)));

    let mut http = FakeHttp::new(vec![(CFG, Reply::ok("https://x/fw.bin\n\n"))]);
    assert_eq!(resolve(&mut http, CFG, 0), Err(UpdateError::Manifest(ManifestError::MissingVersion)));
}

#[test]
fn permanent_redirect_is_followed() {
    let mut http = FakeHttp::new(vec![
        (CFG, Reply::redirect("https://y/cfg2.txt")),
        ("https://y/cfg2.txt", Reply::ok("https://y/fw.bin\n9\n")),
    ]);

    let resolution = resolve(&mut http, CFG, 3).unwrap();
    assert_eq!(resolution.manifest().binary_url, "https://y/fw.bin");
    assert_eq!(http.requests, vec![CFG.to_string(), "https://y/cfg2.txt".to_string()]);
}

#[test]
fn endless_redirects_stop_at_budget() {
    let mut http = FakeHttp::from_fn(|url| Some(Reply::redirect(&format!("{}/next", url))));

    assert_eq!(
        resolve(&mut http, CFG, 3),
        Err(UpdateError::TooManyRedirects { budget: DEFAULT_HOP_BUDGET })
    );
    assert_eq!(http.requests.len(), DEFAULT_HOP_BUDGET as usize);
}

#[test]
fn chain_one_shorter_than_budget_resolves() {
    // 4 redirects + the final 200 = 5 requests
    let mut http = FakeHttp::from_fn(|url| {
        let depth = url.matches("/r").count();
        if depth < 4 {
            Some(Reply::redirect(&format!("{}/r", url)))
        } else {
            Some(Reply::ok("https://x/fw.bin\n5\n"))
        }
    });

    assert!(resolve(&mut http, CFG, 3).unwrap().is_available());
    assert_eq!(http.requests.len(), 5);
}

#[test]
fn zero_budget_makes_no_request() {
    let mut http = FakeHttp::new(vec![(CFG, Reply::ok("https://x/fw.bin\n5\n"))]);
    let result = ManifestResolver::new(&mut http, TransportPolicy::for_url(CFG), 1).resolve(CFG, 0);

    assert_eq!(result, Err(UpdateError::TooManyRedirects { budget: 0 }));
    assert!(http.requests.is_empty());
}

#[test]
fn other_redirect_codes_are_errors() {
    for status in [302u16, 307] {
        let reply = Reply::status(status, "Found").with_header("Location", "https://y/cfg2.txt");
        let mut http = FakeHttp::new(vec![(CFG, reply)]);

        assert_eq!(
            resolve(&mut http, CFG, 3),
            Err(UpdateError::Http { status, body: "Found".into() })
        );
        assert_eq!(http.requests.len(), 1);
    }
}

#[test]
fn moved_permanently_without_location_is_an_error() {
    let mut http = FakeHttp::new(vec![(CFG, Reply::status(301, "gone"))]);
    assert_eq!(resolve(&mut http, CFG, 3), Err(UpdateError::Http { status: 301, body: "gone".into() }));
}

#[test]
fn http_error_surfaces_status_and_body() {
    let mut http = FakeHttp::new(vec![(CFG, Reply::status(404, "no such manifest"))]);
    assert_eq!(
        resolve(&mut http, CFG, 3),
        Err(UpdateError::Http { status: 404, body: "no such manifest".into() })
    );
}

#[test]
fn secure_session_rejects_plain_redirect() {
    let mut http = FakeHttp::new(vec![
        (CFG, Reply::redirect("http://y/cfg2.txt")),
        ("http://y/cfg2.txt", Reply::ok("https://y/fw.bin\n9\n")),
    ]);

    assert_eq!(
        resolve(&mut http, CFG, 3),
        Err(UpdateError::InsecureUrlRejected { url: "http://y/cfg2.txt".into() })
    );
    assert_eq!(http.requests, vec![CFG.to_string()]);
}

#[test]
fn plain_session_may_redirect_anywhere() {
    let start = "http://x/cfg.txt";
    let mut http = FakeHttp::new(vec![
        (start, Reply::redirect("https://y/cfg2.txt")),
        ("https://y/cfg2.txt", Reply::redirect("http://z/cfg3.txt")),
        ("http://z/cfg3.txt", Reply::ok("http://z/fw.bin\n9\n")),
    ]);

    assert!(resolve(&mut http, start, 3).unwrap().is_available());
}

#[test]
fn secure_policy_checks_starting_url_too() {
    let mut http = FakeHttp::new(vec![]);
    let result = ManifestResolver::new(&mut http, TransportPolicy::for_url(CFG), 1).resolve("http://x/cfg.txt", 5);

    assert!(matches!(result, Err(UpdateError::InsecureUrlRejected { .. })));
    assert!(http.requests.is_empty());
}

#[test]
fn connection_failure_is_a_transport_error() {
    let mut http = FakeHttp::new(vec![]);
    assert!(matches!(resolve(&mut http, CFG, 3), Err(UpdateError::Transport(_))));
}

#[test]
fn full_manifest_fields_are_parsed() {
    let mut http = FakeHttp::new(vec![(
        CFG,
        Reply::ok("https://x/fw.bin\n10\n5d41402abc4b2a76b9719d911017c592\n1.3\n"),
    )]);

    let resolution = resolve(&mut http, CFG, 3).unwrap();
    let manifest = resolution.manifest();
    assert_eq!(manifest.digest.as_ref().unwrap().as_str(), "5d41402abc4b2a76b9719d911017c592");
    assert_eq!(manifest.version_label.as_deref(), Some("1.3"));
}

#[test]
fn oversized_manifest_is_rejected() {
    // Long URL pushes the version digits past the size limit
    let url = format!("https://x/{}.bin", "a".repeat(MAX_MANIFEST_LEN - 16));
    let body = format!("{}\n123\n", url);
    let mut http = FakeHttp::new(vec![(CFG, Reply::ok(body))]);

    assert_eq!(
        resolve(&mut http, CFG, 3),
        Err(UpdateError::Manifest(ManifestError::TooLong { limit: MAX_MANIFEST_LEN }))
    );
}

#[test]
fn manifest_at_size_limit_is_accepted() {
    let prefix = "https://x/";
    let tail = ".bin\n9\n";
    let url = format!("{}{}.bin", prefix, "b".repeat(MAX_MANIFEST_LEN - prefix.len() - tail.len()));
    let body = format!("{}\n9\n", url);
    assert_eq!(body.len(), MAX_MANIFEST_LEN);
    let mut http = FakeHttp::new(vec![(CFG, Reply::ok(body))]);

    let resolution = resolve(&mut http, CFG, 3).unwrap();
    assert_eq!(resolution.manifest().version, 9);
    assert_eq!(resolution.manifest().binary_url, url);
}
