mod common;

use std::fmt;
use std::sync::{Arc, Mutex};

use common::{URL, branches_and_tag, fixture, oid};
use remora_core::{AllowedKinds, CallbackChannel, Credential, CredentialError, RemoraError};
use remora_git::{CredentialSource, FetchOptions, MemoryConnector, MemoryRemote};

#[derive(Debug)]
struct Halt(&'static str);

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for Halt {}

#[test]
fn test_progress_is_monotonic_and_tracking_ref_matches_remote() {
    let main = oid(0xab);
    let server = MemoryRemote::new()
        .with_head("HEAD", main)
        .with_head("refs/heads/main", main)
        .with_sideband("Enumerating objects: 12, done.")
        .with_sideband("Counting objects: 100% (12/12), done.")
        .with_objects(12)
        .with_bytes_per_object(1024);
    let fx = fixture(server);
    let origin = fx.repo.create("origin", URL).unwrap();

    let texts = Arc::new(Mutex::new(Vec::new()));
    let stats = Arc::new(Mutex::new(Vec::new()));
    let text_sink = Arc::clone(&texts);
    let stats_sink = Arc::clone(&stats);

    let options = FetchOptions::builder()
        .progress(move |text| {
            text_sink.lock().unwrap().push(text.to_string());
            Ok(())
        })
        .transfer_progress(move |progress| {
            stats_sink.lock().unwrap().push(*progress);
            Ok(())
        })
        .build();

    let outcome = origin.fetch(options).unwrap();

    let stats = stats.lock().unwrap();
    let received: Vec<u32> = stats.iter().map(|s| s.received_objects).collect();
    assert!(!received.is_empty());
    assert!(received.windows(2).all(|pair| pair[0] <= pair[1]));

    let last = stats.last().unwrap();
    assert_eq!(last.received_objects, last.total_objects);
    assert_eq!(last.total_objects, 12);
    assert_eq!(outcome.progress, *last);

    assert_eq!(texts.lock().unwrap().len(), 2);
    assert_eq!(fx.backend.ref_target("refs/remotes/origin/main"), Some(main));
    assert_eq!(fx.connector.active(), 0);
}

#[test]
fn test_fetch_leaves_remote_refspecs_unchanged() {
    let fx = fixture(branches_and_tag());
    let origin = fx.repo.create("origin", URL).unwrap();
    let before = origin.fetch_refspecs();

    origin.fetch(FetchOptions::default()).unwrap();
    assert_eq!(origin.fetch_refspecs(), before);

    origin
        .fetch_with_refspecs(
            &["+refs/heads/dev:refs/remotes/origin/only-dev"],
            FetchOptions::default(),
        )
        .unwrap();
    assert_eq!(origin.fetch_refspecs(), before);
    assert_eq!(
        fx.repo.lookup("origin").unwrap().unwrap().fetch_refspecs(),
        before
    );
    assert_eq!(
        fx.backend.ref_target("refs/remotes/origin/only-dev"),
        Some(oid(2))
    );
}

#[test]
fn test_fetch_follows_annotated_tag_on_fetched_branch() {
    let fx = fixture(branches_and_tag());
    let origin = fx.repo.create("origin", URL).unwrap();

    let outcome = origin.fetch(FetchOptions::default()).unwrap();

    let names: Vec<&str> = outcome.updates.iter().map(|u| u.refname.as_str()).collect();
    assert_eq!(
        names,
        vec!["refs/remotes/origin/main", "refs/remotes/origin/dev", "refs/tags/v1.0"]
    );
    assert!(outcome.updates.iter().all(|u| u.old.is_none()));
}

#[test]
fn test_update_tips_fire_after_transfer() {
    let fx = fixture(branches_and_tag());
    fx.backend.set_ref("refs/remotes/origin/dev", oid(3));
    let origin = fx.repo.create("origin", URL).unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let transfer_sink = Arc::clone(&events);
    let tips_sink = Arc::clone(&events);

    let options = FetchOptions::builder()
        .transfer_progress(move |_| {
            transfer_sink.lock().unwrap().push("transfer".to_string());
            Ok(())
        })
        .update_tips(move |refname, old, new| {
            tips_sink
                .lock()
                .unwrap()
                .push(format!("{refname} {old:?} -> {new:?}"));
            Ok(())
        })
        .build();

    origin.fetch(options).unwrap();

    let events = events.lock().unwrap();
    let first_tip = events.iter().position(|e| e.starts_with("refs/")).unwrap();
    assert!(events[..first_tip].iter().all(|e| e == "transfer"));
    assert!(events[first_tip..].iter().all(|e| e.starts_with("refs/")));
    assert!(events.contains(&format!(
        "refs/remotes/origin/dev {:?} -> {:?}",
        Some(oid(3)),
        Some(oid(2))
    )));
}

#[test]
fn test_static_credential_of_wrong_kind_fails_without_retry() {
    let server = branches_and_tag().require_auth(
        AllowedKinds::SSH_KEY | AllowedKinds::DEFAULT,
        Credential::ssh_key("~/.ssh/id_ed25519"),
    );
    let fx = fixture(server);
    let origin = fx.repo.create("origin", URL).unwrap();

    let options = FetchOptions::builder()
        .credentials(Credential::plaintext("git", "hunter2"))
        .build();
    let err = origin.fetch(options).unwrap_err();

    assert!(matches!(
        err,
        RemoraError::Credential(CredentialError::KindMismatch { .. })
    ));
    assert!(fx.backend.refs().is_empty());
    assert_eq!(fx.connector.active(), 0);
}

#[test]
fn test_resolver_is_asked_once_per_challenge() {
    let server = branches_and_tag().require_auth(
        AllowedKinds::SSH_KEY,
        Credential::ssh_key("~/.ssh/id_ed25519"),
    );
    let fx = fixture(server);
    let origin = fx.repo.create("origin", URL).unwrap();

    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let options = FetchOptions::builder()
        .credentials_with(move |request| {
            sink.lock().unwrap().push(request.allowed());
            Ok(Credential::plaintext("git", "token"))
        })
        .build();

    let err = origin.fetch(options).unwrap_err();

    assert!(err.is_credential());
    assert_eq!(*calls.lock().unwrap(), vec![AllowedKinds::SSH_KEY]);
}

#[test]
fn test_matching_credential_authenticates() {
    let key = Credential::ssh_key_full(
        Some("git".into()),
        None,
        "~/.ssh/id_ed25519",
        Some("secret".into()),
    );
    let server = branches_and_tag().require_auth(AllowedKinds::SSH_KEY, key.clone());
    let fx = fixture(server);
    let origin = fx.repo.create("origin", URL).unwrap();

    let options = FetchOptions::builder()
        .credential_source(CredentialSource::from(key))
        .build();
    origin.fetch(options).unwrap();

    assert_eq!(fx.backend.ref_target("refs/remotes/origin/main"), Some(oid(1)));
}

#[test]
fn test_resolver_sees_username_from_url() {
    let url = "https://alice@host/repo.git";
    let connector = MemoryConnector::new().with_remote(
        url,
        branches_and_tag()
            .require_auth(AllowedKinds::PLAINTEXT, Credential::plaintext("alice", "pw")),
    );
    let backend = remora_git::MemoryBackend::new();
    let repo = remora_git::Repository::in_memory(backend.clone(), connector);
    let remote = repo.create_anonymous(url).unwrap();

    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    let options = FetchOptions::builder()
        .credentials_with(move |request| {
            *sink.lock().unwrap() = request.username_from_url().map(str::to_string);
            Ok(Credential::plaintext("alice", "pw"))
        })
        .build();

    let outcome = remote
        .fetch_with_refspecs(&["refs/heads/main:refs/heads/main"], options)
        .unwrap();

    assert_eq!(seen.lock().unwrap().as_deref(), Some("alice"));
    assert_eq!(outcome.updates.len(), 2);
    assert_eq!(backend.ref_target("refs/heads/main"), Some(oid(1)));
}

#[test]
fn test_rejected_credential_is_transport_error() {
    let server = branches_and_tag()
        .require_auth(AllowedKinds::PLAINTEXT, Credential::plaintext("git", "right"));
    let fx = fixture(server);
    let origin = fx.repo.create("origin", URL).unwrap();

    let attempts = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&attempts);
    let options = FetchOptions::builder()
        .credentials_with(move |_| {
            *counter.lock().unwrap() += 1;
            Ok(Credential::plaintext("git", "wrong"))
        })
        .build();

    let err = origin.fetch(options).unwrap_err();
    assert!(err.is_transport());
    assert_eq!(*attempts.lock().unwrap(), 3);
}

#[test]
fn test_challenge_without_credentials_is_credential_error() {
    let server = branches_and_tag().require_auth(AllowedKinds::ALL, Credential::Default);
    let fx = fixture(server);
    let origin = fx.repo.create("origin", URL).unwrap();

    let err = origin.fetch(FetchOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        RemoraError::Credential(CredentialError::Missing { .. })
    ));
}

#[test]
fn test_resolver_error_surfaces_unchanged() {
    let server = branches_and_tag().require_auth(AllowedKinds::ALL, Credential::Default);
    let fx = fixture(server);
    let origin = fx.repo.create("origin", URL).unwrap();

    let options = FetchOptions::builder()
        .credentials_with(|_| Err(Box::new(Halt("keychain locked"))))
        .build();
    let err = origin.fetch(options).unwrap_err();

    assert!(err.is_credential());
    let cause = err.caller_error().unwrap();
    assert_eq!(cause.downcast_ref::<Halt>().unwrap().0, "keychain locked");
    assert_eq!(fx.connector.active(), 0);
}

#[test]
fn test_progress_observer_error_wins_over_transport_error() {
    let server = branches_and_tag().with_sideband("Counting objects: 3");
    let fx = fixture(server);
    let origin = fx.repo.create("origin", URL).unwrap();

    let options = FetchOptions::builder()
        .progress(|_| Err(Box::new(Halt("stop now"))))
        .build();
    let err = origin.fetch(options).unwrap_err();

    match &err {
        RemoraError::Callback { channel, .. } => assert_eq!(*channel, CallbackChannel::Progress),
        other => panic!("expected callback error, got {other:?}"),
    }
    assert!(err.caller_error().unwrap().downcast_ref::<Halt>().is_some());
    assert!(fx.backend.refs().is_empty());
    assert_eq!(fx.connector.connects(), 1);
    assert_eq!(fx.connector.disconnects(), 1);
}

#[test]
fn test_update_tips_error_keeps_applied_updates() {
    let fx = fixture(branches_and_tag());
    let origin = fx.repo.create("origin", URL).unwrap();

    let options = FetchOptions::builder()
        .update_tips(|refname, _, _| {
            if refname.ends_with("/dev") {
                return Err(Box::new(Halt("enough")));
            }
            Ok(())
        })
        .build();
    let err = origin.fetch(options).unwrap_err();

    assert!(err.is_callback());
    assert_eq!(fx.backend.ref_target("refs/remotes/origin/main"), Some(oid(1)));
    assert_eq!(fx.backend.ref_target("refs/remotes/origin/dev"), Some(oid(2)));
    assert_eq!(fx.backend.ref_target("refs/tags/v1.0"), None);
    assert_eq!(fx.connector.active(), 0);
}

#[test]
fn test_transfer_failure_updates_nothing() {
    let server = branches_and_tag().with_objects(10).fail_transfer("remote hung up unexpectedly");
    let fx = fixture(server);
    let origin = fx.repo.create("origin", URL).unwrap();

    let err = origin.fetch(FetchOptions::default()).unwrap_err();

    match err {
        RemoraError::Transport { url, message, .. } => {
            assert_eq!(url, URL);
            assert!(message.contains("hung up"));
        },
        other => panic!("expected transport error, got {other:?}"),
    }
    assert!(fx.backend.refs().is_empty());
    assert_eq!(fx.connector.active(), 0);
}

#[test]
fn test_unreachable_remote_is_transport_error() {
    let fx = fixture(MemoryRemote::new());
    let remote = fx.repo.create("elsewhere", "https://unknown/repo.git").unwrap();

    let err = remote.fetch(FetchOptions::default()).unwrap_err();
    assert!(err.is_transport());
    assert_eq!(fx.connector.opened(), 0);
}
