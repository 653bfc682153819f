//! Fetch orchestration: connect, list, transfer, update tips, disconnect.

use std::collections::{HashMap, HashSet};

use gix::ObjectId;
use remora_core::{AutotagPolicy, Direction, RemoraError, Result, TransferProgress};
use tracing::{debug, info, warn};

use super::{Connection, SessionHooks, SessionState};
use crate::head::RemoteHead;
use crate::options::FetchOptions;
use crate::progress::TipUpdate;
use crate::refspec::Refspec;
use crate::remote::Remote;

/// What a completed fetch did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Final transfer statistics.
    pub progress: TransferProgress,
    /// Local refs written, in the order they were written.
    pub updates: Vec<TipUpdate>,
}

impl FetchOutcome {
    /// Returns true if no local ref changed.
    pub fn is_up_to_date(&self) -> bool {
        self.updates.is_empty()
    }
}

/// An advertised head and the local ref it lands in.
#[derive(Debug)]
struct PlannedTip {
    refname: String,
    head: RemoteHead,
}

/// One fetch against one remote.
///
/// The session works on an unnamed copy of the remote, so neither the
/// caller's handle nor its stored configuration changes. A session runs
/// once.
#[derive(Debug)]
pub struct TransferSession {
    working: Remote,
    hooks: SessionHooks,
    state: SessionState,
}

impl TransferSession {
    /// Prepares a fetch of `remote`.
    ///
    /// With `refspecs` given, exactly those are used for this fetch; they are
    /// validated here, before anything touches the network.
    pub fn new(remote: &Remote, refspecs: Option<&[&str]>, options: FetchOptions) -> Result<Self> {
        let mut working = remote.working_copy();

        if let Some(specs) = refspecs {
            let overrides = specs
                .iter()
                .map(|spec| Refspec::parse(spec, Direction::Fetch))
                .collect::<Result<Vec<_>>>()?;
            working.refspecs_mut().set_fetch(overrides);
        }

        let hooks = SessionHooks::new(working.url(), options);
        Ok(Self {
            working,
            hooks,
            state: SessionState::Idle,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The unnamed remote this session fetches with.
    pub fn working_remote(&self) -> &Remote {
        &self.working
    }

    /// Runs the fetch. The transport is disconnected before this returns,
    /// whatever the outcome.
    pub fn run(&mut self) -> Result<FetchOutcome> {
        if self.state != SessionState::Idle {
            return Err(RemoraError::State {
                operation: "fetch",
                reason: format!("session is already {}", self.state),
            });
        }

        info!("Fetching from {}", self.working.url());
        match self.execute() {
            Ok(outcome) => {
                self.advance(SessionState::Closed);
                info!(
                    "Fetched from {}: {} refs updated, {}",
                    self.working.url(),
                    outcome.updates.len(),
                    outcome.progress
                );
                Ok(outcome)
            },
            Err(e) => {
                self.advance(SessionState::Failed);
                warn!("Fetch from {} failed: {}", self.working.url(), e);
                Err(e)
            },
        }
    }

    fn execute(&mut self) -> Result<FetchOutcome> {
        let connector = self.working.repo().connector();
        let mut connection = Connection::open(connector.as_ref(), self.working.url())?;

        connection.connect(Direction::Fetch, &mut self.hooks)?;
        self.advance(SessionState::Connected);

        self.advance(SessionState::Listing);
        let listed = connection.transport().list_refs();
        let advertised = self.hooks.resolve(listed)?;
        let plan = self.plan(&advertised)?;
        debug!(
            "{} heads advertised, {} mapped to local refs",
            advertised.len(),
            plan.len()
        );

        self.advance(SessionState::Transferring);
        let wanted: Vec<RemoteHead> = plan.iter().map(|tip| tip.head.clone()).collect();
        let transferred = connection.transport().transfer(&wanted, &mut self.hooks);
        let progress = self.hooks.resolve(transferred)?;

        self.advance(SessionState::UpdatingTips);
        let updates = self.update_tips(&plan)?;

        connection.close();
        Ok(FetchOutcome { progress, updates })
    }

    fn advance(&mut self, next: SessionState) {
        debug_assert!(self.state.can_advance_to(next), "{} -> {}", self.state, next);
        debug!("Fetch session {} -> {}", self.state, next);
        self.state = next;
    }

    /// Maps advertised heads through the fetch refspecs, then adds tags per
    /// the autotag policy. The first refspec to claim a local ref wins.
    fn plan(&self, advertised: &[RemoteHead]) -> Result<Vec<PlannedTip>> {
        let repo = self.working.repo();
        let specs = self.working.refspecs().fetch();
        let mut claimed = HashSet::new();
        let mut plan = Vec::new();

        for head in advertised.iter().filter(|head| !head.is_peeled()) {
            let Some(refname) = specs.iter().find_map(|spec| spec.transform(head.name())) else {
                continue;
            };
            if !claimed.insert(refname.clone()) {
                continue;
            }
            let local = repo.find_ref(&refname)?;
            plan.push(PlannedTip {
                refname,
                head: head.clone().with_local_oid(local),
            });
        }

        self.plan_tags(advertised, &mut claimed, &mut plan)?;
        Ok(plan)
    }

    fn plan_tags(
        &self,
        advertised: &[RemoteHead],
        claimed: &mut HashSet<String>,
        plan: &mut Vec<PlannedTip>,
    ) -> Result<()> {
        let policy = self.working.autotag();
        if policy == AutotagPolicy::None {
            return Ok(());
        }

        let wanted: HashSet<ObjectId> = plan.iter().map(|tip| tip.head.oid()).collect();
        let peeled: HashMap<&str, ObjectId> = advertised
            .iter()
            .filter_map(|head| head.name().strip_suffix("^{}").map(|name| (name, head.oid())))
            .collect();

        let tags = advertised
            .iter()
            .filter(|head| head.name().starts_with("refs/tags/") && !head.is_peeled());

        for head in tags {
            if claimed.contains(head.name()) {
                continue;
            }
            let follows = match policy {
                AutotagPolicy::All => true,
                AutotagPolicy::Auto => {
                    wanted.contains(&head.oid())
                        || peeled
                            .get(head.name())
                            .is_some_and(|target| wanted.contains(target))
                },
                AutotagPolicy::None => false,
            };
            if !follows {
                continue;
            }

            let local = self.working.repo().find_ref(head.name())?;
            if local.is_some_and(|oid| oid != head.oid()) {
                debug!("Keeping existing local tag {}", head.name());
                continue;
            }

            claimed.insert(head.name().to_string());
            plan.push(PlannedTip {
                refname: head.name().to_string(),
                head: head.clone().with_local_oid(local),
            });
        }
        Ok(())
    }

    /// Writes the planned refs, reporting each one. Refs already written stay
    /// written if a later write or observer fails.
    fn update_tips(&mut self, plan: &[PlannedTip]) -> Result<Vec<TipUpdate>> {
        let mut applied = Vec::new();

        for tip in plan {
            let new = tip.head.oid();
            let old = tip.head.local_oid();
            if old == Some(new) {
                continue;
            }

            self.working.repo().update_ref(&tip.refname, new)?;
            debug!("Updated {} -> {}", tip.refname, new);

            let update = TipUpdate {
                refname: tip.refname.clone(),
                old,
                new: Some(new),
            };
            self.hooks.reporter().update_tip(&update)?;
            applied.push(update);
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::Repository;
    use crate::store::MemoryBackend;
    use crate::transport::{Connector, MemoryConnector, MemoryRemote, TransferHooks, Transport};

    const URL: &str = "proto://host/repo.git";

    fn oid(byte: u8) -> ObjectId {
        ObjectId::from_hex(format!("{:02x}", byte).repeat(20).as_bytes()).unwrap()
    }

    fn setup(server: MemoryRemote) -> (Repository, MemoryBackend, MemoryConnector) {
        let backend = MemoryBackend::new();
        let connector = MemoryConnector::new().with_remote(URL, server);
        let repo = Repository::in_memory(backend.clone(), connector.clone());
        (repo, backend, connector)
    }

    #[test]
    fn test_fetch_updates_tracking_refs() {
        let server = MemoryRemote::new()
            .with_head("HEAD", oid(1))
            .with_head("refs/heads/main", oid(1))
            .with_head("refs/heads/dev", oid(2));
        let (repo, backend, connector) = setup(server);
        let remote = repo.create("origin", URL).unwrap();

        let mut session = TransferSession::new(&remote, None, FetchOptions::default()).unwrap();
        let outcome = session.run().unwrap();

        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(outcome.updates.len(), 2);
        assert_eq!(backend.ref_target("refs/remotes/origin/main"), Some(oid(1)));
        assert_eq!(backend.ref_target("refs/remotes/origin/dev"), Some(oid(2)));
        assert_eq!(connector.active(), 0);
    }

    #[test]
    fn test_second_fetch_is_up_to_date() {
        let server = MemoryRemote::new().with_head("refs/heads/main", oid(1));
        let (repo, _, _) = setup(server);
        let remote = repo.create("origin", URL).unwrap();

        remote.fetch(FetchOptions::default()).unwrap();
        let outcome = remote.fetch(FetchOptions::default()).unwrap();

        assert!(outcome.is_up_to_date());
        assert_eq!(outcome.progress.total_objects, 0);
    }

    #[test]
    fn test_first_refspec_claims_destination() {
        let server = MemoryRemote::new()
            .with_head("refs/heads/main", oid(1))
            .with_head("refs/heads/other", oid(2));
        let (repo, backend, _) = setup(server);
        let remote = repo.create("origin", URL).unwrap();

        remote
            .fetch_with_refspecs(
                &[
                    "refs/heads/main:refs/remotes/origin/pinned",
                    "refs/heads/other:refs/remotes/origin/pinned",
                ],
                FetchOptions::default(),
            )
            .unwrap();

        assert_eq!(backend.ref_target("refs/remotes/origin/pinned"), Some(oid(1)));
    }

    #[test]
    fn test_invalid_override_fails_before_connecting() {
        let (repo, _, connector) = setup(MemoryRemote::new());
        let remote = repo.create("origin", URL).unwrap();

        let err = remote
            .fetch_with_refspecs(&[""], FetchOptions::default())
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(connector.opened(), 0);
    }

    #[test]
    fn test_autotag_auto_follows_fetched_history() {
        let server = MemoryRemote::new()
            .with_head("refs/heads/main", oid(1))
            .with_head("refs/tags/v1", oid(9))
            .with_head("refs/tags/v1^{}", oid(1))
            .with_head("refs/tags/unrelated", oid(7));
        let (repo, backend, _) = setup(server);
        let remote = repo.create("origin", URL).unwrap();

        remote.fetch(FetchOptions::default()).unwrap();

        assert_eq!(backend.ref_target("refs/tags/v1"), Some(oid(9)));
        assert_eq!(backend.ref_target("refs/tags/unrelated"), None);
        assert_eq!(backend.ref_target("refs/tags/v1^{}"), None);
    }

    #[test]
    fn test_autotag_policies() {
        let server = MemoryRemote::new()
            .with_head("refs/heads/main", oid(1))
            .with_head("refs/tags/unrelated", oid(7));

        let (repo, backend, _) = setup(server.clone());
        let mut remote = repo.create("origin", URL).unwrap();
        remote.set_autotag(AutotagPolicy::All);
        remote.fetch(FetchOptions::default()).unwrap();
        assert_eq!(backend.ref_target("refs/tags/unrelated"), Some(oid(7)));

        let (repo, backend, _) = setup(server);
        let mut remote = repo.create("origin", URL).unwrap();
        remote.set_autotag(AutotagPolicy::None);
        remote.fetch(FetchOptions::default()).unwrap();
        assert_eq!(backend.ref_target("refs/tags/unrelated"), None);
        assert_eq!(backend.ref_target("refs/remotes/origin/main"), Some(oid(1)));
    }

    #[test]
    fn test_existing_tag_is_not_moved() {
        let server = MemoryRemote::new()
            .with_head("refs/heads/main", oid(1))
            .with_head("refs/tags/v1", oid(1));
        let (repo, backend, _) = setup(server);
        backend.set_ref("refs/tags/v1", oid(5));
        let remote = repo.create("origin", URL).unwrap();

        let outcome = remote.fetch(FetchOptions::default()).unwrap();

        assert_eq!(backend.ref_target("refs/tags/v1"), Some(oid(5)));
        assert!(outcome.updates.iter().all(|u| u.refname != "refs/tags/v1"));
    }

    #[test]
    fn test_connect_failure_marks_session_failed() {
        let server = MemoryRemote::new().fail_connect("connection refused");
        let (repo, backend, connector) = setup(server);
        let remote = repo.create("origin", URL).unwrap();

        let mut session = TransferSession::new(&remote, None, FetchOptions::default()).unwrap();
        let err = session.run().unwrap_err();

        assert!(err.is_transport());
        assert_eq!(session.state(), SessionState::Failed);
        assert!(backend.refs().is_empty());
        assert_eq!(connector.active(), 0);
    }

    #[test]
    fn test_session_runs_once() {
        let (repo, _, _) = setup(MemoryRemote::new());
        let remote = repo.create("origin", URL).unwrap();

        let mut session = TransferSession::new(&remote, None, FetchOptions::default()).unwrap();
        session.run().unwrap();
        assert!(session.run().unwrap_err().is_state());
    }

    #[test]
    fn test_working_remote_is_anonymous() {
        let (repo, _, _) = setup(MemoryRemote::new());
        let remote = repo.create("origin", URL).unwrap();

        let session =
            TransferSession::new(&remote, Some(&["refs/heads/main"][..]), FetchOptions::default())
                .unwrap();
        assert!(session.working_remote().is_anonymous());
        assert_eq!(session.working_remote().fetch_refspecs(), vec!["refs/heads/main"]);
        assert_eq!(remote.fetch_refspecs(), vec!["+refs/heads/*:refs/remotes/origin/*"]);
    }

    /// Carries on after a hook fails instead of returning an error.
    struct HeedlessTransport {
        connected: bool,
    }

    impl Transport for HeedlessTransport {
        fn url(&self) -> &str {
            URL
        }

        fn connect(&mut self, _direction: Direction, _hooks: &mut dyn TransferHooks) -> Result<()> {
            self.connected = true;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn list_refs(&mut self) -> Result<Vec<RemoteHead>> {
            Ok(vec![RemoteHead::new("refs/heads/main", oid(1))])
        }

        fn transfer(
            &mut self,
            _wanted: &[RemoteHead],
            hooks: &mut dyn TransferHooks,
        ) -> Result<TransferProgress> {
            let _ = hooks.sideband_progress("Counting objects");
            Ok(TransferProgress::new(1, 1, 1, 512))
        }

        fn disconnect(&mut self) {
            self.connected = false;
        }
    }

    struct HeedlessConnector;

    impl Connector for HeedlessConnector {
        fn open(&self, _url: &str) -> Result<Box<dyn Transport>> {
            Ok(Box::new(HeedlessTransport { connected: false }))
        }
    }

    #[test]
    fn test_observer_error_aborts_even_if_transport_continues() {
        let backend = MemoryBackend::new();
        let repo = Repository::new(backend.clone(), backend.clone(), HeedlessConnector);
        let remote = repo.create("origin", URL).unwrap();
        let options = FetchOptions::builder()
            .progress(|_| Err("observer abort".into()))
            .build();

        let mut session = TransferSession::new(&remote, None, options).unwrap();
        let err = session.run().unwrap_err();

        assert!(err.is_callback());
        assert_eq!(err.caller_error().unwrap().to_string(), "observer abort");
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(backend.ref_target("refs/remotes/origin/main"), None);
    }
}
