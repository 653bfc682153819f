//! Listing a remote's advertised refs.

use std::fmt;

use remora_core::{Direction, Result};
use tracing::debug;

use super::{Connection, SessionHooks};
use crate::head::RemoteHead;
use crate::options::FetchOptions;
use crate::remote::Remote;

/// The advertised refs of a remote, each yielded once.
///
/// The whole advertisement is read in one round-trip when the listing is
/// opened. The connection stays open until the last head has been yielded
/// or the iterator is dropped, whichever comes first, and is disconnected
/// exactly once.
pub struct RemoteHeads {
    connection: Option<Connection>,
    heads: std::vec::IntoIter<RemoteHead>,
}

impl RemoteHeads {
    pub(crate) fn open(remote: &Remote, options: FetchOptions) -> Result<Self> {
        let mut hooks = SessionHooks::new(remote.url(), options);
        let connector = remote.repo().connector();
        let mut connection = Connection::open(connector.as_ref(), remote.url())?;

        connection.connect(Direction::Fetch, &mut hooks)?;
        let listed = connection.transport().list_refs();
        let advertised = hooks.resolve(listed)?;
        debug!("{} advertises {} refs", remote.url(), advertised.len());

        let heads = advertised
            .into_iter()
            .map(|head| -> Result<RemoteHead> {
                let local = local_oid_for(remote, head.name())?;
                Ok(head.with_local_oid(local))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            connection: Some(connection),
            heads: heads.into_iter(),
        })
    }

    /// Hands each head to `visitor`, stopping at its first error.
    ///
    /// The visitor's error is returned as is; the connection is closed
    /// before this returns either way.
    pub fn for_each_head<F, E>(mut self, mut visitor: F) -> std::result::Result<(), E>
    where
        F: FnMut(&RemoteHead) -> std::result::Result<(), E>,
    {
        while let Some(head) = self.next() {
            if let Err(e) = visitor(&head) {
                self.finish();
                return Err(e);
            }
        }
        Ok(())
    }

    /// Heads not yet yielded.
    pub fn remaining(&self) -> usize {
        self.heads.len()
    }

    /// Returns true while the connection is still open.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn finish(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }
    }
}

/// The local counterpart of an advertised ref: its tracking ref when a fetch
/// refspec maps it, otherwise a local ref of the same name.
fn local_oid_for(remote: &Remote, name: &str) -> Result<Option<gix::ObjectId>> {
    let repo = remote.repo();
    let tracking = remote
        .refspecs()
        .fetch()
        .iter()
        .find_map(|spec| spec.transform(name));

    if let Some(tracking) = tracking {
        if let Some(oid) = repo.find_ref(&tracking)? {
            return Ok(Some(oid));
        }
    }
    repo.find_ref(name)
}

impl Iterator for RemoteHeads {
    type Item = RemoteHead;

    fn next(&mut self) -> Option<RemoteHead> {
        let head = self.heads.next();
        if head.is_none() {
            self.finish();
        }
        head
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.heads.size_hint()
    }
}

impl ExactSizeIterator for RemoteHeads {}

impl fmt::Debug for RemoteHeads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteHeads")
            .field("remaining", &self.remaining())
            .field("connected", &self.is_connected())
            .finish()
    }
}
