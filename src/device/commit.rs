use super::Shared;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::model::CommitGroup;
use crate::net::Request;
use crate::register::{Action, Address, Register, RegisterType, Snapshot, Value};

use log::{debug, warn};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Consecutive failed writes per commit group.
#[derive(Debug, Default)]
pub(crate) struct Attempts {
    failed: Mutex<HashMap<(RegisterType, Address), u32>>,
}

impl Attempts {
    fn failed(&self) -> MutexGuard<'_, HashMap<(RegisterType, Address), u32>> {
        self.failed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count one more failure of the group at `address` and return the total.
    fn record(&self, kind: RegisterType, address: Address) -> u32 {
        let mut failed = self.failed();
        let count = failed.entry((kind, address)).or_default();
        *count += 1;
        *count
    }

    fn clear(&self, kind: RegisterType, address: Address) {
        self.failed().remove(&(kind, address));
    }
}

/// One commit cycle: at most one coil group, and a holding group only if no
/// coil group was written.
pub(crate) async fn cycle(shared: &Shared) {
    let model = shared.model;
    if !commit_kind(shared, RegisterType::Coil, model.coil_commits).await {
        commit_kind(shared, RegisterType::HoldingRegister, model.holding_commits).await;
    }
    shared.events.emit(Event::RegistersCommitted);
}

/// Write the first group of `groups` with a pending value. Returns true if a
/// write was attempted, even if it failed. A group failing
/// `commit_attempts` times in a row gives up its pending values.
async fn commit_kind(shared: &Shared, kind: RegisterType, groups: &[CommitGroup]) -> bool {
    for group in groups {
        // Members were validated when the bank was built
        let members: Vec<&Register> = group
            .members
            .iter()
            .filter_map(|name| shared.bank.get(name))
            .collect();
        let snapshots: Vec<Snapshot> = members.iter().map(|r| r.snapshot()).collect();
        if snapshots.iter().all(|s| s.staged.is_none()) {
            shared.attempts.clear(kind, group.address);
            continue;
        }

        debug!(
            "Committing {} {}(s) at {}.",
            members.len(),
            kind,
            group.address
        );
        let e = match write(shared, kind, group.address, &members, &snapshots).await {
            Ok(()) => {
                shared.attempts.clear(kind, group.address);
                return true;
            }
            Err(e) => e,
        };

        let mut message = format!(
            "Error while committing {}(s) at {}: {}",
            kind, group.address, e
        );
        if e.is_permanent() {
            shared.attempts.clear(kind, group.address);
        } else {
            // A group that keeps failing must not hold back the groups behind it
            let failed = shared.attempts.record(kind, group.address);
            if failed >= shared.options.commit_attempts {
                for (register, snapshot) in members.iter().zip(&snapshots) {
                    register.reject(snapshot.staged);
                }
                shared.attempts.clear(kind, group.address);
                warn!(
                    "Dropping pending {}(s) at {} after {} failed attempts.",
                    kind, group.address, failed
                );
                message.push_str(&format!(" (dropped after {} attempts)", failed));
            }
        }
        shared.events.emit(Event::ErrorCommittingRegister(message));
        return true;
    }
    false
}

/// Write the pending value of a single register on its own.
pub(crate) async fn single(shared: &Shared, name: &'static str) {
    let Some(register) = shared.bank.get(name) else {
        return;
    };
    let snapshot = register.snapshot();
    if snapshot.staged.is_none() {
        debug!("{name} has no pending value, nothing to commit.");
        return;
    }

    let members = [register];
    match write(shared, register.kind(), register.address(), &members, &[snapshot]).await {
        Ok(()) => shared.events.emit(Event::RegistersCommitted),
        Err(e) => shared.events.emit(Event::ErrorCommittingRegister(format!(
            "Error while writing {name}: {e}"
        ))),
    }
}

/// Send the snapshot values of `members` in one request starting at
/// `address`. A confirmed write settles every member. A write that can never
/// succeed drops the staged values, any other failure keeps them for the
/// next attempt.
async fn write(
    shared: &Shared,
    kind: RegisterType,
    address: Address,
    members: &[&Register],
    snapshots: &[Snapshot],
) -> Result<()> {
    let result = send(shared, kind, address, members, snapshots).await;
    match &result {
        Ok(values) => {
            for ((register, snapshot), value) in members.iter().zip(snapshots).zip(values) {
                register.settle(*value, snapshot.staged);
            }
        }
        Err(e) if e.is_permanent() => {
            for (register, snapshot) in members.iter().zip(snapshots) {
                register.reject(snapshot.staged);
            }
        }
        Err(_) => {}
    }
    result.map(|_| ())
}

async fn send(
    shared: &Shared,
    kind: RegisterType,
    address: Address,
    members: &[&Register],
    snapshots: &[Snapshot],
) -> Result<Vec<Value>> {
    let values = members
        .iter()
        .zip(snapshots)
        .map(|(register, snapshot)| {
            snapshot
                .current
                .ok_or_else(|| Error::UnreadRegister(register.name().to_owned()))
        })
        .collect::<Result<Vec<_>>>()?;

    let fn_code = shared.model.codes.select(kind, Action::Write)?;
    let request = Request::write(fn_code, address, &values)?;
    shared.gate.execute(&request).await?;
    Ok(values)
}
