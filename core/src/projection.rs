//! Read-side projection: who holds which slot.
//!
//! The write path never touches roster metadata; claims and releases work on
//! encoded tokens alone. Display is the reverse: the stored assignment map is
//! decoded back into slots, grouped, and joined with group/role names from
//! the external catalog. The result is a display-ready structure — this
//! module performs no mutation and no rendering.
//!
//! Malformed tokens encountered here are skipped with a logged warning
//! rather than failing the whole projection: one corrupt entry must not take
//! down the roster display for everyone else.

use crate::event::ContentEvent;
use crate::ids::{GroupId, ParticipantId, RoleId};
use crate::slot::Slot;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Error from the external roster catalog lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Roster lookup failed: {0}")]
pub struct RosterError(pub String);

/// Catalog metadata for a group: its display name and ordered role list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupInfo {
    /// Display name of the group.
    pub name: String,
    /// Ordered role references; their 1-based positions are the role
    /// indices used by the slot codec.
    pub role_ids: Vec<RoleId>,
}

/// Catalog metadata for a role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleInfo {
    /// Display name of the role.
    pub name: String,
}

/// Read-only supplier of group/role metadata.
///
/// Queried only during projection, never during claim/release. Implementations
/// must be `Send + Sync`; the core never mutates the catalog.
///
/// Uses explicit `Pin<Box<dyn Future>>` returns for trait-object usage
/// (`&dyn RosterResolver`).
pub trait RosterResolver: Send + Sync {
    /// Resolve a group's metadata. `None` when the catalog does not know
    /// the group (the projection keeps the position with an unnamed group
    /// rather than erroring).
    ///
    /// # Errors
    ///
    /// Returns [`RosterError`] when the lookup itself fails.
    fn resolve_group(
        &self,
        group_id: &GroupId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<GroupInfo>, RosterError>> + Send + '_>>;

    /// Resolve a role's metadata. `None` when the catalog does not know
    /// the role.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError`] when the lookup itself fails.
    fn resolve_role(
        &self,
        role_id: &RoleId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<RoleInfo>, RosterError>> + Send + '_>>;
}

/// One role line in a group's roster view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleSlot {
    /// 1-based role index within the group.
    pub index: u32,
    /// Catalog role reference, when the index maps to one.
    ///
    /// `None` for holders of an index beyond the catalog's role list; their
    /// assignment is still shown rather than silently dropped.
    pub role_id: Option<RoleId>,
    /// Resolved role name, when the catalog knows it.
    pub name: Option<String>,
    /// Participants holding this slot, in sorted order.
    ///
    /// Slot exclusivity means this has at most one element for data written
    /// through the store; the projection still tolerates more.
    pub holders: Vec<ParticipantId>,
}

/// One group block in the roster view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupRoster {
    /// 1-based group position within the event.
    pub position: u32,
    /// Catalog group reference.
    pub group_id: GroupId,
    /// Resolved group name; `None` when the catalog does not know the group.
    pub name: Option<String>,
    /// Role lines in index order.
    pub roles: Vec<RoleSlot>,
}

/// Display-ready roster for one event: group blocks in position order.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct RosterView {
    /// Group blocks, one per entry of the event's `group_ids`.
    pub groups: Vec<GroupRoster>,
}

/// Decode every assignment of an event and group participants by slot.
///
/// Pure: no catalog access, no mutation. Malformed tokens are skipped with a
/// `tracing::warn!`. Holder lists are sorted for deterministic output.
#[must_use]
pub fn project_assignments(event: &ContentEvent) -> BTreeMap<Slot, Vec<ParticipantId>> {
    let multi_group = event.multi_group();
    let mut by_slot: BTreeMap<Slot, Vec<ParticipantId>> = BTreeMap::new();

    for (participant, token) in &event.assignments {
        match token.decode(multi_group) {
            Ok(slot) => by_slot.entry(slot).or_default().push(participant.clone()),
            Err(error) => {
                tracing::warn!(
                    event_uuid = %event.uuid,
                    participant = %participant,
                    token = %token,
                    %error,
                    "Skipping malformed slot token during projection"
                );
            }
        }
    }

    for holders in by_slot.values_mut() {
        holders.sort();
    }

    by_slot
}

/// Build the full display-ready roster for an event.
///
/// Walks the event's groups in position order, resolves names through the
/// catalog, and attaches slot holders from [`project_assignments`]. Groups
/// or roles the catalog no longer knows keep their position with a `None`
/// name. Assignments pointing past a group's role list get an extra unnamed
/// role line so no held slot disappears from the display.
///
/// # Errors
///
/// Returns [`RosterError`] only when a catalog lookup itself fails; missing
/// catalog entries are not errors.
pub async fn build_roster_view(
    event: &ContentEvent,
    resolver: &dyn RosterResolver,
) -> Result<RosterView, RosterError> {
    let mut assignments = project_assignments(event);
    let mut groups = Vec::with_capacity(event.group_ids.len());

    for (position, group_id) in (1u32..).zip(event.group_ids.iter()) {
        let info = resolver.resolve_group(group_id).await?;

        let mut roles = Vec::new();
        if let Some(info) = &info {
            for (index, role_id) in (1u32..).zip(info.role_ids.iter()) {
                let role_name = resolver
                    .resolve_role(role_id)
                    .await?
                    .map(|role| role.name);
                let holders = assignments
                    .remove(&Slot::new(position, index))
                    .unwrap_or_default();
                roles.push(RoleSlot {
                    index,
                    role_id: Some(role_id.clone()),
                    name: role_name,
                    holders,
                });
            }
        }

        // Held slots beyond the resolved role list (or in an unresolved
        // group) still belong on the display.
        let orphaned: Vec<Slot> = assignments
            .keys()
            .filter(|slot| slot.group_position == position)
            .copied()
            .collect();
        for slot in orphaned {
            let holders = assignments.remove(&slot).unwrap_or_default();
            roles.push(RoleSlot {
                index: slot.role_index,
                role_id: None,
                name: None,
                holders,
            });
        }
        roles.sort_by_key(|role| role.index);

        groups.push(GroupRoster {
            position,
            group_id: group_id.clone(),
            name: info.map(|info| info.name),
            roles,
        });
    }

    Ok(RosterView { groups })
}
